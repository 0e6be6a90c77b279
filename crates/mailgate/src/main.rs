//! Mailgate server binary: load settings, open the database, serve.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use mailgate_settings::MailgateSettings;
use mailgate_store::ControlStore;

#[derive(Parser)]
#[command(name = "mailgate", about = "Notification pipeline control plane")]
struct Cli {
    /// Path to a JSON config file (deep-merged over defaults).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the SQLite database path.
    #[arg(long)]
    db: Option<PathBuf>,

    /// Override the HTTP bind port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => mailgate_settings::load_settings_from_path(path)?,
        None => MailgateSettings::default().with_env_overrides(),
    };
    if let Some(db) = &cli.db {
        settings.database.path = db.display().to_string();
    }
    if let Some(port) = cli.port {
        settings.server.port = port;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(settings.logging.filter.clone())),
        )
        .init();

    if settings.auth.tokens.is_empty() {
        tracing::warn!("no admin tokens configured; every API request will be rejected");
    }

    // Install the resolved value; everything downstream shares the
    // singleton snapshot.
    mailgate_settings::init_settings(settings);
    let settings = mailgate_settings::get_settings();

    let store = Arc::new(ControlStore::open(Path::new(&settings.database.path))?);
    tracing::info!(path = %settings.database.path, "database opened");

    let handle = mailgate_server::start(Arc::clone(&settings), store).await?;
    tracing::info!(port = handle.port, "mailgate ready");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    Ok(())
}
