//! # mailgate-settings
//!
//! Process configuration for the Mailgate control plane.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** — [`MailgateSettings::default()`]
//! 2. **Config file** — JSON, deep-merged over defaults
//! 3. **Environment variables** — `MAILGATE_*` overrides (highest priority)
//!
//! These are *process* settings (bind address, database path, auth
//! tokens, pipeline endpoint, token pricing). The pipeline-facing
//! policy document (`SystemSettings`) lives in the store, not here.
//!
//! The binary installs its loaded value with [`init_settings`] and
//! every consumer resolves it through [`get_settings`], so the whole
//! process shares one snapshot.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings_from_path};
pub use types::*;

use std::sync::{Arc, RwLock};

/// Global settings singleton.
///
/// `RwLock<Option<Arc<_>>>` instead of `OnceLock` so tests and startup
/// can swap the cached value. Reads are cheap (shared lock +
/// `Arc::clone`); writes only happen at install time.
static SETTINGS: RwLock<Option<Arc<MailgateSettings>>> = RwLock::new(None);

/// Get the global settings instance.
///
/// Returns compiled defaults (with env overrides) until
/// [`init_settings`] installs a loaded value. Returns an `Arc` so
/// callers hold a consistent snapshot even if the cached value is
/// swapped underneath them.
pub fn get_settings() -> Arc<MailgateSettings> {
    {
        let guard = SETTINGS.read().expect("settings lock poisoned");
        if let Some(ref s) = *guard {
            return Arc::clone(s);
        }
    }

    let mut guard = SETTINGS.write().expect("settings lock poisoned");
    if let Some(ref s) = *guard {
        return Arc::clone(s);
    }
    let settings = Arc::new(MailgateSettings::default().with_env_overrides());
    *guard = Some(Arc::clone(&settings));
    settings
}

/// Install a specific settings value, replacing any cached one.
///
/// Used by tests and by server startup once the config path is known.
pub fn init_settings(settings: MailgateSettings) {
    let mut guard = SETTINGS.write().expect("settings lock poisoned");
    *guard = Some(Arc::new(settings));
}
