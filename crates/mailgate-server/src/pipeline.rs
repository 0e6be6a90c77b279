//! HTTP client for the notification pipeline service.
//!
//! The control plane never runs the pipeline itself; it forwards batch
//! and override commands and reports the outcome. The pipeline speaks
//! snake_case JSON, unlike the camelCase admin API.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use mailgate_core::errors::{CoreError, Result};
use mailgate_settings::PipelineSettings;

/// Outcome of a pipeline batch run.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct BatchOutcome {
    /// Number of emails the pipeline processed in this run.
    pub processed: i64,
}

#[derive(Serialize)]
struct OverrideRequest<'a> {
    email_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_ids: Option<&'a [String]>,
}

/// Thin reqwest wrapper around the pipeline's command endpoints.
#[derive(Clone)]
pub struct PipelineClient {
    http: reqwest::Client,
    base_url: String,
}

impl PipelineClient {
    /// Build a client from pipeline settings.
    pub fn new(settings: &PipelineSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|err| CoreError::Upstream(format!("building pipeline client: {err}")))?;
        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Ask the pipeline to run one classification batch now.
    pub async fn run_batch(&self) -> Result<BatchOutcome> {
        let response = self
            .http
            .post(format!("{}/run-batch", self.base_url))
            .send()
            .await
            .map_err(upstream)?;
        let response = check_status(response).await?;
        response.json::<BatchOutcome>().await.map_err(upstream)
    }

    /// Force-deliver one email's notification to the given targets.
    pub async fn trigger_notification(&self, email_id: &str, target_ids: &[String]) -> Result<()> {
        let response = self
            .http
            .post(format!("{}/trigger-notification", self.base_url))
            .json(&OverrideRequest {
                email_id,
                target_ids: Some(target_ids),
            })
            .send()
            .await
            .map_err(upstream)?;
        let _ = check_status(response).await?;
        Ok(())
    }

    /// Cancel any pending notification for one email.
    pub async fn block_notification(&self, email_id: &str) -> Result<()> {
        let response = self
            .http
            .post(format!("{}/block-notification", self.base_url))
            .json(&OverrideRequest {
                email_id,
                target_ids: None,
            })
            .send()
            .await
            .map_err(upstream)?;
        let _ = check_status(response).await?;
        Ok(())
    }
}

fn upstream(err: reqwest::Error) -> CoreError {
    CoreError::Upstream(format!("pipeline request failed: {err}"))
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let snippet: String = body.chars().take(200).collect();
    Err(CoreError::Upstream(format!(
        "pipeline returned {status}: {snippet}"
    )))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: String) -> PipelineClient {
        PipelineClient::new(&PipelineSettings {
            base_url,
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn run_batch_parses_processed_count() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/run-batch"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "processed": 7
            })))
            .mount(&server)
            .await;

        let outcome = client(server.uri()).run_batch().await.unwrap();
        assert_eq!(outcome.processed, 7);
    }

    #[tokio::test]
    async fn trigger_sends_email_id_and_targets() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/trigger-notification"))
            .and(body_json(serde_json::json!({
                "email_id": "e1",
                "target_ids": ["U0001AAAA"]
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client(server.uri())
            .trigger_notification("e1", &["U0001AAAA".to_string()])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn non_success_status_maps_to_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/block-notification"))
            .respond_with(ResponseTemplate::new(500).set_body_string("pipeline crashed"))
            .mount(&server)
            .await;

        let err = client(server.uri())
            .block_notification("e1")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Upstream(_)));
        assert!(err.to_string().contains("pipeline crashed"));
    }
}
