//! End-to-end HTTP tests: real server on a random port, real SQLite
//! file, pipeline stubbed with wiremock.

use std::sync::Arc;

use mailgate_core::types::{DecisionSource, EmailEvent, EventCategory};
use mailgate_server::{ServerHandle, start};
use mailgate_settings::{AdminToken, MailgateSettings};
use mailgate_store::ControlStore;
use mailgate_store::repositories::EventRepo;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "test-token";

struct TestApi {
    base: String,
    client: reqwest::Client,
    store: Arc<ControlStore>,
    _dir: tempfile::TempDir,
    _handle: ServerHandle,
}

impl TestApi {
    async fn spawn(pipeline_url: Option<&str>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(ControlStore::open(&dir.path().join("api.db")).unwrap());

        let mut settings = MailgateSettings::default();
        settings.server.port = 0;
        settings.auth.tokens.push(AdminToken {
            name: "admin".to_string(),
            token: TOKEN.to_string(),
        });
        if let Some(url) = pipeline_url {
            settings.pipeline.base_url = url.to_string();
        }

        let handle = start(Arc::new(settings), Arc::clone(&store)).await.unwrap();
        Self {
            base: format!("http://127.0.0.1:{}", handle.port),
            client: reqwest::Client::new(),
            store,
            _dir: dir,
            _handle: handle,
        }
    }

    fn get(&self, route: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{route}", self.base))
            .bearer_auth(TOKEN)
    }

    fn post(&self, route: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}{route}", self.base))
            .bearer_auth(TOKEN)
    }

    fn put(&self, route: &str) -> reqwest::RequestBuilder {
        self.client
            .put(format!("{}{route}", self.base))
            .bearer_auth(TOKEN)
    }

    fn patch(&self, route: &str) -> reqwest::RequestBuilder {
        self.client
            .patch(format!("{}{route}", self.base))
            .bearer_auth(TOKEN)
    }

    fn delete(&self, route: &str) -> reqwest::RequestBuilder {
        self.client
            .delete(format!("{}{route}", self.base))
            .bearer_auth(TOKEN)
    }

    fn seed_event(&self, id: &str, category: EventCategory, receipt: &str) {
        let event = EmailEvent {
            email_id: id.to_string(),
            subject: Some("Invoice".to_string()),
            from_email: "billing@vendor.com".to_string(),
            from_domain: "vendor.com".to_string(),
            to_email: "ops@hotseller.co.kr".to_string(),
            final_category: category,
            decision_source: DecisionSource::Llm,
            llm_score: Some(0.7),
            reason: None,
            summary: None,
            llm_input_tokens: Some(1200),
            llm_output_tokens: Some(80),
            llm_cache_read_tokens: None,
            llm_cache_write_tokens: None,
            slack_targets: vec!["U0001AAAA".to_string()],
            timestamp: Some(receipt.to_string()),
            created_at: receipt.to_string(),
            manually_triggered: false,
            manually_blocked: false,
        };
        let conn = self.store.pool().get().unwrap();
        EventRepo::insert(&conn, &event).unwrap();
    }
}

#[tokio::test]
async fn health_is_open_but_api_routes_require_auth() {
    let api = TestApi::spawn(None).await;

    let health = reqwest::get(format!("{}/health", api.base)).await.unwrap();
    assert_eq!(health.status(), 200);

    let unauthenticated = reqwest::get(format!("{}/api/rules", api.base))
        .await
        .unwrap();
    assert_eq!(unauthenticated.status(), 401);
    let body: serde_json::Value = unauthenticated.json().await.unwrap();
    assert_eq!(body["error"]["code"], "unauthorized");

    let wrong = api
        .client
        .get(format!("{}/api/rules", api.base))
        .bearer_auth("wrong-token")
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), 401);
}

#[tokio::test]
async fn rule_crud_round_trip() {
    let api = TestApi::spawn(None).await;

    let created = api
        .post("/api/rules")
        .json(&serde_json::json!({
            "slackUserId": "U0001AAAA",
            "displayName": "Ops",
            "gmailAccounts": ["  Ops@Hotseller.co.kr ", "ops@hotseller.co.kr"]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), 201);
    let body: serde_json::Value = created.json().await.unwrap();
    assert_eq!(body["gmailAccounts"], serde_json::json!(["ops@hotseller.co.kr"]));
    assert_eq!(body["enabled"], true);
    assert_eq!(body["updatedBy"], "admin");

    let duplicate = api
        .post("/api/rules")
        .json(&serde_json::json!({"slackUserId": "U0001AAAA"}))
        .send()
        .await
        .unwrap();
    assert_eq!(duplicate.status(), 409);

    let malformed = api
        .post("/api/rules")
        .json(&serde_json::json!({"slackUserId": "not-an-id"}))
        .send()
        .await
        .unwrap();
    assert_eq!(malformed.status(), 400);

    let patched = api
        .patch("/api/rules/U0001AAAA")
        .json(&serde_json::json!({"enabled": false}))
        .send()
        .await
        .unwrap();
    assert_eq!(patched.status(), 200);
    let body: serde_json::Value = patched.json().await.unwrap();
    assert_eq!(body["enabled"], false);
    assert_eq!(body["displayName"], "Ops");

    let deleted = api.delete("/api/rules/U0001AAAA").send().await.unwrap();
    assert_eq!(deleted.status(), 204);

    let gone = api.get("/api/rules/U0001AAAA").send().await.unwrap();
    assert_eq!(gone.status(), 404);
    let body: serde_json::Value = gone.json().await.unwrap();
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn pause_resume_and_limits() {
    let api = TestApi::spawn(None).await;

    let status = api.get("/api/system/status").send().await.unwrap();
    let body: serde_json::Value = status.json().await.unwrap();
    assert_eq!(body["enabled"], true);
    assert_eq!(body["dailyLimitCalls"], 1000);
    assert_eq!(body["today"]["calls"], 0);

    let paused = api
        .post("/api/system/pause")
        .json(&serde_json::json!({"reason": "cost spike"}))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = paused.json().await.unwrap();
    assert_eq!(body["enabled"], false);
    assert_eq!(body["pausedBy"], "admin");
    assert_eq!(body["pauseReason"], "cost spike");

    let resumed = api.post("/api/system/resume").send().await.unwrap();
    let body: serde_json::Value = resumed.json().await.unwrap();
    assert_eq!(body["enabled"], true);
    assert!(body.get("pausedAt").is_none());

    let limits = api
        .put("/api/system/limits")
        .json(&serde_json::json!({"dailyLimitCostUsd": 12.5}))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = limits.json().await.unwrap();
    assert_eq!(body["dailyLimitCalls"], 1000);
    assert_eq!(body["dailyLimitCostUsd"], 12.5);

    let invalid = api
        .put("/api/system/limits")
        .json(&serde_json::json!({"dailyLimitCalls": 0}))
        .send()
        .await
        .unwrap();
    assert_eq!(invalid.status(), 400);

    let audit = api.get("/api/audit").send().await.unwrap();
    let entries: serde_json::Value = audit.json().await.unwrap();
    let actions: Vec<&str> = entries
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();
    assert!(actions.contains(&"SYSTEM_PAUSE"));
    assert!(actions.contains(&"SYSTEM_RESUME"));
    assert!(actions.contains(&"SYSTEM_LIMITS"));
}

#[tokio::test]
async fn settings_round_trip_with_defaults() {
    let api = TestApi::spawn(None).await;

    let initial = api.get("/api/settings").send().await.unwrap();
    let body: serde_json::Value = initial.json().await.unwrap();
    assert_eq!(body["scoreThreshold"], 0.5);
    assert_eq!(body["routingCacheTtlSec"], 60);

    let updated = api
        .patch("/api/settings")
        .json(&serde_json::json!({
            "scoreThreshold": 0.7,
            "blacklistDomains": [" Spam.COM ", "spam.com"]
        }))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = updated.json().await.unwrap();
    assert_eq!(body["scoreThreshold"], 0.7);
    assert_eq!(body["blacklistDomains"], serde_json::json!(["spam.com"]));

    let out_of_range = api
        .patch("/api/settings")
        .json(&serde_json::json!({"scoreThreshold": 1.5}))
        .send()
        .await
        .unwrap();
    assert_eq!(out_of_range.status(), 400);
}

#[tokio::test]
async fn run_batch_forwards_to_pipeline_and_records_outcome() {
    let pipeline = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/run-batch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "processed": 4
        })))
        .mount(&pipeline)
        .await;

    let api = TestApi::spawn(Some(&pipeline.uri())).await;
    let response = api.post("/api/system/run-batch").send().await.unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["processed"], 4);

    let status = api.get("/api/system/status").send().await.unwrap();
    let body: serde_json::Value = status.json().await.unwrap();
    assert_eq!(body["lastBatchProcessed"], 4);
    assert!(body["lastBatchAt"].is_string());
}

#[tokio::test]
async fn run_batch_maps_pipeline_failure_to_bad_gateway() {
    let pipeline = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/run-batch"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&pipeline)
        .await;

    let api = TestApi::spawn(Some(&pipeline.uri())).await;
    let response = api.post("/api/system/run-batch").send().await.unwrap();
    assert_eq!(response.status(), 502);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "upstream_error");
}

#[tokio::test]
async fn event_listing_filters_by_category_and_day() {
    let api = TestApi::spawn(None).await;
    // 03:00 UTC = 12:00 at UTC+9, inside 2025-05-01.
    api.seed_event("e1", EventCategory::Notify, "2025-05-01T03:00:00+00:00");
    api.seed_event("e2", EventCategory::Silent, "2025-05-01T04:00:00+00:00");
    api.seed_event("e3", EventCategory::Notify, "2025-05-02T03:00:00+00:00");

    let response = api
        .get("/api/events?category=notify&date=2025-05-01")
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = response.json().await.unwrap();
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["emailId"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["e1"]);

    let bad_category = api.get("/api/events?category=bogus").send().await.unwrap();
    assert_eq!(bad_category.status(), 400);
}

#[tokio::test]
async fn trigger_override_marks_event_and_audits_outcome() {
    let pipeline = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/trigger-notification"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&pipeline)
        .await;

    let api = TestApi::spawn(Some(&pipeline.uri())).await;
    api.seed_event("e1", EventCategory::Silent, "2025-05-01T03:00:00+00:00");

    let response = api.post("/api/events/e1/trigger").send().await.unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["delivered"], true);

    let event = api.get("/api/events/e1").send().await.unwrap();
    let body: serde_json::Value = event.json().await.unwrap();
    assert_eq!(body["finalCategory"], "notify");
    assert_eq!(body["manuallyTriggered"], true);

    let audit = api.get("/api/audit?target=e1").send().await.unwrap();
    let entries: serde_json::Value = audit.json().await.unwrap();
    assert_eq!(entries[0]["action"], "NOTIFY_OVERRIDE");
    assert_eq!(entries[0]["after"]["pipelineOutcome"]["success"], true);
}

#[tokio::test]
async fn block_override_records_failure_outcome_when_pipeline_is_down() {
    let pipeline = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/block-notification"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&pipeline)
        .await;

    let api = TestApi::spawn(Some(&pipeline.uri())).await;
    api.seed_event("e1", EventCategory::Notify, "2025-05-01T03:00:00+00:00");

    let response = api.post("/api/events/e1/block").send().await.unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["cancelled"], false);

    let event = api.get("/api/events/e1").send().await.unwrap();
    let body: serde_json::Value = event.json().await.unwrap();
    assert_eq!(body["finalCategory"], "silent");
    assert_eq!(body["manuallyBlocked"], true);

    let audit = api.get("/api/audit?target=e1").send().await.unwrap();
    let entries: serde_json::Value = audit.json().await.unwrap();
    assert_eq!(entries[0]["after"]["pipelineOutcome"]["success"], false);
}

#[tokio::test]
async fn monthly_usage_requires_well_formed_month() {
    let api = TestApi::spawn(None).await;
    api.seed_event("e1", EventCategory::Notify, "2025-03-05T03:00:00+00:00");

    let report = api.get("/api/usage/monthly?month=2025-03").send().await.unwrap();
    assert_eq!(report.status(), 200);
    let body: serde_json::Value = report.json().await.unwrap();
    assert_eq!(body["month"], "2025-03");
    assert_eq!(body["calls"], 1);

    let malformed = api.get("/api/usage/monthly?month=march").send().await.unwrap();
    assert_eq!(malformed.status(), 400);

    let missing = api.get("/api/usage/monthly").send().await.unwrap();
    assert_eq!(missing.status(), 400);
}
