//! Shared wiring for end-to-end HTTP tests over the in-memory store.

#![allow(dead_code, reason = "each test binary uses a different subset of helpers")]

use std::sync::Arc;

use actix_http::Request;
use actix_web::body::BoxBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{test, web};
use chrono::{DateTime, TimeZone, Utc};
use mockable::Clock;
use serde_json::{Value, json};

use zimbeat_backend::config::{AppSettings, SecretSettings};
use zimbeat_backend::domain::{Question, QuestionId, SecretKey};
use zimbeat_backend::inbound::http::health::HealthState;
use zimbeat_backend::outbound::memory::InMemoryStore;
use zimbeat_backend::server::{AppDependencies, ServerConfig, build_app, build_http_state};
use zimbeat_backend::test_support::{
    MutableClock, RecordingBackgroundTasks, ScriptedChainIndexer, signed_identity_assertion,
};

pub const BOT_TOKEN: &str = "777000:integration-bot-token";
pub const TREASURY: &str = "EQTreasuryIntegrationAddress";

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0)
        .single()
        .expect("valid timestamp")
}

/// Collaborators a test can poke while the app runs.
pub struct Pipeline {
    pub clock: Arc<MutableClock>,
    pub store: Arc<InMemoryStore>,
    pub indexer: Arc<ScriptedChainIndexer>,
    pub tasks: Arc<RecordingBackgroundTasks>,
    pub deps: AppDependencies,
}

pub fn pipeline() -> Pipeline {
    let clock = Arc::new(MutableClock::new(start_time()));
    let store = Arc::new(InMemoryStore::default());
    let indexer = Arc::new(ScriptedChainIndexer::default());
    let tasks = Arc::new(RecordingBackgroundTasks::default());

    let settings = AppSettings {
        treasury_address: Some(TREASURY.to_owned()),
        ..AppSettings::default()
    };
    let secrets = SecretSettings {
        bot_token: SecretKey::from(BOT_TOKEN),
        session_secret: SecretKey::from("integration-session-secret-0123456789"),
        claim_secret: SecretKey::from("integration-claim-secret-0123456789ab"),
        chain_api_key: None,
    };
    let config = ServerConfig::new("127.0.0.1:0".parse().expect("socket address"), settings, secrets)
        .with_memory_store(store.clone())
        .with_chain_indexer(indexer.clone())
        .with_clock(clock.clone())
        .with_background_tasks(tasks.clone());
    let http_state = build_http_state(&config).expect("http state builds");

    let health = HealthState::new();
    health.mark_ready();
    Pipeline {
        clock,
        store,
        indexer,
        tasks,
        deps: AppDependencies {
            health_state: web::Data::new(health),
            http_state: web::Data::new(http_state),
        },
    }
}

impl Pipeline {
    pub async fn app(
        &self,
    ) -> impl Service<Request, Response = ServiceResponse<BoxBody>, Error = actix_web::Error> {
        test::init_service(build_app(self.deps.clone())).await
    }

    pub fn seed_question(&self, id: &str, correct: u32, duration_secs: u32, reward: u64) {
        self.store.put_question(Question {
            id: QuestionId::new(id).expect("question id"),
            correct_option_index: correct,
            media_duration_secs: duration_secs,
            reward_amount: reward,
        });
    }

    /// A freshly signed identity assertion for `host_user_id`.
    pub fn init_data(&self, host_user_id: i64) -> String {
        let user = format!(r#"{{"id":{host_user_id},"first_name":"Ada","username":"ada"}}"#);
        signed_identity_assertion(
            BOT_TOKEN,
            &[
                ("auth_date", &self.clock.utc().timestamp().to_string()),
                ("user", &user),
            ],
        )
    }
}

/// POST `body` to `uri`, optionally with a bearer token.
pub async fn post_json<S>(
    app: &S,
    uri: &str,
    bearer: Option<&str>,
    body: Value,
) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<BoxBody>, Error = actix_web::Error>,
{
    let mut request = test::TestRequest::post().uri(uri).set_json(body);
    if let Some(token) = bearer {
        request = request.insert_header((AUTHORIZATION, format!("Bearer {token}")));
    }
    let response = test::call_service(app, request.to_request()).await;
    let status = response.status();
    let bytes = test::read_body(response).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("JSON body")
    };
    (status, value)
}

/// Run the handshake and return the access token.
pub async fn authenticate<S>(app: &S, init_data: String) -> String
where
    S: Service<Request, Response = ServiceResponse<BoxBody>, Error = actix_web::Error>,
{
    let (status, body) = post_json(app, "/auth", None, json!({ "initData": init_data })).await;
    assert_eq!(status, StatusCode::OK, "handshake failed: {body}");
    body["accessToken"]
        .as_str()
        .expect("access token")
        .to_owned()
}
