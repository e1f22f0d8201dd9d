// SPDX-License-Identifier: MIT

//! Shared test harness: in-memory store, a local HTTP server standing in
//! for the Mollie API, and request helpers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use course_api::config::Config;
use course_api::db::{MemoryStore, UserStore};
use course_api::middleware::auth::create_session_token;
use course_api::models::User;
use course_api::routes::create_router;
use course_api::services::{GoogleIdVerifier, MollieClient, PaymentOrchestrator};
use course_api::AppState;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Recorded state of the mock Mollie server.
#[derive(Default)]
pub struct MollieServerState {
    pub payments: Mutex<HashMap<String, Value>>,
    pub mandates: Mutex<Vec<Value>>,
    pub customer_requests: Mutex<Vec<Value>>,
    pub payment_requests: Mutex<Vec<Value>>,
    pub subscription_requests: Mutex<Vec<(String, Value)>>,
    pub cancellations: Mutex<Vec<(String, String)>>,
    pub fail_create_customer: Mutex<bool>,
    pub fail_cancel: Mutex<bool>,
}

/// Local axum server that impersonates the Mollie API.
pub struct MockMollie {
    pub base_url: String,
    pub state: Arc<MollieServerState>,
}

impl MockMollie {
    pub async fn spawn() -> Self {
        let state = Arc::new(MollieServerState::default());

        let router = Router::new()
            .route("/customers", post(create_customer))
            .route("/payments", post(create_payment))
            .route("/payments/{id}", get(get_payment))
            .route("/customers/{id}/mandates", get(list_mandates))
            .route("/customers/{id}/subscriptions", post(create_subscription))
            .route(
                "/customers/{customer_id}/subscriptions/{subscription_id}",
                delete(cancel_subscription),
            )
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock Mollie server");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    /// Seed a fetchable payment (transaction).
    #[allow(dead_code)]
    pub fn seed_payment(&self, id: &str, status: &str, sequence_type: &str, customer_id: &str) {
        self.state.payments.lock().unwrap().insert(
            id.to_string(),
            json!({
                "id": id,
                "status": status,
                "sequenceType": sequence_type,
                "customerId": customer_id,
            }),
        );
    }

    /// Seed a mandate with the given status.
    #[allow(dead_code)]
    pub fn seed_mandate(&self, status: &str) {
        self.state
            .mandates
            .lock()
            .unwrap()
            .push(json!({"id": "mdt_1", "status": status}));
    }
}

async fn create_customer(
    State(state): State<Arc<MollieServerState>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    if *state.fail_create_customer.lock().unwrap() {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    state.customer_requests.lock().unwrap().push(body);
    Ok(Json(json!({"id": "cst_1"})))
}

async fn create_payment(
    State(state): State<Arc<MollieServerState>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let payment = json!({
        "id": "tr_new",
        "status": "open",
        "sequenceType": body["sequenceType"],
        "customerId": body["customerId"],
        "_links": {"checkout": {"href": "https://checkout.mollie.test/tr_new"}},
    });
    state
        .payments
        .lock()
        .unwrap()
        .insert("tr_new".to_string(), payment.clone());
    state.payment_requests.lock().unwrap().push(body);
    Json(payment)
}

async fn get_payment(
    State(state): State<Arc<MollieServerState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    state
        .payments
        .lock()
        .unwrap()
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn list_mandates(
    State(state): State<Arc<MollieServerState>>,
    Path(_id): Path<String>,
) -> Json<Value> {
    let mandates = state.mandates.lock().unwrap().clone();
    Json(json!({"_embedded": {"mandates": mandates}}))
}

async fn create_subscription(
    State(state): State<Arc<MollieServerState>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    state.subscription_requests.lock().unwrap().push((id, body));
    Json(json!({"id": "sub_9"}))
}

async fn cancel_subscription(
    State(state): State<Arc<MollieServerState>>,
    Path((customer_id, subscription_id)): Path<(String, String)>,
) -> StatusCode {
    if *state.fail_cancel.lock().unwrap() {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    state
        .cancellations
        .lock()
        .unwrap()
        .push((customer_id, subscription_id));
    StatusCode::NO_CONTENT
}

/// A router wired to an in-memory store and a mock Mollie server, with
/// handles kept for assertions.
pub struct TestApp {
    pub app: Router,
    pub store: Arc<MemoryStore>,
    pub mollie: MockMollie,
    pub config: Config,
}

#[allow(dead_code)]
pub async fn create_test_app() -> TestApp {
    let mollie_server = MockMollie::spawn().await;

    let mut config = Config::test_default();
    config.mollie_api_url = mollie_server.base_url.clone();

    let store = Arc::new(MemoryStore::new());
    let dyn_store: Arc<dyn UserStore> = store.clone();

    let client = MollieClient::new(config.mollie_api_url.clone(), config.mollie_api_key.clone());
    let payments = PaymentOrchestrator::new(dyn_store.clone(), client.clone(), &config);
    let google_verifier =
        Arc::new(GoogleIdVerifier::new(&config).expect("identity verifier should build"));

    let state = Arc::new(AppState {
        config: config.clone(),
        store: dyn_store,
        mollie: client,
        google_verifier,
        payments,
    });

    TestApp {
        app: create_router(state),
        store,
        mollie: mollie_server,
        config,
    }
}

/// Cookie header value carrying a fresh session for `user`.
#[allow(dead_code)]
pub fn session_cookie_for(user: &User, config: &Config) -> String {
    let token = create_session_token(user, &config.jwt_secret).expect("session token");
    format!("jwt={token}")
}

/// Location header of a response, as a string.
#[allow(dead_code)]
pub fn location_of(response: &axum::response::Response) -> String {
    response
        .headers()
        .get(axum::http::header::LOCATION)
        .expect("missing Location header")
        .to_str()
        .unwrap()
        .to_string()
}

/// The `jwt` cookie value from a Set-Cookie header, if present.
#[allow(dead_code)]
pub fn session_cookie_of(response: &axum::response::Response) -> Option<String> {
    let header = response
        .headers()
        .get(axum::http::header::SET_COOKIE)?
        .to_str()
        .ok()?;
    let value = header.strip_prefix("jwt=")?;
    Some(value.split(';').next().unwrap_or_default().to_string())
}
