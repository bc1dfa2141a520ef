//! In-memory imitation of Plaid's connect and reference-data endpoints.
//!
//! Uses the sandbox conventions: `test_id` / `test_secret` authenticate,
//! `plaid_good` is the only accepted bank password, the `plaid_mfa` user is
//! challenged with a question whose answer is `tomato`.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const CLIENT_ID: &str = "test_id";
pub const SECRET: &str = "test_secret";
pub const GOOD_PASSWORD: &str = "plaid_good";
pub const MFA_USERNAME: &str = "plaid_mfa";
pub const MFA_ANSWER: &str = "tomato";
pub const REMOVED_MESSAGE: &str = "Successfully removed from system";
/// Body served by the `/binary` routes: not UTF-8, let alone JSON.
pub const BINARY_BODY: [u8; 4] = [0xff, 0xfe, b'{', b'}'];

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Balance {
    pub available: f64,
    pub current: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Account {
    #[serde(rename = "_id")]
    pub id: String,
    pub institution_type: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub balance: Balance,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_account")]
    pub account: String,
    pub amount: f64,
    pub name: String,
    pub date: String,
}

/// Plaid-style error body.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
    pub resolve: String,
}

#[derive(Deserialize)]
struct BankCredentials {
    username: String,
    password: String,
}

#[derive(Clone, Debug)]
struct User {
    institution: String,
    mfa_pending: bool,
}

type Db = Arc<RwLock<HashMap<String, User>>>;

#[derive(Deserialize)]
pub struct ConnectForm {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub secret: String,
    pub credentials: String,
    #[serde(rename = "type")]
    pub institution: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Deserialize)]
pub struct StepForm {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub secret: String,
    pub mfa: String,
    pub access_token: String,
}

#[derive(Deserialize)]
pub struct TokenForm {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub secret: String,
    pub access_token: String,
}

#[derive(Deserialize)]
pub struct PatchForm {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub secret: String,
    pub credentials: String,
    pub access_token: String,
}

/// A rejected request, rendered as `status` plus an `ErrorBody`.
#[derive(Debug)]
pub struct Failure {
    status: StatusCode,
    body: ErrorBody,
}

impl Failure {
    fn new(status: StatusCode, code: u16, message: &str, resolve: &str) -> Self {
        Self {
            status,
            body: ErrorBody {
                code,
                message: message.to_string(),
                resolve: resolve.to_string(),
            },
        }
    }

    fn bad_credentials() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            1100,
            "invalid client_id or secret",
            "Check the client_id and secret you are using.",
        )
    }

    fn bad_token() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            1105,
            "bad access_token",
            "This access_token appears to be corrupted.",
        )
    }

    fn malformed_credentials() -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            1000,
            "credentials must be a JSON object",
            "Send credentials as {\"username\":..,\"password\":..}.",
        )
    }

    fn wrong_password() -> Self {
        Self::new(
            StatusCode::PAYMENT_REQUIRED,
            1200,
            "invalid credentials",
            "The username or password provided were not correct.",
        )
    }

    fn wrong_mfa() -> Self {
        Self::new(
            StatusCode::PAYMENT_REQUIRED,
            1203,
            "invalid mfa",
            "The MFA response provided was not correct.",
        )
    }

    fn not_found(what: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            1301,
            &format!("{what} not found"),
            "Check the id you are using.",
        )
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route(
            "/connect",
            post(add_user)
                .get(refresh_user)
                .patch(update_user)
                .delete(delete_user),
        )
        .route("/connect/step", post(submit_mfa))
        .route("/entities/{id}", get(get_entity))
        .route("/institutions", get(list_institutions))
        .route("/institutions/{id}", get(get_institution))
        .route("/categories", get(list_categories))
        .route("/categories/{id}", get(get_category))
        .route("/malformed", get(malformed))
        .route("/binary", get(binary))
        .route("/binary-rejected", post(binary_rejected))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn authenticate(client_id: &str, secret: &str) -> Result<(), Failure> {
    if client_id == CLIENT_ID && secret == SECRET {
        Ok(())
    } else {
        tracing::warn!(client_id, "rejected client credentials");
        Err(Failure::bad_credentials())
    }
}

fn decode_credentials(raw: &str) -> Result<BankCredentials, Failure> {
    serde_json::from_str(raw).map_err(|_| Failure::malformed_credentials())
}

/// The sandbox accepts the answer on its own or anywhere in a list.
fn mfa_answered(raw: &str) -> bool {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::String(answer)) => answer == MFA_ANSWER,
        Ok(Value::Array(answers)) => answers.iter().any(|a| a == MFA_ANSWER),
        _ => raw == MFA_ANSWER,
    }
}

pub fn sample_accounts(institution: &str) -> Vec<Account> {
    vec![
        Account {
            id: "QPO8Jo8vdDHMepg41PBwckXm4KdK1yUdmXOwK".to_string(),
            institution_type: institution.to_string(),
            kind: "depository".to_string(),
            balance: Balance {
                available: 1203.42,
                current: 1274.93,
            },
        },
        Account {
            id: "nban4wnPKEtnmEpaKzbYFYQvA7D7pnCaeDBMy".to_string(),
            institution_type: institution.to_string(),
            kind: "credit".to_string(),
            balance: Balance {
                available: 7205.23,
                current: 9930.0,
            },
        },
    ]
}

pub fn sample_transactions() -> Vec<Transaction> {
    vec![
        Transaction {
            id: "0AZ0De04KqsreDgVwM1RSRYjyd8yXxSDQ8Zxn".to_string(),
            account: "QPO8Jo8vdDHMepg41PBwckXm4KdK1yUdmXOwK".to_string(),
            amount: 200.0,
            name: "ATM Withdrawal".to_string(),
            date: "2014-07-21".to_string(),
        },
        Transaction {
            id: "1vAj1Eja5BIn4R7V6Mp1hBPQgkryZRHryZ0rDY".to_string(),
            account: "nban4wnPKEtnmEpaKzbYFYQvA7D7pnCaeDBMy".to_string(),
            amount: 3.19,
            name: "Gregorys Coffee".to_string(),
            date: "2014-07-14".to_string(),
        },
    ]
}

fn connected(access_token: &str, institution: &str) -> Json<Value> {
    Json(json!({
        "access_token": access_token,
        "accounts": sample_accounts(institution),
        "transactions": sample_transactions(),
    }))
}

async fn add_user(
    State(db): State<Db>,
    Form(input): Form<ConnectForm>,
) -> Result<(StatusCode, Json<Value>), Failure> {
    authenticate(&input.client_id, &input.secret)?;
    let credentials = decode_credentials(&input.credentials)?;
    if credentials.password != GOOD_PASSWORD {
        return Err(Failure::wrong_password());
    }

    let access_token = format!("test_{}", Uuid::new_v4().simple());
    let mfa_pending = credentials.username == MFA_USERNAME;
    tracing::info!(institution = %input.institution, email = %input.email, mfa_pending, "linked user");
    db.write().await.insert(
        access_token.clone(),
        User {
            institution: input.institution.clone(),
            mfa_pending,
        },
    );

    if mfa_pending {
        return Ok((
            StatusCode::CREATED,
            Json(json!({
                "type": "questions",
                "mfa": [{"question": "You say tomato, I say...?"}],
                "access_token": access_token,
            })),
        ));
    }
    Ok((StatusCode::OK, connected(&access_token, &input.institution)))
}

async fn submit_mfa(
    State(db): State<Db>,
    Form(input): Form<StepForm>,
) -> Result<Json<Value>, Failure> {
    authenticate(&input.client_id, &input.secret)?;
    let mut users = db.write().await;
    let user = users.get_mut(&input.access_token).ok_or_else(Failure::bad_token)?;
    if !mfa_answered(&input.mfa) {
        return Err(Failure::wrong_mfa());
    }
    user.mfa_pending = false;
    Ok(connected(&input.access_token, &user.institution))
}

async fn refresh_user(
    State(db): State<Db>,
    Form(input): Form<TokenForm>,
) -> Result<Json<Value>, Failure> {
    authenticate(&input.client_id, &input.secret)?;
    let users = db.read().await;
    match users.get(&input.access_token) {
        Some(user) if !user.mfa_pending => Ok(connected(&input.access_token, &user.institution)),
        _ => Err(Failure::bad_token()),
    }
}

async fn update_user(
    State(db): State<Db>,
    Form(input): Form<PatchForm>,
) -> Result<Json<Value>, Failure> {
    authenticate(&input.client_id, &input.secret)?;
    let credentials = decode_credentials(&input.credentials)?;
    let mut users = db.write().await;
    let user = users.get_mut(&input.access_token).ok_or_else(Failure::bad_token)?;
    if credentials.password != GOOD_PASSWORD {
        return Err(Failure::wrong_password());
    }
    tracing::info!(institution = %user.institution, "updated user credentials");
    Ok(connected(&input.access_token, &user.institution))
}

async fn delete_user(
    State(db): State<Db>,
    Form(input): Form<TokenForm>,
) -> Result<Json<Value>, Failure> {
    authenticate(&input.client_id, &input.secret)?;
    db.write()
        .await
        .remove(&input.access_token)
        .map(|_| Json(json!({ "message": REMOVED_MESSAGE })))
        .ok_or_else(Failure::bad_token)
}

fn entities() -> Vec<Value> {
    vec![json!({
        "_id": "526842af335228673f0ed5f2",
        "name": "McDonald's",
        "type": "place",
        "category": "13005000",
    })]
}

fn institutions() -> Vec<Value> {
    vec![
        json!({"id": "5301a93ac140de84910000e0", "name": "Bank of America", "type": "bofa", "has_mfa": true}),
        json!({"id": "5301a9d704977c52b60000db", "name": "Wells Fargo", "type": "wells", "has_mfa": false}),
        json!({"id": "5301a99504977c52b60000d0", "name": "Chase", "type": "chase", "has_mfa": true}),
    ]
}

fn categories() -> Vec<Value> {
    vec![
        json!({"id": "13001000", "type": "place", "hierarchy": ["Food and Drink", "Bar"]}),
        json!({"id": "13005000", "type": "place", "hierarchy": ["Food and Drink", "Restaurants"]}),
        json!({"id": "21001000", "type": "special", "hierarchy": ["Transfer", "Cash"]}),
    ]
}

fn find(items: Vec<Value>, key: &str, id: &str) -> Option<Value> {
    items.into_iter().find(|item| item[key] == id)
}

async fn get_entity(Path(id): Path<String>) -> Result<Json<Value>, Failure> {
    find(entities(), "_id", &id)
        .map(Json)
        .ok_or_else(|| Failure::not_found("entity"))
}

async fn list_institutions() -> Json<Vec<Value>> {
    Json(institutions())
}

async fn get_institution(Path(id): Path<String>) -> Result<Json<Value>, Failure> {
    find(institutions(), "id", &id)
        .map(Json)
        .ok_or_else(|| Failure::not_found("institution"))
}

async fn list_categories() -> Json<Vec<Value>> {
    Json(categories())
}

async fn get_category(Path(id): Path<String>) -> Result<Json<Value>, Failure> {
    find(categories(), "id", &id)
        .map(Json)
        .ok_or_else(|| Failure::not_found("category"))
}

async fn malformed() -> &'static str {
    "<html><body>Service Unavailable</body></html>"
}

async fn binary() -> Vec<u8> {
    BINARY_BODY.to_vec()
}

async fn binary_rejected() -> (StatusCode, Vec<u8>) {
    (StatusCode::PAYMENT_REQUIRED, BINARY_BODY.to_vec())
}
