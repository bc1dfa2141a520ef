use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::{app, ErrorBody, BINARY_BODY, CLIENT_ID, REMOVED_MESSAGE, SECRET};
use serde_json::Value;
use tower::ServiceExt;

const GOOD_CREDENTIALS: &str = "%7B%22username%22%3A%22plaid_test%22%2C%22password%22%3A%22plaid_good%22%7D";
const MFA_CREDENTIALS: &str = "%7B%22username%22%3A%22plaid_mfa%22%2C%22password%22%3A%22plaid_good%22%7D";
const BAD_CREDENTIALS: &str = "%7B%22username%22%3A%22plaid_test%22%2C%22password%22%3A%22wrong%22%7D";

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn form_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(body.to_string())
        .unwrap()
}

fn get_request(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

fn signed(fields: &str) -> String {
    format!("client_id={CLIENT_ID}&secret={SECRET}&{fields}")
}

/// Link the standard sandbox user and return its access token.
async fn link(app: &Router) -> String {
    let resp = app
        .clone()
        .oneshot(form_request(
            "POST",
            "/connect",
            &signed(&format!("credentials={GOOD_CREDENTIALS}&type=wells&email=a%40b.com")),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    body["access_token"].as_str().unwrap().to_string()
}

// --- connect ---

#[tokio::test]
async fn add_user_returns_accounts_and_transactions() {
    let app = app();
    let resp = app
        .oneshot(form_request(
            "POST",
            "/connect",
            &signed(&format!("credentials={GOOD_CREDENTIALS}&type=wells&email=a%40b.com")),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert!(body["access_token"].as_str().unwrap().starts_with("test_"));
    assert_eq!(body["accounts"].as_array().unwrap().len(), 2);
    assert_eq!(body["accounts"][0]["institution_type"], "wells");
    assert_eq!(body["transactions"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn add_user_with_wrong_client_secret_returns_401() {
    let app = app();
    let resp = app
        .oneshot(form_request(
            "POST",
            "/connect",
            &format!("client_id=test_id&secret=nope&credentials={GOOD_CREDENTIALS}&type=wells"),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let err: ErrorBody = body_json(resp).await;
    assert_eq!(err.code, 1100);
}

#[tokio::test]
async fn add_user_with_wrong_password_returns_402() {
    let app = app();
    let resp = app
        .oneshot(form_request(
            "POST",
            "/connect",
            &signed(&format!("credentials={BAD_CREDENTIALS}&type=wells")),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::PAYMENT_REQUIRED);
    let err: ErrorBody = body_json(resp).await;
    assert_eq!(err.code, 1200);
}

#[tokio::test]
async fn add_user_with_flat_credentials_returns_400() {
    let app = app();
    let resp = app
        .oneshot(form_request(
            "POST",
            "/connect",
            &signed("credentials=plaid_test&type=wells"),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn add_user_missing_type_returns_422() {
    let app = app();
    let resp = app
        .oneshot(form_request(
            "POST",
            "/connect",
            &signed(&format!("credentials={GOOD_CREDENTIALS}")),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// --- mfa ---

#[tokio::test]
async fn mfa_user_is_challenged_then_completes() {
    let app = app();
    let resp = app
        .clone()
        .oneshot(form_request(
            "POST",
            "/connect",
            &signed(&format!("credentials={MFA_CREDENTIALS}&type=bofa")),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = body_json(resp).await;
    assert_eq!(body["type"], "questions");
    let token = body["access_token"].as_str().unwrap().to_string();

    // Refresh is refused until the challenge is answered.
    let resp = app
        .clone()
        .oneshot(get_request(&format!("/connect?{}", signed(&format!("access_token={token}")))))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app
        .clone()
        .oneshot(form_request(
            "POST",
            "/connect/step",
            &signed(&format!("mfa=%22potato%22&access_token={token}")),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::PAYMENT_REQUIRED);

    let resp = app
        .clone()
        .oneshot(form_request(
            "POST",
            "/connect/step",
            &signed(&format!("mfa=%22tomato%22&access_token={token}")),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["accounts"][0]["institution_type"], "bofa");
}

#[tokio::test]
async fn mfa_with_unknown_token_returns_401() {
    let app = app();
    let resp = app
        .oneshot(form_request(
            "POST",
            "/connect/step",
            &signed("mfa=%22tomato%22&access_token=test_missing"),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let err: ErrorBody = body_json(resp).await;
    assert_eq!(err.code, 1105);
}

// --- refresh / patch / delete ---

#[tokio::test]
async fn refresh_reads_fields_from_query() {
    let app = app();
    let token = link(&app).await;
    let resp = app
        .oneshot(get_request(&format!("/connect?{}", signed(&format!("access_token={token}")))))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["access_token"], token.as_str());
}

#[tokio::test]
async fn patch_updates_credentials() {
    let app = app();
    let token = link(&app).await;

    let resp = app
        .clone()
        .oneshot(form_request(
            "PATCH",
            "/connect",
            &signed(&format!("credentials={BAD_CREDENTIALS}&access_token={token}")),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::PAYMENT_REQUIRED);

    let resp = app
        .oneshot(form_request(
            "PATCH",
            "/connect",
            &signed(&format!("credentials={GOOD_CREDENTIALS}&access_token={token}")),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn delete_removes_user() {
    let app = app();
    let token = link(&app).await;

    let resp = app
        .clone()
        .oneshot(form_request("DELETE", "/connect", &signed(&format!("access_token={token}"))))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["message"], REMOVED_MESSAGE);

    let resp = app
        .oneshot(form_request("DELETE", "/connect", &signed(&format!("access_token={token}"))))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- reference data ---

#[tokio::test]
async fn institutions_collection_and_single() {
    let app = app();
    let resp = app.clone().oneshot(get_request("/institutions")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let all: Vec<Value> = body_json(resp).await;
    assert_eq!(all.len(), 3);

    let id = all[1]["id"].as_str().unwrap().to_string();
    let resp = app.oneshot(get_request(&format!("/institutions/{id}"))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let one: Value = body_json(resp).await;
    assert_eq!(one["name"], "Wells Fargo");
}

#[tokio::test]
async fn unknown_category_returns_404() {
    let app = app();
    let resp = app.oneshot(get_request("/categories/99999999")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let err: ErrorBody = body_json(resp).await;
    assert_eq!(err.code, 1301);
}

#[tokio::test]
async fn entity_lookup_by_id() {
    let app = app();
    let resp = app
        .oneshot(get_request("/entities/526842af335228673f0ed5f2"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let entity: Value = body_json(resp).await;
    assert_eq!(entity["name"], "McDonald's");
}

#[tokio::test]
async fn malformed_route_is_not_json() {
    let app = app();
    let resp = app.oneshot(get_request("/malformed")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body_bytes(resp).await;
    assert!(serde_json::from_slice::<Value>(&bytes).is_err());
}

#[tokio::test]
async fn binary_routes_serve_invalid_utf8() {
    let app = app();
    let resp = app.clone().oneshot(get_request("/binary")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body_bytes(resp).await;
    assert_eq!(&bytes[..], &BINARY_BODY[..]);
    assert!(std::str::from_utf8(&bytes).is_err());

    let resp = app
        .oneshot(form_request("POST", "/binary-rejected", ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::PAYMENT_REQUIRED);
    assert_eq!(&body_bytes(resp).await[..], &BINARY_BODY[..]);
}
