//! Request builder, response parser and round-trip driver for the Plaid API.
//!
//! # Design
//! Every operation exists twice: a pure `build_*` method that assembles an
//! `HttpRequest` from the immutable `ClientConfig`, and a method of the same
//! name that sends it through the client's `Transport` and returns the
//! decoded JSON. Callers that own their own HTTP stack use `build_*` plus
//! `parse_response`; everyone else calls the operation directly.
//!
//! All payload-carrying requests are signed with `client_id` and `secret`.
//! GET sends its fields as a query string, the other verbs as a form body.

use serde::Serialize;

use crate::config::{ClientConfig, Settings};
use crate::error::PlaidError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, FORM_CONTENT_TYPE};
use crate::retry::RetryConfig;
use crate::transport::{Transport, UreqTransport};
use crate::types::{Credentials, RequestPayload, Response};

/// Synchronous client for Plaid's connect and reference-data endpoints.
#[derive(Debug, Clone)]
pub struct PlaidClient<T = UreqTransport> {
    config: ClientConfig,
    transport: T,
    retry: RetryConfig,
}

impl PlaidClient<UreqTransport> {
    /// Client using the blocking ureq transport with the config's timeout.
    pub fn new(config: ClientConfig) -> Self {
        let transport = UreqTransport::new(config.timeout());
        Self::with_transport(config, transport)
    }

    pub fn from_settings(settings: Settings) -> Result<Self, PlaidError> {
        Ok(Self::new(settings.into_config()?))
    }
}

impl<T> PlaidClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Assemble a request against `base_url + path`, signing `data` if present.
    pub fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        data: Option<RequestPayload>,
    ) -> HttpRequest {
        let mut url = format!("{}{}", self.config.base_url(), path);

        let Some(mut payload) = data else {
            return HttpRequest {
                method,
                url,
                headers: Vec::new(),
                body: None,
            };
        };
        payload.insert("client_id", self.config.client_id());
        payload.insert("secret", self.config.secret());

        match method {
            HttpMethod::Get => {
                url.push('?');
                url.push_str(&payload.encode());
                HttpRequest {
                    method,
                    url,
                    headers: Vec::new(),
                    body: None,
                }
            }
            HttpMethod::Post | HttpMethod::Patch | HttpMethod::Delete => HttpRequest {
                method,
                url,
                headers: vec![("content-type".to_string(), FORM_CONTENT_TYPE.to_string())],
                body: Some(payload.encode()),
            },
        }
    }

    pub fn build_add_user(&self, username: &str, password: &str, kind: &str, email: &str) -> HttpRequest {
        let payload = RequestPayload::new()
            .with("credentials", Credentials::new(username, password).to_json())
            .with("type", kind)
            .with("email", email);
        self.build_request(HttpMethod::Post, "connect", Some(payload))
    }

    /// `answers` may be a single string, a list or an object; it is sent JSON-encoded.
    pub fn build_submit_mfa<A>(&self, answers: &A, access_token: &str) -> Result<HttpRequest, PlaidError>
    where
        A: Serialize + ?Sized,
    {
        let mfa = serde_json::to_string(answers).map_err(|e| PlaidError::Encode(e.to_string()))?;
        let payload = RequestPayload::new()
            .with("mfa", mfa)
            .with("access_token", access_token);
        Ok(self.build_request(HttpMethod::Post, "connect/step", Some(payload)))
    }

    pub fn build_refresh_user(&self, access_token: &str) -> HttpRequest {
        let payload = RequestPayload::new().with("access_token", access_token);
        self.build_request(HttpMethod::Get, "connect", Some(payload))
    }

    pub fn build_update_user_credentials(
        &self,
        username: &str,
        password: &str,
        access_token: &str,
    ) -> HttpRequest {
        let payload = RequestPayload::new()
            .with("credentials", Credentials::new(username, password).to_json())
            .with("access_token", access_token);
        self.build_request(HttpMethod::Patch, "connect", Some(payload))
    }

    pub fn build_delete_user(&self, access_token: &str) -> HttpRequest {
        let payload = RequestPayload::new().with("access_token", access_token);
        self.build_request(HttpMethod::Delete, "connect", Some(payload))
    }

    pub fn build_get_entity(&self, id: &str) -> HttpRequest {
        self.build_request(HttpMethod::Get, &format!("entities/{id}"), None)
    }

    pub fn build_get_institution(&self, id: Option<&str>) -> HttpRequest {
        self.build_request(HttpMethod::Get, &resource_path("institutions", id), None)
    }

    pub fn build_get_category(&self, id: Option<&str>) -> HttpRequest {
        self.build_request(HttpMethod::Get, &resource_path("categories", id), None)
    }

    /// Check the status and decode the body as JSON. Bytes that are not
    /// UTF-8 are a decode failure like any other malformed body.
    pub fn parse_response(&self, response: HttpResponse) -> Result<Response, PlaidError> {
        check_status(&response)?;
        serde_json::from_slice(&response.body).map_err(|e| PlaidError::Decode(e.to_string()))
    }
}

impl<T: Transport> PlaidClient<T> {
    /// Link a bank account. May answer with an MFA challenge instead of accounts.
    pub fn add_user(&self, username: &str, password: &str, kind: &str, email: &str) -> Result<Response, PlaidError> {
        self.execute(&self.build_add_user(username, password, kind, email))
    }

    pub fn submit_mfa<A>(&self, answers: &A, access_token: &str) -> Result<Response, PlaidError>
    where
        A: Serialize + ?Sized,
    {
        self.execute(&self.build_submit_mfa(answers, access_token)?)
    }

    /// Fetch the latest accounts and transactions for a linked user.
    pub fn refresh_user(&self, access_token: &str) -> Result<Response, PlaidError> {
        self.execute(&self.build_refresh_user(access_token))
    }

    pub fn update_user_credentials(
        &self,
        username: &str,
        password: &str,
        access_token: &str,
    ) -> Result<Response, PlaidError> {
        self.execute(&self.build_update_user_credentials(username, password, access_token))
    }

    pub fn delete_user(&self, access_token: &str) -> Result<Response, PlaidError> {
        self.execute(&self.build_delete_user(access_token))
    }

    pub fn get_entity(&self, id: &str) -> Result<Response, PlaidError> {
        self.execute(&self.build_get_entity(id))
    }

    /// All institutions when `id` is `None`, otherwise a single one.
    pub fn get_institution(&self, id: Option<&str>) -> Result<Response, PlaidError> {
        self.execute(&self.build_get_institution(id))
    }

    /// All categories when `id` is `None`, otherwise a single one.
    pub fn get_category(&self, id: Option<&str>) -> Result<Response, PlaidError> {
        self.execute(&self.build_get_category(id))
    }

    /// Build, transmit and decode a request in one step.
    pub fn send(
        &self,
        method: HttpMethod,
        path: &str,
        data: Option<RequestPayload>,
    ) -> Result<Response, PlaidError> {
        self.execute(&self.build_request(method, path, data))
    }

    fn execute(&self, request: &HttpRequest) -> Result<Response, PlaidError> {
        // The query string of a GET carries the secret; keep it out of logs.
        let endpoint = request.url.split('?').next().unwrap_or_default();
        let max_retries = if request.method.is_idempotent() {
            self.retry.max_retries
        } else {
            0
        };

        let mut attempt = 0;
        loop {
            tracing::debug!(method = request.method.as_str(), endpoint, attempt, "sending Plaid request");
            let result = self
                .transport
                .execute(request)
                .and_then(|response| self.parse_response(response));

            match result {
                Err(err) if attempt < max_retries && err.is_transient(&self.retry.retryable_statuses) => {
                    let delay = self.retry.delay_for_attempt(attempt);
                    tracing::warn!(
                        endpoint,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Plaid request failed, retrying"
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(err) => {
                    tracing::debug!(method = request.method.as_str(), endpoint, error = %err, "Plaid request failed");
                    return Err(err);
                }
                ok => return ok,
            }
        }
    }
}

/// `collection` alone, or `collection/id`. An empty id counts as absent.
fn resource_path(collection: &str, id: Option<&str>) -> String {
    match id {
        Some(id) if !id.is_empty() => format!("{collection}/{id}"),
        _ => collection.to_string(),
    }
}

fn check_status(response: &HttpResponse) -> Result<(), PlaidError> {
    if response.is_success() {
        return Ok(());
    }
    if response.status == 404 {
        return Err(PlaidError::NotFound);
    }
    Err(PlaidError::HttpError {
        status: response.status,
        body: response.text().into_owned(),
    })
}
