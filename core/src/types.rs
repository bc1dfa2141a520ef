//! Request-side types for the Plaid API.
//!
//! # Design
//! Plaid's legacy connect endpoints take flat key-value fields. Structured
//! values such as bank credentials and MFA answers are JSON-encoded into a
//! single field rather than spread across several, so `RequestPayload` is a
//! plain ordered list of string pairs.

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// Decoded JSON returned by every public operation.
pub type Response = serde_json::Value;

/// Bank login credentials, sent JSON-encoded under the `credentials` field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::json!({
            "username": self.username,
            "password": self.password,
        })
        .to_string()
    }
}

/// Ordered field name to value mapping sent with a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestPayload {
    fields: Vec<(String, String)>,
}

impl RequestPayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style `insert`.
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set a field, replacing any earlier value under the same name.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(key, _)| key == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// `application/x-www-form-urlencoded` rendering, also used as a query string.
    pub fn encode(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (name, value) in &self.fields {
            serializer.append_pair(name, value);
        }
        serializer.finish()
    }
}
