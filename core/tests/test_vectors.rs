//! Verify build/parse methods against JSON test vectors stored in `test-vectors/`.
//!
//! Request fields are compared after form decoding, and JSON-valued fields
//! (`credentials`, `mfa`) after a second JSON decode, so field ordering and
//! percent-encoding choices do not cause false negatives.

use std::collections::BTreeMap;

use plaid_core::{ClientConfig, HttpMethod, HttpRequest, HttpResponse, PlaidClient, PlaidError};
use serde_json::Value;

fn client() -> PlaidClient {
    PlaidClient::new(ClientConfig::test())
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PATCH" => HttpMethod::Patch,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn arg(args: &[Value], i: usize) -> &str {
    args[i].as_str().unwrap()
}

fn build(c: &PlaidClient, operation: &str, args: &[Value]) -> HttpRequest {
    match operation {
        "add_user" => c.build_add_user(arg(args, 0), arg(args, 1), arg(args, 2), arg(args, 3)),
        "submit_mfa" => c.build_submit_mfa(&args[0], arg(args, 1)).unwrap(),
        "refresh_user" => c.build_refresh_user(arg(args, 0)),
        "update_user_credentials" => {
            c.build_update_user_credentials(arg(args, 0), arg(args, 1), arg(args, 2))
        }
        "delete_user" => c.build_delete_user(arg(args, 0)),
        "get_entity" => c.build_get_entity(arg(args, 0)),
        "get_institution" => c.build_get_institution(args[0].as_str()),
        "get_category" => c.build_get_category(args[0].as_str()),
        other => panic!("unknown operation: {other}"),
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[test]
fn request_test_vectors() {
    let raw = include_str!("../../test-vectors/requests.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();
    let base_url = vectors["base_url"].as_str().unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let args = case["args"].as_array().unwrap();
        let expected = &case["expected_request"];

        let req = build(&c, case["operation"].as_str().unwrap(), args);
        assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");

        let endpoint = req.url.split('?').next().unwrap();
        assert_eq!(
            endpoint,
            format!("{base_url}{}", expected["path"].as_str().unwrap()),
            "{name}: url"
        );
        if req.method != HttpMethod::Get {
            assert!(req.body.is_some(), "{name}: body");
        }

        let actual: BTreeMap<String, String> = req.fields().into_iter().collect();
        let json_fields = expected["json_fields"].as_object().unwrap();

        let mut plain = BTreeMap::new();
        for (key, value) in expected["fields"].as_object().unwrap() {
            plain.insert(key.clone(), value.as_str().unwrap().to_string());
        }
        let actual_plain: BTreeMap<String, String> = actual
            .iter()
            .filter(|(key, _)| !json_fields.contains_key(key.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        assert_eq!(actual_plain, plain, "{name}: fields");

        for (key, expected_json) in json_fields {
            let raw = actual.get(key).unwrap_or_else(|| panic!("{name}: missing {key}"));
            let decoded: Value = serde_json::from_str(raw).unwrap();
            assert_eq!(&decoded, expected_json, "{name}: {key}");
        }
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[test]
fn response_test_vectors() {
    let raw = include_str!("../../test-vectors/responses.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let sim = &case["simulated_response"];
        let response = HttpResponse {
            status: sim["status"].as_u64().unwrap() as u16,
            headers: Vec::new(),
            body: sim["body"].as_str().unwrap().as_bytes().to_vec(),
        };

        let result = c.parse_response(response);
        match case["expected_error"].as_str() {
            None => assert_eq!(result.unwrap(), case["expected_result"], "{name}: parsed result"),
            Some(kind) => {
                let err = result.unwrap_err();
                let matched = match kind {
                    "http_error" => matches!(err, PlaidError::HttpError { .. }),
                    "not_found" => matches!(err, PlaidError::NotFound),
                    "decode" => matches!(err, PlaidError::Decode(_)),
                    other => panic!("unknown error kind: {other}"),
                };
                assert!(matched, "{name}: expected {kind}, got {err:?}");
            }
        }
    }
}
