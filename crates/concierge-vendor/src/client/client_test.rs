use super::*;
use serde_json::json;

fn settings(base_url: &str) -> VendorSettings {
    VendorSettings {
        base_url: base_url.to_string(),
        username: Some("svc".to_string()),
        password: Some("secret".to_string()),
        default_timeout_ms: 30_000,
        max_timeout_ms: 60_000,
        max_retries: 2,
        backoff_base_ms: 0,
        user_agent: "concierge-test/0.1".to_string(),
    }
}

fn test_client(base_url: &str) -> VendorClient {
    VendorClient::new(&settings(base_url)).expect("client construction should not fail")
}

#[test]
fn missing_credentials_is_config_error() {
    let mut s = settings("https://vendor.example/api");
    s.password = None;
    let err = VendorClient::new(&s).unwrap_err();
    assert_eq!(err.code(), "config_error");

    let mut s = settings("https://vendor.example/api");
    s.username = Some("  ".to_string());
    assert_eq!(VendorClient::new(&s).unwrap_err().code(), "config_error");
}

#[test]
fn invalid_base_url_is_config_error() {
    let err = VendorClient::new(&settings("not a url")).unwrap_err();
    assert!(matches!(err, VendorError::Config(_)));
}

#[test]
fn url_keeps_base_path_prefix() {
    let client = test_client("https://vendor.example/api/v3");
    assert_eq!(
        client.url(paths::SEARCH).unwrap().as_str(),
        "https://vendor.example/api/v3/search"
    );
    let client = test_client("https://vendor.example/api/v3/");
    assert_eq!(
        client.url("hotels").unwrap().as_str(),
        "https://vendor.example/api/v3/hotels"
    );
}

#[test]
fn explicit_timeout_wins() {
    let client = test_client("https://vendor.example");
    let options = RequestOptions::new()
        .json(json!({"timeout": 5}))
        .timeout_ms(1_234);
    assert_eq!(client.resolve_timeout_ms(&options), 1_234);
}

#[test]
fn payload_hint_is_used_and_capped() {
    let client = test_client("https://vendor.example");
    let hinted = RequestOptions::new().json(json!({"timeout": 12}));
    assert_eq!(client.resolve_timeout_ms(&hinted), 12_000);

    let huge = RequestOptions::new().json(json!({"timeout": 600}));
    assert_eq!(client.resolve_timeout_ms(&huge), 60_000);

    let text = RequestOptions::new().json(json!({"timeout": "7.5"}));
    assert_eq!(client.resolve_timeout_ms(&text), 7_500);
}

#[test]
fn default_timeout_without_hint() {
    let client = test_client("https://vendor.example");
    assert_eq!(client.resolve_timeout_ms(&RequestOptions::new()), 30_000);
    let zero = RequestOptions::new().json(json!({"timeout": 0}));
    assert_eq!(client.resolve_timeout_ms(&zero), 30_000);
}

#[test]
fn token_is_scoped_to_booking_paths() {
    assert_eq!(scoped_token(paths::BOOK, Some("t")), Some("t"));
    assert_eq!(scoped_token(paths::SEARCH, Some("t")), None);
    assert_eq!(scoped_token(paths::AVAILABILITY, Some("")), None);
}

#[test]
fn debug_output_redacts_password() {
    let rendered = format!("{:?}", test_client("https://vendor.example"));
    assert!(!rendered.contains("secret"));
}
