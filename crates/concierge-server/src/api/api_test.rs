use super::*;
use axum::body::{to_bytes, Body};
use axum::http::Request;
use chrono::Utc;
use concierge_core::{
    CatalogRecord, Clock, CuratedHotelRecord, CurationProfile, SeedRun, StreamLimits,
    SystemClock, VendorSettings,
};
use concierge_db::{CuratedStore, MemoryStore, RunStore};
use concierge_sync::{HotelVendor, SeedSettings, Seeder};
use concierge_vendor::VendorClient;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "operator-key";

fn test_state(vendor_url: &str, store: &Arc<MemoryStore>) -> AppState {
    let vendor: Arc<dyn HotelVendor> = Arc::new(
        VendorClient::new(&VendorSettings {
            base_url: vendor_url.to_string(),
            username: Some("svc".to_string()),
            password: Some("secret".to_string()),
            default_timeout_ms: 5_000,
            max_timeout_ms: 10_000,
            max_retries: 0,
            backoff_base_ms: 0,
            user_agent: "concierge-test/0.1".to_string(),
        })
        .expect("client"),
    );
    let stores = Stores::from_shared(Arc::clone(store));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let profile = CurationProfile {
        allowed_countries: vec!["FR".into()],
        target_cities: vec![],
        min_star_rating: None,
        require_coordinates: false,
        limit_per_group: 10,
        limit_total: 10,
        stream: StreamLimits {
            per_group_limit: 10,
            overall_limit: 10,
        },
    };
    let seeder = Arc::new(Seeder::new(
        Arc::clone(&vendor),
        stores.clone(),
        Arc::clone(&clock),
        profile,
        SeedSettings {
            catalog_ttl_hours: 24,
            details_ttl_hours: 24,
            budget_ms: 10_000,
            hard_timeout_ms: 5_000,
        },
    ));
    let trigger = Arc::new(SeedTrigger::new(
        seeder,
        stores.clone(),
        chrono::Duration::minutes(15),
    ));
    AppState {
        search: Arc::new(SearchOrchestrator::new(
            vendor,
            Arc::clone(&stores.search_logs),
            clock,
            true,
            vec!["GB".to_string()],
        )),
        curated: Arc::new(CuratedReader::new(stores.clone()).with_trigger(Arc::clone(&trigger))),
        trigger,
        stores,
    }
}

fn app(state: AppState) -> Router {
    build_app(state, AuthState::with_keys(vec![TOKEN.to_string()]))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&bytes).expect("json body")
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn mount_empty_catalog(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/hotels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"hotels": []})))
        .mount(server)
        .await;
}

#[test]
fn api_error_validation_error_maps_to_bad_request() {
    let response = ApiError::new("req-1", "validation_error", "invalid input").into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[test]
fn vendor_failures_map_to_gateway_statuses() {
    let timeout = ApiError::new("req-1", "timeout", "slow").into_response();
    assert_eq!(timeout.status(), StatusCode::GATEWAY_TIMEOUT);
    let upstream = ApiError::new("req-1", "server_error", "503").into_response();
    assert_eq!(upstream.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn health_reports_ok_and_echoes_request_id() {
    let server = MockServer::start().await;
    let store = Arc::new(MemoryStore::new());
    let response = app(test_state(&server.uri(), &store))
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .header("x-request-id", "req-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "req-42");
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "ok");
    assert_eq!(json["meta"]["request_id"], "req-42");
}

#[tokio::test]
async fn search_reports_fallback_nationality() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_partial_json(json!({"nationality": "FR"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": {"code": "NO_RESULTS", "message": "none"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_partial_json(json!({"nationality": "GB"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "tok-gb",
            "hotels": [{"id": "H1"}]
        })))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let response = app(test_state(&server.uri(), &store))
        .oneshot(post_json(
            "/api/v1/search",
            &json!({
                "hotelIds": ["H1"],
                "checkin": "2026-11-02",
                "checkout": "2026-11-05",
                "rooms": [{"adt": 2}],
                "nationality": "fr"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["count"], 1);
    assert_eq!(json["data"]["token"], "tok-gb");
    assert_eq!(json["data"]["usedNationality"], "GB");
    assert_eq!(json["data"]["fallbackHit"], true);
    assert_eq!(json["data"]["attempts"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn search_validates_body_before_calling_vendor() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let response = app(test_state(&server.uri(), &store))
        .oneshot(post_json(
            "/api/v1/search",
            &json!({
                "hotelIds": [],
                "checkin": "2026-11-02",
                "checkout": "2026-11-05",
                "rooms": [{"adt": 2}]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "validation_error");
}

#[tokio::test]
async fn search_surfaces_vendor_classification() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad dates"))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let response = app(test_state(&server.uri(), &store))
        .oneshot(post_json(
            "/api/v1/search",
            &json!({
                "hotelIds": ["H1"],
                "checkin": "2026-11-02",
                "checkout": "2026-11-05",
                "rooms": [{"adt": 2}],
                "nationality": "FR"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "bad_request");
    assert_eq!(json["error"]["upstream_status"], 400);
}

#[tokio::test]
async fn curated_pages_stored_hotels() {
    let server = MockServer::start().await;
    let store = Arc::new(MemoryStore::new());
    let hotels: Vec<_> = (0..3)
        .map(|i| {
            CuratedHotelRecord::from_catalog(
                CatalogRecord {
                    hotel_id: format!("H{i}"),
                    name: format!("Hotel {i}"),
                    country: Some("FR".to_string()),
                    ..CatalogRecord::default()
                },
                "test",
                Utc::now(),
            )
        })
        .collect();
    store.upsert_hotels(&hotels).await.unwrap();

    let response = app(test_state(&server.uri(), &store))
        .oneshot(
            Request::builder()
                .uri("/api/v1/curated?limit=2")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["hotels"].as_array().unwrap().len(), 2);
    assert_eq!(json["data"]["nextCursor"], "H1");
    assert_eq!(json["data"]["seeding"], false);
}

#[tokio::test]
async fn empty_curated_set_starts_seeding() {
    let server = MockServer::start().await;
    mount_empty_catalog(&server).await;
    let store = Arc::new(MemoryStore::new());

    let response = app(test_state(&server.uri(), &store))
        .oneshot(
            Request::builder()
                .uri("/api/v1/curated")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["hotels"], json!([]));
    assert_eq!(json["data"]["seeding"], true);
    assert_eq!(json["data"]["stage"], "queued");
}

#[tokio::test]
async fn seed_routes_require_bearer_token() {
    let server = MockServer::start().await;
    let store = Arc::new(MemoryStore::new());
    let response = app(test_state(&server.uri(), &store))
        .oneshot(post_json("/api/v1/seed", &json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn second_trigger_is_suppressed() {
    let server = MockServer::start().await;
    mount_empty_catalog(&server).await;
    let store = Arc::new(MemoryStore::new());
    let app = app(test_state(&server.uri(), &store));

    let authed = |body: Value| {
        let mut request = post_json("/api/v1/seed", &body);
        request.headers_mut().insert(
            header::AUTHORIZATION,
            format!("Bearer {TOKEN}").parse().unwrap(),
        );
        request
    };

    let first = app
        .clone()
        .oneshot(authed(json!({"mode": "streaming"})))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::ACCEPTED);
    let json = body_json(first).await;
    assert_eq!(json["data"]["started"], true);
    let run_id: uuid::Uuid = json["data"]["runId"].as_str().unwrap().parse().unwrap();
    assert!(store.get_run(run_id).await.unwrap().is_some());

    let second = app
        .oneshot(authed(json!({"mode": "buffered", "bypassCache": true})))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let json = body_json(second).await;
    assert_eq!(json["data"]["started"], false);
    let reason = json["data"]["reason"].as_str().unwrap();
    assert!(reason == "active_run" || reason == "cooldown", "{reason}");
}

#[tokio::test]
async fn run_status_by_id() {
    let server = MockServer::start().await;
    let store = Arc::new(MemoryStore::new());
    let run = SeedRun::queued("buffered", Utc::now());
    store.insert_run(&run).await.unwrap();
    let app = app(test_state(&server.uri(), &store));

    let get = |uri: String| {
        Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
            .body(Body::empty())
            .unwrap()
    };

    let found = app
        .clone()
        .oneshot(get(format!("/api/v1/seed/runs/{}", run.run_id)))
        .await
        .unwrap();
    assert_eq!(found.status(), StatusCode::OK);
    let json = body_json(found).await;
    assert_eq!(json["data"]["status"], "queued");

    let missing = app
        .oneshot(get(format!("/api/v1/seed/runs/{}", uuid::Uuid::new_v4())))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}
