// HTTP client tests against a local stub of the simulation service and geocoder

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::extract::Query;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use impactmap::geocoding::Geocoder;
use impactmap::input_model::{build_payload, CatalogFields, FormFields, ManualFields};
use impactmap::simulation_client::ImpactSimulator;
use impactmap::{
    ClientError, HeadlessMap, ImpactApp, InputMode, ManualScheduler, NominatimClient,
    SimulationClient, Workspace,
};

// =============================================================================
// STUB SERVER
// =============================================================================

async fn simulate(Json(body): Json<Value>) -> Response {
    if body.get("neo_id").and_then(Value::as_str) == Some("0000000") {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "Asteroid not found"})),
        )
            .into_response();
    }

    let diameter = body.get("diameter_m").and_then(Value::as_f64).unwrap_or(50.0);
    let name = body
        .get("name")
        .or_else(|| body.get("neo_id"))
        .cloned()
        .unwrap_or(Value::Null);
    let outer = diameter * 40.0;

    Json(json!({
        "meta": {"name": name, "units": "SI", "source": "stub"},
        "kpis": {"energy_mt": diameter / 10.0, "crater_radius_m": diameter * 2.0},
        "rings_m": {"1psi": outer, "3psi": outer * 0.5, "5psi": outer * 0.3, "10psi": outer * 0.2},
        "geojson": {
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"kind": "crater", "label": "crater"},
                 "geometry": {"type": "Polygon", "coordinates": [[[-98.01, 38.99], [-97.99, 38.99], [-97.99, 39.01], [-98.01, 38.99]]]}},
                {"type": "Feature", "properties": {"kind": "overpressure", "label": "1psi"},
                 "geometry": {"type": "Polygon", "coordinates": [[[-98.3, 38.7], [-97.7, 38.7], [-97.7, 39.3], [-98.3, 38.7]]]}}
            ]
        },
        "time_series": [
            {"time_sec": 0, "shockwave_radius_km": 0.0, "crater_diameter_km": 0.0},
            {"time_sec": 1, "shockwave_radius_km": 0.343, "crater_diameter_km": 0.1}
        ]
    }))
    .into_response()
}

async fn broken_simulate() -> Response {
    (StatusCode::BAD_GATEWAY, "upstream down").into_response()
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

fn language(headers: &HeaderMap) -> String {
    headers
        .get("accept-language")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("none")
        .to_string()
}

async fn search(headers: HeaderMap, Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    match params.get("q").map(String::as_str) {
        Some("denver") => Json(json!([
            {"lat": "39.7392", "lon": "-104.9849", "display_name": format!("Denver ({})", language(&headers))}
        ])),
        _ => Json(json!([])),
    }
}

async fn reverse(Query(params): Query<HashMap<String, String>>) -> Response {
    let lat = params.get("lat").cloned().unwrap_or_default();
    if lat.starts_with("45") {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    Json(json!({"display_name": format!("Near {}", lat)})).into_response()
}

async fn spawn_stub() -> SocketAddr {
    let app = Router::new()
        .route("/simulate", post(simulate))
        .route("/health", get(health))
        .route("/broken/simulate", post(broken_simulate))
        .route("/search", get(search))
        .route("/reverse", get(reverse));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn http() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

fn manual_form() -> FormFields {
    FormFields {
        lat: "39.0".into(),
        lon: "-98.0".into(),
        manual: ManualFields {
            diameter: "100".into(),
            velocity: "17".into(),
            name: "Test rock".into(),
            ..Default::default()
        },
        ..Default::default()
    }
}

// =============================================================================
// SIMULATION CLIENT
// =============================================================================

#[tokio::test]
async fn test_manual_simulation_round_trip() {
    let addr = spawn_stub().await;
    let client = SimulationClient::with_client(format!("http://{}/simulate", addr), http());

    let request = build_payload(InputMode::Manual, &manual_form()).unwrap();
    let result = client.simulate(&request).await.unwrap();

    assert_eq!(result.energy_mt(), Some(10.0));
    assert_eq!(result.crater_radius_m(), Some(200.0));
    assert_eq!(result.meta_name(), Some("Test rock"));
    assert_eq!(result.frames().len(), 2);
    assert!(result.geojson.is_some());
}

#[tokio::test]
async fn test_catalog_rejection_carries_server_message() {
    let addr = spawn_stub().await;
    let client = SimulationClient::with_client(format!("http://{}/simulate", addr), http());

    let fields = FormFields {
        lat: "39.0".into(),
        lon: "-98.0".into(),
        catalog: CatalogFields {
            neo_id: "0000000".into(),
            ..Default::default()
        },
        ..Default::default()
    };
    let request = build_payload(InputMode::Catalog, &fields).unwrap();
    let err = client.simulate(&request).await.unwrap_err();
    assert_eq!(
        err,
        ClientError::Simulation("HTTP 404: Asteroid not found".into())
    );
}

#[tokio::test]
async fn test_non_json_failure_reports_status_only() {
    let addr = spawn_stub().await;
    let client = SimulationClient::with_client(format!("http://{}/broken/simulate", addr), http());

    let request = build_payload(InputMode::Manual, &manual_form()).unwrap();
    let err = client.simulate(&request).await.unwrap_err();
    assert_eq!(err.to_string(), "HTTP 502");
}

#[tokio::test]
async fn test_unreachable_service_is_transport_error() {
    // bind then drop to get a port nobody listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = SimulationClient::with_client(format!("http://{}/simulate", addr), http());
    let request = build_payload(InputMode::Manual, &manual_form()).unwrap();
    let err = client.simulate(&request).await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
}

#[tokio::test]
async fn test_health_endpoint() {
    let addr = spawn_stub().await;
    let client = SimulationClient::with_client(format!("http://{}/simulate", addr), http());
    assert!(client.health().await.unwrap());
}

// =============================================================================
// GEOCODER
// =============================================================================

#[tokio::test]
async fn test_search_sends_language_and_takes_first_hit() {
    let addr = spawn_stub().await;
    let geocoder = NominatimClient::with_client(format!("http://{}", addr), "de", http());

    let place = geocoder.forward("denver").await.unwrap();
    assert!((place.lat - 39.7392).abs() < 1e-9);
    assert_eq!(place.label, "Denver (de)");

    let err = geocoder.forward("nowhere").await.unwrap_err();
    assert!(matches!(err, ClientError::NotFound(_)));
}

#[tokio::test]
async fn test_reverse_failure_degrades_to_empty_label() {
    let addr = spawn_stub().await;
    let geocoder = NominatimClient::with_client(format!("http://{}/", addr), "en", http());

    assert_eq!(geocoder.reverse(38.5, -97.0).await, "Near 38.5");
    assert_eq!(geocoder.reverse(45.0, -97.0).await, "");
    assert!(geocoder.lookup_reverse(45.0, -97.0).await.is_err());
}

// =============================================================================
// END TO END
// =============================================================================

#[tokio::test]
async fn test_app_renders_stub_result() {
    let addr = spawn_stub().await;
    let simulator = SimulationClient::with_client(format!("http://{}/simulate", addr), http());
    let geocoder = NominatimClient::with_client(format!("http://{}", addr), "en", http());

    let mut workspace = Workspace::new(HeadlessMap::new(), ManualScheduler::new());
    workspace.form = manual_form();
    let app = ImpactApp::new(workspace, simulator, geocoder);

    let label = app.pick_location(39.0, -98.0).await.unwrap();
    assert_eq!(label, "Near 39");

    app.simulate().await.unwrap();
    assert!(app.is_replaying());

    app.with_workspace(|ws| {
        let view = ws.rendered().unwrap();
        assert_eq!(view.summary.kpis.energy_mt, "10.00");
        assert_eq!(view.summary.detail("Name"), Some("Test rock"));
        assert_eq!(view.overlay.features.len(), 2);
        assert_eq!(ws.surface().backend().overlay_count(), 1);
        assert_eq!(ws.surface().backend().marker_count(), 1);
    });

    let download = app.download().unwrap();
    assert!(download.body.contains("overpressure"));
}
