//! End-to-end tests of the tool surface against an in-process stub of the
//! Catastro upstream services.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::extract::{Path, Query};
use axum::http::{Request, StatusCode};
use axum::routing::get;
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use catastro_api::config::CatastroConfig;
use catastro_api::handlers::router;
use catastro_api::state::AppState;
use test_utils::fixtures::{capabilities, gml, ovc, refs, xsd};

// ============================================================================
// Stub upstream
// ============================================================================

/// How the stub WFS treats a UTM GetFeature.
#[derive(Clone, Copy)]
enum Utm {
    Served,
    Refused,
    Broken,
}

/// UTM answer whose only ring has two positions.
const BROKEN_UTM: &str = r#"<wfs:FeatureCollection xmlns:wfs="http://www.opengis.net/wfs/2.0" xmlns:gml="http://www.opengis.net/gml/3.2" xmlns:cp="http://inspire.ec.europa.eu/schemas/cp/4.0">
  <wfs:member><cp:CadastralParcel gml:id="broken">
    <cp:geometry><gml:Polygon srsName="urn:ogc:def:crs:EPSG::25830"><gml:exterior><gml:LinearRing>
      <gml:posList>440000 4440000 440100 4440000</gml:posList>
    </gml:LinearRing></gml:exterior></gml:Polygon></cp:geometry>
  </cp:CadastralParcel></wfs:member>
</wfs:FeatureCollection>"#;

/// WFS answering every SRS it is asked for.
async fn wfs(Query(params): Query<HashMap<String, String>>) -> &'static str {
    wfs_answer(&params, Utm::Served)
}

/// WFS that only serves EPSG:4326 parcels.
async fn wfs_strict(Query(params): Query<HashMap<String, String>>) -> &'static str {
    wfs_answer(&params, Utm::Refused)
}

/// WFS whose UTM parcels cannot be parsed.
async fn wfs_broken(Query(params): Query<HashMap<String, String>>) -> &'static str {
    wfs_answer(&params, Utm::Broken)
}

fn wfs_answer(params: &HashMap<String, String>, utm: Utm) -> &'static str {
    let srs = params.get("srsName").map(String::as_str).unwrap_or_default();
    match (params.get("request").map(String::as_str), utm) {
        (Some("GetCapabilities"), _) => capabilities::WFS_CP,
        (Some("DescribeFeatureType"), _) => xsd::ROOT,
        (Some("GetFeature"), _) if srs.ends_with("4326") => gml::PARCEL_4326,
        (Some("GetFeature"), Utm::Served) if srs.ends_with("25830") => gml::PARCEL_25830,
        (Some("GetFeature"), Utm::Broken) if srs.ends_with("25830") => BROKEN_UTM,
        _ => gml::EXCEPTION_REPORT,
    }
}

async fn callejero(Path(op): Path<String>, Query(params): Query<HashMap<String, String>>) -> (StatusCode, &'static str) {
    let body = match op.as_str() {
        "ObtenerProvincias" => ovc::PROVINCES,
        "ObtenerMunicipios" => ovc::MUNICIPALITIES,
        "ObtenerCallejero" => ovc::STREETS,
        "ObtenerNumerero" => ovc::NUMBERS,
        "Consulta_DNPRC" => match params.get("RefCat").map(String::as_str) {
            Some(refs::URBAN_PARCEL) => ovc::DNPRC_PARCEL,
            Some(refs::URBAN_UNIT) => ovc::DNPRC_UNIT,
            _ => ovc::ERROR,
        },
        _ => return (StatusCode::NOT_FOUND, ""),
    };
    (StatusCode::OK, body)
}

async fn coordenadas(Path(op): Path<String>) -> (StatusCode, &'static str) {
    match op.as_str() {
        "Consulta_RCCOOR" | "Consulta_CPMRC" => (StatusCode::OK, ovc::RCCOOR),
        "Consulta_RCCOOR_Distancia" => (StatusCode::OK, ovc::RCCOOR_DISTANCE),
        _ => (StatusCode::NOT_FOUND, ""),
    }
}

/// Serve the stub on an ephemeral port and return its base URL.
async fn spawn_upstream() -> String {
    let app = Router::new()
        .route("/wfs", get(wfs))
        .route("/wfs-strict", get(wfs_strict))
        .route("/wfs-broken", get(wfs_broken))
        .route("/parcel-base.xsd", get(|| async { xsd::PARCEL_BASE }))
        .route("/callejero/:op", get(callejero))
        .route("/coordenadas/:op", get(coordenadas))
        .route("/limited/*rest", get(|| async { StatusCode::TOO_MANY_REQUESTS }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn gateway(base: &str, callejero: &str, wfs: &str) -> Router {
    let mut config = CatastroConfig::default();
    config.upstream.callejero_url = format!("{}/{}", base, callejero);
    config.upstream.coordenadas_url = format!("{}/coordenadas", base);
    config.upstream.wfs_cp_url = format!("{}/{}", base, wfs);
    config.upstream.request_timeout_secs = 5;
    router(Arc::new(AppState::new(config, None).unwrap()))
}

async fn default_gateway() -> Router {
    let base = spawn_upstream().await;
    gateway(&base, "callejero", "wfs")
}

async fn call(app: &Router, tool: &str, args: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(format!("/tools/{}", tool))
        .header("content-type", "application/json")
        .body(Body::from(args.to_string()))
        .unwrap();
    send(app, request).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

// ============================================================================
// Service endpoints
// ============================================================================

#[tokio::test]
async fn test_list_tools() {
    let app = default_gateway().await;
    let request = Request::builder().uri("/tools").body(Body::empty()).unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    let tools = body.as_array().unwrap();
    assert_eq!(tools.len(), 17);
    assert!(tools.iter().any(|t| t["name"] == "parcel_geojson"));
}

#[tokio::test]
async fn test_health_and_missing_metrics() {
    let app = default_gateway().await;

    let (status, body) = send(&app, Request::builder().uri("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));

    let (status, _) = send(&app, Request::builder().uri("/metrics").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_unknown_tool() {
    let app = default_gateway().await;
    let (status, body) = call(&app, "export_parcel", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["kind"], "UnknownTool");
}

#[tokio::test]
async fn test_argument_errors() {
    let app = default_gateway().await;

    let (status, body) = call(&app, "parcel_geojson", json!({"reference": "1146801VK47"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "InvalidReferenceFormat");

    let (status, body) = call(&app, "list_provinces", json!({"province": "28"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "InvalidParameter");

    let (status, _) = call(&app, "list_municipalities", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// OVC tools
// ============================================================================

#[tokio::test]
async fn test_list_provinces() {
    let app = default_gateway().await;
    let (status, body) = call(&app, "list_provinces", json!({})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "ovc");
    assert_eq!(body["data"]["kind"], "provinces");
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_municipalities_filtered_locally() {
    let app = default_gateway().await;
    let (status, body) = call(&app, "list_municipalities", json!({"province": "MADRID", "filter": "maja"})).await;

    assert_eq!(status, StatusCode::OK);
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["name"], "MAJADAHONDA");
}

#[tokio::test]
async fn test_parcel_reference_fans_out() {
    let app = default_gateway().await;
    let (status, body) = call(&app, "property_by_reference", json!({"reference": refs::URBAN_PARCEL})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "property");
    assert_eq!(body["data"]["kind"], "parcel");
    let units = body["data"]["units"].as_array().unwrap();
    assert!(!units.is_empty());
    for unit in units {
        assert!(unit["reference"].as_str().unwrap().starts_with(refs::URBAN_PARCEL));
    }
}

#[tokio::test]
async fn test_unit_reference_is_single_record() {
    let app = default_gateway().await;
    let (status, body) = call(&app, "property_by_reference", json!({"reference": refs::URBAN_UNIT})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["kind"], "unit");
    assert_eq!(body["data"]["record"]["reference"], refs::URBAN_UNIT);
}

#[tokio::test]
async fn test_ovc_error_list_is_rejection() {
    let app = default_gateway().await;
    let (status, body) = call(&app, "property_by_reference", json!({"reference": refs::RURAL_PARCEL})).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["kind"], "UpstreamRejected");
    assert!(body["error"]["message"].as_str().unwrap().contains("NO EXISTE"));
}

#[tokio::test]
async fn test_nearby_references() {
    let app = default_gateway().await;
    let (status, body) = call(&app, "nearby_references", json!({"x": -3.7, "y": 40.4185})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["kind"], "coordinates");
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_rate_limited_upstream() {
    let base = spawn_upstream().await;
    let app = gateway(&base, "limited", "wfs");
    let (status, body) = call(&app, "list_provinces", json!({})).await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["kind"], "RateLimited");
}

// ============================================================================
// WFS tools
// ============================================================================

#[tokio::test]
async fn test_feature_types() {
    let app = default_gateway().await;
    let (status, body) = call(&app, "wfs_feature_types", json!({})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "feature_types");
    let types = body["data"]["feature_types"].as_array().unwrap();
    assert_eq!(types.len(), 2);
    assert_eq!(types[0]["default_crs"], "urn:ogc:def:crs:EPSG::25830");
}

#[tokio::test]
async fn test_describe_feature_type_partial() {
    let app = default_gateway().await;
    let (status, body) = call(&app, "describe_feature_type", json!({"type_name": "cp:CadastralParcel"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "schema");
    let data = &body["data"];
    assert_eq!(data["complete"], false);
    assert_eq!(data["max_includes"], 5);
    assert!(data["unreachable"]
        .as_array()
        .unwrap()
        .iter()
        .any(|u| u.as_str().unwrap().ends_with("missing.xsd")));

    let fields: Vec<&str> = data["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"areaValue"));
    assert!(fields.contains(&"nationalCadastralReference"));
}

#[tokio::test]
async fn test_describe_feature_type_zero_budget() {
    let app = default_gateway().await;
    let (status, body) = call(
        &app,
        "describe_feature_type",
        json!({"type_name": "cp:CadastralParcel", "max_includes": 0}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["complete"], false);
    assert_eq!(body["data"]["pending"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_describe_feature_type_rate_limited() {
    let base = spawn_upstream().await;
    let app = gateway(&base, "callejero", "limited/wfs");

    let (status, body) = call(&app, "wfs_capabilities", json!({})).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["kind"], "RateLimited");

    let (status, body) = call(&app, "describe_feature_type", json!({"type_name": "cp:CadastralParcel"})).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["kind"], "RateLimited");
}

#[tokio::test]
async fn test_feature_sample_head() {
    let app = default_gateway().await;
    let (status, body) = call(&app, "wfs_feature_sample", json!({"srs": "EPSG:4326", "count": 1})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 1);
    assert_eq!(body["data"]["truncated"], false);
    assert!(body["data"]["head"].as_str().unwrap().contains("CadastralParcel"));
}

// ============================================================================
// Parcel geometry tools
// ============================================================================

#[tokio::test]
async fn test_parcel_geojson_swaps_axes() {
    let app = default_gateway().await;
    let (status, body) = call(&app, "parcel_geojson", json!({"reference": refs::URBAN_UNIT})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "geojson");
    let data = &body["data"];
    assert_eq!(data["axis_fix_applied"], true);

    let feature = &data["feature_collection"]["features"][0];
    assert_eq!(feature["properties"]["refcat"], refs::URBAN_PARCEL);
    assert_eq!(feature["geometry"]["type"], "Polygon");

    let ring = feature["geometry"]["coordinates"][0].as_array().unwrap();
    assert_eq!(ring.len(), 5);
    assert_eq!(ring[0], ring[4]);
    test_utils::assert_coords_approx_eq!(
        (ring[0][0].as_f64().unwrap(), ring[0][1].as_f64().unwrap()),
        (-3.7, 40.1),
        1e-9
    );
    test_utils::assert_coords_approx_eq!(
        (ring[2][0].as_f64().unwrap(), ring[2][1].as_f64().unwrap()),
        (-3.6, 40.2),
        1e-9
    );
}

#[tokio::test]
async fn test_parcel_vertices() {
    let app = default_gateway().await;
    let (status, body) = call(&app, "parcel_vertices", json!({"reference": refs::URBAN_PARCEL})).await;

    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["vertex_count"], 5);
    assert_eq!(data["axis_order"], "LatLon");
    assert_eq!(data["epsg_utm_recommended"], 25830);
    assert_eq!(data["stats"]["count"], 5);
}

#[tokio::test]
async fn test_parcel_gml_auto_utm() {
    let app = default_gateway().await;
    let (status, body) = call(&app, "parcel_gml", json!({"reference": refs::URBAN_PARCEL})).await;

    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["mode"], "auto");
    assert_eq!(data["srs"], "EPSG:25830");
    assert_eq!(data["fallback"], false);
    assert!(data["gml"].as_str().unwrap().contains("EPSG::25830"));
}

#[tokio::test]
async fn test_parcel_gml_auto_falls_back() {
    let base = spawn_upstream().await;
    let app = gateway(&base, "callejero", "wfs-strict");
    let (status, body) = call(&app, "parcel_gml", json!({"reference": refs::URBAN_PARCEL, "srs": "AUTO"})).await;

    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["fallback"], true);
    assert_eq!(data["srs"], "EPSG:4326");
    assert_eq!(data["utm_epsg"], 25830);
    assert!(data["note"].as_str().is_some());
}

#[tokio::test]
async fn test_parcel_gml_auto_unusable_utm_falls_back() {
    let base = spawn_upstream().await;
    let app = gateway(&base, "callejero", "wfs-broken");
    let (status, body) = call(&app, "parcel_gml", json!({"reference": refs::URBAN_PARCEL})).await;

    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["fallback"], true);
    assert_eq!(data["srs"], "EPSG:4326");
    assert!(data["note"].as_str().unwrap().contains("unusable"));
}

#[tokio::test]
async fn test_parcel_gml_manual_refused() {
    let base = spawn_upstream().await;
    let app = gateway(&base, "callejero", "wfs-strict");
    let (status, body) = call(&app, "parcel_gml", json!({"reference": refs::URBAN_PARCEL, "srs": "EPSG:25830"})).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["kind"], "UpstreamRejected");
}
