//! HTTP integration tests for the Failsight API
//!
//! Most tests write their own `.docx` document, sensor CSV and config file into
//! a temp directory, load the context through the same path the binary uses,
//! and drive the router with `oneshot`. One test loads the repository's own
//! `failsight.toml` and `data/` directory.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use failsight_core::{DashboardContext, FailsightConfig, FailsightError, SourceKind};
use failsight_server::http::{build_router, report_inner, series_inner, HttpState};
use tower::ServiceExt;
use zip::write::SimpleFileOptions;

const WORK_ORDERS: [&str; 3] = ["273496284", "279323105", "273396632"];

const SENSOR_CSV: &str = "WorkOrderID,sensor_name,sensor_id,datetime,reading
273496284,Vibration,S1,2024-03-01 10:00:00,1.2
273496284,Vibration,S1,2024-03-01 10:05:00,1.9
273496284,Temperature,T1,2024-03-01 10:00:00,68.5
273496284,Vibration,S1,2024-03-01 09:55:00,0.8
279323105,Vibration,S1,2024-03-02 08:00:00,0.4
";

fn paragraph(text: &str) -> String {
    format!(r#"<w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#, text)
}

fn write_docx(path: &Path, paragraphs: &[&str]) {
    let body: String = paragraphs.iter().map(|p| paragraph(p)).collect();
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}<w:sectPr/></w:body></w:document>"#,
        body
    );
    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    zip.start_file("[Content_Types].xml", SimpleFileOptions::default())
        .unwrap();
    zip.write_all(br#"<?xml version="1.0"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#)
        .unwrap();
    zip.start_file("word/document.xml", SimpleFileOptions::default())
        .unwrap();
    zip.write_all(xml.as_bytes()).unwrap();
    zip.finish().unwrap();
}

/// Write document, dataset and config into `dir`; returns the config path.
fn write_fixture(dir: &Path, paragraphs: &[&str], csv: &str) -> String {
    let doc_path = dir.join("DemoWorkOrders.docx");
    let csv_path = dir.join("subset_data.csv");
    write_docx(&doc_path, paragraphs);
    std::fs::write(&csv_path, csv).unwrap();

    let ids: Vec<String> = WORK_ORDERS.iter().map(|id| format!("\"{}\"", id)).collect();
    let config = format!(
        "[sources]\ndocument_path = {:?}\ndataset_path = {:?}\nwork_order_ids = [{}]\n",
        doc_path.display().to_string(),
        csv_path.display().to_string(),
        ids.join(", ")
    );
    let config_path = dir.join("failsight.toml");
    std::fs::write(&config_path, config).unwrap();
    config_path.display().to_string()
}

fn default_paragraphs() -> Vec<&'static str> {
    vec![
        "Failure Prediction Work Orders",
        "  273496284: Pump bearing failure detected.  ",
        "279323105: Impeller wear suspected.",
        "279323105: Impeller wear confirmed on teardown.",
    ]
}

fn load(dir: &Path) -> (DashboardContext, FailsightConfig) {
    let config_path = write_fixture(dir, &default_paragraphs(), SENSOR_CSV);
    let config = FailsightConfig::load(&config_path).expect("config loads");
    let context = DashboardContext::load(&config).expect("sources load");
    (context, config)
}

fn make_http_state(dir: &Path) -> Arc<HttpState> {
    let (context, config) = load(dir);
    Arc::new(HttpState {
        context: Arc::new(context),
        config,
    })
}

async fn get_json(state: Arc<HttpState>, uri: &str) -> (StatusCode, serde_json::Value) {
    let app = build_router(state);
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

// ===========================================================================
// TEST 1: docx narratives reach the report in configured order
// ===========================================================================
#[tokio::test]
async fn test_report_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let (status, json) = get_json(make_http_state(dir.path()), "/report").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 3);
    let entries = json["entries"].as_array().unwrap();
    assert_eq!(entries[0]["work_order"], "273496284");
    assert_eq!(entries[0]["display_text"], "Pump bearing failure detected.");
    assert_eq!(entries[1]["narrative"], "Impeller wear confirmed on teardown.");
    assert!(entries[2]["narrative"].is_null());
    assert_eq!(entries[2]["display_text"], "No narrative found in document.");
}

// ===========================================================================
// TEST 2: single narrative lookup, present and absent
// ===========================================================================
#[tokio::test]
async fn test_narrative_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let state = make_http_state(dir.path());

    let (status, json) = get_json(state.clone(), "/narratives/273496284").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["narrative"], "Pump bearing failure detected.");

    let (status, json) = get_json(state, "/narratives/999999999").await;
    assert_eq!(status, StatusCode::OK, "absence is not an error");
    assert!(json["narrative"].is_null());
}

// ===========================================================================
// TEST 3: series grouped per sensor and sorted by time
// ===========================================================================
#[tokio::test]
async fn test_series_endpoint_groups_and_sorts() {
    let dir = tempfile::tempdir().unwrap();
    let (status, json) = get_json(make_http_state(dir.path()), "/series/273496284").await;

    assert_eq!(status, StatusCode::OK);
    let series = json["series"].as_array().unwrap();
    assert_eq!(series.len(), 2);
    assert_eq!(series[0]["sensor_name"], "Vibration");
    assert_eq!(series[0]["sensor_id"], "S1");
    let stamps: Vec<&str> = series[0]["points"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["timestamp"].as_str().unwrap())
        .collect();
    assert_eq!(
        stamps,
        vec!["2024-03-01T09:55:00", "2024-03-01T10:00:00", "2024-03-01T10:05:00"]
    );
    assert_eq!(series[1]["sensor_name"], "Temperature");
    assert!(json["message"].is_null());
}

// ===========================================================================
// TEST 4: work order without rows yields empty series and a message
// ===========================================================================
#[tokio::test]
async fn test_series_endpoint_empty() {
    let dir = tempfile::tempdir().unwrap();
    let (status, json) = get_json(make_http_state(dir.path()), "/series/273396632").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["series"].as_array().unwrap().len(), 0);
    assert_eq!(json["message"], "No data found for this WorkOrderID.");
}

// ===========================================================================
// TEST 5: deep dives cover every configured work order
// ===========================================================================
#[tokio::test]
async fn test_deep_dives_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let (status, json) = get_json(make_http_state(dir.path()), "/deep-dives").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 3);
    let dives = json["work_orders"].as_array().unwrap();
    assert_eq!(dives[1]["work_order"], "279323105");
    assert_eq!(dives[1]["series"].as_array().unwrap().len(), 1);
    assert_eq!(dives[2]["message"], "No data found for this WorkOrderID.");
}

// ===========================================================================
// TEST 6: health reports fingerprints; version reports protocol
// ===========================================================================
#[tokio::test]
async fn test_health_and_version() {
    let dir = tempfile::tempdir().unwrap();
    let state = make_http_state(dir.path());

    let (status, json) = get_json(state.clone(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["narratives"], 2);
    assert_eq!(json["readings"], 5);
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    let sources = json["sources"].as_array().unwrap();
    assert!(sources[0]["path"].as_str().unwrap().ends_with("DemoWorkOrders.docx"));
    assert_eq!(sources[1]["sha256"].as_str().unwrap().len(), 64);

    let (status, json) = get_json(state, "/version").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["protocol"], "failsight/1");
}

// ===========================================================================
// TEST 7: upload preview via POST, including the windows-1252 fallback
// ===========================================================================
#[tokio::test]
async fn test_preview_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_router(make_http_state(dir.path()));

    let req = Request::builder()
        .method("POST")
        .uri("/preview?rows=2")
        .header("content-type", "text/csv")
        .body(Body::from(&b"pump,site\nP-1,M\xFCnchen\nP-2,Z\xFCrich\nP-3,Wien\n"[..]))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["encoding"], "windows-1252");
    assert_eq!(json["headers"][0], "pump");
    assert_eq!(json["rows"].as_array().unwrap().len(), 2);
    assert_eq!(json["rows"][0][1], "München");
    assert_eq!(json["truncated"], true);
}

// ===========================================================================
// TEST 8: loading the same sources twice gives identical answers
// ===========================================================================
#[test]
fn test_reload_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let (first, _) = load(dir.path());
    let (second, _) = load(dir.path());

    assert_eq!(report_inner(&first), report_inner(&second));
    for id in WORK_ORDERS {
        assert_eq!(
            series_inner(&first, id.to_string()),
            series_inner(&second, id.to_string())
        );
    }
    assert_eq!(first.fingerprints(), second.fingerprints());
}

// ===========================================================================
// TEST 9: load failures surface the right error kind
// ===========================================================================
#[test]
fn test_missing_sources_are_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_fixture(dir.path(), &default_paragraphs(), SENSOR_CSV);
    let config = FailsightConfig::load(&config_path).unwrap();

    std::fs::remove_file(config.sources.dataset_path()).unwrap();
    match DashboardContext::load(&config) {
        Err(FailsightError::SourceNotFound { kind, .. }) => assert_eq!(kind, SourceKind::Dataset),
        other => panic!("expected dataset not found, got {:?}", other.map(|_| ())),
    }

    std::fs::remove_file(config.sources.document_path()).unwrap();
    match DashboardContext::load(&config) {
        Err(FailsightError::SourceNotFound { kind, .. }) => assert_eq!(kind, SourceKind::Document),
        other => panic!("expected document not found, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_missing_column_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let csv = "WorkOrderID,sensor_name,sensor_id,timestamp,reading\n1,A,1,2024-03-01,1\n";
    let config_path = write_fixture(dir.path(), &default_paragraphs(), csv);
    let config = FailsightConfig::load(&config_path).unwrap();

    match DashboardContext::load(&config) {
        Err(FailsightError::MissingColumn { column, .. }) => assert_eq!(column, "datetime"),
        other => panic!("expected MissingColumn, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_document_without_matches_loads() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_fixture(dir.path(), &["Nothing relevant here."], SENSOR_CSV);
    let config = FailsightConfig::load(&config_path).unwrap();
    let context = DashboardContext::load(&config).unwrap();

    assert_eq!(context.narrative_count(), 0);
    assert!(context.report().iter().all(|e| e.narrative.is_none()));
}

// ===========================================================================
// TEST 10: ping and the full narrative listing
// ===========================================================================
#[tokio::test]
async fn test_ping_and_narratives_endpoints() {
    let dir = tempfile::tempdir().unwrap();
    let state = make_http_state(dir.path());

    let (status, json) = get_json(state.clone(), "/ping").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["pong"], true);

    let (status, json) = get_json(state, "/narratives").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 2);
    assert_eq!(json["narratives"][0]["identifier"], "273496284");
    assert_eq!(
        json["narratives"][1]["text"],
        "Impeller wear confirmed on teardown."
    );
}

// ===========================================================================
// TEST 11: the shipped failsight.toml and data/ load as-is
// ===========================================================================
fn shipped_context() -> DashboardContext {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("workspace root");
    let mut config = FailsightConfig::load(&root.join("failsight.toml").display().to_string())
        .expect("shipped config loads");
    // source paths in the shipped config are relative to the workspace root
    config.sources.document_path = root.join(&config.sources.document_path).display().to_string();
    config.sources.dataset_path = root.join(&config.sources.dataset_path).display().to_string();
    DashboardContext::load(&config).expect("shipped sources load")
}

#[test]
fn test_shipped_demo_sources() {
    let context = shipped_context();
    assert_eq!(context.work_order_ids(), WORK_ORDERS);

    let report = context.report();
    assert_eq!(report.len(), 3);
    for (entry, id) in report.iter().zip(WORK_ORDERS) {
        assert_eq!(entry.work_order, id);
        assert!(entry.narrative.is_some(), "demo document covers {}", id);
    }

    let dives = context.deep_dives();
    assert_eq!(dives[0].series.len(), 2);
    assert_eq!(dives[1].series.len(), 2);
    for series in dives[0].series.iter().chain(&dives[1].series) {
        assert!(series
            .points
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp));
    }
    assert_eq!(dives[2].work_order, "273396632");
    assert!(dives[2].series.is_empty());
    assert_eq!(
        dives[2].message.as_deref(),
        Some("No data found for this WorkOrderID.")
    );
}
