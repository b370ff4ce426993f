//! End-to-end sync runs against mocked ERP and sheet APIs.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use sheetsync_core::{catalogs, FixedClock, RunOptions, RunnerSettings, SyncRunner, TargetLocks};
use sheetsync_domain::config::{RetrySettings, SourceConfig, TargetConfig};
use sheetsync_domain::{SheetId, SyncMode, SyncSettings};
use sheetsync_infra::scheduling::{JobTrigger, RunnerJob, SyncScheduler, SyncSchedulerConfig};
use sheetsync_infra::{ErpClient, SheetClient};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SHEET: i64 = 42;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().with_env_filter("debug").try_init();
}

fn fast_retry() -> RetrySettings {
    RetrySettings { max_retries: 2, initial_backoff_secs: 0.0, timeout_secs: 5 }
}

fn runner(erp: &MockServer, sheets: &MockServer) -> SyncRunner {
    init_tracing();
    let source = ErpClient::new(&SourceConfig {
        base_url: erp.uri(),
        api_key: "erp-key".into(),
        retry: fast_retry(),
        ..SourceConfig::default()
    })
    .unwrap();
    let target = SheetClient::new(&TargetConfig {
        base_url: sheets.uri(),
        access_token: "sheet-token".into(),
        retry: fast_retry(),
        ..TargetConfig::default()
    })
    .unwrap();
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2026, 3, 10, 18, 0, 0).unwrap());

    SyncRunner::new(
        Arc::new(source),
        Arc::new(target),
        RunnerSettings { batch_size: 100, sync: SyncSettings::default(), warehouse_id: None },
        Arc::new(clock),
        TargetLocks::new(),
    )
    .unwrap()
}

/// Sheet with the client columns and one row keyed `c-1`.
fn client_sheet() -> Value {
    json!({
        "id": SHEET,
        "name": "Bind - Clientes",
        "columns": [
            {"id": 1, "title": "ID", "primary": true},
            {"id": 2, "title": "Nombre Comercial"},
            {"id": 3, "title": "RFC"},
            {"id": 4, "title": "Última Actualización"}
        ],
        "rows": [
            {"id": 900, "cells": [
                {"columnId": 1, "value": "c-1"},
                {"columnId": 2, "value": "Old name"}
            ]}
        ]
    })
}

async fn mount_sheet(sheets: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("/sheets/{SHEET}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(client_sheet()))
        .mount(sheets)
        .await;
}

#[tokio::test]
async fn test_full_run_updates_existing_and_inserts_new_rows() {
    let erp = MockServer::start().await;
    let sheets = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Clients"))
        .and(query_param("$skip", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                {"ID": "c-1", "ClientName": "Acme", "RFC": "AAA010101AAA"},
                {"ID": "c-2", "ClientName": "Globex", "RFC": "GGG020202GGG"}
            ]
        })))
        .expect(1)
        .mount(&erp)
        .await;
    mount_sheet(&sheets).await;
    Mock::given(method("PUT"))
        .and(path(format!("/sheets/{SHEET}/rows")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"resultCode": 0})))
        .expect(1)
        .mount(&sheets)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/sheets/{SHEET}/rows")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"resultCode": 0})))
        .expect(1)
        .mount(&sheets)
        .await;

    let report =
        runner(&erp, &sheets).run(&catalogs::clients(), SheetId(SHEET), RunOptions::default()).await;

    assert!(report.is_success(), "errors: {:?}", report.errors);
    assert_eq!(report.mode, Some(SyncMode::Full));
    assert_eq!(report.existing_rows, 1);
    assert_eq!(report.total_source_count, 2);
    assert_eq!(report.updated, 1);
    assert_eq!(report.inserted, 1);

    let requests = sheets.received_requests().await.unwrap();
    let put = requests.iter().find(|r| r.method.as_str() == "PUT").unwrap();
    let body: Value = serde_json::from_slice(&put.body).unwrap();
    assert_eq!(body[0]["id"], json!(900));
    let cells = body[0]["cells"].as_array().unwrap();
    assert!(cells.iter().any(|c| c["columnId"] == json!(2) && c["value"] == json!("Acme")));

    let post = requests.iter().find(|r| r.method.as_str() == "POST").unwrap();
    let body: Value = serde_json::from_slice(&post.body).unwrap();
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["toBottom"], json!(true));
}

#[tokio::test]
async fn test_fetch_failure_produces_zero_report_and_no_writes() {
    let erp = MockServer::start().await;
    let sheets = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Clients"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .expect(2)
        .mount(&erp)
        .await;
    mount_sheet(&sheets).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"resultCode": 0})))
        .expect(0)
        .mount(&sheets)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"resultCode": 0})))
        .expect(0)
        .mount(&sheets)
        .await;

    let report =
        runner(&erp, &sheets).run(&catalogs::clients(), SheetId(SHEET), RunOptions::default()).await;

    assert!(!report.is_success());
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].starts_with("fetch failed"));
    assert_eq!(report.inserted + report.updated, 0);
}

#[tokio::test]
async fn test_rejected_write_is_reported_and_run_continues() {
    let erp = MockServer::start().await;
    let sheets = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Clients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"ID": "c-1", "ClientName": "Acme"},
            {"ID": "c-3", "ClientName": "Initech"}
        ])))
        .mount(&erp)
        .await;
    mount_sheet(&sheets).await;
    Mock::given(method("PUT"))
        .and(path(format!("/sheets/{SHEET}/rows")))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errorCode": 1036, "message": "The column specified is not valid"
        })))
        .expect(1)
        .mount(&sheets)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/sheets/{SHEET}/rows")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"resultCode": 0})))
        .expect(1)
        .mount(&sheets)
        .await;

    let report =
        runner(&erp, &sheets).run(&catalogs::clients(), SheetId(SHEET), RunOptions::default()).await;

    assert_eq!(report.updated, 0);
    assert_eq!(report.inserted, 1);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("not valid"), "{}", report.errors[0]);
}

#[tokio::test]
async fn test_scheduler_trigger_records_history() {
    let erp = MockServer::start().await;
    let sheets = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Clients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&erp)
        .await;
    mount_sheet(&sheets).await;

    let job = RunnerJob::new(
        Arc::new(runner(&erp, &sheets)),
        vec![(catalogs::clients(), SheetId(SHEET))],
        RunOptions::default(),
    );
    let scheduler = SyncScheduler::new(Arc::new(job), SyncSchedulerConfig::default());

    let reports = scheduler.trigger_now().await;

    assert_eq!(reports.len(), 1);
    assert!(reports[0].is_success());
    let latest = scheduler.history().latest().unwrap();
    assert_eq!(latest.trigger, JobTrigger::Manual);
    assert_eq!(latest.report.catalog, "clients");
}
