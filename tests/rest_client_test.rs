// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - REST Client Tests
 * Wire-level tests for the scan server client against a mock server
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::path::PathBuf;
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lonkero_ci::client::ScanClient;
use lonkero_ci::config::{ProxySettings, ScanSettings};
use lonkero_ci::console::{attach_component_sink, BuildConsole};
use lonkero_ci::credentials::ConnectionDetails;
use lonkero_ci::rest_client::RestScanClient;
use lonkero_ci::secret;

fn details_for(server_url: &str) -> ConnectionDetails {
    ConnectionDetails {
        server_url: server_url.to_string(),
        username: "ci-bot".to_string(),
        encrypted_password: secret::encrypt("s3cret", "ci-bot").unwrap(),
        is_proxy: false,
        is_sca_proxy: false,
    }
}

fn settings() -> ScanSettings {
    let mut settings = ScanSettings::new("storefront");
    settings.source_dir = Some(PathBuf::from("/build/workspace"));
    settings
}

async fn authenticated_client(server: &MockServer) -> RestScanClient {
    Mock::given(method("GET"))
        .and(path("/api/v1/system/status"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .and(body_json(serde_json::json!({
            "username": "ci-bot",
            "password": "s3cret"
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "token": "tok-1" })),
        )
        .mount(server)
        .await;

    let client = RestScanClient::new(&settings(), details_for(&server.uri()), None).unwrap();
    client.init().await.unwrap();
    client
}

#[tokio::test]
async fn test_init_authenticates_with_decrypted_password() {
    let server = MockServer::start().await;
    let client = authenticated_client(&server).await;

    // The bearer token from login must be attached to scan calls.
    Mock::given(method("POST"))
        .and(path("/api/v1/sast/scans"))
        .and(header("Authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": 42 })))
        .mount(&server)
        .await;

    client.create_sast_scan().await.unwrap();
}

#[tokio::test]
async fn test_unreachable_server_is_reported_unavailable() {
    // Nothing listens on port 1.
    let client =
        RestScanClient::new(&settings(), details_for("http://127.0.0.1:1"), None).unwrap();

    let err = client.init().await.unwrap_err();
    assert!(err.is_server_unavailable());
}

#[tokio::test]
async fn test_rejected_login_is_not_unavailability() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/system/status"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = RestScanClient::new(&settings(), details_for(&server.uri()), None).unwrap();
    let err = client.init().await.unwrap_err();

    assert!(!err.is_server_unavailable());
    assert!(err.to_string().contains("login rejected"));
}

#[tokio::test]
async fn test_wait_returns_results_once_server_reports_finished() {
    let server = MockServer::start().await;
    let client = authenticated_client(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/sast/scans"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": 42 })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/sast/scans/42/status"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "stage": "finished" })),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/sast/scans/42/results"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "scanId": 42,
            "scanFinished": true,
            "high": 3,
            "medium": 7,
            "low": 21,
            "information": 2,
            "statisticsLink": "https://scan.example.com/scans/42"
        })))
        .mount(&server)
        .await;

    client.create_sast_scan().await.unwrap();
    let results = client.wait_for_sast_results().await.unwrap();

    assert_eq!(results.scan_id, 42);
    assert!(results.scan_finished);
    assert_eq!(results.high, 3);
}

#[tokio::test]
async fn test_failed_scan_stage_surfaces_server_detail() {
    let server = MockServer::start().await;
    let client = authenticated_client(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/sast/scans"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": 7 })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/sast/scans/7/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "stage": "failed",
            "message": "engine crashed"
        })))
        .mount(&server)
        .await;

    client.create_sast_scan().await.unwrap();
    let err = client.wait_for_sast_results().await.unwrap_err();
    assert!(err.to_string().contains("engine crashed"));
}

struct RecordingConsole {
    lines: parking_lot::Mutex<Vec<String>>,
}

impl BuildConsole for RecordingConsole {
    fn line(&self, message: &str) {
        self.lines.lock().push(message.to_string());
    }
}

#[tokio::test]
async fn test_osa_creation_routes_component_diagnostics() {
    let server = MockServer::start().await;
    let client = authenticated_client(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/osa/scans"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "analysisId": "osa-9" })),
        )
        .mount(&server)
        .await;

    let console = Arc::new(RecordingConsole {
        lines: parking_lot::Mutex::new(Vec::new()),
    });

    {
        let _guard = attach_component_sink(console.clone());
        client.create_osa_scan().await.unwrap();
    }

    let lines = console.lines.lock().clone();
    assert!(lines.iter().all(|line| line.starts_with("[ComponentScan]")));
    assert!(lines.iter().any(|line| line.contains("osa-9")));
}

#[tokio::test]
async fn test_close_logs_out_once_authenticated() {
    let server = MockServer::start().await;
    let client = authenticated_client(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/logout"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_close_without_session_is_a_no_op() {
    let client =
        RestScanClient::new(&settings(), details_for("http://127.0.0.1:1"), None).unwrap();
    // Never authenticated: no logout request, no error.
    client.close().await.unwrap();
}

#[test]
fn test_client_builds_with_proxy_settings() {
    let mut details = details_for("https://scan.example.com");
    details.is_proxy = true;
    details.is_sca_proxy = true;

    let proxy = ProxySettings {
        host: "proxy.internal".to_string(),
        port: 3128,
        username: Some("proxy-user".to_string()),
        password: Some("proxy-pass".to_string()),
    };

    assert!(RestScanClient::new(&settings(), details, Some(&proxy)).is_ok());
}
