// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Scan Server REST Client
 * Session-oriented client for the scan server's v1 REST API
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use parking_lot::Mutex;
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::client::{OsaResults, SastResults, ScanClient};
use crate::config::{ProxySettings, ScanSettings};
use crate::console;
use crate::credentials::ConnectionDetails;
use crate::errors::ClientError;
use crate::secret;

/// Delay between status polls while waiting for final results
const POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Per-request timeout; the overall wait for results is unbounded and must
/// be limited by the caller through cancellation
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateScanRequest<'a> {
    project_name: &'a str,
    source_path: &'a str,
    generate_xml_report: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSastResponse {
    id: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateOsaResponse {
    analysis_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    stage: ScanStage,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ScanStage {
    Queued,
    Running,
    Finished,
    Failed,
    Canceled,
}

/// [`ScanClient`] implementation over the scan server's REST API.
///
/// Construction performs no network activity. The connection password stays
/// encrypted until [`ScanClient::login`] puts it on the wire.
pub struct RestScanClient {
    http: reqwest::Client,
    sca_http: reqwest::Client,
    base: Url,
    details: ConnectionDetails,
    project_name: String,
    source_dir: Option<PathBuf>,
    xml_report: bool,
    token: Mutex<Option<String>>,
    sast_scan_id: Mutex<Option<u64>>,
    osa_analysis_id: Mutex<Option<String>>,
}

impl RestScanClient {
    pub fn new(
        settings: &ScanSettings,
        details: ConnectionDetails,
        proxy: Option<&ProxySettings>,
    ) -> Result<Self, ClientError> {
        let mut base_url = details.server_url.clone();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        let base = Url::parse(&base_url)
            .map_err(|err| ClientError::Protocol(format!("invalid server URL: {}", err)))?;

        // SAST and component-analysis traffic honor their proxy flags
        // independently.
        let http = build_http(proxy.filter(|_| details.is_proxy))?;
        let sca_http = build_http(proxy.filter(|_| details.is_sca_proxy))?;

        Ok(Self {
            http,
            sca_http,
            base,
            project_name: settings.project_name.clone(),
            source_dir: settings.source_dir.clone(),
            xml_report: settings.xml_report_enabled(),
            details,
            token: Mutex::new(None),
            sast_scan_id: Mutex::new(None),
            osa_analysis_id: Mutex::new(None),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base
            .join(path)
            .map_err(|err| ClientError::Protocol(format!("invalid endpoint {}: {}", path, err)))
    }

    fn bearer(&self) -> Result<String, ClientError> {
        self.token
            .lock()
            .as_ref()
            .map(|token| format!("Bearer {}", token))
            .ok_or_else(|| ClientError::Protocol("session is not authenticated".to_string()))
    }

    fn source_path(&self) -> Result<String, ClientError> {
        self.source_dir
            .as_ref()
            .map(|dir| dir.to_string_lossy().into_owned())
            .ok_or_else(|| {
                ClientError::Protocol("source directory has not been resolved".to_string())
            })
    }

    fn sast_id(&self) -> Result<u64, ClientError> {
        (*self.sast_scan_id.lock())
            .ok_or_else(|| ClientError::Protocol("no SAST scan has been created".to_string()))
    }

    fn osa_id(&self) -> Result<String, ClientError> {
        self.osa_analysis_id
            .lock()
            .clone()
            .ok_or_else(|| ClientError::Protocol("no component analysis has been created".to_string()))
    }

    async fn fetch_sast_results(&self) -> Result<SastResults, ClientError> {
        let scan_id = self.sast_id()?;
        let url = self.endpoint(&format!("api/v1/sast/scans/{}/results", scan_id))?;
        let results = self
            .http
            .get(url)
            .header(AUTHORIZATION, self.bearer()?)
            .send()
            .await?
            .error_for_status()?
            .json::<SastResults>()
            .await?;
        Ok(results)
    }

    async fn fetch_osa_results(&self) -> Result<OsaResults, ClientError> {
        let analysis_id = self.osa_id()?;
        let url = self.endpoint(&format!("api/v1/osa/scans/{}/results", analysis_id))?;
        let results = self
            .sca_http
            .get(url)
            .header(AUTHORIZATION, self.bearer()?)
            .send()
            .await?
            .error_for_status()?
            .json::<OsaResults>()
            .await?;
        Ok(results)
    }

    async fn poll_status(
        &self,
        http: &reqwest::Client,
        path: String,
        label: &str,
    ) -> Result<(), ClientError> {
        loop {
            let url = self.endpoint(&path)?;
            let status = http
                .get(url)
                .header(AUTHORIZATION, self.bearer()?)
                .send()
                .await?
                .error_for_status()?
                .json::<StatusResponse>()
                .await?;

            match status.stage {
                ScanStage::Finished => return Ok(()),
                ScanStage::Failed => {
                    return Err(ClientError::Protocol(format!(
                        "{} failed on the server: {}",
                        label,
                        status.message.unwrap_or_else(|| "no detail provided".to_string())
                    )));
                }
                ScanStage::Canceled => {
                    return Err(ClientError::Protocol(format!(
                        "{} was canceled on the server",
                        label
                    )));
                }
                stage => {
                    debug!(?stage, "{} still in progress", label);
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl ScanClient for RestScanClient {
    async fn init(&self) -> Result<(), ClientError> {
        let url = self.endpoint("api/v1/system/status")?;
        let response = self.http.get(url).send().await.map_err(|err| {
            if err.is_connect() || err.is_timeout() {
                ClientError::ServerUnavailable {
                    message: err.to_string(),
                }
            } else {
                ClientError::Http(err)
            }
        })?;

        if !response.status().is_success() {
            return Err(ClientError::ServerUnavailable {
                message: format!("status endpoint returned {}", response.status()),
            });
        }

        self.login().await
    }

    async fn login(&self) -> Result<(), ClientError> {
        // The only point where the stored password is decrypted.
        let password = secret::decrypt(&self.details.encrypted_password, &self.details.username)
            .map_err(|_| {
                ClientError::Protocol("stored credentials could not be decrypted".to_string())
            })?;

        let url = self.endpoint("api/v1/auth/login")?;
        let response = self
            .http
            .post(url)
            .json(&LoginRequest {
                username: &self.details.username,
                password: &password,
            })
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(ClientError::Protocol(
                "login rejected: invalid username or password".to_string(),
            ));
        }

        let body = response.error_for_status()?.json::<LoginResponse>().await?;
        *self.token.lock() = Some(body.token);
        debug!(username = %self.details.username, "authenticated against scan server");
        Ok(())
    }

    async fn create_sast_scan(&self) -> Result<(), ClientError> {
        let source_path = self.source_path()?;
        let url = self.endpoint("api/v1/sast/scans")?;
        let created = self
            .http
            .post(url)
            .header(AUTHORIZATION, self.bearer()?)
            .json(&CreateScanRequest {
                project_name: &self.project_name,
                source_path: &source_path,
                generate_xml_report: self.xml_report,
            })
            .send()
            .await?
            .error_for_status()?
            .json::<CreateSastResponse>()
            .await?;

        info!(scan_id = created.id, project = %self.project_name, "SAST scan created");
        *self.sast_scan_id.lock() = Some(created.id);
        Ok(())
    }

    async fn wait_for_sast_results(&self) -> Result<SastResults, ClientError> {
        let scan_id = self.sast_id()?;
        self.poll_status(
            &self.http,
            format!("api/v1/sast/scans/{}/status", scan_id),
            "SAST scan",
        )
        .await?;
        self.fetch_sast_results().await
    }

    async fn get_latest_sast_results(&self) -> Result<SastResults, ClientError> {
        self.fetch_sast_results().await
    }

    async fn cancel_sast_scan(&self) -> Result<(), ClientError> {
        let scan_id = self.sast_id()?;
        let url = self.endpoint(&format!("api/v1/sast/scans/{}/cancel", scan_id))?;
        self.http
            .post(url)
            .header(AUTHORIZATION, self.bearer()?)
            .send()
            .await?
            .error_for_status()?;
        info!(scan_id, "SAST scan cancel requested");
        Ok(())
    }

    async fn create_osa_scan(&self) -> Result<(), ClientError> {
        let source_path = self.source_path()?;
        console::component_line(&format!(
            "resolving open source dependencies in {}",
            source_path
        ));

        let url = self.endpoint("api/v1/osa/scans")?;
        let created = self
            .sca_http
            .post(url)
            .header(AUTHORIZATION, self.bearer()?)
            .json(&CreateScanRequest {
                project_name: &self.project_name,
                source_path: &source_path,
                generate_xml_report: self.xml_report,
            })
            .send()
            .await?
            .error_for_status()?
            .json::<CreateOsaResponse>()
            .await?;

        console::component_line(&format!(
            "dependency snapshot submitted, analysis id {}",
            created.analysis_id
        ));
        info!(analysis_id = %created.analysis_id, project = %self.project_name, "component analysis created");
        *self.osa_analysis_id.lock() = Some(created.analysis_id);
        Ok(())
    }

    async fn wait_for_osa_results(&self) -> Result<OsaResults, ClientError> {
        let analysis_id = self.osa_id()?;
        self.poll_status(
            &self.sca_http,
            format!("api/v1/osa/scans/{}/status", analysis_id),
            "component analysis",
        )
        .await?;
        self.fetch_osa_results().await
    }

    async fn get_latest_osa_results(&self) -> Result<OsaResults, ClientError> {
        self.fetch_osa_results().await
    }

    async fn close(&self) -> Result<(), ClientError> {
        let token = self.token.lock().take();
        if let Some(token) = token {
            let url = self.endpoint("api/v1/auth/logout")?;
            self.http
                .post(url)
                .header(AUTHORIZATION, format!("Bearer {}", token))
                .send()
                .await?
                .error_for_status()?;
            debug!("scan server session closed");
        }
        Ok(())
    }
}

fn build_http(proxy: Option<&ProxySettings>) -> Result<reqwest::Client, ClientError> {
    let mut builder = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .tcp_keepalive(Duration::from_secs(60))
        .tcp_nodelay(true)
        .user_agent(concat!("lonkero-ci/", env!("CARGO_PKG_VERSION")));

    if let Some(settings) = proxy {
        let mut proxy = reqwest::Proxy::all(settings.url())?;
        if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
            proxy = proxy.basic_auth(username, password);
        }
        builder = builder.proxy(proxy);
    }

    builder.build().map_err(ClientError::from)
}
