// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Scan Orchestration
 * Drives a scan session from init to aggregated outcome
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::client::{OsaResults, SastResults, ScanClient};
use crate::config::{ProxySettings, ScanSettings};
use crate::console::{self, BuildConsole};
use crate::errors::{CiError, CiResult, ClientError};

/// Aggregated result of one orchestration run.
///
/// Per scan type and phase, a result and its error are mutually exclusive;
/// both absent means the scan type was disabled or never got that far.
/// Built incrementally across the phases and handed out once at the end.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub sast_results: Option<SastResults>,
    pub osa_results: Option<OsaResults>,
    pub sast_create_error: Option<ClientError>,
    pub sast_wait_error: Option<ClientError>,
    pub osa_create_error: Option<ClientError>,
    pub osa_wait_error: Option<ClientError>,
}

impl ScanOutcome {
    /// True when any phase of any scan type recorded a failure
    pub fn has_failures(&self) -> bool {
        self.sast_create_error.is_some()
            || self.sast_wait_error.is_some()
            || self.osa_create_error.is_some()
            || self.osa_wait_error.is_some()
    }

    /// Serializable view for report files and pipeline consumers
    pub fn report(&self) -> OutcomeReport {
        OutcomeReport {
            sast_results: self.sast_results.clone(),
            osa_results: self.osa_results.clone(),
            sast_create_error: self.sast_create_error.as_ref().map(ToString::to_string),
            sast_wait_error: self.sast_wait_error.as_ref().map(ToString::to_string),
            osa_create_error: self.osa_create_error.as_ref().map(ToString::to_string),
            osa_wait_error: self.osa_wait_error.as_ref().map(ToString::to_string),
        }
    }
}

/// JSON-friendly rendering of a [`ScanOutcome`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeReport {
    pub sast_results: Option<SastResults>,
    pub osa_results: Option<OsaResults>,
    pub sast_create_error: Option<String>,
    pub sast_wait_error: Option<String>,
    pub osa_create_error: Option<String>,
    pub osa_wait_error: Option<String>,
}

/// Runs the scan session state machine.
///
/// The two scan types are independent services behind one session: a
/// failure creating or waiting on one never blocks visibility into the
/// other. Only a failed session init and cancellation during the
/// synchronous SAST wait abort the whole run.
pub struct ScanOrchestrator {
    settings: ScanSettings,
    console: Arc<dyn BuildConsole>,
    proxy: Option<ProxySettings>,
}

impl ScanOrchestrator {
    pub fn new(settings: ScanSettings, console: Arc<dyn BuildConsole>) -> Self {
        Self {
            settings,
            console,
            proxy: None,
        }
    }

    pub fn with_proxy(mut self, proxy: ProxySettings) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Run the full orchestration against a materialized source checkout.
    ///
    /// `make_session` constructs the scan session from the stamped settings
    /// without touching the network; the session stays exclusively owned by
    /// this run and is closed on every exit path. `cancel` is observed
    /// during the synchronous SAST wait.
    pub async fn run_scan<C, F>(
        &self,
        workspace: &Path,
        make_session: F,
        cancel: CancellationToken,
    ) -> CiResult<ScanOutcome>
    where
        C: ScanClient,
        F: FnOnce(&ScanSettings, Option<&ProxySettings>) -> CiResult<C>,
    {
        let mut settings = self.settings.clone();
        settings.source_dir = Some(workspace.to_path_buf());
        settings.reports_dir = Some(workspace.to_path_buf());

        if let Some(proxy) = &self.proxy {
            debug!(
                host = %proxy.host,
                port = proxy.port,
                username = ?proxy.username,
                password = "*************",
                "using outbound proxy for scan session"
            );
        }

        let client = make_session(&settings, self.proxy.as_ref())?;
        let result = self.drive(&client, &settings, &cancel).await;

        // Teardown runs on every path; its failures are logged but never
        // override the in-flight error or the outcome.
        if let Err(err) = client.close().await {
            warn!(error = %err, "failed to close scan session");
        }

        result
    }

    async fn drive<C: ScanClient>(
        &self,
        client: &C,
        settings: &ScanSettings,
        cancel: &CancellationToken,
    ) -> CiResult<ScanOutcome> {
        let mut outcome = ScanOutcome::default();

        info!(
            project = %settings.project_name,
            sast = settings.sast_enabled,
            osa = settings.osa_enabled,
            synchronous = settings.synchronous,
            "starting scan orchestration"
        );

        if let Err(err) = client.init().await {
            if err.is_server_unavailable() {
                // A login failure carries the sharper diagnostic (bad
                // credentials vs unreachable server); surface it directly.
                client.login().await.map_err(CiError::connection)?;
                return Err(CiError::connection_guidance(err));
            }
            return Err(CiError::connection(err));
        }

        let mut osa_created = false;
        if settings.osa_enabled {
            // Component-engine diagnostics go to the build console for the
            // duration of this phase only.
            let _component_log = console::attach_component_sink(self.console.clone());
            match client.create_osa_scan().await {
                Ok(()) => osa_created = true,
                Err(err) => {
                    error!(error = %err, "failed to create component analysis scan");
                    outcome.osa_create_error = Some(err);
                }
            }
        }

        let mut sast_created = false;
        if settings.sast_enabled {
            match client.create_sast_scan().await {
                Ok(()) => sast_created = true,
                Err(err) => {
                    warn!(error = %err, "failed to create SAST scan");
                    outcome.sast_create_error = Some(err);
                }
            }
        }

        if sast_created {
            if settings.synchronous {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        info!("cancellation requested, aborting SAST scan on the server");
                        if let Err(err) = client.cancel_sast_scan().await {
                            debug!(error = %err, "best-effort scan cancellation failed");
                        }
                        return Err(CiError::Cancelled);
                    }
                    waited = client.wait_for_sast_results() => match waited {
                        Ok(results) => outcome.sast_results = Some(results),
                        Err(err) => {
                            error!(error = %err, "failed to get SAST scan results");
                            outcome.sast_wait_error = Some(err);
                        }
                    }
                }
            } else {
                match client.get_latest_sast_results().await {
                    Ok(results) => outcome.sast_results = Some(results),
                    Err(err) => {
                        error!(error = %err, "failed to get SAST scan results");
                        outcome.sast_wait_error = Some(err);
                    }
                }
            }
        }

        if osa_created {
            let waited = if settings.synchronous {
                client.wait_for_osa_results().await
            } else {
                client.get_latest_osa_results().await
            };
            match waited {
                Ok(results) => outcome.osa_results = Some(results),
                Err(err) => {
                    error!(error = %err, "failed to get component analysis results");
                    outcome.osa_wait_error = Some(err);
                }
            }
        }

        Ok(outcome)
    }
}
