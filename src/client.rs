// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Scan protocol client boundary.
//!
//! One session drives both scan types against the same server. A session is
//! exclusively owned by a single orchestration run; `init` must succeed
//! before any scan call, and `close` is always the last call on a session.

use serde::{Deserialize, Serialize};

use crate::errors::ClientError;

/// SAST scan results, final or latest-snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SastResults {
    pub scan_id: u64,

    /// False for a snapshot of a scan still in progress
    pub scan_finished: bool,

    pub high: u32,
    pub medium: u32,
    pub low: u32,
    pub information: u32,

    #[serde(default)]
    pub statistics_link: Option<String>,
}

/// Open-source component analysis results, final or latest-snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OsaResults {
    pub analysis_id: String,

    pub analysis_finished: bool,

    pub total_libraries: u32,
    pub high_vulnerabilities: u32,
    pub medium_vulnerabilities: u32,
    pub low_vulnerabilities: u32,
}

/// Remote scan session.
///
/// Every method is a potentially long-blocking network operation. Callers
/// bound the synchronous waits externally; the client itself enforces no
/// deadline.
#[async_trait::async_trait]
pub trait ScanClient: Send + Sync {
    /// Handshake and authenticate; prerequisite for every other call
    async fn init(&self) -> Result<(), ClientError>;

    /// Authenticate only, used to sharpen init diagnostics
    async fn login(&self) -> Result<(), ClientError>;

    async fn create_sast_scan(&self) -> Result<(), ClientError>;

    /// Block until the SAST scan reports final results
    async fn wait_for_sast_results(&self) -> Result<SastResults, ClientError>;

    /// Fetch whatever SAST results exist right now, without blocking
    async fn get_latest_sast_results(&self) -> Result<SastResults, ClientError>;

    /// Ask the server to abort the running SAST scan
    async fn cancel_sast_scan(&self) -> Result<(), ClientError>;

    async fn create_osa_scan(&self) -> Result<(), ClientError>;

    /// Block until the component analysis reports final results
    async fn wait_for_osa_results(&self) -> Result<OsaResults, ClientError>;

    /// Fetch whatever component analysis results exist right now
    async fn get_latest_osa_results(&self) -> Result<OsaResults, ClientError>;

    /// End the session; idempotence is not required, call exactly once
    async fn close(&self) -> Result<(), ClientError>;
}
