// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - CI Gateway Error Types
 * Production-ready error handling with thiserror
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use thiserror::Error;

/// Remediation guidance shown when the scan server rejects the initial
/// handshake. Kept as one block so the build log shows a single actionable
/// message.
pub(crate) const CONNECTION_GUIDANCE: &str = "Connection failed.\n\
Validate the provided login credentials and server URL are correct.\n\
In addition, make sure the installed lonkero-ci version is compatible with \
the scan server version according to the release notes.";

/// Fatal errors surfaced to the build pipeline.
///
/// Per-scan-type failures (creation or result-wait) are not represented
/// here: they are contained in [`crate::orchestrator::ScanOutcome`] so a
/// failure in one scan type never hides the other's results.
#[derive(Error, Debug)]
pub enum CiError {
    /// Incomplete or undecryptable connection credentials
    #[error("{0}")]
    Credential(String),

    /// Session initialization failed; nothing downstream can run
    #[error("{message}")]
    Connection {
        message: String,
        #[source]
        source: ClientError,
    },

    /// The caller cancelled the run while waiting for results
    #[error("Scan was cancelled before completion")]
    Cancelled,

    /// Local filesystem errors (report output, source directory)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CiError {
    /// Wrap an init failure in the composed remediation message
    pub fn connection_guidance(source: ClientError) -> Self {
        CiError::Connection {
            message: format!("{}\nError: {}", CONNECTION_GUIDANCE, source),
            source,
        }
    }

    /// Wrap an init failure as-is, without remediation guidance
    pub fn connection(source: ClientError) -> Self {
        CiError::Connection {
            message: format!("Failed to initialize scan session: {}", source),
            source,
        }
    }
}

/// Errors raised by the scan protocol client.
///
/// The orchestrator never retries these; each orchestration phase records
/// or propagates them according to its own containment policy.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The server did not accept connections at all
    #[error("Server is unavailable: {message}")]
    ServerUnavailable { message: String },

    /// The server answered but rejected or failed the request
    #[error("Scan service error: {0}")]
    Protocol(String),

    /// HTTP transport failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Local I/O failure while preparing a request
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Check whether this error means the server could not be reached.
    ///
    /// The legacy protocol reported unreachability only through the message
    /// text, so wrapped `Protocol` errors are still matched by substring.
    /// Ambiguous messages resolve to `false`.
    pub fn is_server_unavailable(&self) -> bool {
        match self {
            ClientError::ServerUnavailable { .. } => true,
            ClientError::Protocol(message) => message.contains("Server is unavailable"),
            _ => false,
        }
    }
}

pub type CiResult<T> = Result<T, CiError>;
