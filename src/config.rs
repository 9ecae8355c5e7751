// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Scan and connection configuration for the CI gateway.
//!
//! Credentials resolve through two layers: a per-job override set and a
//! global default set. The job side wins only when
//! `use_own_server_credentials` is on; otherwise every connection field
//! comes from the global descriptor.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use validator::Validate;

/// Which scans to run and how to wait for them.
///
/// Owned by the caller; the orchestrator only stamps in the resolved
/// source and report directories at the start of a run.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ScanSettings {
    /// Project the scans are filed under on the server
    #[validate(length(min = 1))]
    pub project_name: String,

    #[serde(default = "default_true")]
    pub sast_enabled: bool,

    #[serde(default)]
    pub osa_enabled: bool,

    /// Block until final results instead of fetching the latest snapshot
    #[serde(default = "default_true")]
    pub synchronous: bool,

    /// Checked-out source directory; stamped by the orchestrator
    #[serde(default)]
    pub source_dir: Option<PathBuf>,

    /// Report output directory; stamped by the orchestrator
    #[serde(default)]
    pub reports_dir: Option<PathBuf>,

    /// Unset means enabled, matching historical job definitions
    #[serde(default)]
    pub generate_xml_report: Option<bool>,
}

impl ScanSettings {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            sast_enabled: true,
            osa_enabled: false,
            synchronous: true,
            source_dir: None,
            reports_dir: None,
            generate_xml_report: None,
        }
    }

    /// XML report generation, defaulted for jobs saved before the flag existed
    pub fn xml_report_enabled(&self) -> bool {
        self.generate_xml_report.unwrap_or(true)
    }
}

/// Per-job connection override set.
///
/// Only consulted when `use_own_server_credentials` is true; otherwise the
/// resolver falls through to [`GlobalServerConfig`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JobCredentialConfig {
    #[serde(default)]
    pub use_own_server_credentials: bool,

    #[validate(url)]
    #[serde(default)]
    pub server_url: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    /// Plaintext password from the job definition; encrypted at resolution
    #[serde(default)]
    pub password_plaintext: Option<String>,

    /// Credential-store identifier; takes precedence over the literal fields
    #[serde(default)]
    pub credentials_id: Option<String>,

    #[serde(default)]
    pub is_proxy: bool,

    #[serde(default)]
    pub is_sca_proxy: bool,
}

/// Global connection defaults shared by every job that does not carry its
/// own credentials. Same field shape as the job override set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GlobalServerConfig {
    #[validate(url)]
    #[serde(default)]
    pub server_url: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password_plaintext: Option<String>,

    #[serde(default)]
    pub credentials_id: Option<String>,

    #[serde(default)]
    pub is_proxy: bool,

    #[serde(default)]
    pub is_sca_proxy: bool,
}

/// Outbound proxy supplied by the execution environment.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProxySettings {
    #[validate(length(min = 1))]
    pub host: String,

    #[validate(range(min = 1, max = 65535))]
    pub port: u16,

    #[serde(default)]
    pub username: Option<String>,

    /// Never logged; rendered as a masked placeholder
    #[serde(default)]
    pub password: Option<String>,
}

impl ProxySettings {
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xml_report_defaults_to_enabled() {
        let mut settings = ScanSettings::new("storefront");
        assert!(settings.xml_report_enabled());

        settings.generate_xml_report = Some(false);
        assert!(!settings.xml_report_enabled());
    }

    #[test]
    fn test_settings_deserialize_with_defaults() {
        let settings: ScanSettings =
            serde_json::from_str(r#"{"projectName":"storefront"}"#).unwrap();
        assert!(settings.sast_enabled);
        assert!(!settings.osa_enabled);
        assert!(settings.synchronous);
        assert!(settings.source_dir.is_none());
    }

    #[test]
    fn test_job_config_uses_camel_case() {
        let job: JobCredentialConfig = serde_json::from_str(
            r#"{"useOwnServerCredentials":true,"serverUrl":"https://scan.example.com","credentialsId":"prod-scan"}"#,
        )
        .unwrap();
        assert!(job.use_own_server_credentials);
        assert_eq!(job.credentials_id.as_deref(), Some("prod-scan"));
    }
}
