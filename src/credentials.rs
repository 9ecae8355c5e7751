// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Connection credential resolution.
//!
//! Resolves between the per-job override set and the global defaults, and
//! between credential-store references and inline username/password fields.
//! Resolution itself never fails: missing inputs become empty strings and
//! [`validate`] is the single place incomplete credentials are rejected,
//! so the user always gets one clear error instead of a different failure
//! per missing field.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{GlobalServerConfig, JobCredentialConfig};
use crate::errors::{CiError, CiResult};
use crate::secret;

/// Authoritative connection tuple for one build invocation.
///
/// The password is held encrypted under the username and decrypted only at
/// the point it goes to the scan protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDetails {
    pub server_url: String,
    pub username: String,
    pub encrypted_password: String,
    pub is_proxy: bool,
    pub is_sca_proxy: bool,
}

/// Username/password pair from the external credential store.
#[derive(Debug, Clone)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

/// Where a credential lookup runs.
///
/// `Run` resolves inside an active build; `Item` resolves against a static
/// job definition, e.g. while validating configuration in the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialScope {
    Run,
    Item,
}

/// External credential store, keyed by opaque identifiers.
pub trait CredentialStore {
    fn lookup(&self, id: &str, scope: CredentialScope) -> Option<Credential>;
}

/// Produce the authoritative connection details from the layered
/// configuration.
///
/// Field-set selection happens first: the job override set when
/// `use_own_server_credentials` is on, the global defaults otherwise. That
/// choice fixes `server_url` and the proxy flags. Username and password then
/// come from the credential store when a credential id is present (a missing
/// entry resolves to empty strings, not to the literal fields), else from
/// the literal fields.
pub fn resolve(
    job: &JobCredentialConfig,
    defaults: &GlobalServerConfig,
    store: &dyn CredentialStore,
    scope: CredentialScope,
) -> ConnectionDetails {
    let (server_url, is_proxy, is_sca_proxy, credentials_id, username, password) =
        if job.use_own_server_credentials {
            (
                job.server_url.clone(),
                job.is_proxy,
                job.is_sca_proxy,
                job.credentials_id.as_deref(),
                job.username.clone(),
                job.password_plaintext.clone(),
            )
        } else {
            (
                defaults.server_url.clone(),
                defaults.is_proxy,
                defaults.is_sca_proxy,
                defaults.credentials_id.as_deref(),
                defaults.username.clone(),
                defaults.password_plaintext.clone(),
            )
        };

    let (username, password) = match credentials_id {
        Some(id) if !id.is_empty() => match store.lookup(id, scope) {
            Some(credential) => {
                debug!(credentials_id = id, "resolved credentials from store");
                (credential.username, credential.password)
            }
            None => {
                debug!(credentials_id = id, "credential id not found in store");
                (String::new(), String::new())
            }
        },
        _ => (username.unwrap_or_default(), password.unwrap_or_default()),
    };

    // Encryption failure degrades to an empty stored password; validate()
    // rejects it with the same message as any other missing field.
    let encrypted_password = secret::encrypt(&password, &username).unwrap_or_default();

    ConnectionDetails {
        server_url: server_url.unwrap_or_default(),
        username,
        encrypted_password,
        is_proxy,
        is_sca_proxy,
    }
}

/// Reject incomplete connection details.
///
/// Fails iff the server URL is empty, the username is empty, or the stored
/// password decrypts to an empty string. Decryption failures are treated as
/// empty and never surfaced raw.
pub fn validate(details: &ConnectionDetails) -> CiResult<()> {
    let password = secret::decrypt(&details.encrypted_password, &details.username)
        .unwrap_or_default();

    if details.server_url.is_empty() || details.username.is_empty() || password.is_empty() {
        return Err(CiError::Credential(
            "Scan server connection details are incomplete. \
             Recheck the configured server URL and credentials."
                .to_string(),
        ));
    }

    Ok(())
}
