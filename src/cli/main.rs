// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Lonkero CI - Scan Gateway for Build Pipelines
 * Standalone CLI that triggers SAST and component-analysis scans on a
 * remote scan server, waits for results and reports the outcome back to
 * the build
 *
 * (c) 2026 Bountyy Oy
 */

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use validator::Validate;

use lonkero_ci::config::{GlobalServerConfig, JobCredentialConfig, ProxySettings, ScanSettings};
use lonkero_ci::console::TracingConsole;
use lonkero_ci::credentials::{self, Credential, CredentialScope, CredentialStore};
use lonkero_ci::errors::CiError;
use lonkero_ci::orchestrator::ScanOutcome;
use lonkero_ci::rest_client::RestScanClient;
use lonkero_ci::ScanOrchestrator;

/// Lonkero CI - scan gateway for build pipelines
#[derive(Parser)]
#[command(name = "lonkero-ci")]
#[command(author = "Bountyy Oy <info@bountyy.fi>")]
#[command(version = "2.0.0")]
#[command(about = "Trigger scans from CI, wait for results, report back.", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    /// Quiet mode - only show errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Trigger scans for a checked-out workspace and collect the outcome
    Scan {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Project the scans are filed under on the server
        #[arg(short, long)]
        project: String,

        /// Workspace containing the checked-out sources
        #[arg(short, long, default_value = ".")]
        workspace: PathBuf,

        /// Disable the SAST scan
        #[arg(long)]
        no_sast: bool,

        /// Enable the open source component analysis scan
        #[arg(long)]
        osa: bool,

        /// Fetch the latest known snapshot instead of blocking for final results
        #[arg(long)]
        no_wait: bool,

        /// Skip XML report generation on the server
        #[arg(long)]
        no_xml_report: bool,

        /// Outcome report path (defaults to lonkero-ci-outcome.json in the workspace)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Outbound proxy URL (http://host:port)
        #[arg(long)]
        proxy: Option<String>,

        /// Proxy username
        #[arg(long)]
        proxy_username: Option<String>,

        /// Proxy password (never logged)
        #[arg(long, env = "LONKERO_CI_PROXY_PASSWORD", hide_env_values = true)]
        proxy_password: Option<String>,
    },

    /// Validate connection settings without triggering a scan
    Validate {
        #[command(flatten)]
        connection: ConnectionArgs,
    },
}

#[derive(Args)]
struct ConnectionArgs {
    /// Scan server URL
    #[arg(long, env = "LONKERO_CI_SERVER_URL")]
    server_url: Option<String>,

    /// Username for the scan server
    #[arg(long, env = "LONKERO_CI_USERNAME")]
    username: Option<String>,

    /// Password for the scan server (never logged)
    #[arg(long, env = "LONKERO_CI_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Credential-store id; wins over --username/--password
    #[arg(long, env = "LONKERO_CI_CREDENTIALS_ID")]
    credentials_id: Option<String>,

    /// Route SAST traffic through the proxy
    #[arg(long)]
    use_proxy: bool,

    /// Route component-analysis traffic through the proxy
    #[arg(long)]
    use_sca_proxy: bool,

    /// Global defaults file (yaml, toml or json)
    #[arg(long)]
    defaults: Option<PathBuf>,

    /// Ignore the per-job settings and connect with the global defaults
    #[arg(long)]
    use_global_defaults: bool,
}

impl ConnectionArgs {
    fn job_config(&self) -> JobCredentialConfig {
        JobCredentialConfig {
            use_own_server_credentials: !self.use_global_defaults,
            server_url: self.server_url.clone(),
            username: self.username.clone(),
            password_plaintext: self.password.clone(),
            credentials_id: self.credentials_id.clone(),
            is_proxy: self.use_proxy,
            is_sca_proxy: self.use_sca_proxy,
        }
    }

    fn global_config(&self) -> Result<GlobalServerConfig> {
        match &self.defaults {
            Some(path) => load_global_defaults(path),
            None => Ok(GlobalServerConfig::default()),
        }
    }
}

/// Credential store backed by environment variables, the conventional
/// secret channel in CI executors: `LONKERO_CI_CRED_<ID>_USERNAME` and
/// `LONKERO_CI_CRED_<ID>_PASSWORD`.
struct EnvCredentialStore;

impl CredentialStore for EnvCredentialStore {
    fn lookup(&self, id: &str, _scope: CredentialScope) -> Option<Credential> {
        let key = id.to_uppercase().replace(['-', '.'], "_");
        let username = std::env::var(format!("LONKERO_CI_CRED_{}_USERNAME", key)).ok()?;
        let password = std::env::var(format!("LONKERO_CI_CRED_{}_PASSWORD", key)).ok()?;
        Some(Credential { username, password })
    }
}

fn load_global_defaults(path: &Path) -> Result<GlobalServerConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read defaults file: {:?}", path))?;

    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match extension {
        "yaml" | "yml" => serde_yaml::from_str(&content).context("Failed to parse YAML defaults"),
        "toml" => toml::from_str(&content).context("Failed to parse TOML defaults"),
        "json" => serde_json::from_str(&content).context("Failed to parse JSON defaults"),
        other => bail!("Unsupported defaults file format: {:?}", other),
    }
}

fn parse_proxy(
    raw: &str,
    username: Option<String>,
    password: Option<String>,
) -> Result<ProxySettings> {
    let url = url::Url::parse(raw).context("Invalid proxy URL")?;
    let host = url
        .host_str()
        .context("Proxy URL is missing a host")?
        .to_string();
    let port = url.port().unwrap_or(8080);

    Ok(ProxySettings {
        host,
        port,
        username,
        password,
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    // Create async runtime
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_cpus::get())
        .thread_name("lonkero-ci")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Scan {
            connection,
            project,
            workspace,
            no_sast,
            osa,
            no_wait,
            no_xml_report,
            output,
            proxy,
            proxy_username,
            proxy_password,
        } => {
            let details = credentials::resolve(
                &connection.job_config(),
                &connection.global_config()?,
                &EnvCredentialStore,
                CredentialScope::Run,
            );
            credentials::validate(&details)?;

            let mut settings = ScanSettings::new(project);
            settings.sast_enabled = !no_sast;
            settings.osa_enabled = osa;
            settings.synchronous = !no_wait;
            if no_xml_report {
                settings.generate_xml_report = Some(false);
            }
            settings.validate().context("Invalid scan settings")?;

            let mut orchestrator = ScanOrchestrator::new(settings, Arc::new(TracingConsole));
            if let Some(raw) = proxy.as_deref() {
                orchestrator =
                    orchestrator.with_proxy(parse_proxy(raw, proxy_username, proxy_password)?);
            }

            // A second interrupt kills the process; the first one cancels
            // cooperatively so the server-side scan gets aborted too.
            let cancel = CancellationToken::new();
            let interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, cancelling scan");
                    interrupt.cancel();
                }
            });

            let workspace = workspace
                .canonicalize()
                .with_context(|| format!("Workspace does not exist: {:?}", workspace))?;

            let outcome = orchestrator
                .run_scan(
                    &workspace,
                    |settings, proxy| {
                        RestScanClient::new(settings, details.clone(), proxy)
                            .map_err(CiError::connection)
                    },
                    cancel,
                )
                .await?;

            let report_path =
                output.unwrap_or_else(|| workspace.join("lonkero-ci-outcome.json"));
            let report = serde_json::to_string_pretty(&outcome.report())?;
            std::fs::write(&report_path, report)
                .with_context(|| format!("Failed to write outcome report: {:?}", report_path))?;
            info!("Outcome report written to {:?}", report_path);

            print_summary(&outcome);

            if outcome.has_failures() {
                bail!("Scan completed with failures; see the outcome report for details");
            }
            Ok(())
        }

        Commands::Validate { connection } => {
            let details = credentials::resolve(
                &connection.job_config(),
                &connection.global_config()?,
                &EnvCredentialStore,
                CredentialScope::Item,
            );
            credentials::validate(&details)?;
            info!(server_url = %details.server_url, "Connection settings are valid");
            Ok(())
        }
    }
}

fn print_summary(outcome: &ScanOutcome) {
    if let Some(sast) = &outcome.sast_results {
        info!(
            scan_id = sast.scan_id,
            finished = sast.scan_finished,
            high = sast.high,
            medium = sast.medium,
            low = sast.low,
            "SAST results"
        );
    }
    if let Some(err) = &outcome.sast_create_error {
        warn!("SAST scan was not created: {}", err);
    }
    if let Some(err) = &outcome.sast_wait_error {
        warn!("SAST results could not be retrieved: {}", err);
    }

    if let Some(osa) = &outcome.osa_results {
        info!(
            analysis_id = %osa.analysis_id,
            finished = osa.analysis_finished,
            libraries = osa.total_libraries,
            high = osa.high_vulnerabilities,
            medium = osa.medium_vulnerabilities,
            low = osa.low_vulnerabilities,
            "Component analysis results"
        );
    }
    if let Some(err) = &outcome.osa_create_error {
        warn!("Component analysis was not created: {}", err);
    }
    if let Some(err) = &outcome.osa_wait_error {
        warn!("Component analysis results could not be retrieved: {}", err);
    }
}
