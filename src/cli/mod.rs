//! # Command Line Interface
//!
//! Provides CLI commands for admin enrollment, user registration, lifecycle
//! event handling and CA-name derivation. Workflow commands print the
//! structured outcome; `--strict` turns failed outcomes into a non-zero exit.

pub mod output;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::io::AsyncReadExt;

use crate::ca::{derive_ca_name, CaClientOptions, FabricCaConnector};
use crate::config::{json_logs_from_env, CredentialBackend, ProvisionerConfig};
use crate::observability::{init_logging, log_config_info};
use crate::secrets::{CredentialStore, MemoryCredentialStore, VaultCredentialStore};
use crate::trust::LocationTrustMaterialProvider;
use crate::workflow::{
    LifecycleEvent, ProvisioningContext, UserRequest, WorkflowDriver, WorkflowOutcome,
};

#[derive(Parser)]
#[command(name = "msp-provisioner")]
#[command(about = "CA enrollment and identity registration for network members")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Exit non-zero when a workflow does not succeed
    #[arg(long, global = true)]
    pub strict: bool,

    /// Output format (json or yaml)
    #[arg(short, long, global = true, default_value = "json")]
    pub output: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Enroll the organisation admin and persist its key and certificate
    EnrollAdmin,

    /// Register, enroll and persist a client identity
    RegisterUser {
        /// Enrollment ID of the new identity
        #[arg(long)]
        user_id: String,

        /// Affiliation to register under; created if missing
        #[arg(long)]
        affiliation: String,

        /// Credential slot for the one-time enrollment secret
        #[arg(long)]
        password_slot: String,

        /// Credential slot for the private key
        #[arg(long)]
        private_key_slot: String,

        /// Credential slot for the signed certificate
        #[arg(long)]
        cert_slot: String,
    },

    /// Handle a lifecycle event (`{"RequestType": ..., "ResourceProperties": ...}`)
    HandleEvent {
        /// Read the event from a file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Print the CA name derived from a CA host
    CaName {
        /// CA host, optionally with port
        host: String,
    },
}

#[derive(Debug, Serialize)]
struct CaNameOutput<'a> {
    host: &'a str,
    ca_name: String,
}

/// Run CLI commands
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(if cli.verbose { "debug" } else { "info" }, json_logs_from_env());

    let outcome = match cli.command {
        Commands::CaName { host } => {
            let ca_name = derive_ca_name(&host)?;
            return output::print_output(&CaNameOutput { host: &host, ca_name }, &cli.output);
        }
        Commands::EnrollAdmin => build_driver().await?.enroll_admin().await,
        Commands::RegisterUser { user_id, affiliation, password_slot, private_key_slot, cert_slot } => {
            let request =
                UserRequest { user_id, affiliation, password_slot, private_key_slot, cert_slot };
            build_driver().await?.register_user(&request).await
        }
        Commands::HandleEvent { file } => {
            let event = read_event(file).await?;
            build_driver().await?.handle(&event).await
        }
    };

    output::print_output(&outcome, &cli.output)?;
    finish(&outcome, cli.strict)
}

fn finish(outcome: &WorkflowOutcome, strict: bool) -> anyhow::Result<()> {
    if strict && !outcome.is_success() {
        anyhow::bail!("Provisioning did not succeed");
    }
    Ok(())
}

async fn read_event(file: Option<PathBuf>) -> anyhow::Result<LifecycleEvent> {
    let raw = match file {
        Some(path) => tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read event file {}", path.display()))?,
        None => {
            let mut raw = String::new();
            tokio::io::stdin()
                .read_to_string(&mut raw)
                .await
                .context("Failed to read event from stdin")?;
            raw
        }
    };
    serde_json::from_str(&raw).context("Event is not a valid lifecycle event")
}

/// Wire the production collaborators from environment configuration.
pub async fn build_driver() -> anyhow::Result<WorkflowDriver> {
    let config = ProvisionerConfig::from_env()?;
    log_config_info(&config);

    let timeout = config.request_timeout();
    let store: Arc<dyn CredentialStore> = match config.credential_backend {
        CredentialBackend::Vault => {
            let vault = config
                .vault
                .clone()
                .context("Vault backend selected without Vault settings")?;
            Arc::new(VaultCredentialStore::connect(vault, timeout).await?)
        }
        CredentialBackend::Memory => {
            tracing::warn!("Using in-memory credential store; credentials are lost on exit");
            Arc::new(MemoryCredentialStore::new())
        }
    };

    let connector = FabricCaConnector::new(CaClientOptions {
        request_timeout: timeout,
        verify_hostname: config.verify_ca_hostname,
        retry: config.retry(),
    });
    let trust = LocationTrustMaterialProvider::new(timeout)?;

    let ctx = ProvisioningContext::new(
        config.provisioning_settings()?,
        Arc::new(connector),
        store,
        Arc::new(trust),
    );
    Ok(WorkflowDriver::new(ctx))
}
