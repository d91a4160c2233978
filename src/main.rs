use anyhow::Context;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use odoo::OdooClient;
use openmrs::OpenmrsClient;
use sync_core::{DocumentImport, ServiceEndpoint, SubjectProvisioning, SyncConfig};
use sync_webdav::WebdavClient;

mod config;

use config::{Settings, Workflow};

#[derive(Parser)]
#[command(name = "clinic-sync")]
#[command(about = "Synchronise CRM contacts, stored results and clinical records")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Attach staged result files to their subjects' clinical records
    ImportDocuments,
    /// Create clinical subjects for CRM contacts that have none
    ProvisionSubjects,
}

/// Entry point for the clinic-sync jobs.
///
/// Each command runs one workflow to completion and exits. Settings come from the environment
/// (a `.env` file is honoured); see `config.rs` for the variables and their defaults.
///
/// # Returns
/// * `Ok(())` - If the workflow ran, even when individual records were skipped
/// * `Err(anyhow::Error)` - If configuration is invalid or the run could not start
fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("clinic_sync=info".parse()?)
                .add_directive("sync_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let result = run(cli.command);
    if let Err(e) = &result {
        tracing::error!("CRITICAL: {:#}", e);
    }
    result
}

fn run(command: Commands) -> anyhow::Result<()> {
    let workflow = match command {
        Commands::ImportDocuments => Workflow::ImportDocuments,
        Commands::ProvisionSubjects => Workflow::ProvisionSubjects,
    };
    let Settings { connections, sync } = Settings::from_env(workflow)?;
    let sync: Arc<SyncConfig> = Arc::new(sync);

    match workflow {
        Workflow::ImportDocuments => {
            let storage = connections
                .storage
                .as_ref()
                .context("Nextcloud settings are missing")?;
            let store = webdav_client(storage)?;
            let clinical = openmrs_client(&connections.clinical)?;
            let report = DocumentImport::new(sync, &store, &clinical).run()?;
            tracing::info!(
                "++ Import complete: {} of {} files moved to processed",
                report.succeeded(),
                report.files.len()
            );
        }
        Workflow::ProvisionSubjects => {
            let crm = connections
                .crm
                .as_ref()
                .context("Odoo settings are missing")?;
            let directory = OdooClient::connect(
                crm.server.url(),
                crm.database.as_str(),
                crm.server.credentials().username(),
                crm.server.credentials().password(),
            )?;
            let clinical = openmrs_client(&connections.clinical)?;
            let report = SubjectProvisioning::new(sync, &directory, &clinical).run()?;
            tracing::info!(
                "++ Provisioning complete: {} created, {} already existed, {} failed",
                report.created(),
                report.already_existing(),
                report.failed()
            );
        }
    }

    Ok(())
}

fn openmrs_client(endpoint: &ServiceEndpoint) -> anyhow::Result<OpenmrsClient> {
    let credentials = endpoint.credentials();
    Ok(OpenmrsClient::new(
        endpoint.url(),
        credentials.username(),
        credentials.password(),
    )?)
}

fn webdav_client(endpoint: &ServiceEndpoint) -> anyhow::Result<WebdavClient> {
    let credentials = endpoint.credentials();
    Ok(WebdavClient::new(
        endpoint.url(),
        credentials.username(),
        credentials.password(),
    )?)
}
