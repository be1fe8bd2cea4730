//! ONTAP SMB Service Broker
//!
//! Process entry point: resolve configuration, set up logging, load the
//! catalog, wire the orchestrator to the array's two control surfaces, and
//! serve the broker API.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ontap_smb_broker::{
    catalog,
    config::{Args, BrokerConfig},
    ApiServer, ApiServerConfig, RestClient, Result, ShellAutomation, ShellConfig, SmbBroker,
    SmbBrokerConfig,
};

/// Request timeout against the ONTAP REST API
const ONTAP_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = BrokerConfig::resolve(args)?;

    init_logging(&config);

    info!("Starting ONTAP SMB broker");
    info!("  Version: {}", ontap_smb_broker::VERSION);
    info!("  ONTAP: {}", config.ontap_url);
    info!("  SVM: {}", config.ontap_svm_name);
    info!("  CIFS host: {}", config.cifs_hostname);
    info!("  Max volume size: {}", config.max_volume_size);

    let services = catalog::load(Path::new(&config.catalog_path), &config.docs_url)?;
    info!("Loaded {} catalog service(s)", services.len());

    let rest = RestClient::new(
        &config.ontap_url,
        &config.ontap_user,
        &config.ontap_password,
        config.ontap_skip_ssl_check,
        ONTAP_REQUEST_TIMEOUT,
    )?;

    let shell = ShellAutomation::new(ShellConfig::new(
        rest.host(),
        &config.ontap_user,
        &config.ontap_password,
        config.trusted_ssh_key.clone(),
    ));

    let broker = Arc::new(SmbBroker::new(
        SmbBrokerConfig {
            svm_name: config.ontap_svm_name.clone(),
            cifs_hostname: config.cifs_hostname.clone(),
            volume_name_prefix: config.volume_name_prefix.clone(),
            max_volume_size: config.max_volume_size.clone(),
            max_volume_size_bytes: config.max_volume_size_bytes,
        },
        rest,
        shell,
    ));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let server = ApiServer::new(
        ApiServerConfig {
            addr,
            broker_username: config.broker_username.clone(),
            broker_password: config.broker_password.clone(),
        },
        broker,
        Arc::new(services),
    );

    server.run().await?;

    info!("Broker shutdown complete");
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(config: &BrokerConfig) {
    let level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("hyper=warn".parse().unwrap())
        .add_directive("tower=warn".parse().unwrap())
        .add_directive("axum=info".parse().unwrap());

    if config.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
