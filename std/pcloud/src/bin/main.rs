//! Binary entry point for the pcmcp-pcloud server.

use clap::{Parser, builder::FalseyValueParser};
use pcmcp::{Dispatcher, Server, Session, server::shutdown_signal};
use pcmcp_pcloud::{auto_login, client::PcloudClient, config::Config, server_info};
use std::{process::ExitCode, sync::Arc, time::Duration};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// pCloud MCP Server: pCloud file storage tools over line-delimited JSON on stdio.
#[derive(Parser)]
#[command(name = "pcmcp-pcloud", version, about)]
struct Cli {
    #[command(flatten)]
    config: Config,

    /// Log at debug level (overridden by RUST_LOG).
    #[arg(long, env = "PCLOUD_MCP_DEBUG", value_parser = FalseyValueParser::new())]
    debug: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let default_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(error = %err, "failed to start runtime");
            return ExitCode::FAILURE;
        }
    };
    let result = runtime.block_on(run(cli.config));
    // The blocking stdin reader never returns on its own after shutdown.
    runtime.shutdown_timeout(Duration::from_millis(200));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %format!("{err:#}"), "server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    info!(?config, "starting pCloud MCP server");
    let client = PcloudClient::new(&config.api_url)?;
    let session = Arc::new(Session::new(config.initial_token()));

    if config.wants_auto_login() {
        auto_login(&client, &session, &config).await;
    } else if session.token().await.is_none() {
        warn!("no access token configured; pCloud calls will fail until `login` succeeds");
    }

    let registry = pcmcp_pcloud::registry(&client, &config)?;
    info!(
        tools = registry.tools().count(),
        resources = registry.resources().count(),
        "registry built"
    );
    let dispatcher = Dispatcher::new(registry, server_info(&config), session);
    let (stdin, stdout) = pcmcp::transport::stdio();
    Server::new(dispatcher)
        .with_max_in_flight(config.max_in_flight.into())
        .serve(stdin, stdout, shutdown_signal())
        .await?;
    Ok(())
}
