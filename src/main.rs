//! Legacy Gateway
//!
//! Serves a superglobal-driven PHP webapp (Magento-style front controller)
//! from a multithreaded HTTP server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ http::request (InboundRequest)
//!                                          │
//!                                          ▼
//!                                   locator (static | php)
//!                                   │                  │
//!                         plain file│                  │script / not found
//!                                   ▼                  ▼
//!                            static bytes     legacy::translator
//!                                                 │  tables + capture
//!                                                 ▼
//!                                          LegacyApplication (php-cgi)
//!                                                 │
//!     Client Response                             ▼
//!     ◀────────────── http::response ◀──── status + header lines + body
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use axum::http::Method;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use legacy_gateway::config::{load_config, GatewayConfig};
use legacy_gateway::http::InboundRequest;
use legacy_gateway::lifecycle::{trigger_on_signal, Shutdown};
use legacy_gateway::{locator, observability, CgiApplication, HttpServer};

#[derive(Parser)]
#[command(name = "legacy-gateway")]
#[command(version, about = "Hosts a legacy PHP webapp behind a multithreaded HTTP server", long_about = None)]
struct Cli {
    /// TOML configuration file; built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve HTTP (default)
    Serve,
    /// Validate the configuration and exit
    Check,
    /// Resolve a request URI with the configured locator and print the result
    Locate {
        /// Request URI, e.g. /index.php/catalog?id=1
        uri: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Check => {
            println!("configuration ok");
            Ok(())
        }
        Commands::Locate { uri } => locate(&config, &uri),
    }
}

async fn serve(config: GatewayConfig) -> Result<(), Box<dyn std::error::Error>> {
    observability::logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "legacy-gateway starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        document_root = %config.application.document_root.display(),
        interpreter = %config.cgi.interpreter.display(),
        max_workers = config.application.max_workers,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            observability::metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let application = Arc::new(CgiApplication::from_config(&config.cgi));
    let server = HttpServer::new(config, application);

    let shutdown = Shutdown::new();
    let stop = shutdown.subscribe();
    tokio::spawn(trigger_on_signal(shutdown));

    server.run(listener, stop).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn locate(config: &GatewayConfig, uri: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut request = InboundRequest::new(Method::GET, uri).with_application(&config.application);
    let locator = locator::from_kind(config.application.locator);

    let report = match locator.locate(&mut request) {
        Ok(resource) => {
            let script = config.application.is_script(resource.extension());
            serde_json::json!({
                "uri": uri,
                "resource": resource,
                "script": script,
                "server": request.server_vars(),
            })
        }
        Err(err) => serde_json::json!({
            "uri": uri,
            "error": err.to_string(),
            "front_controller": config.application.front_controller,
        }),
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
