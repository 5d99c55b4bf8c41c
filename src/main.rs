//! NLSQL MCP Server - Main entry point.

use clap::Parser;
use nlsql_mcp_server::ai::GenAiEngine;
use nlsql_mcp_server::config::{Command, Config, TransportMode};
use nlsql_mcp_server::db::ConnectionManager;
use nlsql_mcp_server::tools::ToolDispatcher;
use nlsql_mcp_server::transport::{HttpTransport, StdioTransport, Transport};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber. Logs go to stderr so stdout stays free
/// for the stdio transport.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn print_tools(dispatcher: &ToolDispatcher) {
    for tool in dispatcher.list_tools() {
        println!("{}", tool.name);
        for line in tool.description.lines() {
            println!("    {}", line);
        }
        for param in tool.params {
            let requirement = match (param.required, param.default) {
                (true, _) => "required".to_string(),
                (false, Some(default)) => format!(
                    "default: {}",
                    serde_json::to_string(&default).unwrap_or_default()
                ),
                (false, None) => "optional".to_string(),
            };
            println!(
                "    - {} ({}, {}): {}",
                param.name, param.kind, requirement, param.description
            );
        }
    }
}

/// Run one tool and print its blocks. Returns whether the call succeeded.
async fn call_tool(
    dispatcher: &ToolDispatcher,
    tool: &str,
    args: Option<&str>,
) -> Result<bool, Box<dyn std::error::Error>> {
    let args: JsonValue = match args {
        Some(raw) => serde_json::from_str(raw)?,
        None => JsonValue::Null,
    };
    let result = dispatcher.invoke(tool, &args).await;
    for block in &result.blocks {
        if result.is_error {
            eprintln!("{}", block);
        } else {
            println!("{}", block);
        }
    }
    Ok(!result.is_error)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Missing .env is fine
    let _ = dotenvy::dotenv();

    let config = Config::parse();
    init_tracing(&config);

    let manager = Arc::new(ConnectionManager::new(config.connection_settings()));
    let engine = Arc::new(GenAiEngine::new(config.engine_settings()));
    let dispatcher = Arc::new(ToolDispatcher::new(manager.clone(), engine));

    let command = config.command();
    if command == Command::ListTools {
        print_tools(&dispatcher);
        return Ok(());
    }

    if let Some(url) = &config.database {
        match manager.connect_url(url).await {
            Ok(info) => info!(
                db_type = %info.database_type,
                location = %info.location,
                "Connected to startup database"
            ),
            // Serve anyway; the client can still connect the sample database
            Err(e) if command == Command::Serve => {
                warn!(error = %e, "Startup connection failed, starting disconnected")
            }
            Err(e) => return Err(e.into()),
        }
    }

    if let Command::Call { tool, args } = &command {
        let ok = call_tool(&dispatcher, tool, args.as_deref()).await;
        manager.disconnect().await;
        if !ok? {
            std::process::exit(1);
        }
        return Ok(());
    }

    info!(
        transport = %config.transport,
        "Starting NLSQL MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let result = match config.transport {
        TransportMode::Stdio => StdioTransport::new(dispatcher).run().await,
        TransportMode::Http => {
            info!(
                host = %config.http_host,
                port = config.http_port,
                endpoint = %config.mcp_endpoint,
                "Using HTTP transport"
            );
            HttpTransport::new(
                dispatcher,
                &config.http_host,
                config.http_port,
                &config.mcp_endpoint,
            )
            .run()
            .await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
