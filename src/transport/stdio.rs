//! Stdio transport for the MCP server.
//!
//! This transport uses standard input/output for communication,
//! which is the standard mode for CLI-based MCP integrations.

use crate::error::{NlsqlError, NlsqlResult};
use crate::mcp::NlsqlService;
use crate::tools::ToolDispatcher;
use crate::transport::{Transport, wait_for_signal};
use rmcp::{ServiceExt, transport::stdio};
use std::sync::Arc;
use tracing::{info, warn};

/// Reads JSON-RPC messages from stdin and writes responses to stdout.
pub struct StdioTransport {
    dispatcher: Arc<ToolDispatcher>,
}

impl StdioTransport {
    pub fn new(dispatcher: Arc<ToolDispatcher>) -> Self {
        Self { dispatcher }
    }
}

impl Transport for StdioTransport {
    async fn run(&self) -> NlsqlResult<()> {
        info!("Starting MCP server with stdio transport");

        let service = NlsqlService::new(self.dispatcher.clone());
        let running_service = service.serve(stdio()).await.map_err(|e| {
            NlsqlError::internal(format!("Failed to start stdio transport: {}", e))
        })?;

        let shutdown_requested = tokio::select! {
            result = running_service.waiting() => {
                match result {
                    Ok(_quit_reason) => info!("Stdio transport completed normally"),
                    Err(e) => {
                        warn!(error = %e, "Stdio transport error");
                        self.dispatcher.manager().disconnect().await;
                        return Err(NlsqlError::internal(format!("Stdio transport error: {}", e)));
                    }
                }
                false
            }
            _ = wait_for_signal() => {
                info!("Shutdown signal received (send again to force exit)");
                true
            }
        };

        if shutdown_requested {
            tokio::spawn(async {
                wait_for_signal().await;
                warn!("Received second signal, forcing immediate exit");
                std::process::exit(1);
            });
        }

        info!("Closing database connection");
        self.dispatcher.manager().disconnect().await;

        if shutdown_requested {
            // A blocking stdin read cannot be interrupted by tokio::select!
            info!("Exiting process");
            std::process::exit(0);
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{EngineSettings, GenAiEngine};
    use crate::db::ConnectionManager;

    #[test]
    fn test_stdio_transport_creation() {
        let dispatcher = ToolDispatcher::new(
            Arc::new(ConnectionManager::default()),
            Arc::new(GenAiEngine::new(EngineSettings::default())),
        );
        let transport = StdioTransport::new(Arc::new(dispatcher));
        assert_eq!(transport.name(), "stdio");
    }
}
