//! Serves the built-in tools over stdio or TCP.

#[macro_use]
extern crate tracing;

use anyhow::Context as _;
use scheduler_agent::toolbox::{ToolServer, Toolbox};
use scheduler_agent::{ServerTransport, Settings};
use tokio::net::TcpListener;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    // Stdout carries the protocol, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::from_env()?;
    let tavily = settings.tavily_config();
    if !tavily.has_api_key() {
        warn!("TAVILY_API_KEY is not set, search tools will fail");
    }
    let server = ToolServer::new(Toolbox::builtin(tavily).into_toolset());

    match settings.tool_server_transport {
        ServerTransport::Stdio => server.serve_stdio().await?,
        ServerTransport::Tcp => {
            let (host, port) = settings.tool_server_addr();
            let listener = TcpListener::bind((host.as_str(), port))
                .await
                .with_context(|| format!("failed to bind {host}:{port}"))?;
            server.serve_tcp(listener).await?;
        }
    }
    Ok(())
}
