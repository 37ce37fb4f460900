//! Runs one fixed question through the agent and prints the result.

use anyhow::Context as _;
use scheduler_agent::core::Message;
use scheduler_agent::{Orchestrator, Settings, extract_answer};

const QUESTION: &str = "이번 주 내 일정 알려줘";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::from_env()?;
    let orchestrator = Orchestrator::from_settings(&settings)
        .await
        .context("failed to set up the agent")?;

    let result = orchestrator
        .run_turn(&[Message::user(QUESTION)])
        .await
        .context("agent run failed")?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    println!();
    println!("{}", extract_answer(&result.messages));
    Ok(())
}
