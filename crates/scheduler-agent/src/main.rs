//! Terminal chat with the scheduling agent.

#[macro_use]
extern crate tracing;

use std::io::Write as _;
use std::time::Duration;

use anyhow::Context as _;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use scheduler_agent::core::{Message, Role};
use scheduler_agent::{ChatEvent, ChatSession, Orchestrator, Settings};
use tokio::io::{self, AsyncBufReadExt};

const BAR_CHAR: &str = "▎";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::from_env()?;
    debug!(?settings, "settings loaded");
    let orchestrator = Orchestrator::from_settings(&settings)
        .await
        .context("failed to set up the agent")?;
    let mut session = ChatSession::new(orchestrator);

    println!("{}", "📅 일정 에이전트 채팅".bold());
    println!(
        "{}",
        "AI 일정 비서에게 자연어로 일정을 요청하세요. (종료: Ctrl-D)".dimmed()
    );

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .context("invalid progress template")?
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");

    let mut stdin = io::BufReader::new(io::stdin());
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line).await? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let progress_bar = ProgressBar::new_spinner();
        progress_bar.set_style(progress_style.clone());
        progress_bar.set_message("에이전트가 응답 중입니다...");
        progress_bar.enable_steady_tick(Duration::from_millis(100));

        let shown = session.transcript().len();
        let event = session.submit(input).await;
        progress_bar.finish_and_clear();

        // The user line is already on screen.
        for msg in session.transcript().iter().skip(shown + 1) {
            render(msg);
        }
        if let ChatEvent::Failed(message) = event {
            println!(
                "{}{}",
                BAR_CHAR.bright_red(),
                format!("에이전트 실행 중 오류 발생: {message}").red()
            );
        }
        println!();
    }

    Ok(())
}

fn render(msg: &Message) {
    match msg.role() {
        Role::Assistant => {
            println!("{}🤖 {}", BAR_CHAR.bright_cyan(), msg.content().bright_white());
        }
        Role::User => {
            println!("{}{}", BAR_CHAR.bright_green(), msg.content());
        }
        Role::System | Role::Tool => {}
    }
}
