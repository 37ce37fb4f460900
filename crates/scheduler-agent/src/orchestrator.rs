use scheduler_agent_core::{
    Agent, AgentBuilder, AgentError, AgentResult, Message, Toolset,
};
use scheduler_agent_model::ModelProvider;
use scheduler_agent_openai_model::{OpenAIConfigBuilder, OpenAIProvider};
use scheduler_agent_toolbox::{RemoteToolset, Toolbox};

use crate::config::{ConfigError, Settings};
use crate::error_chain;

/// Shown in place of an answer when the run produced no assistant text.
pub const NO_ANSWER_PLACEHOLDER: &str = "(AI 응답을 찾을 수 없습니다)";

/// The system prompt used unless `AGENT_SYSTEM_PROMPT` overrides it.
pub const DEFAULT_SYSTEM_PROMPT: &str = include_str!("./system_prompt.md");

/// Errors that fail a single turn.
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    /// The agent run was aborted.
    #[error("agent run failed")]
    Agent(#[from] AgentError),
}

/// Runs conversation turns against a configured agent.
#[derive(Clone)]
pub struct Orchestrator {
    agent: Agent,
}

impl Orchestrator {
    /// Creates an orchestrator from an explicit provider and toolset,
    /// using the built-in system prompt.
    pub fn new<P: ModelProvider + 'static>(provider: P, tools: Toolset) -> Self {
        let agent = AgentBuilder::with_model_provider(provider)
            .with_system_prompt(DEFAULT_SYSTEM_PROMPT)
            .with_toolset(tools)
            .build();
        Self { agent }
    }

    /// Creates an orchestrator around an already built agent.
    #[inline]
    pub fn with_agent(agent: Agent) -> Self {
        Self { agent }
    }

    /// Builds the OpenAI provider and collects the tools.
    ///
    /// A remote tool server that cannot be reached is logged and skipped;
    /// only the model credential is fatal.
    pub async fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let Some(api_key) = settings.openai_api_key.clone() else {
            return Err(ConfigError::MissingVar("OPENAI_API_KEY"));
        };
        let mut config = OpenAIConfigBuilder::with_api_key(api_key);
        if let Some(model) = &settings.openai_model {
            config = config.with_model(model);
        }
        if let Some(base_url) = &settings.openai_base_url {
            config = config.with_base_url(base_url);
        }
        let config = config.build();
        info!(model = config.model(), base_url = config.base_url(), "using model");

        let mut tools = Toolbox::builtin(settings.tavily_config()).into_toolset();
        if let Some(transport) = settings.remote_transport() {
            match RemoteToolset::connect(&transport).await {
                Ok(remote) => tools.extend(remote.into_toolset()),
                Err(err) => {
                    warn!(
                        "tool server unavailable, continuing without its tools: {}",
                        error_chain(&err)
                    );
                }
            }
        }

        let system_prompt = settings
            .system_prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_owned());
        let agent = AgentBuilder::with_model_provider(OpenAIProvider::new(config))
            .with_system_prompt(system_prompt)
            .with_toolset(tools)
            .with_max_steps(settings.max_steps)
            .build();
        Ok(Self { agent })
    }

    /// Returns the tools offered to the model.
    #[inline]
    pub fn tools(&self) -> &Toolset {
        self.agent.tools()
    }

    /// Runs one turn over the full transcript.
    ///
    /// The agent is invoked exactly once; failures are not retried.
    pub async fn run_turn(
        &self,
        transcript: &[Message],
    ) -> Result<AgentResult, TurnError> {
        info!(messages = transcript.len(), "running turn");
        let result = self.agent.invoke(transcript.to_vec()).await?;
        debug!(
            status = ?result.status,
            produced = result.messages.len().saturating_sub(transcript.len()),
            "turn finished"
        );
        Ok(result)
    }
}

/// Returns the content of the most recent assistant message.
///
/// Falls back to [`NO_ANSWER_PLACEHOLDER`] when there is no assistant
/// message or the latest one has no text.
pub fn extract_answer(messages: &[Message]) -> String {
    messages
        .iter()
        .rev()
        .find_map(|msg| match msg {
            Message::Assistant { content, .. } => Some(content),
            _ => None,
        })
        .filter(|content| !content.trim().is_empty())
        .cloned()
        .unwrap_or_else(|| NO_ANSWER_PLACEHOLDER.to_owned())
}

#[cfg(test)]
mod tests {
    use scheduler_agent_core::model::ToolCallRequest;

    use super::*;

    #[test]
    fn test_extract_answer() {
        let messages = vec![
            Message::user("이번 주 내 일정 알려줘"),
            Message::assistant("첫 번째 답"),
            Message::user("다시"),
            Message::assistant("두 번째 답"),
        ];
        assert_eq!(extract_answer(&messages), "두 번째 답");

        // A trailing tool message does not hide the assistant answer.
        let mut with_tool = messages.clone();
        with_tool.push(Message::Tool {
            call_id: "call_1".to_owned(),
            content: "{}".to_owned(),
        });
        assert_eq!(extract_answer(&with_tool), "두 번째 답");
    }

    #[test]
    fn test_extract_answer_placeholder() {
        assert_eq!(extract_answer(&[]), NO_ANSWER_PLACEHOLDER);
        assert_eq!(
            extract_answer(&[Message::user("hi")]),
            NO_ANSWER_PLACEHOLDER
        );

        // The latest assistant message only carried tool calls.
        let messages = vec![
            Message::user("hi"),
            Message::assistant("earlier"),
            Message::Assistant {
                content: String::new(),
                tool_calls: vec![ToolCallRequest {
                    id: "call_1".to_owned(),
                    name: "add".to_owned(),
                    arguments: serde_json::json!({}),
                }],
            },
        ];
        assert_eq!(extract_answer(&messages), NO_ANSWER_PLACEHOLDER);
    }

    #[tokio::test]
    async fn test_from_settings_requires_api_key() {
        let err = Orchestrator::from_settings(&Settings::default())
            .await
            .err()
            .unwrap();
        assert_eq!(err, ConfigError::MissingVar("OPENAI_API_KEY"));
    }

    #[tokio::test]
    async fn test_unreachable_tool_server_degrades() {
        let settings = Settings {
            openai_api_key: Some("sk-test".to_owned()),
            tool_server_command: Some("/nonexistent/tool-server".to_owned()),
            ..Default::default()
        };
        let orchestrator = Orchestrator::from_settings(&settings).await.unwrap();
        assert_eq!(
            orchestrator.tools().names(),
            vec![
                "add",
                "search_langgraph_docs",
                "search_fastmcp_docs",
                "status"
            ]
        );
    }
}
