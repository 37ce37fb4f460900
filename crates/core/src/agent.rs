mod builder;
mod run;

use std::sync::Arc;

use scheduler_agent_model::ErrorKind as ModelErrorKind;
use serde::{Deserialize, Serialize};

use crate::conversation::Message;
use crate::model_client::ModelClient;
use crate::tool::{self, Toolset};
pub use builder::{AgentBuilder, DEFAULT_MAX_STEPS};

/// An agent that answers a conversation by alternating between model
/// calls and tool calls.
///
/// The agent is cheap to clone and keeps no per-conversation state, so
/// one instance can serve any number of turns.
#[derive(Clone)]
pub struct Agent {
    inner: Arc<AgentInner>,
}

struct AgentInner {
    model_client: ModelClient,
    tools: Toolset,
    system_prompt: Option<String>,
    max_steps: usize,
}

impl Agent {
    /// Returns the tools offered to the model.
    #[inline]
    pub fn tools(&self) -> &Toolset {
        &self.inner.tools
    }

    /// Runs the conversation until the model produces a final answer.
    ///
    /// The input messages are a prefix of the returned ones. The system
    /// prompt, if any, is only sent to the model and never appears in
    /// the result.
    pub async fn invoke(
        &self,
        messages: Vec<Message>,
    ) -> Result<AgentResult, AgentError> {
        run::run(&self.inner, messages).await
    }
}

/// How a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// The model finished without asking for more tools.
    Success,
    /// The run was cut off after the maximum number of model calls.
    StepLimitReached,
}

/// The outcome of [`Agent::invoke`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentResult {
    /// The input conversation followed by every message the run produced.
    pub messages: Vec<Message>,
    /// How the run ended.
    pub status: AgentStatus,
}

/// Errors that abort a run.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The input conversation had no messages.
    #[error("the conversation is empty")]
    EmptyConversation,
    /// The model request or its response stream failed.
    #[error("model request failed ({kind}): {message}")]
    Model {
        /// The provider's classification.
        kind: ModelErrorKind,
        /// The provider's message.
        message: String,
    },
    /// A tool failed in a way the model cannot recover from.
    #[error("tool `{name}` failed")]
    Tool {
        /// Name of the tool.
        name: String,
        /// The tool error.
        #[source]
        source: tool::Error,
    },
}
