use std::sync::Arc;

use scheduler_agent_model::ModelProvider;

use super::{Agent, AgentInner};
use crate::model_client::ModelClient;
use crate::tool::{Tool, Toolset};

/// The number of model calls a run may make unless configured otherwise.
pub const DEFAULT_MAX_STEPS: usize = 25;

/// [`Agent`] builder.
pub struct AgentBuilder {
    model_client: ModelClient,
    tools: Toolset,
    system_prompt: Option<String>,
    max_steps: usize,
}

impl AgentBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            tools: Toolset::new(),
            system_prompt: None,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    /// Sets the system prompt sent ahead of every conversation.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Registers a tool.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.tools.add_tool(tool);
        self
    }

    /// Registers every tool of a toolset.
    #[inline]
    pub fn with_toolset(mut self, toolset: Toolset) -> Self {
        self.tools.extend(toolset);
        self
    }

    /// Sets the maximum number of model calls per run.
    ///
    /// Zero is treated as one.
    #[inline]
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    /// Builds the agent.
    pub fn build(self) -> Agent {
        let Self {
            model_client,
            tools,
            system_prompt,
            max_steps,
        } = self;
        debug!(tools = ?tools.names(), max_steps, "agent built");
        Agent {
            inner: Arc::new(AgentInner {
                model_client,
                tools,
                system_prompt,
                max_steps,
            }),
        }
    }
}
