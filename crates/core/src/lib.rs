//! The agent runtime: conversation types, tool plumbing and the
//! model/tool-call loop that turns a transcript into an answer.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod agent;
pub mod conversation;
mod model_client;
pub mod tool;

pub use agent::{
    Agent, AgentBuilder, AgentError, AgentResult, AgentStatus,
    DEFAULT_MAX_STEPS,
};
pub use conversation::{Message, Role};
pub use tool::{Tool, Toolset};

/// Re-exports of the model abstraction.
pub mod model {
    pub use scheduler_agent_model::*;
}
