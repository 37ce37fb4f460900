//! A chat agent for schedule questions, wired from a hosted model, the
//! built-in toolbox and, optionally, a remote tool server.
//!
//! The crate includes the terminal programs. It can also be used as a
//! library to run turns from another host.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod chat;
mod config;
mod orchestrator;

use std::error::Error as StdError;

pub use chat::{ChatEvent, ChatSession};
pub use config::{
    ConfigError, DEFAULT_TOOL_SERVER_HOST, DEFAULT_TOOL_SERVER_PORT,
    ServerTransport, Settings,
};
pub use orchestrator::{
    DEFAULT_SYSTEM_PROMPT, NO_ANSWER_PLACEHOLDER, Orchestrator, TurnError,
    extract_answer,
};

/// Re-exports of [`scheduler_agent_core`] crate.
pub mod core {
    pub use scheduler_agent_core::*;
}

/// Re-exports of [`scheduler_agent_toolbox`] crate.
pub mod toolbox {
    pub use scheduler_agent_toolbox::*;
}

/// Formats an error followed by each of its sources.
pub fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
