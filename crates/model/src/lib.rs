//! Provider-neutral types for talking to a chat model.
//!
//! The agent runtime only speaks in terms of this crate: a
//! [`ModelRequest`] goes in, a stream of [`ModelResponseEvent`]s comes
//! out. Concrete providers (OpenAI-compatible endpoints, the scripted
//! test model) live in their own crates and implement
//! [`ModelProvider`].
//!
//! Nothing here performs I/O.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
