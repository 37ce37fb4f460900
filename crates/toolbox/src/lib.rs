//! Built-in tools of the scheduling agent, and a line-delimited JSON-RPC
//! protocol to serve them from a separate process or reach them remotely.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod client;
pub mod protocol;
mod server;
mod tavily;
mod toolbox;
pub mod tools;

pub use client::{ClientError, RemoteToolset, TransportConfig};
pub use server::ToolServer;
pub use tavily::{DEFAULT_TAVILY_BASE_URL, TavilyClient, TavilyConfig};
pub use toolbox::{SERVER_NAME, SERVER_VERSION, Toolbox};
