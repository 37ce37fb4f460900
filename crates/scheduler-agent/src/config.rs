use std::fmt::{self, Debug};
use std::str::FromStr;

use scheduler_agent_core::DEFAULT_MAX_STEPS;
use scheduler_agent_toolbox::{TavilyConfig, TransportConfig};

/// Host the tool server binds to, and the client connects to, by default.
pub const DEFAULT_TOOL_SERVER_HOST: &str = "127.0.0.1";

/// Port the tool server binds to, and the client connects to, by default.
pub const DEFAULT_TOOL_SERVER_PORT: u16 = 8000;

/// Errors in the environment configuration.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is absent or empty.
    #[error("{0} is not set in the environment")]
    MissingVar(&'static str),
    /// A variable could not be parsed.
    #[error("{name} has an invalid value `{value}`: {reason}")]
    InvalidVar {
        /// Variable name.
        name: &'static str,
        /// The offending value.
        value: String,
        /// What was expected.
        reason: String,
    },
}

/// How the tool server binary exposes its tools.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ServerTransport {
    /// Standard input and output.
    #[default]
    Stdio,
    /// A TCP listener.
    Tcp,
}

impl FromStr for ServerTransport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdio" => Ok(ServerTransport::Stdio),
            "tcp" => Ok(ServerTransport::Tcp),
            _ => Err("expected `stdio` or `tcp`".to_owned()),
        }
    }
}

/// Settings read once at startup.
///
/// Empty variables count as unset. Nothing here is validated against a
/// remote service; a bad key shows up on the first request that uses it.
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    /// Model credential. Required to build an orchestrator.
    pub openai_api_key: Option<String>,
    /// Endpoint of the OpenAI-compatible API.
    pub openai_base_url: Option<String>,
    /// Model name.
    pub openai_model: Option<String>,
    /// Search credential. Only needed when a search tool runs.
    pub tavily_api_key: Option<String>,
    /// Endpoint of the search API.
    pub tavily_base_url: Option<String>,
    /// Program to spawn as a stdio tool server.
    pub tool_server_command: Option<String>,
    /// Arguments for [`tool_server_command`](Self::tool_server_command).
    pub tool_server_args: Vec<String>,
    /// TCP tool server host.
    pub tool_server_host: Option<String>,
    /// TCP tool server port.
    pub tool_server_port: Option<u16>,
    /// Transport of the tool server binary.
    pub tool_server_transport: ServerTransport,
    /// Replaces the built-in system prompt.
    pub system_prompt: Option<String>,
    /// Maximum model calls per turn.
    pub max_steps: usize,
}

impl Settings {
    /// Reads the settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the settings through the given lookup function.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let tool_server_port = parse_var(&var, "TOOL_SERVER_PORT", |raw| {
            raw.parse::<u16>().map_err(|err| err.to_string())
        })?;
        let tool_server_transport =
            parse_var(&var, "TOOL_SERVER_TRANSPORT", ServerTransport::from_str)?
                .unwrap_or_default();
        let max_steps = parse_var(&var, "AGENT_MAX_STEPS", |raw| {
            match raw.parse::<usize>() {
                Ok(0) => Err("must be at least 1".to_owned()),
                Ok(steps) => Ok(steps),
                Err(err) => Err(err.to_string()),
            }
        })?
        .unwrap_or(DEFAULT_MAX_STEPS);

        Ok(Settings {
            openai_api_key: var("OPENAI_API_KEY"),
            openai_base_url: var("OPENAI_BASE_URL"),
            openai_model: var("OPENAI_MODEL"),
            tavily_api_key: var("TAVILY_API_KEY"),
            tavily_base_url: var("TAVILY_BASE_URL"),
            tool_server_command: var("TOOL_SERVER_COMMAND"),
            tool_server_args: var("TOOL_SERVER_ARGS")
                .map(|args| args.split_whitespace().map(str::to_owned).collect())
                .unwrap_or_default(),
            tool_server_host: var("TOOL_SERVER_HOST"),
            tool_server_port,
            tool_server_transport,
            system_prompt: var("AGENT_SYSTEM_PROMPT"),
            max_steps,
        })
    }

    /// Returns where to reach a remote tool server, if one is configured.
    ///
    /// A command takes precedence over a host or port.
    pub fn remote_transport(&self) -> Option<TransportConfig> {
        if let Some(command) = &self.tool_server_command {
            return Some(TransportConfig::Stdio {
                command: command.clone(),
                args: self.tool_server_args.clone(),
            });
        }
        if self.tool_server_host.is_none() && self.tool_server_port.is_none() {
            return None;
        }
        let (host, port) = self.tool_server_addr();
        Some(TransportConfig::Tcp { host, port })
    }

    /// Returns the search API configuration.
    pub fn tavily_config(&self) -> TavilyConfig {
        let config = TavilyConfig::new(self.tavily_api_key.clone());
        match &self.tavily_base_url {
            Some(base_url) => config.with_base_url(base_url),
            None => config,
        }
    }

    /// Returns the TCP host and port, with defaults filled in.
    pub fn tool_server_addr(&self) -> (String, u16) {
        (
            self.tool_server_host
                .clone()
                .unwrap_or_else(|| DEFAULT_TOOL_SERVER_HOST.to_owned()),
            self.tool_server_port.unwrap_or(DEFAULT_TOOL_SERVER_PORT),
        )
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            openai_api_key: None,
            openai_base_url: None,
            openai_model: None,
            tavily_api_key: None,
            tavily_base_url: None,
            tool_server_command: None,
            tool_server_args: Vec::new(),
            tool_server_host: None,
            tool_server_port: None,
            tool_server_transport: ServerTransport::default(),
            system_prompt: None,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

fn parse_var<T, V, P>(
    var: &V,
    name: &'static str,
    parse: P,
) -> Result<Option<T>, ConfigError>
where
    V: Fn(&str) -> Option<String>,
    P: FnOnce(&str) -> Result<T, String>,
{
    let Some(raw) = var(name) else {
        return Ok(None);
    };
    parse(&raw)
        .map(Some)
        .map_err(|reason| ConfigError::InvalidVar {
            name,
            value: raw,
            reason,
        })
}

impl Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |key: &Option<String>| key.as_ref().map(|_| "<redacted>");
        f.debug_struct("Settings")
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("openai_base_url", &self.openai_base_url)
            .field("openai_model", &self.openai_model)
            .field("tavily_api_key", &redact(&self.tavily_api_key))
            .field("tavily_base_url", &self.tavily_base_url)
            .field("tool_server_command", &self.tool_server_command)
            .field("tool_server_args", &self.tool_server_args)
            .field("tool_server_host", &self.tool_server_host)
            .field("tool_server_port", &self.tool_server_port)
            .field("tool_server_transport", &self.tool_server_transport)
            .field("system_prompt", &self.system_prompt.is_some())
            .field("max_steps", &self.max_steps)
            .finish()
    }
}
