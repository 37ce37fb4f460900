use std::future::ready;
use std::time::Instant;

use scheduler_agent_core::tool::{Error as ToolError, Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parameters of [`StatusTool`]; it takes none.
#[derive(Deserialize, JsonSchema)]
pub struct StatusToolParameters {}

#[derive(Serialize)]
struct StatusReport<'a> {
    status: &'static str,
    server: &'a str,
    version: &'a str,
    uptime_secs: u64,
    tools: &'a [String],
}

/// A tool that reports server health and the available tools.
pub struct StatusTool {
    parameter_schema: Value,
    server: String,
    version: String,
    tools: Vec<String>,
    started_at: Instant,
}

impl StatusTool {
    /// Creates a status tool reporting the given tool names.
    pub fn new<S, V>(server: S, version: V, tools: Vec<String>) -> Self
    where
        S: Into<String>,
        V: Into<String>,
    {
        StatusTool {
            parameter_schema: schema_for!(StatusToolParameters).to_value(),
            server: server.into(),
            version: version.into(),
            tools,
            started_at: Instant::now(),
        }
    }

    fn report(&self) -> ToolResult {
        let report = StatusReport {
            status: "ok",
            server: &self.server,
            version: &self.version,
            uptime_secs: self.started_at.elapsed().as_secs(),
            tools: &self.tools,
        };
        serde_json::to_string(&report).map_err(|err| {
            ToolError::execution_error().with_reason(err.to_string())
        })
    }
}

impl Tool for StatusTool {
    type Input = StatusToolParameters;

    fn name(&self) -> &str {
        "status"
    }

    fn description(&self) -> &str {
        "Reports the tool server status, its version and the available tools."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        _input: StatusToolParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        ready(self.report())
    }
}

#[cfg(test)]
mod tests {
    use scheduler_agent_core::Toolset;
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_report() {
        let tool = StatusTool::new(
            "scheduler-tool-server",
            "0.1.0",
            vec!["add".to_owned(), "status".to_owned()],
        );
        let toolset = Toolset::new().with_tool(tool);
        let output = toolset.call("status", Value::Null).await.unwrap();

        let report: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(report["status"], "ok");
        assert_eq!(report["server"], "scheduler-tool-server");
        assert_eq!(report["version"], "0.1.0");
        assert_eq!(report["tools"], json!(["add", "status"]));
        assert!(report["uptime_secs"].is_u64());
    }
}
