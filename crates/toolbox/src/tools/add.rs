use std::future::ready;

use scheduler_agent_core::tool::{Error as ToolError, Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

/// Parameters of [`AddTool`].
#[derive(Deserialize, JsonSchema)]
pub struct AddToolParameters {
    #[schemars(description = "The first addend.")]
    a: i64,
    #[schemars(description = "The second addend.")]
    b: i64,
}

/// A tool that adds two integers.
pub struct AddTool {
    parameter_schema: Value,
}

impl AddTool {
    /// Creates a new add tool.
    #[inline]
    pub fn new() -> Self {
        AddTool {
            parameter_schema: schema_for!(AddToolParameters).to_value(),
        }
    }
}

impl Default for AddTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for AddTool {
    type Input = AddToolParameters;

    fn name(&self) -> &str {
        "add"
    }

    fn description(&self) -> &str {
        "Adds two integers and returns the sum."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: AddToolParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let result = match input.a.checked_add(input.b) {
            Some(sum) => Ok(sum.to_string()),
            None => Err(ToolError::execution_error().with_reason(format!(
                "{} + {} overflows a 64-bit integer",
                input.a, input.b
            ))),
        };
        ready(result)
    }
}
