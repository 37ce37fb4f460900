use scheduler_agent_core::model::ModelTool;
use scheduler_agent_core::tool::{ToolFuture, Toolset};
use serde_json::Value;

use crate::tavily::{TavilyClient, TavilyConfig};
use crate::tools::{AddTool, DocsSearchTool, StatusTool};

/// Name the tool server reports about itself.
pub const SERVER_NAME: &str = "scheduler-tool-server";

/// Version the tool server reports about itself.
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The registry of built-in tools.
#[derive(Clone)]
pub struct Toolbox {
    toolset: Toolset,
}

impl Toolbox {
    /// Creates the toolbox with every built-in tool.
    pub fn builtin(tavily: TavilyConfig) -> Self {
        let client = TavilyClient::new(tavily);
        let mut toolset = Toolset::new()
            .with_tool(AddTool::new())
            .with_tool(DocsSearchTool::langgraph(client.clone()))
            .with_tool(DocsSearchTool::fastmcp(client));

        let mut names = toolset.names();
        names.push("status".to_owned());
        toolset.add_tool(StatusTool::new(SERVER_NAME, SERVER_VERSION, names));

        info!(tools = toolset.len(), "toolbox ready");
        Self { toolset }
    }

    /// Returns the tool descriptors.
    #[inline]
    pub fn definitions(&self) -> Vec<ModelTool> {
        self.toolset.definitions()
    }

    /// Calls a tool by name.
    #[inline]
    pub fn call(&self, name: &str, arguments: Value) -> ToolFuture {
        self.toolset.call(name, arguments)
    }

    /// Returns the underlying toolset.
    #[inline]
    pub fn toolset(&self) -> &Toolset {
        &self.toolset
    }

    /// Converts into the underlying toolset.
    #[inline]
    pub fn into_toolset(self) -> Toolset {
        self.toolset
    }
}

#[cfg(test)]
mod tests {
    use scheduler_agent_core::tool::ErrorKind;
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_builtin() {
        let toolbox = Toolbox::builtin(TavilyConfig::new(None));
        let names: Vec<_> =
            toolbox.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            vec![
                "add",
                "search_langgraph_docs",
                "search_fastmcp_docs",
                "status"
            ]
        );

        let sum = toolbox.call("add", json!({ "a": 2, "b": 2 })).await;
        assert_eq!(sum, Ok("4".to_owned()));

        let status = toolbox.call("status", json!({})).await.unwrap();
        let status: Value = serde_json::from_str(&status).unwrap();
        assert_eq!(status["tools"].as_array().map(Vec::len), Some(4));

        let err = toolbox.call("calendar", json!({})).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
