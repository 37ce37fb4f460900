use scheduler_agent_core::tool::{Error as ToolError, Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

use crate::tavily::TavilyClient;

const LANGGRAPH_SITES: &str =
    "site:langchain-ai.github.io/langgraph OR site:github.com/langchain-ai/langgraph";
const FASTMCP_SITES: &str = "site:modelcontextprotocol.io OR site:github.com/modelcontextprotocol/python-sdk";

/// Parameters of [`DocsSearchTool`].
#[derive(Deserialize, JsonSchema)]
pub struct DocsSearchToolParameters {
    #[schemars(description = "What to look for in the documentation.")]
    query: String,
}

/// A web search scoped to one documentation corpus.
///
/// The query is prefixed with a `site:` filter and the raw result list
/// is returned as a JSON array.
pub struct DocsSearchTool {
    name: &'static str,
    description: &'static str,
    sites: &'static str,
    client: TavilyClient,
    parameter_schema: Value,
}

impl DocsSearchTool {
    fn new(
        name: &'static str,
        description: &'static str,
        sites: &'static str,
        client: TavilyClient,
    ) -> Self {
        DocsSearchTool {
            name,
            description,
            sites,
            client,
            parameter_schema: schema_for!(DocsSearchToolParameters).to_value(),
        }
    }

    /// Searches the LangGraph documentation and repository.
    pub fn langgraph(client: TavilyClient) -> Self {
        Self::new(
            "search_langgraph_docs",
            "Searches the official LangGraph documentation and GitHub repository.",
            LANGGRAPH_SITES,
            client,
        )
    }

    /// Searches the Model Context Protocol documentation and Python SDK.
    pub fn fastmcp(client: TavilyClient) -> Self {
        Self::new(
            "search_fastmcp_docs",
            "Searches the official FastMCP / Model Context Protocol documentation and GitHub repository.",
            FASTMCP_SITES,
            client,
        )
    }

    fn scoped_query(&self, query: &str) -> String {
        format!("{} {}", self.sites, query.trim())
    }
}

impl Tool for DocsSearchTool {
    type Input = DocsSearchToolParameters;

    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: DocsSearchToolParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let blank = input.query.trim().is_empty();
        let search = self.client.search(self.scoped_query(&input.query));
        async move {
            if blank {
                return Err(ToolError::invalid_input()
                    .with_reason("`query` must not be empty"));
            }
            let results = search.await?;
            serde_json::to_string(&results).map_err(|err| {
                ToolError::execution_error().with_reason(err.to_string())
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use scheduler_agent_core::Toolset;
    use scheduler_agent_core::tool::ErrorKind;
    use serde_json::json;

    use super::*;
    use crate::tavily::TavilyConfig;
    use crate::tavily::tests::serve_once;

    #[test]
    fn test_scoped_query() {
        let client = TavilyClient::new(TavilyConfig::new(None));
        let tool = DocsSearchTool::langgraph(client.clone());
        assert_eq!(
            tool.scoped_query(" StateGraph "),
            "site:langchain-ai.github.io/langgraph OR site:github.com/langchain-ai/langgraph StateGraph"
        );
        let tool = DocsSearchTool::fastmcp(client);
        assert!(tool.scoped_query("tools").starts_with(
            "site:modelcontextprotocol.io OR site:github.com/modelcontextprotocol/python-sdk "
        ));
    }

    #[tokio::test]
    async fn test_returns_results_array() {
        let body = json!({ "results": [{ "title": "Tools", "content": "..." }] });
        let (addr, request) = serve_once("200 OK", body.to_string()).await;
        let client = TavilyClient::new(
            TavilyConfig::new(Some("tvly-key".to_owned()))
                .with_base_url(format!("http://{addr}")),
        );
        let toolset = Toolset::new().with_tool(DocsSearchTool::fastmcp(client));

        let output = toolset
            .call("search_fastmcp_docs", json!({ "query": "tools" }))
            .await
            .unwrap();
        let results: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(results, json!([{ "title": "Tools", "content": "..." }]));
        assert!(request.await.unwrap().contains("site:modelcontextprotocol.io"));
    }

    #[tokio::test]
    async fn test_missing_key() {
        let client = TavilyClient::new(TavilyConfig::new(None));
        let toolset = Toolset::new().with_tool(DocsSearchTool::langgraph(client));
        let err = toolset
            .call("search_langgraph_docs", json!({ "query": "StateGraph" }))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let err = toolset
            .call("search_langgraph_docs", json!({ "query": "  " }))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
