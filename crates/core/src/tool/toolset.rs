use std::collections::HashMap;
use std::future::ready;
use std::sync::Arc;

use scheduler_agent_model::ModelTool;
use serde_json::Value;
use tracing::Instrument;

use crate::tool::{AnyTool, Error, Tool, ToolFuture, ToolObject};

/// A named collection of tools.
///
/// Tools keep their registration order, which is also the order the
/// model sees them in. Registering a second tool under an existing name
/// replaces the first one in place.
#[derive(Clone, Default)]
pub struct Toolset {
    tools: Vec<Arc<dyn ToolObject>>,
    index: HashMap<String, usize>,
}

impl Toolset {
    /// Creates an empty toolset.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tool.
    pub fn add_tool<T: Tool>(&mut self, tool: T) {
        self.insert(Arc::new(AnyTool(tool)));
    }

    /// Adds a tool, returning the toolset for chaining.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.add_tool(tool);
        self
    }

    /// Moves every tool of `other` into this set.
    pub fn extend(&mut self, other: Toolset) {
        for tool in other.tools {
            self.insert(tool);
        }
    }

    fn insert(&mut self, tool: Arc<dyn ToolObject>) {
        let name = tool.name().to_owned();
        match self.index.get(&name) {
            Some(&pos) => {
                debug!("replacing tool `{name}`");
                self.tools[pos] = tool;
            }
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    /// Returns the definitions advertised to the model.
    pub fn definitions(&self) -> Vec<ModelTool> {
        self.tools
            .iter()
            .map(|tool| ModelTool {
                name: tool.name().to_owned(),
                description: tool.description().to_owned(),
                parameters: tool.parameter_schema().clone(),
            })
            .collect()
    }

    /// Returns the tool names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_owned()).collect()
    }

    /// Returns `true` if a tool with the given name exists.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Returns the number of tools.
    #[inline]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` if the set has no tools.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Calls the named tool.
    ///
    /// The returned future does not borrow the toolset, so it can be
    /// spawned onto another task. Unknown names resolve to a `NotFound`
    /// error.
    pub fn call(&self, name: &str, arguments: Value) -> ToolFuture {
        let Some(&pos) = self.index.get(name) else {
            warn!("tool not found: {name}");
            return Box::pin(ready(Err(
                Error::not_found().with_reason(format!("Tool not found: {name}"))
            )));
        };
        trace!("calling tool `{name}` with args: {arguments}");
        let span = debug_span!("tool call", tool = name);
        Box::pin(self.tools[pos].execute(arguments).instrument(span))
    }
}
