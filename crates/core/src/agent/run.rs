use futures_util::future::join_all;
use scheduler_agent_model::{ModelMessage, ModelRequest, ToolCallRequest};
use tracing::Instrument;

use super::{AgentError, AgentInner, AgentResult, AgentStatus};
use crate::conversation::Message;
use crate::tool::{Error as ToolError, ErrorKind as ToolErrorKind, ToolResult};

pub(super) async fn run(
    inner: &AgentInner,
    messages: Vec<Message>,
) -> Result<AgentResult, AgentError> {
    if messages.is_empty() {
        return Err(AgentError::EmptyConversation);
    }

    let mut messages = messages;
    let tool_definitions = inner.tools.definitions();

    for step in 1..=inner.max_steps {
        let req = ModelRequest {
            messages: model_messages(inner.system_prompt.as_deref(), &messages),
            tools: tool_definitions.clone(),
        };
        let resp = inner
            .model_client
            .send_request(req)
            .instrument(debug_span!("agent step", step))
            .await
            .map_err(|err| AgentError::Model {
                kind: err.kind(),
                message: err.to_string(),
            })?;

        let tool_calls = resp.tool_calls;
        messages.push(Message::Assistant {
            content: resp.content,
            tool_calls: tool_calls.clone(),
        });

        if tool_calls.is_empty() {
            debug!(step, "model finished");
            return Ok(AgentResult {
                messages,
                status: AgentStatus::Success,
            });
        }

        let results = run_tools(inner, &tool_calls).await;
        for (call, result) in tool_calls.into_iter().zip(results) {
            let content = match result {
                Ok(output) => output,
                Err(err) if err.kind() == ToolErrorKind::Configuration => {
                    error!("tool `{}` is misconfigured: {err}", call.name);
                    return Err(AgentError::Tool {
                        name: call.name,
                        source: err,
                    });
                }
                Err(err) => {
                    warn!("tool `{}` failed: {err}", call.name);
                    err.reason().into_owned()
                }
            };
            messages.push(Message::Tool {
                call_id: call.id,
                content,
            });
        }
    }

    warn!(max_steps = inner.max_steps, "step limit reached");
    Ok(AgentResult {
        messages,
        status: AgentStatus::StepLimitReached,
    })
}

fn model_messages(
    system_prompt: Option<&str>,
    messages: &[Message],
) -> Vec<ModelMessage> {
    let has_system = matches!(messages.first(), Some(Message::System { .. }));
    let prompt = system_prompt.filter(|_| !has_system).map(|prompt| {
        ModelMessage::System {
            content: prompt.to_owned(),
        }
    });
    prompt
        .into_iter()
        .chain(messages.iter().map(ModelMessage::from))
        .collect()
}

/// Runs every call concurrently and returns the results in call order.
async fn run_tools(
    inner: &AgentInner,
    calls: &[ToolCallRequest],
) -> Vec<ToolResult> {
    let handles: Vec<_> = calls
        .iter()
        .map(|call| {
            trace!("spawning tool call {} ({})", call.id, call.name);
            tokio::spawn(inner.tools.call(&call.name, call.arguments.clone()))
        })
        .collect();

    join_all(handles)
        .await
        .into_iter()
        .map(|joined| {
            joined.unwrap_or_else(|err| {
                Err(ToolError::execution_error()
                    .with_reason(format!("tool task failed: {err}")))
            })
        })
        .collect()
}
