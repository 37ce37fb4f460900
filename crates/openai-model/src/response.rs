use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use pin_project_lite::pin_project;
use scheduler_agent_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
    ToolCallRequest,
};
use serde_json::{Map, Value};

use crate::Error;
use crate::io::Sse;
use crate::proto::{ChatCompletionChunk, ToolCallDelta};

/// A tool call whose pieces are still arriving.
#[derive(Debug, Default)]
struct PartialToolCall {
    index: u32,
    id: String,
    name: String,
    arguments: String,
}

impl PartialToolCall {
    fn apply(&mut self, delta: ToolCallDelta) {
        if let Some(id) = delta.id {
            self.id.push_str(&id);
        }
        let Some(function) = delta.function else {
            return;
        };
        if let Some(name) = function.name {
            self.name.push_str(&name);
        }
        if let Some(arguments) = function.arguments {
            self.arguments.push_str(&arguments);
        }
    }

    fn finish(self) -> ToolCallRequest {
        let arguments = if self.arguments.trim().is_empty() {
            Value::Object(Map::new())
        } else {
            // Hand malformed arguments over as a raw string; the tool
            // rejects them as invalid input and the model sees why.
            serde_json::from_str(&self.arguments)
                .unwrap_or(Value::String(self.arguments))
        };
        ToolCallRequest {
            id: self.id,
            name: self.name,
            arguments,
        }
    }
}

struct StreamState {
    sse: Sse,
    ready_events: VecDeque<ModelResponseEvent>,
    tool_calls: Vec<PartialToolCall>,
    finish_reason: Option<ModelFinishReason>,
    done: bool,
}

impl StreamState {
    fn apply_chunk(&mut self, chunk: ChatCompletionChunk) {
        // The final usage chunk has no choices.
        for choice in chunk.choices {
            if let Some(content) = choice.delta.content {
                if !content.is_empty() {
                    self.ready_events
                        .push_back(ModelResponseEvent::MessageDelta(content));
                }
            }
            for delta in choice.delta.tool_calls.unwrap_or_default() {
                let index = delta.index.unwrap_or(self.tool_calls.len() as u32);
                match self.tool_calls.iter_mut().find(|t| t.index == index) {
                    Some(partial) => partial.apply(delta),
                    None => {
                        let mut partial = PartialToolCall {
                            index,
                            ..Default::default()
                        };
                        partial.apply(delta);
                        self.tool_calls.push(partial);
                    }
                }
            }
            if let Some(reason) = choice.finish_reason {
                self.finish_reason = Some(match reason.as_str() {
                    "tool_calls" | "function_call" => ModelFinishReason::ToolCalls,
                    "length" => ModelFinishReason::Length,
                    _ => ModelFinishReason::Stop,
                });
            }
        }
    }

    /// Queues the assembled tool calls and the completion event.
    fn finish(&mut self) {
        self.done = true;
        let mut tool_calls = std::mem::take(&mut self.tool_calls);
        tool_calls.sort_by_key(|t| t.index);
        let has_tool_calls = !tool_calls.is_empty();
        for partial in tool_calls {
            self.ready_events
                .push_back(ModelResponseEvent::ToolCall(partial.finish()));
        }
        let reason = self.finish_reason.unwrap_or(if has_tool_calls {
            ModelFinishReason::ToolCalls
        } else {
            ModelFinishReason::Stop
        });
        self.ready_events
            .push_back(ModelResponseEvent::Completed(reason));
    }
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(Option<ModelResponseEvent>, StreamState), Error>;

pin_project! {
    pub struct OpenAIResponse {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
    }
}

impl OpenAIResponse {
    #[inline]
    pub fn from_sse(sse: Sse) -> Self {
        let state = StreamState {
            sse,
            ready_events: VecDeque::new(),
            tool_calls: Vec::new(),
            finish_reason: None,
            done: false,
        };
        Self {
            next_event_fut: Some(Box::pin(next_event(state))),
        }
    }
}

impl ModelResponse for OpenAIResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        let Some(next_event_fut) = this.next_event_fut.as_mut() else {
            return Poll::Ready(Ok(None));
        };
        let result = ready!(next_event_fut.as_mut().poll(cx));
        *this.next_event_fut = None;
        match result {
            Ok((Some(event), state)) => {
                *this.next_event_fut = Some(Box::pin(next_event(state)));
                Poll::Ready(Ok(Some(event)))
            }
            Ok((None, _)) => Poll::Ready(Ok(None)),
            Err(err) => Poll::Ready(Err(err)),
        }
    }
}

async fn next_event(mut state: StreamState) -> NextEvent {
    loop {
        if let Some(event) = state.ready_events.pop_front() {
            return Ok((Some(event), state));
        }
        if state.done {
            return Ok((None, state));
        }

        let data = match state.sse.next_event().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                debug!("stream ended without [DONE]");
                state.finish();
                continue;
            }
            Err(err) => {
                return Err(Error::new(
                    format!("broken event stream: {err:?}"),
                    ErrorKind::Other,
                ));
            }
        };
        trace!("got sse event: {data}");
        if data == "[DONE]" {
            state.finish();
            continue;
        }

        let chunk = serde_json::from_str::<ChatCompletionChunk>(&data)
            .map_err(|err| {
                Error::new(format!("invalid chunk: {err}"), ErrorKind::Other)
            })?;
        state.apply_chunk(chunk);
    }
}
