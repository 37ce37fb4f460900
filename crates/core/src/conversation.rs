//! Conversation-related types.

use std::fmt::{self, Display};

use scheduler_agent_model::{ModelMessage, ToolCallRequest, ToolCallResult};
use serde::{Deserialize, Serialize};

/// The author of a [`Message`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions for the model.
    System,
    /// The person chatting.
    User,
    /// The model.
    Assistant,
    /// A tool result inserted by the runtime.
    Tool,
}

impl Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        })
    }
}

/// One entry of a conversation.
///
/// Messages are decoded into this shape once, where they enter the
/// runtime, so later code can match on the variant instead of probing
/// loosely typed values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    /// System instructions.
    System {
        /// Instruction text.
        content: String,
    },
    /// A user input.
    User {
        /// Input text.
        content: String,
    },
    /// A model output.
    Assistant {
        /// Text part, empty when the model only called tools.
        content: String,
        /// Tools the model asked to run.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCallRequest>,
    },
    /// The outcome of one tool call.
    Tool {
        /// Identifier of the tool call this answers.
        call_id: String,
        /// Tool output or error description.
        content: String,
    },
}

impl Message {
    /// Creates a system message.
    #[inline]
    pub fn system<S: Into<String>>(content: S) -> Self {
        Message::System {
            content: content.into(),
        }
    }

    /// Creates a user message.
    #[inline]
    pub fn user<S: Into<String>>(content: S) -> Self {
        Message::User {
            content: content.into(),
        }
    }

    /// Creates a plain assistant message without tool calls.
    #[inline]
    pub fn assistant<S: Into<String>>(content: S) -> Self {
        Message::Assistant {
            content: content.into(),
            tool_calls: vec![],
        }
    }

    /// Returns the role of this message.
    #[inline]
    pub fn role(&self) -> Role {
        match self {
            Message::System { .. } => Role::System,
            Message::User { .. } => Role::User,
            Message::Assistant { .. } => Role::Assistant,
            Message::Tool { .. } => Role::Tool,
        }
    }

    /// Returns the text content of this message.
    #[inline]
    pub fn content(&self) -> &str {
        match self {
            Message::System { content }
            | Message::User { content }
            | Message::Assistant { content, .. }
            | Message::Tool { content, .. } => content,
        }
    }
}

impl From<&Message> for ModelMessage {
    fn from(msg: &Message) -> Self {
        match msg {
            Message::System { content } => ModelMessage::System {
                content: content.clone(),
            },
            Message::User { content } => ModelMessage::User {
                content: content.clone(),
            },
            Message::Assistant {
                content,
                tool_calls,
            } => ModelMessage::Assistant {
                content: content.clone(),
                tool_calls: tool_calls.clone(),
            },
            Message::Tool { call_id, content } => {
                ModelMessage::Tool(ToolCallResult {
                    id: call_id.clone(),
                    content: content.clone(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_role_tagged_serialization() {
        let transcript = vec![
            Message::user("이번 주 내 일정 알려줘"),
            Message::assistant("이번 주에는 일정이 없습니다."),
        ];
        let value = serde_json::to_value(&transcript).unwrap();
        assert_eq!(
            value,
            json!([
                { "role": "user", "content": "이번 주 내 일정 알려줘" },
                { "role": "assistant", "content": "이번 주에는 일정이 없습니다." }
            ])
        );

        let decoded: Vec<Message> = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, transcript);
        assert_eq!(decoded[1].role(), Role::Assistant);
        assert_eq!(decoded[1].role().to_string(), "assistant");
    }

    #[test]
    fn test_tool_message_to_model_message() {
        let msg = Message::Tool {
            call_id: "call_1".to_owned(),
            content: "4".to_owned(),
        };
        assert_eq!(msg.role(), Role::Tool);
        assert_eq!(
            ModelMessage::from(&msg),
            ModelMessage::Tool(ToolCallResult {
                id: "call_1".to_owned(),
                content: "4".to_owned(),
            })
        );
    }
}
