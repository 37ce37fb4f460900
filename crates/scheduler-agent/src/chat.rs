use scheduler_agent_core::Message;

use crate::error_chain;
use crate::orchestrator::{Orchestrator, extract_answer};

/// What a submitted message produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatEvent {
    /// The assistant answered; the answer is now part of the transcript.
    Reply(String),
    /// The turn failed; the message describes why.
    Failed(String),
}

/// A chat session that owns the visible transcript.
///
/// Only user inputs and extracted answers are recorded. Tool traffic of
/// a turn stays inside the turn.
pub struct ChatSession {
    orchestrator: Orchestrator,
    transcript: Vec<Message>,
}

impl ChatSession {
    /// Creates an empty session.
    #[inline]
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator,
            transcript: Vec::new(),
        }
    }

    /// Returns the transcript so far.
    #[inline]
    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    /// Records a user message and runs one turn for it.
    ///
    /// The user message stays recorded even if the turn fails, so the
    /// next turn sees it too.
    pub async fn submit<S: Into<String>>(&mut self, text: S) -> ChatEvent {
        self.transcript.push(Message::user(text));
        match self.orchestrator.run_turn(&self.transcript).await {
            Ok(result) => {
                let answer = extract_answer(&result.messages);
                self.transcript.push(Message::assistant(answer.clone()));
                ChatEvent::Reply(answer)
            }
            Err(err) => {
                let message = error_chain(&err);
                error!("turn failed: {message}");
                ChatEvent::Failed(message)
            }
        }
    }
}
