//! Chat completion backends.
//!
//! [`CompletionBackend`] is the one external capability the chat-turn
//! orchestrator needs: given the whole transcript, produce the next assistant
//! message. Any rig [`Agent`] is a backend; [`azure_openai`] builds one from
//! [`Settings`](crate::config::Settings).
pub mod azure_openai;

use std::future::Future;

use rig::{
    agent::Agent,
    completion::{Chat, CompletionModel},
    message::Message,
};

use crate::error::CompletionError;
use crate::transcript::{Role, Transcript, Turn};

pub trait CompletionBackend {
    /// Request the reply to a transcript whose last turn is the pending user turn.
    fn complete(
        &self,
        transcript: &Transcript,
    ) -> impl Future<Output = Result<String, CompletionError>> + Send;
}

impl<M> CompletionBackend for Agent<M>
where
    M: CompletionModel,
{
    async fn complete(&self, transcript: &Transcript) -> Result<String, CompletionError> {
        let (prompt, history) = to_rig_messages(transcript)?;

        tracing::debug!(history = history.len(), "Sending chat completion request");
        let reply = self.chat(prompt, history).await?;
        tracing::debug!(bytes = reply.len(), "Received chat completion");

        Ok(reply)
    }
}

/// Split a transcript into the prompt (its last user turn) and the history before it.
fn to_rig_messages(transcript: &Transcript) -> Result<(Message, Vec<Message>), CompletionError> {
    let Some((last, earlier)) = transcript.turns().split_last() else {
        return Err(CompletionError::NoPendingUserTurn);
    };

    if last.role != Role::User {
        return Err(CompletionError::NoPendingUserTurn);
    }

    let history = earlier.iter().map(to_rig_message).collect();

    Ok((Message::user(last.content.clone()), history))
}

fn to_rig_message(turn: &Turn) -> Message {
    match turn.role {
        Role::Assistant => Message::assistant(turn.content.clone()),
        // rig messages have no system role; the agent preamble is the system prompt
        Role::System | Role::User => Message::user(turn.content.clone()),
    }
}
