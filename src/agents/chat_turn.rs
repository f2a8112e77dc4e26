//! One chat turn: append the user text, ask the backend, append the reply.
use crate::error::{CompletionError, Error};
use crate::prompt_templating::PromptTemplate;
use crate::providers::CompletionBackend;
use crate::transcript::Transcript;

// Logged as each turn moves `AwaitingSend -> AwaitingReply -> Idle`.
#[derive(Debug, Clone, Copy)]
enum TurnState {
    AwaitingSend,
    AwaitingReply,
    Idle,
}

/// Send `text` as a user turn and wait for the reply.
///
/// On success the transcript grows by two turns (user, assistant). When the
/// backend fails only the user turn stays and the error is returned as-is;
/// nothing is retried.
pub async fn send_turn<B>(
    backend: &B,
    transcript: &mut Transcript,
    text: &str,
) -> Result<String, CompletionError>
where
    B: CompletionBackend,
{
    tracing::debug!(state = ?TurnState::AwaitingSend, turns = transcript.len());
    transcript.push_user(text);

    tracing::debug!(state = ?TurnState::AwaitingReply, turns = transcript.len());
    let reply = match backend.complete(transcript).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!("Chat turn failed: {e}");
            return Err(e);
        }
    };

    transcript.push_assistant(reply.as_str());
    tracing::debug!(state = ?TurnState::Idle, turns = transcript.len());

    Ok(reply)
}

/// A backend plus the transcript it is talking over.
pub struct ChatSession<B> {
    /// Your backend.
    backend: B,
    /// The whole conversation so far.
    transcript: Transcript,
}

impl<B> ChatSession<B>
where
    B: CompletionBackend,
{
    pub fn new(backend: B) -> Self {
        Self::with_transcript(backend, Transcript::new())
    }

    /// Continue an existing conversation.
    pub fn with_transcript(backend: B, transcript: Transcript) -> Self {
        Self {
            backend,
            transcript,
        }
    }

    pub async fn send(&mut self, text: &str) -> Result<String, CompletionError> {
        send_turn(&self.backend, &mut self.transcript, text).await
    }

    /// Render a template and send it as a single user turn.
    /// A template that fails to render leaves the transcript untouched.
    pub async fn send_template(&mut self, template: &PromptTemplate) -> Result<String, Error> {
        let text = template.render_to_string()?;
        Ok(self.send(&text).await?)
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn into_transcript(self) -> Transcript {
        self.transcript
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}
