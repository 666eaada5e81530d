//! Post-assessment conversation with an external text generator.
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::scoring::AssessmentReport;
use crate::support::SystemContext;

pub const APOLOGY: &str = "I apologize, I'm having trouble connecting right now. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Request body sent to the generator endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub stress_score: u16,
    pub anxiety_score: u16,
    pub depression_score: u16,
}

/// Streams a reply, invoking `on_delta` for each text fragment as it arrives.
pub trait TextGenerator {
    type Error: std::error::Error + Send + Sync + 'static;

    /// # Errors
    ///
    /// Returns an error if the generator cannot produce a reply.
    fn stream(
        &mut self,
        request: &ChatRequest,
        on_delta: &mut dyn FnMut(&str),
    ) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone)]
pub struct Conversation {
    context: SystemContext,
    transcript: Vec<ChatMessage>,
}

impl Conversation {
    /// Open with the greeting selected by the overall severity.
    #[must_use]
    pub fn new(report: AssessmentReport) -> Self {
        let context = SystemContext::from_report(report);
        let transcript = vec![ChatMessage::new(
            ChatRole::Assistant,
            context.profile.greeting,
        )];
        Self {
            context,
            transcript,
        }
    }

    #[must_use]
    pub const fn context(&self) -> &SystemContext {
        &self.context
    }

    #[must_use]
    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    #[must_use]
    pub fn greeting(&self) -> &str {
        self.context.profile.greeting
    }

    /// Body for the generator: system context first, then the transcript.
    #[must_use]
    pub fn request(&self) -> ChatRequest {
        let mut messages = Vec::with_capacity(self.transcript.len() + 1);
        messages.push(ChatMessage::new(ChatRole::System, self.context.render()));
        messages.extend(self.transcript.iter().cloned());
        ChatRequest {
            messages,
            stress_score: self.context.report.stress.reported,
            anxiety_score: self.context.report.anxiety.reported,
            depression_score: self.context.report.depression.reported,
        }
    }

    /// Append `text` verbatim as a user turn and stream the reply.
    ///
    /// Blank input is ignored and returns `Ok(None)`. On generator failure a
    /// fixed apology turn is appended and the error is returned; the
    /// conversation remains usable.
    ///
    /// # Errors
    ///
    /// Returns the generator's error.
    pub fn send<G>(
        &mut self,
        text: &str,
        generator: &mut G,
        on_delta: &mut dyn FnMut(&str),
    ) -> Result<Option<&ChatMessage>, G::Error>
    where
        G: TextGenerator + ?Sized,
    {
        if text.trim().is_empty() {
            return Ok(None);
        }
        self.transcript.push(ChatMessage::new(ChatRole::User, text));
        let request = self.request();

        let mut reply = String::new();
        let result = generator.stream(&request, &mut |delta| {
            reply.push_str(delta);
            on_delta(delta);
        });

        match result {
            Ok(()) => {
                debug!("assistant replied with {} bytes", reply.len());
                self.transcript
                    .push(ChatMessage::new(ChatRole::Assistant, reply));
                Ok(self.transcript.last())
            }
            Err(err) => {
                warn!("chat generator failed: {err}");
                if !reply.is_empty() {
                    self.transcript
                        .push(ChatMessage::new(ChatRole::Assistant, reply));
                }
                self.transcript
                    .push(ChatMessage::new(ChatRole::Assistant, APOLOGY));
                Err(err)
            }
        }
    }
}
