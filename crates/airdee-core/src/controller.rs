//! Conversation state machine.
//!
//! One question at a time moves through `Idle -> Sending -> Idle`. The
//! controller never performs I/O itself: [`Conversation::dispatch`] returns an
//! [`Effect`] and the caller performs the webhook request, then feeds the
//! result back in as an event.

use crate::error::AirdeeResult;
use crate::state::ChatRole;
use crate::transcript::Transcript;
use crate::webhook::{is_success_status, WebhookReply};

/// Shown while a request is in flight.
pub const PENDING_INDICATOR: &str = "Aan het nadenken…";
/// Shown when the webhook answers with an empty body.
pub const EMPTY_REPLY_PLACEHOLDER: &str = "—";
/// Shown when the webhook answers with a non-success status.
pub const REMOTE_ERROR_MESSAGE: &str = "Er ging iets mis bij het ophalen van het antwoord.";
/// Shown when the webhook could not be reached.
pub const NETWORK_ERROR_MESSAGE: &str = "Er trad een netwerkfout op. Probeer het opnieuw.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversationState {
    #[default]
    Idle,
    Sending {
        request_id: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationEvent {
    Submit(String),
    Replied {
        request_id: u64,
        status: u16,
        body: String,
    },
    TransportFailed {
        request_id: u64,
        reason: String,
    },
    NewChat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Failed,
}

/// What the caller has to do after a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Nothing changed: empty question or a reply for a request no longer in flight.
    Ignored,
    /// A question was submitted while another one is in flight. It was dropped.
    Busy,
    /// Post `question` to the webhook and report back with `request_id`.
    Send { request_id: u64, question: String },
    /// A reply was appended and the conversation is idle again.
    Settled(Outcome),
    /// The transcript was cleared.
    Cleared,
}

impl ConversationEvent {
    /// Turn the result of a webhook call into the matching event.
    pub fn from_reply(request_id: u64, result: AirdeeResult<WebhookReply>) -> Self {
        match result {
            Ok(reply) => ConversationEvent::Replied {
                request_id,
                status: reply.status,
                body: reply.body,
            },
            Err(err) => ConversationEvent::TransportFailed {
                request_id,
                reason: err.to_string(),
            },
        }
    }
}

#[derive(Debug, Default)]
pub struct Conversation {
    transcript: Transcript,
    state: ConversationState,
    next_request_id: u64,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatch(&mut self, event: ConversationEvent) -> Effect {
        match event {
            ConversationEvent::Submit(text) => self.submit(&text),
            ConversationEvent::Replied {
                request_id,
                status,
                body,
            } => {
                if !self.settle(request_id) {
                    return Effect::Ignored;
                }
                if is_success_status(status) {
                    let content = if body.is_empty() {
                        EMPTY_REPLY_PLACEHOLDER.to_string()
                    } else {
                        body
                    };
                    self.transcript.append(ChatRole::Assistant, content);
                    Effect::Settled(Outcome::Succeeded)
                } else {
                    tracing::warn!(request_id, status, "webhook returned an error status");
                    self.transcript
                        .append(ChatRole::Assistant, REMOTE_ERROR_MESSAGE);
                    Effect::Settled(Outcome::Failed)
                }
            }
            ConversationEvent::TransportFailed { request_id, reason } => {
                if !self.settle(request_id) {
                    return Effect::Ignored;
                }
                tracing::error!(request_id, %reason, "webhook request failed");
                self.transcript
                    .append(ChatRole::Assistant, NETWORK_ERROR_MESSAGE);
                Effect::Settled(Outcome::Failed)
            }
            ConversationEvent::NewChat => {
                self.transcript.clear();
                self.state = ConversationState::Idle;
                Effect::Cleared
            }
        }
    }

    fn submit(&mut self, text: &str) -> Effect {
        let question = text.trim();
        if question.is_empty() {
            return Effect::Ignored;
        }
        if self.is_sending() {
            tracing::debug!("question submitted while a request is in flight");
            return Effect::Busy;
        }

        self.transcript.append(ChatRole::User, question);
        let request_id = self.next_request_id;
        self.next_request_id += 1;
        self.state = ConversationState::Sending { request_id };

        Effect::Send {
            request_id,
            question: question.to_string(),
        }
    }

    /// Back to idle if `request_id` is the request in flight.
    fn settle(&mut self, request_id: u64) -> bool {
        match self.state {
            ConversationState::Sending { request_id: current } if current == request_id => {
                self.state = ConversationState::Idle;
                true
            }
            _ => {
                tracing::debug!(request_id, "ignoring reply for a request no longer in flight");
                false
            }
        }
    }

    pub fn state(&self) -> ConversationState {
        self.state
    }

    pub fn is_sending(&self) -> bool {
        matches!(self.state, ConversationState::Sending { .. })
    }

    /// Text of the pending indicator, if one should be shown.
    pub fn pending_indicator(&self) -> Option<&'static str> {
        self.is_sending().then_some(PENDING_INDICATOR)
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub(crate) fn into_transcript(self) -> Transcript {
        self.transcript
    }
}
