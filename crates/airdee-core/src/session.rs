use crate::config::Config;
use crate::controller::{Conversation, ConversationEvent, Effect, Outcome};
use crate::error::AirdeeResult;
use crate::theme::{Theme, ThemeStore};
use crate::transcript::Transcript;
use crate::webhook::WebhookClient;

/// One chat session: the conversation, its webhook and the user's theme.
///
/// Created once per window or terminal, reset on "new chat" and torn down
/// when the front end exits.
pub struct ChatSession {
    conversation: Conversation,
    webhook: WebhookClient,
    themes: ThemeStore,
    theme: Theme,
}

impl ChatSession {
    pub fn create(config: &Config, themes: ThemeStore) -> Self {
        let theme = themes.load();
        tracing::info!(webhook = %config.webhook_url, %theme, "chat session created");
        Self {
            conversation: Conversation::new(),
            webhook: WebhookClient::new(&config.webhook_url),
            themes,
            theme,
        }
    }

    /// Run one question through the webhook and append the reply.
    ///
    /// Returns `None` when the question was ignored or rejected.
    pub async fn ask(&mut self, question: &str) -> Option<Outcome> {
        let effect = self
            .conversation
            .dispatch(ConversationEvent::Submit(question.to_string()));
        let Effect::Send {
            request_id,
            question,
        } = effect
        else {
            return None;
        };

        let result = self.webhook.send(&question).await;
        match self
            .conversation
            .dispatch(ConversationEvent::from_reply(request_id, result))
        {
            Effect::Settled(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// Start a new chat.
    pub fn reset(&mut self) {
        self.conversation.dispatch(ConversationEvent::NewChat);
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn conversation_mut(&mut self) -> &mut Conversation {
        &mut self.conversation
    }

    pub fn webhook(&self) -> &WebhookClient {
        &self.webhook
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Switch theme and persist the choice.
    pub fn set_theme(&mut self, theme: Theme) -> AirdeeResult<()> {
        self.themes.save(&theme)?;
        self.theme = theme;
        Ok(())
    }

    /// End the session and hand back what was said.
    pub fn teardown(self) -> Transcript {
        let transcript = self.conversation.into_transcript();
        tracing::info!(messages = transcript.len(), "chat session closed");
        transcript
    }
}
