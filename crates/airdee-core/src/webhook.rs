use crate::error::AirdeeResult;
use reqwest::Client;
use serde::Serialize;

#[derive(Serialize)]
struct QuestionRequest<'a> {
    question: &'a str,
}

/// Raw answer from the webhook. The body is opaque display text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookReply {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl WebhookReply {
    pub fn is_success(&self) -> bool {
        is_success_status(self.status)
    }
}

/// Any 2xx status counts as an answer.
pub(crate) fn is_success_status(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Client for the chat webhook (an n8n workflow in production).
///
/// One request per question, no retries and no timeout beyond reqwest's
/// defaults. Any HTTP status is returned as a reply; only transport failures
/// are errors.
#[derive(Clone)]
pub struct WebhookClient {
    client: Client,
    endpoint: String,
}

impl WebhookClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Post `{"question": ...}` to the webhook.
    pub async fn send(&self, question: &str) -> AirdeeResult<WebhookReply> {
        self.post(&QuestionRequest { question }).await
    }

    /// Post an arbitrary JSON payload, as received by the proxy server.
    pub async fn forward(&self, payload: &serde_json::Value) -> AirdeeResult<WebhookReply> {
        self.post(payload).await
    }

    async fn post<T: Serialize + ?Sized>(&self, payload: &T) -> AirdeeResult<WebhookReply> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(payload)
            .send()
            .await?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;

        tracing::debug!(status, bytes = body.len(), endpoint = %self.endpoint, "webhook responded");

        Ok(WebhookReply {
            status,
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_success_range() {
        let reply = |status| WebhookReply {
            status,
            content_type: None,
            body: String::new(),
        };
        assert!(reply(200).is_success());
        assert!(reply(204).is_success());
        assert!(!reply(302).is_success());
        assert!(!reply(404).is_success());
        assert!(!reply(500).is_success());
    }

    #[test]
    fn test_question_payload_shape() {
        let json = serde_json::to_value(QuestionRequest { question: "Hoi?" }).unwrap();
        assert_eq!(json, serde_json::json!({ "question": "Hoi?" }));
    }
}
