use crate::config::AzureOpenAISettings;
use crate::error::{AirdeeError, AirdeeResult};
use crate::retriever::ArticleDocument;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_SYSTEM_PROMPT: &str = "Je bent een behulpzame redacteur voor de Erdee Media Groep. \
Beantwoord vragen uitsluitend op basis van de aangeleverde bronnen.";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Serialize)]
struct AzureMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct AzureRequest {
    messages: Vec<AzureMessage>,
}

/// A question plus the system prompt it is asked under.
#[derive(Debug, Clone)]
pub struct AgentPrompt {
    pub question: String,
    pub system: String,
}

impl AgentPrompt {
    pub fn new(question: &str) -> Self {
        Self {
            question: question.to_string(),
            system: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    fn to_request(&self, document: &ArticleDocument) -> AzureRequest {
        AzureRequest {
            messages: vec![
                AzureMessage {
                    role: "system".to_string(),
                    content: self.system.clone(),
                },
                AzureMessage {
                    role: "user".to_string(),
                    content: format!("Vraag: {}\n\n{}", self.question, format_context(document)),
                },
            ],
        }
    }
}

fn format_context(document: &ArticleDocument) -> String {
    format!(
        "Context:\nTitel: {}\nInhoud: {}\n",
        document.title, document.body
    )
}

/// Answers questions about a single article through Azure OpenAI chat completions.
#[derive(Clone)]
pub struct ArticleAnsweringAgent {
    client: Client,
    settings: AzureOpenAISettings,
}

impl ArticleAnsweringAgent {
    pub fn new(settings: AzureOpenAISettings) -> AirdeeResult<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, settings })
    }

    pub async fn answer(&self, prompt: &AgentPrompt, document: &ArticleDocument) -> AirdeeResult<String> {
        let request = prompt.to_request(document);

        let response = self
            .client
            .post(self.settings.completions_url())
            .headers(self.settings.headers()?)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            tracing::error!(%status, "Azure OpenAI request failed");
            return Err(AirdeeError::remote(status.as_u16(), &text));
        }

        let body: Value = response.json().await?;
        Ok(extract_answer(&body))
    }
}

/// Content of the first choice carrying a string message, trimmed.
fn extract_answer(response: &Value) -> String {
    response
        .get("choices")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .find_map(|choice| choice.get("message")?.get("content")?.as_str())
        .map(|content| content.trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document() -> ArticleDocument {
        ArticleDocument {
            uuid: "u-1".to_string(),
            title: "Test".to_string(),
            body: "Inhoud".to_string(),
            vector: vec![],
        }
    }

    #[test]
    fn test_request_contains_system_and_context() {
        let request = AgentPrompt::new("Waar gaat het over?").to_request(&document());
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][0]["content"], DEFAULT_SYSTEM_PROMPT);
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(
            json["messages"][1]["content"],
            "Vraag: Waar gaat het over?\n\nContext:\nTitel: Test\nInhoud: Inhoud\n"
        );
    }

    #[test]
    fn test_extract_answer_takes_first_string_content() {
        let response = json!({
            "choices": [
                "kapot",
                { "message": { "content": 12 } },
                { "message": { "content": "  Het antwoord.  " } },
                { "message": { "content": "later" } }
            ]
        });
        assert_eq!(extract_answer(&response), "Het antwoord.");
    }

    #[test]
    fn test_extract_answer_defaults_to_empty() {
        assert_eq!(extract_answer(&json!({})), "");
        assert_eq!(extract_answer(&json!({ "choices": "geen lijst" })), "");
        assert_eq!(extract_answer(&json!({ "choices": [] })), "");
    }
}
