//! One-shot command line commands.

use airdee_core::{
    render_message_html, AgentPrompt, ArticleAnsweringAgent, ArticleRetriever, ChatSession, Config,
    Outcome, ThemeStore, VectorSearchClient,
};
use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::io::Read;
use std::path::Path;

pub async fn ask(config: &Config, question: &str, html: bool) -> Result<()> {
    let mut session = ChatSession::create(config, ThemeStore::open_default()?);

    let Some(outcome) = session.ask(question).await else {
        bail!("Nothing to ask: the question is empty");
    };

    let transcript = session.teardown();
    let Some(reply) = transcript.last() else {
        bail!("No reply was recorded");
    };

    if html {
        println!("{}", reply.display_html());
    } else {
        println!("{}", reply.raw_text);
    }

    if outcome == Outcome::Failed {
        bail!("The webhook request failed");
    }
    Ok(())
}

pub fn render(file: Option<&Path>) -> Result<()> {
    let text = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?,
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            text
        }
    };

    println!("{}", render_message_html(&text));
    Ok(())
}

pub async fn search(config: &Config, vector: &str) -> Result<()> {
    let input: Value = serde_json::from_str(vector).context("Vector must be a JSON array")?;
    let client = VectorSearchClient::new(config.vector.clone())?;

    let records = client.query_value(&input).await?;
    if records.is_empty() {
        eprintln!("No matches above the certainty threshold in {}", client.collection());
    }
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

pub async fn article(config: &Config, uuid: &str) -> Result<()> {
    let retriever = ArticleRetriever::new(config.vector.clone())?;
    let document = retriever.get_article(uuid).await?;

    println!("{}", document.title);
    println!("{}", "=".repeat(document.title.chars().count().max(1)));
    println!("{}\n", document.body);
    println!("vector: {} values", document.vector.len());
    Ok(())
}

pub async fn answer(config: &Config, uuid: &str, question: &str) -> Result<()> {
    let Some(azure) = config.azure.clone() else {
        bail!("Azure OpenAI is not configured (set AZURE_OPENAI_ENDPOINT, AZURE_OPENAI_DEPLOYMENT and AZURE_OPENAI_API_KEY)");
    };

    let retriever = ArticleRetriever::new(config.vector.clone())?;
    let document = retriever.get_article(uuid).await?;

    let agent = ArticleAnsweringAgent::new(azure)?;
    let answer = agent.answer(&AgentPrompt::new(question), &document).await?;

    if answer.is_empty() {
        eprintln!("The model returned no answer");
    } else {
        println!("{answer}");
    }
    Ok(())
}
