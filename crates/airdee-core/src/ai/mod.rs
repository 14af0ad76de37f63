pub mod azure;

pub use azure::{AgentPrompt, ArticleAnsweringAgent, DEFAULT_SYSTEM_PROMPT};
