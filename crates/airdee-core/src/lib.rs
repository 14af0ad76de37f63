pub mod ai;
pub mod config;
pub mod controller;
pub mod error;
pub mod render;
pub mod retriever;
pub mod sanitize;
pub mod search;
pub mod session;
pub mod state;
pub mod theme;
pub mod transcript;
pub mod vector;
pub mod webhook;

// Re-export main types for convenience
pub use ai::{AgentPrompt, ArticleAnsweringAgent};
pub use config::{AzureOpenAISettings, Config, ServerSettings, VectorSettings};
pub use controller::{Conversation, ConversationEvent, ConversationState, Effect, Outcome};
pub use error::{AirdeeError, AirdeeResult};
pub use render::{parse_blocks, render_message_html, render_optional, Inline, RenderBlock};
pub use retriever::{ArticleDocument, ArticleRetriever};
pub use search::SearchQuery;
pub use session::ChatSession;
pub use state::{ChatMessage, ChatRole};
pub use theme::{Theme, ThemeStore};
pub use transcript::Transcript;
pub use vector::{GraphqlProbe, VectorRecord, VectorSearchClient};
pub use webhook::{WebhookClient, WebhookReply};
