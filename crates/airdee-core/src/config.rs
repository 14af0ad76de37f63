//! Runtime configuration.
//!
//! Resolved once at startup from the process environment and passed into the
//! clients, so nothing reads environment variables while handling a request.

use crate::error::{AirdeeError, AirdeeResult};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_WEBHOOK_URL: &str = "http://localhost:5678/webhook/ai-chatbot";
pub const DEFAULT_COLLECTION: &str = "Article";
pub const DEFAULT_VECTOR_PROPERTY: &str = "te_3_large";
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-02-01";

#[derive(Clone, Debug)]
pub struct Config {
    pub webhook_url: String,
    pub vector: VectorSettings,
    /// `None` unless endpoint, deployment and key are all set.
    pub azure: Option<AzureOpenAISettings>,
    pub server: ServerSettings,
}

/// Connection settings for the Weaviate instance.
#[derive(Clone, Debug)]
pub struct VectorSettings {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub collection: String,
    pub vector_property: String,
    pub expected_vector_size: Option<usize>,
    /// Number of metadata values the importer appended to each stored vector.
    pub trailing_metadata: usize,
}

#[derive(Clone, Debug)]
pub struct AzureOpenAISettings {
    pub endpoint: String,
    pub deployment: String,
    pub api_key: String,
    pub api_version: String,
}

#[derive(Clone, Debug)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub allowed_origins: String,
    pub public_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> AirdeeResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> AirdeeResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let vector = VectorSettings {
            url: get("WEAVIATE_URL"),
            api_key: get("WEAVIATE_API_KEY"),
            collection: get("WEAVIATE_DEFAULT_CLASS").unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            vector_property: get("WEAVIATE_VECTOR_PROPERTY")
                .unwrap_or_else(|| DEFAULT_VECTOR_PROPERTY.to_string()),
            expected_vector_size: parse_var(&get, "WEAVIATE_EXPECTED_VECTOR_SIZE")?,
            trailing_metadata: parse_var(&get, "WEAVIATE_TRAILING_METADATA")?.unwrap_or(0),
        };

        let azure = match (
            get("AZURE_OPENAI_ENDPOINT"),
            get("AZURE_OPENAI_DEPLOYMENT"),
            get("AZURE_OPENAI_API_KEY"),
        ) {
            (Some(endpoint), Some(deployment), Some(api_key)) => Some(AzureOpenAISettings {
                endpoint,
                deployment,
                api_key,
                api_version: get("AZURE_OPENAI_API_VERSION")
                    .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string()),
            }),
            _ => None,
        };

        let server = ServerSettings {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_var(&get, "PORT")?.unwrap_or(8080),
            allowed_origins: get("ALLOWED_ORIGINS").unwrap_or_else(|| "*".to_string()),
            public_dir: get("PUBLIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("public")),
        };

        Ok(Self {
            webhook_url: get("N8N_WEBHOOK_URL").unwrap_or_else(|| DEFAULT_WEBHOOK_URL.to_string()),
            vector,
            azure,
            server,
        })
    }
}

fn parse_var<T, G>(get: &G, key: &str) -> AirdeeResult<Option<T>>
where
    T: FromStr,
    T::Err: Display,
    G: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| AirdeeError::Config(format!("{key}={raw:?} is invalid: {e}")))
        })
        .transpose()
}

impl VectorSettings {
    pub fn new(url: &str) -> Self {
        Self {
            url: Some(url.to_string()),
            api_key: None,
            collection: DEFAULT_COLLECTION.to_string(),
            vector_property: DEFAULT_VECTOR_PROPERTY.to_string(),
            expected_vector_size: None,
            trailing_metadata: 0,
        }
    }

    /// Instance URL without a trailing slash.
    pub fn base_url(&self) -> AirdeeResult<&str> {
        self.url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .filter(|url| !url.is_empty())
            .ok_or_else(|| AirdeeError::Config("WEAVIATE_URL is not set".to_string()))
    }

    /// Headers for direct REST and GraphQL calls.
    pub fn headers(&self) -> AirdeeResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &self.api_key {
            let value = HeaderValue::from_str(key)
                .map_err(|_| AirdeeError::Config("WEAVIATE_API_KEY is not a valid header value".to_string()))?;
            headers.insert("X-API-Key", value);
        }
        Ok(headers)
    }
}

impl AzureOpenAISettings {
    pub fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.deployment,
            self.api_version
        )
    }

    pub fn headers(&self) -> AirdeeResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&self.api_key)
            .map_err(|_| AirdeeError::Config("AZURE_OPENAI_API_KEY is not a valid header value".to_string()))?;
        headers.insert("api-key", key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

impl ServerSettings {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
