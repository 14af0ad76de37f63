//! Nearest-vector search against Weaviate's GraphQL endpoint.
//!
//! Error policy: malformed input vectors are returned as
//! [`AirdeeError::InvalidInput`]. Every other failure (transport, status,
//! response shape) is logged and degrades to an empty result.
//!
//! The same client also runs keyword searches, readiness checks and a
//! connectivity probe for the HTTP server. Those propagate their errors.

use crate::config::VectorSettings;
use crate::error::{AirdeeError, AirdeeResult};
use crate::search::{search_query, SearchQuery};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Minimum similarity for a record to count as a match.
pub const CERTAINTY_THRESHOLD: f64 = 0.7;

/// Fields projected for every matched record.
pub const PROJECTED_FIELDS: [&str; 4] = ["content", "source", "extraField1", "extraField2"];

const PROBE_TIMEOUT: Duration = Duration::from_secs(15);

/// One matched record, exactly as Weaviate returned it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VectorRecord(Value);

impl VectorRecord {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn content(&self) -> Option<&str> {
        self.get("content").and_then(Value::as_str)
    }

    pub fn source(&self) -> Option<&str> {
        self.get("source").and_then(Value::as_str)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for VectorRecord {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Result of a one-record GraphQL round-trip, for diagnosing auth problems.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphqlProbe {
    pub url: String,
    pub sent_auth: &'static str,
    pub status: u16,
    pub ok: bool,
    pub reason: String,
    /// The first characters of the response body.
    pub body: String,
}

#[derive(Serialize)]
struct GraphqlRequest {
    query: String,
}

/// Build the `Get` query for the records nearest to `vector`.
pub fn near_vector_query(collection: &str, vector: &[f64], certainty: f64) -> String {
    let values = vector
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",");

    format!(
        "{{ Get {{ {collection}(nearVector: {{ vector: [{values}], certainty: {certainty} }}) {{ {} }} }} }}",
        PROJECTED_FIELDS.join(" ")
    )
}

#[derive(Clone)]
pub struct VectorSearchClient {
    client: Client,
    settings: VectorSettings,
    base_url: String,
}

impl VectorSearchClient {
    /// Fails with [`AirdeeError::Config`] when no Weaviate URL is configured.
    pub fn new(settings: VectorSettings) -> AirdeeResult<Self> {
        let base_url = settings.base_url()?.to_string();
        Ok(Self {
            client: Client::new(),
            settings,
            base_url,
        })
    }

    pub fn collection(&self) -> &str {
        &self.settings.collection
    }

    pub fn graphql_url(&self) -> String {
        format!("{}/v1/graphql", self.base_url)
    }

    /// `API-KEY` when requests carry an API key, `None` otherwise.
    pub fn auth_type(&self) -> &'static str {
        if self.settings.api_key.is_some() {
            "API-KEY"
        } else {
            "None"
        }
    }

    /// Query with an untyped JSON value, as received from a caller.
    ///
    /// The value must be an array of numbers.
    pub async fn query_value(&self, input: &Value) -> AirdeeResult<Vec<VectorRecord>> {
        let vector = vector_from_value(input)?;
        self.query(&vector).await
    }

    pub async fn query(&self, vector: &[f64]) -> AirdeeResult<Vec<VectorRecord>> {
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(AirdeeError::InvalidInput(
                "input vector must contain only finite numbers".to_string(),
            ));
        }

        match self.near_vector(vector).await {
            Ok(records) => {
                tracing::debug!(matches = records.len(), collection = %self.settings.collection, "vector search done");
                Ok(records)
            }
            Err(e) => {
                tracing::error!(error = %e, collection = %self.settings.collection, "vector search failed");
                Ok(Vec::new())
            }
        }
    }

    async fn near_vector(&self, vector: &[f64]) -> AirdeeResult<Vec<VectorRecord>> {
        let query = near_vector_query(&self.settings.collection, vector, CERTAINTY_THRESHOLD);
        let body = self.graphql(query).await?;
        extract_records(&body, &self.settings.collection)
    }

    /// Keyword and filter search. Unlike [`query`](Self::query), failures
    /// are returned to the caller.
    pub async fn search(&self, query: &SearchQuery) -> AirdeeResult<Vec<VectorRecord>> {
        let class = query.class_or(&self.settings.collection);
        let text = search_query(class, query)?;
        let body = self.graphql(text).await?;
        let records = extract_records(&body, class)?;
        tracing::debug!(matches = records.len(), class, "search done");
        Ok(records)
    }

    /// Post a GraphQL query and return the body of a success response.
    async fn graphql(&self, query: String) -> AirdeeResult<String> {
        let response = self
            .client
            .post(self.graphql_url())
            .headers(self.settings.headers()?)
            .json(&GraphqlRequest { query })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AirdeeError::remote(status.as_u16(), &body));
        }
        Ok(body)
    }

    /// Whether Weaviate answers its readiness check with a success status.
    pub async fn is_ready(&self) -> bool {
        match self.readiness().await {
            Ok(ready) => ready,
            Err(e) => {
                tracing::warn!(error = %e, "weaviate readiness check failed");
                false
            }
        }
    }

    async fn readiness(&self) -> AirdeeResult<bool> {
        let response = self
            .client
            .get(format!("{}/v1/.well-known/ready", self.base_url))
            .headers(self.settings.headers()?)
            .send()
            .await?;
        Ok(response.status().is_success())
    }

    /// Fetch one object id from the collection and report how Weaviate
    /// answered. Any HTTP status is a result; only transport failures are
    /// errors.
    pub async fn probe_graphql(&self) -> AirdeeResult<GraphqlProbe> {
        let url = self.graphql_url();
        let query = format!(
            "{{ Get {{ {}(limit:1) {{ _additional {{ id }} }} }} }}",
            self.settings.collection
        );

        let response = self
            .client
            .post(&url)
            .headers(self.settings.headers()?)
            .timeout(PROBE_TIMEOUT)
            .json(&GraphqlRequest { query })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        Ok(GraphqlProbe {
            url,
            sent_auth: self.auth_type(),
            status: status.as_u16(),
            ok: status.is_success(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            body: body.chars().take(AirdeeError::BODY_EXCERPT).collect(),
        })
    }
}

/// Validate that `input` is an array of numbers.
pub fn vector_from_value(input: &Value) -> AirdeeResult<Vec<f64>> {
    let Value::Array(items) = input else {
        return Err(AirdeeError::InvalidInput(
            "input vector must be an array of numbers".to_string(),
        ));
    };

    items
        .iter()
        .map(|item| {
            item.as_f64().ok_or_else(|| {
                AirdeeError::InvalidInput(format!("input vector contains a non-number: {item}"))
            })
        })
        .collect()
}

/// Pull `data.Get.<collection>` out of a GraphQL response body.
///
/// The records are kept exactly as received.
fn extract_records(body: &str, collection: &str) -> AirdeeResult<Vec<VectorRecord>> {
    let mut response: Value = serde_json::from_str(body)?;
    let records = response
        .get_mut("data")
        .and_then(|data| data.get_mut("Get"))
        .and_then(|get| get.get_mut(collection))
        .map(Value::take);

    match records {
        Some(Value::Array(records)) => Ok(records.into_iter().map(VectorRecord).collect()),
        _ => {
            let message = response
                .pointer("/errors/0/message")
                .and_then(Value::as_str)
                .unwrap_or("Unexpected response format from Weaviate");
            Err(AirdeeError::UnexpectedResponse(message.to_string()))
        }
    }
}
