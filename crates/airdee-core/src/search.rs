//! Keyword and filter search over a Weaviate collection.
//!
//! A [`SearchQuery`] is turned into a GraphQL `Get` with optional `bm25`,
//! `where` and `sort` arguments. Filters and sort clauses arrive as JSON and
//! are written out as GraphQL input literals.

use crate::error::{AirdeeError, AirdeeResult};
use serde::Deserialize;
use serde_json::Value;

/// Fields projected when the caller selects none.
pub const DEFAULT_SEARCH_FIELDS: [&str; 2] = ["title", "body"];

pub const DEFAULT_SEARCH_LIMIT: u32 = 5;

/// Object keys whose string values are GraphQL enum values, not strings.
const ENUM_KEYS: [&str; 2] = ["operator", "order"];

/// Body of a search request. Every field is optional.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchQuery {
    /// Collection to search; the configured collection when absent.
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub fulltext: Option<String>,
    /// A Weaviate `where` filter, e.g. `{"path": ["title"], "operator": "Like", "valueText": "*kerk*"}`.
    #[serde(default)]
    pub filters: Option<Value>,
    #[serde(default)]
    pub sort: Option<Vec<Value>>,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub select: Option<Vec<String>>,
}

fn default_limit() -> u32 {
    DEFAULT_SEARCH_LIMIT
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            class: None,
            fulltext: None,
            filters: None,
            sort: None,
            limit: DEFAULT_SEARCH_LIMIT,
            select: None,
        }
    }
}

impl SearchQuery {
    /// The requested collection, or `fallback` when none was given.
    pub fn class_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.class
            .as_deref()
            .map(str::trim)
            .filter(|class| !class.is_empty())
            .unwrap_or(fallback)
    }
}

/// Build the `Get` query for `query` against `class`.
///
/// Collection, field and filter key names must be GraphQL names; anything
/// else is [`AirdeeError::InvalidInput`].
pub fn search_query(class: &str, query: &SearchQuery) -> AirdeeResult<String> {
    check_name(class)?;

    let mut args = Vec::new();
    if let Some(text) = query.fulltext.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        args.push(format!("bm25: {{ query: {} }}", serde_json::to_string(text)?));
    }
    if let Some(filters) = query.filters.as_ref().filter(|f| !f.is_null()) {
        if !filters.is_object() {
            return Err(AirdeeError::InvalidInput(
                "filters must be an object".to_string(),
            ));
        }
        args.push(format!("where: {}", graphql_literal(filters)?));
    }
    if let Some(sort) = query.sort.as_deref().filter(|s| !s.is_empty()) {
        args.push(format!("sort: {}", list_literal(sort)?));
    }
    args.push(format!("limit: {}", query.limit));

    let fields: Vec<&str> = match query.select.as_deref() {
        Some(select) if !select.is_empty() => select.iter().map(String::as_str).collect(),
        _ => DEFAULT_SEARCH_FIELDS.to_vec(),
    };
    for field in &fields {
        check_name(field)?;
    }

    Ok(format!(
        "{{ Get {{ {class}({}) {{ {} }} }} }}",
        args.join(", "),
        fields.join(" ")
    ))
}

fn graphql_literal(value: &Value) -> AirdeeResult<String> {
    let literal = match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        // JSON string escapes are valid GraphQL string escapes.
        Value::String(s) => serde_json::to_string(s)?,
        Value::Array(items) => list_literal(items)?,
        Value::Object(map) if map.is_empty() => "{}".to_string(),
        Value::Object(map) => {
            let fields = map
                .iter()
                .map(|(key, value)| {
                    check_name(key)?;
                    let rendered = match value.as_str() {
                        Some(name) if ENUM_KEYS.contains(&key.as_str()) && is_name(name) => {
                            name.to_string()
                        }
                        _ => graphql_literal(value)?,
                    };
                    Ok(format!("{key}: {rendered}"))
                })
                .collect::<AirdeeResult<Vec<_>>>()?;
            format!("{{ {} }}", fields.join(", "))
        }
    };
    Ok(literal)
}

fn list_literal(items: &[Value]) -> AirdeeResult<String> {
    let items = items
        .iter()
        .map(graphql_literal)
        .collect::<AirdeeResult<Vec<_>>>()?;
    Ok(format!("[{}]", items.join(", ")))
}

fn is_name(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

fn check_name(s: &str) -> AirdeeResult<()> {
    if is_name(s) {
        Ok(())
    } else {
        Err(AirdeeError::InvalidInput(format!(
            "{s:?} is not a valid GraphQL name"
        )))
    }
}
