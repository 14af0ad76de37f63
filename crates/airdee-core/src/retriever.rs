//! Fetch a single article and its stored vector from Weaviate's REST API.

use crate::config::VectorSettings;
use crate::error::{AirdeeError, AirdeeResult};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::{Map, Value};

/// An article as stored in the vector database.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleDocument {
    pub uuid: String,
    pub title: String,
    pub body: String,
    pub vector: Vec<f64>,
}

#[derive(Clone)]
pub struct ArticleRetriever {
    client: Client,
    settings: VectorSettings,
}

impl ArticleRetriever {
    pub fn new(settings: VectorSettings) -> AirdeeResult<Self> {
        settings.base_url()?;
        Ok(Self {
            client: Client::new(),
            settings,
        })
    }

    /// Fetch the article with `uuid`, including its normalised vector.
    ///
    /// The importer appends `trailing_metadata` values to the tail of every
    /// vector; those are trimmed before the length is checked against
    /// `expected_vector_size`.
    pub async fn get_article(&self, uuid: &str) -> AirdeeResult<ArticleDocument> {
        let url = format!(
            "{}/v1/objects/{}/{}?include=vector",
            self.settings.base_url()?,
            self.settings.collection,
            uuid
        );

        let response = self
            .client
            .get(&url)
            .headers(self.settings.headers()?)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            let msg = format!("Article with UUID {uuid:?} was not found.");
            tracing::error!("{msg}");
            return Err(AirdeeError::NotFound(msg));
        }
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AirdeeError::remote(status.as_u16(), &body));
        }

        let object: Value = serde_json::from_str(&body)?;
        let properties = extract_properties(&object)?;
        let vector = extract_vector(&object, &self.settings.vector_property)?;
        let vector = normalise_vector(
            &vector,
            self.settings.expected_vector_size,
            self.settings.trailing_metadata,
        )?;

        Ok(ArticleDocument {
            uuid: uuid.to_string(),
            title: string_property(properties, "title"),
            body: string_property(properties, "body"),
            vector,
        })
    }
}

fn string_property(properties: &Map<String, Value>, key: &str) -> String {
    match properties.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn extract_properties(object: &Value) -> AirdeeResult<&Map<String, Value>> {
    object
        .get("properties")
        .and_then(Value::as_object)
        .ok_or_else(|| AirdeeError::UnexpectedResponse("Response does not contain a property map.".to_string()))
}

/// Find `property` in the `vector`, `vectors` or `additional.vector` maps, in that order.
fn extract_vector(object: &Value, property: &str) -> AirdeeResult<Vec<f64>> {
    let candidates = [
        object.get("vector"),
        object.get("vectors"),
        object.get("additional").and_then(|a| a.get("vector")),
    ];

    for map in candidates.into_iter().flatten().filter_map(Value::as_object) {
        if let Some(Value::Array(values)) = map.get(property) {
            return values
                .iter()
                .map(|v| {
                    v.as_f64().ok_or_else(|| {
                        AirdeeError::UnexpectedResponse(format!(
                            "Vector property {property:?} contains a non-number"
                        ))
                    })
                })
                .collect();
        }
    }

    Err(AirdeeError::UnexpectedResponse(format!(
        "Vector property {property:?} is missing."
    )))
}

/// Trim trailing metadata and validate the vector length.
pub fn normalise_vector(
    vector: &[f64],
    expected_size: Option<usize>,
    trailing_metadata: usize,
) -> AirdeeResult<Vec<f64>> {
    let mut trimmed = vector.to_vec();
    if trailing_metadata > 0 {
        if trimmed.len() <= trailing_metadata {
            let msg = format!(
                "Vector contains fewer values ({}) than the metadata to remove ({}).",
                trimmed.len(),
                trailing_metadata
            );
            tracing::error!("{msg}");
            return Err(AirdeeError::VectorShape(msg));
        }
        trimmed.truncate(trimmed.len() - trailing_metadata);
    }

    let Some(expected) = expected_size else {
        return Ok(trimmed);
    };
    if trimmed.len() == expected {
        return Ok(trimmed);
    }
    if vector.len() == expected {
        return Ok(vector.to_vec());
    }

    let msg = format!(
        "Vector length mismatch: expected {} values but received {}.",
        expected,
        vector.len()
    );
    tracing::error!("{msg}");
    Err(AirdeeError::VectorShape(msg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalise_vector_trims_trailing_metadata() {
        let vector = normalise_vector(&[1.0, 2.0, 3.0, 99.0, 98.0], Some(3), 2).unwrap();
        assert_eq!(vector, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_normalise_vector_raises_on_wrong_length() {
        assert!(matches!(
            normalise_vector(&[1.0, 2.0], Some(3), 0),
            Err(AirdeeError::VectorShape(_))
        ));
    }

    #[test]
    fn test_normalise_vector_raises_when_trailing_exceeds_length() {
        assert!(matches!(
            normalise_vector(&[1.0, 2.0], None, 3),
            Err(AirdeeError::VectorShape(_))
        ));
        assert!(normalise_vector(&[1.0, 2.0], None, 2).is_err());
    }

    #[test]
    fn test_normalise_vector_falls_back_to_untrimmed() {
        let vector = normalise_vector(&[1.0, 2.0, 3.0], Some(3), 1).unwrap();
        assert_eq!(vector, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_normalise_vector_without_expectation() {
        assert_eq!(normalise_vector(&[4.0, 5.0], None, 0).unwrap(), vec![4.0, 5.0]);
        assert_eq!(normalise_vector(&[4.0, 5.0, 6.0], None, 1).unwrap(), vec![4.0, 5.0]);
    }

    #[test]
    fn test_extract_vector_from_vector_block() {
        let object = json!({ "vector": { "te_3_large": [1.0, 2.0, 3.0] } });
        assert_eq!(extract_vector(&object, "te_3_large").unwrap(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_extract_vector_from_additional_block() {
        let object = json!({
            "properties": { "title": "Test", "body": "Inhoud" },
            "additional": { "vector": { "te_3_large": [1.0, 2.0, 3.0] } }
        });
        assert_eq!(extract_vector(&object, "te_3_large").unwrap(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_extract_vector_from_vectors_block() {
        let object = json!({ "vectors": { "te_3_large": [5.0, 6.0, 7.0] } });
        assert_eq!(extract_vector(&object, "te_3_large").unwrap(), vec![5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_extract_vector_missing_property() {
        let object = json!({ "vector": [1.0, 2.0], "vectors": { "other": [1.0] } });
        assert!(matches!(
            extract_vector(&object, "te_3_large"),
            Err(AirdeeError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn test_extract_properties_requires_map() {
        assert!(extract_properties(&json!({ "properties": "nee" })).is_err());
        let object = json!({ "properties": { "title": "T", "body": null } });
        let properties = extract_properties(&object).unwrap();
        assert_eq!(string_property(properties, "title"), "T");
        assert_eq!(string_property(properties, "body"), "");
    }
}
