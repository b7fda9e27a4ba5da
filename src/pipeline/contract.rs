//! The response contract between this crate and the model.
//!
//! The same shape is declared twice: as a Gemini `responseSchema` (OpenAPI
//! subset, uppercase type names) sent with every request, and as serde types
//! the mapper deserialises into. Both describe
//!
//! ```text
//! { "chapters": [ { "title": string, "content": string }, ... ] }   // ≥ 1 entry
//! ```

use serde::Deserialize;
use serde_json::{json, Value};

/// Schema the model output must satisfy.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseContract {
    schema: Value,
}

impl ResponseContract {
    /// The chapter-list contract.
    pub fn chapters() -> Self {
        Self {
            schema: json!({
                "type": "OBJECT",
                "properties": {
                    "chapters": {
                        "type": "ARRAY",
                        "minItems": 1,
                        "items": {
                            "type": "OBJECT",
                            "properties": {
                                "title": {
                                    "type": "STRING",
                                    "description": "A concise title for the chapter or section."
                                },
                                "content": {
                                    "type": "STRING",
                                    "description": "The full, cleaned text content of the chapter."
                                }
                            },
                            "required": ["title", "content"],
                            "propertyOrdering": ["title", "content"]
                        }
                    }
                },
                "required": ["chapters"]
            }),
        }
    }

    /// The `responseSchema` value.
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// MIME type requested for the response.
    pub fn mime_type(&self) -> &'static str {
        "application/json"
    }
}

impl Default for ResponseContract {
    fn default() -> Self {
        Self::chapters()
    }
}

/// Wire shape of a contract-conforming response.
#[derive(Debug, Deserialize)]
pub(crate) struct ContractPayload {
    pub chapters: Vec<ContractChapter>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContractChapter {
    pub title: String,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_requires_chapters_title_and_content() {
        let c = ResponseContract::chapters();
        let s = c.schema();
        assert_eq!(s["required"], json!(["chapters"]));
        assert_eq!(s["properties"]["chapters"]["type"], "ARRAY");
        assert_eq!(s["properties"]["chapters"]["minItems"], 1);
        assert_eq!(
            s["properties"]["chapters"]["items"]["required"],
            json!(["title", "content"])
        );
        assert_eq!(c.mime_type(), "application/json");
    }
}
