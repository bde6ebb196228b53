//! Turns an encoded image into a [`PlantInfo`] via one generative-model call.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::encoded::EncodedImage;
use crate::errors::{AnalysisError, GeminiResult};
use crate::plant::PlantInfo;

/// Instruction sent alongside every image.
pub const PLANT_PROMPT: &str = "Analyze this plant image and provide the following information in JSON format:
- name: common name of the plant
- species: scientific name
- description: brief description of the plant (2-3 sentences)
- family: botanical family name
- nativeRegion: where the plant originates from
- toxicity: whether it's toxic to humans or pets
- growthHabit: plant's growth pattern and form
- careRequirements: object containing water, light, soil, and temperature requirements
- characteristics: object containing height, spread, flowerColor, and seasonality
Every value must be a string. Please ensure the response is valid JSON.";

/// One model call: the fixed instruction plus one image.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub prompt: &'static str,
    pub image: EncodedImage,
}

impl AnalysisRequest {
    pub fn new(image: EncodedImage) -> Self {
        Self {
            prompt: PLANT_PROMPT,
            image,
        }
    }
}

/// A hosted model that answers an [`AnalysisRequest`] with free-form text.
#[async_trait]
pub trait GenerativeModel: Send + Sync + Debug {
    async fn generate(&self, request: &AnalysisRequest) -> GeminiResult<String>;
}

/// Builds requests, calls the injected model, and decodes its reply.
#[derive(Debug, Clone)]
pub struct AnalysisClient {
    model: Arc<dyn GenerativeModel>,
}

impl AnalysisClient {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    /// Identify the plant in `image`. A single attempt; any failure is returned as-is.
    pub async fn analyze(&self, image: &EncodedImage) -> Result<PlantInfo, AnalysisError> {
        let request = AnalysisRequest::new(image.clone());
        debug!(media_type = request.image.media_type(), "Analyzing image");

        let result = match self.model.generate(&request).await {
            Ok(text) => decode_reply(&text),
            Err(e) => Err(AnalysisError::from(e)),
        };

        if let Err(e) = &result {
            error!(error = %e, "Error analyzing image");
        }
        result
    }
}

/// Extract and decode the first JSON object in a model reply.
pub fn decode_reply(text: &str) -> Result<PlantInfo, AnalysisError> {
    let json = extract_json_object(text).ok_or(AnalysisError::NoStructuredData)?;
    decode_plant_info(json)
}

/// Returns the slice from the first `{` to its balanced `}`.
///
/// Braces inside JSON strings are skipped. When the object never closes, the
/// rest of the text is returned so that the parse step reports it as malformed.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    Some(&text[start..])
}

/// Syntax check first, then shape check, so the two failures stay distinct.
pub fn decode_plant_info(json: &str) -> Result<PlantInfo, AnalysisError> {
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(AnalysisError::MalformedResponse)?;
    serde_json::from_value(value).map_err(AnalysisError::SchemaMismatch)
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedModel;
    use super::*;
    use crate::errors::GeminiError;
    use crate::plant::fixtures::{monstera, MONSTERA_JSON};

    fn image() -> EncodedImage {
        EncodedImage::from_bytes("image/jpeg", b"\xff\xd8\xff\xe0").unwrap()
    }

    #[tokio::test]
    async fn test_well_formed_reply_populates_every_field() {
        let model = ScriptedModel::replying(vec![Ok(MONSTERA_JSON.to_string())]);
        let client = AnalysisClient::new(model.clone());

        let info = client.analyze(&image()).await.unwrap();
        assert_eq!(info, monstera());

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].prompt, PLANT_PROMPT);
        assert_eq!(seen[0].image.media_type(), "image/jpeg");
    }

    #[tokio::test]
    async fn test_commentary_around_object_is_ignored() {
        let reply = format!("Here is the result: ```json\n{}\n``` Thanks!", MONSTERA_JSON);
        let model = ScriptedModel::replying(vec![Ok(reply)]);

        let info = AnalysisClient::new(model).analyze(&image()).await.unwrap();
        assert_eq!(info, monstera());
    }

    #[tokio::test]
    async fn test_reply_without_braces_has_no_structured_data() {
        let model = ScriptedModel::replying(vec![Ok("I cannot see a plant here.".to_string())]);

        let result = AnalysisClient::new(model).analyze(&image()).await;
        assert!(matches!(result, Err(AnalysisError::NoStructuredData)));
    }

    #[tokio::test]
    async fn test_invalid_json_is_malformed() {
        let model = ScriptedModel::replying(vec![Ok("{ invalid json".to_string())]);

        let result = AnalysisClient::new(model).analyze(&image()).await;
        assert!(matches!(result, Err(AnalysisError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn test_model_error_propagates_unchanged() {
        let model = ScriptedModel::replying(vec![Err(GeminiError::HttpError {
            status_code: 403,
            message: "API key not valid".to_string(),
        })]);

        let result = AnalysisClient::new(model).analyze(&image()).await;
        assert!(matches!(
            result,
            Err(AnalysisError::Model(GeminiError::HttpError { status_code: 403, .. }))
        ));
    }

    #[tokio::test]
    async fn test_same_image_twice_gives_identical_records() {
        let model = ScriptedModel::replying(vec![
            Ok(MONSTERA_JSON.to_string()),
            Ok(MONSTERA_JSON.to_string()),
        ]);
        let client = AnalysisClient::new(model);

        let first = client.analyze(&image()).await.unwrap();
        let second = client.analyze(&image()).await.unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_field_is_schema_mismatch() {
        let result = decode_plant_info(r#"{"name": "Fern", "species": "Nephrolepis exaltata"}"#);
        assert!(matches!(result, Err(AnalysisError::SchemaMismatch(_))));
    }

    #[test]
    fn test_non_string_field_is_schema_mismatch() {
        let json = MONSTERA_JSON.replace(r#""Araceae""#, "42");
        assert!(matches!(decode_plant_info(&json), Err(AnalysisError::SchemaMismatch(_))));
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let json = MONSTERA_JSON.replacen('{', r#"{"confidence": "high", "#, 1);
        assert_eq!(decode_plant_info(&json).unwrap(), monstera());
    }

    #[test]
    fn test_extract_stops_at_balanced_brace() {
        let text = r#"First {"a": {"b": "}"}} then {"c": 1}"#;
        assert_eq!(extract_json_object(text), Some(r#"{"a": {"b": "}"}}"#));
    }

    #[test]
    fn test_extract_handles_escaped_quotes() {
        let text = r#"x {"a": "say \"{hi\""} y"#;
        assert_eq!(extract_json_object(text), Some(r#"{"a": "say \"{hi\""}"#));
    }

    #[test]
    fn test_extract_unclosed_returns_tail() {
        assert_eq!(extract_json_object("ok { invalid json"), Some("{ invalid json"));
        assert_eq!(extract_json_object("only } closing"), None);
    }

    #[test]
    fn test_prompt_names_every_field() {
        for field in [
            "name", "species", "description", "family", "nativeRegion", "toxicity",
            "growthHabit", "careRequirements", "characteristics", "water", "light", "soil",
            "temperature", "height", "spread", "flowerColor", "seasonality",
        ] {
            assert!(PLANT_PROMPT.contains(field), "prompt is missing {}", field);
        }
        assert!(PLANT_PROMPT.contains("JSON"));
    }
}
