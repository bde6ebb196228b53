use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::analysis::{AnalysisRequest, GenerativeModel};
use crate::config::PlantIdConfig;
use crate::errors::{GeminiError, GeminiResult};
use crate::types::*;

/// Client for interacting with the Gemini API
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    config: PlantIdConfig,
    model: GeminiModel,
}

impl GeminiClient {
    /// Create a new Gemini API client
    pub fn new(config: PlantIdConfig) -> GeminiResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                GeminiError::ConfigError(
                    "API key is required to initialize the Gemini client".to_string(),
                )
            })?;

        let model = GeminiModel::new(api_key, config.model_name.clone());

        let mut builder = Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            config,
            model,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model.model_name
    }

    /// Get the base API URL
    fn get_base_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.api_base_url(),
            self.model.model_name
        )
    }

    /// Generate content using the Gemini API
    pub async fn generate_content(
        &self,
        request: GenerateContentRequest,
    ) -> GeminiResult<GenerateContentResponse> {
        let url = self.get_base_url();
        debug!(model = %self.model.model_name, "Sending generateContent request");

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.model.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| GeminiError::RequestError(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.map_err(|e| {
                GeminiError::ResponseError(format!("Failed to read error response: {}", e))
            })?;

            return Err(GeminiError::HttpError {
                status_code: status.as_u16(),
                message: format!("API request failed: {}", error_body),
            });
        }

        let response_body = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| GeminiError::ParsingError(format!("Failed to parse response: {}", e)))?;

        Ok(response_body)
    }

    /// Builds a single-turn request carrying a text instruction and one inline image.
    pub fn create_image_request(
        &self,
        prompt: &str,
        media_type: &str,
        data: &str,
    ) -> GenerateContentRequest {
        let user_content = Content {
            parts: vec![
                Part::text(prompt.to_string()),
                Part::inline_data(media_type.to_string(), data.to_string()),
            ],
            role: Some("user".to_string()),
        };

        GenerateContentRequest {
            contents: vec![user_content],
            system_instruction: None,
            generation_config: self.config.temperature.map(|temperature| GenerationConfig {
                temperature: Some(temperature),
                ..GenerationConfig::default()
            }),
        }
    }

    /// Helper method to extract text from a response
    pub fn extract_text_from_response(
        &self,
        response: &GenerateContentResponse,
    ) -> GeminiResult<String> {
        let candidate = response.candidates.first().ok_or_else(|| {
            match response
                .prompt_feedback
                .as_ref()
                .and_then(|feedback| feedback.block_reason.as_deref())
            {
                Some(reason) => GeminiError::ApiError(format!("Prompt blocked: {}", reason)),
                None => GeminiError::ResponseError("No candidates in response".to_string()),
            }
        })?;

        let content = candidate
            .content
            .as_ref()
            .ok_or_else(|| GeminiError::ResponseError("No content in candidate".to_string()))?;

        let text: String = content
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();

        if text.is_empty() {
            return Err(GeminiError::ResponseError("No text in content".to_string()));
        }

        Ok(text)
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, request: &AnalysisRequest) -> GeminiResult<String> {
        let (media_type, data) = request.image.split();
        let body = self.create_image_request(request.prompt, media_type, data);
        let response = self.generate_content(body).await?;
        self.extract_text_from_response(&response)
    }
}
