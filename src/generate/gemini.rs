//! Outline generation using the Gemini generateContent API.

use crate::error::{LectureError, Result};
use crate::generate::{user_prompt, Mode, OutlineGenerator};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub struct GeminiGenerator {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
}

impl GeminiGenerator {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model: "gemini-2.5-pro".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: 0.0,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        )
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize, Debug)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    error: Option<GeminiError>,
}

#[derive(Deserialize, Debug)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Deserialize, Debug)]
struct GeminiResponseContent {
    parts: Option<Vec<GeminiResponsePart>>,
}

#[derive(Deserialize, Debug)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
struct GeminiError {
    message: String,
}

#[async_trait]
impl OutlineGenerator for GeminiGenerator {
    async fn generate(&self, mode: Mode, task: &str, context: Option<&str>) -> Result<String> {
        info!("Generating {} content with {}", mode, self.model);

        let request = GeminiRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: mode.system_instruction().to_string(),
                }],
            },
            contents: vec![GeminiContent {
                role: Some("user"),
                parts: vec![GeminiPart {
                    text: user_prompt(task, context),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .json(&request)
            .send()
            .await
            .map_err(|e| LectureError::Api(format!("Generation request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LectureError::Api(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(LectureError::Api(format!(
                "Generation API error ({}): {}",
                status, body
            )));
        }

        let gemini_response: GeminiResponse = serde_json::from_str(&body).map_err(|e| {
            LectureError::Api(format!("Failed to parse generation response: {}", e))
        })?;

        if let Some(error) = gemini_response.error {
            return Err(LectureError::Api(format!("Gemini error: {}", error.message)));
        }

        let text: String = gemini_response
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content)
            .and_then(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| p.text)
            .collect();

        let text = text.trim();
        if text.is_empty() {
            return Err(LectureError::Api(
                "Gemini returned no text".to_string(),
            ));
        }

        debug!("Generated {} chars", text.len());
        Ok(text.to_string())
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_creation() {
        let generator = GeminiGenerator::new("test-key".to_string());
        assert_eq!(generator.name(), "gemini");
        assert_eq!(generator.model, "gemini-2.5-pro");
    }

    #[test]
    fn test_endpoint() {
        let generator = GeminiGenerator::new("k".to_string())
            .with_model("gemini-2.0-flash")
            .with_base_url("http://localhost:9000/");
        assert_eq!(
            generator.endpoint(),
            "http://localhost:9000/v1beta/models/gemini-2.0-flash:generateContent?key=k"
        );
    }

    #[test]
    fn test_request_shape() {
        let request = GeminiRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart { text: "sys".into() }],
            },
            contents: vec![GeminiContent {
                role: Some("user"),
                parts: vec![GeminiPart { text: "hi".into() }],
            }],
            generation_config: GenerationConfig { temperature: 0.0 },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "sys");
        assert!(json["systemInstruction"].get("role").is_none());
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["generationConfig"]["temperature"], 0.0);
    }
}
