//! Gemini `generateContent` 用戶端，開啟 Google Search 與 Google Maps 檢索。

use crate::domain::ports::{
    CitationChunk, ConfigProvider, GenerationRequest, GenerationResponse, GenerationService,
};
use crate::utils::error::{FinderError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_url};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<CitationChunk>,
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    /// 沒有 API key 就無法建立用戶端
    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Result<Self> {
        let api_key = config
            .api_key()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| FinderError::configuration("API_KEY environment variable not set"))?;

        validate_url("service.endpoint", config.service_endpoint())?;
        validate_non_empty_string("service.model", config.model())?;

        Ok(Self {
            client: Client::new(),
            endpoint: config.service_endpoint().trim_end_matches('/').to_string(),
            model: config.model().to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn api_model_name(&self) -> &str {
        self.model.strip_prefix("models/").unwrap_or(&self.model)
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint,
            self.api_model_name()
        )
    }

    fn payload(request: &GenerationRequest) -> Value {
        let mut tools = Vec::new();
        if request.tools.web_search {
            tools.push(json!({ "googleSearch": {} }));
        }
        if request.tools.maps_search {
            tools.push(json!({ "googleMaps": {} }));
        }

        let mut payload = json!({
            "contents": [
                { "role": "user", "parts": [ { "text": request.prompt } ] }
            ],
        });
        if !tools.is_empty() {
            payload["tools"] = Value::Array(tools);
        }
        if let Some(coords) = request.geo_bias {
            payload["toolConfig"] = json!({
                "retrievalConfig": {
                    "latLng": {
                        "latitude": coords.latitude,
                        "longitude": coords.longitude,
                    }
                }
            });
        }
        payload
    }
}

fn service_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("error")?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

#[async_trait]
impl GenerationService for GeminiClient {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse> {
        let url = self.url();
        tracing::debug!(
            "Making generateContent request to: {} (geo bias: {})",
            url,
            request.geo_bias.is_some()
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::payload(&request))
            .send()
            .await
            .map_err(|e| FinderError::transport(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        tracing::debug!("Service response status: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = service_error_message(&body)
                .unwrap_or_else(|| format!("Gemini API error {}", status));
            return Err(FinderError::Transport {
                message,
                status: Some(status.as_u16()),
            });
        }

        let body: GenerateContentResponse = response.json().await.map_err(|e| {
            FinderError::transport(format!("Failed to read service response: {}", e))
        })?;

        let Some(candidate) = body.candidates.into_iter().next() else {
            tracing::warn!("Service returned no candidates");
            return Ok(GenerationResponse::default());
        };

        let text = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default();
        let citations = candidate
            .grounding_metadata
            .map(|metadata| metadata.grounding_chunks)
            .unwrap_or_default();

        tracing::debug!(
            "Received {} characters and {} citation chunks",
            text.len(),
            citations.len()
        );

        Ok(GenerationResponse { text, citations })
    }
}
