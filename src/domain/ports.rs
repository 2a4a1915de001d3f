use crate::domain::model::Coordinates;
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn service_endpoint(&self) -> &str;
    fn model(&self) -> &str;
    fn api_key(&self) -> Option<&str>;
    fn web_search(&self) -> bool;
    fn maps_search(&self) -> bool;
}

/// 檢索工具開關
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrievalTools {
    pub web_search: bool,
    pub maps_search: bool,
}

impl Default for RetrievalTools {
    fn default() -> Self {
        Self {
            web_search: true,
            maps_search: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub tools: RetrievalTools,
    pub geo_bias: Option<Coordinates>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationRef {
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// 一個引用片段可能同時帶有 web 與 maps 參照
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CitationChunk {
    #[serde(default)]
    pub web: Option<CitationRef>,
    #[serde(default)]
    pub maps: Option<CitationRef>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationResponse {
    pub text: String,
    pub citations: Vec<CitationChunk>,
}

/// 遠端生成服務，每次呼叫只送出一個請求
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse>;
}

/// 一次性的定位查詢
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_position(&self) -> Result<Coordinates>;
}
