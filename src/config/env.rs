use crate::adapters::gemini::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{validate_non_empty_string, validate_url, Validate};
use std::env;

/// 憑證讀取順序：API_KEY，其次 GEMINI_API_KEY
pub const API_KEY_VARS: [&str; 2] = ["API_KEY", "GEMINI_API_KEY"];

#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
}

impl EnvConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = API_KEY_VARS
            .iter()
            .filter_map(|name| lookup(name))
            .find(|value| !value.trim().is_empty());

        Self {
            endpoint: lookup("GEMINI_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            model: lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_key,
        }
    }
}

impl ConfigProvider for EnvConfig {
    fn service_endpoint(&self) -> &str {
        &self.endpoint
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    fn web_search(&self) -> bool {
        true
    }

    fn maps_search(&self) -> bool {
        true
    }
}

impl Validate for EnvConfig {
    fn validate(&self) -> Result<()> {
        validate_url("GEMINI_ENDPOINT", &self.endpoint)?;
        validate_non_empty_string("GEMINI_MODEL", &self.model)
    }
}
