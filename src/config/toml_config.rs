use crate::adapters::gemini::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use crate::adapters::location::DEFAULT_IP_LOOKUP_ENDPOINT;
use crate::adapters::render::OutputFormat;
use crate::config::env::API_KEY_VARS;
use crate::domain::model::{CenterCount, Coordinates};
use crate::domain::ports::ConfigProvider;
use crate::domain::specialty::SpecialtySelection;
use crate::utils::error::{FinderError, Result};
use crate::utils::validation::{
    validate_coordinates, validate_non_empty_string, validate_path, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

static ENV_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern is valid"));

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    pub search: Option<SearchDefaults>,
    pub location: Option<LocationConfig>,
    pub output: Option<OutputConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub web_search: Option<bool>,
    pub maps_search: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchDefaults {
    /// 數字或 "all"
    pub count: Option<String>,
    pub specialties: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationSource {
    #[default]
    None,
    Ip,
    Fixed,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationConfig {
    #[serde(default)]
    pub provider: LocationSource,
    pub endpoint: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    pub format: Option<String>,
    pub path: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置，API key 未設定時改讀環境變數
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        let mut config: Self =
            toml::from_str(&processed_content).map_err(|e| FinderError::InvalidConfigValue {
                field: "toml_parsing".to_string(),
                value: String::new(),
                reason: format!("TOML parsing error: {}", e),
            })?;

        let unresolved = config
            .service
            .api_key
            .as_deref()
            .map_or(true, |key| key.trim().is_empty() || ENV_PLACEHOLDER.is_match(key));
        if unresolved {
            config.service.api_key = API_KEY_VARS
                .iter()
                .filter_map(|name| std::env::var(name).ok())
                .find(|value| !value.trim().is_empty());
        }

        Ok(config)
    }

    /// 替換環境變數 (例如 ${API_KEY})，找不到的保持原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_PLACEHOLDER
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn default_count(&self) -> Result<Option<CenterCount>> {
        self.search
            .as_ref()
            .and_then(|s| s.count.as_deref())
            .map(str::parse::<CenterCount>)
            .transpose()
    }

    pub fn default_specialties(&self) -> Result<Option<SpecialtySelection>> {
        self.search
            .as_ref()
            .and_then(|s| s.specialties.as_ref())
            .map(SpecialtySelection::from_labels)
            .transpose()
    }

    pub fn location_source(&self) -> LocationSource {
        self.location.as_ref().map(|l| l.provider).unwrap_or_default()
    }

    pub fn location_endpoint(&self) -> &str {
        self.location
            .as_ref()
            .and_then(|l| l.endpoint.as_deref())
            .unwrap_or(DEFAULT_IP_LOOKUP_ENDPOINT)
    }

    pub fn fixed_location(&self) -> Option<Coordinates> {
        let location = self.location.as_ref()?;
        Some(Coordinates::new(location.latitude?, location.longitude?))
    }

    pub fn output_format(&self) -> Result<Option<OutputFormat>> {
        self.output
            .as_ref()
            .and_then(|o| o.format.as_deref())
            .map(str::parse::<OutputFormat>)
            .transpose()
    }

    pub fn output_path(&self) -> Option<&str> {
        self.output.as_ref().and_then(|o| o.path.as_deref())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_url("service.endpoint", self.service_endpoint())?;
        validate_non_empty_string("service.model", self.model())?;

        self.default_count()?;
        if let Some(selection) = self.default_specialties()? {
            if selection.is_empty() {
                return Err(FinderError::InvalidConfigValue {
                    field: "search.specialties".to_string(),
                    value: "[]".to_string(),
                    reason: "At least one specialty is required".to_string(),
                });
            }
        }

        match self.location_source() {
            LocationSource::Ip => validate_url("location.endpoint", self.location_endpoint())?,
            LocationSource::Fixed => {
                let coords = self.fixed_location().ok_or_else(|| FinderError::MissingConfig {
                    field: "location.latitude / location.longitude".to_string(),
                })?;
                validate_coordinates(coords.latitude, coords.longitude)?;
            }
            LocationSource::None => {}
        }

        self.output_format()?;
        if let Some(path) = self.output_path() {
            validate_path("output.path", path)?;
        }

        Ok(())
    }
}

impl ConfigProvider for TomlConfig {
    fn service_endpoint(&self) -> &str {
        self.service.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    fn model(&self) -> &str {
        self.service.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    fn api_key(&self) -> Option<&str> {
        self.service.api_key.as_deref()
    }

    fn web_search(&self) -> bool {
        self.service.web_search.unwrap_or(true)
    }

    fn maps_search(&self) -> bool {
        self.service.maps_search.unwrap_or(true)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
