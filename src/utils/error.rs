use thiserror::Error;

/// 模型回應無法解析時給使用者的訊息
pub const MALFORMED_RESPONSE_MESSAGE: &str = "The response from the AI was not in a valid format. \
This may be due to the complexity of the request. Try reducing the number of centers or specialties.";

/// 遠端模型內部錯誤時給使用者的訊息
pub const INTERNAL_MODEL_ERROR_MESSAGE: &str = "The AI model encountered an internal error, \
likely due to the request's complexity. Please try searching for fewer centers or a different city.";

const GENERIC_TRANSPORT_MESSAGE: &str = "An unknown error occurred. Please try again.";

#[derive(Error, Debug)]
pub enum FinderError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfig { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("A search is already running")]
    SearchInProgress,

    #[error("Service call failed: {message}")]
    Transport {
        message: String,
        status: Option<u16>,
    },

    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Validation,
    Network,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl FinderError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            status: None,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration { .. }
            | Self::MissingConfig { .. }
            | Self::InvalidConfigValue { .. } => ErrorCategory::Configuration,
            Self::Validation { .. } | Self::SearchInProgress => ErrorCategory::Validation,
            Self::Transport { .. } => ErrorCategory::Network,
            Self::MalformedResponse { .. } | Self::Serialization(_) | Self::Csv(_) => {
                ErrorCategory::Data
            }
            Self::Io(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::SearchInProgress => ErrorSeverity::Low,
            Self::Transport { .. } | Self::MalformedResponse { .. } => ErrorSeverity::Medium,
            Self::Validation { .. }
            | Self::InvalidConfigValue { .. }
            | Self::Serialization(_)
            | Self::Csv(_) => ErrorSeverity::High,
            Self::Configuration { .. } | Self::MissingConfig { .. } | Self::Io(_) => {
                ErrorSeverity::Critical
            }
        }
    }

    /// 對應到單一使用者可讀訊息
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::MalformedResponse { .. } => MALFORMED_RESPONSE_MESSAGE.to_string(),
            Self::Transport { message, status } => {
                if is_internal_model_error(message) || *status == Some(500) {
                    INTERNAL_MODEL_ERROR_MESSAGE.to_string()
                } else if message.trim().is_empty() {
                    GENERIC_TRANSPORT_MESSAGE.to_string()
                } else {
                    message.clone()
                }
            }
            Self::Validation { message } => message.clone(),
            Self::SearchInProgress => {
                "A search is already running. Wait for it to finish.".to_string()
            }
            Self::Configuration { message } => format!("Configuration problem: {}", message),
            Self::MissingConfig { field } => format!("Missing required setting: {}", field),
            Self::InvalidConfigValue { field, reason, .. } => {
                format!("Invalid setting {}: {}", field, reason)
            }
            Self::Io(e) => format!("File system error: {}", e),
            Self::Serialization(e) => format!("Could not serialize the result: {}", e),
            Self::Csv(e) => format!("Could not write CSV output: {}", e),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::Configuration { .. } | Self::MissingConfig { .. } => {
                "Set the API_KEY environment variable or the [service] api_key entry of the config file"
            }
            Self::InvalidConfigValue { .. } => "Check the value against the documented options",
            Self::Validation { .. } => {
                "Provide a city (or --near-me with a known location) and at least one specialty"
            }
            Self::SearchInProgress => "Wait for the running search to complete",
            Self::Transport { .. } => "Check your network connection and try again",
            Self::MalformedResponse { .. } => "Reduce the number of centers or specialties",
            Self::Io(_) => "Check that the output directory exists and is writable",
            Self::Serialization(_) | Self::Csv(_) => "Try a different output format",
        }
    }
}

fn is_internal_model_error(message: &str) -> bool {
    message.contains("Internal error encountered")
        || message.contains("500")
        || message.contains("xhr error")
}

impl From<reqwest::Error> for FinderError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport {
            message: e.to_string(),
            status: e.status().map(|s| s.as_u16()),
        }
    }
}

pub type Result<T> = std::result::Result<T, FinderError>;
