pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{gemini::GeminiClient, storage::LocalStorage};
pub use config::{env::EnvConfig, toml_config::TomlConfig};
pub use crate::core::orchestrator::{SearchOrchestrator, SearchState};
pub use utils::error::{FinderError, Result};
