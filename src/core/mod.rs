pub mod extractor;
pub mod orchestrator;
pub mod prompt;

pub use crate::domain::model::{SearchProgress, SearchRequest, SearchResult};
pub use crate::domain::ports::{GenerationService, LocationProvider, Storage};
pub use crate::utils::error::Result;
