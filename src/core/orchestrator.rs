use crate::core::extractor::{self, ExtractionStage};
use crate::core::prompt::{self, REQUIRED_EQUIPMENT};
use crate::domain::model::{LocationMode, SearchProgress, SearchRequest, SearchResult};
use crate::domain::ports::{GenerationRequest, GenerationService, RetrievalTools};
use crate::utils::error::{FinderError, Result};
use std::sync::{Mutex, MutexGuard};

pub const PARSING_MESSAGE: &str = "Parsing AI response...";
pub const EXTRACTING_MESSAGE: &str = "Extracting data sources...";
pub const COMPILING_MESSAGE: &str = "Compiling results...";
const CANCELLED_MESSAGE: &str = "The search was cancelled before it finished.";

pub type ProgressObserver = Box<dyn Fn(&str) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    Idle,
    Running,
    Succeeded,
    Failed,
}

#[derive(Debug)]
struct Session {
    state: SearchState,
    progress: SearchProgress,
    result: Option<SearchResult>,
    error: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            state: SearchState::Idle,
            progress: SearchProgress::default(),
            result: None,
            error: None,
        }
    }
}

/// 執行中被丟棄（例如 future 被取消）時，確保 loading 狀態被清掉
struct RunningGuard<'a> {
    session: &'a Mutex<Session>,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        let mut session = self.session.lock().unwrap_or_else(|e| e.into_inner());
        if session.state == SearchState::Running {
            tracing::warn!("Search dropped while running");
            session.state = SearchState::Failed;
            session.error = Some(CANCELLED_MESSAGE.to_string());
        }
    }
}

pub fn initial_status(request: &SearchRequest) -> String {
    let location = match &request.location {
        LocationMode::City(city) => format!("in {}", city),
        LocationMode::NearMe(_) | LocationMode::Unset => "near you".to_string(),
    };
    format!(
        "Finding {} diagnostic centers with {}s {}...",
        prompt::count_phrase(request.count),
        REQUIRED_EQUIPMENT,
        location
    )
}

pub struct SearchOrchestrator<S: GenerationService> {
    service: S,
    tools: RetrievalTools,
    session: Mutex<Session>,
    observer: Option<ProgressObserver>,
}

impl<S: GenerationService> SearchOrchestrator<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            tools: RetrievalTools::default(),
            session: Mutex::new(Session::default()),
            observer: None,
        }
    }

    pub fn with_tools(mut self, tools: RetrievalTools) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_observer(mut self, observer: ProgressObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> SearchState {
        self.session().state
    }

    pub fn is_loading(&self) -> bool {
        self.state() == SearchState::Running
    }

    pub fn progress(&self) -> SearchProgress {
        self.session().progress.clone()
    }

    pub fn result(&self) -> Option<SearchResult> {
        self.session().result.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.session().error.clone()
    }

    fn report(&self, message: &str) {
        tracing::info!("⏳ {}", message);
        self.session().progress.push(message);
        if let Some(observer) = &self.observer {
            observer(message);
        }
    }

    fn fail(&self, error: FinderError) -> FinderError {
        tracing::error!(
            "❌ Search failed: {} (Category: {:?}, Severity: {:?})",
            error,
            error.category(),
            error.severity()
        );
        let mut session = self.session();
        session.state = SearchState::Failed;
        session.result = None;
        session.error = Some(error.user_friendly_message());
        error
    }

    /// 開始一次搜尋；同一時間只允許一個搜尋在執行
    fn begin(&self, request: &SearchRequest) -> Result<()> {
        let mut session = self.session();
        if session.state == SearchState::Running {
            return Err(FinderError::SearchInProgress);
        }

        session.result = None;
        session.error = None;

        if !request.is_submittable() {
            let err = if !request.location.is_set() {
                FinderError::validation(
                    "Enter a city or allow access to your current location before searching.",
                )
            } else {
                FinderError::validation("Select at least one specialty before searching.")
            };
            session.state = SearchState::Failed;
            session.progress = SearchProgress::default();
            session.error = Some(err.user_friendly_message());
            return Err(err);
        }

        let status = initial_status(request);
        session.state = SearchState::Running;
        session.progress = SearchProgress::starting_with(status.clone());
        drop(session);

        tracing::info!("🚀 {}", status);
        if let Some(observer) = &self.observer {
            observer(&status);
        }
        Ok(())
    }

    pub async fn search(&self, request: SearchRequest) -> Result<SearchResult> {
        if let Err(e) = self.begin(&request) {
            tracing::warn!("Search rejected: {}", e);
            return Err(e);
        }
        let _guard = RunningGuard {
            session: &self.session,
        };

        let generation = GenerationRequest {
            prompt: prompt::build_prompt(&request),
            tools: self.tools,
            geo_bias: request.location.geo_bias(),
        };
        tracing::debug!("Prompt:\n{}", generation.prompt);

        let response = match self.service.generate(generation).await {
            Ok(response) => response,
            Err(e) => return Err(self.fail(e)),
        };

        let extracted = extractor::extract_with_progress(&response, |stage| match stage {
            ExtractionStage::Parsing => self.report(PARSING_MESSAGE),
            ExtractionStage::ExtractingSources => self.report(EXTRACTING_MESSAGE),
        });
        let mut result = match extracted {
            Ok(result) => result,
            Err(e) => return Err(self.fail(e)),
        };

        self.report(COMPILING_MESSAGE);
        result.ensure_specialties(&request.specialties);

        tracing::info!(
            "✅ Found {} centers and {} sources",
            result.centers.len(),
            result.sources.len()
        );

        let mut session = self.session();
        session.state = SearchState::Succeeded;
        session.result = Some(result.clone());
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::CenterCount;

    #[test]
    fn test_initial_status_reflects_location_mode() {
        let city = SearchRequest::new(
            LocationMode::city("Springfield"),
            CenterCount::Fixed(5),
            vec!["Cardiologists".into()],
        );
        assert_eq!(
            initial_status(&city),
            "Finding the top 5 diagnostic centers with CT machines in Springfield..."
        );

        let near = SearchRequest::new(
            LocationMode::NearMe(crate::domain::model::Coordinates::new(1.0, 2.0)),
            CenterCount::All,
            vec!["Cardiologists".into()],
        );
        assert_eq!(
            initial_status(&near),
            "Finding all diagnostic centers with CT machines near you..."
        );
    }
}
