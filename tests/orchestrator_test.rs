use async_trait::async_trait;
use diag_finder::core::orchestrator::{COMPILING_MESSAGE, EXTRACTING_MESSAGE, PARSING_MESSAGE};
use diag_finder::domain::model::{CenterCount, Coordinates, LocationMode, SearchRequest};
use diag_finder::domain::ports::{
    CitationChunk, CitationRef, GenerationRequest, GenerationResponse, GenerationService,
};
use diag_finder::utils::error::{Result, MALFORMED_RESPONSE_MESSAGE};
use diag_finder::{FinderError, SearchOrchestrator, SearchState};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

enum Script {
    Reply(String, Vec<CitationChunk>),
    Fail(String),
}

/// 記錄呼叫次數與最後一個請求的假服務
struct ScriptedService {
    script: Script,
    calls: Arc<AtomicUsize>,
    last_request: Arc<Mutex<Option<GenerationRequest>>>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedService {
    fn replying(text: &str) -> Self {
        Self::new(Script::Reply(text.to_string(), vec![]))
    }

    fn new(script: Script) -> Self {
        Self {
            script,
            calls: Arc::new(AtomicUsize::new(0)),
            last_request: Arc::new(Mutex::new(None)),
            gate: None,
        }
    }
}

#[async_trait]
impl GenerationService for ScriptedService {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match &self.script {
            Script::Reply(text, citations) => Ok(GenerationResponse {
                text: text.clone(),
                citations: citations.clone(),
            }),
            Script::Fail(message) => Err(FinderError::transport(message.clone())),
        }
    }
}

fn two_center_payload() -> String {
    serde_json::json!({
        "diagnosticCenters": [
            {
                "name": "Springfield Imaging",
                "address": "742 Evergreen Terrace",
                "contactDetails": { "phone": "555-1000", "website": "https://imaging.example" },
                "googleRating": 4.4,
                "userReviewSummary": "Quick scans",
                "hasCTMachine": true,
                "nearbySpecialists": {
                    "cardiologists": [
                        { "name": "Dr. Hibbert", "address": "1 Clinic Way", "phone": "555-2000" }
                    ]
                }
            },
            {
                "name": "Shelbyville Diagnostics",
                "address": "9 Main St",
                "contactDetails": { "phone": "", "website": "" },
                "googleRating": 3.9,
                "userReviewSummary": "",
                "hasCTMachine": true,
                "nearbySpecialists": {}
            }
        ]
    })
    .to_string()
}

fn springfield_request() -> SearchRequest {
    SearchRequest::new(
        LocationMode::city("Springfield"),
        CenterCount::Fixed(5),
        vec!["Cardiologists".to_string()],
    )
}

#[tokio::test]
async fn test_springfield_search_succeeds() {
    let service = ScriptedService::new(Script::Reply(
        format!("Here you go:\n```json\n{}\n```", two_center_payload()),
        vec![CitationChunk {
            web: None,
            maps: Some(CitationRef {
                uri: "https://maps.google.com/?cid=42".to_string(),
                title: Some("Springfield Imaging".to_string()),
            }),
        }],
    ));
    let calls = service.calls.clone();
    let last_request = service.last_request.clone();
    let orchestrator = SearchOrchestrator::new(service);
    assert_eq!(orchestrator.state(), SearchState::Idle);

    let result = orchestrator.search(springfield_request()).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(orchestrator.state(), SearchState::Succeeded);
    assert!(!orchestrator.is_loading());
    assert_eq!(result.centers.len(), 2);
    assert_eq!(result.sources.len(), 1);
    assert_eq!(orchestrator.result(), Some(result.clone()));
    assert_eq!(orchestrator.error(), None);

    let progress = orchestrator.progress();
    assert_eq!(progress.len(), 4);
    assert!(progress.messages()[0].contains("Springfield"));
    assert_eq!(progress.messages()[1], PARSING_MESSAGE);
    assert_eq!(progress.messages()[2], EXTRACTING_MESSAGE);
    assert_eq!(progress.current(), Some(COMPILING_MESSAGE));

    // 沒有結果的專科補上空陣列
    let second = &result.centers[1];
    assert_eq!(second.nearby_specialists.get("cardiologists"), Some(&vec![]));
    assert_eq!(result.centers[0].specialists_for("Cardiologists").len(), 1);

    let request = last_request.lock().unwrap().clone().unwrap();
    assert!(request.prompt.contains("in the city of \"Springfield\""));
    assert!(request.tools.web_search && request.tools.maps_search);
    assert_eq!(request.geo_bias, None);
}

#[tokio::test]
async fn test_unset_location_fails_without_calling_service() {
    let service = ScriptedService::replying("{}");
    let calls = service.calls.clone();
    let orchestrator = SearchOrchestrator::new(service);

    let request = SearchRequest::new(
        LocationMode::city("   "),
        CenterCount::Fixed(5),
        vec!["Cardiologists".to_string()],
    );
    let err = orchestrator.search(request).await.unwrap_err();

    assert!(matches!(err, FinderError::Validation { .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(orchestrator.state(), SearchState::Failed);
    assert!(!orchestrator.is_loading());
    assert!(orchestrator.error().is_some());
    assert!(orchestrator.progress().is_empty());
}

#[tokio::test]
async fn test_empty_specialties_fail_validation() {
    let service = ScriptedService::replying("{}");
    let calls = service.calls.clone();
    let orchestrator = SearchOrchestrator::new(service);

    let request = SearchRequest::new(LocationMode::city("Springfield"), CenterCount::All, vec![]);
    let err = orchestrator.search(request).await.unwrap_err();

    assert!(matches!(err, FinderError::Validation { .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_near_me_passes_geo_bias() {
    let service = ScriptedService::replying(r#"{"diagnosticCenters":[]}"#);
    let last_request = service.last_request.clone();
    let orchestrator = SearchOrchestrator::new(service);
    let coords = Coordinates::new(39.78, -89.65);

    let result = orchestrator
        .search(SearchRequest::new(
            LocationMode::NearMe(coords),
            CenterCount::All,
            vec!["Neurologists".to_string()],
        ))
        .await
        .unwrap();

    assert!(result.centers.is_empty());
    let request = last_request.lock().unwrap().clone().unwrap();
    assert_eq!(request.geo_bias, Some(coords));
    assert!(request.prompt.contains("5km radius of the user's current location"));
    assert!(orchestrator.progress().messages()[0].contains("near you"));
}

#[tokio::test]
async fn test_malformed_response_fails_search() {
    let orchestrator = SearchOrchestrator::new(ScriptedService::replying("not json at all"));

    let err = orchestrator.search(springfield_request()).await.unwrap_err();

    assert!(matches!(err, FinderError::MalformedResponse { .. }));
    assert_eq!(orchestrator.state(), SearchState::Failed);
    assert_eq!(orchestrator.error().as_deref(), Some(MALFORMED_RESPONSE_MESSAGE));
    assert_eq!(orchestrator.result(), None);
    // 初始訊息加上 parsing
    assert_eq!(orchestrator.progress().len(), 2);
}

#[tokio::test]
async fn test_transport_failure_surfaces_message() {
    let orchestrator = SearchOrchestrator::new(ScriptedService::new(Script::Fail(
        "API key not valid. Please pass a valid API key.".to_string(),
    )));

    let err = orchestrator.search(springfield_request()).await.unwrap_err();

    assert!(matches!(err, FinderError::Transport { .. }));
    assert_eq!(orchestrator.state(), SearchState::Failed);
    assert_eq!(
        orchestrator.error().as_deref(),
        Some("API key not valid. Please pass a valid API key.")
    );
    assert_eq!(orchestrator.progress().len(), 1);
}

#[tokio::test]
async fn test_new_search_clears_previous_failure() {
    let orchestrator = SearchOrchestrator::new(ScriptedService::replying(&two_center_payload()));

    let invalid = SearchRequest::new(LocationMode::Unset, CenterCount::Fixed(5), vec![]);
    assert!(orchestrator.search(invalid).await.is_err());
    assert!(orchestrator.error().is_some());

    orchestrator.search(springfield_request()).await.unwrap();
    assert_eq!(orchestrator.error(), None);
    assert_eq!(orchestrator.state(), SearchState::Succeeded);
}

#[tokio::test]
async fn test_second_search_rejected_while_running() {
    let gate = Arc::new(Notify::new());
    let mut service = ScriptedService::replying(&two_center_payload());
    service.gate = Some(gate.clone());
    let calls = service.calls.clone();
    let orchestrator = Arc::new(SearchOrchestrator::new(service));

    let running = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move { orchestrator.search(springfield_request()).await }
    });

    while !orchestrator.is_loading() {
        tokio::task::yield_now().await;
    }

    let second = orchestrator.search(springfield_request()).await;
    assert!(matches!(second, Err(FinderError::SearchInProgress)));
    assert_eq!(orchestrator.state(), SearchState::Running);

    gate.notify_one();
    let result = running.await.unwrap().unwrap();

    assert_eq!(result.centers.len(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(orchestrator.state(), SearchState::Succeeded);
    assert_eq!(orchestrator.progress().len(), 4);
}

#[tokio::test]
async fn test_dropped_search_clears_loading_state() {
    let gate = Arc::new(Notify::new());
    let mut service = ScriptedService::replying(&two_center_payload());
    service.gate = Some(gate);
    let calls = service.calls.clone();
    let orchestrator = SearchOrchestrator::new(service);

    // 服務永遠不回應，逾時後 future 被丟棄
    let timed_out = tokio::time::timeout(
        Duration::from_millis(50),
        orchestrator.search(springfield_request()),
    )
    .await;

    assert!(timed_out.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(orchestrator.state(), SearchState::Failed);
    assert!(!orchestrator.is_loading());
    assert!(orchestrator.error().is_some());
    assert_eq!(orchestrator.result(), None);
}

#[tokio::test]
async fn test_observer_sees_every_progress_message() {
    let seen = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink = seen.clone();
    let orchestrator = SearchOrchestrator::new(ScriptedService::replying(&two_center_payload()))
        .with_observer(Box::new(move |message: &str| {
            sink.lock().unwrap().push(message.to_string())
        }));

    orchestrator.search(springfield_request()).await.unwrap();

    assert_eq!(seen.lock().unwrap().as_slice(), orchestrator.progress().messages());
}
