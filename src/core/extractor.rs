//! 從模型的自由文字回應中取出 JSON 結果，並整理引用來源。

use crate::domain::model::{DiagnosticCenter, GroundingSource, SearchResult, SourceKind};
use crate::domain::ports::{CitationChunk, CitationRef, GenerationResponse};
use crate::utils::error::{FinderError, Result};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::LazyLock;

static JSON_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```json\s*(.*?)\s*```").expect("fence pattern is valid")
});

#[derive(Debug, Deserialize)]
struct CenterEnvelope {
    #[serde(default, rename = "diagnosticCenters")]
    diagnostic_centers: Option<Vec<DiagnosticCenter>>,
}

/// 找出候選 JSON 字串：先找 ```json 區塊，否則取第一個 `{` 到最後一個 `}`
pub fn json_candidate(text: &str) -> &str {
    if let Some(inner) = JSON_FENCE.captures(text).and_then(|caps| caps.get(1)) {
        return inner.as_str();
    }

    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start <= end => &text[start..=end],
        _ => text,
    }
}

/// 沒有名稱的中心無法顯示，略過但不讓整批結果失敗
pub fn parse_centers(text: &str) -> Result<Vec<DiagnosticCenter>> {
    let candidate = json_candidate(text);
    let envelope: CenterEnvelope = serde_json::from_str(candidate).map_err(|e| {
        tracing::debug!("Failed to parse JSON from response: {}", text);
        FinderError::malformed(e.to_string())
    })?;

    let centers = envelope.diagnostic_centers.unwrap_or_default();
    let total = centers.len();
    let named: Vec<DiagnosticCenter> = centers
        .into_iter()
        .filter(|center| !center.name.trim().is_empty())
        .collect();
    if named.len() < total {
        tracing::warn!("Skipped {} center records without a name", total - named.len());
    }
    Ok(named)
}

fn push_source(sources: &mut Vec<GroundingSource>, reference: &CitationRef, kind: SourceKind) {
    sources.push(GroundingSource {
        uri: reference.uri.clone(),
        title: reference.title.clone(),
        kind,
    });
}

/// 依 uri 去重：保留第一次出現的位置，標題以最後一次為準
pub fn collect_sources(chunks: &[CitationChunk]) -> Vec<GroundingSource> {
    let mut raw = Vec::new();
    for chunk in chunks {
        if let Some(web) = &chunk.web {
            push_source(&mut raw, web, SourceKind::Web);
        }
        if let Some(maps) = &chunk.maps {
            push_source(&mut raw, maps, SourceKind::Maps);
        }
    }

    let mut index: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<GroundingSource> = Vec::with_capacity(raw.len());
    for source in raw {
        match index.get(&source.uri) {
            Some(&pos) => unique[pos] = source,
            None => {
                index.insert(source.uri.clone(), unique.len());
                unique.push(source);
            }
        }
    }
    unique
}

/// 抽取流程的階段，開始前通知呼叫端
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStage {
    Parsing,
    ExtractingSources,
}

pub fn extract(response: &GenerationResponse) -> Result<SearchResult> {
    extract_with_progress(response, |_| {})
}

pub fn extract_with_progress<F>(response: &GenerationResponse, mut on_stage: F) -> Result<SearchResult>
where
    F: FnMut(ExtractionStage),
{
    on_stage(ExtractionStage::Parsing);
    let centers = parse_centers(&response.text)?;

    on_stage(ExtractionStage::ExtractingSources);
    let sources = collect_sources(&response.citations);

    Ok(SearchResult { centers, sources })
}
