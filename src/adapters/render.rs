//! 搜尋結果的呈現：終端機卡片、JSON、CSV。

use crate::domain::model::{DiagnosticCenter, SearchResult};
use crate::utils::error::{FinderError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::str::FromStr;

pub const NO_RESULTS_MESSAGE: &str =
    "No diagnostic centers with CT machines were found. Please try a different city.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = FinderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(FinderError::InvalidConfigValue {
                field: "output.format".to_string(),
                value: other.to_string(),
                reason: "Unsupported format. Valid formats: text, json, csv".to_string(),
            }),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn render_center(out: &mut String, index: usize, center: &DiagnosticCenter, specialties: &[String]) {
    let _ = write!(out, "{}. {}", index + 1, center.name);
    if center.google_rating > 0.0 {
        let _ = write!(out, "  ★ {:.1}", center.google_rating);
    }
    out.push('\n');

    if center.has_ct_machine {
        out.push_str("   ✓ CT Machine Available\n");
    }
    if !center.address.is_empty() {
        let _ = writeln!(out, "   Address: {}", center.address);
    }
    if let Some(phone) = &center.contact_details.phone {
        let _ = writeln!(out, "   Phone:   {}", phone);
    }
    if let Some(website) = &center.contact_details.website {
        let _ = writeln!(out, "   Website: {}", website);
    }
    if let Some(summary) = &center.user_review_summary {
        let _ = writeln!(out, "   What Users Say: \"{}\"", summary);
    }

    let _ = writeln!(out, "   Specialists near {}:", center.name);
    for specialty in specialties {
        let title = capitalize(specialty);
        let specialists = center.specialists_for(specialty);
        if specialists.is_empty() {
            let _ = writeln!(
                out,
                "     {}: No {} found nearby for this center.",
                title,
                specialty.to_lowercase()
            );
            continue;
        }
        let _ = writeln!(out, "     {}:", title);
        for specialist in specialists {
            let _ = write!(out, "       - {}", specialist.name);
            if !specialist.address.is_empty() {
                let _ = write!(out, ", {}", specialist.address);
            }
            if let Some(phone) = &specialist.phone {
                let _ = write!(out, " ({})", phone);
            }
            out.push('\n');
        }
    }
}

pub fn render_text(result: &SearchResult, specialties: &[String]) -> String {
    if result.is_empty() {
        return format!("{}\n", NO_RESULTS_MESSAGE);
    }

    let mut out = String::new();
    for (index, center) in result.centers.iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        render_center(&mut out, index, center, specialties);
    }

    if !result.sources.is_empty() {
        out.push_str("\nData Sources:\n");
        for source in &result.sources {
            let _ = writeln!(out, "  - {} <{}>", source.display_title(), source.uri);
        }
    }
    out
}

pub fn render_csv(result: &SearchResult) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "name",
        "address",
        "phone",
        "website",
        "google_rating",
        "has_ct_machine",
        "user_review_summary",
        "specialist_count",
    ])?;
    for center in &result.centers {
        let rating = format!("{:.1}", center.google_rating);
        let specialist_count = center.specialist_count().to_string();
        writer.write_record([
            center.name.as_str(),
            center.address.as_str(),
            center.contact_details.phone.as_deref().unwrap_or(""),
            center.contact_details.website.as_deref().unwrap_or(""),
            rating.as_str(),
            if center.has_ct_machine { "true" } else { "false" },
            center.user_review_summary.as_deref().unwrap_or(""),
            specialist_count.as_str(),
        ])?;
    }
    let data = writer
        .into_inner()
        .map_err(|e| FinderError::Io(e.into_error()))?;
    String::from_utf8(data).map_err(|e| FinderError::malformed(e.to_string()))
}

pub fn render(result: &SearchResult, specialties: &[String], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(result, specialties)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
        OutputFormat::Csv => render_csv(result),
    }
}
