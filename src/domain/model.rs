use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::utils::error::FinderError;

/// 搜尋半徑（公里），中心與專科醫師共用
pub const SEARCH_RADIUS_KM: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}, {:.5}", self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LocationMode {
    City(String),
    NearMe(Coordinates),
    Unset,
}

impl LocationMode {
    /// 空白城市字串視為未設定
    pub fn city(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            Self::Unset
        } else {
            Self::City(trimmed.to_string())
        }
    }

    pub fn geo_bias(&self) -> Option<Coordinates> {
        match self {
            Self::NearMe(coords) => Some(*coords),
            _ => None,
        }
    }

    pub fn is_set(&self) -> bool {
        !matches!(self, Self::Unset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CenterCount {
    Fixed(u32),
    All,
}

impl Default for CenterCount {
    fn default() -> Self {
        Self::Fixed(5)
    }
}

impl FromStr for CenterCount {
    type Err = FinderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        if value.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        match value.parse::<u32>() {
            Ok(n) if n > 0 => Ok(Self::Fixed(n)),
            _ => Err(FinderError::InvalidConfigValue {
                field: "count".to_string(),
                value: s.to_string(),
                reason: "Expected a positive number or 'all'".to_string(),
            }),
        }
    }
}

impl fmt::Display for CenterCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(n) => write!(f, "{}", n),
            Self::All => write!(f, "all"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub location: LocationMode,
    pub count: CenterCount,
    /// 依使用者選取順序，正規化後不重複（保留第一次的寫法）
    pub specialties: Vec<String>,
}

impl SearchRequest {
    pub fn new(location: LocationMode, count: CenterCount, specialties: Vec<String>) -> Self {
        let mut unique: Vec<String> = Vec::with_capacity(specialties.len());
        for label in specialties {
            let label = label.trim().to_string();
            let key = normalize_label(&label);
            if !label.is_empty() && !unique.iter().any(|seen| normalize_label(seen) == key) {
                unique.push(label);
            }
        }
        Self {
            location,
            count,
            specialties: unique,
        }
    }

    pub fn is_submittable(&self) -> bool {
        self.location.is_set() && !self.specialties.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactDetails {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub website: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Specialist {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticCenter {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub contact_details: ContactDetails,
    #[serde(default, deserialize_with = "lenient_rating")]
    pub google_rating: f64,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub user_review_summary: Option<String>,
    #[serde(default, rename = "hasCTMachine", deserialize_with = "null_as_default")]
    pub has_ct_machine: bool,
    #[serde(default, deserialize_with = "specialist_map")]
    pub nearby_specialists: BTreeMap<String, Vec<Specialist>>,
}

impl DiagnosticCenter {
    /// 查不到的專科回傳空切片，不當成資料缺漏
    pub fn specialists_for(&self, specialty: &str) -> &[Specialist] {
        self.nearby_specialists
            .get(&normalize_label(specialty))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn ensure_specialties(&mut self, specialties: &[String]) {
        for label in specialties {
            self.nearby_specialists
                .entry(normalize_label(label))
                .or_default();
        }
    }

    pub fn specialist_count(&self) -> usize {
        self.nearby_specialists.values().map(Vec::len).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Web,
    Maps,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundingSource {
    pub uri: String,
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub kind: SourceKind,
}

impl GroundingSource {
    pub fn display_title(&self) -> &str {
        match self.title.as_deref() {
            Some(title) if !title.trim().is_empty() => title,
            _ => match self.kind {
                SourceKind::Maps => "Google Maps",
                SourceKind::Web => "Google Search",
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(rename = "diagnosticCenters")]
    pub centers: Vec<DiagnosticCenter>,
    #[serde(rename = "groundingSources")]
    pub sources: Vec<GroundingSource>,
}

impl SearchResult {
    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }

    pub fn ensure_specialties(&mut self, specialties: &[String]) {
        for center in &mut self.centers {
            center.ensure_specialties(specialties);
        }
    }
}

/// 單次搜尋的進度訊息，只能附加
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchProgress {
    messages: Vec<String>,
}

impl SearchProgress {
    pub fn starting_with(message: impl Into<String>) -> Self {
        Self {
            messages: vec![message.into()],
        }
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn current(&self) -> Option<&str> {
        self.messages.last().map(String::as_str)
    }
}

pub fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

/// null 與缺欄位一樣視為預設值
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

fn lenient_rating<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let rating = match value {
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    Ok(if rating.is_finite() && rating > 0.0 {
        rating
    } else {
        0.0
    })
}

fn specialist_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<Specialist>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, Option<Vec<Specialist>>>>::deserialize(deserializer)?;
    let mut normalized: BTreeMap<String, Vec<Specialist>> = BTreeMap::new();
    for (key, specialists) in raw.unwrap_or_default() {
        normalized
            .entry(normalize_label(&key))
            .or_default()
            .extend(specialists.unwrap_or_default());
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_count_parsing() {
        assert_eq!("5".parse::<CenterCount>().unwrap(), CenterCount::Fixed(5));
        assert_eq!("ALL".parse::<CenterCount>().unwrap(), CenterCount::All);
        assert!("0".parse::<CenterCount>().is_err());
        assert!("many".parse::<CenterCount>().is_err());
    }

    #[test]
    fn test_blank_city_is_unset() {
        assert_eq!(LocationMode::city("   "), LocationMode::Unset);
        assert_eq!(
            LocationMode::city(" Springfield "),
            LocationMode::City("Springfield".to_string())
        );
    }

    #[test]
    fn test_request_deduplicates_specialties() {
        let request = SearchRequest::new(
            LocationMode::city("Pune"),
            CenterCount::All,
            vec!["Urologists".into(), " Urologists ".into(), "".into()],
        );
        assert_eq!(request.specialties, vec!["Urologists".to_string()]);
        assert!(request.is_submittable());
    }

    #[test]
    fn test_request_deduplicates_case_variants() {
        let request = SearchRequest::new(
            LocationMode::city("Pune"),
            CenterCount::All,
            vec!["Cardiologists".into(), "cardiologists".into(), " CARDIOLOGISTS".into()],
        );
        assert_eq!(request.specialties, vec!["Cardiologists".to_string()]);
    }

    #[test]
    fn test_null_fields_fall_back_to_defaults() {
        let center: DiagnosticCenter = serde_json::from_str(
            r#"{"name":"A","address":null,"contactDetails":null,"hasCTMachine":null,
                "nearbySpecialists":{"cardiologists":[{"name":null,"address":null,"phone":null}]}}"#,
        )
        .unwrap();
        assert_eq!(center.address, "");
        assert_eq!(center.contact_details, ContactDetails::default());
        assert!(!center.has_ct_machine);
        let specialist = &center.specialists_for("Cardiologists")[0];
        assert_eq!(specialist.name, "");
        assert_eq!(specialist.address, "");
        assert_eq!(specialist.phone, None);
    }

    #[test]
    fn test_center_normalizes_wire_fields() {
        let center: DiagnosticCenter = serde_json::from_value(serde_json::json!({
            "name": "Apex Imaging",
            "contactDetails": { "phone": "", "website": "https://apex.example" },
            "googleRating": "4.6",
            "userReviewSummary": " ",
            "hasCTMachine": true,
            "nearbySpecialists": {
                "Cardiologists": [{ "name": "Dr. Rao", "address": "MG Road", "phone": "" }],
                "urologists": null
            }
        }))
        .unwrap();

        assert_eq!(center.google_rating, 4.6);
        assert_eq!(center.contact_details.phone, None);
        assert_eq!(center.user_review_summary, None);
        assert_eq!(center.specialists_for("Cardiologists").len(), 1);
        assert!(center.specialists_for("Urologists").is_empty());
        assert!(center.nearby_specialists.contains_key("urologists"));
    }

    #[test]
    fn test_negative_rating_clamps_to_zero() {
        let center: DiagnosticCenter =
            serde_json::from_str(r#"{"name":"X","googleRating":-3}"#).unwrap();
        assert_eq!(center.google_rating, 0.0);
    }

    #[test]
    fn test_ensure_specialties_adds_empty_entries() {
        let mut center: DiagnosticCenter = serde_json::from_str(r#"{"name":"X"}"#).unwrap();
        center.ensure_specialties(&["Oncologists".to_string()]);
        assert_eq!(center.nearby_specialists.get("oncologists"), Some(&Vec::new()));
    }

    #[test]
    fn test_source_display_title_falls_back_to_kind() {
        let source = GroundingSource {
            uri: "https://maps.google.com/?cid=1".into(),
            title: None,
            kind: SourceKind::Maps,
        };
        assert_eq!(source.display_title(), "Google Maps");
    }
}
