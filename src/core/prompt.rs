//! 把搜尋條件組成送給模型的指令文字。
//!
//! 輸出只取決於輸入：同一個請求永遠得到逐位元組相同的字串。

use crate::domain::model::{normalize_label, CenterCount, LocationMode, SearchRequest, SEARCH_RADIUS_KM};

pub const REQUIRED_EQUIPMENT: &str = "CT machine";

/// 輸出格式段落的開頭，之後都是 JSON 結構說明
pub const SCHEMA_HEADING: &str = "**CRITICAL: Output Format**";

pub fn count_phrase(count: CenterCount) -> String {
    match count {
        CenterCount::Fixed(n) => format!("the top {}", n),
        CenterCount::All => "all".to_string(),
    }
}

pub fn location_phrase(location: &LocationMode) -> String {
    match location {
        LocationMode::City(city) => format!("in the city of \"{}\"", city),
        LocationMode::NearMe(_) | LocationMode::Unset => format!(
            "within a {}km radius of the user's current location",
            SEARCH_RADIUS_KM
        ),
    }
}

fn center_instruction(request: &SearchRequest) -> String {
    let location = location_phrase(&request.location);
    match request.count {
        CenterCount::Fixed(n) => format!(
            "Search for the top {} diagnostic centers {}. Return exactly {} centers when that many exist.",
            n, location, n
        ),
        CenterCount::All => format!(
            "Search exhaustively for all diagnostic centers {}. Do not cap or truncate the number of results.",
            location
        ),
    }
}

fn specialty_schema_lines(specialties: &[String]) -> String {
    let mut keys: Vec<String> = Vec::with_capacity(specialties.len());
    for label in specialties {
        let key = normalize_label(label);
        if !key.is_empty() && !keys.contains(&key) {
            keys.push(key);
        }
    }

    keys.into_iter()
        .map(|key| {
            // serde_json 負責跳脫引號與反斜線，避免破壞範例 JSON
            let key = serde_json::Value::String(key).to_string();
            format!(
                "        {}: [ {{ \"name\": \"string\", \"address\": \"string\", \"phone\": \"string\" }} ]",
                key
            )
        })
        .collect::<Vec<_>>()
        .join(",\n")
}

pub fn schema_description(specialties: &[String]) -> String {
    format!(
        r#"{{
  "diagnosticCenters": [
    {{
      "name": "string",
      "address": "string",
      "contactDetails": {{
        "phone": "string",
        "website": "string"
      }},
      "googleRating": 4.5,
      "userReviewSummary": "A brief summary of what people say in reviews.",
      "hasCTMachine": true,
      "nearbySpecialists": {{
{}
      }}
    }}
  ]
}}"#,
        specialty_schema_lines(specialties)
    )
}

pub fn build_prompt(request: &SearchRequest) -> String {
    let specialties_list = request.specialties.join(", ");

    let lines = [
        "**Primary Goal:** Find diagnostic centers and nearby medical specialists, then format the output as a single JSON object.".to_string(),
        String::new(),
        "**Instructions:**".to_string(),
        format!(
            "1. **Find Diagnostic Centers:** {}",
            center_instruction(request)
        ),
        format!(
            "2. **Required Amenity:** Each center found MUST have a {}. This requirement is mandatory.",
            REQUIRED_EQUIPMENT
        ),
        format!(
            "3. **Find Nearby Specialists (for each center):** For every diagnostic center you find, run a separate search for specialists within a {}km radius of that center in these categories: {}.",
            SEARCH_RADIUS_KM, specialties_list
        ),
        "4. **Handle Missing Specialists:** If you cannot find any specialists for a specific category at a center, you MUST return an empty array `[]` for that specialty. Never omit a category key.".to_string(),
        String::new(),
        SCHEMA_HEADING.to_string(),
        "- Your entire response MUST be ONLY the JSON object. Do not include any other text, explanations, or markdown fences.".to_string(),
        "- The JSON object must strictly follow this structure:".to_string(),
        schema_description(&request.specialties),
    ];

    lines.join("\n")
}
