pub mod verbs;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use verbs::is_request_verb;

pub const CATEGORY_COUNT: usize = 36;

/// Canonical category order of the disaster response dataset.
pub const DISASTER_CATEGORIES: [&str; CATEGORY_COUNT] = [
    "related",
    "request",
    "offer",
    "aid_related",
    "medical_help",
    "medical_products",
    "search_and_rescue",
    "security",
    "military",
    "child_alone",
    "water",
    "food",
    "shelter",
    "clothing",
    "money",
    "missing_people",
    "refugees",
    "death",
    "other_aid",
    "infrastructure_related",
    "transport",
    "buildings",
    "electricity",
    "tools",
    "hospitals",
    "shops",
    "aid_centers",
    "other_infrastructure",
    "weather_related",
    "floods",
    "storm",
    "fire",
    "earthquake",
    "cold",
    "other_weather",
    "direct_report",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryGroup {
    General,
    Aid,
    Infrastructure,
    Weather,
    Other,
}

impl fmt::Display for CategoryGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CategoryGroup::General => "general",
            CategoryGroup::Aid => "aid",
            CategoryGroup::Infrastructure => "infrastructure",
            CategoryGroup::Weather => "weather",
            CategoryGroup::Other => "other",
        };
        write!(f, "{}", name)
    }
}

/// Groups a category name for display. Names outside the known dataset
/// fall into `Other`.
pub fn category_group(name: &str) -> CategoryGroup {
    match name.to_lowercase().as_str() {
        "related" | "request" | "offer" | "direct_report" => CategoryGroup::General,
        "aid_related" | "medical_help" | "medical_products" | "search_and_rescue" | "security"
        | "military" | "child_alone" | "water" | "food" | "shelter" | "clothing" | "money"
        | "missing_people" | "refugees" | "death" | "other_aid" => CategoryGroup::Aid,
        "infrastructure_related" | "transport" | "buildings" | "electricity" | "tools"
        | "hospitals" | "shops" | "aid_centers" | "other_infrastructure" => {
            CategoryGroup::Infrastructure
        }
        "weather_related" | "floods" | "storm" | "fire" | "earthquake" | "cold"
        | "other_weather" => CategoryGroup::Weather,
        _ => CategoryGroup::Other,
    }
}

/// Packs the canonical categories into the `name-value;...` encoding used by
/// the categories source file. Names missing from `positives` get 0.
pub fn pack_categories(positives: &[&str]) -> String {
    DISASTER_CATEGORIES
        .iter()
        .map(|name| {
            let value = if positives.contains(name) { 1 } else { 0 };
            format!("{}-{}", name, value)
        })
        .collect::<Vec<_>>()
        .join(";")
}
