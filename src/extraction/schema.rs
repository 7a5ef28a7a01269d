use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One paragraph of a technical-analysis panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PanelItem {
    Text(String),
    /// `{label: value}` from a paragraph led by a `<strong>` label
    Field(BTreeMap<String, String>),
}

/// Body of a technical-analysis panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TechnicalValue {
    /// Every paragraph was a labelled field; merged into one mapping
    Fields(BTreeMap<String, String>),
    /// Mixed or plain paragraphs, in page order
    Items(Vec<PanelItem>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_percent: Option<String>,
    pub domain_age: Option<String>,
    pub domain_date: Option<String>,
    pub black_list: Option<String>,
    pub https_connection: Option<String>,
    pub site_description: Option<String>,
}

/// Structured reputation record for one domain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    /// Panel header to body; `None` for a panel with an empty body
    pub technical_analysis: BTreeMap<String, Option<TechnicalValue>>,
    pub summary: Summary,
}

/// Outcome of submitting a URL to the anti-phishing lookup form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhishCheckResult {
    pub domain: String,
    pub checked_url: String,
    pub current_url: Option<String>,
    pub status: String,
    pub message: String,
    pub challenge_detected: bool,
    pub timestamp: DateTime<Utc>,
}
