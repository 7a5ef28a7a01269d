//! Reputation extractor for scam-detector style validator pages

use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

use super::PageTask;
use super::js_scripts::REPUTATION_SCRIPT;
use super::schema::{ExtractionResult, PanelItem, Summary, TechnicalValue};
use crate::browser_pool::SessionPage;

/// Rendered once the reputation widgets are on the page
pub const ACCORDION_SELECTOR: &str = "div.factcesAccordion";

static BLANK_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n\s*\n").unwrap_or_else(|e| unreachable!("blank line pattern is valid: {e}"))
});

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPanel {
    header: String,
    items: Option<Vec<PanelItem>>,
}

/// Shape returned by [`REPUTATION_SCRIPT`]
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawReputation {
    panels: Vec<RawPanel>,
    total_percent: Option<String>,
    domain_age: Option<String>,
    domain_date: Option<String>,
    all_data: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ScamDetectorExtractor {
    base_url: String,
    selector_timeout: Duration,
}

impl ScamDetectorExtractor {
    #[must_use]
    pub fn new(base_url: impl Into<String>, selector_timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            selector_timeout,
        }
    }
}

#[async_trait]
impl<P: SessionPage> PageTask<P> for ScamDetectorExtractor {
    type Output = ExtractionResult;

    fn name(&self) -> &'static str {
        "scam-detector"
    }

    fn target_url(&self, domain: &str) -> String {
        format!("{}/{}-review", self.base_url, domain)
    }

    async fn run(&self, page: &P, domain: &str) -> Result<ExtractionResult> {
        let rendered = page
            .wait_for_selector(ACCORDION_SELECTOR, self.selector_timeout)
            .await?;
        if !rendered {
            warn!(
                domain,
                "{} did not appear within {:?}, extracting anyway",
                ACCORDION_SELECTOR,
                self.selector_timeout
            );
        }

        let raw = page.evaluate(REPUTATION_SCRIPT).await?;
        let raw: RawReputation =
            serde_json::from_value(raw).context("Unexpected reputation page structure")?;
        debug!(domain, panels = raw.panels.len(), "Reputation page scraped");

        Ok(fold_reputation(raw))
    }
}

fn fold_reputation(raw: RawReputation) -> ExtractionResult {
    let mut technical_analysis = BTreeMap::new();
    for panel in raw.panels {
        // Later panels with the same header win
        technical_analysis.insert(panel.header, panel.items.map(fold_panel_items));
    }

    let (black_list, https_connection, site_description) = raw
        .all_data
        .as_deref()
        .map(split_details)
        .unwrap_or_default();

    ExtractionResult {
        technical_analysis,
        summary: Summary {
            total_percent: non_empty(raw.total_percent),
            domain_age: non_empty(raw.domain_age),
            domain_date: non_empty(raw.domain_date),
            black_list,
            https_connection,
            site_description,
        },
    }
}

/// A panel made only of labelled fields becomes one mapping; anything else stays a list
pub fn fold_panel_items(items: Vec<PanelItem>) -> TechnicalValue {
    if items.iter().all(|item| matches!(item, PanelItem::Field(_))) {
        let merged = items
            .into_iter()
            .flat_map(|item| match item {
                PanelItem::Field(fields) => fields,
                PanelItem::Text(_) => BTreeMap::new(),
            })
            .collect();
        TechnicalValue::Fields(merged)
    } else {
        TechnicalValue::Items(items)
    }
}

/// Pull blacklist status, HTTPS status and description out of the details block
///
/// The block is split on blank lines; the first and last chunks are page
/// chrome. Of the rest, chunk 3 is the blacklist verdict, chunk 5 the HTTPS
/// verdict, and chunks 7 onward the free-text description.
pub fn split_details(all_data: &str) -> (Option<String>, Option<String>, Option<String>) {
    let chunks: Vec<&str> = BLANK_LINE
        .split(all_data)
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .collect();

    let inner: &[&str] = if chunks.len() > 2 {
        &chunks[1..chunks.len() - 1]
    } else {
        &[]
    };

    let black_list = inner.get(3).map(|s| (*s).to_string());
    let https_connection = inner.get(5).map(|s| (*s).to_string());
    let site_description = inner
        .get(7..)
        .map(|rest| rest.join(" "))
        .filter(|s| !s.is_empty());

    (black_list, https_connection, site_description)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(label: &str, value: &str) -> PanelItem {
        PanelItem::Field(BTreeMap::from([(label.to_string(), value.to_string())]))
    }

    #[test]
    fn all_field_panel_merges_into_mapping() {
        let folded = fold_panel_items(vec![field("Registrar", "X"), field("Created", "2001")]);
        let TechnicalValue::Fields(map) = folded else {
            panic!("expected merged fields");
        };
        assert_eq!(map.get("Registrar").map(String::as_str), Some("X"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn mixed_panel_stays_ordered_list() {
        let items = vec![PanelItem::Text("plain".into()), field("Key", "v")];
        assert_eq!(fold_panel_items(items.clone()), TechnicalValue::Items(items));
    }

    #[test]
    fn details_block_is_split_on_blank_lines() {
        let text = "Header\n\nb0\n\nb1\n\nb2\n\nNot blacklisted\n\nb4\n\nHTTPS found\n\nb6\n\nFirst part.\n  \nSecond part.\n\nFooter";
        let (black, https, description) = split_details(text);
        assert_eq!(black.as_deref(), Some("Not blacklisted"));
        assert_eq!(https.as_deref(), Some("HTTPS found"));
        assert_eq!(description.as_deref(), Some("First part. Second part."));
    }

    #[test]
    fn short_details_block_yields_nothing() {
        assert_eq!(split_details("only\n\ntwo"), (None, None, None));
        assert_eq!(split_details(""), (None, None, None));
    }

    #[test]
    fn raw_payload_folds_into_result() {
        let raw: RawReputation = serde_json::from_value(serde_json::json!({
            "panels": [
                { "header": "Empty", "items": null },
                { "header": "Whois", "items": [{ "Age": "20 years" }] }
            ],
            "totalPercent": "87%",
            "domainAge": "",
            "domainDate": null,
            "allData": null
        }))
        .expect("payload deserializes");

        let result = fold_reputation(raw);
        assert_eq!(result.technical_analysis.get("Empty"), Some(&None));
        assert!(matches!(
            result.technical_analysis.get("Whois"),
            Some(Some(TechnicalValue::Fields(_)))
        ));
        assert_eq!(result.summary.total_percent.as_deref(), Some("87%"));
        assert_eq!(result.summary.domain_age, None);
    }
}
