use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

use crate::models::BloodMetric;
use crate::reference::ReferenceRegistry;

/// Test name, optional `:`/`=` separator, numeric value, optional unit.
///
/// Matches "Glucose: 95 mg/dL", "Hemoglobin 14.5 g/dL", "WBC 7.2".
/// The name is lazy so it stops at the first place a value can follow.
static METRIC_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z][A-Za-z0-9\s-]+?)\s*[:=]?\s*([0-9]+\.?[0-9]*)\s*([a-zA-Z/%μµ]+)?")
        .expect("metric pattern is a valid regex")
});

/// One pre-identified `{test, value, unit}` record, typically returned by the
/// narrative provider. `value` accepts a JSON string or number.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredRecord {
    #[serde(default)]
    pub test: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub value: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
}

impl StructuredRecord {
    pub fn new(test: &str, value: &str, unit: Option<&str>) -> Self {
        Self {
            test: Some(test.to_string()),
            value: Some(value.to_string()),
            unit: unit.map(str::to_string),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Parse a free-text numeric token. The pattern only admits digits, so the
/// one non-finite outcome is overflow to infinity, which is kept.
fn parse_text_value(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok()
}

/// Parse a structured value. `NaN` and `inf` spellings count as unparseable.
fn parse_record_value(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Turns report text or structured records into classified measurements.
///
/// Only tests known to the registry survive; bad or unknown entries are
/// dropped one at a time and never fail the batch.
pub struct MetricExtractor<'a> {
    registry: &'a ReferenceRegistry,
}

impl<'a> MetricExtractor<'a> {
    pub fn new(registry: &'a ReferenceRegistry) -> Self {
        Self { registry }
    }

    /// Scan free text left to right for `name [:=] value [unit]` triples.
    ///
    /// Blank input yields an empty list. The unit falls back to the
    /// registry's unit when the text has none.
    pub fn extract_from_text(&self, report_text: &str) -> Vec<BloodMetric> {
        let mut metrics = Vec::new();

        if report_text.trim().is_empty() {
            return metrics;
        }

        for caps in METRIC_PATTERN.captures_iter(report_text) {
            let test_name = caps.get(1).map_or("", |m| m.as_str()).trim();
            let raw_value = caps.get(2).map_or("", |m| m.as_str());
            let unit = caps.get(3).map_or("", |m| m.as_str().trim());

            let Some(value) = parse_text_value(raw_value) else {
                tracing::debug!(raw_value, "Skipping candidate with unparseable value");
                continue;
            };

            let Some(range) = self.registry.lookup(test_name) else {
                tracing::debug!(test_name, "Skipping unrecognized test");
                continue;
            };

            let unit = if unit.is_empty() { range.unit.as_str() } else { unit };
            metrics.push(BloodMetric::with_reference(test_name, value, unit, range));
        }

        tracing::debug!(
            text_length = report_text.len(),
            metrics = metrics.len(),
            "Free-text metric extraction complete"
        );

        metrics
    }

    /// Convert structured records, in order. Records missing `test` or
    /// `value`, with an unparseable value, or naming an unknown test are
    /// skipped. A blank `unit` falls back to the registry's unit.
    pub fn extract_from_records(&self, records: &[StructuredRecord]) -> Vec<BloodMetric> {
        let metrics: Vec<BloodMetric> = records
            .iter()
            .filter_map(|record| self.record_to_metric(record))
            .collect();

        tracing::debug!(
            records = records.len(),
            metrics = metrics.len(),
            "Structured metric extraction complete"
        );

        metrics
    }

    fn record_to_metric(&self, record: &StructuredRecord) -> Option<BloodMetric> {
        let test_name = record.test.as_deref()?;
        let raw_value = record.value.as_deref()?;

        let Some(value) = parse_record_value(raw_value) else {
            tracing::debug!(test_name, "Skipping record with unparseable value");
            return None;
        };

        let Some(range) = self.registry.lookup(test_name) else {
            tracing::debug!(test_name, "Skipping record for unrecognized test");
            return None;
        };

        let unit = record
            .unit
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(range.unit.as_str());

        Some(BloodMetric::with_reference(test_name, value, unit, range))
    }
}
