// Warning generation over a set of classified measurements.
// One line per out-of-range measurement, in input order; an explicit
// all-clear line when nothing is out of range.

use serde::Serialize;

use crate::models::{BloodMetric, MetricStatus};

/// Returned alone when no measurement is out of range.
pub const ALL_CLEAR_MESSAGE: &str = "✅ All measured values are within normal ranges";

/// Warnings plus the summary badges derived from the same measurements.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSummary {
    pub warnings: Vec<String>,
    pub has_abnormal_values: bool,
    pub critical_count: usize,
}

/// Build the human-readable warning list.
///
/// Never empty: with no `critical`/`high`/`low` measurements the result is
/// exactly `[ALL_CLEAR_MESSAGE]`.
pub fn validate_metrics(metrics: &[BloodMetric]) -> Vec<String> {
    let mut warnings: Vec<String> = metrics.iter().filter_map(format_warning).collect();

    if warnings.is_empty() {
        warnings.push(ALL_CLEAR_MESSAGE.to_string());
    }

    warnings
}

/// True iff any measurement is neither `normal` nor `unknown`.
pub fn has_any_out_of_range_value(metrics: &[BloodMetric]) -> bool {
    metrics.iter().any(|m| m.status().is_out_of_range())
}

/// Number of measurements classified `critical`.
pub fn critical_count(metrics: &[BloodMetric]) -> usize {
    metrics
        .iter()
        .filter(|m| m.status() == MetricStatus::Critical)
        .count()
}

pub fn summarize(metrics: &[BloodMetric]) -> ValidationSummary {
    let summary = ValidationSummary {
        warnings: validate_metrics(metrics),
        has_abnormal_values: has_any_out_of_range_value(metrics),
        critical_count: critical_count(metrics),
    };

    if summary.critical_count > 0 {
        tracing::warn!(
            metrics = metrics.len(),
            critical = summary.critical_count,
            "Critical lab values detected"
        );
    }

    summary
}

fn format_warning(metric: &BloodMetric) -> Option<String> {
    let (headline, description) = match metric.status() {
        MetricStatus::Critical => ("⚠️ CRITICAL", "is significantly out of range"),
        MetricStatus::High => ("⬆️ HIGH", "is above normal"),
        MetricStatus::Low => ("⬇️ LOW", "is below normal"),
        MetricStatus::Normal | MetricStatus::Unknown => return None,
    };

    // Out-of-range statuses are only produced when all three are present.
    let (Some(value), Some(min), Some(max)) =
        (metric.value(), metric.min_normal(), metric.max_normal())
    else {
        return None;
    };

    let unit = metric.unit();
    Some(format!(
        "{headline}: {} {description} ({value:.2} {unit}). Normal range: {min:.2}-{max:.2} {unit}",
        metric.name(),
    ))
}
