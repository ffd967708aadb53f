use serde::{Deserialize, Serialize};

use super::enums::MetricStatus;

/// Width of the critical band on each side of the normal range, as a
/// fraction of the range width.
pub const CRITICAL_BAND_FRACTION: f64 = 0.2;

/// Clinically normal inclusive interval for a test, plus its unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRange {
    pub min: f64,
    pub max: f64,
    pub unit: String,
}

impl ReferenceRange {
    pub fn new(min: f64, max: f64, unit: impl Into<String>) -> Self {
        debug_assert!(min <= max, "reference range min must not exceed max");
        Self {
            min,
            max,
            unit: unit.into(),
        }
    }

    /// Lower critical threshold: `min - 0.2 * (max - min)`.
    pub fn critical_low(&self) -> f64 {
        self.min - (self.max - self.min) * CRITICAL_BAND_FRACTION
    }

    /// Upper critical threshold: `max + 0.2 * (max - min)`.
    pub fn critical_high(&self) -> f64 {
        self.max + (self.max - self.min) * CRITICAL_BAND_FRACTION
    }
}

/// Classify a value against its normal range.
///
/// Any missing input yields `Unknown`. The critical band extends 20% of the
/// range width beyond each bound; a value strictly outside the band is
/// `Critical`, strictly outside the range is `Low`/`High`, otherwise `Normal`.
/// When `min == max` the band collapses onto the bound, so every value
/// outside the range is `Critical`.
pub fn classify(
    value: Option<f64>,
    min_normal: Option<f64>,
    max_normal: Option<f64>,
) -> MetricStatus {
    let (Some(value), Some(min), Some(max)) = (value, min_normal, max_normal) else {
        return MetricStatus::Unknown;
    };

    let range = max - min;
    let critical_low = min - (range * CRITICAL_BAND_FRACTION);
    let critical_high = max + (range * CRITICAL_BAND_FRACTION);

    if value < critical_low || value > critical_high {
        MetricStatus::Critical
    } else if value < min {
        MetricStatus::Low
    } else if value > max {
        MetricStatus::High
    } else {
        MetricStatus::Normal
    }
}

/// One observed lab value with its classification.
///
/// `status` is derived from `(value, min_normal, max_normal)` and is
/// recomputed by every method that changes one of those fields. There is
/// no way to set it directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawBloodMetric")]
pub struct BloodMetric {
    name: String,
    value: Option<f64>,
    unit: String,
    min_normal: Option<f64>,
    max_normal: Option<f64>,
    status: MetricStatus,
}

impl BloodMetric {
    pub fn new(
        name: impl Into<String>,
        value: Option<f64>,
        unit: impl Into<String>,
        min_normal: Option<f64>,
        max_normal: Option<f64>,
    ) -> Self {
        Self {
            name: name.into(),
            value,
            unit: unit.into(),
            min_normal,
            max_normal,
            status: classify(value, min_normal, max_normal),
        }
    }

    /// Build a measurement whose bounds come from a reference range.
    pub fn with_reference(
        name: impl Into<String>,
        value: f64,
        unit: impl Into<String>,
        range: &ReferenceRange,
    ) -> Self {
        Self::new(name, Some(value), unit, Some(range.min), Some(range.max))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn min_normal(&self) -> Option<f64> {
        self.min_normal
    }

    pub fn max_normal(&self) -> Option<f64> {
        self.max_normal
    }

    pub fn status(&self) -> MetricStatus {
        self.status
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_unit(&mut self, unit: impl Into<String>) {
        self.unit = unit.into();
    }

    pub fn set_value(&mut self, value: Option<f64>) {
        self.value = value;
        self.reclassify();
    }

    pub fn set_normal_range(&mut self, min_normal: Option<f64>, max_normal: Option<f64>) {
        self.min_normal = min_normal;
        self.max_normal = max_normal;
        self.reclassify();
    }

    fn reclassify(&mut self) {
        self.status = classify(self.value, self.min_normal, self.max_normal);
    }
}

/// Wire shape accepted on deserialization. Any incoming `status` is
/// ignored and recomputed.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBloodMetric {
    name: String,
    value: Option<f64>,
    #[serde(default)]
    unit: String,
    min_normal: Option<f64>,
    max_normal: Option<f64>,
}

impl From<RawBloodMetric> for BloodMetric {
    fn from(raw: RawBloodMetric) -> Self {
        Self::new(raw.name, raw.value, raw.unit, raw.min_normal, raw.max_normal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(value: f64, min: f64, max: f64) -> MetricStatus {
        classify(Some(value), Some(min), Some(max))
    }

    #[test]
    fn missing_inputs_are_unknown() {
        assert_eq!(classify(None, Some(70.0), Some(100.0)), MetricStatus::Unknown);
        assert_eq!(classify(Some(85.0), None, Some(100.0)), MetricStatus::Unknown);
        assert_eq!(classify(Some(85.0), Some(70.0), None), MetricStatus::Unknown);
    }

    #[test]
    fn high_side_boundaries() {
        assert_eq!(status(100.0, 70.0, 100.0), MetricStatus::Normal);
        assert_eq!(status(100.01, 70.0, 100.0), MetricStatus::High);
        assert_eq!(status(106.0, 70.0, 100.0), MetricStatus::High);
        assert_eq!(status(106.01, 70.0, 100.0), MetricStatus::Critical);
    }

    #[test]
    fn low_side_boundaries() {
        assert_eq!(status(12.0, 12.0, 16.0), MetricStatus::Normal);
        assert_eq!(status(11.5, 12.0, 16.0), MetricStatus::Low);
        assert_eq!(status(11.2, 12.0, 16.0), MetricStatus::Low);
        assert_eq!(status(11.19, 12.0, 16.0), MetricStatus::Critical);
    }

    #[test]
    fn zero_width_range_follows_the_arithmetic() {
        assert_eq!(status(5.0, 5.0, 5.0), MetricStatus::Normal);
        assert_eq!(status(5.1, 5.0, 5.0), MetricStatus::Critical);
        assert_eq!(status(4.9, 5.0, 5.0), MetricStatus::Critical);
    }

    #[test]
    fn classification_is_deterministic() {
        for value in [0.0, 69.9, 70.0, 85.0, 100.0, 103.0, 250.0] {
            assert_eq!(status(value, 70.0, 100.0), status(value, 70.0, 100.0));
        }
    }

    #[test]
    fn reference_range_critical_thresholds() {
        let range = ReferenceRange::new(70.0, 100.0, "mg/dL");
        assert_eq!(range.critical_high(), 106.0);
        assert_eq!(range.critical_low(), 64.0);
    }

    #[test]
    fn constructor_computes_status() {
        let range = ReferenceRange::new(70.0, 100.0, "mg/dL");
        let metric = BloodMetric::with_reference("Glucose", 200.0, "mg/dL", &range);
        assert_eq!(metric.status(), MetricStatus::Critical);
        assert_eq!(metric.min_normal(), Some(70.0));
        assert_eq!(metric.max_normal(), Some(100.0));
    }

    #[test]
    fn set_value_reclassifies() {
        let mut metric = BloodMetric::new("Glucose", Some(85.0), "mg/dL", Some(70.0), Some(100.0));
        assert_eq!(metric.status(), MetricStatus::Normal);

        metric.set_value(Some(104.0));
        assert_eq!(metric.status(), MetricStatus::High);

        metric.set_value(None);
        assert_eq!(metric.status(), MetricStatus::Unknown);
    }

    #[test]
    fn set_normal_range_reclassifies() {
        let mut metric = BloodMetric::new("Glucose", Some(85.0), "mg/dL", None, None);
        assert_eq!(metric.status(), MetricStatus::Unknown);

        metric.set_normal_range(Some(90.0), Some(120.0));
        assert_eq!(metric.status(), MetricStatus::Low);
    }

    #[test]
    fn name_and_unit_changes_keep_status() {
        let mut metric = BloodMetric::new("WBC", Some(20.0), "K/μL", Some(4.0), Some(11.0));
        metric.set_name("White blood cells");
        metric.set_unit("10^3/μL");
        assert_eq!(metric.status(), MetricStatus::Critical);
    }

    #[test]
    fn serializes_camel_case_with_status() {
        let metric = BloodMetric::new("Hemoglobin", Some(14.5), "g/dL", Some(12.0), Some(16.0));
        let json = serde_json::to_value(&metric).unwrap();
        assert_eq!(json["name"], "Hemoglobin");
        assert_eq!(json["minNormal"], 12.0);
        assert_eq!(json["maxNormal"], 16.0);
        assert_eq!(json["status"], "normal");
    }

    #[test]
    fn deserialization_recomputes_status() {
        let json = r#"{
            "name": "Glucose",
            "value": 200.0,
            "unit": "mg/dL",
            "minNormal": 70.0,
            "maxNormal": 100.0,
            "status": "normal"
        }"#;
        let metric: BloodMetric = serde_json::from_str(json).unwrap();
        assert_eq!(metric.status(), MetricStatus::Critical);
    }
}
