//! Reference ranges for the lab tests BloodLens recognizes.
//!
//! The standard catalog is built once on first use and is read-only after
//! that. Callers hold a `&ReferenceRegistry` (or an `Arc`) and pass it to the
//! metric extractor; tests can build a registry from their own entries.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::models::ReferenceRange;

/// (canonical name, min, max, unit)
const STANDARD_CATALOG: &[(&str, f64, f64, &str)] = &[
    // Complete blood count
    ("hemoglobin", 12.0, 16.0, "g/dL"),
    ("hematocrit", 36.0, 48.0, "%"),
    ("rbc", 4.0, 5.5, "M/μL"),
    ("wbc", 4.0, 11.0, "K/μL"),
    ("platelets", 150.0, 400.0, "K/μL"),
    // Metabolic panel
    ("glucose", 70.0, 100.0, "mg/dL"),
    ("sodium", 136.0, 145.0, "mEq/L"),
    ("potassium", 3.5, 5.0, "mEq/L"),
    ("calcium", 8.5, 10.5, "mg/dL"),
    ("creatinine", 0.6, 1.2, "mg/dL"),
    ("bun", 7.0, 20.0, "mg/dL"),
    // Lipid panel
    ("cholesterol", 0.0, 200.0, "mg/dL"),
    ("ldl", 0.0, 100.0, "mg/dL"),
    ("hdl", 40.0, 60.0, "mg/dL"),
    ("triglycerides", 0.0, 150.0, "mg/dL"),
    // Liver function
    ("alt", 7.0, 56.0, "U/L"),
    ("ast", 10.0, 40.0, "U/L"),
    ("bilirubin", 0.1, 1.2, "mg/dL"),
    // Thyroid
    ("tsh", 0.4, 4.0, "mIU/L"),
    ("t3", 80.0, 200.0, "ng/dL"),
    ("t4", 5.0, 12.0, "μg/dL"),
    // Diabetes
    ("hba1c", 4.0, 5.6, "%"),
    // Vitamins
    ("vitamin_d", 30.0, 100.0, "ng/mL"),
    ("vitamin_b12", 200.0, 900.0, "pg/mL"),
];

static STANDARD: LazyLock<ReferenceRegistry> = LazyLock::new(|| {
    ReferenceRegistry::from_entries(
        STANDARD_CATALOG
            .iter()
            .map(|&(name, min, max, unit)| (name, ReferenceRange::new(min, max, unit))),
    )
});

/// Normalize a test name for registry lookup.
///
/// Lower-cases, turns whitespace and hyphens into underscores, then drops
/// anything outside `[a-z0-9_]`. `"Vitamin D"` becomes `vitamin_d`,
/// `"HbA1c:"` becomes `hba1c`.
pub fn normalize_test_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() || c == '-' { '_' } else { c })
        .filter(|c| matches!(c, 'a'..='z' | '0'..='9' | '_'))
        .collect()
}

/// Immutable map from normalized test name to its reference range.
#[derive(Debug, Clone, Default)]
pub struct ReferenceRegistry {
    ranges: HashMap<String, ReferenceRange>,
}

impl ReferenceRegistry {
    /// The built-in catalog (CBC, metabolic, lipid, liver, thyroid,
    /// diabetes, vitamins).
    pub fn standard() -> &'static ReferenceRegistry {
        &STANDARD
    }

    /// Build a registry from `(name, range)` pairs. Names are normalized;
    /// a later duplicate replaces an earlier one.
    pub fn from_entries<N, I>(entries: I) -> Self
    where
        N: AsRef<str>,
        I: IntoIterator<Item = (N, ReferenceRange)>,
    {
        let ranges = entries
            .into_iter()
            .map(|(name, range)| (normalize_test_name(name.as_ref()), range))
            .collect();
        Self { ranges }
    }

    pub fn lookup(&self, test_name: &str) -> Option<&ReferenceRange> {
        self.ranges.get(&normalize_test_name(test_name))
    }

    pub fn contains(&self, test_name: &str) -> bool {
        self.ranges.contains_key(&normalize_test_name(test_name))
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Canonical names, sorted.
    pub fn test_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.ranges.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
