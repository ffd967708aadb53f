use serde::Serialize;

use super::NarrativeError;
use crate::pipeline::metrics::StructuredRecord;

/// Free-form analysis of a report's text (allows mocking for tests).
///
/// Implementations block; async callers go through `spawn_blocking`.
pub trait NarrativeProvider: Send + Sync {
    fn analyze(&self, report_text: &str) -> Result<String, NarrativeError>;
}

/// Parsed narrative: bullet lists plus the optional metrics block.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeAnalysis {
    pub risk_factors: Vec<String>,
    pub lifestyle_advice: Vec<String>,
    /// `Some` only when a well-formed metrics block was present, even if empty.
    #[serde(skip)]
    pub records: Option<Vec<StructuredRecord>>,
}
