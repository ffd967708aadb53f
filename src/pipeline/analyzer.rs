//! End-to-end analysis of one blood report.
//!
//! ```text
//! upload bytes ──► TextExtractor ──► report text
//!                                        │
//!                                        ├──► NarrativeProvider ──► parse_narrative
//!                                        │                            │
//!                                        │        metrics block? ─────┤
//!                                        │          yes: records      │
//!                                        └──► no: free-text scan ─────┤
//!                                                                     ▼
//!                                              classify ──► validate ──► AnalysisReport
//! ```
//!
//! Everything here is synchronous. The HTTP layer runs `analyze_*` on a
//! blocking worker while it holds the client's upload slot.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::models::{BloodMetric, MetricSource};
use crate::pipeline::extraction::{ExtractionError, TextExtractor};
use crate::pipeline::metrics::{summarize, MetricExtractor};
use crate::pipeline::narrative::{parse_narrative, NarrativeError, NarrativeProvider};
use crate::reference::ReferenceRegistry;

pub const ANALYSIS_COMPLETE_MESSAGE: &str =
    "Analysis complete! Here's what your blood report tells us.";

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Could not extract text from the file. Please ensure it's a valid PDF or image.")]
    NoExtractableText,

    #[error("Text extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Narrative analysis failed: {0}")]
    Narrative(#[from] NarrativeError),
}

/// An uploaded report file.
#[derive(Debug, Clone)]
pub struct ReportUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Everything the client sees after an analysis.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub file_name: String,
    pub file_size: u64,
    pub risk_factors: Vec<String>,
    pub lifestyle_advice: Vec<String>,
    pub message: String,
    pub metrics: Vec<BloodMetric>,
    pub validation_warnings: Vec<String>,
    pub has_abnormal_values: bool,
    pub critical_count: usize,
    pub metric_source: MetricSource,
    pub analyzed_at: DateTime<Utc>,
}

/// Runs the analysis pipeline against injected collaborators.
#[derive(Clone)]
pub struct ReportAnalyzer {
    registry: Arc<ReferenceRegistry>,
    extractor: Arc<dyn TextExtractor>,
    provider: Arc<dyn NarrativeProvider>,
}

impl ReportAnalyzer {
    pub fn new(
        registry: Arc<ReferenceRegistry>,
        extractor: Arc<dyn TextExtractor>,
        provider: Arc<dyn NarrativeProvider>,
    ) -> Self {
        Self {
            registry,
            extractor,
            provider,
        }
    }

    pub fn registry(&self) -> &ReferenceRegistry {
        &self.registry
    }

    /// Extract text from an uploaded file, then analyze it.
    pub fn analyze_upload(&self, upload: &ReportUpload) -> Result<AnalysisReport, AnalysisError> {
        let extracted = self
            .extractor
            .extract(&upload.bytes, upload.content_type.as_deref())?;

        self.analyze_text(&upload.file_name, upload.bytes.len() as u64, &extracted.text)
    }

    /// Analyze report text that is already extracted.
    pub fn analyze_text(
        &self,
        file_name: &str,
        file_size: u64,
        report_text: &str,
    ) -> Result<AnalysisReport, AnalysisError> {
        if report_text.trim().is_empty() {
            return Err(AnalysisError::NoExtractableText);
        }

        let response = self.provider.analyze(report_text)?;
        let narrative = parse_narrative(&response);

        let extractor = MetricExtractor::new(&self.registry);
        let (metrics, metric_source) = match &narrative.records {
            Some(records) => (extractor.extract_from_records(records), MetricSource::Structured),
            None => (extractor.extract_from_text(report_text), MetricSource::Text),
        };

        let summary = summarize(&metrics);

        tracing::info!(
            source = metric_source.as_str(),
            metrics = metrics.len(),
            abnormal = summary.has_abnormal_values,
            critical = summary.critical_count,
            "Report analysis complete"
        );

        Ok(AnalysisReport {
            file_name: file_name.to_string(),
            file_size,
            risk_factors: narrative.risk_factors,
            lifestyle_advice: narrative.lifestyle_advice,
            message: ANALYSIS_COMPLETE_MESSAGE.to_string(),
            metrics,
            validation_warnings: summary.warnings,
            has_abnormal_values: summary.has_abnormal_values,
            critical_count: summary.critical_count,
            metric_source,
            analyzed_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricStatus;
    use crate::pipeline::extraction::{DocumentTextExtractor, IMAGE_NOTICE};
    use crate::pipeline::metrics::ALL_CLEAR_MESSAGE;
    use crate::pipeline::narrative::{MockNarrativeProvider, DEFAULT_RISK_FACTOR};

    const PLAIN_REPLY: &str = "RISK FACTORS:\n- Sugar is high\nLIFESTYLE ADVICE:\n- Walk daily";

    fn analyzer_with(provider: Arc<MockNarrativeProvider>) -> ReportAnalyzer {
        ReportAnalyzer::new(
            Arc::new(ReferenceRegistry::standard().clone()),
            Arc::new(DocumentTextExtractor),
            provider,
        )
    }

    #[test]
    fn free_text_metrics_when_no_block() {
        let provider = Arc::new(MockNarrativeProvider::new(PLAIN_REPLY));
        let report = analyzer_with(provider.clone())
            .analyze_text("labs.txt", 42, "Glucose: 130 mg/dL\nHemoglobin: 14 g/dL")
            .unwrap();

        assert_eq!(report.metric_source, MetricSource::Text);
        assert_eq!(report.metrics.len(), 2);
        assert_eq!(report.metrics[0].status(), MetricStatus::Critical);
        assert_eq!(report.metrics[1].status(), MetricStatus::Normal);
        assert!(report.has_abnormal_values);
        assert_eq!(report.critical_count, 1);
        assert_eq!(report.validation_warnings.len(), 1);
        assert!(report.validation_warnings[0].starts_with("⚠️ CRITICAL: Glucose"));
        assert_eq!(report.risk_factors, vec!["Sugar is high"]);
        assert_eq!(report.lifestyle_advice, vec!["Walk daily"]);
        assert_eq!(report.message, ANALYSIS_COMPLETE_MESSAGE);
        assert_eq!(report.file_name, "labs.txt");
        assert_eq!(report.file_size, 42);
        assert_eq!(provider.calls().len(), 1);
    }

    #[test]
    fn structured_block_takes_precedence_over_text() {
        let reply = "RISK FACTORS:\n- Thyroid fine\n\
                     METRICS_JSON_START\n[{\"test\": \"TSH\", \"value\": \"2.0\"}]\nMETRICS_JSON_END";
        let provider = Arc::new(MockNarrativeProvider::new(reply));
        let report = analyzer_with(provider)
            .analyze_text("labs.txt", 10, "Glucose: 130 mg/dL")
            .unwrap();

        assert_eq!(report.metric_source, MetricSource::Structured);
        assert_eq!(report.metrics.len(), 1);
        assert_eq!(report.metrics[0].name(), "TSH");
        assert_eq!(report.metrics[0].unit(), "mIU/L");
        assert!(!report.has_abnormal_values);
        assert_eq!(report.validation_warnings, vec![ALL_CLEAR_MESSAGE]);
    }

    #[test]
    fn empty_block_means_structured_with_no_metrics() {
        let reply = "METRICS_JSON_START\n[]\nMETRICS_JSON_END";
        let provider = Arc::new(MockNarrativeProvider::new(reply));
        let report = analyzer_with(provider)
            .analyze_text("labs.txt", 10, "Glucose: 130 mg/dL")
            .unwrap();

        assert_eq!(report.metric_source, MetricSource::Structured);
        assert!(report.metrics.is_empty());
        assert_eq!(report.risk_factors, vec![DEFAULT_RISK_FACTOR]);
    }

    #[test]
    fn malformed_block_falls_back_to_text() {
        let reply = "METRICS_JSON_START\nnot json\nMETRICS_JSON_END";
        let provider = Arc::new(MockNarrativeProvider::new(reply));
        let report = analyzer_with(provider)
            .analyze_text("labs.txt", 10, "Glucose: 95 mg/dL")
            .unwrap();

        assert_eq!(report.metric_source, MetricSource::Text);
        assert_eq!(report.metrics.len(), 1);
    }

    #[test]
    fn blank_text_is_rejected_before_provider_call() {
        let provider = Arc::new(MockNarrativeProvider::new(PLAIN_REPLY));
        let result = analyzer_with(provider.clone()).analyze_text("labs.txt", 3, "  \n ");

        assert!(matches!(result, Err(AnalysisError::NoExtractableText)));
        assert!(provider.calls().is_empty());
    }

    #[test]
    fn provider_failure_is_reported() {
        let provider = Arc::new(MockNarrativeProvider::failing(500, "boom"));
        let result = analyzer_with(provider).analyze_text("labs.txt", 10, "Glucose: 95");
        assert!(matches!(
            result,
            Err(AnalysisError::Narrative(NarrativeError::Http { status: 500, .. }))
        ));
    }

    #[test]
    fn upload_of_plain_text_is_analyzed() {
        let provider = Arc::new(MockNarrativeProvider::new(PLAIN_REPLY));
        let upload = ReportUpload {
            file_name: "labs.txt".into(),
            content_type: Some("text/plain".into()),
            bytes: b"  Potassium: 6.5 mEq/L  \n".to_vec(),
        };
        let report = analyzer_with(provider.clone()).analyze_upload(&upload).unwrap();

        assert_eq!(report.file_size, upload.bytes.len() as u64);
        assert_eq!(report.metrics.len(), 1);
        assert_eq!(report.metrics[0].status(), MetricStatus::Critical);
        assert_eq!(provider.calls(), vec!["Potassium: 6.5 mEq/L"]);
    }

    #[test]
    fn upload_of_image_sends_notice() {
        let provider = Arc::new(MockNarrativeProvider::new(PLAIN_REPLY));
        let upload = ReportUpload {
            file_name: "scan.jpg".into(),
            content_type: Some("image/jpeg".into()),
            bytes: vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10],
        };
        let report = analyzer_with(provider.clone()).analyze_upload(&upload).unwrap();

        assert_eq!(provider.calls(), vec![IMAGE_NOTICE]);
        assert!(report.metrics.is_empty());
        assert_eq!(report.metric_source, MetricSource::Text);
    }

    #[test]
    fn upload_of_unsupported_binary_fails() {
        let provider = Arc::new(MockNarrativeProvider::new(PLAIN_REPLY));
        let upload = ReportUpload {
            file_name: "archive.zip".into(),
            content_type: Some("application/zip".into()),
            bytes: vec![0x00, 0x01, 0xFF, 0xFE],
        };
        let result = analyzer_with(provider).analyze_upload(&upload);
        assert!(matches!(
            result,
            Err(AnalysisError::Extraction(ExtractionError::UnsupportedFormat))
        ));
    }

    #[test]
    fn report_serializes_camel_case() {
        let provider = Arc::new(MockNarrativeProvider::new(PLAIN_REPLY));
        let report = analyzer_with(provider)
            .analyze_text("labs.txt", 10, "Glucose: 95 mg/dL")
            .unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["fileName"], "labs.txt");
        assert_eq!(json["metricSource"], "text");
        assert_eq!(json["hasAbnormalValues"], false);
        assert_eq!(json["criticalCount"], 0);
        assert_eq!(json["metrics"][0]["status"], "normal");
        assert_eq!(json["metrics"][0]["minNormal"], 70.0);
        assert!(json["analyzedAt"].as_str().is_some());
    }
}
