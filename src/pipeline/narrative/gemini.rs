use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::prompt::build_analysis_prompt;
use super::types::NarrativeProvider;
use super::NarrativeError;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini `generateContent` client.
pub struct GeminiClient {
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl GeminiClient {
    /// Build a blocking client. Must not be called from inside an async
    /// runtime thread; reqwest's blocking client refuses that.
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: &str,
        timeout_secs: u64,
    ) -> Result<Self, NarrativeError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| NarrativeError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            client,
            timeout_secs,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/models/{}:generateContent", self.base_url, self.model)
    }
}

/// Request body for `generateContent`
#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

/// Response body from `generateContent`; only the fields we read.
#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    /// `candidates[0].content.parts[0].text`
    fn into_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
    }
}

impl NarrativeProvider for GeminiClient {
    fn analyze(&self, report_text: &str) -> Result<String, NarrativeError> {
        let prompt = build_analysis_prompt(report_text);
        let body = GenerateContentRequest {
            contents: [Content {
                parts: [Part { text: &prompt }],
            }],
        };

        tracing::debug!(
            model = %self.model,
            prompt_length = prompt.len(),
            "Requesting narrative analysis"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    NarrativeError::Transport(format!(
                        "Request timed out after {}s",
                        self.timeout_secs
                    ))
                } else if e.is_connect() {
                    NarrativeError::Transport(format!("Cannot connect to {}", self.base_url))
                } else {
                    NarrativeError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Narrative provider returned an error");
            return Err(NarrativeError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .map_err(|e| NarrativeError::MalformedResponse(e.to_string()))?;

        parsed.into_text().ok_or_else(|| {
            NarrativeError::MalformedResponse("No text in first candidate".to_string())
        })
    }
}

// ── Mock for testing ──────────────────────────────────────

enum MockReply {
    Text(String),
    HttpError { status: u16, body: String },
}

/// Mock provider returning a fixed reply. Records every report text it sees.
pub struct MockNarrativeProvider {
    reply: MockReply,
    seen: std::sync::Mutex<Vec<String>>,
}

impl MockNarrativeProvider {
    pub fn new(response: &str) -> Self {
        Self {
            reply: MockReply::Text(response.to_string()),
            seen: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// A provider that always fails with the given HTTP status.
    pub fn failing(status: u16, body: &str) -> Self {
        Self {
            reply: MockReply::HttpError {
                status,
                body: body.to_string(),
            },
            seen: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl NarrativeProvider for MockNarrativeProvider {
    fn analyze(&self, report_text: &str) -> Result<String, NarrativeError> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(report_text.to_string());
        }
        match &self.reply {
            MockReply::Text(text) => Ok(text.clone()),
            MockReply::HttpError { status, body } => Err(NarrativeError::Http {
                status: *status,
                body: body.clone(),
            }),
        }
    }
}
