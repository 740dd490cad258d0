//! Data models for conversation analysis.
//!
//! This module contains the core data structures used throughout
//! the application for representing endpoints, requests, results and runs.

use crate::analysis::Sentiment;
use crate::dispatch::DispatchError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What kind of post-processing an endpoint's result gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointKind {
    /// Result text is shown as-is.
    #[default]
    General,
    /// Result text is decoded as a sentiment ratio or breakdown.
    Sentiment,
}

/// Uppercase the first character of `name`.
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// A named analysis endpoint (one Langflow flow run URL).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisEndpoint {
    /// Unique name, e.g. "summary".
    pub name: String,
    /// Full URL the transcript is POSTed to.
    pub url: String,
    /// Post-processing applied to the extracted value.
    #[serde(default)]
    pub kind: EndpointKind,
    /// Fallback text when the response has no result field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

impl AnalysisEndpoint {
    /// Creates a general endpoint with the default placeholder.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            kind: EndpointKind::General,
            placeholder: None,
        }
    }

    /// Marks this endpoint as the sentiment endpoint.
    pub fn sentiment(mut self) -> Self {
        self.kind = EndpointKind::Sentiment;
        self
    }

    /// Display label: the name with its first letter capitalized.
    pub fn label(&self) -> String {
        capitalize(&self.name)
    }

    /// The placeholder substituted when the result field is absent.
    pub fn placeholder(&self) -> String {
        self.placeholder
            .clone()
            .unwrap_or_else(|| format!("{} unavailable", self.label()))
    }
}

/// A single submission of transcript text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Text forwarded verbatim to every endpoint.
    pub input_text: String,
    /// When the submission was made.
    pub submitted_at: DateTime<Utc>,
}

impl AnalysisRequest {
    /// Creates a request, or `None` when the text is blank.
    pub fn new(input_text: impl Into<String>) -> Option<Self> {
        let input_text = input_text.into();
        if input_text.trim().is_empty() {
            return None;
        }

        Some(Self {
            input_text,
            submitted_at: Utc::now(),
        })
    }

    /// Number of characters in the trimmed input.
    pub fn character_count(&self) -> usize {
        crate::analysis::character_count(&self.input_text)
    }
}

/// Value extracted from an endpoint response, tagged at parse time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ResultValue {
    Text(String),
    Number(f64),
    Object(serde_json::Value),
    /// The endpoint's fallback string; the response lacked the result field.
    Placeholder(String),
}

impl ResultValue {
    /// Name of the variant, as shown next to each result.
    pub fn value_type(&self) -> &'static str {
        match self {
            ResultValue::Text(_) => "text",
            ResultValue::Number(_) => "number",
            ResultValue::Object(_) => "object",
            ResultValue::Placeholder(_) => "placeholder",
        }
    }

    /// The value as the text that would be decoded or displayed.
    pub fn as_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ResultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultValue::Text(s) | ResultValue::Placeholder(s) => write!(f, "{}", s),
            ResultValue::Number(n) => write!(f, "{}", n),
            ResultValue::Object(v) => write!(f, "{}", v),
        }
    }
}

/// Result of one successful endpoint call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Endpoint name.
    pub name: String,
    /// Endpoint URL that produced this result.
    pub url: String,
    /// Extracted value.
    pub value: ResultValue,
    /// Wall-clock duration of the call.
    pub elapsed_seconds: f64,
    /// Decoded sentiment, for sentiment endpoints only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
}

impl AnalysisResult {
    pub fn value_type(&self) -> &'static str {
        self.value.value_type()
    }
}

/// The endpoint call that stopped a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointFailure {
    /// 1-based position of the endpoint in call order.
    pub position: usize,
    pub name: String,
    pub url: String,
    pub error: DispatchError,
}

/// Outcome of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every endpoint responded.
    Complete,
    /// Endpoint `failed_at` (1-based) failed; later endpoints were not called.
    Partial { failed_at: usize },
}

/// All results of one submission, in call order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRun {
    pub request: AnalysisRequest,
    pub results: Vec<AnalysisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<EndpointFailure>,
}

impl AnalysisRun {
    /// Starts an empty run for a request.
    pub fn new(request: AnalysisRequest) -> Self {
        Self {
            request,
            results: Vec::new(),
            failure: None,
        }
    }

    pub fn status(&self) -> RunStatus {
        match &self.failure {
            Some(failure) => RunStatus::Partial {
                failed_at: failure.position,
            },
            None => RunStatus::Complete,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }

    /// Looks up a result by endpoint name.
    pub fn result(&self, name: &str) -> Option<&AnalysisResult> {
        self.results.iter().find(|r| r.name == name)
    }

    /// Total time spent in endpoint calls that succeeded.
    pub fn total_elapsed_seconds(&self) -> f64 {
        self.results.iter().map(|r| r.elapsed_seconds).sum()
    }
}

/// Holds the single most recent run.
#[derive(Debug, Default)]
pub struct RunSlot {
    current: Option<AnalysisRun>,
}

impl RunSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// The run currently on display, if any.
    pub fn latest(&self) -> Option<&AnalysisRun> {
        self.current.as_ref()
    }

    /// Replaces the whole run, returning the one it displaced.
    pub fn replace(&mut self, run: AnalysisRun) -> Option<AnalysisRun> {
        self.current.replace(run)
    }
}
