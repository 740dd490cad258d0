//! Sentiment decoding.
//!
//! Sentiment flows answer either with a bare negative ratio (`"0.42"`) or
//! with a JSON object holding a three-way breakdown. Anything else is kept
//! verbatim.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Decoded sentiment value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum Sentiment {
    /// Share of negative sentiment, in [0, 1].
    NegativeRatio { ratio: f64 },
    /// Three-way breakdown; components should sum to about 1.0.
    Breakdown {
        positive: f64,
        neutral: f64,
        negative: f64,
    },
    /// Neither format matched.
    Verbatim { text: String },
}

#[derive(Deserialize)]
struct BreakdownPayload {
    positive: f64,
    neutral: f64,
    negative: f64,
}

/// Decode a sentiment result: ratio first, then breakdown, then verbatim.
pub fn decode_sentiment(raw: &str) -> Sentiment {
    let trimmed = raw.trim();

    if let Ok(ratio) = trimmed.parse::<f64>() {
        if (0.0..=1.0).contains(&ratio) {
            return Sentiment::NegativeRatio { ratio };
        }
        debug!("Sentiment ratio {} out of range", ratio);
    }

    if let Ok(payload) = serde_json::from_str::<BreakdownPayload>(trimmed) {
        let sum = payload.positive + payload.neutral + payload.negative;
        if (sum - 1.0).abs() > 0.05 {
            warn!("Sentiment breakdown sums to {:.3}", sum);
        }
        return Sentiment::Breakdown {
            positive: payload.positive,
            neutral: payload.neutral,
            negative: payload.negative,
        };
    }

    Sentiment::Verbatim {
        text: raw.to_string(),
    }
}

/// Convert a share to a percentage rounded to one decimal.
fn to_percent(share: f64) -> f64 {
    (share * 1000.0).round() / 10.0
}

impl Sentiment {
    /// Labelled percentages for display. Empty for verbatim values.
    pub fn percentages(&self) -> Vec<(&'static str, f64)> {
        match self {
            Sentiment::NegativeRatio { ratio } => vec![("Negative", to_percent(*ratio))],
            Sentiment::Breakdown {
                positive,
                neutral,
                negative,
            } => vec![
                ("Positive", to_percent(*positive)),
                ("Neutral", to_percent(*neutral)),
                ("Negative", to_percent(*negative)),
            ],
            Sentiment::Verbatim { .. } => Vec::new(),
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Sentiment::Verbatim { text } = self {
            return write!(f, "{}", text);
        }

        let parts: Vec<String> = self
            .percentages()
            .into_iter()
            .map(|(label, pct)| format!("{}: {:.1}%", label, pct))
            .collect();
        write!(f, "{}", parts.join(" | "))
    }
}
