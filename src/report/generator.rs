//! Report generation.
//!
//! This module renders an analysis run as terminal text, Markdown or JSON.

use crate::analysis::Sentiment;
use crate::models::{
    capitalize, AnalysisResult, AnalysisRun, EndpointFailure, ResultValue, RunStatus,
};
use anyhow::{Context, Result};
use std::path::Path;

/// Render a run for the terminal.
pub fn generate_text_report(run: &AnalysisRun) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "📝 Input: {} characters\n\n",
        run.request.character_count()
    ));

    if run.results.is_empty() {
        output.push_str("   No results.\n");
    }

    for result in &run.results {
        output.push_str(&format!(
            "▶ {} ({}, {:.2}s)\n",
            capitalize(&result.name),
            result.value_type(),
            result.elapsed_seconds
        ));
        for line in display_value(result).lines() {
            output.push_str(&format!("   {}\n", line));
        }
        output.push('\n');
    }

    if let Some(ref failure) = run.failure {
        output.push_str(&format!(
            "⚠️  Stopped at endpoint {} ({}): {}\n",
            failure.position, failure.name, failure.error
        ));
        output.push_str(&format!("   URL: {}\n", failure.url));
    }

    output
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(run: &AnalysisRun) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# Conversation Analysis\n\n");

    output.push_str(&generate_metadata_section(run));
    output.push_str(&generate_input_section(&run.request.input_text));
    output.push_str(&generate_results_section(&run.results));

    if let Some(ref failure) = run.failure {
        output.push_str(&generate_failure_section(failure));
    }

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(run: &AnalysisRun) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Submitted:** {}\n",
        run.request.submitted_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Input Characters:** {}\n",
        run.request.character_count()
    ));
    section.push_str(&format!("- **Results:** {}\n", run.results.len()));
    let status = match run.status() {
        RunStatus::Complete => "complete".to_string(),
        RunStatus::Partial { failed_at } => format!("partial (failed at endpoint {})", failed_at),
    };
    section.push_str(&format!("- **Status:** {}\n", status));
    section.push_str(&format!(
        "- **Total Duration:** {:.2}s\n",
        run.total_elapsed_seconds()
    ));
    section.push('\n');

    section
}

/// Generate the input section as a quote block.
fn generate_input_section(input: &str) -> String {
    let mut section = String::new();

    section.push_str("## Input\n\n");
    for line in input.trim().lines() {
        section.push_str(&format!("> {}\n", line));
    }
    section.push('\n');

    section
}

/// Generate one subsection per result, in call order.
fn generate_results_section(results: &[AnalysisResult]) -> String {
    let mut section = String::new();

    section.push_str("## Results\n\n");

    if results.is_empty() {
        section.push_str("No endpoint returned a result.\n\n");
        return section;
    }

    for result in results {
        section.push_str(&format!("### {}\n\n", capitalize(&result.name)));
        section.push_str(&format!(
            "*Type: {} | Elapsed: {:.2}s*\n\n",
            result.value_type(),
            result.elapsed_seconds
        ));

        match (&result.sentiment, &result.value) {
            (Some(sentiment), _) if !sentiment.percentages().is_empty() => {
                section.push_str(&generate_sentiment_table(sentiment));
            }
            (_, ResultValue::Object(value)) => {
                let pretty =
                    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
                section.push_str(&format!("```json\n{}\n```\n\n", pretty));
            }
            (_, value) => {
                section.push_str(&format!("{}\n\n", value));
            }
        }
    }

    section
}

/// Generate a percentage table for a decoded sentiment.
fn generate_sentiment_table(sentiment: &Sentiment) -> String {
    let mut table = String::new();

    table.push_str("| Sentiment | Share |\n");
    table.push_str("|:---|:---:|\n");
    for (label, pct) in sentiment.percentages() {
        table.push_str(&format!("| {} | {:.1}% |\n", label, pct));
    }
    table.push('\n');

    table
}

/// Generate the failure section.
fn generate_failure_section(failure: &EndpointFailure) -> String {
    let mut section = String::new();

    section.push_str("## Failure\n\n");
    section.push_str(&format!(
        "Endpoint {} (`{}`) failed; later endpoints were not called.\n\n",
        failure.position, failure.name
    ));
    section.push_str(&format!("- **URL:** {}\n", failure.url));
    section.push_str(&format!("- **Error:** {}\n\n", failure.error));

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    "---\n\n*Report generated by talkscope*\n".to_string()
}

/// Generate a JSON report.
pub fn generate_json_report(run: &AnalysisRun) -> Result<String> {
    serde_json::to_string_pretty(run).map_err(Into::into)
}

/// Write rendered output to a file.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

/// Text shown for a result: decoded sentiment when available, else the value.
fn display_value(result: &AnalysisResult) -> String {
    match (&result.sentiment, &result.value) {
        (Some(sentiment), _) => sentiment.to_string(),
        (None, ResultValue::Object(value)) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        (None, value) => value.to_string(),
    }
}
