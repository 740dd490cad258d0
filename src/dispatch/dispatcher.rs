//! Sequential dispatch of a submission to every analysis endpoint.
//!
//! Endpoints are called strictly one after another. A failing call stops
//! the run: results gathered so far are kept and the remaining endpoints
//! are not called. A response without the result field is not a failure;
//! the endpoint's placeholder is recorded instead.

use super::Transport;
use crate::analysis::{decode_sentiment, extract_result_value, RESULT_PATH};
use crate::models::{
    AnalysisEndpoint, AnalysisRequest, AnalysisResult, AnalysisRun, EndpointFailure, EndpointKind,
    ResultValue, RunSlot, RunStatus,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DispatchState {
    Idle,
    Dispatching(usize),
    Done(RunStatus),
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchState::Idle => write!(f, "idle"),
            DispatchState::Dispatching(i) => write!(f, "dispatching({})", i),
            DispatchState::Done(RunStatus::Complete) => write!(f, "done(complete)"),
            DispatchState::Done(RunStatus::Partial { failed_at }) => {
                write!(f, "done(partial, failed_at={})", failed_at)
            }
        }
    }
}

/// What happened to a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Blank input; nothing was sent and the slot is unchanged.
    Ignored,
    /// A new run replaced the slot contents.
    Replaced(RunStatus),
}

/// Dispatches submissions to an ordered list of endpoints.
pub struct Dispatcher<T: Transport> {
    transport: T,
    endpoints: Vec<AnalysisEndpoint>,
    show_progress: bool,
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(transport: T, endpoints: Vec<AnalysisEndpoint>) -> Self {
        Self {
            transport,
            endpoints,
            show_progress: false,
        }
    }

    /// Show a spinner while each endpoint call is in flight.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn endpoints(&self) -> &[AnalysisEndpoint] {
        &self.endpoints
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run the analysis for `input_text`. Returns `None` for blank input.
    pub async fn run_analysis(&self, input_text: &str) -> Option<AnalysisRun> {
        let request = AnalysisRequest::new(input_text)?;
        Some(self.run_request(request).await)
    }

    /// Run the analysis and store the run in `slot`, replacing what was there.
    pub async fn submit(&self, slot: &mut RunSlot, input_text: &str) -> Submission {
        match self.run_analysis(input_text).await {
            Some(run) => {
                let status = run.status();
                slot.replace(run);
                Submission::Replaced(status)
            }
            None => {
                debug!("Ignoring blank submission");
                Submission::Ignored
            }
        }
    }

    /// Call every endpoint in order for an already validated request.
    pub async fn run_request(&self, request: AnalysisRequest) -> AnalysisRun {
        let payload = json!({ "input_value": request.input_text });
        let mut run = AnalysisRun::new(request);
        let mut state = DispatchState::Idle;

        info!(
            "Dispatching {} characters to {} endpoint(s)",
            run.request.character_count(),
            self.endpoints.len()
        );

        for (index, endpoint) in self.endpoints.iter().enumerate() {
            let position = index + 1;
            state = self.transition(state, DispatchState::Dispatching(position));

            let spinner = self.spinner(endpoint);
            let started = Instant::now();
            let outcome = self.transport.post_json(&endpoint.url, &payload).await;
            let elapsed_seconds = started.elapsed().as_secs_f64();
            if let Some(pb) = spinner {
                pb.finish_and_clear();
            }

            match outcome {
                Ok(response) => {
                    let result = build_result(endpoint, &response, elapsed_seconds);
                    info!(
                        "{} answered in {:.2}s ({})",
                        endpoint.name,
                        elapsed_seconds,
                        result.value_type()
                    );
                    run.results.push(result);
                }
                Err(error) => {
                    warn!("{} failed: {}", endpoint.name, error);
                    run.failure = Some(EndpointFailure {
                        position,
                        name: endpoint.name.clone(),
                        url: error.url().to_string(),
                        error,
                    });
                    break;
                }
            }
        }

        let done = DispatchState::Done(run.status());
        self.transition(state, done);
        run
    }

    fn transition(&self, from: DispatchState, to: DispatchState) -> DispatchState {
        debug!("Dispatcher {} -> {}", from, to);
        to
    }

    fn spinner(&self, endpoint: &AnalysisEndpoint) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }

        let pb = ProgressBar::new_spinner();
        if let Ok(style) =
            ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed}]")
        {
            pb.set_style(style);
        }
        pb.set_message(format!("{} ({})", endpoint.label(), endpoint.url));
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    }
}

/// Turn a successful response into a result for `endpoint`.
fn build_result(
    endpoint: &AnalysisEndpoint,
    response: &serde_json::Value,
    elapsed_seconds: f64,
) -> AnalysisResult {
    let value = extract_result_value(response, &endpoint.placeholder());
    if let ResultValue::Placeholder(_) = value {
        warn!("{} response has no {}", endpoint.name, RESULT_PATH);
    }

    let sentiment = match (&endpoint.kind, &value) {
        (EndpointKind::Sentiment, ResultValue::Placeholder(_)) => None,
        (EndpointKind::Sentiment, v) => Some(decode_sentiment(&v.as_text())),
        (EndpointKind::General, _) => None,
    };

    AnalysisResult {
        name: endpoint.name.clone(),
        url: endpoint.url.clone(),
        value,
        elapsed_seconds,
        sentiment,
    }
}
