//! Interactive analysis session.
//!
//! Lines are collected into an input buffer until a lone `.` submits it.
//! Each submission replaces the single run on display. Commands start
//! with `:`.

use crate::dispatch::{Dispatcher, Submission, Transport};
use crate::models::{RunSlot, RunStatus};
use crate::report::generate_text_report;
use crate::transcript::TranscriptStore;
use anyhow::Result;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

const HELP: &str = "\
Type or paste a transcript, then a line with a single '.' to analyze it.
  :load NAME     load a transcript from the transcript directory
  :transcripts   list transcripts
  :endpoints     list configured endpoints
  :show          show the latest analysis again
  :result NAME   show one endpoint's result from the latest analysis
  :clear         discard the current input
  :help          show this help
  :quit          leave the session";

/// Whether the loop should keep reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

/// State of one interactive session.
pub struct Session<'a, T: Transport> {
    dispatcher: &'a Dispatcher<T>,
    transcripts: &'a TranscriptStore,
    slot: RunSlot,
    buffer: String,
}

impl<'a, T: Transport> Session<'a, T> {
    pub fn new(dispatcher: &'a Dispatcher<T>, transcripts: &'a TranscriptStore) -> Self {
        Self {
            dispatcher,
            transcripts,
            slot: RunSlot::new(),
            buffer: String::new(),
        }
    }

    pub fn slot(&self) -> &RunSlot {
        &self.slot
    }

    /// Read lines from `input` until `:quit` or end of input.
    pub async fn run<R, W>(mut self, input: R, out: &mut W) -> Result<RunSlot>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        writeln!(out, "{}\n", HELP)?;

        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            if self.handle_line(&line, out).await? == Control::Quit {
                break;
            }
        }

        Ok(self.slot)
    }

    /// Handle one input line.
    pub async fn handle_line<W: Write>(&mut self, line: &str, out: &mut W) -> Result<Control> {
        let trimmed = line.trim();

        if trimmed == "." {
            self.submit(out).await?;
            return Ok(Control::Continue);
        }

        let Some(command) = trimmed.strip_prefix(':') else {
            self.buffer.push_str(line);
            self.buffer.push('\n');
            return Ok(Control::Continue);
        };

        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command, ""),
        };
        debug!("Session command: {}", name);

        match name {
            "quit" | "q" | "exit" => return Ok(Control::Quit),
            "help" | "h" => writeln!(out, "{}", HELP)?,
            "clear" => {
                self.buffer.clear();
                writeln!(out, "Input cleared.")?;
            }
            "show" => match self.slot().latest() {
                Some(run) => write!(out, "{}", generate_text_report(run))?,
                None => writeln!(out, "No analysis yet.")?,
            },
            "result" if arg.is_empty() => writeln!(out, "Usage: :result NAME")?,
            "result" => match self.slot().latest().and_then(|run| run.result(arg)) {
                Some(result) => writeln!(out, "{}: {}", result.name, result.value)?,
                None => writeln!(out, "No result for {}.", arg)?,
            },
            "endpoints" => {
                for (i, endpoint) in self.dispatcher.endpoints().iter().enumerate() {
                    writeln!(out, "{}. {} -> {}", i + 1, endpoint.name, endpoint.url)?;
                }
            }
            "transcripts" => match self.transcripts.list() {
                Ok(names) if names.is_empty() => writeln!(out, "No transcripts found.")?,
                Ok(names) => {
                    for name in names {
                        writeln!(out, "  {}", name)?;
                    }
                }
                Err(e) => writeln!(out, "❌ {}", e)?,
            },
            "load" if arg.is_empty() => writeln!(out, "Usage: :load NAME")?,
            "load" => match self.transcripts.load(arg) {
                Ok(text) => {
                    writeln!(out, "{}", text)?;
                    writeln!(out, "(loaded; enter '.' to analyze)")?;
                    self.buffer = text;
                    self.buffer.push('\n');
                }
                Err(e) => writeln!(out, "❌ {}", e)?,
            },
            other => writeln!(out, "Unknown command :{} (try :help)", other)?,
        }

        Ok(Control::Continue)
    }

    async fn submit<W: Write>(&mut self, out: &mut W) -> Result<()> {
        let input = std::mem::take(&mut self.buffer);

        match self.dispatcher.submit(&mut self.slot, &input).await {
            Submission::Ignored => writeln!(out, "Input is empty; nothing sent.")?,
            Submission::Replaced(status) => {
                if let Some(run) = self.slot.latest() {
                    write!(out, "{}", generate_text_report(run))?;
                }
                if let RunStatus::Partial { failed_at } = status {
                    writeln!(out, "Endpoints after {} were not called.", failed_at)?;
                }
            }
        }

        Ok(())
    }
}
