//! Transcript source.
//!
//! Transcripts are JSON files holding a list whose first element is the
//! whole conversation as one comma-delimited string of `agent:` and
//! `customer:` turns. They are reformatted into labelled speaker lines
//! before being used as analysis input.

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Errors raised while reading transcripts.
#[derive(thiserror::Error, Debug)]
pub enum TranscriptError {
    #[error("Transcript directory not found: {}", path.display())]
    MissingDir { path: PathBuf },
    #[error("Transcript not found: {name}")]
    NotFound { name: String },
    #[error("Error reading transcript {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Transcript {} is not valid JSON: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Transcript {} must be a list whose first element is a string", path.display())]
    Shape { path: PathBuf },
}

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    Agent,
    Customer,
}

impl Speaker {
    fn label(self) -> &'static str {
        match self {
            Speaker::Agent => "Agent",
            Speaker::Customer => "Customer",
        }
    }

    /// Strip a leading `agent:` / `customer:` prefix (case-insensitive).
    fn split_prefix(segment: &str) -> Option<(Speaker, &str)> {
        let (head, rest) = segment.split_once(':')?;
        let speaker = match head.trim().to_lowercase().as_str() {
            "agent" => Speaker::Agent,
            "customer" => Speaker::Customer,
            _ => return None,
        };
        Some((speaker, rest.trim()))
    }
}

/// Reformat a raw transcript into one `Speaker: text` line per turn.
///
/// Segments without a speaker prefix continue the previous turn and are
/// re-joined with a comma. Text with no speaker prefix at all is returned
/// trimmed and otherwise unchanged.
pub fn format_transcript(raw: &str) -> String {
    let mut turns: Vec<(Speaker, String)> = Vec::new();

    for segment in raw.split(',') {
        match Speaker::split_prefix(segment) {
            Some((speaker, text)) => turns.push((speaker, text.to_string())),
            None => match turns.last_mut() {
                Some((_, text)) => {
                    text.push(',');
                    text.push_str(segment);
                }
                None if !segment.trim().is_empty() => {
                    // Leading text before any speaker: not a speaker transcript.
                    return raw.trim().to_string();
                }
                None => {}
            },
        }
    }

    if turns.is_empty() {
        return raw.trim().to_string();
    }

    turns
        .into_iter()
        .map(|(speaker, text)| format!("{}: {}", speaker.label(), text.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Directory of transcript files.
pub struct TranscriptStore {
    dir: PathBuf,
}

impl TranscriptStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File names of all `*.json` transcripts, sorted.
    pub fn list(&self) -> Result<Vec<String>, TranscriptError> {
        if !self.dir.is_dir() {
            return Err(TranscriptError::MissingDir {
                path: self.dir.clone(),
            });
        }

        let mut names: Vec<String> = WalkDir::new(&self.dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(e) => Some(e),
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("json"))
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();

        names.sort();
        debug!("Found {} transcripts in {}", names.len(), self.dir.display());
        Ok(names)
    }

    /// Load the raw conversation string of transcript `name`.
    ///
    /// `name` may omit the `.json` extension.
    pub fn load_raw(&self, name: &str) -> Result<String, TranscriptError> {
        let file_name = if name.ends_with(".json") {
            name.to_string()
        } else {
            format!("{}.json", name)
        };

        // Only bare file names inside the store are accepted.
        if Path::new(&file_name).components().count() != 1 {
            return Err(TranscriptError::NotFound {
                name: name.to_string(),
            });
        }

        let path = self.dir.join(&file_name);
        if !path.is_file() {
            return Err(TranscriptError::NotFound {
                name: name.to_string(),
            });
        }

        read_raw(&path)
    }

    /// Load transcript `name` and reformat it into speaker lines.
    pub fn load(&self, name: &str) -> Result<String, TranscriptError> {
        Ok(format_transcript(&self.load_raw(name)?))
    }
}

/// Read a transcript file and return its first list element.
pub fn read_raw(path: &Path) -> Result<String, TranscriptError> {
    let content = fs::read_to_string(path).map_err(|source| TranscriptError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let value: Value = serde_json::from_str(&content).map_err(|source| TranscriptError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    value
        .as_array()
        .and_then(|items| items.first())
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| TranscriptError::Shape {
            path: path.to_path_buf(),
        })
}
