//! Local flow definitions and import planning.

use super::client::FlowError;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Keys removed before upload; they belong to the exporting instance.
const INSTANCE_KEYS: [&str; 2] = ["user_id", "folder_id"];

/// A flow definition read from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalFlow {
    /// File name the definition was read from.
    pub file_name: String,
    /// The flow's `name` field (empty when missing).
    pub name: String,
    /// Definition with instance-specific keys stripped.
    pub body: Value,
}

/// What to do with one local flow.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportAction {
    Upload(LocalFlow),
    Skip { file_name: String, name: String },
}

/// Outcome of an import pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub imported: Vec<String>,
    pub skipped: Vec<String>,
    /// File name and error message of each failed file.
    pub failed: Vec<(String, String)>,
}

impl ImportReport {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Remove instance-specific keys from a flow definition.
pub fn sanitize_flow(mut body: Value) -> Value {
    if let Some(object) = body.as_object_mut() {
        for key in INSTANCE_KEYS {
            object.remove(key);
        }
    }
    body
}

/// `*.json` files directly inside `dir`, sorted by name.
pub fn local_flow_files(dir: &Path) -> Result<Vec<PathBuf>, FlowError> {
    if !dir.is_dir() {
        return Err(FlowError::MissingDir {
            path: dir.to_path_buf(),
        });
    }

    Ok(WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("json"))
        .map(|e| e.into_path())
        .collect())
}

/// Read and sanitize one flow definition file.
pub fn read_local_flow(path: &Path) -> Result<LocalFlow, FlowError> {
    let content = fs::read_to_string(path).map_err(|source| FlowError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let body: Value = serde_json::from_str(&content).map_err(|source| FlowError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let name = body
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(LocalFlow {
        file_name: path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
        name,
        body: sanitize_flow(body),
    })
}

/// Decide per flow whether to upload or skip.
///
/// A flow is skipped when its name exists remotely or an earlier flow in
/// this pass already carries it. Flows without a name are always uploaded.
pub fn plan_import(flows: Vec<LocalFlow>, existing: &HashSet<String>) -> Vec<ImportAction> {
    let mut taken = existing.clone();

    flows
        .into_iter()
        .map(|flow| {
            if flow.name.is_empty() {
                return ImportAction::Upload(flow);
            }
            if taken.contains(&flow.name) {
                ImportAction::Skip {
                    file_name: flow.file_name,
                    name: flow.name,
                }
            } else {
                taken.insert(flow.name.clone());
                ImportAction::Upload(flow)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn flow(file_name: &str, name: &str) -> LocalFlow {
        LocalFlow {
            file_name: file_name.to_string(),
            name: name.to_string(),
            body: json!({"name": name}),
        }
    }

    #[test]
    fn test_sanitize_strips_instance_keys() {
        let body = json!({
            "name": "Summary",
            "user_id": "u-1",
            "folder_id": "f-1",
            "data": {"nodes": []}
        });
        assert_eq!(
            sanitize_flow(body),
            json!({"name": "Summary", "data": {"nodes": []}})
        );
    }

    #[test]
    fn test_plan_skips_existing_and_repeated_names() {
        let existing: HashSet<String> = ["Summary".to_string()].into_iter().collect();
        let plan = plan_import(
            vec![
                flow("a.json", "Summary"),
                flow("b.json", "Intent"),
                flow("c.json", "Intent"),
            ],
            &existing,
        );

        assert_eq!(
            plan,
            vec![
                ImportAction::Skip {
                    file_name: "a.json".to_string(),
                    name: "Summary".to_string()
                },
                ImportAction::Upload(flow("b.json", "Intent")),
                ImportAction::Skip {
                    file_name: "c.json".to_string(),
                    name: "Intent".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_plan_uploads_every_nameless_flow() {
        let existing: HashSet<String> = [String::new()].into_iter().collect();
        let plan = plan_import(vec![flow("a.json", ""), flow("b.json", "")], &existing);

        assert_eq!(
            plan,
            vec![
                ImportAction::Upload(flow("a.json", "")),
                ImportAction::Upload(flow("b.json", "")),
            ]
        );
    }

    #[test]
    fn test_fixture_flows_are_sanitized() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/flows");
        let files = local_flow_files(&dir).unwrap();
        assert_eq!(files.len(), 2);

        let flows: Vec<LocalFlow> = files
            .iter()
            .map(|path| read_local_flow(path).unwrap())
            .collect();
        assert_eq!(flows[0].name, "Transcript Sentiment");
        assert_eq!(flows[1].name, "Transcript Summary");
        for flow in &flows {
            assert!(flow.body.get("user_id").is_none());
            assert!(flow.body.get("folder_id").is_none());
            assert!(flow.body.get("data").is_some());
        }
    }

    #[test]
    fn test_read_local_flows_from_dir() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("2_intent.json"),
            r#"{"name": "Intent", "user_id": "x"}"#,
        )
        .unwrap();
        fs::write(dir.path().join("1_summary.json"), r#"{"name": "Summary"}"#).unwrap();
        fs::write(dir.path().join("README.md"), "docs").unwrap();

        let files = local_flow_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("1_summary.json"));

        let intent = read_local_flow(&files[1]).unwrap();
        assert_eq!(intent.name, "Intent");
        assert_eq!(intent.file_name, "2_intent.json");
        assert!(intent.body.get("user_id").is_none());
    }

    #[test]
    fn test_read_invalid_flow() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(read_local_flow(&path), Err(FlowError::Json { .. })));
        assert!(matches!(
            local_flow_files(&dir.path().join("missing")),
            Err(FlowError::MissingDir { .. })
        ));
    }
}
