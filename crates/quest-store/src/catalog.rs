use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::StoreError;
use crate::json::{field_or, id_text, is_truthy, read_json};
use crate::legacy_js::JsQuestFields;

/// One quest as shown in the catalogue.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestSummary {
    /// Position in the listing, starting at 1.
    pub id: usize,
    #[serde(rename = "id_string")]
    pub id_string: Value,
    pub name: Value,
    pub description: Value,
    pub difficulty: Value,
    pub age_group: Value,
    pub distance: Value,
    pub waypoints: usize,
    pub folder: String,
    pub filename: String,
    pub rating: Value,
    pub enabled: Value,
}

/// Full text of a single quest file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestDocument {
    /// The id as requested.
    pub id: String,
    pub content: String,
    pub folder: String,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmittedQuest {
    pub filename: String,
    pub name: String,
    pub description: String,
    pub waypoints: usize,
}

/// A directory of quest folders, each holding a quest file and its photos.
#[derive(Debug, Clone)]
pub struct QuestCatalog {
    root: PathBuf,
}

pub(crate) struct QuestFolder {
    pub name: String,
    pub path: PathBuf,
}

impl QuestCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure_root(&self) -> Result<(), StoreError> {
        if self.root.is_dir() {
            return Ok(());
        }
        fs::create_dir_all(&self.root).map_err(|e| StoreError::io(&self.root, e))?;
        info!(dir = %self.root.display(), "created quests directory");
        Ok(())
    }

    /// Quest folders sorted by name.
    pub(crate) fn folders(&self) -> Result<Vec<QuestFolder>, StoreError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StoreError::io(&self.root, err)),
        };
        let mut folders: Vec<QuestFolder> = entries
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
            .map(|e| QuestFolder {
                name: e.file_name().to_string_lossy().into_owned(),
                path: e.path(),
            })
            .collect();
        folders.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(folders)
    }

    pub fn list(&self) -> Result<Vec<QuestSummary>, StoreError> {
        self.ensure_root()?;
        let mut quests = Vec::new();
        for folder in self.folders()? {
            for file in quest_files(&folder.path) {
                let path = folder.path.join(&file);
                let next_id = quests.len() + 1;
                let summary = if is_json(&file) {
                    read_json(&path).and_then(|doc| json_summary(&doc, next_id, &path).map(Some))
                } else {
                    read_text(&path).map(|content| js_summary(&content, next_id))
                };
                match summary {
                    Ok(Some(mut summary)) => {
                        summary.folder.clone_from(&folder.name);
                        summary.filename.clone_from(&file);
                        quests.push(summary);
                    }
                    Ok(None) => debug!(file = %path.display(), "no quest name, skipping"),
                    Err(err) => warn!(error = %err, "unreadable quest file, skipping"),
                }
            }
        }
        quests.sort_by_key(|q| q.id);
        Ok(quests)
    }

    /// Look up a quest by the id in its file.
    ///
    /// An all-digit request also matches a file id of `quest_<digits>`.
    pub fn find(&self, quest_id: &str) -> Result<QuestDocument, StoreError> {
        self.ensure_root()?;
        let numeric = !quest_id.is_empty() && quest_id.bytes().all(|b| b.is_ascii_digit());
        let matches = |file_id: &str| {
            file_id == quest_id || (numeric && file_id == format!("quest_{quest_id}"))
        };

        for folder in self.folders()? {
            for file in quest_files(&folder.path) {
                let path = folder.path.join(&file);
                let content = if is_json(&file) {
                    read_json(&path).and_then(|doc| {
                        let found = doc
                            .get("id")
                            .filter(|id| is_truthy(id))
                            .is_some_and(|id| matches(&id_text(id)));
                        if !found {
                            return Ok(None);
                        }
                        serde_json::to_string_pretty(&doc)
                            .map(Some)
                            .map_err(|e| StoreError::json(&path, e))
                    })
                } else {
                    read_text(&path).map(|content| {
                        let fields = JsQuestFields::parse(&content);
                        fields
                            .id
                            .as_deref()
                            .is_some_and(|id| matches(id))
                            .then_some(content)
                    })
                };
                match content {
                    Ok(Some(content)) => {
                        return Ok(QuestDocument {
                            id: quest_id.to_string(),
                            content,
                            folder: folder.name,
                            filename: file,
                        });
                    }
                    Ok(None) => {}
                    Err(err) => warn!(error = %err, "unreadable quest file, skipping"),
                }
            }
        }
        Err(StoreError::NotFound("Quest not found".into()))
    }

    /// Legacy `.js` quests only.
    pub fn submitted(&self) -> Result<Vec<SubmittedQuest>, StoreError> {
        self.ensure_root()?;
        let mut quests = Vec::new();
        for folder in self.folders()? {
            for file in files_with_ext(&folder.path, "js") {
                let path = folder.path.join(&file);
                let content = match read_text(&path) {
                    Ok(content) => content,
                    Err(err) => {
                        warn!(error = %err, "unreadable quest file, skipping");
                        continue;
                    }
                };
                let fields = JsQuestFields::parse(&content);
                let waypoints = fields.named_waypoint_count();
                if let Some(name) = fields.name {
                    quests.push(SubmittedQuest {
                        filename: file,
                        name,
                        description: fields.description.unwrap_or_default(),
                        waypoints,
                    });
                }
            }
        }
        Ok(quests)
    }
}

fn json_summary(
    doc: &Value,
    next_id: usize,
    path: &Path,
) -> Result<QuestSummary, StoreError> {
    let Some(obj) = doc.as_object() else {
        return Err(StoreError::invalid(format!(
            "{} is not a JSON object",
            path.display()
        )));
    };
    let id_string = match obj.get("id") {
        None => Value::String(next_id.to_string()),
        Some(Value::Number(n)) if n.is_i64() || n.is_u64() => Value::String(n.to_string()),
        Some(other) => other.clone(),
    };
    let waypoints = obj
        .get("checkpoints")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    Ok(QuestSummary {
        id: next_id,
        id_string,
        name: field_or(obj, "name", Value::from("")),
        description: field_or(obj, "description", Value::from("")),
        difficulty: field_or(obj, "difficulty", Value::from("Medium")),
        age_group: field_or(obj, "ageGroup", Value::from("All Ages")),
        distance: field_or(obj, "distance", Value::from("Unknown")),
        waypoints,
        folder: String::new(),
        filename: String::new(),
        rating: field_or(obj, "rating", Value::from(0)),
        enabled: field_or(obj, "enabled", Value::Bool(true)),
    })
}

fn js_summary(content: &str, next_id: usize) -> Option<QuestSummary> {
    let fields = JsQuestFields::parse(content);
    let waypoints = fields.checkpoint_count();
    let name = fields.name?;
    Some(QuestSummary {
        id: next_id,
        id_string: Value::String(fields.id.unwrap_or_else(|| format!("quest_{next_id}"))),
        name: Value::String(name),
        description: Value::String(fields.description.unwrap_or_default()),
        difficulty: Value::String(fields.difficulty.unwrap_or_else(|| "Medium".into())),
        age_group: Value::String(fields.age_group.unwrap_or_else(|| "All Ages".into())),
        distance: Value::String(fields.distance.unwrap_or_else(|| "Unknown".into())),
        waypoints,
        folder: String::new(),
        filename: String::new(),
        rating: Value::from(0),
        enabled: Value::Bool(true),
    })
}

fn is_json(file: &str) -> bool {
    file.ends_with(".json")
}

fn read_text(path: &Path) -> Result<String, StoreError> {
    fs::read_to_string(path).map_err(|e| StoreError::io(path, e))
}

/// `.json` quest files (metadata excluded) when any exist, else `.js` files.
fn quest_files(dir: &Path) -> Vec<String> {
    let json: Vec<String> = files_with_ext(dir, "json")
        .into_iter()
        .filter(|f| !f.ends_with("_metadata.json"))
        .collect();
    if json.is_empty() {
        files_with_ext(dir, "js")
    } else {
        json
    }
}

/// Sorted names of regular files in `dir` ending in `.{ext}`.
pub(crate) fn files_with_ext(dir: &Path, ext: &str) -> Vec<String> {
    let suffix = format!(".{ext}");
    let Ok(entries) = fs::read_dir(dir) else {
        warn!(dir = %dir.display(), "cannot list quest folder");
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_ok_and(|t| t.is_file()))
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|name| name.ends_with(&suffix))
        .collect();
    names.sort();
    names
}
