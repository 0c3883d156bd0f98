//! Per-quest team results in a single JSON file.

use std::cmp::Ordering;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::json::{read_json, write_pretty};
use crate::{StoreError, iso_timestamp};

pub const REQUIRED_FIELDS: [&str; 4] = [
    "team_name",
    "waypoints_completed",
    "completion_time",
    "quest_date",
];

#[derive(Debug, Clone)]
pub struct LeaderboardStore {
    path: PathBuf,
}

impl LeaderboardStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whole board keyed by quest id. Missing or unreadable files load empty.
    pub fn load(&self) -> Map<String, Value> {
        match read_json(&self.path) {
            Ok(Value::Object(board)) => board,
            Ok(_) => {
                warn!(path = %self.path.display(), "leaderboard is not an object, starting empty");
                Map::new()
            }
            Err(StoreError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                Map::new()
            }
            Err(err) => {
                warn!(error = %err, "could not load leaderboard, starting empty");
                Map::new()
            }
        }
    }

    /// Entries for one quest: most waypoints first, then fastest time.
    pub fn entries(&self, quest_id: &str) -> Vec<Value> {
        let mut entries = match self.load().remove(quest_id) {
            Some(Value::Array(entries)) => entries,
            _ => Vec::new(),
        };
        entries.sort_by(rank);
        entries
    }

    pub fn add(&self, quest_id: &str, body: &Value) -> Result<(), StoreError> {
        self.add_at(quest_id, body, Local::now())
    }

    pub fn add_at(
        &self,
        quest_id: &str,
        body: &Value,
        now: DateTime<Local>,
    ) -> Result<(), StoreError> {
        let data = body
            .as_object()
            .filter(|obj| !obj.is_empty())
            .ok_or_else(|| StoreError::invalid("No data provided"))?;
        let mut entry = Map::new();
        for field in REQUIRED_FIELDS {
            let value = data
                .get(field)
                .ok_or_else(|| StoreError::invalid(format!("Missing required field: {field}")))?;
            entry.insert(field.to_string(), value.clone());
        }
        entry.insert("timestamp".into(), Value::String(iso_timestamp(now)));

        let mut board = self.load();
        let slot = board
            .entry(quest_id.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if !slot.is_array() {
            warn!(quest_id, "leaderboard slot is not a list, replacing it");
            *slot = Value::Array(Vec::new());
        }
        if let Value::Array(entries) = slot {
            entries.push(Value::Object(entry));
        }
        write_pretty(&self.path, &board)?;
        info!(quest_id, "leaderboard entry added");
        Ok(())
    }
}

fn rank(a: &Value, b: &Value) -> Ordering {
    let waypoints = |v: &Value| v.get("waypoints_completed").and_then(Value::as_f64).unwrap_or(0.0);
    let time = |v: &Value| {
        v.get("completion_time")
            .and_then(Value::as_f64)
            .unwrap_or(f64::INFINITY)
    };
    waypoints(b)
        .total_cmp(&waypoints(a))
        .then_with(|| time(a).total_cmp(&time(b)))
}
