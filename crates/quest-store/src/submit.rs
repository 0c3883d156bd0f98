//! Quest creator uploads: a quest definition plus base64 photos per waypoint.

use std::fs;
use std::sync::LazyLock;

use chrono::{DateTime, Local};
use core_types::decode_image_payload;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{info, warn};

use crate::StoreError;
use crate::catalog::QuestCatalog;
use crate::json::{field_or, is_truthy, write_pretty};

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[^a-zA-Z0-9]").expect("unsafe char pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReceipt {
    pub success: bool,
    pub message: String,
    pub quest_file: String,
    pub saved_images: Vec<String>,
    pub waypoints_count: usize,
}

impl QuestCatalog {
    /// Write a new quest folder with its JSON file and answer photos.
    pub fn submit(&self, body: &Value) -> Result<SubmitReceipt, StoreError> {
        self.submit_at(body, Local::now())
    }

    pub fn submit_at(&self, body: &Value, now: DateTime<Local>) -> Result<SubmitReceipt, StoreError> {
        self.ensure_root()?;
        let body = body
            .as_object()
            .filter(|obj| !obj.is_empty())
            .ok_or_else(|| StoreError::invalid("No data provided"))?;

        let photos = photo_index(body.get("zipData"))?;
        let quest = body
            .get("questData")
            .and_then(Value::as_object)
            .filter(|q| q.get("name").is_some_and(is_truthy))
            .ok_or_else(|| StoreError::invalid("Quest data is required"))?;
        let checkpoints: &[Value] = quest
            .get("checkpoints")
            .and_then(Value::as_array)
            .map_or(&[], Vec::as_slice);

        let placed: Vec<(usize, &Map<String, Value>)> = checkpoints
            .iter()
            .enumerate()
            .filter_map(|(i, cp)| cp.as_object().map(|cp| (i, cp)))
            .filter(|(_, cp)| has_coordinates(cp))
            .collect();
        for (i, _) in &placed {
            if waypoint_photos(&photos, *i).next().is_none() {
                return Err(StoreError::invalid(format!(
                    "Waypoint {} must have at least one photo",
                    i + 1
                )));
            }
        }

        let name = quest.get("name").map_or_else(String::new, |n| match n {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        });
        let safe_name = UNSAFE_CHARS.replace_all(&name, "_");
        let stem = format!("{safe_name}_{}", now.format("%Y-%m-%d_%H-%M-%S"));
        let folder = self.root().join(&stem);
        fs::create_dir_all(&folder).map_err(|e| StoreError::io(&folder, e))?;
        info!(folder = %stem, "created quest folder");

        let mut saved_images = Vec::new();
        let mut waypoints = Vec::with_capacity(placed.len());
        for (i, cp) in placed {
            let mut images = Vec::new();
            for (photo_key, data) in waypoint_photos(&photos, i) {
                let Ok(photo_index) = photo_key.trim().parse::<usize>() else {
                    warn!(waypoint = i + 1, photo = photo_key, "photo key is not an index, skipping");
                    continue;
                };
                let filename = format!("{stem}_waypoint{}_photo{}.jpg", i + 1, photo_index + 1);
                let bytes = match decode_image_payload(data) {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        warn!(waypoint = i + 1, photo = photo_key, error = %err, "bad photo, skipping");
                        continue;
                    }
                };
                let path = folder.join(&filename);
                if let Err(err) = fs::write(&path, bytes) {
                    warn!(path = %path.display(), error = %err, "could not save photo, skipping");
                    continue;
                }
                images.push(filename.clone());
                saved_images.push(filename);
            }

            let notes = cp
                .get("notes")
                .filter(|n| is_truthy(n))
                .cloned()
                .unwrap_or_else(|| Value::from(""));
            waypoints.push(json!({
                "id": i + 1,
                "name": field_or(cp, "name", Value::from(format!("Waypoint {}", i + 1))),
                "clue": field_or(cp, "clue", Value::from(format!("Find waypoint {}", i + 1))),
                "lat": field_or(cp, "lat", Value::from(0)),
                "lng": field_or(cp, "lng", Value::from(0)),
                "notes": notes,
                "answerImage": images,
            }));
        }

        let waypoints_count = waypoints.len();
        let document = json!({
            "id": field_or(quest, "id", Value::from(now.timestamp_millis())),
            "name": quest.get("name").cloned().unwrap_or(Value::Null),
            "description": field_or(quest, "description", Value::from("Quest created with Quest Creator")),
            "difficulty": "Medium",
            "ageGroup": "All Ages",
            "distance": format!("{waypoints_count} waypoints"),
            "checkpoints": waypoints,
        });
        let quest_file = format!("{stem}.json");
        write_pretty(&folder.join(&quest_file), &document)?;
        info!(quest_file = %quest_file, images = saved_images.len(), "quest submitted");

        Ok(SubmitReceipt {
            success: true,
            message: "Quest submitted successfully".into(),
            quest_file,
            saved_images,
            waypoints_count,
        })
    }
}

/// `zipData` arrives either as an object or as a JSON string of one.
fn photo_index(zip: Option<&Value>) -> Result<Value, StoreError> {
    match zip {
        Some(Value::String(raw)) => {
            serde_json::from_str(raw).map_err(|_| StoreError::invalid("Invalid zip_data format"))
        }
        Some(other) => Ok(other.clone()),
        None => Ok(Value::Null),
    }
}

fn has_coordinates(cp: &Map<String, Value>) -> bool {
    cp.get("lat").is_some_and(is_truthy) && cp.get("lng").is_some_and(is_truthy)
}

/// `(photo key, base64 data)` pairs for waypoint `index`, in upload order.
fn waypoint_photos(photos: &Value, index: usize) -> impl Iterator<Item = (&str, &str)> {
    photos
        .get("photos")
        .and_then(|p| p.get(index.to_string()))
        .and_then(Value::as_object)
        .into_iter()
        .flatten()
        .filter_map(|(key, photo)| {
            let data = photo.get("data").filter(|d| is_truthy(d))?.as_str()?;
            Some((key.as_str(), data))
        })
}
