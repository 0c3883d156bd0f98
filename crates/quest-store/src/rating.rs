use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{info, warn};

use crate::catalog::{QuestCatalog, files_with_ext};
use crate::json::{id_text, is_truthy, read_json, write_pretty};
use crate::{StoreError, iso_timestamp};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingReceipt {
    pub message: String,
    pub new_average_rating: f64,
    pub total_ratings: usize,
}

impl QuestCatalog {
    /// Record a 1-5 star rating and refresh the quest's average.
    pub fn rate(&self, quest_id: &str, body: &Value) -> Result<RatingReceipt, StoreError> {
        self.rate_at(quest_id, body, Local::now())
    }

    pub fn rate_at(
        &self,
        quest_id: &str,
        body: &Value,
        now: DateTime<Local>,
    ) -> Result<RatingReceipt, StoreError> {
        let rating = parse_rating(body)?;
        let path = self
            .find_json_by_id(quest_id)?
            .ok_or_else(|| StoreError::NotFound("Quest not found".into()))?;

        let mut doc = read_json(&path)?;
        let Some(quest) = doc.as_object_mut() else {
            return Err(StoreError::NotFound("Quest not found".into()));
        };

        // `take` keeps each key in place so the rewrite preserves file order.
        let mut board = match quest.get_mut("leaderboard").map(Value::take) {
            Some(Value::Object(board)) if !board.is_empty() => board,
            _ => empty_quest_board(),
        };
        let mut ratings = match board.get_mut("ratings").map(Value::take) {
            Some(Value::Array(ratings)) => ratings,
            _ => Vec::new(),
        };
        ratings.push(json!({ "rating": rating, "timestamp": iso_timestamp(now) }));

        let total: f64 = ratings
            .iter()
            .filter_map(|r| r.get("rating").and_then(Value::as_f64))
            .sum();
        let average = round_one_decimal(total / ratings.len() as f64);
        let count = ratings.len();

        board.insert("ratings".into(), Value::Array(ratings));
        quest.insert("leaderboard".into(), Value::Object(board));
        quest.insert("rating".into(), json!(average));
        write_pretty(&path, &doc)?;

        info!(quest_id, rating, average, count, "quest rated");
        Ok(RatingReceipt {
            message: "Rating submitted successfully".into(),
            new_average_rating: average,
            total_ratings: count,
        })
    }

    /// First `.json` file, in folder order, whose `id` renders as `quest_id`.
    fn find_json_by_id(&self, quest_id: &str) -> Result<Option<PathBuf>, StoreError> {
        for folder in self.folders()? {
            for file in files_with_ext(&folder.path, "json") {
                let path = folder.path.join(&file);
                match read_json(&path) {
                    Ok(doc) => {
                        if doc.get("id").is_some_and(|id| id_text(id) == quest_id) {
                            return Ok(Some(path));
                        }
                    }
                    Err(err) => warn!(error = %err, "unreadable quest file, skipping"),
                }
            }
        }
        Ok(None)
    }
}

fn parse_rating(body: &Value) -> Result<i64, StoreError> {
    let rating = body
        .as_object()
        .filter(|obj| is_truthy(body) && obj.contains_key("rating"))
        .and_then(|obj| obj.get("rating"))
        .ok_or_else(|| StoreError::invalid("Rating is required"))?;
    rating
        .as_i64()
        .filter(|r| (1..=5).contains(r))
        .ok_or_else(|| StoreError::invalid("Rating must be an integer between 1 and 5"))
}

fn empty_quest_board() -> Map<String, Value> {
    let board = json!({
        "entries": [],
        "stats": {
            "total_completions": 0,
            "average_time": 0,
            "best_time": null,
            "last_updated": null
        }
    });
    match board {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}
