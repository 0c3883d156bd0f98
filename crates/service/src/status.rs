//! Root and health payloads.

use serde::Serialize;
use serde_json::{Value, json};

use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub model_loaded: bool,
    pub processor_loaded: bool,
}

pub fn health(state: &AppState) -> Health {
    Health {
        status: "healthy",
        model_loaded: state.model_loaded(),
        // Preprocessing ships with the encoder; one cannot exist without the other.
        processor_loaded: state.model_loaded(),
    }
}

/// Server banner with an endpoint map for humans poking at `/`.
pub fn server_info(state: &AppState) -> Value {
    json!({
        "message": "CityQuest Image Comparison Server",
        "status": "running",
        "model_loaded": state.model_loaded(),
        "backend": state.provider.backend_name(),
        "endpoints": {
            "health": "/health",
            "compare": "/compare (supports multiple answer images)",
            "leaderboard": "/leaderboard/<quest_id>",
            "quests": "/api/quests (get all available quests)",
            "quest_by_id": "/api/quests/<id> (get specific quest)",
            "rate_quest": "/quest/<quest_id>/rate",
            "quest_creator": {
                "submit_quest": "/api/submit-quest",
                "get_quests": "/api/submitted-quests"
            }
        }
    })
}
