//! Field extraction from hand-written `.js` quest modules.
//!
//! These files are JavaScript object literals, not JSON, so fields are pulled
//! out with single-quote regexes rather than parsed.

use std::sync::LazyLock;

use regex::Regex;

fn quoted(key: &str) -> Regex {
    Regex::new(&format!(r"{key}: '([^']+)'")).expect("quoted field pattern is valid")
}

static NAME: LazyLock<Regex> = LazyLock::new(|| quoted("name"));
static DESCRIPTION: LazyLock<Regex> = LazyLock::new(|| quoted("description"));
static DIFFICULTY: LazyLock<Regex> = LazyLock::new(|| quoted("difficulty"));
static AGE_GROUP: LazyLock<Regex> = LazyLock::new(|| quoted("ageGroup"));
static DISTANCE: LazyLock<Regex> = LazyLock::new(|| quoted("distance"));
static STRING_ID: LazyLock<Regex> = LazyLock::new(|| quoted("id"));
static NUMERIC_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"id: ([0-9]+)").expect("numeric id pattern is valid"));

/// Fields recognised in a legacy quest module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsQuestFields {
    pub name: Option<String>,
    pub description: Option<String>,
    pub difficulty: Option<String>,
    pub age_group: Option<String>,
    pub distance: Option<String>,
    /// First quoted `id: '…'`, else the first numeric `id: N`.
    pub id: Option<String>,
    /// Numeric `id:` occurrences; the quest's own id is one of them.
    pub numeric_ids: usize,
    /// `name: '` occurrences; the quest's own name is one of them.
    pub name_fields: usize,
}

impl JsQuestFields {
    pub fn parse(content: &str) -> Self {
        let first = |re: &Regex| re.captures(content).map(|c| c[1].to_string());
        Self {
            name: first(&NAME),
            description: first(&DESCRIPTION),
            difficulty: first(&DIFFICULTY),
            age_group: first(&AGE_GROUP),
            distance: first(&DISTANCE),
            id: first(&STRING_ID).or_else(|| first(&NUMERIC_ID)),
            numeric_ids: NUMERIC_ID.find_iter(content).count(),
            name_fields: content.matches("name: '").count(),
        }
    }

    /// Checkpoint count as seen by the catalogue listing.
    pub const fn checkpoint_count(&self) -> usize {
        self.numeric_ids.saturating_sub(1)
    }

    /// Checkpoint count as seen by the submitted-quests listing.
    pub const fn named_waypoint_count(&self) -> usize {
        self.name_fields.saturating_sub(1)
    }
}
