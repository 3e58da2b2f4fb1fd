//! Candidate types and the untrusted-payload boundary.
//!
//! The extraction service returns loosely-shaped JSON (it is an LLM call
//! upstream). Nothing from that payload enters the reconciliation engine
//! until it has been coerced into the strict types here: junk entries are
//! dropped, never errors. The expected shape is
//! `{"people":[{"name":..,"contextInfo"?:..}],"events":[..],"tasks":[..]}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A person proposed by the extraction service. Unconfirmed until the
/// reconciliation engine resolves it or the user decides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonCandidate {
    pub name: String,
    /// Free-text context from the surrounding message ("from Acme").
    pub context_info: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventCandidate {
    pub title: String,
    pub date: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCandidate {
    pub title: String,
    pub due_date: Option<String>,
}

/// Strictly-typed extraction output. `Default` is the degraded "no
/// candidates" value used whenever the extraction call fails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractedEntities {
    pub people: Vec<PersonCandidate>,
    pub events: Vec<EventCandidate>,
    pub tasks: Vec<TaskCandidate>,
}

impl ExtractedEntities {
    pub fn is_empty(&self) -> bool {
        self.people.is_empty() && self.events.is_empty() && self.tasks.is_empty()
    }
}

/// Coerce a raw extraction payload into strict candidates.
///
/// Lenient by design: missing arrays are empty, non-object entries and
/// entries without a usable name/title are dropped, strings are trimmed.
/// People are de-duplicated case-insensitively within the payload so one
/// message can't propose the same name twice.
pub fn candidates_from_value(raw: &Value) -> ExtractedEntities {
    let mut out = ExtractedEntities::default();
    let mut seen_names: Vec<String> = Vec::new();

    for entry in array_field(raw, "people") {
        let Some(name) = string_field(entry, &["name"]) else {
            continue;
        };
        let folded = name.to_lowercase();
        if seen_names.contains(&folded) {
            continue;
        }
        seen_names.push(folded);
        out.people.push(PersonCandidate {
            name,
            context_info: string_field(entry, &["contextInfo", "context"]),
        });
    }

    for entry in array_field(raw, "events") {
        let Some(title) = string_field(entry, &["title", "name"]) else {
            continue;
        };
        out.events.push(EventCandidate {
            title,
            date: string_field(entry, &["date", "eventDate"]),
            location: string_field(entry, &["location"]),
        });
    }

    for entry in array_field(raw, "tasks") {
        let Some(title) = string_field(entry, &["title", "name", "description"]) else {
            continue;
        };
        out.tasks.push(TaskCandidate {
            title,
            due_date: string_field(entry, &["dueDate", "due"]),
        });
    }

    out
}

fn array_field<'a>(raw: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    raw.get(key)
        .and_then(Value::as_array)
        .map(|a| a.iter())
        .unwrap_or_default()
}

/// First non-empty trimmed string among the given keys.
fn string_field(entry: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        entry
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}
