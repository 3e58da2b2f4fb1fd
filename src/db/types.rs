//! Row structs and error type for the SQLite store.
//!
//! Every struct here is a direct projection of one table row. Derived values
//! (mention counts, last messages) live in `queries/`, never here.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Failed to create database directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Schema migration failed: {0}")]
    Migration(String),
}

/// Sender tag on a message. Stored as lowercase TEXT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Assistant => "assistant",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "assistant" => Sender::Assistant,
            _ => Sender::User,
        }
    }
}

/// Relationship tag on a contact link. Only one value exists today; the
/// column is TEXT so a future tag doesn't need a migration.
pub const REL_MENTIONED: &str = "mentioned";

/// A row from the `users` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbUser {
    pub id: i64,
    pub display_name: String,
    /// "user" or "admin"
    pub role: String,
    pub created_at: String,
}

/// A row from the `contacts` table.
///
/// Names are not unique — two contacts may share a name; disambiguation is
/// by id only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbContact {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A row from the `conversations` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbConversation {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub created_at: String,
}

/// A row from the `messages` table. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbMessage {
    pub id: i64,
    pub conversation_id: i64,
    pub sender: Sender,
    pub content: String,
    pub created_at: String,
}

/// A row from the `contact_links` table: one contact referenced by one
/// message. The (contact_id, message_id, relationship) triple is UNIQUE.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbContactLink {
    pub id: i64,
    pub contact_id: i64,
    pub message_id: i64,
    pub relationship: String,
    pub created_at: String,
}

/// A row from the `calendar_events` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbCalendarEvent {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub event_date: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A row from the `tasks` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbTask {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub due_date: Option<String>,
    pub notes: Option<String>,
    pub completed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}
