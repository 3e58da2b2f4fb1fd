use rusqlite::params;
use serde::Serialize;

use crate::db::{DbContact, DbConversation, DbError, Store};

/// Two disjoint result sets — conversations and contacts are never ranked
/// against each other.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub conversations: Vec<DbConversation>,
    pub contacts: Vec<DbContact>,
}

/// Case-insensitive substring search.
///
/// Conversations match on title OR any message content; the union carries no
/// duplicates. Contacts match independently on name or notes. An empty or
/// whitespace-only query matches nothing.
pub fn search(db: &Store, user_id: i64, query: &str) -> Result<SearchResults, DbError> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Ok(SearchResults::default());
    }

    // INSTR over LOWER() instead of LIKE: the query is user text, and LIKE
    // wildcards in it must not change the match semantics.
    let mut stmt = db.conn_ref().prepare(
        "SELECT DISTINCT cv.id, cv.user_id, cv.title, cv.created_at
         FROM conversations cv
         LEFT JOIN messages m ON m.conversation_id = cv.id
         WHERE cv.user_id = ?1
           AND (INSTR(LOWER(cv.title), ?2) > 0 OR INSTR(LOWER(m.content), ?2) > 0)
         ORDER BY cv.id",
    )?;
    let conversations = stmt
        .query_map(params![user_id, needle], |row| {
            Ok(DbConversation {
                id: row.get(0)?,
                user_id: row.get(1)?,
                title: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut stmt = db.conn_ref().prepare(
        "SELECT id, user_id, name, notes, created_at, updated_at
         FROM contacts
         WHERE user_id = ?1
           AND (INSTR(LOWER(name), ?2) > 0 OR INSTR(LOWER(COALESCE(notes, '')), ?2) > 0)
         ORDER BY id",
    )?;
    let contacts = stmt
        .query_map(params![user_id, needle], Store::map_contact_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(SearchResults {
        conversations,
        contacts,
    })
}

// =============================================================================
// Tests
// =============================================================================
