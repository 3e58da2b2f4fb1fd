use std::cmp::Reverse;

use rusqlite::params;
use serde::Serialize;

use crate::db::{DbContact, DbConversation, DbError, DbMessage, Store};

/// Default size of the "frequent contacts" strip.
pub const DEFAULT_FREQUENT_LIMIT: usize = 4;

/// A conversation annotated with its derived read-side values.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationOverview {
    #[serde(flatten)]
    pub conversation: DbConversation,
    pub last_message: Option<DbMessage>,
    /// Distinct contacts linked via this conversation's messages.
    pub contact_count: i64,
}

/// A contact annotated with its total mention count.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactWithMentions {
    #[serde(flatten)]
    pub contact: DbContact,
    pub mention_count: i64,
}

/// Every conversation owned by the user, each with `last_message` and
/// `contact_count`, sorted by recency of the last message. Conversations
/// with no messages sort after all that have them, newest-created first.
pub fn conversations_for_user(
    db: &Store,
    user_id: i64,
) -> Result<Vec<ConversationOverview>, DbError> {
    let mut overviews = Vec::new();
    for conversation in db.list_conversations(user_id)? {
        let last_message = db.last_message(conversation.id)?;
        let contact_count = db.conversation_contact_count(conversation.id)?;
        overviews.push(ConversationOverview {
            conversation,
            last_message,
            contact_count,
        });
    }

    // RFC 3339 strings compare lexicographically in time order.
    overviews.sort_by(|a, b| match (&a.last_message, &b.last_message) {
        (Some(x), Some(y)) => y.created_at.cmp(&x.created_at),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => b
            .conversation
            .created_at
            .cmp(&a.conversation.created_at)
            .then(b.conversation.id.cmp(&a.conversation.id)),
    });
    Ok(overviews)
}

/// Top `limit` contacts by total mention count, descending; ties break by
/// contact id ascending so the ranking is stable across calls.
pub fn frequent_contacts(
    db: &Store,
    user_id: i64,
    limit: usize,
) -> Result<Vec<ContactWithMentions>, DbError> {
    let mut stmt = db.conn_ref().prepare(
        "SELECT c.id, c.user_id, c.name, c.notes, c.created_at, c.updated_at,
                COUNT(cl.id) AS mention_count
         FROM contacts c
         JOIN contact_links cl ON cl.contact_id = c.id
         WHERE c.user_id = ?1
         GROUP BY c.id
         ORDER BY mention_count DESC, c.id ASC
         LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![user_id, limit as i64], map_contact_with_count)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(DbError::from)
}

/// All of a user's contacts annotated with mention counts, including those
/// never mentioned, count descending.
pub fn contacts_with_mention_count(
    db: &Store,
    user_id: i64,
) -> Result<Vec<ContactWithMentions>, DbError> {
    let mut stmt = db.conn_ref().prepare(
        "SELECT c.id, c.user_id, c.name, c.notes, c.created_at, c.updated_at,
                COUNT(cl.id) AS mention_count
         FROM contacts c
         LEFT JOIN contact_links cl ON cl.contact_id = c.id
         WHERE c.user_id = ?1
         GROUP BY c.id",
    )?;
    let rows = stmt.query_map(params![user_id], map_contact_with_count)?;
    let mut contacts = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    contacts.sort_by_key(|c| (Reverse(c.mention_count), c.contact.id));
    Ok(contacts)
}

fn map_contact_with_count(row: &rusqlite::Row) -> rusqlite::Result<ContactWithMentions> {
    Ok(ContactWithMentions {
        contact: DbContact {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            notes: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        },
        mention_count: row.get(6)?,
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::{seed_user, test_db};
    use crate::db::Sender;
    use rusqlite::params;

    /// Insert a message with an explicit timestamp; the sort contract tests
    /// need controlled clocks.
    fn message_at(db: &Store, conversation_id: i64, content: &str, created_at: &str) -> i64 {
        db.conn_ref()
            .execute(
                "INSERT INTO messages (conversation_id, sender, content, created_at)
                 VALUES (?1, 'user', ?2, ?3)",
                params![conversation_id, content, created_at],
            )
            .expect("insert message");
        db.conn_ref().last_insert_rowid()
    }

    #[test]
    fn test_conversation_sort_contract() {
        let db = test_db();
        let user_id = seed_user(&db, "Ada");

        // Last-message timestamps T3 > T1 > T2, plus one empty conversation.
        let c1 = db.create_conversation(user_id, "one").expect("c1");
        let c2 = db.create_conversation(user_id, "two").expect("c2");
        let c3 = db.create_conversation(user_id, "three").expect("c3");
        let empty = db.create_conversation(user_id, "empty").expect("empty");

        message_at(&db, c1.id, "t1", "2026-08-20T10:00:00+00:00");
        message_at(&db, c2.id, "t2", "2026-08-19T10:00:00+00:00");
        message_at(&db, c3.id, "t3", "2026-08-21T10:00:00+00:00");

        let overviews = conversations_for_user(&db, user_id).expect("overviews");
        let order: Vec<i64> = overviews.iter().map(|o| o.conversation.id).collect();
        assert_eq!(order, vec![c3.id, c1.id, c2.id, empty.id]);
        assert!(overviews[3].last_message.is_none());
    }

    #[test]
    fn test_empty_conversations_newest_first() {
        let db = test_db();
        let user_id = seed_user(&db, "Ada");
        let older = db.create_conversation(user_id, "older").expect("older");
        let newer = db.create_conversation(user_id, "newer").expect("newer");
        db.conn_ref()
            .execute(
                "UPDATE conversations SET created_at = ?1 WHERE id = ?2",
                params!["2026-08-01T00:00:00+00:00", older.id],
            )
            .expect("age older");
        db.conn_ref()
            .execute(
                "UPDATE conversations SET created_at = ?1 WHERE id = ?2",
                params!["2026-08-10T00:00:00+00:00", newer.id],
            )
            .expect("age newer");

        let overviews = conversations_for_user(&db, user_id).expect("overviews");
        let order: Vec<i64> = overviews.iter().map(|o| o.conversation.id).collect();
        assert_eq!(order, vec![newer.id, older.id]);
    }

    #[test]
    fn test_frequent_contacts_ranking_and_tie_break() {
        let db = test_db();
        let user_id = seed_user(&db, "Ada");
        let conv = db.create_conversation(user_id, "chat").expect("conv");

        let a = db.create_contact(user_id, "Alice", None).expect("a");
        let b = db.create_contact(user_id, "Bert", None).expect("b");
        let c = db.create_contact(user_id, "Cleo", None).expect("c");
        db.create_contact(user_id, "Dora", None).expect("never mentioned");

        for i in 0..3 {
            let m = db
                .create_message(conv.id, Sender::User, &format!("msg {}", i))
                .expect("msg");
            db.link_mention(b.id, m.id).expect("link b");
            if i < 2 {
                db.link_mention(c.id, m.id).expect("link c");
            }
            if i < 2 {
                db.link_mention(a.id, m.id).expect("link a");
            }
        }

        let top = frequent_contacts(&db, user_id, DEFAULT_FREQUENT_LIMIT).expect("top");
        // Bert 3 mentions; Alice and Cleo tie at 2 → id ascending
        let order: Vec<i64> = top.iter().map(|r| r.contact.id).collect();
        assert_eq!(order, vec![b.id, a.id, c.id]);
        assert_eq!(top[0].mention_count, 3);

        let limited = frequent_contacts(&db, user_id, 1).expect("limited");
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].contact.id, b.id);
    }

    #[test]
    fn test_contacts_with_mention_count_includes_zero() {
        let db = test_db();
        let user_id = seed_user(&db, "Ada");
        let conv = db.create_conversation(user_id, "chat").expect("conv");
        let a = db.create_contact(user_id, "Alice", None).expect("a");
        let d = db.create_contact(user_id, "Dora", None).expect("d");
        let m = db.create_message(conv.id, Sender::User, "Alice").expect("m");
        db.link_mention(a.id, m.id).expect("link");

        let all = contacts_with_mention_count(&db, user_id).expect("all");
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].contact.id, a.id);
        assert_eq!(all[0].mention_count, 1);
        assert_eq!(all[1].contact.id, d.id);
        assert_eq!(all[1].mention_count, 0);
    }

    #[test]
    fn test_aggregations_deterministic_across_calls() {
        let db = test_db();
        let user_id = seed_user(&db, "Ada");
        let conv = db.create_conversation(user_id, "chat").expect("conv");
        let a = db.create_contact(user_id, "Alice", None).expect("a");
        let m = db.create_message(conv.id, Sender::User, "Alice").expect("m");
        db.link_mention(a.id, m.id).expect("link");

        let first = serde_json::to_string(&(
            conversations_for_user(&db, user_id).expect("conv 1"),
            frequent_contacts(&db, user_id, DEFAULT_FREQUENT_LIMIT).expect("freq 1"),
            contacts_with_mention_count(&db, user_id).expect("all 1"),
        ))
        .expect("serialize");
        let second = serde_json::to_string(&(
            conversations_for_user(&db, user_id).expect("conv 2"),
            frequent_contacts(&db, user_id, DEFAULT_FREQUENT_LIMIT).expect("freq 2"),
            contacts_with_mention_count(&db, user_id).expect("all 2"),
        ))
        .expect("serialize");
        assert_eq!(first, second);
    }
}
