use rusqlite::{params, OptionalExtension, Row};

use super::*;

impl Store {
    // =========================================================================
    // Conversations
    // =========================================================================

    pub fn create_conversation(&self, user_id: i64, title: &str) -> Result<DbConversation, DbError> {
        let now = Self::now();
        self.conn.execute(
            "INSERT INTO conversations (user_id, title, created_at) VALUES (?1, ?2, ?3)",
            params![user_id, title, now],
        )?;
        Ok(DbConversation {
            id: self.conn.last_insert_rowid(),
            user_id,
            title: title.to_string(),
            created_at: now,
        })
    }

    pub fn get_conversation(
        &self,
        user_id: i64,
        conversation_id: i64,
    ) -> Result<Option<DbConversation>, DbError> {
        self.conn
            .query_row(
                "SELECT id, user_id, title, created_at
                 FROM conversations WHERE id = ?1 AND user_id = ?2",
                params![conversation_id, user_id],
                Self::map_conversation_row,
            )
            .optional()
            .map_err(DbError::from)
    }

    pub fn list_conversations(&self, user_id: i64) -> Result<Vec<DbConversation>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, title, created_at
             FROM conversations WHERE user_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![user_id], Self::map_conversation_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(DbError::from)
    }

    /// Title is the only mutable conversation field.
    pub fn rename_conversation(
        &self,
        user_id: i64,
        conversation_id: i64,
        title: &str,
    ) -> Result<bool, DbError> {
        let changed = self.conn.execute(
            "UPDATE conversations SET title = ?1 WHERE id = ?2 AND user_id = ?3",
            params![title, conversation_id, user_id],
        )?;
        Ok(changed > 0)
    }

    // =========================================================================
    // Messages (append-only)
    // =========================================================================

    pub fn create_message(
        &self,
        conversation_id: i64,
        sender: Sender,
        content: &str,
    ) -> Result<DbMessage, DbError> {
        let now = Self::now();
        self.conn.execute(
            "INSERT INTO messages (conversation_id, sender, content, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![conversation_id, sender.as_str(), content, now],
        )?;
        Ok(DbMessage {
            id: self.conn.last_insert_rowid(),
            conversation_id,
            sender,
            content: content.to_string(),
            created_at: now,
        })
    }

    /// All messages of a conversation in insertion (= chronological) order.
    pub fn list_messages(&self, conversation_id: i64) -> Result<Vec<DbMessage>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, conversation_id, sender, content, created_at
             FROM messages WHERE conversation_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![conversation_id], Self::map_message_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(DbError::from)
    }

    pub fn get_message(&self, message_id: i64) -> Result<Option<DbMessage>, DbError> {
        self.conn
            .query_row(
                "SELECT id, conversation_id, sender, content, created_at
                 FROM messages WHERE id = ?1",
                params![message_id],
                Self::map_message_row,
            )
            .optional()
            .map_err(DbError::from)
    }

    /// The message with the maximum creation timestamp, or None if the
    /// conversation is empty. Timestamp ties break toward the later insert.
    pub fn last_message(&self, conversation_id: i64) -> Result<Option<DbMessage>, DbError> {
        self.conn
            .query_row(
                "SELECT id, conversation_id, sender, content, created_at
                 FROM messages WHERE conversation_id = ?1
                 ORDER BY created_at DESC, id DESC LIMIT 1",
                params![conversation_id],
                Self::map_message_row,
            )
            .optional()
            .map_err(DbError::from)
    }

    /// Count of distinct contacts linked to any message of the conversation.
    pub fn conversation_contact_count(&self, conversation_id: i64) -> Result<i64, DbError> {
        self.conn
            .query_row(
                "SELECT COUNT(DISTINCT cl.contact_id)
                 FROM contact_links cl
                 JOIN messages m ON m.id = cl.message_id
                 WHERE m.conversation_id = ?1",
                params![conversation_id],
                |row| row.get(0),
            )
            .map_err(DbError::from)
    }

    fn map_conversation_row(row: &Row) -> rusqlite::Result<DbConversation> {
        Ok(DbConversation {
            id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    pub(crate) fn map_message_row(row: &Row) -> rusqlite::Result<DbMessage> {
        let sender: String = row.get(2)?;
        Ok(DbMessage {
            id: row.get(0)?,
            conversation_id: row.get(1)?,
            sender: Sender::from_str_lossy(&sender),
            content: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}
