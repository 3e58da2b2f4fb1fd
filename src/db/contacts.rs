use rusqlite::{params, OptionalExtension, Row};

use super::*;

impl Store {
    // =========================================================================
    // Contacts
    // =========================================================================

    /// Create a contact. Name validation (non-empty) happens at the engine
    /// boundary; the store persists what it is given.
    pub fn create_contact(
        &self,
        user_id: i64,
        name: &str,
        notes: Option<&str>,
    ) -> Result<DbContact, DbError> {
        let now = Self::now();
        self.conn.execute(
            "INSERT INTO contacts (user_id, name, notes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![user_id, name, notes, now],
        )?;
        Ok(DbContact {
            id: self.conn.last_insert_rowid(),
            user_id,
            name: name.to_string(),
            notes: notes.map(str::to_string),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Fetch a contact, scoped to its owner. A contact belonging to another
    /// user is indistinguishable from a missing one.
    pub fn get_contact(&self, user_id: i64, contact_id: i64) -> Result<Option<DbContact>, DbError> {
        self.conn
            .query_row(
                "SELECT id, user_id, name, notes, created_at, updated_at
                 FROM contacts WHERE id = ?1 AND user_id = ?2",
                params![contact_id, user_id],
                Self::map_contact_row,
            )
            .optional()
            .map_err(DbError::from)
    }

    pub fn list_contacts(&self, user_id: i64) -> Result<Vec<DbContact>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, name, notes, created_at, updated_at
             FROM contacts WHERE user_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![user_id], Self::map_contact_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(DbError::from)
    }

    /// Contacts whose stored name equals `name` case-insensitively.
    /// Exact match, not substring — this is the auto-resolution rule, and it
    /// is deliberately narrower than search's substring matching.
    pub fn find_contacts_by_name(&self, user_id: i64, name: &str) -> Result<Vec<DbContact>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, name, notes, created_at, updated_at
             FROM contacts WHERE user_id = ?1 AND LOWER(name) = LOWER(?2)
             ORDER BY id",
        )?;
        let rows = stmt.query_map(params![user_id, name], Self::map_contact_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(DbError::from)
    }

    /// Update a contact's name and notes. Returns false if the contact does
    /// not exist or is not owned by `user_id`.
    pub fn update_contact(
        &self,
        user_id: i64,
        contact_id: i64,
        name: &str,
        notes: Option<&str>,
    ) -> Result<bool, DbError> {
        let changed = self.conn.execute(
            "UPDATE contacts SET name = ?1, notes = ?2, updated_at = ?3
             WHERE id = ?4 AND user_id = ?5",
            params![name, notes, Self::now(), contact_id, user_id],
        )?;
        Ok(changed > 0)
    }

    /// Delete a contact; links cascade.
    pub fn delete_contact(&self, user_id: i64, contact_id: i64) -> Result<bool, DbError> {
        let changed = self.conn.execute(
            "DELETE FROM contacts WHERE id = ?1 AND user_id = ?2",
            params![contact_id, user_id],
        )?;
        Ok(changed > 0)
    }

    // =========================================================================
    // Contact links
    // =========================================================================

    /// Record that a contact was mentioned in a message (INSERT OR IGNORE).
    ///
    /// Returns true if a new link was created, false if the triple already
    /// existed. Re-detecting the same mention is a no-op, never an error.
    pub fn link_mention(&self, contact_id: i64, message_id: i64) -> Result<bool, DbError> {
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO contact_links (contact_id, message_id, relationship, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![contact_id, message_id, REL_MENTIONED, Self::now()],
        )?;
        Ok(changed > 0)
    }

    pub fn mention_link_exists(&self, contact_id: i64, message_id: i64) -> Result<bool, DbError> {
        self.conn
            .query_row(
                "SELECT EXISTS(
                    SELECT 1 FROM contact_links
                    WHERE contact_id = ?1 AND message_id = ?2 AND relationship = ?3
                 )",
                params![contact_id, message_id, REL_MENTIONED],
                |row| row.get(0),
            )
            .map_err(DbError::from)
    }

    pub fn links_for_contact(&self, contact_id: i64) -> Result<Vec<DbContactLink>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, contact_id, message_id, relationship, created_at
             FROM contact_links WHERE contact_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![contact_id], Self::map_link_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(DbError::from)
    }

    /// Count of links referencing a contact — the mention count.
    pub fn mention_count(&self, contact_id: i64) -> Result<i64, DbError> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM contact_links WHERE contact_id = ?1",
                params![contact_id],
                |row| row.get(0),
            )
            .map_err(DbError::from)
    }

    /// Distinct contacts linked to any message of a conversation, in id
    /// order. Used for mention highlighting.
    pub fn linked_contacts_for_conversation(
        &self,
        conversation_id: i64,
    ) -> Result<Vec<DbContact>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT c.id, c.user_id, c.name, c.notes, c.created_at, c.updated_at
             FROM contacts c
             JOIN contact_links cl ON cl.contact_id = c.id
             JOIN messages m ON m.id = cl.message_id
             WHERE m.conversation_id = ?1
             ORDER BY c.id",
        )?;
        let rows = stmt.query_map(params![conversation_id], Self::map_contact_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(DbError::from)
    }

    pub(crate) fn map_contact_row(row: &Row) -> rusqlite::Result<DbContact> {
        Ok(DbContact {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            notes: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    fn map_link_row(row: &Row) -> rusqlite::Result<DbContactLink> {
        Ok(DbContactLink {
            id: row.get(0)?,
            contact_id: row.get(1)?,
            message_id: row.get(2)?,
            relationship: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}
