//! Calendar events and tasks.
//!
//! Structurally parallel to contacts: optionally created from an extraction
//! candidate, otherwise independent records with their own lifecycle.

use rusqlite::{params, OptionalExtension, Row};

use super::*;

impl Store {
    // =========================================================================
    // Calendar events
    // =========================================================================

    pub fn create_calendar_event(
        &self,
        user_id: i64,
        title: &str,
        event_date: Option<&str>,
        location: Option<&str>,
        notes: Option<&str>,
    ) -> Result<DbCalendarEvent, DbError> {
        let now = Self::now();
        self.conn.execute(
            "INSERT INTO calendar_events (user_id, title, event_date, location, notes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![user_id, title, event_date, location, notes, now],
        )?;
        Ok(DbCalendarEvent {
            id: self.conn.last_insert_rowid(),
            user_id,
            title: title.to_string(),
            event_date: event_date.map(str::to_string),
            location: location.map(str::to_string),
            notes: notes.map(str::to_string),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    pub fn get_calendar_event(
        &self,
        user_id: i64,
        event_id: i64,
    ) -> Result<Option<DbCalendarEvent>, DbError> {
        self.conn
            .query_row(
                "SELECT id, user_id, title, event_date, location, notes, created_at, updated_at
                 FROM calendar_events WHERE id = ?1 AND user_id = ?2",
                params![event_id, user_id],
                Self::map_event_row,
            )
            .optional()
            .map_err(DbError::from)
    }

    pub fn list_calendar_events(&self, user_id: i64) -> Result<Vec<DbCalendarEvent>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, title, event_date, location, notes, created_at, updated_at
             FROM calendar_events WHERE user_id = ?1
             ORDER BY COALESCE(event_date, created_at), id",
        )?;
        let rows = stmt.query_map(params![user_id], Self::map_event_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(DbError::from)
    }

    pub fn update_calendar_event(
        &self,
        user_id: i64,
        event_id: i64,
        title: &str,
        event_date: Option<&str>,
        location: Option<&str>,
        notes: Option<&str>,
    ) -> Result<bool, DbError> {
        let changed = self.conn.execute(
            "UPDATE calendar_events
             SET title = ?1, event_date = ?2, location = ?3, notes = ?4, updated_at = ?5
             WHERE id = ?6 AND user_id = ?7",
            params![title, event_date, location, notes, Self::now(), event_id, user_id],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_calendar_event(&self, user_id: i64, event_id: i64) -> Result<bool, DbError> {
        let changed = self.conn.execute(
            "DELETE FROM calendar_events WHERE id = ?1 AND user_id = ?2",
            params![event_id, user_id],
        )?;
        Ok(changed > 0)
    }

    // =========================================================================
    // Tasks
    // =========================================================================

    pub fn create_task(
        &self,
        user_id: i64,
        title: &str,
        due_date: Option<&str>,
        notes: Option<&str>,
    ) -> Result<DbTask, DbError> {
        let now = Self::now();
        self.conn.execute(
            "INSERT INTO tasks (user_id, title, due_date, notes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![user_id, title, due_date, notes, now],
        )?;
        Ok(DbTask {
            id: self.conn.last_insert_rowid(),
            user_id,
            title: title.to_string(),
            due_date: due_date.map(str::to_string),
            notes: notes.map(str::to_string),
            completed_at: None,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    pub fn get_task(&self, user_id: i64, task_id: i64) -> Result<Option<DbTask>, DbError> {
        self.conn
            .query_row(
                "SELECT id, user_id, title, due_date, notes, completed_at, created_at, updated_at
                 FROM tasks WHERE id = ?1 AND user_id = ?2",
                params![task_id, user_id],
                Self::map_task_row,
            )
            .optional()
            .map_err(DbError::from)
    }

    pub fn list_tasks(&self, user_id: i64) -> Result<Vec<DbTask>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, title, due_date, notes, completed_at, created_at, updated_at
             FROM tasks WHERE user_id = ?1
             ORDER BY completed_at IS NOT NULL, COALESCE(due_date, created_at), id",
        )?;
        let rows = stmt.query_map(params![user_id], Self::map_task_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(DbError::from)
    }

    pub fn update_task(
        &self,
        user_id: i64,
        task_id: i64,
        title: &str,
        due_date: Option<&str>,
        notes: Option<&str>,
    ) -> Result<bool, DbError> {
        let changed = self.conn.execute(
            "UPDATE tasks SET title = ?1, due_date = ?2, notes = ?3, updated_at = ?4
             WHERE id = ?5 AND user_id = ?6",
            params![title, due_date, notes, Self::now(), task_id, user_id],
        )?;
        Ok(changed > 0)
    }

    /// Mark a task complete. Completing an already-complete task keeps the
    /// original completion time.
    pub fn complete_task(&self, user_id: i64, task_id: i64) -> Result<bool, DbError> {
        let now = Self::now();
        let changed = self.conn.execute(
            "UPDATE tasks SET completed_at = COALESCE(completed_at, ?1), updated_at = ?1
             WHERE id = ?2 AND user_id = ?3",
            params![now, task_id, user_id],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_task(&self, user_id: i64, task_id: i64) -> Result<bool, DbError> {
        let changed = self.conn.execute(
            "DELETE FROM tasks WHERE id = ?1 AND user_id = ?2",
            params![task_id, user_id],
        )?;
        Ok(changed > 0)
    }

    fn map_event_row(row: &Row) -> rusqlite::Result<DbCalendarEvent> {
        Ok(DbCalendarEvent {
            id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            event_date: row.get(3)?,
            location: row.get(4)?,
            notes: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn map_task_row(row: &Row) -> rusqlite::Result<DbTask> {
        Ok(DbTask {
            id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            due_date: row.get(3)?,
            notes: row.get(4)?,
            completed_at: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::db::test_utils::{seed_user, test_db};

    #[test]
    fn test_task_lifecycle() {
        let db = test_db();
        let user_id = seed_user(&db, "Ada");
        let task = db
            .create_task(user_id, "Send the report", Some("2026-09-01"), None)
            .expect("create");
        assert!(task.completed_at.is_none());

        assert!(db.complete_task(user_id, task.id).expect("complete"));
        let done = db.get_task(user_id, task.id).expect("get").expect("present");
        let first_completed = done.completed_at.clone().expect("completed");

        // Completing again keeps the original timestamp
        assert!(db.complete_task(user_id, task.id).expect("complete again"));
        let again = db.get_task(user_id, task.id).expect("get").expect("present");
        assert_eq!(again.completed_at.as_deref(), Some(first_completed.as_str()));

        assert!(db.delete_task(user_id, task.id).expect("delete"));
        assert!(db.get_task(user_id, task.id).expect("get").is_none());
    }

    #[test]
    fn test_event_update_scoped_to_owner() {
        let db = test_db();
        let ada = seed_user(&db, "Ada");
        let bob = seed_user(&db, "Bob");
        let event = db
            .create_calendar_event(ada, "Review", Some("2026-09-02"), None, None)
            .expect("create");

        assert!(!db
            .update_calendar_event(bob, event.id, "Stolen", None, None, None)
            .expect("update"));
        assert!(db.get_calendar_event(bob, event.id).expect("get").is_none());
    }
}
