use rusqlite::{params, OptionalExtension, Row};

use super::*;

impl Store {
    // =========================================================================
    // Users
    // =========================================================================

    /// Create a user. `role` is "user" or "admin".
    pub fn create_user(&self, display_name: &str, role: &str) -> Result<DbUser, DbError> {
        let now = Self::now();
        self.conn.execute(
            "INSERT INTO users (display_name, role, created_at) VALUES (?1, ?2, ?3)",
            params![display_name, role, now],
        )?;
        let id = self.conn.last_insert_rowid();
        Ok(DbUser {
            id,
            display_name: display_name.to_string(),
            role: role.to_string(),
            created_at: now,
        })
    }

    pub fn get_user(&self, user_id: i64) -> Result<Option<DbUser>, DbError> {
        self.conn
            .query_row(
                "SELECT id, display_name, role, created_at FROM users WHERE id = ?1",
                params![user_id],
                Self::map_user_row,
            )
            .optional()
            .map_err(DbError::from)
    }

    fn map_user_row(row: &Row) -> rusqlite::Result<DbUser> {
        Ok(DbUser {
            id: row.get(0)?,
            display_name: row.get(1)?,
            role: row.get(2)?,
            created_at: row.get(3)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::db::test_utils::test_db;

    #[test]
    fn test_create_and_get_user() {
        let db = test_db();
        let user = db.create_user("Ada", "admin").expect("create");
        let fetched = db.get_user(user.id).expect("get").expect("present");
        assert_eq!(fetched.display_name, "Ada");
        assert_eq!(fetched.role, "admin");
    }

    #[test]
    fn test_get_missing_user_is_none() {
        let db = test_db();
        assert!(db.get_user(999).expect("get").is_none());
    }
}
