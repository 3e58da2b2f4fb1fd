//! Crate error taxonomy.
//!
//! Four failure classes exist, and only two of them are `CoreError`s:
//! validation and not-found are rejected before (or instead of) persistence;
//! external-provider failure is degradation handled inside the workflows;
//! duplicate-link attempts are no-ops at the store level. Nothing here is
//! fatal to the process — every failure is scoped to one operation.

use thiserror::Error;

use crate::db::DbError;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Rejected before any persistence (empty contact name, empty message).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The record doesn't exist or isn't owned by the requesting user.
    /// The two conditions are deliberately indistinguishable.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: i64 },

    /// A workflow method was called in a state it doesn't accept.
    #[error("Invalid workflow state: expected {expected}, was {actual}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Database error: {0}")]
    Db(#[from] DbError),
}

impl CoreError {
    pub fn not_found(kind: &'static str, id: i64) -> Self {
        CoreError::NotFound { kind, id }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::NotFound { .. })
    }
}
