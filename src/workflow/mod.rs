//! Session workflows.
//!
//! Two independent state machines: the message-send sequence here, and the
//! capture/transcribe/confirm machine in [`capture`]. Both suspend only at
//! external round trips; the store itself is synchronous and callers own any
//! locking around it (no store lock is ever held across an await).

pub mod capture;

use serde::Serialize;

use crate::db::{DbMessage, Sender, Store};
use crate::error::CoreError;
use crate::extract::ExtractedEntities;
use crate::providers::{AssistantProvider, EntityExtractor};
use crate::reconcile::{self, ReconcileOutcome};

pub const DEFAULT_CONVERSATION_TITLE: &str = "New conversation";

/// Auto-generated titles keep the first words of the opening message up to
/// this many characters.
const AUTO_TITLE_MAX_CHARS: usize = 48;

/// Everything the caller gets back from one send: the durably stored user
/// message, the assistant's reply (or the reason there isn't one), and the
/// reconciliation outcome for the user's text.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOutcome {
    pub conversation_id: i64,
    pub user_message: DbMessage,
    pub assistant_message: Option<DbMessage>,
    /// Populated when the assistant call failed. The user message above is
    /// still persisted — the workflow never rolls it back.
    pub assistant_error: Option<String>,
    pub reconciliation: ReconcileOutcome,
}

/// Run the message-send workflow.
///
/// Sequence: bind or create the conversation, persist the user message,
/// invoke the assistant, persist its reply, then run extraction +
/// reconciliation on the *user* message's content only — assistant replies
/// are never scanned for contacts. Extraction failure degrades to "no
/// candidates"; assistant failure is reported in the outcome.
pub async fn send_message(
    db: &Store,
    assistant: &dyn AssistantProvider,
    extractor: &dyn EntityExtractor,
    user_id: i64,
    conversation_id: Option<i64>,
    text: &str,
) -> Result<SendOutcome, CoreError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(CoreError::Validation("message text must not be empty".into()));
    }

    let conversation = match conversation_id {
        Some(id) => db
            .get_conversation(user_id, id)?
            .ok_or_else(|| CoreError::not_found("conversation", id))?,
        None => {
            let conversation = db.create_conversation(user_id, &auto_title(text))?;
            log::info!(
                "Created conversation {} for user {}",
                conversation.id,
                user_id
            );
            conversation
        }
    };

    // Prior messages are the assistant's context; captured before the user
    // message is appended.
    let prior = db.list_messages(conversation.id)?;

    let user_message = db.create_message(conversation.id, Sender::User, text)?;

    let (assistant_message, assistant_error) = match assistant.reply(text, &prior).await {
        Ok(reply) => {
            let message = db.create_message(conversation.id, Sender::Assistant, &reply)?;
            (Some(message), None)
        }
        Err(e) => {
            log::warn!(
                "Assistant call failed for conversation {}: {}",
                conversation.id,
                e
            );
            (None, Some(e.to_string()))
        }
    };

    let entities = match extractor.extract(text).await {
        Ok(entities) => entities,
        Err(e) => {
            log::warn!("Entity extraction failed, continuing without candidates: {}", e);
            ExtractedEntities::default()
        }
    };

    let reconciliation = reconcile::reconcile_message(db, user_id, &user_message, &entities)?;

    Ok(SendOutcome {
        conversation_id: conversation.id,
        user_message,
        assistant_message,
        assistant_error,
        reconciliation,
    })
}

/// First words of the text, capped at `AUTO_TITLE_MAX_CHARS` chars.
fn auto_title(text: &str) -> String {
    let mut title = String::new();
    for word in text.split_whitespace() {
        let next_len = if title.is_empty() {
            word.chars().count()
        } else {
            title.chars().count() + 1 + word.chars().count()
        };
        if next_len > AUTO_TITLE_MAX_CHARS {
            break;
        }
        if !title.is_empty() {
            title.push(' ');
        }
        title.push_str(word);
    }
    if title.is_empty() {
        // Single overlong word: hard cut on a char boundary
        title = text.chars().take(AUTO_TITLE_MAX_CHARS).collect();
    }
    if title.is_empty() {
        title = DEFAULT_CONVERSATION_TITLE.to_string();
    }
    title
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod test_providers {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::db::DbMessage;
    use crate::extract::ExtractedEntities;
    use crate::providers::{
        AssistantProvider, EntityExtractor, ProviderError, TranscriptionProvider,
    };

    pub struct MockAssistant {
        pub reply: Option<String>,
        pub calls: Mutex<usize>,
    }

    impl MockAssistant {
        pub fn replying(text: &str) -> Self {
            Self {
                reply: Some(text.to_string()),
                calls: Mutex::new(0),
            }
        }

        pub fn failing() -> Self {
            Self {
                reply: None,
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl AssistantProvider for MockAssistant {
        async fn reply(
            &self,
            _user_text: &str,
            _prior: &[DbMessage],
        ) -> Result<String, ProviderError> {
            *self.calls.lock().unwrap() += 1;
            self.reply
                .clone()
                .ok_or_else(|| ProviderError::Unavailable("assistant down".into()))
        }
    }

    /// Records every text it is asked to scan, so tests can assert assistant
    /// replies never reach extraction.
    pub struct MockExtractor {
        pub entities: Option<ExtractedEntities>,
        pub scanned: Mutex<Vec<String>>,
    }

    impl MockExtractor {
        pub fn returning(entities: ExtractedEntities) -> Self {
            Self {
                entities: Some(entities),
                scanned: Mutex::new(Vec::new()),
            }
        }

        pub fn empty() -> Self {
            Self::returning(ExtractedEntities::default())
        }

        pub fn failing() -> Self {
            Self {
                entities: None,
                scanned: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl EntityExtractor for MockExtractor {
        async fn extract(&self, text: &str) -> Result<ExtractedEntities, ProviderError> {
            self.scanned.lock().unwrap().push(text.to_string());
            self.entities
                .clone()
                .ok_or_else(|| ProviderError::Timeout(30))
        }
    }

    pub struct MockTranscriber {
        pub transcript: Option<String>,
    }

    #[async_trait]
    impl TranscriptionProvider for MockTranscriber {
        async fn transcribe(&self, _audio: &[u8]) -> Result<String, ProviderError> {
            self.transcript
                .clone()
                .ok_or_else(|| ProviderError::BadResponse("unintelligible".into()))
        }
    }
}
