//! Reconciliation engine.
//!
//! Turns extraction output for one message into contact links, without ever
//! creating duplicate contacts or duplicate links, and without forcing the
//! user to resolve every candidate synchronously. The auto-resolution rule
//! is case-insensitive *exact* name equality; search and highlighting use
//! case-insensitive *substring* matching. The asymmetry is deliberate —
//! unifying them would change which candidates auto-resolve versus require
//! confirmation.

use serde::Serialize;

use crate::db::{DbContact, DbContactLink, DbMessage, Store};
use crate::error::CoreError;
use crate::extract::{EventCandidate, ExtractedEntities, PersonCandidate, TaskCandidate};

/// A person candidate the engine could not map to exactly one contact.
/// `matches` carries the ambiguous contacts (empty for an unknown name) so
/// the caller can offer merge targets without a second lookup.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnresolvedCandidate {
    pub name: String,
    pub context_info: Option<String>,
    pub matches: Vec<DbContact>,
}

/// Result of reconciling one message.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileOutcome {
    /// Contacts that resolved unambiguously and are now linked to the message.
    pub linked: Vec<DbContact>,
    /// How many of those links were newly created (the rest already existed).
    pub new_links: usize,
    pub unresolved: Vec<UnresolvedCandidate>,
    /// Event/task candidates pass through untouched for explicit confirmation.
    pub detected_events: Vec<EventCandidate>,
    pub detected_tasks: Vec<TaskCandidate>,
}

/// Outcome of an explicit "save as new" resolution.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedContact {
    pub contact: DbContact,
    /// The message the new contact was linked to, if any message in the
    /// conversation contains the name.
    pub linked_message_id: Option<i64>,
}

/// Reconcile extraction output against the contact store.
///
/// For each person candidate: exactly one contact with the same name
/// (case-insensitive, exact) ⇒ resolved, linked idempotently; zero or
/// multiple ⇒ unresolved, surfaced for user decision. Running this twice
/// for the same message never adds a second link.
pub fn reconcile_message(
    db: &Store,
    user_id: i64,
    message: &DbMessage,
    entities: &ExtractedEntities,
) -> Result<ReconcileOutcome, CoreError> {
    // Ownership gate: the message must belong to one of the user's
    // conversations.
    db.get_conversation(user_id, message.conversation_id)?
        .ok_or_else(|| CoreError::not_found("conversation", message.conversation_id))?;

    let mut outcome = ReconcileOutcome {
        detected_events: entities.events.clone(),
        detected_tasks: entities.tasks.clone(),
        ..Default::default()
    };

    for candidate in &entities.people {
        let mut matches = db.find_contacts_by_name(user_id, &candidate.name)?;
        if matches.len() == 1 {
            let contact = matches.remove(0);
            if db.link_mention(contact.id, message.id)? {
                outcome.new_links += 1;
                log::debug!(
                    "Linked contact {} to message {} (candidate '{}')",
                    contact.id,
                    message.id,
                    candidate.name
                );
            }
            outcome.linked.push(contact);
        } else {
            log::debug!(
                "Candidate '{}' unresolved ({} name matches)",
                candidate.name,
                matches.len()
            );
            outcome.unresolved.push(UnresolvedCandidate {
                name: candidate.name.clone(),
                context_info: candidate.context_info.clone(),
                matches,
            });
        }
    }

    Ok(outcome)
}

/// Resolve an unresolved candidate as a brand-new contact.
///
/// Creates the contact, then links it to the *first* message in the
/// conversation whose content contains the name as a case-insensitive
/// substring. No containing message means no link — the contact still
/// exists because the user explicitly asked for it.
pub fn save_as_new(
    db: &Store,
    user_id: i64,
    conversation_id: i64,
    candidate: &PersonCandidate,
) -> Result<SavedContact, CoreError> {
    let name = candidate.name.trim();
    if name.is_empty() {
        return Err(CoreError::Validation("contact name must not be empty".into()));
    }
    db.get_conversation(user_id, conversation_id)?
        .ok_or_else(|| CoreError::not_found("conversation", conversation_id))?;

    let contact = db.create_contact(user_id, name, candidate.context_info.as_deref())?;

    let needle = name.to_lowercase();
    let linked_message_id = db
        .list_messages(conversation_id)?
        .iter()
        .find(|m| m.content.to_lowercase().contains(&needle))
        .map(|m| m.id);

    if let Some(message_id) = linked_message_id {
        db.link_mention(contact.id, message_id)?;
        log::info!(
            "Saved new contact '{}' ({}) linked to message {}",
            contact.name,
            contact.id,
            message_id
        );
    } else {
        log::info!(
            "Saved new contact '{}' ({}) with no mentioning message",
            contact.name,
            contact.id
        );
    }

    Ok(SavedContact {
        contact,
        linked_message_id,
    })
}

/// Resolve an unresolved candidate by merging into an existing contact:
/// idempotently link that contact to the mentioning message. Returns the
/// link row (pre-existing or new).
pub fn merge_with_existing(
    db: &Store,
    user_id: i64,
    contact_id: i64,
    message_id: i64,
) -> Result<DbContactLink, CoreError> {
    let contact = db
        .get_contact(user_id, contact_id)?
        .ok_or_else(|| CoreError::not_found("contact", contact_id))?;
    let message = db
        .get_message(message_id)?
        .ok_or_else(|| CoreError::not_found("message", message_id))?;
    db.get_conversation(user_id, message.conversation_id)?
        .ok_or_else(|| CoreError::not_found("message", message_id))?;

    db.link_mention(contact.id, message.id)?;

    // The link exists now unless a concurrent delete raced us; treat that
    // like the message vanishing.
    db.links_for_contact(contact.id)?
        .into_iter()
        .find(|l| l.message_id == message.id)
        .ok_or_else(|| CoreError::not_found("message", message_id))
}

// =============================================================================
// Mention highlighting
// =============================================================================

/// One span of message text, attributed to a contact or plain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MentionSegment {
    pub text: String,
    pub contact_id: Option<i64>,
}

/// Segment message text around contact-name mentions, case-insensitively,
/// without overlap. Longer names claim their spans first, so "Jon" can never
/// pre-empt "Jonathan Smith". Presentation-only; nothing here persists.
pub fn segment_mentions(text: &str, contacts: &[DbContact]) -> Vec<MentionSegment> {
    if text.is_empty() || contacts.is_empty() {
        return vec![MentionSegment {
            text: text.to_string(),
            contact_id: None,
        }];
    }

    // Case-fold the haystack once, keeping a map from folded byte offsets
    // back to original byte offsets so slicing stays on char boundaries.
    let mut folded = String::new();
    let mut origin: Vec<usize> = Vec::with_capacity(text.len());
    for (idx, ch) in text.char_indices() {
        for lc in ch.to_lowercase() {
            let before = folded.len();
            folded.push(lc);
            origin.extend(std::iter::repeat(idx).take(folded.len() - before));
        }
    }

    // Longest folded name first; ties by id so duplicate names resolve
    // deterministically to the older contact.
    let mut ordered: Vec<(&DbContact, String)> = contacts
        .iter()
        .map(|c| (c, c.name.to_lowercase()))
        .filter(|(_, folded_name)| !folded_name.is_empty())
        .collect();
    ordered.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then(a.0.id.cmp(&b.0.id)));

    // Claimed spans in folded-byte coordinates.
    let mut claims: Vec<(usize, usize, i64)> = Vec::new();
    for (contact, needle) in &ordered {
        let mut from = 0;
        while let Some(pos) = folded[from..].find(needle.as_str()) {
            let start = from + pos;
            let end = start + needle.len();
            if !claims.iter().any(|(s, e, _)| start < *e && *s < end) {
                claims.push((start, end, contact.id));
            }
            from = end;
        }
    }
    claims.sort_by_key(|(start, _, _)| *start);

    let orig = |folded_idx: usize| -> usize {
        if folded_idx < origin.len() {
            origin[folded_idx]
        } else {
            text.len()
        }
    };

    let mut segments = Vec::new();
    let mut cursor = 0usize;
    for (start, end, contact_id) in claims {
        let (o_start, o_end) = (orig(start), orig(end));
        if o_start > cursor {
            segments.push(MentionSegment {
                text: text[cursor..o_start].to_string(),
                contact_id: None,
            });
        }
        segments.push(MentionSegment {
            text: text[o_start..o_end].to_string(),
            contact_id: Some(contact_id),
        });
        cursor = o_end;
    }
    if cursor < text.len() {
        segments.push(MentionSegment {
            text: text[cursor..].to_string(),
            contact_id: None,
        });
    }
    segments
}

// =============================================================================
// Tests
// =============================================================================
