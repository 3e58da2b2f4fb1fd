//! Read-only views over the persisted graph.
//!
//! Pure functions of the rows: same graph in, same output out, no caching.

pub mod aggregate;
pub mod search;

pub use aggregate::{
    contacts_with_mention_count, conversations_for_user, frequent_contacts, ContactWithMentions,
    ConversationOverview, DEFAULT_FREQUENT_LIMIT,
};
pub use search::{search, SearchResults};
