//! ChatLedger core: entity reconciliation, linking, and aggregation over a
//! conversation graph.
//!
//! Raw text flows one direction: extraction adapter → reconciliation engine
//! → persisted links → aggregation layer. The pieces around that pipeline
//! (HTTP, rendering, the actual LLM/speech calls) are external collaborators
//! behind the traits in [`providers`].

pub mod db;
mod error;
pub mod extract;
mod migrations;
pub mod providers;
pub mod queries;
pub mod reconcile;
pub mod stream;
pub mod workflow;

pub use error::CoreError;
