//! External collaborator seams.
//!
//! Everything the core calls out to — entity extraction, the assistant,
//! transcription, the audio device — lives behind one of these traits.
//! All of them may be slow, may fail, and may return nothing useful; the
//! workflows own the degradation policy (extraction failure becomes an empty
//! candidate list, assistant failure is reported without undoing the user's
//! message, transcription failure discards the capture). Timeouts are the
//! caller's responsibility and must surface as `ProviderError`s so they take
//! the same degradation path as any other failure.

use async_trait::async_trait;
use thiserror::Error;

use crate::db::DbMessage;
use crate::extract::ExtractedEntities;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("Provider timed out after {0} seconds")]
    Timeout(u64),

    #[error("Provider returned an unusable response: {0}")]
    BadResponse(String),
}

/// The text-understanding service: message text in, candidate entities out.
/// Non-deterministic, possibly empty, possibly wrong.
#[async_trait]
pub trait EntityExtractor: Send + Sync {
    async fn extract(&self, text: &str) -> Result<ExtractedEntities, ProviderError>;
}

/// The assistant backing the conversation. Gets the user's text plus the
/// prior messages of the conversation for context.
#[async_trait]
pub trait AssistantProvider: Send + Sync {
    async fn reply(&self, user_text: &str, prior: &[DbMessage]) -> Result<String, ProviderError>;
}

/// Speech-to-text over a finished audio capture.
#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    async fn transcribe(&self, audio: &[u8]) -> Result<String, ProviderError>;
}

/// Handle on the audio-capture resource. `release` must be callable from any
/// state, any number of times, and must free the device synchronously —
/// cancellation depends on it.
pub trait AudioCapture: Send {
    fn start(&mut self) -> Result<(), ProviderError>;

    /// Stop capturing and hand back the recorded bytes. `None` means nothing
    /// was captured (e.g. zero-length recording).
    fn stop(&mut self) -> Result<Option<Vec<u8>>, ProviderError>;

    fn release(&mut self);
}
