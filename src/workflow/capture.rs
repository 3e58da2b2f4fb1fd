//! Voice capture state machine.
//!
//! `Idle → Recording → Transcribing → ConfirmReview → Idle`, with explicit
//! cancellation from any state. Stopping a recording always triggers
//! transcription when audio was captured; transcription failure discards the
//! capture and returns to Idle. The transcript is staged (editable, not
//! persisted) until the user confirms, at which point the message-send
//! workflow runs with the edited text. Cancellation releases the audio
//! resource synchronously no matter which state it arrives in.

use crate::db::Store;
use crate::error::CoreError;
use crate::providers::{AssistantProvider, AudioCapture, EntityExtractor, TranscriptionProvider};
use crate::workflow::{send_message, SendOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Recording,
    Transcribing,
    ConfirmReview,
}

impl CaptureState {
    fn as_str(&self) -> &'static str {
        match self {
            CaptureState::Idle => "idle",
            CaptureState::Recording => "recording",
            CaptureState::Transcribing => "transcribing",
            CaptureState::ConfirmReview => "confirmReview",
        }
    }
}

pub struct CaptureWorkflow {
    audio: Box<dyn AudioCapture>,
    state: CaptureState,
    /// Staged transcript, present only in ConfirmReview.
    transcript: Option<String>,
}

impl CaptureWorkflow {
    pub fn new(audio: Box<dyn AudioCapture>) -> Self {
        Self {
            audio,
            state: CaptureState::Idle,
            transcript: None,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// The staged transcript while in ConfirmReview.
    pub fn transcript(&self) -> Option<&str> {
        self.transcript.as_deref()
    }

    fn expect_state(&self, expected: CaptureState) -> Result<(), CoreError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(CoreError::InvalidState {
                expected: expected.as_str(),
                actual: self.state.as_str(),
            })
        }
    }

    /// Begin recording. Idle only.
    pub fn start(&mut self) -> Result<(), CoreError> {
        self.expect_state(CaptureState::Idle)?;
        self.audio
            .start()
            .map_err(|e| CoreError::Validation(format!("audio capture failed to start: {}", e)))?;
        self.state = CaptureState::Recording;
        Ok(())
    }

    /// Stop recording. Transcription is automatic — stopping always
    /// transcribes if any audio was captured. Returns the resulting state:
    /// ConfirmReview on success, Idle when nothing was captured or the
    /// transcription failed (the capture is discarded either way).
    pub async fn stop(
        &mut self,
        transcriber: &dyn TranscriptionProvider,
    ) -> Result<CaptureState, CoreError> {
        self.expect_state(CaptureState::Recording)?;

        let audio = match self.audio.stop() {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("Audio capture stop failed: {}", e);
                None
            }
        };
        // Bytes are in hand (or lost); the device is no longer needed.
        self.audio.release();

        let Some(audio) = audio.filter(|a| !a.is_empty()) else {
            log::info!("Capture stopped with no audio, returning to idle");
            self.state = CaptureState::Idle;
            return Ok(self.state);
        };

        self.state = CaptureState::Transcribing;
        match transcriber.transcribe(&audio).await {
            Ok(text) => {
                self.transcript = Some(text);
                self.state = CaptureState::ConfirmReview;
            }
            Err(e) => {
                log::warn!("Transcription failed, discarding capture: {}", e);
                self.state = CaptureState::Idle;
            }
        }
        Ok(self.state)
    }

    /// Replace the staged transcript. ConfirmReview only; nothing persists
    /// until confirm.
    pub fn edit_transcript(&mut self, text: &str) -> Result<(), CoreError> {
        self.expect_state(CaptureState::ConfirmReview)?;
        self.transcript = Some(text.to_string());
        Ok(())
    }

    /// Confirm the (possibly edited) transcript: runs the message-send
    /// workflow with it. On success the machine returns to Idle; on failure
    /// it stays in ConfirmReview so the staged text isn't lost.
    pub async fn confirm(
        &mut self,
        db: &Store,
        assistant: &dyn AssistantProvider,
        extractor: &dyn EntityExtractor,
        user_id: i64,
        conversation_id: Option<i64>,
    ) -> Result<SendOutcome, CoreError> {
        self.expect_state(CaptureState::ConfirmReview)?;
        let text = self.transcript.clone().unwrap_or_default();

        let outcome =
            send_message(db, assistant, extractor, user_id, conversation_id, &text).await?;

        self.transcript = None;
        self.state = CaptureState::Idle;
        Ok(outcome)
    }

    /// Cancel from any state. Releases the audio resource synchronously and
    /// drops any staged transcript. Cancelling while Idle is a no-op.
    pub fn cancel(&mut self) {
        if self.state != CaptureState::Idle {
            log::info!("Capture cancelled from {}", self.state.as_str());
        }
        self.audio.release();
        self.transcript = None;
        self.state = CaptureState::Idle;
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::db::test_utils::{seed_user, test_db};
    use crate::providers::ProviderError;
    use crate::workflow::test_providers::{MockAssistant, MockExtractor, MockTranscriber};

    struct MockAudio {
        bytes: Option<Vec<u8>>,
        released: Arc<AtomicBool>,
    }

    impl MockAudio {
        fn with_audio() -> (Box<Self>, Arc<AtomicBool>) {
            let released = Arc::new(AtomicBool::new(false));
            (
                Box::new(Self {
                    bytes: Some(vec![1, 2, 3]),
                    released: released.clone(),
                }),
                released,
            )
        }

        fn silent() -> (Box<Self>, Arc<AtomicBool>) {
            let released = Arc::new(AtomicBool::new(false));
            (
                Box::new(Self {
                    bytes: None,
                    released: released.clone(),
                }),
                released,
            )
        }
    }

    impl AudioCapture for MockAudio {
        fn start(&mut self) -> Result<(), ProviderError> {
            Ok(())
        }

        fn stop(&mut self) -> Result<Option<Vec<u8>>, ProviderError> {
            Ok(self.bytes.take())
        }

        fn release(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    fn transcriber(text: &str) -> MockTranscriber {
        MockTranscriber {
            transcript: Some(text.to_string()),
        }
    }

    #[tokio::test]
    async fn test_happy_path_to_confirm_review() {
        let (audio, _released) = MockAudio::with_audio();
        let mut workflow = CaptureWorkflow::new(audio);
        assert_eq!(workflow.state(), CaptureState::Idle);

        workflow.start().expect("start");
        assert_eq!(workflow.state(), CaptureState::Recording);

        let state = workflow.stop(&transcriber("note to self")).await.expect("stop");
        assert_eq!(state, CaptureState::ConfirmReview);
        assert_eq!(workflow.transcript(), Some("note to self"));
    }

    #[tokio::test]
    async fn test_transcription_failure_returns_to_idle() {
        let (audio, released) = MockAudio::with_audio();
        let mut workflow = CaptureWorkflow::new(audio);
        workflow.start().expect("start");

        let failing = MockTranscriber { transcript: None };
        let state = workflow.stop(&failing).await.expect("stop");
        assert_eq!(state, CaptureState::Idle);
        assert!(workflow.transcript().is_none());
        assert!(released.load(Ordering::SeqCst), "device freed after stop");
    }

    #[tokio::test]
    async fn test_empty_capture_skips_transcription() {
        let (audio, _released) = MockAudio::silent();
        let mut workflow = CaptureWorkflow::new(audio);
        workflow.start().expect("start");

        let state = workflow.stop(&transcriber("unused")).await.expect("stop");
        assert_eq!(state, CaptureState::Idle);
    }

    #[tokio::test]
    async fn test_edit_then_confirm_sends_edited_text() {
        let db = test_db();
        let user_id = seed_user(&db, "Ada");
        let (audio, _released) = MockAudio::with_audio();
        let mut workflow = CaptureWorkflow::new(audio);

        workflow.start().expect("start");
        workflow.stop(&transcriber("raw transcript")).await.expect("stop");
        workflow.edit_transcript("polished transcript").expect("edit");

        let assistant = MockAssistant::replying("got it");
        let extractor = MockExtractor::empty();
        let outcome = workflow
            .confirm(&db, &assistant, &extractor, user_id, None)
            .await
            .expect("confirm");

        assert_eq!(outcome.user_message.content, "polished transcript");
        assert_eq!(workflow.state(), CaptureState::Idle);
        assert!(workflow.transcript().is_none());
    }

    #[tokio::test]
    async fn test_confirm_failure_stays_in_review() {
        let db = test_db();
        // No user seeded: send will fail on the unknown conversation id
        let (audio, _released) = MockAudio::with_audio();
        let mut workflow = CaptureWorkflow::new(audio);
        workflow.start().expect("start");
        workflow.stop(&transcriber("text")).await.expect("stop");

        let assistant = MockAssistant::replying("never");
        let extractor = MockExtractor::empty();
        let err = workflow
            .confirm(&db, &assistant, &extractor, 1, Some(99))
            .await
            .expect_err("unknown conversation");
        assert!(err.is_not_found());
        assert_eq!(workflow.state(), CaptureState::ConfirmReview);
        assert_eq!(workflow.transcript(), Some("text"));
    }

    #[tokio::test]
    async fn test_cancel_releases_resource_from_any_state() {
        // From Recording
        let (audio, released) = MockAudio::with_audio();
        let mut workflow = CaptureWorkflow::new(audio);
        workflow.start().expect("start");
        workflow.cancel();
        assert_eq!(workflow.state(), CaptureState::Idle);
        assert!(released.load(Ordering::SeqCst));

        // From ConfirmReview
        let (audio, released) = MockAudio::with_audio();
        let mut workflow = CaptureWorkflow::new(audio);
        workflow.start().expect("start");
        workflow.stop(&transcriber("text")).await.expect("stop");
        workflow.cancel();
        assert_eq!(workflow.state(), CaptureState::Idle);
        assert!(workflow.transcript().is_none());
        assert!(released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_invalid_transitions_rejected() {
        let (audio, _released) = MockAudio::with_audio();
        let mut workflow = CaptureWorkflow::new(audio);

        let err = workflow.stop(&transcriber("x")).await.expect_err("stop while idle");
        assert!(matches!(err, CoreError::InvalidState { .. }));

        let err = workflow.edit_transcript("x").expect_err("edit while idle");
        assert!(matches!(err, CoreError::InvalidState { .. }));

        workflow.start().expect("start");
        let err = workflow.start().expect_err("start while recording");
        assert!(matches!(err, CoreError::InvalidState { .. }));
    }
}
