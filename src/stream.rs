//! Cosmetic reveal of an already-final assistant reply.
//!
//! A finite, non-restartable sequence of progressively longer prefixes of
//! the final text. Purely presentational: nothing here touches persistence
//! or reconciliation, and cancelling simply stops the sequence early.

/// Iterator of progressively longer prefixes, `step_chars` characters at a
/// time, always ending on a char boundary and finishing with the full text.
pub struct RevealStream {
    text: String,
    /// Byte offsets of char boundaries, ascending, ending at text.len().
    boundaries: Vec<usize>,
    emitted: usize,
    step_chars: usize,
    cancelled: bool,
}

impl RevealStream {
    pub fn new(text: impl Into<String>, step_chars: usize) -> Self {
        let text = text.into();
        let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        boundaries.push(text.len());
        Self {
            text,
            boundaries,
            emitted: 0,
            step_chars: step_chars.max(1),
            cancelled: false,
        }
    }

    /// Stop the reveal. Subsequent `next()` calls return None; the stream
    /// cannot be restarted.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_finished(&self) -> bool {
        self.cancelled || self.emitted + 1 >= self.boundaries.len()
    }
}

impl Iterator for RevealStream {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.is_finished() {
            return None;
        }
        self.emitted = (self.emitted + self.step_chars).min(self.boundaries.len() - 1);
        let end = self.boundaries[self.emitted];
        Some(self.text[..end].to_string())
    }
}
