//! Write outcome classification

use log::warn;

use crate::audio::WriteOutcome;
use crate::error::ConvertError;

#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Success,
    /// The buffer was consumed before the codec went away; move on.
    RetryableAdvance,
    /// The buffer was not consumed; rewind and submit the same frames again.
    RetryableResubmit,
    Fatal(ConvertError),
}

impl Classification {
    pub fn is_transient(&self) -> bool {
        matches!(self, Classification::RetryableAdvance | Classification::RetryableResubmit)
    }
}

/// Decides how the conversion loop proceeds after each write attempt.
#[derive(Debug, Clone, Copy)]
pub struct ErrorClassifier {
    can_resume: bool,
}

impl ErrorClassifier {
    pub fn new(can_resume: bool) -> Self {
        Self { can_resume }
    }

    pub fn can_resume(&self) -> bool {
        self.can_resume
    }

    /// Classifies one cycle. `interrupted` covers both a pause seen by
    /// `wait_if_paused` and a codec failure left over from the previous
    /// cycle. `write` is only called when the converter may continue.
    pub fn classify<W>(&self, interrupted: bool, write: W) -> Classification
    where
        W: FnOnce() -> WriteOutcome,
    {
        if interrupted && !self.can_resume {
            warn!("Interrupted, and the audio converter cannot resume");
            return Classification::Fatal(ConvertError::cannot_resume());
        }
        self.classify_write(write())
    }

    pub fn classify_write(&self, outcome: WriteOutcome) -> Classification {
        match outcome {
            WriteOutcome::Success => Classification::Success,
            WriteOutcome::CodecUnavailableInputConsumed => {
                warn!("Write interrupted, input consumed (status {})", outcome.status());
                Classification::RetryableAdvance
            }
            WriteOutcome::CodecUnavailableInputNotConsumed => {
                warn!("Write interrupted, input not consumed (status {})", outcome.status());
                Classification::RetryableResubmit
            }
            WriteOutcome::Failed(code) => {
                Classification::Fatal(ConvertError::fatal_write("Writing to the destination failed", code))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StatusCode;
    use std::cell::Cell;

    #[test]
    fn test_cannot_resume_skips_write() {
        let classifier = ErrorClassifier::new(false);
        let written = Cell::new(false);
        let result = classifier.classify(true, || {
            written.set(true);
            WriteOutcome::Success
        });
        assert_eq!(result, Classification::Fatal(ConvertError::cannot_resume()));
        assert!(!written.get());
    }

    #[test]
    fn test_resumable_interruption_writes() {
        let classifier = ErrorClassifier::new(true);
        let written = Cell::new(false);
        let result = classifier.classify(true, || {
            written.set(true);
            WriteOutcome::Success
        });
        assert_eq!(result, Classification::Success);
        assert!(written.get());
    }

    #[test]
    fn test_uninterrupted_cycle_writes_even_without_resume() {
        let classifier = ErrorClassifier::new(false);
        assert_eq!(classifier.classify(false, || WriteOutcome::Success), Classification::Success);
    }

    #[test]
    fn test_write_outcomes() {
        let classifier = ErrorClassifier::new(true);
        assert_eq!(
            classifier.classify_write(WriteOutcome::CodecUnavailableInputConsumed),
            Classification::RetryableAdvance
        );
        assert_eq!(
            classifier.classify_write(WriteOutcome::CodecUnavailableInputNotConsumed),
            Classification::RetryableResubmit
        );
        match classifier.classify_write(WriteOutcome::Failed(StatusCode(-36))) {
            Classification::Fatal(ConvertError::FatalWrite { code, .. }) => assert_eq!(code, StatusCode(-36)),
            other => panic!("unexpected classification: {:?}", other),
        }
    }
}
