//! Utterance loop — one capture session per utterance, until the stop
//! phrase is heard.
//!
//! # Flow
//!
//! ```text
//! loop
//!   ├─ print "<listening>"
//!   ├─ CaptureSession::open           (device errors propagate)
//!   ├─ for buffer in CoalescingReader
//!   │     └─ recognizer.accept(buffer) == true → break
//!   ├─ session closed                 (every exit path)
//!   ├─ recognizer.result()  → RecognitionOutcome { Text | NoResult }
//!   ├─ print "result: …"
//!   └─ Text == stop phrase → print "Bye", return
//! ```

use std::io::Write;

use thiserror::Error;

use crate::audio::{AudioBackend, CaptureError, CaptureSession, DeviceSelector, MergedBuffer, StreamParams};
use crate::config::SessionConfig;
use crate::stt::StreamingRecognizer;

use super::outcome::{normalize_text, RecognitionOutcome};

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

/// Failures that end the loop.  Everything else is a `NoResult`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("failed to write to console: {0}")]
    Output(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// recognize_utterance
// ---------------------------------------------------------------------------

/// Feed `buffers` to `recognizer` until it reports a complete utterance.
///
/// Returns [`RecognitionOutcome::NoResult`] if the buffers run out first.
pub fn recognize_utterance<I>(
    buffers: I,
    recognizer: &mut dyn StreamingRecognizer,
    strip_whitespace: bool,
) -> RecognitionOutcome
where
    I: IntoIterator<Item = MergedBuffer>,
{
    for buffer in buffers {
        if recognizer.accept(&buffer) {
            return RecognitionOutcome::from_engine(recognizer.result(), strip_whitespace);
        }
    }
    log::debug!("audio stream ended before the utterance completed");
    RecognitionOutcome::NoResult
}

// ---------------------------------------------------------------------------
// UtteranceLoop
// ---------------------------------------------------------------------------

/// Drives capture sessions against a backend and prints what is heard.
pub struct UtteranceLoop<'a> {
    backend: &'a dyn AudioBackend,
    params: StreamParams,
    selector: DeviceSelector,
    session: SessionConfig,
}

impl<'a> UtteranceLoop<'a> {
    pub fn new(
        backend: &'a dyn AudioBackend,
        params: StreamParams,
        selector: DeviceSelector,
        session: SessionConfig,
    ) -> Self {
        Self {
            backend,
            params,
            selector,
            session,
        }
    }

    /// Capture and recognize a single utterance.
    ///
    /// The capture session is closed before this returns, whichever way the
    /// read loop ends.
    pub fn run_utterance(
        &self,
        recognizer: &mut dyn StreamingRecognizer,
    ) -> Result<RecognitionOutcome, CaptureError> {
        recognizer.reset();

        let mut session = CaptureSession::open(self.backend, self.params, &self.selector)?;
        let outcome = match session.take_reader() {
            Some(reader) => recognize_utterance(reader, recognizer, self.session.strip_whitespace),
            None => RecognitionOutcome::NoResult,
        };
        session.close();

        Ok(outcome)
    }

    /// `true` when `outcome` is the configured stop phrase.
    pub fn is_stop_phrase(&self, outcome: &RecognitionOutcome) -> bool {
        let stop = normalize_text(&self.session.stop_phrase, self.session.strip_whitespace);
        !stop.is_empty() && outcome.text() == Some(stop.as_str())
    }

    /// Repeat utterances until the stop phrase is recognized.  Returns the
    /// number of utterances processed.
    ///
    /// # Errors
    ///
    /// A device that cannot be opened, or a console that cannot be written.
    pub fn run(
        &self,
        recognizer: &mut dyn StreamingRecognizer,
        out: &mut dyn Write,
    ) -> Result<usize, PipelineError> {
        let mut utterances = 0usize;
        loop {
            writeln!(out, "<listening>")?;
            out.flush()?;

            let outcome = self.run_utterance(recognizer)?;
            utterances += 1;

            writeln!(out, "result: {outcome}")?;
            if self.is_stop_phrase(&outcome) {
                writeln!(out, "Bye")?;
                break;
            }
        }
        writeln!(out, "<finished>")?;
        out.flush()?;
        log::info!("stop phrase heard after {utterances} utterance(s)");
        Ok(utterances)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
