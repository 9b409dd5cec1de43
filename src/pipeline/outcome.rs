//! What one utterance produced.

use crate::stt::SttError;

/// Result of one capture-and-recognize cycle.
///
/// Recognition failures (no speech, engine errors, the stream ending before
/// the speaker paused) all collapse into [`NoResult`](Self::NoResult); the
/// console loop simply moves on to the next utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionOutcome {
    Text(String),
    NoResult,
}

impl RecognitionOutcome {
    /// Build from an engine result, normalizing the text.  Empty text after
    /// normalization counts as no result.
    pub fn from_engine(result: Result<String, SttError>, strip_whitespace: bool) -> Self {
        match result {
            Ok(text) => {
                let text = normalize_text(&text, strip_whitespace);
                if text.is_empty() {
                    Self::NoResult
                } else {
                    Self::Text(text)
                }
            }
            Err(e) => {
                log::info!("no result for this utterance: {e}");
                Self::NoResult
            }
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::NoResult => None,
        }
    }
}

impl std::fmt::Display for RecognitionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::NoResult => f.write_str("(none)"),
        }
    }
}

/// Trim `text`; with `strip_whitespace`, remove every whitespace character
/// so space-separated tokens are joined together.
///
/// ```rust
/// use mic_stream_asr::pipeline::normalize_text;
///
/// assert_eq!(normalize_text(" 終 わり ", true), "終わり");
/// assert_eq!(normalize_text("  hello  world ", false), "hello  world");
/// ```
pub fn normalize_text(text: &str, strip_whitespace: bool) -> String {
    if strip_whitespace {
        text.split_whitespace().collect()
    } else {
        text.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_text_becomes_text_outcome() {
        let out = RecognitionOutcome::from_engine(Ok(" こんにち は ".into()), true);
        assert_eq!(out, RecognitionOutcome::Text("こんにちは".into()));
        assert_eq!(out.text(), Some("こんにちは"));
    }

    #[test]
    fn engine_errors_become_no_result() {
        for err in [
            SttError::NoSpeech,
            SttError::Transcription("x".into()),
            SttError::AudioTooShort(3),
        ] {
            assert_eq!(
                RecognitionOutcome::from_engine(Err(err), true),
                RecognitionOutcome::NoResult
            );
        }
    }

    #[test]
    fn blank_text_is_no_result() {
        assert_eq!(
            RecognitionOutcome::from_engine(Ok(" \t\n".into()), false),
            RecognitionOutcome::NoResult
        );
    }

    #[test]
    fn display_formats() {
        assert_eq!(RecognitionOutcome::Text("hi".into()).to_string(), "hi");
        assert_eq!(RecognitionOutcome::NoResult.to_string(), "(none)");
    }

    #[test]
    fn keeps_inner_spacing_when_not_stripping() {
        assert_eq!(normalize_text("good  morning\n", false), "good  morning");
    }
}
