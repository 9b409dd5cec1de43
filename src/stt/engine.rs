//! Batch transcription: one finished clip of 16 kHz mono `f32` in, text out.
//!
//! [`UtteranceRecognizer`](super::UtteranceRecognizer) holds the engine as
//! `Arc<dyn SttEngine>`, so implementations must be `Send + Sync`.

use std::path::Path;

use thiserror::Error;
use whisper_rs::{FullParams, WhisperContext, WhisperContextParameters, WhisperState};

use super::transcribe::{SamplingStrategy, TranscribeParams};

/// 100 ms at 16 kHz; whisper.cpp rejects shorter input.
pub const MIN_AUDIO_SAMPLES: usize = 1_600;

#[derive(Debug, Clone, Error)]
pub enum SttError {
    #[error("model file {0} not found")]
    ModelNotFound(String),

    /// Loading the model or allocating decoder state failed.
    #[error("could not initialise whisper: {0}")]
    ContextInit(String),

    #[error("decoding failed: {0}")]
    Transcription(String),

    #[error("no speech in utterance")]
    NoSpeech,

    #[error("utterance of {0} samples is below the {MIN_AUDIO_SAMPLES}-sample minimum")]
    AudioTooShort(usize),
}

/// Turns a complete utterance into text.
pub trait SttEngine: Send + Sync {
    fn transcribe(&self, audio: &[f32]) -> Result<String, SttError>;
}

fn check_length(audio: &[f32]) -> Result<(), SttError> {
    if audio.len() < MIN_AUDIO_SAMPLES {
        Err(SttError::AudioTooShort(audio.len()))
    } else {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// WhisperEngine
// ---------------------------------------------------------------------------

/// whisper.cpp via `whisper-rs`.  Decoder state is allocated per utterance;
/// the loaded weights are shared and read-only.
pub struct WhisperEngine {
    ctx: WhisperContext,
    params: TranscribeParams,
}

// SAFETY: the context is only read after loading; every call creates its own
// WhisperState.
unsafe impl Send for WhisperEngine {}
unsafe impl Sync for WhisperEngine {}

impl WhisperEngine {
    /// Load a GGML model.
    ///
    /// Fails with [`SttError::ModelNotFound`] if `model_path` is missing and
    /// [`SttError::ContextInit`] if whisper cannot read it.
    pub fn load(model_path: impl AsRef<Path>, params: TranscribeParams) -> Result<Self, SttError> {
        let path = model_path.as_ref();
        let shown = path.display().to_string();
        if !path.is_file() {
            return Err(SttError::ModelNotFound(shown));
        }
        let utf8 = path
            .to_str()
            .ok_or_else(|| SttError::ModelNotFound(format!("{shown} (path is not UTF-8)")))?;

        let ctx = WhisperContext::new_with_params(utf8, WhisperContextParameters::default())
            .map_err(|e| SttError::ContextInit(format!("{shown}: {e}")))?;
        log::debug!("whisper context ready for {shown} ({params:?})");

        Ok(Self { ctx, params })
    }

    fn decode_params(&self) -> FullParams<'_, '_> {
        let strategy = match self.params.strategy {
            SamplingStrategy::Greedy { best_of } => whisper_rs::SamplingStrategy::Greedy { best_of },
            SamplingStrategy::BeamSearch { beam_size, patience } => {
                whisper_rs::SamplingStrategy::BeamSearch { beam_size, patience }
            }
        };

        let mut fp = FullParams::new(strategy);
        fp.set_language(match self.params.language.as_str() {
            "auto" => None,
            code => Some(code),
        });
        fp.set_n_threads(self.params.n_threads);
        fp.set_single_segment(self.params.single_segment);
        fp.set_print_progress(false);
        fp.set_print_realtime(false);
        fp.set_print_special(false);
        fp.set_print_timestamps(false);
        fp
    }
}

fn collect_segments(state: &WhisperState) -> Result<String, SttError> {
    let count = state
        .full_n_segments()
        .map_err(|e| SttError::Transcription(e.to_string()))?;
    (0..count)
        .map(|i| {
            state
                .full_get_segment_text(i)
                .map_err(|e| SttError::Transcription(format!("segment {i}: {e}")))
        })
        .collect()
}

impl SttEngine for WhisperEngine {
    fn transcribe(&self, audio: &[f32]) -> Result<String, SttError> {
        check_length(audio)?;

        let started = std::time::Instant::now();
        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| SttError::ContextInit(e.to_string()))?;
        state
            .full(self.decode_params(), audio)
            .map_err(|e| SttError::Transcription(e.to_string()))?;
        let text = collect_segments(&state)?;

        log::debug!(
            "decoded {:.2} s of audio in {} ms",
            audio.len() as f32 / 16_000.0,
            started.elapsed().as_millis()
        );

        match text.trim() {
            "" => Err(SttError::NoSpeech),
            t => Ok(t.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// MockSttEngine  (test-only)
// ---------------------------------------------------------------------------

/// Answers every clip with the same canned result and records what it saw.
#[cfg(test)]
pub struct MockSttEngine {
    reply: Result<String, SttError>,
    calls: std::sync::atomic::AtomicUsize,
    last_len: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockSttEngine {
    pub fn ok(text: impl Into<String>) -> Self {
        Self::replying(Ok(text.into()))
    }

    pub fn err(error: SttError) -> Self {
        Self::replying(Err(error))
    }

    fn replying(reply: Result<String, SttError>) -> Self {
        Self {
            reply,
            calls: Default::default(),
            last_len: Default::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::Acquire)
    }

    pub fn last_len(&self) -> usize {
        self.last_len.load(std::sync::atomic::Ordering::Acquire)
    }
}

#[cfg(test)]
impl SttEngine for MockSttEngine {
    fn transcribe(&self, audio: &[f32]) -> Result<String, SttError> {
        use std::sync::atomic::Ordering;
        self.calls.fetch_add(1, Ordering::AcqRel);
        self.last_len.store(audio.len(), Ordering::Release);
        check_length(audio)?;
        self.reply.clone()
    }
}
