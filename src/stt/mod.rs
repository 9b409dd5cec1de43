//! Speech-to-text: the recognition-engine side of the capture loop.
//!
//! # Architecture
//!
//! ```text
//! MergedBuffer (i16 PCM @ device rate)
//!        │
//!        ▼
//! UtteranceRecognizer::accept ── StreamResampler → Endpointer ──▶ bool
//!        │ (utterance complete)
//!        ▼
//! UtteranceRecognizer::result ── VadDetector::trim_silence ──▶ SttEngine::transcribe
//!                                                                  │
//!                                                            WhisperEngine
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mic_stream_asr::config::VadConfig;
//! use mic_stream_asr::stt::{StreamingRecognizer, TranscribeParams, UtteranceRecognizer, WhisperEngine};
//!
//! let engine = WhisperEngine::load("models/ggml-base.bin", TranscribeParams::default())
//!     .expect("model not found");
//! let mut recognizer = UtteranceRecognizer::new(Arc::new(engine), 48_000, &VadConfig::default());
//!
//! let pcm: Vec<u8> = vec![0; 16_000];
//! if recognizer.accept(&pcm) {
//!     println!("{:?}", recognizer.result());
//! }
//! ```

pub mod engine;
pub mod stream;
pub mod transcribe;

pub use engine::{SttEngine, SttError, WhisperEngine, MIN_AUDIO_SAMPLES};
#[cfg(test)]
pub use engine::MockSttEngine;
pub use stream::{StreamingRecognizer, UtteranceRecognizer};
pub use transcribe::{SamplingStrategy, TranscribeParams};
