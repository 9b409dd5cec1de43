//! The console recognition loop.
//!
//! # Architecture
//!
//! ```text
//! UtteranceLoop::run()
//!        │
//!        ├─ run_utterance()  ── CaptureSession (one per utterance)
//!        │        │                 └─ CoalescingReader
//!        │        ▼
//!        │  recognize_utterance() ── StreamingRecognizer::accept / result
//!        │        │
//!        │        ▼
//!        │  RecognitionOutcome { Text | NoResult }
//!        │
//!        └─ stop phrase? ── yes → return
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mic_stream_asr::audio::{CpalBackend, DeviceSelector, StreamParams};
//! use mic_stream_asr::config::AppConfig;
//! use mic_stream_asr::pipeline::UtteranceLoop;
//! use mic_stream_asr::stt::{TranscribeParams, UtteranceRecognizer, WhisperEngine};
//!
//! let config = AppConfig::default();
//! let backend = CpalBackend::new();
//! let params = StreamParams { sample_rate: 16_000, block_size: config.audio.chunk_size };
//!
//! let engine = WhisperEngine::load("models/ggml-base.bin", TranscribeParams::from(&config.stt)).unwrap();
//! let mut recognizer = UtteranceRecognizer::new(Arc::new(engine), params.sample_rate, &config.vad);
//!
//! let runner = UtteranceLoop::new(&backend, params, DeviceSelector::Default, config.session.clone());
//! runner.run(&mut recognizer, &mut std::io::stdout()).unwrap();
//! ```

pub mod outcome;
pub mod runner;

pub use outcome::{normalize_text, RecognitionOutcome};
pub use runner::{recognize_utterance, PipelineError, UtteranceLoop};
