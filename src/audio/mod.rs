//! Audio pipeline — microphone capture → chunk queue → coalescing reader.
//!
//! # Pipeline
//!
//! ```text
//! cpal callback (audio thread)
//!   └─ Reblocker → Chunk (i16 LE mono) ─push─▶ QueueProducer
//!                                                  │  mpsc
//! recognition loop (main thread)                   ▼
//!   CoalescingReader ◀─pop_blocking / try_pop── QueueConsumer
//!     └─ MergedBuffer → pcm16_to_f32 → StreamResampler → Endpointer
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use mic_stream_asr::audio::{AudioBackend, CaptureSession, CpalBackend, DeviceSelector, StreamParams};
//!
//! let backend = CpalBackend::new();
//! let selector = DeviceSelector::Default;
//! let sample_rate = backend.default_input_sample_rate(&selector).unwrap();
//! let params = StreamParams { sample_rate, block_size: 8_000 };
//!
//! let mut session = CaptureSession::open(&backend, params, &selector).unwrap();
//! let reader = session.take_reader().unwrap();
//! for buffer in reader {
//!     println!("received {} bytes", buffer.len());
//! #   break;
//! }
//! // dropping or closing the session ends the reader
//! ```

pub mod block;
pub mod capture;
pub mod device;
pub mod queue;
pub mod reader;
pub mod resample;
pub mod vad;

pub use block::Reblocker;
pub use capture::{
    AudioBackend, BlockCallback, CaptureError, CaptureSession, DeviceSelector, InputStream,
    StatusCallback, StreamParams, StreamStatus,
};
pub use device::CpalBackend;
pub use queue::{audio_queue, Chunk, Popped, QueueConsumer, QueueProducer, TryPopped};
pub use reader::{CoalescingReader, MergedBuffer};
pub use resample::{pcm16_to_f32, resample_to_16k, StreamResampler, TARGET_RATE};
pub use vad::{frame_rms, EndpointSettings, EndpointState, Endpointer, VadDetector};
