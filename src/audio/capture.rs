//! Capture session: one input device bound to one [`audio_queue`].
//!
//! [`CaptureSession::open`] asks an [`AudioBackend`] to start an input
//! stream whose block callback pushes every `chunk_size`-sample block into
//! the queue.  The consumer side is handed out once as a
//! [`CoalescingReader`].  Closing the session, explicitly or by dropping it,
//! stops the stream, pushes the end-of-stream marker and releases the
//! device, so a reader parked in `pop_blocking` always wakes up.

use thiserror::Error;

use super::queue::{audio_queue, Chunk, QueueConsumer, QueueProducer};
use super::reader::CoalescingReader;

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors that can occur while opening or closing a capture session.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// No input device matched the selector.
    #[error("no input device available: {0}")]
    DeviceUnavailable(String),

    /// The driver rejected the requested stream parameters.
    #[error("failed to open input device: {0}")]
    DeviceOpen(String),

    #[error("failed to query default input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to enumerate input devices: {0}")]
    Enumerate(#[from] cpal::DevicesError),

    #[error("failed to pause input stream: {0}")]
    Pause(#[from] cpal::PauseStreamError),
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Which input device to open.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DeviceSelector {
    /// The host's default input device.
    #[default]
    Default,
    /// First input device whose name contains this text (case-insensitive).
    Named(String),
}

impl DeviceSelector {
    /// `None` or an empty name selects the default device.
    pub fn from_name(name: Option<&str>) -> Self {
        match name.map(str::trim) {
            Some(n) if !n.is_empty() => Self::Named(n.to_string()),
            _ => Self::Default,
        }
    }

    pub fn matches(&self, device_name: &str) -> bool {
        match self {
            Self::Default => true,
            Self::Named(wanted) => device_name
                .to_lowercase()
                .contains(&wanted.to_lowercase()),
        }
    }
}

impl std::fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Default => write!(f, "default input"),
            Self::Named(name) => write!(f, "input matching {name:?}"),
        }
    }
}

/// Format of the stream a session asks the backend for.  Samples are always
/// 16-bit signed mono.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamParams {
    /// Sampling rate in Hz.
    pub sample_rate: u32,
    /// Samples per delivered block.
    pub block_size: usize,
}

impl StreamParams {
    /// Reject a zero rate or block size before any device is touched.
    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.block_size == 0 || self.sample_rate == 0 {
            return Err(CaptureError::DeviceOpen(format!(
                "invalid stream parameters: {} Hz, {} samples per block",
                self.sample_rate, self.block_size
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// AudioBackend
// ---------------------------------------------------------------------------

/// Called on the driver thread with one full block of mono samples.
pub type BlockCallback = Box<dyn FnMut(&[i16]) + Send + 'static>;

/// A problem reported by the driver while the stream runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamStatus {
    /// Recoverable, e.g. an overflowed block.  The stream keeps running.
    Warning(String),
    /// The device went away; no further blocks will arrive.
    Lost(String),
}

/// Called on the driver thread when the driver reports a stream problem.
pub type StatusCallback = Box<dyn FnMut(StreamStatus) + Send + 'static>;

/// A running input stream.  Dropping it releases the device; no callback
/// fires after the drop returns.
pub trait InputStream {
    /// Stop callbacks from firing.
    fn pause(&mut self) -> Result<(), CaptureError>;
}

/// The audio driver a [`CaptureSession`] talks to.
pub trait AudioBackend {
    /// Default sampling rate of the selected input device, in Hz.
    fn default_input_sample_rate(&self, selector: &DeviceSelector) -> Result<u32, CaptureError>;

    /// Open and start an input stream delivering `params.block_size`-sample
    /// blocks to `on_block`.
    fn open_input_stream(
        &self,
        params: StreamParams,
        selector: &DeviceSelector,
        on_block: BlockCallback,
        on_status: StatusCallback,
    ) -> Result<Box<dyn InputStream>, CaptureError>;
}

// ---------------------------------------------------------------------------
// CaptureSession
// ---------------------------------------------------------------------------

/// Owns the device stream and the producer side of the audio queue for the
/// lifetime of one utterance.
///
/// ```rust,no_run
/// use mic_stream_asr::audio::{CaptureSession, CpalBackend, DeviceSelector, StreamParams};
///
/// let backend = CpalBackend::new();
/// let params = StreamParams { sample_rate: 16_000, block_size: 8_000 };
/// let mut session = CaptureSession::open(&backend, params, &DeviceSelector::Default).unwrap();
/// let reader = session.take_reader().unwrap();
/// for buffer in reader.take(3) {
///     println!("{} bytes", buffer.len());
/// }
/// session.close();
/// ```
pub struct CaptureSession {
    stream: Option<Box<dyn InputStream>>,
    producer: QueueProducer,
    consumer: Option<QueueConsumer>,
}

impl CaptureSession {
    /// Allocate the queue and start the device.
    ///
    /// # Errors
    ///
    /// [`CaptureError::DeviceUnavailable`] when nothing matches `selector`,
    /// [`CaptureError::DeviceOpen`] when the driver rejects `params`.
    pub fn open(
        backend: &dyn AudioBackend,
        params: StreamParams,
        selector: &DeviceSelector,
    ) -> Result<Self, CaptureError> {
        params.validate()?;

        let (producer, consumer) = audio_queue();

        let block_producer = producer.clone();
        let on_block: BlockCallback = Box::new(move |block: &[i16]| {
            block_producer.push(Chunk::from_samples(block));
        });
        let status_producer = producer.clone();
        let on_status: StatusCallback = Box::new(move |status: StreamStatus| match status {
            StreamStatus::Warning(msg) => log::warn!("input stream status: {msg}"),
            StreamStatus::Lost(msg) => {
                log::error!("input device lost: {msg}");
                status_producer.push_end_of_stream();
            }
        });

        let stream = backend.open_input_stream(params, selector, on_block, on_status)?;
        log::debug!(
            "capture session opened on {selector} ({} Hz, {} samples/block)",
            params.sample_rate,
            params.block_size
        );

        Ok(Self {
            stream: Some(stream),
            producer,
            consumer: Some(consumer),
        })
    }

    /// Hand out the reading side of the queue.  Returns `None` after the
    /// first call.
    pub fn take_reader(&mut self) -> Option<CoalescingReader> {
        self.consumer.take().map(CoalescingReader::new)
    }

    /// Stop the device, push end-of-stream and release the device handle.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let Some(mut stream) = self.stream.take() else {
            return;
        };
        if let Err(e) = stream.pause() {
            log::warn!("{e}");
        }
        self.producer.push_end_of_stream();
        drop(stream);
        log::debug!("capture session closed");
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ---------------------------------------------------------------------------
// MockBackend  (test-only)
// ---------------------------------------------------------------------------

/// A backend whose "driver" is a spawned thread replaying scripted blocks.
#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    #[derive(Default)]
    pub(crate) struct MockBackend {
        /// Blocks delivered, one per callback, after the stream starts.
        pub blocks: Vec<Vec<i16>>,
        /// Delay between callbacks.
        pub interval: Duration,
        /// Status reports delivered before the first block.
        pub statuses: Vec<StreamStatus>,
        pub default_rate: u32,
        pub fail_open: Option<fn() -> CaptureError>,
        /// Make `pause` report a driver error.
        pub fail_pause: bool,
        pub opened: Arc<AtomicUsize>,
        /// Blocks handed to the session so far.
        pub delivered: Arc<AtomicUsize>,
        pub released: Arc<AtomicUsize>,
        pub last_params: Mutex<Option<StreamParams>>,
    }

    pub(crate) struct MockStream {
        running: Arc<AtomicBool>,
        fail_pause: bool,
        worker: Option<thread::JoinHandle<()>>,
        released: Arc<AtomicUsize>,
    }

    impl InputStream for MockStream {
        fn pause(&mut self) -> Result<(), CaptureError> {
            self.running.store(false, Ordering::Release);
            if self.fail_pause {
                return Err(cpal::PauseStreamError::DeviceNotAvailable.into());
            }
            Ok(())
        }
    }

    impl Drop for MockStream {
        fn drop(&mut self) {
            self.running.store(false, Ordering::Release);
            if let Some(worker) = self.worker.take() {
                let _ = worker.join();
            }
            self.released.fetch_add(1, Ordering::AcqRel);
        }
    }

    impl AudioBackend for MockBackend {
        fn default_input_sample_rate(&self, _: &DeviceSelector) -> Result<u32, CaptureError> {
            Ok(self.default_rate)
        }

        fn open_input_stream(
            &self,
            params: StreamParams,
            selector: &DeviceSelector,
            mut on_block: BlockCallback,
            mut on_status: StatusCallback,
        ) -> Result<Box<dyn InputStream>, CaptureError> {
            if let Some(fail) = self.fail_open {
                return Err(fail());
            }
            if let DeviceSelector::Named(name) = selector {
                if name == "missing" {
                    return Err(CaptureError::DeviceUnavailable(name.clone()));
                }
            }
            *self.last_params.lock().unwrap() = Some(params);
            self.opened.fetch_add(1, Ordering::AcqRel);

            let running = Arc::new(AtomicBool::new(true));
            let flag = Arc::clone(&running);
            let blocks = self.blocks.clone();
            let statuses = self.statuses.clone();
            let interval = self.interval;
            let delivered = Arc::clone(&self.delivered);

            let worker = thread::spawn(move || {
                for status in statuses {
                    on_status(status);
                }
                for block in blocks {
                    if !flag.load(Ordering::Acquire) {
                        return;
                    }
                    on_block(&block);
                    delivered.fetch_add(1, Ordering::AcqRel);
                    thread::sleep(interval);
                }
            });

            Ok(Box::new(MockStream {
                running,
                fail_pause: self.fail_pause,
                worker: Some(worker),
                released: Arc::clone(&self.released),
            }))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
