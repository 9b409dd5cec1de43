//! Unbounded FIFO of PCM chunks shared between the audio thread and the
//! recognition loop.
//!
//! [`audio_queue`] returns a connected pair: a cloneable [`QueueProducer`]
//! that lives inside the cpal callback, and a single [`QueueConsumer`] owned
//! by whoever drains the stream.  The transport is a `std::sync::mpsc`
//! channel, so pushing never blocks the real-time thread and popping parks
//! the consumer on a real wait/notify primitive.
//!
//! ```text
//! cpal callback ── push(Chunk) ──▶ [ c1 | c2 | c3 | EOS ] ──▶ pop_blocking / try_pop
//! ```
//!
//! Once the end-of-stream marker has been dequeued it is the last value the
//! consumer will ever see: every further pop reports [`Popped::EndOfStream`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Chunk
// ---------------------------------------------------------------------------

/// One device block of 16-bit signed, mono, little-endian PCM.
///
/// Immutable once built; ownership moves from the callback into the queue
/// and from the queue into the [`crate::audio::CoalescingReader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk(Vec<u8>);

impl Chunk {
    /// Wrap raw PCM bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Serialise `samples` as little-endian `i16` bytes.
    pub fn from_samples(samples: &[i16]) -> Self {
        let mut bytes = Vec::with_capacity(samples.len() * 2);
        for s in samples {
            bytes.extend_from_slice(&s.to_le_bytes());
        }
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Pop outcomes
// ---------------------------------------------------------------------------

/// Result of [`QueueConsumer::pop_blocking`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Popped {
    Chunk(Chunk),
    EndOfStream,
}

/// Result of [`QueueConsumer::try_pop`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TryPopped {
    Chunk(Chunk),
    EndOfStream,
    /// Nothing queued right now.
    Empty,
}

enum Message {
    Chunk(Chunk),
    EndOfStream,
}

// ---------------------------------------------------------------------------
// audio_queue
// ---------------------------------------------------------------------------

/// Create a connected producer/consumer pair.
pub fn audio_queue() -> (QueueProducer, QueueConsumer) {
    let (tx, rx) = mpsc::channel();
    let producer = QueueProducer {
        tx,
        ended: Arc::new(AtomicBool::new(false)),
    };
    let consumer = QueueConsumer { rx, finished: false };
    (producer, consumer)
}

// ---------------------------------------------------------------------------
// QueueProducer
// ---------------------------------------------------------------------------

/// Write half of the queue.  Cheap to clone; all clones share the
/// end-of-stream flag, so once any clone ends the stream every later push is
/// dropped.
#[derive(Clone)]
pub struct QueueProducer {
    tx: mpsc::Sender<Message>,
    ended: Arc<AtomicBool>,
}

impl QueueProducer {
    /// Append `chunk` to the tail.  Never blocks.
    ///
    /// Pushes after [`push_end_of_stream`](Self::push_end_of_stream) are
    /// ignored, as are pushes after the consumer has been dropped.
    pub fn push(&self, chunk: Chunk) {
        if self.ended.load(Ordering::Acquire) {
            log::trace!("audio queue: dropping {} bytes pushed after end of stream", chunk.len());
            return;
        }
        let _ = self.tx.send(Message::Chunk(chunk));
    }

    /// Append the end-of-stream marker.  Only the first call enqueues it.
    pub fn push_end_of_stream(&self) {
        if self.ended.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.tx.send(Message::EndOfStream);
    }
}

// ---------------------------------------------------------------------------
// QueueConsumer
// ---------------------------------------------------------------------------

/// Read half of the queue.  Not cloneable: there is exactly one reader.
pub struct QueueConsumer {
    rx: mpsc::Receiver<Message>,
    /// Set once the end-of-stream marker has been dequeued.
    finished: bool,
}

impl QueueConsumer {
    /// Remove the head element, parking the thread until one is available.
    ///
    /// If every producer has been dropped without pushing the marker the
    /// stream is treated as ended rather than blocking forever.
    pub fn pop_blocking(&mut self) -> Popped {
        if self.finished {
            return Popped::EndOfStream;
        }
        match self.rx.recv() {
            Ok(Message::Chunk(chunk)) => Popped::Chunk(chunk),
            Ok(Message::EndOfStream) | Err(mpsc::RecvError) => self.finish(),
        }
    }

    /// Remove the head element if one is queued, otherwise return
    /// [`TryPopped::Empty`] immediately.
    pub fn try_pop(&mut self) -> TryPopped {
        if self.finished {
            return TryPopped::EndOfStream;
        }
        match self.rx.try_recv() {
            Ok(Message::Chunk(chunk)) => TryPopped::Chunk(chunk),
            Ok(Message::EndOfStream) | Err(mpsc::TryRecvError::Disconnected) => {
                self.finish();
                TryPopped::EndOfStream
            }
            Err(mpsc::TryRecvError::Empty) => TryPopped::Empty,
        }
    }

    fn finish(&mut self) -> Popped {
        self.finished = true;
        Popped::EndOfStream
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
