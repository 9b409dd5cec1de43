//! Coalescing drain over a [`QueueConsumer`].
//!
//! Each pull blocks for one chunk, then greedily appends every chunk that is
//! *already* queued, so the recognizer sees fewer, larger buffers without the
//! reader ever waiting for more audio to arrive.

use super::queue::{Popped, QueueConsumer, TryPopped};

/// Concatenation of one or more chunks, in arrival order.
pub type MergedBuffer = Vec<u8>;

/// Lazy, finite sequence of [`MergedBuffer`]s.
///
/// Ends after the end-of-stream marker is dequeued.  Not restartable: once
/// exhausted, build a new reader from a new queue.
///
/// ```rust
/// use mic_stream_asr::audio::{audio_queue, Chunk, CoalescingReader};
///
/// let (producer, consumer) = audio_queue();
/// producer.push(Chunk::from_bytes(vec![1, 2]));
/// producer.push(Chunk::from_bytes(vec![3]));
/// producer.push_end_of_stream();
///
/// let buffers: Vec<_> = CoalescingReader::new(consumer).collect();
/// assert_eq!(buffers, vec![vec![1, 2, 3]]);
/// ```
pub struct CoalescingReader {
    consumer: QueueConsumer,
    /// End of stream was seen while accumulating; the next pull terminates.
    done: bool,
}

impl CoalescingReader {
    pub fn new(consumer: QueueConsumer) -> Self {
        Self {
            consumer,
            done: false,
        }
    }
}

impl Iterator for CoalescingReader {
    type Item = MergedBuffer;

    fn next(&mut self) -> Option<MergedBuffer> {
        if self.done {
            return None;
        }

        let mut merged = match self.consumer.pop_blocking() {
            Popped::Chunk(chunk) => chunk.into_bytes(),
            Popped::EndOfStream => {
                self.done = true;
                return None;
            }
        };

        let mut pieces = 1usize;
        loop {
            match self.consumer.try_pop() {
                TryPopped::Chunk(chunk) => {
                    merged.extend_from_slice(chunk.as_bytes());
                    pieces += 1;
                }
                TryPopped::Empty => break,
                TryPopped::EndOfStream => {
                    self.done = true;
                    break;
                }
            }
        }

        log::trace!("coalesced {pieces} chunk(s) into {} bytes", merged.len());
        Some(merged)
    }
}

impl std::iter::FusedIterator for CoalescingReader {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::queue::{audio_queue, Chunk};
    use std::thread;
    use std::time::Duration;

    fn bytes(b: u8, n: usize) -> Vec<u8> {
        vec![b; n]
    }

    #[test]
    fn available_chunks_merge_into_one_buffer() {
        let (producer, consumer) = audio_queue();
        let mut reader = CoalescingReader::new(consumer);

        producer.push(Chunk::from_bytes(bytes(1, 3)));
        producer.push(Chunk::from_bytes(bytes(2, 2)));

        let merged = reader.next().unwrap();
        assert_eq!(merged, vec![1, 1, 1, 2, 2]);
    }

    #[test]
    fn chunk_pushed_after_a_pull_is_a_separate_buffer() {
        let (producer, consumer) = audio_queue();
        let mut reader = CoalescingReader::new(consumer);

        producer.push(Chunk::from_bytes(bytes(1, 2)));
        assert_eq!(reader.next(), Some(bytes(1, 2)));

        producer.push(Chunk::from_bytes(bytes(2, 2)));
        assert_eq!(reader.next(), Some(bytes(2, 2)));
    }

    #[test]
    fn end_of_stream_first_yields_nothing() {
        let (producer, consumer) = audio_queue();
        producer.push_end_of_stream();
        let mut reader = CoalescingReader::new(consumer);
        assert_eq!(reader.next(), None);
        assert_eq!(reader.next(), None);
    }

    #[test]
    fn end_of_stream_during_accumulation_flushes_then_stops() {
        let (producer, consumer) = audio_queue();
        producer.push(Chunk::from_bytes(bytes(4, 1)));
        producer.push(Chunk::from_bytes(bytes(5, 1)));
        producer.push_end_of_stream();

        let buffers: Vec<_> = CoalescingReader::new(consumer).collect();
        assert_eq!(buffers, vec![vec![4, 5]]);
    }

    #[test]
    fn coalescing_preserves_byte_order() {
        let (producer, consumer) = audio_queue();
        for i in 0..10u8 {
            producer.push(Chunk::from_bytes(vec![i * 2, i * 2 + 1]));
        }
        producer.push_end_of_stream();

        let flat: Vec<u8> = CoalescingReader::new(consumer).flatten().collect();
        assert_eq!(flat, (0..20u8).collect::<Vec<_>>());
    }

    #[test]
    fn total_bytes_invariant_under_concurrent_producer() {
        let (producer, consumer) = audio_queue();
        let handle = thread::spawn(move || {
            for i in 0..50u8 {
                producer.push(Chunk::from_bytes(vec![i; 100]));
                if i % 7 == 0 {
                    thread::sleep(Duration::from_millis(1));
                }
            }
            producer.push_end_of_stream();
        });

        let buffers: Vec<_> = CoalescingReader::new(consumer).collect();
        handle.join().unwrap();

        assert!(!buffers.is_empty());
        assert!(buffers.iter().all(|b| !b.is_empty()));
        let flat: Vec<u8> = buffers.into_iter().flatten().collect();
        assert_eq!(flat.len(), 5_000);
        for (i, window) in flat.chunks(100).enumerate() {
            assert!(window.iter().all(|&b| b == i as u8));
        }
    }
}
