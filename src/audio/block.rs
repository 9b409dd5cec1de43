//! Fixed-size block assembly for the capture callback.
//!
//! Drivers hand the callback buffers of whatever length suits them.
//! [`Reblocker`] downmixes each interleaved frame to mono, converts it to
//! `i16` and emits exactly `block_size` samples at a time.  The block
//! storage is allocated once up front; the callback path itself only copies.

use cpal::{FromSample, Sample};

/// Accumulates interleaved driver frames into fixed-length mono `i16` blocks.
///
/// ```rust
/// use mic_stream_asr::audio::Reblocker;
///
/// let mut rb = Reblocker::new(4);
/// let mut blocks = Vec::new();
/// rb.push_frames(&[0i16, 1, 2, 3, 4, 5], 1, |b| blocks.push(b.to_vec()));
/// assert_eq!(blocks, vec![vec![0, 1, 2, 3]]);
/// assert_eq!(rb.pending(), 2);
/// ```
pub struct Reblocker {
    block: Vec<i16>,
    filled: usize,
}

impl Reblocker {
    /// # Panics
    ///
    /// Panics if `block_size == 0`.
    pub fn new(block_size: usize) -> Self {
        assert!(block_size > 0, "block_size must be > 0");
        Self {
            block: vec![0; block_size],
            filled: 0,
        }
    }

    /// Samples held back waiting for the block to fill.
    pub fn pending(&self) -> usize {
        self.filled
    }

    /// Feed one driver buffer of `channels`-interleaved samples, calling
    /// `emit` once for every completed block.
    ///
    /// A trailing partial frame (fewer than `channels` samples) is dropped.
    pub fn push_frames<T, F>(&mut self, data: &[T], channels: usize, mut emit: F)
    where
        T: Sample,
        f32: FromSample<T>,
        F: FnMut(&[i16]),
    {
        if channels == 0 {
            return;
        }
        for frame in data.chunks_exact(channels) {
            self.block[self.filled] = downmix(frame);
            self.filled += 1;
            if self.filled == self.block.len() {
                emit(&self.block);
                self.filled = 0;
            }
        }
    }
}

fn downmix<T>(frame: &[T]) -> i16
where
    T: Sample,
    f32: FromSample<T>,
{
    let sum: f32 = frame.iter().map(|&s| f32::from_sample(s)).sum();
    let mean = (sum / frame.len() as f32).clamp(-1.0, 1.0);
    i16::from_sample(mean)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
