//! PCM decoding and resampling for the recognizer.
//!
//! The Whisper engine wants **16 kHz mono `f32`**.  Capture delivers
//! 16-bit little-endian PCM at whatever rate the device runs, so the
//! recognizer runs every merged buffer through:
//!
//! 1. [`pcm16_to_f32`] decodes bytes to `[-1.0, 1.0)` floats.
//! 2. [`StreamResampler`] converts to 16 kHz across buffer boundaries
//!    (rubato FFT resampler, linear interpolation as a fallback).

use rubato::{FftFixedIn, Resampler};

/// Rate expected by the STT engine.
pub const TARGET_RATE: u32 = 16_000;

/// Input frames per rubato processing step.
const RESAMPLER_CHUNK: usize = 1_024;

// ---------------------------------------------------------------------------
// pcm16_to_f32
// ---------------------------------------------------------------------------

/// Decode little-endian `i16` PCM bytes.  A trailing odd byte is ignored.
///
/// ```rust
/// use mic_stream_asr::audio::pcm16_to_f32;
///
/// let samples = pcm16_to_f32(&[0x00, 0x40, 0x00, 0xC0]);
/// assert_eq!(samples, vec![0.5, -0.5]);
/// ```
pub fn pcm16_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / 32_768.0)
        .collect()
}

// ---------------------------------------------------------------------------
// resample_to_16k
// ---------------------------------------------------------------------------

/// Resample `samples` from `source_rate` Hz to 16 000 Hz using linear
/// interpolation.
///
/// Output length is `ceil(samples.len() * 16_000 / source_rate)`.
///
/// ```rust
/// use mic_stream_asr::audio::resample_to_16k;
///
/// let hi = vec![0.5_f32; 480];
/// let lo = resample_to_16k(&hi, 48_000);
/// assert_eq!(lo.len(), 160);
/// ```
pub fn resample_to_16k(samples: &[f32], source_rate: u32) -> Vec<f32> {
    if source_rate == TARGET_RATE || source_rate == 0 {
        return samples.to_vec();
    }
    if samples.is_empty() {
        return Vec::new();
    }

    let ratio = TARGET_RATE as f64 / source_rate as f64;
    let output_len = (samples.len() as f64 * ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let src_pos = i as f64 / ratio;
            let idx = src_pos as usize;
            let frac = (src_pos - idx as f64) as f32;
            match (samples.get(idx), samples.get(idx + 1)) {
                (Some(&a), Some(&b)) => a * (1.0 - frac) + b * frac,
                (Some(&a), None) => a,
                _ => 0.0,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// StreamResampler
// ---------------------------------------------------------------------------

/// Incremental resampler to [`TARGET_RATE`].
///
/// Audio arrives in arbitrarily sized pieces; input frames are buffered
/// until the FFT resampler has a full chunk to work on, so no samples are
/// dropped or padded at piece boundaries.  [`flush`](Self::flush) drains the
/// remainder at the end of an utterance.
pub struct StreamResampler {
    source_rate: u32,
    fft: Option<FftFixedIn<f32>>,
    pending: Vec<f32>,
}

impl StreamResampler {
    pub fn new(source_rate: u32) -> Self {
        let fft = if source_rate == TARGET_RATE || source_rate == 0 {
            None
        } else {
            match FftFixedIn::<f32>::new(
                source_rate as usize,
                TARGET_RATE as usize,
                RESAMPLER_CHUNK,
                2,
                1,
            ) {
                Ok(r) => Some(r),
                Err(e) => {
                    log::warn!("FFT resampler unavailable for {source_rate} Hz ({e}); using linear");
                    None
                }
            }
        };
        Self {
            source_rate,
            fft,
            pending: Vec::new(),
        }
    }

    /// Resample `samples`, returning whatever 16 kHz output is ready.
    pub fn process(&mut self, samples: &[f32]) -> Vec<f32> {
        let Some(fft) = self.fft.as_mut() else {
            return resample_to_16k(samples, self.source_rate);
        };

        self.pending.extend_from_slice(samples);
        let mut out = Vec::new();
        loop {
            let need = fft.input_frames_next();
            if self.pending.len() < need {
                break;
            }
            let input: &[f32] = &self.pending[..need];
            match fft.process(std::slice::from_ref(&input), None) {
                Ok(frames) => {
                    if let Some(mono) = frames.first() {
                        out.extend_from_slice(mono);
                    }
                }
                Err(e) => {
                    log::warn!("resampler step failed ({e}); interpolating instead");
                    out.extend(resample_to_16k(&self.pending[..need], self.source_rate));
                }
            }
            self.pending.drain(..need);
        }
        out
    }

    /// Convert any buffered input that did not fill a whole chunk.
    pub fn flush(&mut self) -> Vec<f32> {
        let rest = std::mem::take(&mut self.pending);
        if rest.is_empty() {
            return rest;
        }
        resample_to_16k(&rest, self.source_rate)
    }

    /// Forget buffered input and resampler history.
    pub fn reset(&mut self) {
        *self = Self::new(self.source_rate);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pcm16_decodes_extremes() {
        let bytes = [0x00, 0x80, 0xFF, 0x7F, 0x00, 0x00];
        let out = pcm16_to_f32(&bytes);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0], -1.0);
        assert!((out[1] - 32_767.0 / 32_768.0).abs() < 1e-7);
        assert_eq!(out[2], 0.0);
    }

    #[test]
    fn pcm16_ignores_odd_trailing_byte() {
        assert_eq!(pcm16_to_f32(&[0x00, 0x00, 0x12]).len(), 1);
    }

    #[test]
    fn linear_resample_is_noop_at_16k() {
        let input: Vec<f32> = (0..160).map(|i| i as f32 / 160.0).collect();
        assert_eq!(resample_to_16k(&input, 16_000), input);
    }

    #[test]
    fn linear_resample_44100_length() {
        let out = resample_to_16k(&vec![0.0_f32; 44_100], 44_100);
        assert!(out.len().abs_diff(16_000) <= 1, "got {}", out.len());
    }

    #[test]
    fn linear_resample_upsamples_8k() {
        let out = resample_to_16k(&[0.0_f32; 80], 8_000);
        assert_eq!(out.len(), 160);
    }

    #[test]
    fn linear_resample_keeps_dc_level() {
        for s in resample_to_16k(&[0.5_f32; 480], 48_000) {
            assert!((s - 0.5).abs() < 1e-5);
        }
    }

    #[test]
    fn stream_resampler_passthrough_at_16k() {
        let mut rs = StreamResampler::new(16_000);
        let input = vec![0.25_f32; 300];
        assert_eq!(rs.process(&input), input);
        assert!(rs.flush().is_empty());
    }

    #[test]
    fn stream_resampler_48k_output_length_converges() {
        let mut rs = StreamResampler::new(48_000);
        let mut produced = 0usize;
        // 1 s of audio in uneven pieces
        for piece in [1_000usize, 7_000, 15_000, 25_000] {
            produced += rs.process(&vec![0.0_f32; piece]).len();
        }
        produced += rs.flush().len();
        assert!(produced.abs_diff(16_000) <= 2 * RESAMPLER_CHUNK, "got {produced}");
    }

    #[test]
    fn stream_resampler_buffers_partial_chunks() {
        let mut rs = StreamResampler::new(48_000);
        assert!(rs.process(&[0.0_f32; 10]).is_empty());
        assert!(!rs.flush().is_empty());
        assert!(rs.flush().is_empty());
    }

    #[test]
    fn reset_clears_pending_input() {
        let mut rs = StreamResampler::new(44_100);
        let _ = rs.process(&[0.1_f32; 100]);
        rs.reset();
        assert!(rs.flush().is_empty());
        assert_eq!(rs.process(&[0.1_f32; 10]).len(), 0);
    }
}
