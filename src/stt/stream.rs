//! Streaming recognition on top of a batch [`SttEngine`].
//!
//! The capture loop hands [`StreamingRecognizer::accept`] one merged PCM
//! buffer at a time.  [`UtteranceRecognizer`] decodes and resamples it,
//! runs it past an [`Endpointer`], and reports `true` once the speaker has
//! paused; [`StreamingRecognizer::result`] then transcribes the buffered
//! utterance and gets ready for the next one.

use std::sync::Arc;

use crate::audio::vad::FRAME_SIZE;
use crate::audio::{pcm16_to_f32, EndpointSettings, EndpointState, Endpointer, StreamResampler, VadDetector};
use crate::config::VadConfig;

use super::engine::{SttEngine, SttError};

/// Audio kept from before speech onset so the first syllable is not clipped.
const PREROLL_SAMPLES: usize = 4_800;

/// Incremental recognizer fed with 16-bit mono PCM.
pub trait StreamingRecognizer {
    /// Consume one buffer.  Returns `true` when a complete utterance is
    /// ready to be collected with [`result`](Self::result).
    fn accept(&mut self, buffer: &[u8]) -> bool;

    /// Transcribe the pending utterance and clear it.
    fn result(&mut self) -> Result<String, SttError>;

    /// Drop any pending audio and start listening afresh.
    fn reset(&mut self);
}

/// [`StreamingRecognizer`] that endpoints with energy VAD and transcribes
/// whole utterances with an [`SttEngine`].
pub struct UtteranceRecognizer {
    engine: Arc<dyn SttEngine>,
    resampler: StreamResampler,
    endpointer: Endpointer,
    audio: Vec<f32>,
}

impl UtteranceRecognizer {
    /// `sample_rate` is the rate of the PCM passed to `accept`.
    pub fn new(engine: Arc<dyn SttEngine>, sample_rate: u32, vad: &VadConfig) -> Self {
        Self {
            engine,
            resampler: StreamResampler::new(sample_rate),
            endpointer: Endpointer::new(EndpointSettings::from(vad)),
            audio: Vec::new(),
        }
    }

    pub fn state(&self) -> EndpointState {
        self.endpointer.state()
    }

    /// 16 kHz samples currently held for the pending utterance.
    pub fn buffered_samples(&self) -> usize {
        self.audio.len()
    }
}

impl StreamingRecognizer for UtteranceRecognizer {
    fn accept(&mut self, buffer: &[u8]) -> bool {
        if self.endpointer.state() == EndpointState::Complete {
            return true;
        }

        let samples = self.resampler.process(&pcm16_to_f32(buffer));
        self.audio.extend_from_slice(&samples);

        match self.endpointer.feed(&samples) {
            EndpointState::Calibrating => {
                self.audio.clear();
                false
            }
            EndpointState::Listening => {
                let excess = self.audio.len().saturating_sub(PREROLL_SAMPLES);
                self.audio.drain(..excess);
                false
            }
            EndpointState::Speaking => false,
            EndpointState::Complete => {
                log::debug!(
                    "utterance complete: {:.2} s buffered",
                    self.audio.len() as f32 / 16_000.0
                );
                true
            }
        }
    }

    fn result(&mut self) -> Result<String, SttError> {
        let mut audio = std::mem::take(&mut self.audio);
        audio.extend(self.resampler.flush());
        let threshold = self.endpointer.threshold();
        self.reset();

        let clip = VadDetector::new(threshold)
            .with_lead_in(PREROLL_SAMPLES / FRAME_SIZE)
            .trim_silence(&audio);
        if clip.is_empty() {
            return Err(SttError::NoSpeech);
        }
        self.engine.transcribe(clip)
    }

    fn reset(&mut self) {
        self.audio.clear();
        self.resampler.reset();
        self.endpointer.reset();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::Chunk;
    use crate::stt::engine::MockSttEngine;

    /// 30 ms frames at 16 kHz as PCM bytes.
    fn pcm(frames: usize, level: i16) -> Vec<u8> {
        Chunk::from_samples(&vec![level; frames * 480]).into_bytes()
    }

    fn vad() -> VadConfig {
        VadConfig {
            calibration_secs: 0.06, // 2 frames
            dynamic_energy_ratio: 1.5,
            min_energy_threshold: 0.01,
            pause_secs: 0.09, // 3 frames
            min_speech_secs: 0.06,
            max_utterance_secs: 30.0,
        }
    }

    fn recognizer(engine: Arc<MockSttEngine>) -> UtteranceRecognizer {
        UtteranceRecognizer::new(engine, 16_000, &vad())
    }

    #[test]
    fn utterance_is_detected_and_transcribed() {
        let engine = Arc::new(MockSttEngine::ok("終わり"));
        let mut rec = recognizer(Arc::clone(&engine));

        assert!(!rec.accept(&pcm(2, 0)));
        assert_eq!(rec.state(), EndpointState::Listening);
        assert!(!rec.accept(&pcm(10, 8_000)));
        assert_eq!(rec.state(), EndpointState::Speaking);
        assert!(rec.accept(&pcm(3, 0)));

        assert_eq!(rec.result().unwrap(), "終わり");
        assert_eq!(engine.calls(), 1);
        // The 2 quiet frames before onset stay; trailing silence goes.
        assert_eq!(engine.last_len(), 12 * 480);
    }

    #[test]
    fn preroll_reaches_the_engine() {
        let engine = Arc::new(MockSttEngine::ok("x"));
        let mut rec = recognizer(Arc::clone(&engine));

        rec.accept(&pcm(2, 0));
        rec.accept(&pcm(20, 0));
        assert_eq!(rec.buffered_samples(), PREROLL_SAMPLES);
        rec.accept(&pcm(10, 8_000));
        assert!(rec.accept(&pcm(3, 0)));

        rec.result().unwrap();
        assert_eq!(engine.last_len(), PREROLL_SAMPLES + 10 * 480);
    }

    #[test]
    fn device_rate_utterance_is_transcribed() {
        let engine = Arc::new(MockSttEngine::ok("x"));
        let mut rec = UtteranceRecognizer::new(engine.clone(), 48_000, &vad());
        let block = |level: i16| Chunk::from_samples(&vec![level; 4_800]).into_bytes();

        // 0.3 s of quiet to calibrate, then 0.5 s voiced, then a pause.
        for _ in 0..3 {
            rec.accept(&block(0));
        }
        for _ in 0..5 {
            rec.accept(&block(8_000));
        }
        let mut complete = false;
        for _ in 0..5 {
            complete = rec.accept(&block(0));
            if complete {
                break;
            }
        }
        assert!(complete);
        assert_eq!(rec.result().unwrap(), "x");
        assert!(engine.last_len() >= 8_000 - 2 * 480);
    }

    #[test]
    fn accept_stays_true_until_result() {
        let engine = Arc::new(MockSttEngine::ok("x"));
        let mut rec = recognizer(engine);
        rec.accept(&pcm(2, 0));
        rec.accept(&pcm(10, 8_000));
        assert!(rec.accept(&pcm(3, 0)));
        assert!(rec.accept(&pcm(1, 8_000)));
    }

    #[test]
    fn result_resets_for_next_utterance() {
        let engine = Arc::new(MockSttEngine::ok("x"));
        let mut rec = recognizer(engine);
        rec.accept(&pcm(2, 0));
        rec.accept(&pcm(10, 8_000));
        rec.accept(&pcm(3, 0));
        let _ = rec.result();

        assert_eq!(rec.state(), EndpointState::Calibrating);
        assert_eq!(rec.buffered_samples(), 0);
    }

    #[test]
    fn calibration_audio_is_not_buffered() {
        let engine = Arc::new(MockSttEngine::ok("x"));
        let mut rec = recognizer(engine);
        rec.accept(&pcm(1, 0));
        assert_eq!(rec.buffered_samples(), 0);
    }

    #[test]
    fn idle_listening_keeps_only_preroll() {
        let engine = Arc::new(MockSttEngine::ok("x"));
        let mut rec = recognizer(engine);
        rec.accept(&pcm(2, 0));
        for _ in 0..20 {
            rec.accept(&pcm(10, 0));
        }
        assert!(rec.buffered_samples() <= PREROLL_SAMPLES);
    }

    #[test]
    fn silent_result_is_no_speech() {
        let engine = Arc::new(MockSttEngine::ok("x"));
        let mut rec = recognizer(Arc::clone(&engine));
        rec.accept(&pcm(5, 0));
        assert!(matches!(rec.result(), Err(SttError::NoSpeech)));
        assert_eq!(engine.calls(), 0);
    }

    #[test]
    fn engine_errors_pass_through() {
        let engine = Arc::new(MockSttEngine::err(SttError::Transcription("bad".into())));
        let mut rec = recognizer(engine);
        rec.accept(&pcm(2, 0));
        rec.accept(&pcm(10, 8_000));
        rec.accept(&pcm(3, 0));
        assert!(matches!(rec.result(), Err(SttError::Transcription(_))));
    }

    #[test]
    fn resamples_device_rate_input() {
        let engine = Arc::new(MockSttEngine::ok("x"));
        let mut rec = UtteranceRecognizer::new(engine, 48_000, &vad());
        // 1 s of 48 kHz silence in 8 000-sample blocks
        for _ in 0..6 {
            rec.accept(&Chunk::from_samples(&vec![0i16; 8_000]).into_bytes());
        }
        assert_eq!(rec.state(), EndpointState::Listening);
    }
}
