//! Energy-based voice activity detection.
//!
//! Two pieces live here:
//!
//! * [`VadDetector`] trims leading and trailing silence from a finished clip
//!   before it goes to Whisper, which otherwise tends to hallucinate text in
//!   quiet stretches.
//! * [`Endpointer`] watches live 16 kHz audio, calibrates its speech
//!   threshold against the room's ambient noise, and decides when an
//!   utterance has ended.
//!
//! Audio is analysed in 30 ms frames (480 samples @ 16 kHz).  A frame is
//! *voice* when its RMS amplitude exceeds the threshold.

use crate::config::VadConfig;

/// 30 ms at 16 kHz.
pub const FRAME_SIZE: usize = 480;

const FRAMES_PER_SEC: f32 = 16_000.0 / FRAME_SIZE as f32;

/// RMS amplitude of `frame`; `0.0` for an empty slice.
pub fn frame_rms(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let mean_sq: f32 = frame.iter().map(|s| s * s).sum::<f32>() / frame.len() as f32;
    mean_sq.sqrt()
}

// ---------------------------------------------------------------------------
// VadDetector
// ---------------------------------------------------------------------------

/// Energy-based silence trimmer.
///
/// ```rust
/// use mic_stream_asr::audio::VadDetector;
///
/// let mut audio = vec![0.0_f32; 960];
/// audio.extend(vec![0.5_f32; 480]);
/// audio.extend(vec![0.0_f32; 480]);
///
/// assert_eq!(VadDetector::new(0.01).trim_silence(&audio).len(), 480);
/// assert_eq!(VadDetector::new(0.01).with_lead_in(1).trim_silence(&audio).len(), 960);
/// ```
pub struct VadDetector {
    rms_threshold: f32,
    lead_in_frames: usize,
}

impl VadDetector {
    pub fn new(rms_threshold: f32) -> Self {
        Self {
            rms_threshold,
            lead_in_frames: 0,
        }
    }

    /// Keep up to `frames` quiet frames ahead of the first voiced one, so a
    /// soft onset survives the trim.
    pub fn with_lead_in(mut self, frames: usize) -> Self {
        self.lead_in_frames = frames;
        self
    }

    pub fn threshold(&self) -> f32 {
        self.rms_threshold
    }

    fn is_voice_frame(&self, frame: &[f32]) -> bool {
        !frame.is_empty() && frame_rms(frame) > self.rms_threshold
    }

    /// Trim leading and trailing silence from `audio`.
    ///
    /// Returns a sub-slice of the input; an all-silent clip yields an empty
    /// slice.
    pub fn trim_silence<'a>(&self, audio: &'a [f32]) -> &'a [f32] {
        let frames: Vec<&[f32]> = audio.chunks(FRAME_SIZE).collect();

        let Some(first) = frames.iter().position(|f| self.is_voice_frame(f)) else {
            return &audio[0..0];
        };
        let last = frames
            .iter()
            .rposition(|f| self.is_voice_frame(f))
            .unwrap_or(first);

        let start = first.saturating_sub(self.lead_in_frames) * FRAME_SIZE;
        let end = ((last + 1) * FRAME_SIZE).min(audio.len());
        &audio[start..end]
    }
}

// ---------------------------------------------------------------------------
// Endpointer
// ---------------------------------------------------------------------------

/// Frame-count form of the [`VadConfig`] timings.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointSettings {
    /// Leading frames used to measure ambient noise.
    pub calibration_frames: usize,
    /// Threshold = ambient RMS × this ratio.
    pub dynamic_energy_ratio: f32,
    /// Lower bound on the threshold.
    pub min_threshold: f32,
    /// Consecutive silent frames that close an utterance.
    pub pause_frames: usize,
    /// Voice frames required before a pause can close an utterance.
    pub min_speech_frames: usize,
    /// Frames after speech onset at which the utterance is cut.
    pub max_utterance_frames: usize,
}

impl From<&VadConfig> for EndpointSettings {
    fn from(cfg: &VadConfig) -> Self {
        let frames = |secs: f32| (secs.max(0.0) * FRAMES_PER_SEC).round() as usize;
        Self {
            calibration_frames: frames(cfg.calibration_secs),
            dynamic_energy_ratio: cfg.dynamic_energy_ratio,
            min_threshold: cfg.min_energy_threshold,
            pause_frames: frames(cfg.pause_secs).max(1),
            min_speech_frames: frames(cfg.min_speech_secs).max(1),
            max_utterance_frames: frames(cfg.max_utterance_secs).max(1),
        }
    }
}

/// Where the endpointer is within the current utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    /// Measuring ambient noise; speech is not detected yet.
    Calibrating,
    /// Waiting for speech.
    Listening,
    /// Speech has started.
    Speaking,
    /// The utterance is over.  Sticky until [`Endpointer::reset`].
    Complete,
}

/// Streaming end-of-utterance detector.
pub struct Endpointer {
    settings: EndpointSettings,
    state: EndpointState,
    threshold: f32,
    carry: Vec<f32>,
    calibration_sum: f32,
    calibration_seen: usize,
    speech_frames: usize,
    utterance_frames: usize,
    trailing_silence: usize,
}

impl Endpointer {
    pub fn new(settings: EndpointSettings) -> Self {
        let mut ep = Self {
            threshold: settings.min_threshold,
            settings,
            state: EndpointState::Calibrating,
            carry: Vec::with_capacity(FRAME_SIZE),
            calibration_sum: 0.0,
            calibration_seen: 0,
            speech_frames: 0,
            utterance_frames: 0,
            trailing_silence: 0,
        };
        ep.reset();
        ep
    }

    /// Start over for a new utterance, including recalibration.
    pub fn reset(&mut self) {
        self.state = if self.settings.calibration_frames == 0 {
            EndpointState::Listening
        } else {
            EndpointState::Calibrating
        };
        self.threshold = self.settings.min_threshold;
        self.carry.clear();
        self.calibration_sum = 0.0;
        self.calibration_seen = 0;
        self.speech_frames = 0;
        self.utterance_frames = 0;
        self.trailing_silence = 0;
    }

    pub fn state(&self) -> EndpointState {
        self.state
    }

    /// Current speech threshold (RMS).
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Analyse 16 kHz samples.  Returns the state after the last whole frame.
    pub fn feed(&mut self, samples: &[f32]) -> EndpointState {
        let mut rest = samples;
        while self.state != EndpointState::Complete && !rest.is_empty() {
            let take = (FRAME_SIZE - self.carry.len()).min(rest.len());
            self.carry.extend_from_slice(&rest[..take]);
            rest = &rest[take..];
            if self.carry.len() == FRAME_SIZE {
                let rms = frame_rms(&self.carry);
                self.carry.clear();
                self.on_frame(rms);
            }
        }
        self.state
    }

    fn on_frame(&mut self, rms: f32) {
        match self.state {
            EndpointState::Calibrating => {
                self.calibration_sum += rms;
                self.calibration_seen += 1;
                if self.calibration_seen >= self.settings.calibration_frames {
                    let ambient = self.calibration_sum / self.calibration_seen as f32;
                    self.threshold =
                        (ambient * self.settings.dynamic_energy_ratio).max(self.settings.min_threshold);
                    log::debug!("ambient rms {ambient:.5}, speech threshold {:.5}", self.threshold);
                    self.state = EndpointState::Listening;
                }
            }
            EndpointState::Listening => {
                if rms > self.threshold {
                    self.state = EndpointState::Speaking;
                    self.speech_frames = 1;
                    self.utterance_frames = 1;
                    self.trailing_silence = 0;
                }
            }
            EndpointState::Speaking => {
                self.utterance_frames += 1;
                if rms > self.threshold {
                    self.speech_frames += 1;
                    self.trailing_silence = 0;
                } else {
                    self.trailing_silence += 1;
                }

                if self.utterance_frames >= self.settings.max_utterance_frames {
                    self.state = EndpointState::Complete;
                } else if self.trailing_silence >= self.settings.pause_frames {
                    if self.speech_frames >= self.settings.min_speech_frames {
                        self.state = EndpointState::Complete;
                    } else {
                        // Too short to be speech: a click or a cough.
                        self.state = EndpointState::Listening;
                        self.speech_frames = 0;
                        self.utterance_frames = 0;
                    }
                }
            }
            EndpointState::Complete => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
