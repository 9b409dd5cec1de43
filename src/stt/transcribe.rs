//! Whisper decoding parameters.

use crate::config::SttConfig;

/// Mirrors `whisper_rs::SamplingStrategy` but is owned and `Clone`.
#[derive(Debug, Clone, PartialEq)]
pub enum SamplingStrategy {
    /// Single-pass decoding; lowest latency.
    Greedy { best_of: i32 },
    /// Beam search; better accuracy, 2-4× slower.
    BeamSearch { beam_size: i32, patience: f32 },
}

impl Default for SamplingStrategy {
    fn default() -> Self {
        Self::Greedy { best_of: 1 }
    }
}

/// Parameters for every Whisper run made by a [`crate::stt::WhisperEngine`].
///
/// ```
/// use mic_stream_asr::stt::TranscribeParams;
///
/// let params = TranscribeParams {
///     language: "en".into(),
///     ..TranscribeParams::default()
/// };
/// assert!(params.single_segment);
/// ```
#[derive(Debug, Clone)]
pub struct TranscribeParams {
    /// ISO-639-1 code, or `"auto"` for Whisper's language detection.
    pub language: String,
    pub strategy: SamplingStrategy,
    /// CPU threads handed to Whisper.
    pub n_threads: i32,
    /// Force a single output segment.  Utterances are short, so this keeps
    /// Whisper from splitting a phrase.
    pub single_segment: bool,
}

impl Default for TranscribeParams {
    fn default() -> Self {
        Self {
            language: "ja".into(),
            strategy: SamplingStrategy::default(),
            n_threads: optimal_threads(),
            single_segment: true,
        }
    }
}

impl From<&SttConfig> for TranscribeParams {
    fn from(cfg: &SttConfig) -> Self {
        Self {
            language: cfg.language.clone(),
            n_threads: cfg.n_threads.filter(|&n| n > 0).unwrap_or_else(optimal_threads),
            ..Self::default()
        }
    }
}

/// Available parallelism, capped at 8.
pub(crate) fn optimal_threads() -> i32 {
    std::thread::available_parallelism()
        .map(|n| n.get().min(8) as i32)
        .unwrap_or(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optimal_threads_is_positive_and_at_most_8() {
        let t = optimal_threads();
        assert!((1..=8).contains(&t));
    }

    #[test]
    fn params_follow_config() {
        let cfg = SttConfig {
            language: "en".into(),
            n_threads: Some(3),
            ..SttConfig::default()
        };
        let params = TranscribeParams::from(&cfg);
        assert_eq!(params.language, "en");
        assert_eq!(params.n_threads, 3);
        assert_eq!(params.strategy, SamplingStrategy::Greedy { best_of: 1 });
    }

    #[test]
    fn non_positive_thread_count_falls_back() {
        let cfg = SttConfig {
            n_threads: Some(0),
            ..SttConfig::default()
        };
        assert_eq!(TranscribeParams::from(&cfg).n_threads, optimal_threads());
    }
}
