//! Playback duration estimation.

use crate::core::config::CompileConfig;

/// Estimated playback time in seconds, rounded to one decimal place.
///
/// `duration = (word_count / words_per_minute) * 60 + pause_count * pause_weight`.
/// The rounding keeps repeated compiles of unchanged input byte-identical.
/// Callers validate the config before any document is processed.
pub fn estimate_duration(word_count: u64, pause_count: u64, config: &CompileConfig) -> f64 {
    let from_words = (word_count as f64 / config.words_per_minute) * 60.0;
    let from_pauses = pause_count as f64 * config.pause_weight_seconds;
    round_tenths(from_words + from_pauses)
}

fn round_tenths(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config(wpm: f64, pause_weight: f64) -> CompileConfig {
        let mut config = CompileConfig::new(PathBuf::from("/vault"));
        config.words_per_minute = wpm;
        config.pause_weight_seconds = pause_weight;
        config
    }

    #[test]
    fn worked_example_from_documentation() {
        // 100 words at 150 wpm plus 3 pauses at 2s each.
        let duration = estimate_duration(100, 3, &config(150.0, 2.0));
        assert_eq!(duration, 46.0);
    }

    #[test]
    fn empty_document_is_zero() {
        assert_eq!(estimate_duration(0, 0, &config(150.0, 2.0)), 0.0);
    }

    #[test]
    fn result_is_rounded_to_one_decimal() {
        // 1 word at 180 wpm = 0.333... seconds.
        let duration = estimate_duration(1, 0, &config(180.0, 2.0));
        assert_eq!(duration, 0.3);
    }

    #[test]
    fn repeated_evaluation_is_identical() {
        let config = config(137.0, 1.5);
        let first = estimate_duration(977, 13, &config);
        let second = estimate_duration(977, 13, &config);
        assert_eq!(first.to_bits(), second.to_bits());
    }
}
