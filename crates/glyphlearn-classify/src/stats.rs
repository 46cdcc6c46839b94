//! Session counters

use std::fmt;

/// Counters accumulated over a classification session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdaptiveStats {
    /// Blobs passed to the adaptive matcher
    pub blobs_classified: u64,
    /// Candidates reported across all blobs
    pub classes_output: u64,
    pub baseline_classifier_calls: u64,
    pub baseline_classes_tried: u64,
    pub char_norm_classifier_calls: u64,
    pub char_norm_classes_tried: u64,
    pub ambiguity_classifier_calls: u64,
    pub ambiguity_classes_tried: u64,
    pub words_adapted: u64,
    pub chars_adapted: u64,
    /// Adaptations abandoned because a class ran out of configs or protos
    pub adaptations_failed: u64,
}

impl AdaptiveStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Average of `tried` per `calls`, 0 when there were no calls
    fn per_call(tried: u64, calls: u64) -> f64 {
        if calls == 0 {
            0.0
        } else {
            tried as f64 / calls as f64
        }
    }
}

impl fmt::Display for AdaptiveStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Adaptive matcher: {} blobs classified", self.blobs_classified)?;
        writeln!(
            f,
            "  classes output: {} ({:.2} per blob)",
            self.classes_output,
            Self::per_call(self.classes_output, self.blobs_classified)
        )?;
        writeln!(
            f,
            "  baseline classifier: {} calls, {:.2} classes per call",
            self.baseline_classifier_calls,
            Self::per_call(self.baseline_classes_tried, self.baseline_classifier_calls)
        )?;
        writeln!(
            f,
            "  char-norm classifier: {} calls, {:.2} classes per call",
            self.char_norm_classifier_calls,
            Self::per_call(self.char_norm_classes_tried, self.char_norm_classifier_calls)
        )?;
        writeln!(
            f,
            "  ambiguity classifier: {} calls, {:.2} classes per call",
            self.ambiguity_classifier_calls,
            Self::per_call(self.ambiguity_classes_tried, self.ambiguity_classifier_calls)
        )?;
        writeln!(
            f,
            "Adaptation: {} words, {} chars, {} failed",
            self.words_adapted, self.chars_adapted, self.adaptations_failed
        )
    }
}
