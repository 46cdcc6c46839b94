//! Classifier tuning parameters
//!
//! [`ClassifierOptions`] gathers every threshold and switch the pipeline
//! and the adaptation engine consult. [`FilterPolicy`] carries the
//! hand-tuned result filters (punctuation/digit caps and numeric-mode
//! substitutions) as data so they can be retuned per script.

use crate::{ClassifyError, ClassifyResult};

/// Rules applied by the result filters
#[derive(Debug, Clone, PartialEq)]
pub struct FilterPolicy {
    /// Characters counted against [`FilterPolicy::punctuation_cap`]
    pub punctuation: Vec<char>,
    /// Maximum number of punctuation candidates kept (default: 2)
    pub punctuation_cap: usize,
    /// Characters counted against [`FilterPolicy::digit_cap`]
    pub digits: Vec<char>,
    /// Maximum number of digit candidates kept (default: 1)
    pub digit_cap: usize,
    /// Alphabetic classes allowed to survive in numeric mode
    pub numeric_allowed_alpha: Vec<char>,
    /// In numeric mode, `(letter, digit)` pairs where the letter's rating
    /// is transferred to the digit
    pub numeric_substitutions: Vec<(char, char)>,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self {
            punctuation: vec![
                '.', ',', ';', ':', '/', '`', '~', '\'', '-', '=', '\\', '|', '"', '!', '_', '^',
            ],
            punctuation_cap: 2,
            digits: ('0'..='9').collect(),
            digit_cap: 1,
            numeric_allowed_alpha: vec!['i', 'v', 'x', 'I', 'V', 'X'],
            numeric_substitutions: vec![('l', '1'), ('O', '0')],
        }
    }
}

impl FilterPolicy {
    /// Create a policy with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the punctuation set and its cap
    pub fn with_punctuation(mut self, chars: impl IntoIterator<Item = char>, cap: usize) -> Self {
        self.punctuation = chars.into_iter().collect();
        self.punctuation_cap = cap;
        self
    }

    /// Set the digit set and its cap
    pub fn with_digits(mut self, chars: impl IntoIterator<Item = char>, cap: usize) -> Self {
        self.digits = chars.into_iter().collect();
        self.digit_cap = cap;
        self
    }

    /// Set the alphabetic classes that survive numeric mode
    pub fn with_numeric_allowed_alpha(mut self, chars: impl IntoIterator<Item = char>) -> Self {
        self.numeric_allowed_alpha = chars.into_iter().collect();
        self
    }

    /// Set the numeric-mode letter to digit substitutions
    pub fn with_numeric_substitutions(
        mut self,
        pairs: impl IntoIterator<Item = (char, char)>,
    ) -> Self {
        self.numeric_substitutions = pairs.into_iter().collect();
        self
    }

    pub(crate) fn is_punctuation(&self, text: &str) -> bool {
        single_char(text).is_some_and(|c| self.punctuation.contains(&c))
    }

    pub(crate) fn is_digit(&self, text: &str) -> bool {
        single_char(text).is_some_and(|c| self.digits.contains(&c))
    }

    pub(crate) fn is_numeric_allowed(&self, text: &str) -> bool {
        single_char(text).is_some_and(|c| self.numeric_allowed_alpha.contains(&c))
    }

    pub(crate) fn numeric_substitute(&self, text: &str) -> Option<char> {
        let c = single_char(text)?;
        self.numeric_substitutions
            .iter()
            .find(|(letter, _)| *letter == c)
            .map(|&(_, digit)| digit)
    }
}

fn single_char(text: &str) -> Option<char> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

/// Options for the adaptive classifier
#[derive(Debug, Clone)]
pub struct ClassifierOptions {
    /// Rating at or below which a match is good enough to adapt to (default: 0.125)
    pub good_threshold: f32,
    /// Ratings above this are marginal and trigger the char-norm fallback (default: 0.0)
    pub great_threshold: f32,
    /// Rating at or below which a match is perfect (default: 0.02)
    pub perfect_threshold: f32,
    /// Candidates worse than best + pad are dropped (default: 0.15)
    pub bad_match_pad: f32,
    /// Rating margin used when deriving adaptation thresholds (default: 0.1)
    pub rating_margin: f32,
    /// Blob length at which the noise rating reaches 0.5 (default: 12.0)
    pub avg_noise_size: f32,
    /// Permanent classes required before the adapted path is used (default: 1)
    pub permanent_classes_min: usize,
    /// A temporary config seen fewer times is never promoted (default: 3)
    pub min_examples_for_prototyping: u32,
    /// A temporary config seen this often is always promoted (default: 5)
    pub sufficient_examples_for_prototyping: u32,
    /// Largest direction change, in turns, within one new proto (default: 0.015)
    pub clustering_max_angle_delta: f32,
    /// Length of one pico feature in normalized units (default: 0.05)
    pub pico_feature_length: f32,
    /// Penalty for non-alphanumerics outside their vertical range (default: 0.0)
    pub misfit_junk_penalty: f32,
    /// Rating penalty per unmatched feature (default: 1/256)
    pub class_miss_scale: f32,
    /// Output rating multiplier (default: 1.5)
    pub rating_scale: f32,
    /// Output certainty multiplier (default: 20.0)
    pub certainty_scale: f32,
    /// Weight of the normalization factor in the char-norm correction (default: 10)
    pub integer_matcher_multiplier: u32,
    /// Initial proto acceptance threshold, 0..=255 (default: 230)
    pub adapt_proto_threshold: u8,
    /// Initial feature acceptance threshold, 0..=255 (default: 230)
    pub adapt_feature_threshold: u8,
    /// Restrict alphabetic output to digit look-alikes (default: false)
    pub numeric_mode: bool,
    /// Always use the char-norm path (default: false)
    pub char_norm_only: bool,
    /// Never fall back from the adapted path (default: false)
    pub baseline_only: bool,
    /// Keep only the first pruned class on the char-norm path (default: false)
    pub single_match: bool,
    /// Gate promotion on confusable classes being learned (default: true)
    pub use_ambigs_for_adaption: bool,
    /// Learn from confirmed words (default: true)
    pub enable_learning: bool,
    /// Skip learning split characters as fragments (default: true)
    pub disable_character_fragments: bool,
    /// Learn fragments only when every piece is a natural split (default: false)
    pub prioritize_division: bool,
    /// Pieces whose best certainty is below this are garbage (default: -3.0)
    pub garbage_certainty_threshold: f32,
    /// Result filter rules
    pub filter_policy: FilterPolicy,
}

impl Default for ClassifierOptions {
    fn default() -> Self {
        Self {
            good_threshold: 0.125,
            great_threshold: 0.0,
            perfect_threshold: 0.02,
            bad_match_pad: 0.15,
            rating_margin: 0.1,
            avg_noise_size: 12.0,
            permanent_classes_min: 1,
            min_examples_for_prototyping: 3,
            sufficient_examples_for_prototyping: 5,
            clustering_max_angle_delta: 0.015,
            pico_feature_length: 0.05,
            misfit_junk_penalty: 0.0,
            class_miss_scale: 1.0 / 256.0,
            rating_scale: 1.5,
            certainty_scale: 20.0,
            integer_matcher_multiplier: 10,
            adapt_proto_threshold: 230,
            adapt_feature_threshold: 230,
            numeric_mode: false,
            char_norm_only: false,
            baseline_only: false,
            single_match: false,
            use_ambigs_for_adaption: true,
            enable_learning: true,
            disable_character_fragments: true,
            prioritize_division: false,
            garbage_certainty_threshold: -3.0,
            filter_policy: FilterPolicy::default(),
        }
    }
}

impl ClassifierOptions {
    /// Create new options with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the good-match threshold
    pub fn with_good_threshold(mut self, threshold: f32) -> Self {
        self.good_threshold = threshold;
        self
    }

    /// Set the great-match threshold
    pub fn with_great_threshold(mut self, threshold: f32) -> Self {
        self.great_threshold = threshold;
        self
    }

    /// Set the bad-match pad
    pub fn with_bad_match_pad(mut self, pad: f32) -> Self {
        self.bad_match_pad = pad;
        self
    }

    /// Set the noise size
    pub fn with_avg_noise_size(mut self, size: f32) -> Self {
        self.avg_noise_size = size;
        self
    }

    /// Set the number of permanent classes needed for the adapted path
    pub fn with_permanent_classes_min(mut self, n: usize) -> Self {
        self.permanent_classes_min = n;
        self
    }

    /// Set the minimum and sufficient example counts for promotion
    pub fn with_prototyping_examples(mut self, min: u32, sufficient: u32) -> Self {
        self.min_examples_for_prototyping = min;
        self.sufficient_examples_for_prototyping = sufficient;
        self
    }

    /// Set the vertical misfit penalty
    pub fn with_misfit_junk_penalty(mut self, penalty: f32) -> Self {
        self.misfit_junk_penalty = penalty;
        self
    }

    /// Enable or disable numeric mode
    pub fn with_numeric_mode(mut self, enabled: bool) -> Self {
        self.numeric_mode = enabled;
        self
    }

    /// Force the char-norm path
    pub fn with_char_norm_only(mut self, enabled: bool) -> Self {
        self.char_norm_only = enabled;
        self
    }

    /// Forbid falling back from the adapted path
    pub fn with_baseline_only(mut self, enabled: bool) -> Self {
        self.baseline_only = enabled;
        self
    }

    /// Keep only the best pruned class on the char-norm path
    pub fn with_single_match(mut self, enabled: bool) -> Self {
        self.single_match = enabled;
        self
    }

    /// Gate promotion on confusable classes
    pub fn with_use_ambigs_for_adaption(mut self, enabled: bool) -> Self {
        self.use_ambigs_for_adaption = enabled;
        self
    }

    /// Enable or disable learning
    pub fn with_learning(mut self, enabled: bool) -> Self {
        self.enable_learning = enabled;
        self
    }

    /// Enable or disable learning of character fragments
    pub fn with_character_fragments(mut self, enabled: bool) -> Self {
        self.disable_character_fragments = !enabled;
        self
    }

    /// Learn fragments only from natural splits
    pub fn with_prioritize_division(mut self, enabled: bool) -> Self {
        self.prioritize_division = enabled;
        self
    }

    /// Set the result filter rules
    pub fn with_filter_policy(mut self, policy: FilterPolicy) -> Self {
        self.filter_policy = policy;
        self
    }

    /// Validate options
    pub fn validate(&self) -> ClassifyResult<()> {
        let unit = |name: &str, v: f32| -> ClassifyResult<()> {
            if !(0.0..=1.0).contains(&v) {
                return Err(ClassifyError::InvalidParameter(format!(
                    "{} must be in [0, 1], got {}",
                    name, v
                )));
            }
            Ok(())
        };
        unit("good_threshold", self.good_threshold)?;
        unit("great_threshold", self.great_threshold)?;
        unit("perfect_threshold", self.perfect_threshold)?;
        unit("bad_match_pad", self.bad_match_pad)?;
        if self.avg_noise_size <= 0.0 {
            return Err(ClassifyError::InvalidParameter(
                "avg_noise_size must be positive".to_string(),
            ));
        }
        if self.min_examples_for_prototyping > self.sufficient_examples_for_prototyping {
            return Err(ClassifyError::InvalidParameter(
                "min_examples_for_prototyping must not exceed sufficient_examples_for_prototyping"
                    .to_string(),
            ));
        }
        if self.pico_feature_length <= 0.0 {
            return Err(ClassifyError::InvalidParameter(
                "pico_feature_length must be positive".to_string(),
            ));
        }
        if !(0.0..=0.5).contains(&self.clustering_max_angle_delta) {
            return Err(ClassifyError::InvalidParameter(
                "clustering_max_angle_delta must be in [0, 0.5]".to_string(),
            ));
        }
        if self.misfit_junk_penalty < 0.0 || self.class_miss_scale < 0.0 {
            return Err(ClassifyError::InvalidParameter(
                "penalties must not be negative".to_string(),
            ));
        }
        if self.rating_scale <= 0.0 || self.certainty_scale <= 0.0 {
            return Err(ClassifyError::InvalidParameter(
                "rating_scale and certainty_scale must be positive".to_string(),
            ));
        }
        if self.char_norm_only && self.baseline_only {
            return Err(ClassifyError::InvalidParameter(
                "char_norm_only and baseline_only are mutually exclusive".to_string(),
            ));
        }
        Ok(())
    }
}
