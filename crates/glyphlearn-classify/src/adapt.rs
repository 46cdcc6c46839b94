//! Adaptation engine
//!
//! Learns document-specific glyph variants from confirmed labels:
//!
//! - an empty class is bootstrapped straight from the blob's outline
//! - a good match to a temporary config reinforces it
//! - a poor match creates a new temporary config from the protos that
//!   still fit plus new protos clustered from the unexplained features
//! - a temporary config seen often enough is promoted, and promotion
//!   cascades to the configs of classes that were waiting on it

use std::borrow::Cow;
use std::collections::VecDeque;

use glyphlearn_core::{
    Blob, ClassId, ConfigId, Feature, FontId, Fragment, IntFeature, MAX_NUM_CONFIGS,
    MAX_NUM_PROTOS, ProtoMask, UNLIKELY_NUM_FEATURES, quantize_features,
};

use crate::filters;
use crate::pipeline::AdaptiveClassifier;
use crate::reference::angle_delta;
use crate::results::ResultSet;
use crate::templates::{AdaptedTemplateStore, Proto, all_configs_off, all_configs_on, all_protos_on};
use crate::{ClassifyError, ClassifyResult};

/// Longest word that is considered for adaptation
pub const MAX_ADAPTABLE_WORD_SIZE: usize = 40;

/// What a single adaptation call did
#[derive(Debug, Clone, PartialEq)]
pub enum AdaptOutcome {
    /// The class was empty and now has its first config
    Bootstrapped { num_protos: usize },
    /// The blob matched a permanent config; nothing to learn
    AlreadyPermanent { config: ConfigId },
    /// The blob matched a temporary config, which was seen once more
    Reinforced {
        config: ConfigId,
        times_seen: u32,
        promoted: bool,
    },
    /// The blob matched poorly and a new temporary config was created
    NewTemporaryConfig { config: ConfigId, promoted: bool },
    /// Punctuation was not learned because the blob reads as several classes
    Ambiguous { alternatives: Vec<ClassId> },
}

/// Confirmed label for one character of a word
#[derive(Debug, Clone, PartialEq)]
pub struct LabelSpan {
    /// Class text; empty text is skipped
    pub text: String,
    /// Number of consecutive blobs the character spans
    pub blob_count: usize,
    /// Rating a match must reach to count as good; derived from the
    /// current classification when `None`
    pub threshold: Option<f32>,
    /// True if every piece of a multi-blob character is a natural split
    pub pieces_natural: bool,
    /// False for characters rejected by the caller
    pub learn: bool,
}

impl LabelSpan {
    pub fn new(text: impl Into<String>, blob_count: usize) -> Self {
        Self {
            text: text.into(),
            blob_count,
            threshold: None,
            pieces_natural: false,
            learn: true,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_natural_pieces(mut self, natural: bool) -> Self {
        self.pieces_natural = natural;
        self
    }

    /// Keeps the span for blob accounting but skips learning it
    pub fn rejected(mut self) -> Self {
        self.learn = false;
        self
    }
}

/// A recognized word with its confirmed labels
#[derive(Debug, Clone, Default)]
pub struct WordSample {
    pub blobs: Vec<Blob>,
    pub labels: Vec<LabelSpan>,
    pub font_id: FontId,
}

impl WordSample {
    pub fn new(blobs: Vec<Blob>) -> Self {
        Self {
            blobs,
            labels: Vec::new(),
            font_id: 0,
        }
    }

    pub fn with_font(mut self, font_id: FontId) -> Self {
        self.font_id = font_id;
        self
    }

    pub fn with_label(mut self, label: LabelSpan) -> Self {
        self.labels.push(label);
        self
    }

    /// Adds one single-blob label per character of `text`
    pub fn with_text(mut self, text: &str) -> Self {
        self.labels
            .extend(text.chars().map(|c| LabelSpan::new(c.to_string(), 1)));
        self
    }
}

fn check_feature_count(num_features: usize) -> ClassifyResult<()> {
    if num_features == 0 || num_features > UNLIKELY_NUM_FEATURES {
        return Err(ClassifyError::InputRejected { num_features });
    }
    Ok(())
}

/// Greedily merges runs of unexplained features into new protos
///
/// `bad` indexes `features` in ascending outline order. A run continues
/// while the next feature's direction is within `max_angle_delta` of the
/// run's first feature and it lies within the run's length of the first
/// feature along both axes. Each run becomes one proto spanning from its
/// first to its last feature, in the first feature's direction.
pub fn cluster_new_protos(
    features: &[Feature],
    bad: &[usize],
    max_angle_delta: f32,
    pico_length: f32,
) -> Vec<Proto> {
    let bad: Vec<&Feature> = bad.iter().filter_map(|&i| features.get(i)).collect();
    let mut protos = Vec::new();
    let mut start = 0;
    while start < bad.len() {
        let first = bad[start];
        let mut end = start + 1;
        let mut length = pico_length;
        while end < bad.len() {
            let f = bad[end];
            if angle_delta(first.direction, f.direction) > max_angle_delta
                || (first.x - f.x).abs() > length
                || (first.y - f.y).abs() > length
            {
                break;
            }
            end += 1;
            length += pico_length;
        }
        let last = bad[end - 1];
        protos.push(Proto::new(
            (first.x + last.x) / 2.0,
            (first.y + last.y) / 2.0,
            first.direction,
            length,
        ));
        start = end;
    }
    protos
}

impl AdaptiveClassifier {
    /// Learns `blob` as an example of `class_id` in font `font_id`
    ///
    /// `threshold` is the rating a match must reach to count as good; it
    /// also sets the session's proto and feature acceptance thresholds.
    pub fn adapt_to_char(
        &mut self,
        blob: &Blob,
        class_id: ClassId,
        font_id: FontId,
        threshold: f32,
    ) -> ClassifyResult<AdaptOutcome> {
        self.stats.chars_adapted += 1;
        let outcome = self.adapt_char(blob, class_id, font_id, threshold);
        if let Err(ClassifyError::CapacityExhausted { class_id, what }) = &outcome {
            self.stats.adaptations_failed += 1;
            tracing::debug!(
                class = self.classes.text(*class_id),
                what = *what,
                "adaptation failed, class is full"
            );
        }
        outcome
    }

    fn adapt_char(
        &mut self,
        blob: &Blob,
        class_id: ClassId,
        font_id: FontId,
        threshold: f32,
    ) -> ClassifyResult<AdaptOutcome> {
        if !self.classes.is_legal(class_id) || class_id.index() >= self.adapted.num_classes() {
            return Err(ClassifyError::InvalidClassId {
                class_id,
                num_classes: self.adapted.num_classes(),
            });
        }

        if self.adapted.is_empty_class(class_id) {
            let features = self.feature_provider.outline_features(blob);
            check_feature_count(features.len())?;
            let num_protos = self.adapted.init_class(class_id, font_id, &features)?;
            if let Some(pretrained) = &self.pretrained {
                self.baseline_cutoffs[class_id.index()] = pretrained.cutoff(class_id);
            }
            tracing::debug!(
                class = self.classes.text(class_id),
                font_id,
                num_protos,
                "added new class"
            );
            return Ok(AdaptOutcome::Bootstrapped { num_protos });
        }

        let picos = self.feature_provider.pico_features(blob);
        check_feature_count(picos.len())?;
        let features = quantize_features(&picos);

        let (class, compiled) = self
            .adapted
            .class(class_id)
            .zip(self.adapted.compiled(class_id))
            .ok_or(ClassifyError::InvalidClassId {
                class_id,
                num_classes: self.adapted.num_classes(),
            })?;
        let font_configs = class.configs_with_font(font_id);
        let m = self.matcher.match_class(
            compiled,
            &all_protos_on(),
            &font_configs,
            &features,
            self.adapt_feature_threshold,
        );
        let good_match = m.rating <= threshold && font_configs.test(m.config);
        let permanent = class.is_permanent(m.config);
        self.set_adaptive_threshold(threshold);

        if good_match {
            if permanent {
                tracing::debug!(
                    class = self.classes.text(class_id),
                    config = m.config,
                    rating = m.rating,
                    "good match to permanent config"
                );
                return Ok(AdaptOutcome::AlreadyPermanent { config: m.config });
            }
            let times_seen = self
                .adapted
                .increase_confidence(class_id, m.config)
                .unwrap_or_default();
            tracing::debug!(
                class = self.classes.text(class_id),
                config = m.config,
                times_seen,
                "reinforced temporary config"
            );
            let promoted = self.promote_if_reliable(blob, class_id, m.config)?;
            return Ok(AdaptOutcome::Reinforced {
                config: m.config,
                times_seen,
                promoted,
            });
        }

        tracing::debug!(
            class = self.classes.text(class_id),
            config = m.config,
            rating = m.rating,
            "poor match, creating temporary config"
        );
        let config = self.make_new_temporary_config(class_id, font_id, &features, &picos)?;
        let promoted = self.promote_if_reliable(blob, class_id, config)?;
        Ok(AdaptOutcome::NewTemporaryConfig { config, promoted })
    }

    /// Learns a punctuation blob only when the pre-trained templates read
    /// it as exactly one class
    pub fn adapt_to_punctuation(
        &mut self,
        blob: &Blob,
        class_id: ClassId,
        font_id: FontId,
        threshold: f32,
    ) -> ClassifyResult<AdaptOutcome> {
        if self.pretrained.is_none() {
            return Err(ClassifyError::MissingResource("pre-trained templates"));
        }
        let features = self
            .feature_provider
            .extract(blob, self.classes.len())
            .ok_or(ClassifyError::InputRejected { num_features: 0 })?;
        let mut results = ResultSet::new(self.classes.len());
        results.blob_length = features.blob_length;
        self.char_norm_path(blob, &features, &mut results);
        filters::remove_bad_matches(&mut results, &self.options, &self.classes);

        if results.len() != 1 {
            let alternatives: Vec<ClassId> = results.iter().map(|m| m.class_id).collect();
            let texts: Vec<&str> = alternatives.iter().map(|&id| self.classes.text(id)).collect();
            tracing::warn!(
                class = self.classes.text(class_id),
                alternatives = ?texts,
                "rejecting punctuation"
            );
            return Ok(AdaptOutcome::Ambiguous { alternatives });
        }
        tracing::debug!(class = self.classes.text(class_id), threshold, "adapting to punctuation");
        self.adapt_to_char(blob, class_id, font_id, threshold)
    }

    /// Maps a rating threshold onto the 0..=255 acceptance thresholds
    fn set_adaptive_threshold(&mut self, threshold: f32) {
        let t = if threshold == self.options.good_threshold {
            0.9
        } else {
            1.0 - threshold
        };
        let value = ((255.0 * t) as i32).clamp(0, 255) as u8;
        self.adapt_proto_threshold = value;
        self.adapt_feature_threshold = value;
    }

    fn make_new_temporary_config(
        &mut self,
        class_id: ClassId,
        font_id: FontId,
        features: &[IntFeature],
        picos: &[Feature],
    ) -> ClassifyResult<ConfigId> {
        let compiled = self
            .adapted
            .compiled(class_id)
            .ok_or(ClassifyError::InvalidClassId {
                class_id,
                num_classes: self.adapted.num_classes(),
            })?;
        if compiled.num_configs() >= MAX_NUM_CONFIGS {
            return Err(ClassifyError::CapacityExhausted {
                class_id,
                what: "configs",
            });
        }

        let good = self.matcher.find_good_protos(
            compiled,
            &all_protos_on(),
            &all_configs_off(),
            features,
            self.adapt_proto_threshold,
        );
        let mut good_mask = ProtoMask::new(MAX_NUM_PROTOS);
        for &pid in &good {
            good_mask.set(pid);
        }
        let bad = self.matcher.find_bad_features(
            compiled,
            &good_mask,
            &all_configs_on(),
            features,
            self.adapt_feature_threshold,
        );
        let new_protos = cluster_new_protos(
            picos,
            &bad,
            self.options.clustering_max_angle_delta,
            self.options.pico_feature_length,
        );

        let config = self
            .adapted
            .add_temporary_config(class_id, font_id, &good, &new_protos)?;
        tracing::debug!(
            class = self.classes.text(class_id),
            config,
            font_id,
            good_protos = good.len(),
            bad_features = bad.len(),
            new_protos = new_protos.len(),
            "created temporary config"
        );
        Ok(config)
    }

    /// Decides whether a temporary config has earned promotion
    pub fn temp_config_reliable(&self, class_id: ClassId, config: ConfigId) -> bool {
        let Some(temp) = self
            .adapted
            .class(class_id)
            .and_then(|c| c.temp_config(config))
        else {
            return false;
        };
        let min = self.options.min_examples_for_prototyping;
        if temp.times_seen >= self.options.sufficient_examples_for_prototyping {
            return true;
        }
        if temp.times_seen < min {
            return false;
        }
        if !self.options.use_ambigs_for_adaption {
            return true;
        }
        // look-alikes must be learned before this class is trusted
        self.ambigs
            .ambigs_for_adaption(class_id)
            .iter()
            .filter_map(|&ambig| self.adapted.class(ambig))
            .all(|c| c.num_perm_configs() > 0 || c.max_times_seen() >= min)
    }

    fn promote_if_reliable(
        &mut self,
        blob: &Blob,
        class_id: ClassId,
        config: ConfigId,
    ) -> ClassifyResult<bool> {
        if !self.temp_config_reliable(class_id, config) {
            return Ok(false);
        }
        self.promote(blob, class_id, config)?;
        self.update_ambigs_group(blob, class_id)?;
        Ok(true)
    }

    fn promote(&mut self, blob: &Blob, class_id: ClassId, config: ConfigId) -> ClassifyResult<()> {
        let ambigs = self.ambiguities_of(blob, class_id);
        let texts: Vec<&str> = ambigs.iter().map(|&id| self.classes.text(id)).collect();
        tracing::debug!(
            class = self.classes.text(class_id),
            config,
            ambigs = ?texts,
            "making config permanent"
        );
        self.adapted.make_permanent(class_id, config, ambigs)?;
        Ok(())
    }

    /// Promotes every temporary config that became reliable because
    /// `class_id` gained a permanent config, following the cascade to a
    /// fixed point. Returns the number of configs promoted.
    fn update_ambigs_group(&mut self, blob: &Blob, class_id: ClassId) -> ClassifyResult<usize> {
        let ambigs = std::sync::Arc::clone(&self.ambigs);
        let mut queue = VecDeque::from([class_id]);
        let mut promoted = 0;
        while let Some(changed) = queue.pop_front() {
            for &ambig in ambigs.reverse_ambigs_for_adaption(changed) {
                let temp_ids = self
                    .adapted
                    .class(ambig)
                    .map(|c| c.temporary_config_ids())
                    .unwrap_or_default();
                let mut any = false;
                for config in temp_ids {
                    if self.temp_config_reliable(ambig, config) {
                        self.promote(blob, ambig, config)?;
                        promoted += 1;
                        any = true;
                    }
                }
                if any {
                    queue.push_back(ambig);
                }
            }
        }
        if promoted > 0 {
            tracing::debug!(
                class = self.classes.text(class_id),
                promoted,
                "ambiguity group updated"
            );
        }
        Ok(promoted)
    }

    /// Rating a sample of `class_id` must reach to count as a good match,
    /// derived from how `blob` classifies right now
    ///
    /// When another class currently wins, the threshold is set one margin
    /// below that class's rating, within the perfect..good range.
    pub fn adaptation_threshold(&mut self, blob: &Blob, class_id: ClassId) -> f32 {
        let mut results = self.adaptive_match(blob);
        filters::sort_by_rating(&mut results);
        let good = self.options.good_threshold;
        match results.iter().find(|m| !self.classes.is_fragment(m.class_id)) {
            Some(top) if top.class_id != class_id => (top.rating - self.options.rating_margin)
                .clamp(self.options.perfect_threshold, good),
            _ => good,
        }
    }

    /// Returns true if the word may be learned from
    pub fn is_adaptable_word(&self, word: &WordSample) -> bool {
        let len = word.labels.len();
        len > 0 && len == word.blobs.len() && len <= MAX_ADAPTABLE_WORD_SIZE
    }

    /// Returns true if `blob` reads as nothing in particular: its best
    /// whole-character choice is below the garbage certainty threshold
    pub fn looks_like_garbage(&mut self, blob: &Blob) -> bool {
        let choices = self.classify(blob);
        choices
            .iter()
            .find(|c| !self.classes.is_fragment(c.class_id))
            .is_none_or(|c| c.certainty < self.options.garbage_certainty_threshold)
    }

    /// Learns every labelled character of a confirmed word
    ///
    /// A character spanning several blobs is learned from the joined blob
    /// and, when fragments are enabled, each piece is also learned as a
    /// fragment class. Per-character failures are logged and skipped.
    /// Returns the number of characters and fragments learned.
    pub fn adapt_to_word(&mut self, word: &WordSample) -> ClassifyResult<usize> {
        if word.labels.is_empty() || !self.learning_enabled {
            return Ok(0);
        }
        let spanned: usize = word.labels.iter().map(|l| l.blob_count).sum();
        if spanned > word.blobs.len() || word.labels.iter().any(|l| l.blob_count == 0) {
            return Err(ClassifyError::InvalidParameter(format!(
                "labels span {} blobs, word has {}",
                spanned,
                word.blobs.len()
            )));
        }
        self.stats.words_adapted += 1;
        let text: String = word.labels.iter().map(|l| l.text.as_str()).collect();
        tracing::debug!(text, "adapting to word");

        let mut learned = 0;
        let mut start = 0;
        for label in &word.labels {
            let pieces = &word.blobs[start..start + label.blob_count];
            start += label.blob_count;
            if label.text.is_empty() || !label.learn {
                continue;
            }

            let whole: Cow<'_, Blob> = match pieces {
                [single] => Cow::Borrowed(single),
                _ => Cow::Owned(Blob::join(pieces)),
            };
            let threshold = match label.threshold {
                Some(t) => t,
                None => match self.classes.id_of(&label.text) {
                    Ok(class_id) => self.adaptation_threshold(&whole, class_id),
                    Err(_) => self.options.good_threshold,
                },
            };
            if self.learn_piece(&whole, &label.text, word.font_id, threshold) {
                learned += 1;
            }

            if pieces.len() > 1 && !self.options.disable_character_fragments {
                learned += self.learn_fragments(pieces, label, word.font_id, threshold);
            }
        }
        Ok(learned)
    }

    fn learn_fragments(
        &mut self,
        pieces: &[Blob],
        label: &LabelSpan,
        font_id: FontId,
        threshold: f32,
    ) -> usize {
        if self.options.garbage_certainty_threshold < 0.0
            && pieces.iter().any(|p| self.looks_like_garbage(p))
        {
            tracing::debug!(text = %label.text, "fragments look like garbage, not learned");
            return 0;
        }
        if !label.pieces_natural && self.options.prioritize_division {
            return 0;
        }
        let (head, tail) = match label.text.split_once(' ') {
            Some((head, tail)) => (head, Some(tail)),
            None => (label.text.as_str(), None),
        };
        let mut learned = 0;
        for (i, piece) in pieces.iter().enumerate() {
            let mut text = Fragment::new(head, i, pieces.len(), label.pieces_natural).to_text();
            if let Some(tail) = tail {
                text.push(' ');
                text.push_str(tail);
            }
            if self.learn_piece(piece, &text, font_id, threshold) {
                learned += 1;
            }
        }
        learned
    }

    fn learn_piece(&mut self, blob: &Blob, text: &str, font_id: FontId, threshold: f32) -> bool {
        let Ok(class_id) = self.classes.id_of(text) else {
            tracing::debug!(text, "cannot adapt, class not in the class table");
            return false;
        };
        tracing::debug!(text, threshold, font_id, "adapting to char");
        match self.adapt_to_char(blob, class_id, font_id, threshold) {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(text, error = %e, "adaptation skipped");
                false
            }
        }
    }

    /// Starts the first recognition pass: learning follows the options
    pub fn begin_first_pass(&mut self) {
        self.learning_enabled = self.options.enable_learning;
    }

    /// Starts the second recognition pass: nothing more is learned
    pub fn begin_second_pass(&mut self) {
        self.learning_enabled = false;
    }

    /// Forgets everything learned in this session
    pub fn reset_adaptation(&mut self) {
        tracing::debug!(
            classes = self.adapted.num_nonempty_classes(),
            "resetting adapted templates"
        );
        self.adapted = AdaptedTemplateStore::new(self.classes.len());
        self.baseline_cutoffs = vec![0; self.classes.len()];
        self.adapt_proto_threshold = self.options.adapt_proto_threshold;
        self.adapt_feature_threshold = self.options.adapt_feature_threshold;
    }
}
