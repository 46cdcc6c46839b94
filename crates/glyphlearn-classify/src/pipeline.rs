//! Classifier pipeline
//!
//! Each blob goes down one of three paths:
//!
//! 1. char-norm: pre-trained templates only, used until enough classes
//!    have been learned (or always, with `char_norm_only`)
//! 2. baseline: adapted templates, falling back to char-norm when the best
//!    match is marginal or missing
//! 3. ambiguity: after a confident baseline match, the classes listed as
//!    confusable with the matched permanent config are re-checked against
//!    the pre-trained templates
//!
//! A blob left without a whole-character candidate is classified as noise.

use std::sync::Arc;

use glyphlearn_core::{
    AmbigTable, Blob, ClassId, ClassTable, NormalizationFactors, ShapeTable, UNLIKELY_NUM_FEATURES,
};

use crate::filters;
use crate::matcher::{ClassPruner, ExtractedFeatures, FeatureProvider, GeometryMatcher};
use crate::reference::{ExhaustivePruner, OutlineFeatureExtractor, ProtoDistanceMatcher};
use crate::rating::{CorrectionContext, RatingCorrector, TemplateSource};
use crate::results::{BlobChoice, Candidate, ResultSet};
use crate::stats::AdaptiveStats;
use crate::templates::{
    AdaptedConfig, AdaptedTemplateStore, PreTrainedTemplates, all_configs_on, all_protos_on,
};
use crate::{ClassifierOptions, ClassifyError, ClassifyResult};

/// Builder for [`AdaptiveClassifier`]
///
/// Only the class table is required. Missing collaborators default to the
/// [`crate::reference`] implementations; a missing pre-trained store or
/// shape table disables the features that depend on them.
pub struct ClassifierBuilder {
    classes: Arc<ClassTable>,
    options: ClassifierOptions,
    pretrained: Option<Arc<PreTrainedTemplates>>,
    shapes: Option<Arc<ShapeTable>>,
    ambigs: Arc<AmbigTable>,
    feature_provider: Option<Arc<dyn FeatureProvider>>,
    matcher: Option<Arc<dyn GeometryMatcher>>,
    pruner: Option<Arc<dyn ClassPruner>>,
}

impl ClassifierBuilder {
    fn new(classes: Arc<ClassTable>) -> Self {
        Self {
            classes,
            options: ClassifierOptions::default(),
            pretrained: None,
            shapes: None,
            ambigs: Arc::new(AmbigTable::new()),
            feature_provider: None,
            matcher: None,
            pruner: None,
        }
    }

    pub fn with_options(mut self, options: ClassifierOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_pretrained(mut self, templates: Arc<PreTrainedTemplates>) -> Self {
        self.pretrained = Some(templates);
        self
    }

    pub fn with_shape_table(mut self, shapes: Arc<ShapeTable>) -> Self {
        self.shapes = Some(shapes);
        self
    }

    pub fn with_ambigs(mut self, ambigs: Arc<AmbigTable>) -> Self {
        self.ambigs = ambigs;
        self
    }

    pub fn with_feature_provider(mut self, provider: Arc<dyn FeatureProvider>) -> Self {
        self.feature_provider = Some(provider);
        self
    }

    pub fn with_matcher(mut self, matcher: Arc<dyn GeometryMatcher>) -> Self {
        self.matcher = Some(matcher);
        self
    }

    pub fn with_pruner(mut self, pruner: Arc<dyn ClassPruner>) -> Self {
        self.pruner = Some(pruner);
        self
    }

    /// Validates the options and the store sizes and creates the classifier
    pub fn build(self) -> ClassifyResult<AdaptiveClassifier> {
        self.options.validate()?;
        let num_classes = self.classes.len();
        if let Some(pretrained) = self
            .pretrained
            .as_ref()
            .filter(|p| p.num_classes() != num_classes)
        {
            return Err(ClassifyError::InvalidParameter(format!(
                "pre-trained templates have {} classes, class table has {}",
                pretrained.num_classes(),
                num_classes
            )));
        }

        let shape_members = match (&self.pretrained, &self.shapes) {
            (Some(pretrained), Some(shapes)) => shape_members(pretrained, shapes),
            _ => Vec::new(),
        };
        let shape_cutoffs = match &self.pretrained {
            Some(pretrained) if !shape_members.is_empty() => shape_members
                .iter()
                .enumerate()
                .map(|(i, members)| {
                    members
                        .iter()
                        .map(|&m| pretrained.cutoff(m))
                        .max()
                        .unwrap_or_else(|| pretrained.cutoff(ClassId(i as u16)))
                })
                .collect(),
            _ => Vec::new(),
        };

        let feature_provider: Arc<dyn FeatureProvider> = match self.feature_provider {
            Some(provider) => provider,
            None => Arc::new(
                OutlineFeatureExtractor::new().with_pico_length(self.options.pico_feature_length),
            ),
        };
        let matcher: Arc<dyn GeometryMatcher> = match self.matcher {
            Some(matcher) => matcher,
            None => Arc::new(ProtoDistanceMatcher::new()),
        };
        let pruner: Arc<dyn ClassPruner> = match self.pruner {
            Some(pruner) => pruner,
            None => Arc::new(ExhaustivePruner::new()),
        };

        let mut classes = self.classes;
        if self.options.disable_character_fragments && classes.has_enabled_fragments() {
            Arc::make_mut(&mut classes).set_fragments_enabled(false);
            tracing::debug!("fragment classes disabled for output");
        }

        Ok(AdaptiveClassifier {
            adapt_proto_threshold: self.options.adapt_proto_threshold,
            adapt_feature_threshold: self.options.adapt_feature_threshold,
            learning_enabled: self.options.enable_learning,
            options: self.options,
            classes,
            pretrained: self.pretrained,
            shapes: self.shapes,
            ambigs: self.ambigs,
            feature_provider,
            matcher,
            pruner,
            adapted: AdaptedTemplateStore::new(num_classes),
            baseline_cutoffs: vec![0; num_classes],
            shape_cutoffs,
            shape_members,
            stats: AdaptiveStats::new(),
        })
    }
}

/// Classes reachable through the shapes of each pre-trained class's
/// configs, sorted and deduplicated
fn shape_members(pretrained: &PreTrainedTemplates, shapes: &ShapeTable) -> Vec<Vec<ClassId>> {
    pretrained
        .templates()
        .iter()
        .map(|(class_id, class)| {
            let mut members: Vec<ClassId> = (0..class.num_configs())
                .filter_map(|c| pretrained.font_or_shape(class_id, c))
                .filter_map(|sid| shapes.get_shape(sid).ok())
                .flat_map(|shape| shape.entries().iter().map(|e| e.class_id))
                .collect();
            members.sort_unstable();
            members.dedup();
            members
        })
        .collect()
}

/// Session-scoped adaptive character classifier
///
/// Owns the learned templates of one recognition session; the pre-trained
/// templates, shape table and ambiguity table are shared read-only.
pub struct AdaptiveClassifier {
    pub(crate) options: ClassifierOptions,
    pub(crate) classes: Arc<ClassTable>,
    pub(crate) pretrained: Option<Arc<PreTrainedTemplates>>,
    pub(crate) shapes: Option<Arc<ShapeTable>>,
    pub(crate) ambigs: Arc<AmbigTable>,
    pub(crate) feature_provider: Arc<dyn FeatureProvider>,
    pub(crate) matcher: Arc<dyn GeometryMatcher>,
    pub(crate) pruner: Arc<dyn ClassPruner>,
    pub(crate) adapted: AdaptedTemplateStore,
    /// Pruner cutoffs for the adapted templates, copied from the
    /// pre-trained cutoffs when a class is bootstrapped
    pub(crate) baseline_cutoffs: Vec<u16>,
    shape_cutoffs: Vec<u16>,
    shape_members: Vec<Vec<ClassId>>,
    /// Current proto acceptance threshold, 0..=255
    pub(crate) adapt_proto_threshold: u8,
    /// Current feature acceptance threshold, 0..=255
    pub(crate) adapt_feature_threshold: u8,
    pub(crate) learning_enabled: bool,
    pub(crate) stats: AdaptiveStats,
}

impl AdaptiveClassifier {
    pub fn builder(classes: Arc<ClassTable>) -> ClassifierBuilder {
        ClassifierBuilder::new(classes)
    }

    pub fn options(&self) -> &ClassifierOptions {
        &self.options
    }

    pub fn classes(&self) -> &ClassTable {
        &self.classes
    }

    pub fn adapted_templates(&self) -> &AdaptedTemplateStore {
        &self.adapted
    }

    pub fn pretrained_templates(&self) -> Option<&PreTrainedTemplates> {
        self.pretrained.as_deref()
    }

    pub fn stats(&self) -> &AdaptiveStats {
        &self.stats
    }

    /// Returns true while confirmed words are learned
    pub fn is_learning_enabled(&self) -> bool {
        self.learning_enabled
    }

    /// Pruner cutoffs currently used for the adapted templates
    pub fn baseline_cutoffs(&self) -> &[u16] {
        &self.baseline_cutoffs
    }

    /// Classifies a blob into a ranked list of choices
    ///
    /// Never fails: a blob that cannot be classified yields a single
    /// unclassified choice.
    pub fn classify(&mut self, blob: &Blob) -> Vec<BlobChoice> {
        let mut results = self.adaptive_match(blob);
        filters::remove_bad_matches(&mut results, &self.options, &self.classes);
        filters::sort_by_rating(&mut results);
        filters::remove_extra_puncs(&mut results, &self.options, &self.classes);

        let mut choices = filters::convert_to_choices(
            &results,
            &self.options,
            &self.classes,
            self.shapes.as_deref(),
        );
        self.stats.classes_output += choices.len() as u64;
        if choices.is_empty() {
            if !self.options.numeric_mode {
                tracing::warn!("empty classification");
            }
            choices.push(BlobChoice::unclassified());
        }
        choices
    }

    /// Runs the matching paths and returns the raw candidates, before any
    /// filtering
    pub fn adaptive_match(&mut self, blob: &Blob) -> ResultSet {
        self.stats.blobs_classified += 1;
        let mut results = ResultSet::new(self.classes.len());
        match self.feature_provider.extract(blob, self.classes.len()) {
            Some(features) if features.baseline.len() > UNLIKELY_NUM_FEATURES => {
                let num_features = features.baseline.len();
                tracing::debug!(num_features, "too many features, blob treated as noise");
                results.blob_length = features.blob_length;
            }
            Some(features) => {
                results.blob_length = features.blob_length;
                self.match_features(blob, &features, &mut results);
            }
            None => {
                tracing::debug!("no features extracted, blob treated as noise");
                results.blob_length = 0;
            }
        }
        if !results.has_nonfragment() || results.is_empty() {
            self.classify_as_noise(&mut results);
        }
        results
    }

    fn match_features(&mut self, blob: &Blob, features: &ExtractedFeatures, results: &mut ResultSet) {
        if self.adapted.num_perm_classes() < self.options.permanent_classes_min
            || self.options.char_norm_only
        {
            self.run_char_norm(blob, features, results);
            return;
        }

        let tried = self.baseline_path(blob, features, results);
        self.stats.baseline_classifier_calls += 1;
        self.stats.baseline_classes_tried += tried as u64;
        let ambigs = self.best_match_ambigs(results);

        let marginal = !results.is_empty()
            && results.best_rating() > self.options.great_threshold
            && !self.options.baseline_only;
        if results.is_empty() || marginal {
            self.run_char_norm(blob, features, results);
        } else if !ambigs.is_empty() && !self.options.baseline_only {
            let tried = self.ambig_path(blob, features, &ambigs, results);
            self.stats.ambiguity_classifier_calls += 1;
            self.stats.ambiguity_classes_tried += tried as u64;
        }
    }

    fn run_char_norm(&mut self, blob: &Blob, features: &ExtractedFeatures, results: &mut ResultSet) {
        if self.pretrained.is_none() {
            tracing::debug!("no pre-trained templates, char-norm path skipped");
            return;
        }
        let tried = self.char_norm_path(blob, features, results);
        self.stats.char_norm_classifier_calls += 1;
        self.stats.char_norm_classes_tried += tried as u64;
    }

    /// Ambiguities attached to the best candidate, if it came from a
    /// permanent adapted config
    fn best_match_ambigs(&self, results: &ResultSet) -> Vec<ClassId> {
        let Some(best) = results.best().filter(|b| b.adapted) else {
            return Vec::new();
        };
        let config = best
            .config
            .and_then(|c| self.adapted.class(best.class_id)?.config(c));
        match config {
            Some(AdaptedConfig::Permanent(perm)) => perm.ambigs.clone(),
            _ => Vec::new(),
        }
    }

    /// Matches the adapted templates; returns the number of classes tried
    fn baseline_path(&self, blob: &Blob, features: &ExtractedFeatures, results: &mut ResultSet) -> usize {
        let norm = NormalizationFactors::zeros(self.classes.len());
        let pruned = self.pruner.prune(
            self.adapted.templates(),
            &features.baseline,
            &norm,
            &self.baseline_cutoffs,
        );
        let corrector = RatingCorrector::new(&self.options, &self.classes);
        let ctx = self.correction_context(blob, features.blob_length, &norm, 0);
        for p in &pruned {
            let (Some(class), Some(compiled)) =
                (self.adapted.class(p.class_id), self.adapted.compiled(p.class_id))
            else {
                continue;
            };
            let m = self.matcher.match_class(
                compiled,
                class.perm_protos(),
                class.perm_configs(),
                &features.baseline,
                self.adapt_feature_threshold,
            );
            corrector.expand_and_add(
                TemplateSource::Adapted(class),
                p.class_id,
                p.rating,
                &m,
                &ctx,
                results,
            );
        }
        pruned.len()
    }

    /// Matches the pre-trained templates; returns the number of classes
    /// tried
    pub(crate) fn char_norm_path(
        &self,
        blob: &Blob,
        features: &ExtractedFeatures,
        results: &mut ResultSet,
    ) -> usize {
        let Some(pretrained) = self.pretrained.as_deref() else {
            return 0;
        };
        let pruner_norm = self.pruner_norm_factors(&features.char_norm_factors);
        let cutoffs = if self.shape_cutoffs.is_empty() {
            pretrained.cutoffs()
        } else {
            &self.shape_cutoffs
        };
        let mut pruned = self.pruner.prune(
            pretrained.templates(),
            &features.char_norm,
            &pruner_norm,
            cutoffs,
        );
        if self.options.single_match {
            pruned.truncate(1);
        }

        let corrector = RatingCorrector::new(&self.options, &self.classes);
        let ctx = self.correction_context(
            blob,
            features.blob_length,
            &features.char_norm_factors,
            self.options.integer_matcher_multiplier,
        );
        let source = TemplateSource::PreTrained {
            templates: pretrained,
            shapes: self.shapes.as_deref(),
        };
        let (protos, configs) = (all_protos_on(), all_configs_on());
        for p in &pruned {
            let Some(class) = pretrained.class(p.class_id) else {
                continue;
            };
            let m = self.matcher.match_class(
                class,
                &protos,
                &configs,
                &features.char_norm,
                self.adapt_feature_threshold,
            );
            corrector.expand_and_add(source, p.class_id, p.rating, &m, &ctx, results);
        }
        pruned.len()
    }

    /// Re-checks `ambigs` against the pre-trained templates
    fn ambig_path(
        &self,
        blob: &Blob,
        features: &ExtractedFeatures,
        ambigs: &[ClassId],
        results: &mut ResultSet,
    ) -> usize {
        let Some(pretrained) = self.pretrained.as_deref() else {
            return 0;
        };
        let corrector = RatingCorrector::new(&self.options, &self.classes);
        let ctx = self.correction_context(
            blob,
            features.blob_length,
            &features.char_norm_factors,
            self.options.integer_matcher_multiplier,
        );
        let source = TemplateSource::PreTrained {
            templates: pretrained,
            shapes: self.shapes.as_deref(),
        };
        let (protos, configs) = (all_protos_on(), all_configs_on());
        let mut tried = 0;
        for &class_id in ambigs {
            let Some(class) = pretrained.class(class_id).filter(|c| c.num_configs() > 0) else {
                continue;
            };
            let m = self.matcher.match_class(
                class,
                &protos,
                &configs,
                &features.char_norm,
                self.adapt_feature_threshold,
            );
            corrector.expand_and_add(source, class_id, 0.0, &m, &ctx, results);
            tried += 1;
        }
        tried
    }

    /// Adds the synthetic noise candidate; larger blobs are less likely
    /// to be noise
    fn classify_as_noise(&self, results: &mut ResultSet) {
        let r = results.blob_length as f32 / self.options.avg_noise_size;
        let r = r * r;
        let rating = r / (1.0 + r);
        tracing::trace!(blob_length = results.blob_length, rating, "classified as noise");
        results.add(
            Candidate::new(ClassId::NONE, rating),
            false,
            self.options.bad_match_pad,
        );
    }

    /// Char-norm factors as seen by the pruner: with a shape table a class
    /// gets the smallest factor of the classes its shapes stand for
    fn pruner_norm_factors(&self, factors: &NormalizationFactors) -> NormalizationFactors {
        if self.shape_members.is_empty() {
            return factors.clone();
        }
        let merged = self
            .shape_members
            .iter()
            .enumerate()
            .map(|(i, members)| {
                members
                    .iter()
                    .map(|&m| factors.get(m))
                    .min()
                    .unwrap_or_else(|| factors.get(ClassId(i as u16)))
            })
            .collect();
        NormalizationFactors::from_vec(merged)
    }

    fn correction_context<'a>(
        &self,
        blob: &Blob,
        blob_length: u32,
        norm_factors: &'a NormalizationFactors,
        multiplier: u32,
    ) -> CorrectionContext<'a> {
        let bbox = blob.bounding_box();
        CorrectionContext {
            bottom: bbox.bottom.clamp(0, 255),
            top: bbox.top.clamp(0, 255),
            blob_length,
            norm_factors,
            multiplier,
        }
    }

    /// Plausible alternative readings of `blob` according to the
    /// pre-trained templates, excluding `correct` and noise
    pub(crate) fn ambiguities_of(&self, blob: &Blob, correct: ClassId) -> Vec<ClassId> {
        let Some(features) = self.feature_provider.extract(blob, self.classes.len()) else {
            return Vec::new();
        };
        let mut results = ResultSet::new(self.classes.len());
        results.blob_length = features.blob_length;
        self.char_norm_path(blob, &features, &mut results);
        filters::remove_bad_matches(&mut results, &self.options, &self.classes);
        filters::sort_by_rating(&mut results);
        results
            .iter()
            .map(|m| m.class_id)
            .filter(|&id| id != correct && !id.is_none())
            .collect()
    }

    /// Matches `blob` against every config of one class in both stores
    ///
    /// Adapted configs are matched with all their protos, not only the
    /// permanent ones. The candidates are logged and returned unfiltered.
    pub fn debug_best_match(&self, blob: &Blob, class_id: ClassId) -> ClassifyResult<ResultSet> {
        if !self.classes.is_legal(class_id) {
            return Err(ClassifyError::InvalidClassId {
                class_id,
                num_classes: self.classes.len(),
            });
        }
        let features = self
            .feature_provider
            .extract(blob, self.classes.len())
            .ok_or(ClassifyError::InputRejected { num_features: 0 })?;

        let mut results = ResultSet::new(self.classes.len());
        results.blob_length = features.blob_length;
        let corrector = RatingCorrector::new(&self.options, &self.classes);
        let protos = all_protos_on();

        let adapted = self
            .adapted
            .class(class_id)
            .filter(|c| !c.is_empty())
            .zip(self.adapted.compiled(class_id));
        if let Some((class, compiled)) = adapted {
            let norm = NormalizationFactors::zeros(self.classes.len());
            let ctx = self.correction_context(blob, features.blob_length, &norm, 0);
            let m = self.matcher.match_class(
                compiled,
                &protos,
                &all_configs_on(),
                &features.baseline,
                self.adapt_feature_threshold,
            );
            tracing::debug!(
                class = self.classes.text(class_id),
                config = m.config,
                rating = m.rating,
                "best adapted match"
            );
            corrector.expand_and_add(TemplateSource::Adapted(class), class_id, 0.0, &m, &ctx, &mut results);
        }

        let pretrained = self.pretrained.as_deref().and_then(|p| {
            p.class(class_id)
                .filter(|c| c.num_configs() > 0)
                .map(|c| (p, c))
        });
        if let Some((pretrained, class)) = pretrained {
            let ctx = self.correction_context(
                blob,
                features.blob_length,
                &features.char_norm_factors,
                self.options.integer_matcher_multiplier,
            );
            let m = self.matcher.match_class(
                class,
                &protos,
                &all_configs_on(),
                &features.char_norm,
                self.adapt_feature_threshold,
            );
            tracing::debug!(
                class = self.classes.text(class_id),
                config = m.config,
                rating = m.rating,
                "best pre-trained match"
            );
            let source = TemplateSource::PreTrained {
                templates: pretrained,
                shapes: self.shapes.as_deref(),
            };
            corrector.expand_and_add(source, class_id, 0.0, &m, &ctx, &mut results);
        }

        tracing::debug!(results = %results.display(&self.classes), "debug match");
        Ok(results)
    }
}
