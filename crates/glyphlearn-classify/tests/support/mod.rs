//! Scripted collaborators shared by the regression tests
//!
//! The pre-trained classes built here carry a single "tag" proto whose x
//! coordinate is the class id, so [`TaggedMatcher`] can look up a scripted
//! rating without doing any geometry.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use glyphlearn_classify::templates::{CompiledClass, CompiledTemplates};
use glyphlearn_classify::{
    AdaptiveClassifier, ClassPruner, ClassifierOptions, ExtractedFeatures, FeatureProvider,
    GeometryMatcher, MatchResult, PreTrainedTemplates, PrunerResult, Proto,
};
use glyphlearn_core::{
    Blob, ClassId, ClassTable, ConfigMask, Feature, IntFeature, NormalizationFactors, ProtoId,
    ProtoMask,
};

/// Returns the same features for every blob
pub struct FixedFeatures {
    pub blob_length: Option<u32>,
    pub num_features: usize,
}

impl FixedFeatures {
    pub fn new(blob_length: u32) -> Self {
        Self {
            blob_length: Some(blob_length),
            num_features: 2,
        }
    }

    pub fn with_num_features(mut self, n: usize) -> Self {
        self.num_features = n;
        self
    }

    /// Extraction always fails
    pub fn nothing() -> Self {
        Self {
            blob_length: None,
            num_features: 0,
        }
    }

    fn features(&self) -> Vec<Feature> {
        // far apart so every feature clusters into its own proto
        (0..self.num_features)
            .map(|i| Feature::new(0.0, 0.2 * i as f32, 0.25, 0.05))
            .collect()
    }
}

impl FeatureProvider for FixedFeatures {
    fn extract(&self, _blob: &Blob, num_classes: usize) -> Option<ExtractedFeatures> {
        let blob_length = self.blob_length?;
        let quantized: Vec<IntFeature> = self.features().iter().map(IntFeature::from_feature).collect();
        Some(ExtractedFeatures {
            baseline: quantized.clone(),
            char_norm: quantized,
            char_norm_factors: NormalizationFactors::zeros(num_classes),
            blob_length,
        })
    }

    fn pico_features(&self, _blob: &Blob) -> Vec<Feature> {
        self.features()
    }

    fn outline_features(&self, _blob: &Blob) -> Vec<Feature> {
        self.features()
    }
}

/// Rates classes by the tag on their first proto
pub struct TaggedMatcher {
    ratings: HashMap<u16, f32>,
    default_rating: f32,
}

impl TaggedMatcher {
    pub fn new(default_rating: f32) -> Self {
        Self {
            ratings: HashMap::new(),
            default_rating,
        }
    }

    pub fn rate(mut self, class_id: ClassId, rating: f32) -> Self {
        self.ratings.insert(class_id.0, rating);
        self
    }
}

fn tag_of(class: &CompiledClass) -> Option<u16> {
    class.protos().first().map(|p| p.x.round() as u16)
}

impl GeometryMatcher for TaggedMatcher {
    fn match_class(
        &self,
        class: &CompiledClass,
        _protos: &ProtoMask,
        _configs: &ConfigMask,
        features: &[IntFeature],
        _feature_threshold: u8,
    ) -> MatchResult {
        let Some(tag) = tag_of(class) else {
            return MatchResult::no_match(features.len());
        };
        MatchResult {
            rating: self.ratings.get(&tag).copied().unwrap_or(self.default_rating),
            config: 0,
            config2: None,
            feature_misses: 0,
        }
    }

    fn find_good_protos(
        &self,
        _class: &CompiledClass,
        _protos: &ProtoMask,
        _configs: &ConfigMask,
        _features: &[IntFeature],
        _proto_threshold: u8,
    ) -> Vec<ProtoId> {
        Vec::new()
    }

    fn find_bad_features(
        &self,
        _class: &CompiledClass,
        _protos: &ProtoMask,
        _configs: &ConfigMask,
        features: &[IntFeature],
        _feature_threshold: u8,
    ) -> Vec<usize> {
        (0..features.len()).collect()
    }
}

/// Passes every class with configs, in class id order
pub struct PassAllPruner;

impl ClassPruner for PassAllPruner {
    fn prune(
        &self,
        templates: &CompiledTemplates,
        _features: &[IntFeature],
        _norm_factors: &NormalizationFactors,
        _cutoffs: &[u16],
    ) -> Vec<PrunerResult> {
        templates
            .iter()
            .filter(|(_, class)| class.num_configs() > 0)
            .map(|(class_id, _)| PrunerResult {
                class_id,
                rating: 0.0,
            })
            .collect()
    }
}

/// Class table with the given class texts after NONE
pub fn class_table(texts: &[&str]) -> ClassTable {
    let mut classes = ClassTable::new();
    for text in texts {
        classes.add(text).unwrap();
    }
    classes
}

/// Pre-trained templates with one tagged config per listed class
///
/// Each config records `font_or_shape` as its font (or shape) id.
pub fn tagged_templates(num_classes: usize, trained: &[(ClassId, u32)]) -> PreTrainedTemplates {
    let mut templates = PreTrainedTemplates::new(num_classes);
    for &(class_id, font_or_shape) in trained {
        let tag = Proto::new(class_id.0 as f32, 0.0, 0.0, 0.1);
        templates.add_config(class_id, &[tag], font_or_shape).unwrap();
    }
    templates
}

/// Classifier with scripted collaborators and pre-trained `ratings`
///
/// `blob_length` is what the feature provider reports for every blob.
pub fn scripted_classifier(
    classes: ClassTable,
    ratings: &[(ClassId, f32)],
    options: ClassifierOptions,
    blob_length: u32,
) -> AdaptiveClassifier {
    let trained: Vec<(ClassId, u32)> = ratings.iter().map(|&(id, _)| (id, 0)).collect();
    let templates = tagged_templates(classes.len(), &trained);
    let matcher = ratings
        .iter()
        .fold(TaggedMatcher::new(0.9), |m, &(id, r)| m.rate(id, r));
    AdaptiveClassifier::builder(Arc::new(classes))
        .with_options(options)
        .with_pretrained(Arc::new(templates))
        .with_feature_provider(Arc::new(FixedFeatures::new(blob_length)))
        .with_matcher(Arc::new(matcher))
        .with_pruner(Arc::new(PassAllPruner))
        .build()
        .unwrap()
}

/// Class text of every choice, in order
pub fn choice_texts(classifier: &mut AdaptiveClassifier, blob: &Blob) -> Vec<String> {
    let choices = classifier.classify(blob);
    choices
        .iter()
        .map(|c| classifier.classes().text(c.class_id).to_string())
        .collect()
}
