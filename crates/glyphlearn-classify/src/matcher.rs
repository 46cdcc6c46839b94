//! Collaborator seams
//!
//! The classifier delegates feature extraction, template matching and
//! class pruning to these traits. Reference implementations live in
//! [`crate::reference`]; production callers can plug in faster ones.

use glyphlearn_core::{
    Blob, ClassId, ConfigId, ConfigMask, Feature, IntFeature, NormalizationFactors, ProtoId,
    ProtoMask,
};

use crate::templates::{CompiledClass, CompiledTemplates};

/// Worst possible rating; also the "not rated" sentinel
pub const WORST_RATING: f32 = 1.0;

/// Features of one blob, extracted once per classification call
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedFeatures {
    /// Baseline-normalized features (matched against adapted templates)
    pub baseline: Vec<IntFeature>,
    /// Character-normalized features (matched against pre-trained templates)
    pub char_norm: Vec<IntFeature>,
    /// Per-class size disagreement of the blob, indexed by class id
    pub char_norm_factors: NormalizationFactors,
    /// Outline length of the blob in normalized pixels
    pub blob_length: u32,
}

/// Extracts features from blobs
pub trait FeatureProvider: Send + Sync {
    /// Extracts both matcher feature sets. Returns `None` when nothing can
    /// be extracted (for example an empty blob).
    fn extract(&self, blob: &Blob, num_classes: usize) -> Option<ExtractedFeatures>;

    /// Fine-grained baseline features used when learning, in outline order
    fn pico_features(&self, blob: &Blob) -> Vec<Feature>;

    /// One feature per outline segment, used to bootstrap a class
    fn outline_features(&self, blob: &Blob) -> Vec<Feature>;
}

/// Result of matching features against one compiled class
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult {
    /// 0 is a perfect match, [`WORST_RATING`] the worst
    pub rating: f32,
    /// Best matching config
    pub config: ConfigId,
    /// Runner-up config, if any
    pub config2: Option<ConfigId>,
    /// Features that matched no proto
    pub feature_misses: u32,
}

impl MatchResult {
    /// Result for a class with nothing to match against
    pub fn no_match(num_features: usize) -> Self {
        Self {
            rating: WORST_RATING,
            config: 0,
            config2: None,
            feature_misses: num_features as u32,
        }
    }
}

/// Scores features against compiled templates
pub trait GeometryMatcher: Send + Sync {
    /// Rates `features` against the configs of `class` enabled in `configs`,
    /// using only the protos enabled in `protos`
    fn match_class(
        &self,
        class: &CompiledClass,
        protos: &ProtoMask,
        configs: &ConfigMask,
        features: &[IntFeature],
        feature_threshold: u8,
    ) -> MatchResult;

    /// Protos (from `protos`) that the features support at or above
    /// `proto_threshold` on a 0..=255 scale
    fn find_good_protos(
        &self,
        class: &CompiledClass,
        protos: &ProtoMask,
        configs: &ConfigMask,
        features: &[IntFeature],
        proto_threshold: u8,
    ) -> Vec<ProtoId>;

    /// Indices of features that no enabled proto explains at or above
    /// `feature_threshold`, ascending
    fn find_bad_features(
        &self,
        class: &CompiledClass,
        protos: &ProtoMask,
        configs: &ConfigMask,
        features: &[IntFeature],
        feature_threshold: u8,
    ) -> Vec<usize>;
}

/// One class kept by the pruner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrunerResult {
    pub class_id: ClassId,
    /// Provisional rating, lower is better
    pub rating: f32,
}

/// Narrows the class set before detailed matching
pub trait ClassPruner: Send + Sync {
    /// Returns candidate classes ordered best first
    ///
    /// `cutoffs` holds the expected feature count per class (0 = unknown).
    fn prune(
        &self,
        templates: &CompiledTemplates,
        features: &[IntFeature],
        norm_factors: &NormalizationFactors,
        cutoffs: &[u16],
    ) -> Vec<PrunerResult>;
}
