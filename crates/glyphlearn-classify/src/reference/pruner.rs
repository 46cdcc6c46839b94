//! Exhaustive class pruner

use glyphlearn_core::{IntFeature, NormalizationFactors};

use super::evidence::{EvidenceModel, to_float_features};
use crate::matcher::{ClassPruner, PrunerResult, WORST_RATING};
use crate::templates::{CompiledTemplates, Proto};

/// Scores every class that has pruner-visible protos and keeps the ones
/// close to the best
#[derive(Debug, Clone)]
pub struct ExhaustivePruner {
    model: EvidenceModel,
    /// Maximum number of classes returned (default: 16)
    max_results: usize,
    /// Classes rated worse than best + pad are dropped (default: 0.4)
    rating_pad: f32,
    /// Weight of the normalization factor (default: 0.5)
    norm_weight: f32,
}

impl Default for ExhaustivePruner {
    fn default() -> Self {
        Self {
            model: EvidenceModel::default(),
            max_results: 16,
            rating_pad: 0.4,
            norm_weight: 0.5,
        }
    }
}

impl ExhaustivePruner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_results(mut self, n: usize) -> Self {
        self.max_results = n.max(1);
        self
    }

    pub fn with_rating_pad(mut self, pad: f32) -> Self {
        self.rating_pad = pad.max(0.0);
        self
    }

    pub fn with_norm_weight(mut self, weight: f32) -> Self {
        self.norm_weight = weight.max(0.0);
        self
    }
}

impl ClassPruner for ExhaustivePruner {
    fn prune(
        &self,
        templates: &CompiledTemplates,
        features: &[IntFeature],
        norm_factors: &NormalizationFactors,
        cutoffs: &[u16],
    ) -> Vec<PrunerResult> {
        if features.is_empty() {
            return Vec::new();
        }
        let fs = to_float_features(features);
        let num_features = features.len() as f32;

        let mut results: Vec<PrunerResult> = templates
            .iter()
            .filter(|(_, class)| class.pruner_protos().count_ones() > 0)
            .map(|(class_id, class)| {
                let protos: Vec<&Proto> = class
                    .pruner_protos()
                    .iter_ones()
                    .filter_map(|pid| class.proto(pid))
                    .collect();
                let evidence: f32 = fs
                    .iter()
                    .map(|f| self.model.best_for_feature(f, protos.iter().copied()) as f32)
                    .sum();
                let mut score = evidence / (num_features * 255.0)
                    - self.norm_weight * norm_factors.get(class_id) as f32 / 255.0;
                let cutoff = cutoffs.get(class_id.index()).copied().unwrap_or(0) as f32;
                if cutoff > 0.0 && num_features < cutoff {
                    // too few features for this class
                    score *= num_features / cutoff;
                }
                PrunerResult {
                    class_id,
                    rating: (1.0 - score).clamp(0.0, WORST_RATING),
                }
            })
            .collect();

        results.sort_by(|a, b| {
            a.rating
                .total_cmp(&b.rating)
                .then(a.class_id.cmp(&b.class_id))
        });
        if let Some(best) = results.first().map(|r| r.rating) {
            results.retain(|r| r.rating <= best + self.rating_pad);
        }
        results.truncate(self.max_results);
        results
    }
}
