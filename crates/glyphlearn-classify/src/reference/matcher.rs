//! Proto distance matcher

use glyphlearn_core::{ConfigId, ConfigMask, Feature, IntFeature, ProtoId, ProtoMask};

use super::evidence::{EvidenceModel, to_float_features};
use crate::matcher::{GeometryMatcher, MatchResult, WORST_RATING};
use crate::templates::{CompiledClass, Proto};

/// Rates a config by how well its protos and the features explain each
/// other
///
/// Feature evidence (each feature's best proto) and proto evidence (each
/// proto's best feature) are averaged and blended; the rating is one minus
/// the blend. Features whose evidence falls below `255 - feature_threshold`
/// count as misses.
#[derive(Debug, Clone, Default)]
pub struct ProtoDistanceMatcher {
    model: EvidenceModel,
    /// Weight of feature evidence against proto evidence (default: 0.5)
    feature_weight: f32,
}

impl ProtoDistanceMatcher {
    pub fn new() -> Self {
        Self {
            model: EvidenceModel::default(),
            feature_weight: 0.5,
        }
    }

    pub fn with_evidence_model(mut self, model: EvidenceModel) -> Self {
        self.model = model;
        self
    }

    pub fn with_feature_weight(mut self, weight: f32) -> Self {
        self.feature_weight = weight.clamp(0.0, 1.0);
        self
    }

    fn enabled_protos<'a>(
        class: &'a CompiledClass,
        mask: &'a ProtoMask,
    ) -> impl Iterator<Item = (ProtoId, &'a Proto)> + 'a {
        mask.iter_ones()
            .filter_map(move |pid| class.proto(pid).map(|p| (pid, p)))
    }

    fn rate_config(
        &self,
        protos: &[&Proto],
        features: &[Feature],
        miss_floor: u8,
    ) -> (f32, u32) {
        let feature_evidence: Vec<u8> = features
            .iter()
            .map(|f| self.model.best_for_feature(f, protos.iter().copied()))
            .collect();
        let proto_evidence: Vec<u8> = protos
            .iter()
            .map(|p| {
                features
                    .iter()
                    .map(|f| self.model.evidence(f, p))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mean = |v: &[u8]| v.iter().map(|&e| e as f32).sum::<f32>() / (v.len() as f32 * 255.0);
        let score =
            self.feature_weight * mean(&feature_evidence) + (1.0 - self.feature_weight) * mean(&proto_evidence);
        let misses = feature_evidence.iter().filter(|&&e| e < miss_floor).count() as u32;
        ((1.0 - score).clamp(0.0, WORST_RATING), misses)
    }
}

impl GeometryMatcher for ProtoDistanceMatcher {
    fn match_class(
        &self,
        class: &CompiledClass,
        protos: &ProtoMask,
        configs: &ConfigMask,
        features: &[IntFeature],
        feature_threshold: u8,
    ) -> MatchResult {
        if features.is_empty() {
            return MatchResult::no_match(0);
        }
        let fs = to_float_features(features);
        let miss_floor = 255 - feature_threshold;

        // (rating, config, misses), best first
        let mut ranked: Vec<(f32, ConfigId, u32)> = Vec::new();
        for (cid, config_protos) in class.configs().iter().enumerate() {
            if !configs.test(cid) {
                continue;
            }
            let selected: Vec<&Proto> = Self::enabled_protos(class, config_protos)
                .filter(|(pid, _)| protos.test(*pid))
                .map(|(_, p)| p)
                .collect();
            if selected.is_empty() {
                continue;
            }
            let (rating, misses) = self.rate_config(&selected, &fs, miss_floor);
            ranked.push((rating, cid, misses));
        }
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        match ranked.as_slice() {
            [] => MatchResult::no_match(features.len()),
            [(rating, config, misses), rest @ ..] => MatchResult {
                rating: *rating,
                config: *config,
                config2: rest.first().map(|r| r.1),
                feature_misses: *misses,
            },
        }
    }

    /// Config selection is ignored: every enabled proto is judged alone
    fn find_good_protos(
        &self,
        class: &CompiledClass,
        protos: &ProtoMask,
        _configs: &ConfigMask,
        features: &[IntFeature],
        proto_threshold: u8,
    ) -> Vec<ProtoId> {
        let fs = to_float_features(features);
        Self::enabled_protos(class, protos)
            .filter(|(_, p)| {
                fs.iter()
                    .map(|f| self.model.evidence(f, p))
                    .max()
                    .unwrap_or(0)
                    >= proto_threshold
            })
            .map(|(pid, _)| pid)
            .collect()
    }

    fn find_bad_features(
        &self,
        class: &CompiledClass,
        protos: &ProtoMask,
        _configs: &ConfigMask,
        features: &[IntFeature],
        feature_threshold: u8,
    ) -> Vec<usize> {
        let fs = to_float_features(features);
        let selected: Vec<&Proto> = Self::enabled_protos(class, protos).map(|(_, p)| p).collect();
        fs.iter()
            .enumerate()
            .filter(|(_, f)| self.model.best_for_feature(f, selected.iter().copied()) < feature_threshold)
            .map(|(i, _)| i)
            .collect()
    }
}
