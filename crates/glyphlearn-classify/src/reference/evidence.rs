//! Feature-to-proto evidence

use glyphlearn_core::{Feature, IntFeature};

use crate::templates::Proto;

/// Converts the geometric disagreement between a feature and a proto into
/// an evidence value on a 0..=255 scale
///
/// Distance is measured from the feature point to the proto segment, so a
/// feature anywhere along a stroke fully supports it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvidenceModel {
    /// Distance (normalized units) at which evidence halves (default: 0.03)
    pub distance_scale: f32,
    /// Direction difference (turns) at which evidence halves (default: 0.05)
    pub angle_scale: f32,
}

impl Default for EvidenceModel {
    fn default() -> Self {
        Self {
            distance_scale: 0.03,
            angle_scale: 0.05,
        }
    }
}

impl EvidenceModel {
    pub fn new(distance_scale: f32, angle_scale: f32) -> Self {
        Self {
            distance_scale,
            angle_scale,
        }
    }

    /// Evidence that `feature` lies on `proto`
    pub fn evidence(&self, feature: &Feature, proto: &Proto) -> u8 {
        let (s, c) = (proto.angle * std::f32::consts::TAU).sin_cos();
        let dx = feature.x - proto.x;
        let dy = feature.y - proto.y;
        let along = dx * c + dy * s;
        let perp = -dx * s + dy * c;
        let along_excess = (along.abs() - proto.length / 2.0).max(0.0);
        let dist2 = perp * perp + along_excess * along_excess;

        let da = angle_delta(feature.direction, proto.angle);
        let x = dist2 / (self.distance_scale * self.distance_scale)
            + (da / self.angle_scale) * (da / self.angle_scale);
        (255.0 / (1.0 + x)).round().clamp(0.0, 255.0) as u8
    }

    /// Best evidence any of `protos` gives `feature`
    pub fn best_for_feature<'a, I>(&self, feature: &Feature, protos: I) -> u8
    where
        I: IntoIterator<Item = &'a Proto>,
    {
        protos
            .into_iter()
            .map(|p| self.evidence(feature, p))
            .max()
            .unwrap_or(0)
    }
}

/// Circular difference of two directions in turns, `[0, 0.5]`
pub fn angle_delta(a: f32, b: f32) -> f32 {
    let d = (a - b).abs().rem_euclid(1.0);
    if d > 0.5 { 1.0 - d } else { d }
}

/// Dequantizes matcher input once per call
pub(crate) fn to_float_features(features: &[IntFeature]) -> Vec<Feature> {
    features.iter().map(|f| f.to_feature(0.0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_angle_delta() {
        assert!((angle_delta(0.1, 0.9) - 0.2).abs() < 1e-6);
        assert!((angle_delta(0.25, 0.75) - 0.5).abs() < 1e-6);
        assert!(angle_delta(0.3, 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_on_segment_is_full_evidence() {
        let model = EvidenceModel::default();
        let proto = Proto::new(0.0, 0.0, 0.0, 0.2);
        let on = Feature::new(0.08, 0.0, 0.0, 0.05);
        assert_eq!(model.evidence(&on, &proto), 255);
    }

    #[test]
    fn test_evidence_decreases() {
        let model = EvidenceModel::default();
        let proto = Proto::new(0.0, 0.0, 0.25, 0.2);
        let near = Feature::new(0.01, 0.0, 0.25, 0.05);
        let far = Feature::new(0.1, 0.0, 0.25, 0.05);
        let turned = Feature::new(0.0, 0.0, 0.5, 0.05);
        let e_near = model.evidence(&near, &proto);
        let e_far = model.evidence(&far, &proto);
        assert!(e_near > e_far);
        assert!(model.evidence(&turned, &proto) < 30);
    }
}
