//! Outline walking feature extractor

use glyphlearn_core::{
    BLN_BASELINE_OFFSET, BLN_X_HEIGHT, Blob, Feature, NormalizationFactors, Point,
    quantize_features,
};

use crate::matcher::{ExtractedFeatures, FeatureProvider};

/// Normalized units per blob-space pixel (one unit is two x-heights)
const UNITS_PER_PIXEL: f32 = 1.0 / (2 * BLN_X_HEIGHT) as f32;

/// Extracts features by walking the polygonal outlines of a blob
///
/// - pico features: equally spaced samples along every outline, each
///   carrying the local stroke direction
/// - outline features: one per polygon edge
/// - char-norm features: pico features of the blob rescaled so its larger
///   dimension spans one x-height
///
/// Normalization factors compare the blob height with an optional table
/// of expected class heights.
#[derive(Debug, Clone)]
pub struct OutlineFeatureExtractor {
    pico_length: f32,
    class_heights: Vec<f32>,
}

impl Default for OutlineFeatureExtractor {
    fn default() -> Self {
        Self {
            pico_length: 0.05,
            class_heights: Vec::new(),
        }
    }
}

impl OutlineFeatureExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pico feature spacing in normalized units
    pub fn with_pico_length(mut self, length: f32) -> Self {
        if length > 0.0 {
            self.pico_length = length;
        }
        self
    }

    /// Set the expected height in pixels of each class, indexed by class id.
    /// Zero means unknown.
    pub fn with_class_heights(mut self, heights: Vec<f32>) -> Self {
        self.class_heights = heights;
        self
    }

    fn normalization_factors(&self, height: f32, num_classes: usize) -> NormalizationFactors {
        let factors = (0..num_classes)
            .map(|i| match self.class_heights.get(i) {
                Some(&expected) if expected > 0.0 => {
                    ((height - expected).abs() / expected * 255.0).min(255.0) as u8
                }
                _ => 0,
            })
            .collect();
        NormalizationFactors::from_vec(factors)
    }
}

/// Samples every outline at `spacing` intervals (normalized units) after
/// mapping points through `map`
fn sample_picos<F>(blob: &Blob, spacing: f32, map: F) -> Vec<Feature>
where
    F: Fn(Point) -> (f32, f32),
{
    let mut features = Vec::new();
    for outline in blob.outlines() {
        let mut next = spacing / 2.0;
        let mut start = 0.0f32;
        for (i, &p) in outline.iter().enumerate() {
            let q = outline[(i + 1) % outline.len()];
            let (x0, y0) = map(p);
            let (x1, y1) = map(q);
            let (dx, dy) = (x1 - x0, y1 - y0);
            let len = (dx * dx + dy * dy).sqrt();
            if len <= 0.0 {
                continue;
            }
            let direction = direction_of(dx, dy);
            while next < start + len {
                let t = (next - start) / len;
                features.push(Feature::new(x0 + t * dx, y0 + t * dy, direction, spacing));
                next += spacing;
            }
            start += len;
        }
    }
    features
}

fn direction_of(dx: f32, dy: f32) -> f32 {
    (dy.atan2(dx) / std::f32::consts::TAU).rem_euclid(1.0)
}

fn baseline_map(center_x: i32) -> impl Fn(Point) -> (f32, f32) {
    move |p: Point| {
        (
            (p.x - center_x) as f32 * UNITS_PER_PIXEL,
            (p.y - BLN_BASELINE_OFFSET) as f32 * UNITS_PER_PIXEL,
        )
    }
}

fn perimeter(blob: &Blob) -> f32 {
    blob.outlines()
        .iter()
        .map(|outline| {
            outline
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    let q = outline[(i + 1) % outline.len()];
                    let (dx, dy) = ((q.x - p.x) as f32, (q.y - p.y) as f32);
                    (dx * dx + dy * dy).sqrt()
                })
                .sum::<f32>()
        })
        .sum()
}

impl FeatureProvider for OutlineFeatureExtractor {
    fn extract(&self, blob: &Blob, num_classes: usize) -> Option<ExtractedFeatures> {
        if blob.is_empty() {
            return None;
        }
        let bbox = blob.bounding_box();
        let baseline = quantize_features(&self.pico_features(blob));

        let size = bbox.width().max(bbox.height()).max(1) as f32;
        let scale = BLN_X_HEIGHT as f32 / size * UNITS_PER_PIXEL;
        let (cx, bottom) = (bbox.center_x(), bbox.bottom);
        let char_norm = quantize_features(&sample_picos(blob, self.pico_length, |p| {
            (
                (p.x - cx) as f32 * scale,
                (p.y - bottom) as f32 * scale,
            )
        }));
        if baseline.is_empty() && char_norm.is_empty() {
            return None;
        }

        Some(ExtractedFeatures {
            baseline,
            char_norm,
            char_norm_factors: self.normalization_factors(bbox.height() as f32, num_classes),
            blob_length: perimeter(blob).round() as u32,
        })
    }

    fn pico_features(&self, blob: &Blob) -> Vec<Feature> {
        let map = baseline_map(blob.bounding_box().center_x());
        sample_picos(blob, self.pico_length, map)
    }

    fn outline_features(&self, blob: &Blob) -> Vec<Feature> {
        let map = baseline_map(blob.bounding_box().center_x());
        let mut features = Vec::new();
        for outline in blob.outlines() {
            for (i, &p) in outline.iter().enumerate() {
                let q = outline[(i + 1) % outline.len()];
                let (x0, y0) = map(p);
                let (x1, y1) = map(q);
                let (dx, dy) = (x1 - x0, y1 - y0);
                let len = (dx * dx + dy * dy).sqrt();
                if len > 0.0 {
                    features.push(Feature::new(
                        (x0 + x1) / 2.0,
                        (y0 + y1) / 2.0,
                        direction_of(dx, dy),
                        len,
                    ));
                }
            }
        }
        features
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(left: i32, bottom: i32, w: i32, h: i32) -> Blob {
        Blob::from_outline(vec![
            Point::new(left, bottom),
            Point::new(left + w, bottom),
            Point::new(left + w, bottom + h),
            Point::new(left, bottom + h),
        ])
    }

    #[test]
    fn test_outline_features() {
        let fx = OutlineFeatureExtractor::new();
        let features = fx.outline_features(&rect(0, 64, 64, 128));
        assert_eq!(features.len(), 4);
        // bottom edge runs rightwards along the baseline
        assert!(features[0].direction.abs() < 1e-6);
        assert!(features[0].y.abs() < 1e-6);
        assert!((features[0].length - 0.25).abs() < 1e-6);
        // right edge runs upwards
        assert!((features[1].direction - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_pico_spacing() {
        let fx = OutlineFeatureExtractor::new();
        // perimeter 384 px = 1.5 units = 30 picos
        let picos = fx.pico_features(&rect(0, 64, 64, 128));
        assert_eq!(picos.len(), 30);
        assert!(picos.iter().all(|f| (f.length - 0.05).abs() < 1e-6));
    }

    #[test]
    fn test_extract() {
        let fx = OutlineFeatureExtractor::new().with_class_heights(vec![0.0, 128.0, 64.0]);
        let ex = fx.extract(&rect(0, 64, 64, 128), 3).unwrap();
        assert_eq!(ex.blob_length, 384);
        assert_eq!(ex.baseline.len(), 30);
        assert!(!ex.char_norm.is_empty());
        assert_eq!(ex.char_norm_factors.get(glyphlearn_core::ClassId(0)), 0);
        assert_eq!(ex.char_norm_factors.get(glyphlearn_core::ClassId(1)), 0);
        assert_eq!(ex.char_norm_factors.get(glyphlearn_core::ClassId(2)), 255);

        assert!(fx.extract(&Blob::default(), 3).is_none());
    }
}
