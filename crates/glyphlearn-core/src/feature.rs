//! Feature representations
//!
//! Floating-point features use normalized units: `x` in `[-0.5, 0.5)`
//! relative to the blob center, `y` in `[-0.25, 0.75)` relative to the
//! baseline (one unit is twice the x-height), `direction` in turns `[0, 1)`.
//! Integer features quantize the same quantities to one byte each.

use serde::{Deserialize, Serialize};

use crate::ids::ClassId;

/// Offset applied to x before quantizing
pub const X_SHIFT: f32 = 0.5;

/// Offset applied to y before quantizing (baseline normalization)
pub const BASELINE_Y_SHIFT: f32 = 0.25;

/// A floating-point outline or pico feature
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Feature {
    pub x: f32,
    pub y: f32,
    /// Direction in turns, `[0, 1)`
    pub direction: f32,
    pub length: f32,
}

impl Feature {
    pub fn new(x: f32, y: f32, direction: f32, length: f32) -> Self {
        Self {
            x,
            y,
            direction: direction.rem_euclid(1.0),
            length,
        }
    }
}

/// A quantized feature as consumed by the geometry matcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct IntFeature {
    pub x: u8,
    pub y: u8,
    pub theta: u8,
}

impl IntFeature {
    pub const fn new(x: u8, y: u8, theta: u8) -> Self {
        Self { x, y, theta }
    }

    /// Quantizes a floating-point feature
    pub fn from_feature(f: &Feature) -> Self {
        Self {
            x: quantize(f.x + X_SHIFT),
            y: quantize(f.y + BASELINE_Y_SHIFT),
            theta: ((f.direction.rem_euclid(1.0) * 256.0) as i32).rem_euclid(256) as u8,
        }
    }

    /// Back to normalized floating-point units (cell centers)
    pub fn to_feature(&self, length: f32) -> Feature {
        Feature {
            x: (self.x as f32 + 0.5) / 256.0 - X_SHIFT,
            y: (self.y as f32 + 0.5) / 256.0 - BASELINE_Y_SHIFT,
            direction: self.theta as f32 / 256.0,
            length,
        }
    }
}

fn quantize(v: f32) -> u8 {
    (v * 256.0).floor().clamp(0.0, 255.0) as u8
}

/// Quantizes a whole feature vector
pub fn quantize_features(features: &[Feature]) -> Vec<IntFeature> {
    features.iter().map(IntFeature::from_feature).collect()
}

/// Per-class character-normalization factors for one blob
///
/// A factor of 0 means "no size evidence"; 255 is the strongest
/// disagreement between the blob size and the class's expected size.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NormalizationFactors(Vec<u8>);

impl NormalizationFactors {
    /// All-zero factors for `num_classes` classes
    pub fn zeros(num_classes: usize) -> Self {
        Self(vec![0; num_classes])
    }

    pub fn from_vec(factors: Vec<u8>) -> Self {
        Self(factors)
    }

    /// Factor for a class; unknown classes read as 0
    #[inline]
    pub fn get(&self, class_id: ClassId) -> u8 {
        self.0.get(class_id.index()).copied().unwrap_or(0)
    }

    pub fn set(&mut self, class_id: ClassId, factor: u8) {
        if let Some(slot) = self.0.get_mut(class_id.index()) {
            *slot = factor;
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}
