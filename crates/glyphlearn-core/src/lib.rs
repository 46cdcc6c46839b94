//! glyphlearn core - shared data model for adaptive character classification
//!
//! This crate provides the data structures used throughout glyphlearn:
//!
//! - [`ClassId`] and the id aliases / capacity limits
//! - [`Blob`] / [`BlobBox`] / [`Point`] - segmented glyph geometry
//! - [`Feature`] / [`IntFeature`] / [`NormalizationFactors`] - matcher inputs
//! - [`ClassTable`] - working alphabet with per-class properties
//! - [`ShapeTable`] - (class, font) groupings behind pre-trained templates
//! - [`AmbigTable`] - known confusable classes
//! - [`BitMask`] - proto and config selections

pub mod ambigs;
pub mod charset;
pub mod error;
pub mod feature;
pub mod geometry;
pub mod ids;
pub mod mask;
pub mod shape;

pub use ambigs::AmbigTable;
pub use charset::{CharsetType, ClassProperties, ClassTable, Fragment, TopBottom};
pub use error::{Error, Result};
pub use feature::{Feature, IntFeature, NormalizationFactors, quantize_features};
pub use geometry::{BLN_BASELINE_OFFSET, BLN_X_HEIGHT, Blob, BlobBox, Point};
pub use ids::{
    ClassId, ConfigId, FontId, MAX_NUM_CONFIGS, MAX_NUM_PROTOS, ProtoId, ShapeId,
    UNLIKELY_NUM_FEATURES,
};
pub use mask::{BitMask, ConfigMask, ProtoMask};
pub use shape::{Shape, ShapeTable, UnicharAndFonts};
