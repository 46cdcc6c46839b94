//! Reference collaborators
//!
//! Straightforward implementations of [`crate::FeatureProvider`],
//! [`crate::GeometryMatcher`] and [`crate::ClassPruner`]. They are exact
//! rather than fast and are what [`crate::AdaptiveClassifier`] uses unless
//! other collaborators are supplied.

mod evidence;
mod extractor;
mod matcher;
mod pruner;

pub use evidence::{EvidenceModel, angle_delta};
pub use extractor::OutlineFeatureExtractor;
pub use matcher::ProtoDistanceMatcher;
pub use pruner::ExhaustivePruner;
