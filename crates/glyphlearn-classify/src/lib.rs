//! glyphlearn-classify - adaptive character classification
//!
//! This crate classifies segmented glyphs ("blobs") and learns
//! document-specific glyph variants as recognition proceeds:
//!
//! - **Template store**: pre-trained templates plus per-session adapted
//!   templates with a temporary / permanent config lifecycle
//! - **Classifier pipeline**: picks the template set to match, corrects
//!   ratings and collects candidates
//! - **Result filters**: bad-match trimming, punctuation/digit caps and
//!   fragment-safe conversion to the final choice list
//! - **Adaptation engine**: bootstraps, reinforces and promotes templates
//!   from confirmed labels
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use glyphlearn_classify::{AdaptiveClassifier, ClassifierOptions, WordSample};
//! use glyphlearn_core::{Blob, CharsetType, ClassTable, Point};
//!
//! let classes = ClassTable::with_charsets(&[CharsetType::LcAlpha]).unwrap();
//! let mut classifier = AdaptiveClassifier::builder(Arc::new(classes))
//!     .with_options(ClassifierOptions::default())
//!     .build()
//!     .unwrap();
//!
//! let blob = Blob::from_outline(vec![
//!     Point::new(0, 64),
//!     Point::new(40, 64),
//!     Point::new(40, 192),
//!     Point::new(0, 192),
//! ]);
//! classifier
//!     .adapt_to_word(&WordSample::new(vec![blob.clone()]).with_text("l"))
//!     .unwrap();
//! for choice in classifier.classify(&blob) {
//!     println!("{} {:.2}", classifier.classes().text(choice.class_id), choice.certainty);
//! }
//! ```
//!
//! # Modules
//!
//! - [`templates`]: pre-trained and adapted template storage
//! - [`matcher`]: collaborator traits (feature provider, matcher, pruner)
//! - [`reference`]: default collaborator implementations
//! - [`results`]: candidate collection and final choices
//! - [`rating`]: rating correction and shape expansion
//! - [`filters`]: result filters
//! - [`pipeline`]: the classifier itself
//! - [`adapt`]: learning from confirmed labels
//! - [`persist`]: saving and loading adapted templates
//! - [`stats`]: session counters

pub mod adapt;
mod error;
pub mod filters;
pub mod matcher;
mod options;
pub mod persist;
pub mod pipeline;
pub mod rating;
pub mod reference;
pub mod results;
pub mod stats;
pub mod templates;

pub use error::{ClassifyError, ClassifyResult};
pub use options::{ClassifierOptions, FilterPolicy};

// Re-export commonly used types
pub use adapt::{AdaptOutcome, LabelSpan, WordSample};
pub use matcher::{
    ClassPruner, ExtractedFeatures, FeatureProvider, GeometryMatcher, MatchResult, PrunerResult,
    WORST_RATING,
};
pub use pipeline::{AdaptiveClassifier, ClassifierBuilder};
pub use results::{BlobChoice, Candidate, ResultSet};
pub use stats::AdaptiveStats;
pub use templates::{AdaptedTemplateStore, PreTrainedTemplates, Proto};

// Re-export core for convenience
pub use glyphlearn_core;
