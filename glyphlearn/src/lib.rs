//! glyphlearn - Adaptive character classification for OCR
//!
//! # Overview
//!
//! glyphlearn classifies segmented glyphs against a pre-trained template
//! set and, as words are confirmed, learns the shapes of the document at
//! hand:
//!
//! - Blob geometry, class tables and ambiguity tables
//! - Adapted templates with temporary and permanent configs
//! - Rating correction, result filtering and candidate lists
//! - Persistence of the learned templates between sessions
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use glyphlearn::classify::{AdaptiveClassifier, WordSample};
//! use glyphlearn::{Blob, ClassTable, Point};
//!
//! let mut classes = ClassTable::new();
//! classes.add("l").unwrap();
//! let mut classifier = AdaptiveClassifier::builder(Arc::new(classes))
//!     .build()
//!     .unwrap();
//!
//! let stroke = Blob::from_outline(vec![
//!     Point::new(0, 64),
//!     Point::new(20, 64),
//!     Point::new(20, 248),
//!     Point::new(0, 248),
//! ]);
//! let learned = classifier
//!     .adapt_to_word(&WordSample::new(vec![stroke]).with_text("l"))
//!     .unwrap();
//! assert_eq!(learned, 1);
//! assert_eq!(classifier.adapted_templates().num_nonempty_classes(), 1);
//! ```

// Re-export core types (shared data model used everywhere)
pub use glyphlearn_core::*;

// Re-export the classifier as a module to avoid name conflicts
pub use glyphlearn_classify as classify;
