//! glyphlearn-test - Regression test helpers for glyphlearn
//!
//! Provides the [`RegParams`] check recorder used by the `*_reg.rs`
//! integration tests and a set of synthetic glyph fixtures.
//!
//! # Usage
//!
//! ```ignore
//! use glyphlearn_test::{RegParams, glyphs};
//!
//! let mut rp = RegParams::new("bootstrap");
//! let blob = glyphs::bar();
//! rp.compare_values(1.0, blob.outlines().len() as f64, 0.0);
//! assert!(rp.cleanup());
//! ```
//!
//! # Environment Variables
//!
//! - `REGTEST_MODE`: Set to "display" to print every compared value

mod error;
pub mod glyphs;
mod params;

pub use error::{TestError, TestResult};
pub use params::{RegParams, RegTestMode};
