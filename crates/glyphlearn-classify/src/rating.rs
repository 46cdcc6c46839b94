//! Rating correction and shape expansion
//!
//! Raw matcher ratings are adjusted before they enter a [`ResultSet`]:
//!
//! - char-norm correction blends in the class's size disagreement,
//!   weighted against the blob length
//! - every feature the matcher could not explain adds a miss penalty
//! - non-alphanumeric classes sitting outside their observed vertical band
//!   get a junk penalty
//!
//! A pre-trained config may stand for a whole shape; it is then expanded
//! into one candidate per enabled class of the shape.

use glyphlearn_core::{ClassId, ClassTable, FontId, NormalizationFactors, ShapeTable};

use crate::ClassifierOptions;
use crate::matcher::{MatchResult, WORST_RATING};
use crate::results::{Candidate, ResultSet};
use crate::templates::{AdaptiveClass, PreTrainedTemplates};

/// Blob-level inputs shared by every correction of one matcher pass
#[derive(Debug, Clone, Copy)]
pub struct CorrectionContext<'a> {
    /// Bottom of the blob on the 0..=255 vertical scale
    pub bottom: i32,
    /// Top of the blob on the 0..=255 vertical scale
    pub top: i32,
    pub blob_length: u32,
    pub norm_factors: &'a NormalizationFactors,
    /// Weight of the normalization factor (0 disables the correction)
    pub multiplier: u32,
}

/// Where a matched class came from, which decides how config ids map to
/// fonts and shapes
#[derive(Debug, Clone, Copy)]
pub enum TemplateSource<'a> {
    Adapted(&'a AdaptiveClass),
    PreTrained {
        templates: &'a PreTrainedTemplates,
        shapes: Option<&'a ShapeTable>,
    },
}

/// Applies the post-match corrections
#[derive(Debug, Clone, Copy)]
pub struct RatingCorrector<'a> {
    options: &'a ClassifierOptions,
    classes: &'a ClassTable,
}

impl<'a> RatingCorrector<'a> {
    pub fn new(options: &'a ClassifierOptions, classes: &'a ClassTable) -> Self {
        Self { options, classes }
    }

    /// Blends a rating with a normalization factor
    ///
    /// `(rating * blob_length + multiplier * factor / 256) / (blob_length + multiplier)`;
    /// a zero denominator leaves the rating unchanged.
    pub fn cn_correction(&self, rating: f32, blob_length: u32, factor: u8, multiplier: u32) -> f32 {
        let denom = blob_length as f32 + multiplier as f32;
        if denom <= 0.0 {
            return rating;
        }
        (rating * blob_length as f32 + multiplier as f32 * factor as f32 / 256.0) / denom
    }

    /// Corrected rating of `class_id`, clamped to [`WORST_RATING`]
    pub fn corrected_rating(
        &self,
        class_id: ClassId,
        cp_rating: f32,
        im_rating: f32,
        feature_misses: u32,
        ctx: &CorrectionContext<'_>,
    ) -> f32 {
        let factor = ctx.norm_factors.get(class_id);
        let cn = self.cn_correction(im_rating, ctx.blob_length, factor, ctx.multiplier);
        let miss_penalty = self.options.class_miss_scale * feature_misses as f32;
        let mut vertical_penalty = 0.0;
        if !self.classes.is_alpha(class_id)
            && !self.classes.is_digit(class_id)
            && factor != 0
            && self.options.misfit_junk_penalty > 0.0
            && !self
                .classes
                .top_bottom(class_id)
                .contains(ctx.bottom, ctx.top)
        {
            vertical_penalty = self.options.misfit_junk_penalty;
        }
        let rating = (cn + miss_penalty + vertical_penalty).min(WORST_RATING);
        tracing::trace!(
            class = self.classes.text(class_id),
            rating,
            cp = cp_rating,
            im = im_rating,
            cn,
            factor,
            mp = miss_penalty,
            vp = vertical_penalty,
            "corrected rating"
        );
        rating
    }

    /// Corrects a match and adds the resulting candidate(s) to `results`
    ///
    /// Returns the lowest corrected rating emitted, or [`WORST_RATING`] if
    /// every candidate class was disabled.
    pub fn expand_and_add(
        &self,
        source: TemplateSource<'_>,
        class_id: ClassId,
        cp_rating: f32,
        m: &MatchResult,
        ctx: &CorrectionContext<'_>,
        results: &mut ResultSet,
    ) -> f32 {
        let pad = self.options.bad_match_pad;
        let base = match source {
            TemplateSource::Adapted(class) => Candidate::new(class_id, m.rating)
                .with_adapted(true)
                .with_config(m.config)
                .with_fonts(
                    class.font_id(m.config),
                    m.config2.and_then(|c| class.font_id(c)),
                ),
            TemplateSource::PreTrained { templates, shapes } => {
                let font_of = |c| templates.font_or_shape(class_id, c);
                if let Some(shapes) = shapes {
                    return self.expand_shape(shapes, font_of(m.config), cp_rating, m, ctx, results);
                }
                Candidate::new(class_id, m.rating)
                    .with_config(m.config)
                    .with_fonts(
                        font_of(m.config).map(|f| f as FontId),
                        m.config2.and_then(font_of).map(|f| f as FontId),
                    )
            }
        };

        if !self.classes.is_enabled(class_id) {
            return WORST_RATING;
        }
        let rating = self.corrected_rating(class_id, cp_rating, m.rating, m.feature_misses, ctx);
        results.add(
            Candidate { rating, ..base },
            self.classes.is_fragment(class_id),
            pad,
        );
        rating
    }

    fn expand_shape(
        &self,
        shapes: &ShapeTable,
        shape_id: Option<u32>,
        cp_rating: f32,
        m: &MatchResult,
        ctx: &CorrectionContext<'_>,
        results: &mut ResultSet,
    ) -> f32 {
        let Some(shape_id) = shape_id else {
            return WORST_RATING;
        };
        let shape = match shapes.get_shape(shape_id) {
            Ok(shape) => shape,
            Err(e) => {
                tracing::debug!(shape_id, error = %e, "config refers to a missing shape");
                return WORST_RATING;
            }
        };
        let mut best = WORST_RATING;
        for entry in shape.entries() {
            if !self.classes.is_enabled(entry.class_id) {
                continue;
            }
            let rating =
                self.corrected_rating(entry.class_id, cp_rating, m.rating, m.feature_misses, ctx);
            let candidate = Candidate::new(entry.class_id, rating)
                .with_shape(shape_id)
                .with_config(m.config)
                .with_fonts(entry.font_ids.first().copied(), entry.font_ids.get(1).copied());
            results.add(candidate, self.classes.is_fragment(entry.class_id), self.options.bad_match_pad);
            best = best.min(rating);
        }
        best
    }
}
