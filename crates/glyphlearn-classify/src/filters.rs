//! Result filters
//!
//! Applied in order by [`crate::AdaptiveClassifier::classify`]:
//! [`remove_bad_matches`], [`sort_by_rating`], [`remove_extra_puncs`],
//! then [`convert_to_choices`].

use glyphlearn_core::{ClassTable, ShapeTable};

use crate::ClassifierOptions;
use crate::results::{BlobChoice, ResultSet};

/// Output size when no shape table is in use
pub const DEFAULT_MAX_CHOICES: usize = 10;

/// Drops every candidate rated worse than best + `bad_match_pad`
///
/// In numeric mode alphabetic survivors are dropped too, except the
/// allowed Roman numeral letters and the digit look-alikes of the filter
/// policy, which are reported as their digit (keeping their rating) when
/// that digit did not already survive on its own.
pub fn remove_bad_matches(results: &mut ResultSet, options: &ClassifierOptions, classes: &ClassTable) {
    let threshold = results.best_rating() + options.bad_match_pad;
    if !options.numeric_mode {
        results.matches.retain(|m| m.rating <= threshold);
        return;
    }

    let policy = &options.filter_policy;
    let survives = |results: &ResultSet, digit: char| {
        classes
            .id_of(&digit.to_string())
            .ok()
            .filter(|&id| results.find(id).is_none_or(|m| m.rating > threshold))
    };
    let mut kept = Vec::with_capacity(results.len());
    for m in results.matches.iter().filter(|m| m.rating <= threshold) {
        let text = classes.text(m.class_id);
        if !classes.is_alpha(m.class_id) || policy.is_numeric_allowed(text) {
            kept.push(*m);
        } else if let Some(digit_id) = policy
            .numeric_substitute(text)
            .and_then(|d| survives(results, d))
        {
            let mut sub = *m;
            sub.class_id = digit_id;
            kept.push(sub);
        }
    }
    results.matches = kept;
}

/// Caps punctuation and digit candidates, first seen wins
pub fn remove_extra_puncs(results: &mut ResultSet, options: &ClassifierOptions, classes: &ClassTable) {
    let policy = &options.filter_policy;
    let mut punc_count = 0;
    let mut digit_count = 0;
    results.matches.retain(|m| {
        let text = classes.text(m.class_id);
        if policy.is_punctuation(text) {
            punc_count += 1;
            punc_count <= policy.punctuation_cap
        } else if policy.is_digit(text) {
            digit_count += 1;
            digit_count <= policy.digit_cap
        } else {
            true
        }
    });
}

/// Sorts ascending by rating, ties by class id
pub fn sort_by_rating(results: &mut ResultSet) {
    results.matches.sort_by(|a, b| {
        a.rating
            .total_cmp(&b.rating)
            .then(a.class_id.cmp(&b.class_id))
    });
}

/// Maximum number of choices produced by [`convert_to_choices`]
pub fn max_choices(shapes: Option<&ShapeTable>) -> usize {
    shapes.map_or(DEFAULT_MAX_CHOICES, |s| {
        DEFAULT_MAX_CHOICES.max(2 * s.max_shape_size())
    })
}

/// Converts sorted candidates to output choices
///
/// A fragment is never given the last slot while no whole character has
/// been emitted. A zero-length blob yields the invalid-blob sentinel for
/// every choice.
pub fn convert_to_choices(
    results: &ResultSet,
    options: &ClassifierOptions,
    classes: &ClassTable,
    shapes: Option<&ShapeTable>,
) -> Vec<BlobChoice> {
    let max = max_choices(shapes);
    let mut choices = Vec::with_capacity(max.min(results.len()));
    let mut contains_nonfrag = false;
    for m in results.iter() {
        if choices.len() >= max {
            break;
        }
        let is_frag = classes.is_fragment(m.class_id);
        if is_frag && choices.len() + 1 == max && !contains_nonfrag {
            continue;
        }
        contains_nonfrag |= !is_frag;

        let (rating, certainty) = if results.blob_length == 0 {
            (BlobChoice::INVALID_BLOB_RATING, BlobChoice::INVALID_BLOB_CERTAINTY)
        } else {
            (
                m.rating * options.rating_scale * results.blob_length as f32,
                -m.rating * options.certainty_scale,
            )
        };
        choices.push(BlobChoice {
            class_id: m.class_id,
            rating,
            certainty,
            font_id: m.font_id,
            font_id2: m.font_id2,
            adapted: m.adapted,
        });
    }
    choices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::Candidate;
    use glyphlearn_core::{CharsetType, ClassId, Shape};

    fn table() -> ClassTable {
        ClassTable::with_charsets(&[
            CharsetType::ArabicNumerals,
            CharsetType::LcAlpha,
            CharsetType::UcAlpha,
            CharsetType::Punctuation,
        ])
        .unwrap()
    }

    fn id(classes: &ClassTable, text: &str) -> ClassId {
        classes.id_of(text).unwrap()
    }

    #[test]
    fn test_bad_match_trim() {
        let classes = table();
        let opts = ClassifierOptions::default();
        let mut r = ResultSet::new(64);
        r.add(Candidate::new(id(&classes, "a"), 0.1), false, 1.0);
        r.add(Candidate::new(id(&classes, "b"), 0.2), false, 1.0);
        r.add(Candidate::new(id(&classes, "c"), 0.3), false, 1.0);
        remove_bad_matches(&mut r, &opts, &classes);
        assert_eq!(r.len(), 2);
        assert!(r.find(id(&classes, "c")).is_none());
    }

    #[test]
    fn test_numeric_mode() {
        let classes = table();
        let opts = ClassifierOptions::default().with_numeric_mode(true);
        let mut r = ResultSet::new(64);
        r.add(Candidate::new(id(&classes, "O"), 0.1), false, 1.0);
        r.add(Candidate::new(id(&classes, "0"), 0.15), false, 1.0);
        r.add(Candidate::new(id(&classes, "x"), 0.12), false, 1.0);
        r.add(Candidate::new(id(&classes, "q"), 0.12), false, 1.0);
        r.add(Candidate::new(id(&classes, "."), 0.2), false, 1.0);
        remove_bad_matches(&mut r, &opts, &classes);
        let texts: Vec<&str> = r.iter().map(|m| classes.text(m.class_id)).collect();
        // '0' already survived, so 'O' is dropped rather than duplicated
        assert_eq!(texts, vec!["0", "x", "."]);
    }

    #[test]
    fn test_numeric_mode_replaces_far_digit() {
        let classes = table();
        let opts = ClassifierOptions::default().with_numeric_mode(true);
        let mut r = ResultSet::new(64);
        r.add(Candidate::new(id(&classes, "l"), 0.3), false, 1.0);
        r.add(Candidate::new(id(&classes, "1"), 0.5), false, 1.0);
        remove_bad_matches(&mut r, &opts, &classes);
        assert_eq!(r.len(), 1);
        let m = r.as_slice()[0];
        assert_eq!(classes.text(m.class_id), "1");
        assert!((m.rating - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_punctuation_cap() {
        let classes = table();
        let opts = ClassifierOptions::default();
        let mut r = ResultSet::new(64);
        for (t, rating) in [(".", 0.1), (",", 0.11), ("3", 0.12), (";", 0.13), ("5", 0.14), (":", 0.15)] {
            r.add(Candidate::new(id(&classes, t), rating), false, 1.0);
        }
        r.add(Candidate::new(id(&classes, "k"), 0.16), false, 1.0);
        remove_extra_puncs(&mut r, &opts, &classes);
        let texts: Vec<&str> = r.iter().map(|m| classes.text(m.class_id)).collect();
        assert_eq!(texts, vec![".", ",", "3", "k"]);
    }

    #[test]
    fn test_sort_ties_by_class() {
        let classes = table();
        let mut r = ResultSet::new(64);
        r.add(Candidate::new(id(&classes, "z"), 0.2), false, 1.0);
        r.add(Candidate::new(id(&classes, "b"), 0.2), false, 1.0);
        r.add(Candidate::new(id(&classes, "q"), 0.1), false, 1.0);
        sort_by_rating(&mut r);
        let texts: Vec<&str> = r.iter().map(|m| classes.text(m.class_id)).collect();
        assert_eq!(texts, vec!["q", "b", "z"]);
    }

    #[test]
    fn test_convert_scales() {
        let classes = table();
        let opts = ClassifierOptions::default();
        let mut r = ResultSet::new(64);
        r.blob_length = 100;
        r.add(Candidate::new(id(&classes, "a"), 0.2), false, 1.0);
        let choices = convert_to_choices(&r, &opts, &classes, None);
        assert_eq!(choices.len(), 1);
        assert!((choices[0].rating - 0.2 * 1.5 * 100.0).abs() < 1e-4);
        assert!((choices[0].certainty + 0.2 * 20.0).abs() < 1e-5);
    }

    #[test]
    fn test_fragment_kept_out_of_last_slot() {
        let mut classes = table();
        let frags: Vec<ClassId> = (0..12)
            .map(|i| classes.add(&format!("|{}|0|2", (b'a' + i as u8) as char)).unwrap())
            .collect();
        let opts = ClassifierOptions::default();
        let mut r = ResultSet::new(64);
        r.blob_length = 10;
        for (i, &f) in frags.iter().enumerate() {
            r.add(Candidate::new(f, 0.01 * i as f32), true, 1.0);
        }
        r.add(Candidate::new(id(&classes, "m"), 0.5), false, 1.0);
        sort_by_rating(&mut r);
        let choices = convert_to_choices(&r, &opts, &classes, None);
        assert_eq!(choices.len(), DEFAULT_MAX_CHOICES);
        assert_eq!(choices.last().unwrap().class_id, id(&classes, "m"));
    }

    #[test]
    fn test_max_choices_with_shapes() {
        let mut shapes = ShapeTable::new();
        let mut shape = Shape::new();
        for i in 1..=7 {
            shape.add(ClassId(i), 0);
        }
        shapes.add_shape(shape);
        assert_eq!(max_choices(None), 10);
        assert_eq!(max_choices(Some(&shapes)), 14);
    }
}
