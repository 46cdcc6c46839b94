//! Classification pipeline regression test
//!
//! Drives the classifier with scripted collaborators so every rating is
//! known in advance.
//!
//! Test layout:
//!   Test 0: ranking, bad-match trim and output scaling
//!   Test 1: punctuation and digit caps
//!   Test 2: numeric mode substitution
//!   Test 3: noise fallback (no features, nothing matched)
//!   Test 4: zero-length blob sentinel
//!   Test 5: shape expansion
//!   Test 6: fragments never become the best candidate, and are not
//!           reported when disabled
//!   Test 7: determinism and session counters
//!   Test 8: blobs with implausibly many features are classified as noise

mod support;

use std::sync::Arc;

use glyphlearn_classify::{AdaptiveClassifier, BlobChoice, ClassifierOptions};
use glyphlearn_core::{ClassId, Shape, ShapeTable, UNLIKELY_NUM_FEATURES};
use glyphlearn_test::{RegParams, glyphs};
use support::{
    FixedFeatures, PassAllPruner, TaggedMatcher, choice_texts, class_table, scripted_classifier,
    tagged_templates,
};

/// Char-norm correction with a zero normalization factor
fn corrected(rating: f32, blob_length: u32) -> f64 {
    let multiplier = ClassifierOptions::default().integer_matcher_multiplier as f32;
    (rating * blob_length as f32 / (blob_length as f32 + multiplier)) as f64
}

/// Test 0: candidates are ranked, trimmed and scaled
#[test]
fn test_0_ranking() {
    let mut rp = RegParams::new("classify_0_ranking");
    let classes = class_table(&["a", "b", "c"]);
    let (a, b, c) = (ClassId(1), ClassId(2), ClassId(3));
    let mut classifier = scripted_classifier(
        classes,
        &[(c, 0.5), (b, 0.2), (a, 0.1)],
        ClassifierOptions::default(),
        90,
    );

    let choices = classifier.classify(&glyphs::bar());
    rp.compare_values(2.0, choices.len() as f64, 0.0);
    rp.check(choices[0].class_id == a, "best choice is a");
    rp.check(choices[1].class_id == b, "second choice is b");

    let best = corrected(0.1, 90);
    rp.compare_values(best * 1.5 * 90.0, choices[0].rating as f64, 1e-3);
    rp.compare_values(-best * 20.0, choices[0].certainty as f64, 1e-4);
    rp.check(
        choices.windows(2).all(|w| w[0].rating <= w[1].rating),
        "ratings are non-decreasing",
    );
    rp.check(choices.iter().all(|c| !c.adapted), "no adapted choices");

    assert!(rp.cleanup(), "classify test 0 (ranking) failed");
}

/// Test 1: at most two punctuation and one digit candidate survive
#[test]
fn test_1_caps() {
    let mut rp = RegParams::new("classify_1_caps");

    let classes = class_table(&[".", ",", ";", "a"]);
    let ratings = [
        (ClassId(1), 0.01),
        (ClassId(2), 0.02),
        (ClassId(3), 0.03),
        (ClassId(4), 0.05),
    ];
    let mut classifier = scripted_classifier(classes, &ratings, ClassifierOptions::default(), 64);
    let texts = choice_texts(&mut classifier, &glyphs::dot());
    rp.compare_strings(".,a", &texts.concat());

    let classes = class_table(&["1", "7", "a"]);
    let ratings = [(ClassId(1), 0.02), (ClassId(2), 0.03), (ClassId(3), 0.04)];
    let mut classifier = scripted_classifier(classes, &ratings, ClassifierOptions::default(), 64);
    let texts = choice_texts(&mut classifier, &glyphs::bar());
    rp.compare_strings("1a", &texts.concat());

    assert!(rp.cleanup(), "classify test 1 (caps) failed");
}

/// Test 2: numeric mode keeps digits, Roman numerals and digit look-alikes
#[test]
fn test_2_numeric_mode() {
    let mut rp = RegParams::new("classify_2_numeric");
    let classes = class_table(&["l", "1", "x", "b"]);
    let (l, one, x, b) = (ClassId(1), ClassId(2), ClassId(3), ClassId(4));
    let options = ClassifierOptions::default().with_numeric_mode(true);
    let mut classifier = scripted_classifier(classes, &[(l, 0.05), (b, 0.06), (x, 0.07)], options, 64);

    let choices = classifier.classify(&glyphs::bar());
    let ids: Vec<ClassId> = choices.iter().map(|c| c.class_id).collect();
    rp.check(ids == vec![one, x], "l reported as 1, b dropped, x kept");
    rp.compare_values(-corrected(0.05, 64) * 20.0, choices[0].certainty as f64, 1e-4);

    // a digit that survives on its own keeps its own rating
    let classes = class_table(&["l", "1"]);
    let options = ClassifierOptions::default().with_numeric_mode(true);
    let mut classifier =
        scripted_classifier(classes, &[(ClassId(1), 0.05), (ClassId(2), 0.08)], options, 64);
    let choices = classifier.classify(&glyphs::bar());
    rp.compare_values(1.0, choices.len() as f64, 0.0);
    rp.check(choices[0].class_id == ClassId(2), "digit survives alone");
    rp.compare_values(-corrected(0.08, 64) * 20.0, choices[0].certainty as f64, 1e-4);

    // the digit was matched but fell outside the pad: l stands in for it
    let classes = class_table(&["l", "1"]);
    let options = ClassifierOptions::default().with_numeric_mode(true);
    let mut classifier =
        scripted_classifier(classes, &[(ClassId(1), 0.3), (ClassId(2), 0.5)], options, 64);
    let choices = classifier.classify(&glyphs::bar());
    rp.compare_values(1.0, choices.len() as f64, 0.0);
    rp.check(choices[0].class_id == ClassId(2), "1 reported in place of l");
    rp.compare_values(-corrected(0.3, 64) * 20.0, choices[0].certainty as f64, 1e-4);

    assert!(rp.cleanup(), "classify test 2 (numeric mode) failed");
}

/// Test 3: a blob nothing matches is classified as noise
#[test]
fn test_3_noise_fallback() {
    let mut rp = RegParams::new("classify_3_noise");
    let classes = Arc::new(class_table(&["a"]));

    let mut classifier = AdaptiveClassifier::builder(Arc::clone(&classes))
        .with_feature_provider(Arc::new(FixedFeatures::nothing()))
        .build()
        .unwrap();
    let choices = classifier.classify(&glyphs::dot());
    rp.compare_values(1.0, choices.len() as f64, 0.0);
    rp.check(choices[0].class_id == ClassId::NONE, "no features gives NONE");
    rp.compare_values(
        BlobChoice::INVALID_BLOB_RATING as f64,
        choices[0].rating as f64,
        0.0,
    );

    // features but no templates: noise rated by blob length
    let mut classifier = AdaptiveClassifier::builder(Arc::clone(&classes))
        .with_feature_provider(Arc::new(FixedFeatures::new(24)))
        .build()
        .unwrap();
    let results = classifier.adaptive_match(&glyphs::dot());
    rp.compare_values(1.0, results.len() as f64, 0.0);
    rp.check(results.as_slice()[0].class_id == ClassId::NONE, "noise candidate");
    rp.compare_values(0.8, results.as_slice()[0].rating as f64, 1e-6);
    let choices = classifier.classify(&glyphs::dot());
    rp.compare_values(-16.0, choices[0].certainty as f64, 1e-4);

    // larger blobs are less likely to be noise
    let mut ratings = Vec::new();
    for blob_length in [0, 6, 12, 24, 96] {
        let mut classifier = AdaptiveClassifier::builder(Arc::clone(&classes))
            .with_feature_provider(Arc::new(FixedFeatures::new(blob_length)))
            .build()
            .unwrap();
        let results = classifier.adaptive_match(&glyphs::dot());
        rp.check(results.as_slice()[0].class_id == ClassId::NONE, "noise candidate");
        ratings.push(results.as_slice()[0].rating as f64);
    }
    rp.compare_values(0.0, ratings[0], 0.0);
    rp.compare_values(0.5, ratings[2], 1e-6);
    rp.check(
        ratings.windows(2).all(|w| w[0] < w[1]),
        "noise rating strictly increasing in blob length",
    );
    rp.check(ratings.iter().all(|&r| r < 1.0), "noise rating saturates below 1");

    assert!(rp.cleanup(), "classify test 3 (noise fallback) failed");
}

/// Test 4: a zero-length blob reports the invalid-blob sentinel
#[test]
fn test_4_zero_length() {
    let mut rp = RegParams::new("classify_4_zero_length");
    let classes = class_table(&["a", "b"]);
    let mut classifier = scripted_classifier(
        classes,
        &[(ClassId(1), 0.1), (ClassId(2), 0.12)],
        ClassifierOptions::default(),
        0,
    );

    let choices = classifier.classify(&glyphs::dot());
    rp.check(!choices.is_empty(), "choices produced");
    for choice in &choices {
        rp.compare_values(
            BlobChoice::INVALID_BLOB_RATING as f64,
            choice.rating as f64,
            0.0,
        );
        rp.compare_values(
            BlobChoice::INVALID_BLOB_CERTAINTY as f64,
            choice.certainty as f64,
            0.0,
        );
    }

    assert!(rp.cleanup(), "classify test 4 (zero length) failed");
}

/// Test 5: a config standing for a shape yields every class of the shape
#[test]
fn test_5_shape_expansion() {
    let mut rp = RegParams::new("classify_5_shapes");
    let classes = class_table(&["a", "b", "c"]);
    let (a, b) = (ClassId(1), ClassId(2));

    let mut shape = Shape::new();
    shape.add(a, 3);
    shape.add(b, 4);
    let mut shapes = ShapeTable::new();
    let shape_id = shapes.add_shape(shape);

    let templates = tagged_templates(classes.len(), &[(a, shape_id)]);
    let mut classifier = AdaptiveClassifier::builder(Arc::new(classes))
        .with_pretrained(Arc::new(templates))
        .with_shape_table(Arc::new(shapes))
        .with_feature_provider(Arc::new(FixedFeatures::new(90)))
        .with_matcher(Arc::new(TaggedMatcher::new(0.9).rate(a, 0.1)))
        .with_pruner(Arc::new(PassAllPruner))
        .build()
        .unwrap();

    let choices = classifier.classify(&glyphs::bar());
    rp.compare_values(2.0, choices.len() as f64, 0.0);
    rp.check(choices[0].class_id == a && choices[1].class_id == b, "a then b");
    rp.compare_values(choices[0].rating as f64, choices[1].rating as f64, 0.0);
    rp.check(choices[0].font_id == Some(3), "a keeps its font");
    rp.check(choices[1].font_id == Some(4), "b keeps its font");

    let results = classifier.adaptive_match(&glyphs::bar());
    rp.check(
        results.iter().all(|m| m.shape_id == Some(shape_id)),
        "candidates remember their shape",
    );

    assert!(rp.cleanup(), "classify test 5 (shape expansion) failed");
}

/// Test 6: a fragment rated better than a whole character is kept but
/// never becomes the best candidate; disabled fragments are not reported
#[test]
fn test_6_fragments() {
    let mut rp = RegParams::new("classify_6_fragments");
    let classes = class_table(&["a", "|a|0|2"]);
    let (a, frag) = (ClassId(1), ClassId(2));
    let mut classifier = scripted_classifier(
        classes.clone(),
        &[(a, 0.1), (frag, 0.01)],
        ClassifierOptions::default().with_character_fragments(true),
        90,
    );

    let results = classifier.adaptive_match(&glyphs::bar());
    rp.check(results.best().is_some_and(|b| b.class_id == a), "best is whole");
    rp.compare_values(corrected(0.1, 90), results.best_rating() as f64, 1e-6);
    rp.check(results.find(frag).is_some(), "fragment kept");

    let choices = classifier.classify(&glyphs::bar());
    rp.check(choices[0].class_id == frag, "fragment sorts first");
    rp.check(choices.iter().any(|c| c.class_id == a), "whole char emitted");

    // with fragments disabled the fragment class is never reported
    let mut classifier =
        scripted_classifier(classes, &[(a, 0.1), (frag, 0.01)], ClassifierOptions::default(), 90);
    rp.check(!classifier.classes().is_enabled(frag), "fragment class disabled");
    let results = classifier.adaptive_match(&glyphs::bar());
    rp.check(results.find(frag).is_none(), "fragment not matched");
    let choices = classifier.classify(&glyphs::bar());
    rp.check(choices[0].class_id == a, "whole char first");
    rp.check(choices.iter().all(|c| c.class_id != frag), "no fragment choices");

    assert!(rp.cleanup(), "classify test 6 (fragments) failed");
}

/// Test 7: identical inputs give identical outputs; counters add up
#[test]
fn test_7_determinism() {
    let mut rp = RegParams::new("classify_7_determinism");
    let ratings = [(ClassId(1), 0.1), (ClassId(2), 0.15), (ClassId(3), 0.2)];
    let make = || {
        scripted_classifier(
            class_table(&["a", "b", "c"]),
            &ratings,
            ClassifierOptions::default(),
            70,
        )
    };
    let (mut first, mut second) = (make(), make());

    let blob = glyphs::el();
    let one = first.classify(&blob);
    let two = second.classify(&blob);
    rp.check(one == two, "two classifiers agree");
    rp.check(first.classify(&blob) == one, "repeated call agrees");

    let stats = first.stats();
    rp.compare_values(2.0, stats.blobs_classified as f64, 0.0);
    rp.compare_values(2.0, stats.char_norm_classifier_calls as f64, 0.0);
    rp.compare_values(6.0, stats.char_norm_classes_tried as f64, 0.0);
    rp.compare_values((2 * one.len()) as f64, stats.classes_output as f64, 0.0);
    rp.compare_values(0.0, stats.baseline_classifier_calls as f64, 0.0);

    assert!(rp.cleanup(), "classify test 7 (determinism) failed");
}

/// Test 8: too many features means noise, however well a template matches
#[test]
fn test_8_unlikely_feature_count() {
    let mut rp = RegParams::new("classify_8_feature_count");
    let a = ClassId(1);
    let classify_with = |num_features: usize| {
        let classes = class_table(&["a"]);
        let templates = tagged_templates(classes.len(), &[(a, 0)]);
        let mut classifier = AdaptiveClassifier::builder(Arc::new(classes))
            .with_pretrained(Arc::new(templates))
            .with_feature_provider(Arc::new(
                FixedFeatures::new(24).with_num_features(num_features),
            ))
            .with_matcher(Arc::new(TaggedMatcher::new(0.9).rate(a, 0.05)))
            .with_pruner(Arc::new(PassAllPruner))
            .build()
            .unwrap();
        let choices = classifier.classify(&glyphs::rect(2000, 2000));
        (choices, classifier.stats().char_norm_classifier_calls)
    };

    let (choices, calls) = classify_with(UNLIKELY_NUM_FEATURES);
    rp.check(choices[0].class_id == a, "matched at the limit");
    rp.compare_values(1.0, calls as f64, 0.0);

    let (choices, calls) = classify_with(UNLIKELY_NUM_FEATURES + 1);
    rp.compare_values(1.0, choices.len() as f64, 0.0);
    rp.check(choices[0].class_id == ClassId::NONE, "over the limit is noise");
    rp.compare_values(-16.0, choices[0].certainty as f64, 1e-4);
    rp.compare_values(0.0, calls as f64, 0.0);

    assert!(rp.cleanup(), "classify test 8 (feature count) failed");
}
