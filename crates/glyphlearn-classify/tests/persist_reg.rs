//! Template persistence regression test
//!
//! Test layout:
//!   Test 0: learned templates survive a save/load cycle and classify the
//!           same way afterwards
//!   Test 1: loading rejects templates built for another alphabet
//!   Test 2: loading rejects a store whose parts disagree, and the session
//!           keeps learning afterwards

mod support;

use std::sync::Arc;

use glyphlearn_classify::templates::{AdaptiveClass, CompiledTemplates};
use glyphlearn_classify::{AdaptOutcome, AdaptiveClassifier, ClassifyError, WordSample};
use serde::Serialize;
use glyphlearn_test::{RegParams, glyphs};
use support::class_table;

fn classifier(texts: &[&str]) -> AdaptiveClassifier {
    AdaptiveClassifier::builder(Arc::new(class_table(texts)))
        .build()
        .unwrap()
}

/// Test 0: save, load, classify
#[test]
fn test_0_round_trip() {
    let mut rp = RegParams::new("persist_0_round_trip");
    let blobs = glyphs::word(&[glyphs::bar(), glyphs::ring()], 20);
    let word = WordSample::new(blobs.clone()).with_text("lo");

    let mut trained = classifier(&["l", "o"]);
    for _ in 0..3 {
        trained.adapt_to_word(&word).unwrap();
    }
    rp.compare_values(2.0, trained.adapted_templates().num_perm_classes() as f64, 0.0);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session").join("adapted.bin");
    trained.save_templates_to(&path).unwrap();
    rp.check(path.exists(), "template file written");

    let mut restored = classifier(&["l", "o"]);
    restored.load_templates_from(&path).unwrap();
    rp.check(
        restored.adapted_templates() == trained.adapted_templates(),
        "templates identical after load",
    );
    for blob in &blobs {
        let expected = trained.classify(blob);
        let actual = restored.classify(blob);
        rp.check(expected == actual, "same choices after load");
    }

    // in-memory form matches the file
    let bytes = trained.persist_templates().unwrap();
    rp.check(std::fs::read(&path).unwrap() == bytes, "file holds the serialized form");

    // overwriting replaces the old file
    trained.reset_adaptation();
    trained.save_templates_to(&path).unwrap();
    restored.load_templates_from(&path).unwrap();
    rp.compare_values(0.0, restored.adapted_templates().num_nonempty_classes() as f64, 0.0);

    assert!(rp.cleanup(), "persist test 0 (round trip) failed");
}

/// Test 1: mismatched or corrupt templates leave the session untouched
#[test]
fn test_1_rejects() {
    let mut rp = RegParams::new("persist_1_rejects");
    let mut trained = classifier(&["l"]);
    trained
        .adapt_to_word(&WordSample::new(vec![glyphs::bar()]).with_text("l"))
        .unwrap();
    let bytes = trained.persist_templates().unwrap();

    let mut other = classifier(&["l", "o"]);
    other
        .adapt_to_word(&WordSample::new(vec![glyphs::ring()]).with_text("o"))
        .unwrap();
    rp.check(
        matches!(
            other.load_templates(&bytes),
            Err(ClassifyError::InvalidParameter(_))
        ),
        "alphabet size mismatch",
    );
    rp.check(
        matches!(
            other.load_templates(&bytes[..bytes.len() / 2]),
            Err(ClassifyError::Serialization(_))
        ),
        "truncated input",
    );
    rp.compare_values(1.0, other.adapted_templates().num_nonempty_classes() as f64, 0.0);

    assert!(rp.cleanup(), "persist test 1 (rejects) failed");
}

/// Same field order as the persisted form
#[derive(Serialize)]
struct RawTemplates {
    version: u32,
    templates: CompiledTemplates,
    classes: Vec<AdaptiveClass>,
    num_perm_classes: usize,
    num_nonempty_classes: usize,
}

impl RawTemplates {
    fn bytes(&self) -> Vec<u8> {
        bincode::serialize(self).unwrap()
    }
}

/// Test 2: internally inconsistent stores are refused
#[test]
fn test_2_rejects_inconsistent_store() {
    let mut rp = RegParams::new("persist_2_inconsistent");
    let mut c = classifier(&["l", "o"]);
    let n = c.classes().len();
    let l = c.classes().id_of("l").unwrap();

    let no_compiled = RawTemplates {
        version: 1,
        templates: CompiledTemplates::new(0),
        classes: (0..n).map(|_| AdaptiveClass::new()).collect(),
        num_perm_classes: 0,
        num_nonempty_classes: 0,
    };
    rp.check(
        matches!(
            c.load_templates(&no_compiled.bytes()),
            Err(ClassifyError::InvalidParameter(_))
        ),
        "compiled templates missing",
    );

    let bad_counters = RawTemplates {
        version: 1,
        templates: CompiledTemplates::new(n),
        classes: (0..n).map(|_| AdaptiveClass::new()).collect(),
        num_perm_classes: 1,
        num_nonempty_classes: 2,
    };
    rp.check(
        matches!(
            c.load_templates(&bad_counters.bytes()),
            Err(ClassifyError::InvalidParameter(_))
        ),
        "counters disagree with classes",
    );

    let consistent = RawTemplates {
        num_perm_classes: 0,
        num_nonempty_classes: 0,
        ..bad_counters
    };
    rp.check(c.load_templates(&consistent.bytes()).is_ok(), "empty store loads");

    let outcome = c.adapt_to_char(&glyphs::bar(), l, 0, 0.125);
    rp.check(
        matches!(outcome, Ok(AdaptOutcome::Bootstrapped { .. })),
        "learning continues after rejected loads",
    );

    assert!(rp.cleanup(), "persist test 2 (inconsistent store) failed");
}
