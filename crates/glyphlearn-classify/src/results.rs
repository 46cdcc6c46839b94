//! Per-blob candidate collection
//!
//! A [`ResultSet`] holds at most one [`Candidate`] per class and tracks the
//! best whole-character candidate seen so far. Filters in
//! [`crate::filters`] turn it into the final [`BlobChoice`] list.

use std::fmt;

use glyphlearn_core::{ClassId, ClassTable, ConfigId, FontId, ShapeId};

use crate::matcher::WORST_RATING;

/// One classification hypothesis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub class_id: ClassId,
    /// Shape the candidate was expanded from, if a shape table was used
    pub shape_id: Option<ShapeId>,
    /// 0 is perfect, [`WORST_RATING`] the worst
    pub rating: f32,
    /// True if the candidate came from the adapted templates
    pub adapted: bool,
    pub config: Option<ConfigId>,
    pub font_id: Option<FontId>,
    pub font_id2: Option<FontId>,
}

impl Candidate {
    /// Creates a candidate with no shape, config or font information
    pub fn new(class_id: ClassId, rating: f32) -> Self {
        Self {
            class_id,
            shape_id: None,
            rating,
            adapted: false,
            config: None,
            font_id: None,
            font_id2: None,
        }
    }

    pub fn with_shape(mut self, shape_id: ShapeId) -> Self {
        self.shape_id = Some(shape_id);
        self
    }

    pub fn with_adapted(mut self, adapted: bool) -> Self {
        self.adapted = adapted;
        self
    }

    pub fn with_config(mut self, config: ConfigId) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_fonts(mut self, font_id: Option<FontId>, font_id2: Option<FontId>) -> Self {
        self.font_id = font_id;
        self.font_id2 = font_id2;
        self
    }
}

/// Candidates for one blob, unique by class
#[derive(Debug, Clone)]
pub struct ResultSet {
    pub(crate) matches: Vec<Candidate>,
    capacity: usize,
    best: Option<Candidate>,
    /// Outline length of the blob; `u32::MAX` until features are extracted
    pub blob_length: u32,
    has_nonfragment: bool,
}

impl ResultSet {
    /// Creates an empty set holding at most `capacity` classes
    pub fn new(capacity: usize) -> Self {
        Self {
            matches: Vec::new(),
            capacity,
            best: None,
            blob_length: u32::MAX,
            has_nonfragment: false,
        }
    }

    /// Offers a candidate
    ///
    /// The candidate is ignored when it is worse than the current best by
    /// more than `pad`, or when the class already holds a rating at least
    /// as good. Otherwise it replaces the class's slot (or takes a new
    /// one). Fragments never become the best candidate. Returns true if
    /// the set changed.
    pub fn add(&mut self, candidate: Candidate, is_fragment: bool, pad: f32) -> bool {
        if candidate.rating > self.best_rating() + pad {
            return false;
        }
        let slot = self
            .matches
            .iter()
            .position(|m| m.class_id == candidate.class_id);
        if slot.is_some_and(|i| candidate.rating >= self.matches[i].rating) {
            return false;
        }
        if slot.is_none() && self.matches.len() >= self.capacity {
            tracing::warn!(
                class_id = %candidate.class_id,
                capacity = self.capacity,
                "result set is full, candidate dropped"
            );
            return false;
        }

        if !is_fragment {
            self.has_nonfragment = true;
        }
        match slot {
            Some(i) => self.matches[i] = candidate,
            None => self.matches.push(candidate),
        }
        if !is_fragment && candidate.rating < self.best_rating() {
            self.best = Some(candidate);
        }
        true
    }

    /// Rating of the best whole-character candidate, or [`WORST_RATING`]
    pub fn best_rating(&self) -> f32 {
        self.best.map_or(WORST_RATING, |b| b.rating)
    }

    /// Best whole-character candidate
    pub fn best(&self) -> Option<&Candidate> {
        self.best.as_ref()
    }

    /// Returns true once a non-fragment candidate has been added
    pub fn has_nonfragment(&self) -> bool {
        self.has_nonfragment
    }

    pub fn find(&self, class_id: ClassId) -> Option<&Candidate> {
        self.matches.iter().find(|m| m.class_id == class_id)
    }

    /// Rating of a class, [`WORST_RATING`] if absent
    pub fn scored(&self, class_id: ClassId) -> f32 {
        self.find(class_id).map_or(WORST_RATING, |m| m.rating)
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.matches.iter()
    }

    pub fn as_slice(&self) -> &[Candidate] {
        &self.matches
    }

    /// Formats the set with class text taken from `classes`
    pub fn display<'a>(&'a self, classes: &'a ClassTable) -> ResultSetDisplay<'a> {
        ResultSetDisplay {
            results: self,
            classes,
        }
    }
}

/// Helper returned by [`ResultSet::display`]
pub struct ResultSetDisplay<'a> {
    results: &'a ResultSet,
    classes: &'a ClassTable,
}

impl fmt::Display for ResultSetDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for m in self.results.iter() {
            write!(f, "{}", self.classes.text(m.class_id))?;
            if let Some(shape) = m.shape_id {
                write!(f, "({})", shape)?;
            }
            writeln!(f, " {:.2}%", m.rating * 100.0)?;
        }
        Ok(())
    }
}

/// One entry of the final classification output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlobChoice {
    pub class_id: ClassId,
    /// Scaled rating, lower is better
    pub rating: f32,
    /// Log-like confidence, higher is better (at most 0)
    pub certainty: f32,
    pub font_id: Option<FontId>,
    pub font_id2: Option<FontId>,
    pub adapted: bool,
}

impl BlobChoice {
    /// Rating reported for candidates of a zero-length blob
    pub const INVALID_BLOB_RATING: f32 = 100.0;
    /// Certainty reported for candidates of a zero-length blob
    pub const INVALID_BLOB_CERTAINTY: f32 = -20.0;
    /// Rating reported when nothing was classified
    pub const UNCLASSIFIED_RATING: f32 = 50.0;

    /// Choice emitted when classification produced nothing
    pub fn unclassified() -> Self {
        Self {
            class_id: ClassId::NONE,
            rating: Self::UNCLASSIFIED_RATING,
            certainty: Self::INVALID_BLOB_CERTAINTY,
            font_id: None,
            font_id2: None,
            adapted: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_keeps_one_slot_per_class() {
        let mut r = ResultSet::new(8);
        assert!(r.add(Candidate::new(ClassId(3), 0.4), false, 0.15));
        assert!(!r.add(Candidate::new(ClassId(3), 0.45), false, 0.15));
        assert_eq!(r.scored(ClassId(3)), 0.4);
        assert!(r.add(Candidate::new(ClassId(3), 0.2).with_config(2), false, 0.15));
        assert_eq!(r.len(), 1);
        assert_eq!(r.find(ClassId(3)).unwrap().config, Some(2));
        assert_eq!(r.best_rating(), 0.2);
    }

    #[test]
    fn test_pad_rejects_far_candidates() {
        let mut r = ResultSet::new(8);
        r.add(Candidate::new(ClassId(1), 0.1), false, 0.15);
        assert!(!r.add(Candidate::new(ClassId(2), 0.3), false, 0.15));
        assert!(r.add(Candidate::new(ClassId(2), 0.24), false, 0.15));
        assert_eq!(r.scored(ClassId(9)), WORST_RATING);
    }

    #[test]
    fn test_fragment_never_best() {
        let mut r = ResultSet::new(8);
        r.add(Candidate::new(ClassId(5), 0.05), true, 0.15);
        assert!(r.best().is_none());
        assert!(!r.has_nonfragment());
        r.add(Candidate::new(ClassId(1), 0.1), false, 0.15);
        assert_eq!(r.best().unwrap().class_id, ClassId(1));
        assert!(r.has_nonfragment());
    }

    #[test]
    fn test_capacity() {
        let mut r = ResultSet::new(2);
        r.add(Candidate::new(ClassId(1), 0.1), false, 0.5);
        r.add(Candidate::new(ClassId(2), 0.1), false, 0.5);
        assert!(!r.add(Candidate::new(ClassId(3), 0.05), false, 0.5));
        assert_eq!(r.len(), 2);
        // existing classes can still improve
        assert!(r.add(Candidate::new(ClassId(2), 0.05), false, 0.5));
    }

    #[test]
    fn test_display() {
        let mut classes = ClassTable::new();
        let a = classes.add("a").unwrap();
        let mut r = ResultSet::new(4);
        r.add(Candidate::new(a, 0.25).with_shape(7), false, 0.5);
        assert_eq!(r.display(&classes).to_string(), "a(7) 25.00%\n");
    }
}
