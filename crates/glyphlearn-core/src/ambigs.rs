//! Static ambiguity table
//!
//! Lists, per class, the classes it is known to be confused with. The
//! reverse direction answers "which classes list me as a look-alike",
//! which is what promotion cascades walk.

use std::collections::HashMap;

use crate::ids::ClassId;

/// Confusable-class relation used to gate and cascade promotion
#[derive(Debug, Clone, Default)]
pub struct AmbigTable {
    forward: HashMap<ClassId, Vec<ClassId>>,
    reverse: HashMap<ClassId, Vec<ClassId>>,
}

impl AmbigTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `class_id` may be misread as `confusable`
    pub fn add(&mut self, class_id: ClassId, confusable: ClassId) {
        if class_id == confusable {
            return;
        }
        let fwd = self.forward.entry(class_id).or_default();
        if fwd.contains(&confusable) {
            return;
        }
        fwd.push(confusable);
        self.reverse.entry(confusable).or_default().push(class_id);
    }

    /// Records a symmetric confusion
    pub fn add_pair(&mut self, a: ClassId, b: ClassId) {
        self.add(a, b);
        self.add(b, a);
    }

    /// Classes that `class_id` is confusable with
    pub fn ambigs_for_adaption(&self, class_id: ClassId) -> &[ClassId] {
        self.forward.get(&class_id).map_or(&[], Vec::as_slice)
    }

    /// Classes that list `class_id` as confusable
    pub fn reverse_ambigs_for_adaption(&self, class_id: ClassId) -> &[ClassId] {
        self.reverse.get(&class_id).map_or(&[], Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}
