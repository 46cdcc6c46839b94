//! Shape table
//!
//! A pre-trained template may stand for several (class, font) pairs that
//! are indistinguishable to the matcher. A [`Shape`] lists those pairs and
//! a [`ShapeTable`] indexes shapes by [`ShapeId`].

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ids::{ClassId, FontId, ShapeId};

/// One class and the fonts it was trained on within a shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnicharAndFonts {
    pub class_id: ClassId,
    pub font_ids: Vec<FontId>,
}

impl UnicharAndFonts {
    pub fn new(class_id: ClassId, font_ids: Vec<FontId>) -> Self {
        Self { class_id, font_ids }
    }
}

/// A set of mutually confusable (class, fonts) entries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    entries: Vec<UnicharAndFonts>,
}

impl Shape {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a font for a class, merging with an existing entry
    pub fn add(&mut self, class_id: ClassId, font_id: FontId) {
        match self.entries.iter_mut().find(|e| e.class_id == class_id) {
            Some(entry) => {
                if !entry.font_ids.contains(&font_id) {
                    entry.font_ids.push(font_id);
                }
            }
            None => self
                .entries
                .push(UnicharAndFonts::new(class_id, vec![font_id])),
        }
    }

    pub fn entries(&self) -> &[UnicharAndFonts] {
        &self.entries
    }

    /// Number of distinct classes in the shape
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Read-only index of shapes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeTable {
    shapes: Vec<Shape>,
}

impl ShapeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a shape and returns its id
    pub fn add_shape(&mut self, shape: Shape) -> ShapeId {
        self.shapes.push(shape);
        (self.shapes.len() - 1) as ShapeId
    }

    pub fn get_shape(&self, shape_id: ShapeId) -> Result<&Shape> {
        self.shapes
            .get(shape_id as usize)
            .ok_or(Error::IndexOutOfBounds {
                index: shape_id as usize,
                len: self.shapes.len(),
            })
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Largest number of classes in any one shape
    pub fn max_shape_size(&self) -> usize {
        self.shapes.iter().map(Shape::len).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_merges_fonts() {
        let mut shape = Shape::new();
        shape.add(ClassId(3), 0);
        shape.add(ClassId(3), 1);
        shape.add(ClassId(3), 1);
        shape.add(ClassId(4), 0);
        assert_eq!(shape.len(), 2);
        assert_eq!(shape.entries()[0].font_ids, vec![0, 1]);
        assert_eq!(shape.entries()[1].class_id, ClassId(4));
    }

    #[test]
    fn test_table_lookup() {
        let mut table = ShapeTable::new();
        let mut single = Shape::new();
        single.add(ClassId(1), 0);
        let a = table.add_shape(single);
        let mut pair = Shape::new();
        pair.add(ClassId(2), 0);
        pair.add(ClassId(5), 0);
        pair.add(ClassId(6), 2);
        let b = table.add_shape(pair);
        assert_eq!((a, b), (0, 1));
        assert_eq!(table.max_shape_size(), 3);
        assert_eq!(table.get_shape(b).unwrap().len(), 3);
        assert!(table.get_shape(7).is_err());
    }
}
