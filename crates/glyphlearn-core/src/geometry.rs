//! Blob geometry
//!
//! A [`Blob`] is a segmented glyph described by closed polygonal outlines in
//! baseline-normalized coordinates: the baseline sits at
//! [`BLN_BASELINE_OFFSET`] and the x-height spans [`BLN_X_HEIGHT`] units.
//! The y axis points up, so `top > bottom` for a non-empty box.

use crate::error::{Error, Result};

/// Y coordinate of the baseline in normalized space
pub const BLN_BASELINE_OFFSET: i32 = 64;

/// Height of the x-height band in normalized space
pub const BLN_X_HEIGHT: i32 = 128;

/// A point in normalized blob space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned bounding box with an upward y axis
///
/// Unlike an image rectangle this stores both edges inclusively, which
/// keeps single-point boxes meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlobBox {
    pub left: i32,
    pub bottom: i32,
    pub right: i32,
    pub top: i32,
}

impl BlobBox {
    /// Create a new box
    ///
    /// # Errors
    ///
    /// Returns an error if `right < left` or `top < bottom`.
    pub fn new(left: i32, bottom: i32, right: i32, top: i32) -> Result<Self> {
        if right < left || top < bottom {
            return Err(Error::InvalidParameter(format!(
                "box edges out of order: left={}, bottom={}, right={}, top={}",
                left, bottom, right, top
            )));
        }
        Ok(Self {
            left,
            bottom,
            right,
            top,
        })
    }

    /// Create a box without validation
    pub const fn new_unchecked(left: i32, bottom: i32, right: i32, top: i32) -> Self {
        Self {
            left,
            bottom,
            right,
            top,
        }
    }

    /// Smallest box holding every point, or `None` for no points
    pub fn from_points<'a, I: IntoIterator<Item = &'a Point>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut b = Self::new_unchecked(first.x, first.y, first.x, first.y);
        for p in iter {
            b.left = b.left.min(p.x);
            b.right = b.right.max(p.x);
            b.bottom = b.bottom.min(p.y);
            b.top = b.top.max(p.y);
        }
        Some(b)
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.top - self.bottom
    }

    /// Get the center x coordinate
    #[inline]
    pub fn center_x(&self) -> i32 {
        self.left + self.width() / 2
    }

    /// Smallest box containing both boxes
    pub fn union(&self, other: &BlobBox) -> BlobBox {
        BlobBox {
            left: self.left.min(other.left),
            bottom: self.bottom.min(other.bottom),
            right: self.right.max(other.right),
            top: self.top.max(other.top),
        }
    }
}

/// A segmented glyph: one or more closed outlines
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Blob {
    outlines: Vec<Vec<Point>>,
}

impl Blob {
    /// Creates a blob from closed outlines. Empty outlines are dropped.
    pub fn new(outlines: Vec<Vec<Point>>) -> Self {
        Self {
            outlines: outlines.into_iter().filter(|o| !o.is_empty()).collect(),
        }
    }

    /// Creates a blob from a single closed outline
    pub fn from_outline(outline: Vec<Point>) -> Self {
        Self::new(vec![outline])
    }

    /// The closed outlines of the blob
    pub fn outlines(&self) -> &[Vec<Point>] {
        &self.outlines
    }

    /// Returns true if the blob has no outline points
    pub fn is_empty(&self) -> bool {
        self.outlines.is_empty()
    }

    /// Bounding box of all outlines; an empty blob yields a zero box
    pub fn bounding_box(&self) -> BlobBox {
        BlobBox::from_points(self.outlines.iter().flatten()).unwrap_or_default()
    }

    /// Joins several pieces into one blob, keeping every outline
    pub fn join(pieces: &[Blob]) -> Blob {
        Blob {
            outlines: pieces
                .iter()
                .flat_map(|b| b.outlines.iter().cloned())
                .collect(),
        }
    }

    /// Returns a copy shifted by (dx, dy)
    pub fn translated(&self, dx: i32, dy: i32) -> Blob {
        Blob {
            outlines: self
                .outlines
                .iter()
                .map(|o| o.iter().map(|p| Point::new(p.x + dx, p.y + dy)).collect())
                .collect(),
        }
    }
}
