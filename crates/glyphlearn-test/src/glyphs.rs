//! Synthetic glyph fixtures
//!
//! Blobs are built in baseline-normalized coordinates: the baseline is at
//! y = 64 and the x-height spans 128 units above it. Every shape is a
//! closed polygon listed counter-clockwise, holes clockwise.

use glyphlearn_core::{BLN_BASELINE_OFFSET, BLN_X_HEIGHT, Blob, Point};

use crate::error::{TestError, TestResult};

/// Axis-aligned rectangle outline
pub fn rect_outline(left: i32, bottom: i32, width: i32, height: i32) -> Vec<Point> {
    vec![
        Point::new(left, bottom),
        Point::new(left + width, bottom),
        Point::new(left + width, bottom + height),
        Point::new(left, bottom + height),
    ]
}

/// A solid rectangle standing on the baseline
pub fn rect(width: i32, height: i32) -> Blob {
    Blob::from_outline(rect_outline(0, BLN_BASELINE_OFFSET, width, height))
}

/// A tall vertical stroke, shaped like `l`
pub fn bar() -> Blob {
    rect(20, BLN_X_HEIGHT + 56)
}

/// A short horizontal stroke at mid x-height, shaped like `-`
pub fn dash() -> Blob {
    Blob::from_outline(rect_outline(0, BLN_BASELINE_OFFSET + 56, 64, 16))
}

/// A small square on the baseline, shaped like `.`
pub fn dot() -> Blob {
    Blob::from_outline(rect_outline(0, BLN_BASELINE_OFFSET, 16, 16))
}

/// An L shape: vertical stem with a foot to the right
pub fn el() -> Blob {
    let (b, h) = (BLN_BASELINE_OFFSET, BLN_X_HEIGHT);
    Blob::from_outline(vec![
        Point::new(0, b),
        Point::new(80, b),
        Point::new(80, b + 20),
        Point::new(20, b + 20),
        Point::new(20, b + h),
        Point::new(0, b + h),
    ])
}

/// A square ring with a hole, shaped like `o`
pub fn ring() -> Blob {
    let b = BLN_BASELINE_OFFSET;
    let mut hole = rect_outline(20, b + 20, 56, 88);
    hole.reverse();
    Blob::new(vec![rect_outline(0, b, 96, BLN_X_HEIGHT), hole])
}

/// A blob from an arbitrary closed polygon
///
/// # Errors
///
/// Returns [`TestError::InvalidFixture`] if fewer than three points are
/// given.
pub fn polygon(name: &str, points: &[(i32, i32)]) -> TestResult<Blob> {
    if points.len() < 3 {
        return Err(TestError::InvalidFixture {
            name: name.to_string(),
            message: format!("polygon needs 3 points, got {}", points.len()),
        });
    }
    Ok(Blob::from_outline(
        points.iter().map(|&(x, y)| Point::new(x, y)).collect(),
    ))
}

/// Lays glyphs out left to right with `gap` units between them
pub fn word(glyphs: &[Blob], gap: i32) -> Vec<Blob> {
    let mut x = 0;
    glyphs
        .iter()
        .map(|g| {
            let bbox = g.bounding_box();
            let placed = g.translated(x - bbox.left, 0);
            x += bbox.width() + gap;
            placed
        })
        .collect()
}

/// Splits a blob vertically at `x` into two rectangular pieces
///
/// Only meaningful for the solid rectangles built here; used to fake
/// over-segmented characters.
pub fn split_rect(blob: &Blob, x: i32) -> TestResult<(Blob, Blob)> {
    let bbox = blob.bounding_box();
    if x <= bbox.left || x >= bbox.right {
        return Err(TestError::InvalidFixture {
            name: "split_rect".to_string(),
            message: format!("split {} outside ({}, {})", x, bbox.left, bbox.right),
        });
    }
    let left = Blob::from_outline(rect_outline(bbox.left, bbox.bottom, x - bbox.left, bbox.height()));
    let right = Blob::from_outline(rect_outline(x, bbox.bottom, bbox.right - x, bbox.height()));
    Ok((left, right))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shapes_sit_on_baseline() {
        for blob in [bar(), dash(), dot(), el(), ring()] {
            assert!(!blob.is_empty());
            assert!(blob.bounding_box().bottom >= BLN_BASELINE_OFFSET);
        }
        assert_eq!(ring().outlines().len(), 2);
    }

    #[test]
    fn test_polygon_validates() {
        assert!(polygon("tri", &[(0, 64), (10, 64), (5, 80)]).is_ok());
        assert!(polygon("line", &[(0, 64), (10, 64)]).is_err());
    }

    #[test]
    fn test_word_layout() {
        let blobs = word(&[bar(), el()], 10);
        assert_eq!(blobs[0].bounding_box().left, 0);
        assert_eq!(blobs[1].bounding_box().left, 30);
    }

    #[test]
    fn test_split_rect() {
        let (l, r) = split_rect(&rect(40, 100), 15).unwrap();
        assert_eq!(l.bounding_box().right, 15);
        assert_eq!(r.bounding_box().left, 15);
        assert!(split_rect(&rect(40, 100), 40).is_err());
    }
}
