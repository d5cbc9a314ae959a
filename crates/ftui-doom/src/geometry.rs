//! Fixed-point 2D geometry for BSP, collision and sight.
//!
//! Side tests widen to `i128`: a coordinate difference already needs 33
//! bits, so the cross product of two of them overflows `i64`.

use crate::fixed::Fixed;

/// Side index of a partition or line.
pub const FRONT: usize = 0;
pub const BACK: usize = 1;

/// 2D cross product of `(ax, ay)` and `(bx, by)` in 32.32.
#[inline]
pub fn cross(ax: Fixed, ay: Fixed, bx: Fixed, by: Fixed) -> i64 {
    i64::from(ax) * i64::from(by) - i64::from(ay) * i64::from(bx)
}

/// 2D dot product in 32.32.
#[inline]
pub fn dot(ax: Fixed, ay: Fixed, bx: Fixed, by: Fixed) -> i64 {
    i64::from(ax) * i64::from(bx) + i64::from(ay) * i64::from(by)
}

/// Which side of the directed line through `(lx, ly)` along `(ldx, ldy)` the
/// point lies on. The right-hand side is [`FRONT`]; points on the line count
/// as [`BACK`].
#[inline]
pub fn point_on_side(x: Fixed, y: Fixed, lx: Fixed, ly: Fixed, ldx: Fixed, ldy: Fixed) -> usize {
    let dx = i128::from(x) - i128::from(lx);
    let dy = i128::from(y) - i128::from(ly);
    let c = dx * i128::from(ldy) - dy * i128::from(ldx);
    if c > 0 { FRONT } else { BACK }
}

/// Signed area test against segment `(x1, y1) -> (x2, y2)`: positive on the
/// right, negative on the left, zero when collinear.
#[inline]
pub fn side_value(x: Fixed, y: Fixed, x1: Fixed, y1: Fixed, x2: Fixed, y2: Fixed) -> i64 {
    let dx = i64::from(x) - i64::from(x1);
    let dy = i64::from(y) - i64::from(y1);
    let ldx = i64::from(x2) - i64::from(x1);
    let ldy = i64::from(y2) - i64::from(y1);
    // 33-bit operands; i128 keeps the product exact.
    let c = i128::from(dx) * i128::from(ldy) - i128::from(dy) * i128::from(ldx);
    c.signum() as i64
}

/// Whether segments `a` and `b` share at least one point.
#[allow(clippy::too_many_arguments)]
pub fn segments_intersect(
    ax1: Fixed,
    ay1: Fixed,
    ax2: Fixed,
    ay2: Fixed,
    bx1: Fixed,
    by1: Fixed,
    bx2: Fixed,
    by2: Fixed,
) -> bool {
    let d1 = side_value(ax1, ay1, bx1, by1, bx2, by2);
    let d2 = side_value(ax2, ay2, bx1, by1, bx2, by2);
    let d3 = side_value(bx1, by1, ax1, ay1, ax2, ay2);
    let d4 = side_value(bx2, by2, ax1, ay1, ax2, ay2);

    if d1 == 0 && d2 == 0 {
        // Collinear: overlap of the projections.
        let a = BoundingBox::from_segment(ax1, ay1, ax2, ay2);
        let b = BoundingBox::from_segment(bx1, by1, bx2, by2);
        return a.intersects(&b);
    }
    d1 * d2 <= 0 && d3 * d4 <= 0
}

/// Exact Euclidean distance between two points.
#[inline]
pub fn point_distance(x1: Fixed, y1: Fixed, x2: Fixed, y2: Fixed) -> Fixed {
    let dx = (i64::from(x2) - i64::from(x1)).unsigned_abs();
    let dy = (i64::from(y2) - i64::from(y1)).unsigned_abs();
    // dx, dy < 2^32 so each square fits in 64 bits; the sum may not.
    let sum = u128::from(dx * dx) + u128::from(dy * dy);
    sum.isqrt().min(i32::MAX as u128) as Fixed
}

/// Axis-aligned box in map space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub top: Fixed,
    pub bottom: Fixed,
    pub left: Fixed,
    pub right: Fixed,
}

impl BoundingBox {
    /// Empty box that any added point replaces.
    pub const EMPTY: Self = Self {
        top: Fixed::MIN,
        bottom: Fixed::MAX,
        left: Fixed::MAX,
        right: Fixed::MIN,
    };

    /// Square box of half-width `radius` around a point.
    #[inline]
    pub fn around(x: Fixed, y: Fixed, radius: Fixed) -> Self {
        Self {
            top: y.saturating_add(radius),
            bottom: y.saturating_sub(radius),
            left: x.saturating_sub(radius),
            right: x.saturating_add(radius),
        }
    }

    pub fn from_segment(x1: Fixed, y1: Fixed, x2: Fixed, y2: Fixed) -> Self {
        Self {
            top: y1.max(y2),
            bottom: y1.min(y2),
            left: x1.min(x2),
            right: x1.max(x2),
        }
    }

    pub fn add_point(&mut self, x: Fixed, y: Fixed) {
        self.left = self.left.min(x);
        self.right = self.right.max(x);
        self.bottom = self.bottom.min(y);
        self.top = self.top.max(y);
    }

    /// Closed-interval overlap.
    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        self.left <= other.right
            && other.left <= self.right
            && self.bottom <= other.top
            && other.bottom <= self.top
    }

    #[inline]
    pub fn contains(&self, x: Fixed, y: Fixed) -> bool {
        (self.left..=self.right).contains(&x) && (self.bottom..=self.top).contains(&y)
    }
}

/// Which side of segment `(x1, y1) -> (x2, y2)` a box lies on, or `None` when
/// the line's extension passes through the box.
pub fn box_on_line_side(
    bbox: &BoundingBox,
    x1: Fixed,
    y1: Fixed,
    x2: Fixed,
    y2: Fixed,
) -> Option<usize> {
    let dx = x2.wrapping_sub(x1);
    let dy = y2.wrapping_sub(y1);
    let corners = [
        (bbox.left, bbox.top),
        (bbox.right, bbox.top),
        (bbox.right, bbox.bottom),
        (bbox.left, bbox.bottom),
    ];
    let first = point_on_side(corners[0].0, corners[0].1, x1, y1, dx, dy);
    corners[1..]
        .iter()
        .all(|&(cx, cy)| point_on_side(cx, cy, x1, y1, dx, dy) == first)
        .then_some(first)
}

/// Whether a segment passes through a box: it must touch the box's extent
/// and its carrier line must split the box.
pub fn segment_crosses_box(bbox: &BoundingBox, x1: Fixed, y1: Fixed, x2: Fixed, y2: Fixed) -> bool {
    bbox.intersects(&BoundingBox::from_segment(x1, y1, x2, y2))
        && box_on_line_side(bbox, x1, y1, x2, y2).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::FRACUNIT;

    const U: Fixed = FRACUNIT;

    #[test]
    fn right_of_upward_line_is_front() {
        // Line along +y: +x is the right-hand side.
        assert_eq!(point_on_side(5 * U, 0, 0, 0, 0, U), FRONT);
        assert_eq!(point_on_side(-5 * U, 0, 0, 0, 0, U), BACK);
    }

    #[test]
    fn on_line_counts_as_back() {
        assert_eq!(point_on_side(0, 100 * U, 0, 0, 0, U), BACK);
    }

    #[test]
    fn side_of_offset_partition() {
        assert_eq!(point_on_side(15 * U, 0, 10 * U, 10 * U, 0, U), FRONT);
        assert_eq!(point_on_side(5 * U, 0, 10 * U, 10 * U, 0, U), BACK);
        // Horizontal partition along +x: below is the right-hand side.
        assert_eq!(point_on_side(0, -5 * U, 0, 0, U, 0), FRONT);
    }

    #[test]
    fn side_test_survives_extreme_coordinates() {
        assert_eq!(
            point_on_side(Fixed::MAX, 0, Fixed::MIN, 0, 0, Fixed::MAX),
            FRONT
        );
    }

    #[test]
    fn crossing_segments_intersect() {
        assert!(segments_intersect(0, 0, 10 * U, 10 * U, 0, 10 * U, 10 * U, 0));
    }

    #[test]
    fn parallel_segments_do_not_intersect() {
        assert!(!segments_intersect(0, 0, 10 * U, 0, 0, U, 10 * U, U));
    }

    #[test]
    fn touching_endpoint_counts() {
        assert!(segments_intersect(0, 0, U, 0, U, 0, U, U));
    }

    #[test]
    fn segments_short_of_each_other_miss() {
        assert!(!segments_intersect(0, 0, U, 0, 2 * U, -U, 2 * U, U));
    }

    #[test]
    fn collinear_needs_overlap() {
        assert!(segments_intersect(0, 0, 4 * U, 0, 2 * U, 0, 6 * U, 0));
        assert!(!segments_intersect(0, 0, U, 0, 2 * U, 0, 3 * U, 0));
    }

    #[test]
    fn euclidean_distance() {
        assert_eq!(point_distance(0, 0, 3 * U, 4 * U), 5 * U);
        assert_eq!(point_distance(-3 * U, -4 * U, 0, 0), 5 * U);
        assert_eq!(point_distance(U, U, U, U), 0);
    }

    #[test]
    fn box_side_classification() {
        let bbox = BoundingBox::around(10 * U, 0, 2 * U);
        // Upward line at x = 0: the box is to the right.
        assert_eq!(box_on_line_side(&bbox, 0, -U, 0, U), Some(FRONT));
        assert_eq!(box_on_line_side(&bbox, 0, U, 0, -U), Some(BACK));
        assert_eq!(box_on_line_side(&bbox, 10 * U, -U, 10 * U, U), None);
    }

    #[test]
    fn segment_crosses_box_needs_extent_overlap() {
        let bbox = BoundingBox::around(0, 0, 16 * U);
        assert!(segment_crosses_box(&bbox, -64 * U, 0, 64 * U, 0));
        // Same carrier line, but the segment stops short of the box.
        assert!(!segment_crosses_box(&bbox, 32 * U, 0, 64 * U, 0));
        assert!(!segment_crosses_box(&bbox, -64 * U, 20 * U, 64 * U, 20 * U));
    }

    #[test]
    fn bounding_box_grows() {
        let mut bbox = BoundingBox::EMPTY;
        bbox.add_point(U, -U);
        bbox.add_point(-2 * U, 3 * U);
        assert_eq!(
            bbox,
            BoundingBox {
                top: 3 * U,
                bottom: -U,
                left: -2 * U,
                right: U
            }
        );
        assert!(bbox.contains(0, 0));
        assert!(!bbox.contains(2 * U, 0));
    }
}
