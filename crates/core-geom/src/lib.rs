//! Integer axis-aligned rectangle primitive shared by every layer of the
//! fill engine. All coordinates are `i64`; there is no floating-point
//! geometry anywhere in this crate.

/// An axis-aligned rectangle with lower-left corner `(x1, y1)` and
/// upper-right corner `(x2, y2)`. Degenerate rectangles (`x1 >= x2` or
/// `y1 >= y2`) are representable but [`Rectangle::is_legal`] reports them
/// as illegal; callers that mutate a rectangle are responsible for
/// checking legality afterward rather than relying on an invariant that
/// always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Rectangle {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
}

impl Rectangle {
    pub const fn new(x1: i64, y1: i64, x2: i64, y2: i64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub const fn width(&self) -> i64 {
        self.x2 - self.x1
    }

    pub const fn height(&self) -> i64 {
        self.y2 - self.y1
    }

    pub const fn area(&self) -> i64 {
        self.width() * self.height()
    }

    /// Width over height, or `f64::INFINITY` for a zero-height rectangle.
    pub fn aspect_ratio(&self) -> f64 {
        let height = self.height();
        if height == 0 {
            f64::INFINITY
        } else {
            self.width() as f64 / height as f64
        }
    }

    pub const fn is_legal(&self) -> bool {
        self.width() > 0 && self.height() > 0
    }

    pub fn shift(&mut self, dx: i64, dy: i64) -> &mut Self {
        self.x1 += dx;
        self.y1 += dy;
        self.x2 += dx;
        self.y2 += dy;
        self
    }

    pub fn scale(&mut self, factor: i64) -> &mut Self {
        self.x1 *= factor;
        self.y1 *= factor;
        self.x2 *= factor;
        self.y2 *= factor;
        self
    }

    /// Grows the rectangle by `lower_left` on the lower-left corner and
    /// `upper_right` on the upper-right corner. Negative amounts shrink
    /// (inset) the rectangle.
    pub fn expand(&mut self, lower_left: i64, upper_right: i64) -> &mut Self {
        self.x1 -= lower_left;
        self.y1 -= lower_left;
        self.x2 += upper_right;
        self.y2 += upper_right;
        self
    }

    /// Grows the rectangle independently on each of its four sides.
    pub fn expand_sides(&mut self, left: i64, bottom: i64, right: i64, top: i64) -> &mut Self {
        self.x1 -= left;
        self.y1 -= bottom;
        self.x2 += right;
        self.y2 += top;
        self
    }

    /// Swaps x and y coordinates. Used to normalize vertical-direction
    /// layers onto the horizontal sweep so a single sweep implementation
    /// suffices for both directions. Applying this twice is the identity.
    pub fn transform(&mut self) -> &mut Self {
        std::mem::swap(&mut self.x1, &mut self.y1);
        std::mem::swap(&mut self.x2, &mut self.y2);
        self
    }

    /// Returns a transformed copy, leaving `self` untouched.
    pub fn transformed(&self) -> Self {
        let mut copy = *self;
        copy.transform();
        copy
    }
}

pub fn is_intersect(a: &Rectangle, b: &Rectangle) -> bool {
    !(a.x2 <= b.x1 || b.x2 <= a.x1 || a.y2 <= b.y1 || b.y2 <= a.y1)
}

/// The intersection of two rectangles, or a degenerate (illegal)
/// rectangle if they don't intersect.
pub fn intersect_region(a: &Rectangle, b: &Rectangle) -> Rectangle {
    if !is_intersect(a, b) {
        return Rectangle::default();
    }
    Rectangle::new(
        a.x1.max(b.x1),
        a.y1.max(b.y1),
        a.x2.min(b.x2),
        a.y2.min(b.y2),
    )
}

/// Chebyshev-like gap between two rectangles: the sum of the X and Y
/// separations (each clamped to zero when they already overlap on that
/// axis). Zero when the rectangles intersect or touch.
pub fn distance(a: &Rectangle, b: &Rectangle) -> i64 {
    let len_x = (a.x1.max(b.x1) - a.x2.min(b.x2)).max(0);
    let len_y = (a.y1.max(b.y1) - a.y2.min(b.y2)).max(0);
    len_x + len_y
}

/// The length over which two rectangles' projections overlap on one axis
/// while separated on the other; zero if neither axis is a clean
/// separation (e.g. the rectangles overlap on both axes, or on neither).
pub fn parallel_length(a: &Rectangle, b: &Rectangle) -> i64 {
    let len_x = a.x2.min(b.x2) - a.x1.max(b.x1);
    let len_y = a.y2.min(b.y2) - a.y1.max(b.y1);
    if len_x > 0 && len_y <= 0 {
        len_x
    } else if len_x <= 0 && len_y > 0 {
        len_y
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn area_and_legality() {
        let r = Rectangle::new(0, 0, 10, 5);
        assert_eq!(r.width(), 10);
        assert_eq!(r.height(), 5);
        assert_eq!(r.area(), 50);
        assert!(r.is_legal());

        let degenerate = Rectangle::new(5, 5, 5, 5);
        assert!(!degenerate.is_legal());
    }

    #[test]
    fn aspect_ratio_infinite_on_zero_height() {
        let r = Rectangle::new(0, 0, 10, 0);
        assert!(r.aspect_ratio().is_infinite());
    }

    #[test]
    fn expand_grows_lower_left_and_upper_right() {
        let mut r = Rectangle::new(10, 10, 20, 20);
        r.expand(2, 3);
        assert_eq!(r, Rectangle::new(8, 8, 23, 23));
    }

    #[test]
    fn expand_can_inset_with_negative_amounts() {
        let mut r = Rectangle::new(0, 0, 10, 10);
        r.expand(-2, -2);
        assert_eq!(r, Rectangle::new(2, 2, 8, 8));
    }

    #[test]
    fn intersect_of_disjoint_rectangles_is_illegal() {
        let a = Rectangle::new(0, 0, 10, 10);
        let b = Rectangle::new(20, 20, 30, 30);
        assert!(!is_intersect(&a, &b));
        assert!(!intersect_region(&a, &b).is_legal());
    }

    #[test]
    fn inclusion_exclusion_pair_area() {
        // Scenario 2: two same-net conductors overlapping by a 5x5 square.
        let a = Rectangle::new(0, 0, 10, 10);
        let b = Rectangle::new(5, 5, 15, 15);
        let overlap = intersect_region(&a, &b);
        assert_eq!(a.area() + b.area() - overlap.area(), 175);
    }

    #[test]
    fn distance_is_zero_when_touching() {
        let a = Rectangle::new(0, 0, 10, 10);
        let b = Rectangle::new(10, 0, 20, 10);
        assert_eq!(distance(&a, &b), 0);
    }

    #[test]
    fn parallel_length_picks_the_separated_axis() {
        let a = Rectangle::new(0, 0, 10, 10);
        let b = Rectangle::new(20, 2, 30, 8);
        // separated on X, overlapping on Y by 6
        assert_eq!(parallel_length(&a, &b), 6);
    }

    proptest! {
        #[test]
        fn transform_is_idempotent(x1 in -1000i64..1000, y1 in -1000i64..1000, x2 in -1000i64..1000, y2 in -1000i64..1000) {
            let original = Rectangle::new(x1, y1, x2, y2);
            let mut twice = original;
            twice.transform();
            twice.transform();
            prop_assert_eq!(twice, original);
        }

        #[test]
        fn shift_preserves_dimensions(x1 in -1000i64..1000, y1 in -1000i64..1000, w in 0i64..500, h in 0i64..500, dx in -200i64..200, dy in -200i64..200) {
            let mut r = Rectangle::new(x1, y1, x1 + w, y1 + h);
            let (orig_w, orig_h) = (r.width(), r.height());
            r.shift(dx, dy);
            prop_assert_eq!(r.width(), orig_w);
            prop_assert_eq!(r.height(), orig_h);
        }
    }
}
