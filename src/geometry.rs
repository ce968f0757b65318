//! Box geometry and display/original scaling.
//!
//! Boxes live in *display space* (the possibly downscaled canvas). These
//! functions convert between display space and *original space* (full
//! resolution pixels), normalize boxes after interactive edits, and compute
//! live resize geometry for the four corner handles.

use serde::{Deserialize, Serialize};

/// A 2D point in display coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Width and height of the display canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Clamp a point into `[0, width] x [0, height]`.
    pub fn clamp_point(&self, point: Point) -> Point {
        Point::new(
            point.x.max(0.0).min(self.width),
            point.y.max(0.0).min(self.height),
        )
    }
}

/// An axis-aligned rectangle with top-left corner `(x, y)`.
///
/// Width and height may be negative while a resize gesture is in progress;
/// [`normalize_box`] restores a positive extent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle from two corner points in any order.
    pub fn from_corners(p1: Point, p2: Point) -> Self {
        let x = p1.x.min(p2.x);
        let y = p1.y.min(p2.y);
        let width = (p1.x - p2.x).abs();
        let height = (p1.y - p2.y).abs();
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Position of the given corner handle.
    pub fn corner(&self, handle: Handle) -> Point {
        match handle {
            Handle::TopLeft => Point::new(self.x, self.y),
            Handle::TopRight => Point::new(self.right(), self.y),
            Handle::BottomLeft => Point::new(self.x, self.bottom()),
            Handle::BottomRight => Point::new(self.right(), self.bottom()),
        }
    }

    /// Whether both extents reach `min_size`.
    pub fn meets_min_size(&self, min_size: f64) -> bool {
        self.width >= min_size && self.height >= min_size
    }

    /// Map every coordinate through `f` (used for display/original conversion).
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self::new(f(self.x), f(self.y), f(self.width), f(self.height))
    }
}

/// One of the four corner grips used to resize a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Handle {
    #[serde(rename = "tl")]
    TopLeft,
    #[serde(rename = "tr")]
    TopRight,
    #[serde(rename = "bl")]
    BottomLeft,
    #[serde(rename = "br")]
    BottomRight,
}

impl Handle {
    /// Hit-test order within a single box.
    pub const ALL: [Handle; 4] = [
        Handle::TopLeft,
        Handle::TopRight,
        Handle::BottomLeft,
        Handle::BottomRight,
    ];

    /// Short name (`tl`, `tr`, `bl`, `br`).
    pub fn name(&self) -> &'static str {
        match self {
            Handle::TopLeft => "tl",
            Handle::TopRight => "tr",
            Handle::BottomLeft => "bl",
            Handle::BottomRight => "br",
        }
    }
}

/// Returns the scale ratio, substituting `1` when it is non-positive or not finite.
#[inline]
pub fn safe_scale(scale_ratio: f64) -> f64 {
    if scale_ratio > 0.0 && scale_ratio.is_finite() {
        scale_ratio
    } else {
        1.0
    }
}

/// Convert an original-space coordinate or length to display space.
#[inline]
pub fn to_display(value: f64, scale_ratio: f64) -> f64 {
    value * scale_ratio
}

/// Convert a display-space coordinate or length to original space.
#[inline]
pub fn to_original(value: f64, scale_ratio: f64) -> f64 {
    value / safe_scale(scale_ratio)
}

/// Scale ratio that fits an image into the display cap without upscaling.
///
/// Falls back to `1` for zero-sized or otherwise degenerate input.
pub fn compute_scale_ratio(
    original_width: f64,
    original_height: f64,
    max_width: f64,
    max_height: f64,
) -> f64 {
    let mut ratio = 1.0;
    if original_width > max_width || original_height > max_height {
        ratio = (max_width / original_width).min(max_height / original_height);
    }
    safe_scale(ratio.min(1.0))
}

/// Normalize a box after an edit gesture.
///
/// Flips negative extents so `(x, y)` is the true top-left, enforces the
/// minimum size, clamps the origin to the canvas, shrinks the box to fit
/// inside `bounds` and enforces the minimum size a second time. A box that
/// the second floor pushes past the far edge slides back inside.
pub fn normalize_box(rect: Rect, bounds: Bounds, min_size: f64) -> Rect {
    let mut r = rect;

    if r.width < 0.0 {
        r.x += r.width;
        r.width = r.width.abs();
    }
    if r.height < 0.0 {
        r.y += r.height;
        r.height = r.height.abs();
    }

    r.width = r.width.max(min_size);
    r.height = r.height.max(min_size);

    r.x = r.x.max(0.0);
    r.y = r.y.max(0.0);

    if r.x + r.width > bounds.width {
        r.width = bounds.width - r.x;
    }
    if r.y + r.height > bounds.height {
        r.height = bounds.height - r.y;
    }

    // Boundary shrinking can undercut the floor again.
    r.width = r.width.max(min_size);
    r.height = r.height.max(min_size);

    // A floored box at the far edge slides back inside the canvas.
    if r.x + r.width > bounds.width {
        r.x = (bounds.width - r.width).max(0.0);
    }
    if r.y + r.height > bounds.height {
        r.y = (bounds.height - r.height).max(0.0);
    }

    r
}

/// Recompute a box while `handle` is dragged to `(px, py)`.
///
/// The opposite corner stays fixed. Extents may go negative; normalization
/// happens when the gesture completes.
pub fn compute_resized_box(original: Rect, handle: Handle, px: f64, py: f64) -> Rect {
    let Rect {
        x: ox,
        y: oy,
        width: ow,
        height: oh,
    } = original;

    match handle {
        Handle::TopLeft => Rect::new(px, py, ox + ow - px, oy + oh - py),
        Handle::TopRight => Rect::new(ox, py, px - ox, oy + oh - py),
        Handle::BottomLeft => Rect::new(px, oy, ox + ow - px, py - oy),
        Handle::BottomRight => Rect::new(ox, oy, px - ox, py - oy),
    }
}

/// Return the first handle of `rect` whose square hit region (side
/// `handle_size`, centered on the corner) contains `point`.
pub fn hit_handle(rect: &Rect, point: Point, handle_size: f64) -> Option<Handle> {
    let hs = handle_size / 2.0;
    Handle::ALL.into_iter().find(|&handle| {
        let c = rect.corner(handle);
        point.x >= c.x - hs && point.x <= c.x + hs && point.y >= c.y - hs && point.y <= c.y + hs
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_safe_scale_fallback() {
        assert_eq!(safe_scale(0.5), 0.5);
        assert_eq!(safe_scale(0.0), 1.0);
        assert_eq!(safe_scale(-2.0), 1.0);
        assert_eq!(safe_scale(f64::NAN), 1.0);
        assert_eq!(safe_scale(f64::INFINITY), 1.0);
        assert_eq!(to_original(100.0, 0.0), 100.0);
    }

    #[test]
    fn test_scale_ratio() {
        assert!(approx_eq(compute_scale_ratio(1280.0, 960.0, 640.0, 480.0), 0.5));
        assert_eq!(compute_scale_ratio(320.0, 240.0, 640.0, 480.0), 1.0);
        // Width is the binding constraint
        assert!(approx_eq(compute_scale_ratio(1280.0, 480.0, 640.0, 480.0), 0.5));
        assert_eq!(compute_scale_ratio(0.0, 0.0, 640.0, 480.0), 1.0);
    }

    #[test]
    fn test_display_original_round_trip() {
        let scale = compute_scale_ratio(1920.0, 1080.0, 640.0, 480.0);
        for v in [0.0, 1.0, 17.0, 333.0, 1919.0] {
            let back = to_original(to_display(v, scale), scale).round();
            assert!((back - v).abs() <= 1.0, "{} -> {}", v, back);
        }
    }

    #[test]
    fn test_rect_from_corners() {
        let r = Rect::from_corners(Point::new(50.0, 80.0), Point::new(10.0, 20.0));
        assert_eq!(r, Rect::new(10.0, 20.0, 40.0, 60.0));
    }

    #[test]
    fn test_normalize_flips_negative_extent() {
        let bounds = Bounds::new(640.0, 480.0);
        let r = normalize_box(Rect::new(100.0, 100.0, -40.0, -30.0), bounds, 5.0);
        assert_eq!(r, Rect::new(60.0, 70.0, 40.0, 30.0));
    }

    #[test]
    fn test_normalize_enforces_min_size() {
        let bounds = Bounds::new(640.0, 480.0);
        let r = normalize_box(Rect::new(10.0, 10.0, 2.0, 1.0), bounds, 5.0);
        assert_eq!(r.width, 5.0);
        assert_eq!(r.height, 5.0);
    }

    #[test]
    fn test_normalize_clamps_to_bounds() {
        let bounds = Bounds::new(200.0, 100.0);
        let r = normalize_box(Rect::new(-10.0, 50.0, 300.0, 80.0), bounds, 5.0);
        assert_eq!(r.x, 0.0);
        assert_eq!(r.width, 200.0);
        assert_eq!(r.y, 50.0);
        assert_eq!(r.height, 50.0);
    }

    #[test]
    fn test_normalize_second_min_pass_against_edge() {
        // Box pressed against the right edge shrinks below the floor, then is restored
        let bounds = Bounds::new(200.0, 100.0);
        let r = normalize_box(Rect::new(198.0, 10.0, 10.0, 10.0), bounds, 5.0);
        assert_eq!(r.width, 5.0);
        assert_eq!(r.x, 195.0);
        assert_eq!(r.right(), 200.0);
    }

    #[test]
    fn test_normalize_idempotent() {
        let bounds = Bounds::new(640.0, 480.0);
        let cases = [
            Rect::new(100.0, 100.0, -40.0, -30.0),
            Rect::new(-20.0, -20.0, 10.0, 700.0),
            Rect::new(630.0, 470.0, 50.0, 50.0),
            Rect::new(5.0, 5.0, 0.0, 0.0),
            Rect::new(300.0, 200.0, 100.0, 80.0),
        ];
        for rect in cases {
            let once = normalize_box(rect, bounds, 5.0);
            let twice = normalize_box(once, bounds, 5.0);
            assert_eq!(once, twice, "not idempotent for {:?}", rect);
            assert!(once.width >= 5.0 && once.height >= 5.0);
            assert!(once.x >= 0.0 && once.y >= 0.0);
        }
    }

    #[test]
    fn test_normalize_keeps_box_inside_canvas() {
        let bounds = Bounds::new(640.0, 480.0);
        for (x, y, w, h) in [
            (-50.0, -50.0, 100.0, 100.0),
            (600.0, 400.0, 200.0, 200.0),
            (320.0, 240.0, -400.0, -300.0),
            (0.0, 0.0, 640.0, 480.0),
            (639.0, 479.0, 1.0, 1.0),
        ] {
            let r = normalize_box(Rect::new(x, y, w, h), bounds, 5.0);
            assert!(r.x >= 0.0 && r.y >= 0.0);
            assert!(r.right() <= bounds.width + EPSILON);
            assert!(r.bottom() <= bounds.height + EPSILON);
        }
    }

    #[test]
    fn test_resize_formulas() {
        let orig = Rect::new(10.0, 20.0, 100.0, 50.0);

        assert_eq!(
            compute_resized_box(orig, Handle::TopLeft, 0.0, 0.0),
            Rect::new(0.0, 0.0, 110.0, 70.0)
        );
        assert_eq!(
            compute_resized_box(orig, Handle::TopRight, 150.0, 10.0),
            Rect::new(10.0, 10.0, 140.0, 60.0)
        );
        assert_eq!(
            compute_resized_box(orig, Handle::BottomLeft, 5.0, 90.0),
            Rect::new(5.0, 20.0, 105.0, 70.0)
        );
        assert_eq!(
            compute_resized_box(orig, Handle::BottomRight, 200.0, 100.0),
            Rect::new(10.0, 20.0, 190.0, 80.0)
        );
    }

    #[test]
    fn test_resize_past_opposite_corner_then_normalize() {
        let orig = Rect::new(100.0, 100.0, 50.0, 50.0);
        // Drag top-left beyond bottom-right
        let live = compute_resized_box(orig, Handle::TopLeft, 200.0, 180.0);
        assert!(live.width < 0.0 && live.height < 0.0);

        let fixed = normalize_box(live, Bounds::new(640.0, 480.0), 5.0);
        assert_eq!(fixed, Rect::new(150.0, 150.0, 50.0, 30.0));
    }

    #[test]
    fn test_hit_handle() {
        let r = Rect::new(10.0, 10.0, 100.0, 50.0);
        assert_eq!(hit_handle(&r, Point::new(12.0, 8.0), 8.0), Some(Handle::TopLeft));
        assert_eq!(hit_handle(&r, Point::new(110.0, 10.0), 8.0), Some(Handle::TopRight));
        assert_eq!(hit_handle(&r, Point::new(10.0, 64.0), 8.0), Some(Handle::BottomLeft));
        assert_eq!(hit_handle(&r, Point::new(114.0, 64.0), 8.0), Some(Handle::BottomRight));
        assert_eq!(hit_handle(&r, Point::new(60.0, 30.0), 8.0), None);
        assert_eq!(hit_handle(&r, Point::new(15.0, 10.0), 8.0), None);
    }

    #[test]
    fn test_clamp_point() {
        let b = Bounds::new(100.0, 50.0);
        assert_eq!(b.clamp_point(Point::new(-5.0, 70.0)), Point::new(0.0, 50.0));
        assert_eq!(b.clamp_point(Point::new(20.0, 30.0)), Point::new(20.0, 30.0));
    }
}
