#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Visible window of the lane area in surface units, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    /// Extra room around the viewport so half-clipped nodes still draw.
    pub margin: f32,
}

impl Viewport {
    pub fn contains_y(&self, y: f32) -> bool {
        y >= -self.margin && y <= self.height + self.margin
    }

    pub fn contains(&self, point: Point) -> bool {
        self.contains_y(point.y) && point.x >= -self.margin && point.x <= self.width + self.margin
    }

    /// Whether the axis-aligned bounds of a connector overlap the viewport.
    pub fn intersects(&self, a: Point, b: Point) -> bool {
        let (top, bottom) = (a.y.min(b.y), a.y.max(b.y));
        let (left, right) = (a.x.min(b.x), a.x.max(b.x));
        spans_overlap(top, bottom, -self.margin, self.height + self.margin)
            && spans_overlap(left, right, -self.margin, self.width + self.margin)
    }
}

pub fn spans_overlap(a_start: f32, a_end: f32, b_start: f32, b_end: f32) -> bool {
    a_start <= b_end && b_start <= a_end
}

/// Cubic curve between two lane points with both control points on the
/// vertical midpoint, so the bend is symmetric whatever the row spacing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicBezier {
    pub start: Point,
    pub control1: Point,
    pub control2: Point,
    pub end: Point,
}

impl CubicBezier {
    pub fn between(start: Point, end: Point) -> Self {
        let mid_y = (start.y + end.y) / 2.0;
        Self {
            start,
            control1: Point::new(start.x, mid_y),
            control2: Point::new(end.x, mid_y),
            end,
        }
    }

    pub fn sample(&self, t: f32) -> Point {
        let t2 = t * t;
        let t3 = t2 * t;
        let mt = 1.0 - t;
        let mt2 = mt * mt;
        let mt3 = mt2 * mt;

        let x = self.start.x * mt3
            + 3.0 * self.control1.x * mt2 * t
            + 3.0 * self.control2.x * mt * t2
            + self.end.x * t3;
        let y = self.start.y * mt3
            + 3.0 * self.control1.y * mt2 * t
            + 3.0 * self.control2.y * mt * t2
            + self.end.y * t3;
        Point::new(x, y)
    }

    /// Polyline approximation with `segments` pieces (at least one).
    pub fn flatten(&self, segments: usize) -> Vec<Point> {
        let segments = segments.max(1);
        (0..=segments)
            .map(|i| self.sample(i as f32 / segments as f32))
            .collect()
    }
}
