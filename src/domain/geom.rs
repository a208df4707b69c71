/// Pixel-space geometry: integer boxes and a small float vector.
///
/// Boxes follow screen conventions: `y` grows downward, `right`/`bottom`
/// are exclusive, so two boxes sharing an edge do not overlap.

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Rect { x, y, w, h }
    }

    /// Box of size `w`×`h` centred on `center`.
    pub fn centered(center: Point, w: i32, h: i32) -> Self {
        Rect { x: center.x - w / 2, y: center.y - h / 2, w, h }
    }

    pub fn left(&self) -> i32 { self.x }
    pub fn right(&self) -> i32 { self.x + self.w }
    pub fn top(&self) -> i32 { self.y }
    pub fn bottom(&self) -> i32 { self.y + self.h }
    pub fn center_x(&self) -> i32 { self.x + self.w / 2 }

    pub fn set_left(&mut self, v: i32) { self.x = v; }
    pub fn set_right(&mut self, v: i32) { self.x = v - self.w; }
    pub fn set_top(&mut self, v: i32) { self.y = v; }
    pub fn set_bottom(&mut self, v: i32) { self.y = v - self.h; }

    pub fn mid_bottom(&self) -> Point {
        Point { x: self.center_x(), y: self.bottom() }
    }

    /// Strict overlap test. Touching edges is not a collision.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Point { x: self.x + dx, y: self.y + dy }
    }
}

/// Player velocity. `x` is the input direction, `y` accumulates gravity.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}
