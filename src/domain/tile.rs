/// Tiles: positioned square boxes with a visual.
///
/// One `Sprite` type covers every placed thing. What it looks like is a
/// tagged `Visual` rather than a subtype, so layers dispatch on the tag.

use super::assets::{ImageId, Surface};
use super::geom::{Point, Rect};

/// Animation speed as an exact fraction of a frame per update.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Rate {
    num: u32,
    den: u32,
}

impl Rate {
    pub const fn new(num: u32, den: u32) -> Self {
        Rate { num, den }
    }
}

/// 0.10 frames per update: a tile cycle takes `10 × frame_count` updates.
pub const TILE_RATE: Rate = Rate::new(1, 10);

/// Cyclic frame sequence with a fractional cursor.
///
/// The cursor is kept as a step count so it never drifts:
/// `cursor = ticks × num / den`, wrapped to 0 once it reaches `frames.len()`.
#[derive(Clone, Debug)]
pub struct Animation {
    frames: Vec<ImageId>,
    rate: Rate,
    ticks: u32,
}

impl Animation {
    /// `frames` must be non-empty; asset sources guarantee it.
    pub fn new(frames: Vec<ImageId>, rate: Rate) -> Self {
        debug_assert!(!frames.is_empty());
        Animation { frames, rate, ticks: 0 }
    }

    /// Step once. Returns true when the cursor wrapped back to 0.
    pub fn advance(&mut self) -> bool {
        self.ticks += 1;
        if self.ticks * self.rate.num >= self.frames.len() as u32 * self.rate.den {
            self.ticks = 0;
            return true;
        }
        false
    }

    pub fn restart(&mut self) {
        self.ticks = 0;
    }

    #[allow(dead_code)]
    pub fn cursor(&self) -> f32 {
        (self.ticks * self.rate.num) as f32 / self.rate.den as f32
    }

    pub fn index(&self) -> usize {
        ((self.ticks * self.rate.num) / self.rate.den) as usize
    }

    pub fn current(&self) -> ImageId {
        self.frames[self.index()]
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.frames.len()
    }
}

#[derive(Clone, Debug)]
pub enum Visual {
    /// Collision only, never drawn (enemy constraints).
    Hidden,
    /// Untextured solid block (legacy `X` terrain).
    Block,
    Static(ImageId),
    Animated(Animation),
}

#[derive(Clone, Debug)]
pub struct Sprite {
    pub rect: Rect,
    pub visual: Visual,
    pub flip_x: bool,
}

impl Sprite {
    pub fn new(pos: Point, size: i32, visual: Visual) -> Self {
        Sprite {
            rect: Rect::new(pos.x, pos.y, size, size),
            visual,
            flip_x: false,
        }
    }

    /// Levels scroll horizontally only.
    pub fn shift(&mut self, dx: i32) {
        self.rect.x += dx;
    }

    pub fn animate(&mut self) {
        if let Visual::Animated(anim) = &mut self.visual {
            anim.advance();
        }
    }

    /// Per-frame update shared by every static and animated layer.
    pub fn update(&mut self, world_shift: i32) {
        self.animate();
        self.shift(world_shift);
    }

    #[allow(dead_code)]
    pub fn image(&self) -> Option<ImageId> {
        match &self.visual {
            Visual::Static(id) => Some(*id),
            Visual::Animated(anim) => Some(anim.current()),
            Visual::Hidden | Visual::Block => None,
        }
    }

    pub fn draw(&self, surface: &mut dyn Surface) {
        match &self.visual {
            Visual::Hidden => {}
            Visual::Block => surface.fill(self.rect),
            Visual::Static(id) => surface.draw(self.rect, *id, self.flip_x),
            Visual::Animated(anim) => surface.draw(self.rect, anim.current(), self.flip_x),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::assets::stub::{DrawCall, RecordingSurface};

    fn frames(n: u32) -> Vec<ImageId> {
        (0..n).map(ImageId).collect()
    }

    #[test]
    fn tile_rate_cycles_in_ten_updates_per_frame() {
        let mut anim = Animation::new(frames(3), TILE_RATE);
        for step in 1..30 {
            anim.advance();
            assert_eq!(anim.index(), step / 10, "step {step}");
            assert_eq!(anim.current(), ImageId((step / 10) as u32));
        }
        anim.advance();
        assert_eq!(anim.index(), 0);
        assert_eq!(anim.cursor(), 0.0);
    }

    #[test]
    fn cursor_stays_below_frame_count() {
        let mut anim = Animation::new(frames(4), Rate::new(3, 20));
        for _ in 0..1000 {
            anim.advance();
            assert!(anim.cursor() < anim.len() as f32);
            assert_eq!(anim.index(), anim.cursor().floor() as usize);
        }
    }

    #[test]
    fn restart_resets_cursor() {
        let mut anim = Animation::new(frames(2), Rate::new(1, 2));
        anim.advance();
        anim.advance();
        assert_eq!(anim.index(), 1);
        anim.restart();
        assert_eq!(anim.index(), 0);
    }

    #[test]
    fn shift_moves_x_only() {
        let mut s = Sprite::new(Point::new(64, 128), 64, Visual::Block);
        s.update(-8);
        assert_eq!(s.rect, Rect::new(56, 128, 64, 64));
        s.update(8);
        assert_eq!(s.rect, Rect::new(64, 128, 64, 64));
    }

    #[test]
    fn hidden_tiles_are_not_drawn() {
        let mut surface = RecordingSurface::default();
        Sprite::new(Point::new(0, 0), 64, Visual::Hidden).draw(&mut surface);
        Sprite::new(Point::new(0, 0), 64, Visual::Block).draw(&mut surface);
        Sprite::new(Point::new(64, 0), 64, Visual::Static(ImageId(7))).draw(&mut surface);
        assert_eq!(surface.calls, vec![
            DrawCall::Fill { rect: Rect::new(0, 0, 64, 64) },
            DrawCall::Image { rect: Rect::new(64, 0, 64, 64), image: ImageId(7), flip_x: false },
        ]);
    }
}
