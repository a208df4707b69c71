/// Level: the complete state of a running level.
///
/// ## Layers
///
/// Every placed thing lives in exactly one layer. Static and animated tile
/// layers are plain `Vec<Sprite>`; enemies, the goal, the player and the dust
/// slot have their own types. All layers except the player move only by the
/// per-frame `world_shift`.
///
/// ## Camera
///
/// There is no camera offset. Scrolling is done by translating every
/// non-player layer by `world_shift` pixels each frame, decided from the
/// player's position in the previous frame (`physics::scroll_x`).

use crate::config::LevelConfig;
use crate::domain::assets::{ImageId, Surface};
use crate::domain::entity::{DustEffect, DustKind, Enemy, FrameInput, Player};
use crate::domain::geom::Point;
use crate::domain::tile::Sprite;
use super::event::LevelEvent;
use super::step;

/// Tile layers, one per static or animated layer kind.
#[derive(Clone, Debug, Default)]
pub struct TileLayers {
    pub background: Vec<Sprite>,
    pub terrain: Vec<Sprite>,
    pub decor: Vec<Sprite>,
    pub spikes: Vec<Sprite>,
    pub grass: Vec<Sprite>,
    pub arrows: Vec<Sprite>,
    pub constraints: Vec<Sprite>,
}

#[derive(Clone, Debug)]
pub struct DustFrames {
    pub jump: Vec<ImageId>,
    pub land: Vec<ImageId>,
}

impl DustFrames {
    fn get(&self, kind: DustKind) -> &[ImageId] {
        match kind {
            DustKind::Jump => &self.jump,
            DustKind::Land => &self.land,
        }
    }
}

#[derive(Debug)]
pub struct Level {
    pub name: String,
    pub config: LevelConfig,

    // ── Layers ──
    pub tiles: TileLayers,
    pub enemies: Vec<Enemy>,
    pub goal: Option<Sprite>,
    pub player: Player,
    pub dust: Option<DustEffect>,
    pub dust_frames: DustFrames,

    // ── Per-frame scroll / collision state ──
    /// Pixels every non-player layer moves this frame: one of ±scroll_speed or 0.
    pub world_shift: i32,
    /// x of the last wall contact (player left edge for left walls, right edge for right).
    pub current_x: i32,
    /// `on_ground` before the vertical pass, for landing detection.
    pub player_on_ground: bool,

    // ── Outcomes (reported once) ──
    pub goal_reached: bool,
    pub fell: bool,
    pub frame: u64,
}

impl Level {
    pub fn new(
        name: String,
        config: LevelConfig,
        tiles: TileLayers,
        enemies: Vec<Enemy>,
        goal: Option<Sprite>,
        player: Player,
        dust_frames: DustFrames,
    ) -> Self {
        Level {
            name,
            config,
            tiles,
            enemies,
            goal,
            player,
            dust: None,
            dust_frames,
            world_shift: 0,
            current_x: 0,
            player_on_ground: false,
            goal_reached: false,
            fell: false,
            frame: 0,
        }
    }

    /// Advance one frame and draw it. See `step::run` for the order.
    pub fn run(&mut self, input: FrameInput, surface: &mut dyn Surface) -> Vec<LevelEvent> {
        step::run(self, input, surface)
    }

    /// Is a dust effect still playing?
    pub fn dust_alive(&self) -> bool {
        self.dust.as_ref().is_some_and(|d| d.is_alive())
    }

    /// Start a dust effect, replacing any current one.
    pub fn spawn_dust(&mut self, kind: DustKind, pos: Point) {
        let size = self.config.tile_size / 2;
        let frames = self.dust_frames.get(kind).to_vec();
        self.dust = Some(DustEffect::new(pos, size, frames));
    }
}
