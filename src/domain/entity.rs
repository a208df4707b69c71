/// Entities: Player, Enemy and the dust effect.
///
/// The player is the only actor with input and gravity. Enemies patrol at a
/// constant speed; dust is a short-lived one-shot animation.

use rand::Rng;

use super::assets::{require_frames, AssetSource, ImageId, Surface};
use super::geom::{Point, Rect, Vec2};
use super::tile::{Animation, Rate, Sprite, Visual, TILE_RATE};
use crate::config::PhysicsConfig;
use crate::error::AssetError;

const PLAYER_ANIM_RATE: Rate = Rate::new(3, 20);
const DUST_ANIM_RATE: Rate = Rate::new(1, 2);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Facing {
    Left,
    Right,
}

/// Frame input, sampled once per frame by the host.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameInput {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
}

/// Which sides of the player rest against terrain this frame.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Bounds {
    pub on_ground: bool,
    pub on_ceiling: bool,
    pub on_left: bool,
    pub on_right: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PlayerStatus {
    Idle,
    Run,
    Jump,
    Fall,
}

impl PlayerStatus {
    pub const ALL: [PlayerStatus; 4] =
        [PlayerStatus::Idle, PlayerStatus::Run, PlayerStatus::Jump, PlayerStatus::Fall];

    pub fn asset_key(self) -> &'static str {
        match self {
            PlayerStatus::Idle => "character/idle",
            PlayerStatus::Run => "character/run",
            PlayerStatus::Jump => "character/jump",
            PlayerStatus::Fall => "character/fall",
        }
    }

    /// Derived from velocity: rising, falling fast, walking, or still.
    pub fn from_direction(direction: Vec2) -> Self {
        if direction.y < 0.0 {
            PlayerStatus::Jump
        } else if direction.y > 1.0 {
            PlayerStatus::Fall
        } else if direction.x != 0.0 {
            PlayerStatus::Run
        } else {
            PlayerStatus::Idle
        }
    }
}

/// One animation per status, in `PlayerStatus::ALL` order.
#[derive(Clone, Debug)]
pub struct PlayerAnimations {
    anims: [Animation; 4],
}

impl PlayerAnimations {
    pub fn load(assets: &dyn AssetSource) -> Result<Self, AssetError> {
        let [idle, run, jump, fall] = PlayerStatus::ALL;
        Ok(PlayerAnimations {
            anims: [
                Animation::new(require_frames(assets, idle.asset_key())?, PLAYER_ANIM_RATE),
                Animation::new(require_frames(assets, run.asset_key())?, PLAYER_ANIM_RATE),
                Animation::new(require_frames(assets, jump.asset_key())?, PLAYER_ANIM_RATE),
                Animation::new(require_frames(assets, fall.asset_key())?, PLAYER_ANIM_RATE),
            ],
        })
    }

    fn get_mut(&mut self, status: PlayerStatus) -> &mut Animation {
        &mut self.anims[status as usize]
    }

    fn get(&self, status: PlayerStatus) -> &Animation {
        &self.anims[status as usize]
    }
}

#[derive(Clone, Debug)]
pub struct Player {
    pub rect: Rect,
    pub direction: Vec2,
    /// Horizontal pixels per frame; 0 while the world scrolls instead.
    pub speed: i32,
    pub facing: Facing,
    pub bounds: Bounds,
    pub status: PlayerStatus,
    gravity: f32,
    jump_speed: f32,
    anims: PlayerAnimations,
}

impl Player {
    pub fn new(pos: Point, physics: &PhysicsConfig, anims: PlayerAnimations) -> Self {
        Player {
            rect: Rect::new(pos.x, pos.y, physics.player_width, physics.player_height),
            direction: Vec2::default(),
            speed: physics.walk_speed,
            facing: Facing::Right,
            bounds: Bounds::default(),
            status: PlayerStatus::Idle,
            gravity: physics.gravity,
            jump_speed: physics.jump_speed,
            anims,
        }
    }

    /// Read input, refresh status and animate.
    /// Returns the dust spawn point when this frame started a jump.
    pub fn update(&mut self, input: FrameInput) -> Option<Point> {
        let jumped = self.apply_input(input);
        self.refresh_status();
        self.anims.get_mut(self.status).advance();
        jumped
    }

    fn apply_input(&mut self, input: FrameInput) -> Option<Point> {
        if input.right {
            self.direction.x = 1.0;
            self.facing = Facing::Right;
        } else if input.left {
            self.direction.x = -1.0;
            self.facing = Facing::Left;
        } else {
            self.direction.x = 0.0;
        }

        if input.jump && self.bounds.on_ground {
            self.direction.y = self.jump_speed;
            return Some(self.jump_dust_pos());
        }
        None
    }

    fn refresh_status(&mut self) {
        let status = PlayerStatus::from_direction(self.direction);
        if status != self.status {
            self.anims.get_mut(status).restart();
            self.status = status;
        }
    }

    fn jump_dust_pos(&self) -> Point {
        let pos = self.rect.mid_bottom();
        match self.facing {
            Facing::Right => pos.offset(-10, -5),
            Facing::Left => pos.offset(10, -5),
        }
    }

    pub fn land_dust_pos(&self) -> Point {
        let pos = self.rect.mid_bottom();
        match self.facing {
            Facing::Right => pos.offset(-5, -15),
            Facing::Left => pos.offset(5, -15),
        }
    }

    /// Accumulate gravity into `direction.y` and move by it.
    pub fn apply_gravity(&mut self) {
        self.direction.y += self.gravity;
        self.rect.y = (self.rect.y as f32 + self.direction.y) as i32;
    }

    pub fn image(&self) -> ImageId {
        self.anims.get(self.status).current()
    }

    pub fn draw(&self, surface: &mut dyn Surface) {
        surface.draw(self.rect, self.image(), self.facing == Facing::Left);
    }
}

#[derive(Clone, Debug)]
pub struct Enemy {
    pub sprite: Sprite,
    /// Signed pixels per frame. Positive at spawn.
    pub speed: i32,
}

impl Enemy {
    pub fn spawn(pos: Point, size: i32, frames: Vec<ImageId>, rng: &mut impl Rng) -> Self {
        Enemy::with_speed(pos, size, frames, rng.random_range(1..=2))
    }

    pub fn with_speed(pos: Point, size: i32, frames: Vec<ImageId>, speed: i32) -> Self {
        Enemy {
            sprite: Sprite::new(pos, size, Visual::Animated(Animation::new(frames, TILE_RATE))),
            speed,
        }
    }

    pub fn rect(&self) -> Rect {
        self.sprite.rect
    }

    pub fn move_step(&mut self) {
        self.sprite.rect.x += self.speed;
    }

    pub fn reverse(&mut self) {
        self.speed = -self.speed;
    }

    /// Shift, animate, face the direction of travel, then walk.
    pub fn update(&mut self, world_shift: i32) {
        self.sprite.shift(world_shift);
        self.sprite.animate();
        self.sprite.flip_x = self.speed > 0;
        self.move_step();
    }

    pub fn draw(&self, surface: &mut dyn Surface) {
        self.sprite.draw(surface);
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DustKind {
    Jump,
    Land,
}

impl DustKind {
    pub fn asset_key(self) -> &'static str {
        match self {
            DustKind::Jump => "dust/jump",
            DustKind::Land => "dust/land",
        }
    }
}

/// One-shot particle: plays its frames once, then reports itself dead.
#[derive(Clone, Debug)]
pub struct DustEffect {
    pub rect: Rect,
    anim: Animation,
    alive: bool,
}

impl DustEffect {
    pub fn new(center: Point, size: i32, frames: Vec<ImageId>) -> Self {
        DustEffect {
            rect: Rect::centered(center, size, size),
            anim: Animation::new(frames, DUST_ANIM_RATE),
            alive: true,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn update(&mut self, world_shift: i32) {
        if self.anim.advance() {
            self.alive = false;
        }
        self.rect.x += world_shift;
    }

    pub fn draw(&self, surface: &mut dyn Surface) {
        if self.alive {
            surface.draw(self.rect, self.anim.current(), false);
        }
    }
}
