/// Collision and scroll engine.
///
/// ## Per-frame order (see `sim::step`)
///   1. `scroll_x`: shift the world or move the player
///   2. `resolve_horizontal`: move by `direction.x × speed`, push out of walls
///   3. (caller snapshots `on_ground`)
///   4. `resolve_vertical`: gravity, push out of floors / ceilings
///
/// ## Boundary flags
///
/// `Bounds` is rebuilt each pass from the previous value and this frame's
/// contacts, never patched field by field:
///   - a wall flag holds while the player keeps pushing into the wall and has
///     not moved away from the recorded contact x (`current_x`)
///   - `on_ground` holds while `0 <= direction.y <= 1` (resting under gravity)
///   - `on_ceiling` holds until the player starts falling
///
/// ## Multiple overlaps
///
/// Every terrain box is scanned. When several overlap on the same axis the
/// deepest edge wins (largest right edge when moving left, smallest top when
/// falling, ...), so the result never depends on scan order and the player
/// ends clear of every box it was overlapping.

use super::entity::{Bounds, Player};
use super::geom::Rect;
use super::tile::Sprite;
use crate::config::LevelConfig;

/// Decide this frame's world shift and the player's own speed.
///
/// Inside the left or right third, moving outward, the world scrolls under a
/// stationary player. Elsewhere the player walks and the world holds still.
pub fn scroll_x(player: &mut Player, cfg: &LevelConfig) -> i32 {
    let center = player.rect.center_x() as f32;
    let third = cfg.screen_width as f32 / 3.0;
    let dir = player.direction.x;

    if center < third && dir < 0.0 {
        player.speed = 0;
        cfg.physics.scroll_speed
    } else if center > cfg.screen_width as f32 - third && dir > 0.0 {
        player.speed = 0;
        -cfg.physics.scroll_speed
    } else {
        player.speed = cfg.physics.walk_speed;
        0
    }
}

fn overlapping<'a>(rect: Rect, terrain: &'a [Sprite]) -> impl Iterator<Item = Rect> + 'a {
    terrain.iter().map(|s| s.rect).filter(move |r| r.overlaps(&rect))
}

/// Horizontal pass. `current_x` is the level's record of the last wall contact.
pub fn resolve_horizontal(player: &mut Player, terrain: &[Sprite], current_x: &mut i32) {
    player.rect.x += player.direction.x as i32 * player.speed;

    let dir = player.direction.x;
    let mut hit_left = false;
    let mut hit_right = false;

    if dir < 0.0 {
        if let Some(edge) = overlapping(player.rect, terrain).map(|r| r.right()).max() {
            player.rect.set_left(edge);
            *current_x = player.rect.left();
            hit_left = true;
        }
    } else if dir > 0.0 {
        if let Some(edge) = overlapping(player.rect, terrain).map(|r| r.left()).min() {
            player.rect.set_right(edge);
            *current_x = player.rect.right();
            hit_right = true;
        }
    }

    let prev = player.bounds;
    let on_left = (prev.on_left || hit_left)
        && dir < 0.0
        && player.rect.left() >= *current_x;
    let on_right = (prev.on_right || hit_right)
        && dir > 0.0
        && player.rect.right() <= *current_x;

    player.bounds = Bounds { on_left, on_right, ..prev };
}

/// Vertical pass: apply gravity, then land on floors or bump ceilings.
pub fn resolve_vertical(player: &mut Player, terrain: &[Sprite]) {
    player.apply_gravity();

    let mut hit_ground = false;
    let mut hit_ceiling = false;

    if player.direction.y > 0.0 {
        if let Some(edge) = overlapping(player.rect, terrain).map(|r| r.top()).min() {
            player.rect.set_bottom(edge);
            player.direction.y = 0.0;
            hit_ground = true;
        }
    } else if player.direction.y < 0.0 {
        if let Some(edge) = overlapping(player.rect, terrain).map(|r| r.bottom()).max() {
            player.rect.set_top(edge);
            player.direction.y = 0.0;
            hit_ceiling = true;
        }
    }

    let dy = player.direction.y;
    let prev = player.bounds;
    let on_ground = (prev.on_ground || hit_ground) && (0.0..=1.0).contains(&dy);
    let on_ceiling = (prev.on_ceiling || hit_ceiling) && dy <= 0.0;

    player.bounds = Bounds { on_ground, on_ceiling, ..prev };
}
