/// The frame function: advances a level by one frame and draws it.
///
/// Processing order:
///   1. Background, terrain, decor, spikes: shift + draw
///   2. Enemies: shift/animate/walk, constraints shift, turn at constraints, draw
///   3. Grass, arrows, goal, dust: shift + draw
///   4. Camera decision (`scroll_x`) for the next frame's layers
///   5. Player input + animation
///   6. Horizontal collision
///   7. Ground snapshot, vertical collision, landing dust
///   8. Goal / fall check, draw player
///
/// Non-player layers are drawn with this frame's shift, which was decided
/// from the player's position at the end of the previous frame.

use crate::domain::assets::Surface;
use crate::domain::entity::{DustKind, FrameInput};
use crate::domain::physics;
use crate::domain::patrol;
use crate::domain::tile::Sprite;
use super::event::LevelEvent;
use super::world::Level;

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn run(level: &mut Level, input: FrameInput, surface: &mut dyn Surface) -> Vec<LevelEvent> {
    let mut events: Vec<LevelEvent> = Vec::new();
    level.frame += 1;
    let shift = level.world_shift;

    update_layer(&mut level.tiles.background, shift, surface);
    update_layer(&mut level.tiles.terrain, shift, surface);
    update_layer(&mut level.tiles.decor, shift, surface);
    update_layer(&mut level.tiles.spikes, shift, surface);

    update_enemies(level, shift, surface, &mut events);

    update_layer(&mut level.tiles.grass, shift, surface);
    update_layer(&mut level.tiles.arrows, shift, surface);
    if let Some(goal) = &mut level.goal {
        goal.update(shift);
        goal.draw(surface);
    }
    update_dust(level, shift, surface);

    level.world_shift = physics::scroll_x(&mut level.player, &level.config);
    if let Some(pos) = level.player.update(input) {
        level.spawn_dust(DustKind::Jump, pos);
        events.push(LevelEvent::Dust { kind: DustKind::Jump, pos });
    }
    physics::resolve_horizontal(&mut level.player, &level.tiles.terrain, &mut level.current_x);
    level.player_on_ground = level.player.bounds.on_ground;
    physics::resolve_vertical(&mut level.player, &level.tiles.terrain);
    create_landing_dust(level, &mut events);
    check_outcomes(level, &mut events);
    level.player.draw(surface);

    events
}

// ══════════════════════════════════════════════════════════════
// Layers
// ══════════════════════════════════════════════════════════════

fn update_layer(sprites: &mut [Sprite], shift: i32, surface: &mut dyn Surface) {
    for sprite in sprites.iter_mut() {
        sprite.update(shift);
        sprite.draw(surface);
    }
}

fn update_enemies(level: &mut Level, shift: i32, surface: &mut dyn Surface, events: &mut Vec<LevelEvent>) {
    for enemy in level.enemies.iter_mut() {
        enemy.update(shift);
    }
    for constraint in level.tiles.constraints.iter_mut() {
        constraint.update(shift);
    }
    let count = patrol::reverse_on_constraints(&mut level.enemies, &level.tiles.constraints);
    if count > 0 {
        events.push(LevelEvent::EnemiesTurned { count });
    }
    for enemy in &level.enemies {
        enemy.draw(surface);
    }
}

fn update_dust(level: &mut Level, shift: i32, surface: &mut dyn Surface) {
    if let Some(dust) = &mut level.dust {
        dust.update(shift);
        if dust.is_alive() {
            dust.draw(surface);
        } else {
            level.dust = None;
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Player aftermath
// ══════════════════════════════════════════════════════════════

/// Dust on the frame the player touches down, unless dust is still playing.
fn create_landing_dust(level: &mut Level, events: &mut Vec<LevelEvent>) {
    let landed = !level.player_on_ground && level.player.bounds.on_ground;
    if landed && !level.dust_alive() {
        let pos = level.player.land_dust_pos();
        level.spawn_dust(DustKind::Land, pos);
        events.push(LevelEvent::Dust { kind: DustKind::Land, pos });
    }
}

fn check_outcomes(level: &mut Level, events: &mut Vec<LevelEvent>) {
    let rect = level.player.rect;
    if !level.goal_reached && level.goal.as_ref().is_some_and(|g| g.rect.overlaps(&rect)) {
        level.goal_reached = true;
        events.push(LevelEvent::GoalReached);
    }
    if !level.fell && rect.top() > level.config.screen_height {
        level.fell = true;
        events.push(LevelEvent::PlayerFell);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LevelConfig;
    use crate::domain::assets::stub::{DrawCall, RecordingSurface, StubAssets};
    use crate::domain::assets::{AssetSource, ImageId};
    use crate::domain::entity::{Enemy, Player, PlayerAnimations};
    use crate::domain::geom::Point;
    use crate::domain::tile::Visual;
    use crate::sim::world::{DustFrames, TileLayers};

    fn level_with(tiles: TileLayers, enemies: Vec<Enemy>, player_pos: Point) -> Level {
        let assets = StubAssets::new();
        let cfg = LevelConfig::default();
        let anims = PlayerAnimations::load(&assets).unwrap();
        let player = Player::new(player_pos, &cfg.physics, anims);
        let dust = DustFrames {
            jump: assets.frames("dust/jump").unwrap(),
            land: assets.frames("dust/land").unwrap(),
        };
        Level::new("test".into(), cfg, tiles, enemies, None, player, dust)
    }

    fn block(x: i32, y: i32) -> Sprite {
        Sprite::new(Point::new(x, y), 64, Visual::Block)
    }

    fn strip(y: i32) -> Vec<Sprite> {
        (0..12).map(|i| block(i * 64, y)).collect()
    }

    fn frame(level: &mut Level, input: FrameInput) -> Vec<LevelEvent> {
        run(level, input, &mut RecordingSurface::default())
    }

    fn land_events(events: &[LevelEvent]) -> usize {
        events.iter()
            .filter(|e| matches!(e, LevelEvent::Dust { kind: DustKind::Land, .. }))
            .count()
    }

    #[test]
    fn player_lands_on_strip_and_stays() {
        let tiles = TileLayers { terrain: strip(512), ..Default::default() };
        let mut level = level_with(tiles, vec![], Point::new(300, 100));

        let mut lands = 0;
        for _ in 0..120 {
            lands += land_events(&frame(&mut level, FrameInput::default()));
        }
        assert!(level.player.bounds.on_ground);
        assert_eq!(level.player.rect.bottom(), 512);
        assert_eq!(lands, 1);

        for _ in 0..20 {
            frame(&mut level, FrameInput::default());
            assert_eq!(level.player.rect.bottom(), 512);
            assert!(level.player.bounds.on_ground);
        }
    }

    #[test]
    fn landing_dust_suppressed_while_dust_alive() {
        let tiles = TileLayers { terrain: strip(512), ..Default::default() };
        let mut level = level_with(tiles, vec![], Point::new(300, 440));
        level.spawn_dust(DustKind::Jump, Point::new(0, 0));

        // Falls 8px onto the strip within a few frames; stub dust lives 8 updates
        let mut lands = 0;
        for _ in 0..5 {
            lands += land_events(&frame(&mut level, FrameInput::default()));
        }
        assert!(level.player.bounds.on_ground);
        assert_eq!(lands, 0);
    }

    #[test]
    fn jump_emits_dust_and_leaves_ground() {
        let tiles = TileLayers { terrain: strip(512), ..Default::default() };
        let mut level = level_with(tiles, vec![], Point::new(300, 448));
        for _ in 0..5 {
            frame(&mut level, FrameInput::default());
        }
        assert!(level.player.bounds.on_ground);

        let events = frame(&mut level, FrameInput { jump: true, ..Default::default() });
        assert!(events.iter().any(|e| matches!(e, LevelEvent::Dust { kind: DustKind::Jump, .. })));
        assert!(!level.player.bounds.on_ground);
        assert!(level.dust_alive());

        // comes back down and lands once
        let mut lands = 0;
        for _ in 0..60 {
            lands += land_events(&frame(&mut level, FrameInput::default()));
        }
        assert_eq!(lands, 1);
        assert_eq!(level.player.rect.bottom(), 512);
    }

    #[test]
    fn scrolling_moves_layers_next_frame() {
        let tiles = TileLayers { terrain: strip(512), ..Default::default() };
        let mut level = level_with(tiles, vec![], Point::new(1000, 448));
        let right = FrameInput { right: true, ..Default::default() };

        // first frame: direction.x is still 0 when scroll_x runs
        frame(&mut level, right);
        assert_eq!(level.world_shift, 0);
        let x_after_walk = level.player.rect.x;
        assert_eq!(x_after_walk, 1008);

        frame(&mut level, right);
        assert_eq!(level.world_shift, -8);
        assert_eq!(level.player.rect.x, x_after_walk);
        assert_eq!(level.tiles.terrain[0].rect.x, 0);

        frame(&mut level, right);
        assert_eq!(level.tiles.terrain[0].rect.x, -8);
        assert_eq!(level.player.rect.x, x_after_walk);
    }

    #[test]
    fn scrolling_left_shifts_world_right() {
        let tiles = TileLayers { terrain: strip(512), ..Default::default() };
        let mut level = level_with(tiles, vec![], Point::new(100, 448));
        let left = FrameInput { left: true, ..Default::default() };

        frame(&mut level, left);
        assert_eq!(level.world_shift, 0);
        assert_eq!(level.player.rect.x, 92);

        frame(&mut level, left);
        assert_eq!(level.world_shift, 8);
        assert_eq!(level.player.speed, 0);
        assert_eq!(level.player.rect.x, 92);
        assert_eq!(level.tiles.terrain[0].rect.x, 0);

        frame(&mut level, left);
        assert_eq!(level.tiles.terrain[0].rect.x, 8);
        assert_eq!(level.player.rect.x, 92);
        assert!(!level.player.bounds.on_left);
    }

    #[test]
    fn enemy_patrols_between_constraints() {
        let constraints = vec![
            Sprite::new(Point::new(-100, 0), 64, Visual::Hidden),
            Sprite::new(Point::new(100, 0), 64, Visual::Hidden),
            Sprite::new(Point::new(200, 0), 64, Visual::Hidden),
        ];
        let tiles = TileLayers { constraints, ..Default::default() };
        let enemy = Enemy::with_speed(Point::new(0, 0), 64, vec![ImageId(1)], 1);
        let mut level = level_with(tiles, vec![enemy], Point::new(600, 0));

        let mut speeds = vec![];
        for _ in 0..400 {
            let events = frame(&mut level, FrameInput::default());
            let turned = events.iter().any(|e| matches!(e, LevelEvent::EnemiesTurned { .. }));
            let e = &level.enemies[0];
            if turned {
                speeds.push((e.rect().x, e.speed));
            }
            assert!(e.rect().right() <= 200, "never reaches the far constraint");
        }
        // right edge crosses 100 at x=37, left edge crosses -36 at x=-37
        assert_eq!(&speeds[..3], &[(37, -1), (-37, 1), (37, -1)]);
    }

    #[test]
    fn layers_draw_in_fixed_order_player_last() {
        let mut level = level_with(TileLayers::default(), vec![], Point::new(600, 0));
        level.tiles.background.push(Sprite::new(Point::new(0, 0), 64, Visual::Static(ImageId(1))));
        level.tiles.terrain.push(Sprite::new(Point::new(0, 640), 64, Visual::Static(ImageId(2))));
        level.tiles.grass.push(Sprite::new(Point::new(0, 576), 64, Visual::Static(ImageId(3))));
        level.goal = Some(Sprite::new(Point::new(64, 0), 64, Visual::Static(ImageId(4))));

        let mut surface = RecordingSurface::default();
        run(&mut level, FrameInput::default(), &mut surface);
        let order: Vec<ImageId> = surface.calls.iter().filter_map(|c| match c {
            DrawCall::Image { image, .. } => Some(*image),
            DrawCall::Fill { .. } => None,
        }).collect();
        assert_eq!(&order[..4], &[ImageId(1), ImageId(2), ImageId(3), ImageId(4)]);
        assert_eq!(order.len(), 5);
        assert_eq!(order[4], level.player.image());
    }

    #[test]
    fn goal_and_fall_reported_once() {
        let mut level = level_with(TileLayers::default(), vec![], Point::new(600, 600));
        level.goal = Some(Sprite::new(Point::new(600, 600), 64, Visual::Static(ImageId(4))));

        let events = frame(&mut level, FrameInput::default());
        assert!(events.contains(&LevelEvent::GoalReached));
        assert!(!frame(&mut level, FrameInput::default()).contains(&LevelEvent::GoalReached));

        let mut fell = 0;
        for _ in 0..60 {
            fell += frame(&mut level, FrameInput::default()).iter()
                .filter(|e| **e == LevelEvent::PlayerFell)
                .count();
        }
        assert_eq!(fell, 1);
        assert!(level.player.rect.top() > 704);
    }
}
