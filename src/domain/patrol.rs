/// Enemy patrol: walk until a constraint zone, then turn around.
///
/// Constraint boxes are invisible tiles placed at the ends of each patrol
/// route. An enemy touching several of them in one frame still turns once.

use super::entity::Enemy;
use super::tile::Sprite;

/// Reverse every enemy overlapping at least one constraint.
/// Returns how many enemies turned this frame.
pub fn reverse_on_constraints(enemies: &mut [Enemy], constraints: &[Sprite]) -> usize {
    let mut turned = 0;
    for enemy in enemies.iter_mut() {
        let rect = enemy.rect();
        if constraints.iter().any(|c| c.rect.overlaps(&rect)) {
            enemy.reverse();
            turned += 1;
        }
    }
    turned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::assets::ImageId;
    use crate::domain::geom::Point;
    use crate::domain::tile::Visual;

    fn constraint(x: i32) -> Sprite {
        Sprite::new(Point::new(x, 0), 64, Visual::Hidden)
    }

    fn enemy(x: i32, speed: i32) -> Enemy {
        Enemy::with_speed(Point::new(x, 0), 64, vec![ImageId(0)], speed)
    }

    #[test]
    fn single_flip_for_multiple_overlaps() {
        let mut enemies = vec![enemy(100, 1)];
        let constraints = vec![constraint(60), constraint(120), constraint(140)];
        assert_eq!(reverse_on_constraints(&mut enemies, &constraints), 1);
        assert_eq!(enemies[0].speed, -1);
    }

    #[test]
    fn untouched_enemies_keep_speed() {
        let mut enemies = vec![enemy(0, 2), enemy(500, 1)];
        let constraints = vec![constraint(540)];
        assert_eq!(reverse_on_constraints(&mut enemies, &constraints), 1);
        assert_eq!(enemies[0].speed, 2);
        assert_eq!(enemies[1].speed, -1);
    }

    #[test]
    fn empty_sets_are_no_ops() {
        let mut enemies = vec![enemy(0, 2)];
        assert_eq!(reverse_on_constraints(&mut enemies, &[]), 0);
        assert_eq!(reverse_on_constraints(&mut [], &[constraint(0)]), 0);
        assert_eq!(enemies[0].speed, 2);
    }
}
