/// Events emitted during a level frame.
/// The presentation layer consumes these for sound and level flow.

use crate::domain::entity::DustKind;
use crate::domain::geom::Point;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LevelEvent {
    /// A dust effect was spawned at `pos` (centre of the effect).
    Dust { kind: DustKind, pos: Point },
    EnemiesTurned { count: usize },
    GoalReached,
    PlayerFell,
}
