/// Events emitted during a simulation step.
/// The presentation layer consumes these for sound and logging.

use crate::domain::entity::Who;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameEvent {
    /// A pressed in attract mode: a player game begins.
    GameStarted,
    Paused,
    Resumed,
    /// B pressed: back to attract mode.
    ResetToAttract,
    DotEaten { cx: i16, cy: i16, in_demo: bool },
    PillEaten { cx: i16, cy: i16, in_demo: bool },
    GhostEaten { who: Who, points: u32, in_demo: bool },
    BonusCollected { points: u32, in_demo: bool },
    ExtraLife { lives: u8 },
    PacmanDied { in_demo: bool, game_over: bool },
    LevelCleared { level: u8 },
    LevelStarted { level: u8 },
}
