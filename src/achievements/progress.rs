//! Progress rules per achievement kind.

use super::{AchievementDefinition, AchievementKind};

/// Outcome of evaluating one definition against a stat value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub progress: i64,
    pub unlocked: bool,
}

impl Evaluation {
    const NONE: Evaluation = Evaluation {
        progress: 0,
        unlocked: false,
    };
}

/// Compute progress and unlock condition for `current`.
///
/// Counters track the stat without a cap, milestones and badges are clamped
/// at the target. Unrecognized kinds never progress.
pub fn evaluate(definition: &AchievementDefinition, current: i64) -> Evaluation {
    let current = current.max(0);
    let target = definition.target_value;

    match definition.kind {
        AchievementKind::Counter => Evaluation {
            progress: current,
            unlocked: current >= target,
        },
        AchievementKind::Milestone | AchievementKind::Badge => Evaluation {
            progress: current.min(target.max(0)),
            unlocked: current >= target,
        },
        AchievementKind::Unrecognized(_) => Evaluation::NONE,
    }
}
