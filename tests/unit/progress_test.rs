//! Progress rules across kinds and targets.

use shelftrack::achievements::progress::{evaluate, Evaluation};
use shelftrack::achievements::{AchievementDefinition, AchievementKind};
use uuid::Uuid;

fn definition(kind: &str, target_value: i64) -> AchievementDefinition {
    AchievementDefinition {
        id: Uuid::new_v4(),
        name: format!("{} {}", kind, target_value),
        description: String::new(),
        kind: AchievementKind::from(kind),
        target_value,
        target_stat: "TotalBooks".to_string(),
        is_hidden: false,
        category: String::new(),
    }
}

#[test]
fn test_progress_table() {
    // (kind, target, current, progress, unlocked)
    let cases = [
        ("counter", 10, 0, 0, false),
        ("counter", 10, 9, 9, false),
        ("counter", 10, 10, 10, true),
        ("counter", 10, 250, 250, true),
        ("milestone", 10, 9, 9, false),
        ("milestone", 10, 10, 10, true),
        ("milestone", 10, 250, 10, true),
        ("badge", 1, 0, 0, false),
        ("badge", 1, 1, 1, true),
        ("badge", 1, 40, 1, true),
        ("streak", 1, 40, 0, false),
        ("", 0, 40, 0, false),
    ];

    for (kind, target, current, progress, unlocked) in cases {
        let def = definition(kind, target);
        assert_eq!(
            evaluate(&def, current),
            Evaluation { progress, unlocked },
            "kind={} target={} current={}",
            kind,
            target,
            current
        );
    }
}

#[test]
fn test_zero_target_unlocks_immediately() {
    for kind in ["counter", "milestone", "badge"] {
        let result = evaluate(&definition(kind, 0), 0);
        assert!(result.unlocked, "{}", kind);
        assert_eq!(result.progress, 0);
    }
}

#[test]
fn test_clamped_progress_never_exceeds_target() {
    for kind in ["milestone", "badge"] {
        for target in [1, 5, 100] {
            let def = definition(kind, target);
            for current in [0, target - 1, target, target + 1, target * 10] {
                assert!(evaluate(&def, current).progress <= target);
            }
        }
    }
}
