//! Idle-burst task registry and sampling.
//!
//! Each burst turn picks a task type by cumulative-weight sampling: draw
//! uniform in `[0, total_weight)`, subtract each weight in turn, and take
//! the task where the remainder drops below zero.

use tandem_core::RandomSource;

/// A weighted autonomous task type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurstTask {
    /// Short name used in logs.
    pub name: &'static str,
    /// Sampling weight.
    pub weight: u32,
    /// Instruction handed to the primary agent.
    pub instruction: &'static str,
}

const TASKS: &[BurstTask] = &[
    BurstTask {
        name: "share_thought",
        weight: 3,
        instruction: "The group has been quiet for a while. Share a small \
                      observation or thought of your own to warm the room up. \
                      Keep it to a sentence or two.",
    },
    BurstTask {
        name: "ask_group",
        weight: 2,
        instruction: "The group has been quiet. Ask a light, open question \
                      to invite someone to chat.",
    },
    BurstTask {
        name: "recall_moment",
        weight: 2,
        instruction: "Bring up something pleasant from the recent \
                      conversation history, as if it just crossed your mind.",
    },
    BurstTask {
        name: "care_checkin",
        weight: 2,
        instruction: "Gently check in on how everyone is doing. Do not be \
                      pushy about it.",
    },
    BurstTask {
        name: "banter",
        weight: 1,
        instruction: "Make a short playful remark, as if talking to \
                      yourself in the room.",
    },
];

/// The default task registry.
pub fn default_tasks() -> &'static [BurstTask] {
    TASKS
}

/// Pick a task by cumulative-weight sampling. `tasks` must be non-empty.
pub fn pick_task<'a>(tasks: &'a [BurstTask], rng: &dyn RandomSource) -> &'a BurstTask {
    let total: u32 = tasks.iter().map(|t| t.weight).sum();
    let mut remainder = rng.next_f64() * f64::from(total);
    for task in tasks {
        remainder -= f64::from(task.weight);
        if remainder < 0.0 {
            return task;
        }
    }
    // Floating-point edge: the draw landed exactly on total_weight.
    tasks.last().expect("task registry must be non-empty")
}

#[cfg(test)]
mod tests {
    use tandem_core::{ScriptedRandom, ThreadRandom};

    use super::*;

    #[test]
    fn test_registry_weights() {
        let total: u32 = default_tasks().iter().map(|t| t.weight).sum();
        assert_eq!(total, 10);
        assert_eq!(default_tasks()[0].name, "share_thought");
    }

    #[test]
    fn test_scripted_picks_are_deterministic() {
        let tasks = default_tasks();
        // Weights are 3,2,2,2,1 over a total of 10: a draw of 0.0 lands in
        // the first task, 0.31 in the second, 0.95 in the last.
        let rng = ScriptedRandom::new([0.0, 0.31, 0.95]);
        assert_eq!(pick_task(tasks, &rng).name, "share_thought");
        assert_eq!(pick_task(tasks, &rng).name, "ask_group");
        assert_eq!(pick_task(tasks, &rng).name, "banter");
    }

    #[test]
    fn test_boundary_draw_resolves() {
        let tasks = default_tasks();
        let rng = ScriptedRandom::new([0.999_999_9]);
        // Must not panic, and must return a registry entry.
        let task = pick_task(tasks, &rng);
        assert!(tasks.iter().any(|t| t.name == task.name));
    }

    #[test]
    fn test_sampling_tracks_weights() {
        let tasks = default_tasks();
        let rng = ThreadRandom;
        let mut counts = std::collections::HashMap::new();
        for _ in 0..10_000 {
            *counts.entry(pick_task(tasks, &rng).name).or_insert(0u32) += 1;
        }
        // share_thought (weight 3) should land near 30%, banter (1) near 10%.
        let share = f64::from(counts["share_thought"]) / 10_000.0;
        let banter = f64::from(counts["banter"]) / 10_000.0;
        assert!((share - 0.3).abs() < 0.05, "share_thought ratio {share}");
        assert!((banter - 0.1).abs() < 0.05, "banter ratio {banter}");
    }
}
