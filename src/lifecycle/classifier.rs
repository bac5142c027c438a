//! Death/resurrection state machine
//!
//! A deterministic pass over the ordered timeline. While alive, a gap of
//! at least the configured threshold emits a death event; the next commit
//! arriving while dead closes that cycle as its resurrection. A death at
//! the end of the timeline stays an open cycle.

use crate::models::{Cycle, DeathEvent};
use tracing::debug;

use super::Timeline;

/// Classifier states. `Revived` labels a just-closed cycle; the machine
/// immediately treats it as `Alive` again, so a repository can die and
/// revive any number of times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Alive,
    Dead,
    Revived,
}

/// Run the state machine over one timeline.
///
/// `threshold_days` is always taken from configuration; there is no
/// built-in gap constant here.
pub fn classify(repo: &str, timeline: &Timeline, threshold_days: i64) -> Vec<Cycle> {
    let mut cycles: Vec<Cycle> = Vec::new();
    let mut state = LifecycleState::Alive;

    for pair in timeline.commits().windows(2) {
        let (prev, arrived) = (&pair[0], &pair[1]);

        if state == LifecycleState::Dead {
            // The arriving commit resurrects the repository; its own gap
            // is part of the death already recorded.
            let cycle = cycles.last_mut().expect("Dead state implies a cycle");
            cycle.revival = Some(arrived.clone());
            debug!("{repo}: revival #{} at {}", cycle.index, arrived.timestamp);
            state = LifecycleState::Revived;
            continue;
        }

        // Equal timestamps are a zero gap, never a death.
        let gap_days = (arrived.timestamp - prev.timestamp).num_days();
        if gap_days >= threshold_days {
            let index = cycles.len();
            debug!(
                "{repo}: death #{index} at {} (gap {gap_days}d)",
                prev.timestamp
            );
            cycles.push(Cycle {
                index,
                death: DeathEvent {
                    cycle: index,
                    start_commit: prev.clone(),
                    gap_days,
                },
                revival: None,
            });
            state = LifecycleState::Dead;
        } else {
            state = LifecycleState::Alive;
        }
    }

    cycles
}
