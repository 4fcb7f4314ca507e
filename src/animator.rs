//! Status transition tracking. Devices whose status just flipped render in
//! an intermediate "transitioning" phase for a short window so operators can
//! see the change happen rather than tab back to a silently different map.

use crate::model::DeviceStatus;
use crate::reconcile::ChangeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodePhase {
    Steady,
    Transitioning,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransitionEvent {
    pub id: String,
    pub to: DeviceStatus,
    pub at_ms: u64,
}

/// Records status flips from each reconcile cycle and answers, for a given
/// wall-clock instant, whether a node is still inside its transition window.
/// Events older than the horizon are pruned lazily on each `record`.
#[derive(Debug, Clone)]
pub struct StatusAnimator {
    window_ms: u64,
    horizon_ms: u64,
    events: Vec<TransitionEvent>,
}

impl StatusAnimator {
    pub fn new(window_ms: u64, horizon_ms: u64) -> Self {
        Self {
            window_ms,
            horizon_ms,
            events: Vec::new(),
        }
    }

    pub fn record(&mut self, changes: &ChangeSet, now_ms: u64) {
        self.events
            .retain(|event| now_ms.saturating_sub(event.at_ms) < self.horizon_ms);
        for (id, status) in &changes.status_updates {
            // a newer flip restarts the window for that node
            self.events.retain(|event| &event.id != id);
            self.events.push(TransitionEvent {
                id: id.clone(),
                to: *status,
                at_ms: now_ms,
            });
        }
    }

    pub fn phase(&self, id: &str, now_ms: u64) -> NodePhase {
        let transitioning = self.events.iter().any(|event| {
            event.id == id && now_ms.saturating_sub(event.at_ms) < self.window_ms
        });
        if transitioning {
            NodePhase::Transitioning
        } else {
            NodePhase::Steady
        }
    }

    /// The phase plus target status, for renderers that style the
    /// intermediate state by destination.
    pub fn transition_target(&self, id: &str, now_ms: u64) -> Option<DeviceStatus> {
        self.events
            .iter()
            .find(|event| {
                event.id == id && now_ms.saturating_sub(event.at_ms) < self.window_ms
            })
            .map(|event| event.to)
    }

    pub fn pending(&self) -> usize {
        self.events.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flip(id: &str, to: DeviceStatus) -> ChangeSet {
        ChangeSet {
            status_updates: vec![(id.to_string(), to)],
            ..ChangeSet::default()
        }
    }

    #[test]
    fn node_transitions_then_settles() {
        let mut animator = StatusAnimator::new(1500, 30_000);
        animator.record(&flip("10.0.0.1", DeviceStatus::Off), 10_000);
        assert_eq!(animator.phase("10.0.0.1", 10_100), NodePhase::Transitioning);
        assert_eq!(
            animator.transition_target("10.0.0.1", 10_100),
            Some(DeviceStatus::Off)
        );
        assert_eq!(animator.phase("10.0.0.1", 11_500), NodePhase::Steady);
    }

    #[test]
    fn untouched_nodes_stay_steady() {
        let mut animator = StatusAnimator::new(1500, 30_000);
        animator.record(&flip("10.0.0.1", DeviceStatus::On), 0);
        assert_eq!(animator.phase("10.0.0.2", 100), NodePhase::Steady);
    }

    #[test]
    fn newer_flip_restarts_the_window() {
        let mut animator = StatusAnimator::new(1500, 30_000);
        animator.record(&flip("10.0.0.1", DeviceStatus::Off), 0);
        animator.record(&flip("10.0.0.1", DeviceStatus::On), 1_000);
        assert_eq!(animator.pending(), 1);
        assert_eq!(animator.phase("10.0.0.1", 2_000), NodePhase::Transitioning);
        assert_eq!(
            animator.transition_target("10.0.0.1", 2_000),
            Some(DeviceStatus::On)
        );
    }

    #[test]
    fn events_past_the_horizon_are_pruned() {
        let mut animator = StatusAnimator::new(1500, 30_000);
        animator.record(&flip("10.0.0.1", DeviceStatus::Off), 0);
        animator.record(&ChangeSet::default(), 31_000);
        assert_eq!(animator.pending(), 0);
    }

    #[test]
    fn clock_going_backwards_does_not_panic() {
        let mut animator = StatusAnimator::new(1500, 30_000);
        animator.record(&flip("10.0.0.1", DeviceStatus::Off), 10_000);
        // saturating arithmetic treats an earlier instant as in-window
        assert_eq!(animator.phase("10.0.0.1", 9_000), NodePhase::Transitioning);
    }
}
