//! Edge-triggered press/release derived from continuous axis values.

use crate::axis::AxisState;

/// How a stream decides whether the tool is touching the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactPolicy {
    /// Pen: pressure strictly above the threshold.
    Pressure { threshold: i32 },
    /// Touch: the primary slot holds a live tracking id.
    TrackingId,
}

impl ContactPolicy {
    pub fn is_touching(&self, axes: &AxisState) -> bool {
        match self {
            ContactPolicy::Pressure { threshold } => axes.pressure > *threshold,
            ContactPolicy::TrackingId => axes.tracking_id >= 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Press,
    Release,
}

/// Remembers the last contact state so only transitions are reported.
#[derive(Debug, Clone)]
pub struct ContactTracker {
    policy: ContactPolicy,
    down: bool,
}

impl ContactTracker {
    pub fn new(policy: ContactPolicy) -> Self {
        Self {
            policy,
            down: false,
        }
    }

    pub fn is_down(&self) -> bool {
        self.down
    }

    pub fn update(&mut self, axes: &AxisState) -> Option<Edge> {
        let now = self.policy.is_touching(axes);
        if now == self.down {
            return None;
        }
        self.down = now;
        Some(if now { Edge::Press } else { Edge::Release })
    }
}
