//! Pointer hit-testing against live bubbles

use glam::Vec2;

use super::bubble::Bubble;

/// Index of the bubble under `point`, preferring the most recently
/// spawned (drawn on top) when several overlap.
pub fn resolve(point: Vec2, bubbles: &[Bubble]) -> Option<usize> {
    if !point.is_finite() {
        return None;
    }
    bubbles.iter().rposition(|b| b.contains_point(point))
}
