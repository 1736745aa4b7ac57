//! Timer-driven bubble spawning along the bottom edge

use glam::Vec2;
use rand::Rng;

use super::bubble::Bubble;
use super::category::CategoryTable;
use crate::tuning::BubbleTuning;

/// Visible play area in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arena {
    pub width: f32,
    pub height: f32,
}

impl Arena {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }
}

/// Everything a spawn needs besides the timer itself
pub struct SpawnContext<'a, R: Rng + ?Sized> {
    pub arena: Arena,
    pub speed_multiplier: f32,
    pub tuning: &'a BubbleTuning,
    pub categories: &'a CategoryTable,
    pub rng: &'a mut R,
    pub next_id: u32,
}

/// Accumulates frame time and emits at most one bubble per tick
#[derive(Debug, Clone, Default)]
pub struct Spawner {
    accumulator_ms: f32,
}

impl Spawner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accumulated_ms(&self) -> f32 {
        self.accumulator_ms
    }

    pub fn reset(&mut self) {
        self.accumulator_ms = 0.0;
    }

    /// Feed elapsed time. When the accumulator reaches `interval_ms` it is
    /// reset to zero (excess time is dropped, not carried) and one bubble
    /// is created just below the bottom edge.
    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        elapsed_ms: f32,
        interval_ms: f32,
        ctx: SpawnContext<'_, R>,
    ) -> Option<Bubble> {
        if elapsed_ms.is_finite() && elapsed_ms > 0.0 {
            self.accumulator_ms += elapsed_ms;
        }

        if self.accumulator_ms < interval_ms {
            return None;
        }
        self.accumulator_ms = 0.0;

        let SpawnContext {
            arena,
            speed_multiplier,
            tuning,
            categories,
            rng,
            next_id,
        } = ctx;
        let pos = spawn_position(arena, tuning.max_radius, &mut *rng);
        Some(Bubble::spawn(
            next_id,
            pos,
            speed_multiplier,
            tuning,
            categories,
            rng,
        ))
    }

    /// Milliseconds until the next spawn at the given interval
    pub fn time_until_next_spawn(&self, interval_ms: f32) -> f32 {
        (interval_ms - self.accumulator_ms).max(0.0)
    }
}

/// Random x along the bottom edge, inset by `margin` on both sides so the
/// bubble is never clipped horizontally
pub fn spawn_position<R: Rng + ?Sized>(arena: Arena, margin: f32, rng: &mut R) -> Vec2 {
    let span = arena.width - margin * 2.0;
    let x = if span > 0.0 {
        rng.random::<f32>() * span + margin
    } else {
        arena.width / 2.0
    };
    Vec2::new(x, arena.height + margin)
}
