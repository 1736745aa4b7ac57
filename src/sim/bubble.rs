//! A single rising, poppable bubble

use glam::Vec2;
use rand::Rng;
use std::f32::consts::TAU;

use super::category::{Category, CategoryTable};
use crate::consts::{RISE_FACTOR, WOBBLE_AMPLITUDE};
use crate::tuning::BubbleTuning;

/// A bubble entity. Owned exclusively by `GameState::bubbles`.
#[derive(Debug, Clone, PartialEq)]
pub struct Bubble {
    pub id: u32,
    /// Center in arena pixels (y grows downward, bubbles rise toward y = 0)
    pub pos: Vec2,
    pub radius: f32,
    /// Base speed times the difficulty multiplier at creation time
    pub speed: f32,
    pub category: Category,
    /// Sideways oscillation phase (radians)
    pub wobble: f32,
    pub wobble_speed: f32,
    /// Highlight shimmer phase, render only
    pub shimmer: f32,
    pub shimmer_speed: f32,
    rise_factor: f32,
    wobble_amplitude: f32,
}

impl Bubble {
    /// Bubble with explicit attributes and no wobble
    pub fn new(id: u32, pos: Vec2, radius: f32, speed: f32, category: Category) -> Self {
        Self {
            id,
            pos,
            radius,
            speed,
            category,
            wobble: 0.0,
            wobble_speed: 0.0,
            shimmer: 0.0,
            shimmer_speed: 0.0,
            rise_factor: RISE_FACTOR,
            wobble_amplitude: WOBBLE_AMPLITUDE,
        }
    }

    /// Create a bubble with randomized size, speed, wobble and category.
    ///
    /// `speed_multiplier` is captured now; later difficulty changes never
    /// touch bubbles that are already alive.
    pub fn spawn<R: Rng + ?Sized>(
        id: u32,
        pos: Vec2,
        speed_multiplier: f32,
        tuning: &BubbleTuning,
        categories: &CategoryTable,
        rng: &mut R,
    ) -> Self {
        let radius =
            tuning.min_radius + rng.random::<f32>() * (tuning.max_radius - tuning.min_radius);
        let base_speed = tuning.base_speed_min
            + rng.random::<f32>() * (tuning.base_speed_max - tuning.base_speed_min);
        let wobble = rng.random::<f32>() * TAU;
        let wobble_speed = rng.random::<f32>() * 0.02 + 0.01;
        let category = categories.sample(rng);
        let shimmer_speed = rng.random::<f32>() * 0.05 + 0.02;

        Self {
            id,
            pos,
            radius,
            speed: base_speed * speed_multiplier,
            category,
            wobble,
            wobble_speed,
            shimmer: 0.0,
            shimmer_speed,
            rise_factor: tuning.rise_factor,
            wobble_amplitude: tuning.wobble_amplitude,
        }
    }

    pub fn points(&self) -> u32 {
        self.category.points()
    }

    /// Advance one frame. Returns false once the bubble has left the top
    /// of the arena and should be removed.
    pub fn update(&mut self, elapsed_ms: f32) -> bool {
        let elapsed_ms = if elapsed_ms.is_finite() {
            elapsed_ms.max(0.0)
        } else {
            0.0
        };

        self.pos.y -= self.speed * elapsed_ms * self.rise_factor;

        self.wobble = (self.wobble + self.wobble_speed).rem_euclid(TAU);
        self.pos.x += self.wobble.sin() * self.wobble_amplitude;
        self.shimmer = (self.shimmer + self.shimmer_speed).rem_euclid(TAU);

        !self.is_off_screen()
    }

    /// Entirely above the visible area
    pub fn is_off_screen(&self) -> bool {
        self.pos.y < -self.radius * 2.0
    }

    /// Inclusive circle hit-test
    pub fn contains_point(&self, point: Vec2) -> bool {
        self.pos.distance(point) <= self.radius
    }
}
