//! Bubble Pop - tap the bubbles before they float away
//!
//! Core modules:
//! - `sim`: Deterministic simulation (spawning, rising bubbles, hit-testing, scoring)
//! - `tuning`: Data-driven game balance
//! - `renderer`: WebGPU rendering pipeline
//! - `sound`: Sound cues and the looping background melody
//! - `offline`: Static asset cache policy used by the service worker

#[cfg(target_arch = "wasm32")]
pub mod audio;
pub mod offline;
pub mod renderer;
pub mod settings;
pub mod sim;
pub mod sound;
pub mod tuning;

pub use settings::Settings;
pub use tuning::{Tuning, TuningError};

/// Game configuration constants (defaults for `Tuning`)
pub mod consts {
    /// Bubble radius range (pixels)
    pub const MIN_RADIUS: f32 = 25.0;
    pub const MAX_RADIUS: f32 = 40.0;

    /// Per-bubble base speed is drawn from [BASE_SPEED_MIN, BASE_SPEED_MAX)
    pub const BASE_SPEED_MIN: f32 = 0.5;
    pub const BASE_SPEED_MAX: f32 = 1.0;
    /// Pixels risen per millisecond at speed 1.0
    pub const RISE_FACTOR: f32 = 0.06;
    /// Sideways drift per update at the peak of the wobble
    pub const WOBBLE_AMPLITUDE: f32 = 0.5;

    /// Difficulty scaling
    pub const BASE_SPEED_MULTIPLIER: f32 = 1.0;
    pub const SPEED_INCREASE_PER_THRESHOLD: f32 = 0.1;
    pub const SCORE_THRESHOLD: u64 = 100;
    pub const INITIAL_SPAWN_INTERVAL_MS: f32 = 1000.0;
    pub const MIN_SPAWN_INTERVAL_MS: f32 = 500.0;
    pub const SPAWN_INTERVAL_STEP_MS: f32 = 50.0;

    /// Arena used when no canvas is attached (native/headless runs)
    pub const DEFAULT_ARENA_WIDTH: f32 = 800.0;
    pub const DEFAULT_ARENA_HEIGHT: f32 = 600.0;
}

/// Convert a packed 0xRRGGBB color to linear-ish [r, g, b] floats in 0..1
#[inline]
pub fn rgb_from_hex(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}
