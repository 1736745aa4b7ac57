//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Seeded RNG only
//! - Elapsed time is supplied by the host, never read from a clock
//! - Stable iteration order (bubbles kept in spawn order)
//! - No rendering, audio or platform dependencies

pub mod bubble;
pub mod category;
pub mod input;
pub mod scoring;
pub mod spawner;
pub mod state;
pub mod tick;

pub use bubble::Bubble;
pub use category::{BubbleStyle, Category, CategoryTable, CategoryWeight};
pub use scoring::{LevelUp, Scoring};
pub use spawner::{Arena, SpawnContext, Spawner};
pub use state::{GameEvent, GamePhase, GameState, PopOutcome};
pub use tick::{FrameClock, FrameReport, tick};
