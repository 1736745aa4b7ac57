//! Game state and core simulation types
//!
//! One `GameState` lives for a whole session. Every component receives it
//! (or the piece it needs) explicitly; there is no global state.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::bubble::Bubble;
use super::category::{Category, CategoryTable};
use super::input;
use super::scoring::{LevelUp, Scoring};
use super::spawner::{Arena, Spawner};
use crate::tuning::{Tuning, TuningError};

/// Current phase of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// Frames advance the simulation
    Running,
    /// Frames are skipped, input is ignored
    Paused,
    /// Terminal: no more frames are processed or scheduled
    Stopped,
}

/// Something the host may want to react to (sound, HUD, effects)
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Spawned { id: u32, category: Category },
    Popped {
        id: u32,
        category: Category,
        points: u32,
        pos: Vec2,
        radius: f32,
        score: u64,
    },
    LevelUp(LevelUp),
    /// Floated off the top unpopped
    Expired { id: u32 },
}

/// Result of a successful pointer press
#[derive(Debug, Clone, PartialEq)]
pub struct PopOutcome {
    pub bubble: Bubble,
    pub score: u64,
    pub level_up: Option<LevelUp>,
}

/// Complete session state
#[derive(Debug, Clone)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub rng: Pcg32,
    pub phase: GamePhase,
    pub arena: Arena,
    pub tuning: Tuning,
    pub categories: CategoryTable,
    pub scoring: Scoring,
    pub spawner: Spawner,
    /// Live bubbles in spawn order (last is drawn on top)
    pub bubbles: Vec<Bubble>,
    /// Total simulated time
    pub time_ms: f64,
    /// Events since the last drain
    pub events: Vec<GameEvent>,
    next_id: u32,
}

impl GameState {
    /// Create a running session. Fails if the tuning does not validate.
    pub fn new(seed: u64, tuning: Tuning, arena: Arena) -> Result<Self, TuningError> {
        tuning.validate()?;
        let categories = tuning.category_table()?;

        Ok(Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            phase: GamePhase::Running,
            arena,
            categories,
            scoring: Scoring::new(tuning.difficulty.clone()),
            tuning,
            spawner: Spawner::new(),
            bubbles: Vec::new(),
            time_ms: 0.0,
            events: Vec::new(),
            next_id: 1,
        })
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Peek at the ID the next spawn will receive
    pub(crate) fn peek_entity_id(&self) -> u32 {
        self.next_id
    }

    pub fn score(&self) -> u64 {
        self.scoring.score()
    }

    pub fn is_running(&self) -> bool {
        self.phase == GamePhase::Running
    }

    /// Start over with a fresh seed, keeping tuning and arena
    pub fn restart(&mut self, seed: u64) {
        self.seed = seed;
        self.rng = Pcg32::seed_from_u64(seed);
        self.phase = GamePhase::Running;
        self.scoring = Scoring::new(self.tuning.difficulty.clone());
        self.spawner.reset();
        self.bubbles.clear();
        self.time_ms = 0.0;
        self.events.clear();
        self.next_id = 1;
    }

    /// Canvas resized; affects where future bubbles spawn
    pub fn resize(&mut self, width: f32, height: f32) {
        self.arena = Arena::new(width, height);
    }

    pub fn pause(&mut self) {
        if self.phase == GamePhase::Running {
            self.phase = GamePhase::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.phase == GamePhase::Paused {
            self.phase = GamePhase::Running;
        }
    }

    /// End the session. Irreversible except through `restart`.
    pub fn stop(&mut self) {
        self.phase = GamePhase::Stopped;
    }

    /// Handle one discrete pointer press. Pops at most one bubble: the
    /// most recently spawned one under the pointer.
    pub fn pop_at(&mut self, point: Vec2) -> Option<PopOutcome> {
        if !self.is_running() {
            return None;
        }

        let index = input::resolve(point, &self.bubbles)?;
        let bubble = self.bubbles.remove(index);
        let points = bubble.points();
        let level_up = self.scoring.pop(points);
        let score = self.scoring.score();

        log::debug!(
            "Popped {:?} bubble {} (+{}) -> score {}",
            bubble.category,
            bubble.id,
            points,
            score
        );

        self.events.push(GameEvent::Popped {
            id: bubble.id,
            category: bubble.category,
            points,
            pos: bubble.pos,
            radius: bubble.radius,
            score,
        });
        if let Some(level) = level_up {
            self.events.push(GameEvent::LevelUp(level));
        }

        Some(PopOutcome {
            bubble,
            score,
            level_up,
        })
    }

    /// Take all pending events
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}
