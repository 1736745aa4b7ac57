//! Data-driven game balance
//!
//! Every constant that shapes play lives here so it can be tweaked from
//! `assets/tuning.json` without recompiling. A `Tuning` must pass
//! [`Tuning::validate`] before a game is built from it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;
use crate::sim::category::{Category, CategoryTable, CategoryWeight, DEFAULT_WEIGHTS};

/// Reasons a tuning file is rejected at load time
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TuningError {
    #[error("failed to parse tuning: {0}")]
    Parse(String),
    #[error("category table is empty")]
    EmptyCategoryTable,
    #[error("category weights sum to zero")]
    ZeroTotalWeight,
    #[error("category weights overflow u32")]
    WeightOverflow,
    #[error("category {0:?} listed more than once")]
    DuplicateCategory(Category),
    #[error("radius range [{min}, {max}] is invalid")]
    RadiusRange { min: f32, max: f32 },
    #[error("base speed range [{min}, {max}) is invalid")]
    SpeedRange { min: f32, max: f32 },
    #[error("{name} must be positive and finite (got {value})")]
    NotPositive { name: &'static str, value: f32 },
    #[error("{name} must be non-negative and finite (got {value})")]
    Negative { name: &'static str, value: f32 },
    #[error("score threshold must be at least 1")]
    ZeroScoreThreshold,
    #[error("minimum spawn interval {min}ms exceeds initial interval {initial}ms")]
    SpawnIntervalFloor { initial: f32, min: f32 },
}

/// Bubble shape and motion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BubbleTuning {
    pub min_radius: f32,
    pub max_radius: f32,
    pub base_speed_min: f32,
    pub base_speed_max: f32,
    pub rise_factor: f32,
    pub wobble_amplitude: f32,
}

impl Default for BubbleTuning {
    fn default() -> Self {
        Self {
            min_radius: MIN_RADIUS,
            max_radius: MAX_RADIUS,
            base_speed_min: BASE_SPEED_MIN,
            base_speed_max: BASE_SPEED_MAX,
            rise_factor: RISE_FACTOR,
            wobble_amplitude: WOBBLE_AMPLITUDE,
        }
    }
}

/// Score-driven difficulty step function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyTuning {
    pub base_speed: f32,
    pub speed_increase: f32,
    pub score_threshold: u64,
    pub initial_spawn_interval_ms: f32,
    pub min_spawn_interval_ms: f32,
    pub spawn_interval_step_ms: f32,
}

impl Default for DifficultyTuning {
    fn default() -> Self {
        Self {
            base_speed: BASE_SPEED_MULTIPLIER,
            speed_increase: SPEED_INCREASE_PER_THRESHOLD,
            score_threshold: SCORE_THRESHOLD,
            initial_spawn_interval_ms: INITIAL_SPAWN_INTERVAL_MS,
            min_spawn_interval_ms: MIN_SPAWN_INTERVAL_MS,
            spawn_interval_step_ms: SPAWN_INTERVAL_STEP_MS,
        }
    }
}

/// Complete balance data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub bubble: BubbleTuning,
    pub difficulty: DifficultyTuning,
    pub categories: Vec<CategoryWeight>,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            bubble: BubbleTuning::default(),
            difficulty: DifficultyTuning::default(),
            categories: DEFAULT_WEIGHTS.to_vec(),
        }
    }
}

fn positive(name: &'static str, value: f32) -> Result<(), TuningError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(TuningError::NotPositive { name, value })
    }
}

fn non_negative(name: &'static str, value: f32) -> Result<(), TuningError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(TuningError::Negative { name, value })
    }
}

impl Tuning {
    /// Parse and validate a JSON tuning document
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning =
            serde_json::from_str(json).map_err(|e| TuningError::Parse(e.to_string()))?;
        tuning.validate()?;
        log::info!(
            "Loaded tuning: {} categories, threshold {}",
            tuning.categories.len(),
            tuning.difficulty.score_threshold
        );
        Ok(tuning)
    }

    /// Reject anything that would make the simulation divide by zero,
    /// loop forever, or produce non-positive speeds
    pub fn validate(&self) -> Result<(), TuningError> {
        let b = &self.bubble;
        if !(b.min_radius.is_finite() && b.max_radius.is_finite())
            || b.min_radius <= 0.0
            || b.max_radius < b.min_radius
        {
            return Err(TuningError::RadiusRange {
                min: b.min_radius,
                max: b.max_radius,
            });
        }
        if !(b.base_speed_min.is_finite() && b.base_speed_max.is_finite())
            || b.base_speed_min <= 0.0
            || b.base_speed_max < b.base_speed_min
        {
            return Err(TuningError::SpeedRange {
                min: b.base_speed_min,
                max: b.base_speed_max,
            });
        }
        positive("rise_factor", b.rise_factor)?;
        non_negative("wobble_amplitude", b.wobble_amplitude)?;

        let d = &self.difficulty;
        positive("base_speed", d.base_speed)?;
        non_negative("speed_increase", d.speed_increase)?;
        if d.score_threshold == 0 {
            return Err(TuningError::ZeroScoreThreshold);
        }
        positive("initial_spawn_interval_ms", d.initial_spawn_interval_ms)?;
        positive("min_spawn_interval_ms", d.min_spawn_interval_ms)?;
        non_negative("spawn_interval_step_ms", d.spawn_interval_step_ms)?;
        if d.min_spawn_interval_ms > d.initial_spawn_interval_ms {
            return Err(TuningError::SpawnIntervalFloor {
                initial: d.initial_spawn_interval_ms,
                min: d.min_spawn_interval_ms,
            });
        }

        self.category_table().map(|_| ())
    }

    /// Build the weighted category table described by this tuning
    pub fn category_table(&self) -> Result<CategoryTable, TuningError> {
        CategoryTable::new(self.categories.clone())
    }
}
