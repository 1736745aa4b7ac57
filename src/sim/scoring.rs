//! Score counter and the difficulty step function it drives

use crate::tuning::DifficultyTuning;

/// Reported when a pop pushes the score over a new threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelUp {
    pub threshold_index: u64,
    pub speed_multiplier: f32,
    pub spawn_interval_ms: f32,
}

/// Cumulative score plus the difficulty derived from it.
///
/// Speed and spawn interval are always recomputed from the absolute
/// threshold index, never adjusted incrementally.
#[derive(Debug, Clone, PartialEq)]
pub struct Scoring {
    score: u64,
    threshold_index: u64,
    speed_multiplier: f32,
    spawn_interval_ms: f32,
    tuning: DifficultyTuning,
}

impl Scoring {
    pub fn new(tuning: DifficultyTuning) -> Self {
        Self {
            score: 0,
            threshold_index: 0,
            speed_multiplier: tuning.base_speed,
            spawn_interval_ms: tuning.initial_spawn_interval_ms,
            tuning,
        }
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn threshold_index(&self) -> u64 {
        self.threshold_index
    }

    /// Applied to bubbles created from now on
    pub fn speed_multiplier(&self) -> f32 {
        self.speed_multiplier
    }

    pub fn spawn_interval_ms(&self) -> f32 {
        self.spawn_interval_ms
    }

    /// Speed multiplier for a given threshold index
    pub fn speed_for(tuning: &DifficultyTuning, threshold_index: u64) -> f32 {
        tuning.base_speed + threshold_index as f32 * tuning.speed_increase
    }

    /// Spawn interval for a given threshold index, floored at the minimum
    pub fn interval_for(tuning: &DifficultyTuning, threshold_index: u64) -> f32 {
        let stepped =
            tuning.initial_spawn_interval_ms - threshold_index as f32 * tuning.spawn_interval_step_ms;
        stepped.max(tuning.min_spawn_interval_ms)
    }

    /// Credit a popped bubble's points. Returns the new difficulty if a
    /// threshold was crossed.
    pub fn pop(&mut self, points: u32) -> Option<LevelUp> {
        self.score = self.score.saturating_add(points as u64);

        let index = self.score / self.tuning.score_threshold.max(1);
        if index <= self.threshold_index {
            return None;
        }

        self.threshold_index = index;
        self.speed_multiplier = Self::speed_for(&self.tuning, index);
        self.spawn_interval_ms = Self::interval_for(&self.tuning, index);

        log::info!(
            "Difficulty {} reached at score {}: speed x{:.2}, spawn every {}ms",
            index,
            self.score,
            self.speed_multiplier,
            self.spawn_interval_ms
        );

        Some(LevelUp {
            threshold_index: index,
            speed_multiplier: self.speed_multiplier,
            spawn_interval_ms: self.spawn_interval_ms,
        })
    }
}

impl Default for Scoring {
    fn default() -> Self {
        Self::new(DifficultyTuning::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_single_pop_below_threshold() {
        let mut scoring = Scoring::default();
        assert_eq!(scoring.pop(10), None);
        assert_eq!(scoring.score(), 10);
        assert_eq!(scoring.threshold_index(), 0);
        assert_eq!(scoring.speed_multiplier(), 1.0);
        assert_eq!(scoring.spawn_interval_ms(), 1000.0);
    }

    #[test]
    fn test_threshold_crossing_raises_speed() {
        let mut scoring = Scoring::default();
        for _ in 0..3 {
            assert!(scoring.pop(30).is_none());
        }
        let level = scoring.pop(10).expect("score 100 crosses the first threshold");
        assert_eq!(scoring.score(), 100);
        assert_eq!(level.threshold_index, 1);
        assert!((level.speed_multiplier - 1.1).abs() < 1e-6);
        assert_eq!(level.spawn_interval_ms, 950.0);
    }

    #[test]
    fn test_big_pop_can_skip_thresholds() {
        let mut scoring = Scoring::new(DifficultyTuning {
            score_threshold: 20,
            ..DifficultyTuning::default()
        });
        let level = scoring.pop(50).unwrap();
        assert_eq!(level.threshold_index, 2);
        assert!((level.speed_multiplier - 1.2).abs() < 1e-6);
        assert_eq!(level.spawn_interval_ms, 900.0);
    }

    #[test]
    fn test_spawn_interval_floors_at_minimum() {
        let tuning = DifficultyTuning::default();
        assert_eq!(Scoring::interval_for(&tuning, 10), 500.0);
        assert_eq!(Scoring::interval_for(&tuning, 1_000), 500.0);
        assert_eq!(Scoring::interval_for(&tuning, 9), 550.0);
    }

    #[test]
    fn test_recompute_is_absolute() {
        // Many small pops land on exactly the value one jump would produce
        let tuning = DifficultyTuning::default();
        let mut scoring = Scoring::new(tuning.clone());
        for _ in 0..700 {
            scoring.pop(10);
        }
        assert_eq!(scoring.threshold_index(), 70);
        assert_eq!(scoring.speed_multiplier(), Scoring::speed_for(&tuning, 70));
    }

    proptest! {
        #[test]
        fn prop_difficulty_is_monotonic(pops in proptest::collection::vec(prop_oneof![
            Just(10u32), Just(15), Just(20), Just(25), Just(30), Just(50)
        ], 0..300)) {
            let mut scoring = Scoring::default();
            let mut last_index = 0;
            let mut last_speed = scoring.speed_multiplier();
            let mut last_interval = scoring.spawn_interval_ms();
            let mut last_score = 0;
            for points in pops {
                scoring.pop(points);
                prop_assert!(scoring.score() >= last_score);
                prop_assert!(scoring.threshold_index() >= last_index);
                prop_assert!(scoring.speed_multiplier() >= last_speed);
                prop_assert!(scoring.spawn_interval_ms() <= last_interval);
                prop_assert_eq!(scoring.threshold_index(), scoring.score() / 100);
                last_score = scoring.score();
                last_index = scoring.threshold_index();
                last_speed = scoring.speed_multiplier();
                last_interval = scoring.spawn_interval_ms();
            }
        }
    }
}
