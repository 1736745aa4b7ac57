//! Per-frame simulation step
//!
//! The host calls [`tick`] once per display frame with the time elapsed
//! since the previous one, renders `state.bubbles`, then schedules the next
//! frame only if the report says to keep running.

use super::spawner::SpawnContext;
use super::state::{GameEvent, GamePhase, GameState};

/// Derives elapsed time from the host's monotonically increasing
/// frame timestamps
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    last_ms: Option<f64>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Elapsed ms since the previous call. The first call after creation
    /// or `reset` yields 0, as do backwards or non-finite timestamps.
    pub fn advance(&mut self, timestamp_ms: f64) -> f32 {
        if !timestamp_ms.is_finite() {
            return 0.0;
        }
        let elapsed = match self.last_ms {
            Some(last) if timestamp_ms > last => (timestamp_ms - last) as f32,
            _ => 0.0,
        };
        self.last_ms = Some(match self.last_ms {
            Some(last) => last.max(timestamp_ms),
            None => timestamp_ms,
        });
        elapsed
    }

    /// Forget the previous timestamp (after a pause, so the gap is not
    /// replayed as one giant frame)
    pub fn reset(&mut self) {
        self.last_ms = None;
    }
}

/// What happened during one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    /// A bubble was spawned this frame
    pub spawned: bool,
    /// Bubbles removed for leaving the arena
    pub expired: usize,
    /// Time left before the spawner fires again
    pub next_spawn_in_ms: f32,
    /// False once the session is stopped; the host must not schedule more frames
    pub keep_running: bool,
}

/// Advance the session by one frame: spawn, then update every bubble in
/// reverse order, dropping those that float away.
pub fn tick(state: &mut GameState, elapsed_ms: f32) -> FrameReport {
    let interval = state.scoring.spawn_interval_ms();

    match state.phase {
        GamePhase::Stopped => {
            return FrameReport {
                spawned: false,
                expired: 0,
                next_spawn_in_ms: state.spawner.time_until_next_spawn(interval),
                keep_running: false,
            };
        }
        GamePhase::Paused => {
            return FrameReport {
                spawned: false,
                expired: 0,
                next_spawn_in_ms: state.spawner.time_until_next_spawn(interval),
                keep_running: true,
            };
        }
        GamePhase::Running => {}
    }

    let elapsed_ms = if elapsed_ms.is_finite() {
        elapsed_ms.max(0.0)
    } else {
        0.0
    };
    state.time_ms += elapsed_ms as f64;

    // Spawn
    let next_id = state.peek_entity_id();
    let ctx = SpawnContext {
        arena: state.arena,
        speed_multiplier: state.scoring.speed_multiplier(),
        tuning: &state.tuning.bubble,
        categories: &state.categories,
        rng: &mut state.rng,
        next_id,
    };
    let spawned = match state.spawner.tick(elapsed_ms, interval, ctx) {
        Some(bubble) => {
            state.next_entity_id();
            log::debug!(
                "Spawned {:?} bubble {} at ({:.0}, {:.0}) r={:.1} speed={:.2}",
                bubble.category,
                bubble.id,
                bubble.pos.x,
                bubble.pos.y,
                bubble.radius,
                bubble.speed
            );
            state.events.push(GameEvent::Spawned {
                id: bubble.id,
                category: bubble.category,
            });
            state.bubbles.push(bubble);
            true
        }
        None => false,
    };

    // Update, newest first; removing index i never shifts the unvisited
    // indices below it
    let mut expired = 0;
    for i in (0..state.bubbles.len()).rev() {
        if !state.bubbles[i].update(elapsed_ms) {
            let bubble = state.bubbles.remove(i);
            state.events.push(GameEvent::Expired { id: bubble.id });
            expired += 1;
        }
    }

    FrameReport {
        spawned,
        expired,
        next_spawn_in_ms: state
            .spawner
            .time_until_next_spawn(state.scoring.spawn_interval_ms()),
        keep_running: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;
    use crate::sim::bubble::Bubble;
    use crate::sim::category::Category;
    use crate::sim::spawner::Arena;
    use crate::tuning::Tuning;
    use glam::Vec2;

    const FRAME_MS: f32 = 1000.0 / 60.0;

    fn new_state(seed: u64) -> GameState {
        GameState::new(
            seed,
            Tuning::default(),
            Arena::new(DEFAULT_ARENA_WIDTH, DEFAULT_ARENA_HEIGHT),
        )
        .unwrap()
    }

    #[test]
    fn test_frame_clock_first_call_is_zero() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.advance(5000.0), 0.0);
        assert_eq!(clock.advance(5016.0), 16.0);
    }

    #[test]
    fn test_frame_clock_rejects_anomalies() {
        let mut clock = FrameClock::new();
        clock.advance(1000.0);
        assert_eq!(clock.advance(900.0), 0.0);
        // Backwards jump does not rewind the reference point
        assert_eq!(clock.advance(1010.0), 10.0);
        assert_eq!(clock.advance(f64::NAN), 0.0);
        assert_eq!(clock.advance(1020.0), 10.0);

        clock.reset();
        assert_eq!(clock.advance(60_000.0), 0.0);
    }

    #[test]
    fn test_first_spawn_after_interval() {
        let mut state = new_state(1);
        let report = tick(&mut state, 999.0);
        assert!(!report.spawned);
        assert!((report.next_spawn_in_ms - 1.0).abs() < 1e-3);

        let report = tick(&mut state, 1.0);
        assert!(report.spawned);
        assert_eq!(state.bubbles.len(), 1);
        assert_eq!(state.bubbles[0].id, 1);
        assert_eq!(report.next_spawn_in_ms, INITIAL_SPAWN_INTERVAL_MS);
    }

    #[test]
    fn test_stall_spawns_exactly_one() {
        let mut state = new_state(1);
        let report = tick(&mut state, 1500.0);
        assert!(report.spawned);
        assert_eq!(state.bubbles.len(), 1);
        assert_eq!(state.spawner.accumulated_ms(), 0.0);

        let report = tick(&mut state, 0.0);
        assert!(!report.spawned);
        assert_eq!(state.bubbles.len(), 1);
    }

    #[test]
    fn test_expired_bubbles_removed_without_skipping() {
        let mut state = new_state(1);
        // Alternate doomed and healthy bubbles
        for i in 0..6u32 {
            let y = if i % 2 == 0 { -100.0 } else { 300.0 };
            state
                .bubbles
                .push(Bubble::new(i + 1, Vec2::new(100.0, y), 30.0, 1.0, Category::Red));
        }

        let report = tick(&mut state, FRAME_MS);
        assert_eq!(report.expired, 3);
        let ids: Vec<u32> = state.bubbles.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![2, 4, 6]);

        let expired: Vec<u32> = state
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                GameEvent::Expired { id } => Some(id),
                _ => None,
            })
            .collect();
        assert_eq!(expired, vec![5, 3, 1]);
    }

    #[test]
    fn test_every_bubble_eventually_expires() {
        let mut state = new_state(7);
        for _ in 0..(60 * 30) {
            tick(&mut state, FRAME_MS);
        }
        // Keep the spawner from ever firing so only old bubbles remain
        let ids_alive: Vec<u32> = state.bubbles.iter().map(|b| b.id).collect();
        for _ in 0..(60 * 60) {
            state.spawner.reset();
            tick(&mut state, FRAME_MS);
        }
        assert!(
            state.bubbles.iter().all(|b| !ids_alive.contains(&b.id)),
            "bubbles from the first half minute should all have floated away"
        );
    }

    #[test]
    fn test_new_bubbles_use_current_speed_multiplier() {
        let mut state = new_state(3);
        tick(&mut state, 1000.0);
        let slow_speed = state.bubbles[0].speed;

        // Jump ten thresholds
        state.scoring.pop(1000);
        let multiplier = state.scoring.speed_multiplier();
        assert!((multiplier - 2.0).abs() < 1e-5);

        // The interval shrank to the 500ms floor
        tick(&mut state, 500.0);
        assert_eq!(state.bubbles.len(), 2);
        assert_eq!(state.bubbles[0].speed, slow_speed);
        assert!(state.bubbles[1].speed >= BASE_SPEED_MIN * multiplier - 1e-5);
    }

    #[test]
    fn test_paused_state_is_frozen() {
        let mut state = new_state(1);
        tick(&mut state, 1000.0);
        let before = state.bubbles.clone();

        state.pause();
        let report = tick(&mut state, 5000.0);
        assert!(report.keep_running);
        assert!(!report.spawned);
        assert_eq!(state.bubbles, before);

        state.resume();
        tick(&mut state, FRAME_MS);
        assert!(state.bubbles[0].pos.y < before[0].pos.y);
    }

    #[test]
    fn test_stopped_state_requests_no_more_frames() {
        let mut state = new_state(1);
        tick(&mut state, 1000.0);
        state.stop();
        let before = state.bubbles.clone();
        let report = tick(&mut state, 2000.0);
        assert!(!report.keep_running);
        assert!(!report.spawned);
        assert_eq!(state.bubbles, before);
    }

    #[test]
    fn test_determinism() {
        // Two states with same seed should produce identical results
        let mut state1 = new_state(99999);
        let mut state2 = new_state(99999);

        for frame in 0..600 {
            let elapsed = FRAME_MS + (frame % 3) as f32;
            tick(&mut state1, elapsed);
            tick(&mut state2, elapsed);
            if frame % 40 == 0 {
                if let Some(b) = state1.bubbles.last().cloned() {
                    state1.pop_at(b.pos);
                    state2.pop_at(b.pos);
                }
            }
        }

        assert_eq!(state1.score(), state2.score());
        assert_eq!(state1.bubbles, state2.bubbles);
    }
}
