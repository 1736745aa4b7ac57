//! Sound cue definitions and the background melody scheduler
//!
//! Everything here is plain data plus arithmetic so it can be tested
//! natively. `audio::AudioManager` turns it into Web Audio nodes.

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundEffect {
    /// Ordinary bubble popped - quick downward chirp
    Pop,
    /// Rainbow bubble popped - ascending C major arpeggio
    RainbowPop,
}

/// Oscillator shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Triangle,
}

/// How a tone's frequency moves over its lifetime
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pitch {
    /// Exponential sweep from one frequency to another over the sweep time
    Glide { from_hz: f32, to_hz: f32, over_s: f64 },
    /// Hard steps through a list of frequencies, one every `step_s`
    Steps { notes: &'static [f32], step_s: f64 },
}

impl Pitch {
    /// Frequency `t` seconds after the tone starts
    pub fn frequency_at(&self, t: f64) -> f32 {
        match *self {
            Pitch::Glide {
                from_hz,
                to_hz,
                over_s,
            } => {
                if over_s <= 0.0 || t >= over_s {
                    return to_hz;
                }
                let k = (t.max(0.0) / over_s) as f32;
                from_hz * (to_hz / from_hz).powf(k)
            }
            Pitch::Steps { notes, step_s } => {
                if notes.is_empty() {
                    return 0.0;
                }
                let step = if step_s > 0.0 {
                    (t.max(0.0) / step_s) as usize
                } else {
                    0
                };
                notes[step.min(notes.len() - 1)]
            }
        }
    }
}

/// One oscillator voice with a decaying gain envelope
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub waveform: Waveform,
    pub pitch: Pitch,
    /// Gain at the start, before volume scaling
    pub peak_gain: f32,
    /// Gain reached (exponentially) at the end
    pub floor_gain: f32,
    pub duration_s: f64,
}

/// C4 E4 G4 C5
pub const RAINBOW_ARPEGGIO: [f32; 4] = [261.63, 329.63, 392.00, 523.25];

impl SoundEffect {
    pub fn tone(self) -> Tone {
        match self {
            SoundEffect::Pop => Tone {
                waveform: Waveform::Sine,
                pitch: Pitch::Glide {
                    from_hz: 800.0,
                    to_hz: 400.0,
                    over_s: 0.1,
                },
                peak_gain: 0.2,
                floor_gain: 0.01,
                duration_s: 0.1,
            },
            SoundEffect::RainbowPop => Tone {
                waveform: Waveform::Sine,
                pitch: Pitch::Steps {
                    notes: &RAINBOW_ARPEGGIO,
                    step_s: 0.05,
                },
                peak_gain: 0.3,
                floor_gain: 0.01,
                duration_s: 0.3,
            },
        }
    }
}

/// Gain of the shared music bus
pub const MUSIC_GAIN: f32 = 0.3;
/// Sustain level of each melody note
pub const NOTE_LEVEL: f32 = 0.1;
/// Attack and release ramp length
pub const NOTE_RAMP_S: f64 = 0.01;
/// How early the next pass is handed to the audio clock
pub const MELODY_LOOKAHEAD_S: f64 = 0.1;
/// Voice of every melody note
pub const MELODY_WAVEFORM: Waveform = Waveform::Triangle;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MelodyNote {
    pub freq_hz: f32,
    pub duration_s: f64,
}

const fn note(freq_hz: f32, duration_s: f64) -> MelodyNote {
    MelodyNote {
        freq_hz,
        duration_s,
    }
}

const C4: f32 = 261.63;
const D4: f32 = 293.66;
const E4: f32 = 329.63;
const F4: f32 = 349.23;
const G4: f32 = 392.00;

/// The looping background tune
pub const MELODY: [MelodyNote; 14] = [
    note(C4, 0.25),
    note(D4, 0.25),
    note(E4, 0.25),
    note(C4, 0.25),
    note(C4, 0.25),
    note(D4, 0.25),
    note(E4, 0.25),
    note(C4, 0.25),
    note(E4, 0.25),
    note(F4, 0.25),
    note(G4, 0.5),
    note(E4, 0.25),
    note(F4, 0.25),
    note(G4, 0.5),
];

/// Length of one pass through `MELODY`
pub fn melody_length_s() -> f64 {
    MELODY.iter().map(|n| n.duration_s).sum()
}

/// A melody note pinned to the audio clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledNote {
    pub freq_hz: f32,
    pub start_s: f64,
    pub duration_s: f64,
}

impl ScheduledNote {
    pub fn end_s(&self) -> f64 {
        self.start_s + self.duration_s
    }

    /// Linear gain breakpoints: silent, ramp up, hold, ramp down to silent
    pub fn envelope(&self) -> [(f64, f32); 4] {
        let ramp = NOTE_RAMP_S.min(self.duration_s / 2.0);
        [
            (self.start_s, 0.0),
            (self.start_s + ramp, NOTE_LEVEL),
            (self.end_s() - ramp, NOTE_LEVEL),
            (self.end_s(), 0.0),
        ]
    }
}

/// Result of one `MelodyLoop::poll`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MelodyPoll {
    /// Notes to hand to the audio backend now
    pub notes: Vec<ScheduledNote>,
    /// Seconds until the next poll has work to do; `None` when stopped
    pub next_in_s: Option<f64>,
}

/// Schedules back-to-back passes of the melody against an audio clock.
///
/// Poll it every frame with the audio clock's current time. Each pass is
/// handed out once, slightly ahead of time, and starts exactly where the
/// previous one ends unless the host fell behind.
#[derive(Debug, Clone, Default)]
pub struct MelodyLoop {
    /// Start of the next unscheduled pass; `None` when stopped
    next_pass_s: Option<f64>,
    passes: u64,
}

impl MelodyLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_playing(&self) -> bool {
        self.next_pass_s.is_some()
    }

    /// Passes scheduled since the last `start`
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Begin looping; the first pass is scheduled on the next poll.
    /// No-op while already playing.
    pub fn start(&mut self, now_s: f64) {
        if self.next_pass_s.is_none() {
            self.next_pass_s = Some(now_s);
            self.passes = 0;
            log::debug!("Melody started at {:.3}s", now_s);
        }
    }

    /// Stop scheduling. Notes already handed out still play to their end.
    pub fn stop(&mut self) {
        if self.next_pass_s.take().is_some() {
            log::debug!("Melody stopped after {} passes", self.passes);
        }
    }

    pub fn poll(&mut self, now_s: f64) -> MelodyPoll {
        let Some(next_pass) = self.next_pass_s else {
            return MelodyPoll::default();
        };
        if !now_s.is_finite() {
            return MelodyPoll {
                notes: Vec::new(),
                next_in_s: Some(0.0),
            };
        }

        if now_s + MELODY_LOOKAHEAD_S < next_pass {
            return MelodyPoll {
                notes: Vec::new(),
                next_in_s: Some(next_pass - MELODY_LOOKAHEAD_S - now_s),
            };
        }

        // Never schedule into the past after a stall
        let mut t = next_pass.max(now_s);
        let mut notes = Vec::with_capacity(MELODY.len());
        for n in MELODY.iter() {
            notes.push(ScheduledNote {
                freq_hz: n.freq_hz,
                start_s: t,
                duration_s: n.duration_s,
            });
            t += n.duration_s;
        }
        self.next_pass_s = Some(t);
        self.passes += 1;

        MelodyPoll {
            notes,
            next_in_s: Some((t - MELODY_LOOKAHEAD_S - now_s).max(0.0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_glides_down() {
        let tone = SoundEffect::Pop.tone();
        assert_eq!(tone.waveform, Waveform::Sine);
        assert_eq!(tone.pitch.frequency_at(0.0), 800.0);
        assert!((tone.pitch.frequency_at(0.05) - 565.685).abs() < 0.01);
        assert_eq!(tone.pitch.frequency_at(0.1), 400.0);
        assert_eq!(tone.peak_gain, 0.2);
        assert_eq!(tone.duration_s, 0.1);
    }

    #[test]
    fn test_rainbow_steps_through_arpeggio() {
        let tone = SoundEffect::RainbowPop.tone();
        let heard: Vec<f32> = [0.0, 0.06, 0.11, 0.16, 0.29]
            .iter()
            .map(|&t| tone.pitch.frequency_at(t))
            .collect();
        assert_eq!(heard, vec![261.63, 329.63, 392.00, 523.25, 523.25]);
        assert_eq!(tone.peak_gain, 0.3);
        assert_eq!(tone.duration_s, 0.3);
    }

    #[test]
    fn test_melody_length() {
        assert!((melody_length_s() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_melody_voice_differs_from_cues() {
        assert_eq!(MELODY_WAVEFORM, Waveform::Triangle);
        assert_ne!(SoundEffect::Pop.tone().waveform, MELODY_WAVEFORM);
    }

    #[test]
    fn test_note_envelope() {
        let n = ScheduledNote {
            freq_hz: C4,
            start_s: 2.0,
            duration_s: 0.25,
        };
        let env = n.envelope();
        assert_eq!(env[0], (2.0, 0.0));
        assert!((env[1].0 - 2.01).abs() < 1e-9);
        assert_eq!(env[1].1, NOTE_LEVEL);
        assert!((env[2].0 - 2.24).abs() < 1e-9);
        assert_eq!(env[3], (2.25, 0.0));
    }

    #[test]
    fn test_stopped_loop_schedules_nothing() {
        let mut melody = MelodyLoop::new();
        let poll = melody.poll(10.0);
        assert!(poll.notes.is_empty());
        assert_eq!(poll.next_in_s, None);
    }

    #[test]
    fn test_passes_are_back_to_back() {
        let mut melody = MelodyLoop::new();
        melody.start(1.0);

        let first = melody.poll(1.0);
        assert_eq!(first.notes.len(), MELODY.len());
        assert_eq!(first.notes[0].start_s, 1.0);
        for pair in first.notes.windows(2) {
            assert!((pair[0].end_s() - pair[1].start_s).abs() < 1e-9);
        }
        let first_end = first.notes.last().map(|n| n.end_s()).unwrap();
        assert!((first_end - 5.0).abs() < 1e-9);

        // Nothing new until the lookahead window reaches the end of the pass
        assert!(melody.poll(2.0).notes.is_empty());
        assert!(melody.poll(4.85).notes.is_empty());

        let second = melody.poll(4.95);
        assert_eq!(second.notes.len(), MELODY.len());
        assert_eq!(second.notes[0].start_s, first_end);
        assert_eq!(melody.passes(), 2);
    }

    #[test]
    fn test_each_pass_scheduled_once() {
        let mut melody = MelodyLoop::new();
        melody.start(0.0);
        let mut scheduled = 0;
        // Poll at 60 Hz for 19 seconds
        for frame in 0..1140 {
            scheduled += melody.poll(frame as f64 / 60.0).notes.len();
        }
        // Passes starting at 0, 4, 8, 12, 16
        assert_eq!(scheduled, 5 * MELODY.len());
    }

    #[test]
    fn test_stall_does_not_schedule_in_the_past() {
        let mut melody = MelodyLoop::new();
        melody.start(0.0);
        melody.poll(0.0);
        let late = melody.poll(30.0);
        assert_eq!(late.notes[0].start_s, 30.0);
    }

    #[test]
    fn test_stop_halts_loop() {
        let mut melody = MelodyLoop::new();
        melody.start(0.0);
        melody.poll(0.0);
        melody.stop();
        assert!(!melody.is_playing());
        assert!(melody.poll(10.0).notes.is_empty());

        melody.start(10.0);
        assert_eq!(melody.poll(10.0).notes[0].start_s, 10.0);
    }
}
