//! Audio system using Web Audio API
//!
//! Procedurally generated sounds - no external files needed. The cue and
//! melody data live in `sound`; this module only builds nodes.

use web_sys::{AudioContext, AudioNode, GainNode, OscillatorNode, OscillatorType};

use crate::settings::Settings;
use crate::sound::{
    MELODY_WAVEFORM, MUSIC_GAIN, MelodyLoop, Pitch, ScheduledNote, SoundEffect, Tone, Waveform,
};

/// Audio manager for the game
pub struct AudioManager {
    ctx: Option<AudioContext>,
    /// Shared gain node every melody note feeds into
    music_bus: Option<GainNode>,
    melody: MelodyLoop,
    sfx_volume: f32,
    music_volume: f32,
    muted: bool,
}

impl Default for AudioManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioManager {
    pub fn new() -> Self {
        // Try to create audio context (may fail if not in secure context)
        let ctx = AudioContext::new().ok();
        if ctx.is_none() {
            log::warn!("Failed to create AudioContext - audio disabled");
        }
        let music_bus = ctx.as_ref().and_then(|ctx| {
            let bus = ctx.create_gain().ok()?;
            bus.gain().set_value(MUSIC_GAIN);
            bus.connect_with_audio_node(&ctx.destination()).ok()?;
            Some(bus)
        });
        Self {
            ctx,
            music_bus,
            melody: MelodyLoop::new(),
            sfx_volume: 1.0,
            music_volume: 0.0,
            muted: false,
        }
    }

    /// Resume audio context (required after user gesture)
    pub fn resume(&self) {
        if let Some(ctx) = &self.ctx {
            if ctx.state() == web_sys::AudioContextState::Suspended {
                let _ = ctx.resume();
            }
        }
    }

    /// Pick up volume and toggle changes
    pub fn apply_settings(&mut self, settings: &Settings) {
        self.sfx_volume = settings.effective_sfx_volume();
        self.music_volume = settings.effective_music_volume();
        self.update_music_gain();
    }

    /// Mute/unmute all audio
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        self.update_music_gain();
    }

    fn update_music_gain(&self) {
        if let Some(bus) = &self.music_bus {
            let level = if self.muted { 0.0 } else { MUSIC_GAIN * self.music_volume };
            bus.gain().set_value(level);
        }
    }

    /// Play a sound effect
    pub fn play(&self, effect: SoundEffect) {
        if self.muted || self.sfx_volume <= 0.0 {
            return;
        }
        let Some(ctx) = &self.ctx else { return };
        self.resume();
        self.play_tone(ctx, &effect.tone(), self.sfx_volume);
    }

    /// Keep the background melody fed. Call once per frame.
    pub fn update_music(&mut self) {
        let Some(ctx) = &self.ctx else { return };
        let now = ctx.current_time();

        if self.muted || self.music_volume <= 0.0 {
            self.melody.stop();
            return;
        }

        self.melody.start(now);
        let poll = self.melody.poll(now);
        if let Some(bus) = &self.music_bus {
            for note in &poll.notes {
                self.play_note(ctx, bus, note);
            }
        }
    }

    // === Sound generators ===

    /// Create an oscillator feeding a fresh gain node
    fn create_osc(
        &self,
        ctx: &AudioContext,
        freq: f32,
        osc_type: OscillatorType,
        output: &AudioNode,
    ) -> Option<(OscillatorNode, GainNode)> {
        let osc = ctx.create_oscillator().ok()?;
        let gain = ctx.create_gain().ok()?;

        osc.set_type(osc_type);
        osc.frequency().set_value(freq);
        osc.connect_with_audio_node(&gain).ok()?;
        gain.connect_with_audio_node(output).ok()?;

        Some((osc, gain))
    }

    /// One-shot cue with an exponential decay
    fn play_tone(&self, ctx: &AudioContext, tone: &Tone, vol: f32) {
        let start_freq = tone.pitch.frequency_at(0.0);
        let Some((osc, gain)) =
            self.create_osc(ctx, start_freq, oscillator_type(tone.waveform), &ctx.destination())
        else {
            return;
        };
        let t = ctx.current_time();
        let end = t + tone.duration_s;

        gain.gain().set_value_at_time(tone.peak_gain * vol, t).ok();
        gain.gain()
            .exponential_ramp_to_value_at_time(tone.floor_gain, end)
            .ok();

        match tone.pitch {
            Pitch::Glide {
                from_hz,
                to_hz,
                over_s,
            } => {
                osc.frequency().set_value_at_time(from_hz, t).ok();
                osc.frequency()
                    .exponential_ramp_to_value_at_time(to_hz, t + over_s)
                    .ok();
            }
            Pitch::Steps { notes, step_s } => {
                for (i, freq) in notes.iter().enumerate() {
                    osc.frequency()
                        .set_value_at_time(*freq, t + i as f64 * step_s)
                        .ok();
                }
            }
        }

        osc.start_with_when(t).ok();
        osc.stop_with_when(end).ok();
    }

    /// Melody note routed through the music bus
    fn play_note(&self, ctx: &AudioContext, bus: &GainNode, note: &ScheduledNote) {
        let Some((osc, gain)) =
            self.create_osc(ctx, note.freq_hz, oscillator_type(MELODY_WAVEFORM), bus)
        else {
            return;
        };

        let [(t0, silent), attack, hold, (t_end, off)] = note.envelope();
        gain.gain().set_value_at_time(silent, t0).ok();
        gain.gain()
            .linear_ramp_to_value_at_time(attack.1, attack.0)
            .ok();
        gain.gain().linear_ramp_to_value_at_time(hold.1, hold.0).ok();
        gain.gain().linear_ramp_to_value_at_time(off, t_end).ok();

        osc.start_with_when(note.start_s).ok();
        osc.stop_with_when(note.end_s()).ok();
    }
}

fn oscillator_type(waveform: Waveform) -> OscillatorType {
    match waveform {
        Waveform::Sine => OscillatorType::Sine,
        Waveform::Triangle => OscillatorType::Triangle,
    }
}
