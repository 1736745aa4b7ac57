//! Player preferences
//!
//! Persisted in LocalStorage under their own key.

use serde::{Deserialize, Serialize};

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Audio ===
    /// Pop sound effects
    pub sound_enabled: bool,
    /// Looping background melody
    pub music_enabled: bool,
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Sound effects volume (0.0 - 1.0)
    pub sfx_volume: f32,
    /// Music volume (0.0 - 1.0)
    pub music_volume: f32,
    /// Pause and go quiet when the page is hidden or loses focus
    pub mute_on_blur: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            music_enabled: false,
            master_volume: 1.0,
            sfx_volume: 1.0,
            music_volume: 1.0,
            mute_on_blur: true,
        }
    }
}

impl Settings {
    /// Volume multiplier for sound effects (0 when disabled)
    pub fn effective_sfx_volume(&self) -> f32 {
        if self.sound_enabled {
            unit(self.master_volume) * unit(self.sfx_volume)
        } else {
            0.0
        }
    }

    /// Volume multiplier for the melody bus (0 when disabled)
    pub fn effective_music_volume(&self) -> f32 {
        if self.music_enabled {
            unit(self.master_volume) * unit(self.music_volume)
        } else {
            0.0
        }
    }

    /// LocalStorage key
    const STORAGE_KEY: &'static str = "bubble_pop_settings";

    /// Parse stored JSON, falling back to defaults when it is corrupt
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str(json) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Ignoring stored settings: {}", e);
                Self::default()
            }
        }
    }

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                log::info!("Loaded settings from LocalStorage");
                return Self::from_json(&json);
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        log::debug!("No settings storage on native, using defaults ({})", Self::STORAGE_KEY);
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}

/// Parse a 0-100 slider value into a 0.0-1.0 volume
pub fn volume_from_percent(value: &str) -> Option<f32> {
    let percent: f32 = value.trim().parse().ok()?;
    percent.is_finite().then(|| (percent / 100.0).clamp(0.0, 1.0))
}

/// Slider value for a stored volume
pub fn volume_to_percent(volume: f32) -> String {
    format!("{}", (unit(volume) * 100.0).round() as u32)
}

fn unit(v: f32) -> f32 {
    if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_sound_on_music_off() {
        let settings = Settings::default();
        assert_eq!(settings.effective_sfx_volume(), 1.0);
        assert_eq!(settings.effective_music_volume(), 0.0);
    }

    #[test]
    fn test_disabled_sound_is_silent() {
        let settings = Settings {
            sound_enabled: false,
            ..Settings::default()
        };
        assert_eq!(settings.effective_sfx_volume(), 0.0);
    }

    #[test]
    fn test_volumes_multiply_and_clamp() {
        let settings = Settings {
            music_enabled: true,
            master_volume: 0.5,
            sfx_volume: 3.0,
            music_volume: f32::NAN,
            ..Settings::default()
        };
        assert_eq!(settings.effective_sfx_volume(), 0.5);
        assert_eq!(settings.effective_music_volume(), 0.0);
    }

    #[test]
    fn test_partial_and_corrupt_json() {
        let settings = Settings::from_json(r#"{ "music_enabled": true }"#);
        assert!(settings.music_enabled);
        assert!(settings.sound_enabled);

        assert_eq!(Settings::from_json("{ not json"), Settings::default());
    }

    #[test]
    fn test_json_roundtrip_keeps_toggles() {
        let settings = Settings {
            sound_enabled: false,
            music_enabled: true,
            ..Settings::default()
        };
        let json = serde_json::to_string(&settings).unwrap();
        assert_eq!(Settings::from_json(&json), settings);
    }

    #[test]
    fn test_slider_percent_maps_to_volume() {
        assert_eq!(volume_from_percent("50"), Some(0.5));
        assert_eq!(volume_from_percent(" 100 "), Some(1.0));
        assert_eq!(volume_from_percent("250"), Some(1.0));
        assert_eq!(volume_from_percent("-3"), Some(0.0));
        assert_eq!(volume_from_percent("loud"), None);
        assert_eq!(volume_from_percent("NaN"), None);

        assert_eq!(volume_to_percent(0.8), "80");
        assert_eq!(volume_to_percent(f32::NAN), "0");
    }

    #[test]
    fn test_slider_volumes_scale_output() {
        let mut settings = Settings {
            music_enabled: true,
            ..Settings::default()
        };
        settings.master_volume = volume_from_percent("50").unwrap();
        settings.sfx_volume = volume_from_percent("50").unwrap();
        settings.music_volume = volume_from_percent("20").unwrap();
        assert!((settings.effective_sfx_volume() - 0.25).abs() < 1e-6);
        assert!((settings.effective_music_volume() - 0.1).abs() < 1e-6);
    }
}
