//! Drum synth patch format and the factory presets.
//!
//! A patch declares up to four oscillators, one filtered noise generator
//! and a master stage. These types map directly to the JSON objects used
//! for per-track Custom Synth Patch overrides.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::CustomPatch;

/// Reference pitch of an untuned oscillator, in Hz.
pub const REFERENCE_FREQ: f64 = 55.0;

// ── Oscillators ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OscWave {
    #[default]
    Sine,
    Triangle,
    Square,
}

/// One tonal component of a drum voice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OscPatch {
    pub enabled: bool,
    pub wave: OscWave,
    /// Semitones above [`REFERENCE_FREQ`].
    pub tune: f64,
    /// Cents.
    pub fine: f64,
    /// Extra Hz at the start of the hit, decaying to the base pitch.
    pub pitch_env: f64,
    /// Seconds for the pitch sweep; `<= 0` disables it.
    pub pitch_decay: f64,
    pub attack: f64,
    pub decay: f64,
    /// Peak amplitude, 0-1.
    pub level: f64,
    /// Saturation amount; only oscillator 1 honours it.
    pub drive: f64,
}

impl Default for OscPatch {
    fn default() -> Self {
        OscPatch {
            enabled: false,
            wave: OscWave::Sine,
            tune: 0.0,
            fine: 0.0,
            pitch_env: 0.0,
            pitch_decay: 0.0,
            attack: 0.001,
            decay: 0.2,
            level: 1.0,
            drive: 0.0,
        }
    }
}

impl OscPatch {
    /// `55 * 2^(tune/12) * 2^(fine/1200)`.
    pub fn base_freq(&self) -> f64 {
        REFERENCE_FREQ * (2.0_f64).powf(self.tune / 12.0) * (2.0_f64).powf(self.fine / 1200.0)
    }

    /// Retune so that [`OscPatch::base_freq`] equals `freq`.
    pub fn set_base_freq(&mut self, freq: f64) {
        self.tune = 12.0 * (freq / REFERENCE_FREQ).log2();
        self.fine = 0.0;
    }

    fn voice(wave: OscWave, freq: f64, level: f64, decay: f64) -> Self {
        let mut osc = OscPatch {
            enabled: true,
            wave,
            level,
            decay,
            ..OscPatch::default()
        };
        osc.set_base_freq(freq);
        osc
    }
}

// ── Noise ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseFilter {
    Lowpass,
    #[default]
    Highpass,
    Bandpass,
}

/// The filtered white-noise component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NoisePatch {
    pub enabled: bool,
    pub filter: NoiseFilter,
    pub cutoff: f64,
    pub q: f64,
    pub attack: f64,
    pub decay: f64,
    pub level: f64,
    /// Repeated envelope hits before the tail (clap); 0 = single envelope.
    pub burst_count: u32,
    /// Seconds between bursts.
    pub burst_rate: f64,
}

impl Default for NoisePatch {
    fn default() -> Self {
        NoisePatch {
            enabled: false,
            filter: NoiseFilter::Highpass,
            cutoff: 2000.0,
            q: 0.707,
            attack: 0.001,
            decay: 0.1,
            level: 0.5,
            burst_count: 0,
            burst_rate: 0.01,
        }
    }
}

// ── Master ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MasterPatch {
    /// 0-100; output gain is `1.5 * volume / 100`.
    pub volume: f64,
    /// High-pass cutoff in Hz.
    pub hpf: f64,
    pub hpf_q: f64,
}

impl Default for MasterPatch {
    fn default() -> Self {
        MasterPatch {
            volume: 100.0,
            hpf: 20.0,
            hpf_q: 0.707,
        }
    }
}

impl MasterPatch {
    pub fn gain(&self) -> f64 {
        1.5 * self.volume.max(0.0) / 100.0
    }
}

// ── Patch ───────────────────────────────────────────────────

/// Complete description of one drum hit.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Patch {
    pub osc1: OscPatch,
    pub osc2: OscPatch,
    pub osc3: OscPatch,
    pub osc4: OscPatch,
    pub noise: NoisePatch,
    pub master: MasterPatch,
}

impl Patch {
    pub fn oscillators(&self) -> [&OscPatch; 4] {
        [&self.osc1, &self.osc2, &self.osc3, &self.osc4]
    }

    pub fn oscillators_mut(&mut self) -> [&mut OscPatch; 4] {
        [&mut self.osc1, &mut self.osc2, &mut self.osc3, &mut self.osc4]
    }

    /// True if nothing in the patch can make a sound.
    pub fn is_silent(&self) -> bool {
        !self.noise.enabled && self.oscillators().iter().all(|o| !o.enabled)
    }

    /// Deep-merge a JSON override onto this patch.
    ///
    /// Objects merge key by key; any other value replaces the field.
    pub fn with_overrides(&self, custom: &CustomPatch) -> Result<Patch, serde_json::Error> {
        let mut base = serde_json::to_value(self)?;
        merge(&mut base, &Value::Object(custom.0.clone()));
        serde_json::from_value(base)
    }
}

fn merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        base.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (slot, value) => *slot = value.clone(),
    }
}

// ── Factory presets ─────────────────────────────────────────

/// Instruments with a factory synth patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetKind {
    Bd,
    Sd,
    Tom,
    Rs,
    Cp,
}

/// The built-in patch for an instrument, before any knob mapping.
pub fn factory_preset(kind: PresetKind) -> Patch {
    match kind {
        PresetKind::Bd => Patch {
            osc1: OscPatch {
                pitch_env: 210.0,
                pitch_decay: 0.045,
                ..OscPatch::voice(OscWave::Sine, 52.5, 1.0, 0.575)
            },
            osc2: OscPatch::voice(OscWave::Triangle, 420.0, 0.3, 0.012),
            master: MasterPatch { volume: 100.0, hpf: 30.0, hpf_q: 0.707 },
            ..Patch::default()
        },
        PresetKind::Sd => Patch {
            osc1: OscPatch {
                pitch_env: 105.0,
                pitch_decay: 0.03,
                ..OscPatch::voice(OscWave::Triangle, 210.0, 1.0, 0.12)
            },
            osc2: OscPatch::voice(OscWave::Triangle, 315.0, 0.4, 0.08),
            noise: NoisePatch {
                enabled: true,
                filter: NoiseFilter::Highpass,
                cutoff: 3600.0,
                q: 0.707,
                attack: 0.001,
                decay: 0.2,
                level: 0.6,
                ..NoisePatch::default()
            },
            master: MasterPatch { volume: 90.0, hpf: 80.0, hpf_q: 0.707 },
            ..Patch::default()
        },
        PresetKind::Tom => Patch {
            osc1: OscPatch {
                pitch_env: 78.0,
                pitch_decay: 0.05,
                ..OscPatch::voice(OscWave::Sine, 130.0, 1.0, 0.475)
            },
            noise: NoisePatch {
                enabled: true,
                filter: NoiseFilter::Lowpass,
                cutoff: 1800.0,
                q: 0.707,
                attack: 0.001,
                decay: 0.06,
                level: 0.12,
                ..NoisePatch::default()
            },
            master: MasterPatch { volume: 100.0, hpf: 40.0, hpf_q: 0.707 },
            ..Patch::default()
        },
        PresetKind::Rs => Patch {
            osc1: OscPatch::voice(OscWave::Triangle, 530.0, 1.0, 0.06),
            osc2: OscPatch::voice(OscWave::Square, 1219.0, 0.35, 0.06),
            noise: NoisePatch {
                enabled: true,
                filter: NoiseFilter::Bandpass,
                cutoff: 2600.0,
                q: 3.0,
                attack: 0.001,
                decay: 0.02,
                level: 0.25,
                ..NoisePatch::default()
            },
            master: MasterPatch { volume: 80.0, hpf: 200.0, hpf_q: 0.707 },
            ..Patch::default()
        },
        PresetKind::Cp => Patch {
            noise: NoisePatch {
                enabled: true,
                filter: NoiseFilter::Bandpass,
                cutoff: 1800.0,
                q: 2.5,
                attack: 0.001,
                decay: 0.425,
                level: 1.0,
                burst_count: 3,
                burst_rate: 0.011,
            },
            master: MasterPatch { volume: 100.0, hpf: 150.0, hpf_q: 0.707 },
            ..Patch::default()
        },
    }
}
