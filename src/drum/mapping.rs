//! Knob → patch mapping for the synthesized drum tracks.
//!
//! Each instrument has one pure function turning its 0-100 knobs into
//! fields of the factory [`Patch`]. Level is not mapped here; it becomes
//! the voice-level multiplier at trigger time.

use log::warn;

use crate::model::{DrumParams, DrumTrackId, DrumTrackSettings, Shaper};

use super::patch::{Patch, PresetKind, factory_preset};

/// Tuning range of a tom, in Hz.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TomRange {
    pub low: f64,
    pub high: f64,
}

pub const LOW_TOM: TomRange = TomRange { low: 70.0, high: 130.0 };
pub const MID_TOM: TomRange = TomRange { low: 110.0, high: 190.0 };
pub const HIGH_TOM: TomRange = TomRange { low: 160.0, high: 280.0 };

fn norm(knob: f64) -> f64 {
    (knob / 100.0).clamp(0.0, 1.0)
}

/// Bass drum pitch-sweep length: short and clicky up to tune 40, then
/// stretching out towards the 808-style boom.
pub fn bd_pitch_decay(tune: f64) -> f64 {
    let tune = tune.clamp(0.0, 100.0);
    if tune <= 40.0 {
        0.005 + tune / 40.0 * 0.015
    } else {
        0.02 + (tune - 40.0) / 60.0 * 0.15
    }
}

pub fn map_bd(tune: f64, attack: f64, decay: f64) -> Patch {
    let mut patch = factory_preset(PresetKind::Bd);
    let freq = 40.0 + norm(tune) * 25.0;

    patch.osc1.set_base_freq(freq);
    patch.osc1.pitch_env = freq * 4.0;
    patch.osc1.pitch_decay = bd_pitch_decay(tune);
    patch.osc1.decay = 0.15 + norm(decay) * 0.85;

    patch.osc2.set_base_freq(freq * 8.0);
    patch.osc2.level = norm(attack) * 0.6;
    patch.osc2.decay = 0.012;
    patch
}

pub fn map_sd(tune: f64, tone: f64, snappy: f64) -> Patch {
    let mut patch = factory_preset(PresetKind::Sd);
    let freq = 160.0 + norm(tune) * 100.0;

    patch.osc1.set_base_freq(freq);
    patch.osc1.pitch_env = freq * 0.5;
    patch.osc1.pitch_decay = 0.03;
    patch.osc1.decay = 0.12;

    patch.osc2.set_base_freq(freq * 1.5);
    patch.osc2.level = 0.4;
    patch.osc2.decay = 0.08;

    patch.noise.cutoff = 1200.0 + norm(tone) * 4800.0;
    patch.noise.level = 0.2 + norm(snappy) * 0.8;
    patch.noise.decay = 0.1 + norm(snappy) * 0.2;
    patch
}

pub fn map_tom(range: TomRange, tune: f64, decay: f64) -> Patch {
    let mut patch = factory_preset(PresetKind::Tom);
    let freq = range.low + norm(tune) * (range.high - range.low);

    patch.osc1.set_base_freq(freq);
    patch.osc1.pitch_env = freq * 0.6;
    patch.osc1.pitch_decay = 0.05;
    patch.osc1.decay = 0.15 + norm(decay) * 0.65;
    patch
}

pub fn map_rs(tune: f64, decay: f64) -> Patch {
    let mut patch = factory_preset(PresetKind::Rs);
    let freq = 380.0 + norm(tune) * 300.0;
    let decay = 0.02 + norm(decay) * 0.08;

    patch.osc1.set_base_freq(freq);
    patch.osc1.decay = decay;
    patch.osc2.set_base_freq(freq * 2.3);
    patch.osc2.level = 0.35;
    patch.osc2.decay = decay;
    patch
}

pub fn map_cp(tone: f64, decay: f64) -> Patch {
    let mut patch = factory_preset(PresetKind::Cp);
    patch.noise.cutoff = 900.0 + norm(tone) * 1800.0;
    patch.noise.decay = 0.15 + norm(decay) * 0.55;
    patch
}

/// Apply the drop/ring/bright macro. No-op when disabled.
pub fn apply_shaper(patch: &mut Patch, shaper: &Shaper) {
    if !shaper.enabled {
        return;
    }
    let drop = 1.0 + shaper.drop.clamp(0.0, 100.0) / 50.0;
    let ring = 1.0 + shaper.ring.clamp(0.0, 100.0) / 50.0;
    let bright = shaper.bright.clamp(0.0, 100.0);

    for osc in patch.oscillators_mut() {
        osc.pitch_env *= drop;
        osc.decay *= ring;
    }
    patch.noise.cutoff *= 1.0 + bright / 50.0;
    patch.osc1.drive += bright / 10.0;
}

/// Factory patch for a track's knobs, or `None` for sample-only tracks.
pub fn map_params(id: DrumTrackId, params: &DrumParams) -> Option<Patch> {
    let params = if params.fits(id) { *params } else { DrumParams::default_for(id) };
    let patch = match (id, params) {
        (_, DrumParams::Bd { tune, attack, decay, .. }) => map_bd(tune, attack, decay),
        (_, DrumParams::Sd { tune, tone, snappy, .. }) => map_sd(tune, tone, snappy),
        (DrumTrackId::Lt, DrumParams::Tom { tune, decay, .. }) => map_tom(LOW_TOM, tune, decay),
        (DrumTrackId::Mt, DrumParams::Tom { tune, decay, .. }) => map_tom(MID_TOM, tune, decay),
        (_, DrumParams::Tom { tune, decay, .. }) => map_tom(HIGH_TOM, tune, decay),
        (_, DrumParams::Rs { tune, decay, .. }) => map_rs(tune, decay),
        (_, DrumParams::Cp { tone, decay, .. }) => map_cp(tone, decay),
        (_, DrumParams::Hat { .. } | DrumParams::Cymbal { .. }) => return None,
    };
    Some(patch)
}

/// The synth patch a track should play, honouring a custom override.
///
/// Overrides merge onto the knob-mapped patch (or an empty patch for
/// sample-only tracks). A rejected override is logged and ignored.
pub fn synth_patch(id: DrumTrackId, settings: &DrumTrackSettings) -> Option<Patch> {
    let mapped = map_params(id, &settings.params).map(|mut patch| {
        apply_shaper(&mut patch, &settings.shaper);
        patch
    });

    let Some(custom) = settings.active_custom_patch() else {
        return mapped;
    };
    let base = mapped.unwrap_or_default();
    match base.with_overrides(custom) {
        Ok(patch) if !patch.is_silent() => Some(patch),
        Ok(_) => mapped,
        Err(e) => {
            warn!("custom patch for {} rejected: {e}", id.as_str());
            mapped
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CustomPatch;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn bd_tune_extremes_and_boundary() {
        let low = map_bd(0.0, 50.0, 50.0);
        assert!(close(low.osc1.pitch_decay, 0.005));
        assert!(close(low.osc1.base_freq(), 40.0), "got {}", low.osc1.base_freq());

        let knee = map_bd(40.0, 50.0, 50.0);
        assert!(close(knee.osc1.pitch_decay, 0.02));

        let high = map_bd(100.0, 50.0, 50.0);
        assert!(close(high.osc1.pitch_decay, 0.17));
        assert!(close(high.osc1.base_freq(), 65.0));
    }

    #[test]
    fn bd_pitch_decay_is_continuous_at_knee() {
        assert!((bd_pitch_decay(40.0) - bd_pitch_decay(40.0001)).abs() < 1e-5);
        assert!(close(bd_pitch_decay(-10.0), 0.005));
    }

    #[test]
    fn bd_sweep_starts_five_times_higher() {
        let patch = map_bd(50.0, 50.0, 50.0);
        let base = patch.osc1.base_freq();
        assert!(close(base + patch.osc1.pitch_env, base * 5.0));
    }

    #[test]
    fn default_knobs_reproduce_presets() {
        let cases = [
            (map_bd(50.0, 50.0, 50.0), PresetKind::Bd),
            (map_sd(50.0, 50.0, 50.0), PresetKind::Sd),
            (map_rs(50.0, 50.0), PresetKind::Rs),
            (map_cp(50.0, 50.0), PresetKind::Cp),
        ];
        for (mapped, kind) in cases {
            let preset = factory_preset(kind);
            assert!(close(mapped.osc1.base_freq(), preset.osc1.base_freq()), "{kind:?}");
            assert!(close(mapped.osc1.decay, preset.osc1.decay), "{kind:?}");
            assert!(close(mapped.noise.cutoff, preset.noise.cutoff), "{kind:?}");
            assert!(close(mapped.noise.decay, preset.noise.decay), "{kind:?}");
        }
    }

    #[test]
    fn toms_use_their_own_ranges() {
        let lt = map_params(DrumTrackId::Lt, &DrumParams::from_knobs(DrumTrackId::Lt, &[0.0])).unwrap();
        let ht = map_params(DrumTrackId::Ht, &DrumParams::from_knobs(DrumTrackId::Ht, &[100.0])).unwrap();
        assert!(close(lt.osc1.base_freq(), 70.0));
        assert!(close(ht.osc1.base_freq(), 280.0));
    }

    #[test]
    fn sample_tracks_have_no_patch() {
        assert!(map_params(DrumTrackId::Oh, &DrumParams::default_for(DrumTrackId::Oh)).is_none());
        assert!(synth_patch(DrumTrackId::Cr, &DrumTrackSettings::new(DrumTrackId::Cr)).is_none());
    }

    #[test]
    fn mismatched_params_fall_back_to_defaults() {
        let wrong = DrumParams::default_for(DrumTrackId::Cp);
        let patch = map_params(DrumTrackId::Bd, &wrong).unwrap();
        assert_eq!(patch, map_bd(50.0, 50.0, 50.0));
    }

    #[test]
    fn shaper_scales_patch() {
        let mut patch = map_bd(50.0, 50.0, 50.0);
        let plain = patch;
        apply_shaper(&mut patch, &Shaper { enabled: true, drop: 50.0, ring: 100.0, bright: 40.0 });
        assert!(close(patch.osc1.pitch_env, plain.osc1.pitch_env * 2.0));
        assert!(close(patch.osc1.decay, plain.osc1.decay * 3.0));
        assert!(close(patch.osc1.drive, 4.0));

        let mut untouched = plain;
        apply_shaper(&mut untouched, &Shaper { enabled: false, drop: 100.0, ring: 100.0, bright: 100.0 });
        assert_eq!(untouched, plain);
    }

    #[test]
    fn custom_patch_overrides_factory() {
        let mut settings = DrumTrackSettings::new(DrumTrackId::Sd);
        settings.custom_patch = Some(CustomPatch::from_json(r#"{"noise":{"level":0.1}}"#).unwrap());
        let patch = synth_patch(DrumTrackId::Sd, &settings).unwrap();
        assert!(close(patch.noise.level, 0.1));
        assert!(close(patch.osc1.base_freq(), 210.0));
    }

    #[test]
    fn custom_patch_gives_sample_track_a_synth() {
        let mut settings = DrumTrackSettings::new(DrumTrackId::Ch);
        settings.custom_patch = Some(CustomPatch::from_json(r#"{"noise":{"enabled":true,"cutoff":8000}}"#).unwrap());
        let patch = synth_patch(DrumTrackId::Ch, &settings).unwrap();
        assert!(patch.noise.enabled);
    }

    #[test]
    fn rejected_custom_patch_falls_back() {
        let mut settings = DrumTrackSettings::new(DrumTrackId::Bd);
        settings.custom_patch = Some(CustomPatch::from_json(r#"{"osc1":{"level":"loud"}}"#).unwrap());
        assert_eq!(synth_patch(DrumTrackId::Bd, &settings), Some(map_bd(50.0, 50.0, 50.0)));
    }
}
