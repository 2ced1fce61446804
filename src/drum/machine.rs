//! Drum machine — picks a sound source per track and owns the hits.

use std::collections::{BTreeMap, HashMap};

use log::debug;

use crate::dsp::noise::{NOISE_SEED, NoiseBuffer};
use crate::dsp::sampler::{SampleBuffer, SampleVoice};
use crate::dsp::voice::{Voice, VoicePool};
use crate::model::{DRUM_TRACKS, DrumParams, DrumTrackId, DrumTrackSettings, TriggerMask};

use super::mapping::synth_patch;
use super::synth::{DrumHit, render_hit};

/// Seconds of white noise in the shared table.
const NOISE_SECONDS: f64 = 2.0;

/// Playback rate of a factory sample for the tune knob.
pub fn factory_sample_rate(id: DrumTrackId, tune: f64) -> f64 {
    let n = (tune / 100.0).clamp(0.0, 1.0);
    match id {
        DrumTrackId::Cr | DrumTrackId::Rd => 0.6 + n * 1.0,
        _ => 0.8 + n * 0.4,
    }
}

/// Decay time of a factory sample for the decay knob.
pub fn factory_sample_decay(id: DrumTrackId, decay: f64) -> f64 {
    let d = (decay / 100.0).clamp(0.0, 1.0);
    match id {
        DrumTrackId::Ch => 0.05 + d * 0.25,
        DrumTrackId::Oh => 0.2 + d * 1.0,
        DrumTrackId::Cr => 0.5 + d * 2.5,
        DrumTrackId::Rd => 0.4 + d * 2.0,
        _ => 0.1 + d * 2.0,
    }
}

/// Playback rate of a user sample: one octave either side of centre.
pub fn custom_sample_rate(tune: f64) -> f64 {
    (2.0_f64).powf((tune.clamp(0.0, 100.0) - 50.0) / 50.0)
}

pub fn custom_sample_decay(decay: f64) -> f64 {
    0.1 + (decay / 100.0).clamp(0.0, 1.0) * 2.0
}

#[derive(Debug, Clone)]
enum Sound {
    Synth(DrumHit),
    Sample(SampleVoice),
}

/// A sounding hit tagged with the track that fired it.
#[derive(Debug, Clone)]
pub struct TrackVoice {
    pub track: DrumTrackId,
    sound: Sound,
}

impl Voice for TrackVoice {
    fn render_add(&mut self, start_frame: u64, out: &mut [f64]) {
        match &mut self.sound {
            Sound::Synth(hit) => hit.render_add(start_frame, out),
            Sound::Sample(voice) => voice.render_add(start_frame, out),
        }
    }

    fn is_finished(&self, time: f64) -> bool {
        match &self.sound {
            Sound::Synth(hit) => hit.is_finished(time),
            Sound::Sample(voice) => voice.is_finished(time),
        }
    }

    fn kill(&mut self, time: f64) {
        match &mut self.sound {
            Sound::Synth(hit) => hit.kill(time),
            Sound::Sample(voice) => voice.kill(time),
        }
    }
}

/// Eleven-track drum engine.
///
/// Sample assets are loaded by the host; until a factory sample arrives the
/// sample-only tracks are silent.
pub struct DrumMachine {
    sample_rate: f64,
    noise: NoiseBuffer,
    voices: VoicePool<TrackVoice>,
    factory_samples: HashMap<DrumTrackId, SampleBuffer>,
    custom_samples: HashMap<String, SampleBuffer>,
    assignments: BTreeMap<DrumTrackId, String>,
    /// Play a custom sample together with the synth/factory sound.
    pub layer_samples: bool,
}

impl DrumMachine {
    pub fn new(sample_rate: f64) -> Self {
        DrumMachine {
            sample_rate,
            noise: NoiseBuffer::new(sample_rate, NOISE_SECONDS, NOISE_SEED),
            voices: VoicePool::new(sample_rate),
            factory_samples: HashMap::new(),
            custom_samples: HashMap::new(),
            assignments: BTreeMap::new(),
            layer_samples: false,
        }
    }

    pub fn load_factory_sample(&mut self, id: DrumTrackId, buffer: SampleBuffer) {
        self.factory_samples.insert(id, buffer);
    }

    /// Register decoded audio for a user sample id.
    pub fn load_custom_sample(&mut self, sample_id: impl Into<String>, buffer: SampleBuffer) {
        self.custom_samples.insert(sample_id.into(), buffer);
    }

    /// Replace the track → user sample id table.
    pub fn set_custom_assignments(&mut self, assignments: &BTreeMap<DrumTrackId, String>) {
        self.assignments = assignments.clone();
    }

    fn custom_sample(&self, id: DrumTrackId) -> Option<&SampleBuffer> {
        let key = self.assignments.get(&id)?;
        let buffer = self.custom_samples.get(key);
        if buffer.is_none() {
            debug!("custom sample {key:?} for {} is not loaded", id.as_str());
        }
        buffer
    }

    /// Fire one track at `time`. Returns the number of voices started.
    ///
    /// Sources are tried in order: user sample, custom synth patch, factory
    /// synth, factory sample. With `layer_samples` a user sample does not
    /// stop the search.
    pub fn trigger(&mut self, time: f64, id: DrumTrackId, settings: &DrumTrackSettings) -> usize {
        let params = if settings.params.fits(id) { settings.params } else { DrumParams::default_for(id) };
        if !params.is_valid() || !time.is_finite() {
            return 0;
        }
        let level = params.voice_level();

        if id == DrumTrackId::Ch {
            self.choke(DrumTrackId::Oh, time);
        }

        let mut started = 0;
        if let Some(buffer) = self.custom_sample(id).cloned() {
            let rate = custom_sample_rate(params.tune());
            let decay = custom_sample_decay(params.decay());
            self.push_sample(id, buffer, time, rate, level, decay);
            started += 1;
            if !self.layer_samples {
                return started;
            }
        }

        if let Some(patch) = synth_patch(id, settings) {
            let hit = render_hit(&patch, time, level, &self.noise, self.sample_rate);
            self.voices.push(TrackVoice { track: id, sound: Sound::Synth(hit) });
            return started + 1;
        }

        match self.factory_samples.get(&id).cloned() {
            Some(buffer) => {
                let rate = factory_sample_rate(id, params.tune());
                let decay = factory_sample_decay(id, params.decay());
                self.push_sample(id, buffer, time, rate, level, decay);
                started += 1;
            }
            None => debug!("no factory sample loaded for {}", id.as_str()),
        }
        started
    }

    fn push_sample(&mut self, id: DrumTrackId, buffer: SampleBuffer, time: f64, rate: f64, level: f64, decay: f64) {
        let voice = SampleVoice::new(buffer, time, rate, level, decay, self.sample_rate);
        self.voices.push(TrackVoice { track: id, sound: Sound::Sample(voice) });
    }

    /// Fire every track whose mask has `step` set.
    pub fn process_step(
        &mut self,
        time: f64,
        step: usize,
        masks: &[TriggerMask; DRUM_TRACKS],
        settings: &[DrumTrackSettings; DRUM_TRACKS],
    ) -> usize {
        let mut started = 0;
        for id in DrumTrackId::ALL {
            if masks[id.index()].is_set(step) {
                started += self.trigger(time, id, &settings[id.index()]);
            }
        }
        started
    }

    fn choke(&mut self, track: DrumTrackId, time: f64) {
        for voice in self.voices.iter_mut().filter(|v| v.track == track) {
            voice.kill(time);
        }
    }

    pub fn render_add(&mut self, start_frame: u64, out: &mut [f64]) {
        self.voices.render_add(start_frame, out);
    }

    pub fn kill_all(&mut self, time: f64) {
        self.voices.kill_all(time);
    }

    /// Voices that have been scheduled and not yet reaped.
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CustomPatch;

    const SR: f64 = 8000.0;

    fn click() -> SampleBuffer {
        SampleBuffer::new(vec![1.0; 4000], 8000)
    }

    fn all_settings() -> [DrumTrackSettings; DRUM_TRACKS] {
        std::array::from_fn(|i| DrumTrackSettings::new(DrumTrackId::ALL[i]))
    }

    #[test]
    fn synth_tracks_sound_without_assets() {
        let mut drums = DrumMachine::new(SR);
        let started = drums.trigger(0.0, DrumTrackId::Bd, &DrumTrackSettings::new(DrumTrackId::Bd));
        assert_eq!(started, 1);
        let mut out = vec![0.0; 800];
        drums.render_add(0, &mut out);
        assert!(out.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn sample_track_without_sample_is_silent() {
        let mut drums = DrumMachine::new(SR);
        assert_eq!(drums.trigger(0.0, DrumTrackId::Oh, &DrumTrackSettings::new(DrumTrackId::Oh)), 0);
        drums.load_factory_sample(DrumTrackId::Oh, click());
        assert_eq!(drums.trigger(0.0, DrumTrackId::Oh, &DrumTrackSettings::new(DrumTrackId::Oh)), 1);
    }

    #[test]
    fn custom_sample_wins_unless_layered() {
        let mut drums = DrumMachine::new(SR);
        drums.load_custom_sample("kick.wav", click());
        drums.set_custom_assignments(&BTreeMap::from([(DrumTrackId::Bd, "kick.wav".to_string())]));
        let settings = DrumTrackSettings::new(DrumTrackId::Bd);

        assert_eq!(drums.trigger(0.0, DrumTrackId::Bd, &settings), 1);
        drums.layer_samples = true;
        assert_eq!(drums.trigger(0.0, DrumTrackId::Bd, &settings), 2);
        assert_eq!(drums.voice_count(), 3);
    }

    #[test]
    fn unloaded_custom_sample_falls_through() {
        let mut drums = DrumMachine::new(SR);
        drums.set_custom_assignments(&BTreeMap::from([(DrumTrackId::Sd, "missing".to_string())]));
        assert_eq!(drums.trigger(0.0, DrumTrackId::Sd, &DrumTrackSettings::new(DrumTrackId::Sd)), 1);
    }

    #[test]
    fn custom_patch_plays_on_sample_track() {
        let mut drums = DrumMachine::new(SR);
        let mut settings = DrumTrackSettings::new(DrumTrackId::Rd);
        settings.custom_patch = Some(CustomPatch::from_json(r#"{"osc1":{"enabled":true}}"#).unwrap());
        assert_eq!(drums.trigger(0.0, DrumTrackId::Rd, &settings), 1);
    }

    #[test]
    fn invalid_knobs_are_ignored() {
        let mut drums = DrumMachine::new(SR);
        let mut settings = DrumTrackSettings::new(DrumTrackId::Bd);
        settings.params = DrumParams::Bd { tune: f64::NAN, level: 100.0, attack: 50.0, decay: 50.0 };
        assert_eq!(drums.trigger(0.0, DrumTrackId::Bd, &settings), 0);
        assert_eq!(drums.voice_count(), 0);
    }

    #[test]
    fn closed_hat_chokes_open_hat() {
        let mut drums = DrumMachine::new(SR);
        drums.load_factory_sample(DrumTrackId::Oh, click());
        drums.load_factory_sample(DrumTrackId::Ch, SampleBuffer::new(vec![0.0; 10], 8000));
        drums.trigger(0.0, DrumTrackId::Oh, &DrumTrackSettings::new(DrumTrackId::Oh));
        drums.trigger(0.05, DrumTrackId::Ch, &DrumTrackSettings::new(DrumTrackId::Ch));

        let mut out = vec![0.0; 800];
        drums.render_add(0, &mut out);
        assert!(out[100..399].iter().any(|&s| s != 0.0));
        assert!(out[400..].iter().all(|&s| s == 0.0), "Open hat should stop at the closed hat");
    }

    #[test]
    fn process_step_reads_masks() {
        let mut drums = DrumMachine::new(SR);
        let mut masks = [TriggerMask::default(); DRUM_TRACKS];
        masks[DrumTrackId::Bd.index()].set(0, true);
        masks[DrumTrackId::Sd.index()].set(4, true);
        let settings = all_settings();

        assert_eq!(drums.process_step(0.0, 0, &masks, &settings), 1);
        assert_eq!(drums.process_step(0.1, 1, &masks, &settings), 0);
        assert_eq!(drums.process_step(0.2, 4, &masks, &settings), 1);
    }

    #[test]
    fn kill_all_silences_everything() {
        let mut drums = DrumMachine::new(SR);
        drums.trigger(0.0, DrumTrackId::Cp, &DrumTrackSettings::new(DrumTrackId::Cp));
        drums.kill_all(0.0);
        let mut out = vec![0.0; 400];
        drums.render_add(0, &mut out);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(drums.voice_count(), 0);
    }

    #[test]
    fn sample_pitch_and_decay_tables() {
        assert!((factory_sample_rate(DrumTrackId::Ch, 0.0) - 0.8).abs() < 1e-12);
        assert!((factory_sample_rate(DrumTrackId::Rd, 100.0) - 1.6).abs() < 1e-12);
        assert!((factory_sample_decay(DrumTrackId::Oh, 100.0) - 1.2).abs() < 1e-12);
        assert!((custom_sample_rate(100.0) - 2.0).abs() < 1e-12);
        assert!((custom_sample_rate(50.0) - 1.0).abs() < 1e-12);
    }
}
