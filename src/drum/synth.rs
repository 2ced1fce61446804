//! Unified drum synth — renders any [`Patch`] as a one-shot voice.
//!
//! Each enabled oscillator gets its own pitch sweep and attack/decay
//! envelope; the noise component reads the shared noise table through a
//! colour filter. Everything sums into the master gain and high-pass.

use crate::dsp::automation::Automation;
use crate::dsp::filter::{BiquadFilter, FilterType};
use crate::dsp::noise::{NoiseBuffer, NoiseReader};
use crate::dsp::oscillator::{Oscillator, Waveform};
use crate::dsp::shaper::{DRIVE_THRESHOLD, soft_clip_cubic};
use crate::dsp::voice::{Lifetime, Voice};

use super::patch::{NoiseFilter, NoisePatch, OscPatch, OscWave, Patch};

/// Exponential envelopes ramp to this level before the voice is cut.
const ENV_FLOOR: f64 = 0.0001;
/// Level each clap burst decays to, relative to its peak.
const BURST_SAG: f64 = 0.2;
/// Shortest attack, so a zero attack does not click.
const MIN_ATTACK: f64 = 0.0005;

/// One oscillator of a sounding hit.
#[derive(Debug, Clone)]
struct ToneLayer {
    osc: Oscillator,
    freq: Automation,
    gain: Automation,
    drive: f64,
}

#[derive(Debug, Clone)]
struct NoiseLayer {
    reader: NoiseReader,
    filter: BiquadFilter,
    gain: Automation,
}

/// A scheduled drum hit.
#[derive(Debug, Clone)]
pub struct DrumHit {
    tones: Vec<ToneLayer>,
    noise: Option<NoiseLayer>,
    master_gain: f64,
    hpf: BiquadFilter,
    life: Lifetime,
    sample_rate: f64,
    scratch: Vec<f64>,
}

/// Schedule `patch` at `time`, scaled by `voice_level` (0-1).
pub fn render_hit(patch: &Patch, time: f64, voice_level: f64, noise: &NoiseBuffer, sample_rate: f64) -> DrumHit {
    let mut end = time;
    let mut tones = Vec::new();

    for (i, osc) in patch.oscillators().into_iter().enumerate() {
        if !osc.enabled || osc.level <= 0.0 {
            continue;
        }
        let (layer, layer_end) = tone_layer(osc, i == 0, time, sample_rate);
        end = end.max(layer_end);
        tones.push(layer);
    }

    let noise = if patch.noise.enabled && patch.noise.level > 0.0 {
        let (gain, layer_end) = noise_envelope(&patch.noise, time);
        end = end.max(layer_end);
        Some(NoiseLayer {
            reader: noise.reader(),
            filter: BiquadFilter::new(
                filter_type(patch.noise.filter),
                patch.noise.cutoff,
                patch.noise.q,
                sample_rate,
            ),
            gain,
        })
    } else {
        None
    };

    let mut life = Lifetime::starting_at(time);
    life.stop_at(end);

    DrumHit {
        tones,
        noise,
        master_gain: patch.master.gain() * voice_level.clamp(0.0, 1.0),
        hpf: BiquadFilter::new(FilterType::Highpass, patch.master.hpf, patch.master.hpf_q, sample_rate),
        life,
        sample_rate,
        scratch: Vec::new(),
    }
}

fn tone_layer(osc: &OscPatch, honours_drive: bool, time: f64, sample_rate: f64) -> (ToneLayer, f64) {
    let base = osc.base_freq();
    let mut freq = Automation::new(base);
    if osc.pitch_env > 0.0 && osc.pitch_decay > 0.0 {
        freq.set_value_at(base + osc.pitch_env, time);
        freq.exponential_ramp_to(base, time + osc.pitch_decay);
    } else {
        freq.set_value_at(base, time);
    }

    let attack = osc.attack.max(MIN_ATTACK);
    let decay = osc.decay.max(0.001);
    let mut gain = Automation::new(0.0);
    gain.set_value_at(0.0, time);
    gain.linear_ramp_to(osc.level, time + attack);
    gain.exponential_ramp_to(ENV_FLOOR, time + attack + decay);

    let drive = if honours_drive && osc.drive > DRIVE_THRESHOLD { osc.drive } else { 0.0 };
    let layer = ToneLayer {
        osc: Oscillator::new(waveform(osc.wave), sample_rate),
        freq,
        gain,
        drive,
    };
    (layer, time + attack + decay)
}

/// Gain timeline of the noise layer and the time it falls silent.
///
/// With `burst_count > 0` the envelope re-fires every `burst_rate` seconds,
/// each burst sagging to a fifth of its level, before the decaying tail.
fn noise_envelope(noise: &NoisePatch, time: f64) -> (Automation, f64) {
    let attack = noise.attack.max(MIN_ATTACK);
    let decay = noise.decay.max(0.001);
    let mut gain = Automation::new(0.0);
    gain.set_value_at(0.0, time);

    let mut tail_start = time;
    if noise.burst_count > 0 && noise.burst_rate > 0.0 {
        let rate = noise.burst_rate;
        for i in 0..noise.burst_count {
            let t = time + i as f64 * rate;
            gain.set_value_at(noise.level, t);
            gain.exponential_ramp_to(noise.level * BURST_SAG, t + rate);
        }
        tail_start = time + noise.burst_count as f64 * rate;
        gain.set_value_at(noise.level, tail_start);
    } else {
        gain.linear_ramp_to(noise.level, time + attack);
        tail_start += attack;
    }
    gain.exponential_ramp_to(ENV_FLOOR, tail_start + decay);
    (gain, tail_start + decay)
}

fn waveform(wave: OscWave) -> Waveform {
    match wave {
        OscWave::Sine => Waveform::Sine,
        OscWave::Triangle => Waveform::Triangle,
        OscWave::Square => Waveform::Square,
    }
}

fn filter_type(filter: NoiseFilter) -> FilterType {
    match filter {
        NoiseFilter::Lowpass => FilterType::Lowpass,
        NoiseFilter::Highpass => FilterType::Highpass,
        NoiseFilter::Bandpass => FilterType::Bandpass,
    }
}

impl Voice for DrumHit {
    fn render_add(&mut self, start_frame: u64, out: &mut [f64]) {
        let block_start = start_frame as f64 / self.sample_rate;
        let block_end = (start_frame + out.len() as u64) as f64 / self.sample_rate;
        if block_end <= self.life.start || self.life.is_over(block_start) {
            return;
        }

        for tone in &mut self.tones {
            tone.freq.prune_before(block_start);
            tone.gain.prune_before(block_start);
        }
        self.scratch.clear();
        self.scratch.resize(out.len(), 0.0);
        if let Some(noise) = &mut self.noise {
            noise.gain.prune_before(block_start);
            // The table plays from its first sample at the hit's first frame.
            let first = ((self.life.start * self.sample_rate).ceil() - start_frame as f64).max(0.0) as usize;
            noise.reader.read(&mut self.scratch[first.min(out.len())..]);
        }

        for (i, slot) in out.iter_mut().enumerate() {
            let t = (start_frame + i as u64) as f64 / self.sample_rate;
            if !self.life.contains(t) {
                continue;
            }

            let mut sum = 0.0;
            for tone in &mut self.tones {
                let mut s = tone.osc.next_sample(tone.freq.value_at(t));
                if tone.drive > 0.0 {
                    s = soft_clip_cubic(s, tone.drive);
                }
                sum += s * tone.gain.value_at(t);
            }
            if let Some(noise) = &mut self.noise {
                sum += noise.filter.process(self.scratch[i]) * noise.gain.value_at(t);
            }

            *slot += self.hpf.process(sum * self.master_gain);
        }
    }

    fn is_finished(&self, time: f64) -> bool {
        self.life.is_over(time)
    }

    fn kill(&mut self, time: f64) {
        for tone in &mut self.tones {
            tone.gain.cancel_scheduled_values(time);
            tone.gain.set_value_at(0.0, time);
        }
        if let Some(noise) = &mut self.noise {
            noise.gain.cancel_scheduled_values(time);
            noise.gain.set_value_at(0.0, time);
        }
        self.life.stop_at(time);
    }
}
