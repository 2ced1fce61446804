//! Bass voice — monophonic saw/square through the ladder filter, with
//! accent, slide and a tempo-synced feedback delay.
//!
//! One [`BassVoice`] serves one bass unit. It is either idle or owns
//! exactly one sounding note; a note that is killed or retriggered moves
//! to a release pool and is dropped once its tail has been rendered.

use crate::dsp::automation::Automation;
use crate::dsp::delay::Delay;
use crate::dsp::ladder::{LadderFilter, MAX_RESONANCE};
use crate::dsp::oscillator::{Oscillator, Waveform};
use crate::dsp::voice::{Lifetime, Voice, VoicePool};
use crate::model::{BassSettings, BassStep, BassWaveform, STEPS, Sequence};

/// Amplitude attack.
const ATTACK: f64 = 0.005;
/// Filter envelope rise time.
const FILTER_ATTACK: f64 = 0.01;
/// Glide time for slides.
const SLIDE_TIME: f64 = 0.1;
/// Time constant of the gate-off fade.
const RELEASE_TC: f64 = 0.01;
/// The oscillator keeps running this long after the gate closes.
const RELEASE_TAIL: f64 = 0.2;
/// Smoothing time constant for delay parameter changes.
const DELAY_SMOOTHING: f64 = 0.05;
const MIN_DELAY_TIME: f64 = 0.01;

fn norm(knob: f64) -> f64 {
    (knob / 100.0).clamp(0.0, 1.0)
}

/// Gate length: half a beat at `tempo`, independent of swing.
pub fn gate_length(tempo: f64) -> f64 {
    (60.0 / tempo) * 0.5
}

/// Per-note values derived from the knobs and the step's accent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteShape {
    pub frequency: f64,
    pub peak: f64,
    pub base_cutoff: f64,
    pub env_amount: f64,
    pub decay: f64,
    pub amp_time_constant: f64,
    pub resonance: f64,
}

impl NoteShape {
    pub fn new(step: &BassStep, settings: &BassSettings) -> Self {
        let accent = if step.accent { norm(settings.accent) } else { 0.0 };
        let decay = 0.2 + norm(settings.decay) * 1.8;
        let mut amp_time_constant = decay / 4.0;
        if step.accent {
            amp_time_constant /= 2.0;
        }
        let peak_scale = if step.accent { 0.8 + 0.4 * accent } else { 0.8 };

        NoteShape {
            frequency: step.frequency() * (2.0_f64).powf(settings.tune.clamp(-1200.0, 1200.0) / 1200.0),
            peak: norm(settings.volume) * 0.7 * peak_scale,
            base_cutoff: 300.0 + norm(settings.cutoff) * 8000.0 + 1000.0 * accent,
            env_amount: norm(settings.env_mod) * 5000.0 + 2500.0 * accent,
            decay,
            amp_time_constant,
            resonance: (settings.resonance / 15.0).clamp(0.0, MAX_RESONANCE),
        }
    }
}

/// One sounding bass note: oscillator → ladder filter → VCA.
#[derive(Debug, Clone)]
struct BassNote {
    id: u64,
    osc: Oscillator,
    filter: LadderFilter,
    freq: Automation,
    cutoff: Automation,
    gain: Automation,
    resonance: f64,
    life: Lifetime,
    sample_rate: f64,
}

impl BassNote {
    fn start(id: u64, time: f64, shape: &NoteShape, waveform: BassWaveform, sample_rate: f64) -> Self {
        let mut freq = Automation::new(shape.frequency);
        freq.set_value_at(shape.frequency, time);

        let mut cutoff = Automation::new(shape.base_cutoff);
        cutoff.set_value_at(shape.base_cutoff, time);
        cutoff.linear_ramp_to(shape.base_cutoff + shape.env_amount, time + FILTER_ATTACK);
        cutoff.exponential_ramp_to(shape.base_cutoff, time + FILTER_ATTACK + shape.decay / 3.0);

        let mut gain = Automation::new(0.0);
        gain.set_value_at(0.0, time);
        gain.linear_ramp_to(shape.peak, time + ATTACK);
        gain.set_target_at(0.0, time + ATTACK, shape.amp_time_constant);

        let waveform = match waveform {
            BassWaveform::Saw => Waveform::Sawtooth,
            BassWaveform::Square => Waveform::Square,
        };

        BassNote {
            id,
            osc: Oscillator::new(waveform, sample_rate),
            filter: LadderFilter::new(sample_rate),
            freq,
            cutoff,
            gain,
            resonance: shape.resonance,
            life: Lifetime::starting_at(time),
            sample_rate,
        }
    }

    /// Legato move to a new pitch without restarting the envelopes.
    fn glide(&mut self, time: f64, shape: &NoteShape) {
        self.freq.cancel_and_hold_at(time);
        self.freq.exponential_ramp_to(shape.frequency, time + SLIDE_TIME);
        self.cutoff.cancel_and_hold_at(time);
        self.cutoff.linear_ramp_to(shape.base_cutoff, time + SLIDE_TIME);
        self.gain.cancel_and_hold_at(time);
        self.gain.linear_ramp_to(shape.peak, time + SLIDE_TIME);
        self.resonance = shape.resonance;
    }

    fn gate_off(&mut self, time: f64) {
        self.gain.set_target_at(0.0, time, RELEASE_TC);
        self.life.stop_at(time + RELEASE_TAIL);
    }
}

impl Voice for BassNote {
    fn render_add(&mut self, start_frame: u64, out: &mut [f64]) {
        let block_start = start_frame as f64 / self.sample_rate;
        self.freq.prune_before(block_start);
        self.cutoff.prune_before(block_start);
        self.gain.prune_before(block_start);

        for (i, slot) in out.iter_mut().enumerate() {
            let t = (start_frame + i as u64) as f64 / self.sample_rate;
            if !self.life.contains(t) {
                continue;
            }
            let s = self.osc.next_sample(self.freq.value_at(t));
            let filtered = self.filter.process(s, self.cutoff.value_at(t), self.resonance);
            *slot += filtered * self.gain.value_at(t);
        }
    }

    fn is_finished(&self, time: f64) -> bool {
        self.life.is_over(time)
    }

    fn kill(&mut self, time: f64) {
        self.gain.cancel_scheduled_values(time);
        self.gain.set_value_at(0.0, time);
        self.life.stop_at(time);
    }
}

/// The engine of one bass unit.
pub struct BassVoice {
    sample_rate: f64,
    active: Option<BassNote>,
    released: VoicePool<BassNote>,
    next_id: u64,
    delay: Delay,
    delay_time: Automation,
    delay_feedback: Automation,
    delay_wet: Automation,
    dry: Vec<f64>,
}

impl BassVoice {
    pub fn new(sample_rate: f64, max_delay: f64) -> Self {
        let defaults = BassSettings::default();
        BassVoice {
            sample_rate,
            active: None,
            released: VoicePool::new(sample_rate),
            next_id: 0,
            delay: Delay::new(sample_rate, max_delay),
            delay_time: Automation::new(delay_seconds(&defaults, 120.0, max_delay)),
            delay_feedback: Automation::new(norm(defaults.delay_feedback) * 0.95),
            delay_wet: Automation::new(norm(defaults.delay_wet)),
            dry: Vec::new(),
        }
    }

    /// Advance the unit to `step_index` of `sequence` at `time`.
    ///
    /// Returns false (and does nothing) for unusable input: non-finite
    /// knobs or tempo, an out-of-range step index, or an unplayable note.
    pub fn process_step(
        &mut self,
        time: f64,
        step_index: usize,
        sequence: &Sequence,
        settings: &BassSettings,
        tempo: f64,
    ) -> bool {
        if step_index >= STEPS || !self.accepts(time, settings, tempo) {
            return false;
        }
        let step = sequence[step_index];
        if step.active && !step.is_playable() {
            return false;
        }

        self.update_delay(time, settings, tempo);
        if !step.active {
            self.kill(time);
            return true;
        }

        let prev = sequence[(step_index + STEPS - 1) % STEPS];
        let shape = NoteShape::new(&step, settings);
        match self.active.as_mut() {
            Some(note) if prev.active && prev.slide => {
                note.glide(time, &shape);
                if !step.slide {
                    note.gate_off(time + gate_length(tempo));
                }
            }
            _ => self.retrigger(time, &step, settings, &shape, tempo),
        }
        true
    }

    /// Audition a single step. There is no previous step, so it never slides.
    pub fn play_step(&mut self, time: f64, step: &BassStep, settings: &BassSettings, tempo: f64) -> bool {
        if !step.active || !step.is_playable() || !self.accepts(time, settings, tempo) {
            return false;
        }
        let step = BassStep { slide: false, ..*step };
        self.update_delay(time, settings, tempo);
        let shape = NoteShape::new(&step, settings);
        self.retrigger(time, &step, settings, &shape, tempo);
        true
    }

    fn accepts(&self, time: f64, settings: &BassSettings, tempo: f64) -> bool {
        time.is_finite() && tempo.is_finite() && tempo > 0.0 && settings.is_valid()
    }

    fn retrigger(&mut self, time: f64, step: &BassStep, settings: &BassSettings, shape: &NoteShape, tempo: f64) {
        self.kill(time);
        let mut note = BassNote::start(self.next_id, time, shape, settings.waveform, self.sample_rate);
        self.next_id += 1;
        if !step.slide {
            note.gate_off(time + gate_length(tempo));
        }
        self.active = Some(note);
    }

    fn update_delay(&mut self, time: f64, settings: &BassSettings, tempo: f64) {
        let seconds = delay_seconds(settings, tempo, self.delay.max_delay());
        self.delay_time.set_target_at(seconds, time, DELAY_SMOOTHING);
        self.delay_feedback.set_target_at(norm(settings.delay_feedback) * 0.95, time, DELAY_SMOOTHING);
        self.delay_wet.set_target_at(norm(settings.delay_wet), time, DELAY_SMOOTHING);
    }

    /// Silence the sounding note at `time` and return to idle.
    pub fn kill(&mut self, time: f64) {
        if let Some(mut note) = self.active.take() {
            note.kill(time);
            self.released.push(note);
        }
    }

    /// Silence the sounding note and every releasing tail at `time`.
    pub fn kill_all(&mut self, time: f64) {
        self.kill(time);
        self.released.kill_all(time);
    }

    pub fn is_sounding(&self) -> bool {
        self.active.is_some()
    }

    /// Identity of the sounding note; unchanged across a slide.
    pub fn active_note_id(&self) -> Option<u64> {
        self.active.as_ref().map(|n| n.id)
    }

    /// Oscillator frequency of the sounding note at `time`.
    pub fn active_frequency(&self, time: f64) -> Option<f64> {
        self.active.as_ref().map(|n| n.freq.value_at(time))
    }

    /// Add this unit's output (dry plus delay send) for one block.
    pub fn render_add(&mut self, start_frame: u64, out: &mut [f64]) {
        self.dry.clear();
        self.dry.resize(out.len(), 0.0);
        if let Some(note) = self.active.as_mut() {
            note.render_add(start_frame, &mut self.dry);
        }
        self.released.render_add(start_frame, &mut self.dry);

        let block_start = start_frame as f64 / self.sample_rate;
        self.delay_time.prune_before(block_start);
        self.delay_feedback.prune_before(block_start);
        self.delay_wet.prune_before(block_start);

        for (i, slot) in out.iter_mut().enumerate() {
            let t = (start_frame + i as u64) as f64 / self.sample_rate;
            self.delay.delay_time = self.delay_time.value_at(t);
            self.delay.feedback = self.delay_feedback.value_at(t);
            self.delay.wet = self.delay_wet.value_at(t);
            *slot += self.delay.process(self.dry[i]);
        }
    }
}

/// Delay time as a fraction of a whole note at `tempo`.
fn delay_seconds(settings: &BassSettings, tempo: f64, max_delay: f64) -> f64 {
    (norm(settings.delay_time) * (240.0 / tempo)).clamp(MIN_DELAY_TIME, max_delay.max(MIN_DELAY_TIME))
}
