//! Sequencer — the host that wires the pattern store, the scheduler and
//! the sound engines to one sample clock.
//!
//! Realtime hosts call [`Sequencer::wake`] from a timer every
//! [`EngineConfig::schedule_interval`] seconds and [`Sequencer::render_block`]
//! from their audio callback. Offline rendering drives both from one loop.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::bass::BassVoice;
use crate::drum::DrumMachine;
use crate::dsp::mixer::Mixer;
use crate::model::{BassStep, DrumTrackId};
use crate::scheduler::{LOOKAHEAD, Scheduler, StepEvent};
use crate::state::ProjectState;

/// Engine-wide settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub sample_rate: f64,
    /// Scheduling window in seconds.
    pub lookahead: f64,
    /// Period of the host's scheduler timer in seconds.
    pub schedule_interval: f64,
    /// Layer user samples on top of the synth voice instead of replacing it.
    pub layer_samples: bool,
    /// Longest bass delay line in seconds.
    pub max_delay: f64,
    /// Frames per offline render block.
    pub block_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            sample_rate: 44100.0,
            lookahead: LOOKAHEAD,
            schedule_interval: 0.025,
            layer_samples: false,
            max_delay: 6.0,
            block_size: 128,
        }
    }
}

impl EngineConfig {
    /// Replace unusable values with the defaults. Hosts hand us
    /// deserialized JSON, so anything may arrive here.
    pub fn sanitized(self) -> Self {
        let defaults = EngineConfig::default();
        let positive = |v: f64| v.is_finite() && v > 0.0;
        let mut config = self;
        if !positive(config.sample_rate) {
            warn!("sample rate {} unusable, using {}", config.sample_rate, defaults.sample_rate);
            config.sample_rate = defaults.sample_rate;
        }
        if !positive(config.max_delay) {
            warn!("max delay {} unusable, using {}", config.max_delay, defaults.max_delay);
            config.max_delay = defaults.max_delay;
        }
        if !positive(config.lookahead) {
            config.lookahead = defaults.lookahead;
        }
        if !positive(config.schedule_interval) {
            config.schedule_interval = defaults.schedule_interval;
        }
        config.block_size = config.block_size.max(1);
        config
    }
}

pub struct Sequencer {
    config: EngineConfig,
    state: ProjectState,
    scheduler: Scheduler,
    bass: [BassVoice; 2],
    drums: DrumMachine,
    mixer: Mixer,
    frame: u64,
    events: Vec<StepEvent>,
}

impl Sequencer {
    pub fn new(config: EngineConfig, state: ProjectState) -> Self {
        let config = config.sanitized();
        let sr = config.sample_rate;
        let mut drums = DrumMachine::new(sr);
        drums.layer_samples = config.layer_samples;
        let mut seq = Sequencer {
            config,
            state,
            scheduler: Scheduler::new(config.lookahead),
            bass: [BassVoice::new(sr, config.max_delay), BassVoice::new(sr, config.max_delay)],
            drums,
            mixer: Mixer::new(),
            frame: 0,
            events: Vec::new(),
        };
        seq.sync_state();
        seq
    }

    fn sync_state(&mut self) {
        self.scheduler.set_tempo(self.state.tempo as f64);
        self.scheduler.set_swing(self.state.swing as f64);
        self.drums.set_custom_assignments(&self.state.custom_samples);
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &ProjectState {
        &self.state
    }

    /// Direct access for sequence and knob edits. Call
    /// [`Sequencer::set_tempo`]/[`Sequencer::set_swing`] for transport
    /// changes so the scheduler follows.
    pub fn state_mut(&mut self) -> &mut ProjectState {
        &mut self.state
    }

    /// Swap in a loaded project. Everything sounding is cut.
    pub fn replace_state(&mut self, state: ProjectState) {
        self.kill_all();
        self.state = state;
        self.sync_state();
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn bass(&self, unit: usize) -> &BassVoice {
        &self.bass[unit.min(1)]
    }

    /// For loading sample assets.
    pub fn drums_mut(&mut self) -> &mut DrumMachine {
        &mut self.drums
    }

    /// Steps dispatched by the last [`Sequencer::wake`].
    pub fn last_events(&self) -> &[StepEvent] {
        &self.events
    }

    /// Current audio clock time in seconds.
    pub fn now(&self) -> f64 {
        self.frame as f64 / self.config.sample_rate
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn set_tempo(&mut self, bpm: f64) {
        self.state.set_tempo(bpm);
        self.scheduler.set_tempo(self.state.tempo as f64);
    }

    pub fn set_swing(&mut self, swing: f64) {
        self.state.set_swing(swing);
        self.scheduler.set_swing(self.state.swing as f64);
    }

    fn kill_all(&mut self) {
        let now = self.now();
        for unit in self.bass.iter_mut() {
            unit.kill_all(now);
        }
        self.drums.kill_all(now);
    }

    /// Silence everything and start from the top.
    pub fn play(&mut self) {
        self.kill_all();
        self.scheduler.play(self.now());
    }

    /// Silence everything and halt scheduling.
    pub fn stop(&mut self) {
        self.kill_all();
        self.scheduler.stop();
    }

    /// Store the live knobs into the current pattern and move to `id`.
    pub fn switch_pattern(&mut self, id: usize) {
        self.state.flush_live_settings();
        self.state.select_pattern(id);
    }

    /// Schedule every step due within the lookahead window. Returns whether
    /// the host timer should keep running.
    pub fn wake(&mut self) -> bool {
        let now = self.now();
        let mut events = std::mem::take(&mut self.events);
        events.clear();
        let running = self.scheduler.wake(now, &self.state, &mut events);
        for event in &events {
            self.dispatch(event);
        }
        self.events = events;
        running
    }

    fn dispatch(&mut self, event: &StepEvent) {
        let tempo = self.scheduler.tempo();
        let pattern = event.pattern_id;
        for (unit, voice) in self.bass.iter_mut().enumerate() {
            voice.process_step(
                event.time,
                event.step,
                self.state.bass_sequence(pattern, unit),
                self.state.bass_settings(pattern, unit),
                tempo,
            );
        }
        let masks = self.state.drum_masks(pattern);
        let settings = self.state.drum_settings(pattern);
        self.drums.process_step(event.time, event.step, &masks, &settings);
    }

    /// Audition one bass step now, using the live knobs.
    pub fn preview_bass(&mut self, unit: usize, step: &BassStep) -> bool {
        let unit = unit.min(1);
        let now = self.now();
        let settings = self.state.live.bass[unit];
        self.bass[unit].play_step(now, step, &settings, self.scheduler.tempo())
    }

    /// Audition one drum track now, using the live knobs.
    pub fn preview_drum(&mut self, id: DrumTrackId) -> usize {
        let now = self.now();
        let settings = self.state.live.drums[id.index()].clone();
        self.drums.trigger(now, id, &settings)
    }

    /// Render the next `out.len() / 2` frames as interleaved stereo and
    /// advance the clock.
    pub fn render_block(&mut self, out: &mut [f32]) {
        let frames = out.len() / 2;
        self.mixer.clear(frames);
        for unit in self.bass.iter_mut() {
            unit.render_add(self.frame, self.mixer.bus_mut());
        }
        self.drums.render_add(self.frame, self.mixer.bus_mut());
        self.mixer.write_interleaved(out);
        self.frame += frames as u64;
    }
}
