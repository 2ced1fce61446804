//! Lookahead scheduler — turns tempo, swing and transport state into
//! timestamped step events.
//!
//! The host calls [`Scheduler::wake`] from a coarse periodic timer. Every
//! step that falls inside the lookahead window is emitted with its exact
//! start time, so timer jitter never reaches the audio.

use log::debug;

use crate::model::{STEPS, TransportMode};
use crate::state::{MAX_TEMPO, MIN_TEMPO, PatternStore};

/// Default lookahead window in seconds.
pub const LOOKAHEAD: f64 = 0.1;

/// A step due to be played.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepEvent {
    /// Absolute start time on the audio clock.
    pub time: f64,
    pub step: usize,
    pub pattern_id: usize,
    pub song_index: usize,
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    is_playing: bool,
    current_step: usize,
    song_index: usize,
    next_note_time: f64,
    tempo: f64,
    swing: f64,
    lookahead: f64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Scheduler::new(LOOKAHEAD)
    }
}

impl Scheduler {
    pub fn new(lookahead: f64) -> Self {
        Scheduler {
            is_playing: false,
            current_step: 0,
            song_index: 0,
            next_note_time: 0.0,
            tempo: 125.0,
            swing: 50.0,
            lookahead: if lookahead.is_finite() && lookahead > 0.0 { lookahead } else { LOOKAHEAD },
        }
    }

    pub fn set_tempo(&mut self, bpm: f64) {
        if bpm.is_finite() {
            self.tempo = bpm.clamp(MIN_TEMPO as f64, MAX_TEMPO as f64);
        }
    }

    pub fn set_swing(&mut self, swing: f64) {
        if swing.is_finite() {
            self.swing = swing.clamp(0.0, 100.0);
        }
    }

    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    pub fn swing(&self) -> f64 {
        self.swing
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn song_index(&self) -> usize {
        self.song_index
    }

    pub fn next_note_time(&self) -> f64 {
        self.next_note_time
    }

    /// Length of `step` in seconds. A pair of steps always spans one 8th note.
    pub fn step_duration(&self, step: usize) -> f64 {
        let sixteenth = 60.0 / self.tempo / 4.0;
        if step % 2 == 0 {
            2.0 * sixteenth * self.swing / 100.0
        } else {
            2.0 * sixteenth * (100.0 - self.swing) / 100.0
        }
    }

    /// Start from step 0 of the song at `now`. The host silences its
    /// voices before calling this.
    pub fn play(&mut self, now: f64) {
        self.is_playing = true;
        self.current_step = 0;
        self.song_index = 0;
        self.next_note_time = now;
        debug!("transport started at {now:.3}s");
    }

    /// Halt. The host silences its voices at the same `now`.
    pub fn stop(&mut self) {
        if self.is_playing {
            debug!("transport stopped at step {}", self.current_step);
        }
        self.is_playing = false;
    }

    /// Emit every step starting before `now + lookahead` into `events`.
    ///
    /// Returns whether the host should keep its timer running.
    pub fn wake<S: PatternStore>(&mut self, now: f64, store: &S, events: &mut Vec<StepEvent>) -> bool {
        if !self.is_playing {
            return false;
        }
        while self.next_note_time < now + self.lookahead {
            events.push(StepEvent {
                time: self.next_note_time,
                step: self.current_step,
                pattern_id: store.active_pattern(self.song_index),
                song_index: self.song_index,
            });
            self.advance(store);
        }
        true
    }

    fn advance<S: PatternStore>(&mut self, store: &S) {
        self.next_note_time += self.step_duration(self.current_step);
        self.current_step = (self.current_step + 1) % STEPS;
        if self.current_step == 0 && store.mode() == TransportMode::Song {
            let len = store.song_len().max(1);
            self.song_index = (self.song_index + 1) % len;
            debug!("song position {} -> pattern {}", self.song_index, store.active_pattern(self.song_index));
        }
    }
}
