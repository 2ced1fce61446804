//! Project state — the pattern store the scheduler and the codec read.
//!
//! The live knob values of the current pattern are kept apart from the
//! stored patterns. Callers flush them back explicitly (before export or a
//! pattern switch); nothing here does it behind their back.

use std::collections::{BTreeMap, BTreeSet};

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StateError;
use crate::model::{
    BassSettings, BassStep, DRUM_TRACKS, DrumParams, DrumTrackId, DrumTrackSettings, PATTERN_COUNT, Pattern, STEPS,
    Sequence, TransportMode, TriggerMask,
};

/// Current state schema version.
pub const STATE_VERSION: u32 = 5;
pub const MIN_TEMPO: u16 = 60;
pub const MAX_TEMPO: u16 = 200;

/// What the scheduler needs to know to pick the pattern for a step.
pub trait PatternStore {
    fn mode(&self) -> TransportMode;
    fn song_len(&self) -> usize;
    /// Pattern played at `song_index` (song mode) or the current pattern.
    fn active_pattern(&self, song_index: usize) -> usize;
}

/// Knob state of the current pattern as the user is editing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveSettings {
    pub bass: [BassSettings; 2],
    pub drums: [DrumTrackSettings; DRUM_TRACKS],
}

impl Default for LiveSettings {
    fn default() -> Self {
        LiveSettings {
            bass: [BassSettings::default(); 2],
            drums: std::array::from_fn(|i| DrumTrackSettings::new(DrumTrackId::ALL[i])),
        }
    }
}

impl LiveSettings {
    fn from_pattern(pattern: &Pattern) -> Self {
        LiveSettings {
            bass: [pattern.bass[0].settings, pattern.bass[1].settings],
            drums: pattern.drums.settings(),
        }
    }
}

/// The whole project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectState {
    pub ver: u32,
    pub tempo: u16,
    pub swing: u8,
    pub mode: TransportMode,
    pub current_pattern: usize,
    pub patterns: [Pattern; PATTERN_COUNT],
    /// Pattern ids in play order.
    pub song: Vec<u8>,
    /// Drum tracks that are switched on.
    pub active_tracks: BTreeSet<DrumTrackId>,
    /// Track → user sample id.
    #[serde(default)]
    pub custom_samples: BTreeMap<DrumTrackId, String>,
    #[serde(default)]
    pub live: LiveSettings,
}

impl Default for ProjectState {
    fn default() -> Self {
        ProjectState {
            ver: STATE_VERSION,
            tempo: 125,
            swing: 50,
            mode: TransportMode::Pattern,
            current_pattern: 0,
            patterns: Default::default(),
            song: vec![0],
            active_tracks: DrumTrackId::ALL.into_iter().collect(),
            custom_samples: BTreeMap::new(),
            live: LiveSettings::default(),
        }
    }
}

impl ProjectState {
    pub fn set_tempo(&mut self, bpm: f64) {
        if bpm.is_finite() {
            self.tempo = bpm.round().clamp(MIN_TEMPO as f64, MAX_TEMPO as f64) as u16;
        }
    }

    pub fn set_swing(&mut self, swing: f64) {
        if swing.is_finite() {
            self.swing = swing.round().clamp(0.0, 100.0) as u8;
        }
    }

    pub fn pattern(&self, id: usize) -> &Pattern {
        &self.patterns[id.min(PATTERN_COUNT - 1)]
    }

    pub fn pattern_mut(&mut self, id: usize) -> &mut Pattern {
        &mut self.patterns[id.min(PATTERN_COUNT - 1)]
    }

    /// Write the live knobs into the current pattern.
    pub fn flush_live_settings(&mut self) {
        let live = self.live.clone();
        let pattern = self.pattern_mut(self.current_pattern);
        pattern.bass[0].settings = live.bass[0];
        pattern.bass[1].settings = live.bass[1];
        for (track, settings) in pattern.drums.tracks.iter_mut().zip(live.drums) {
            track.settings = settings;
        }
    }

    /// Make `id` the current pattern and load its stored knobs as the live
    /// state. Unflushed live edits are discarded.
    pub fn select_pattern(&mut self, id: usize) {
        self.current_pattern = id.min(PATTERN_COUNT - 1);
        self.live = LiveSettings::from_pattern(self.pattern(self.current_pattern));
    }

    /// Copy the current pattern's stored knobs into the live state.
    pub fn load_live_settings(&mut self) {
        self.select_pattern(self.current_pattern);
    }

    pub fn bass_sequence(&self, pattern_id: usize, unit: usize) -> &Sequence {
        &self.pattern(pattern_id).bass[unit.min(1)].sequence
    }

    /// Bass knobs for a pattern: live values for the current pattern,
    /// stored values for any other.
    pub fn bass_settings(&self, pattern_id: usize, unit: usize) -> &BassSettings {
        let unit = unit.min(1);
        if pattern_id == self.current_pattern {
            &self.live.bass[unit]
        } else {
            &self.pattern(pattern_id).bass[unit].settings
        }
    }

    /// Trigger masks of a pattern, with switched-off tracks cleared.
    pub fn drum_masks(&self, pattern_id: usize) -> [TriggerMask; DRUM_TRACKS] {
        let mut masks = self.pattern(pattern_id).drums.masks();
        for id in DrumTrackId::ALL {
            if !self.active_tracks.contains(&id) {
                masks[id.index()] = TriggerMask::default();
            }
        }
        masks
    }

    pub fn drum_settings(&self, pattern_id: usize) -> [DrumTrackSettings; DRUM_TRACKS] {
        if pattern_id == self.current_pattern {
            self.live.drums.clone()
        } else {
            self.pattern(pattern_id).drums.settings()
        }
    }

    /// Active-track set as a bitmask, bit `n` = [`DrumTrackId::index`] `n`.
    pub fn active_mask(&self) -> u16 {
        self.active_tracks.iter().fold(0, |mask, id| mask | (1 << id.index()))
    }

    pub fn set_active_mask(&mut self, mask: u16) {
        self.active_tracks = DrumTrackId::ALL
            .into_iter()
            .filter(|id| mask & (1 << id.index()) != 0)
            .collect();
    }

    /// Pattern id at `song_index`, clamped to a valid pattern.
    pub fn resolve_song_pattern(&self, song_index: usize) -> usize {
        match self.song.get(song_index) {
            Some(&id) => (id as usize).min(PATTERN_COUNT - 1),
            None => self.current_pattern,
        }
    }
}

impl PatternStore for ProjectState {
    fn mode(&self) -> TransportMode {
        self.mode
    }

    fn song_len(&self) -> usize {
        self.song.len()
    }

    fn active_pattern(&self, song_index: usize) -> usize {
        match self.mode {
            TransportMode::Song if !self.song.is_empty() => self.resolve_song_pattern(song_index),
            _ => self.current_pattern,
        }
    }
}

// ── Legacy schema ───────────────────────────────────────────

/// Version 4 layout: one flat pattern, no pattern bank.
#[derive(Debug, Clone, Deserialize)]
struct LegacyState {
    #[serde(default = "legacy_tempo")]
    tempo: f64,
    #[serde(default = "legacy_swing")]
    swing: f64,
    #[serde(default)]
    seq303_1: Vec<BassStep>,
    #[serde(default)]
    seq303_2: Vec<BassStep>,
    #[serde(default)]
    seq909: BTreeMap<DrumTrackId, Vec<bool>>,
    #[serde(default)]
    settings303_1: BassSettings,
    #[serde(default)]
    settings303_2: BassSettings,
    #[serde(default)]
    settings909: BTreeMap<DrumTrackId, DrumParams>,
    #[serde(default)]
    active_tracks: Option<BTreeSet<DrumTrackId>>,
    #[serde(default)]
    custom_samples: BTreeMap<DrumTrackId, String>,
}

fn legacy_tempo() -> f64 {
    125.0
}

fn legacy_swing() -> f64 {
    50.0
}

fn legacy_sequence(steps: &[BassStep]) -> Sequence {
    let mut seq = Sequence::default();
    for (slot, step) in seq.iter_mut().zip(steps.iter().take(STEPS)) {
        *slot = *step;
    }
    seq
}

impl LegacyState {
    /// Lift the flat layout into pattern 0 of a fresh v5 project.
    fn migrate(self) -> ProjectState {
        let mut state = ProjectState::default();
        state.set_tempo(self.tempo);
        state.set_swing(self.swing);

        let pattern = &mut state.patterns[0];
        pattern.bass[0].sequence = legacy_sequence(&self.seq303_1);
        pattern.bass[0].settings = self.settings303_1;
        pattern.bass[1].sequence = legacy_sequence(&self.seq303_2);
        pattern.bass[1].settings = self.settings303_2;

        for (id, steps) in &self.seq909 {
            pattern.drums.track_mut(*id).steps = TriggerMask::from_steps(steps);
        }
        for (id, params) in &self.settings909 {
            if params.fits(*id) {
                pattern.drums.track_mut(*id).settings.params = *params;
            }
        }
        if let Some(active) = self.active_tracks {
            state.active_tracks = active;
        }
        state.custom_samples = self.custom_samples;
        state.load_live_settings();
        state
    }
}

// ── Loading ─────────────────────────────────────────────────

/// Parse a stored project, upgrading older schemas.
///
/// A missing `ver` field means version 4.
pub fn load_state_json(json: &str) -> Result<ProjectState, StateError> {
    let value: Value = serde_json::from_str(json)?;
    let version = value.get("ver").and_then(Value::as_u64).map_or(4, |v| v as u32);
    match version {
        4 => Ok(serde_json::from_value::<LegacyState>(value)?.migrate()),
        STATE_VERSION => {
            let mut state: ProjectState = serde_json::from_value(value)?;
            state.current_pattern = state.current_pattern.min(PATTERN_COUNT - 1);
            state.tempo = state.tempo.clamp(MIN_TEMPO, MAX_TEMPO);
            state.swing = state.swing.min(100);
            Ok(state)
        }
        other => Err(StateError::UnsupportedVersion(other)),
    }
}

/// [`load_state_json`], falling back to a fresh project.
pub fn load_state_or_default(json: &str) -> ProjectState {
    load_state_json(json).unwrap_or_else(|e| {
        warn!("discarding unreadable project: {e}");
        ProjectState::default()
    })
}

pub fn save_state_json(state: &ProjectState) -> Result<String, StateError> {
    Ok(serde_json::to_string(state)?)
}
