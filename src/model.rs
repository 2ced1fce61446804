//! Sequence and sound-parameter types shared by the engines, the scheduler
//! and the codec.

use serde::{Deserialize, Serialize};

/// Steps per pattern (one bar of 16th notes).
pub const STEPS: usize = 16;
/// Patterns held by a project.
pub const PATTERN_COUNT: usize = 16;
/// Highest bass octave.
pub const MAX_OCTAVE: u8 = 4;
/// Number of drum tracks.
pub const DRUM_TRACKS: usize = 11;

// ── Notes ───────────────────────────────────────────────────

/// Pitch class of a bass step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Note {
    #[default]
    C,
    #[serde(rename = "C#")]
    Cs,
    D,
    #[serde(rename = "D#")]
    Ds,
    E,
    F,
    #[serde(rename = "F#")]
    Fs,
    G,
    #[serde(rename = "G#")]
    Gs,
    A,
    #[serde(rename = "A#")]
    As,
    B,
}

impl Note {
    pub const ALL: [Note; 12] = [
        Note::C,
        Note::Cs,
        Note::D,
        Note::Ds,
        Note::E,
        Note::F,
        Note::Fs,
        Note::G,
        Note::Gs,
        Note::A,
        Note::As,
        Note::B,
    ];

    /// Semitones above C.
    pub fn semitone(self) -> u8 {
        self as u8
    }

    /// Pitch class for a semitone index (taken modulo 12).
    pub fn from_semitone(index: u8) -> Note {
        Note::ALL[(index % 12) as usize]
    }
}

/// Frequency of `note` in `octave`, C0-relative: `16.35 * 2^((octave*12 + semitone)/12)`.
pub fn note_frequency(note: Note, octave: u8) -> f64 {
    let semis = octave as f64 * 12.0 + note.semitone() as f64;
    16.35 * (2.0_f64).powf(semis / 12.0)
}

// ── Bass ────────────────────────────────────────────────────

/// One step of a bass sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BassStep {
    pub active: bool,
    pub note: Note,
    pub octave: u8,
    pub accent: bool,
    pub slide: bool,
}

impl Default for BassStep {
    fn default() -> Self {
        BassStep {
            active: false,
            note: Note::C,
            octave: 2,
            accent: false,
            slide: false,
        }
    }
}

impl BassStep {
    /// An active step with no accent or slide.
    pub fn note(note: Note, octave: u8) -> Self {
        BassStep {
            active: true,
            note,
            octave,
            ..BassStep::default()
        }
    }

    /// False for steps an engine must refuse to play.
    pub fn is_playable(&self) -> bool {
        self.octave <= MAX_OCTAVE
    }

    pub fn frequency(&self) -> f64 {
        note_frequency(self.note, self.octave)
    }
}

/// Sixteen bass steps.
pub type Sequence = [BassStep; STEPS];

/// Bass oscillator shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BassWaveform {
    #[default]
    Saw,
    Square,
}

/// Synthesis parameters of one bass unit.
///
/// `tune` is in cents (-1200..=1200), `resonance` is 0-15, every other knob
/// is 0-100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BassSettings {
    pub waveform: BassWaveform,
    pub tune: f64,
    pub cutoff: f64,
    pub resonance: f64,
    pub env_mod: f64,
    pub decay: f64,
    pub accent: f64,
    pub volume: f64,
    pub delay_time: f64,
    pub delay_feedback: f64,
    pub delay_wet: f64,
}

impl Default for BassSettings {
    fn default() -> Self {
        BassSettings {
            waveform: BassWaveform::Saw,
            tune: 0.0,
            cutoff: 50.0,
            resonance: 8.0,
            env_mod: 50.0,
            decay: 50.0,
            accent: 100.0,
            volume: 80.0,
            delay_time: 38.0,
            delay_feedback: 30.0,
            delay_wet: 0.0,
        }
    }
}

impl BassSettings {
    /// The ten numeric knobs in wire order.
    pub fn knobs(&self) -> [f64; 10] {
        [
            self.tune,
            self.cutoff,
            self.resonance,
            self.env_mod,
            self.decay,
            self.accent,
            self.volume,
            self.delay_time,
            self.delay_feedback,
            self.delay_wet,
        ]
    }

    /// Every knob holds a finite number.
    pub fn is_valid(&self) -> bool {
        self.knobs().iter().all(|v| v.is_finite())
    }
}

/// Sequence and settings of one bass unit within a pattern.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BassUnit {
    pub sequence: Sequence,
    pub settings: BassSettings,
}

// ── Drums ───────────────────────────────────────────────────

/// The eleven fixed drum tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrumTrackId {
    Bd,
    Sd,
    Lt,
    Mt,
    Ht,
    Rs,
    Cp,
    Ch,
    Oh,
    Cr,
    Rd,
}

impl DrumTrackId {
    pub const ALL: [DrumTrackId; DRUM_TRACKS] = [
        DrumTrackId::Bd,
        DrumTrackId::Sd,
        DrumTrackId::Lt,
        DrumTrackId::Mt,
        DrumTrackId::Ht,
        DrumTrackId::Rs,
        DrumTrackId::Cp,
        DrumTrackId::Ch,
        DrumTrackId::Oh,
        DrumTrackId::Cr,
        DrumTrackId::Rd,
    ];

    /// Position in [`DrumTrackId::ALL`]; also the wire id.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<DrumTrackId> {
        DrumTrackId::ALL.get(index).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DrumTrackId::Bd => "bd",
            DrumTrackId::Sd => "sd",
            DrumTrackId::Lt => "lt",
            DrumTrackId::Mt => "mt",
            DrumTrackId::Ht => "ht",
            DrumTrackId::Rs => "rs",
            DrumTrackId::Cp => "cp",
            DrumTrackId::Ch => "ch",
            DrumTrackId::Oh => "oh",
            DrumTrackId::Cr => "cr",
            DrumTrackId::Rd => "rd",
        }
    }

    pub fn parse(s: &str) -> Option<DrumTrackId> {
        DrumTrackId::ALL.into_iter().find(|id| id.as_str() == s)
    }

    /// Tracks with a factory synth voice (the rest are sample-only).
    pub fn is_synth(self) -> bool {
        !matches!(self, DrumTrackId::Ch | DrumTrackId::Oh | DrumTrackId::Cr | DrumTrackId::Rd)
    }
}

/// Knob values of one drum track, shaped by instrument.
///
/// Knobs are 0-100 except `level`, which is 0-200.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DrumParams {
    Bd { tune: f64, level: f64, attack: f64, decay: f64 },
    Sd { tune: f64, level: f64, tone: f64, snappy: f64 },
    Tom { tune: f64, level: f64, decay: f64 },
    Rs { tune: f64, level: f64, decay: f64 },
    Cp { level: f64, tone: f64, decay: f64 },
    Hat { tune: f64, level: f64, decay: f64 },
    Cymbal { tune: f64, level: f64, decay: f64 },
}

impl DrumParams {
    /// Factory knob positions for a track.
    pub fn default_for(id: DrumTrackId) -> DrumParams {
        DrumParams::from_knobs(id, &[])
    }

    /// Build from knob values in wire order; missing values take defaults.
    pub fn from_knobs(id: DrumTrackId, knobs: &[f64]) -> DrumParams {
        let k = |i: usize, default: f64| knobs.get(i).copied().unwrap_or(default);
        match id {
            DrumTrackId::Bd => DrumParams::Bd {
                tune: k(0, 50.0),
                level: k(1, 100.0),
                attack: k(2, 50.0),
                decay: k(3, 50.0),
            },
            DrumTrackId::Sd => DrumParams::Sd {
                tune: k(0, 50.0),
                level: k(1, 100.0),
                tone: k(2, 50.0),
                snappy: k(3, 50.0),
            },
            DrumTrackId::Lt | DrumTrackId::Mt | DrumTrackId::Ht => DrumParams::Tom {
                tune: k(0, 50.0),
                level: k(1, 100.0),
                decay: k(2, 50.0),
            },
            DrumTrackId::Rs => DrumParams::Rs {
                tune: k(0, 50.0),
                level: k(1, 100.0),
                decay: k(2, 50.0),
            },
            DrumTrackId::Cp => DrumParams::Cp {
                level: k(0, 100.0),
                tone: k(1, 50.0),
                decay: k(2, 50.0),
            },
            DrumTrackId::Ch | DrumTrackId::Oh => DrumParams::Hat {
                tune: k(0, 50.0),
                level: k(1, 100.0),
                decay: k(2, 50.0),
            },
            DrumTrackId::Cr | DrumTrackId::Rd => DrumParams::Cymbal {
                tune: k(0, 50.0),
                level: k(1, 100.0),
                decay: k(2, 50.0),
            },
        }
    }

    /// Knob values in wire order.
    pub fn knobs(&self) -> Vec<f64> {
        match *self {
            DrumParams::Bd { tune, level, attack, decay } => vec![tune, level, attack, decay],
            DrumParams::Sd { tune, level, tone, snappy } => vec![tune, level, tone, snappy],
            DrumParams::Tom { tune, level, decay }
            | DrumParams::Rs { tune, level, decay }
            | DrumParams::Hat { tune, level, decay }
            | DrumParams::Cymbal { tune, level, decay } => vec![tune, level, decay],
            DrumParams::Cp { level, tone, decay } => vec![level, tone, decay],
        }
    }

    /// Whether this variant is the right shape for `id`.
    pub fn fits(&self, id: DrumTrackId) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(&DrumParams::default_for(id))
    }

    pub fn level(&self) -> f64 {
        match *self {
            DrumParams::Bd { level, .. }
            | DrumParams::Sd { level, .. }
            | DrumParams::Tom { level, .. }
            | DrumParams::Rs { level, .. }
            | DrumParams::Cp { level, .. }
            | DrumParams::Hat { level, .. }
            | DrumParams::Cymbal { level, .. } => level,
        }
    }

    /// Tune knob; the clap has none and reports the centre position.
    pub fn tune(&self) -> f64 {
        match *self {
            DrumParams::Bd { tune, .. }
            | DrumParams::Sd { tune, .. }
            | DrumParams::Tom { tune, .. }
            | DrumParams::Rs { tune, .. }
            | DrumParams::Hat { tune, .. }
            | DrumParams::Cymbal { tune, .. } => tune,
            DrumParams::Cp { .. } => 50.0,
        }
    }

    /// Decay knob; the snare's snappy knob doubles as its decay.
    pub fn decay(&self) -> f64 {
        match *self {
            DrumParams::Bd { decay, .. }
            | DrumParams::Tom { decay, .. }
            | DrumParams::Rs { decay, .. }
            | DrumParams::Cp { decay, .. }
            | DrumParams::Hat { decay, .. }
            | DrumParams::Cymbal { decay, .. } => decay,
            DrumParams::Sd { snappy, .. } => snappy,
        }
    }

    /// Voice level multiplier in [0, 1] (`level / 200`).
    pub fn voice_level(&self) -> f64 {
        let level = self.level();
        if level.is_finite() { (level / 200.0).clamp(0.0, 1.0) } else { 0.0 }
    }

    pub fn is_valid(&self) -> bool {
        self.knobs().iter().all(|v| v.is_finite())
    }
}

/// The drop/ring/bright macro applied on top of a synth track's patch.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Shaper {
    pub enabled: bool,
    pub drop: f64,
    pub ring: f64,
    pub bright: f64,
}

/// A JSON object overriding fields of the drum synth patch.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomPatch(pub serde_json::Map<String, serde_json::Value>);

impl CustomPatch {
    pub fn from_json(json: &str) -> Result<CustomPatch, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> String {
        serde_json::Value::Object(self.0.clone()).to_string()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Everything a drum track needs to make a sound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrumTrackSettings {
    pub params: DrumParams,
    #[serde(default)]
    pub shaper: Shaper,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_patch: Option<CustomPatch>,
}

impl DrumTrackSettings {
    pub fn new(id: DrumTrackId) -> Self {
        DrumTrackSettings {
            params: DrumParams::default_for(id),
            shaper: Shaper::default(),
            custom_patch: None,
        }
    }

    /// The override patch, if one is set and non-empty.
    pub fn active_custom_patch(&self) -> Option<&CustomPatch> {
        self.custom_patch.as_ref().filter(|p| !p.is_empty())
    }
}

/// Sixteen trigger bits, bit `n` = step `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriggerMask(pub u16);

impl TriggerMask {
    pub fn is_set(self, step: usize) -> bool {
        step < STEPS && self.0 & (1 << step) != 0
    }

    pub fn set(&mut self, step: usize, on: bool) {
        if step >= STEPS {
            return;
        }
        if on {
            self.0 |= 1 << step;
        } else {
            self.0 &= !(1 << step);
        }
    }

    pub fn from_steps(steps: &[bool]) -> TriggerMask {
        let mut mask = TriggerMask::default();
        for (i, &on) in steps.iter().take(STEPS).enumerate() {
            mask.set(i, on);
        }
        mask
    }
}

/// One drum track within a pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrumTrack {
    pub steps: TriggerMask,
    pub settings: DrumTrackSettings,
}

impl DrumTrack {
    pub fn new(id: DrumTrackId) -> Self {
        DrumTrack {
            steps: TriggerMask::default(),
            settings: DrumTrackSettings::new(id),
        }
    }
}

/// The drum machine's part of a pattern, indexed by [`DrumTrackId::index`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrumUnit {
    pub tracks: [DrumTrack; DRUM_TRACKS],
}

impl Default for DrumUnit {
    fn default() -> Self {
        DrumUnit {
            tracks: std::array::from_fn(|i| DrumTrack::new(DrumTrackId::ALL[i])),
        }
    }
}

impl DrumUnit {
    pub fn track(&self, id: DrumTrackId) -> &DrumTrack {
        &self.tracks[id.index()]
    }

    pub fn track_mut(&mut self, id: DrumTrackId) -> &mut DrumTrack {
        &mut self.tracks[id.index()]
    }

    /// Trigger masks of every track.
    pub fn masks(&self) -> [TriggerMask; DRUM_TRACKS] {
        std::array::from_fn(|i| self.tracks[i].steps)
    }

    /// Settings of every track.
    pub fn settings(&self) -> [DrumTrackSettings; DRUM_TRACKS] {
        std::array::from_fn(|i| self.tracks[i].settings.clone())
    }
}

// ── Patterns ────────────────────────────────────────────────

/// Addresses one of the three sound units of a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitId {
    Bass1,
    Bass2,
    Drums,
}

impl UnitId {
    pub const ALL: [UnitId; 3] = [UnitId::Bass1, UnitId::Bass2, UnitId::Drums];

    /// Wire id.
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<UnitId> {
        UnitId::ALL.get(code as usize).copied()
    }

    /// Index into [`Pattern::bass`] for bass units.
    pub fn bass_index(self) -> Option<usize> {
        match self {
            UnitId::Bass1 => Some(0),
            UnitId::Bass2 => Some(1),
            UnitId::Drums => None,
        }
    }
}

/// Two bass units and the drum unit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Pattern {
    pub bass: [BassUnit; 2],
    pub drums: DrumUnit,
}

/// Whether playback loops one pattern or walks the song list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    #[default]
    Pattern,
    Song,
}
