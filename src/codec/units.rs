//! Settings and sequence layouts of the three sound units.

use crate::model::{
    BassSettings, BassStep, BassWaveform, DRUM_TRACKS, DrumParams, DrumTrackId, DrumTrackSettings, DrumUnit,
    MAX_OCTAVE, Note, STEPS, Sequence, Shaper, TriggerMask,
};

use super::bytes::{ByteReader, ByteWriter};

/// Numeric bass knobs carried per unit.
pub const BASS_PARAM_COUNT: u8 = 10;
/// Highest wire value of a 0-127 knob.
const KNOB_MAX: f64 = 127.0;
/// Tune is sent in 10-cent steps offset by +1200 cents.
const TUNE_OFFSET: f64 = 1200.0;
const TUNE_STEP: f64 = 10.0;
const TUNE_MAX: f64 = 240.0;

/// Bytes of one bass sequence: pitch and attribute per step.
pub const BASS_SEQUENCE_LEN: usize = STEPS * 2;

const ATTR_ACTIVE: u8 = 0b001;
const ATTR_ACCENT: u8 = 0b010;
const ATTR_SLIDE: u8 = 0b100;

fn quantize(v: f64, max: f64) -> u8 {
    if v.is_finite() { v.round().clamp(0.0, max) as u8 } else { 0 }
}

// ── Bass ────────────────────────────────────────────────────

pub fn write_bass_settings(w: &mut ByteWriter, s: &BassSettings) {
    w.u8(match s.waveform {
        BassWaveform::Saw => 0,
        BassWaveform::Square => 1,
    });
    w.u8(BASS_PARAM_COUNT);
    w.u8(quantize((s.tune + TUNE_OFFSET) / TUNE_STEP, TUNE_MAX));
    for knob in &s.knobs()[1..] {
        w.u8(quantize(*knob, KNOB_MAX));
    }
}

/// Missing bytes keep the default knob value.
pub fn read_bass_settings(r: &mut ByteReader) -> BassSettings {
    let defaults = BassSettings::default();
    let waveform = match r.u8() {
        Some(1) => BassWaveform::Square,
        Some(_) => BassWaveform::Saw,
        None => defaults.waveform,
    };
    let count = r.u8_or(BASS_PARAM_COUNT) as usize;
    let bytes = r.take(count);
    let knob = |i: usize, default: f64| bytes.get(i).map_or(default, |&b| b as f64);

    BassSettings {
        waveform,
        tune: bytes.get(0).map_or(defaults.tune, |&b| (b as f64).min(TUNE_MAX) * TUNE_STEP - TUNE_OFFSET),
        cutoff: knob(1, defaults.cutoff),
        resonance: knob(2, defaults.resonance),
        env_mod: knob(3, defaults.env_mod),
        decay: knob(4, defaults.decay),
        accent: knob(5, defaults.accent),
        volume: knob(6, defaults.volume),
        delay_time: knob(7, defaults.delay_time),
        delay_feedback: knob(8, defaults.delay_feedback),
        delay_wet: knob(9, defaults.delay_wet),
    }
}

fn midi_pitch(step: &BassStep) -> u8 {
    12 * (step.octave.min(MAX_OCTAVE) + 1) + step.note.semitone()
}

pub fn write_bass_sequence(w: &mut ByteWriter, seq: &Sequence) {
    for step in seq {
        let mut attr = 0;
        if step.active {
            attr |= ATTR_ACTIVE;
        }
        if step.accent {
            attr |= ATTR_ACCENT;
        }
        if step.slide {
            attr |= ATTR_SLIDE;
        }
        w.u8(midi_pitch(step));
        w.u8(attr);
    }
}

/// Octaves outside 0-4 are clamped; missing steps are default (off).
pub fn read_bass_sequence(r: &mut ByteReader) -> Sequence {
    let mut seq = Sequence::default();
    for slot in seq.iter_mut() {
        let (Some(pitch), Some(attr)) = (r.u8(), r.u8()) else {
            break;
        };
        let octave = (pitch / 12).saturating_sub(1).min(MAX_OCTAVE);
        *slot = BassStep {
            active: attr & ATTR_ACTIVE != 0,
            note: Note::from_semitone(pitch % 12),
            octave,
            accent: attr & ATTR_ACCENT != 0,
            slide: attr & ATTR_SLIDE != 0,
        };
    }
    seq
}

// ── Drums ───────────────────────────────────────────────────

pub fn write_drum_settings(w: &mut ByteWriter, tracks: &[DrumTrackSettings; DRUM_TRACKS]) {
    w.u8(DRUM_TRACKS as u8);
    for id in DrumTrackId::ALL {
        let settings = &tracks[id.index()];
        let params = if settings.params.fits(id) { settings.params } else { DrumParams::default_for(id) };
        let mut bytes: Vec<u8> = params.knobs().iter().map(|&k| quantize(k, 255.0)).collect();
        if id.is_synth() {
            let shaper = &settings.shaper;
            bytes.push(shaper.enabled as u8);
            bytes.extend([shaper.drop, shaper.ring, shaper.bright].map(|v| quantize(v, 255.0)));
        }
        w.u8(id.index() as u8);
        w.u8(bytes.len() as u8);
        w.bytes(&bytes);
    }
}

/// Replaces knobs and shaper of every listed track. Custom patch overrides
/// travel in their own blocks, so they are cleared here.
pub fn read_drum_settings(r: &mut ByteReader, unit: &mut DrumUnit) {
    let count = r.u8_or(0);
    for _ in 0..count {
        let (Some(id), Some(n)) = (r.u8(), r.u8()) else {
            return;
        };
        let bytes = r.take(n as usize);
        let Some(id) = DrumTrackId::from_index(id as usize) else {
            continue;
        };

        let knob_count = DrumParams::default_for(id).knobs().len();
        let knobs: Vec<f64> = bytes.iter().take(knob_count).map(|&b| b as f64).collect();
        let extra = bytes.get(knob_count..).unwrap_or(&[]);
        let shaper = match extra {
            [enabled, rest @ ..] if id.is_synth() => Shaper {
                enabled: *enabled != 0,
                drop: rest.first().map_or(0.0, |&b| b as f64),
                ring: rest.get(1).map_or(0.0, |&b| b as f64),
                bright: rest.get(2).map_or(0.0, |&b| b as f64),
            },
            _ => Shaper::default(),
        };

        let settings = &mut unit.track_mut(id).settings;
        settings.params = DrumParams::from_knobs(id, &knobs);
        settings.shaper = shaper;
        settings.custom_patch = None;
    }
}

pub fn write_drum_sequence(w: &mut ByteWriter, unit: &DrumUnit) {
    w.u8(DRUM_TRACKS as u8);
    for id in DrumTrackId::ALL {
        w.u8(id.index() as u8);
        w.u8(1);
        w.u16_le(unit.track(id).steps.0);
    }
}

/// Tracks not listed keep an empty mask.
pub fn read_drum_sequence(r: &mut ByteReader, unit: &mut DrumUnit) {
    for track in unit.tracks.iter_mut() {
        track.steps = TriggerMask::default();
    }
    let count = r.u8_or(0);
    for _ in 0..count {
        let (Some(id), Some(attrs)) = (r.u8(), r.u8()) else {
            return;
        };
        let mut mask = None;
        for _ in 0..attrs {
            let value = r.u16_le();
            mask = mask.or(value);
        }
        if let (Some(id), Some(mask)) = (DrumTrackId::from_index(id as usize), mask) {
            unit.track_mut(id).steps = TriggerMask(mask);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bass_settings_layout() {
        let mut w = ByteWriter::new();
        let settings = BassSettings { waveform: BassWaveform::Square, tune: -1200.0, ..BassSettings::default() };
        write_bass_settings(&mut w, &settings);
        let bytes = w.into_inner();
        assert_eq!(bytes, vec![1, 10, 0, 50, 8, 50, 50, 100, 80, 38, 30, 0]);

        let back = read_bass_settings(&mut ByteReader::new(&bytes));
        assert_eq!(back, settings);
    }

    #[test]
    fn bass_knobs_clamp_to_seven_bits() {
        let mut w = ByteWriter::new();
        write_bass_settings(&mut w, &BassSettings { cutoff: 300.0, tune: 5000.0, ..BassSettings::default() });
        let bytes = w.into_inner();
        assert_eq!(bytes[2], 240);
        assert_eq!(bytes[3], 127);
    }

    #[test]
    fn truncated_bass_settings_use_defaults() {
        let back = read_bass_settings(&mut ByteReader::new(&[1, 10, 130]));
        assert_eq!(back.waveform, BassWaveform::Square);
        assert_eq!(back.tune, 100.0);
        assert_eq!(back.cutoff, BassSettings::default().cutoff);
        assert_eq!(read_bass_settings(&mut ByteReader::new(&[])), BassSettings::default());
    }

    #[test]
    fn bass_sequence_pitch_and_flags() {
        let mut seq = Sequence::default();
        seq[0] = BassStep { accent: true, slide: true, ..BassStep::note(Note::C, 2) };
        let mut w = ByteWriter::new();
        write_bass_sequence(&mut w, &seq);
        let bytes = w.into_inner();
        assert_eq!(bytes.len(), BASS_SEQUENCE_LEN);
        assert_eq!(&bytes[..2], &[36, 0b111]);
        assert_eq!(read_bass_sequence(&mut ByteReader::new(&bytes)), seq);
    }

    #[test]
    fn out_of_range_octaves_clamp() {
        let seq = read_bass_sequence(&mut ByteReader::new(&[127, 1, 3, 1]));
        assert_eq!(seq[0].octave, 4);
        assert_eq!(seq[0].note, Note::G);
        assert_eq!(seq[1].octave, 0);
        assert!(!seq[2].active, "Missing steps are off");
    }

    #[test]
    fn drum_settings_carry_shaper_on_synth_tracks() {
        let mut unit = DrumUnit::default();
        unit.track_mut(DrumTrackId::Bd).settings.shaper = Shaper { enabled: true, drop: 10.0, ring: 20.0, bright: 30.0 };
        unit.track_mut(DrumTrackId::Cp).settings.params = DrumParams::Cp { level: 180.0, tone: 5.0, decay: 95.0 };

        let mut w = ByteWriter::new();
        write_drum_settings(&mut w, &unit.settings());
        let bytes = w.into_inner();
        assert_eq!(&bytes[..11], &[11, 0, 8, 50, 100, 50, 50, 1, 10, 20, 30]);

        let mut back = DrumUnit::default();
        read_drum_settings(&mut ByteReader::new(&bytes), &mut back);
        assert_eq!(back, unit);
    }

    #[test]
    fn legacy_drum_settings_without_shaper() {
        let mut back = DrumUnit::default();
        back.track_mut(DrumTrackId::Sd).settings.shaper.enabled = true;
        read_drum_settings(&mut ByteReader::new(&[1, 1, 4, 20, 90, 40, 60]), &mut back);
        let sd = back.track(DrumTrackId::Sd);
        assert_eq!(sd.settings.params.knobs(), vec![20.0, 90.0, 40.0, 60.0]);
        assert_eq!(sd.settings.shaper, Shaper::default());
        assert_eq!(back.track(DrumTrackId::Bd).settings, DrumTrackSettings::new(DrumTrackId::Bd));
    }

    #[test]
    fn drum_sequence_masks() {
        let mut unit = DrumUnit::default();
        unit.track_mut(DrumTrackId::Oh).steps = TriggerMask(0xA5A5);
        let mut w = ByteWriter::new();
        write_drum_sequence(&mut w, &unit);
        let bytes = w.into_inner();
        assert_eq!(bytes.len(), 1 + 11 * 4);

        let mut back = DrumUnit::default();
        read_drum_sequence(&mut ByteReader::new(&bytes), &mut back);
        assert_eq!(back.track(DrumTrackId::Oh).steps, TriggerMask(0xA5A5));
    }

    #[test]
    fn unknown_drum_ids_are_skipped() {
        let mut unit = DrumUnit::default();
        read_drum_sequence(&mut ByteReader::new(&[2, 40, 1, 0xFF, 0xFF, 0, 1, 0x01, 0x00]), &mut unit);
        assert_eq!(unit.track(DrumTrackId::Bd).steps, TriggerMask(1));
    }
}
