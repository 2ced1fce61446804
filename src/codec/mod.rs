//! Binary pattern codec.
//!
//! A project is written as a stream of `[id][len u16 LE][payload]` blocks
//! terminated by an END block. The share mode decides how much of the
//! pattern bank a stream carries:
//!
//! - [`ShareMode::Pattern`]: the current pattern with its settings.
//! - [`ShareMode::SongOnly`]: one shared settings block per unit plus the
//!   sequences of all sixteen patterns.
//! - [`ShareMode::Full`]: all sixteen patterns, each with its own settings.
//!
//! Decoding never fails on short or damaged payloads. A unit cut short
//! reads its missing bass knobs as `BassSettings::default()` and its
//! missing bass steps and drum triggers as off. Drum tracks a settings
//! payload does not list keep the knobs of the base state, as does every
//! block the stream does not carry. Only undecodable text and a stream
//! without a GLOBAL block are errors.

pub mod bytes;
pub mod units;

use std::collections::BTreeMap;

use base64::Engine as _;
use base64::alphabet;
use base64::engine::general_purpose::{self, GeneralPurpose};
use base64::engine::DecodePaddingMode;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::model::{CustomPatch, DrumTrackId, PATTERN_COUNT, Pattern, TransportMode, UnitId};
use crate::state::{ProjectState, STATE_VERSION};

use self::bytes::{ByteReader, ByteWriter};
use self::units::{
    read_bass_sequence, read_bass_settings, read_drum_sequence, read_drum_settings, write_bass_sequence,
    write_bass_settings, write_drum_sequence, write_drum_settings,
};

pub const BLOCK_END: u8 = 0;
pub const BLOCK_GLOBAL: u8 = 1;
pub const BLOCK_UNIT: u8 = 2;
pub const BLOCK_METADATA: u8 = 3;
pub const BLOCK_CUSTOM_SYNTH: u8 = 4;

const LAST_PATTERN: usize = PATTERN_COUNT - 1;

/// base64url without padding; padded input is accepted too.
const URL_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    general_purpose::NO_PAD.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareMode {
    #[default]
    Pattern = 0,
    SongOnly = 1,
    Full = 2,
}

impl ShareMode {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<ShareMode> {
        match code {
            0 => Some(ShareMode::Pattern),
            1 => Some(ShareMode::SongOnly),
            2 => Some(ShareMode::Full),
            _ => None,
        }
    }
}

// ── Encoding ────────────────────────────────────────────────

/// Serialize `state` in the given share mode.
///
/// The current pattern contributes its live knob values, so a stream
/// always carries what is being heard.
pub fn encode(state: &ProjectState, mode: ShareMode) -> Vec<u8> {
    let mut out = ByteWriter::new();
    out.block(BLOCK_GLOBAL, &global_payload(state, mode));
    for unit in UnitId::ALL {
        out.block(BLOCK_UNIT, &unit_payload(state, unit, mode));
    }
    out.block(BLOCK_METADATA, &metadata_payload(state));
    for payload in custom_synth_payloads(state, mode) {
        out.block(BLOCK_CUSTOM_SYNTH, &payload);
    }
    out.block(BLOCK_END, &[]);
    out.into_inner()
}

fn global_payload(state: &ProjectState, mode: ShareMode) -> Vec<u8> {
    let mut w = ByteWriter::new();
    w.u8(STATE_VERSION as u8);
    w.u8(mode.code());
    w.u8(state.tempo.min(u8::MAX as u16) as u8);
    w.u8(state.swing);
    w.u8(match state.mode {
        TransportMode::Pattern => 0,
        TransportMode::Song => 1,
    });
    w.u8(state.current_pattern.min(LAST_PATTERN) as u8);

    let song = &state.song[..state.song.len().min(u16::MAX as usize)];
    w.u16_le(song.len() as u16);
    for pair in song.chunks(2) {
        let hi = pair[0].min(LAST_PATTERN as u8);
        let lo = pair.get(1).map_or(0, |&p| p.min(LAST_PATTERN as u8));
        w.u8(hi << 4 | lo);
    }
    w.into_inner()
}

fn write_unit_settings(w: &mut ByteWriter, state: &ProjectState, unit: UnitId, pattern_id: usize) {
    match unit.bass_index() {
        Some(i) => write_bass_settings(w, state.bass_settings(pattern_id, i)),
        None => write_drum_settings(w, &state.drum_settings(pattern_id)),
    }
}

fn write_unit_sequence(w: &mut ByteWriter, pattern: &Pattern, unit: UnitId) {
    match unit.bass_index() {
        Some(i) => write_bass_sequence(w, &pattern.bass[i].sequence),
        None => write_drum_sequence(w, &pattern.drums),
    }
}

fn unit_payload(state: &ProjectState, unit: UnitId, mode: ShareMode) -> Vec<u8> {
    let mut w = ByteWriter::new();
    w.u8(unit.code());
    let current = state.current_pattern.min(LAST_PATTERN);
    match mode {
        ShareMode::Pattern => {
            w.u8(current as u8);
            write_unit_settings(&mut w, state, unit, current);
            write_unit_sequence(&mut w, state.pattern(current), unit);
        }
        ShareMode::SongOnly => {
            write_unit_settings(&mut w, state, unit, current);
            for pattern in &state.patterns {
                write_unit_sequence(&mut w, pattern, unit);
            }
        }
        ShareMode::Full => {
            for (id, pattern) in state.patterns.iter().enumerate() {
                write_unit_settings(&mut w, state, unit, id);
                write_unit_sequence(&mut w, pattern, unit);
            }
        }
    }
    w.into_inner()
}

fn metadata_payload(state: &ProjectState) -> Vec<u8> {
    let mut w = ByteWriter::new();
    w.u16_le(state.active_mask());
    let samples: Vec<(DrumTrackId, &[u8])> = state
        .custom_samples
        .iter()
        .map(|(id, name)| (*id, name.as_bytes()))
        .filter(|(id, name)| {
            let fits = name.len() <= u8::MAX as usize;
            if !fits {
                warn!("custom sample id for {} is too long to share, dropped", id.as_str());
            }
            fits
        })
        .collect();
    w.u8(samples.len() as u8);
    for (id, name) in samples {
        w.u8(id.index() as u8);
        w.u8(name.len() as u8);
        w.bytes(name);
    }
    w.into_inner()
}

fn custom_synth_payloads(state: &ProjectState, mode: ShareMode) -> Vec<Vec<u8>> {
    let current = state.current_pattern.min(LAST_PATTERN);
    let patterns = match mode {
        ShareMode::Pattern | ShareMode::SongOnly => current..current + 1,
        ShareMode::Full => 0..PATTERN_COUNT,
    };
    let mut payloads = Vec::new();
    for pattern_id in patterns {
        for (index, settings) in state.drum_settings(pattern_id).iter().enumerate() {
            if let Some(patch) = settings.active_custom_patch() {
                let mut payload = vec![pattern_id as u8, index as u8];
                payload.extend_from_slice(patch.to_json().as_bytes());
                payloads.push(payload);
            }
        }
    }
    payloads
}

// ── Decoding ────────────────────────────────────────────────

/// Decode onto a fresh default project.
pub fn decode(bytes: &[u8]) -> Result<ProjectState, CodecError> {
    decode_into(bytes, ProjectState::default())
}

/// Decode onto `base`. Everything the stream does not carry keeps the
/// value it has in `base`.
pub fn decode_into(bytes: &[u8], mut state: ProjectState) -> Result<ProjectState, CodecError> {
    let blocks = split_blocks(bytes);
    let global = blocks
        .iter()
        .find(|(id, _)| *id == BLOCK_GLOBAL)
        .ok_or(CodecError::MissingGlobal)?;
    let mode = read_global(global.1, &mut state);

    for &(id, payload) in &blocks {
        match id {
            BLOCK_GLOBAL => {}
            BLOCK_UNIT => read_unit(payload, mode, &mut state),
            BLOCK_METADATA => read_metadata(payload, &mut state),
            BLOCK_CUSTOM_SYNTH => read_custom_synth(payload, mode, &mut state),
            other => warn!("skipping unknown block id {other} ({} bytes)", payload.len()),
        }
    }

    state.load_live_settings();
    Ok(state)
}

/// Decode, or start over from a default project if the data is unusable.
pub fn decode_or_default(bytes: &[u8]) -> ProjectState {
    decode(bytes).unwrap_or_else(|e| {
        warn!("pattern data unusable, starting from a default project: {e}");
        ProjectState::default()
    })
}

fn split_blocks(bytes: &[u8]) -> Vec<(u8, &[u8])> {
    let mut r = ByteReader::new(bytes);
    let mut blocks = Vec::new();
    while let Some(id) = r.u8() {
        if id == BLOCK_END {
            break;
        }
        let Some(len) = r.u16_le() else {
            warn!("header of block {id} cut short, stopping");
            break;
        };
        let payload = r.take(len as usize);
        if payload.len() < len as usize {
            let err = CodecError::Truncated { block: id, needed: len as usize, available: payload.len() };
            warn!("{err}; decoding what is there");
        }
        blocks.push((id, payload));
    }
    blocks
}

fn read_global(payload: &[u8], state: &mut ProjectState) -> ShareMode {
    let mut r = ByteReader::new(payload);
    let ver = r.u8_or(STATE_VERSION as u8);
    if ver as u32 > STATE_VERSION {
        warn!("pattern data version {ver} is newer than {STATE_VERSION}, decoding as {STATE_VERSION}");
    }
    state.ver = STATE_VERSION;

    let mode = match r.u8() {
        Some(code) => ShareMode::from_code(code).unwrap_or_else(|| {
            warn!("unknown share mode {code}, treating as full");
            ShareMode::Full
        }),
        None => ShareMode::Full,
    };
    if let Some(tempo) = r.u8() {
        state.set_tempo(tempo as f64);
    }
    if let Some(swing) = r.u8() {
        state.set_swing(swing as f64);
    }
    if let Some(transport) = r.u8() {
        state.mode = if transport == 1 { TransportMode::Song } else { TransportMode::Pattern };
    }
    if let Some(current) = r.u8() {
        state.current_pattern = (current as usize).min(LAST_PATTERN);
    }
    if let Some(len) = r.u16_le() {
        let len = len as usize;
        let nibbles = r.take(len.div_ceil(2));
        state.song = (0..len)
            .map_while(|i| nibbles.get(i / 2).map(|b| if i % 2 == 0 { b >> 4 } else { b & 0x0F }))
            .collect();
    }
    mode
}

fn read_unit_settings(r: &mut ByteReader, unit: UnitId, pattern: &mut Pattern) {
    match unit.bass_index() {
        Some(i) => pattern.bass[i].settings = read_bass_settings(r),
        None => read_drum_settings(r, &mut pattern.drums),
    }
}

fn read_unit_sequence(r: &mut ByteReader, unit: UnitId, pattern: &mut Pattern) {
    match unit.bass_index() {
        Some(i) => pattern.bass[i].sequence = read_bass_sequence(r),
        None => read_drum_sequence(r, &mut pattern.drums),
    }
}

fn copy_unit_settings(unit: UnitId, from: &Pattern, to: &mut Pattern) {
    match unit.bass_index() {
        Some(i) => to.bass[i].settings = from.bass[i].settings,
        None => {
            for (dst, src) in to.drums.tracks.iter_mut().zip(&from.drums.tracks) {
                dst.settings = src.settings.clone();
            }
        }
    }
}

fn read_unit(payload: &[u8], mode: ShareMode, state: &mut ProjectState) {
    let mut r = ByteReader::new(payload);
    let Some(unit) = r.u8().and_then(UnitId::from_code) else {
        warn!("unit block with unknown unit id skipped");
        return;
    };
    match mode {
        ShareMode::Pattern => {
            let id = r.u8().map_or(state.current_pattern, |p| (p as usize).min(LAST_PATTERN));
            let pattern = state.pattern_mut(id);
            read_unit_settings(&mut r, unit, pattern);
            read_unit_sequence(&mut r, unit, pattern);
        }
        ShareMode::SongOnly => {
            let mut shared = state.pattern(state.current_pattern).clone();
            read_unit_settings(&mut r, unit, &mut shared);
            for pattern in state.patterns.iter_mut() {
                copy_unit_settings(unit, &shared, pattern);
                read_unit_sequence(&mut r, unit, pattern);
            }
        }
        ShareMode::Full => {
            for pattern in state.patterns.iter_mut() {
                read_unit_settings(&mut r, unit, pattern);
                read_unit_sequence(&mut r, unit, pattern);
            }
        }
    }
}

fn read_metadata(payload: &[u8], state: &mut ProjectState) {
    let mut r = ByteReader::new(payload);
    if let Some(mask) = r.u16_le() {
        state.set_active_mask(mask);
    }
    let count = r.u8_or(0);
    let mut samples = BTreeMap::new();
    for _ in 0..count {
        let (Some(id), Some(len)) = (r.u8(), r.u8()) else {
            break;
        };
        let name = r.take(len as usize);
        let Some(id) = DrumTrackId::from_index(id as usize) else {
            warn!("custom sample for unknown track {id} skipped");
            continue;
        };
        match std::str::from_utf8(name) {
            Ok(name) => {
                samples.insert(id, name.to_string());
            }
            Err(e) => warn!("custom sample id for {} is not UTF-8: {e}", id.as_str()),
        }
    }
    state.custom_samples = samples;
}

fn read_custom_synth(payload: &[u8], mode: ShareMode, state: &mut ProjectState) {
    let mut r = ByteReader::new(payload);
    let (Some(pattern_id), Some(track)) = (r.u8(), r.u8()) else {
        warn!("custom synth block too short, skipped");
        return;
    };
    let Some(track) = DrumTrackId::from_index(track as usize) else {
        warn!("custom synth block for unknown track {track} skipped");
        return;
    };
    let json = match std::str::from_utf8(r.rest()) {
        Ok(json) => json,
        Err(e) => {
            warn!("custom synth patch for {} is not UTF-8: {e}", track.as_str());
            return;
        }
    };
    let patch = match CustomPatch::from_json(json) {
        Ok(patch) => patch,
        Err(e) => {
            warn!("custom synth patch for {} rejected: {e}", track.as_str());
            return;
        }
    };

    let targets = match mode {
        ShareMode::SongOnly => 0..PATTERN_COUNT,
        ShareMode::Pattern | ShareMode::Full => {
            let id = (pattern_id as usize).min(LAST_PATTERN);
            id..id + 1
        }
    };
    for id in targets {
        state.pattern_mut(id).drums.track_mut(track).settings.custom_patch = Some(patch.clone());
    }
}

// ── Text transport ──────────────────────────────────────────

pub fn to_base64url(bytes: &[u8]) -> String {
    URL_ENGINE.encode(bytes)
}

/// Accepts URL-safe or standard base64, padded or not, with an optional
/// leading `#` from a URL fragment.
pub fn from_base64url(text: &str) -> Result<Vec<u8>, CodecError> {
    let cleaned: String = text
        .trim()
        .trim_start_matches('#')
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            c => c,
        })
        .collect();
    Ok(URL_ENGINE.decode(cleaned)?)
}

/// Encode and wrap as URL-fragment text.
pub fn export_text(state: &ProjectState, mode: ShareMode) -> String {
    to_base64url(&encode(state, mode))
}

/// Unwrap URL-fragment text and decode onto `base`.
pub fn import_text(text: &str, base: ProjectState) -> Result<ProjectState, CodecError> {
    decode_into(&from_base64url(text)?, base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BassSettings, BassStep, BassWaveform, DrumParams, Note, Shaper, TriggerMask};

    fn busy_project() -> ProjectState {
        let mut state = ProjectState::default();
        state.tempo = 138;
        state.swing = 62;
        state.mode = TransportMode::Song;
        state.song = vec![0, 3, 3, 15, 7];
        state.current_pattern = 3;
        state.custom_samples.insert(DrumTrackId::Cp, "user:clap-01".to_string());
        state.active_tracks.remove(&DrumTrackId::Rd);

        for (i, pattern) in state.patterns.iter_mut().enumerate() {
            let bass = &mut pattern.bass[i % 2];
            let note = BassStep::note(Note::from_semitone(i as u8 % 12), (i % 5) as u8);
            bass.sequence[i] = BassStep { accent: i % 3 == 0, slide: true, ..note };
            bass.settings.waveform = BassWaveform::Square;
            bass.settings.cutoff = i as f64 * 7.0;
            bass.settings.tune = -300.0 + i as f64 * 40.0;
            pattern.drums.track_mut(DrumTrackId::Bd).steps = TriggerMask(0x1111 << (i % 4));
            pattern.drums.track_mut(DrumTrackId::Sd).settings.params =
                DrumParams::Sd { tune: i as f64, level: 150.0, tone: 30.0, snappy: 90.0 };
            pattern.drums.track_mut(DrumTrackId::Bd).settings.shaper =
                Shaper { enabled: i % 2 == 0, drop: 40.0, ring: 12.0, bright: 77.0 };
        }
        state.pattern_mut(3).drums.track_mut(DrumTrackId::Cp).settings.custom_patch =
            Some(CustomPatch::from_json(r#"{"noise":{"cutoff":2500}}"#).unwrap());
        state.load_live_settings();
        state
    }

    #[test]
    fn full_mode_round_trip() {
        let state = busy_project();
        let back = decode(&encode(&state, ShareMode::Full)).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn full_default_project_is_deep_equal() {
        let back = decode(&encode(&ProjectState::default(), ShareMode::Full)).unwrap();
        assert_eq!(back, ProjectState::default());
        for pattern in &back.patterns {
            assert_eq!(*pattern, Pattern::default());
        }
    }

    #[test]
    fn pattern_mode_carries_only_the_current_pattern() {
        let state = busy_project();
        let back = decode(&encode(&state, ShareMode::Pattern)).unwrap();
        assert_eq!(back.current_pattern, 3);
        assert_eq!(back.patterns[3], state.patterns[3]);
        assert_eq!(back.patterns[4], Pattern::default(), "Other patterns keep the base state");
        assert_eq!(back.song, state.song);
        assert_eq!(back.tempo, 138);
    }

    #[test]
    fn song_only_shares_one_settings_block() {
        let state = busy_project();
        let back = decode(&encode(&state, ShareMode::SongOnly)).unwrap();
        let shared = &state.patterns[3];
        for (i, pattern) in back.patterns.iter().enumerate() {
            assert_eq!(pattern.bass[0].sequence, state.patterns[i].bass[0].sequence);
            assert_eq!(pattern.drums.masks(), state.patterns[i].drums.masks());
            assert_eq!(pattern.bass[0].settings, shared.bass[0].settings);
            assert_eq!(pattern.drums.settings(), shared.drums.settings(), "pattern {i}");
        }
    }

    #[test]
    fn requantizing_is_stable() {
        let mut state = busy_project();
        state.live.bass[0].cutoff = 33.4;
        state.live.bass[0].tune = 123.0;
        state.live.bass[1].delay_wet = 99.6;
        for mode in [ShareMode::Pattern, ShareMode::SongOnly, ShareMode::Full] {
            let first = encode(&state, mode);
            let second = encode(&decode(&first).unwrap(), mode);
            assert_eq!(first, second, "{mode:?}");
        }
    }

    #[test]
    fn live_knobs_are_what_gets_shared() {
        let mut state = ProjectState::default();
        state.live.bass[1].resonance = 99.0;
        let back = decode(&encode(&state, ShareMode::Pattern)).unwrap();
        assert_eq!(back.patterns[0].bass[1].settings.resonance, 99.0);
        assert_eq!(back.live.bass[1].resonance, 99.0);
    }

    #[test]
    fn truncated_streams_never_panic() {
        let bytes = encode(&busy_project(), ShareMode::Full);
        for len in 0..bytes.len() {
            let _ = decode(&bytes[..len]);
        }
    }

    #[test]
    fn truncated_unit_keeps_what_arrived() {
        let mut state = busy_project();
        state.patterns[3].bass[0].sequence = [BassStep::note(Note::E, 1); 16];
        state.load_live_settings();
        let bytes = encode(&state, ShareMode::Pattern);
        // GLOBAL header + payload, then the first UNIT cut after a few steps.
        let global_len = 3 + u16::from_le_bytes([bytes[1], bytes[2]]) as usize;
        let cut = global_len + 3 + 2 + 12 + 8;
        let back = decode(&bytes[..cut]).unwrap();
        assert_eq!(back.tempo, 138);
        assert_eq!(back.patterns[3].bass[0].settings, state.patterns[3].bass[0].settings);
        assert_eq!(back.patterns[3].bass[0].sequence[..4], state.patterns[3].bass[0].sequence[..4]);
        assert!(!back.patterns[3].bass[0].sequence[4].active);
    }

    #[test]
    fn short_units_read_defaults_over_the_base() {
        let base = busy_project();
        let full = encode(&base, ShareMode::Pattern);
        let global_len = 3 + u16::from_le_bytes([full[1], full[2]]) as usize;

        let mut w = ByteWriter::new();
        w.bytes(&full[..global_len]);
        // Bass 2 on pattern 3: saw, ten knobs announced, only tune and cutoff sent.
        w.block(BLOCK_UNIT, &[UnitId::Bass2.code(), 3, 0, 10, 120, 64]);
        // Drums on pattern 3: one settings entry for SD with only its tune knob.
        w.block(BLOCK_UNIT, &[UnitId::Drums.code(), 3, 1, DrumTrackId::Sd.index() as u8, 1, 99]);
        w.block(BLOCK_END, &[]);
        let back = decode_into(&w.into_inner(), base.clone()).unwrap();

        let bass = &back.patterns[3].bass[1];
        assert_eq!(bass.settings, BassSettings { tune: 0.0, cutoff: 64.0, ..BassSettings::default() });
        assert!(bass.sequence.iter().all(|step| !step.active));
        assert_ne!(base.patterns[3].bass[1].settings, BassSettings::default());

        let drums = &back.patterns[3].drums;
        assert_eq!(
            drums.track(DrumTrackId::Sd).settings.params,
            DrumParams::Sd { tune: 99.0, level: 100.0, tone: 50.0, snappy: 50.0 }
        );
        assert_eq!(
            drums.track(DrumTrackId::Bd).settings,
            base.patterns[3].drums.track(DrumTrackId::Bd).settings,
            "Unlisted tracks keep their knobs"
        );
        assert_eq!(drums.track(DrumTrackId::Bd).steps, TriggerMask::default());
        assert_eq!(back.patterns[3].bass[0], base.patterns[3].bass[0], "Bass 1 was not sent");
    }

    #[test]
    fn missing_global_is_an_error() {
        let mut w = ByteWriter::new();
        w.block(BLOCK_METADATA, &[0, 0, 0]);
        assert!(matches!(decode(&w.into_inner()), Err(CodecError::MissingGlobal)));
        assert!(matches!(decode(&[]), Err(CodecError::MissingGlobal)));
        assert_eq!(decode_or_default(&[9, 9]), ProjectState::default());
    }

    #[test]
    fn unknown_blocks_are_skipped() {
        let state = busy_project();
        let bytes = encode(&state, ShareMode::Full);
        let mut patched = vec![42, 3, 0, 1, 2, 3];
        patched.extend_from_slice(&bytes);
        assert_eq!(decode(&patched).unwrap(), state);
    }

    #[test]
    fn song_nibbles_pack_high_first() {
        let mut state = ProjectState::default();
        state.song = vec![1, 2, 15];
        let bytes = encode(&state, ShareMode::Pattern);
        assert_eq!(&bytes[3 + 6..3 + 10], &[3, 0, 0x12, 0xF0]);
        assert_eq!(decode(&bytes).unwrap().song, vec![1, 2, 15]);
    }

    #[test]
    fn out_of_range_pattern_ids_clamp() {
        let mut w = ByteWriter::new();
        w.block(BLOCK_GLOBAL, &[5, 0, 120, 50, 0, 200]);
        let mut unit = vec![UnitId::Bass1.code(), 99];
        let mut body = ByteWriter::new();
        write_bass_settings(&mut body, &BassSettings::default());
        unit.extend(body.into_inner());
        w.block(BLOCK_UNIT, &unit);
        let back = decode(&w.into_inner()).unwrap();
        assert_eq!(back.current_pattern, 15);
        assert_eq!(back.tempo, 120);
    }

    #[test]
    fn base64url_text_transport() {
        let bytes: Vec<u8> = (0..=255).collect();
        let text = to_base64url(&bytes);
        assert!(!text.contains(['+', '/', '=']));
        assert_eq!(from_base64url(&text).unwrap(), bytes);

        let standard = "+/8=";
        assert_eq!(from_base64url(standard).unwrap(), vec![0xFB, 0xFF]);
        assert_eq!(from_base64url("#-_8").unwrap(), vec![0xFB, 0xFF]);
        assert!(matches!(from_base64url("not*base64"), Err(CodecError::Base64(_))));
    }

    #[test]
    fn text_round_trip() {
        let state = busy_project();
        let text = export_text(&state, ShareMode::Full);
        assert_eq!(import_text(&text, ProjectState::default()).unwrap(), state);
    }
}
