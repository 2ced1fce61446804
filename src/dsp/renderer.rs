//! WAV renderer — plays a project offline through the realtime engines.

use crate::sequencer::{EngineConfig, Sequencer};
use crate::state::ProjectState;

/// Seconds in one bar at `tempo`. Swing never changes a bar's length.
pub fn bar_seconds(tempo: f64) -> f64 {
    240.0 / tempo
}

/// Render `bars` bars of `state` from the top, as the transport would play
/// them, to interleaved stereo f32.
pub fn render_samples(state: &ProjectState, bars: u32, config: EngineConfig) -> Vec<f32> {
    let mut seq = Sequencer::new(config, state.clone());
    let sr = config.sample_rate;
    let total_frames = (bars as f64 * bar_seconds(seq.scheduler().tempo()) * sr).round() as usize;
    let block = config.block_size.max(1);
    let interval = config.schedule_interval.max(1.0 / sr);

    let mut out = vec![0.0f32; total_frames * 2];
    let mut next_wake = 0.0;
    seq.play();
    for chunk in out.chunks_mut(block * 2) {
        if seq.now() >= next_wake {
            seq.wake();
            next_wake += interval;
        }
        seq.render_block(chunk);
    }
    out
}

/// Render `bars` bars of `state` to a 16-bit stereo WAV file.
pub fn render_wav(state: &ProjectState, bars: u32, sample_rate: u32) -> Vec<u8> {
    let config = EngineConfig { sample_rate: sample_rate as f64, ..EngineConfig::default() };
    let pcm: Vec<i16> = render_samples(state, bars, config)
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
        .collect();

    encode_wav(&pcm, sample_rate, 2)
}

/// Encode interleaved i16 PCM samples to a WAV byte buffer.
fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
    let bits_per_sample: u16 = 16;
    let byte_rate = sample_rate * channels as u32 * (bits_per_sample as u32 / 8);
    let block_align = channels * (bits_per_sample / 8);
    let data_size = (samples.len() * 2) as u32;
    let file_size = 36 + data_size;

    let mut buf = Vec::with_capacity(44 + data_size as usize);

    // RIFF header
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&file_size.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    // fmt chunk
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());

    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for &sample in samples {
        buf.extend_from_slice(&sample.to_le_bytes());
    }

    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BassStep, DrumTrackId, Note, TransportMode, TriggerMask};

    fn groove() -> ProjectState {
        let mut state = ProjectState::default();
        state.tempo = 120;
        let pattern = &mut state.patterns[0];
        pattern.bass[0].sequence[0] = BassStep::note(Note::C, 2);
        pattern.bass[0].sequence[8] = BassStep::note(Note::G, 1);
        pattern.drums.track_mut(DrumTrackId::Bd).steps = TriggerMask(0x1111);
        pattern.drums.track_mut(DrumTrackId::Cp).steps = TriggerMask(0x1010);
        state.load_live_settings();
        state
    }

    #[test]
    fn wav_header_valid() {
        let wav = render_wav(&groove(), 1, 44100);

        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(&wav[36..40], b"data");

        let sr = u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]);
        assert_eq!(sr, 44100);
        let ch = u16::from_le_bytes([wav[22], wav[23]]);
        assert_eq!(ch, 2);
    }

    #[test]
    fn wav_size_correct() {
        // 1 bar at 120 BPM = 2s = 88200 frames * 2 channels * 2 bytes
        let state = ProjectState { tempo: 120, ..ProjectState::default() };
        let wav = render_wav(&state, 1, 44100);
        let data_size = u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]);
        assert_eq!(data_size, 352_800);
        assert_eq!(wav.len(), 44 + 352_800);
    }

    #[test]
    fn wav_reads_back() {
        let wav = render_wav(&groove(), 1, 8000);
        let reader = hound::WavReader::new(std::io::Cursor::new(wav)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 8000);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(reader.duration(), 16000);
    }

    #[test]
    fn empty_project_renders_silence() {
        let config = EngineConfig { sample_rate: 8000.0, ..EngineConfig::default() };
        let samples = render_samples(&ProjectState::default(), 1, config);
        assert!(samples.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn groove_is_audible_and_bounded() {
        let config = EngineConfig { sample_rate: 8000.0, ..EngineConfig::default() };
        let samples = render_samples(&groove(), 2, config);
        assert_eq!(samples.len(), 2 * 2 * 16000);
        assert!(samples.iter().all(|s| s.is_finite() && s.abs() <= 1.0));
        let peak = samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak > 0.1, "Groove should be audible, peak {peak}");
    }

    #[test]
    fn renders_are_deterministic() {
        let config = EngineConfig { sample_rate: 8000.0, ..EngineConfig::default() };
        assert_eq!(render_samples(&groove(), 1, config), render_samples(&groove(), 1, config));
    }

    #[test]
    fn song_mode_plays_the_song() {
        let mut state = groove();
        state.mode = TransportMode::Song;
        state.song = vec![1, 0];
        let config = EngineConfig { sample_rate: 8000.0, ..EngineConfig::default() };
        let samples = render_samples(&state, 2, config);
        let (first_bar, second_bar) = samples.split_at(samples.len() / 2);
        assert!(first_bar.iter().all(|&s| s == 0.0), "Pattern 1 is empty");
        assert!(second_bar.iter().any(|&s| s.abs() > 0.1));
    }
}
