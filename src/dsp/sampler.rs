//! Sample playback for drum tracks.
//!
//! Plays a one-shot buffer at a fixed playback rate (linear interpolation
//! resampling) under an exponential decay envelope.

use std::io::Cursor;
use std::sync::Arc;

use super::automation::Automation;
use super::voice::{Lifetime, Voice};

/// Level the decay envelope ramps down to before the voice stops.
const DECAY_FLOOR: f64 = 0.001;

/// A mono sample buffer loaded into memory. Cheap to clone.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    data: Arc<[f32]>,
    /// Native sample rate of the audio.
    pub sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(data: Vec<f32>, sample_rate: u32) -> Self {
        SampleBuffer {
            data: data.into(),
            sample_rate,
        }
    }

    /// Decode a WAV file held in memory, mixing all channels down to mono.
    pub fn from_wav_bytes(bytes: &[u8]) -> Result<Self, hound::Error> {
        let mut reader = hound::WavReader::new(Cursor::new(bytes))?;
        let spec = reader.spec();
        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
            hound::SampleFormat::Int => {
                let max = (1i64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|x| x as f32 / max))
                    .collect::<Result<_, _>>()?
            }
        };

        let channels = spec.channels.max(1) as usize;
        let mono = samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();
        Ok(SampleBuffer::new(mono, spec.sample_rate))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Duration in seconds at the native rate.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.data.len() as f64 / self.sample_rate as f64
    }

    /// Read a sample with linear interpolation at a fractional position.
    pub fn read_interpolated(&self, position: f64) -> f64 {
        if self.data.is_empty() || position < 0.0 {
            return 0.0;
        }

        let idx = position as usize;
        if idx >= self.data.len() - 1 {
            return if idx < self.data.len() {
                self.data[idx] as f64
            } else {
                0.0
            };
        }

        let frac = position - idx as f64;
        self.data[idx] as f64 * (1.0 - frac) + self.data[idx + 1] as f64 * frac
    }
}

/// A playing one-shot sample.
#[derive(Debug, Clone)]
pub struct SampleVoice {
    buffer: SampleBuffer,
    position: f64,
    /// Buffer frames advanced per output frame.
    step: f64,
    gain: Automation,
    life: Lifetime,
    sample_rate: f64,
}

impl SampleVoice {
    /// Schedule `buffer` at `time` with pitch factor `rate`, starting at
    /// `level` and decaying exponentially over `decay` seconds.
    pub fn new(
        buffer: SampleBuffer,
        time: f64,
        rate: f64,
        level: f64,
        decay: f64,
        sample_rate: f64,
    ) -> Self {
        let rate = if rate.is_finite() && rate > 0.0 { rate } else { 1.0 };
        let decay = decay.max(0.005);
        let step = rate * buffer.sample_rate as f64 / sample_rate;
        let end_of_buffer = time + buffer.duration() / rate;

        let mut gain = Automation::new(0.0);
        gain.set_value_at(level.max(DECAY_FLOOR), time);
        gain.exponential_ramp_to(DECAY_FLOOR, time + decay);

        let mut life = Lifetime::starting_at(time);
        life.stop_at((time + decay).min(end_of_buffer));

        SampleVoice {
            buffer,
            position: 0.0,
            step,
            gain,
            life,
            sample_rate,
        }
    }
}

impl Voice for SampleVoice {
    fn render_add(&mut self, start_frame: u64, out: &mut [f64]) {
        self.gain.prune_before(start_frame as f64 / self.sample_rate);
        for (i, slot) in out.iter_mut().enumerate() {
            let t = (start_frame + i as u64) as f64 / self.sample_rate;
            if !self.life.contains(t) {
                continue;
            }
            let s = self.buffer.read_interpolated(self.position);
            self.position += self.step;
            *slot += s * self.gain.value_at(t);
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

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_buffer(len: usize) -> SampleBuffer {
        SampleBuffer::new((0..len).map(|i| i as f32 / len as f32).collect(), 1000)
    }

    #[test]
    fn interpolates_between_frames() {
        let buf = SampleBuffer::new(vec![0.0, 1.0], 1000);
        assert!((buf.read_interpolated(0.25) - 0.25).abs() < 1e-9);
        assert_eq!(buf.read_interpolated(5.0), 0.0);
        assert_eq!(buf.read_interpolated(-1.0), 0.0);
    }

    #[test]
    fn wav_pcm_is_scaled_to_unit_range() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut bytes = Vec::new();
        {
            let mut writer = hound::WavWriter::new(Cursor::new(&mut bytes), spec).unwrap();
            writer.write_sample(16384i16).unwrap();
            writer.write_sample(-32768i16).unwrap();
            writer.finalize().unwrap();
        }
        let buf = SampleBuffer::from_wav_bytes(&bytes).unwrap();
        assert_eq!(buf.sample_rate, 44100);
        assert!((buf.read_interpolated(0.0) - 0.5).abs() < 1e-6);
        assert!((buf.read_interpolated(1.0) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn decodes_stereo_wav_to_mono() {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut bytes = Vec::new();
        {
            let mut writer = hound::WavWriter::new(Cursor::new(&mut bytes), spec).unwrap();
            for frame in [(16384i16, 0i16), (-16384, -16384)] {
                writer.write_sample(frame.0).unwrap();
                writer.write_sample(frame.1).unwrap();
            }
            writer.finalize().unwrap();
        }

        let buf = SampleBuffer::from_wav_bytes(&bytes).unwrap();
        assert_eq!(buf.sample_rate, 22050);
        assert_eq!(buf.len(), 2);
        assert!((buf.read_interpolated(0.0) - 0.25).abs() < 1e-6);
        assert!((buf.read_interpolated(1.0) + 0.5).abs() < 1e-6);
        assert!(SampleBuffer::from_wav_bytes(b"not a wav").is_err());
    }

    #[test]
    fn silent_before_start_and_after_stop() {
        let buf = SampleBuffer::new(vec![1.0; 1000], 1000);
        let mut voice = SampleVoice::new(buf, 0.1, 1.0, 1.0, 0.2, 1000.0);
        let mut out = vec![0.0; 400];
        voice.render_add(0, &mut out);
        assert!(out[..100].iter().all(|&s| s == 0.0));
        assert!((out[100] - 1.0).abs() < 1e-9);
        assert!(out[150] < out[101], "Envelope should decay");
        assert!(out[300..].iter().all(|&s| s == 0.0));
        assert!(voice.is_finished(0.4));
    }

    #[test]
    fn playback_rate_changes_speed() {
        let buf = ramp_buffer(1000);
        let mut fast = SampleVoice::new(buf.clone(), 0.0, 2.0, 1.0, 5.0, 1000.0);
        let mut normal = SampleVoice::new(buf, 0.0, 1.0, 1.0, 5.0, 1000.0);
        let mut a = vec![0.0; 100];
        let mut b = vec![0.0; 100];
        fast.render_add(0, &mut a);
        normal.render_add(0, &mut b);
        let ga = fast.gain.value_at(0.05);
        let gb = normal.gain.value_at(0.05);
        assert!((a[50] / ga - 2.0 * b[50] / gb).abs() < 1e-6, "Double rate reads twice as far");
    }

    #[test]
    fn stops_at_end_of_buffer() {
        let buf = ramp_buffer(100);
        let voice = SampleVoice::new(buf, 0.0, 1.0, 1.0, 10.0, 1000.0);
        assert!(voice.is_finished(0.1));
    }

    #[test]
    fn kill_silences_immediately() {
        let buf = SampleBuffer::new(vec![1.0; 1000], 1000);
        let mut voice = SampleVoice::new(buf, 0.0, 1.0, 1.0, 1.0, 1000.0);
        voice.kill(0.01);
        let mut out = vec![0.0; 50];
        voice.render_add(0, &mut out);
        assert!(out[10..].iter().all(|&s| s == 0.0));
        assert!(voice.is_finished(0.01));
    }
}
