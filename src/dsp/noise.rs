//! White noise — one immutable buffer shared by every noise voice.

use std::sync::{Arc, Weak};

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// Seed for the factory noise buffer, so renders are reproducible.
pub const NOISE_SEED: u64 = 0x0909_0303;

/// A looped white-noise table. Built once, never written afterwards.
#[derive(Debug, Clone)]
pub struct NoiseBuffer {
    data: Arc<[f32]>,
}

impl NoiseBuffer {
    /// Generate `seconds` of uniform white noise in [-1, 1).
    pub fn new(sample_rate: f64, seconds: f64, seed: u64) -> Self {
        let len = ((sample_rate * seconds) as usize).max(1);
        let mut rng = Pcg32::seed_from_u64(seed);
        let data: Vec<f32> = (0..len).map(|_| rng.random_range(-1.0..1.0)).collect();
        NoiseBuffer { data: data.into() }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// A looping reader that does not keep the buffer alive.
    pub fn reader(&self) -> NoiseReader {
        NoiseReader {
            data: Arc::downgrade(&self.data),
            pos: 0,
        }
    }
}

/// Playback cursor into a [`NoiseBuffer`].
#[derive(Debug, Clone)]
pub struct NoiseReader {
    data: Weak<[f32]>,
    pos: usize,
}

impl NoiseReader {
    /// Fill `out` with the next looped noise samples. Writes silence if the
    /// owning buffer is gone.
    pub fn read(&mut self, out: &mut [f64]) {
        let Some(data) = self.data.upgrade() else {
            out.fill(0.0);
            return;
        };
        for slot in out.iter_mut() {
            *slot = data[self.pos] as f64;
            self.pos = (self.pos + 1) % data.len();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noise_is_deterministic_and_bounded() {
        let a = NoiseBuffer::new(1000.0, 1.0, NOISE_SEED);
        let b = NoiseBuffer::new(1000.0, 1.0, NOISE_SEED);
        assert_eq!(a.data, b.data);
        assert_eq!(a.len(), 1000);
        assert!(a.data.iter().all(|&s| (-1.0..1.0).contains(&s)));
    }

    #[test]
    fn reader_loops() {
        let noise = NoiseBuffer::new(10.0, 1.0, 7);
        let mut reader = noise.reader();
        let mut out = vec![0.0; 25];
        reader.read(&mut out);
        assert_eq!(out[0], out[10]);
        assert_eq!(out[3], out[23]);
    }

    #[test]
    fn readers_share_the_buffer() {
        let noise = NoiseBuffer::new(100.0, 1.0, 1);
        let mut first = noise.reader();
        let mut second = noise.reader();
        let mut a = vec![0.0; 16];
        let mut b = vec![0.0; 16];
        first.read(&mut a);
        second.read(&mut b);
        assert_eq!(a, b);
        assert_eq!(Arc::strong_count(&noise.data), 1);
    }

    #[test]
    fn reader_is_silent_once_buffer_dropped() {
        let noise = NoiseBuffer::new(100.0, 1.0, 1);
        let mut reader = noise.reader();
        drop(noise);
        let mut out = vec![1.0; 8];
        reader.read(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));
    }
}
