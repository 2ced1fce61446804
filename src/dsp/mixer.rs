//! Mixer — sums the instrument buses with master gain and soft clipping.

/// A summing mix bus. Instruments add into [`Mixer::bus_mut`]; the host
/// reads the clipped result as mono or interleaved stereo.
#[derive(Debug, Clone)]
pub struct Mixer {
    pub master_gain: f64,
    buffer: Vec<f64>,
}

impl Default for Mixer {
    fn default() -> Self {
        Self::new()
    }
}

impl Mixer {
    pub fn new() -> Self {
        Mixer {
            master_gain: 0.8,
            buffer: Vec::new(),
        }
    }

    /// Prepare a buffer of `num_samples` filled with zeros.
    pub fn clear(&mut self, num_samples: usize) {
        self.buffer.clear();
        self.buffer.resize(num_samples, 0.0);
    }

    /// The raw summing buffer.
    pub fn bus_mut(&mut self) -> &mut [f64] {
        &mut self.buffer
    }

    /// Mixed mono output with master gain and soft clipping applied.
    pub fn output(&self) -> impl Iterator<Item = f64> + '_ {
        self.buffer.iter().map(|&s| soft_clip(s * self.master_gain))
    }

    /// Write the mix into an interleaved stereo buffer (both channels equal).
    pub fn write_interleaved(&self, out: &mut [f32]) {
        for (frame, s) in out.chunks_exact_mut(2).zip(self.output()) {
            frame[0] = s as f32;
            frame[1] = s as f32;
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

/// Soft clipper using tanh to prevent harsh digital clipping.
fn soft_clip(x: f64) -> f64 {
    if x.is_finite() { x.tanh() } else { 0.0 }
}
