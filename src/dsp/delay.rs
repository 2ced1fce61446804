//! Delay effect — feedback delay line with a wet send level.

/// A mono feedback delay.
///
/// The buffer holds up to `max_delay_seconds` of audio. Delay time, feedback
/// and wet level are plain fields so the owner can drive them from
/// automation every sample; reads interpolate between taps so a moving
/// delay time does not click.
#[derive(Debug, Clone)]
pub struct Delay {
    buffer: Vec<f64>,
    write_pos: usize,
    sample_rate: f64,

    /// Delay time in seconds.
    pub delay_time: f64,
    /// Feedback amount (0.0 = single echo, clamped below 1.0).
    pub feedback: f64,
    /// Wet level added on top of the dry signal (0.0 = bypass).
    pub wet: f64,
}

impl Delay {
    /// Create a new delay effect.
    ///
    /// # Arguments
    /// - `sample_rate`: Audio sample rate in Hz.
    /// - `max_delay_seconds`: Maximum supported delay time. The buffer
    ///   always holds at least one sample of delay.
    pub fn new(sample_rate: f64, max_delay_seconds: f64) -> Self {
        let frames = sample_rate * max_delay_seconds;
        let frames = if frames.is_finite() { frames.max(1.0) as usize } else { 1 };
        let buffer_size = frames + 2;
        Self {
            buffer: vec![0.0; buffer_size],
            write_pos: 0,
            sample_rate,
            delay_time: 0.25,
            feedback: 0.0,
            wet: 0.0,
        }
    }

    /// Longest delay the buffer can hold, in seconds.
    pub fn max_delay(&self) -> f64 {
        (self.buffer.len() - 2) as f64 / self.sample_rate
    }

    /// Process one sample, returning dry + wet echo.
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let len = self.buffer.len();
        let delay_samples = self.delay_time * self.sample_rate;
        let delay_samples = if delay_samples.is_finite() {
            delay_samples.min((len - 2) as f64).max(1.0)
        } else {
            1.0
        };
        let feedback = self.feedback.clamp(0.0, 0.99);

        let read_pos = self.write_pos as f64 - delay_samples;
        let read_pos = if read_pos < 0.0 { read_pos + len as f64 } else { read_pos };
        let idx = read_pos as usize % len;
        let frac = read_pos - read_pos.floor();
        let next = (idx + 1) % len;
        let delayed = self.buffer[idx] * (1.0 - frac) + self.buffer[next] * frac;

        let written = input + delayed * feedback;
        self.buffer[self.write_pos] = if written.is_finite() { written } else { 0.0 };
        self.write_pos = (self.write_pos + 1) % len;

        input + delayed * self.wet.clamp(0.0, 1.0)
    }

    /// Clear the delay buffer.
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}
