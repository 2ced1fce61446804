//! Four-pole ladder low-pass — zero-delay-feedback topology.
//!
//! Four cascaded trapezoidal one-pole stages with a global feedback path.
//! The feedback estimate is solved implicitly (no unit delay in the loop)
//! and bounded with `tanh`, so the filter can approach but never run away
//! into unbounded self-oscillation.

use std::f64::consts::PI;

/// Lowest cutoff the filter accepts, in Hz.
pub const MIN_CUTOFF: f64 = 20.0;
/// Highest cutoff as a fraction of the sample rate.
pub const MAX_CUTOFF_RATIO: f64 = 0.45;
/// Highest resonance; feedback gain is `resonance * 4`.
pub const MAX_RESONANCE: f64 = 0.99;

/// Zero-delay-feedback 4-pole low-pass filter.
#[derive(Debug, Clone)]
pub struct LadderFilter {
    state: [f64; 4],
    sample_rate: f64,
}

impl LadderFilter {
    pub fn new(sample_rate: f64) -> Self {
        LadderFilter {
            state: [0.0; 4],
            sample_rate,
        }
    }

    /// Clear all four integrator states.
    pub fn reset(&mut self) {
        self.state = [0.0; 4];
    }

    /// Filter one sample with the given cutoff (Hz) and resonance (0..0.99).
    ///
    /// Out-of-range parameters are clamped. A non-finite result resets the
    /// filter and yields silence.
    pub fn process(&mut self, input: f64, cutoff: f64, resonance: f64) -> f64 {
        let nyquist_guard = MAX_CUTOFF_RATIO * self.sample_rate;
        let cutoff = if cutoff.is_finite() {
            cutoff.clamp(MIN_CUTOFF, nyquist_guard)
        } else {
            MIN_CUTOFF
        };
        let resonance = if resonance.is_finite() {
            resonance.clamp(0.0, MAX_RESONANCE)
        } else {
            0.0
        };

        let g = (PI * cutoff / self.sample_rate).tan();
        let a = g / (1.0 + g);
        let b = 1.0 / (1.0 + g);
        let k = resonance * 4.0;

        let [s1, s2, s3, s4] = self.state;
        // Contribution of the stored state to the fourth stage output.
        let sigma = a * a * a * b * s1 + a * a * b * s2 + a * b * s3 + b * s4;
        let mut u = (input - k * sigma.tanh()) / (1.0 + k * a * a * a * a);

        for s in self.state.iter_mut() {
            let v = (u - *s) * a;
            let y = v + *s;
            *s = y + v;
            u = y;
        }

        if !u.is_finite() || self.state.iter().any(|s| !s.is_finite()) {
            self.reset();
            return 0.0;
        }
        u
    }

    /// Filter a block.
    ///
    /// `input` of `None` (nothing connected) or an empty slice resets the
    /// filter and writes silence. The filtered signal is copied into every
    /// output channel.
    pub fn process_block(
        &mut self,
        input: Option<&[f64]>,
        cutoff: &[f64],
        resonance: &[f64],
        outputs: &mut [&mut [f64]],
    ) {
        let input = match input {
            Some(block) if !block.is_empty() => block,
            _ => {
                self.reset();
                for channel in outputs.iter_mut() {
                    channel.fill(0.0);
                }
                return;
            }
        };

        for (i, &x) in input.iter().enumerate() {
            let fc = cutoff.get(i).or(cutoff.last()).copied().unwrap_or(MIN_CUTOFF);
            let res = resonance.get(i).or(resonance.last()).copied().unwrap_or(0.0);
            let y = self.process(x, fc, res);
            for channel in outputs.iter_mut() {
                if let Some(slot) = channel.get_mut(i) {
                    *slot = y;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_dc() {
        let mut f = LadderFilter::new(44100.0);
        let mut out = 0.0;
        for _ in 0..20000 {
            out = f.process(0.5, 2000.0, 0.0);
        }
        assert!((out - 0.5).abs() < 0.01, "Ladder should pass DC at zero resonance, got {out}");
    }

    #[test]
    fn attenuates_high_frequencies() {
        let mut f = LadderFilter::new(44100.0);
        let mut peak = 0.0_f64;
        for i in 0..8820 {
            let x = (2.0 * PI * 10000.0 * i as f64 / 44100.0).sin();
            let y = f.process(x, 200.0, 0.0);
            if i > 2000 {
                peak = peak.max(y.abs());
            }
        }
        assert!(peak < 0.001, "24dB/oct at 200Hz should crush 10kHz, got {peak}");
    }

    #[test]
    fn impulse_response_stays_bounded_across_sweep() {
        let sample_rate = 44100.0;
        let cutoffs = [20.0, 100.0, 1000.0, 5000.0, 12000.0, 0.45 * sample_rate];
        let resonances = [0.0, 0.25, 0.5, 0.9, 0.99];
        for &fc in &cutoffs {
            for &res in &resonances {
                let mut f = LadderFilter::new(sample_rate);
                for n in 0..10_000 {
                    let x = if n == 0 { 1.0 } else { 0.0 };
                    let y = f.process(x, fc, res);
                    assert!(y.is_finite(), "Non-finite output at fc={fc} res={res} n={n}");
                    assert!(y.abs() < 10.0, "Unbounded output {y} at fc={fc} res={res} n={n}");
                }
            }
        }
    }

    #[test]
    fn parameters_are_clamped() {
        let mut f = LadderFilter::new(44100.0);
        for _ in 0..1000 {
            let y = f.process(1.0, 1.0e9, 50.0);
            assert!(y.is_finite() && y.abs() < 10.0);
        }
    }

    #[test]
    fn non_finite_input_resets_to_silence() {
        let mut f = LadderFilter::new(44100.0);
        for _ in 0..100 {
            f.process(1.0, 1000.0, 0.5);
        }
        assert_eq!(f.process(f64::NAN, 1000.0, 0.5), 0.0);
        assert_eq!(f.state, [0.0; 4]);
    }

    #[test]
    fn disconnected_input_writes_silence_to_all_channels() {
        let mut f = LadderFilter::new(44100.0);
        f.process(1.0, 1000.0, 0.5);
        let mut left = [1.0; 8];
        let mut right = [1.0; 8];
        f.process_block(None, &[1000.0], &[0.5], &mut [&mut left[..], &mut right[..]]);
        assert!(left.iter().chain(right.iter()).all(|&s| s == 0.0));
        assert_eq!(f.state, [0.0; 4]);

        f.process_block(Some(&[] as &[f64]), &[1000.0], &[0.5], &mut [&mut left[..]]);
        assert!(left.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn stereo_outputs_are_identical() {
        let mut f = LadderFilter::new(44100.0);
        let input: Vec<f64> = (0..64).map(|i| if i % 8 == 0 { 1.0 } else { -0.2 }).collect();
        let mut left = vec![0.0; 64];
        let mut right = vec![0.0; 64];
        f.process_block(Some(input.as_slice()), &[800.0], &[0.7], &mut [&mut left[..], &mut right[..]]);
        assert_eq!(left, right);
        assert!(left.iter().any(|&s| s != 0.0));
    }
}
