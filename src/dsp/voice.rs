//! Voice — a scheduled sound that renders itself against the audio clock.

/// A sound with a start time, rendered block-by-block.
///
/// Frame `n` lives at absolute time `n / sample_rate`. Voices output
/// silence before their start time and report themselves finished once
/// nothing more can be heard.
pub trait Voice {
    /// Add this voice's output for `out.len()` frames starting at `start_frame`.
    fn render_add(&mut self, start_frame: u64, out: &mut [f64]);

    /// True once the voice is silent for every time at or after `time`.
    fn is_finished(&self, time: f64) -> bool;

    /// Hard stop: gain forced to zero and the sound source stopped at `time`.
    fn kill(&mut self, time: f64);
}

/// The active window of a voice on the audio clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lifetime {
    pub start: f64,
    pub stop: Option<f64>,
}

impl Lifetime {
    pub fn starting_at(start: f64) -> Self {
        Lifetime { start, stop: None }
    }

    /// Schedule (or bring forward) the stop time.
    pub fn stop_at(&mut self, time: f64) {
        let time = time.max(self.start);
        self.stop = Some(self.stop.map_or(time, |s| s.min(time)));
    }

    /// Is the voice sounding at `t`?
    #[inline]
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && self.stop.is_none_or(|s| t < s)
    }

    pub fn is_over(&self, t: f64) -> bool {
        self.stop.is_some_and(|s| t >= s)
    }
}

/// Owned collection of voices rendered and reaped together.
pub struct VoicePool<V: Voice> {
    voices: Vec<V>,
    sample_rate: f64,
}

impl<V: Voice> VoicePool<V> {
    pub fn new(sample_rate: f64) -> Self {
        VoicePool {
            voices: Vec::new(),
            sample_rate,
        }
    }

    pub fn push(&mut self, voice: V) {
        self.voices.push(voice);
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.voices.iter_mut()
    }

    /// Render every voice into `out`, then drop voices that have finished.
    pub fn render_add(&mut self, start_frame: u64, out: &mut [f64]) {
        for voice in self.voices.iter_mut() {
            voice.render_add(start_frame, out);
        }
        let block_end = (start_frame + out.len() as u64) as f64 / self.sample_rate;
        self.voices.retain(|v| !v.is_finished(block_end));
    }

    /// Kill every voice at `time`.
    pub fn kill_all(&mut self, time: f64) {
        for voice in self.voices.iter_mut() {
            voice.kill(time);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Click {
        life: Lifetime,
        sample_rate: f64,
    }

    impl Voice for Click {
        fn render_add(&mut self, start_frame: u64, out: &mut [f64]) {
            for (i, slot) in out.iter_mut().enumerate() {
                let t = (start_frame + i as u64) as f64 / self.sample_rate;
                if self.life.contains(t) {
                    *slot += 1.0;
                }
            }
        }

        fn is_finished(&self, time: f64) -> bool {
            self.life.is_over(time)
        }

        fn kill(&mut self, time: f64) {
            self.life.stop_at(time);
        }
    }

    #[test]
    fn lifetime_window() {
        let mut life = Lifetime::starting_at(1.0);
        assert!(!life.contains(0.5));
        assert!(life.contains(1.0));
        life.stop_at(2.0);
        assert!(life.contains(1.99));
        assert!(!life.contains(2.0));
        life.stop_at(3.0);
        assert_eq!(life.stop, Some(2.0), "A later stop must not extend the voice");
        life.stop_at(0.0);
        assert_eq!(life.stop, Some(1.0), "Stop is clamped to the start");
    }

    #[test]
    fn pool_renders_and_reaps() {
        let sample_rate = 10.0;
        let mut pool = VoicePool::new(sample_rate);
        let mut life = Lifetime::starting_at(0.2);
        life.stop_at(0.5);
        pool.push(Click { life, sample_rate });

        let mut out = vec![0.0; 10];
        pool.render_add(0, &mut out);
        assert_eq!(out, vec![0.0, 0.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(pool.is_empty(), "Finished voice should be dropped");
    }

    #[test]
    fn kill_all_silences() {
        let sample_rate = 10.0;
        let mut pool = VoicePool::new(sample_rate);
        pool.push(Click { life: Lifetime::starting_at(0.0), sample_rate });
        pool.kill_all(0.3);
        let mut out = vec![0.0; 5];
        pool.render_add(0, &mut out);
        assert_eq!(out, vec![1.0, 1.0, 1.0, 0.0, 0.0]);
        assert_eq!(pool.len(), 0);
    }
}
