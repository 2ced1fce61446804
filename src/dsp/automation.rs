//! Parameter automation — sample-accurate value timelines.
//!
//! Follows the scheduling model of a WebAudio `AudioParam`: the control side
//! appends events at absolute (usually future) times and the render side
//! evaluates the timeline at the absolute time of every frame. Nothing that
//! has already been rendered is ever rewritten.

/// Shape of a scheduled change.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Curve {
    /// Jump to the value at the event time.
    Set,
    /// Straight line from the previous event to this one.
    Linear,
    /// Exponential curve from the previous event to this one.
    Exponential,
    /// Exponential approach towards the value, starting at the event time.
    Target { time_constant: f64 },
}

#[derive(Debug, Clone, Copy)]
struct Event {
    time: f64,
    value: f64,
    curve: Curve,
}

/// A time-ordered list of parameter changes.
#[derive(Debug, Clone)]
pub struct Automation {
    default_value: f64,
    events: Vec<Event>,
    /// Value reached at each event's own time (parallel to `events`).
    resolved: Vec<f64>,
}

impl Automation {
    pub fn new(default_value: f64) -> Self {
        Automation {
            default_value,
            events: Vec::new(),
            resolved: Vec::new(),
        }
    }

    /// Jump to `value` at `time`.
    pub fn set_value_at(&mut self, value: f64, time: f64) {
        self.insert(Event { time, value, curve: Curve::Set });
    }

    /// Ramp linearly from the previous event so that `value` is reached at `end_time`.
    pub fn linear_ramp_to(&mut self, value: f64, end_time: f64) {
        self.insert(Event { time: end_time, value, curve: Curve::Linear });
    }

    /// Ramp exponentially from the previous event so that `value` is reached at `end_time`.
    ///
    /// If the start and end values do not share a sign (or one is zero) the
    /// previous value is held until `end_time`.
    pub fn exponential_ramp_to(&mut self, value: f64, end_time: f64) {
        self.insert(Event { time: end_time, value, curve: Curve::Exponential });
    }

    /// Start approaching `target` at `start_time` with the given time constant.
    pub fn set_target_at(&mut self, target: f64, start_time: f64, time_constant: f64) {
        self.insert(Event {
            time: start_time,
            value: target,
            curve: Curve::Target { time_constant },
        });
    }

    /// Remove every event at or after `time`.
    pub fn cancel_scheduled_values(&mut self, time: f64) {
        let keep = self.events.partition_point(|e| e.time < time);
        self.events.truncate(keep);
        self.resolved.truncate(keep);
    }

    /// Remove every event at or after `time`, freezing the value the
    /// timeline had at `time` so later ramps start from it.
    pub fn cancel_and_hold_at(&mut self, time: f64) {
        let held = self.value_at(time);
        self.cancel_scheduled_values(time);
        self.set_value_at(held, time);
    }

    /// Evaluate the timeline at absolute time `t` (seconds).
    pub fn value_at(&self, t: f64) -> f64 {
        let idx = self.events.partition_point(|e| e.time <= t);

        if idx == 0 {
            return self.default_value;
        }

        if let Some(next) = self.events.get(idx) {
            if matches!(next.curve, Curve::Linear | Curve::Exponential) {
                return ramp(next, self.events[idx - 1].time, self.resolved[idx - 1], t);
            }
        }

        let prev = &self.events[idx - 1];
        match prev.curve {
            Curve::Target { time_constant } => {
                approach(self.resolved[idx - 1], prev.value, t - prev.time, time_constant)
            }
            _ => self.resolved[idx - 1],
        }
    }

    /// Drop events that can no longer influence values at or after `t`.
    pub fn prune_before(&mut self, t: f64) {
        let idx = self.events.partition_point(|e| e.time <= t);
        if idx > 1 {
            let first_kept = idx - 1;
            self.default_value = self.resolved[first_kept];
            self.events.drain(..first_kept);
            self.resolved.drain(..first_kept);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn insert(&mut self, event: Event) {
        if !event.time.is_finite() || !event.value.is_finite() {
            return;
        }
        let idx = self.events.partition_point(|e| e.time <= event.time);
        self.events.insert(idx, event);
        self.resolved.insert(idx, 0.0);
        self.resolve_from(idx);
    }

    fn resolve_from(&mut self, from: usize) {
        for i in from..self.events.len() {
            let event = self.events[i];
            let before = if i == 0 {
                self.default_value
            } else {
                let prev = &self.events[i - 1];
                match prev.curve {
                    Curve::Target { time_constant } => approach(
                        self.resolved[i - 1],
                        prev.value,
                        event.time - prev.time,
                        time_constant,
                    ),
                    _ => self.resolved[i - 1],
                }
            };
            self.resolved[i] = match event.curve {
                Curve::Target { .. } => before,
                _ => event.value,
            };
        }
    }
}

fn ramp(end: &Event, t0: f64, v0: f64, t: f64) -> f64 {
    let span = end.time - t0;
    if !span.is_finite() || span <= 0.0 {
        return end.value;
    }
    let x = ((t - t0) / span).clamp(0.0, 1.0);
    match end.curve {
        Curve::Exponential => {
            if v0 * end.value <= 0.0 {
                v0
            } else {
                v0 * (end.value / v0).powf(x)
            }
        }
        _ => v0 + (end.value - v0) * x,
    }
}

fn approach(start: f64, target: f64, elapsed: f64, time_constant: f64) -> f64 {
    if time_constant <= 0.0 {
        return target;
    }
    target + (start - target) * (-elapsed.max(0.0) / time_constant).exp()
}
