//! Waveshaping distortion.

/// Drive values at or below this leave the signal untouched.
pub const DRIVE_THRESHOLD: f64 = 3.0;

/// Cubic soft clipper: `1.5x - 0.5x³` on a pre-gained, clamped input.
///
/// `drive` (0-100) sets the pre-gain `1 + drive / 10`. The curve is
/// monotonic and saturates smoothly at ±1.
pub fn soft_clip_cubic(x: f64, drive: f64) -> f64 {
    let gained = (x * (1.0 + drive.max(0.0) / 10.0)).clamp(-1.0, 1.0);
    1.5 * gained - 0.5 * gained * gained * gained
}
