//! Closed-form helpers for the ideal stiff plucked string.
//!
//! Mode numbers are 1-based throughout (`n = i + 1` for array index `i`).

use std::f64::consts::PI;

/// Smallest distance a pluck or pickup position keeps from either string end.
pub const POSITION_MARGIN: f64 = 0.01;
pub const MIN_POSITION: f64 = POSITION_MARGIN;
pub const MAX_POSITION: f64 = PI - POSITION_MARGIN;

/// Equal-tempered A440 mapping.
pub fn note_to_hertz(note: u8) -> f64 {
    440.0 * 2.0f64.powf((note as f64 - 69.0) / 12.0)
}

/// Frequency-dependent damping coefficient `decay + decay_high_freq * n^2`.
pub fn damping(n: usize, decay: f64, decay_high_freq: f64) -> f64 {
    let n = n as f64;
    decay + decay_high_freq * n * n
}

/// Undamped frequency ratio of mode `n`, stretched by bending stiffness.
pub fn stiff_ratio(n: usize, stiffness: f64) -> f64 {
    let n = n as f64;
    n * (1.0 + stiffness * stiffness * n * n).sqrt()
}

/// Damped frequency ratio. A damping coefficient at or above `w0` is treated
/// as critical damping and yields 0 rather than NaN.
pub fn damped_ratio(w0: f64, sigma: f64) -> f64 {
    if w0 <= 0.0 {
        return 0.0;
    }
    let ratio = sigma / w0;
    let radicand = (1.0 - ratio * ratio).max(0.0);
    w0 * radicand.sqrt()
}

/// Initial amplitude of mode `n` for a triangular pluck at `pluck` radians
/// along a string of length π.
///
/// `pluck` must already be inside `[MIN_POSITION, MAX_POSITION]`; near the
/// ends the denominator vanishes.
pub fn pluck_amplitude(n: usize, pluck: f64) -> f64 {
    let nf = n as f64;
    let denom = nf * nf * pluck * (PI - pluck);
    2.0 * (pluck * nf).sin() / denom
}

/// Output weight of mode `n` sensed at `pickup` radians along the string.
pub fn pickup_weight(n: usize, pickup: f64) -> f64 {
    (n as f64 * pickup).sin()
}

/// Per-sample amplitude multiplier. The exponent uses the mode's own damped
/// frequency in Hz, so stiffer (sharper) modes also die faster.
pub fn decay_multiplier(sigma: f64, frequency: f64, sample_rate: f64) -> f64 {
    (-sigma * frequency / sample_rate).exp()
}

/// Clamp a pluck or pickup position into the open string interval.
/// Non-finite input falls back to the lower bound.
pub fn clamp_position(position: f64) -> f64 {
    if position.is_nan() {
        return MIN_POSITION;
    }
    position.clamp(MIN_POSITION, MAX_POSITION)
}
