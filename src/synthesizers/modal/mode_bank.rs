use std::f64::consts::PI;

use super::physics;

/// Damping model shared by every mode of a bank.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Damping {
    pub decay: f64,
    pub decay_high_freq: f64,
}

/// A fixed-size bank of decaying sinusoids, stored as parallel arrays.
///
/// Every array is allocated once in `new` and indexed `0..len()`; nothing in
/// `tick` allocates.
#[derive(Debug, Clone)]
pub struct ModeBank {
    sample_rate: f64,

    sigmas: Box<[f64]>,
    frequencies: Box<[f64]>,
    amplitudes: Box<[f64]>,
    weights: Box<[f64]>,

    // Phase in cycles, [0, 1).
    phases: Box<[f64]>,
    phase_incs: Box<[f64]>,
    decay_muls: Box<[f64]>,
}

impl ModeBank {
    pub fn new(num_modes: usize, damping: Damping, sample_rate: f64) -> Self {
        let sigmas: Box<[f64]> = (1..=num_modes)
            .map(|n| physics::damping(n, damping.decay, damping.decay_high_freq))
            .collect();

        Self {
            sample_rate,
            sigmas,
            frequencies: vec![0.0; num_modes].into_boxed_slice(),
            amplitudes: vec![0.0; num_modes].into_boxed_slice(),
            weights: vec![0.0; num_modes].into_boxed_slice(),
            phases: vec![0.0; num_modes].into_boxed_slice(),
            phase_incs: vec![0.0; num_modes].into_boxed_slice(),
            decay_muls: vec![1.0; num_modes].into_boxed_slice(),
        }
    }

    pub fn len(&self) -> usize {
        self.sigmas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sigmas.is_empty()
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Change the sample rate and zero all phases.
    pub fn prepare(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        for phase in self.phases.iter_mut() {
            *phase = 0.0;
        }
        self.refresh_rates();
    }

    /// Set every mode frequency for a note at `base_frequency` Hz.
    pub fn tune(&mut self, base_frequency: f64, stiffness: f64) {
        for (i, (freq, &sigma)) in self.frequencies.iter_mut().zip(self.sigmas.iter()).enumerate() {
            let w0 = physics::stiff_ratio(i + 1, stiffness);
            *freq = base_frequency * physics::damped_ratio(w0, sigma);
        }
        self.refresh_rates();
    }

    /// Load the initial amplitudes of a triangular pluck.
    pub fn excite(&mut self, pluck_position: f64) {
        let pluck = physics::clamp_position(pluck_position);
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            let a = physics::pluck_amplitude(i + 1, pluck);
            *amp = if a.is_finite() { a } else { 0.0 };
        }
    }

    pub fn set_pickup(&mut self, pickup_position: f64) {
        for (i, weight) in self.weights.iter_mut().enumerate() {
            *weight = physics::pickup_weight(i + 1, pickup_position);
        }
    }

    /// Advance every mode by one sample and return the weighted sum.
    /// Amplitudes decay after they are read.
    #[inline]
    pub fn tick(&mut self) -> f64 {
        let mut sum = 0.0;
        for i in 0..self.len() {
            let mut phase = self.phases[i] + self.phase_incs[i];
            phase -= phase.floor();
            self.phases[i] = phase;

            sum += (2.0 * PI * phase).sin() * self.amplitudes[i] * self.weights[i];
            self.amplitudes[i] *= self.decay_muls[i];
        }
        sum
    }

    /// Sum of squared mode amplitudes.
    pub fn energy(&self) -> f64 {
        self.amplitudes.iter().map(|a| a * a).sum()
    }

    pub fn frequency(&self, mode: usize) -> f64 {
        self.frequencies[mode]
    }

    pub fn amplitude(&self, mode: usize) -> f64 {
        self.amplitudes[mode]
    }

    pub fn weight(&self, mode: usize) -> f64 {
        self.weights[mode]
    }

    pub fn sigma(&self, mode: usize) -> f64 {
        self.sigmas[mode]
    }

    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    pub fn amplitudes(&self) -> &[f64] {
        &self.amplitudes
    }

    fn refresh_rates(&mut self) {
        let sr = self.sample_rate;
        for i in 0..self.len() {
            let freq = self.frequencies[i];
            self.phase_incs[i] = freq / sr;
            self.decay_muls[i] = physics::decay_multiplier(self.sigmas[i], freq, sr);
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    const DAMPING: Damping = Damping {
        decay: 0.001,
        decay_high_freq: 0.001,
    };

    #[test]
    fn tune_places_modes_near_harmonics_without_stiffness() {
        let mut bank = ModeBank::new(8, DAMPING, 44100.0);
        bank.tune(100.0, 0.0);
        for i in 0..bank.len() {
            let harmonic = 100.0 * (i + 1) as f64;
            assert!((bank.frequency(i) - harmonic).abs() < 0.01 * harmonic);
            assert!(bank.frequency(i) <= harmonic);
        }
    }

    #[test]
    fn silent_until_excited() {
        let mut bank = ModeBank::new(16, DAMPING, 44100.0);
        bank.tune(220.0, 0.3);
        bank.set_pickup(0.3);
        for _ in 0..64 {
            assert_eq!(bank.tick(), 0.0);
        }
    }

    #[test]
    fn prepare_resets_phase() {
        let mut bank = ModeBank::new(4, DAMPING, 44100.0);
        bank.tune(440.0, 0.0);
        bank.excite(0.5);
        bank.set_pickup(0.5);
        let first = bank.tick();
        for _ in 0..100 {
            bank.tick();
        }

        let mut fresh = ModeBank::new(4, DAMPING, 48000.0);
        fresh.tune(440.0, 0.0);
        fresh.prepare(44100.0);
        fresh.excite(0.5);
        fresh.set_pickup(0.5);
        assert!((fresh.tick() - first).abs() < 1e-12);

        bank.prepare(44100.0);
        bank.excite(0.5);
        assert!((bank.tick() - first).abs() < 1e-12);
    }
}
