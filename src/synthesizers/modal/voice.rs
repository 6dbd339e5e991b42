use super::mode_bank::ModeBank;
use super::physics;
use super::ModalSettings;
use crate::buffer::AudioBuffer;
use crate::params::{Parameter, VoiceParams};
use crate::synth::{SoundKind, Voice};

/// One string: a mode bank plus the gain and physical parameters of the
/// note it is sounding.
///
/// Stiffness and pluck position are read at note-on only. Pickup position
/// takes effect immediately.
#[derive(Debug, Clone)]
pub struct ModalVoice {
    modes: ModeBank,
    params: VoiceParams,
    master_gain: f64,
    velocity_sensitive: bool,

    note: Option<u8>,
    master_amplitude: f64,
}

impl ModalVoice {
    pub fn new(settings: &ModalSettings) -> Self {
        let params = settings.initial.clamped();
        let mut modes = ModeBank::new(settings.num_modes, settings.damping, settings.sample_rate);
        modes.set_pickup(params.pickup_position);

        Self {
            modes,
            params,
            master_gain: settings.master_gain,
            velocity_sensitive: settings.velocity_sensitive,
            note: None,
            master_amplitude: 0.0,
        }
    }

    pub fn set_stiffness(&mut self, value: f64) {
        if value.is_finite() {
            self.params.stiffness = Parameter::Stiffness.clamp(value);
        }
    }

    pub fn set_pluck_position(&mut self, value: f64) {
        if value.is_finite() {
            self.params.pluck_position = Parameter::PluckPosition.clamp(value);
        }
    }

    /// Recompute the output weights. Frequencies and amplitudes are untouched.
    pub fn set_pickup_position(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        let value = Parameter::PickupPosition.clamp(value);
        if value != self.params.pickup_position {
            self.params.pickup_position = value;
            self.modes.set_pickup(value);
        }
    }

    pub fn params(&self) -> VoiceParams {
        self.params
    }

    pub fn modes(&self) -> &ModeBank {
        &self.modes
    }

    pub fn master_amplitude(&self) -> f64 {
        self.master_amplitude
    }
}

impl Voice for ModalVoice {
    fn can_play(&self, sound: SoundKind) -> bool {
        sound == SoundKind::PluckedString
    }

    fn prepare(&mut self, sample_rate: f64) {
        self.modes.prepare(sample_rate);
    }

    fn start_note(&mut self, note: u8, velocity: f32) -> bool {
        if note > 127 || self.note.is_some() {
            return false;
        }

        let base = physics::note_to_hertz(note);
        self.modes.tune(base, self.params.stiffness);
        self.modes.excite(self.params.pluck_position);

        let velocity = if self.velocity_sensitive {
            velocity.clamp(0.0, 1.0) as f64
        } else {
            1.0
        };
        self.master_amplitude = self.master_gain * velocity;
        self.note = Some(note);
        true
    }

    // No release tail: the voice goes silent at once.
    fn stop_note(&mut self, _velocity: f32, _allow_tail_off: bool) {
        self.master_amplitude = 0.0;
        self.note = None;
    }

    fn current_note(&self) -> Option<u8> {
        self.note
    }

    fn apply_params(&mut self, params: VoiceParams) {
        self.set_stiffness(params.stiffness);
        self.set_pluck_position(params.pluck_position);
        self.set_pickup_position(params.pickup_position);
    }

    fn render_next_block(&mut self, output: &mut AudioBuffer, start_sample: usize, num_samples: usize) {
        if self.note.is_none() {
            return;
        }

        let gain = self.master_amplitude;
        for i in start_sample..start_sample + num_samples {
            let sample = self.modes.tick() * gain;
            output.add_to_all(i, sample as f32);
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn prepared_voice() -> ModalVoice {
        let mut voice = ModalVoice::new(&ModalSettings::default());
        voice.prepare(44100.0);
        voice
    }

    fn render(voice: &mut ModalVoice, num_samples: usize) -> AudioBuffer {
        let mut buf = AudioBuffer::new(2, num_samples);
        voice.render_next_block(&mut buf, 0, num_samples);
        buf
    }

    #[test]
    fn stop_mutes_immediately() {
        let mut voice = prepared_voice();
        assert!(voice.start_note(60, 1.0));
        voice.stop_note(0.0, true);
        assert!(!voice.is_playing());
        assert_eq!(voice.master_amplitude(), 0.0);

        let buf = render(&mut voice, 256);
        for ch in 0..buf.num_channels() {
            assert!(buf.channel(ch).iter().all(|&s| s == 0.0));
        }

        // Idempotent.
        voice.stop_note(0.0, false);
        assert!(!voice.is_playing());
    }

    #[test]
    fn sounding_voice_writes_every_channel() {
        let mut voice = prepared_voice();
        voice.start_note(69, 1.0);
        let buf = render(&mut voice, 512);

        assert!(buf.channel(0).iter().any(|&s| s != 0.0));
        assert_eq!(buf.channel(0), buf.channel(1));
        assert!(buf.channel(0).iter().all(|s| s.is_finite()));
    }

    #[test]
    fn rejects_out_of_range_notes_and_busy_voice() {
        let mut voice = prepared_voice();
        assert!(!voice.start_note(128, 1.0));
        assert!(!voice.is_playing());

        assert!(voice.start_note(40, 1.0));
        assert!(!voice.start_note(41, 1.0));
        assert_eq!(voice.current_note(), Some(40));
    }

    #[test]
    fn energy_never_increases() {
        let mut voice = prepared_voice();
        voice.set_stiffness(0.4);
        voice.start_note(57, 1.0);

        let mut buf = AudioBuffer::new(1, 1);
        let mut last = voice.modes().energy();
        assert!(last > 0.0);
        for _ in 0..4096 {
            voice.render_next_block(&mut buf, 0, 1);
            let energy = voice.modes().energy();
            assert!(energy <= last, "{} > {}", energy, last);
            last = energy;
        }
    }

    #[test]
    fn pickup_only_changes_weights() {
        let mut voice = prepared_voice();
        voice.set_stiffness(0.2);
        voice.start_note(64, 1.0);
        render(&mut voice, 100);

        let freqs = voice.modes().frequencies().to_vec();
        let amps = voice.modes().amplitudes().to_vec();
        let weight = voice.modes().weight(1);

        voice.set_pickup_position(1.1);

        assert_eq!(voice.modes().frequencies(), &freqs[..]);
        assert_eq!(voice.modes().amplitudes(), &amps[..]);
        assert_ne!(voice.modes().weight(1), weight);
        assert!((voice.modes().weight(1) - (2.0 * 1.1f64).sin()).abs() < 1e-12);
    }

    #[test]
    fn stiffness_waits_for_next_note() {
        let mut voice = prepared_voice();
        voice.start_note(48, 1.0);
        let before = voice.modes().frequencies().to_vec();

        voice.set_stiffness(1.5);
        assert_eq!(voice.modes().frequencies(), &before[..]);

        voice.stop_note(0.0, false);
        voice.start_note(48, 1.0);
        // Stretched partials: mode 2 sits above twice the fundamental.
        assert!(voice.modes().frequency(1) > 2.0 * voice.modes().frequency(0));
    }

    #[test]
    fn boundary_pluck_positions_never_produce_nan() {
        for &pluck in &[0.0, std::f64::consts::PI, -3.0, 10.0] {
            let mut voice = prepared_voice();
            voice.set_pluck_position(pluck);
            voice.start_note(60, 1.0);
            assert!(voice.modes().amplitudes().iter().all(|a| a.is_finite()));

            let buf = render(&mut voice, 128);
            assert!(buf.channel(0).iter().all(|s| s.is_finite()));
        }
    }

    #[test]
    fn accumulates_into_existing_content() {
        let mut voice = prepared_voice();
        voice.start_note(69, 1.0);
        let solo = render(&mut prepared_voice_playing(69), 64);

        let mut buf = AudioBuffer::new(2, 64);
        for ch in 0..2 {
            for s in buf.channel_mut(ch).iter_mut() {
                *s = 0.5;
            }
        }
        voice.render_next_block(&mut buf, 0, 64);
        for (mixed, alone) in buf.channel(0).iter().zip(solo.channel(0)) {
            assert!((mixed - (0.5 + alone)).abs() < 1e-6);
        }
    }

    #[test]
    fn render_offset_starts_at_start_sample() {
        let mut voice = prepared_voice();
        voice.start_note(69, 1.0);
        let mut buf = AudioBuffer::new(1, 32);
        voice.render_next_block(&mut buf, 16, 16);
        assert!(buf.channel(0)[..16].iter().all(|&s| s == 0.0));
        assert!(buf.channel(0)[16..].iter().any(|&s| s != 0.0));
    }

    #[test]
    fn velocity_scales_only_when_enabled() {
        let mut voice = prepared_voice();
        voice.start_note(60, 0.25);
        assert!((voice.master_amplitude() - 0.7).abs() < 1e-12);

        let settings = ModalSettings {
            velocity_sensitive: true,
            ..ModalSettings::default()
        };
        let mut voice = ModalVoice::new(&settings);
        voice.prepare(44100.0);
        voice.start_note(60, 0.25);
        assert!((voice.master_amplitude() - 0.175).abs() < 1e-9);
    }

    fn prepared_voice_playing(note: u8) -> ModalVoice {
        let mut voice = prepared_voice();
        voice.start_note(note, 1.0);
        voice
    }
}
