//! Modal synthesis of a stiff plucked string.

pub mod mode_bank;
pub mod physics;
mod voice;

pub use mode_bank::{Damping, ModeBank};
pub use voice::ModalVoice;

use crate::params::VoiceParams;

/// Construction-time settings shared by every modal voice.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ModalSettings {
    pub num_modes: usize,
    pub master_gain: f64,
    pub velocity_sensitive: bool,
    pub damping: Damping,
    pub initial: VoiceParams,
    pub sample_rate: f64,
}

impl Default for ModalSettings {
    fn default() -> Self {
        Self {
            num_modes: 50,
            master_gain: 0.7,
            velocity_sensitive: false,
            damping: Damping {
                decay: 0.001,
                decay_high_freq: 0.001,
            },
            initial: VoiceParams::default(),
            sample_rate: 44100.0,
        }
    }
}
