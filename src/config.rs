use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::EngineError;
use crate::params::{Parameter, VoiceParams};
use crate::synthesizers::modal::{Damping, ModalSettings};
use crate::voice_pool::StealPolicy;

pub const MAX_VOICES: usize = 16;
pub const MAX_MODES: usize = 256;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SynthConfig {
    pub voices: usize,
    pub modes: usize,
    pub master_gain: f64,
    pub velocity_sensitive: bool,
    pub decay: f64,
    pub decay_high_freq: f64,
    pub event_queue_capacity: usize,
    pub steal_policy: StealPolicy,
    pub initial: InitialParams,
    pub controllers: ControllerMap,
}

#[derive(Debug, Copy, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InitialParams {
    pub stiffness: f64,
    pub pluck_position: f64,
    pub pickup_position: f64,
}

/// MIDI CC numbers that drive each parameter.
#[derive(Debug, Copy, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControllerMap {
    pub stiffness: Option<u8>,
    pub pluck_position: Option<u8>,
    pub pickup_position: Option<u8>,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            voices: 1,
            modes: 50,
            master_gain: 0.7,
            velocity_sensitive: false,
            decay: 0.001,
            decay_high_freq: 0.001,
            event_queue_capacity: 256,
            steal_policy: StealPolicy::Drop,
            initial: InitialParams::default(),
            controllers: ControllerMap::default(),
        }
    }
}

impl Default for InitialParams {
    fn default() -> Self {
        let p = VoiceParams::default();
        Self {
            stiffness: p.stiffness,
            pluck_position: p.pluck_position,
            pickup_position: p.pickup_position,
        }
    }
}

impl Default for ControllerMap {
    fn default() -> Self {
        Self {
            stiffness: Some(21),
            pluck_position: Some(22),
            pickup_position: Some(23),
        }
    }
}

impl ControllerMap {
    pub fn parameter_for(&self, controller: u8) -> Option<Parameter> {
        let c = Some(controller);
        if c == self.stiffness {
            Some(Parameter::Stiffness)
        } else if c == self.pluck_position {
            Some(Parameter::PluckPosition)
        } else if c == self.pickup_position {
            Some(Parameter::PickupPosition)
        } else {
            None
        }
    }
}

impl SynthConfig {
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path)
            .with_context(|| format!("could not open config file {}", path.display()))?;
        let mut file_as_string = String::new();
        file.read_to_string(&mut file_as_string)?;

        let config = Self::from_toml_str(&file_as_string)
            .with_context(|| format!("in config file {}", path.display()))?;
        Ok(config)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: SynthConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let invalid = |msg: String| -> Result<(), EngineError> { Err(EngineError::InvalidConfig(msg)) };

        if self.voices == 0 || self.voices > MAX_VOICES {
            return invalid(format!("voices must be in 1..={}, got {}", MAX_VOICES, self.voices));
        }
        if self.modes == 0 || self.modes > MAX_MODES {
            return invalid(format!("modes must be in 1..={}, got {}", MAX_MODES, self.modes));
        }
        if !self.master_gain.is_finite() || self.master_gain < 0.0 {
            return invalid(format!("master_gain must be finite and >= 0, got {}", self.master_gain));
        }
        for &(name, value) in &[("decay", self.decay), ("decay_high_freq", self.decay_high_freq)] {
            if !value.is_finite() || value < 0.0 {
                return invalid(format!("{} must be finite and >= 0, got {}", name, value));
            }
        }
        if self.event_queue_capacity == 0 {
            return invalid("event_queue_capacity must be at least 1".to_string());
        }
        Ok(())
    }

    /// Initial voice parameters, clamped into range.
    pub fn initial_params(&self) -> VoiceParams {
        VoiceParams {
            stiffness: self.initial.stiffness,
            pluck_position: self.initial.pluck_position,
            pickup_position: self.initial.pickup_position,
        }
        .clamped()
    }

    pub fn modal_settings(&self) -> ModalSettings {
        ModalSettings {
            num_modes: self.modes,
            master_gain: self.master_gain,
            velocity_sensitive: self.velocity_sensitive,
            damping: Damping {
                decay: self.decay,
                decay_high_freq: self.decay_high_freq,
            },
            initial: self.initial_params(),
            ..ModalSettings::default()
        }
    }
}
