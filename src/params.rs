use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Deserialize;

use crate::synthesizers::modal::physics::{MAX_POSITION, MIN_POSITION};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parameter {
    Stiffness,
    PluckPosition,
    PickupPosition,
}

impl Parameter {
    pub const ALL: [Parameter; 3] = [
        Parameter::Stiffness,
        Parameter::PluckPosition,
        Parameter::PickupPosition,
    ];

    pub fn range(self) -> RangeInclusive<f64> {
        match self {
            Parameter::Stiffness => 0.0..=2.0,
            Parameter::PluckPosition | Parameter::PickupPosition => MIN_POSITION..=MAX_POSITION,
        }
    }

    /// Clamp a finite value into range.
    pub fn clamp(self, value: f64) -> f64 {
        let range = self.range();
        value.clamp(*range.start(), *range.end())
    }

    /// Map a controller position in [0, 1] linearly onto the range.
    pub fn from_normalized(self, x: f64) -> f64 {
        let range = self.range();
        let x = x.clamp(0.0, 1.0);
        range.start() + x * (range.end() - range.start())
    }

    pub fn name(self) -> &'static str {
        match self {
            Parameter::Stiffness => "stiffness",
            Parameter::PluckPosition => "pluck_position",
            Parameter::PickupPosition => "pickup_position",
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Parameter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stiffness" => Ok(Parameter::Stiffness),
            "pluck_position" | "pluck-position" | "pluckPosition" => Ok(Parameter::PluckPosition),
            "pickup_position" | "pickup-position" | "pickupPosition" => Ok(Parameter::PickupPosition),
            other => Err(format!("unknown parameter '{}'", other)),
        }
    }
}

/// Which voices a parameter change applies to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ParamTarget {
    All,
    Voice(usize),
}

/// The physical parameters one voice reads at a block boundary.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct VoiceParams {
    pub stiffness: f64,
    pub pluck_position: f64,
    pub pickup_position: f64,
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self {
            stiffness: 0.0,
            pluck_position: 0.2,
            pickup_position: 0.3,
        }
    }
}

impl VoiceParams {
    pub fn get(&self, param: Parameter) -> f64 {
        match param {
            Parameter::Stiffness => self.stiffness,
            Parameter::PluckPosition => self.pluck_position,
            Parameter::PickupPosition => self.pickup_position,
        }
    }

    pub fn set(&mut self, param: Parameter, value: f64) {
        match param {
            Parameter::Stiffness => self.stiffness = value,
            Parameter::PluckPosition => self.pluck_position = value,
            Parameter::PickupPosition => self.pickup_position = value,
        }
    }

    /// Every field clamped into its range.
    pub fn clamped(mut self) -> Self {
        for &param in Parameter::ALL.iter() {
            let value = self.get(param);
            let value = if value.is_finite() { param.clamp(value) } else { *param.range().start() };
            self.set(param, value);
        }
        self
    }
}

/// An `f64` stored as bits, single writer / single reader, relaxed.
#[derive(Debug)]
pub struct AtomicF64(AtomicU64);

impl AtomicF64 {
    pub fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    #[inline]
    pub fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

#[derive(Debug)]
struct ParamSlot {
    stiffness: AtomicF64,
    pluck_position: AtomicF64,
    pickup_position: AtomicF64,
}

impl ParamSlot {
    fn new(initial: VoiceParams) -> Self {
        Self {
            stiffness: AtomicF64::new(initial.stiffness),
            pluck_position: AtomicF64::new(initial.pluck_position),
            pickup_position: AtomicF64::new(initial.pickup_position),
        }
    }

    fn field(&self, param: Parameter) -> &AtomicF64 {
        match param {
            Parameter::Stiffness => &self.stiffness,
            Parameter::PluckPosition => &self.pluck_position,
            Parameter::PickupPosition => &self.pickup_position,
        }
    }
}

/// Per-voice parameter slots shared between the event side (writer) and the
/// render thread (reader).
#[derive(Debug)]
pub struct ParamStore {
    slots: Box<[ParamSlot]>,
}

impl ParamStore {
    pub fn new(num_voices: usize, initial: VoiceParams) -> Self {
        let initial = initial.clamped();
        Self {
            slots: (0..num_voices).map(|_| ParamSlot::new(initial)).collect(),
        }
    }

    pub fn num_voices(&self) -> usize {
        self.slots.len()
    }

    /// Store an already validated and clamped value. Returns false if
    /// `target` names a voice that does not exist.
    pub fn store(&self, param: Parameter, value: f64, target: ParamTarget) -> bool {
        match target {
            ParamTarget::All => {
                for slot in self.slots.iter() {
                    slot.field(param).store(value);
                }
                true
            }
            ParamTarget::Voice(index) => match self.slots.get(index) {
                Some(slot) => {
                    slot.field(param).store(value);
                    true
                }
                None => false,
            },
        }
    }

    pub fn snapshot(&self, voice: usize) -> VoiceParams {
        let slot = &self.slots[voice];
        VoiceParams {
            stiffness: slot.stiffness.load(),
            pluck_position: slot.pluck_position.load(),
            pickup_position: slot.pickup_position.load(),
        }
    }
}
