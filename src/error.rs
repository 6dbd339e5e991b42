use thiserror::Error;

use crate::engine::NoteEvent;
use crate::params::Parameter;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("sample rate must be positive and finite, got {0}")]
    InvalidSampleRate(f64),

    #[error("MIDI note {0} is outside 0..=127")]
    NoteOutOfRange(u8),

    #[error("value for {0} is not finite")]
    NonFiniteParameter(Parameter),

    #[error("no voice with index {0}")]
    NoSuchVoice(usize),

    #[error("event queue is full, dropped {0:?}")]
    EventQueueFull(NoteEvent),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
