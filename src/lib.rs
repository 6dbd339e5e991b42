//! A plucked-string modal synthesizer.
//!
//! Each voice is a bank of decaying sinusoids whose frequencies and initial
//! amplitudes come from a stiff-string model. [`engine::Engine`] renders on
//! the audio thread; [`engine::EngineHandle`] feeds it notes and parameters
//! from anywhere else.

pub mod audio;
pub mod buffer;
pub mod config;
pub mod engine;
pub mod error;
pub mod midi;
pub mod midi_controller;
pub mod params;
pub mod synth;
pub mod synthesizers;
pub mod util;
pub mod voice_pool;

pub use buffer::AudioBuffer;
pub use config::SynthConfig;
pub use engine::{Engine, EngineHandle, NoteEvent};
pub use error::EngineError;
pub use params::{ParamTarget, Parameter};
