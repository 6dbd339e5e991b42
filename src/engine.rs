//! The render-side `Engine` and the event-side `EngineHandle`.
//!
//! Note events cross from the handle to the engine through a bounded
//! single-producer single-consumer ring buffer. Parameters are written into
//! per-voice atomic slots and read by the engine once per block. Neither
//! path locks or allocates on the render thread.

use std::sync::Arc;

use rtrb::{Consumer, Producer, RingBuffer};

use crate::buffer::AudioBuffer;
use crate::config::SynthConfig;
use crate::error::EngineError;
use crate::params::{ParamStore, ParamTarget, Parameter};
use crate::synth::SoundKind;
use crate::synthesizers::modal::ModalVoice;
use crate::voice_pool::VoicePool;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum NoteEvent {
    On { note: u8, velocity: f32 },
    Off { note: u8 },
    AllOff,
}

pub struct Engine {
    pool: VoicePool<ModalVoice>,
    params: Arc<ParamStore>,
    events: Consumer<NoteEvent>,
    sample_rate: Option<f64>,
}

pub struct EngineHandle {
    events: Producer<NoteEvent>,
    params: Arc<ParamStore>,
}

impl Engine {
    /// Build the voice pool and the event/parameter channels described by
    /// `config`.
    pub fn new(config: &SynthConfig) -> Result<(Engine, EngineHandle), EngineError> {
        config.validate()?;

        let settings = config.modal_settings();
        let voices = (0..config.voices).map(|_| ModalVoice::new(&settings)).collect();
        let pool = VoicePool::new(voices, SoundKind::PluckedString, config.steal_policy);

        let params = Arc::new(ParamStore::new(config.voices, settings.initial));
        let (producer, consumer) = RingBuffer::new(config.event_queue_capacity);

        let engine = Engine {
            pool,
            params: Arc::clone(&params),
            events: consumer,
            sample_rate: None,
        };
        let handle = EngineHandle {
            events: producer,
            params,
        };
        Ok((engine, handle))
    }

    /// Set the sample rate and reset every oscillator phase. Must succeed
    /// before the first `render_block`.
    pub fn prepare(&mut self, sample_rate: f64) -> Result<(), EngineError> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(EngineError::InvalidSampleRate(sample_rate));
        }
        self.pool.prepare(sample_rate);
        self.sample_rate = Some(sample_rate);
        Ok(())
    }

    pub fn sample_rate(&self) -> Option<f64> {
        self.sample_rate
    }

    /// Add the next `num_samples` samples of every voice into `output`.
    ///
    /// Parameter snapshots are applied first, then queued note events, so a
    /// note started here uses the latest parameters.
    ///
    /// # Panics
    ///
    /// If called before a successful `prepare`, or if `num_samples` exceeds
    /// the buffer length.
    pub fn render_block(&mut self, output: &mut AudioBuffer, num_samples: usize) {
        assert!(self.sample_rate.is_some(), "render_block called before prepare");
        assert!(num_samples <= output.len(), "block larger than output buffer");

        self.pump_params();
        self.pump_events();
        self.pool.render_block(output, num_samples);
    }

    pub fn pool(&self) -> &VoicePool<ModalVoice> {
        &self.pool
    }

    pub fn voice(&self, index: usize) -> Option<&ModalVoice> {
        self.pool.voice(index)
    }

    pub fn dropped_notes(&self) -> u64 {
        self.pool.dropped_notes()
    }

    fn pump_params(&mut self) {
        for index in 0..self.pool.len() {
            let snapshot = self.params.snapshot(index);
            self.pool.apply_params(index, snapshot);
        }
    }

    fn pump_events(&mut self) {
        while let Ok(event) = self.events.pop() {
            match event {
                NoteEvent::On { note, velocity } => {
                    self.pool.note_on(note, velocity);
                }
                NoteEvent::Off { note } => self.pool.note_off(note),
                NoteEvent::AllOff => self.pool.all_notes_off(),
            }
        }
    }
}

impl EngineHandle {
    /// Queue a note-on. Velocity is clamped to [0, 1].
    pub fn start_note(&mut self, note: u8, velocity: f32) -> Result<(), EngineError> {
        if note > 127 {
            return Err(EngineError::NoteOutOfRange(note));
        }
        let velocity = if velocity.is_nan() { 0.0 } else { velocity.clamp(0.0, 1.0) };
        self.send(NoteEvent::On { note, velocity })
    }

    pub fn stop_note(&mut self, note: u8) -> Result<(), EngineError> {
        if note > 127 {
            return Err(EngineError::NoteOutOfRange(note));
        }
        self.send(NoteEvent::Off { note })
    }

    pub fn all_notes_off(&mut self) -> Result<(), EngineError> {
        self.send(NoteEvent::AllOff)
    }

    /// Clamp `value` into the parameter's range and publish it. The render
    /// thread picks it up at the next block boundary.
    pub fn set_parameter(
        &self,
        param: Parameter,
        value: f64,
        target: ParamTarget,
    ) -> Result<(), EngineError> {
        if !value.is_finite() {
            return Err(EngineError::NonFiniteParameter(param));
        }
        if let ParamTarget::Voice(index) = target {
            if index >= self.params.num_voices() {
                return Err(EngineError::NoSuchVoice(index));
            }
        }
        self.params.store(param, param.clamp(value), target);
        Ok(())
    }

    pub fn num_voices(&self) -> usize {
        self.params.num_voices()
    }

    // Drop-newest: a full queue rejects the incoming event.
    fn send(&mut self, event: NoteEvent) -> Result<(), EngineError> {
        match self.events.push(event) {
            Ok(()) => Ok(()),
            Err(_) => Err(EngineError::EventQueueFull(event)),
        }
    }
}
