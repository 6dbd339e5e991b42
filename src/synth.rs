use crate::buffer::AudioBuffer;
use crate::params::VoiceParams;

/// The kinds of sound a voice can declare support for. There is only one.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SoundKind {
    PluckedString,
}

pub trait Voice: Send {
    fn can_play(&self, sound: SoundKind) -> bool;

    /// Set the sample rate and reset oscillator phases.
    fn prepare(&mut self, sample_rate: f64);

    /// Start `note` if it is a valid MIDI note and the voice is idle.
    /// Returns whether the note was started.
    fn start_note(&mut self, note: u8, velocity: f32) -> bool;

    fn stop_note(&mut self, velocity: f32, allow_tail_off: bool);

    fn current_note(&self) -> Option<u8>;

    fn is_playing(&self) -> bool {
        self.current_note().is_some()
    }

    /// Take a block-boundary parameter snapshot.
    fn apply_params(&mut self, params: VoiceParams);

    /// Add `num_samples` samples into every channel of `output`, starting at
    /// `start_sample`.
    fn render_next_block(&mut self, output: &mut AudioBuffer, start_sample: usize, num_samples: usize);
}
