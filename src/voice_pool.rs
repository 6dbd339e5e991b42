use serde::Deserialize;
use slotmap::{new_key_type, DenseSlotMap};

use crate::buffer::AudioBuffer;
use crate::params::VoiceParams;
use crate::synth::{SoundKind, Voice};

new_key_type! {
    pub struct VoiceKey;
}

/// What happens to a note-on when every voice is busy.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StealPolicy {
    /// Ignore the new note.
    Drop,
    /// Stop the voice that has been sounding longest and reuse it.
    Oldest,
}

impl Default for StealPolicy {
    fn default() -> Self {
        StealPolicy::Drop
    }
}

#[derive(Debug)]
struct Slot<V> {
    voice: V,
    started: u64,
}

/// A fixed set of voices, created up front and recycled across notes.
///
/// Voices live in a slot arena that is filled once in `new` and never
/// grows; `keys` gives them a stable index order used for targeting and
/// for deterministic iteration.
pub struct VoicePool<V: Voice> {
    slots: DenseSlotMap<VoiceKey, Slot<V>>,
    keys: Vec<VoiceKey>,
    sound: SoundKind,
    steal: StealPolicy,
    start_ctr: u64,
    dropped_notes: u64,
}

impl<V: Voice> VoicePool<V> {
    pub fn new(voices: Vec<V>, sound: SoundKind, steal: StealPolicy) -> Self {
        let mut slots = DenseSlotMap::with_capacity_and_key(voices.len());
        let keys = voices
            .into_iter()
            .map(|voice| slots.insert(Slot { voice, started: 0 }))
            .collect();

        Self {
            slots,
            keys,
            sound,
            steal,
            start_ctr: 0,
            dropped_notes: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn key(&self, index: usize) -> Option<VoiceKey> {
        self.keys.get(index).copied()
    }

    pub fn voice(&self, index: usize) -> Option<&V> {
        let key = self.key(index)?;
        self.slots.get(key).map(|s| &s.voice)
    }

    pub fn voice_by_key(&self, key: VoiceKey) -> Option<&V> {
        self.slots.get(key).map(|s| &s.voice)
    }

    pub fn voice_mut(&mut self, index: usize) -> Option<&mut V> {
        let key = self.key(index)?;
        self.slots.get_mut(key).map(|s| &mut s.voice)
    }

    pub fn active_voices(&self) -> usize {
        self.slots.values().filter(|s| s.voice.is_playing()).count()
    }

    pub fn dropped_notes(&self) -> u64 {
        self.dropped_notes
    }

    pub fn prepare(&mut self, sample_rate: f64) {
        for slot in self.slots.values_mut() {
            slot.voice.prepare(sample_rate);
        }
    }

    pub fn apply_params(&mut self, index: usize, params: VoiceParams) {
        if let Some(voice) = self.voice_mut(index) {
            voice.apply_params(params);
        }
    }

    /// Start `note` on the lowest-index idle voice. Returns the voice that
    /// took it, or `None` if the note was dropped.
    pub fn note_on(&mut self, note: u8, velocity: f32) -> Option<VoiceKey> {
        if note > 127 {
            return None;
        }

        let key = match self.free_voice().or_else(|| self.steal_voice()) {
            Some(key) => key,
            None => {
                self.dropped_notes += 1;
                return None;
            }
        };

        let started = self.start_ctr;
        let slot = &mut self.slots[key];
        if !slot.voice.start_note(note, velocity) {
            self.dropped_notes += 1;
            return None;
        }
        slot.started = started;
        self.start_ctr = self.start_ctr.wrapping_add(1);
        Some(key)
    }

    /// Stop every voice sounding `note`.
    pub fn note_off(&mut self, note: u8) {
        for slot in self.slots.values_mut() {
            if slot.voice.current_note() == Some(note) {
                slot.voice.stop_note(0.0, true);
            }
        }
    }

    pub fn all_notes_off(&mut self) {
        for slot in self.slots.values_mut() {
            slot.voice.stop_note(0.0, false);
        }
    }

    /// Let every voice add `num_samples` samples into `output`, in index order.
    pub fn render_block(&mut self, output: &mut AudioBuffer, num_samples: usize) {
        for &key in self.keys.iter() {
            self.slots[key].voice.render_next_block(output, 0, num_samples);
        }
    }

    fn free_voice(&self) -> Option<VoiceKey> {
        let sound = self.sound;
        self.keys.iter().copied().find(|&k| {
            let voice = &self.slots[k].voice;
            voice.can_play(sound) && !voice.is_playing()
        })
    }

    fn steal_voice(&mut self) -> Option<VoiceKey> {
        if self.steal != StealPolicy::Oldest {
            return None;
        }

        let sound = self.sound;
        let oldest = self
            .keys
            .iter()
            .copied()
            .filter(|&k| self.slots[k].voice.can_play(sound))
            .min_by_key(|&k| self.slots[k].started)?;

        self.slots[oldest].voice.stop_note(0.0, false);
        Some(oldest)
    }
}
