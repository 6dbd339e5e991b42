/// Planar multi-channel sample buffer, allocated once up front.
///
/// Voices only ever add into it; clearing is the owner's job.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    channels: Vec<Vec<f32>>,
    len: usize,
}

impl AudioBuffer {
    pub fn new(num_channels: usize, len: usize) -> Self {
        Self {
            channels: vec![vec![0.0; len]; num_channels],
            len,
        }
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Number of frames per channel.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        for channel in self.channels.iter_mut() {
            for sample in channel.iter_mut() {
                *sample = 0.0;
            }
        }
    }

    #[inline]
    pub fn add_sample(&mut self, channel: usize, index: usize, value: f32) {
        self.channels[channel][index] += value;
    }

    /// Add `value` at `index` on every channel.
    #[inline]
    pub fn add_to_all(&mut self, index: usize, value: f32) {
        for channel in self.channels.iter_mut() {
            channel[index] += value;
        }
    }

    pub fn channel(&self, channel: usize) -> &[f32] {
        &self.channels[channel]
    }

    pub fn channel_mut(&mut self, channel: usize) -> &mut [f32] {
        &mut self.channels[channel]
    }
}
