use anyhow::Result;
use tracing::error;

use cpal::traits::*;

use crate::buffer::AudioBuffer;
use crate::engine::Engine;

/// Frames rendered per engine block; larger device buffers are split.
pub const MAX_BLOCK_FRAMES: usize = 1024;

/// Start an output stream pulling blocks from `engine`, which must already be
/// prepared at the stream's sample rate.
pub fn run<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut engine: Engine,
) -> Result<cpal::Stream>
where
    T: cpal::Sample,
{
    let channels = config.channels as usize;
    let mut buffer = AudioBuffer::new(channels, MAX_BLOCK_FRAMES);
    let err_fn = |err| error!("an error occurred on stream: {}", err);

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            for chunk in data.chunks_mut(MAX_BLOCK_FRAMES * channels) {
                let frames = chunk.len() / channels;
                buffer.clear();
                engine.render_block(&mut buffer, frames);

                for (i, frame) in chunk.chunks_mut(channels).enumerate() {
                    for (ch, sample) in frame.iter_mut().enumerate() {
                        *sample = cpal::Sample::from(&buffer.channel(ch)[i]);
                    }
                }
            }
        },
        err_fn,
    )?;
    stream.play()?;

    Ok(stream)
}
