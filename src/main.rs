use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use cpal::traits::*;
use cpal::SampleFormat;
use structopt::StructOpt;
use tracing::{info, Level};

use modal_string::midi_controller::MidiController;
use modal_string::{audio, midi, AudioBuffer, Engine, ParamTarget, Parameter, SynthConfig};


#[derive(StructOpt)]
struct PlayOpt {
    #[structopt(short = "k", long = "keyboard", default_value = "0")]
    /// The MIDI channel the synthesizer listens on for keyboard events.
    midi_keyboard_channel: u8,

    #[structopt(short = "c", long = "controller", default_value = "0")]
    /// The MIDI channel the synthesizer listens on for controller events.
    midi_controller_channel: u8,

    #[structopt(long = "config", parse(from_os_str))]
    /// TOML file with voice, damping and controller settings.
    config: Option<PathBuf>,

    input_midi_ports: Vec<String>,
}

#[derive(StructOpt)]
struct RenderOpt {
    #[structopt(short = "n", long = "note", default_value = "69")]
    /// MIDI note number to pluck.
    note: u8,

    #[structopt(long = "velocity", default_value = "1.0")]
    /// Note velocity in [0, 1]; only audible with velocity_sensitive = true.
    velocity: f32,

    #[structopt(short = "d", long = "duration", default_value = "1.0")]
    /// Length of the render in seconds.
    seconds: f64,

    #[structopt(short = "r", long = "sample-rate", default_value = "44100")]
    sample_rate: u32,

    #[structopt(long = "set", number_of_values = 1)]
    /// Parameter override as name=value, e.g. --set stiffness=0.3. May repeat.
    overrides: Vec<String>,

    #[structopt(long = "config", parse(from_os_str))]
    config: Option<PathBuf>,

    #[structopt(short = "o", long = "output", parse(from_os_str))]
    output: PathBuf,
}

#[derive(StructOpt)]
#[structopt(about = "A modal plucked-string synthesizer.")]
struct Opt {
    #[structopt(short = "v", long = "verbose", global = true, parse(from_occurrences))]
    /// More log output (-v debug, -vv trace).
    verbose: u8,

    #[structopt(subcommand)]
    cmd: SynthOpt,
}

#[derive(StructOpt)]
enum SynthOpt {
    /// List all available MIDI ports.
    ListMIDI,

    /// Play the synthesizer from MIDI input.
    Play(PlayOpt),

    /// Render a single note to a WAV file.
    Render(RenderOpt),
}


fn load_config(path: &Option<PathBuf>) -> Result<SynthConfig> {
    match path {
        Some(path) => SynthConfig::from_toml(path),
        None => Ok(SynthConfig::default()),
    }
}

fn parse_override(s: &str) -> Result<(Parameter, f64)> {
    let mut parts = s.splitn(2, '=');
    let name = parts.next().unwrap_or_default();
    let value = parts
        .next()
        .ok_or_else(|| anyhow!("expected name=value, got '{}'", s))?;

    let param: Parameter = name.trim().parse().map_err(|e: String| anyhow!(e))?;
    let value: f64 = value
        .trim()
        .parse()
        .with_context(|| format!("invalid value for {}", param))?;
    Ok((param, value))
}


fn play(opt: PlayOpt) -> Result<()> {
    let synth_config = load_config(&opt.config)?;
    let host = cpal::default_host();

    let device = host
        .default_output_device()
        .ok_or_else(|| anyhow!("no output device available"))?;

    let supported_config = device
        .supported_output_configs()
        .context("error while querying configs")?
        .next()
        .ok_or_else(|| anyhow!("no supported config"))?
        .with_max_sample_rate();

    let sample_format = supported_config.sample_format();
    let config: cpal::StreamConfig = supported_config.into();

    let (mut engine, handle) = Engine::new(&synth_config)?;
    engine.prepare(config.sample_rate.0 as f64)?;
    info!(
        "{} voice(s), {} modes, {} Hz, {} channel(s)",
        synth_config.voices, synth_config.modes, config.sample_rate.0, config.channels
    );

    let (midi_event_queue, _midi_connections) = midi::connect_to_ports(opt.input_midi_ports)?;
    let mut midi_ctrlr = MidiController::new(
        handle,
        synth_config.controllers,
        opt.midi_keyboard_channel,
        opt.midi_controller_channel,
    );

    let _stream = match sample_format {
        SampleFormat::F32 => audio::run::<f32>(&device, &config, engine),
        SampleFormat::I16 => audio::run::<i16>(&device, &config, engine),
        SampleFormat::U16 => audio::run::<u16>(&device, &config, engine),
    }?;

    // Runs until every MIDI connection is gone.
    while let Ok(event) = midi_event_queue.recv() {
        midi_ctrlr.handle_midi_event(event);
    }

    Ok(())
}


fn render(opt: RenderOpt) -> Result<()> {
    let synth_config = load_config(&opt.config)?;
    let (mut engine, mut handle) = Engine::new(&synth_config)?;
    engine.prepare(opt.sample_rate as f64)?;

    for s in &opt.overrides {
        let (param, value) = parse_override(s)?;
        handle.set_parameter(param, value, ParamTarget::All)?;
    }
    handle.start_note(opt.note, opt.velocity)?;

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: opt.sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&opt.output, spec)
        .with_context(|| format!("could not create {}", opt.output.display()))?;

    let total = (opt.seconds.max(0.0) * opt.sample_rate as f64).round() as usize;
    let mut buffer = AudioBuffer::new(1, audio::MAX_BLOCK_FRAMES);
    let mut done = 0;
    while done < total {
        let frames = (total - done).min(buffer.len());
        buffer.clear();
        engine.render_block(&mut buffer, frames);
        for &sample in &buffer.channel(0)[..frames] {
            writer.write_sample(sample)?;
        }
        done += frames;
    }
    writer.finalize()?;

    info!("wrote {} samples to {}", total, opt.output.display());
    Ok(())
}


fn main() -> Result<()> {
    let opt = Opt::from_args();

    let level = match opt.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    match opt.cmd {
        SynthOpt::ListMIDI => {
            println!("Available devices:");
            for device_name in midi::list_devices()? {
                println!("{}", device_name);
            }
        }

        SynthOpt::Play(playopt) => {
            return play(playopt);
        }

        SynthOpt::Render(renderopt) => {
            return render(renderopt);
        }
    }

    Ok(())
}
