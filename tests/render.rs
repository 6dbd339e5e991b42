//! End-to-end checks through the public engine API.

use modal_string::synth::Voice;
use modal_string::synthesizers::modal::physics;
use modal_string::{AudioBuffer, Engine, ParamTarget, Parameter, SynthConfig};

const SAMPLE_RATE: f64 = 44100.0;

fn render_seconds(engine: &mut Engine, buffer: &mut AudioBuffer, total: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(total);
    let mut done = 0;
    while done < total {
        let frames = (total - done).min(buffer.len());
        buffer.clear();
        engine.render_block(buffer, frames);
        out.extend_from_slice(&buffer.channel(0)[..frames]);
        done += frames;
    }
    out
}

#[test]
fn fundamental_decays_as_predicted_over_one_second() {
    let (mut engine, mut handle) = Engine::new(&SynthConfig::default()).unwrap();
    engine.prepare(SAMPLE_RATE).unwrap();
    handle.start_note(69, 1.0).unwrap();

    let mut buffer = AudioBuffer::new(2, 512);
    let out = render_seconds(&mut engine, &mut buffer, 44100);
    assert!(out.iter().all(|s| s.is_finite()));
    assert!(out.iter().any(|&s| s != 0.0));

    let modes = engine.voice(0).unwrap().modes();
    let initial = physics::pluck_amplitude(1, 0.2);
    let sigma = modes.sigma(0);
    let frequency = modes.frequency(0);
    let expected = initial * (-sigma / SAMPLE_RATE * frequency * SAMPLE_RATE).exp();

    let actual = modes.amplitude(0);
    assert!(
        ((actual - expected) / expected).abs() < 1e-9,
        "amplitude {} != {}",
        actual,
        expected
    );
    assert!((frequency - 440.0 * physics::damped_ratio(1.0, sigma)).abs() < 1e-9);
}

#[test]
fn two_voices_mix_additively() {
    let config = SynthConfig {
        voices: 2,
        ..SynthConfig::default()
    };

    let solo = |note: u8| {
        let (mut engine, mut handle) = Engine::new(&config).unwrap();
        engine.prepare(SAMPLE_RATE).unwrap();
        handle.start_note(note, 1.0).unwrap();
        render_seconds(&mut engine, &mut AudioBuffer::new(1, 256), 2048)
    };
    let a = solo(60);
    let b = solo(64);

    let (mut engine, mut handle) = Engine::new(&config).unwrap();
    engine.prepare(SAMPLE_RATE).unwrap();
    handle.start_note(64, 1.0).unwrap();
    handle.start_note(60, 1.0).unwrap();
    let both = render_seconds(&mut engine, &mut AudioBuffer::new(1, 256), 2048);

    for i in 0..both.len() {
        assert!((both[i] - (a[i] + b[i])).abs() < 1e-5, "sample {}", i);
    }
}

#[test]
fn live_pickup_sweep_keeps_modes_intact() {
    let (mut engine, mut handle) = Engine::new(&SynthConfig::default()).unwrap();
    engine.prepare(SAMPLE_RATE).unwrap();
    handle.set_parameter(Parameter::Stiffness, 0.05, ParamTarget::All).unwrap();
    handle.start_note(52, 1.0).unwrap();

    let mut buffer = AudioBuffer::new(1, 128);
    render_seconds(&mut engine, &mut buffer, 128);
    let freqs = engine.voice(0).unwrap().modes().frequencies().to_vec();

    for step in 0..20 {
        let pickup = 0.1 + step as f64 * 0.15;
        handle.set_parameter(Parameter::PickupPosition, pickup, ParamTarget::All).unwrap();
        // A stiffness change mid-note is held for the next note.
        handle.set_parameter(Parameter::Stiffness, 1.0, ParamTarget::All).unwrap();
        let out = render_seconds(&mut engine, &mut buffer, 128);
        assert!(out.iter().all(|s| s.is_finite()));

        let voice = engine.voice(0).unwrap();
        assert!((voice.modes().weight(0) - pickup.sin()).abs() < 1e-12);
        assert_eq!(voice.modes().frequencies(), &freqs[..]);
        assert!(voice.is_playing());
    }
}

#[test]
fn extreme_parameters_stay_finite() {
    let config = SynthConfig {
        modes: 256,
        decay: 0.5,
        decay_high_freq: 0.5,
        ..SynthConfig::default()
    };
    let (mut engine, mut handle) = Engine::new(&config).unwrap();
    engine.prepare(SAMPLE_RATE).unwrap();
    handle.set_parameter(Parameter::PluckPosition, 0.0, ParamTarget::All).unwrap();
    handle.set_parameter(Parameter::PickupPosition, 100.0, ParamTarget::All).unwrap();
    handle.set_parameter(Parameter::Stiffness, 0.0, ParamTarget::All).unwrap();
    handle.start_note(0, 1.0).unwrap();

    let out = render_seconds(&mut engine, &mut AudioBuffer::new(2, 256), 4096);
    assert!(out.iter().all(|s| s.is_finite()));

    let modes = engine.voice(0).unwrap().modes();
    assert!(modes.frequencies().iter().all(|f| f.is_finite() && *f >= 0.0));
    assert!(modes.amplitudes().iter().all(|a| a.is_finite()));
}
