use crate::config::ControllerMap;
use crate::engine::EngineHandle;
use crate::midi;
use crate::params::ParamTarget;
use crate::util::*;

/// Turns raw MIDI events into engine calls: keys on the keyboard channel,
/// mapped CCs on the controller channel.
pub struct MidiController {
    pressed: [bool; 128],
    engine: EngineHandle,
    controllers: ControllerMap,
    keyboard_channel: u8,
    controller_channel: u8,
}

impl MidiController {
    pub fn new(
        engine: EngineHandle,
        controllers: ControllerMap,
        keyboard_channel: u8,
        controller_channel: u8,
    ) -> Self {
        Self {
            pressed: [false; 128],
            engine,
            controllers,
            keyboard_channel,
            controller_channel,
        }
    }

    fn key_on(&mut self, key: u8, vel: u8) {
        if self.pressed[key as usize] {
            let r = self.engine.stop_note(key);
            log_if_error("retrigger note-off failed", r);
        }

        let r = self.engine.start_note(key, vel as f32 / 127.0);
        log_if_error("note-on failed", r);
        self.pressed[key as usize] = true;
    }

    fn key_off(&mut self, key: u8) {
        if self.pressed[key as usize] {
            let r = self.engine.stop_note(key);
            log_if_error("note-off failed", r);
        }
        self.pressed[key as usize] = false;
    }

    fn controller(&mut self, controller: u8, value: u8) {
        if let Some(param) = self.controllers.parameter_for(controller) {
            let value = param.from_normalized(value as f64 / 127.0);
            tracing::debug!("{} -> {:.3}", param, value);
            let r = self.engine.set_parameter(param, value, ParamTarget::All);
            log_if_error("parameter change failed", r);
        }
    }

    pub fn handle_midi_event(&mut self, event: midi::Event) {
        match event.content {
            midi::EventContent::NoteOn { key, vel } => {
                if event.channel == self.keyboard_channel && key < 128 {
                    self.key_on(key, vel);
                }
            }

            midi::EventContent::NoteOff { key, .. } => {
                if event.channel == self.keyboard_channel && key < 128 {
                    self.key_off(key);
                }
            }

            midi::EventContent::Controller { controller, value } => {
                if event.channel == self.controller_channel {
                    self.controller(controller, value);
                }
            }
        }
    }
}
