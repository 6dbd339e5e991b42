use anyhow::{anyhow, Context, Result};
use std::sync::mpsc;

use midir::{MidiInput, MidiInputConnection};
use midly::live::LiveEvent;
use midly::MidiMessage;
use tracing::{debug, warn};

#[derive(Copy, Clone, Debug)]
pub enum EventContent {
    NoteOff { key: u8, vel: u8 },
    NoteOn { key: u8, vel: u8 },
    Controller { controller: u8, value: u8 },
}

#[derive(Copy, Clone, Debug)]
pub struct Event {
    pub timestamp: u64,
    pub channel: u8,
    pub content: EventContent,
}

pub fn list_devices() -> Result<Vec<String>> {
    let midi_in = MidiInput::new("modal-string port scan").context("could not open MIDI input")?;
    let names = midi_in
        .ports()
        .iter()
        .filter_map(|p| midi_in.port_name(p).ok())
        .collect();
    Ok(names)
}

pub struct Connection(MidiInputConnection<mpsc::SyncSender<Event>>);

fn parse(timestamp: u64, bytes: &[u8]) -> Option<Event> {
    let (channel, message) = match LiveEvent::parse(bytes) {
        Ok(LiveEvent::Midi { channel, message }) => (channel, message),
        Ok(_) => return None,
        Err(err) => {
            debug!("midly failed to parse {:?}: {:?}", bytes, err);
            return None;
        }
    };

    let content = match message {
        // Many keyboards send note-off as a zero-velocity note-on.
        MidiMessage::NoteOn { key, vel } if vel.as_int() == 0 => EventContent::NoteOff {
            key: key.into(),
            vel: 0,
        },
        MidiMessage::NoteOn { key, vel } => EventContent::NoteOn {
            key: key.into(),
            vel: vel.into(),
        },
        MidiMessage::NoteOff { key, vel } => EventContent::NoteOff {
            key: key.into(),
            vel: vel.into(),
        },
        MidiMessage::Controller { controller, value } => EventContent::Controller {
            controller: controller.into(),
            value: value.into(),
        },
        _ => return None,
    };

    Some(Event {
        timestamp,
        channel: channel.into(),
        content,
    })
}

pub fn connect_to_ports(
    midi_ports: Vec<String>,
) -> Result<(mpsc::Receiver<Event>, Vec<Connection>)> {
    let (sender, receiver) = mpsc::sync_channel(1024);

    let connections: Result<Vec<Connection>> = midi_ports
        .into_iter()
        .map(|port_name| -> Result<Connection> {
            let midi_in = MidiInput::new(&format!("modal-string to {}", port_name))
                .context("could not open MIDI input")?;

            let selected_port = midi_in
                .ports()
                .into_iter()
                .find(|p| midi_in.port_name(p).map_or(false, |n| n == port_name))
                .ok_or_else(|| anyhow!("could not find MIDI port {}", port_name))?;

            let conn = midi_in
                .connect(
                    &selected_port,
                    &format!("modal-string conn to {}", port_name),
                    |timestamp, bytes, sender| {
                        if let Some(event) = parse(timestamp, bytes) {
                            if let Err(err) = sender.send(event) {
                                warn!("failed to forward MIDI event: {}", err);
                            }
                        }
                    },
                    sender.clone(),
                )
                .map_err(|err| anyhow!("could not connect to MIDI port {}: {}", port_name, err))?;

            Ok(Connection(conn))
        })
        .collect();

    connections.map(|conn| (receiver, conn))
}
