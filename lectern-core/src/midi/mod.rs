//! MIDI input: event parsing and the hardware connection.
//!
//! The controller only drives step selection, so parsing covers the
//! channel voice messages Lectern routes — notes and control changes;
//! everything else is dropped at the parser.

mod output;
mod ports;

pub use output::MidiOutputManager;
pub use ports::{find_input_port, find_output_port, matches_hint, normalize_port_name};

use midir::{MidiInput, MidiInputConnection};
use std::sync::mpsc::{self, Receiver};

/// MIDI event with the driver timestamp (microseconds, driver epoch).
#[derive(Debug, Clone, Copy)]
pub struct MidiEvent {
    pub timestamp_us: u64,
    pub kind: MidiEventKind,
}

#[derive(Debug, Clone, Copy)]
pub enum MidiEventKind {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
}

impl MidiEvent {
    pub fn new(timestamp_us: u64, kind: MidiEventKind) -> Self {
        Self { timestamp_us, kind }
    }
}

/// MIDI input connection, resolved once at startup from a name hint.
///
/// Events arrive on the driver callback thread and are forwarded into a
/// channel; the event loop drains them with [`poll_events`]. An unbound
/// input is not an error — the viewer simply never receives
/// controller-driven step selection.
///
/// [`poll_events`]: MidiInputManager::poll_events
pub struct MidiInputManager {
    connection: Option<MidiInputConnection<()>>,
    event_receiver: Option<Receiver<MidiEvent>>,
    connected_port_name: Option<String>,
}

impl MidiInputManager {
    pub fn new() -> Self {
        Self {
            connection: None,
            event_receiver: None,
            connected_port_name: None,
        }
    }

    /// Connect to the first input port matching the name hint. An empty
    /// hint or no matching port leaves the manager unbound.
    pub fn connect_by_hint(&mut self, hint: &str) -> Result<(), String> {
        self.disconnect();
        if hint.is_empty() {
            return Ok(());
        }

        let midi_in = MidiInput::new("lectern").map_err(|e| e.to_string())?;
        let port = match find_input_port(&midi_in, hint) {
            Some(p) => p,
            None => {
                log::warn!(target: "midi", "no MIDI input port matches hint '{}'", hint);
                return Ok(());
            }
        };
        let port_name = midi_in
            .port_name(&port)
            .unwrap_or_else(|_| "Unknown".to_string());

        let (tx, rx) = mpsc::channel();
        let connection = midi_in
            .connect(
                &port,
                "lectern-input",
                move |timestamp, message, _| {
                    if let Some(kind) = parse_midi_message(message) {
                        let _ = tx.send(MidiEvent::new(timestamp, kind));
                    }
                },
                (),
            )
            .map_err(|e| e.to_string())?;

        log::info!(target: "midi", "MIDI input connected to '{}'", port_name);
        self.connection = Some(connection);
        self.event_receiver = Some(rx);
        self.connected_port_name = Some(port_name);
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn connected_port_name(&self) -> Option<&str> {
        self.connected_port_name.as_deref()
    }

    pub fn disconnect(&mut self) {
        if let Some(conn) = self.connection.take() {
            conn.close();
        }
        self.event_receiver = None;
        self.connected_port_name = None;
    }

    /// Drain pending MIDI events (non-blocking).
    pub fn poll_events(&self) -> Vec<MidiEvent> {
        let mut events = Vec::new();
        if let Some(ref rx) = self.event_receiver {
            while let Ok(event) = rx.try_recv() {
                events.push(event);
            }
        }
        events
    }
}

impl Default for MidiInputManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MidiInputManager {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Parse a raw MIDI message into a MidiEventKind.
pub fn parse_midi_message(data: &[u8]) -> Option<MidiEventKind> {
    if data.is_empty() {
        return None;
    }

    let status = data[0];
    let channel = status & 0x0F;
    let message_type = status & 0xF0;

    match message_type {
        0x80 => {
            if data.len() >= 3 {
                Some(MidiEventKind::NoteOff {
                    channel,
                    note: data[1],
                })
            } else {
                None
            }
        }
        0x90 => {
            // Note On with velocity 0 is a Note Off
            if data.len() >= 3 {
                let velocity = data[2];
                if velocity == 0 {
                    Some(MidiEventKind::NoteOff {
                        channel,
                        note: data[1],
                    })
                } else {
                    Some(MidiEventKind::NoteOn {
                        channel,
                        note: data[1],
                        velocity,
                    })
                }
            } else {
                None
            }
        }
        0xB0 => {
            if data.len() >= 3 {
                Some(MidiEventKind::ControlChange {
                    channel,
                    controller: data[1],
                    value: data[2],
                })
            } else {
                None
            }
        }
        _ => None,
    }
}
