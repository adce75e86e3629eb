//! MIDI output: CC notifications and note bursts with bounded duration.

use std::time::{Duration, Instant};

use midir::{MidiOutput, MidiOutputConnection};

use super::ports::find_output_port;

const CC_STATUS: u8 = 0xB0;
const NOTE_ON_STATUS: u8 = 0x90;
const NOTE_OFF_STATUS: u8 = 0x80;
const CC_ALL_NOTES_OFF: u8 = 123;

/// Notes sounding now, with the deadline for their note-offs.
struct PendingOff {
    notes: Vec<u8>,
    due: Instant,
}

/// MIDI output connection and note scheduling.
///
/// Every emission is a logged no-op when no matching port was found — the
/// visual subsystem keeps functioning independent of MIDI availability.
///
/// Note bursts are a timed pair: note-ons immediately, note-offs when the
/// event loop's [`tick`] passes the configured duration — or earlier, as
/// an all-notes-off, if the viewer deactivates mid-note. This bounds the
/// worst-case stuck-note duration even under rapid step switching.
///
/// [`tick`]: MidiOutputManager::tick
pub struct MidiOutputManager {
    connection: Option<MidiOutputConnection>,
    connected_port_name: Option<String>,
    channel: u8,
    velocity: u8,
    note_duration: Duration,
    pending_off: Option<PendingOff>,
}

impl MidiOutputManager {
    pub fn new(channel: u8, velocity: u8, note_duration: Duration) -> Self {
        Self {
            connection: None,
            connected_port_name: None,
            channel: channel & 0x0F,
            velocity: velocity & 0x7F,
            note_duration,
            pending_off: None,
        }
    }

    /// Connect to the first output port matching the name hint. An empty
    /// hint or no matching port leaves the manager unbound.
    pub fn connect_by_hint(&mut self, hint: &str) -> Result<(), String> {
        if hint.is_empty() {
            return Ok(());
        }

        let midi_out = MidiOutput::new("lectern").map_err(|e| e.to_string())?;
        let port = match find_output_port(&midi_out, hint) {
            Some(p) => p,
            None => {
                log::warn!(target: "midi", "no MIDI output port matches hint '{}'", hint);
                return Ok(());
            }
        };
        let port_name = midi_out
            .port_name(&port)
            .unwrap_or_else(|_| "Unknown".to_string());
        let connection = midi_out
            .connect(&port, "lectern-output")
            .map_err(|e| e.to_string())?;

        log::info!(target: "midi", "MIDI output connected to '{}'", port_name);
        self.connection = Some(connection);
        self.connected_port_name = Some(port_name);
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn connected_port_name(&self) -> Option<&str> {
        self.connected_port_name.as_deref()
    }

    /// Emit a Control Change. Controller and value are clamped to 7 bits.
    pub fn send_cc(&mut self, controller: u8, value: u8) {
        let msg = [CC_STATUS | self.channel, controller & 0x7F, value & 0x7F];
        self.send(&msg);
    }

    /// Sound a step's pitches: silence whatever is pending, then note-ons
    /// now and note-offs scheduled after the configured duration. An empty
    /// pitch set only silences.
    pub fn play_step(&mut self, pitches: &[u8], now: Instant) {
        self.flush_pending_offs();
        if pitches.is_empty() {
            self.send_all_notes_off();
            return;
        }
        for &note in pitches {
            let msg = [NOTE_ON_STATUS | self.channel, note & 0x7F, self.velocity];
            self.send(&msg);
        }
        self.pending_off = Some(PendingOff {
            notes: pitches.to_vec(),
            due: now + self.note_duration,
        });
    }

    /// Release notes whose duration has elapsed. Called from the event
    /// loop; cheap when nothing is pending.
    pub fn tick(&mut self, now: Instant) {
        let due = match &self.pending_off {
            Some(p) if now >= p.due => true,
            _ => false,
        };
        if due {
            self.flush_pending_offs();
        }
    }

    /// Immediate cleanup: pending note-offs plus CC 123.
    pub fn all_notes_off(&mut self) {
        self.flush_pending_offs();
        self.send_all_notes_off();
    }

    /// Whether a note burst is still sounding (awaiting its note-offs).
    pub fn has_pending_notes(&self) -> bool {
        self.pending_off.is_some()
    }

    fn flush_pending_offs(&mut self) {
        if let Some(pending) = self.pending_off.take() {
            for note in pending.notes {
                let msg = [NOTE_OFF_STATUS | self.channel, note & 0x7F, 0];
                self.send(&msg);
            }
        }
    }

    fn send_all_notes_off(&mut self) {
        let msg = [CC_STATUS | self.channel, CC_ALL_NOTES_OFF, 0];
        self.send(&msg);
    }

    fn send(&mut self, msg: &[u8]) {
        match self.connection.as_mut() {
            Some(conn) => {
                if let Err(e) = conn.send(msg) {
                    log::warn!(target: "midi", "MIDI send failed: {}", e);
                }
            }
            None => {
                log::debug!(target: "midi", "no MIDI output bound, dropping {:02x?}", msg);
            }
        }
    }
}
