#![allow(dead_code)]
//! Test harness utilities for lectern-bridge integration tests.

use std::io::{self, BufReader, BufWriter, Write};
use std::net::TcpStream;
use std::time::{Duration, Instant};

use lectern_bridge::codec::{decode, read_frame, write_frame};
use lectern_bridge::deck::DeckLayout;
use lectern_bridge::protocol::{FrameId, HostMessage, ViewerMessage};
use lectern_bridge::server::DeckServer;
use lectern_core::transport::{Effect, OutputCcs, Transport, TransportCommand};

/// Deck layout double that records resize calls.
#[derive(Default)]
pub struct RecordingLayout {
    pub heights: Vec<(FrameId, f64)>,
    pub refreshes: usize,
}

impl DeckLayout for RecordingLayout {
    fn set_frame_height(&mut self, frame: FrameId, height: f64) {
        self.heights.push((frame, height));
    }

    fn refresh(&mut self) {
        self.refreshes += 1;
    }
}

/// Drive the server (accept + poll) until the expected registered frame
/// count is reached, or timeout.
pub fn drive_until_frames(
    server: &mut DeckServer,
    layout: &mut RecordingLayout,
    expected: usize,
    timeout: Duration,
) {
    let start = Instant::now();
    while Instant::now().duration_since(start) < timeout {
        server.accept_connections();
        server.poll(layout);
        if server.frame_count() >= expected {
            return;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    panic!(
        "Timed out waiting for {} frames (have {})",
        expected,
        server.frame_count()
    );
}

/// Drive the server for a fixed duration so in-flight viewer messages get
/// processed.
pub fn drive(server: &mut DeckServer, layout: &mut RecordingLayout, duration: Duration) {
    let start = Instant::now();
    while Instant::now().duration_since(start) < duration {
        server.accept_connections();
        server.poll(layout);
        std::thread::sleep(Duration::from_millis(5));
    }
}

/// A raw TCP viewer for protocol-level tests.
///
/// Because the tests are single-threaded, handshakes are split: send the
/// hello, drive the server so it registers and replies, then `recv()`.
pub struct RawViewer {
    pub reader: BufReader<TcpStream>,
    pub writer: BufWriter<TcpStream>,
}

impl RawViewer {
    pub fn connect(addr: &str) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_read_timeout(Some(Duration::from_secs(5)))?;
        let read_stream = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    pub fn send(&mut self, msg: &ViewerMessage) -> io::Result<()> {
        write_frame(&mut self.writer, msg)
    }

    pub fn send_hello(&mut self, slide_index: i32) -> io::Result<()> {
        self.send(&ViewerMessage::Hello { slide_index })
    }

    /// Send a raw payload inside a valid frame (for malformed-message
    /// tests).
    pub fn send_raw(&mut self, payload: &str) -> io::Result<()> {
        let len = payload.len() as u32;
        self.writer.write_all(&len.to_be_bytes())?;
        self.writer.write_all(payload.as_bytes())?;
        self.writer.flush()
    }

    pub fn recv(&mut self) -> io::Result<HostMessage> {
        let text = read_frame(&mut self.reader)?;
        decode(&text)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "undecodable host message"))
    }
}

/// A viewer with a real transport state machine behind the socket — for
/// end-to-end activation tests.
pub struct SimViewer {
    pub raw: RawViewer,
    pub transport: Transport,
    pub effects: Vec<Effect>,
}

impl SimViewer {
    pub fn connect(addr: &str, slide_index: i32, steps: Vec<lectern_types::Step>) -> io::Result<Self> {
        let mut raw = RawViewer::connect(addr)?;
        raw.send_hello(slide_index)?;
        let mut transport = Transport::new(
            false,
            OutputCcs {
                step_count: 23,
                slide_index: 24,
            },
        );
        transport.set_steps(steps);
        Ok(Self {
            raw,
            transport,
            effects: Vec::new(),
        })
    }

    /// Receive exactly `count` host messages and run them through the
    /// transport, accumulating effects.
    pub fn pump(&mut self, count: usize) -> io::Result<()> {
        for _ in 0..count {
            let msg = self.raw.recv()?;
            let cmd = host_to_command(msg);
            self.effects.extend(self.transport.handle(cmd));
        }
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.transport.state().is_active
    }

    pub fn emitted_note_on(&self) -> bool {
        self.effects
            .iter()
            .any(|e| matches!(e, Effect::PlayStep { pitches } if !pitches.is_empty()))
    }

    pub fn clear_effects(&mut self) {
        self.effects.clear();
    }
}

/// The viewer runtime's mapping from wire messages to transport commands.
pub fn host_to_command(msg: HostMessage) -> TransportCommand {
    match msg {
        HostMessage::Activate { slide_index } => TransportCommand::Activate { slide_index },
        HostMessage::Deactivate => TransportCommand::Deactivate,
        HostMessage::RequestStepCount => TransportCommand::ResendStepCount,
        HostMessage::SlideVisible { slide_index } => TransportCommand::SlideVisible { slide_index },
    }
}

/// Three steps with fixed pitch sets for scenario tests.
pub fn three_chord_steps() -> Vec<lectern_types::Step> {
    let chords: [&[u8]; 3] = [&[60, 64, 67], &[62, 65, 69], &[60, 64, 67]];
    chords
        .iter()
        .enumerate()
        .map(|(i, pitches)| {
            let mut step = lectern_types::Step::new(vec![
                lectern_types::ElementId::new(format!("n{}a", i)),
                lectern_types::ElementId::new(format!("n{}b", i)),
                lectern_types::ElementId::new(format!("n{}c", i)),
            ]);
            step.pitches = pitches.to_vec();
            step
        })
        .collect()
}
