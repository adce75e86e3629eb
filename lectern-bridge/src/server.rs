//! Host-side socket wiring for the deck bridge.
//!
//! Accepts viewer connections, completes the hello handshake, and carries
//! the [`DeckBridge`] fan-out. One reader thread per connection forwards
//! decoded messages into a channel; everything else runs on the host's
//! event loop thread, polled.

use std::collections::HashMap;
use std::io::{self, BufReader, BufWriter};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use log::{error, info, warn};

use crate::codec::{decode, read_frame, write_frame};
use crate::deck::{DeckBridge, DeckLayout};
use crate::protocol::{FrameId, HostMessage, ViewerMessage};

/// A connected viewer frame's write half.
struct FrameConnection {
    writer: BufWriter<TcpStream>,
}

impl FrameConnection {
    fn send(&mut self, msg: &HostMessage) -> io::Result<()> {
        write_frame(&mut self.writer, msg)
    }
}

enum FrameEvent {
    Message(ViewerMessage),
    Disconnected,
}

/// Deck-side server: socket plumbing around [`DeckBridge`].
pub struct DeckServer {
    listener: TcpListener,
    bridge: DeckBridge,
    /// Frames that completed the hello handshake.
    frames: HashMap<FrameId, FrameConnection>,
    /// Connections awaiting their hello.
    pending: HashMap<FrameId, FrameConnection>,
    event_rx: Receiver<(FrameId, FrameEvent)>,
    event_tx: Sender<(FrameId, FrameEvent)>,
    next_frame_id: u64,
}

impl DeckServer {
    pub fn bind(addr: &str, resize_padding: f64) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;

        let (event_tx, event_rx) = mpsc::channel();

        info!("DeckServer listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            bridge: DeckBridge::new(resize_padding),
            frames: HashMap::new(),
            pending: HashMap::new(),
            event_rx,
            event_tx,
            next_frame_id: 0,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Frames that have completed the hello handshake.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn current_slide(&self) -> i32 {
        self.bridge.current_slide()
    }

    /// Accept pending TCP connections; each becomes a registered frame
    /// once its hello arrives.
    pub fn accept_connections(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    let frame = FrameId::new(self.next_frame_id);
                    self.next_frame_id += 1;

                    let read_stream = match stream.try_clone() {
                        Ok(s) => s,
                        Err(e) => {
                            error!("Failed to clone stream: {}", e);
                            continue;
                        }
                    };

                    let event_tx = self.event_tx.clone();
                    thread::spawn(move || {
                        frame_reader_thread(frame, read_stream, event_tx);
                    });

                    self.pending.insert(
                        frame,
                        FrameConnection {
                            writer: BufWriter::new(stream),
                        },
                    );

                    info!("Viewer {:?} connected from {}, awaiting hello", frame, addr);
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    error!("Accept error: {}", e);
                    break;
                }
            }
        }
    }

    /// Drain viewer messages: register hellos, relay height reports into
    /// the deck layout, drop disconnected frames.
    pub fn poll(&mut self, layout: &mut impl DeckLayout) {
        while let Ok((frame, event)) = self.event_rx.try_recv() {
            match event {
                FrameEvent::Message(msg) => self.handle_message(frame, msg, layout),
                FrameEvent::Disconnected => {
                    info!("Viewer {:?} disconnected", frame);
                    self.pending.remove(&frame);
                    self.frames.remove(&frame);
                    self.bridge.unregister_frame(frame);
                }
            }
        }
    }

    /// Fan out activation for a navigation event. Runs on every event —
    /// initial ready, slide change, fragment shown/hidden.
    pub fn navigate(&mut self, slide: i32) {
        for (frame, msg) in self.bridge.navigate(slide) {
            self.send_to(frame, &msg);
        }
    }

    /// Ask the frames on the visible slide to re-send their step count.
    pub fn request_step_count(&mut self) {
        let targets: Vec<FrameId> = self
            .bridge
            .fan_out()
            .into_iter()
            .filter(|(_, msg)| matches!(msg, HostMessage::Activate { .. }))
            .map(|(frame, _)| frame)
            .collect();
        for frame in targets {
            self.send_to(frame, &HostMessage::RequestStepCount);
        }
    }

    fn handle_message(&mut self, frame: FrameId, msg: ViewerMessage, layout: &mut impl DeckLayout) {
        // Hello completes the handshake; everything else requires it.
        if let Some(conn) = self.pending.remove(&frame) {
            match msg {
                ViewerMessage::Hello { slide_index } => {
                    self.frames.insert(frame, conn);
                    let reply = self.bridge.register_frame(frame, slide_index);
                    self.send_to(frame, &reply);
                    info!("Viewer {:?} registered for slide {}", frame, slide_index);
                }
                other => {
                    warn!("Viewer {:?} sent {:?} before hello, ignoring", frame, other);
                    self.pending.insert(frame, conn);
                }
            }
            return;
        }

        if !self.frames.contains_key(&frame) {
            return;
        }
        if let Some(reply) = self.bridge.on_viewer_message(frame, msg, layout) {
            self.send_to(frame, &reply);
        }
    }

    fn send_to(&mut self, frame: FrameId, msg: &HostMessage) {
        if let Some(conn) = self.frames.get_mut(&frame) {
            if let Err(e) = conn.send(msg) {
                warn!("Send to {:?} failed: {}", frame, e);
            }
        }
    }
}

fn frame_reader_thread(
    frame: FrameId,
    stream: TcpStream,
    event_tx: Sender<(FrameId, FrameEvent)>,
) {
    let mut reader = BufReader::new(stream);
    loop {
        match read_frame(&mut reader) {
            Ok(text) => {
                // Undecodable frames are dropped here; the session lives on.
                if let Some(msg) = decode::<ViewerMessage>(&text) {
                    if event_tx.send((frame, FrameEvent::Message(msg))).is_err() {
                        break;
                    }
                }
            }
            Err(_) => {
                let _ = event_tx.send((frame, FrameEvent::Disconnected));
                break;
            }
        }
    }
}
