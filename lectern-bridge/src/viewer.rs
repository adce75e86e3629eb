//! Viewer-side endpoint: the host bridge as seen from inside one viewer.
//!
//! Connects to the deck, announces which slide the viewer is embedded in,
//! and exposes inbound host messages as a polled queue for the viewer's
//! event loop. A viewer with no endpoint runs standalone and is
//! permanently active.

use std::io::{self, BufReader, BufWriter};
use std::net::TcpStream;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;

use log::info;

use crate::codec::{decode, read_frame, write_frame};
use crate::protocol::{HostMessage, ViewerMessage};

/// Connection from one viewer to its deck host.
pub struct ViewerEndpoint {
    writer: BufWriter<TcpStream>,
    inbound_rx: Receiver<HostMessage>,
    closed: bool,
}

impl ViewerEndpoint {
    /// Connect to the deck and send the hello for the given slide.
    pub fn connect(addr: &str, slide_index: i32) -> io::Result<Self> {
        info!("Connecting to deck at {}", addr);

        let stream = TcpStream::connect(addr)?;
        let read_stream = stream.try_clone()?;
        let mut writer = BufWriter::new(stream);

        write_frame(&mut writer, &ViewerMessage::Hello { slide_index })?;

        let (inbound_tx, inbound_rx) = mpsc::channel();
        thread::spawn(move || {
            host_reader_thread(read_stream, inbound_tx);
        });

        Ok(Self {
            writer,
            inbound_rx,
            closed: false,
        })
    }

    /// Drain pending host messages (non-blocking). Malformed frames were
    /// already dropped by the reader.
    pub fn poll_messages(&mut self) -> Vec<HostMessage> {
        let mut messages = Vec::new();
        loop {
            match self.inbound_rx.try_recv() {
                Ok(msg) => messages.push(msg),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.closed = true;
                    break;
                }
            }
        }
        messages
    }

    /// Whether the deck side has gone away.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Report the measured content height to the deck.
    pub fn send_height(&mut self, height: f64) -> io::Result<()> {
        write_frame(&mut self.writer, &ViewerMessage::Height { height })
    }
}

fn host_reader_thread(stream: TcpStream, inbound_tx: Sender<HostMessage>) {
    let mut reader = BufReader::new(stream);
    loop {
        match read_frame(&mut reader) {
            Ok(text) => {
                if let Some(msg) = decode::<HostMessage>(&text) {
                    if inbound_tx.send(msg).is_err() {
                        break;
                    }
                }
            }
            Err(_) => break,
        }
    }
}
