use std::io::{self, ErrorKind, Read};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use crate::configs::{Transport, TransportKind};
use crate::services::pipeline::{PipelineEvent, Source};

/// Lines longer than this are dropped.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Upper bound on a blocking read, so the stop flag is observed promptly.
const READ_TIMEOUT: Duration = Duration::from_millis(500);

const STOP_POLL: Duration = Duration::from_millis(100);

/// Bound on a single TCP connect, kept under the reconnect delay.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Splits a byte stream into trimmed, non-empty text lines.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
    overflowed: bool,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();

        for chunk in bytes.split_inclusive(|byte| *byte == b'\n') {
            let complete = chunk.last() == Some(&b'\n');
            let data = if complete { &chunk[..chunk.len() - 1] } else { chunk };

            if !self.overflowed {
                if self.buffer.len() + data.len() > MAX_LINE_BYTES {
                    self.overflowed = true;
                    self.buffer.clear();
                } else {
                    self.buffer.extend_from_slice(data);
                }
            }

            if complete {
                if self.overflowed {
                    tracing::warn!("Dropped line longer than {} bytes", MAX_LINE_BYTES);
                    self.overflowed = false;
                } else {
                    let text = String::from_utf8_lossy(&self.buffer);
                    let line = text.trim();
                    if !line.is_empty() {
                        lines.push(line.to_string());
                    }
                }
                self.buffer.clear();
            }
        }

        lines
    }

    /// Forget any partial line, e.g. after the transport dropped.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.overflowed = false;
    }
}

/// Opens the byte stream a [`LineReader`] consumes.
pub trait Connector: Send {
    fn connect(&mut self) -> io::Result<Box<dyn Read + Send>>;

    fn describe(&self) -> String;
}

pub struct SerialConnector {
    path: String,
    baud_rate: u32,
}

impl SerialConnector {
    pub fn new(path: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            path: path.into(),
            baud_rate,
        }
    }
}

impl Connector for SerialConnector {
    fn connect(&mut self) -> io::Result<Box<dyn Read + Send>> {
        let port = serialport::new(&self.path, self.baud_rate)
            .timeout(READ_TIMEOUT)
            .open()?;

        Ok(Box::new(port))
    }

    fn describe(&self) -> String {
        format!("serial {} @ {}", self.path, self.baud_rate)
    }
}

/// Serial-over-TCP bridge (ser2net and friends).
pub struct TcpConnector {
    address: String,
}

impl TcpConnector {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

impl Connector for TcpConnector {
    fn connect(&mut self) -> io::Result<Box<dyn Read + Send>> {
        let mut last_error = None;

        for address in self.address.to_socket_addrs()? {
            match TcpStream::connect_timeout(&address, CONNECT_TIMEOUT) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(READ_TIMEOUT))?;
                    return Ok(Box::new(stream));
                }
                Err(e) => last_error = Some(e),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            io::Error::new(ErrorKind::NotFound, format!("{} resolved to no address", self.address))
        }))
    }

    fn describe(&self) -> String {
        format!("tcp {}", self.address)
    }
}

/// Build the connector described by the transport settings, if any.
pub fn connector_from_settings(transport: &Transport) -> Option<Box<dyn Connector>> {
    match transport.kind {
        TransportKind::Serial if transport.serial_path.trim().is_empty() => None,
        TransportKind::Serial => Some(Box::new(SerialConnector::new(
            transport.serial_path.trim(),
            transport.baud_rate,
        ))),
        TransportKind::Tcp => Some(Box::new(TcpConnector::new(transport.tcp_address.trim()))),
        TransportKind::None => None,
    }
}

enum PumpExit {
    Closed,
    Stopped,
}

/// Reads lines from a transport and forwards them to the pipeline,
/// reopening the transport after a fixed delay whenever it fails.
pub struct LineReader {
    connector: Box<dyn Connector>,
    reconnect_delay: Duration,
    decoder: LineDecoder,
}

impl LineReader {
    pub fn new(connector: Box<dyn Connector>, reconnect_delay: Duration) -> Self {
        Self {
            connector,
            reconnect_delay,
            decoder: LineDecoder::new(),
        }
    }

    pub fn spawn(
        self,
        events: mpsc::Sender<PipelineEvent>,
        stop: Arc<AtomicBool>,
    ) -> io::Result<thread::JoinHandle<()>> {
        thread::Builder::new()
            .name("line-reader".into())
            .spawn(move || self.run(events, stop))
    }

    /// Blocking retry loop; returns once `stop` is set or the pipeline is gone.
    pub fn run(mut self, events: mpsc::Sender<PipelineEvent>, stop: Arc<AtomicBool>) {
        let description = self.connector.describe();

        while !stop.load(Ordering::Relaxed) && !events.is_closed() {
            let mut stream = match self.connector.connect() {
                Ok(stream) => {
                    tracing::info!("Transport {} opened", description);
                    stream
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to open transport {}: {}, retrying in {:?}",
                        description,
                        e,
                        self.reconnect_delay
                    );
                    self.wait(&stop);
                    continue;
                }
            };

            match self.pump(stream.as_mut(), &events, &stop) {
                Ok(PumpExit::Stopped) => break,
                Ok(PumpExit::Closed) => tracing::warn!(
                    "Transport {} closed, reopening in {:?}",
                    description,
                    self.reconnect_delay
                ),
                Err(e) => tracing::error!(
                    "Transport {} failed: {}, reopening in {:?}",
                    description,
                    e,
                    self.reconnect_delay
                ),
            }

            drop(stream);
            self.decoder.reset();
            self.wait(&stop);
        }

        tracing::info!("Line reader for {} stopped", description);
    }

    fn pump(
        &mut self,
        stream: &mut (dyn Read + Send),
        events: &mpsc::Sender<PipelineEvent>,
        stop: &AtomicBool,
    ) -> io::Result<PumpExit> {
        let mut buffer = [0u8; 1024];

        loop {
            if stop.load(Ordering::Relaxed) {
                return Ok(PumpExit::Stopped);
            }

            let read = match stream.read(&mut buffer) {
                Ok(0) => return Ok(PumpExit::Closed),
                Ok(read) => read,
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                    ) =>
                {
                    continue;
                }
                Err(e) => return Err(e),
            };

            for line in self.decoder.feed(&buffer[..read]) {
                tracing::debug!("[transport] raw: {}", line);

                let event = PipelineEvent::Line {
                    source: Source::Transport,
                    text: line,
                };
                if events.blocking_send(event).is_err() {
                    return Ok(PumpExit::Stopped);
                }
            }
        }
    }

    fn wait(&self, stop: &AtomicBool) {
        let deadline = Instant::now() + self.reconnect_delay;

        while !stop.load(Ordering::Relaxed) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep(STOP_POLL.min(deadline - now));
        }
    }
}
