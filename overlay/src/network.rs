use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use log::{error, info, trace, warn};
use scoreboard_common::transport::{
    EventCallback, SubscribeChannel, SubscriptionId, Subscriptions, TransportError,
    TransportEvent,
};
use std::{net::SocketAddr, time::Duration};
use tokio::{
    io::{self, AsyncBufRead, AsyncBufReadExt, AsyncReadExt, BufReader},
    net::TcpStream,
};

pub const EVENT_CHANNEL_LEN: usize = 16;
/// Longest line accepted as a frame, not counting the newline
pub const MAX_FRAME_LEN: u64 = 64 * 1024;

#[derive(Debug, PartialEq, Eq)]
enum Line {
    Frame(String),
    Oversized,
    Closed,
}

/// Reads one newline-terminated line, holding at most `MAX_FRAME_LEN` bytes of it. The rest of
/// a longer line is read and thrown away.
async fn read_line<R: AsyncBufRead + Unpin>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<Line> {
    buf.clear();
    let read = (&mut *reader)
        .take(MAX_FRAME_LEN + 1)
        .read_until(b'\n', buf)
        .await?;
    if read == 0 {
        return Ok(Line::Closed);
    }

    let terminated = buf.last() == Some(&b'\n');
    if terminated || read as u64 <= MAX_FRAME_LEN {
        if terminated {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        return Ok(Line::Frame(String::from_utf8_lossy(buf).into_owned()));
    }

    loop {
        buf.clear();
        let read = (&mut *reader)
            .take(MAX_FRAME_LEN)
            .read_until(b'\n', buf)
            .await?;
        if read == 0 || buf.last() == Some(&b'\n') {
            return Ok(Line::Oversized);
        }
    }
}

/// Keeps a connection to the control surface open for as long as the display runs, passing
/// everything it hears to `tx`. Returns once the receiving side is gone.
#[tokio::main]
pub async fn networking_thread(tx: Sender<TransportEvent>, addr: SocketAddr, retry_delay: Duration) {
    connection_loop(tx, addr, retry_delay).await
}

async fn connection_loop(tx: Sender<TransportEvent>, addr: SocketAddr, retry_delay: Duration) {
    info!("Attempting control surface connection at {addr}");
    loop {
        let stream = loop {
            match TcpStream::connect(addr).await {
                Ok(stream) => break stream,
                Err(e) => trace!("Connection to {addr} failed: {e}"),
            }
            tokio::time::sleep(retry_delay).await;
        };
        info!("Connected to the control surface at {addr}");
        if tx.send(TransportEvent::Connected).is_err() {
            return;
        }

        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        loop {
            match read_line(&mut reader, &mut buf).await {
                Ok(Line::Frame(line)) => {
                    if tx.send(TransportEvent::Frame(line)).is_err() {
                        return;
                    }
                }
                Ok(Line::Oversized) => {
                    warn!("Discarded a frame longer than {MAX_FRAME_LEN} bytes");
                }
                Ok(Line::Closed) => {
                    error!("Connection to the control surface lost! Attempting to reconnect!");
                    break;
                }
                Err(e) => {
                    error!("Error reading from the control surface: {e}. Attempting to reconnect!");
                    break;
                }
            }
        }

        if tx.send(TransportEvent::Disconnected).is_err() {
            return;
        }
        tokio::time::sleep(retry_delay).await;
    }
}

/// The display side of the TCP transport. Events arrive from the networking thread and are
/// handed to subscribers on the thread that calls `pump`.
#[derive(Debug)]
pub struct NetworkLink {
    rx: Receiver<TransportEvent>,
    subscriptions: Subscriptions,
}

impl NetworkLink {
    pub fn new(rx: Receiver<TransportEvent>) -> Self {
        Self {
            rx,
            subscriptions: Default::default(),
        }
    }

    /// Waits up to `timeout` for an event, then dispatches it and every other event already
    /// waiting. Returns the number of events dispatched.
    pub fn pump(&mut self, timeout: Duration) -> Result<usize, TransportError> {
        let first = match self.rx.recv_timeout(timeout) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => return Ok(0),
            Err(RecvTimeoutError::Disconnected) => return Err(TransportError::Closed),
        };
        self.subscriptions.dispatch(&first);
        let mut count = 1;

        loop {
            match self.rx.try_recv() {
                Ok(event) => {
                    self.subscriptions.dispatch(&event);
                    count += 1;
                }
                Err(TryRecvError::Empty) => return Ok(count),
                Err(TryRecvError::Disconnected) => {
                    warn!("Networking thread stopped");
                    return Ok(count);
                }
            }
        }
    }
}

impl SubscribeChannel for NetworkLink {
    fn subscribe(&mut self, callback: EventCallback) -> SubscriptionId {
        self.subscriptions.add(callback)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscriptions.remove(id)
    }
}
