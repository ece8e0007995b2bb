use log::*;
use scoreboard_common::transport::{PublishChannel, TransportError};
use std::{
    collections::HashMap,
    fmt::Debug,
    future::Future,
    net::SocketAddr,
    pin::Pin,
    sync::Arc,
};
use thiserror::Error;
use tokio::{
    io::{self, AsyncWrite, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    select,
    sync::{mpsc, watch},
    task::{self, JoinHandle},
    time::{Duration, timeout},
};

const TIMEOUT: Duration = Duration::from_millis(500);
const SERVER_CHANNEL_LEN: usize = 8;

type Frame = Option<Arc<[u8]>>;

/// Fans frames out to every display connected over TCP. Must be created inside a tokio
/// runtime.
///
/// Only the newest frame is kept. A display that falls behind skips straight to it.
#[derive(Debug)]
pub struct UpdateSender {
    frames: watch::Sender<Frame>,
    tx: mpsc::Sender<ServerMessage>,
    server_join: JoinHandle<()>,
    listener_join: JoinHandle<()>,
}

impl UpdateSender {
    pub fn new(port: u16, send_on_connect: bool) -> Self {
        let (frames, frames_rx) = watch::channel(None);
        let (tx, rx) = mpsc::channel(SERVER_CHANNEL_LEN);

        let server_join = task::spawn(Server::new(rx, frames_rx, send_on_connect).run_loop());

        let listener_join = task::spawn(listener_loop(tx.clone(), port));

        Self {
            frames,
            tx,
            server_join,
            listener_join,
        }
    }
}

impl PublishChannel for UpdateSender {
    fn publish(&mut self, frame: &str) -> Result<(), TransportError> {
        if self.server_join.is_finished() {
            return Err(TransportError::Closed);
        }

        let mut bytes = Vec::with_capacity(frame.len() + 1);
        bytes.extend_from_slice(frame.as_bytes());
        bytes.push(b'\n');

        self.frames.send_replace(Some(bytes.into()));
        Ok(())
    }
}

impl Drop for UpdateSender {
    fn drop(&mut self) {
        if self.tx.try_send(ServerMessage::Stop).is_err() {
            self.server_join.abort();
        }
        self.listener_join.abort();
    }
}

#[derive(Debug, Error)]
enum WorkerError {
    #[error("The sender closed the channel")]
    ChannelClosed,
    #[error("Write timed out")]
    TimedOut,
    #[error(transparent)]
    IoError(#[from] io::Error),
}

async fn worker_loop<T: AsyncWrite + Debug + Unpin + Send>(
    mut rx: watch::Receiver<Frame>,
    mut write: T,
    send_current: bool,
) -> Result<(), WorkerError> {
    let mut pending = {
        let current = rx.borrow_and_update();
        if send_current { current.clone() } else { None }
    };

    loop {
        let data = match pending.take() {
            Some(data) => data,
            None => {
                rx.changed().await.map_err(|_| WorkerError::ChannelClosed)?;
                match rx.borrow_and_update().clone() {
                    Some(data) => data,
                    None => continue,
                }
            }
        };

        // A partial write leaves the display mid-line, so the connection can't be reused
        match timeout(TIMEOUT, write.write_all(&data[..])).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!("Send to {write:?} failed: {e:?}");
                Err(e)?;
            }
            Err(_) => {
                warn!("Send to {write:?} timed out, dropping the connection");
                return Err(WorkerError::TimedOut);
            }
        }
    }
}

#[derive(Debug)]
enum ServerMessage {
    NewConnection(TcpStream, SocketAddr),
    Stop,
}

#[derive(Debug)]
struct Server {
    next_id: usize,
    workers: HashMap<usize, JoinHandle<Result<(), WorkerError>>>,
    rx: mpsc::Receiver<ServerMessage>,
    frames: watch::Receiver<Frame>,
    send_on_connect: bool,
}

impl Server {
    fn new(
        rx: mpsc::Receiver<ServerMessage>,
        frames: watch::Receiver<Frame>,
        send_on_connect: bool,
    ) -> Self {
        Server {
            next_id: 0,
            workers: HashMap::new(),
            rx,
            frames,
            send_on_connect,
        }
    }

    fn add_worker<T: 'static + AsyncWrite + Debug + Unpin + Send>(&mut self, sender: T) {
        self.workers.retain(|id, join| {
            if join.is_finished() {
                info!("Worker {id} finished");
            }
            !join.is_finished()
        });

        let join = task::spawn(worker_loop(
            self.frames.clone(),
            sender,
            self.send_on_connect,
        ));
        self.workers.insert(self.next_id, join);
        self.next_id += 1;
    }

    async fn run_loop(mut self) {
        loop {
            match self.rx.recv().await {
                Some(ServerMessage::NewConnection(stream, addr)) => {
                    debug!("Adding worker {} for {addr:?}", self.next_id);
                    self.add_worker(stream);
                }
                Some(ServerMessage::Stop) | None => {
                    break;
                }
            }
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        for join in self.workers.values() {
            join.abort();
        }
    }
}

async fn listener_loop(tx: mpsc::Sender<ServerMessage>, port: u16) {
    info!("Starting listeners on port {port}");
    let listener_v6 = match TcpListener::bind(("::", port)).await {
        Ok(listener) => Some(listener),
        Err(e) => {
            error!("Failed to bind to port {port}: {e:?}");
            None
        }
    };

    // On some OSs, we must separately listen on IPv4, but on other OSs that
    // that isn't allowed, so we just try to listen on IPv4
    let listener_v4 = TcpListener::bind(("0.0.0.0", port)).await.ok();

    if listener_v6.is_none() && listener_v4.is_none() {
        error!("No listeners could be started, displays will not be able to connect");
        return;
    }

    info!("Listeners started");

    loop {
        type ListenResult = std::io::Result<(TcpStream, SocketAddr)>;

        fn create_future<'a>(
            listener: Option<&'a TcpListener>,
        ) -> Pin<Box<dyn Future<Output = ListenResult> + Send + 'a>> {
            if let Some(listener) = listener {
                Box::pin(listener.accept())
            } else {
                Box::pin(core::future::pending())
            }
        }

        let v6_future = create_future(listener_v6.as_ref());
        let v4_future = create_future(listener_v4.as_ref());

        let conn = select! {
            conn = v4_future => conn,
            conn = v6_future => conn,
        };

        match conn {
            Ok((stream, addr)) => {
                info!("New display connection from {addr:?}");
                if tx
                    .send(ServerMessage::NewConnection(stream, addr))
                    .await
                    .is_err()
                {
                    info!("Server stopped, closing listeners");
                    return;
                }
            }
            Err(e) => error!("New display connection failed: {e:?}"),
        }
    }
}
