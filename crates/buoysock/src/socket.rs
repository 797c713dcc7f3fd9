use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use buoyproto::{CallFrame, ReplyFrame};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::line::JsonReader;

/// Transport lifecycle, delivered in order on the receiver returned by
/// [`Socket::open`]. At most one `Connected` per socket; `Disconnected` is
/// always the last event. There is no reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketEvent {
    Connected,
    Disconnected,
}

#[derive(Debug)]
pub enum SocketError {
    /// Every handle to the socket was dropped while the call was pending.
    Closed,
}

impl std::fmt::Display for SocketError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SocketError::Closed => write!(f, "socket dropped with call pending"),
        }
    }
}

impl std::error::Error for SocketError {}

enum Outbound {
    Frame(String),
    Close,
}

struct Shared {
    seq: AtomicU64,
    pending: Mutex<HashMap<u64, oneshot::Sender<Value>>>,
    out_tx: mpsc::Sender<Outbound>,
}

/// One bidirectional connection with correlated request/reply calls.
///
/// Cheap to clone; all clones share the io task and the pending-call table.
/// The table is owned by the handles, not the io task, so a call whose reply
/// never arrives (dropped transport) suspends its caller indefinitely. That
/// matches the wire contract: no client-side timeout, no retry.
#[derive(Clone)]
pub struct Socket {
    shared: Arc<Shared>,
}

impl Socket {
    /// Connect to `addr` in the background.
    ///
    /// A failed connect is not an error here: it surfaces as a lone
    /// `Disconnected` event, and calls issued against the socket stall.
    pub fn open(addr: SocketAddr) -> (Socket, mpsc::Receiver<SocketEvent>) {
        let (sock, out_rx, ev_tx, ev_rx) = Self::parts();
        let shared = sock.shared.clone();
        tokio::spawn(async move {
            match TcpStream::connect(addr).await {
                Ok(stream) => {
                    let _ = ev_tx.send(SocketEvent::Connected).await;
                    pump(stream, out_rx, &shared).await;
                }
                Err(e) => {
                    debug!(addr = %addr, err = %e, "connect failed");
                }
            }
            let _ = ev_tx.send(SocketEvent::Disconnected).await;
        });
        (sock, ev_rx)
    }

    /// Same io loop over a caller-supplied stream. `Connected` fires
    /// immediately. This is how tests drive a socket over a duplex pipe.
    pub fn from_stream<S>(stream: S) -> (Socket, mpsc::Receiver<SocketEvent>)
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let (sock, out_rx, ev_tx, ev_rx) = Self::parts();
        let shared = sock.shared.clone();
        tokio::spawn(async move {
            let _ = ev_tx.send(SocketEvent::Connected).await;
            pump(stream, out_rx, &shared).await;
            let _ = ev_tx.send(SocketEvent::Disconnected).await;
        });
        (sock, ev_rx)
    }

    fn parts() -> (
        Socket,
        mpsc::Receiver<Outbound>,
        mpsc::Sender<SocketEvent>,
        mpsc::Receiver<SocketEvent>,
    ) {
        let (out_tx, out_rx) = mpsc::channel(64);
        let (ev_tx, ev_rx) = mpsc::channel(4);
        let sock = Socket {
            shared: Arc::new(Shared {
                seq: AtomicU64::new(1),
                pending: Mutex::new(HashMap::new()),
                out_tx,
            }),
        };
        (sock, out_rx, ev_tx, ev_rx)
    }

    /// Issue one correlated call and suspend until its reply routes back.
    ///
    /// Resolves exactly once, with the body the server attached to this
    /// seq and no other. If the peer never replies, this never resolves.
    pub async fn call(&self, name: &str, params: Value) -> Result<Value, SocketError> {
        let seq = self.shared.seq.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.lock_pending().insert(seq, tx);

        let frame = CallFrame {
            seq,
            name: name.to_string(),
            params,
        };
        match serde_json::to_string(&frame) {
            Ok(line) => {
                if self.shared.out_tx.send(Outbound::Frame(line)).await.is_err() {
                    // Transport already gone; the call stays pending.
                    debug!(seq, name, "call issued after transport loss");
                }
            }
            Err(e) => warn!(seq, name, err = %e, "unencodable call params"),
        }

        rx.await.map_err(|_| SocketError::Closed)
    }

    /// Ask the io task to shut the stream down. Idempotent. Pending calls
    /// are left untouched.
    pub async fn close(&self) {
        let _ = self.shared.out_tx.send(Outbound::Close).await;
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, HashMap<u64, oneshot::Sender<Value>>> {
        self.shared.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

async fn pump<S>(stream: S, mut out_rx: mpsc::Receiver<Outbound>, shared: &Shared)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (rd, mut wr) = tokio::io::split(stream);
    let mut reader = JsonReader::new(rd);

    loop {
        tokio::select! {
            out = out_rx.recv() => match out {
                Some(Outbound::Frame(mut line)) => {
                    line.push('\n');
                    if wr.write_all(line.as_bytes()).await.is_err() {
                        break;
                    }
                }
                Some(Outbound::Close) | None => {
                    let _ = wr.shutdown().await;
                    break;
                }
            },
            res = reader.read_frame::<ReplyFrame>() => match res {
                Ok(Some(reply)) => route(shared, reply),
                Ok(None) => break,
                Err(e) => {
                    warn!(err = %e, "bad frame from server");
                    break;
                }
            },
        }
    }
}

fn route(shared: &Shared, reply: ReplyFrame) {
    let tx = shared
        .pending
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .remove(&reply.seq);
    match tx {
        Some(tx) => {
            let _ = tx.send(reply.body);
        }
        None => warn!(seq = reply.seq, "reply with no matching call"),
    }
}
