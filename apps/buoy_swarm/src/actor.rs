//! One simulated chat client.
//!
//! Lifecycle: created -> connecting -> connected -> authenticating ->
//! authenticated -> (room-joined) -> (chatting) <-> (idle) -> disconnected.
//! `disconnected` is reachable from anywhere (transport drop or explicit
//! `disconnect`) and terminal; a new session means a new `Actor`.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use buoyproto::decor;
use buoyproto::{
    JoinParams, JoinReply, JoinRoomParams, JoinRoomReply, Profile, RoomEntry, SendChatParams,
    SetProfileParams,
};
use buoysock::{Socket, SocketEvent};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub const CHAT_PERIOD: Duration = Duration::from_millis(1500);

pub struct Actor {
    id: u32,
    socket: Socket,
    invite: String,
    peer_id: Mutex<Option<String>>,
    chat: Mutex<Option<JoinHandle<()>>>,
}

impl Actor {
    /// Create the session and start connecting. Never fails: an unreachable
    /// endpoint shows up as a logged disconnect, not an error.
    pub fn spawn(id: u32, addr: SocketAddr, invite: &str) -> Arc<Actor> {
        info!(actor = id, addr = %addr, "connecting to buoy");
        let (socket, events) = Socket::open(addr);
        Self::wire(id, socket, events, invite)
    }

    /// Session over a caller-supplied stream, for tests.
    #[cfg(test)]
    pub fn over_stream<S>(id: u32, stream: S, invite: &str) -> Arc<Actor>
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + Unpin + 'static,
    {
        let (socket, events) = Socket::from_stream(stream);
        Self::wire(id, socket, events, invite)
    }

    fn wire(
        id: u32,
        socket: Socket,
        mut events: mpsc::Receiver<SocketEvent>,
        invite: &str,
    ) -> Arc<Actor> {
        let actor = Arc::new(Actor {
            id,
            socket,
            invite: invite.to_string(),
            peer_id: Mutex::new(None),
            chat: Mutex::new(None),
        });

        let watcher = actor.clone();
        tokio::spawn(async move {
            while let Some(ev) = events.recv().await {
                match ev {
                    SocketEvent::Connected => {
                        info!(actor = watcher.id, "connected to buoy");
                        let session = watcher.clone();
                        tokio::spawn(async move { session.authenticate().await });
                    }
                    SocketEvent::Disconnected => {
                        info!(actor = watcher.id, "disconnected");
                    }
                }
            }
        });

        actor
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Fired once per successful transport connect. Two concurrent join
    /// calls racing is unspecified; nothing guards against it.
    async fn authenticate(&self) {
        let params = to_params(&JoinParams {
            credential: self.invite.clone(),
        });
        let body = match self.socket.call(buoyproto::REQ_JOIN, params).await {
            Ok(b) => b,
            Err(e) => {
                warn!(actor = self.id, err = %e, "join call failed");
                return;
            }
        };
        let reply: JoinReply = match serde_json::from_value(body) {
            Ok(r) => r,
            Err(e) => {
                warn!(actor = self.id, err = %e, "malformed join reply");
                return;
            }
        };

        if reply.error {
            warn!(actor = self.id, "could not authenticate");
            self.disconnect().await;
            return;
        }

        let peer = reply.peer_id.unwrap_or_default();
        info!(actor = self.id, peer_id = %peer, "authenticated");
        *self.peer_id.lock().unwrap_or_else(|e| e.into_inner()) = Some(peer);
    }

    /// Fetch the room list and join its first entry.
    ///
    /// The fetch fully resolves before the join is issued. Returns `false`
    /// on an empty list (no join issued) or an error-flagged join reply.
    pub async fn join_room(&self) -> bool {
        let body = match self.socket.call(buoyproto::REQ_FETCH_ROOMS, Value::Null).await {
            Ok(b) => b,
            Err(e) => {
                warn!(actor = self.id, err = %e, "fetchRooms call failed");
                return false;
            }
        };
        let rooms: Vec<RoomEntry> = match serde_json::from_value(body) {
            Ok(r) => r,
            Err(e) => {
                warn!(actor = self.id, err = %e, "malformed room list");
                return false;
            }
        };

        let Some(first) = rooms.first() else {
            info!(actor = self.id, "could not find room to join");
            return false;
        };
        info!(actor = self.id, rooms = rooms.len(), "joining first room");

        let params = to_params(&JoinRoomParams {
            id: first.id.clone(),
        });
        let body = match self.socket.call(buoyproto::REQ_JOIN_ROOM, params).await {
            Ok(b) => b,
            Err(e) => {
                warn!(actor = self.id, err = %e, "joinRoom call failed");
                return false;
            }
        };
        let reply: JoinRoomReply = match serde_json::from_value(body) {
            Ok(r) => r,
            Err(e) => {
                warn!(actor = self.id, err = %e, "malformed joinRoom reply");
                return false;
            }
        };

        if reply.error {
            warn!(
                actor = self.id,
                message = reply.message.as_deref().unwrap_or(""),
                "could not join room"
            );
            return false;
        }

        info!(actor = self.id, room = %first.id, "joined room");
        true
    }

    /// Set a random decoration and the generated handle. The reply is
    /// awaited for ordering only; its payload is not inspected.
    pub async fn set_profile(&self) {
        let params = to_params(&SetProfileParams {
            profile: Profile {
                decoration: decor::random_decoration().to_string(),
                handle: format!("Actor {}", self.id),
            },
        });
        let _ = self.socket.call(buoyproto::REQ_SET_PROFILE, params).await;
    }

    /// Start the chat timer. No-op if one is already running.
    pub fn begin_chat(&self) {
        let mut chat = self.chat.lock().unwrap_or_else(|e| e.into_inner());
        if chat.is_some() {
            return;
        }

        let socket = self.socket.clone();
        *chat = Some(tokio::spawn(async move {
            let mut ticks =
                tokio::time::interval_at(tokio::time::Instant::now() + CHAT_PERIOD, CHAT_PERIOD);
            loop {
                ticks.tick().await;
                let message = format!("{} {}", decor::random_decoration(), decor::random_unit());
                let sock = socket.clone();
                // Each tick is its own fire-and-forget call; a slow reply
                // never delays the next tick.
                tokio::spawn(async move {
                    let _ = sock
                        .call(buoyproto::REQ_SEND_CHAT, to_params(&SendChatParams { message }))
                        .await;
                });
            }
        }));
        info!(actor = self.id, "chat started");
    }

    /// Stop the chat timer. No-op if none is running.
    pub fn end_chat(&self) {
        let handle = self.chat.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            handle.abort();
            info!(actor = self.id, "chat stopped");
        }
    }

    /// Close the transport. An active chat timer keeps ticking; its calls
    /// stall against the dead socket, same as the rest of the session.
    pub async fn disconnect(&self) {
        self.socket.close().await;
    }

    pub fn chat_active(&self) -> bool {
        self.chat
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    #[cfg(test)]
    pub fn peer_id(&self) -> Option<String> {
        self.peer_id
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

fn to_params<T: Serialize>(t: &T) -> Value {
    serde_json::to_value(t).unwrap_or(Value::Null)
}
