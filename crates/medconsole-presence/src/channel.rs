//! The presence channel: one socket, one writer, many readers.
//!
//! [`PresenceChannel::connect`] spawns a task that owns the socket. The task
//! speaks Engine.IO/Socket.IO, answers heartbeats, and applies every
//! `online_stats` snapshot to the shared [`PresenceState`] in arrival order.
//! Readers observe that state through a `tokio::sync::watch` channel and
//! can never write it.
//!
//! ```text
//!   connect() ──spawn──→ socket task ──send_modify──→ watch::Sender
//!                             ↑                           │
//!   disconnect() ──shutdown───┘                     PresenceReader
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use medconsole_protocol::{Packet, ServerEvent, SocketPacket, decode_event};
use medconsole_session::SessionManager;
use medconsole_transport::{Connection, WebSocketConnection};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use url::Url;

use crate::{ChannelStatus, PresenceError, PresenceState, ReconnectPolicy};

/// Default Socket.IO mount path on the API host.
pub const DEFAULT_SOCKET_PATH: &str = "/socket.io/";

/// What a call to [`PresenceChannel::connect`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// A socket task was started.
    Started,
    /// A socket is already connecting or connected; nothing changed.
    AlreadyActive,
    /// No session token is stored; no connection was attempted.
    NoToken,
}

// ---------------------------------------------------------------------------
// Readers
// ---------------------------------------------------------------------------

/// Read-only view of the shared presence state.
#[derive(Debug, Clone)]
pub struct PresenceReader {
    rx: watch::Receiver<PresenceState>,
}

impl PresenceReader {
    /// A copy of the current state.
    pub fn snapshot(&self) -> PresenceState {
        self.rx.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.rx.borrow().is_connected()
    }

    /// Waits until the state changes.
    ///
    /// Returns `false` once the channel has been dropped and no further
    /// change can arrive.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Marks the current value as seen and returns a copy of it.
    pub fn snapshot_and_mark_seen(&mut self) -> PresenceState {
        self.rx.borrow_and_update().clone()
    }
}

// ---------------------------------------------------------------------------
// PresenceChannel
// ---------------------------------------------------------------------------

struct SocketTask {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Owns the presence socket and the shared state it feeds.
pub struct PresenceChannel {
    endpoint: Url,
    session: SessionManager,
    policy: ReconnectPolicy,
    state: Arc<watch::Sender<PresenceState>>,
    task: Mutex<Option<SocketTask>>,
}

impl std::fmt::Debug for PresenceChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceChannel")
            .field("endpoint", &self.endpoint.as_str())
            .field("status", &self.state.borrow().status)
            .finish_non_exhaustive()
    }
}

impl PresenceChannel {
    /// Creates a channel for the API at `api_base_url`, using the default
    /// socket path and no reconnection.
    ///
    /// # Errors
    /// [`PresenceError::InvalidEndpoint`] if the URL does not parse or is
    /// not `http`, `https`, `ws` or `wss`.
    pub fn new(api_base_url: &str, session: SessionManager) -> Result<Self, PresenceError> {
        Self::with_options(
            api_base_url,
            DEFAULT_SOCKET_PATH,
            session,
            ReconnectPolicy::default(),
        )
    }

    pub fn with_options(
        api_base_url: &str,
        socket_path: &str,
        session: SessionManager,
        policy: ReconnectPolicy,
    ) -> Result<Self, PresenceError> {
        let endpoint = socket_endpoint(api_base_url, socket_path)?;
        let (state, _) = watch::channel(PresenceState::default());
        Ok(Self {
            endpoint,
            session,
            policy,
            state: Arc::new(state),
            task: Mutex::new(None),
        })
    }

    /// The socket URL, without credentials.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    /// Opens the presence socket with the current session token.
    ///
    /// A no-op when a socket is already connecting or connected, and when
    /// no token is stored. Neither case is an error; both are logged.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect(&self) -> ConnectOutcome {
        let mut slot = self.task.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(task) = slot.as_ref() {
            if !task.handle.is_finished() {
                tracing::warn!(
                    status = %self.state.borrow().status,
                    "presence socket already active"
                );
                return ConnectOutcome::AlreadyActive;
            }
        }

        if self.session.current_token().is_none() {
            tracing::warn!("no session token, presence socket not opened");
            return ConnectOutcome::NoToken;
        }

        set_status(&self.state, ChannelStatus::Connecting);
        let (shutdown, shutdown_rx) = oneshot::channel();
        let worker = SocketWorker {
            endpoint: self.endpoint.clone(),
            session: self.session.clone(),
            policy: self.policy.clone(),
            state: Arc::clone(&self.state),
        };
        let handle = tokio::spawn(worker.run(shutdown_rx));
        *slot = Some(SocketTask { shutdown, handle });

        tracing::info!(endpoint = %self.endpoint, "presence socket starting");
        ConnectOutcome::Started
    }

    /// Closes the socket and resets the shared state to empty.
    ///
    /// Idempotent: calling it with no socket open only ensures the state is
    /// empty.
    pub async fn disconnect(&self) {
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(task) = task {
            let _ = task.shutdown.send(());
            if let Err(e) = task.handle.await {
                tracing::warn!(error = %e, "presence task ended abnormally");
            }
            tracing::info!("presence socket disconnected");
        }

        self.state.send_if_modified(|state| {
            if *state == PresenceState::default() {
                return false;
            }
            *state = PresenceState::default();
            true
        });
    }

    /// A new read-only handle on the shared state.
    pub fn subscribe(&self) -> PresenceReader {
        PresenceReader {
            rx: self.state.subscribe(),
        }
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> PresenceState {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> ChannelStatus {
        self.state.borrow().status
    }
}

impl Drop for PresenceChannel {
    fn drop(&mut self) {
        let task = self
            .task
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            let _ = task.shutdown.send(());
        }
    }
}

// ---------------------------------------------------------------------------
// Socket task
// ---------------------------------------------------------------------------

/// How one socket session ended.
enum SessionEnd {
    /// `disconnect()` was called or the channel was dropped.
    Shutdown,
    /// The server or the network ended the session.
    Dropped,
    /// The server refused the namespace connect. Redialing with the same
    /// token would be refused again.
    Refused,
}

struct SocketWorker {
    endpoint: Url,
    session: SessionManager,
    policy: ReconnectPolicy,
    state: Arc<watch::Sender<PresenceState>>,
}

impl SocketWorker {
    async fn run(self, mut shutdown: oneshot::Receiver<()>) {
        let mut attempt = 0u32;

        loop {
            // Every dial reads the token afresh; a cleared session stops us.
            let Some(token) = self.session.current_token() else {
                tracing::warn!("session token gone, presence socket stays closed");
                break;
            };
            set_status(&self.state, ChannelStatus::Connecting);

            match self.run_session(&token, &mut shutdown, &mut attempt).await {
                Ok(SessionEnd::Shutdown) => return,
                Ok(SessionEnd::Dropped) => {
                    tracing::info!("presence socket closed by server");
                }
                Ok(SessionEnd::Refused) => {
                    set_status(&self.state, ChannelStatus::Disconnected);
                    return;
                }
                Err(e) => {
                    tracing::error!(error = %e, "presence socket error");
                }
            }
            // Counts survive a server-side drop until the next snapshot.
            set_status(&self.state, ChannelStatus::Disconnected);

            if attempt >= self.policy.max_attempts {
                if self.policy.is_enabled() {
                    tracing::warn!(attempts = attempt, "presence reconnect attempts exhausted");
                }
                break;
            }
            let delay = self.policy.delay_for(attempt);
            attempt += 1;
            tracing::info!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                "presence socket redialing"
            );

            tokio::select! {
                _ = &mut shutdown => return,
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn run_session(
        &self,
        token: &str,
        shutdown: &mut oneshot::Receiver<()>,
        attempt: &mut u32,
    ) -> Result<SessionEnd, PresenceError> {
        let url = authenticated_url(&self.endpoint, token);
        let bearer = format!("Bearer {token}");
        let headers = [("Authorization", bearer.as_str())];

        let conn = tokio::select! {
            _ = &mut *shutdown => return Ok(SessionEnd::Shutdown),
            conn = WebSocketConnection::connect(&url, &headers) => conn?,
        };

        loop {
            let frame = tokio::select! {
                _ = &mut *shutdown => {
                    let leave = Packet::Message(SocketPacket::Disconnect {
                        namespace: medconsole_protocol::DEFAULT_NAMESPACE.to_string(),
                    });
                    if let Ok(frame) = leave.encode() {
                        let _ = conn.send(&frame).await;
                    }
                    let _ = conn.close().await;
                    return Ok(SessionEnd::Shutdown);
                }
                frame = conn.recv() => frame?,
            };
            let Some(frame) = frame else {
                return Ok(SessionEnd::Dropped);
            };

            let event = match decode_event(&frame) {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!(
                        id = %conn.id(),
                        error = %e,
                        "ignoring undecodable presence frame"
                    );
                    continue;
                }
            };

            match event {
                ServerEvent::Opened(open) => {
                    tracing::debug!(
                        sid = %open.sid,
                        ping_interval = open.ping_interval,
                        "engine session opened"
                    );
                    conn.send(&Packet::Message(SocketPacket::connect()).encode()?)
                        .await?;
                }
                ServerEvent::Connected => {
                    *attempt = 0;
                    set_status(&self.state, ChannelStatus::Connected);
                    tracing::info!(id = %conn.id(), "presence socket connected");
                }
                ServerEvent::Ping(data) => {
                    conn.send(&Packet::Pong(data).encode()?).await?;
                }
                ServerEvent::Presence(snapshot) => {
                    tracing::debug!(
                        users = ?snapshot.users,
                        doctors = ?snapshot.doctors,
                        "presence snapshot"
                    );
                    self.state.send_modify(|state| state.apply(&snapshot));
                }
                ServerEvent::ConnectError(message) => {
                    // The server keeps the engine socket open after a refusal.
                    tracing::error!(%message, "presence connection refused");
                    let _ = conn.close().await;
                    return Ok(SessionEnd::Refused);
                }
                ServerEvent::Disconnected => {
                    let _ = conn.close().await;
                    return Ok(SessionEnd::Dropped);
                }
                ServerEvent::Other(name) => {
                    tracing::debug!(event = %name, "ignoring presence event");
                }
                ServerEvent::Ignored => {}
            }
        }
    }
}

fn set_status(state: &watch::Sender<PresenceState>, status: ChannelStatus) {
    state.send_if_modified(|current| {
        if current.status == status {
            return false;
        }
        current.status = status;
        true
    });
}

/// Maps the API base URL onto the socket endpoint: same host, `ws`/`wss`
/// scheme, the socket path, and the websocket-only Engine.IO query.
fn socket_endpoint(api_base_url: &str, socket_path: &str) -> Result<Url, PresenceError> {
    let mut url = Url::parse(api_base_url)
        .map_err(|e| PresenceError::InvalidEndpoint(format!("{api_base_url}: {e}")))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(PresenceError::InvalidEndpoint(format!(
                "unsupported scheme {other}"
            )));
        }
    };
    url.set_scheme(scheme)
        .map_err(|()| PresenceError::InvalidEndpoint(format!("cannot use scheme {scheme}")))?;

    let path = if socket_path.starts_with('/') {
        socket_path.to_string()
    } else {
        format!("/{socket_path}")
    };
    url.set_path(&path);
    url.set_fragment(None);
    url.set_query(None);
    url.query_pairs_mut()
        .append_pair("EIO", "4")
        .append_pair("transport", "websocket");
    Ok(url)
}

fn authenticated_url(endpoint: &Url, token: &str) -> Url {
    let mut url = endpoint.clone();
    url.query_pairs_mut().append_pair("token", token);
    url
}
