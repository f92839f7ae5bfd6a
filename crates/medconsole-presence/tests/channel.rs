//! Integration tests for the presence channel.
//!
//! A loopback `tokio-tungstenite` server plays the Socket.IO side: it sends
//! the Engine.IO open packet, accepts the namespace connect, and then
//! forwards whatever frames the test pushes.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use medconsole_presence::{
    ChannelStatus, ConnectOutcome, PresenceChannel, PresenceReader, PresenceState, ReconnectPolicy,
};
use medconsole_session::{SessionManager, codec};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

const OPEN_FRAME: &str = concat!(
    r#"0{"sid":"eio-1","upgrades":[],"#,
    r#""pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#
);
const WAIT: Duration = Duration::from_secs(5);

// =========================================================================
// Mock Socket.IO server
// =========================================================================

enum ServerCmd {
    Frame(String),
    Close,
}

/// One accepted client, already past the namespace handshake.
struct Peer {
    authorization: Option<String>,
    query: Option<String>,
    commands: mpsc::UnboundedSender<ServerCmd>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl Peer {
    fn push(&self, frame: &str) {
        self.commands.send(ServerCmd::Frame(frame.to_string())).unwrap();
    }

    fn close(&self) {
        self.commands.send(ServerCmd::Close).unwrap();
    }

    async fn next_frame(&mut self) -> Option<String> {
        tokio::time::timeout(WAIT, self.from_client.recv())
            .await
            .expect("timed out waiting for a client frame")
    }
}

struct MockServer {
    base_url: String,
    peers: mpsc::UnboundedReceiver<Peer>,
}

impl MockServer {
    async fn start() -> Self {
        Self::spawn(None).await
    }

    /// A server that answers the namespace connect with `refusal` and then
    /// leaves the socket open.
    async fn refusing(refusal: &'static str) -> Self {
        Self::spawn(Some(refusal)).await
    }

    async fn spawn(refusal: Option<&'static str>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (peer_tx, peers) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let peer_tx = peer_tx.clone();
                tokio::spawn(serve_peer(stream, peer_tx, refusal));
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            peers,
        }
    }

    async fn next_peer(&mut self) -> Peer {
        tokio::time::timeout(WAIT, self.peers.recv())
            .await
            .expect("timed out waiting for a client")
            .expect("server stopped")
    }

    async fn assert_no_peer(&mut self) {
        let extra = tokio::time::timeout(Duration::from_millis(300), self.peers.recv()).await;
        assert!(extra.is_err(), "unexpected second connection");
    }
}

async fn serve_peer(
    stream: tokio::net::TcpStream,
    peer_tx: mpsc::UnboundedSender<Peer>,
    refusal: Option<&'static str>,
) {
    let mut seen = (None, None);
    let callback = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        seen.0 = req
            .headers()
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        seen.1 = req.uri().query().map(String::from);
        Ok(resp)
    };
    let Ok(mut ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await else {
        return;
    };

    ws.send(Message::Text(OPEN_FRAME.into())).await.unwrap();
    match ws.next().await {
        Some(Ok(Message::Text(text))) => assert_eq!(text.as_str(), "40"),
        other => panic!("expected namespace connect, got {other:?}"),
    }
    let answer = refusal.unwrap_or(r#"40{"sid":"sio-1"}"#);
    ws.send(Message::Text(answer.into())).await.unwrap();

    let (commands, mut command_rx) = mpsc::unbounded_channel();
    let (client_tx, from_client) = mpsc::unbounded_channel();
    let _ = peer_tx.send(Peer {
        authorization: seen.0,
        query: seen.1,
        commands,
        from_client,
    });

    loop {
        tokio::select! {
            cmd = command_rx.recv() => match cmd {
                Some(ServerCmd::Frame(frame)) => {
                    if ws.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                Some(ServerCmd::Close) | None => {
                    let _ = ws.close(None).await;
                    break;
                }
            },
            msg = ws.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    let _ = client_tx.send(text.as_str().to_owned());
                }
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }
}

// =========================================================================
// Helpers
// =========================================================================

fn logged_in_session() -> (SessionManager, String) {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let token = codec::encode_unsigned(&json!({
        "id": "admin-1",
        "role": "admin",
        "exp": now + 3600,
    }));
    let session = SessionManager::in_memory();
    session
        .save_session(&token, &codec::decode(&token).unwrap())
        .unwrap();
    (session, token)
}

async fn wait_for(
    reader: &mut PresenceReader,
    pred: impl Fn(&PresenceState) -> bool,
) -> PresenceState {
    tokio::time::timeout(WAIT, async {
        loop {
            let state = reader.snapshot_and_mark_seen();
            if pred(&state) {
                return state;
            }
            assert!(reader.changed().await, "presence channel dropped");
        }
    })
    .await
    .expect("timed out waiting for presence state")
}

async fn connected_channel(
    server: &mut MockServer,
    session: SessionManager,
) -> (PresenceChannel, PresenceReader, Peer) {
    let channel = PresenceChannel::new(&server.base_url, session).unwrap();
    let mut reader = channel.subscribe();
    assert_eq!(channel.connect(), ConnectOutcome::Started);
    let peer = server.next_peer().await;
    wait_for(&mut reader, PresenceState::is_connected).await;
    (channel, reader, peer)
}

// =========================================================================
// Connect
// =========================================================================

#[tokio::test]
async fn test_connect_presents_token_in_header_and_query() {
    let mut server = MockServer::start().await;
    let (session, token) = logged_in_session();

    let (channel, _reader, peer) = connected_channel(&mut server, session).await;

    assert_eq!(peer.authorization, Some(format!("Bearer {token}")));
    assert_eq!(
        peer.query,
        Some(format!("EIO=4&transport=websocket&token={token}"))
    );
    assert_eq!(channel.status(), ChannelStatus::Connected);
}

#[tokio::test]
async fn test_connect_twice_makes_no_second_attempt() {
    let mut server = MockServer::start().await;
    let (session, _) = logged_in_session();
    let (channel, _reader, _peer) = connected_channel(&mut server, session).await;
    let before = channel.snapshot();

    assert_eq!(channel.connect(), ConnectOutcome::AlreadyActive);

    server.assert_no_peer().await;
    assert_eq!(channel.snapshot(), before);
}

#[tokio::test]
async fn test_connect_without_token_never_dials() {
    let mut server = MockServer::start().await;
    let channel = PresenceChannel::new(&server.base_url, SessionManager::in_memory()).unwrap();

    assert_eq!(channel.connect(), ConnectOutcome::NoToken);

    server.assert_no_peer().await;
    assert_eq!(channel.status(), ChannelStatus::Disconnected);
}

// =========================================================================
// Snapshots
// =========================================================================

#[tokio::test]
async fn test_partial_snapshot_keeps_previous_counts() {
    let mut server = MockServer::start().await;
    let (session, _) = logged_in_session();
    let (_channel, mut reader, peer) = connected_channel(&mut server, session).await;

    peer.push(r#"42["online_stats",{"users":3,"doctors":1}]"#);
    peer.push(r#"42["online_stats",{"users":5}]"#);

    let state = wait_for(&mut reader, |s| s.user_count == 5).await;
    assert_eq!(state.doctor_count, 1);
}

#[tokio::test]
async fn test_snapshot_id_lists_and_unrelated_events() {
    let mut server = MockServer::start().await;
    let (session, _) = logged_in_session();
    let (_channel, mut reader, peer) = connected_channel(&mut server, session).await;

    peer.push(r#"42["chat_message",{"text":"hi"}]"#);
    peer.push("not a frame");
    peer.push(concat!(
        r#"42["online_stats","#,
        r#"{"users":2,"doctors":1,"userIds":["u1","u2"],"doctorIds":["d1"]}]"#
    ));

    let state = wait_for(&mut reader, |s| s.user_count == 2).await;
    assert_eq!(state.user_ids, vec!["u1".to_string(), "u2".to_string()]);
    assert_eq!(state.doctor_ids, vec!["d1".to_string()]);
    assert!(state.is_connected());
}

#[tokio::test]
async fn test_ping_is_answered_with_pong() {
    let mut server = MockServer::start().await;
    let (session, _) = logged_in_session();
    let (_channel, _reader, mut peer) = connected_channel(&mut server, session).await;

    peer.push("2");

    assert_eq!(peer.next_frame().await.as_deref(), Some("3"));
}

// =========================================================================
// Disconnect
// =========================================================================

#[tokio::test]
async fn test_server_disconnect_keeps_last_counts() {
    let mut server = MockServer::start().await;
    let (session, _) = logged_in_session();
    let (channel, mut reader, peer) = connected_channel(&mut server, session).await;

    peer.push(r#"42["online_stats",{"users":4,"doctors":2}]"#);
    wait_for(&mut reader, |s| s.user_count == 4).await;
    peer.push("41");

    let state = wait_for(&mut reader, |s| s.status == ChannelStatus::Disconnected).await;
    assert_eq!(state.user_count, 4);
    assert_eq!(state.doctor_count, 2);

    // The socket task has ended, so a fresh connect dials again.
    let outcome = tokio::time::timeout(WAIT, async {
        loop {
            match channel.connect() {
                ConnectOutcome::AlreadyActive => tokio::task::yield_now().await,
                outcome => return outcome,
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(outcome, ConnectOutcome::Started);
    server.next_peer().await;
}

#[tokio::test]
async fn test_disconnect_resets_state_and_is_idempotent() {
    let mut server = MockServer::start().await;
    let (session, _) = logged_in_session();
    let (channel, mut reader, mut peer) = connected_channel(&mut server, session).await;
    peer.push(r#"42["online_stats",{"users":3,"doctors":1}]"#);
    wait_for(&mut reader, |s| s.user_count == 3).await;

    channel.disconnect().await;

    assert_eq!(channel.snapshot(), PresenceState::default());
    assert!(!reader.is_connected());
    assert_eq!(peer.next_frame().await.as_deref(), Some("41"));

    channel.disconnect().await;
    assert_eq!(channel.status(), ChannelStatus::Disconnected);
}

#[tokio::test]
async fn test_connect_error_closes_socket_and_allows_new_connect() {
    let mut server = MockServer::refusing(r#"44{"message":"Invalid token"}"#).await;
    let (session, _) = logged_in_session();
    let channel = PresenceChannel::new(&server.base_url, session).unwrap();
    let mut reader = channel.subscribe();

    assert_eq!(channel.connect(), ConnectOutcome::Started);
    let mut peer = server.next_peer().await;

    let state = wait_for(&mut reader, |s| s.status == ChannelStatus::Disconnected).await;
    assert!(!state.is_connected());
    // The client hangs up; the server never closes the socket itself.
    assert_eq!(peer.next_frame().await, None);

    let outcome = tokio::time::timeout(WAIT, async {
        loop {
            match channel.connect() {
                ConnectOutcome::AlreadyActive => tokio::task::yield_now().await,
                outcome => return outcome,
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(outcome, ConnectOutcome::Started);
    server.next_peer().await;
}

#[tokio::test]
async fn test_connect_error_is_not_redialed() {
    let mut server = MockServer::refusing(r#"44{"message":"Invalid token"}"#).await;
    let (session, _) = logged_in_session();
    let policy = ReconnectPolicy {
        max_attempts: 5,
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(20),
    };
    let channel =
        PresenceChannel::with_options(&server.base_url, "/socket.io/", session, policy).unwrap();
    let mut reader = channel.subscribe();
    channel.connect();

    server.next_peer().await;
    wait_for(&mut reader, |s| s.status == ChannelStatus::Disconnected).await;
    server.assert_no_peer().await;
}

// =========================================================================
// Reconnect
// =========================================================================

#[tokio::test]
async fn test_reconnect_policy_redials_after_server_close() {
    let mut server = MockServer::start().await;
    let (session, _) = logged_in_session();
    let policy = ReconnectPolicy {
        max_attempts: 3,
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(50),
    };
    let channel =
        PresenceChannel::with_options(&server.base_url, "/socket.io/", session, policy).unwrap();
    let mut reader = channel.subscribe();
    channel.connect();

    let first = server.next_peer().await;
    wait_for(&mut reader, PresenceState::is_connected).await;
    first.close();

    let second = server.next_peer().await;
    second.push(r#"42["online_stats",{"users":1}]"#);
    let state = wait_for(&mut reader, |s| s.is_connected() && s.user_count == 1).await;
    assert_eq!(state.status, ChannelStatus::Connected);

    channel.disconnect().await;
}

#[tokio::test]
async fn test_reconnect_stops_when_session_cleared() {
    let mut server = MockServer::start().await;
    let (session, _) = logged_in_session();
    let policy = ReconnectPolicy {
        max_attempts: 5,
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(20),
    };
    let channel = PresenceChannel::with_options(
        &server.base_url,
        "/socket.io/",
        session.clone(),
        policy,
    )
    .unwrap();
    let mut reader = channel.subscribe();
    channel.connect();

    let first = server.next_peer().await;
    wait_for(&mut reader, PresenceState::is_connected).await;
    session.clear_session().unwrap();
    first.close();

    wait_for(&mut reader, |s| s.status == ChannelStatus::Disconnected).await;
    server.assert_no_peer().await;
}
