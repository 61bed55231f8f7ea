//! WebSocket server and connection handling.

use crate::config::ServerConfig;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::session::{PlayerSession, SessionError, SuggestionBackend};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use match3_core::suggestion::answer_within;
use match3_core::SuggestionRequest;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Server state shared across all connections.
pub struct ServerState {
    pub config: ServerConfig,
    /// All live sessions, one per connection
    pub sessions: DashMap<Uuid, PlayerSession>,
    /// Mapping from session ID to its outgoing message queue
    pub senders: DashMap<Uuid, mpsc::UnboundedSender<ServerMessage>>,
}

impl ServerState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            sessions: DashMap::new(),
            senders: DashMap::new(),
        }
    }

    pub fn suggestion_backend(&self) -> SuggestionBackend {
        match &self.config.suggestion_url {
            Some(url) => SuggestionBackend::Remote {
                url: url.clone(),
                timeout: self.config.suggestion_timeout,
            },
            None => SuggestionBackend::Local,
        }
    }

    /// Send a message to a specific session.
    pub fn send_to(&self, session_id: Uuid, msg: ServerMessage) {
        if let Some(sender) = self.senders.get(&session_id) {
            let _ = sender.send(msg);
        }
    }

    /// Create a session for a new connection
    pub fn open_session(&self, session_id: Uuid) -> Result<(), SessionError> {
        let mut session =
            PlayerSession::new(session_id, self.config.game.clone(), self.suggestion_backend())?;
        let snapshot = session.snapshot();
        self.sessions.insert(session_id, session);
        self.send_to(session_id, snapshot);
        Ok(())
    }

    pub fn close_session(&self, session_id: Uuid) {
        self.sessions.remove(&session_id);
        self.senders.remove(&session_id);
    }

    /// Route a client message to its session and send the replies.
    pub fn handle_message(&self, session_id: Uuid, msg: ClientMessage) {
        if let ClientMessage::Suggest { request } = msg {
            self.suggest(session_id, request);
            return;
        }

        let result = match self.sessions.get_mut(&session_id) {
            Some(mut session) => session.handle_message(msg),
            None => Err(SessionError::NotFound),
        };

        match result {
            Ok(replies) => {
                for reply in replies {
                    self.send_to(session_id, reply);
                }
            }
            Err(e) => {
                debug!(session = %session_id, error = %e, "Message rejected");
                self.send_to(session_id, ServerMessage::error(e));
            }
        }
    }

    /// Answer a suggestion request on a blocking worker, outside any session lock.
    ///
    /// Boards larger than the configured grid are rejected before the search.
    fn suggest(&self, session_id: Uuid, request: SuggestionRequest) {
        let Some(sender) = self.senders.get(&session_id).map(|s| s.value().clone()) else {
            return;
        };
        let (columns, rows) = (self.config.game.columns, self.config.game.rows);

        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || {
                    let result = answer_within(&request, columns, rows);
                    let _ = sender.send(ServerMessage::Suggestion { result });
                });
            }
            Err(_) => {
                let result = answer_within(&request, columns, rows);
                let _ = sender.send(ServerMessage::Suggestion { result });
            }
        }
    }

    /// Advance every session by `dt` seconds.
    pub fn tick_all(&self, dt: f64) {
        let mut outgoing = Vec::new();
        for mut entry in self.sessions.iter_mut() {
            let id = *entry.key();
            for msg in entry.value_mut().tick(dt) {
                outgoing.push((id, msg));
            }
        }

        for (id, msg) in outgoing {
            self.send_to(id, msg);
        }
    }
}

/// Run the WebSocket server.
pub async fn run_server(state: Arc<ServerState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(state.config.addr).await?;
    info!("Match3 server listening on {}", state.config.addr);
    serve(listener, state).await
}

/// Accept connections on an already bound listener.
pub async fn serve(listener: TcpListener, state: Arc<ServerState>) -> anyhow::Result<()> {
    tokio::spawn(tick_loop(Arc::clone(&state)));

    while let Ok((stream, peer_addr)) = listener.accept().await {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }

    Ok(())
}

/// Drive all sessions on a fixed cadence using measured wall time.
async fn tick_loop(state: Arc<ServerState>) {
    let mut interval = tokio::time::interval(state.config.tick);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut last = Instant::now();

    loop {
        interval.tick().await;
        let now = Instant::now();
        let dt = now.duration_since(last).as_secs_f64();
        last = now;
        state.tick_all(dt);
    }
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<ServerState>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New WebSocket connection from {}", addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let session_id = Uuid::new_v4();

    // Create channel for outgoing messages
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    state.senders.insert(session_id, tx);

    let welcome = ServerMessage::Welcome { session_id };
    let msg_text = serde_json::to_string(&welcome)?;
    ws_sender.send(Message::Text(msg_text)).await?;

    // Spawn task to forward messages from channel to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(text) = serde_json::to_string(&msg) {
                if ws_sender.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
        }
    });

    if let Err(e) = state.open_session(session_id) {
        error!("Failed to start session {}: {}", session_id, e);
        state.send_to(session_id, ServerMessage::error(e));
    }

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => state.handle_message(session_id, client_msg),
                Err(e) => {
                    warn!("Invalid message from {}: {}", session_id, text);
                    state.send_to(
                        session_id,
                        ServerMessage::error(SessionError::InvalidMessage(e.to_string())),
                    );
                }
            },
            Ok(Message::Close(_)) => {
                info!("Client {} closing connection", session_id);
                break;
            }
            Ok(Message::Ping(_)) => {
                state.send_to(session_id, ServerMessage::Pong);
            }
            Err(e) => {
                error!("WebSocket error from {}: {}", session_id, e);
                break;
            }
            _ => {}
        }
    }

    state.close_session(session_id);
    send_task.abort();

    info!("Connection closed for {}", session_id);
    Ok(())
}
