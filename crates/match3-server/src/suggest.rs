//! Suggestion sources backed by async tasks.
//!
//! Both sources return immediately and deliver their answer through a
//! oneshot channel once the spawned task finishes. Every failure is turned
//! into a `SuggestionError` on that channel.

use crate::protocol::{ClientMessage, ServerMessage};
use futures_util::{SinkExt, StreamExt};
use match3_core::suggestion::answer;
use match3_core::{SuggestionError, SuggestionRequest, SuggestionResult, SuggestionSource};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::debug;

fn without_runtime(tx: oneshot::Sender<SuggestionResult>) {
    let _ = tx.send(Err(SuggestionError::Unavailable(
        "no async runtime".to_string(),
    )));
}

/// Answers on a blocking worker thread with the greedy heuristic
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalSuggestionSource;

impl SuggestionSource for LocalSuggestionSource {
    fn request(&mut self, request: SuggestionRequest) -> oneshot::Receiver<SuggestionResult> {
        let (tx, rx) = oneshot::channel();
        let Ok(handle) = Handle::try_current() else {
            without_runtime(tx);
            return rx;
        };

        handle.spawn_blocking(move || {
            let _ = tx.send(answer(&request));
        });
        rx
    }
}

/// Asks a suggestion service over WebSocket
#[derive(Debug, Clone)]
pub struct RemoteSuggestionSource {
    url: String,
    timeout: Duration,
}

impl RemoteSuggestionSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }
}

impl SuggestionSource for RemoteSuggestionSource {
    fn request(&mut self, request: SuggestionRequest) -> oneshot::Receiver<SuggestionResult> {
        let (tx, rx) = oneshot::channel();
        let Ok(handle) = Handle::try_current() else {
            without_runtime(tx);
            return rx;
        };

        let url = self.url.clone();
        let timeout = self.timeout;
        handle.spawn(async move {
            let result = match tokio::time::timeout(timeout, fetch(&url, request)).await {
                Ok(result) => result,
                Err(_) => Err(SuggestionError::Unavailable(format!(
                    "no answer from {} within {}ms",
                    url,
                    timeout.as_millis()
                ))),
            };
            debug!(%url, ok = result.is_ok(), "Remote suggestion finished");
            let _ = tx.send(result);
        });
        rx
    }
}

/// One request/response exchange with a suggestion service
async fn fetch(url: &str, request: SuggestionRequest) -> SuggestionResult {
    let transport = |e: tokio_tungstenite::tungstenite::Error| SuggestionError::Transport(e.to_string());

    let (mut ws, _) = connect_async(url).await.map_err(transport)?;

    let text = serde_json::to_string(&ClientMessage::Suggest { request })
        .map_err(|e| SuggestionError::Malformed(e.to_string()))?;
    ws.send(Message::Text(text)).await.map_err(transport)?;

    while let Some(msg) = ws.next().await {
        match msg.map_err(transport)? {
            Message::Text(text) => match serde_json::from_str::<ServerMessage>(&text) {
                Ok(ServerMessage::Suggestion { result }) => {
                    let _ = ws.close(None).await;
                    return result;
                }
                Ok(ServerMessage::Error { message }) => {
                    return Err(SuggestionError::Unavailable(message));
                }
                // Welcome, snapshots and the like are not for us
                Ok(_) => continue,
                Err(e) => return Err(SuggestionError::Malformed(e.to_string())),
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    Err(SuggestionError::Transport(
        "connection closed before an answer arrived".to_string(),
    ))
}
