//! Real-time WebSocket gateway.
//!
//! A connection follows its user's topic from the start and a session's
//! topic after each successful `join_session`. Inbound messages are
//! handled one at a time in arrival order; outbound traffic is funnelled
//! through a single writer task.

pub mod channels;
pub mod handlers;
pub mod locks;
pub mod messages;

use std::collections::HashSet;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use self::channels::{session_topic, user_topic};
use self::messages::{ClientMessage, ServerMessage};
use crate::identity::Actor;
use crate::state::AppState;

/// Outbound messages queued per connection before senders wait.
const OUTBOUND_BUFFER: usize = 64;

/// GET /ws
#[instrument(skip(state, upgrade), fields(actor_id = %actor.user_id))]
async fn upgrade(State(state): State<AppState>, actor: Actor, upgrade: WebSocketUpgrade) -> Response {
    info!("websocket upgrade accepted");
    upgrade.on_upgrade(move |socket| serve_socket(socket, state, actor))
}

async fn serve_socket(socket: WebSocket, state: AppState, actor: Actor) {
    let (mut sink, mut stream) = socket.split();
    let (outbound, mut queue) = mpsc::channel::<ServerMessage>(OUTBOUND_BUFFER);

    let writer = tokio::spawn(async move {
        while let Some(message) = queue.recv().await {
            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "dropping unserializable message");
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let mut forwarders = JoinSet::new();
    forwarders.spawn(forward(
        state.hub.subscribe(&user_topic(&actor.user_id)),
        outbound.clone(),
    ));
    let mut joined: HashSet<String> = HashSet::new();

    while let Some(frame) = stream.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!(actor_id = %actor.user_id, error = %e, "websocket read failed");
                break;
            }
        };

        let message = match serde_json::from_str::<ClientMessage>(text.as_str()) {
            Ok(message) => message,
            Err(e) => {
                let error = ServerMessage::error("invalid_message", e.to_string());
                if outbound.send(error).await.is_err() {
                    break;
                }
                continue;
            }
        };

        let dispatch = handlers::dispatch(&state, &actor, message).await;
        if let Some(session_id) = dispatch.joined {
            if joined.insert(session_id.clone()) {
                forwarders.spawn(forward(
                    state.hub.subscribe(&session_topic(&session_id)),
                    outbound.clone(),
                ));
            }
        }
        if let Some(reply) = dispatch.reply {
            if outbound.send(reply).await.is_err() {
                break;
            }
        }
    }

    forwarders.abort_all();
    drop(outbound);
    if let Err(e) = writer.await {
        warn!(actor_id = %actor.user_id, error = %e, "websocket writer failed");
    }
    info!(actor_id = %actor.user_id, sessions = joined.len(), "websocket closed");
}

/// Copies one topic into a connection's outbound queue until either side
/// goes away.
async fn forward(
    mut topic: broadcast::Receiver<ServerMessage>,
    outbound: mpsc::Sender<ServerMessage>,
) {
    loop {
        match topic.recv().await {
            Ok(message) => {
                if outbound.send(message).await.is_err() {
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "slow websocket subscriber skipped messages");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// Returns the gateway router.
pub fn router() -> Router<AppState> {
    Router::new().route("/ws", get(upgrade))
}
