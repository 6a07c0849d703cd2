//! WebSocket upgrade handler for phone controllers and screens

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{keys, ControlInput, Profile};
use crate::sync::PeerId;
use crate::util::rate_limit::ControllerRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Peer id handed out by an earlier `welcome`, to resume after a drop
    pub peer_id: Option<Uuid>,
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    /// Controller said goodbye
    Left,
    /// Socket went away; the seat is kept for the grace period
    Dropped,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    let resume = query.peer_id.filter(|peer| state.presence.is_known(*peer));
    if let (Some(requested), None) = (query.peer_id, resume) {
        info!(peer_id = %requested, "Resume requested for unknown peer, assigning a new id");
    }

    ws.on_upgrade(move |socket| handle_socket(socket, resume, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, resume: Option<PeerId>, state: AppState) {
    let peer_id = resume.unwrap_or_else(Uuid::new_v4);
    let generation = state.presence.connect(peer_id);
    info!(peer_id = %peer_id, resumed = resume.is_some(), "New WebSocket connection");

    let (mut ws_sink, ws_stream) = socket.split();

    let welcome = ServerMsg::Welcome {
        peer_id,
        server_time: unix_millis(),
        resumed: resume.is_some(),
    };

    if let Err(e) = send_msg(&mut ws_sink, &welcome).await {
        error!(peer_id = %peer_id, error = %e, "Failed to send welcome");
        schedule_release(state, peer_id, generation);
        return;
    }

    match run_session(peer_id, &state, ws_sink, ws_stream).await {
        SessionEnd::Left => {
            state.presence.release(peer_id, generation);
            if let Err(e) = state.room.quit(peer_id).await {
                warn!(peer_id = %peer_id, error = %e, "Failed to release seat");
            }
        }
        SessionEnd::Dropped => schedule_release(state, peer_id, generation),
    }

    info!(peer_id = %peer_id, "WebSocket connection closed");
}

/// Quit the peer once its grace period runs out, unless a newer socket took
/// it over.
fn schedule_release(state: AppState, peer_id: PeerId, generation: u64) {
    let grace = state.config.room.reconnect_grace;
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;

        if !state.presence.release(peer_id, generation) {
            debug!(peer_id = %peer_id, "Controller resumed within grace");
            return;
        }

        match state.room.quit(peer_id).await {
            Ok(true) => info!(peer_id = %peer_id, "Controller did not return, seat released"),
            Ok(false) => {}
            Err(e) => warn!(peer_id = %peer_id, error = %e, "Failed to release seat"),
        }
    });
}

/// Run the WebSocket session with read/write split
async fn run_session(
    peer_id: PeerId,
    state: &AppState,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut ws_stream: SplitStream<WebSocket>,
) -> SessionEnd {
    let rate_limiter = ControllerRateLimiter::new();
    let mut input = state
        .room
        .controller_replica(peer_id)
        .declare(keys::INPUT, ControlInput::default());

    let (direct_tx, mut direct_rx) = mpsc::channel::<ServerMsg>(16);
    let mut frame_rx = state.room.subscribe();

    // Spawn writer task: replies and room frames -> WebSocket
    let writer_handle = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                direct = direct_rx.recv() => match direct {
                    Some(msg) => msg,
                    None => break,
                },
                frame = frame_rx.recv() => match frame {
                    Ok(msg) => msg,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(peer_id = %peer_id, lagged_count = n, "Socket lagged, skipping frames");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!(peer_id = %peer_id, "Frame channel closed");
                        break;
                    }
                },
            };

            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(peer_id = %peer_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    let mut end = SessionEnd::Dropped;

    // Reader loop: WebSocket -> room / input field
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let msg = serde_json::from_str::<ClientMsg>(&text);
                if let Ok(msg) = &msg {
                    if !admit(&rate_limiter, msg) {
                        warn!(peer_id = %peer_id, "Rate limited controller input");
                        continue;
                    }
                }

                match msg {
                    Ok(ClientMsg::Join { name, color, photo }) => {
                        let reply = match state.room.join(peer_id, Profile { name, color, photo }).await {
                            Ok(weapon) => ServerMsg::Joined { peer_id, weapon },
                            Err(e) => {
                                warn!(peer_id = %peer_id, error = %e, "Join rejected");
                                ServerMsg::error(e.code(), e.to_string())
                            }
                        };

                        if direct_tx.send(reply).await.is_err() {
                            debug!(peer_id = %peer_id, "Writer task gone");
                            break;
                        }
                    }
                    Ok(ClientMsg::Input { angle, moving, firing }) => {
                        input.write(&ControlInput {
                            angle: angle.filter(|a| a.is_finite()),
                            moving,
                            firing,
                        });
                    }
                    Ok(ClientMsg::Ping { t }) => {
                        let _ = direct_tx.send(ServerMsg::Pong { t }).await;
                    }
                    Ok(ClientMsg::Leave) => {
                        info!(peer_id = %peer_id, "Controller left");
                        end = SessionEnd::Left;
                        break;
                    }
                    Err(e) => {
                        warn!(peer_id = %peer_id, error = %e, "Failed to parse client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(peer_id = %peer_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) => {
                debug!(peer_id = %peer_id, "Received ping");
            }
            Ok(Message::Pong(_)) => {
                debug!(peer_id = %peer_id, "Received pong");
            }
            Ok(Message::Close(_)) => {
                info!(peer_id = %peer_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(peer_id = %peer_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Combatant stands still while nobody holds the stick
    input.write(&ControlInput::default());

    writer_handle.abort();
    end
}

/// Send a message over WebSocket
async fn send_msg(sink: &mut SplitSink<WebSocket, Message>, msg: &ServerMsg) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json)).await.map_err(|e| e.to_string())
}

/// Only input frames count against the socket's budget
fn admit(limiter: &ControllerRateLimiter, msg: &ClientMsg) -> bool {
    !matches!(msg, ClientMsg::Input { .. }) || limiter.check_input()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::rate_limit::INPUT_RATE_LIMIT;

    #[test]
    fn test_exhausted_budget_still_admits_leave_and_join() {
        let limiter = ControllerRateLimiter::new();
        let input = ClientMsg::Input {
            angle: Some(0.0),
            moving: true,
            firing: false,
        };
        while admit(&limiter, &input) {}
        assert!(!limiter.check_input());

        assert!(admit(&limiter, &ClientMsg::Leave));
        assert!(admit(&limiter, &ClientMsg::Ping { t: 1 }));
        assert!(admit(
            &limiter,
            &ClientMsg::Join {
                name: "Ana".into(),
                color: "#fff".into(),
                photo: None,
            }
        ));
    }

    #[test]
    fn test_input_burst_is_capped() {
        let limiter = ControllerRateLimiter::new();
        let input = ClientMsg::Input {
            angle: None,
            moving: false,
            firing: true,
        };
        let admitted = (0..INPUT_RATE_LIMIT * 2).filter(|_| admit(&limiter, &input)).count();
        assert!(admitted >= INPUT_RATE_LIMIT as usize);
        assert!(admitted < 2 * INPUT_RATE_LIMIT as usize);
    }
}
