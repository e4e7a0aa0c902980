use crate::app::AppState;
use crate::room::RoomCommand;
use crate::signaling::{Outgoing, SessionId};
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use liveroom_core::{SignalBody, SignalMessage};
use std::sync::{Arc, OnceLock};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let session = SessionId::new();
    info!("New WebSocket connection: {}", session);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();
    state.signaling.add_session(session, tx);

    // A session joins at most one room
    let room: Arc<OnceLock<mpsc::Sender<RoomCommand>>> = Arc::new(OnceLock::new());

    let mut send_task = tokio::spawn(async move {
        while let Some(out) = rx.recv().await {
            let frame = match out {
                Outgoing::Text(text) => Message::Text(text.into()),
                Outgoing::Close => {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            };
            if sender.send(frame).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let state = state.clone();
        let room = room.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => match SignalMessage::decode(text.as_str()) {
                        Ok(signal) => {
                            if !route(&state, session, &room, signal).await {
                                break;
                            }
                        }
                        Err(e) => warn!("Invalid message from {}: {}", session, e),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    if let Some(room) = room.get() {
        let _ = room.send(RoomCommand::Disconnect { session }).await;
    }
    state.signaling.remove_session(&session);
    info!("WebSocket disconnected: {}", session);
}

/// Returns false once the room actor is gone.
async fn route(
    state: &AppState,
    session: SessionId,
    room: &OnceLock<mpsc::Sender<RoomCommand>>,
    msg: SignalMessage,
) -> bool {
    let kind = msg.kind();
    let join = match &msg.body {
        SignalBody::CreateRoom { username } => Some((username.clone(), true)),
        SignalBody::Join { username } => Some((username.clone(), false)),
        _ => None,
    };

    let Some((username, create)) = join else {
        let Some(tx) = room.get() else {
            debug!("Dropping `{}` from {}: not in a room yet", kind, session);
            return true;
        };
        if let Err(e) = tx.send(RoomCommand::Signal { session, msg }).await {
            error!("Room died: {}", e);
            return false;
        }
        return true;
    };

    if room.get().is_some() {
        warn!("{} is already in a room, ignoring `{}`", session, kind);
        return true;
    }
    let Some(room_id) = msg.room_id else {
        warn!("`{}` from {} without a room id", kind, session);
        return true;
    };

    let tx = state.rooms.get_room_sender(&room_id);
    let cmd = RoomCommand::Join {
        session,
        user_id: msg.from,
        username,
        create,
    };
    if let Err(e) = tx.send(cmd).await {
        error!("Room {} died: {}", room_id, e);
        return false;
    }
    let _ = room.set(tx);
    true
}
