use anyhow::{Context, Result, bail};
use futures::{SinkExt, StreamExt};
use liveroom_core::{RoomId, SignalBody, SignalMessage};
use liveroom_server::{AppState, DEFAULT_WS_PATH, router};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::room_helpers::{ROOM, SIGNAL_TIMEOUT_MS, id};

/// Starts a relay on an ephemeral port and returns its WebSocket URL.
pub async fn spawn_relay() -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = router(AppState::new(), DEFAULT_WS_PATH);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("ws://{addr}{DEFAULT_WS_PATH}"))
}

/// Raw WebSocket client speaking the signaling wire format.
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    pub async fn connect(url: &str) -> Result<Self> {
        let (stream, _) = connect_async(url).await.context("connect to relay")?;
        Ok(Self { stream })
    }

    /// Connects and joins `ROOM` as `user`, returning after `join-success`.
    pub async fn join(url: &str, user: &str) -> Result<(Self, SignalMessage)> {
        let mut client = Self::connect(url).await?;
        client
            .send(
                SignalMessage::new(SignalBody::Join {
                    username: Some(format!("name-{user}")),
                })
                .sent_by(id(user))
                .in_room(RoomId::from(ROOM)),
            )
            .await?;
        let success = client.expect("join-success").await?;
        Ok((client, success))
    }

    pub async fn send(&mut self, msg: SignalMessage) -> Result<()> {
        let json = msg.encode()?;
        self.stream.send(Message::Text(json.into())).await?;
        Ok(())
    }

    /// Next signaling message, or `None` once the relay closed the socket.
    pub async fn recv(&mut self) -> Result<Option<SignalMessage>> {
        loop {
            let next = timeout(Duration::from_millis(SIGNAL_TIMEOUT_MS), self.stream.next())
                .await
                .context("timed out waiting for the relay")?;
            match next {
                Some(Ok(Message::Text(text))) => return Ok(Some(SignalMessage::decode(text.as_str())?)),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue,
                Some(Err(e)) => bail!("socket error: {e}"),
            }
        }
    }

    /// Skips messages until one of `kind` arrives.
    pub async fn expect(&mut self, kind: &str) -> Result<SignalMessage> {
        loop {
            match self.recv().await? {
                Some(msg) if msg.kind() == kind => return Ok(msg),
                Some(_) => continue,
                None => bail!("relay closed the socket while waiting for `{kind}`"),
            }
        }
    }

    pub async fn close(mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}
