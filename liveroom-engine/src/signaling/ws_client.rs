use crate::signaling::{InboundFrame, OutboundFrame, SignalingChannel};
use anyhow::Context;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{info, warn};

/// Opens a WebSocket to the relay and wires it to a [`SignalingChannel`].
///
/// The returned receiver yields every text frame followed by exactly one
/// [`InboundFrame::Closed`].
pub async fn connect(
    url: &str,
) -> anyhow::Result<(SignalingChannel, mpsc::Receiver<InboundFrame>)> {
    let (stream, _) = connect_async(url)
        .await
        .with_context(|| format!("failed to connect to signaling server at {url}"))?;
    info!("Signaling connected: {}", url);

    let (mut sink, mut source) = stream.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<OutboundFrame>();
    let (in_tx, in_rx) = mpsc::channel::<InboundFrame>(256);

    let channel = SignalingChannel::new(out_tx);

    tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            match frame {
                OutboundFrame::Text(text) => {
                    if let Err(e) = sink.send(Message::Text(text.into())).await {
                        warn!("Signaling write failed: {}", e);
                        break;
                    }
                }
                OutboundFrame::Close => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            }
        }
        let _ = sink.close().await;
    });

    let reader_channel = channel.clone();
    tokio::spawn(async move {
        let mut reason = None;
        while let Some(next) = source.next().await {
            match next {
                Ok(Message::Text(text)) => {
                    if in_tx.send(InboundFrame::Text(text.as_str().to_owned())).await.is_err() {
                        break;
                    }
                }
                Ok(Message::Close(frame)) => {
                    reason = frame.map(|f| f.reason.as_str().to_owned());
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    reason = Some(e.to_string());
                    break;
                }
            }
        }
        reader_channel.mark_closed();
        let _ = in_tx.send(InboundFrame::Closed(reason)).await;
    });

    Ok((channel, in_rx))
}
