// WebSocket transport between the dashboard client and the app event loop.

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{info, warn};

/// Events emitted by the WebSocket server to the application layer.
#[derive(Debug, PartialEq)]
pub enum WsEvent {
    /// A new dashboard client has connected.
    Connected { addr: String },
    /// The current dashboard client has disconnected.
    Disconnected,
    /// A text request was received from the client (raw JSON string).
    Request(String),
}

/// Run the WebSocket server on the given port.
///
/// Binds `127.0.0.1:{port}` and serves one dashboard connection at a time.
/// Inbound text frames are forwarded through `event_tx`; replies arriving on
/// `reply_rx` are written back to the connected client. Replies that arrive
/// while no client is connected stay queued in the channel and are delivered
/// to the next client that connects.
pub async fn run(
    port: u16,
    event_tx: mpsc::Sender<WsEvent>,
    mut reply_rx: mpsc::Receiver<String>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(format!("127.0.0.1:{port}")).await?;
    let local_addr = listener.local_addr()?;
    info!("WebSocket server listening on {local_addr}");

    loop {
        let (stream, addr) = listener.accept().await?;
        let addr_str = addr.to_string();
        info!("Accepted TCP connection from {addr_str}");

        let ws_stream = match tokio_tungstenite::accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                warn!("WebSocket handshake failed for {addr_str}: {e}");
                continue;
            }
        };

        if event_tx
            .send(WsEvent::Connected {
                addr: addr_str.clone(),
            })
            .await
            .is_err()
        {
            break;
        }

        let (write, read) = ws_stream.split();
        if serve_client(read, write, &event_tx, &mut reply_rx, &addr_str)
            .await
            .is_err()
        {
            break;
        }

        if event_tx.send(WsEvent::Disconnected).await.is_err() {
            break;
        }
    }

    Ok(())
}

/// Drive one client connection in both directions: forward inbound text
/// frames as [`WsEvent::Request`] and write queued replies to the sink.
///
/// Returns `Ok(())` when the client goes away (close frame, socket error, or
/// end of stream) and `Err(())` when the app side hung up (event channel or
/// reply channel closed), signalling the caller to stop accepting.
///
/// Generic over the sink and stream types so it can be tested with in-memory
/// streams without opening TCP ports.
pub async fn serve_client<R, W>(
    mut read: R,
    mut write: W,
    event_tx: &mpsc::Sender<WsEvent>,
    reply_rx: &mut mpsc::Receiver<String>,
    addr: &str,
) -> Result<(), ()>
where
    R: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
    W: Sink<Message> + Unpin,
{
    loop {
        tokio::select! {
            inbound = read.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    if event_tx
                        .send(WsEvent::Request(text.to_string()))
                        .await
                        .is_err()
                    {
                        return Err(());
                    }
                }
                Some(Ok(Message::Close(_))) => {
                    info!("Client {addr} sent close frame");
                    return Ok(());
                }
                Some(Ok(_)) => {
                    // Ignore Binary, Ping, Pong, Frame variants.
                }
                Some(Err(e)) => {
                    warn!("WebSocket error from {addr}: {e}");
                    return Ok(());
                }
                None => return Ok(()),
            },
            reply = reply_rx.recv() => match reply {
                Some(json) => {
                    if write.send(Message::Text(json.into())).await.is_err() {
                        warn!("Failed to write reply to {addr}");
                        return Ok(());
                    }
                }
                None => return Err(()),
            },
        }
    }
}
