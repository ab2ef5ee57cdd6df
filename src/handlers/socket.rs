// GET /ws?token=... WebSocket session

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, error, warn};
use warp::ws::{Message, WebSocket};

use crate::models::ServerEvent;
use crate::session::{Connection, ConnectionHandler, Flow};

#[derive(Debug, Default, Deserialize)]
pub struct SocketParams {
    pub token: Option<String>,
}

/// Drive one socket from handshake to close.
///
/// Outbound events go through an unbounded queue drained by a writer task,
/// inbound frames are handled one at a time in arrival order.
pub async fn socket_session(socket: WebSocket, token: Option<String>, handler: ConnectionHandler) {
    let (mut sink, mut stream) = socket.split();

    let (tx, rx) = mpsc::unbounded_channel::<ServerEvent>();
    let mut outbound = UnboundedReceiverStream::new(rx);

    let writer = tokio::spawn(async move {
        while let Some(event) = outbound.next().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    error!(error = %e, "failed to encode outbound event");
                    continue;
                }
            };
            if let Err(e) = sink.send(Message::text(text)).await {
                debug!(error = %e, "socket write failed");
                break;
            }
        }
        // Queue closed: every notice is flushed, so close the socket
        let _ = sink.close().await;
    });

    let conn = Connection::new(tx);

    if handler.connect(&conn, token.as_deref()).await == Flow::Continue {
        while let Some(frame) = stream.next().await {
            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(connection_id = %conn.id(), error = %e, "socket read failed");
                    break;
                }
            };

            if frame.is_close() {
                break;
            }
            // Pings, pongs and binary frames carry no events
            let Ok(text) = frame.to_str() else {
                continue;
            };

            if handler.handle_frame(&conn, text).await == Flow::Close {
                break;
            }
        }
    }

    handler.disconnect(&conn);
    drop(conn);

    if let Err(e) = writer.await {
        error!(error = %e, "socket writer task failed");
    }
}
