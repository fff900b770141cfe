//! WebSocket listener for the Figma plugin

use std::net::SocketAddr;

use eyre::{Context, Result};
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::correlator::CorrelatorHandle;

/// Accepts plugin connections and wires each one into the correlator
pub struct BridgeServer {
    listener: TcpListener,
    correlator: CorrelatorHandle,
    peer_buffer: usize,
}

impl BridgeServer {
    /// Bind the listener (e.g. `127.0.0.1:9876`, or port 0 in tests)
    pub async fn bind(addr: &str, correlator: CorrelatorHandle, peer_buffer: usize) -> Result<Self> {
        debug!(%addr, "BridgeServer::bind: called");
        let listener = TcpListener::bind(addr)
            .await
            .context(format!("Failed to bind bridge socket on {}", addr))?;

        Ok(Self {
            listener,
            correlator,
            peer_buffer: peer_buffer.max(1),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().context("Failed to read bridge address")
    }

    /// Accept connections until the listener fails
    pub async fn run(self) -> Result<()> {
        info!(addr = ?self.listener.local_addr().ok(), "Bridge server listening");

        loop {
            let (stream, remote) = self.listener.accept().await.context("Failed to accept connection")?;
            debug!(%remote, "Accepted TCP connection");

            let correlator = self.correlator.clone();
            let peer_buffer = self.peer_buffer;
            tokio::spawn(async move {
                if let Err(e) = serve_peer(stream, remote, correlator, peer_buffer).await {
                    warn!(%remote, error = %e, "Plugin connection ended with error");
                }
            });
        }
    }
}

/// Drive one plugin connection until it closes
async fn serve_peer(
    stream: TcpStream,
    remote: SocketAddr,
    correlator: CorrelatorHandle,
    peer_buffer: usize,
) -> Result<()> {
    let ws = tokio_tungstenite::accept_async(stream)
        .await
        .context("WebSocket handshake failed")?;
    let (mut writer, mut reader) = ws.split();

    let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(peer_buffer);
    let peer_id = correlator.attach_peer(outbound_tx).await?;
    info!(%remote, peer_id, "Figma plugin connected");

    // Ends when the correlator drops our sender (superseded or shut down)
    let writer_task = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if let Err(e) = writer.send(Message::text(frame)).await {
                warn!(peer_id, error = %e, "Failed to write to plugin");
                break;
            }
        }
        let _ = writer.close().await;
    });

    while let Some(frame) = reader.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                debug!(peer_id, len = text.len(), "Received text frame");
                correlator.deliver(text.as_str()).await?;
            }
            Ok(Message::Binary(bytes)) => match std::str::from_utf8(&bytes) {
                Ok(text) => correlator.deliver(text).await?,
                Err(_) => debug!(peer_id, "Discarding non-UTF-8 binary frame"),
            },
            Ok(Message::Close(_)) => {
                debug!(peer_id, "Plugin sent close frame");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                debug!(peer_id, error = %e, "WebSocket read error");
                break;
            }
        }
    }

    correlator.detach_peer(peer_id).await?;
    writer_task.abort();
    info!(%remote, peer_id, "Figma plugin disconnected");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlator::{Correlator, CorrelatorConfig, Envelope};
    use serde_json::json;
    use std::time::Duration;
    use tokio_tungstenite::connect_async;

    async fn start_bridge() -> (CorrelatorHandle, SocketAddr) {
        let correlator = Correlator::new(CorrelatorConfig::default());
        let handle = correlator.handle();
        tokio::spawn(correlator.run());

        let server = BridgeServer::bind("127.0.0.1:0", handle.clone(), 16).await.unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(server.run());
        (handle, addr)
    }

    async fn wait_for_connection(handle: &CorrelatorHandle, expected: bool) {
        for _ in 0..200 {
            if handle.is_connected().await == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("connection state never became {}", expected);
    }

    #[tokio::test]
    async fn test_round_trip_over_websocket() {
        let (handle, addr) = start_bridge().await;
        let (mut plugin, _) = connect_async(format!("ws://{}", addr)).await.unwrap();
        wait_for_connection(&handle, true).await;

        let caller = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.call("push_svg", json!({"svg": "<svg/>", "name": "Logo"})).await })
        };

        let frame = plugin.next().await.unwrap().unwrap();
        let env: Envelope = serde_json::from_str(frame.to_text().unwrap()).unwrap();
        assert_eq!(env.kind, "push_svg");
        assert_eq!(env.payload["name"], "Logo");

        let ack = json!({"type": "ack", "requestId": env.request_id, "message": "SVG imported as Logo"});
        plugin.send(Message::text(ack.to_string())).await.unwrap();

        let body = caller.await.unwrap().unwrap();
        assert_eq!(body["message"], "SVG imported as Logo");
    }

    #[tokio::test]
    async fn test_binary_ack_is_accepted() {
        let (handle, addr) = start_bridge().await;
        let (mut plugin, _) = connect_async(format!("ws://{}", addr)).await.unwrap();
        wait_for_connection(&handle, true).await;

        let caller = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.call("push_design", json!({"type": "FRAME"})).await })
        };

        let frame = plugin.next().await.unwrap().unwrap();
        let env: Envelope = serde_json::from_str(frame.to_text().unwrap()).unwrap();

        plugin.send(Message::binary(vec![0xff, 0xfe])).await.unwrap();
        let ack = json!({"type": "ack", "requestId": env.request_id}).to_string();
        plugin.send(Message::binary(ack.into_bytes())).await.unwrap();

        assert!(caller.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_plugin_disconnect_detaches_peer() {
        let (handle, addr) = start_bridge().await;
        let (mut plugin, _) = connect_async(format!("ws://{}", addr)).await.unwrap();
        wait_for_connection(&handle, true).await;

        plugin.close(None).await.unwrap();
        wait_for_connection(&handle, false).await;

        let result = handle.call("push_design", json!({})).await;
        assert!(result.unwrap_err().is_not_connected());
    }

    #[tokio::test]
    async fn test_second_plugin_supersedes_first() {
        let (handle, addr) = start_bridge().await;
        let (mut first, _) = connect_async(format!("ws://{}", addr)).await.unwrap();
        wait_for_connection(&handle, true).await;

        let (mut second, _) = connect_async(format!("ws://{}", addr)).await.unwrap();
        for _ in 0..200 {
            if handle.metrics().await.unwrap().peer_connections == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        // The superseded connection is closed by the server
        let closed = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                match first.next().await {
                    None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
                    Some(Ok(_)) => continue,
                }
            }
        })
        .await;
        assert!(closed.is_ok());

        let caller = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.call("push_design", json!({})).await })
        };
        let frame = second.next().await.unwrap().unwrap();
        let env: Envelope = serde_json::from_str(frame.to_text().unwrap()).unwrap();
        second
            .send(Message::text(json!({"type": "ack", "requestId": env.request_id}).to_string()))
            .await
            .unwrap();
        assert!(caller.await.unwrap().is_ok());
        assert!(handle.is_connected().await);
    }
}
