//! Socket plumbing for the manager's four ports.
//!
//! `back_pull`/`back_pub`/`front_pub` are grounded on the teacher's
//! `ws_forwarder.rs` (accept loop funnels into a single channel) and
//! `local_fanout.rs`'s `FanoutServer` (broadcast fan-out, one writer task
//! per subscriber). `front_rep` is grounded on `state.rs`'s
//! `ForwarderCommand` + `oneshot` reply pattern.

use daq_protocol::Envelope;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;

/// One inbound request on `front_rep`, paired with the channel the
/// coordinator replies through.
pub struct FrontRepRequest {
    pub envelope: Envelope,
    pub reply_tx: oneshot::Sender<Envelope>,
}

/// Bind `back_pull`: every envelope pushed by any connected peer lands on
/// the returned receiver, funneled through one channel (many-to-one, per
/// spec.md §4.1).
pub async fn spawn_back_pull(
    bind_host: &str,
    port: u16,
) -> std::io::Result<mpsc::Receiver<Envelope>> {
    let listener = TcpListener::bind((bind_host, port)).await?;
    let (tx, rx) = mpsc::channel(1024);
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else { break };
            let tx = tx.clone();
            tokio::spawn(async move {
                let Ok(ws) = tokio_tungstenite::accept_async(stream).await else { return };
                let (_write, mut read) = ws.split();
                while let Some(Ok(msg)) = read.next().await {
                    let Message::Text(text) = msg else { continue };
                    match Envelope::from_json(&text) {
                        Ok(env) => {
                            if tx.send(env).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => tracing::warn!(error = %e, "back_pull: dropping malformed envelope"),
                    }
                }
            });
        }
    });
    Ok(rx)
}

/// Bind a PUB-style fan-out socket (`back_pub` or `front_pub`): every
/// string sent on the returned sender is delivered to every currently
/// connected subscriber.
pub async fn spawn_fanout(bind_host: &str, port: u16) -> std::io::Result<broadcast::Sender<String>> {
    let listener = TcpListener::bind((bind_host, port)).await?;
    let (tx, _) = broadcast::channel(1024);
    let accept_tx = tx.clone();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else { break };
            let mut rx = accept_tx.subscribe();
            tokio::spawn(async move {
                let Ok(ws) = tokio_tungstenite::accept_async(stream).await else { return };
                let (mut write, _read) = ws.split();
                loop {
                    match rx.recv().await {
                        Ok(text) => {
                            if write.send(Message::Text(text.into())).await.is_err() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "fanout subscriber lagged, dropping messages");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            });
        }
    });
    Ok(tx)
}

/// Bind `front_rep`: each connection is read in a loop, one request at a
/// time, each forwarded to the returned receiver together with a `oneshot`
/// the connection's own task awaits before writing the reply back. This is
/// what gives strict per-connection request/reply ordering while still
/// letting every request funnel through the coordinator's single queue.
pub async fn spawn_front_rep(
    bind_host: &str,
    port: u16,
) -> std::io::Result<mpsc::Receiver<FrontRepRequest>> {
    let listener = TcpListener::bind((bind_host, port)).await?;
    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else { break };
            let tx = tx.clone();
            tokio::spawn(async move {
                let Ok(ws) = tokio_tungstenite::accept_async(stream).await else { return };
                let (mut write, mut read) = ws.split();
                while let Some(Ok(msg)) = read.next().await {
                    let Message::Text(text) = msg else { continue };
                    let envelope = match Envelope::from_json(&text) {
                        Ok(env) => env,
                        Err(e) => {
                            tracing::warn!(error = %e, "front_rep: dropping malformed request");
                            continue;
                        }
                    };
                    let (reply_tx, reply_rx) = oneshot::channel();
                    if tx.send(FrontRepRequest { envelope, reply_tx }).await.is_err() {
                        break;
                    }
                    let Ok(reply) = reply_rx.await else { break };
                    let Ok(json) = reply.to_json() else { break };
                    if write.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
            });
        }
    });
    Ok(rx)
}
