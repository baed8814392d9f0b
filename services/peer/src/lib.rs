//! The peer client stub: connects to a manager and answers transitions.

mod dispatch;
mod identity;

pub use dispatch::{handle, PeerConfig, PeerFailure};
pub use identity::peer_id;

use daq_protocol::Ports;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

/// Connect to the manager's `back_pub`/`back_pull` ports for `ports` and
/// answer envelopes until the `back_pub` connection closes (manager
/// shutdown) or a send fails.
pub async fn run(host: &str, ports: Ports, config: PeerConfig) -> Result<(), PeerRunError> {
    let (mut sub, _) = tokio_tungstenite::connect_async(format!("ws://{host}:{}", ports.back_pub))
        .await
        .map_err(PeerRunError::Connect)?;
    let (mut push, _) = tokio_tungstenite::connect_async(format!("ws://{host}:{}", ports.back_pull))
        .await
        .map_err(PeerRunError::Connect)?;

    tracing::info!(id = %config.id, level = %config.level, "peer connected to manager");

    while let Some(frame) = sub.next().await {
        let msg = frame.map_err(PeerRunError::Transport)?;
        let Message::Text(text) = msg else { continue };
        let command = match daq_protocol::Envelope::from_json(&text) {
            Ok(env) => env,
            Err(e) => {
                tracing::warn!(error = %e, "peer: dropping malformed envelope");
                continue;
            }
        };
        let key = command.header.key.clone();
        let Some(reply) = handle(&config, &command) else {
            tracing::debug!(%key, "peer: no reply for this key at this level");
            continue;
        };
        let json = reply.to_json().map_err(PeerRunError::Encode)?;
        push.send(Message::Text(json.into())).await.map_err(PeerRunError::Transport)?;
        tracing::debug!(%key, "peer: replied");
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum PeerRunError {
    #[error("failed to connect to manager: {0}")]
    Connect(#[source] tokio_tungstenite::tungstenite::Error),
    #[error("transport error: {0}")]
    Transport(#[source] tokio_tungstenite::tungstenite::Error),
    #[error("failed to encode reply: {0}")]
    Encode(#[source] daq_protocol::EnvelopeError),
}
