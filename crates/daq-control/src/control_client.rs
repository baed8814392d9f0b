use std::time::Duration;

use daq_protocol::{Envelope, MsgIdGenerator};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// The operator-facing request/reply client, a persistent connection to a
/// manager's `front_rep` port (spec.md §4.5). Mirrors the teacher's
/// `UplinkSession` connect/send/recv shape.
pub struct ControlClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    msg_gen: MsgIdGenerator,
    timeout: Duration,
}

impl ControlClient {
    /// Connect to `host:port`. `timeout` is this instance's RCVTIMEO
    /// (spec.md §4.5) — every request after this one is bounded by it.
    pub async fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self, ControlError> {
        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{host}:{port}"))
            .await
            .map_err(ControlError::Connect)?;
        Ok(Self { ws, msg_gen: MsgIdGenerator::new(), timeout })
    }

    async fn request(&mut self, key: &str, body: Value) -> Result<Envelope, ControlError> {
        let msg_id = self.msg_gen.next_id();
        let envelope = Envelope::new(key, msg_id, body);
        let json = envelope.to_json().map_err(ControlError::Serialization)?;
        self.ws.send(Message::Text(json.into())).await.map_err(ControlError::Transport)?;

        let frame = tokio::time::timeout(self.timeout, self.ws.next())
            .await
            .map_err(|_| ControlError::Timeout)?
            .ok_or(ControlError::Closed)?
            .map_err(ControlError::Transport)?;
        let Message::Text(text) = frame else {
            return Err(ControlError::Protocol("reply was not a text frame".to_string()));
        };
        Envelope::from_json(&text).map_err(ControlError::Decode)
    }

    /// `getState`: the manager's current control-state name.
    pub async fn get_state(&mut self) -> Result<String, ControlError> {
        let reply = self.request("getstate", Value::Null).await?;
        Ok(reply.header.key)
    }

    /// `getPlatform`: the full `cmstate` registry.
    pub async fn get_platform(&mut self) -> Result<Value, ControlError> {
        let reply = self.request("getstate", Value::Null).await?;
        Ok(reply.body)
    }

    /// `getStatus`: `(last transition, state)`.
    pub async fn get_status(&mut self) -> Result<(Option<String>, String), ControlError> {
        let reply = self.request("getstatus", Value::Null).await?;
        let state = reply.body["state"].as_str().unwrap_or_default().to_string();
        let transition = reply.body["transition"].as_str().map(str::to_string);
        Ok((transition, state))
    }

    pub async fn select_platform(&mut self, body: Value) -> Result<Value, ControlError> {
        let reply = self.request("selectplatform", body).await?;
        Ok(reply.body)
    }

    /// `setState(target)`: `Ok(None)` on success, `Ok(Some(message))` if the
    /// manager replied with an `error` body.
    pub async fn set_state(&mut self, target: &str) -> Result<Option<String>, ControlError> {
        let reply = self.request(&format!("setstate.{target}"), Value::Null).await?;
        Ok(reply.body.get("error").and_then(Value::as_str).map(str::to_string))
    }

    /// `setTransition(t)`: `Ok(None)` on success, `Ok(Some(message))` if the
    /// manager replied with an `error` body.
    pub async fn set_transition(&mut self, transition: &str) -> Result<Option<String>, ControlError> {
        let reply = self.request(transition, Value::Null).await?;
        Ok(reply.body.get("error").and_then(Value::as_str).map(str::to_string))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("failed to connect: {0}")]
    Connect(#[source] tokio_tungstenite::tungstenite::Error),
    #[error("request timed out")]
    Timeout,
    #[error("connection closed by manager")]
    Closed,
    #[error("transport error: {0}")]
    Transport(#[source] tokio_tungstenite::tungstenite::Error),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("failed to encode request: {0}")]
    Serialization(#[source] daq_protocol::EnvelopeError),
    #[error("failed to decode reply: {0}")]
    Decode(#[source] daq_protocol::EnvelopeError),
}
