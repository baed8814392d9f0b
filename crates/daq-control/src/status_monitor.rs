use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use daq_protocol::Envelope;
use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

const RECV_TIMEOUT: Duration = Duration::from_millis(250);

/// Subscribes to a manager's `front_pub` and invokes `callback` for every
/// `status`/`error` envelope received. Shuts down cooperatively on
/// [`StatusMonitor::stop`] (spec.md §4.6).
pub struct StatusMonitor {
    stop: Arc<AtomicBool>,
}

impl StatusMonitor {
    /// Connect to `host:port` and spawn the receive loop. Returns the
    /// handle and the background task's `JoinHandle`.
    pub async fn spawn(
        host: &str,
        port: u16,
        mut callback: impl FnMut(Envelope) + Send + 'static,
    ) -> Result<(Self, JoinHandle<()>), tokio_tungstenite::tungstenite::Error> {
        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{host}:{port}")).await?;
        let stop = Arc::new(AtomicBool::new(false));
        let stop_in_task = stop.clone();

        let join = tokio::spawn(async move {
            while !stop_in_task.load(Ordering::Relaxed) {
                match tokio::time::timeout(RECV_TIMEOUT, ws.next()).await {
                    Ok(Some(Ok(Message::Text(text)))) => match Envelope::from_json(&text) {
                        Ok(env) => callback(env),
                        Err(e) => tracing::warn!(error = %e, "status monitor: malformed envelope"),
                    },
                    Ok(Some(Ok(_))) => continue,
                    Ok(Some(Err(e))) => {
                        tracing::warn!(error = %e, "status monitor: transport error");
                        break;
                    }
                    Ok(None) => break,
                    Err(_) => continue, // receive timeout; loop back to re-check the stop flag
                }
            }
        });

        Ok((Self { stop }, join))
    }

    /// Signal the background task to stop at its next receive-timeout poll.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}
