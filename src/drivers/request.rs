//! Request/response correlation over the API characteristic. The
//! notification channel has no correlation id, so each exchange is a
//! single-slot rendezvous: arm the listener, write the frame, wait
//! for exactly one notification, disarm. The listener must be armed
//! before the write, otherwise a fast reply can be lost, and it must
//! be disarmed on every exit path so a stale notification can never
//! be attributed to the next request.

use super::driver::{LampDriver, TransportError};
use crate::protocol::cmd_defs::Command;
use std::error::Error;
use std::fmt;
use std::time::Duration;
use tokio::time::timeout;

#[derive(Debug)]
pub enum SendError {
    /// No notification within the deadline.
    Timeout,
    Transport(TransportError),
}

impl Error for SendError {}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::Timeout => write!(f, "No reply from lamp"),
            SendError::Transport(err) => write!(f, "{}", err),
        }
    }
}

impl From<TransportError> for SendError {
    fn from(err: TransportError) -> SendError {
        SendError::Transport(err)
    }
}

/// Send `frame` and wait for its reply notification.
pub async fn request(
    driver: &mut dyn LampDriver,
    frame: &[u8],
    deadline: Duration,
) -> Result<Vec<u8>, SendError> {
    let mut replies = driver.subscribe_api().await?;
    let result = async {
        driver.write_api(frame, true).await?;
        match timeout(deadline, replies.recv()).await {
            Ok(Some(reply)) => Ok(reply),
            Ok(None) => Err(SendError::Transport(TransportError::Disconnected)),
            Err(_) => Err(SendError::Timeout),
        }
    }
    .await;
    let disarm = driver.unsubscribe_api().await;
    match result {
        Ok(reply) => {
            disarm?;
            Ok(reply)
        }
        // The request failure wins over a disarm failure
        Err(err) => Err(err),
    }
}

/// Send a command that is answered with a notification.
pub async fn query<const N: usize>(
    driver: &mut dyn LampDriver,
    cmd: Command<N, true>,
    deadline: Duration,
) -> Result<Vec<u8>, SendError> {
    request(driver, &cmd.0, deadline).await
}

/// Send a fire-and-forget command. The firmware sends no reply for
/// these opcodes; the listener is never armed.
pub async fn send<const N: usize>(
    driver: &mut dyn LampDriver,
    cmd: Command<N, false>,
) -> Result<(), TransportError> {
    driver.write_api(&cmd.0, true).await
}
