use async_trait::async_trait;
use log::{debug, info, warn};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

use super::{ConnectionState, Transport};
use crate::error::{PublishError, Result};

/// TCP connection to a Graphite Carbon collector
///
/// Owns the socket exclusively. A failed write drops the socket and leaves
/// the connection `Disconnected`; the publish loop redials on the next tick.
pub struct CarbonConnection {
    address: String,
    dial_timeout: Duration,
    stream: Option<TcpStream>,
    state: ConnectionState,
}

impl CarbonConnection {
    /// Create a connection in the `Disconnected` state
    pub fn new(address: impl Into<String>, dial_timeout: Duration) -> Self {
        Self {
            address: address.into(),
            dial_timeout,
            stream: None,
            state: ConnectionState::Disconnected,
        }
    }
}

#[async_trait]
impl Transport for CarbonConnection {
    async fn connect(&mut self) -> Result<()> {
        debug!("Dialling {} (timeout {:?})", self.address, self.dial_timeout);

        let dialled = timeout(self.dial_timeout, TcpStream::connect(&self.address))
            .await
            .map_err(|_| {
                PublishError::Connect(format!(
                    "dial to {} timed out after {:?}",
                    self.address, self.dial_timeout
                ))
            })?
            .map_err(|e| PublishError::Connect(format!("dial to {} failed: {}", self.address, e)))?;

        info!("Connected to collector at {}", self.address);
        self.stream = Some(dialled);
        self.state = ConnectionState::Connected;

        Ok(())
    }

    async fn write_line(&mut self, line: &str) -> Result<()> {
        let stream = self.stream.as_mut().ok_or_else(|| {
            PublishError::Write(format!("not connected to {}", self.address))
        })?;

        let result = async {
            stream.write_all(line.as_bytes()).await?;
            stream.write_all(b"\n").await?;
            stream.flush().await
        }
        .await;

        if let Err(e) = result {
            // The socket is unusable; drop it so the next tick redials
            self.stream = None;
            self.state = ConnectionState::Disconnected;
            return Err(PublishError::Write(format!(
                "write to {} failed: {}",
                self.address, e
            ))
            .into());
        }

        Ok(())
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                warn!("Error closing connection to {}: {}", self.address, e);
            }
            debug!("Closed connection to {}", self.address);
        }
        self.state = ConnectionState::Disconnected;
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    fn endpoint(&self) -> &str {
        &self.address
    }
}
