//! Connection handling for the collector wire.

pub mod carbon;

pub use carbon::CarbonConnection;

use async_trait::async_trait;

use crate::error::Result;

/// Connection state as seen by the publish loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No usable socket; the next tick will redial
    Disconnected,
    /// Socket is open and writable
    Connected,
}

/// Trait for the transport carrying metric lines to the collector
///
/// The publish loop owns the transport exclusively; nothing here needs to be
/// shareable. The trait exists so tests can substitute an in-memory wire for
/// the TCP connection.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Attempt a single bounded dial; no internal retry
    async fn connect(&mut self) -> Result<()>;

    /// Write one metric line (the newline is appended here)
    ///
    /// On failure the transport transitions to `Disconnected` and the error
    /// surfaces; whether and when to redial is the caller's decision.
    async fn write_line(&mut self, line: &str) -> Result<()>;

    /// Close the connection; idempotent
    async fn close(&mut self);

    /// Current connection state
    fn state(&self) -> ConnectionState;

    /// Endpoint description for logging
    fn endpoint(&self) -> &str;

    /// Check whether the transport currently holds an open connection
    fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }
}
