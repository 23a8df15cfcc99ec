//! The publisher handle and its background publish loop.

use chrono::Utc;
use log::{debug, error, info, trace, warn};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::PublisherConfig;
use crate::connection::{CarbonConnection, Transport};
use crate::error::{PublishError, Result};
use crate::format::round_float;
use crate::registry::VarRegistry;
use crate::source::ValueSource;

/// Handle to a running publisher
///
/// Owns the variable registry and the background loop that flushes it to the
/// collector once per interval. Construction dials the collector exactly
/// once; wrap it in [`crate::retry::execute_with_retry`] if the host wants a
/// backoff policy.
///
/// Calling [`Graphite::shutdown`] stops the loop and closes the socket,
/// returning once both have happened. Dropping the handle without a shutdown
/// also stops the loop, but without waiting for it to exit.
pub struct Graphite {
    registry: Arc<VarRegistry>,
    endpoint: String,
    shutdown_tx: Mutex<Option<watch::Sender<bool>>>,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for Graphite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graphite")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl Graphite {
    /// Connect to a collector and start publishing
    ///
    /// Performs a single dial attempt; a refused or timed-out dial surfaces
    /// as [`PublishError::Connect`] and nothing is spawned.
    pub async fn connect(
        address: impl Into<String>,
        dial_timeout: Duration,
        publish_interval: Duration,
    ) -> Result<Self> {
        GraphiteBuilder::new(address)
            .dial_timeout(dial_timeout)
            .publish_interval(publish_interval)
            .connect()
            .await
    }

    /// Construct a publisher from a loaded configuration
    pub async fn from_config(config: &PublisherConfig) -> Result<Self> {
        let mut builder = GraphiteBuilder::new(&config.address)
            .dial_timeout(config.dial_timeout())
            .publish_interval(config.publish_interval())
            .precision(config.precision);

        if let Some(prefix) = &config.prefix {
            builder = builder.prefix(prefix);
        }

        builder.connect().await
    }

    /// Start a publisher over a caller-supplied transport
    ///
    /// This is the seam the other constructors go through; tests use it to
    /// publish over an in-memory wire.
    pub async fn with_transport<T: Transport>(
        mut transport: T,
        publish_interval: Duration,
        precision: usize,
        prefix: Option<String>,
    ) -> Result<Self> {
        transport.connect().await?;

        let registry = Arc::new(VarRegistry::new());
        let endpoint = transport.endpoint().to_string();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let loop_handle = tokio::spawn(publish_loop(
            transport,
            Arc::clone(&registry),
            publish_interval,
            precision,
            prefix,
            shutdown_rx,
        ));

        Ok(Self {
            registry,
            endpoint,
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            loop_handle: Mutex::new(Some(loop_handle)),
        })
    }

    /// Register a value source under a metric name
    ///
    /// Safe to call at any time, including while a tick is publishing. A
    /// duplicate name replaces the previous source.
    pub fn register(&self, name: impl Into<String>, source: Arc<dyn ValueSource>) -> Result<()> {
        self.registry.register(name, source)
    }

    /// The registry backing this publisher
    pub fn registry(&self) -> &VarRegistry {
        &self.registry
    }

    /// The collector endpoint this publisher writes to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Stop the publish loop and close the connection
    ///
    /// Blocks until the loop has exited and the socket is closed. Idempotent:
    /// a second call is a no-op.
    pub async fn shutdown(&self) -> Result<()> {
        let sender = self
            .shutdown_tx
            .lock()
            .map_err(|_| PublishError::Shutdown("Lock poisoned".to_string()))?
            .take();

        let Some(sender) = sender else {
            debug!("Shutdown of publisher for {} already requested", self.endpoint);
            return Ok(());
        };

        // An Err here means the loop is already gone, which is fine
        let _ = sender.send(true);

        let handle = self
            .loop_handle
            .lock()
            .map_err(|_| PublishError::Shutdown("Lock poisoned".to_string()))?
            .take();

        if let Some(handle) = handle {
            handle
                .await
                .map_err(|e| PublishError::Shutdown(format!("publish loop panicked: {}", e)))?;
        }

        info!("Publisher for {} stopped", self.endpoint);
        Ok(())
    }
}

/// Builder for publishers that need more than the basic constructor
pub struct GraphiteBuilder {
    address: String,
    dial_timeout: Duration,
    publish_interval: Duration,
    precision: usize,
    prefix: Option<String>,
}

impl GraphiteBuilder {
    /// Start building a publisher for the given collector address
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            dial_timeout: Duration::from_secs(5),
            publish_interval: Duration::from_secs(60),
            precision: 2,
            prefix: None,
        }
    }

    /// Set the dial timeout for the initial connect and every redial
    pub fn dial_timeout(mut self, dial_timeout: Duration) -> Self {
        self.dial_timeout = dial_timeout;
        self
    }

    /// Set the interval between publish ticks
    pub fn publish_interval(mut self, publish_interval: Duration) -> Self {
        self.publish_interval = publish_interval;
        self
    }

    /// Set the fractional digits kept when formatting decimal values
    pub fn precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    /// Prefix every published metric name with `prefix.`
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Dial the collector and start the publish loop
    pub async fn connect(self) -> Result<Graphite> {
        let transport = CarbonConnection::new(self.address, self.dial_timeout);
        Graphite::with_transport(transport, self.publish_interval, self.precision, self.prefix)
            .await
    }
}

/// The background loop: wait for a tick or the shutdown signal, never both
async fn publish_loop<T: Transport>(
    mut transport: T,
    registry: Arc<VarRegistry>,
    publish_interval: Duration,
    precision: usize,
    prefix: Option<String>,
    mut shutdown: watch::Receiver<bool>,
) {
    // First tick fires one full interval after startup
    let mut ticker = time::interval_at(Instant::now() + publish_interval, publish_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        "Publishing to {} every {:?}",
        transport.endpoint(),
        publish_interval
    );

    loop {
        tokio::select! {
            // Also fires when the handle is dropped without a shutdown call
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                publish_tick(&mut transport, &registry, precision, prefix.as_deref(), &shutdown).await;
            }
        }
    }

    transport.close().await;
    debug!("Publish loop for {} exited", transport.endpoint());
}

/// Publish one snapshot of the registry
///
/// Write failures are reported per metric and do not abort the tick; metrics
/// for a failed tick are dropped, not queued.
async fn publish_tick<T: Transport>(
    transport: &mut T,
    registry: &VarRegistry,
    precision: usize,
    prefix: Option<&str>,
    shutdown: &watch::Receiver<bool>,
) {
    if !transport.is_connected() {
        if let Err(e) = transport.connect().await {
            warn!("Redial failed, dropping this tick: {}", e);
            return;
        }
    }

    let snapshot = match registry.snapshot() {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!("Skipping tick, registry unavailable: {}", e);
            return;
        }
    };

    let timestamp = Utc::now().timestamp();

    for (name, source) in snapshot {
        // Shutdown is honoured between writes, never mid-write
        if *shutdown.borrow() {
            return;
        }

        let metric = match prefix {
            Some(prefix) => format!("{}.{}", prefix, name),
            None => name,
        };
        let value = round_float(&source.render(), precision);
        let line = format!("{} {} {}", metric, value, timestamp);

        match transport.write_line(&line).await {
            Ok(()) => trace!("Published {}", line),
            Err(e) => warn!("Failed to publish '{}': {}", metric, e),
        }
    }
}
