use log::{debug, warn};
use rand::random;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::error::{PublishError, Result};

/// Configuration for retry behaviour
///
/// The publisher itself never retries: a failed dial surfaces immediately.
/// Hosts that want a backoff policy wrap construction in
/// [`execute_with_retry`] and keep the policy in their own hands.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts
    pub max_attempts: usize,

    /// Initial delay before the first retry in milliseconds
    pub initial_delay_ms: u64,

    /// Multiplier for exponential backoff
    pub backoff_factor: f64,

    /// Maximum delay in milliseconds
    pub max_delay_ms: u64,

    /// Whether to add jitter to delays
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 100,
            backoff_factor: 1.5,
            max_delay_ms: 30_000,
            jitter: true,
        }
    }
}

/// Execute a fallible async operation with retry and backoff
pub async fn execute_with_retry<F, Fut, T, E>(
    operation: F,
    config: RetryConfig,
    context: &str,
) -> Result<T>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = std::result::Result<T, E>> + Send,
    E: Display + Send + Sync + 'static,
{
    let mut attempts = 0;
    let mut delay = Duration::from_millis(config.initial_delay_ms);

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(err) => {
                attempts += 1;

                if attempts >= config.max_attempts {
                    return Err(PublishError::Retry(format!(
                        "{}: gave up after {} attempts: {}",
                        context, attempts, err
                    ))
                    .into());
                }

                warn!(
                    "{} (attempt {}/{}): {}",
                    context, attempts, config.max_attempts, err
                );

                sleep(delay).await;

                let next_delay_ms = (delay.as_millis() as f64 * config.backoff_factor) as u64;

                if config.jitter {
                    delay = Duration::from_millis(
                        next_delay_ms.min(config.max_delay_ms) + random::<u64>() % 100,
                    );
                } else {
                    delay = Duration::from_millis(next_delay_ms.min(config.max_delay_ms));
                }

                debug!("Retrying after {:?} delay", delay);
            }
        }
    }
}

/// A simplified version of [`execute_with_retry`] using the default config
pub async fn retry<F, Fut, T, E>(operation: F, context: &str) -> Result<T>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = std::result::Result<T, E>> + Send,
    E: Display + Send + Sync + 'static,
{
    execute_with_retry(operation, RetryConfig::default(), context).await
}

/// Builder for custom retry configurations
pub struct RetryBuilder {
    config: RetryConfig,
}

impl RetryBuilder {
    pub fn new() -> Self {
        Self {
            config: RetryConfig::default(),
        }
    }

    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    pub fn initial_delay(mut self, delay_ms: u64) -> Self {
        self.config.initial_delay_ms = delay_ms;
        self
    }

    pub fn backoff_factor(mut self, factor: f64) -> Self {
        self.config.backoff_factor = factor;
        self
    }

    pub fn max_delay(mut self, delay_ms: u64) -> Self {
        self.config.max_delay_ms = delay_ms;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.config.jitter = jitter;
        self
    }

    pub fn build(self) -> RetryConfig {
        self.config
    }
}

impl Default for RetryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_config(max_attempts: usize) -> RetryConfig {
        RetryBuilder::new()
            .max_attempts(max_attempts)
            .initial_delay(1)
            .with_jitter(false)
            .build()
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);

        let result = execute_with_retry(
            move || {
                let calls = Arc::clone(&counted);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(PublishError::Connect("still booting".to_string()))
                    } else {
                        Ok(34)
                    }
                }
            },
            fast_config(5),
            "connect to collector",
        )
        .await
        .unwrap();

        assert_eq!(result, 34);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let err = execute_with_retry(
            || async { Err::<(), _>(PublishError::Connect("down".to_string())) },
            fast_config(3),
            "connect to collector",
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PublishError>(),
            Some(PublishError::Retry(_))
        ));
    }
}
