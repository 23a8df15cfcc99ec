// Example: publish host uptime to a Graphite collector

use anyhow::Result;
use clap::Parser;
use log::info;
use std::fs;
use std::sync::Arc;
use std::time::Duration;

use carbonlink::config::LogLevel;
use carbonlink::prelude::*;
use carbonlink::retry::RetryBuilder;
use carbonlink::util::host::hostname_prefix;
use carbonlink::util::logging;

/// Command line arguments for the uptime example
#[derive(Parser, Debug)]
#[command(name = "uptime", about = "Publish host uptime to a Graphite collector")]
struct Args {
    /// Collector address
    #[arg(short, long, default_value = "127.0.0.1:2003")]
    address: String,

    /// Interval between publishes in seconds
    #[arg(short, long, default_value = "10")]
    interval: u64,

    /// Metric path prefix (the hostname is appended)
    #[arg(short, long, default_value = "servers")]
    prefix: String,
}

/// Read uptime in whole seconds from /proc/uptime
fn read_uptime_seconds() -> u64 {
    fs::read_to_string("/proc/uptime")
        .ok()
        .and_then(|contents| {
            contents
                .split_whitespace()
                .next()
                .and_then(|first| first.parse::<f64>().ok())
        })
        .map(|seconds| seconds as u64)
        .unwrap_or(0)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(&LogLevel::Info);

    let address = args.address.clone();
    let dial_timeout = Duration::from_secs(5);
    let publish_interval = Duration::from_secs(args.interval);
    let prefix = hostname_prefix(&args.prefix);

    // The library never retries construction; the backoff policy lives here
    let g = execute_with_retry(
        || {
            GraphiteBuilder::new(&address)
                .dial_timeout(dial_timeout)
                .publish_interval(publish_interval)
                .prefix(&prefix)
                .connect()
        },
        RetryBuilder::new().max_attempts(5).build(),
        "connect to collector",
    )
    .await?;

    g.register("uptime.seconds", Arc::new(FuncVar::new(read_uptime_seconds)))?;

    info!(
        "Publishing {}.uptime.seconds to {} every {}s, ctrl-c to stop",
        prefix, args.address, args.interval
    );

    tokio::signal::ctrl_c().await?;
    g.shutdown().await
}
