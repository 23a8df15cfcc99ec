//! A library for pushing in-process variables to a Graphite collector

pub mod config;
pub mod connection;
pub mod error;
pub mod format;
pub mod publisher;
pub mod registry;
pub mod retry;
pub mod source;
pub mod util;

/// Re-export of commonly used types for convenience
pub mod prelude {
    pub use crate::config::{PublisherConfig, load_config};
    pub use crate::error::{PublishError, Result};
    pub use crate::format::round_float;
    pub use crate::publisher::{Graphite, GraphiteBuilder};
    pub use crate::registry::VarRegistry;
    pub use crate::retry::{RetryConfig, execute_with_retry};
    pub use crate::source::{FloatVar, FuncVar, IntVar, ValueSource};
}

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
