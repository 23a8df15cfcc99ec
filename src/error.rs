// src/error.rs
use std::io;
use thiserror::Error;

// Re-export anyhow's Result type
pub use anyhow::Result;

/// Custom Error type for the carbonlink library
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Connect error: {0}")]
    Connect(String),

    #[error("Write error: {0}")]
    Write(String),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Retry error: {0}")]
    Retry(String),

    #[error("Shutdown error: {0}")]
    Shutdown(String),

    #[error("Other error: {0}")]
    Other(String),
}
