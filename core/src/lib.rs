#![deny(missing_docs)]
//! syncer_core: shared building blocks (config, logging, job model, API client, sync).

/// Configuration helpers (AppId, dirs, load_or_init, Settings).
pub mod cfg;
/// Tracing/log initialization helpers.
pub mod logx;
/// Error types shared by every operation.
pub mod error;
/// Job document model exchanged with the scheduler API.
pub mod job;
/// Scheduler API client and its transport seam.
pub mod client;
/// Docker image discovery and pulling.
pub mod images;
/// File/directory sync pipeline.
pub mod sync;

#[cfg(test)]
mod testing;

pub use error::{display_chain, Error, ErrorKind, RequestError, Result, TransportError};
