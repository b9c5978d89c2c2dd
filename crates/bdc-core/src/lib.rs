//! bdc-core library.
//!
//! Resolves broadband availability and challenge snapshots into canonical
//! per-location records, classifies service tiers, and produces
//! schema-complete summary tables at every census geography.
//!
//! # Conventions
//!
//! - **Errors**: fallible operations return [`error::Result`]; every
//!   [`error::PipelineError`] carries a stable [`error::ErrorCode`].
//! - **Logging**: `tracing` macros. `info!` per unit of work, `debug!` per
//!   file, `warn!` for conditions that were recovered from.
//! - **Identifiers**: location, provider and geoid columns are strings.

pub mod aggregate;
pub mod checkpoint;
pub mod classify;
pub mod codes;
pub mod config;
pub mod error;
pub mod geo;
pub mod manifest;
pub mod merge;
pub mod pipeline;
pub mod record;
pub mod resolve;
pub mod store;

pub use error::{ErrorCode, PipelineError, Result};
pub use pipeline::{Pipeline, Stage, StageReport};
