//! WDP Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the WDP project.
//!
//! # Overview
//!
//! This crate provides common functionality used across all WDP workspace members:
//!
//! - **Error Handling**: Custom error types and result types
//! - **Logging**: Structured logging setup shared by every binary
//! - **Types**: Run context, stage summaries, and validation report types
//! - **Channel**: The run-scoped inter-stage result channel
//!
//! # Example
//!
//! ```no_run
//! use wdp_common::channel::{ResultChannel, Slot};
//! use wdp_common::types::IngestionSummary;
//! use uuid::Uuid;
//!
//! fn publish_summary(channel: &ResultChannel, run_id: Uuid) -> wdp_common::Result<()> {
//!     let summary = IngestionSummary { successful: 4, failed: 1, total: 5 };
//!     channel.publish(run_id, Slot::IngestionResults, &summary)?;
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{Result, WdpError};
