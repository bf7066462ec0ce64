//! Data models for session-sync.
//!
//! - `ProjectMapping` and its `SyncMode`
//! - `SyncDirection`

pub mod mapping;

pub use mapping::{ProjectMapping, SyncDirection, SyncMode};
