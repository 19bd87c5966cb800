//! Daybook — task persistence and state synchronization.
//!
//! Tasks are stored in SQLite through a [`store::TaskStore`] and mirrored in
//! memory by a [`tasks::TaskManager`], which keeps the in-progress count
//! current and publishes snapshots over a `watch` channel.

pub mod config;
pub mod identity;
pub mod notes;
pub mod store;
pub mod tasks;
