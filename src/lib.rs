//! Purity price hub: keeps the two most recent rate snapshots, decides when
//! fetched prices constitute a real change, and serves the physical display
//! board its deltas and digit tile diffs.

pub mod auth;
pub mod config;
pub mod digits;
pub mod error;
pub mod fetch;
pub mod rates;
pub mod reconcile;
pub mod routes;
pub mod schedule;
pub mod staleness;
pub mod state;
pub mod store;
