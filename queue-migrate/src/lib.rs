//! Queue type migration planning against a live broker.
//!
//! This crate is the I/O layer around [`queue_plan_core`]:
//!
//! - [`settings`]: broker connection settings from defaults, a TOML file,
//!   `RABBITMQ_*` environment variables and flags
//! - [`management`]: blocking client for the broker management HTTP API
//! - [`snapshot`]: queue snapshot sources (management API or JSON export)
//! - [`report`]: terminal rendering of plans, queue listings and rule tables
//!
//! The analysis itself never touches the network. Snapshots are fetched
//! first, then handed to the analyzer as plain values.

pub mod management;
pub mod report;
pub mod settings;
pub mod snapshot;
