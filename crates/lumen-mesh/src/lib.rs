//! Mesh-level command scheduler.
//!
//! This crate owns the directory of known mesh devices, picks a gateway
//! among the reachable candidates, serializes every outgoing command through
//! one ordered queue processed by a single worker task, retries failed
//! commands with bounded attempts, and periodically polls every node for
//! fresh status. The queue is the lock: the worker is the only entity that
//! ever touches the active session or the directory.

pub mod command;
pub mod config;
pub mod directory;
pub mod error;
pub mod scan;
pub mod scheduler;

pub use command::{Command, CommandKind, CommandOutcome};
pub use config::MeshConfig;
pub use directory::{DeviceEvent, DeviceRecord, StatusCallback, RSSI_UNKNOWN};
pub use error::MeshError;
pub use scan::{RssiReading, RssiScanner, ScanError, StaticRssiScanner};
pub use scheduler::{spawn, MeshHandle};
