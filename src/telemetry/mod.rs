//! # Telemetry Module
//!
//! Records elevator snapshots to JSONL files with rotation, and reads them back for replay.
//!
//! This module handles:
//! - Converting a snapshot into a self-describing frame (values plus units)
//! - Formatting frames as JSONL (JSON Lines)
//! - Writing to rotating log files (max N records per file)
//! - Retaining only the last M files
//! - Reading a file or a whole log directory back in order

pub mod frame;
pub mod logger;
pub mod reader;

pub use frame::TelemetryFrame;
pub use logger::TelemetryLogger;
pub use reader::TelemetryReader;

use crate::error::Result;
use crate::io::inputs::ElevatorInputs;

/// Destination for per-cycle snapshots.
#[cfg_attr(test, mockall::automock)]
pub trait TelemetrySink: Send {
    /// Records one snapshot under `table`.
    fn record(&mut self, table: &str, inputs: &ElevatorInputs) -> Result<()>;

    /// Pushes buffered records to storage.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}
