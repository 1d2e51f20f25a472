//! # Elevator IO Library
//!
//! Hardware abstraction and telemetry for a lead/follower dual-motor elevator.
//!
//! The control loop talks to an [`io::ElevatorIo`] backend (physical motor controllers, a physics
//! simulation, or a recorded log) through the [`elevator::Elevator`] subsystem, which owns the
//! per-cycle telemetry snapshot and records it to rotating JSONL files.

pub mod alert;
pub mod config;
pub mod control_loop;
pub mod elevator;
pub mod error;
pub mod io;
pub mod limits;
pub mod mechanics;
pub mod telemetry;
