//! Command-line interface: argument parsing, telemetry setup, and action
//! dispatch.

pub mod actions;
pub mod commands;
pub mod dispatch;
pub mod telemetry;

mod start;

pub use start::start;
