//! Application core — the program manager and its port boundary.
//!
//! All interaction with flash, the bytecode engine and the transport
//! happens through **port traits** defined in [`ports`], keeping this layer
//! fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
