//! Device-resident manager for a deployable bytecode program.
//!
//! Owns the program's flash layout, the chunked deploy and readback
//! protocols, and the supervisor that runs, recovers and restarts the
//! program.  Flash, the bytecode engine and the packet transport are reached
//! through the port traits in [`app::ports`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod program;
pub mod rpc;
pub mod scheduler;
pub mod session;
pub mod status;
pub mod supervisor;

pub use app::service::ProgramManager;
pub use error::{Error, Result};
