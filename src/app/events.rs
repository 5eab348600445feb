//! Outbound manager events.
//!
//! The [`ProgramManager`](super::service::ProgramManager) emits these through
//! the [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: encode them as transport events, log
//! them, record them in a test.

use crate::status::Status;

/// Structured events emitted by the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerEvent {
    /// The derived status changed.
    StatusChanged(Status),

    /// The running program faulted.  Reboot-class codes arrive as `0`.
    ProgramPanic { panic_code: u32, program_counter: u32 },

    /// A new program was committed to flash.
    ProgramChanged,
}
