//! Inbound commands to the program manager.
//!
//! These represent requests from the transport, already decoded from their
//! numeric packet form by [`rpc::packet`](crate::rpc::packet).  The
//! [`ProgramManager`](super::service::ProgramManager) interprets them and
//! produces a [`Reply`] where the command has one.

use super::ports::PipeTarget;

/// Commands the transport can send into the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerCommand {
    /// Begin a streamed deploy of `size` image bytes.
    DeployProgram { size: u32 },
    /// Stream the current image to `target`.
    ReadProgram(PipeTarget),

    GetProgramSize,
    GetProgramHash,
    GetProgramSha256,
    GetStatusCode,
    GetRuntimeVersion,

    GetRunning,
    SetRunning(bool),
    GetAutostart,
    SetAutostart(bool),
    GetLogging,
    SetLogging(bool),
}

/// Typed response payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Inbound pipe port for a deploy.
    Port(u16),
    U32(u32),
    Bool(bool),
    Digest([u8; 32]),
}
