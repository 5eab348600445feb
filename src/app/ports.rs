//! Port traits — the hexagonal boundary between the manager and its
//! collaborators.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ProgramManager (domain)
//! ```
//!
//! The flash driver, the bytecode engine, the pipe transport and the event
//! sink all live outside this crate's concern.  The
//! [`ProgramManager`](super::service::ProgramManager) reaches them only
//! through these traits, so every rule about layout, sessions and restarts
//! is testable against in-memory adapters.

use crate::error::{FlashError, PipeError};

// ───────────────────────────────────────────────────────────────
// Flash port (driven adapter: domain ↔ program region)
// ───────────────────────────────────────────────────────────────

/// Synchronous access to the program region of NOR flash.
///
/// Offsets are relative to the start of the region.  Erased flash reads
/// `0xFF`; programming can only clear bits, so a byte must be erased before
/// it is written with anything but a subset of its current bits.
pub trait FlashPort {
    /// Total size of the region in bytes.
    fn size(&self) -> u32;

    /// Erase granularity in bytes (power of two).
    fn page_size(&self) -> u32;

    /// Memory-mapped view of the whole region.
    fn contents(&self) -> &[u8];

    /// Erase the page starting at `offset` (must be page aligned).
    fn erase_page(&mut self, offset: u32) -> Result<(), FlashError>;

    /// Program `data` at `offset`.
    fn program(&mut self, offset: u32, data: &[u8]) -> Result<(), FlashError>;

    /// Flush any write buffering so the region survives power loss.
    fn sync(&mut self) -> Result<(), FlashError>;
}

// ───────────────────────────────────────────────────────────────
// Engine port (driven adapter: domain → bytecode interpreter)
// ───────────────────────────────────────────────────────────────

/// Structural verification failure, carrying the engine's code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyError(pub i32);

/// Parameters handed to the engine for each new context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextConfig {
    /// Index of the manager's service on the device, for the context's own
    /// reporting.
    pub service_index: u8,
}

/// Abnormal termination reported by a running context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramFault {
    /// Nonzero panic code.
    pub code: u32,
    /// Bytecode program counter at the fault.
    pub pc: u32,
}

/// Event from the device's client layer, relayed into the running program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientEvent {
    pub kind: u16,
    pub payload: heapless::Vec<u8, 32>,
}

/// The bytecode interpreter.
pub trait ScriptEngine {
    type Context: ExecutionContext;

    /// Check an image's structure without running it.
    fn verify(&self, image: &[u8]) -> Result<(), VerifyError>;

    /// Instantiate a context for `image`.  `None` if the engine refuses.
    fn create_context(&mut self, image: &[u8], cfg: &ContextConfig) -> Option<Self::Context>;

    /// Image format version this engine runs.
    fn runtime_version(&self) -> u32;
}

/// A live program instance.  Dropping it tears it down.
pub trait ExecutionContext {
    /// Pending fault, if the program has terminated abnormally.
    fn fault(&self) -> Option<ProgramFault>;

    /// Enable or disable the program's console output.
    fn set_logging(&mut self, enabled: bool);

    /// Deliver a client-layer event.
    fn client_event(&mut self, event: &ClientEvent);
}

/// Debugger notifications.  Every method defaults to a no-op.
pub trait DebugHooks {
    /// A context was created from the stored image (not the fallback).
    fn restarted(&mut self) {}

    /// The running context faulted with `code` (before normalisation).
    fn panicked(&mut self, _code: u32) {}
}

/// Hooks that ignore everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl DebugHooks for NoHooks {}

// ───────────────────────────────────────────────────────────────
// Pipe transport port (driven adapter: domain ↔ packet transport)
// ───────────────────────────────────────────────────────────────

/// Peer endpoint of an outbound pipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipeTarget {
    pub device_id: u64,
    pub port: u16,
}

/// Streaming pipes provided by the packet transport.
///
/// There is one inbound pipe (program upload) and one outbound pipe
/// (program readback).  Inbound chunks and the inbound close signal are
/// delivered by the transport into
/// [`ProgramManager::deploy_chunk`](super::service::ProgramManager::deploy_chunk)
/// and [`ProgramManager::deploy_closed`](super::service::ProgramManager::deploy_closed).
///
/// Both close methods must be idempotent.
pub trait PipeTransport {
    /// Largest payload a single pipe packet can carry.
    fn max_payload(&self) -> usize;

    /// Open the inbound pipe and return the port the peer should stream to.
    fn open_inbound(&mut self) -> Result<u16, PipeError>;

    /// Close the inbound pipe from this side.
    fn close_inbound(&mut self);

    /// Open the outbound pipe towards `target`.
    fn open_outbound(&mut self, target: PipeTarget) -> Result<(), PipeError>;

    /// Send one packet on the outbound pipe.
    fn write_outbound(&mut self, data: &[u8]) -> Result<(), PipeError>;

    /// Close the outbound pipe.
    fn close_outbound(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → transport / logging)
// ───────────────────────────────────────────────────────────────

/// The manager emits [`ManagerEvent`](super::events::ManagerEvent)s through
/// this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::ManagerEvent);
}
