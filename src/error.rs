//! Unified error types for the program manager.
//!
//! One `Copy` enum per subsystem, each with a hand-written `Display`, and a
//! top-level [`Error`] every subsystem converts into.  Nothing here ever
//! halts the manager: callers log, roll the protocol back, and carry on.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The deploy protocol rejected a request.
    Deploy(DeployError),
    /// The flash driver reported a failure.
    Flash(FlashError),
    /// A pipe operation on the transport failed.
    Pipe(PipeError),
    /// A command packet could not be decoded.
    Packet(PacketError),
    /// Configuration is invalid.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deploy(e) => write!(f, "deploy: {e}"),
            Self::Flash(e) => write!(f, "flash: {e}"),
            Self::Pipe(e) => write!(f, "pipe: {e}"),
            Self::Packet(e) => write!(f, "packet: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Flash driver errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashError {
    /// Address or length falls outside the program region.
    OutOfBounds,
    /// Erase address is not page aligned.
    Unaligned,
    /// The driver failed to erase a page.
    EraseFailed,
    /// The driver failed to program bytes.
    ProgramFailed,
}

impl fmt::Display for FlashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds => write!(f, "access outside program region"),
            Self::Unaligned => write!(f, "erase address not page aligned"),
            Self::EraseFailed => write!(f, "page erase failed"),
            Self::ProgramFailed => write!(f, "program failed"),
        }
    }
}

impl From<FlashError> for Error {
    fn from(e: FlashError) -> Self {
        Self::Flash(e)
    }
}

// ---------------------------------------------------------------------------
// Deploy protocol errors
// ---------------------------------------------------------------------------

/// Rejections from the program store's write path.
///
/// Every variant except [`DeployError::InvalidSize`] and
/// [`DeployError::Misaligned`] raised by `deploy_start` leaves the write
/// offset at zero: the peer must start over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployError {
    /// Declared image does not fit in the region.
    InvalidSize,
    /// Size or chunk length is not a multiple of the alignment unit.
    Misaligned,
    /// No deploy session is active.
    NoSession,
    /// Chunk would pass the declared end of the image.
    Overrun,
    /// Chunk is not smaller than a flash page.
    ChunkTooLarge,
    /// Stream closed before the declared size arrived.
    Incomplete { missing: u32 },
    /// Flash driver failure while writing.
    Flash(FlashError),
}

impl fmt::Display for DeployError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSize => write!(f, "image size exceeds program region"),
            Self::Misaligned => write!(f, "length not a multiple of the alignment unit"),
            Self::NoSession => write!(f, "no deploy session active"),
            Self::Overrun => write!(f, "chunk passes declared image end"),
            Self::ChunkTooLarge => write!(f, "chunk not smaller than a flash page"),
            Self::Incomplete { missing } => write!(f, "stream closed with {missing} bytes missing"),
            Self::Flash(e) => write!(f, "flash: {e}"),
        }
    }
}

impl From<FlashError> for DeployError {
    fn from(e: FlashError) -> Self {
        Self::Flash(e)
    }
}

impl From<DeployError> for Error {
    fn from(e: DeployError) -> Self {
        Self::Deploy(e)
    }
}

// ---------------------------------------------------------------------------
// Bulk deploy errors
// ---------------------------------------------------------------------------

/// Stage at which a one-shot [`deploy_image`] failed.
///
/// [`deploy_image`]: crate::app::service::ProgramManager::deploy_image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkDeployError {
    /// `deploy_start` refused the size.
    SizeRejected,
    /// Zero-length image: the program was cleared, nothing deployed.
    EmptyImage,
    /// A write chunk was rejected.
    WriteRejected,
    /// Finalize refused to commit.
    FinalizeRejected,
    /// Finalize succeeded but no valid header is readable.
    HeaderMissing,
    /// The engine rejected the committed image with this code.
    Verify(i32),
}

impl BulkDeployError {
    /// Numeric failure code as reported to legacy callers.
    pub fn code(self) -> i32 {
        match self {
            Self::SizeRejected => -1,
            Self::EmptyImage => -2,
            Self::WriteRejected => -3,
            Self::FinalizeRejected => -4,
            Self::HeaderMissing => -5,
            Self::Verify(code) => code,
        }
    }
}

impl fmt::Display for BulkDeployError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SizeRejected => write!(f, "image size rejected"),
            Self::EmptyImage => write!(f, "empty image"),
            Self::WriteRejected => write!(f, "write chunk rejected"),
            Self::FinalizeRejected => write!(f, "finalize rejected"),
            Self::HeaderMissing => write!(f, "header missing after finalize"),
            Self::Verify(code) => write!(f, "image verification failed ({code})"),
        }
    }
}

impl core::error::Error for BulkDeployError {}

// ---------------------------------------------------------------------------
// Pipe errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeError {
    /// Transient backpressure; retry later without advancing.
    TryAgain,
    /// The peer closed the pipe or it was never open.
    Closed,
    /// The transport has no free pipe slot.
    NoSlot,
}

impl fmt::Display for PipeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TryAgain => write!(f, "try again"),
            Self::Closed => write!(f, "pipe closed"),
            Self::NoSlot => write!(f, "no free pipe"),
        }
    }
}

impl From<PipeError> for Error {
    fn from(e: PipeError) -> Self {
        Self::Pipe(e)
    }
}

// ---------------------------------------------------------------------------
// Packet errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketError {
    /// Payload shorter than the command requires.
    Truncated { expected: usize, actual: usize },
    /// Payload longer than a transport packet can carry.
    Oversized,
}

impl fmt::Display for PacketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated { expected, actual } => {
                write!(f, "payload truncated ({actual} of {expected} bytes)")
            }
            Self::Oversized => write!(f, "payload exceeds packet size"),
        }
    }
}

impl From<PacketError> for Error {
    fn from(e: PacketError) -> Self {
        Self::Packet(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A field failed range validation.  Names the field and the rule.
    ValidationFailed(&'static str),
    /// The configured geometry disagrees with the flash the manager was
    /// given.  Names the mismatched field.
    FlashMismatch {
        field: &'static str,
        configured: u32,
        actual: u32,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
            Self::FlashMismatch {
                field,
                configured,
                actual,
            } => write!(f, "{field} is {configured}, flash has {actual}"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
