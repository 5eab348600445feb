//! Pipe sessions: program upload (inbound) and readback (outbound).
//!
//! At most one of each is active.  Both close paths are idempotent.

pub mod deploy;
pub mod readback;

pub use deploy::DeploySession;
pub use readback::ReadbackSession;
