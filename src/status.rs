//! Derived service status and change publication.
//!
//! ```text
//!   context present ───────────────────────▶ Ready (0)
//!   no context, committed header, size > 0 ─▶ Sleeping (3)
//!   otherwise ──────────────────────────────▶ WaitingForInput (4)
//! ```

use log::debug;

use crate::app::events::ManagerEvent;
use crate::app::ports::EventSink;
use crate::program::ProgramHeader;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Status {
    Ready = 0,
    Sleeping = 3,
    WaitingForInput = 4,
}

impl Status {
    /// Numeric code reported on the wire.
    pub const fn code(self) -> u32 {
        self as u32
    }

    pub fn derive(has_context: bool, header: Option<&ProgramHeader>) -> Self {
        if has_context {
            Self::Ready
        } else if header.is_some_and(|hd| hd.size > 0) {
            Self::Sleeping
        } else {
            Self::WaitingForInput
        }
    }
}

/// Remembers the last published status so only transitions are emitted.
#[derive(Debug, Default)]
pub struct StatusPublisher {
    last: Option<Status>,
    running: bool,
}

impl StatusPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last published status; `None` before the first publish.
    pub fn last(&self) -> Option<Status> {
        self.last
    }

    /// Mirror of `status == Ready`, as of the last publish.
    pub fn running(&self) -> bool {
        self.running
    }

    /// Record `status`; emit `StatusChanged` if it differs from the last one.
    /// Returns `true` when an event was emitted.
    pub fn publish(&mut self, status: Status, sink: &mut impl EventSink) -> bool {
        if self.last == Some(status) {
            return false;
        }
        debug!("STATUS: {:?} -> {:?}", self.last, status);
        self.last = Some(status);
        self.running = status == Status::Ready;
        sink.emit(&ManagerEvent::StatusChanged(status));
        true
    }
}
