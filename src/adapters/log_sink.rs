//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing manager events to the `log` facade.
//! The simulator uses it as its only sink; on a device it would sit next
//! to the packet sink.

use log::{info, warn};

use crate::app::events::ManagerEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`ManagerEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink {
    emitted: u32,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events seen so far.
    pub fn emitted(&self) -> u32 {
        self.emitted
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &ManagerEvent) {
        self.emitted += 1;
        match event {
            ManagerEvent::StatusChanged(status) => {
                info!("STATUS | {:?} (code {})", status, status.code());
            }
            ManagerEvent::ProgramPanic {
                panic_code: 0,
                program_counter,
            } => {
                info!("PANIC | restart requested at pc={:#x}", program_counter);
            }
            ManagerEvent::ProgramPanic {
                panic_code,
                program_counter,
            } => {
                warn!("PANIC | code={} pc={:#x}", panic_code, program_counter);
            }
            ManagerEvent::ProgramChanged => {
                info!("CHANGE | new program committed");
            }
        }
    }
}
