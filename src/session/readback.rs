//! Outbound readback of the stored image.
//!
//! One chunk per poll tick, at most one transport payload long.  The image
//! is re-read from the store on every tick, so a readback racing a deploy
//! simply ends early when the header disappears.

use log::{info, warn};

use crate::app::ports::{PipeTarget, PipeTransport};
use crate::error::PipeError;

#[derive(Debug, Default)]
pub struct ReadbackSession {
    cursor: Option<u32>,
}

impl ReadbackSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.cursor.is_some()
    }

    pub fn cursor(&self) -> Option<u32> {
        self.cursor
    }

    /// Open the outbound pipe to `target` and rewind.  On failure the
    /// session stays idle.
    pub fn start(
        &mut self,
        target: PipeTarget,
        pipes: &mut impl PipeTransport,
    ) -> Result<(), PipeError> {
        if self.cursor.take().is_some() {
            pipes.close_outbound();
        }
        match pipes.open_outbound(target) {
            Ok(()) => {
                info!(
                    "READ: streaming to {:#018x}:{}",
                    target.device_id, target.port
                );
                self.cursor = Some(0);
                Ok(())
            }
            Err(e) => {
                warn!("READ: cannot open pipe: {}", e);
                Err(e)
            }
        }
    }

    /// Send the next chunk of `image`, or close once it is exhausted.
    /// `None` means no program is stored.
    pub fn pump(&mut self, image: Option<&[u8]>, pipes: &mut impl PipeTransport) {
        let Some(cursor) = self.cursor else {
            return;
        };
        let image = image.unwrap_or(&[]);
        let pos = cursor as usize;

        if pos >= image.len() {
            pipes.close_outbound();
            self.cursor = None;
            info!("READ: done ({} bytes)", pos.min(image.len()));
            return;
        }

        let len = (image.len() - pos).min(pipes.max_payload());
        match pipes.write_outbound(&image[pos..pos + len]) {
            Ok(()) => self.cursor = Some(cursor + len as u32),
            Err(PipeError::TryAgain) => {}
            Err(e) => {
                warn!("READ: aborted at {}: {}", pos, e);
                pipes.close_outbound();
                self.cursor = None;
            }
        }
    }
}
