//! Inbound deploy pipe bookkeeping.
//!
//! The byte-level protocol lives in the program store; this only tracks
//! which inbound port is open so a new deploy can replace it and so the
//! close path runs once.

use log::debug;

use crate::app::ports::PipeTransport;
use crate::error::PipeError;

#[derive(Debug, Default)]
pub struct DeploySession {
    port: Option<u16>,
}

impl DeploySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    /// Open a fresh inbound pipe, closing the previous one first.
    pub fn open(&mut self, pipes: &mut impl PipeTransport) -> Result<u16, PipeError> {
        self.close(pipes);
        let port = pipes.open_inbound()?;
        debug!("DEPLOY: inbound pipe on port {}", port);
        self.port = Some(port);
        Ok(port)
    }

    /// Close from this side.  Returns `true` if a pipe was open.
    pub fn close(&mut self, pipes: &mut impl PipeTransport) -> bool {
        match self.port.take() {
            Some(_) => {
                pipes.close_inbound();
                true
            }
            None => false,
        }
    }

    /// The transport reports the pipe closed (peer side).  Returns `true`
    /// if it was open.
    pub fn closed_by_peer(&mut self) -> bool {
        self.port.take().is_some()
    }
}
