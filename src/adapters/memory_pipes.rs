//! In-memory pipe transport.
//!
//! Implements [`PipeTransport`] by recording everything: the inbound port
//! handed out, the outbound target and every packet written to it.
//! Backpressure and hard failures can be injected to exercise the readback
//! retry rules.

use log::debug;

use crate::app::ports::{PipeTarget, PipeTransport};
use crate::error::PipeError;

pub struct MemoryPipes {
    max_payload: usize,
    next_port: u16,
    inbound: Option<u16>,
    outbound: Option<PipeTarget>,
    sent: Vec<Vec<u8>>,
    inbound_closes: u32,
    outbound_closes: u32,
    try_again: u32,
    write_error: Option<PipeError>,
    refuse_open: bool,
}

impl MemoryPipes {
    pub fn new(max_payload: usize) -> Self {
        Self {
            max_payload,
            next_port: 1,
            inbound: None,
            outbound: None,
            sent: Vec::new(),
            inbound_closes: 0,
            outbound_closes: 0,
            try_again: 0,
            write_error: None,
            refuse_open: false,
        }
    }

    pub fn inbound_port(&self) -> Option<u16> {
        self.inbound
    }

    pub fn outbound_target(&self) -> Option<PipeTarget> {
        self.outbound
    }

    /// Packets written to the outbound pipe, in order.
    pub fn sent(&self) -> &[Vec<u8>] {
        &self.sent
    }

    /// All outbound payloads concatenated.
    pub fn received(&self) -> Vec<u8> {
        self.sent.concat()
    }

    pub fn inbound_closes(&self) -> u32 {
        self.inbound_closes
    }

    pub fn outbound_closes(&self) -> u32 {
        self.outbound_closes
    }

    /// Answer the next `n` writes with `TryAgain`.
    pub fn push_back(&mut self, n: u32) {
        self.try_again = n;
    }

    /// Fail every subsequent write with `err`.
    pub fn fail_writes(&mut self, err: Option<PipeError>) {
        self.write_error = err;
    }

    /// Refuse to open pipes in either direction.
    pub fn refuse_open(&mut self, on: bool) {
        self.refuse_open = on;
    }

    /// Simulate the peer closing the inbound pipe.
    pub fn peer_closes_inbound(&mut self) {
        self.inbound = None;
    }
}

impl PipeTransport for MemoryPipes {
    fn max_payload(&self) -> usize {
        self.max_payload
    }

    fn open_inbound(&mut self) -> Result<u16, PipeError> {
        if self.refuse_open {
            return Err(PipeError::NoSlot);
        }
        let port = self.next_port;
        self.next_port = self.next_port.wrapping_add(1).max(1);
        self.inbound = Some(port);
        debug!("PIPE: inbound open on port {}", port);
        Ok(port)
    }

    fn close_inbound(&mut self) {
        if self.inbound.take().is_some() {
            self.inbound_closes += 1;
        }
    }

    fn open_outbound(&mut self, target: PipeTarget) -> Result<(), PipeError> {
        if self.refuse_open {
            return Err(PipeError::NoSlot);
        }
        self.outbound = Some(target);
        Ok(())
    }

    fn write_outbound(&mut self, data: &[u8]) -> Result<(), PipeError> {
        if self.outbound.is_none() {
            return Err(PipeError::Closed);
        }
        if let Some(err) = self.write_error {
            return Err(err);
        }
        if self.try_again > 0 {
            self.try_again -= 1;
            return Err(PipeError::TryAgain);
        }
        self.sent.push(data.to_vec());
        Ok(())
    }

    fn close_outbound(&mut self) {
        if self.outbound.take().is_some() {
            self.outbound_closes += 1;
        }
    }
}
