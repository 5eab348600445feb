//! In-memory NOR flash adapter.
//!
//! Implements [`FlashPort`] over a `Vec<u8>` with real NOR semantics:
//! erase sets a page to `0xFF`, programming can only clear bits.  Used by
//! the host simulator (persisted to a file between runs) and by tests,
//! which can inject driver failures and inspect erase traffic.

use log::trace;

use crate::app::ports::FlashPort;
use crate::error::FlashError;

pub struct SimFlash {
    data: Vec<u8>,
    page_size: u32,
    fail_writes: bool,
    erased: Vec<u32>,
    syncs: u32,
}

impl SimFlash {
    /// Fully erased region of `size` bytes.
    pub fn new(size: u32, page_size: u32) -> Self {
        Self::from_bytes(vec![0xFF; size as usize], page_size)
    }

    /// Region initialised from a previous dump.
    pub fn from_bytes(data: Vec<u8>, page_size: u32) -> Self {
        Self {
            data,
            page_size,
            fail_writes: false,
            erased: Vec::new(),
            syncs: 0,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Direct access for tests that need to corrupt the region.
    pub fn raw_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Make every subsequent erase and program fail.
    pub fn fail_writes(&mut self, on: bool) {
        self.fail_writes = on;
    }

    /// Offsets of pages erased since the last [`clear_erase_log`](Self::clear_erase_log).
    pub fn erased_pages(&self) -> &[u32] {
        &self.erased
    }

    pub fn clear_erase_log(&mut self) {
        self.erased.clear();
    }

    pub fn sync_count(&self) -> u32 {
        self.syncs
    }

    fn range(&self, offset: u32, len: usize) -> Result<core::ops::Range<usize>, FlashError> {
        let start = offset as usize;
        let end = start.checked_add(len).ok_or(FlashError::OutOfBounds)?;
        if end > self.data.len() {
            return Err(FlashError::OutOfBounds);
        }
        Ok(start..end)
    }
}

impl FlashPort for SimFlash {
    fn size(&self) -> u32 {
        self.data.len() as u32
    }

    fn page_size(&self) -> u32 {
        self.page_size
    }

    fn contents(&self) -> &[u8] {
        &self.data
    }

    fn erase_page(&mut self, offset: u32) -> Result<(), FlashError> {
        if offset % self.page_size != 0 {
            return Err(FlashError::Unaligned);
        }
        let range = self.range(offset, self.page_size as usize)?;
        if self.fail_writes {
            return Err(FlashError::EraseFailed);
        }
        trace!("FLASH: erase {:#x}", offset);
        self.data[range].fill(0xFF);
        self.erased.push(offset);
        Ok(())
    }

    fn program(&mut self, offset: u32, bytes: &[u8]) -> Result<(), FlashError> {
        let range = self.range(offset, bytes.len())?;
        if self.fail_writes {
            return Err(FlashError::ProgramFailed);
        }
        trace!("FLASH: program {:#x}+{}", offset, bytes.len());
        for (cell, b) in self.data[range].iter_mut().zip(bytes) {
            *cell &= *b;
        }
        Ok(())
    }

    fn sync(&mut self) -> Result<(), FlashError> {
        self.syncs += 1;
        Ok(())
    }
}
