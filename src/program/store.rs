//! Program store — the header + image region in flash.
//!
//! Flow: `deploy_start(size)` → N × `deploy_write(chunk)` → `deploy_finalize()`
//!
//! Deploy start erases the first page, which holds the header, so the old
//! program disappears before the first new byte lands.  Finalize writes
//! `magic1` and the hash in a single program call; until then every reader
//! sees "no program".  Any protocol violation zeroes the write offset and the
//! peer has to start over.

use log::{debug, info, warn};

use crate::app::ports::FlashPort;
use crate::config::ALIGN;
use crate::error::DeployError;

use super::{HEADER_SIZE, PARTIAL_LEN, ProgramHeader, fnv1a32, sha256};

pub struct ProgramStore<F: FlashPort> {
    flash: F,
    /// Next flash offset to program; `0` when no deploy is in progress.
    write_offset: u32,
}

impl<F: FlashPort> ProgramStore<F> {
    pub fn new(flash: F) -> Self {
        Self {
            flash,
            write_offset: 0,
        }
    }

    pub fn flash(&self) -> &F {
        &self.flash
    }

    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    pub fn into_flash(self) -> F {
        self.flash
    }

    // ── Readers ───────────────────────────────────────────────

    /// The committed header, or `None` if the region holds no complete
    /// program (erased, partial, or garbage).
    pub fn header(&self) -> Option<ProgramHeader> {
        ProgramHeader::parse(self.flash.contents()).filter(ProgramHeader::is_committed)
    }

    /// Image bytes of the committed program.
    pub fn image(&self) -> Option<&[u8]> {
        let hd = self.header()?;
        let end = (HEADER_SIZE as u32).checked_add(hd.size)? as usize;
        self.flash.contents().get(HEADER_SIZE..end)
    }

    /// Declared image size, `0` if absent.
    pub fn program_size(&self) -> u32 {
        self.header().map_or(0, |hd| hd.size)
    }

    /// Committed FNV-1a hash, `0` if absent.
    pub fn program_hash(&self) -> u32 {
        self.header().map_or(0, |hd| hd.hash)
    }

    /// SHA-256 of the image; all zeros if absent.
    pub fn sha256(&self) -> [u8; 32] {
        self.image().map_or([0u8; 32], sha256)
    }

    pub fn is_deploying(&self) -> bool {
        self.write_offset != 0
    }

    pub fn write_offset(&self) -> u32 {
        self.write_offset
    }

    // ── Deploy protocol ───────────────────────────────────────

    /// Reject sizes that cannot be deployed, without touching flash.
    pub fn check_deploy_size(&self, size: u32) -> Result<(), DeployError> {
        let max = self.flash.size().saturating_sub(HEADER_SIZE as u32);
        if size >= max {
            return Err(DeployError::InvalidSize);
        }
        if size % ALIGN != 0 {
            return Err(DeployError::Misaligned);
        }
        Ok(())
    }

    /// Invalidate the stored program and, for `size > 0`, open a session.
    ///
    /// The caller must have stopped any context running from the old image.
    pub fn deploy_start(&mut self, size: u32) -> Result<(), DeployError> {
        self.check_deploy_size(size)?;

        self.write_offset = 0;
        self.flash.erase_page(0)?;

        if size == 0 {
            info!("DEPLOY: program cleared");
            return Ok(());
        }

        self.flash.program(0, &ProgramHeader::partial_bytes(size))?;
        self.write_offset = HEADER_SIZE as u32;
        info!("DEPLOY: start ({} bytes)", size);
        Ok(())
    }

    /// Append one chunk.  Any error aborts the session.
    pub fn deploy_write(&mut self, chunk: &[u8]) -> Result<(), DeployError> {
        let result = self.write_chunk(chunk);
        if let Err(e) = result {
            warn!(
                "DEPLOY: chunk of {} rejected at offset {}: {}",
                chunk.len(),
                self.write_offset,
                e
            );
            self.write_offset = 0;
        }
        result
    }

    fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), DeployError> {
        if self.write_offset == 0 {
            return Err(DeployError::NoSession);
        }

        let page = self.flash.page_size();
        let len = u32::try_from(chunk.len()).map_err(|_| DeployError::ChunkTooLarge)?;
        let end = ProgramHeader::parse(self.flash.contents())
            .map_or(0, |hd| hd.size.saturating_add(HEADER_SIZE as u32));

        if len % ALIGN != 0 {
            return Err(DeployError::Misaligned);
        }
        let stop = self
            .write_offset
            .checked_add(len)
            .filter(|&stop| stop <= end)
            .ok_or(DeployError::Overrun)?;
        if len >= page {
            return Err(DeployError::ChunkTooLarge);
        }

        // The page being written was erased ahead of time; if this chunk
        // spills into the next page, erase that one before programming.
        if self.write_offset / page != stop / page {
            let next = stop & !(page - 1);
            debug!("DEPLOY: erase page {:#x}", next);
            self.flash.erase_page(next)?;
        }

        self.flash.program(self.write_offset, chunk)?;
        self.write_offset = stop;
        Ok(())
    }

    /// Commit the header if every declared byte arrived.  Returns the hash.
    ///
    /// Ends the session whatever the outcome.
    pub fn deploy_finalize(&mut self) -> Result<u32, DeployError> {
        let offset = core::mem::replace(&mut self.write_offset, 0);
        if offset == 0 {
            return Err(DeployError::NoSession);
        }

        let contents = self.flash.contents();
        let hd = ProgramHeader::parse(contents).ok_or(DeployError::NoSession)?;
        let end = hd.image_end();
        if offset != end {
            let missing = end.saturating_sub(offset);
            warn!("DEPLOY: missing {} bytes (of {})", missing, hd.size);
            return Err(DeployError::Incomplete { missing });
        }

        let hash = fnv1a32(&contents[HEADER_SIZE..end as usize]);
        self.flash
            .program(PARTIAL_LEN as u32, &ProgramHeader::commit_bytes(hash))?;
        self.flash.sync()?;
        info!("DEPLOY: program written ({} bytes, hash {:#010x})", hd.size, hash);
        Ok(hash)
    }
}

// ── Tests ─────────────────────────────────────────────────────
