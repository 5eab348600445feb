//! On-flash program layout.
//!
//! ```text
//!  offset  0        4        8        12       16              128
//!         ┌────────┬────────┬────────┬────────┬───── ─ ─ ──────┬──────────────┐
//!         │ magic0 │ size   │ magic1 │ hash   │ reserved (0)   │ image[size]  │
//!         └────────┴────────┴────────┴────────┴───── ─ ─ ──────┴──────────────┘
//!          written at deploy start   written in one call at finalize
//! ```
//!
//! All words are little-endian.  A header is valid only when both magics
//! match; `magic0` alone marks a deploy in progress and reads as "no
//! program".  The layout is byte-exact: images written by older firmware
//! must stay readable.

pub mod store;

/// Fixed header size; the image starts here.
pub const HEADER_SIZE: usize = 128;

pub const MAGIC0: u32 = 0x8d8a_bd53;
pub const MAGIC1: u32 = 0xb27c_4b2b;

const OFF_MAGIC0: usize = 0;
const OFF_SIZE: usize = 4;
const OFF_MAGIC1: usize = 8;
const OFF_HASH: usize = 12;

/// Bytes programmed by deploy start (`magic0` + `size`).
pub const PARTIAL_LEN: usize = OFF_MAGIC1;

/// Bytes programmed by finalize (`magic1`, `hash`, reserved words).
pub const COMMIT_LEN: usize = HEADER_SIZE - PARTIAL_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramHeader {
    pub magic0: u32,
    pub size: u32,
    pub magic1: u32,
    pub hash: u32,
}

impl ProgramHeader {
    /// Decode the raw header words.  No validity check.
    pub fn parse(raw: &[u8]) -> Option<Self> {
        if raw.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            magic0: read_u32(raw, OFF_MAGIC0),
            size: read_u32(raw, OFF_SIZE),
            magic1: read_u32(raw, OFF_MAGIC1),
            hash: read_u32(raw, OFF_HASH),
        })
    }

    /// Both magics present: the image has been fully written and committed.
    pub fn is_committed(&self) -> bool {
        self.magic0 == MAGIC0 && self.magic1 == MAGIC1
    }

    /// Only the start-of-deploy half is present.
    pub fn is_partial(&self) -> bool {
        self.magic0 == MAGIC0 && self.magic1 != MAGIC1
    }

    /// Flash offset one past the last image byte.
    pub fn image_end(&self) -> u32 {
        HEADER_SIZE as u32 + self.size
    }

    /// First half of the header, written when a deploy starts.
    pub fn partial_bytes(size: u32) -> [u8; PARTIAL_LEN] {
        let mut out = [0u8; PARTIAL_LEN];
        out[OFF_MAGIC0..OFF_MAGIC0 + 4].copy_from_slice(&MAGIC0.to_le_bytes());
        out[OFF_SIZE..OFF_SIZE + 4].copy_from_slice(&size.to_le_bytes());
        out
    }

    /// Second half of the header, written by finalize.  Reserved words are
    /// zeroed.  Index 0 is flash offset [`PARTIAL_LEN`].
    pub fn commit_bytes(hash: u32) -> [u8; COMMIT_LEN] {
        let mut out = [0u8; COMMIT_LEN];
        let m1 = OFF_MAGIC1 - PARTIAL_LEN;
        let h = OFF_HASH - PARTIAL_LEN;
        out[m1..m1 + 4].copy_from_slice(&MAGIC1.to_le_bytes());
        out[h..h + 4].copy_from_slice(&hash.to_le_bytes());
        out
    }
}

fn read_u32(raw: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([raw[off], raw[off + 1], raw[off + 2], raw[off + 3]])
}

// ── Hashes ───────────────────────────────────────────────────

pub const FNV1A_OFFSET_BASIS_32: u32 = 0x811c_9dc5;
pub const FNV1A_PRIME_32: u32 = 0x0100_0193;

/// 32-bit FNV-1a, the hash committed into the header.
///
/// Not cryptographic; it only lets a peer recognise an identical deploy.
pub const fn fnv1a32(bytes: &[u8]) -> u32 {
    let mut hash = FNV1A_OFFSET_BASIS_32;
    let mut i = 0usize;
    while i < bytes.len() {
        hash ^= bytes[i] as u32;
        hash = hash.wrapping_mul(FNV1A_PRIME_32);
        i += 1;
    }
    hash
}

/// SHA-256 digest of an image.
pub fn sha256(bytes: &[u8]) -> [u8; 32] {
    hmac_sha256::Hash::hash(bytes)
}

// ── Fallback program ─────────────────────────────────────────

/// Built-in no-op program run whenever no valid image is stored.
///
/// A complete bytecode image whose single function returns immediately.
/// The engine must accept it; see `ProgramManager::new`.
pub static EMPTY_PROGRAM: [u8; 160] = [
    0x44, 0x65, 0x76, 0x53, 0x0a, 0x7e, 0x6a, 0x9a, 0x00, 0x00, 0x00, 0x04, 0x01, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x68, 0x00, 0x00, 0x00, 0x20, 0x00, 0x00, 0x00, 0x88, 0x00, 0x00, 0x00, 0x0c, 0x00, 0x00, 0x00,
    0x94, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x94, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x94, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x94, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x94, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x94, 0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00,
    0x98, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x88, 0x00, 0x00, 0x00, 0x08, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x50, 0x40, 0x00, 0x00, 0x90, 0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x34, 0x40, 0x00, 0x00, 0x27, 0x01, 0x02, 0x90, 0x0c, 0x00, 0x00, 0x00,
    0x2e, 0x0c, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Magic prefix shared by every bytecode image, including [`EMPTY_PROGRAM`].
pub const IMAGE_MAGIC: [u8; 8] = [0x44, 0x65, 0x76, 0x53, 0x0a, 0x7e, 0x6a, 0x9a];
