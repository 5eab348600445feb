//! Numeric command packets.
//!
//! Wire format of a packet payload is plain little-endian fields; framing,
//! addressing and CRCs belong to the transport.
//!
//! ```text
//!   command (u16)        payload
//!   0x0080 deploy        size: u32
//!   0x0081 read          device_id: u64, port: u16
//!   0x1000 | reg         (empty)          → reply with register value
//!   0x2000 | reg         value            → no reply
//!   0x8000 | ctr<<8 | ev event payload    (device → peer)
//! ```

use crate::app::commands::{ManagerCommand, Reply};
use crate::app::events::ManagerEvent;
use crate::app::ports::PipeTarget;
use crate::error::PacketError;

/// Largest payload one transport packet carries.
pub const MAX_PAYLOAD: usize = 236;

pub type Payload = heapless::Vec<u8, MAX_PAYLOAD>;

// ── Command codes ────────────────────────────────────────────

pub const CMD_DEPLOY_BYTECODE: u16 = 0x80;
pub const CMD_READ_BYTECODE: u16 = 0x81;

pub const REG_RUNNING: u16 = 0x80;
pub const REG_AUTOSTART: u16 = 0x81;
pub const REG_LOGGING: u16 = 0x82;
pub const REG_STATUS_CODE: u16 = 0x103;
pub const REG_PROGRAM_SIZE: u16 = 0x180;
pub const REG_PROGRAM_HASH: u16 = 0x181;
pub const REG_PROGRAM_SHA256: u16 = 0x182;
pub const REG_RUNTIME_VERSION: u16 = 0x183;

pub const EV_CHANGE: u8 = 0x03;
pub const EV_STATUS_CODE_CHANGED: u8 = 0x04;
pub const EV_PROGRAM_PANIC: u8 = 0x80;

const GET_MASK: u16 = 0x1000;
const SET_MASK: u16 = 0x2000;
const EVENT_MASK: u16 = 0x8000;
const EVENT_COUNTER_MASK: u8 = 0x7f;

/// Register read command for `reg`.
pub const fn get(reg: u16) -> u16 {
    GET_MASK | reg
}

/// Register write command for `reg`.
pub const fn set(reg: u16) -> u16 {
    SET_MASK | reg
}

/// Event command word: event code plus a 7-bit rolling counter.
pub const fn event(code: u8, counter: u8) -> u16 {
    EVENT_MASK | (((counter & EVENT_COUNTER_MASK) as u16) << 8) | code as u16
}

// ── Packet ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub command: u16,
    pub payload: Payload,
}

impl Packet {
    pub fn new(command: u16, data: &[u8]) -> Result<Self, PacketError> {
        let payload = Payload::from_slice(data).map_err(|_| PacketError::Oversized)?;
        Ok(Self { command, payload })
    }

    pub fn empty(command: u16) -> Self {
        Self {
            command,
            payload: Payload::new(),
        }
    }

    pub fn is_event(&self) -> bool {
        self.command & EVENT_MASK != 0
    }

    /// Event code, for event packets.
    pub fn event_code(&self) -> Option<u8> {
        self.is_event().then_some((self.command & 0xff) as u8)
    }
}

fn field<const N: usize>(data: &[u8], at: usize) -> Result<[u8; N], PacketError> {
    data.get(at..at + N)
        .and_then(|s| s.try_into().ok())
        .ok_or(PacketError::Truncated {
            expected: at + N,
            actual: data.len(),
        })
}

fn flag(data: &[u8]) -> Result<bool, PacketError> {
    field::<1>(data, 0).map(|[b]| b != 0)
}

// ── Decode ───────────────────────────────────────────────────

/// Decode a request.  `Ok(None)` for commands this service does not own.
pub fn decode(pkt: &Packet) -> Result<Option<ManagerCommand>, PacketError> {
    let data = &pkt.payload[..];
    let cmd = match pkt.command {
        CMD_DEPLOY_BYTECODE => ManagerCommand::DeployProgram {
            size: u32::from_le_bytes(field(data, 0)?),
        },
        CMD_READ_BYTECODE => ManagerCommand::ReadProgram(PipeTarget {
            device_id: u64::from_le_bytes(field(data, 0)?),
            port: u16::from_le_bytes(field(data, 8)?),
        }),

        c if c == get(REG_PROGRAM_SIZE) => ManagerCommand::GetProgramSize,
        c if c == get(REG_PROGRAM_HASH) => ManagerCommand::GetProgramHash,
        c if c == get(REG_PROGRAM_SHA256) => ManagerCommand::GetProgramSha256,
        c if c == get(REG_STATUS_CODE) => ManagerCommand::GetStatusCode,
        c if c == get(REG_RUNTIME_VERSION) => ManagerCommand::GetRuntimeVersion,

        c if c == get(REG_RUNNING) => ManagerCommand::GetRunning,
        c if c == get(REG_AUTOSTART) => ManagerCommand::GetAutostart,
        c if c == get(REG_LOGGING) => ManagerCommand::GetLogging,
        c if c == set(REG_RUNNING) => ManagerCommand::SetRunning(flag(data)?),
        c if c == set(REG_AUTOSTART) => ManagerCommand::SetAutostart(flag(data)?),
        c if c == set(REG_LOGGING) => ManagerCommand::SetLogging(flag(data)?),

        _ => return Ok(None),
    };
    Ok(Some(cmd))
}

// ── Encode ───────────────────────────────────────────────────

/// Response to request `command`.
pub fn encode_reply(command: u16, reply: &Reply) -> Packet {
    let mut p = Packet::empty(command);
    // Every reply is far below MAX_PAYLOAD.
    let _ = match reply {
        Reply::Port(port) => p.payload.extend_from_slice(&port.to_le_bytes()),
        Reply::U32(v) => p.payload.extend_from_slice(&v.to_le_bytes()),
        Reply::Bool(b) => p.payload.push(u8::from(*b)).map_err(|_| ()),
        Reply::Digest(d) => p.payload.extend_from_slice(d),
    };
    p
}

/// Event packet for `ev`, stamped with `counter`.
pub fn encode_event(ev: &ManagerEvent, counter: u8) -> Packet {
    match ev {
        ManagerEvent::StatusChanged(status) => {
            let mut p = Packet::empty(event(EV_STATUS_CODE_CHANGED, counter));
            let _ = p.payload.extend_from_slice(&status.code().to_le_bytes());
            p
        }
        ManagerEvent::ProgramPanic {
            panic_code,
            program_counter,
        } => {
            let mut p = Packet::empty(event(EV_PROGRAM_PANIC, counter));
            let _ = p.payload.extend_from_slice(&panic_code.to_le_bytes());
            let _ = p.payload.extend_from_slice(&program_counter.to_le_bytes());
            p
        }
        ManagerEvent::ProgramChanged => Packet::empty(event(EV_CHANGE, counter)),
    }
}
