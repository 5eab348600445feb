//! Packet dispatcher: decode → [`ProgramManager::handle_command`] → encode.

use log::warn;

use crate::app::ports::{DebugHooks, EventSink, FlashPort, PipeTransport, ScriptEngine};
use crate::app::service::ProgramManager;
use crate::error::PacketError;

use super::packet::{Packet, decode, encode_reply};

/// Handle one request packet addressed to the manager.
///
/// Returns the reply packet, `Ok(None)` when the command has no reply or
/// belongs to another service, and a [`PacketError`] when the payload is
/// malformed (nothing is executed in that case).
pub fn handle_packet<F, E, H>(
    mgr: &mut ProgramManager<F, E, H>,
    pkt: &Packet,
    now: u32,
    pipes: &mut impl PipeTransport,
    sink: &mut impl EventSink,
) -> Result<Option<Packet>, PacketError>
where
    F: FlashPort,
    E: ScriptEngine,
    H: DebugHooks,
{
    let cmd = match decode(pkt) {
        Ok(Some(cmd)) => cmd,
        Ok(None) => return Ok(None),
        Err(e) => {
            warn!("RPC: command {:#06x} dropped: {}", pkt.command, e);
            return Err(e);
        }
    };
    let reply = mgr.handle_command(cmd, now, pipes, sink);
    Ok(reply.map(|r| encode_reply(pkt.command, &r)))
}
