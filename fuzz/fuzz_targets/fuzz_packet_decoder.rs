//! Fuzz target: `rpc::packet::decode` and `rpc::handle_packet`
//!
//! The first two bytes pick the command word, the rest is the payload.
//! Decoding must never panic, and a packet that decodes must be safe to
//! execute against a live manager.
//!
//! cargo fuzz run fuzz_packet_decoder

#![no_main]

use devsmgr::ProgramManager;
use devsmgr::adapters::memory_pipes::MemoryPipes;
use devsmgr::adapters::rpc_adapter::PacketEventSink;
use devsmgr::adapters::sim_engine::SimEngine;
use devsmgr::adapters::sim_flash::SimFlash;
use devsmgr::app::ports::NoHooks;
use devsmgr::config::ManagerConfig;
use devsmgr::rpc::packet::{MAX_PAYLOAD, Packet, decode};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    let command = u16::from_le_bytes([data[0], data[1]]);
    let payload = &data[2..data.len().min(2 + MAX_PAYLOAD)];
    let Ok(pkt) = Packet::new(command, payload) else {
        return;
    };

    if decode(&pkt).is_err() {
        return;
    }

    let config = ManagerConfig {
        max_program_size: 8 * 1024,
        page_size: 1024,
        ..ManagerConfig::default()
    };
    let flash = SimFlash::new(config.max_program_size, config.page_size);
    let mut mgr = ProgramManager::new(config, flash, SimEngine::new(), NoHooks, 0)
        .expect("fixed config matches the flash");
    let mut pipes = MemoryPipes::new(MAX_PAYLOAD);
    let mut events = PacketEventSink::new();

    let _ = devsmgr::rpc::handle_packet(&mut mgr, &pkt, 0, &mut pipes, &mut events);
    for tick in 0..4u32 {
        mgr.process(tick * 1000, &mut pipes, &mut events);
    }
});
