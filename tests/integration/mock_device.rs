//! Mock device harness for integration tests.
//!
//! Bundles a manager with in-memory flash, the simulated engine, recording
//! pipes and a recording event sink, plus a virtual clock, so tests can
//! drive whole deploy/run/readback scenarios tick by tick.

use devsmgr::ProgramManager;
use devsmgr::adapters::memory_pipes::MemoryPipes;
use devsmgr::adapters::sim_engine::SimEngine;
use devsmgr::adapters::sim_flash::SimFlash;
use devsmgr::app::events::ManagerEvent;
use devsmgr::app::ports::{DebugHooks, EventSink};
use devsmgr::config::{ManagerConfig, ms};
use devsmgr::program::IMAGE_MAGIC;
use devsmgr::rpc::packet::MAX_PAYLOAD;
use devsmgr::status::Status;

// ── Recording sink ────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<ManagerEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn statuses(&self) -> Vec<Status> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ManagerEvent::StatusChanged(s) => Some(*s),
                _ => None,
            })
            .collect()
    }

    pub fn panics(&self) -> Vec<(u32, u32)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ManagerEvent::ProgramPanic {
                    panic_code,
                    program_counter,
                } => Some((*panic_code, *program_counter)),
                _ => None,
            })
            .collect()
    }

    pub fn changes(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, ManagerEvent::ProgramChanged))
            .count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &ManagerEvent) {
        self.events.push(*event);
    }
}

// ── Debug hooks ───────────────────────────────────────────────

#[derive(Default)]
pub struct CountingHooks {
    pub restarts: u32,
    pub panics: Vec<u32>,
}

impl DebugHooks for CountingHooks {
    fn restarted(&mut self) {
        self.restarts += 1;
    }

    fn panicked(&mut self, code: u32) {
        self.panics.push(code);
    }
}

// ── Device ────────────────────────────────────────────────────

pub const REGION: u32 = 8 * 1024;
pub const PAGE: u32 = 1024;

pub struct Device {
    pub mgr: ProgramManager<SimFlash, SimEngine, CountingHooks>,
    pub pipes: MemoryPipes,
    pub sink: RecordingSink,
    pub now: u32,
}

#[allow(dead_code)]
impl Device {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Device whose clock starts at `now` (for wraparound scenarios).
    pub fn starting_at(now: u32) -> Self {
        Self::with_flash(SimFlash::new(REGION, PAGE), now)
    }

    pub fn with_flash(flash: SimFlash, now: u32) -> Self {
        let config = ManagerConfig {
            max_program_size: REGION,
            page_size: PAGE,
            ..ManagerConfig::default()
        };
        Self {
            mgr: ProgramManager::new(config, flash, SimEngine::new(), CountingHooks::default(), now)
                .expect("device config matches its flash"),
            pipes: MemoryPipes::new(MAX_PAYLOAD),
            sink: RecordingSink::default(),
            now,
        }
    }

    /// Advance the clock by `millis` and poll once.
    pub fn advance(&mut self, millis: u32) {
        self.now = self.now.wrapping_add(ms(millis));
        self.poll();
    }

    pub fn poll(&mut self) {
        self.mgr.process(self.now, &mut self.pipes, &mut self.sink);
    }

    /// Advance in 10 ms steps for `millis`.
    pub fn run_for(&mut self, millis: u32) {
        for _ in 0..millis / 10 {
            self.advance(10);
        }
    }

    /// Full streamed deploy: command, chunks, peer close.
    pub fn stream_deploy(&mut self, image: &[u8], chunk: usize) -> Option<u32> {
        self.mgr
            .start_deploy(image.len() as u32, &mut self.pipes, &mut self.sink)?;
        for part in image.chunks(chunk) {
            if self
                .mgr
                .deploy_chunk(part, self.now, &mut self.pipes, &mut self.sink)
                .is_err()
            {
                return None;
            }
        }
        self.pipes.peer_closes_inbound();
        self.mgr.deploy_closed(self.now, &mut self.sink).ok()
    }

    /// Reboot: rebuild the manager over the same flash contents.
    pub fn reboot(self) -> Self {
        let now = self.now;
        Self::with_flash(self.mgr.into_flash(), now)
    }
}

/// Image the simulated engine accepts, filled with a position pattern.
pub fn valid_image(len: usize) -> Vec<u8> {
    let mut img: Vec<u8> = (0..len).map(|i| (i * 31 + 7) as u8).collect();
    img[..IMAGE_MAGIC.len()].copy_from_slice(&IMAGE_MAGIC);
    img
}
