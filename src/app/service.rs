//! Program manager — the hexagonal core.
//!
//! [`ProgramManager`] owns the program store, the execution supervisor, the
//! status publisher and both pipe sessions.  It exposes one poll entry
//! point ([`process`](ProgramManager::process)) and one command entry point
//! ([`handle_command`](ProgramManager::handle_command)); the caller never
//! runs them concurrently.  All I/O flows through port traits, so the whole
//! manager is testable with in-memory adapters.
//!
//! ```text
//!   FlashPort ◀──▶ ┌─────────────────────────────┐ ──▶ EventSink
//!                  │        ProgramManager        │
//! ScriptEngine ◀── │ Store · Supervisor · Status  │ ◀─▶ PipeTransport
//!                  └─────────────────────────────┘
//! ```

use log::{error, info, warn};

use crate::config::ManagerConfig;
use crate::error::{BulkDeployError, ConfigError, DeployError};
use crate::program::store::ProgramStore;
use crate::program::{EMPTY_PROGRAM, ProgramHeader};
use crate::session::{DeploySession, ReadbackSession};
use crate::status::{Status, StatusPublisher};
use crate::supervisor::{Launch, PANIC_REBOOT, Supervisor};

use super::commands::{ManagerCommand, Reply};
use super::events::ManagerEvent;
use super::ports::{
    ClientEvent, DebugHooks, EventSink, FlashPort, NoHooks, PipeTarget, PipeTransport,
    ScriptEngine, VerifyError,
};

/// The store takes its geometry from the flash port; the config must agree.
fn check_geometry(config: &ManagerConfig, flash: &impl FlashPort) -> Result<(), ConfigError> {
    let pairs = [
        ("page_size", config.page_size, flash.page_size()),
        ("max_program_size", config.max_program_size, flash.size()),
    ];
    for (field, configured, actual) in pairs {
        if configured != actual {
            return Err(ConfigError::FlashMismatch {
                field,
                configured,
                actual,
            });
        }
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// ProgramManager
// ───────────────────────────────────────────────────────────────

pub struct ProgramManager<F: FlashPort, E: ScriptEngine, H: DebugHooks = NoHooks> {
    config: ManagerConfig,
    store: ProgramStore<F>,
    supervisor: Supervisor<E, H>,
    publisher: StatusPublisher,
    deploy: DeploySession,
    readback: ReadbackSession,
}

impl<F: FlashPort, E: ScriptEngine, H: DebugHooks> ProgramManager<F, E, H> {
    /// Construct the manager.  Nothing runs until the first autostart
    /// sample, `boot_delay_ms` after `now`.
    ///
    /// Fails if `config` is out of range or its geometry does not describe
    /// `flash`.
    pub fn new(
        config: ManagerConfig,
        flash: F,
        engine: E,
        hooks: H,
        now: u32,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        check_geometry(&config, &flash)?;

        if let Err(VerifyError(code)) = engine.verify(&EMPTY_PROGRAM) {
            error!("MGR: engine rejects the built-in empty program ({})", code);
        }

        let supervisor = Supervisor::new(engine, hooks, &config, now);
        let store = ProgramStore::new(flash);
        match store.header() {
            Some(hd) => info!(
                "MGR: stored program {} bytes, hash {:#010x}",
                hd.size, hd.hash
            ),
            None => info!("MGR: no stored program"),
        }

        Ok(Self {
            config,
            store,
            supervisor,
            publisher: StatusPublisher::new(),
            deploy: DeploySession::new(),
            readback: ReadbackSession::new(),
        })
    }

    // ── Poll entry ────────────────────────────────────────────

    /// One poll tick: pump the readback, run the autostart timer, check the
    /// live program for a fault.
    pub fn process(
        &mut self,
        now: u32,
        pipes: &mut impl PipeTransport,
        sink: &mut impl EventSink,
    ) {
        self.readback.pump(self.store.image(), pipes);

        if self.supervisor.autostart_due(now) {
            self.supervisor.try_run(self.store.image());
            self.publish_status(sink);
        }

        if let Some(fault) = self.supervisor.poll_fault(now) {
            let panic_code = if fault.code == PANIC_REBOOT { 0 } else { fault.code };
            sink.emit(&ManagerEvent::ProgramPanic {
                panic_code,
                program_counter: fault.pc,
            });
            self.publish_status(sink);
        }
    }

    // ── Command entry ─────────────────────────────────────────

    /// Execute a decoded command.  Returns the reply payload, if the
    /// command has one.
    pub fn handle_command(
        &mut self,
        cmd: ManagerCommand,
        now: u32,
        pipes: &mut impl PipeTransport,
        sink: &mut impl EventSink,
    ) -> Option<Reply> {
        match cmd {
            ManagerCommand::DeployProgram { size } => {
                self.start_deploy(size, pipes, sink).map(Reply::Port)
            }
            ManagerCommand::ReadProgram(target) => {
                self.read_program(target, pipes);
                None
            }

            ManagerCommand::GetProgramSize => Some(Reply::U32(self.store.program_size())),
            ManagerCommand::GetProgramHash => Some(Reply::U32(self.store.program_hash())),
            ManagerCommand::GetProgramSha256 => Some(Reply::Digest(self.store.sha256())),
            ManagerCommand::GetStatusCode => Some(Reply::U32(self.status().code())),
            ManagerCommand::GetRuntimeVersion => Some(Reply::U32(self.runtime_version())),

            ManagerCommand::GetRunning => Some(Reply::Bool(self.is_running())),
            ManagerCommand::GetAutostart => Some(Reply::Bool(self.supervisor.autostart())),
            ManagerCommand::GetLogging => Some(Reply::Bool(self.supervisor.logging())),

            ManagerCommand::SetRunning(on) => {
                self.set_running(on, sink);
                None
            }
            ManagerCommand::SetAutostart(on) => {
                self.supervisor.set_autostart(on, now);
                None
            }
            ManagerCommand::SetLogging(on) => {
                self.supervisor.set_logging(on);
                None
            }
        }
    }

    // ── Deploy ────────────────────────────────────────────────

    /// Validate `size`, stop the running program and invalidate the stored
    /// one.  `size == 0` just clears the program.
    pub fn deploy_start(
        &mut self,
        size: u32,
        sink: &mut impl EventSink,
    ) -> Result<(), DeployError> {
        self.store.check_deploy_size(size)?;
        self.supervisor.stop();
        let result = self.store.deploy_start(size);
        self.publish_status(sink);
        result
    }

    /// Deploy command: start a deploy and open the inbound pipe.  Returns
    /// the port for the peer, or `None` if the request was ignored.
    pub fn start_deploy(
        &mut self,
        size: u32,
        pipes: &mut impl PipeTransport,
        sink: &mut impl EventSink,
    ) -> Option<u16> {
        if let Err(e) = self.deploy_start(size, sink) {
            warn!("DEPLOY: ignoring request for {} bytes: {}", size, e);
            return None;
        }
        match self.deploy.open(pipes) {
            Ok(port) => Some(port),
            Err(e) => {
                warn!("DEPLOY: cannot open inbound pipe: {}", e);
                None
            }
        }
    }

    /// One inbound chunk.  A rejected chunk closes the pipe from this side
    /// and runs the close path.
    pub fn deploy_chunk(
        &mut self,
        data: &[u8],
        now: u32,
        pipes: &mut impl PipeTransport,
        sink: &mut impl EventSink,
    ) -> Result<(), DeployError> {
        let result = self.store.deploy_write(data);
        if result.is_err() && self.deploy.close(pipes) {
            let _ = self.finish_deploy(now, sink);
        }
        result
    }

    /// The inbound pipe was closed by the peer.  Commits the program if
    /// every declared byte arrived; returns its hash.
    pub fn deploy_closed(
        &mut self,
        now: u32,
        sink: &mut impl EventSink,
    ) -> Result<u32, DeployError> {
        self.deploy.closed_by_peer();
        self.finish_deploy(now, sink)
    }

    fn finish_deploy(&mut self, now: u32, sink: &mut impl EventSink) -> Result<u32, DeployError> {
        let result = self.store.deploy_finalize();
        match result {
            Ok(_) => {
                self.supervisor.stop();
                sink.emit(&ManagerEvent::ProgramChanged);
                self.supervisor.restart_now(now);
                self.publish_status(sink);
            }
            Err(DeployError::NoSession) => {}
            Err(e) => warn!("DEPLOY: not committed: {}", e),
        }
        result
    }

    /// Write a whole image in one call, as used by a local loader.
    ///
    /// Runs the same start/write/finalize path as a streamed deploy, then
    /// verifies the committed image with the engine.
    pub fn deploy_image(
        &mut self,
        image: &[u8],
        now: u32,
        sink: &mut impl EventSink,
    ) -> Result<(), BulkDeployError> {
        let size = u32::try_from(image.len()).map_err(|_| BulkDeployError::SizeRejected)?;
        self.deploy_start(size, sink)
            .map_err(|_| BulkDeployError::SizeRejected)?;
        if size == 0 {
            return Err(BulkDeployError::EmptyImage);
        }

        let chunk = self.config.bulk_chunk_size as usize;
        for part in image.chunks(chunk) {
            self.store
                .deploy_write(part)
                .map_err(|_| BulkDeployError::WriteRejected)?;
        }
        self.finish_deploy(now, sink)
            .map_err(|_| BulkDeployError::FinalizeRejected)?;

        let image = self.store.image().ok_or(BulkDeployError::HeaderMissing)?;
        self.supervisor
            .engine()
            .verify(image)
            .map_err(|VerifyError(code)| BulkDeployError::Verify(code))
    }

    // ── Readback ──────────────────────────────────────────────

    /// Read command: stream the stored image to `target`.
    pub fn read_program(&mut self, target: PipeTarget, pipes: &mut impl PipeTransport) {
        // Open failures are logged by the session; the peer just sees no data.
        let _ = self.readback.start(target, pipes);
    }

    // ── Execution control ─────────────────────────────────────

    pub fn set_running(&mut self, on: bool, sink: &mut impl EventSink) {
        if on && !self.supervisor.is_running() {
            if self.supervisor.try_run(self.store.image()) == Launch::Failed {
                warn!("RUN: start request failed");
            }
            self.publish_status(sink);
        } else if !on && self.supervisor.stop() {
            self.publish_status(sink);
        }
    }

    /// Stop the program and restart it shortly.
    pub fn restart(&mut self, now: u32, sink: &mut impl EventSink) {
        self.supervisor.restart(now);
        self.publish_status(sink);
    }

    /// Relay a client-layer event into the running program.
    pub fn client_event(&mut self, event: &ClientEvent) {
        self.supervisor.client_event(event);
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn status(&self) -> Status {
        Status::derive(self.supervisor.is_running(), self.store.header().as_ref())
    }

    pub fn header(&self) -> Option<ProgramHeader> {
        self.store.header()
    }

    pub fn is_running(&self) -> bool {
        self.supervisor.is_running()
    }

    pub fn runtime_version(&self) -> u32 {
        self.supervisor.engine().runtime_version()
    }

    pub fn context(&self) -> Option<&E::Context> {
        self.supervisor.context()
    }

    pub fn context_mut(&mut self) -> Option<&mut E::Context> {
        self.supervisor.context_mut()
    }

    pub fn store(&self) -> &ProgramStore<F> {
        &self.store
    }

    pub fn supervisor(&self) -> &Supervisor<E, H> {
        &self.supervisor
    }

    pub fn supervisor_mut(&mut self) -> &mut Supervisor<E, H> {
        &mut self.supervisor
    }

    pub fn is_deploying(&self) -> bool {
        self.store.is_deploying()
    }

    pub fn is_reading(&self) -> bool {
        self.readback.is_active()
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Tear down and hand back the flash, e.g. to persist it.
    pub fn into_flash(self) -> F {
        self.store.into_flash()
    }

    // ── Internal ──────────────────────────────────────────────

    fn publish_status(&mut self, sink: &mut impl EventSink) {
        let status = self.status();
        self.publisher.publish(status, sink);
    }
}
