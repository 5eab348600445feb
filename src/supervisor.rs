//! Execution supervisor — owns the live program context.
//!
//! Two states: **Stopped** (no context) and **Running** (context present).
//! The supervisor decides *when* to start, stop and restart; the manager
//! decides *what* image to hand it and publishes the resulting status.
//!
//! ```text
//!                try_run
//!   Stopped ───────────────▶ Running
//!      ▲                        │
//!      └──── stop / fault ──────┘   fault ⇒ next_restart = now + 1 s | 5 s
//! ```

use log::{debug, error, info, warn};

use crate::app::ports::{
    ClientEvent, ContextConfig, DebugHooks, ExecutionContext, ProgramFault, ScriptEngine,
    VerifyError,
};
use crate::config::{ManagerConfig, ms};
use crate::program::EMPTY_PROGRAM;
use crate::scheduler::Deadline;

/// Panic code a program raises to request a clean restart.
pub const PANIC_REBOOT: u32 = 60002;

/// What [`Supervisor::try_run`] ended up running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Launch {
    /// The stored image.
    Stored,
    /// The built-in empty program.
    Fallback,
    /// Not even the empty program could be started.
    Failed,
}

pub struct Supervisor<E: ScriptEngine, H: DebugHooks> {
    engine: E,
    hooks: H,
    ctx: Option<E::Context>,
    ctx_cfg: ContextConfig,

    autostart: bool,
    logging: bool,
    next_restart: Deadline,

    autostart_period: u32,
    reboot_restart_delay: u32,
    fault_restart_delay: u32,
    restart_request_delay: u32,
}

impl<E: ScriptEngine, H: DebugHooks> Supervisor<E, H> {
    /// Stopped supervisor; first autostart attempt is due after the boot
    /// delay.
    pub fn new(engine: E, hooks: H, config: &ManagerConfig, now: u32) -> Self {
        Self {
            engine,
            hooks,
            ctx: None,
            ctx_cfg: ContextConfig {
                service_index: config.service_index,
            },
            autostart: config.autostart,
            logging: config.logging,
            next_restart: Deadline::after(now, ms(config.boot_delay_ms)),
            autostart_period: ms(config.autostart_period_ms),
            reboot_restart_delay: ms(config.reboot_restart_delay_ms),
            fault_restart_delay: ms(config.fault_restart_delay_ms),
            restart_request_delay: ms(config.restart_request_delay_ms),
        }
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn context(&self) -> Option<&E::Context> {
        self.ctx.as_ref()
    }

    pub fn context_mut(&mut self) -> Option<&mut E::Context> {
        self.ctx.as_mut()
    }

    pub fn is_running(&self) -> bool {
        self.ctx.is_some()
    }

    pub fn autostart(&self) -> bool {
        self.autostart
    }

    pub fn logging(&self) -> bool {
        self.logging
    }

    pub fn next_restart(&self) -> u32 {
        self.next_restart.tick()
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Start `image`, or the empty program if the image is missing, empty,
    /// malformed, or refused by the engine.  Replaces any live context.
    pub fn try_run(&mut self, image: Option<&[u8]>) -> Launch {
        self.ctx = None;

        let stored = image.filter(|img| !img.is_empty()).filter(|img| {
            match self.engine.verify(img) {
                Ok(()) => true,
                Err(VerifyError(code)) => {
                    warn!("RUN: stored image failed verification ({})", code);
                    false
                }
            }
        });

        if let Some(img) = stored {
            if let Some(ctx) = self.engine.create_context(img, &self.ctx_cfg) {
                self.install(ctx);
                self.hooks.restarted();
                info!("RUN: started stored program ({} bytes)", img.len());
                return Launch::Stored;
            }
            warn!("RUN: engine refused stored image");
        }

        match self.engine.create_context(&EMPTY_PROGRAM, &self.ctx_cfg) {
            Some(ctx) => {
                self.install(ctx);
                debug!("RUN: running empty program");
                Launch::Fallback
            }
            None => {
                error!("RUN: empty program failed to start");
                Launch::Failed
            }
        }
    }

    fn install(&mut self, mut ctx: E::Context) {
        ctx.set_logging(self.logging);
        self.ctx = Some(ctx);
    }

    /// Tear down the live context, if any.  Returns `true` if one existed.
    pub fn stop(&mut self) -> bool {
        let stopped = self.ctx.take().is_some();
        if stopped {
            debug!("RUN: stopped");
        }
        stopped
    }

    /// Stop and schedule a quick restart.
    pub fn restart(&mut self, now: u32) {
        self.stop();
        self.next_restart.schedule(now, self.restart_request_delay);
    }

    /// Make the next autostart sample fire immediately.
    pub fn restart_now(&mut self, now: u32) {
        self.next_restart.schedule(now, 0);
    }

    /// Periodic autostart check.  Advances the sampling deadline whenever it
    /// is due, whether or not a start is wanted.
    pub fn autostart_due(&mut self, now: u32) -> bool {
        self.next_restart.should_sample(now, self.autostart_period)
            && self.autostart
            && self.ctx.is_none()
    }

    /// Inspect the live context for a fault.  On a fault the context is
    /// torn down and the restart deadline is pushed out: one second for a
    /// reboot request, five for anything else.
    pub fn poll_fault(&mut self, now: u32) -> Option<ProgramFault> {
        let fault = self.ctx.as_ref()?.fault()?;

        self.hooks.panicked(fault.code);
        self.stop();

        let delay = if fault.code == PANIC_REBOOT {
            info!("RUN: program requested restart");
            self.reboot_restart_delay
        } else {
            warn!("RUN: program panic {} at pc={:#x}", fault.code, fault.pc);
            self.fault_restart_delay
        };
        self.next_restart.schedule(now, delay);
        Some(fault)
    }

    // ── Registers ─────────────────────────────────────────────

    pub fn set_autostart(&mut self, on: bool, now: u32) {
        self.autostart = on;
        if on {
            self.restart_now(now);
        }
    }

    pub fn set_logging(&mut self, on: bool) {
        self.logging = on;
        if let Some(ctx) = self.ctx.as_mut() {
            ctx.set_logging(on);
        }
    }

    pub fn client_event(&mut self, event: &ClientEvent) {
        if let Some(ctx) = self.ctx.as_mut() {
            ctx.client_event(event);
        }
    }
}
