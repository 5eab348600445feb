//! Simulated bytecode engine.
//!
//! Implements [`ScriptEngine`] with a structural check only: an image is
//! accepted when it starts with [`IMAGE_MAGIC`].  Contexts do not execute
//! anything; they record what the manager tells them and report whatever
//! fault a test or the simulator injects.

use log::debug;

use crate::app::ports::{
    ClientEvent, ContextConfig, ExecutionContext, ProgramFault, ScriptEngine, VerifyError,
};
use crate::program::{EMPTY_PROGRAM, IMAGE_MAGIC};

/// Image format version reported by the simulated engine.
pub const SIM_RUNTIME_VERSION: u32 = 0x0002_0010;

/// Verification code for an image too short to hold the magic.
pub const VERIFY_TOO_SHORT: i32 = -10;
/// Verification code for a bad magic prefix.
pub const VERIFY_BAD_MAGIC: i32 = -11;

#[derive(Debug, Default)]
pub struct SimEngine {
    last_image: Option<Vec<u8>>,
    contexts_created: u32,
    refuse_stored: bool,
    reject_all: bool,
    fault_on_start: Option<ProgramFault>,
}

impl SimEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Image of the most recently created context.
    pub fn last_image(&self) -> Option<&[u8]> {
        self.last_image.as_deref()
    }

    pub fn contexts_created(&self) -> u32 {
        self.contexts_created
    }

    /// Refuse to create contexts for anything but the empty program.
    pub fn refuse_stored(&mut self, on: bool) {
        self.refuse_stored = on;
    }

    /// Fail verification of every image, the empty program included.
    pub fn reject_all(&mut self, on: bool) {
        self.reject_all = on;
    }

    /// Contexts created for stored images start out already faulted.
    pub fn fault_on_start(&mut self, fault: Option<ProgramFault>) {
        self.fault_on_start = fault;
    }
}

impl ScriptEngine for SimEngine {
    type Context = SimContext;

    fn verify(&self, image: &[u8]) -> Result<(), VerifyError> {
        if self.reject_all {
            return Err(VerifyError(VERIFY_BAD_MAGIC));
        }
        if image.len() < IMAGE_MAGIC.len() {
            return Err(VerifyError(VERIFY_TOO_SHORT));
        }
        if image[..IMAGE_MAGIC.len()] != IMAGE_MAGIC {
            return Err(VerifyError(VERIFY_BAD_MAGIC));
        }
        Ok(())
    }

    fn create_context(&mut self, image: &[u8], cfg: &ContextConfig) -> Option<SimContext> {
        let is_empty_program = image == &EMPTY_PROGRAM[..];
        if self.refuse_stored && !is_empty_program {
            return None;
        }
        self.contexts_created += 1;
        self.last_image = Some(image.to_vec());
        debug!(
            "ENGINE: context #{} for {} bytes (service {})",
            self.contexts_created,
            image.len(),
            cfg.service_index
        );
        Some(SimContext {
            logging: false,
            fault: if is_empty_program {
                None
            } else {
                self.fault_on_start
            },
            events: Vec::new(),
            image_len: image.len(),
        })
    }

    fn runtime_version(&self) -> u32 {
        SIM_RUNTIME_VERSION
    }
}

#[derive(Debug)]
pub struct SimContext {
    logging: bool,
    fault: Option<ProgramFault>,
    events: Vec<ClientEvent>,
    image_len: usize,
}

impl SimContext {
    pub fn logging(&self) -> bool {
        self.logging
    }

    pub fn image_len(&self) -> usize {
        self.image_len
    }

    pub fn inject_fault(&mut self, code: u32, pc: u32) {
        self.fault = Some(ProgramFault { code, pc });
    }

    pub fn client_events(&self) -> &[ClientEvent] {
        &self.events
    }
}

impl ExecutionContext for SimContext {
    fn fault(&self) -> Option<ProgramFault> {
        self.fault
    }

    fn set_logging(&mut self, enabled: bool) {
        self.logging = enabled;
    }

    fn client_event(&mut self, event: &ClientEvent) {
        self.events.push(event.clone());
    }
}
