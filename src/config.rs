//! Manager configuration parameters
//!
//! Timing and geometry for the program manager.  Tick values are device
//! microseconds on a free-running, wrapping `u32` clock.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Write chunks and image sizes must be multiples of this.
pub const ALIGN: u32 = 32;

/// Ticks per millisecond of device time.
pub const TICKS_PER_MS: u32 = 1000;

/// Convert milliseconds to device ticks.
pub const fn ms(n: u32) -> u32 {
    n.wrapping_mul(TICKS_PER_MS)
}

/// Core manager configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    // --- Flash geometry ---
    /// Size of the program region in bytes (header + image)
    pub max_program_size: u32,
    /// Flash erase page size in bytes (power of two)
    pub page_size: u32,

    // --- Supervisor timing ---
    /// Delay before the first autostart attempt after boot (ms)
    pub boot_delay_ms: u32,
    /// Period of the autostart sampling timer (ms)
    pub autostart_period_ms: u32,
    /// Restart delay after a reboot-class fault (ms)
    pub reboot_restart_delay_ms: u32,
    /// Restart delay after any other fault (ms)
    pub fault_restart_delay_ms: u32,
    /// Restart delay after an explicit restart request (ms)
    pub restart_request_delay_ms: u32,

    // --- Initial register values ---
    pub autostart: bool,
    pub logging: bool,

    // --- Misc ---
    /// Chunk size used by the one-shot deploy path
    pub bulk_chunk_size: u32,
    /// Service index handed to each new execution context
    pub service_index: u8,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            // Flash
            max_program_size: 64 * 1024,
            page_size: 4096,

            // Timing
            boot_delay_ms: 1500,
            autostart_period_ms: 8000,
            reboot_restart_delay_ms: 1000,
            fault_restart_delay_ms: 5000,
            restart_request_delay_ms: 50,

            // Registers
            autostart: true,
            logging: true,

            bulk_chunk_size: 128,
            service_index: 0,
        }
    }
}

impl ManagerConfig {
    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.page_size.is_power_of_two() || self.page_size < 2 * ALIGN {
            return Err(ConfigError::ValidationFailed(
                "page_size must be a power of two of at least 64",
            ));
        }
        if self.max_program_size % self.page_size != 0 {
            return Err(ConfigError::ValidationFailed(
                "max_program_size must be a whole number of pages",
            ));
        }
        if self.max_program_size <= crate::program::HEADER_SIZE as u32 + ALIGN {
            return Err(ConfigError::ValidationFailed(
                "max_program_size leaves no room for an image",
            ));
        }
        if self.bulk_chunk_size == 0
            || self.bulk_chunk_size % ALIGN != 0
            || self.bulk_chunk_size >= self.page_size
        {
            return Err(ConfigError::ValidationFailed(
                "bulk_chunk_size must be aligned and smaller than a page",
            ));
        }
        if self.autostart_period_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "autostart_period_ms must be nonzero",
            ));
        }
        if self.reboot_restart_delay_ms > self.fault_restart_delay_ms {
            return Err(ConfigError::ValidationFailed(
                "reboot restart must not be slower than fault restart",
            ));
        }
        // Signed tick differences only order deadlines within half the clock range.
        let longest = self
            .boot_delay_ms
            .max(self.autostart_period_ms)
            .max(self.fault_restart_delay_ms);
        if u64::from(longest) * u64::from(TICKS_PER_MS) >= u64::from(i32::MAX as u32) {
            return Err(ConfigError::ValidationFailed(
                "delays must fit in half the tick range",
            ));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration document.
    pub fn from_json(text: &str) -> Result<Self, crate::error::Error> {
        let cfg: Self = serde_json::from_str(text)
            .map_err(|_| ConfigError::ValidationFailed("malformed JSON configuration"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
