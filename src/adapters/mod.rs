//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements     | Connects to                   |
//! |----------------|----------------|-------------------------------|
//! | `sim_flash`    | FlashPort      | In-memory NOR flash           |
//! | `sim_engine`   | ScriptEngine   | Structural-check stand-in VM  |
//! | `memory_pipes` | PipeTransport  | Recording in-memory pipes     |
//! | `log_sink`     | EventSink      | `log` output                  |
//! | `rpc_adapter`  | EventSink      | Event packet queue            |
//! | `time`         | (clock)        | Host monotonic timer          |

pub mod log_sink;
pub mod memory_pipes;
pub mod rpc_adapter;
pub mod sim_engine;
pub mod sim_flash;
pub mod time;
