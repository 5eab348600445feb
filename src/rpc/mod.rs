//! Numeric-command RPC layer.
//!
//! ```text
//!   transport ──Packet──▶ packet::decode ──ManagerCommand──▶ ProgramManager
//!       ▲                                                       │
//!       └────────── packet::encode_reply / encode_event ◀───────┘
//! ```
//!
//! Framing, addressing and pipe plumbing belong to the transport.

pub mod dispatch;
pub mod packet;

pub use dispatch::handle_packet;
pub use packet::Packet;
