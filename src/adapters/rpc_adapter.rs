//! Packet event sink adapter.
//!
//! Implements [`EventSink`] by encoding [`ManagerEvent`]s into event
//! packets and queueing them for the transport.  This is the "push"
//! direction: the device tells its peers about status changes, panics and
//! new programs.  The queue is bounded; when the transport falls behind the
//! oldest event is dropped.

use heapless::Deque;
use log::warn;

use crate::app::events::ManagerEvent;
use crate::app::ports::EventSink;
use crate::rpc::packet::{Packet, encode_event};

/// Outbound event queue depth.
pub const EVENT_QUEUE_LEN: usize = 8;

pub struct PacketEventSink {
    queue: Deque<Packet, EVENT_QUEUE_LEN>,
    counter: u8,
    dropped: u32,
}

impl Default for PacketEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketEventSink {
    pub fn new() -> Self {
        Self {
            queue: Deque::new(),
            counter: 0,
            dropped: 0,
        }
    }

    /// Next packet for the transport to send.
    pub fn pop(&mut self) -> Option<Packet> {
        self.queue.pop_front()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Events lost to a full queue.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    fn alloc_counter(&mut self) -> u8 {
        let c = self.counter;
        self.counter = (self.counter + 1) & 0x7f;
        c
    }
}

impl EventSink for PacketEventSink {
    fn emit(&mut self, event: &ManagerEvent) {
        let counter = self.alloc_counter();
        let pkt = encode_event(event, counter);
        if self.queue.is_full() {
            self.queue.pop_front();
            self.dropped += 1;
            warn!("EVENT: queue full, dropped oldest ({} total)", self.dropped);
        }
        // Space was made above.
        let _ = self.queue.push_back(pkt);
    }
}
