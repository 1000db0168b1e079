//! Outbound packet manager
//!
//! Reliable delivery over a half-duplex radio is one hop at a time: a
//! packet that asks for an acknowledgement is parked in a pending slot and
//! re-sent on a timer until the next hop's ACK arrives or the overall
//! timeout gives up on it.
//!
//! ```text
//!    [Idle]
//!       | schedule
//!       v
//!    [Pending, attempts=1] --ACK--> [Done]
//!       | now-last >= retry
//!       v
//!    [Pending, attempts++] --ACK--> [Done]
//!       | now-first >= timeout
//!       v
//!    [Failed]
//! ```
//!
//! Packets that do not request an ACK pass straight through to the
//! transmit ring and are never retained. A transmit ring with no room at
//! retry time defers the attempt to the next pump; only the overall
//! timeout counts a delivery as failed.

use crate::buffer::FrameBuffer;
use crate::packet::{Header, Packet, MAX_PACKET};
use tracing::{debug, warn};

/// Number of simultaneously pending reliable sends
pub const OUTBOUND_SLOTS: usize = 8;

#[derive(Debug, Clone, Copy)]
struct PendingSend {
    packet: Packet,
    first_send_ms: u32,
    last_attempt_ms: u32,
    attempts: u8,
}

/// Pending-send queue with ACK correlation, retry and timeout
#[derive(Debug)]
pub struct OutboundPacketManager {
    slots: [Option<PendingSend>; OUTBOUND_SLOTS],
    tx_timeout_ms: u32,
    tx_retry_ms: u32,
    retransmissions: u32,
    failed_deliveries: u32,
}

impl OutboundPacketManager {
    /// `tx_timeout_ms` bounds the whole delivery attempt; `tx_retry_ms`
    /// is the spacing between re-sends inside that bound.
    pub fn new(tx_timeout_ms: u32, tx_retry_ms: u32) -> Self {
        Self {
            slots: [None; OUTBOUND_SLOTS],
            tx_timeout_ms,
            tx_retry_ms,
            retransmissions: 0,
            failed_deliveries: 0,
        }
    }

    /// Queue a packet for transmission, emitting the first attempt onto
    /// `tx` immediately.
    ///
    /// Packets without the ACK-required flag are emitted and forgotten;
    /// the return value is whether the transmit ring took the frame.
    /// ACK-required packets claim a pending slot (false when none is
    /// free) and stay there until acknowledged or timed out.
    pub fn schedule(&mut self, packet: &Packet, tx: &mut FrameBuffer, now_ms: u32) -> bool {
        if !packet.header.type_flags.is_ack_required() {
            return emit(packet, tx);
        }

        let Some(free) = self.slots.iter().position(|slot| slot.is_none()) else {
            debug!(id = packet.header.id, "outbound slots full");
            return false;
        };
        let sent = emit(packet, tx);
        self.slots[free] = Some(PendingSend {
            packet: *packet,
            first_send_ms: now_ms,
            last_attempt_ms: now_ms,
            // A full transmit ring leaves attempts at zero so the next
            // pump re-tries without waiting out the retry interval.
            attempts: u8::from(sent),
        });
        true
    }

    /// Correlate a received acknowledgement with a pending slot and free
    /// it. The match key is the pending packet's (id, next hop) against
    /// the ACK's (id, sender). Unmatched ACKs are dropped silently.
    pub fn process_ack(&mut self, ack: &Header) -> bool {
        for slot in self.slots.iter_mut() {
            let matched = slot.as_ref().map_or(false, |pending| {
                pending.packet.header.id == ack.id
                    && pending.packet.header.dest_addr == ack.source_addr
            });
            if matched {
                *slot = None;
                return true;
            }
        }
        debug!(id = ack.id, from = %ack.source_addr, "unmatched ack");
        false
    }

    /// Advance timers: expire slots past the delivery timeout and re-emit
    /// slots whose retry interval has elapsed.
    pub fn pump(&mut self, tx: &mut FrameBuffer, now_ms: u32) {
        for slot in self.slots.iter_mut() {
            let Some(pending) = slot.as_mut() else {
                continue;
            };

            if now_ms.wrapping_sub(pending.first_send_ms) >= self.tx_timeout_ms {
                warn!(
                    id = pending.packet.header.id,
                    to = %pending.packet.header.dest_addr,
                    attempts = pending.attempts,
                    "delivery timed out"
                );
                self.failed_deliveries += 1;
                *slot = None;
                continue;
            }

            let due = pending.attempts == 0
                || now_ms.wrapping_sub(pending.last_attempt_ms) >= self.tx_retry_ms;
            if !due {
                continue;
            }
            if emit(&pending.packet, tx) {
                if pending.attempts > 0 {
                    self.retransmissions += 1;
                }
                pending.attempts = pending.attempts.saturating_add(1);
                pending.last_attempt_ms = now_ms;
            } else {
                debug!(id = pending.packet.header.id, "tx ring full, retry deferred");
            }
        }
    }

    /// Number of occupied pending slots
    pub fn pending_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Re-sends performed beyond each packet's first emission
    pub fn retransmissions(&self) -> u32 {
        self.retransmissions
    }

    /// Deliveries abandoned at the timeout
    pub fn failed_deliveries(&self) -> u32 {
        self.failed_deliveries
    }
}

fn emit(packet: &Packet, tx: &mut FrameBuffer) -> bool {
    let mut wire = [0u8; MAX_PACKET];
    let n = packet.encode(&mut wire);
    tx.push(&[], &wire[..n])
}
