//! Host capability ports and engine configuration
//!
//! The engine runs on very different hosts (solar birdhouse hardware, a
//! desktop simulator, the test harness), so everything host-specific is
//! behind a small trait injected at construction: sensors and power
//! control ([`Instrumentation`]), identity and policy ([`Configuration`]),
//! and the operator-facing text channel ([`Console`]).

use crate::packet::{CallSign, NodeAddr};
use serde::{Deserialize, Serialize};

/// Hardware sensors and power control
pub trait Instrumentation {
    fn software_version(&self) -> u16;
    fn battery_mv(&self) -> u16;
    fn panel_mv(&self) -> u16;
    fn temperature_c(&self) -> i16;
    fn humidity_pct(&self) -> i16;
    fn device_class(&self) -> u16;
    fn device_revision(&self) -> u16;

    /// Reboot the node. Terminal: no further engine calls are guaranteed.
    fn restart(&mut self);

    /// Power-cycle only the radio
    fn restart_radio(&mut self);

    /// Enter low-power sleep for the given duration
    fn sleep_ms(&mut self, ms: u32);
}

/// Node identity and operating policy
pub trait Configuration {
    /// This node's mesh address
    fn addr(&self) -> NodeAddr;

    /// This node's call sign
    fn call(&self) -> CallSign;

    /// Battery level below which the node should conserve power
    fn battery_limit_mv(&self) -> u16;

    fn boot_count(&self) -> u16;
    fn sleep_count(&self) -> u16;

    /// 0 = quiet, higher values enable per-frame console tracing
    fn log_level(&self) -> u8;

    /// 1 = machine-readable console output, otherwise human-readable
    fn command_mode(&self) -> u8;

    /// Validate the passcode carried by administrative packets
    fn check_passcode(&self, passcode: u32) -> bool;
}

/// Operator-facing line sink (the station's serial console)
pub trait Console {
    fn write_line(&mut self, line: &str);
}

/// Tunable engine parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Receive ring capacity in bytes
    pub rx_buffer_bytes: usize,
    /// Transmit ring capacity in bytes
    pub tx_buffer_bytes: usize,
    /// Give up on a reliable delivery after this long
    pub tx_timeout_ms: u32,
    /// Spacing between re-sends of an unacknowledged packet
    pub tx_retry_ms: u32,
    /// How long a received (origin, id) pair suppresses repeats.
    /// Must exceed the longest retry horizon of any peer.
    pub dedup_window_ms: u32,
    /// Capacity of the duplicate-suppression ring
    pub dedup_slots: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rx_buffer_bytes: 4096,
            tx_buffer_bytes: 4096,
            tx_timeout_ms: 10_000,
            tx_retry_ms: 2_000,
            dedup_window_ms: 30_000,
            dedup_slots: 8,
        }
    }
}

/// Diagnostic counters owned by the message processor
#[derive(Debug, Clone, Default, Serialize)]
pub struct NodeStats {
    /// Frames accepted by the receive filter
    pub rx_packets: u32,
    /// Packets handed to the outbound manager
    pub tx_packets: u32,
    /// Frames dropped for bad framing or wrong protocol version
    pub bad_rx_packets: u32,
    /// Packets dropped because no route existed, forward or return
    pub bad_routes: u32,
    /// Packets relayed toward another node
    pub forwarded: u32,
    /// Repeats suppressed by the duplicate log
    pub duplicates_dropped: u32,
    /// Acknowledgements synthesized for received frames
    pub acks_sent: u32,
    /// Acknowledgements received and handed to the outbound manager
    pub acks_received: u32,
    /// Re-sends beyond each packet's first emission
    pub retransmissions: u32,
    /// Reliable deliveries abandoned at the timeout
    pub delivery_failures: u32,
}
