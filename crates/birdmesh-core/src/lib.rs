//! # Birdmesh Packet Engine
//!
//! Per-node message processing for a LoRa birdhouse mesh: solar-powered
//! stations relay small datagrams hop by hop over a half-duplex radio,
//! with administratively set routes and hop-by-hop acknowledgements.
//!
//! The engine is the part between the radio driver and the operator
//! console:
//!
//! - **Packet model**: fixed-layout headers with end-to-end origin and
//!   destination fields, type-tagged payloads, ACK construction
//! - **FrameBuffer**: the byte rings shared with the radio driver
//! - **RoutingTable**: unicast next-hop map with broadcast and
//!   direct-range semantics
//! - **OutboundPacketManager**: at-most-once delivery with timeout-bounded
//!   retry and ACK correlation
//! - **MessageProcessor**: the receive classifier, forwarder and local
//!   request handlers, driven by a cooperative `pump()`
//!
//! ## Example
//!
//! ```rust
//! use birdmesh_core::{
//!     EngineConfig, ManualClock, MessageProcessor, NodeAddr, StaticRoutes,
//! };
//! # use birdmesh_core::{CallSign, Configuration, Console, Instrumentation};
//! # struct Host;
//! # impl Configuration for Host {
//! #     fn addr(&self) -> NodeAddr { NodeAddr::new(1) }
//! #     fn call(&self) -> CallSign { "KC1FSZ".parse().unwrap() }
//! #     fn battery_limit_mv(&self) -> u16 { 3400 }
//! #     fn boot_count(&self) -> u16 { 1 }
//! #     fn sleep_count(&self) -> u16 { 0 }
//! #     fn log_level(&self) -> u8 { 0 }
//! #     fn command_mode(&self) -> u8 { 0 }
//! #     fn check_passcode(&self, p: u32) -> bool { p == 1234 }
//! # }
//! # impl Instrumentation for Host {
//! #     fn software_version(&self) -> u16 { 1 }
//! #     fn battery_mv(&self) -> u16 { 3800 }
//! #     fn panel_mv(&self) -> u16 { 4000 }
//! #     fn temperature_c(&self) -> i16 { 23 }
//! #     fn humidity_pct(&self) -> i16 { 50 }
//! #     fn device_class(&self) -> u16 { 2 }
//! #     fn device_revision(&self) -> u16 { 1 }
//! #     fn restart(&mut self) {}
//! #     fn restart_radio(&mut self) {}
//! #     fn sleep_ms(&mut self, _ms: u32) {}
//! # }
//! # impl Console for Host {
//! #     fn write_line(&mut self, _line: &str) {}
//! # }
//!
//! let mut node = MessageProcessor::new(
//!     Box::new(ManualClock::new(0)),
//!     Box::new(StaticRoutes::new()),
//!     Box::new(Host),
//!     Box::new(Host),
//!     Box::new(Host),
//!     EngineConfig::default(),
//! );
//!
//! // The operator pings node 7 through neighbor 3...
//! node.set_local_route(NodeAddr::new(7), NodeAddr::new(3));
//! node.send_ping(NodeAddr::new(7));
//! node.pump();
//!
//! // ...and the radio driver picks the frame up from the transmit ring.
//! let mut frame = [0u8; 256];
//! assert!(node.next_transmit(&mut frame).is_some());
//! ```

pub mod buffer;
pub mod clock;
pub mod outbound;
pub mod packet;
pub mod processor;
pub mod routing;
pub mod traits;

pub use buffer::FrameBuffer;
pub use clock::{Clock, ManualClock, SystemClock};
pub use outbound::{OutboundPacketManager, OUTBOUND_SLOTS};
pub use packet::{
    CallSign, GetRouteReq, GetRouteResp, Header, NodeAddr, Packet, PacketError, PacketType,
    ResetReq, SedResp, SetRouteReq, TypeFlags, MAX_PACKET, MAX_PAYLOAD, PROTOCOL_VERSION,
};
pub use processor::{MessageProcessor, RSSI_SIDE_LEN};
pub use routing::{DuplicateLog, RoutingTable, StaticRoutes, ROUTE_TABLE_SIZE};
pub use traits::{Configuration, Console, EngineConfig, Instrumentation, NodeStats};
