//! Packet types and wire framing
//!
//! This module defines the on-air packet structures for the birdhouse mesh.
//! Every frame is a fixed-layout header followed by a type-tagged payload,
//! small enough that a whole packet lives in a stack value.
//!
//! ## Packet Structure
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                         Mesh Packet (≤ 256B)                       │
//! ├──────────────────────────────┬─────────────────────────────────────┤
//! │         Header (28B)         │         Payload (0-228B)            │
//! └──────────────────────────────┴─────────────────────────────────────┘
//!
//! Header:
//! ┌─────┬──────┬──────┬──────┬──────┬─────────┬─────────┬──────┬──────────┐
//! │ Ver │ Type │  Id  │ Src  │ Dest │ OrigSrc │ FinDest │ Call │ OrigCall │
//! │ 1B  │  1B  │  2B  │  2B  │  2B  │   2B    │   2B    │  8B  │    8B    │
//! └─────┴──────┴──────┴──────┴──────┴─────────┴─────────┴──────┴──────────┘
//! ```
//!
//! `src`/`dest` are rewritten at every hop; `orig_src`/`fin_dest` (and the
//! matching call signs) are preserved end-to-end so a relayed request can be
//! answered back toward its origin. Multi-byte fields are little-endian on
//! the wire regardless of host architecture.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Protocol generation carried in every header. Frames with any other
/// version are rejected at the receive filter.
pub const PROTOCOL_VERSION: u8 = 2;

/// Largest frame the engine will build or accept.
pub const MAX_PACKET: usize = 256;

/// Largest payload that fits behind a header.
pub const MAX_PAYLOAD: usize = MAX_PACKET - Header::WIRE_SIZE;

/// Errors produced by the packet codecs
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketError {
    /// Frame shorter than the structure it claims to carry
    #[error("frame truncated at {0} bytes")]
    Truncated(usize),

    /// Frame longer than any legal packet
    #[error("frame exceeds maximum packet size ({0} bytes)")]
    Oversize(usize),

    /// Payload too large for the packet envelope
    #[error("payload of {0} bytes exceeds the {MAX_PAYLOAD} byte envelope")]
    PayloadTooLarge(usize),

    /// Call sign not representable on the wire
    #[error("call sign must be 1-8 ASCII characters")]
    BadCallSign,
}

/// Node address - 16-bit mesh-wide identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeAddr(u16);

impl NodeAddr {
    /// Unassigned/invalid address
    pub const UNASSIGNED: NodeAddr = NodeAddr(0);

    /// Broadcast address, accepted by every node
    pub const BROADCAST: NodeAddr = NodeAddr(0xFFFF);

    /// Start of the reserved direct range (next hop == final dest)
    pub const DIRECT_START: NodeAddr = NodeAddr(0xFFF0);

    /// Highest address the routing table can map
    pub const ROUTABLE_MAX: u16 = 63;

    /// Create an address from its raw 16-bit value
    pub const fn new(value: u16) -> Self {
        NodeAddr(value)
    }

    /// Raw 16-bit value
    pub const fn as_u16(&self) -> u16 {
        self.0
    }

    /// Check for the broadcast address
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// Check for the unassigned/invalid address
    pub fn is_unassigned(&self) -> bool {
        *self == Self::UNASSIGNED
    }

    /// Check for the reserved direct range `0xFFF0..=0xFFFE`
    pub fn is_direct_range(&self) -> bool {
        self.0 >= Self::DIRECT_START.0 && self.0 < Self::BROADCAST.0
    }

    /// Check whether the routing table can hold a mapping for this address
    pub fn is_routable(&self) -> bool {
        self.0 >= 1 && self.0 <= Self::ROUTABLE_MAX
    }
}

impl fmt::Debug for NodeAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeAddr({})", self.0)
    }
}

impl fmt::Display for NodeAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for NodeAddr {
    fn from(value: u16) -> Self {
        NodeAddr(value)
    }
}

/// Amateur-radio call sign: 8 ASCII bytes, space padded, no terminator
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct CallSign([u8; 8]);

impl CallSign {
    /// All-spaces placeholder
    pub const BLANK: CallSign = CallSign([b' '; 8]);

    /// Wire width in bytes
    pub const WIRE_SIZE: usize = 8;

    /// Build from the raw wire bytes
    pub const fn from_bytes(bytes: [u8; 8]) -> Self {
        CallSign(bytes)
    }

    /// Raw wire bytes
    pub const fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl FromStr for CallSign {
    type Err = PacketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.len() > 8 || !s.is_ascii() {
            return Err(PacketError::BadCallSign);
        }
        let mut bytes = [b' '; 8];
        bytes[..s.len()].copy_from_slice(s.as_bytes());
        Ok(CallSign(bytes))
    }
}

impl fmt::Display for CallSign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let trimmed: &[u8] = match self.0.iter().rposition(|b| *b != b' ') {
            Some(last) => &self.0[..=last],
            None => &[],
        };
        write!(f, "{}", String::from_utf8_lossy(trimmed))
    }
}

impl fmt::Debug for CallSign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CallSign({})", self)
    }
}

/// Message categories carried in the low six bits of the type byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    /// Reachability probe
    PingReq = 1,
    /// Answer to a ping
    PingResp = 2,
    /// Request for station engineering data
    GetSedReq = 3,
    /// Station engineering data report
    GetSedResp = 4,
    /// Remote restart (passcode protected)
    Reset = 5,
    /// Zero the diagnostic counters (passcode protected)
    ResetCounters = 6,
    /// Free-form text for display
    Text = 7,
    /// Install a routing entry (passcode protected)
    SetRoute = 8,
    /// Query a routing entry
    GetRouteReq = 9,
    /// Routing entry report
    GetRouteResp = 10,
}

impl PacketType {
    /// Decode the six-bit type code
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(PacketType::PingReq),
            2 => Some(PacketType::PingResp),
            3 => Some(PacketType::GetSedReq),
            4 => Some(PacketType::GetSedResp),
            5 => Some(PacketType::Reset),
            6 => Some(PacketType::ResetCounters),
            7 => Some(PacketType::Text),
            8 => Some(PacketType::SetRoute),
            9 => Some(PacketType::GetRouteReq),
            10 => Some(PacketType::GetRouteResp),
            _ => None,
        }
    }

    /// Wire code for this type
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Whether a node receiving this type must route an answer back
    /// toward the originator
    pub fn expects_response(self) -> bool {
        matches!(
            self,
            PacketType::PingReq | PacketType::GetSedReq | PacketType::GetRouteReq
        )
    }
}

/// The header type byte: a six-bit type code plus the two ACK flag bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeFlags(u8);

impl TypeFlags {
    const ACK_BIT: u8 = 0x80;
    const ACK_REQUIRED_BIT: u8 = 0x40;
    const TYPE_MASK: u8 = 0x3F;

    /// Plain type byte with both flags clear
    pub fn new(kind: PacketType) -> Self {
        TypeFlags(kind.code())
    }

    /// A bare acknowledgement: ACK bit set, no type code, no ACK request
    pub fn ack() -> Self {
        TypeFlags(Self::ACK_BIT)
    }

    /// Reconstruct from the wire byte
    pub fn from_byte(byte: u8) -> Self {
        TypeFlags(byte)
    }

    /// Raw wire byte
    pub fn as_byte(&self) -> u8 {
        self.0
    }

    /// Six-bit type code, untyped
    pub fn code(&self) -> u8 {
        self.0 & Self::TYPE_MASK
    }

    /// Decoded message category, if the code is known
    pub fn packet_type(&self) -> Option<PacketType> {
        PacketType::from_code(self.code())
    }

    /// Is this frame an acknowledgement?
    pub fn is_ack(&self) -> bool {
        self.0 & Self::ACK_BIT != 0
    }

    /// Does this frame ask its next hop to acknowledge it?
    pub fn is_ack_required(&self) -> bool {
        self.0 & Self::ACK_REQUIRED_BIT != 0
    }

    /// Set or clear the ACK-required flag
    pub fn set_ack_required(&mut self, value: bool) {
        if value {
            self.0 |= Self::ACK_REQUIRED_BIT;
        } else {
            self.0 &= !Self::ACK_REQUIRED_BIT;
        }
    }
}

/// Fixed-layout packet header
///
/// `source_addr`/`dest_addr` describe the current hop and are rewritten by
/// every forwarding node, together with `id`. The `original_*` and
/// `final_dest_addr` fields travel unchanged from originator to final
/// destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Protocol generation, must equal [`PROTOCOL_VERSION`]
    pub version: u8,
    /// Type code plus ACK flag bits
    pub type_flags: TypeFlags,
    /// Hop-unique identifier, used for ACK correlation and dedup
    pub id: u16,
    /// Transmitting node of this hop
    pub source_addr: NodeAddr,
    /// Receiving node of this hop
    pub dest_addr: NodeAddr,
    /// Node that originated the message
    pub original_source_addr: NodeAddr,
    /// Node the message is ultimately for
    pub final_dest_addr: NodeAddr,
    /// Call sign of the hop transmitter
    pub source_call: CallSign,
    /// Call sign of the originator
    pub original_source_call: CallSign,
}

impl Header {
    /// Header size on the wire in bytes
    pub const WIRE_SIZE: usize = 28;

    /// Build the header for a locally originated request.
    ///
    /// The ACK-required flag is set for unicast next hops; broadcasts are
    /// never acknowledged.
    pub fn request(
        kind: PacketType,
        id: u16,
        self_addr: NodeAddr,
        self_call: CallSign,
        next_hop: NodeAddr,
        final_dest: NodeAddr,
    ) -> Self {
        let mut type_flags = TypeFlags::new(kind);
        type_flags.set_ack_required(!next_hop.is_broadcast());
        Self {
            version: PROTOCOL_VERSION,
            type_flags,
            id,
            source_addr: self_addr,
            dest_addr: next_hop,
            original_source_addr: self_addr,
            final_dest_addr: final_dest,
            source_call: self_call,
            original_source_call: self_call,
        }
    }

    /// Build the hop-local acknowledgement for a received header: the ACK
    /// bit set, the ACK-required bit clear, the id copied from the request,
    /// addressed straight back at the hop that sent it.
    pub fn ack_for(request: &Header, self_addr: NodeAddr, self_call: CallSign) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            type_flags: TypeFlags::ack(),
            id: request.id,
            source_addr: self_addr,
            dest_addr: request.source_addr,
            original_source_addr: self_addr,
            final_dest_addr: request.source_addr,
            source_call: self_call,
            original_source_call: self_call,
        }
    }

    /// Build a response header routed back toward the request's originator
    /// via `first_hop`.
    pub fn response_to(
        request: &Header,
        kind: PacketType,
        id: u16,
        self_addr: NodeAddr,
        self_call: CallSign,
        first_hop: NodeAddr,
    ) -> Self {
        let mut type_flags = TypeFlags::new(kind);
        type_flags.set_ack_required(!first_hop.is_broadcast());
        Self {
            version: PROTOCOL_VERSION,
            type_flags,
            id,
            source_addr: self_addr,
            dest_addr: first_hop,
            original_source_addr: self_addr,
            final_dest_addr: request.original_source_addr,
            source_call: self_call,
            original_source_call: self_call,
        }
    }

    /// Decoded message category of this header
    pub fn packet_type(&self) -> Option<PacketType> {
        self.type_flags.packet_type()
    }

    /// Serialize to the wire layout
    pub fn to_bytes(&self) -> [u8; Self::WIRE_SIZE] {
        let mut bytes = [0u8; Self::WIRE_SIZE];
        bytes[0] = self.version;
        bytes[1] = self.type_flags.as_byte();
        bytes[2..4].copy_from_slice(&self.id.to_le_bytes());
        bytes[4..6].copy_from_slice(&self.source_addr.as_u16().to_le_bytes());
        bytes[6..8].copy_from_slice(&self.dest_addr.as_u16().to_le_bytes());
        bytes[8..10].copy_from_slice(&self.original_source_addr.as_u16().to_le_bytes());
        bytes[10..12].copy_from_slice(&self.final_dest_addr.as_u16().to_le_bytes());
        bytes[12..20].copy_from_slice(self.source_call.as_bytes());
        bytes[20..28].copy_from_slice(self.original_source_call.as_bytes());
        bytes
    }

    /// Deserialize from the wire layout
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PacketError> {
        if bytes.len() < Self::WIRE_SIZE {
            return Err(PacketError::Truncated(bytes.len()));
        }
        let mut source_call = [0u8; 8];
        source_call.copy_from_slice(&bytes[12..20]);
        let mut original_source_call = [0u8; 8];
        original_source_call.copy_from_slice(&bytes[20..28]);
        Ok(Self {
            version: bytes[0],
            type_flags: TypeFlags::from_byte(bytes[1]),
            id: u16::from_le_bytes([bytes[2], bytes[3]]),
            source_addr: NodeAddr::new(u16::from_le_bytes([bytes[4], bytes[5]])),
            dest_addr: NodeAddr::new(u16::from_le_bytes([bytes[6], bytes[7]])),
            original_source_addr: NodeAddr::new(u16::from_le_bytes([bytes[8], bytes[9]])),
            final_dest_addr: NodeAddr::new(u16::from_le_bytes([bytes[10], bytes[11]])),
            source_call: CallSign::from_bytes(source_call),
            original_source_call: CallSign::from_bytes(original_source_call),
        })
    }
}

/// A complete packet: header plus a fixed payload envelope
///
/// The envelope is sized for the largest payload variant; only the first
/// `payload_len` bytes are meaningful and only they reach the wire.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    /// Packet header
    pub header: Header,
    payload: [u8; MAX_PAYLOAD],
    payload_len: usize,
}

impl Packet {
    /// A bare packet with an empty payload
    pub fn new(header: Header) -> Self {
        Self {
            header,
            payload: [0u8; MAX_PAYLOAD],
            payload_len: 0,
        }
    }

    /// A packet carrying the given payload bytes
    pub fn with_payload(header: Header, payload: &[u8]) -> Result<Self, PacketError> {
        let mut packet = Self::new(header);
        packet.set_payload(payload)?;
        Ok(packet)
    }

    /// The meaningful payload bytes
    pub fn payload(&self) -> &[u8] {
        &self.payload[..self.payload_len]
    }

    /// Replace the payload
    pub fn set_payload(&mut self, payload: &[u8]) -> Result<(), PacketError> {
        if payload.len() > MAX_PAYLOAD {
            return Err(PacketError::PayloadTooLarge(payload.len()));
        }
        self.payload[..payload.len()].copy_from_slice(payload);
        self.payload_len = payload.len();
        Ok(())
    }

    /// Total size of this packet on the wire
    pub fn wire_len(&self) -> usize {
        Header::WIRE_SIZE + self.payload_len
    }

    /// Serialize into `out`, returning the number of bytes written.
    /// `out` must hold at least [`Packet::wire_len`] bytes.
    pub fn encode(&self, out: &mut [u8]) -> usize {
        let len = self.wire_len();
        debug_assert!(out.len() >= len);
        out[..Header::WIRE_SIZE].copy_from_slice(&self.header.to_bytes());
        out[Header::WIRE_SIZE..len].copy_from_slice(self.payload());
        len
    }

    /// Deserialize a whole received frame
    pub fn decode(frame: &[u8]) -> Result<Self, PacketError> {
        if frame.len() > MAX_PACKET {
            return Err(PacketError::Oversize(frame.len()));
        }
        let header = Header::from_bytes(frame)?;
        Self::with_payload(header, &frame[Header::WIRE_SIZE..])
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("header", &self.header)
            .field("payload_len", &self.payload_len)
            .finish()
    }
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// SETROUTE request payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetRouteReq {
    pub passcode: u32,
    pub target: NodeAddr,
    pub next_hop: NodeAddr,
}

impl SetRouteReq {
    pub const WIRE_SIZE: usize = 8;

    pub fn to_bytes(&self) -> [u8; Self::WIRE_SIZE] {
        let mut bytes = [0u8; Self::WIRE_SIZE];
        bytes[0..4].copy_from_slice(&self.passcode.to_le_bytes());
        bytes[4..6].copy_from_slice(&self.target.as_u16().to_le_bytes());
        bytes[6..8].copy_from_slice(&self.next_hop.as_u16().to_le_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PacketError> {
        if bytes.len() < Self::WIRE_SIZE {
            return Err(PacketError::Truncated(bytes.len()));
        }
        Ok(Self {
            passcode: read_u32(bytes, 0),
            target: NodeAddr::new(read_u16(bytes, 4)),
            next_hop: NodeAddr::new(read_u16(bytes, 6)),
        })
    }
}

/// GETROUTE request payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetRouteReq {
    pub target: NodeAddr,
}

impl GetRouteReq {
    pub const WIRE_SIZE: usize = 2;

    pub fn to_bytes(&self) -> [u8; Self::WIRE_SIZE] {
        self.target.as_u16().to_le_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PacketError> {
        if bytes.len() < Self::WIRE_SIZE {
            return Err(PacketError::Truncated(bytes.len()));
        }
        Ok(Self {
            target: NodeAddr::new(read_u16(bytes, 0)),
        })
    }
}

/// GETROUTE response payload
///
/// A missing route is encoded as the unassigned address. The packet
/// counters are reserved and currently always zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetRouteResp {
    pub target: NodeAddr,
    pub next_hop: NodeAddr,
    pub tx_packet_count: u16,
    pub rx_packet_count: u16,
}

impl GetRouteResp {
    pub const WIRE_SIZE: usize = 8;

    pub fn to_bytes(&self) -> [u8; Self::WIRE_SIZE] {
        let mut bytes = [0u8; Self::WIRE_SIZE];
        bytes[0..2].copy_from_slice(&self.target.as_u16().to_le_bytes());
        bytes[2..4].copy_from_slice(&self.next_hop.as_u16().to_le_bytes());
        bytes[4..6].copy_from_slice(&self.tx_packet_count.to_le_bytes());
        bytes[6..8].copy_from_slice(&self.rx_packet_count.to_le_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PacketError> {
        if bytes.len() < Self::WIRE_SIZE {
            return Err(PacketError::Truncated(bytes.len()));
        }
        Ok(Self {
            target: NodeAddr::new(read_u16(bytes, 0)),
            next_hop: NodeAddr::new(read_u16(bytes, 2)),
            tx_packet_count: read_u16(bytes, 4),
            rx_packet_count: read_u16(bytes, 6),
        })
    }
}

/// RESET / RESET_COUNTERS request payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetReq {
    pub passcode: u32,
}

impl ResetReq {
    pub const WIRE_SIZE: usize = 4;

    pub fn to_bytes(&self) -> [u8; Self::WIRE_SIZE] {
        self.passcode.to_le_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PacketError> {
        if bytes.len() < Self::WIRE_SIZE {
            return Err(PacketError::Truncated(bytes.len()));
        }
        Ok(Self {
            passcode: read_u32(bytes, 0),
        })
    }
}

/// Station engineering data report payload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SedResp {
    pub version: u16,
    pub battery_mv: u16,
    pub panel_mv: u16,
    pub uptime_seconds: u32,
    pub time_ms: u32,
    pub boot_count: u16,
    pub sleep_count: u16,
    pub last_hop_rssi: i16,
    pub temperature_c: i16,
    pub humidity_pct: i16,
    pub device_class: u16,
    pub device_revision: u16,
    pub rx_packet_count: u16,
    pub bad_rx_packet_count: u16,
    pub bad_route_count: u16,
}

impl SedResp {
    pub const WIRE_SIZE: usize = 34;

    pub fn to_bytes(&self) -> [u8; Self::WIRE_SIZE] {
        let mut bytes = [0u8; Self::WIRE_SIZE];
        bytes[0..2].copy_from_slice(&self.version.to_le_bytes());
        bytes[2..4].copy_from_slice(&self.battery_mv.to_le_bytes());
        bytes[4..6].copy_from_slice(&self.panel_mv.to_le_bytes());
        bytes[6..10].copy_from_slice(&self.uptime_seconds.to_le_bytes());
        bytes[10..14].copy_from_slice(&self.time_ms.to_le_bytes());
        bytes[14..16].copy_from_slice(&self.boot_count.to_le_bytes());
        bytes[16..18].copy_from_slice(&self.sleep_count.to_le_bytes());
        bytes[18..20].copy_from_slice(&self.last_hop_rssi.to_le_bytes());
        bytes[20..22].copy_from_slice(&self.temperature_c.to_le_bytes());
        bytes[22..24].copy_from_slice(&self.humidity_pct.to_le_bytes());
        bytes[24..26].copy_from_slice(&self.device_class.to_le_bytes());
        bytes[26..28].copy_from_slice(&self.device_revision.to_le_bytes());
        bytes[28..30].copy_from_slice(&self.rx_packet_count.to_le_bytes());
        bytes[30..32].copy_from_slice(&self.bad_rx_packet_count.to_le_bytes());
        bytes[32..34].copy_from_slice(&self.bad_route_count.to_le_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PacketError> {
        if bytes.len() < Self::WIRE_SIZE {
            return Err(PacketError::Truncated(bytes.len()));
        }
        Ok(Self {
            version: read_u16(bytes, 0),
            battery_mv: read_u16(bytes, 2),
            panel_mv: read_u16(bytes, 4),
            uptime_seconds: read_u32(bytes, 6),
            time_ms: read_u32(bytes, 10),
            boot_count: read_u16(bytes, 14),
            sleep_count: read_u16(bytes, 16),
            last_hop_rssi: read_u16(bytes, 18) as i16,
            temperature_c: read_u16(bytes, 20) as i16,
            humidity_pct: read_u16(bytes, 22) as i16,
            device_class: read_u16(bytes, 24),
            device_revision: read_u16(bytes, 26),
            rx_packet_count: read_u16(bytes, 28),
            bad_rx_packet_count: read_u16(bytes, 30),
            bad_route_count: read_u16(bytes, 32),
        })
    }
}
