//! Message processor
//!
//! The per-node packet pipeline. A host loop calls [`MessageProcessor::pump`]
//! repeatedly; each call drains the receive ring to empty, classifying every
//! frame (acknowledge, dedup, forward, or serve locally), then advances the
//! outbound manager's retry timers.
//!
//! ```text
//!  radio ──► rx ring ──► filter ─► ack ─► dedup ─┬─► forward ──► opm ──► tx ring ──► radio
//!                                                └─► local handlers ──┘
//! ```
//!
//! Everything is cooperative and single-threaded: the engine never blocks,
//! never takes a lock, and recovers every error locally. The only shared
//! state with the radio driver is the two frame rings.

use crate::buffer::FrameBuffer;
use crate::clock::Clock;
use crate::outbound::OutboundPacketManager;
use crate::packet::{
    GetRouteReq, GetRouteResp, Header, NodeAddr, Packet, PacketType, ResetReq, SedResp,
    SetRouteReq, MAX_PACKET, PROTOCOL_VERSION,
};
use crate::routing::{DuplicateLog, RoutingTable};
use crate::traits::{Configuration, Console, EngineConfig, Instrumentation, NodeStats};
use serde::Serialize;
use tracing::debug;

/// Width of the RSSI sidechannel on the receive ring
pub const RSSI_SIDE_LEN: usize = 2;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PingReport {
    node: u16,
    call: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SedReport {
    node: u16,
    version: u16,
    battery_mv: u16,
    panel_mv: u16,
    uptime_seconds: u32,
    boot_count: u16,
    sleep_count: u16,
    temperature_c: i16,
    humidity_pct: i16,
    rx_packet_count: u16,
    bad_rx_packet_count: u16,
    bad_route_count: u16,
    last_hop_rssi: i16,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TextReport {
    call: String,
    node: u16,
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RouteReport {
    orig_source_addr: u16,
    target_addr: u16,
    next_hop_addr: u16,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InfoReport {
    node: u16,
    call: String,
    version: u16,
    battery_mv: u16,
    panel_mv: u16,
    battery_low: bool,
    uptime_seconds: u32,
    boot_count: u16,
    rx_packet_count: u32,
    bad_rx_packet_count: u32,
    bad_route_count: u32,
    pending_sends: usize,
    routes: usize,
}

/// The node's receive/transmit pipeline
pub struct MessageProcessor {
    clock: Box<dyn Clock>,
    rx: FrameBuffer,
    tx: FrameBuffer,
    routes: Box<dyn RoutingTable>,
    instrumentation: Box<dyn Instrumentation>,
    config: Box<dyn Configuration>,
    console: Box<dyn Console>,
    opm: OutboundPacketManager,
    dedup: DuplicateLog,
    id_counter: u16,
    start_ms: u32,
    last_rx_ms: u32,
    stats: NodeStats,
}

impl MessageProcessor {
    /// Wire the engine to its host ports. All buffers and slot arrays are
    /// allocated here; the steady state allocates nothing.
    pub fn new(
        clock: Box<dyn Clock>,
        routes: Box<dyn RoutingTable>,
        instrumentation: Box<dyn Instrumentation>,
        config: Box<dyn Configuration>,
        console: Box<dyn Console>,
        engine: EngineConfig,
    ) -> Self {
        let start_ms = clock.now_ms();
        Self {
            rx: FrameBuffer::new(engine.rx_buffer_bytes, RSSI_SIDE_LEN),
            tx: FrameBuffer::new(engine.tx_buffer_bytes, 0),
            opm: OutboundPacketManager::new(engine.tx_timeout_ms, engine.tx_retry_ms),
            dedup: DuplicateLog::new(engine.dedup_slots, engine.dedup_window_ms),
            clock,
            routes,
            instrumentation,
            config,
            console,
            id_counter: 1,
            start_ms,
            last_rx_ms: start_ms,
            stats: NodeStats::default(),
        }
    }

    /// One cooperative tick: drain the receive ring in arrival order, then
    /// advance outbound retry timers. Draining first guarantees that ACKs
    /// heard in this radio window settle their pending slots before any
    /// retry decision.
    ///
    /// Loopback frames pushed while processing are picked up by a later
    /// iteration of the same drain, never recursively.
    pub fn pump(&mut self) {
        loop {
            let mut side = [0u8; RSSI_SIDE_LEN];
            let mut frame = [0u8; MAX_PACKET];
            let Some(len) = self.rx.pop(&mut side, &mut frame) else {
                break;
            };
            let rssi = i16::from_le_bytes(side);
            if len > MAX_PACKET {
                self.bad_frame();
                continue;
            }
            self.process(rssi, &frame[..len]);
        }
        let now = self.clock.now_ms();
        self.opm.pump(&mut self.tx, now);
    }

    fn process(&mut self, rssi: i16, frame: &[u8]) {
        let now = self.clock.now_ms();

        if frame.len() < Header::WIRE_SIZE {
            self.bad_frame();
            return;
        }
        let packet = match Packet::decode(frame) {
            Ok(packet) => packet,
            Err(_) => {
                self.bad_frame();
                return;
            }
        };
        if packet.header.version != PROTOCOL_VERSION {
            self.bad_frame();
            return;
        }

        // Nodes within earshot of each other overhear traffic meant for
        // their neighbors; that is not an error.
        let self_addr = self.config.addr();
        let dest = packet.header.dest_addr;
        if !dest.is_broadcast() && dest != self_addr {
            if self.config.log_level() > 0 {
                let line = format!("INF: Ignored packet for {dest}");
                self.console.write_line(&line);
            }
            debug!(%dest, "overheard frame ignored");
            return;
        }

        self.stats.rx_packets += 1;
        self.last_rx_ms = now;

        if self.config.log_level() > 0 {
            self.trace_packet(&packet, rssi);
        }

        // ACKs belong to the outbound manager: never dedup'd, never
        // forwarded, never acknowledged themselves.
        if packet.header.type_flags.is_ack() {
            self.stats.acks_received += 1;
            self.opm.process_ack(&packet.header);
            return;
        }

        // Acknowledge BEFORE the duplicate check: a repeat usually means
        // the previous ACK was lost on the air.
        if packet.header.type_flags.is_ack_required() {
            let ack = Header::ack_for(&packet.header, self_addr, self.config.call());
            if self.transmit(&Packet::new(ack)) {
                self.stats.acks_sent += 1;
            } else {
                self.console.write_line("ERR: Full, no ACK");
            }
        }

        let origin = packet.header.original_source_addr;
        if !self.dedup.observe(origin, packet.header.id, now) {
            self.stats.duplicates_dropped += 1;
            if self.config.log_level() > 0 {
                let line = format!("INF: Ignored duplicate from {origin}");
                self.console.write_line(&line);
            }
            return;
        }

        // Broadcast frames are consumed here; only unicast traffic for
        // somebody else gets relayed.
        let final_dest = packet.header.final_dest_addr;
        if final_dest != self_addr && !final_dest.is_broadcast() {
            self.forward(&packet);
            return;
        }
        self.dispatch_local(rssi, &packet);
    }

    fn forward(&mut self, packet: &Packet) {
        let Some(next_hop) = self.routes.next_hop(packet.header.final_dest_addr) else {
            self.stats.bad_routes += 1;
            self.console.write_line("ERR: No route");
            return;
        };
        // Fresh hop identity, untouched end-to-end fields and payload
        let mut relay = *packet;
        relay.header.id = self.next_id();
        relay.header.dest_addr = next_hop;
        relay.header.source_addr = self.config.addr();
        if self.transmit(&relay) {
            self.stats.forwarded += 1;
            if self.config.log_level() > 0 {
                let line = format!("INF: Forward to {next_hop}");
                self.console.write_line(&line);
            }
        } else {
            self.console.write_line("ERR: Full, no forward");
        }
    }

    fn dispatch_local(&mut self, rssi: i16, packet: &Packet) {
        let kind = packet.header.packet_type();
        let first_hop = self.routes.next_hop(packet.header.original_source_addr);

        // A request we cannot answer back toward its origin is routing
        // failure, not silence.
        if kind.is_some_and(|k| k.expects_response()) && first_hop.is_none() {
            self.stats.bad_routes += 1;
            let line = format!("ERR: No route to {}", packet.header.original_source_addr);
            self.console.write_line(&line);
            return;
        }

        match kind {
            Some(PacketType::PingReq) => self.handle_ping_req(packet, first_hop),
            Some(PacketType::PingResp) => self.handle_ping_resp(packet),
            Some(PacketType::GetSedReq) => self.handle_sed_req(rssi, packet, first_hop),
            Some(PacketType::GetSedResp) => self.handle_sed_resp(packet),
            Some(PacketType::Reset) => self.handle_reset(packet),
            Some(PacketType::ResetCounters) => self.handle_reset_counters(packet),
            Some(PacketType::Text) => self.handle_text(packet),
            Some(PacketType::SetRoute) => self.handle_set_route(packet),
            Some(PacketType::GetRouteReq) => self.handle_route_req(packet, first_hop),
            Some(PacketType::GetRouteResp) => self.handle_route_resp(packet),
            None => self.console.write_line("ERR: Unknown message"),
        }
    }

    fn handle_ping_req(&mut self, packet: &Packet, first_hop: Option<NodeAddr>) {
        let Some(first_hop) = first_hop else {
            return;
        };
        let id = self.next_id();
        let resp = Header::response_to(
            &packet.header,
            PacketType::PingResp,
            id,
            self.config.addr(),
            self.config.call(),
            first_hop,
        );
        if !self.transmit(&Packet::new(resp)) {
            self.console.write_line("ERR: Full, no resp");
        }
    }

    fn handle_ping_resp(&mut self, packet: &Packet) {
        let report = PingReport {
            node: packet.header.original_source_addr.as_u16(),
            call: packet.header.original_source_call.to_string(),
        };
        self.report("PING_RESP", &report);
    }

    fn handle_sed_req(&mut self, rssi: i16, packet: &Packet, first_hop: Option<NodeAddr>) {
        let Some(first_hop) = first_hop else {
            return;
        };
        let now = self.clock.now_ms();
        let sed = SedResp {
            version: self.instrumentation.software_version(),
            battery_mv: self.instrumentation.battery_mv(),
            panel_mv: self.instrumentation.panel_mv(),
            uptime_seconds: now.wrapping_sub(self.start_ms) / 1000,
            time_ms: now,
            boot_count: self.config.boot_count(),
            sleep_count: self.config.sleep_count(),
            last_hop_rssi: rssi,
            temperature_c: self.instrumentation.temperature_c(),
            humidity_pct: self.instrumentation.humidity_pct(),
            device_class: self.instrumentation.device_class(),
            device_revision: self.instrumentation.device_revision(),
            rx_packet_count: self.stats.rx_packets as u16,
            bad_rx_packet_count: self.stats.bad_rx_packets as u16,
            bad_route_count: self.stats.bad_routes as u16,
        };
        let id = self.next_id();
        let header = Header::response_to(
            &packet.header,
            PacketType::GetSedResp,
            id,
            self.config.addr(),
            self.config.call(),
            first_hop,
        );
        let Ok(resp) = Packet::with_payload(header, &sed.to_bytes()) else {
            return;
        };
        if !self.transmit(&resp) {
            self.console.write_line("ERR: Full, no resp");
        }
    }

    fn handle_sed_resp(&mut self, packet: &Packet) {
        let Ok(sed) = SedResp::from_bytes(packet.payload()) else {
            self.console.write_line("ERR: Bad message");
            return;
        };
        let report = SedReport {
            node: packet.header.original_source_addr.as_u16(),
            version: sed.version,
            battery_mv: sed.battery_mv,
            panel_mv: sed.panel_mv,
            uptime_seconds: sed.uptime_seconds,
            boot_count: sed.boot_count,
            sleep_count: sed.sleep_count,
            temperature_c: sed.temperature_c,
            humidity_pct: sed.humidity_pct,
            rx_packet_count: sed.rx_packet_count,
            bad_rx_packet_count: sed.bad_rx_packet_count,
            bad_route_count: sed.bad_route_count,
            last_hop_rssi: sed.last_hop_rssi,
        };
        self.report("GETSED_RESP", &report);
    }

    fn handle_reset(&mut self, packet: &Packet) {
        let Ok(req) = ResetReq::from_bytes(packet.payload()) else {
            self.console.write_line("ERR: Bad message");
            return;
        };
        if !self.config.check_passcode(req.passcode) {
            self.console.write_line("ERR: Unauthorized");
            return;
        }
        self.console.write_line("INF: Resetting");
        self.instrumentation.restart();
    }

    fn handle_reset_counters(&mut self, packet: &Packet) {
        let Ok(req) = ResetReq::from_bytes(packet.payload()) else {
            self.console.write_line("ERR: Bad message");
            return;
        };
        if !self.config.check_passcode(req.passcode) {
            self.console.write_line("ERR: Unauthorized");
            return;
        }
        self.console.write_line("INF: Reset counters");
        self.reset_counters();
    }

    fn handle_text(&mut self, packet: &Packet) {
        // Text payloads carry no terminator; length comes from the frame
        let text = String::from_utf8_lossy(packet.payload());
        let origin = packet.header.original_source_addr;
        let call = packet.header.original_source_call;
        if self.config.command_mode() == 1 {
            let report = TextReport {
                call: call.to_string(),
                node: origin.as_u16(),
                text: text.into_owned(),
            };
            self.report("TEXT", &report);
        } else {
            let line = format!("MSG: [{call},{origin}] {text}");
            self.console.write_line(&line);
        }
    }

    fn handle_set_route(&mut self, packet: &Packet) {
        let Ok(req) = SetRouteReq::from_bytes(packet.payload()) else {
            self.console.write_line("ERR: Bad message");
            return;
        };
        if !self.config.check_passcode(req.passcode) {
            self.console.write_line("ERR: Unauthorized");
            return;
        }
        self.routes.set_route(req.target, req.next_hop);
        let line = format!("INF: Set route {}->{}", req.target, req.next_hop);
        self.console.write_line(&line);
    }

    fn handle_route_req(&mut self, packet: &Packet, first_hop: Option<NodeAddr>) {
        let Ok(req) = GetRouteReq::from_bytes(packet.payload()) else {
            self.console.write_line("ERR: Bad message");
            return;
        };
        let Some(first_hop) = first_hop else {
            return;
        };
        let payload = GetRouteResp {
            target: req.target,
            next_hop: self
                .routes
                .next_hop(req.target)
                .unwrap_or(NodeAddr::UNASSIGNED),
            tx_packet_count: 0,
            rx_packet_count: 0,
        };
        let id = self.next_id();
        let header = Header::response_to(
            &packet.header,
            PacketType::GetRouteResp,
            id,
            self.config.addr(),
            self.config.call(),
            first_hop,
        );
        let Ok(resp) = Packet::with_payload(header, &payload.to_bytes()) else {
            return;
        };
        if !self.transmit(&resp) {
            self.console.write_line("ERR: Full, no resp");
        }
    }

    fn handle_route_resp(&mut self, packet: &Packet) {
        let Ok(resp) = GetRouteResp::from_bytes(packet.payload()) else {
            self.console.write_line("ERR: Bad message");
            return;
        };
        let report = RouteReport {
            orig_source_addr: packet.header.original_source_addr.as_u16(),
            target_addr: resp.target.as_u16(),
            next_hop_addr: resp.next_hop.as_u16(),
        };
        self.report("GETROUTE_RESP", &report);
    }

    /// Hand a packet to the delivery machinery.
    ///
    /// A packet addressed to this node short-circuits onto the receive
    /// ring (loopback, zero RSSI) and is processed by the next drain
    /// iteration; everything else goes through the outbound manager.
    pub fn transmit(&mut self, packet: &Packet) -> bool {
        if packet.header.dest_addr == self.config.addr() {
            let mut wire = [0u8; MAX_PACKET];
            let n = packet.encode(&mut wire);
            return self.rx.push(&0i16.to_le_bytes(), &wire[..n]);
        }
        let now = self.clock.now_ms();
        if self.opm.schedule(packet, &mut self.tx, now) {
            self.stats.tx_packets += 1;
            true
        } else {
            false
        }
    }

    /// Next hop-unique packet id. Wraps at 65535; the dedup window keeps
    /// wrapped ids from colliding in practice.
    pub fn next_id(&mut self) -> u16 {
        let id = self.id_counter;
        self.id_counter = self.id_counter.wrapping_add(1);
        id
    }

    // ----- command surface -------------------------------------------------
    //
    // The station console translates operator commands into packets that
    // enter the engine through the same transmit path as everything else.

    /// Probe a node's reachability
    pub fn send_ping(&mut self, dest: NodeAddr) -> bool {
        self.send_request(PacketType::PingReq, dest, &[])
    }

    /// Send display text to a node
    pub fn send_text(&mut self, dest: NodeAddr, text: &[u8]) -> bool {
        self.send_request(PacketType::Text, dest, text)
    }

    /// Install a routing entry on a remote node
    pub fn send_set_route(
        &mut self,
        node: NodeAddr,
        target: NodeAddr,
        next_hop: NodeAddr,
        passcode: u32,
    ) -> bool {
        let payload = SetRouteReq {
            passcode,
            target,
            next_hop,
        };
        self.send_request(PacketType::SetRoute, node, &payload.to_bytes())
    }

    /// Ask a node for its engineering data
    pub fn send_sed_request(&mut self, dest: NodeAddr) -> bool {
        self.send_request(PacketType::GetSedReq, dest, &[])
    }

    /// Ask a node for one of its routing entries
    pub fn send_route_request(&mut self, dest: NodeAddr, target: NodeAddr) -> bool {
        let payload = GetRouteReq { target };
        self.send_request(PacketType::GetRouteReq, dest, &payload.to_bytes())
    }

    /// Remotely restart a node
    pub fn send_reset(&mut self, dest: NodeAddr, passcode: u32) -> bool {
        let payload = ResetReq { passcode };
        self.send_request(PacketType::Reset, dest, &payload.to_bytes())
    }

    /// Remotely zero a node's diagnostic counters
    pub fn send_reset_counters(&mut self, dest: NodeAddr, passcode: u32) -> bool {
        let payload = ResetReq { passcode };
        self.send_request(PacketType::ResetCounters, dest, &payload.to_bytes())
    }

    /// Install a routing entry on this node
    pub fn set_local_route(&mut self, target: NodeAddr, next_hop: NodeAddr) -> bool {
        self.routes.set_route(target, next_hop)
    }

    /// Write this node's status report to the console
    pub fn log_info(&mut self) {
        let now = self.clock.now_ms();
        let battery_mv = self.instrumentation.battery_mv();
        let report = InfoReport {
            node: self.config.addr().as_u16(),
            call: self.config.call().to_string(),
            version: self.instrumentation.software_version(),
            battery_mv,
            panel_mv: self.instrumentation.panel_mv(),
            battery_low: battery_mv < self.config.battery_limit_mv(),
            uptime_seconds: now.wrapping_sub(self.start_ms) / 1000,
            boot_count: self.config.boot_count(),
            rx_packet_count: self.stats.rx_packets,
            bad_rx_packet_count: self.stats.bad_rx_packets,
            bad_route_count: self.stats.bad_routes,
            pending_sends: self.opm.pending_count(),
            routes: self.routes.route_count(),
        };
        self.report("INFO", &report);
    }

    fn send_request(&mut self, kind: PacketType, final_dest: NodeAddr, payload: &[u8]) -> bool {
        let Some(next_hop) = self.routes.next_hop(final_dest) else {
            self.stats.bad_routes += 1;
            self.console.write_line("ERR: No route");
            return false;
        };
        let id = self.next_id();
        let header = Header::request(
            kind,
            id,
            self.config.addr(),
            self.config.call(),
            next_hop,
            final_dest,
        );
        let mut packet = Packet::new(header);
        if packet.set_payload(payload).is_err() {
            self.console.write_line("ERR: Bad message");
            return false;
        }
        self.transmit(&packet)
    }

    // ----- radio driver surface -------------------------------------------

    /// Enqueue a received frame with its RSSI sidechannel
    pub fn push_received(&mut self, rssi: i16, frame: &[u8]) -> bool {
        self.rx.push(&rssi.to_le_bytes(), frame)
    }

    /// Dequeue the next frame awaiting transmission
    pub fn next_transmit(&mut self, out: &mut [u8]) -> Option<usize> {
        self.tx.pop(&mut [], out)
    }

    /// Frames currently queued for the radio
    pub fn tx_frame_count(&self) -> usize {
        self.tx.frame_count()
    }

    // ----- diagnostics ----------------------------------------------------

    /// Snapshot of the diagnostic counters
    pub fn stats(&self) -> NodeStats {
        let mut stats = self.stats.clone();
        stats.retransmissions = self.opm.retransmissions();
        stats.delivery_failures = self.opm.failed_deliveries();
        stats
    }

    /// Reliable sends still awaiting acknowledgement
    pub fn pending_count(&self) -> usize {
        self.opm.pending_count()
    }

    /// Zero the wire-visible diagnostic counters
    pub fn reset_counters(&mut self) {
        self.stats.rx_packets = 0;
        self.stats.bad_rx_packets = 0;
        self.stats.bad_routes = 0;
    }

    /// Time since the receive filter last accepted a frame
    pub fn seconds_since_last_rx(&self) -> u32 {
        self.clock.now_ms().wrapping_sub(self.last_rx_ms) / 1000
    }

    /// Read access to the routing table
    pub fn routing(&self) -> &dyn RoutingTable {
        self.routes.as_ref()
    }

    fn bad_frame(&mut self) {
        self.stats.bad_rx_packets += 1;
        self.console.write_line("ERR: Bad message");
    }

    fn trace_packet(&mut self, packet: &Packet, rssi: i16) {
        let h = &packet.header;
        let line = format!(
            "INF: Got type: {}, id: {}, from: {}, fromCall: {}, to: {}, \
             originalSource: {}, originalSourceCall: {}, finalDest: {}, RSSI: {}",
            h.type_flags.as_byte(),
            h.id,
            h.source_addr,
            h.source_call,
            h.dest_addr,
            h.original_source_addr,
            h.original_source_call,
            h.final_dest_addr,
            rssi,
        );
        self.console.write_line(&line);
    }

    fn report<T: Serialize>(&mut self, tag: &str, report: &T) {
        if let Ok(json) = serde_json::to_string(report) {
            let line = format!("{tag}: {json}");
            self.console.write_line(&line);
        }
    }
}
