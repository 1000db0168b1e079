//! End-to-end station scenarios.
//!
//! A single node (address 1, call KC1FSZ) wired to deterministic host
//! doubles: a hand-advanced clock, a recording console, and scripted
//! instrumentation. Frames are injected straight into the receive ring
//! and observed on the transmit ring, the way the radio driver sees them.

use birdmesh_core::{
    CallSign, Configuration, Console, EngineConfig, Header, Instrumentation, ManualClock,
    MessageProcessor, NodeAddr, Packet, PacketType, ResetReq, SedResp, SetRouteReq, StaticRoutes,
    MAX_PACKET,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

const SELF_ADDR: NodeAddr = NodeAddr::new(1);
const PASSCODE: u32 = 1234;
const TX_TIMEOUT_MS: u32 = 10_000;
const TX_RETRY_MS: u32 = 2_000;

struct TestConfig {
    command_mode: u8,
}

impl Configuration for TestConfig {
    fn addr(&self) -> NodeAddr {
        SELF_ADDR
    }
    fn call(&self) -> CallSign {
        "KC1FSZ".parse().unwrap()
    }
    fn battery_limit_mv(&self) -> u16 {
        3400
    }
    fn boot_count(&self) -> u16 {
        1
    }
    fn sleep_count(&self) -> u16 {
        1
    }
    fn log_level(&self) -> u8 {
        0
    }
    fn command_mode(&self) -> u8 {
        self.command_mode
    }
    fn check_passcode(&self, passcode: u32) -> bool {
        passcode == PASSCODE
    }
}

#[derive(Clone, Default)]
struct TestInstrumentation {
    restarted: Rc<Cell<bool>>,
}

impl Instrumentation for TestInstrumentation {
    fn software_version(&self) -> u16 {
        1
    }
    fn battery_mv(&self) -> u16 {
        3800
    }
    fn panel_mv(&self) -> u16 {
        4000
    }
    fn temperature_c(&self) -> i16 {
        23
    }
    fn humidity_pct(&self) -> i16 {
        87
    }
    fn device_class(&self) -> u16 {
        2
    }
    fn device_revision(&self) -> u16 {
        1
    }
    fn restart(&mut self) {
        self.restarted.set(true);
    }
    fn restart_radio(&mut self) {}
    fn sleep_ms(&mut self, _ms: u32) {}
}

#[derive(Clone, Default)]
struct TestConsole(Rc<RefCell<Vec<String>>>);

impl Console for TestConsole {
    fn write_line(&mut self, line: &str) {
        self.0.borrow_mut().push(line.to_string());
    }
}

impl TestConsole {
    fn contains(&self, needle: &str) -> bool {
        self.0.borrow().iter().any(|l| l.contains(needle))
    }
}

struct Station {
    engine: MessageProcessor,
    clock: ManualClock,
    console: TestConsole,
    instrumentation: TestInstrumentation,
}

fn station() -> Station {
    station_with_mode(0)
}

fn station_with_mode(command_mode: u8) -> Station {
    let clock = ManualClock::new(10_000);
    let console = TestConsole::default();
    let instrumentation = TestInstrumentation::default();
    let engine = MessageProcessor::new(
        Box::new(clock.clone()),
        Box::new(StaticRoutes::new()),
        Box::new(instrumentation.clone()),
        Box::new(TestConfig { command_mode }),
        Box::new(console.clone()),
        EngineConfig {
            tx_timeout_ms: TX_TIMEOUT_MS,
            tx_retry_ms: TX_RETRY_MS,
            ..EngineConfig::default()
        },
    );
    Station {
        engine,
        clock,
        console,
        instrumentation,
    }
}

fn drain_tx(engine: &mut MessageProcessor) -> Vec<Packet> {
    let mut frames = Vec::new();
    let mut out = [0u8; MAX_PACKET];
    while let Some(n) = engine.next_transmit(&mut out) {
        frames.push(Packet::decode(&out[..n]).expect("tx frame should decode"));
    }
    frames
}

fn inject(engine: &mut MessageProcessor, rssi: i16, packet: &Packet) {
    let mut wire = [0u8; MAX_PACKET];
    let n = packet.encode(&mut wire);
    assert!(engine.push_received(rssi, &wire[..n]));
}

/// An inbound frame from a peer node, ACK request off unless asked for.
fn from_peer(
    kind: PacketType,
    id: u16,
    source: u16,
    origin: u16,
    final_dest: u16,
    ack_required: bool,
) -> Packet {
    let mut header = Header::request(
        kind,
        id,
        NodeAddr::new(source),
        "W1AW".parse().unwrap(),
        SELF_ADDR,
        NodeAddr::new(final_dest),
    );
    header.original_source_addr = NodeAddr::new(origin);
    header.type_flags.set_ack_required(ack_required);
    Packet::new(header)
}

#[test]
fn ping_via_route() {
    let mut s = station();
    s.engine.set_local_route(NodeAddr::new(7), NodeAddr::new(3));

    assert!(s.engine.send_ping(NodeAddr::new(7)));
    s.engine.pump();

    let frames = drain_tx(&mut s.engine);
    assert_eq!(frames.len(), 1);
    let ping = &frames[0];
    assert_eq!(ping.header.packet_type(), Some(PacketType::PingReq));
    assert_eq!(ping.header.dest_addr, NodeAddr::new(3));
    assert_eq!(ping.header.source_addr, SELF_ADDR);
    assert_eq!(ping.header.final_dest_addr, NodeAddr::new(7));
    assert_eq!(ping.header.original_source_addr, SELF_ADDR);
}

#[test]
fn ping_without_route_fails() {
    let mut s = station();
    assert!(!s.engine.send_ping(NodeAddr::new(7)));
    s.engine.pump();

    assert!(drain_tx(&mut s.engine).is_empty());
    assert!(s.console.contains("ERR: No route"));
    assert_eq!(s.engine.stats().bad_routes, 1);
}

#[test]
fn info_is_local_only() {
    let mut s = station();
    s.engine.log_info();
    s.engine.pump();

    assert!(drain_tx(&mut s.engine).is_empty());
    assert!(s.console.contains("INFO: {"));
    assert!(s.console.contains("\"call\":\"KC1FSZ\""));
}

#[test]
fn local_set_route() {
    let mut s = station();
    assert!(s.engine.set_local_route(NodeAddr::new(8), NodeAddr::new(3)));
    s.engine.pump();

    assert!(drain_tx(&mut s.engine).is_empty());
    assert_eq!(
        s.engine.routing().next_hop(NodeAddr::new(8)),
        Some(NodeAddr::new(3))
    );
}

#[test]
fn remote_set_route() {
    let mut s = station();
    s.engine.set_local_route(NodeAddr::new(7), NodeAddr::new(3));

    assert!(s
        .engine
        .send_set_route(NodeAddr::new(7), NodeAddr::new(1), NodeAddr::new(4), PASSCODE));
    s.engine.pump();

    let frames = drain_tx(&mut s.engine);
    assert_eq!(frames.len(), 1);
    let packet = &frames[0];
    assert_eq!(packet.header.packet_type(), Some(PacketType::SetRoute));
    assert_eq!(packet.header.dest_addr, NodeAddr::new(3));
    assert_eq!(packet.header.source_addr, SELF_ADDR);

    let payload = SetRouteReq::from_bytes(packet.payload()).unwrap();
    assert_eq!(payload.target, NodeAddr::new(1));
    assert_eq!(payload.next_hop, NodeAddr::new(4));
}

#[test]
fn text_send() {
    let mut s = station();
    s.engine.set_local_route(NodeAddr::new(7), NodeAddr::new(3));

    assert!(s.engine.send_text(NodeAddr::new(7), b"Hello World!"));
    s.engine.pump();

    let frames = drain_tx(&mut s.engine);
    assert_eq!(frames.len(), 1);
    let packet = &frames[0];
    assert_eq!(packet.header.packet_type(), Some(PacketType::Text));
    assert_eq!(packet.header.dest_addr, NodeAddr::new(3));
    assert_eq!(packet.header.source_addr, SELF_ADDR);
    assert_eq!(packet.wire_len(), Header::WIRE_SIZE + 12);
    assert_eq!(packet.payload(), b"Hello World!");
}

#[test]
fn forward_toward_final_destination() {
    let mut s = station();
    s.engine.set_local_route(NodeAddr::new(9), NodeAddr::new(5));

    let inbound = Packet::with_payload(
        from_peer(PacketType::Text, 100, 2, 2, 9, false).header,
        b"relay me",
    )
    .unwrap();
    inject(&mut s.engine, -90, &inbound);
    s.engine.pump();

    let frames = drain_tx(&mut s.engine);
    assert_eq!(frames.len(), 1);
    let relayed = &frames[0];
    assert_eq!(relayed.header.dest_addr, NodeAddr::new(5));
    assert_eq!(relayed.header.source_addr, SELF_ADDR);
    assert_eq!(relayed.header.final_dest_addr, NodeAddr::new(9));
    assert_eq!(relayed.header.original_source_addr, NodeAddr::new(2));
    assert_ne!(relayed.header.id, 100);
    assert_eq!(relayed.payload(), b"relay me");
    assert_eq!(s.engine.stats().forwarded, 1);
}

#[test]
fn forward_acknowledges_previous_hop_first() {
    let mut s = station();
    s.engine.set_local_route(NodeAddr::new(9), NodeAddr::new(5));

    let inbound = from_peer(PacketType::Text, 100, 2, 2, 9, true);
    inject(&mut s.engine, -90, &inbound);
    s.engine.pump();

    let frames = drain_tx(&mut s.engine);
    assert_eq!(frames.len(), 2);

    let ack = &frames[0];
    assert!(ack.header.type_flags.is_ack());
    assert!(!ack.header.type_flags.is_ack_required());
    assert_eq!(ack.header.id, 100);
    assert_eq!(ack.header.dest_addr, NodeAddr::new(2));
    assert_eq!(ack.header.source_addr, SELF_ADDR);

    let relayed = &frames[1];
    assert_eq!(relayed.header.dest_addr, NodeAddr::new(5));
    assert_ne!(relayed.header.id, 100);

    // Universal invariant: everything we transmit claims our address
    for frame in &frames {
        assert_eq!(frame.header.source_addr, SELF_ADDR);
    }
}

#[test]
fn forward_without_route_is_counted() {
    let mut s = station();

    let inbound = from_peer(PacketType::Text, 100, 2, 2, 9, false);
    inject(&mut s.engine, -90, &inbound);
    s.engine.pump();

    assert!(drain_tx(&mut s.engine).is_empty());
    assert!(s.console.contains("ERR: No route"));
    assert_eq!(s.engine.stats().bad_routes, 1);
}

#[test]
fn duplicate_forward_suppressed() {
    let mut s = station();
    s.engine.set_local_route(NodeAddr::new(9), NodeAddr::new(5));

    let inbound = from_peer(PacketType::Text, 100, 2, 2, 9, false);
    inject(&mut s.engine, -90, &inbound);
    inject(&mut s.engine, -90, &inbound);
    s.engine.pump();

    // Same (origin, id) twice inside the window: one relay only
    assert_eq!(drain_tx(&mut s.engine).len(), 1);
    assert_eq!(s.engine.stats().duplicates_dropped, 1);
}

#[test]
fn duplicate_still_acknowledged() {
    let mut s = station();
    s.engine.set_local_route(NodeAddr::new(9), NodeAddr::new(5));

    let inbound = from_peer(PacketType::Text, 100, 2, 2, 9, true);
    inject(&mut s.engine, -90, &inbound);
    inject(&mut s.engine, -90, &inbound);
    s.engine.pump();

    // The repeat means our first ACK may have been lost: ACK both copies,
    // relay only one
    let frames = drain_tx(&mut s.engine);
    let acks = frames
        .iter()
        .filter(|f| f.header.type_flags.is_ack())
        .count();
    assert_eq!(acks, 2);
    assert_eq!(frames.len(), 3);
    assert_eq!(s.engine.stats().forwarded, 1);
}

#[test]
fn broadcast_consumed_never_forwarded() {
    let mut s = station();
    s.engine.set_local_route(NodeAddr::new(9), NodeAddr::new(5));

    let mut header = from_peer(PacketType::Text, 42, 2, 2, 9, false).header;
    header.dest_addr = NodeAddr::BROADCAST;
    header.final_dest_addr = NodeAddr::BROADCAST;
    let inbound = Packet::with_payload(header, b"to everyone").unwrap();
    inject(&mut s.engine, -90, &inbound);
    s.engine.pump();

    assert!(drain_tx(&mut s.engine).is_empty());
    assert!(s.console.contains("to everyone"));
}

#[test]
fn retry_until_acked() {
    let mut s = station();

    let header = Header::request(
        PacketType::Text,
        500,
        SELF_ADDR,
        "KC1FSZ".parse().unwrap(),
        NodeAddr::new(3),
        NodeAddr::new(3),
    );
    let packet = Packet::with_payload(header, b"reliable").unwrap();
    assert!(packet.header.type_flags.is_ack_required());
    assert!(s.engine.transmit(&packet));
    s.engine.pump();
    assert_eq!(s.engine.tx_frame_count(), 1);
    assert_eq!(s.engine.pending_count(), 1);

    // Nothing new before the retry interval
    s.clock.advance_ms(TX_RETRY_MS - 1);
    s.engine.pump();
    assert_eq!(s.engine.tx_frame_count(), 1);

    // A second copy at the interval
    s.clock.advance_ms(1);
    s.engine.pump();
    assert_eq!(s.engine.tx_frame_count(), 2);
    assert_eq!(s.engine.stats().retransmissions, 1);

    // The neighbor's ACK settles the slot
    let ack = Header::ack_for(&packet.header, NodeAddr::new(3), "W1AW".parse().unwrap());
    inject(&mut s.engine, -85, &Packet::new(ack));
    s.engine.pump();
    assert_eq!(s.engine.pending_count(), 0);

    // And no further copies appear
    s.clock.advance_ms(TX_RETRY_MS);
    s.engine.pump();
    assert_eq!(s.engine.tx_frame_count(), 2);
}

#[test]
fn unacked_delivery_times_out() {
    let mut s = station();

    let header = Header::request(
        PacketType::Text,
        501,
        SELF_ADDR,
        "KC1FSZ".parse().unwrap(),
        NodeAddr::new(3),
        NodeAddr::new(3),
    );
    assert!(s.engine.transmit(&Packet::new(header)));
    s.engine.pump();

    s.clock.advance_ms(TX_TIMEOUT_MS);
    s.engine.pump();
    assert_eq!(s.engine.pending_count(), 0);
    assert_eq!(s.engine.stats().delivery_failures, 1);
}

#[test]
fn ping_request_answered_toward_origin() {
    let mut s = station();
    s.engine.set_local_route(NodeAddr::new(7), NodeAddr::new(3));

    // Node 7's ping reaches us via neighbor 3
    let inbound = from_peer(PacketType::PingReq, 61, 3, 7, 1, false);
    inject(&mut s.engine, -77, &inbound);
    s.engine.pump();

    let frames = drain_tx(&mut s.engine);
    assert_eq!(frames.len(), 1);
    let resp = &frames[0];
    assert_eq!(resp.header.packet_type(), Some(PacketType::PingResp));
    assert_eq!(resp.header.dest_addr, NodeAddr::new(3));
    assert_eq!(resp.header.final_dest_addr, NodeAddr::new(7));
    assert_eq!(resp.header.source_addr, SELF_ADDR);
}

#[test]
fn request_without_return_route_dropped() {
    let mut s = station();

    let inbound = from_peer(PacketType::PingReq, 61, 3, 7, 1, false);
    inject(&mut s.engine, -77, &inbound);
    s.engine.pump();

    assert!(drain_tx(&mut s.engine).is_empty());
    assert!(s.console.contains("ERR: No route to 7"));
    assert_eq!(s.engine.stats().bad_routes, 1);
}

#[test]
fn sed_request_reports_station_state() {
    let mut s = station();
    s.engine.set_local_route(NodeAddr::new(2), NodeAddr::new(2));

    let inbound = from_peer(PacketType::GetSedReq, 80, 2, 2, 1, false);
    inject(&mut s.engine, -80, &inbound);
    s.clock.advance_secs(5);
    s.engine.pump();

    let frames = drain_tx(&mut s.engine);
    assert_eq!(frames.len(), 1);
    let resp = &frames[0];
    assert_eq!(resp.header.packet_type(), Some(PacketType::GetSedResp));

    let sed = SedResp::from_bytes(resp.payload()).unwrap();
    assert_eq!(sed.battery_mv, 3800);
    assert_eq!(sed.panel_mv, 4000);
    assert_eq!(sed.last_hop_rssi, -80);
    assert_eq!(sed.uptime_seconds, 5);
    assert_eq!(sed.rx_packet_count, 1);
}

#[test]
fn sed_response_logged_as_json() {
    let mut s = station();

    let sed = SedResp {
        version: 1,
        battery_mv: 3650,
        panel_mv: 4100,
        uptime_seconds: 900,
        time_ms: 900_000,
        boot_count: 3,
        sleep_count: 12,
        last_hop_rssi: -101,
        temperature_c: 8,
        humidity_pct: 66,
        device_class: 2,
        device_revision: 1,
        rx_packet_count: 40,
        bad_rx_packet_count: 2,
        bad_route_count: 0,
    };
    let inbound = Packet::with_payload(
        from_peer(PacketType::GetSedResp, 81, 3, 7, 1, false).header,
        &sed.to_bytes(),
    )
    .unwrap();
    inject(&mut s.engine, -70, &inbound);
    s.engine.pump();

    assert!(s.console.contains("GETSED_RESP: {"));
    assert!(s.console.contains("\"batteryMv\":3650"));
    assert!(s.console.contains("\"node\":7"));
}

#[test]
fn reset_requires_passcode() {
    let mut s = station();

    let bad = Packet::with_payload(
        from_peer(PacketType::Reset, 90, 2, 2, 1, false).header,
        &ResetReq { passcode: 999 }.to_bytes(),
    )
    .unwrap();
    inject(&mut s.engine, -80, &bad);
    s.engine.pump();
    assert!(s.console.contains("ERR: Unauthorized"));
    assert!(!s.instrumentation.restarted.get());

    let good = Packet::with_payload(
        from_peer(PacketType::Reset, 91, 2, 2, 1, false).header,
        &ResetReq { passcode: PASSCODE }.to_bytes(),
    )
    .unwrap();
    inject(&mut s.engine, -80, &good);
    s.engine.pump();
    assert!(s.instrumentation.restarted.get());
}

#[test]
fn reset_counters_over_the_air() {
    let mut s = station();

    // Rack up a bad-frame count, then clear it remotely
    assert!(s.engine.push_received(-80, &[0u8; 3]));
    s.engine.pump();
    assert_eq!(s.engine.stats().bad_rx_packets, 1);

    let clear = Packet::with_payload(
        from_peer(PacketType::ResetCounters, 92, 2, 2, 1, false).header,
        &ResetReq { passcode: PASSCODE }.to_bytes(),
    )
    .unwrap();
    inject(&mut s.engine, -80, &clear);
    s.engine.pump();

    assert!(s.console.contains("INF: Reset counters"));
    assert_eq!(s.engine.stats().bad_rx_packets, 0);
}

#[test]
fn remote_set_route_applied_with_passcode() {
    let mut s = station();

    let inbound = Packet::with_payload(
        from_peer(PacketType::SetRoute, 93, 2, 2, 1, false).header,
        &SetRouteReq {
            passcode: PASSCODE,
            target: NodeAddr::new(12),
            next_hop: NodeAddr::new(4),
        }
        .to_bytes(),
    )
    .unwrap();
    inject(&mut s.engine, -80, &inbound);
    s.engine.pump();

    assert!(s.console.contains("INF: Set route 12->4"));
    assert_eq!(
        s.engine.routing().next_hop(NodeAddr::new(12)),
        Some(NodeAddr::new(4))
    );
}

#[test]
fn route_query_round_trip() {
    let mut s = station();
    s.engine.set_local_route(NodeAddr::new(2), NodeAddr::new(2));
    s.engine.set_local_route(NodeAddr::new(9), NodeAddr::new(5));

    let inbound = Packet::with_payload(
        from_peer(PacketType::GetRouteReq, 94, 2, 2, 1, false).header,
        &birdmesh_core::GetRouteReq {
            target: NodeAddr::new(9),
        }
        .to_bytes(),
    )
    .unwrap();
    inject(&mut s.engine, -80, &inbound);
    s.engine.pump();

    let frames = drain_tx(&mut s.engine);
    assert_eq!(frames.len(), 1);
    let resp = &frames[0];
    assert_eq!(resp.header.packet_type(), Some(PacketType::GetRouteResp));
    let payload = birdmesh_core::GetRouteResp::from_bytes(resp.payload()).unwrap();
    assert_eq!(payload.target, NodeAddr::new(9));
    assert_eq!(payload.next_hop, NodeAddr::new(5));
    assert_eq!(payload.tx_packet_count, 0);
    assert_eq!(payload.rx_packet_count, 0);
}

#[test]
fn text_display_formats() {
    let mut s = station();
    let inbound = Packet::with_payload(
        from_peer(PacketType::Text, 95, 2, 2, 1, false).header,
        b"Hello World!",
    )
    .unwrap();
    inject(&mut s.engine, -80, &inbound);
    s.engine.pump();
    assert!(s.console.contains("MSG: [W1AW,2] Hello World!"));

    // Machine-readable mode emits JSON instead
    let mut m = station_with_mode(1);
    inject(&mut m.engine, -80, &inbound);
    m.engine.pump();
    assert!(m.console.contains("TEXT: {"));
    assert!(m.console.contains("\"text\":\"Hello World!\""));
}

#[test]
fn unknown_type_logged() {
    let mut s = station();
    let packet = from_peer(PacketType::Text, 96, 2, 2, 1, false);
    // Clobber the type code with something undefined
    let mut wire = [0u8; MAX_PACKET];
    let n = packet.encode(&mut wire);
    wire[1] = 0x3F;
    assert!(s.engine.push_received(-80, &wire[..n]));
    s.engine.pump();

    assert!(s.console.contains("ERR: Unknown message"));
}
