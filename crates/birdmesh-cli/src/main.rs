//! Birdmesh station command-line interface
//!
//! Two ways to drive the packet engine without radio hardware:
//! - `console`: the interactive station console, with transmitted frames
//!   rendered to the terminal instead of the air
//! - `simulate`: a three-node chain wired back-to-back in memory,
//!   demonstrating multi-hop forwarding, acknowledgements and retries

use anyhow::{Context, Result};
use birdmesh_core::{
    CallSign, Configuration, Console, EngineConfig, Instrumentation, ManualClock,
    MessageProcessor, NodeAddr, Packet, StaticRoutes, SystemClock, MAX_PACKET,
};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use tracing::debug;

#[derive(Parser)]
#[command(name = "birdmesh")]
#[command(author, version, about = "Birdhouse mesh station tools", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive station console
    Console {
        /// This station's mesh address
        #[arg(long, default_value = "1")]
        addr: u16,

        /// This station's call sign
        #[arg(long, default_value = "KC1FSZ")]
        call: String,

        /// Passcode sent with administrative commands
        #[arg(long, default_value = "1234")]
        passcode: u32,

        /// Emit machine-readable (JSON) report lines
        #[arg(long)]
        json: bool,
    },

    /// Run a three-node chain simulation (1 <-> 2 <-> 3)
    Simulate {
        /// Number of 100ms simulation steps
        #[arg(long, default_value = "100")]
        steps: u32,

        /// Drop every frame on the 2<->3 link until this step, to show
        /// retries in action
        #[arg(long, default_value = "0")]
        jam_until: u32,
    },
}

struct HostConfig {
    addr: NodeAddr,
    call: CallSign,
    passcode: u32,
    command_mode: u8,
    log_level: u8,
}

impl Configuration for HostConfig {
    fn addr(&self) -> NodeAddr {
        self.addr
    }
    fn call(&self) -> CallSign {
        self.call
    }
    fn battery_limit_mv(&self) -> u16 {
        3400
    }
    fn boot_count(&self) -> u16 {
        1
    }
    fn sleep_count(&self) -> u16 {
        0
    }
    fn log_level(&self) -> u8 {
        self.log_level
    }
    fn command_mode(&self) -> u8 {
        self.command_mode
    }
    fn check_passcode(&self, passcode: u32) -> bool {
        passcode == self.passcode
    }
}

/// Bench-supply numbers standing in for the real sensors
struct HostInstrumentation;

impl Instrumentation for HostInstrumentation {
    fn software_version(&self) -> u16 {
        env!("CARGO_PKG_VERSION_MINOR").parse().unwrap_or(0)
    }
    fn battery_mv(&self) -> u16 {
        3800
    }
    fn panel_mv(&self) -> u16 {
        4000
    }
    fn temperature_c(&self) -> i16 {
        21
    }
    fn humidity_pct(&self) -> i16 {
        45
    }
    fn device_class(&self) -> u16 {
        2
    }
    fn device_revision(&self) -> u16 {
        1
    }
    fn restart(&mut self) {
        println!("RESTART requested");
    }
    fn restart_radio(&mut self) {
        println!("RADIO RESTART requested");
    }
    fn sleep_ms(&mut self, ms: u32) {
        debug!(ms, "sleep requested");
    }
}

struct StdoutConsole {
    prefix: &'static str,
}

impl Console for StdoutConsole {
    fn write_line(&mut self, line: &str) {
        println!("{}{}", self.prefix, line);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(match cli.verbose {
                    0 => "warn",
                    1 => "info",
                    _ => "debug",
                })
            }),
        )
        .init();

    match cli.command {
        Commands::Console {
            addr,
            call,
            passcode,
            json,
        } => run_console(addr, call, passcode, json, cli.verbose),
        Commands::Simulate { steps, jam_until } => run_simulation(steps, jam_until),
    }
}

fn run_console(addr: u16, call: String, passcode: u32, json: bool, verbose: u8) -> Result<()> {
    let call: CallSign = call
        .parse()
        .with_context(|| format!("invalid call sign {call:?}"))?;
    let config = HostConfig {
        addr: NodeAddr::new(addr),
        call,
        passcode,
        command_mode: u8::from(json),
        log_level: verbose,
    };
    let mut engine = MessageProcessor::new(
        Box::new(SystemClock::new()),
        Box::new(StaticRoutes::new()),
        Box::new(HostInstrumentation),
        Box::new(config),
        Box::new(StdoutConsole { prefix: "" }),
        EngineConfig::default(),
    );

    println!("birdmesh station {call} (node {addr}), 'help' for commands");
    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush().context("flushing prompt")?;
        let mut line = String::new();
        let n = stdin
            .lock()
            .read_line(&mut line)
            .context("reading command")?;
        if n == 0 {
            break;
        }
        if !dispatch_command(&mut engine, passcode, line.trim()) {
            break;
        }
        engine.pump();
        render_tx(&mut engine, "TX: ");
    }
    Ok(())
}

/// Apply one console command. Returns false when the operator quits.
fn dispatch_command(engine: &mut MessageProcessor, passcode: u32, line: &str) -> bool {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let parsed = match parts.as_slice() {
        [] => Some(true),
        ["quit"] | ["exit"] => Some(false),
        ["help"] => {
            print_help();
            Some(true)
        }
        ["info"] => {
            engine.log_info();
            Some(true)
        }
        ["ping", dest] => parse_addr(dest).map(|d| {
            engine.send_ping(d);
            true
        }),
        ["sed", dest] => parse_addr(dest).map(|d| {
            engine.send_sed_request(d);
            true
        }),
        ["setroute", target, hop] => parse_addr(target).zip(parse_addr(hop)).map(|(t, h)| {
            if engine.set_local_route(t, h) {
                println!("route {t} -> {h}");
            } else {
                println!("ERR: Bad address");
            }
            true
        }),
        ["setrouteremote", node, target, hop] => parse_addr(node)
            .zip(parse_addr(target))
            .zip(parse_addr(hop))
            .map(|((n, t), h)| {
                engine.send_set_route(n, t, h, passcode);
                true
            }),
        ["getroute", dest, target] => parse_addr(dest).zip(parse_addr(target)).map(|(d, t)| {
            engine.send_route_request(d, t);
            true
        }),
        ["reset", dest] => parse_addr(dest).map(|d| {
            engine.send_reset(d, passcode);
            true
        }),
        ["resetcounters", dest] => parse_addr(dest).map(|d| {
            engine.send_reset_counters(d, passcode);
            true
        }),
        ["text", dest, ..] => parse_addr(dest).map(|d| {
            let message = parts[2..].join(" ");
            engine.send_text(d, message.as_bytes());
            true
        }),
        _ => None,
    };
    match parsed {
        Some(keep_going) => keep_going,
        None => {
            println!("ERR: Bad command, try 'help'");
            true
        }
    }
}

fn parse_addr(text: &str) -> Option<NodeAddr> {
    text.parse::<u16>().ok().map(NodeAddr::new)
}

fn print_help() {
    println!("commands:");
    println!("  ping <addr>                         probe a node");
    println!("  text <addr> <message>               send display text");
    println!("  sed <addr>                          request engineering data");
    println!("  info                                local station report");
    println!("  setroute <target> <nextHop>         set a local route");
    println!("  setrouteremote <node> <t> <nextHop> set a route on a remote node");
    println!("  getroute <addr> <target>            query a remote routing entry");
    println!("  reset <addr>                        restart a remote node");
    println!("  resetcounters <addr>                clear a node's counters");
    println!("  quit");
}

fn render_tx(engine: &mut MessageProcessor, prefix: &str) {
    let mut out = [0u8; MAX_PACKET];
    while let Some(n) = engine.next_transmit(&mut out) {
        match Packet::decode(&out[..n]) {
            Ok(packet) => println!("{prefix}{}", describe(&packet)),
            Err(err) => println!("{prefix}undecodable frame ({err})"),
        }
    }
}

fn describe(packet: &Packet) -> String {
    let h = &packet.header;
    let kind = if h.type_flags.is_ack() {
        "ACK".to_string()
    } else {
        match h.packet_type() {
            Some(kind) => format!("{kind:?}"),
            None => format!("type {}", h.type_flags.code()),
        }
    };
    format!(
        "{kind} id={} {}->{} (origin {}, final {}, {}B)",
        h.id,
        h.source_addr,
        h.dest_addr,
        h.original_source_addr,
        h.final_dest_addr,
        packet.wire_len(),
    )
}

// ----- simulation ----------------------------------------------------------

struct SimNode {
    engine: MessageProcessor,
    addr: NodeAddr,
}

fn sim_node(clock: &ManualClock, addr: u16, call: &str) -> SimNode {
    let config = HostConfig {
        addr: NodeAddr::new(addr),
        call: call.parse().expect("static call sign"),
        passcode: 1234,
        command_mode: 0,
        log_level: 0,
    };
    let prefix: &'static str = match addr {
        1 => "[node 1] ",
        2 => "[node 2] ",
        _ => "[node 3] ",
    };
    SimNode {
        engine: MessageProcessor::new(
            Box::new(clock.clone()),
            Box::new(StaticRoutes::new()),
            Box::new(HostInstrumentation),
            Box::new(config),
            Box::new(StdoutConsole { prefix }),
            EngineConfig::default(),
        ),
        addr: NodeAddr::new(addr),
    }
}

/// Deliver every frame queued at `from` to each node in radio range
fn radiate(from: &mut SimNode, hearers: &mut [&mut SimNode], drop_all: bool) {
    let mut frame = [0u8; MAX_PACKET];
    while let Some(n) = from.engine.next_transmit(&mut frame) {
        if drop_all {
            debug!(from = %from.addr, "frame jammed");
            continue;
        }
        for hearer in hearers.iter_mut() {
            if !hearer.engine.push_received(-90, &frame[..n]) {
                debug!(to = %hearer.addr, "rx ring full, frame lost");
            }
        }
    }
}

fn run_simulation(steps: u32, jam_until: u32) -> Result<()> {
    let clock = ManualClock::new(0);
    let mut node1 = sim_node(&clock, 1, "KC1FSZ");
    let mut node2 = sim_node(&clock, 2, "W1AW");
    let mut node3 = sim_node(&clock, 3, "K1USN");

    // A chain: 1 <-> 2 <-> 3, routes set administratively
    node1.engine.set_local_route(NodeAddr::new(2), NodeAddr::new(2));
    node1.engine.set_local_route(NodeAddr::new(3), NodeAddr::new(2));
    node2.engine.set_local_route(NodeAddr::new(1), NodeAddr::new(1));
    node2.engine.set_local_route(NodeAddr::new(3), NodeAddr::new(3));
    node3.engine.set_local_route(NodeAddr::new(1), NodeAddr::new(2));
    node3.engine.set_local_route(NodeAddr::new(2), NodeAddr::new(2));

    println!("pinging node 3 from node 1 across the chain");
    node1.engine.send_ping(NodeAddr::new(3));
    node1.engine.send_text(NodeAddr::new(3), b"Hello from the birdhouse!");

    for step in 0..steps {
        let jammed = step < jam_until;
        node1.engine.pump();
        node2.engine.pump();
        node3.engine.pump();

        // Node 2 sits between the other two; 1 and 3 cannot hear each other
        radiate(&mut node1, &mut [&mut node2], false);
        radiate(&mut node3, &mut [&mut node2], jammed);
        if jammed {
            // The 2<->3 link is down: node 3 hears nothing, node 1 still does
            radiate(&mut node2, &mut [&mut node1], false);
        } else {
            radiate(&mut node2, &mut [&mut node1, &mut node3], false);
        }

        clock.advance_ms(100);
    }

    for node in [&node1, &node2, &node3] {
        let stats = node.engine.stats();
        println!(
            "node {}: rx={} tx={} forwarded={} acks_rx={} retries={} failures={}",
            node.addr,
            stats.rx_packets,
            stats.tx_packets,
            stats.forwarded,
            stats.acks_received,
            stats.retransmissions,
            stats.delivery_failures,
        );
    }
    Ok(())
}
