//! Loopback demo: an SLCAN session against an in-memory CAN bus that echoes
//! every transmitted frame back as a received one. Host traffic is scripted
//! and the adapter output is printed as it would appear on the serial port.

use std::collections::VecDeque;

// Links the std pender the embassy time driver calls into.
use embassy_executor as _;
use embedded_can::{nb::Can, ErrorKind};
use speedcan::{
    backend::{Bitrate, CanMode, CanPeripheral, QueuedController},
    protocol::{
        slcan::SlcanEngine,
        transport::{
            can_frame::CanFrame,
            host_link::HostLink,
            traits::{byte_stream::ByteStream, clock::EmbassyClock},
        },
    },
    Adapter,
};

/// CAN peripheral whose bus loops every transmitted frame back.
#[derive(Default)]
struct LoopbackBus {
    running: bool,
    echoed: VecDeque<CanFrame>,
}

impl Can for LoopbackBus {
    type Frame = CanFrame;
    type Error = ErrorKind;

    fn transmit(&mut self, frame: &CanFrame) -> nb::Result<Option<CanFrame>, ErrorKind> {
        self.echoed.push_back(*frame);
        Ok(None)
    }

    fn receive(&mut self) -> nb::Result<CanFrame, ErrorKind> {
        self.echoed.pop_front().ok_or(nb::Error::WouldBlock)
    }
}

impl CanPeripheral for LoopbackBus {
    fn start(&mut self, bitrate: Bitrate, mode: CanMode) -> Result<(), ErrorKind> {
        println!("  [bus] started at {} kbit/s ({:?})", bitrate.kbps(), mode);
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) {
        println!("  [bus] stopped");
        self.running = false;
    }

    fn rx_pending(&self) -> bool {
        self.running && !self.echoed.is_empty()
    }
}

/// Serial port stand-in: scripted input, captured output.
#[derive(Default)]
struct ScriptedPort {
    input: VecDeque<u8>,
    output: Vec<u8>,
}

impl ByteStream for ScriptedPort {
    fn bytes_available(&self) -> usize {
        self.input.len()
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.input.pop_front()
    }

    fn write_space(&self) -> Option<usize> {
        None
    }

    fn write(&mut self, bytes: &[u8]) {
        self.output.extend_from_slice(bytes);
    }

    fn flush(&mut self) {}
}

/// Render adapter output with CR and BELL made visible.
fn visible(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| match b {
            b'\r' => "\\r".to_string(),
            0x07 => "<BELL>".to_string(),
            _ => (b as char).to_string(),
        })
        .collect()
}

fn main() {
    println!("=== SLCAN loopback ===\n");

    let controller: QueuedController<LoopbackBus> = QueuedController::new(LoopbackBus::default());
    let mut engine: SlcanEngine<_, _> = SlcanEngine::new(controller, EmbassyClock);
    let mut adapter: Adapter<'_, ScriptedPort, EmbassyClock> =
        Adapter::new(HostLink::new(ScriptedPort::default(), EmbassyClock));
    if let Err(err) = adapter.register(&mut engine) {
        println!("registration failed: {err}");
        return;
    }

    let script: [&[u8]; 9] = [
        b"V\r",
        b"N\r",
        b"S6\r",
        b"O\r",
        b"t1233112233\r",
        b"T1FFFFFFF0\r",
        b"r7FF2\r",
        b"S4\r", // rejected while open
        b"C\r",
    ];

    for command in script {
        let port = adapter.link_mut().stream_mut();
        port.input.extend(command.iter().copied());
        adapter.run_cycle();

        let port = adapter.link_mut().stream_mut();
        let output = std::mem::take(&mut port.output);
        println!("host> {:<16} adapter> {}", visible(command), visible(&output));
    }

    let counters = adapter.link().counters();
    println!(
        "\nLink drops: critical={} droppable={} overflows={}",
        counters.critical_dropped, counters.droppable_dropped, counters.command_overflows
    );
}
