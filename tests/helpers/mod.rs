/// Test doubles standing in for the CAN peripheral, the host byte stream, and
/// the clock. Each double hands out a shared handle so a test can script and
/// inspect it while the adapter owns the double itself.
use embassy_time::Instant;
use embedded_can::{nb::Can, ErrorKind};
use speedcan::{
    backend::{Bitrate, BusStatus, CanMode, CanPeripheral},
    protocol::transport::{
        can_frame::CanFrame,
        traits::{byte_stream::ByteStream, clock::Clock},
    },
};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

//==================================================================================PERIPHERAL

#[derive(Default)]
#[allow(dead_code)]
/// Observable state of the simulated CAN hardware.
pub struct BusState {
    pub running: Option<(Bitrate, CanMode)>,
    /// Free slots in the hardware transmit FIFO.
    pub tx_room: usize,
    /// Frames that made it onto the bus, in order.
    pub sent: Vec<CanFrame>,
    /// Frames waiting to be received.
    pub incoming: VecDeque<CanFrame>,
    pub status: BusStatus,
}

#[derive(Clone)]
#[allow(dead_code)]
/// In-memory CAN peripheral implementing the `embedded_can::nb::Can` contract.
pub struct MockPeripheral {
    pub bus: Rc<RefCell<BusState>>,
}

#[allow(dead_code)]
impl MockPeripheral {
    /// Peripheral with `tx_room` free FIFO slots, plus a handle on its state.
    pub fn new(tx_room: usize) -> (Self, Rc<RefCell<BusState>>) {
        let bus = Rc::new(RefCell::new(BusState {
            tx_room,
            ..Default::default()
        }));
        (Self { bus: bus.clone() }, bus)
    }
}

impl Can for MockPeripheral {
    type Frame = CanFrame;
    type Error = ErrorKind;

    fn transmit(&mut self, frame: &CanFrame) -> nb::Result<Option<CanFrame>, ErrorKind> {
        let mut bus = self.bus.borrow_mut();
        if bus.tx_room == 0 {
            return Err(nb::Error::WouldBlock);
        }
        bus.tx_room -= 1;
        bus.sent.push(*frame);
        Ok(None)
    }

    fn receive(&mut self) -> nb::Result<CanFrame, ErrorKind> {
        self.bus
            .borrow_mut()
            .incoming
            .pop_front()
            .ok_or(nb::Error::WouldBlock)
    }
}

impl CanPeripheral for MockPeripheral {
    fn start(&mut self, bitrate: Bitrate, mode: CanMode) -> Result<(), ErrorKind> {
        self.bus.borrow_mut().running = Some((bitrate, mode));
        Ok(())
    }

    fn stop(&mut self) {
        self.bus.borrow_mut().running = None;
    }

    fn rx_pending(&self) -> bool {
        !self.bus.borrow().incoming.is_empty()
    }

    fn status(&self) -> BusStatus {
        self.bus.borrow().status
    }
}

//==================================================================================STREAM

#[derive(Default)]
#[allow(dead_code)]
/// Observable state of the simulated host link.
pub struct HostState {
    /// Bytes sent by the host, not yet read by the adapter.
    pub inbound: VecDeque<u8>,
    /// Bytes written by the adapter.
    pub outbound: Vec<u8>,
    /// Reported write space; `None` means unknown.
    pub space: Option<usize>,
    pub flushes: usize,
}

#[allow(dead_code)]
impl HostState {
    /// Queue host input.
    pub fn send(&mut self, bytes: &[u8]) {
        self.inbound.extend(bytes.iter().copied());
    }

    /// Take everything the adapter wrote so far.
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.outbound)
    }
}

#[derive(Clone)]
#[allow(dead_code)]
pub struct MockStream {
    pub host: Rc<RefCell<HostState>>,
}

#[allow(dead_code)]
impl MockStream {
    pub fn new() -> (Self, Rc<RefCell<HostState>>) {
        let host = Rc::new(RefCell::new(HostState::default()));
        (Self { host: host.clone() }, host)
    }
}

impl ByteStream for MockStream {
    fn bytes_available(&self) -> usize {
        self.host.borrow().inbound.len()
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.host.borrow_mut().inbound.pop_front()
    }

    fn write_space(&self) -> Option<usize> {
        self.host.borrow().space
    }

    fn write(&mut self, bytes: &[u8]) {
        let mut host = self.host.borrow_mut();
        host.outbound.extend_from_slice(bytes);
        if let Some(space) = host.space.as_mut() {
            *space = space.saturating_sub(bytes.len());
        }
    }

    fn flush(&mut self) {
        self.host.borrow_mut().flushes += 1;
    }
}

//==================================================================================CLOCK

#[derive(Clone, Default)]
#[allow(dead_code)]
/// Manually driven clock. With a non-zero `tick`, every reading advances it
/// by that many milliseconds, so bounded waits terminate.
pub struct ManualClock {
    pub millis: Rc<Cell<u64>>,
    pub tick: u64,
}

#[allow(dead_code)]
impl ManualClock {
    pub fn ticking(tick: u64) -> Self {
        Self {
            tick,
            ..Default::default()
        }
    }

    pub fn set(&self, millis: u64) {
        self.millis.set(millis);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let now = self.millis.get();
        self.millis.set(now + self.tick);
        Instant::from_millis(now)
    }
}

//==================================================================================FRAMES

#[allow(dead_code)]
pub fn std_frame(id: u32, data: &[u8]) -> CanFrame {
    CanFrame::from_raw(id, false, data).expect("valid standard frame")
}
