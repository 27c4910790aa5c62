//! Command grammar, state machine, and the drain/forward cycle.
use super::*;
use crate::{
    backend::BusStatus,
    error::{ControllerError, LinkError},
};
use core::cell::Cell;
use embassy_time::Instant;
use embedded_can::Frame;
use std::collections::VecDeque;
use std::vec::Vec;

//==================================================================================DOUBLES

#[derive(Default)]
struct FakeController {
    mode: Option<CanMode>,
    opened_at: Option<Bitrate>,
    written: Vec<CanFrame>,
    rx: VecDeque<CanFrame>,
    filter: Option<AcceptanceFilter>,
    status: BusStatus,
    services: usize,
    refuse_writes: bool,
}

impl CanController for FakeController {
    fn is_bitrate_supported(&self, bitrate: Bitrate) -> bool {
        matches!(bitrate.preset(), 4 | 5 | 6 | 8)
    }

    fn open(&mut self, bitrate: Bitrate, mode: CanMode) -> Result<(), ControllerError> {
        self.mode = Some(mode);
        self.opened_at = Some(bitrate);
        Ok(())
    }

    fn close(&mut self) {
        self.mode = None;
    }

    fn mode(&self) -> Option<CanMode> {
        self.mode
    }

    fn write(&mut self, frame: &CanFrame) -> Result<(), ControllerError> {
        if self.refuse_writes {
            return Err(ControllerError::TxQueueFull);
        }
        self.written.push(*frame);
        Ok(())
    }

    fn service_queue(&mut self) {
        self.services += 1;
    }

    fn available(&self) -> bool {
        !self.rx.is_empty()
    }

    fn read(&mut self) -> Option<CanFrame> {
        let frame = self.rx.pop_front()?;
        match self.filter {
            Some(filter) if !filter.accepts(frame.raw_id()) => None,
            _ => Some(frame),
        }
    }

    fn status(&self) -> BusStatus {
        self.status
    }

    fn set_filter(&mut self, filter: AcceptanceFilter) {
        self.filter = Some(filter);
    }

    fn clear_filter(&mut self) {
        self.filter = None;
    }
}

#[derive(Default)]
struct FixedClock {
    millis: Cell<u64>,
}

impl Clock for FixedClock {
    fn now(&self) -> Instant {
        Instant::from_millis(self.millis.get())
    }
}

/// Sink accepting a limited number of lines.
struct Sink {
    lines: Vec<Vec<u8>>,
    room: usize,
}

impl Sink {
    fn with_room(room: usize) -> Self {
        Self {
            lines: Vec::new(),
            room,
        }
    }
}

impl FrameSink for Sink {
    fn write_with_priority(&mut self, bytes: &[u8], priority: WritePriority) -> Result<(), LinkError> {
        assert_eq!(priority, WritePriority::Droppable);
        if self.room == 0 {
            return Err(LinkError::NoSpace {
                len: bytes.len(),
                available: 0,
            });
        }
        self.room -= 1;
        self.lines.push(bytes.to_vec());
        Ok(())
    }
}

type Engine = SlcanEngine<FakeController, FixedClock, 4>;

fn engine() -> Engine {
    SlcanEngine::new(FakeController::default(), FixedClock::default())
}

fn open_engine() -> Engine {
    let mut engine = engine();
    assert_eq!(engine.process(b"O"), Reply::Ack);
    engine
}

fn text(reply: Reply) -> Vec<u8> {
    match reply {
        Reply::Text(line) => line.as_slice().to_vec(),
        other => panic!("expected text reply, got {:?}", other),
    }
}

fn rx_frame(id: u32) -> CanFrame {
    CanFrame::from_raw(id, false, &[id as u8]).unwrap()
}

//==================================================================================COMMANDS

#[test]
/// `S6` then `O`: both acknowledged, channel open at 500k.
fn test_setup_then_open() {
    let mut engine = engine();
    assert_eq!(engine.process(b"S6"), Reply::Ack);
    assert_eq!(engine.process(b"O"), Reply::Ack);
    assert_eq!(engine.state(), ChannelState::Open);
    assert_eq!(engine.controller().opened_at, Some(Bitrate::_500kbit));
    assert_eq!(engine.controller().mode, Some(CanMode::Normal));
}

#[test]
/// Unsupported, out-of-range, or malformed presets; S while open.
fn test_setup_rejections() {
    let mut engine = engine();
    assert_eq!(engine.process(b"S0"), Reply::Error);
    assert_eq!(engine.process(b"S9"), Reply::Error);
    assert_eq!(engine.process(b"S"), Reply::Error);
    assert_eq!(engine.process(b"S44"), Reply::Error);
    assert_eq!(engine.bitrate(), Bitrate::_500kbit);

    assert_eq!(engine.process(b"S4"), Reply::Ack);
    assert_eq!(engine.process(b"L"), Reply::Ack);
    assert_eq!(engine.process(b"S5"), Reply::Error);
    assert_eq!(engine.bitrate(), Bitrate::_125kbit);
}

#[test]
/// No direct Open ↔ ListenOnly; close is always fine.
fn test_open_close_state_machine() {
    let mut engine = engine();
    assert_eq!(engine.process(b"C"), Reply::Ack);
    assert_eq!(engine.process(b"L"), Reply::Ack);
    assert_eq!(engine.state(), ChannelState::ListenOnly);
    assert_eq!(engine.process(b"O"), Reply::Error);
    assert_eq!(engine.process(b"C"), Reply::Ack);
    assert_eq!(engine.state(), ChannelState::Closed);
    assert_eq!(engine.process(b"C"), Reply::Ack);
    assert_eq!(engine.controller().mode, None);
}

#[test]
fn test_transmit_confirmations() {
    let mut engine = open_engine();
    assert_eq!(engine.process(b"t1233AABBCC"), Reply::token(b'z'));
    assert_eq!(engine.process(b"T0000ABCD0"), Reply::token(b'Z'));
    assert_eq!(engine.process(b"r7FF2"), Reply::token(b'z'));
    assert_eq!(engine.process(b"R1FFFFFFF8"), Reply::token(b'Z'));

    let written = &engine.controller().written;
    assert_eq!(written.len(), 4);
    assert_eq!(written[0].data(), &[0xAA, 0xBB, 0xCC]);
    assert!(written[3].is_remote_frame());
}

#[test]
/// Bad frames never reach the controller.
fn test_transmit_rejections() {
    let mut engine = engine();
    assert_eq!(engine.process(b"t1230"), Reply::Error);

    engine.process(b"O");
    assert_eq!(engine.process(b"t12381122"), Reply::Error);
    assert_eq!(engine.process(b"t8000"), Reply::Error);
    assert_eq!(engine.process(b"t1239"), Reply::Error);
    assert!(engine.controller().written.is_empty());

    engine.controller_mut().refuse_writes = true;
    assert_eq!(engine.process(b"t1230"), Reply::Error);
}

#[test]
fn test_listen_only_refuses_transmit() {
    let mut engine = engine();
    engine.process(b"L");
    assert_eq!(engine.process(b"t1230"), Reply::Error);
    assert!(engine.controller().written.is_empty());
}

#[test]
/// Status, version, and serial replies.
fn test_information_replies() {
    let mut engine = open_engine();
    engine.controller_mut().status = BusStatus::ERROR_PASSIVE | BusStatus::BUS_ERROR;
    assert_eq!(text(engine.process(b"F")), b"FA0");
    assert_eq!(text(engine.process(b"V")), b"V0100");
    assert_eq!(text(engine.process(b"N")), b"NSCAN");

    let config = SlcanConfig::default()
        .with_version(2, 0x1A)
        .with_serial_number(*b"AB12")
        .unwrap();
    let mut custom: Engine =
        SlcanEngine::with_config(FakeController::default(), FixedClock::default(), config);
    assert_eq!(text(custom.process(b"V")), b"V021A");
    assert_eq!(text(custom.process(b"N")), b"NAB12");
}

#[test]
/// A closed channel reports all clear, whatever the hardware says.
fn test_status_clear_while_closed() {
    let mut engine = engine();
    engine.controller_mut().status = BusStatus::DATA_OVERRUN;
    assert_eq!(text(engine.process(b"F")), b"F00");

    engine.process(b"O");
    assert_eq!(text(engine.process(b"F")), b"F08");
    engine.process(b"C");
    assert_eq!(text(engine.process(b"F")), b"F00");
}

#[test]
fn test_toggles() {
    let mut engine = engine();
    assert_eq!(engine.process(b"Z1"), Reply::Ack);
    assert!(engine.timestamps_enabled());
    assert_eq!(engine.process(b"Z2"), Reply::Error);
    assert_eq!(engine.process(b"Z"), Reply::Error);
    assert!(engine.timestamps_enabled());

    assert_eq!(engine.process(b"X0"), Reply::Ack);
    assert!(!engine.auto_forward());
    assert_eq!(engine.process(b"X10"), Reply::Error);
}

#[test]
/// Seven digits are rejected and leave the filter untouched.
fn test_filter_commands() {
    let mut engine = engine();
    assert_eq!(engine.process(b"M1FFFFFF"), Reply::Error);
    assert_eq!(engine.process(b"M1FFFFFFG"), Reply::Error);
    assert_eq!(engine.filter(), None);

    assert_eq!(engine.process(b"M000007F0"), Reply::Ack);
    assert_eq!(engine.process(b"m00000120"), Reply::Ack);
    assert_eq!(
        engine.filter(),
        Some(AcceptanceFilter::new(0x7F0, 0x120))
    );
    // Closed: stored only.
    assert_eq!(engine.controller().filter, None);

    engine.process(b"O");
    assert_eq!(
        engine.controller().filter,
        Some(AcceptanceFilter::new(0x7F0, 0x120))
    );
    engine.process(b"m00000130");
    assert_eq!(
        engine.controller().filter,
        Some(AcceptanceFilter::new(0x7F0, 0x130))
    );
}

#[test]
/// Opening without any `M`/`m` clears a leftover controller filter.
fn test_open_without_filter_clears_it() {
    let mut engine = engine();
    engine.controller_mut().filter = Some(AcceptanceFilter::new(1, 1));
    engine.process(b"O");
    assert_eq!(engine.controller().filter, None);
}

#[test]
fn test_unknown_and_unsupported() {
    let mut engine = engine();
    assert_eq!(engine.process(b"Q"), Reply::Error);
    assert_eq!(engine.process(b"s031C"), Reply::Error);
    assert!(!engine.can_handle(b"Q"));
    assert!(!engine.can_handle(b""));
    assert!(engine.can_handle(b"s031C"));
    assert!(engine.can_handle(b"P"));
}

//==================================================================================POLL

#[test]
/// Nothing moves while closed, but the transmit queue is always serviced.
fn test_poll_closed() {
    let mut engine = engine();
    engine.controller_mut().rx.push_back(rx_frame(1));
    let mut sink = Sink::with_room(8);
    engine.poll(&mut sink);
    assert!(sink.lines.is_empty());
    assert_eq!(engine.controller().services, 1);
    assert_eq!(engine.buffered(), 0);
}

#[test]
/// Frames are forwarded oldest first with the timestamp taken at drain.
fn test_forward_with_timestamps() {
    let mut engine = open_engine();
    engine.process(b"Z1");
    engine.clock.millis.set(0x1_2345);
    engine.controller_mut().rx.extend([rx_frame(0x100), rx_frame(0x200)]);

    let mut sink = Sink::with_room(8);
    engine.poll(&mut sink);
    assert_eq!(
        sink.lines,
        [b"t1001002345\r".to_vec(), b"t2001002345\r".to_vec()]
    );
    assert_eq!(engine.buffered(), 0);
}

#[test]
/// Full ring: exactly one overflow, buffered frames intact and in order.
fn test_ring_overflow_drops_newest() {
    let mut engine = open_engine();
    engine.controller_mut().rx.extend((1..=5).map(rx_frame));

    // No room at the host: drain fills the ring, forward stalls.
    let mut blocked = Sink::with_room(0);
    engine.poll(&mut blocked);
    assert_eq!(engine.buffered(), 4);
    assert_eq!(engine.counters().rx_overflows, 1);
    assert_eq!(engine.counters().forward_stalls, 1);
    assert!(engine.controller().rx.is_empty());

    let mut sink = Sink::with_room(8);
    engine.poll(&mut sink);
    let ids: Vec<u8> = sink.lines.iter().map(|line| line[3]).collect();
    assert_eq!(ids, [b'1', b'2', b'3', b'4']);
    assert_eq!(engine.counters().rx_overflows, 1);
    assert_eq!(engine.buffered(), 0);
}

#[test]
/// A refused write keeps the frame at the head for the next cycle.
fn test_refused_write_retries_same_frame() {
    let mut engine = open_engine();
    engine.controller_mut().rx.extend([rx_frame(0x10), rx_frame(0x20)]);

    let mut sink = Sink::with_room(1);
    engine.poll(&mut sink);
    assert_eq!(sink.lines, [b"t010110\r".to_vec()]);
    assert_eq!(engine.buffered(), 1);

    sink.room = 1;
    engine.poll(&mut sink);
    assert_eq!(sink.lines[1], b"t020120\r".to_vec());
}

#[test]
/// At most `frames_per_poll` lines per cycle.
fn test_forward_budget() {
    let config = SlcanConfig::default().with_frames_per_poll(2);
    let mut engine: Engine =
        SlcanEngine::with_config(FakeController::default(), FixedClock::default(), config);
    engine.process(b"O");
    engine.controller_mut().rx.extend((1..=3).map(rx_frame));

    let mut sink = Sink::with_room(8);
    engine.poll(&mut sink);
    assert_eq!(sink.lines.len(), 2);
    assert_eq!(engine.buffered(), 1);
    engine.poll(&mut sink);
    assert_eq!(sink.lines.len(), 3);
}

#[test]
/// Filter rejections do not end the drain early.
fn test_drain_skips_filtered_frames() {
    let mut engine = open_engine();
    engine.process(b"M000007FF");
    engine.process(b"m00000002");
    engine.controller_mut().rx.extend([rx_frame(1), rx_frame(2), rx_frame(3)]);

    let mut sink = Sink::with_room(8);
    engine.poll(&mut sink);
    assert_eq!(sink.lines, [b"t002102\r".to_vec()]);
}

#[test]
/// Remote frames never carry the timestamp suffix.
fn test_forward_remote_without_timestamp() {
    let mut engine = open_engine();
    engine.process(b"Z1");
    engine
        .controller_mut()
        .rx
        .push_back(CanFrame::remote_from_raw(0x1ABCDEF0, true, 2).unwrap());
    let mut sink = Sink::with_room(8);
    engine.poll(&mut sink);
    assert_eq!(sink.lines, [b"R1ABCDEF02\r".to_vec()]);
}

#[test]
/// With auto-forward off, frames wait for `P`.
fn test_manual_poll() {
    let mut engine = engine();
    assert_eq!(engine.process(b"P"), Reply::Error);
    engine.process(b"O");
    assert_eq!(engine.process(b"P"), Reply::Error);

    engine.process(b"X0");
    engine.controller_mut().rx.extend([rx_frame(0x7A), rx_frame(0x7B)]);
    let mut sink = Sink::with_room(8);
    engine.poll(&mut sink);
    assert!(sink.lines.is_empty());
    assert_eq!(engine.controller().rx.len(), 2);

    assert_eq!(text(engine.process(b"P")), b"t07A17A");
    assert_eq!(text(engine.process(b"P")), b"t07B17B");
    assert_eq!(engine.process(b"P"), Reply::Ack);
}

#[test]
fn test_counters_reset() {
    let mut engine = open_engine();
    engine.controller_mut().rx.push_back(rx_frame(1));
    engine.poll(&mut Sink::with_room(0));
    assert_eq!(engine.counters().forward_stalls, 1);
    engine.reset_counters();
    assert_eq!(engine.counters(), SlcanCounters::default());
}

#[test]
fn test_handler_identity() {
    let mut engine = engine();
    assert_eq!(engine.name(), HANDLER_NAME);
    assert!(!engine.is_active());
    engine.process(b"L");
    assert!(engine.is_active());
}
