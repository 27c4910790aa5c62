//! SLCAN (Lawicel) protocol engine.
//!
//! Owns the channel state machine and the inbound frame ring. Commands are
//! answered synchronously; received frames move in two phases of
//! [`SlcanEngine::poll`]: controller → ring (drain), then ring → host
//! (forward). Both phases run in the same call, drain first, so the ring
//! needs no synchronisation.
//!
//! | Command        | Legal in     | Reply                       |
//! |----------------|--------------|-----------------------------|
//! | `Sn`           | Closed       | ack                         |
//! | `O`, `L`       | Closed       | ack                         |
//! | `C`            | any          | ack                         |
//! | `t T r R`      | Open         | `z` (standard), `Z` (ext.)  |
//! | `F`            | any          | `Fxx` flags, `F00` if closed |
//! | `V`            | any          | `Vmmnn`                     |
//! | `N`            | any          | `Nssss`                     |
//! | `Z0` `Z1`      | any          | ack                         |
//! | `Mxxxxxxxx`    | any          | ack                         |
//! | `mxxxxxxxx`    | any          | ack                         |
//! | `X0` `X1`      | any          | ack                         |
//! | `P`            | not Closed   | frame line or ack           |
//!
//! Anything else, and any failed command, is answered with BELL.
pub mod commands;

use commands::*;

use crate::{
    backend::{AcceptanceFilter, Bitrate, BusStatus, CanController, CanMode},
    config::{SlcanConfig, RX_RING_CAPACITY},
    core::{Reply, ReplyLine, CR},
    error::{CommandError, ControllerError},
    infra::{
        codec::{
            frame_codec,
            hex::{ascii_from_nibble, HexReader},
        },
        ring::BoundedRing,
    },
    protocol::{
        dispatcher::ProtocolHandler,
        transport::{
            can_frame::CanFrame,
            traits::{
                clock::Clock,
                frame_sink::{FrameSink, WritePriority},
            },
        },
    },
};

/// Name under which the engine registers with a dispatcher.
pub const HANDLER_NAME: &str = "SLCAN";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Channel state as seen by the host.
pub enum ChannelState {
    Closed,
    Open,
    ListenOnly,
}

/// Engine diagnostics. Only [`SlcanEngine::reset_counters`] clears them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlcanCounters {
    /// Received frames dropped because the inbound ring was full.
    pub rx_overflows: u32,
    /// Forward attempts refused by the host link (the frame stays buffered).
    pub forward_stalls: u32,
}

pub struct SlcanEngine<C: CanController, K: Clock, const RX: usize = RX_RING_CAPACITY> {
    controller: C,
    clock: K,
    config: SlcanConfig,
    state: ChannelState,
    /// Preset used by the next `O` / `L`.
    bitrate: Bitrate,
    timestamps: bool,
    auto_forward: bool,
    filter: AcceptanceFilter,
    /// Set once `M` or `m` has been received.
    filter_configured: bool,
    rx_ring: BoundedRing<CanFrame, RX>,
    counters: SlcanCounters,
}

impl<C: CanController, K: Clock, const RX: usize> SlcanEngine<C, K, RX> {
    pub fn new(controller: C, clock: K) -> Self {
        Self::with_config(controller, clock, SlcanConfig::default())
    }

    pub fn with_config(controller: C, clock: K, config: SlcanConfig) -> Self {
        Self {
            controller,
            clock,
            config,
            state: ChannelState::Closed,
            bitrate: config.default_bitrate,
            timestamps: false,
            auto_forward: config.auto_forward,
            filter: AcceptanceFilter::default(),
            filter_configured: false,
            rx_ring: BoundedRing::new(),
            counters: SlcanCounters::default(),
        }
    }

    //==============================================================================COMMANDS

    /// Execute one command line (terminator excluded) and build its reply.
    /// Never fails: errors collapse into [`Reply::Error`] with no state change.
    pub fn process(&mut self, line: &[u8]) -> Reply {
        match self.execute(line) {
            Ok(reply) => reply,
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::debug!("Command {=[u8]:a} rejected: {}", line, defmt::Debug2Format(&_e));
                Reply::Error
            }
        }
    }

    fn execute(&mut self, line: &[u8]) -> Result<Reply, CommandError> {
        let Some(&command) = line.first() else {
            return Err(CommandError::Malformed);
        };
        match command {
            CMD_SETUP => self.setup(line),
            CMD_SETUP_BTR => Err(CommandError::Unsupported),
            CMD_OPEN => self.open(CanMode::Normal),
            CMD_LISTEN => self.open(CanMode::ListenOnly),
            CMD_CLOSE => Ok(self.close()),
            CMD_TX_STD => self.transmit(line, false, false),
            CMD_TX_EXT => self.transmit(line, true, false),
            CMD_TX_RTR_STD => self.transmit(line, false, true),
            CMD_TX_RTR_EXT => self.transmit(line, true, true),
            CMD_STATUS => Ok(self.status()),
            CMD_VERSION => Ok(self.version()),
            CMD_SERIAL => Ok(self.serial()),
            CMD_TIMESTAMP => {
                self.timestamps = parse_toggle(line)?;
                Ok(Reply::Ack)
            }
            CMD_AUTO_FORWARD => {
                self.auto_forward = parse_toggle(line)?;
                Ok(Reply::Ack)
            }
            CMD_FILTER_MASK => {
                self.filter.mask = parse_filter(line)?;
                Ok(self.filter_changed())
            }
            CMD_FILTER_CODE => {
                self.filter.value = parse_filter(line)?;
                Ok(self.filter_changed())
            }
            CMD_POLL => self.poll_one(),
            _ => Err(CommandError::Unknown { command }),
        }
    }

    fn setup(&mut self, line: &[u8]) -> Result<Reply, CommandError> {
        if line.len() != TOGGLE_LEN {
            return Err(CommandError::Malformed);
        }
        let bitrate = line[1]
            .checked_sub(b'0')
            .and_then(Bitrate::from_preset)
            .ok_or(CommandError::Malformed)?;
        if self.state != ChannelState::Closed {
            return Err(CommandError::IllegalState);
        }
        if !self.controller.is_bitrate_supported(bitrate) {
            return Err(ControllerError::UnsupportedBitrate {
                preset: bitrate.preset(),
            }
            .into());
        }
        self.bitrate = bitrate;
        Ok(Reply::Ack)
    }

    fn open(&mut self, mode: CanMode) -> Result<Reply, CommandError> {
        if self.state != ChannelState::Closed {
            return Err(CommandError::IllegalState);
        }
        self.controller.open(self.bitrate, mode)?;
        if self.filter_configured {
            self.controller.set_filter(self.filter);
        } else {
            self.controller.clear_filter();
        }
        self.state = match mode {
            CanMode::Normal => ChannelState::Open,
            CanMode::ListenOnly => ChannelState::ListenOnly,
        };
        #[cfg(feature = "defmt")]
        defmt::info!("Channel {} at S{=u8}", self.state, self.bitrate.preset());
        Ok(Reply::Ack)
    }

    fn close(&mut self) -> Reply {
        self.controller.close();
        if self.state != ChannelState::Closed {
            #[cfg(feature = "defmt")]
            defmt::info!("Channel closed");
            self.state = ChannelState::Closed;
        }
        Reply::Ack
    }

    fn transmit(&mut self, line: &[u8], extended: bool, rtr: bool) -> Result<Reply, CommandError> {
        if self.state != ChannelState::Open {
            return Err(CommandError::IllegalState);
        }
        let frame = frame_codec::decode(line, extended, rtr)?;
        self.controller.write(&frame)?;
        #[cfg(feature = "defmt")]
        defmt::trace!("TX {=u32:#x}", frame.raw_id());
        Ok(Reply::token(if extended { TX_OK_EXT } else { TX_OK_STD }))
    }

    /// Bus flags; all clear while the controller is closed.
    fn status(&self) -> Reply {
        let flags = if self.controller.is_open() {
            self.controller.status()
        } else {
            BusStatus::empty()
        };
        let mut line = ReplyLine::new();
        line.push(CMD_STATUS);
        push_hex_u8(&mut line, flags.bits());
        Reply::Text(line)
    }

    fn version(&self) -> Reply {
        let mut line = ReplyLine::new();
        line.push(CMD_VERSION);
        push_hex_u8(&mut line, self.config.version_major);
        push_hex_u8(&mut line, self.config.version_minor);
        Reply::Text(line)
    }

    fn serial(&self) -> Reply {
        let mut line = ReplyLine::new();
        line.push(CMD_SERIAL);
        line.extend_from_slice(&self.config.serial_number);
        Reply::Text(line)
    }

    /// Store the new filter half and push it live unless the channel is closed.
    fn filter_changed(&mut self) -> Reply {
        self.filter_configured = true;
        if self.state != ChannelState::Closed {
            self.controller.set_filter(self.filter);
        }
        Reply::Ack
    }

    /// `P`: hand one buffered frame to the host through the reply path.
    fn poll_one(&mut self) -> Result<Reply, CommandError> {
        if self.state == ChannelState::Closed || self.auto_forward {
            return Err(CommandError::IllegalState);
        }
        self.drain();
        let Some(frame) = self.rx_ring.peek().copied() else {
            return Ok(Reply::Ack);
        };
        let line = frame_codec::encode(&frame, self.timestamps)?;
        self.rx_ring.pop();
        Ok(Reply::Text(ReplyLine::from_slice(line.as_slice())))
    }

    //==============================================================================POLL

    /// One engine cycle: service the transmit queue, then move received
    /// frames towards the host when the channel is up and auto-forward is on.
    pub fn poll(&mut self, sink: &mut dyn FrameSink) {
        self.controller.service_queue();
        if self.state == ChannelState::Closed || !self.auto_forward {
            return;
        }
        self.drain();
        self.forward(sink);
    }

    /// Controller → ring. Stamps each frame; on a full ring the new frame is
    /// dropped, counted, and draining stops.
    fn drain(&mut self) {
        for _ in 0..self.config.drain_budget {
            if !self.controller.available() {
                break;
            }
            // `None` with frames still pending means the filter rejected one.
            let Some(frame) = self.controller.read() else {
                continue;
            };
            let stamped = frame.with_timestamp(self.timestamp_now());
            if self.rx_ring.push(stamped).is_err() {
                self.counters.rx_overflows = self.counters.rx_overflows.wrapping_add(1);
                #[cfg(feature = "defmt")]
                defmt::warn!("RX ring full, frame {=u32:#x} dropped", frame.raw_id());
                break;
            }
        }
    }

    /// Ring → host, oldest first. A frame leaves the ring only once the sink
    /// accepted its line; a refusal ends the cycle.
    fn forward(&mut self, sink: &mut dyn FrameSink) {
        for _ in 0..self.config.frames_per_poll {
            let Some(frame) = self.rx_ring.peek().copied() else {
                break;
            };
            let Ok(encoded) = frame_codec::encode(&frame, self.timestamps) else {
                self.rx_ring.pop();
                continue;
            };
            let mut wire = ReplyLine::from_slice(encoded.as_slice());
            wire.push(CR);
            if sink
                .write_with_priority(wire.as_slice(), WritePriority::Droppable)
                .is_err()
            {
                self.counters.forward_stalls = self.counters.forward_stalls.wrapping_add(1);
                break;
            }
            self.rx_ring.pop();
        }
    }

    fn timestamp_now(&self) -> u16 {
        (self.clock.now().as_millis() % 0x1_0000) as u16
    }

    //==============================================================================ACCESSORS

    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Preset the next `O` / `L` will use.
    pub fn bitrate(&self) -> Bitrate {
        self.bitrate
    }

    pub fn timestamps_enabled(&self) -> bool {
        self.timestamps
    }

    pub fn auto_forward(&self) -> bool {
        self.auto_forward
    }

    /// Filter as configured by `M` / `m`, `None` until either was received.
    pub fn filter(&self) -> Option<AcceptanceFilter> {
        self.filter_configured.then_some(self.filter)
    }

    /// Frames waiting in the inbound ring.
    pub fn buffered(&self) -> usize {
        self.rx_ring.len()
    }

    pub fn counters(&self) -> SlcanCounters {
        self.counters
    }

    pub fn reset_counters(&mut self) {
        self.counters = SlcanCounters::default();
    }

    pub fn config(&self) -> &SlcanConfig {
        &self.config
    }

    pub fn controller(&self) -> &C {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut C {
        &mut self.controller
    }
}

impl<C: CanController, K: Clock, const RX: usize> ProtocolHandler for SlcanEngine<C, K, RX> {
    fn name(&self) -> &'static str {
        HANDLER_NAME
    }

    fn can_handle(&self, line: &[u8]) -> bool {
        line.first().is_some_and(|c| HANDLED_COMMANDS.contains(c))
    }

    fn process_command(&mut self, line: &[u8]) -> Reply {
        self.process(line)
    }

    fn poll(&mut self, sink: &mut dyn FrameSink) {
        SlcanEngine::poll(self, sink)
    }

    fn is_active(&self) -> bool {
        self.state != ChannelState::Closed
    }
}

//==================================================================================PARSING

/// `X0` / `X1` style switch.
fn parse_toggle(line: &[u8]) -> Result<bool, CommandError> {
    match line {
        [_, b'0'] => Ok(false),
        [_, b'1'] => Ok(true),
        _ => Err(CommandError::Malformed),
    }
}

/// Eight hex digits after the command character, nothing more.
fn parse_filter(line: &[u8]) -> Result<u32, CommandError> {
    if line.len() != FILTER_LEN {
        return Err(CommandError::Malformed);
    }
    let mut reader = HexReader::at(line, 1);
    let value = reader.read_u32(FILTER_DIGITS)?;
    reader.expect_end()?;
    Ok(value)
}

fn push_hex_u8(line: &mut ReplyLine, value: u8) {
    line.push(ascii_from_nibble(value >> 4));
    line.push(ascii_from_nibble(value));
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
