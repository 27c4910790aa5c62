//! CAN controller layer: bitrate presets, bus modes and health flags, the
//! software acceptance filter, and the [`CanController`] contract the protocol
//! engine drives. [`QueuedController`] is the concrete controller, built on top
//! of any [`CanPeripheral`].
pub mod peripheral;
pub mod queued;

pub use peripheral::CanPeripheral;
pub use queued::{ControllerCounters, QueuedController};

use crate::{error::ControllerError, protocol::transport::can_frame::CanFrame};

//==================================================================================BITRATE
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Bitrate presets selected by `S0` to `S8`.
pub enum Bitrate {
    _10kbit,
    _20kbit,
    _50kbit,
    _100kbit,
    _125kbit,
    _250kbit,
    _500kbit,
    _800kbit,
    _1mbit,
}

impl Bitrate {
    /// Preset for the digit following `S`.
    pub fn from_preset(preset: u8) -> Option<Self> {
        Some(match preset {
            0 => Bitrate::_10kbit,
            1 => Bitrate::_20kbit,
            2 => Bitrate::_50kbit,
            3 => Bitrate::_100kbit,
            4 => Bitrate::_125kbit,
            5 => Bitrate::_250kbit,
            6 => Bitrate::_500kbit,
            7 => Bitrate::_800kbit,
            8 => Bitrate::_1mbit,
            _ => return None,
        })
    }

    pub fn preset(&self) -> u8 {
        match self {
            Bitrate::_10kbit => 0,
            Bitrate::_20kbit => 1,
            Bitrate::_50kbit => 2,
            Bitrate::_100kbit => 3,
            Bitrate::_125kbit => 4,
            Bitrate::_250kbit => 5,
            Bitrate::_500kbit => 6,
            Bitrate::_800kbit => 7,
            Bitrate::_1mbit => 8,
        }
    }

    pub fn kbps(&self) -> u16 {
        match self {
            Bitrate::_10kbit => 10,
            Bitrate::_20kbit => 20,
            Bitrate::_50kbit => 50,
            Bitrate::_100kbit => 100,
            Bitrate::_125kbit => 125,
            Bitrate::_250kbit => 250,
            Bitrate::_500kbit => 500,
            Bitrate::_800kbit => 800,
            Bitrate::_1mbit => 1_000,
        }
    }
}

//==================================================================================MODE
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Operating mode of an open controller.
pub enum CanMode {
    /// Transmits and acknowledges frames.
    Normal,
    /// Receives only. Writes are refused in software; whether the hardware
    /// still drives ACK bits depends on the peripheral underneath.
    ListenOnly,
}

//==================================================================================STATUS
bitflags::bitflags! {
    /// Bus health flags reported by `F`. Bit 4 is unused.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct BusStatus: u8 {
        const RX_FIFO_FULL = 1 << 0;
        const TX_FIFO_FULL = 1 << 1;
        const ERROR_WARNING = 1 << 2;
        const DATA_OVERRUN = 1 << 3;
        const ERROR_PASSIVE = 1 << 5;
        const ARBITRATION_LOST = 1 << 6;
        const BUS_ERROR = 1 << 7;
    }
}

//==================================================================================FILTER
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Software acceptance filter: an identifier passes iff
/// `(id & mask) == (value & mask)`. A zero mask accepts everything.
pub struct AcceptanceFilter {
    pub mask: u32,
    pub value: u32,
}

impl AcceptanceFilter {
    pub const fn new(mask: u32, value: u32) -> Self {
        Self { mask, value }
    }

    #[inline]
    pub fn accepts(&self, raw_id: u32) -> bool {
        (raw_id & self.mask) == (self.value & self.mask)
    }
}

//==================================================================================CONTROLLER
/// Operations the protocol engine needs from a CAN controller.
///
/// State machine: Closed ⇄ Open(Normal), Closed ⇄ Open(ListenOnly). Switching
/// mode goes through a close. Every operation returns immediately.
pub trait CanController {
    /// Whether the hardware can run `bitrate`. Pure query.
    fn is_bitrate_supported(&self, bitrate: Bitrate) -> bool;

    /// Open the bus, closing any previous session first. The software
    /// transmit queue is cleared either way.
    fn open(&mut self, bitrate: Bitrate, mode: CanMode) -> Result<(), ControllerError>;

    /// Close the bus and clear the software transmit queue. Idempotent.
    fn close(&mut self);

    /// Mode of the current session, `None` when closed.
    fn mode(&self) -> Option<CanMode>;

    fn is_open(&self) -> bool {
        self.mode().is_some()
    }

    /// Send `frame` now or accept it into the software transmit queue.
    fn write(&mut self, frame: &CanFrame) -> Result<(), ControllerError>;

    /// Push queued frames into the hardware until it reports busy.
    /// Must run once per poll cycle.
    fn service_queue(&mut self);

    /// A received frame is pending in the hardware.
    fn available(&self) -> bool;

    /// Next received frame. `None` either when nothing is pending or when the
    /// frame was rejected by the acceptance filter; check
    /// [`available`](Self::available) before concluding the stream is empty.
    fn read(&mut self) -> Option<CanFrame>;

    /// Best-effort bus health; all clear when the hardware exposes nothing.
    fn status(&self) -> BusStatus;

    fn set_filter(&mut self, filter: AcceptanceFilter);

    fn clear_filter(&mut self);
}
