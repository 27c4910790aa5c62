//! Hardware collaborator underneath [`QueuedController`](super::QueuedController).
//!
//! Frame I/O is the non-blocking `embedded_can::nb::Can` contract:
//! `WouldBlock` from `transmit` means the hardware FIFO is full, from
//! `receive` that nothing is pending. This trait adds the lifecycle and the
//! diagnostics the adapter needs on top of it.
use embedded_can::nb::Can;

use super::{Bitrate, BusStatus, CanMode};
use crate::protocol::transport::can_frame::CanFrame;

pub trait CanPeripheral: Can<Frame = CanFrame> {
    /// Bitrates the bit-timing tables cover. Defaults to 125k, 250k, 500k and 1M.
    fn supports(&self, bitrate: Bitrate) -> bool {
        matches!(
            bitrate,
            Bitrate::_125kbit | Bitrate::_250kbit | Bitrate::_500kbit | Bitrate::_1mbit
        )
    }

    /// Configure bit timing and mode, then join the bus.
    fn start(&mut self, bitrate: Bitrate, mode: CanMode) -> Result<(), Self::Error>;

    /// Leave the bus. Must be safe to call when already stopped.
    fn stop(&mut self);

    /// A received frame is waiting in the hardware.
    fn rx_pending(&self) -> bool;

    fn status(&self) -> BusStatus {
        BusStatus::empty()
    }
}
