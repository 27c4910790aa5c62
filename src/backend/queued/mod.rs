//! [`CanController`] over a [`CanPeripheral`] with a bounded software transmit
//! queue. Frames the hardware FIFO cannot take immediately wait in the queue
//! and are pushed out by [`CanController::service_queue`], in order.
use super::{AcceptanceFilter, Bitrate, BusStatus, CanController, CanMode, CanPeripheral};
use crate::{
    config::TX_QUEUE_CAPACITY, error::ControllerError, infra::ring::BoundedRing,
    protocol::transport::can_frame::CanFrame,
};

/// Drop and fault counters. Only [`QueuedController::reset_counters`] clears them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControllerCounters {
    /// Frames refused because the software transmit queue was full.
    pub tx_rejected: u32,
    /// Hardware transmit faults on queued frames (the frame stays queued).
    pub tx_faults: u32,
    /// Received frames discarded by the acceptance filter.
    pub rx_filtered: u32,
    /// Hardware receive faults.
    pub rx_faults: u32,
}

pub struct QueuedController<P: CanPeripheral, const TXQ: usize = TX_QUEUE_CAPACITY> {
    peripheral: P,
    /// Current session; `None` while closed.
    session: Option<(Bitrate, CanMode)>,
    tx_queue: BoundedRing<CanFrame, TXQ>,
    filter: Option<AcceptanceFilter>,
    counters: ControllerCounters,
}

impl<P: CanPeripheral, const TXQ: usize> QueuedController<P, TXQ> {
    pub fn new(peripheral: P) -> Self {
        Self {
            peripheral,
            session: None,
            tx_queue: BoundedRing::new(),
            filter: None,
            counters: ControllerCounters::default(),
        }
    }

    /// Bitrate of the current session.
    pub fn bitrate(&self) -> Option<Bitrate> {
        self.session.map(|(bitrate, _)| bitrate)
    }

    /// Frames waiting in the software transmit queue.
    pub fn queued(&self) -> usize {
        self.tx_queue.len()
    }

    pub fn filter(&self) -> Option<AcceptanceFilter> {
        self.filter
    }

    pub fn counters(&self) -> ControllerCounters {
        self.counters
    }

    pub fn reset_counters(&mut self) {
        self.counters = ControllerCounters::default();
    }

    pub fn peripheral(&self) -> &P {
        &self.peripheral
    }

    pub fn peripheral_mut(&mut self) -> &mut P {
        &mut self.peripheral
    }

    /// Queue a frame, counting the rejection when the queue is full.
    fn enqueue(&mut self, frame: CanFrame) -> Result<(), ControllerError> {
        self.tx_queue.push(frame).map_err(|_| {
            self.counters.tx_rejected = self.counters.tx_rejected.wrapping_add(1);
            #[cfg(feature = "defmt")]
            defmt::warn!("TX queue full, frame {=u32:#x} rejected", frame.raw_id());
            ControllerError::TxQueueFull
        })
    }

    /// Keep a lower-priority frame the hardware pushed out of its mailbox.
    fn requeue_displaced(&mut self, displaced: Option<CanFrame>) {
        if let Some(frame) = displaced {
            // Loss here is already counted by enqueue.
            let _ = self.enqueue(frame);
        }
    }
}

impl<P: CanPeripheral, const TXQ: usize> CanController for QueuedController<P, TXQ> {
    fn is_bitrate_supported(&self, bitrate: Bitrate) -> bool {
        self.peripheral.supports(bitrate)
    }

    fn open(&mut self, bitrate: Bitrate, mode: CanMode) -> Result<(), ControllerError> {
        if !self.peripheral.supports(bitrate) {
            return Err(ControllerError::UnsupportedBitrate {
                preset: bitrate.preset(),
            });
        }
        self.close();

        self.peripheral.start(bitrate, mode).map_err(|_e| {
            #[cfg(feature = "defmt")]
            defmt::warn!("CAN peripheral refused to start");
            ControllerError::Peripheral
        })?;
        self.session = Some((bitrate, mode));

        #[cfg(feature = "defmt")]
        defmt::info!("CAN open at {=u16} kbit/s ({})", bitrate.kbps(), mode);
        Ok(())
    }

    fn close(&mut self) {
        if self.session.take().is_some() {
            self.peripheral.stop();
            #[cfg(feature = "defmt")]
            defmt::info!("CAN closed");
        }
        // Stale frames must not reach the bus after a reopen.
        self.tx_queue.clear();
    }

    fn mode(&self) -> Option<CanMode> {
        self.session.map(|(_, mode)| mode)
    }

    fn write(&mut self, frame: &CanFrame) -> Result<(), ControllerError> {
        match self.mode() {
            None => return Err(ControllerError::NotOpen),
            Some(CanMode::ListenOnly) => return Err(ControllerError::ListenOnly),
            Some(CanMode::Normal) => {}
        }

        if !self.tx_queue.is_empty() {
            return self.enqueue(*frame);
        }

        match self.peripheral.transmit(frame) {
            Ok(displaced) => {
                self.requeue_displaced(displaced);
                Ok(())
            }
            Err(nb::Error::WouldBlock) => self.enqueue(*frame),
            Err(nb::Error::Other(_e)) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("CAN transmit fault on {=u32:#x}", frame.raw_id());
                Err(ControllerError::Peripheral)
            }
        }
    }

    fn service_queue(&mut self) {
        if self.mode() != Some(CanMode::Normal) {
            return;
        }
        // Displaced frames go back to the tail, so bound the attempts.
        for _ in 0..TXQ {
            let Some(frame) = self.tx_queue.peek().copied() else {
                break;
            };
            match self.peripheral.transmit(&frame) {
                Ok(displaced) => {
                    self.tx_queue.pop();
                    self.requeue_displaced(displaced);
                }
                Err(nb::Error::WouldBlock) => break,
                Err(nb::Error::Other(_e)) => {
                    // Left at the head; retried next cycle.
                    self.counters.tx_faults = self.counters.tx_faults.wrapping_add(1);
                    break;
                }
            }
        }
    }

    fn available(&self) -> bool {
        self.session.is_some() && self.peripheral.rx_pending()
    }

    fn read(&mut self) -> Option<CanFrame> {
        self.session?;
        match self.peripheral.receive() {
            Ok(frame) => {
                if let Some(filter) = self.filter {
                    if !filter.accepts(frame.raw_id()) {
                        self.counters.rx_filtered = self.counters.rx_filtered.wrapping_add(1);
                        return None;
                    }
                }
                #[cfg(feature = "defmt")]
                defmt::trace!("RX {=u32:#x}", frame.raw_id());
                Some(frame)
            }
            Err(nb::Error::WouldBlock) => None,
            Err(nb::Error::Other(_e)) => {
                self.counters.rx_faults = self.counters.rx_faults.wrapping_add(1);
                None
            }
        }
    }

    fn status(&self) -> BusStatus {
        self.peripheral.status()
    }

    fn set_filter(&mut self, filter: AcceptanceFilter) {
        self.filter = Some(filter);
    }

    fn clear_filter(&mut self) {
        self.filter = None;
    }
}
