//! Adapter configuration: compile-time capacities used as const-generic
//! defaults, and the runtime settings of the protocol engine and host link.
use embassy_time::Duration;

use crate::backend::Bitrate;

//==================================================================================CAPACITIES

/// Longest command line accepted from the host (terminator excluded).
pub const CMD_LINE_CAPACITY: usize = 64;
/// Completed command lines waiting for dispatch.
pub const CMD_QUEUE_DEPTH: usize = 8;
/// Received CAN frames buffered between the controller and the host link.
pub const RX_RING_CAPACITY: usize = 64;
/// Frames waiting for room in the hardware transmit FIFO.
pub const TX_QUEUE_CAPACITY: usize = 16;
/// Protocol handlers the dispatcher can hold.
pub const MAX_PROTOCOL_HANDLERS: usize = 4;

//==================================================================================DEFAULTS

pub const FIRMWARE_VERSION_MAJOR: u8 = 1;
pub const FIRMWARE_VERSION_MINOR: u8 = 0;
/// Serial number token answered to `N`.
pub const SERIAL_NUMBER: [u8; 4] = *b"SCAN";
/// Frames forwarded to the host per poll, so command processing is not starved.
pub const MAX_FRAMES_PER_POLL: usize = 8;
/// Commands dispatched per adapter cycle.
pub const MAX_COMMANDS_PER_CYCLE: usize = 8;
/// Upper bound on a critical (command reply) write waiting for link space.
pub const CRITICAL_WRITE_TIMEOUT_MS: u64 = 10;

//==================================================================================SLCAN_CONFIG

/// Runtime settings of the SLCAN engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlcanConfig {
    /// Firmware major version reported by `V`.
    pub version_major: u8,
    /// Firmware minor version reported by `V`.
    pub version_minor: u8,
    /// Four alphanumeric ASCII bytes reported by `N`.
    pub serial_number: [u8; 4],
    /// Bitrate used by `O`/`L` when no `S` command was received.
    pub default_bitrate: Bitrate,
    /// Frames forwarded to the host per poll.
    pub frames_per_poll: usize,
    /// Controller reads attempted per poll. Bounds the drain loop when the
    /// software filter keeps rejecting frames.
    pub drain_budget: usize,
    /// Forward received frames without waiting for `P`.
    pub auto_forward: bool,
}

impl Default for SlcanConfig {
    fn default() -> Self {
        Self {
            version_major: FIRMWARE_VERSION_MAJOR,
            version_minor: FIRMWARE_VERSION_MINOR,
            serial_number: SERIAL_NUMBER,
            default_bitrate: Bitrate::_500kbit,
            frames_per_poll: MAX_FRAMES_PER_POLL,
            drain_budget: RX_RING_CAPACITY,
            auto_forward: true,
        }
    }
}

impl SlcanConfig {
    pub fn with_version(mut self, major: u8, minor: u8) -> Self {
        self.version_major = major;
        self.version_minor = minor;
        self
    }

    /// Set the serial number token. Returns `None` unless every byte is
    /// alphanumeric ASCII, since the token travels inside a reply line.
    pub fn with_serial_number(mut self, serial: [u8; 4]) -> Option<Self> {
        if !serial.iter().all(|b| b.is_ascii_alphanumeric()) {
            return None;
        }
        self.serial_number = serial;
        Some(self)
    }

    pub fn with_default_bitrate(mut self, bitrate: Bitrate) -> Self {
        self.default_bitrate = bitrate;
        self
    }

    /// Frames forwarded per poll; clamped to at least one.
    pub fn with_frames_per_poll(mut self, frames: usize) -> Self {
        self.frames_per_poll = frames.max(1);
        self
    }

    /// Controller reads per poll; clamped to at least one.
    pub fn with_drain_budget(mut self, reads: usize) -> Self {
        self.drain_budget = reads.max(1);
        self
    }

    pub fn with_auto_forward(mut self, enabled: bool) -> Self {
        self.auto_forward = enabled;
        self
    }
}

//==================================================================================LINK_CONFIG

/// Runtime settings of the host link.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LinkConfig {
    /// How long a critical write may wait for space before being dropped.
    pub critical_write_timeout: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            critical_write_timeout: Duration::from_millis(CRITICAL_WRITE_TIMEOUT_MS),
        }
    }
}

impl LinkConfig {
    pub fn with_critical_write_timeout(mut self, timeout: Duration) -> Self {
        self.critical_write_timeout = timeout;
        self
    }
}
