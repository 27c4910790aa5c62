//! Command characters and reply tokens of the SLCAN line protocol.

//==================================================================================CONFIGURATION
/// `Sn`: select bitrate preset n (0-8).
pub const CMD_SETUP: u8 = b'S';
/// `sxxyy`: custom bit timing registers. Recognised, never supported.
pub const CMD_SETUP_BTR: u8 = b's';
pub const CMD_OPEN: u8 = b'O';
pub const CMD_LISTEN: u8 = b'L';
pub const CMD_CLOSE: u8 = b'C';

//==================================================================================TRANSMIT
pub use crate::infra::codec::frame_codec::{
    CMD_TX_EXT, CMD_TX_RTR_EXT, CMD_TX_RTR_STD, CMD_TX_STD,
};

//==================================================================================INFORMATION
pub const CMD_STATUS: u8 = b'F';
pub const CMD_VERSION: u8 = b'V';
pub const CMD_SERIAL: u8 = b'N';

//==================================================================================FEATURES
/// `Z0` / `Z1`: timestamp suffix off / on.
pub const CMD_TIMESTAMP: u8 = b'Z';
/// `Mxxxxxxxx`: acceptance filter mask.
pub const CMD_FILTER_MASK: u8 = b'M';
/// `mxxxxxxxx`: acceptance filter value.
pub const CMD_FILTER_CODE: u8 = b'm';
/// `X0` / `X1`: automatic forwarding of received frames off / on.
pub const CMD_AUTO_FORWARD: u8 = b'X';
/// `P`: return one buffered frame (automatic forwarding off).
pub const CMD_POLL: u8 = b'P';

/// Every command character the engine claims.
pub const HANDLED_COMMANDS: &[u8] = &[
    CMD_SETUP,
    CMD_SETUP_BTR,
    CMD_OPEN,
    CMD_LISTEN,
    CMD_CLOSE,
    CMD_TX_STD,
    CMD_TX_EXT,
    CMD_TX_RTR_STD,
    CMD_TX_RTR_EXT,
    CMD_STATUS,
    CMD_VERSION,
    CMD_SERIAL,
    CMD_TIMESTAMP,
    CMD_FILTER_MASK,
    CMD_FILTER_CODE,
    CMD_AUTO_FORWARD,
    CMD_POLL,
];

//==================================================================================REPLIES
/// Standard (data or remote) frame accepted for transmission.
pub const TX_OK_STD: u8 = b'z';
/// Extended (data or remote) frame accepted for transmission.
pub const TX_OK_EXT: u8 = b'Z';

/// Characters of a `Sn`, `Zn` or `Xn` command.
pub const TOGGLE_LEN: usize = 2;
/// Characters of a `M` / `m` command.
pub const FILTER_LEN: usize = 9;
/// Hex digits of a filter field.
pub const FILTER_DIGITS: u8 = 8;
