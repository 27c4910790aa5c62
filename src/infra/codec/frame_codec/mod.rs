//! SLCAN frame codec: stateless conversion between [`CanFrame`] values and
//! their fixed-width ASCII form.
//!
//! ```text
//! tiiildd..[ssss]        standard data frame   (r: remote, no data)
//! Tiiiiiiiildd..[ssss]   extended data frame   (R: remote, no data)
//!   iii / iiiiiiii  identifier, 3 or 8 hex digits
//!   l               DLC, 1 hex digit (0-8)
//!   dd..            DLC * 2 hex digits of data
//!   ssss            optional millisecond timestamp (outbound data frames only)
//! ```
use embedded_can::Frame;

use crate::core::AsciiLine;
use crate::error::{FrameDecodeError, HexWriterError};
use crate::infra::codec::hex::{HexReader, HexWriter};
use crate::protocol::transport::can_frame::{id_from_raw, CanFrame, MAX_DLC};

pub const CMD_TX_STD: u8 = b't';
pub const CMD_TX_EXT: u8 = b'T';
pub const CMD_TX_RTR_STD: u8 = b'r';
pub const CMD_TX_RTR_EXT: u8 = b'R';

/// Hex digits of a standard identifier.
pub const STD_ID_LEN: u8 = 3;
/// Hex digits of an extended identifier.
pub const EXT_ID_LEN: u8 = 8;
/// Hex digits of the timestamp suffix.
pub const TIMESTAMP_LEN: u8 = 4;

/// Longest encoded frame: `T` + 8 + 1 + 16 + 4.
pub const MAX_FRAME_LINE: usize = 1 + EXT_ID_LEN as usize + 1 + 2 * MAX_DLC + TIMESTAMP_LEN as usize;

/// Encoded frame, terminator excluded.
pub type FrameLine = AsciiLine<MAX_FRAME_LINE>;

/// Command character for a frame of the given kind.
#[inline]
pub const fn command_char(extended: bool, rtr: bool) -> u8 {
    match (extended, rtr) {
        (false, false) => CMD_TX_STD,
        (true, false) => CMD_TX_EXT,
        (false, true) => CMD_TX_RTR_STD,
        (true, true) => CMD_TX_RTR_EXT,
    }
}

//==================================================================================Decode
/// Decode a complete transmit line (command character included).
///
/// Every field width is exact: a short line, a non-hex character, an
/// out-of-range identifier or DLC, or a data field whose length differs from
/// `dlc * 2` is rejected. Remote lines carry no data field at all.
pub fn decode(line: &[u8], extended: bool, rtr: bool) -> Result<CanFrame, FrameDecodeError> {
    let expected = command_char(extended, rtr);
    match line.first() {
        Some(&found) if found == expected => {}
        Some(&found) => return Err(FrameDecodeError::WrongCommand { found }),
        None => return Err(FrameDecodeError::WrongCommand { found: 0 }),
    }

    let mut reader = HexReader::at(line, 1);
    let id_len = if extended { EXT_ID_LEN } else { STD_ID_LEN };
    let raw_id = reader.read_u32(id_len)?;
    let id = id_from_raw(raw_id, extended).ok_or(FrameDecodeError::IdOutOfRange {
        id: raw_id,
        extended,
    })?;

    let dlc = reader.read_nibble()?;
    if dlc as usize > MAX_DLC {
        return Err(FrameDecodeError::DlcOutOfRange { dlc });
    }

    if rtr {
        reader.expect_end()?;
        return CanFrame::new_remote(id, dlc as usize).ok_or(FrameDecodeError::DlcOutOfRange { dlc });
    }

    let expected_len = dlc as usize * 2;
    if reader.remaining() != expected_len {
        return Err(FrameDecodeError::DataLengthMismatch {
            expected: expected_len,
            found: reader.remaining(),
        });
    }
    let mut data = [0u8; MAX_DLC];
    reader.read_bytes(&mut data[..dlc as usize])?;

    CanFrame::new(id, &data[..dlc as usize]).ok_or(FrameDecodeError::DlcOutOfRange { dlc })
}

//==================================================================================Encode
/// Encode a frame for the host.
///
/// With `timestamps` set, data frames get the four-digit suffix taken from
/// the frame's timestamp (zero when absent); remote frames never do.
pub fn encode(frame: &CanFrame, timestamps: bool) -> Result<FrameLine, HexWriterError> {
    let mut line = FrameLine::new();
    let written = {
        let mut writer = HexWriter::new(line.spare_mut());
        let extended = frame.is_extended();
        let rtr = frame.is_remote_frame();

        writer.write_raw(command_char(extended, rtr))?;
        let id_len = if extended { EXT_ID_LEN } else { STD_ID_LEN };
        writer.write_u32(frame.raw_id(), id_len)?;
        writer.write_u32(frame.dlc() as u32, 1)?;

        if !rtr {
            writer.write_bytes(frame.data())?;
            if timestamps {
                writer.write_u32(u32::from(frame.timestamp().unwrap_or(0)), TIMESTAMP_LEN)?;
            }
        }
        writer.len()
    };
    line.commit(written);
    Ok(line)
}
