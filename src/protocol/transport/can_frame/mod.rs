//! In-memory representation of a classic CAN 2.0 frame as it travels between
//! the controller, the inbound ring and the ASCII codec.
use embedded_can::{ExtendedId, Frame, Id, StandardId};

/// Largest data length code of a classic CAN frame.
pub const MAX_DLC: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Classic CAN frame: 11/29-bit identifier, DLC 0-8, data, RTR flag and an
/// optional millisecond timestamp.
///
/// Fields are private so the invariants hold for every value: `dlc <= 8`,
/// the identifier fits its format, and data bytes beyond `dlc` (all of them
/// for a remote frame) are zero.
pub struct CanFrame {
    id: Id,
    dlc: u8,
    data: [u8; MAX_DLC],
    rtr: bool,
    timestamp: Option<u16>,
}

impl CanFrame {
    /// Data frame from a raw identifier and its format flag.
    pub fn from_raw(raw_id: u32, extended: bool, data: &[u8]) -> Option<Self> {
        Self::new(id_from_raw(raw_id, extended)?, data)
    }

    /// Remote frame from a raw identifier and its format flag.
    pub fn remote_from_raw(raw_id: u32, extended: bool, dlc: usize) -> Option<Self> {
        Self::new_remote(id_from_raw(raw_id, extended)?, dlc)
    }

    /// Numeric identifier without the format flag.
    pub fn raw_id(&self) -> u32 {
        raw_id(&self.id)
    }

    /// Millisecond timestamp attached when the frame was received.
    pub fn timestamp(&self) -> Option<u16> {
        self.timestamp
    }

    /// Same frame carrying `timestamp`.
    pub fn with_timestamp(mut self, timestamp: u16) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Same frame without a timestamp.
    pub fn without_timestamp(mut self) -> Self {
        self.timestamp = None;
        self
    }

    /// All eight payload bytes, zero past the DLC.
    pub fn raw_data(&self) -> &[u8; MAX_DLC] {
        &self.data
    }
}

impl Frame for CanFrame {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        if data.len() > MAX_DLC {
            return None;
        }
        let mut payload = [0u8; MAX_DLC];
        payload[..data.len()].copy_from_slice(data);
        Some(Self {
            id: id.into(),
            dlc: data.len() as u8,
            data: payload,
            rtr: false,
            timestamp: None,
        })
    }

    fn new_remote(id: impl Into<Id>, dlc: usize) -> Option<Self> {
        if dlc > MAX_DLC {
            return None;
        }
        Some(Self {
            id: id.into(),
            dlc: dlc as u8,
            data: [0; MAX_DLC],
            rtr: true,
            timestamp: None,
        })
    }

    fn is_extended(&self) -> bool {
        matches!(self.id, Id::Extended(_))
    }

    fn is_remote_frame(&self) -> bool {
        self.rtr
    }

    fn id(&self) -> Id {
        self.id
    }

    fn dlc(&self) -> usize {
        self.dlc as usize
    }

    /// Payload bytes; empty for a remote frame.
    fn data(&self) -> &[u8] {
        if self.rtr {
            &[]
        } else {
            &self.data[..self.dlc as usize]
        }
    }
}

//==================================================================================ID_HELPERS

/// Build an identifier from its raw value, enforcing 0x7FF / 0x1FFFFFFF.
pub fn id_from_raw(raw: u32, extended: bool) -> Option<Id> {
    if extended {
        ExtendedId::new(raw).map(Id::Extended)
    } else {
        u16::try_from(raw)
            .ok()
            .and_then(StandardId::new)
            .map(Id::Standard)
    }
}

/// Numeric value of an identifier.
pub fn raw_id(id: &Id) -> u32 {
    match id {
        Id::Standard(id) => u32::from(id.as_raw()),
        Id::Extended(id) => id.as_raw(),
    }
}
