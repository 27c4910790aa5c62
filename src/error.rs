//! Error definitions shared across library modules.
//! Each type models a specific failure scenario (hex field parsing, frame
//! decoding, controller operations, host link writes, handler registry).
//! None of them is fatal: the protocol engine folds every command error into
//! the error sentinel and keeps serving the next line.
use thiserror_no_std::Error;

//==================================================================================HEX_READER_ERRORS
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
/// Errors raised while reading fixed-width hexadecimal fields.
pub enum HexReaderError {
    /// Attempted to read past the end of the line.
    #[error("Attempted to read out of bounds -> asked: {asked}, available: {available}")]
    OutOfBounds { asked: usize, available: usize },
    /// A character in the field is not a hexadecimal digit.
    #[error("Invalid hex digit at position {cursor}")]
    InvalidDigit { cursor: usize },
    /// Requested more digits than the target type can hold.
    #[error("Cannot read more than {max} digits. Requested: {asked}")]
    TooLongForType { max: u8, asked: u8 },
    /// Characters remain after the last expected field.
    #[error("Unexpected trailing data: {remaining} characters")]
    TrailingData { remaining: usize },
}

//==================================================================================HEX_WRITER_ERRORS
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
/// Errors raised while formatting hexadecimal fields into a buffer.
pub enum HexWriterError {
    /// Attempted to write beyond the provided capacity.
    #[error("Attempted to write out of bounds -> asked: {asked}, available: {available}")]
    OutOfBounds { asked: usize, available: usize },
    /// Requested more digits than a `u32` provides.
    #[error("Cannot write more than {max} digits. Requested: {asked}")]
    TooLongForType { max: u8, asked: u8 },
}

//==================================================================================FRAME_ERRORS
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
/// Failures while decoding an ASCII transmit line into a CAN frame.
pub enum FrameDecodeError {
    /// The command character does not match the requested frame kind.
    #[error("Unexpected command character {found:#04x}")]
    WrongCommand { found: u8 },
    /// Identifier exceeds 0x7FF (standard) or 0x1FFFFFFF (extended).
    #[error("Identifier {id:#x} out of range (extended: {extended})")]
    IdOutOfRange { id: u32, extended: bool },
    /// Data length code above 8.
    #[error("DLC {dlc} out of range")]
    DlcOutOfRange { dlc: u8 },
    /// Data field length differs from `dlc * 2`.
    #[error("Data field length mismatch -> expected: {expected}, found: {found}")]
    DataLengthMismatch { expected: usize, found: usize },
    /// Field-level hex error.
    #[error(transparent)]
    Hex(#[from] HexReaderError),
}

//==================================================================================CONTROLLER_ERRORS
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
/// Errors reported by a [`CanController`](crate::backend::CanController).
pub enum ControllerError {
    /// The preset exists but the hardware cannot run it.
    #[error("Unsupported bitrate preset S{preset}")]
    UnsupportedBitrate { preset: u8 },
    /// Operation requires an open controller.
    #[error("Controller is closed")]
    NotOpen,
    /// Transmission refused: listen-only mode never drives the bus.
    #[error("Controller is in listen-only mode")]
    ListenOnly,
    /// Software transmit queue is full; the frame was rejected.
    #[error("Transmit queue full")]
    TxQueueFull,
    /// The peripheral refused to start or reported a hard fault.
    #[error("CAN peripheral fault")]
    Peripheral,
}

//==================================================================================COMMAND_ERRORS
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
/// Reasons a host command is answered with the error sentinel.
pub enum CommandError {
    /// No handler (or no branch of a handler) understands the command.
    #[error("Unknown command {command:#04x}")]
    Unknown { command: u8 },
    /// Wrong length or invalid parameter character.
    #[error("Malformed command")]
    Malformed,
    /// Command is not legal in the current channel state.
    #[error("Command not allowed in the current channel state")]
    IllegalState,
    /// Recognised but deliberately not implemented by this adapter.
    #[error("Command not supported")]
    Unsupported,
    /// Frame field decoding failed.
    #[error(transparent)]
    Frame(#[from] FrameDecodeError),
    /// Controller refused the operation.
    #[error(transparent)]
    Controller(#[from] ControllerError),
    /// Field-level hex error outside frame decoding (filter commands).
    #[error(transparent)]
    Hex(#[from] HexReaderError),
    /// A buffered frame could not be formatted into a reply line.
    #[error(transparent)]
    Encode(#[from] HexWriterError),
}

//==================================================================================LINK_ERRORS
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
/// Outcome of a refused write towards the host.
pub enum LinkError {
    /// Critical write still lacked space when the deadline expired.
    #[error("Critical write of {len} bytes timed out")]
    Timeout { len: usize },
    /// Droppable write found insufficient space and was shed immediately.
    #[error("No space for {len} bytes (available: {available})")]
    NoSpace { len: usize, available: usize },
}

//==================================================================================DISPATCH_ERRORS
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
/// Handler registry errors.
pub enum DispatchError {
    /// The bounded handler list is full.
    #[error("Handler registry full (capacity {capacity})")]
    RegistryFull { capacity: usize },
    /// A handler with the same name is already registered.
    #[error("Handler already registered")]
    AlreadyRegistered,
}

//==================================================================================RING_ERRORS
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
/// A ring buffer rejected the newest entry because it is at capacity.
#[error("Ring buffer full")]
pub struct RingFull;
