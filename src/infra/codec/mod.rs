//! ASCII codec: fixed-width hexadecimal cursors and the SLCAN frame codec
//! built on top of them.
pub mod frame_codec;
pub mod hex;
