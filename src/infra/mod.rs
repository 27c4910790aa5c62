//! Infrastructure shared by the protocol layers: fixed-capacity ring buffers
//! and the ASCII hexadecimal codec.
pub mod codec;
pub mod ring;
