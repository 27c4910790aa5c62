//! Transport layer: the CAN frame value, the line-oriented host link, and the
//! collaborator traits (byte stream, clock, outbound sink) the rest of the
//! crate is written against.
pub mod can_frame;
pub mod host_link;
pub mod traits;
