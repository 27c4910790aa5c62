//! Collaborator seams of the transport layer: host byte stream, clock, and
//! the outbound line sink.
pub mod byte_stream;
pub mod clock;
pub mod frame_sink;
