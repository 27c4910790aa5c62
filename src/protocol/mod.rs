//! Host-facing protocol stack: the transport layer (frames, host link,
//! collaborator traits), the SLCAN engine, and the dispatcher routing command
//! lines between protocol handlers.
pub mod dispatcher;
pub mod slcan;
pub mod transport;
