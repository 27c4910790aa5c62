//! Priority-aware outbound line sink handed to protocol handlers while they poll.
use crate::error::LinkError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Backpressure class of an outbound write.
pub enum WritePriority {
    /// Command replies: wait a bounded time for space, then drop.
    Critical,
    /// Forwarded frames: never wait, drop at once when space is short.
    Droppable,
}

/// Destination of complete, terminated lines. Writes are all-or-nothing.
pub trait FrameSink {
    fn write_with_priority(
        &mut self,
        bytes: &[u8],
        priority: WritePriority,
    ) -> Result<(), LinkError>;
}
