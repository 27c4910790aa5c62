//! Line-oriented link to the host.
//!
//! Inbound, bytes are accumulated into command lines terminated by CR (LF is
//! discarded) and completed lines wait in a bounded FIFO until dispatched.
//! Outbound, every write is all-or-nothing and carries a [`WritePriority`]:
//! command replies may wait a short, bounded time for room in the stream;
//! forwarded frames are shed immediately when room is short.
//!
//! Both inbound buffers shed the newest data on overflow. Lines already
//! queued are never evicted, and the accumulator always resets on CR so a
//! full queue never stalls ingestion.
use crate::{
    config::{LinkConfig, CMD_LINE_CAPACITY, CMD_QUEUE_DEPTH},
    core::{AsciiLine, CR, LF},
    error::LinkError,
    infra::ring::BoundedRing,
    protocol::transport::traits::{
        byte_stream::ByteStream,
        clock::Clock,
        frame_sink::{FrameSink, WritePriority},
    },
};

/// Command line as queued for dispatch (terminator excluded).
pub type CommandLine = AsciiLine<CMD_LINE_CAPACITY>;

/// Drop counters of the link. Only [`HostLink::reset_counters`] clears them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkCounters {
    /// Replies dropped after the critical deadline expired.
    pub critical_dropped: u32,
    /// Forwarded lines shed for lack of space.
    pub droppable_dropped: u32,
    /// Lines dropped on a full command queue, plus bytes truncated from
    /// over-long lines.
    pub command_overflows: u32,
}

pub struct HostLink<
    S: ByteStream,
    K: Clock,
    const LINE: usize = CMD_LINE_CAPACITY,
    const DEPTH: usize = CMD_QUEUE_DEPTH,
> {
    stream: S,
    clock: K,
    config: LinkConfig,
    /// Line under construction.
    accumulator: AsciiLine<LINE>,
    /// Completed lines, oldest first.
    commands: BoundedRing<AsciiLine<LINE>, DEPTH>,
    counters: LinkCounters,
}

impl<S: ByteStream, K: Clock, const LINE: usize, const DEPTH: usize> HostLink<S, K, LINE, DEPTH> {
    pub fn new(stream: S, clock: K) -> Self {
        Self::with_config(stream, clock, LinkConfig::default())
    }

    pub fn with_config(stream: S, clock: K, config: LinkConfig) -> Self {
        Self {
            stream,
            clock,
            config,
            accumulator: AsciiLine::new(),
            commands: BoundedRing::new(),
            counters: LinkCounters::default(),
        }
    }

    //==============================================================================INBOUND

    /// Consume every byte the stream reports as available.
    /// Returns the number of lines completed (queued or dropped).
    pub fn poll_incoming(&mut self) -> usize {
        let pending = self.stream.bytes_available();
        let mut completed = 0;
        for _ in 0..pending {
            let Some(byte) = self.stream.read_byte() else {
                break;
            };
            if self.ingest(byte) {
                completed += 1;
            }
        }
        completed
    }

    /// Feed one byte into the accumulator. Returns `true` when it closed a line.
    fn ingest(&mut self, byte: u8) -> bool {
        match byte {
            LF => false,
            CR => {
                if self.accumulator.is_empty() {
                    return false;
                }
                if self.commands.push(self.accumulator).is_err() {
                    self.counters.command_overflows =
                        self.counters.command_overflows.wrapping_add(1);
                    #[cfg(feature = "defmt")]
                    defmt::warn!("Command queue full, line dropped");
                }
                self.accumulator.clear();
                true
            }
            _ => {
                if !self.accumulator.push(byte) {
                    self.counters.command_overflows =
                        self.counters.command_overflows.wrapping_add(1);
                }
                false
            }
        }
    }

    /// Oldest queued command line.
    pub fn next_command(&mut self) -> Option<AsciiLine<LINE>> {
        self.commands.pop()
    }

    pub fn pending_commands(&self) -> usize {
        self.commands.len()
    }

    //==============================================================================OUTBOUND

    /// Write `bytes` as one unit, or not at all.
    ///
    /// A critical write that lacks room re-checks until the configured
    /// deadline, measured from entry; a droppable one gives up at once.
    pub fn write_with_priority(
        &mut self,
        bytes: &[u8],
        priority: WritePriority,
    ) -> Result<(), LinkError> {
        let len = bytes.len();
        if let Some(available) = self.shortfall(len) {
            match priority {
                WritePriority::Droppable => {
                    self.counters.droppable_dropped =
                        self.counters.droppable_dropped.wrapping_add(1);
                    #[cfg(feature = "defmt")]
                    defmt::debug!("Droppable write of {=usize} bytes shed", len);
                    return Err(LinkError::NoSpace { len, available });
                }
                WritePriority::Critical => self.wait_for_space(len)?,
            }
        }
        self.stream.write(bytes);
        Ok(())
    }

    /// Available room when it is known to be too small for `len` bytes.
    fn shortfall(&self, len: usize) -> Option<usize> {
        self.stream.write_space().filter(|&available| available < len)
    }

    fn wait_for_space(&mut self, len: usize) -> Result<(), LinkError> {
        let deadline = self.clock.now() + self.config.critical_write_timeout;
        while self.shortfall(len).is_some() {
            if self.clock.now() >= deadline {
                self.counters.critical_dropped = self.counters.critical_dropped.wrapping_add(1);
                #[cfg(feature = "defmt")]
                defmt::warn!("Critical write of {=usize} bytes timed out", len);
                return Err(LinkError::Timeout { len });
            }
            core::hint::spin_loop();
        }
        Ok(())
    }

    pub fn flush(&mut self) {
        self.stream.flush();
    }

    //==============================================================================ACCESSORS

    pub fn counters(&self) -> LinkCounters {
        self.counters
    }

    pub fn reset_counters(&mut self) {
        self.counters = LinkCounters::default();
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    pub fn clock(&self) -> &K {
        &self.clock
    }
}

impl<S: ByteStream, K: Clock, const LINE: usize, const DEPTH: usize> FrameSink
    for HostLink<S, K, LINE, DEPTH>
{
    fn write_with_priority(
        &mut self,
        bytes: &[u8],
        priority: WritePriority,
    ) -> Result<(), LinkError> {
        HostLink::write_with_priority(self, bytes, priority)
    }
}
