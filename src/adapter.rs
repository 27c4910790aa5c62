//! The adapter context: the host link plus the dispatcher holding the
//! protocol handlers, composed once at start-up and driven by the outer loop
//! through [`Adapter::run_cycle`].
use crate::{
    config::{MAX_COMMANDS_PER_CYCLE, MAX_PROTOCOL_HANDLERS},
    error::DispatchError,
    protocol::{
        dispatcher::{Dispatcher, ProtocolHandler},
        transport::{
            host_link::HostLink,
            traits::{byte_stream::ByteStream, clock::Clock, frame_sink::WritePriority},
        },
    },
};

/// Handlers are borrowed, not owned: the engine is created next to the adapter
/// at start-up and both live for the rest of the process.
pub struct Adapter<'a, S: ByteStream, K: Clock, const N: usize = MAX_PROTOCOL_HANDLERS> {
    link: HostLink<S, K>,
    dispatcher: Dispatcher<'a, N>,
    /// Command lines dispatched per cycle before handlers get their poll step.
    commands_per_cycle: usize,
}

impl<'a, S: ByteStream, K: Clock, const N: usize> Adapter<'a, S, K, N> {
    pub fn new(link: HostLink<S, K>) -> Self {
        Self {
            link,
            dispatcher: Dispatcher::new(),
            commands_per_cycle: MAX_COMMANDS_PER_CYCLE,
        }
    }

    /// Commands per cycle; clamped to at least one.
    pub fn with_commands_per_cycle(mut self, commands: usize) -> Self {
        self.commands_per_cycle = commands.max(1);
        self
    }

    pub fn register(&mut self, handler: &'a mut dyn ProtocolHandler) -> Result<(), DispatchError> {
        self.dispatcher.register(handler)
    }

    /// One pass of the main loop:
    /// 1. ingest host bytes,
    /// 2. dispatch queued commands and write each reply (critical),
    /// 3. let every handler poll (received frames go out as droppable writes),
    /// 4. flush.
    ///
    /// Returns the number of command lines processed.
    pub fn run_cycle(&mut self) -> usize {
        self.link.poll_incoming();

        let mut processed = 0;
        while processed < self.commands_per_cycle {
            let Some(line) = self.link.next_command() else {
                break;
            };
            processed += 1;
            if let Some(reply) = self.dispatcher.dispatch(line.as_slice()) {
                // A dropped reply is counted by the link.
                self.link
                    .write_with_priority(reply.to_wire().as_slice(), WritePriority::Critical)
                    .ok();
            }
        }

        self.dispatcher.poll_all(&mut self.link);
        self.link.flush();
        processed
    }

    pub fn link(&self) -> &HostLink<S, K> {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut HostLink<S, K> {
        &mut self.link
    }

    pub fn dispatcher(&self) -> &Dispatcher<'a, N> {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher<'a, N> {
        &mut self.dispatcher
    }

    /// Tear the context down, releasing the borrowed handlers.
    pub fn into_link(self) -> HostLink<S, K> {
        self.link
    }
}
