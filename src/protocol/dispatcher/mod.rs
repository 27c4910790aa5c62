//! Routing of host command lines to protocol handlers.
//!
//! Handlers are kept in registration order; the first one whose
//! [`ProtocolHandler::can_handle`] accepts a line answers it. Lines nobody
//! claims get the error sentinel.
use crate::{
    config::MAX_PROTOCOL_HANDLERS, core::Reply, error::DispatchError,
    protocol::transport::traits::frame_sink::FrameSink,
};

/// A protocol spoken over the host link.
pub trait ProtocolHandler {
    /// Stable name, unique within a dispatcher.
    fn name(&self) -> &'static str;

    /// Whether this handler claims `line`. Keyed on the first character.
    fn can_handle(&self, line: &[u8]) -> bool;

    /// Run a command to completion and produce its reply.
    fn process_command(&mut self, line: &[u8]) -> Reply;

    /// Periodic work: push pending output into `sink`. Called every cycle.
    fn poll(&mut self, sink: &mut dyn FrameSink);

    /// The handler currently holds an open session.
    fn is_active(&self) -> bool;
}

/// Bounded, ordered list of borrowed handlers.
pub struct Dispatcher<'a, const N: usize = MAX_PROTOCOL_HANDLERS> {
    handlers: [Option<&'a mut dyn ProtocolHandler>; N],
    count: usize,
}

impl<'a, const N: usize> Default for Dispatcher<'a, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, const N: usize> Dispatcher<'a, N> {
    pub fn new() -> Self {
        Self {
            handlers: core::array::from_fn(|_| None),
            count: 0,
        }
    }

    /// Append a handler. Names must be unique.
    pub fn register(&mut self, handler: &'a mut dyn ProtocolHandler) -> Result<(), DispatchError> {
        if self.iter().any(|h| h.name() == handler.name()) {
            return Err(DispatchError::AlreadyRegistered);
        }
        if self.count == N {
            return Err(DispatchError::RegistryFull { capacity: N });
        }
        #[cfg(feature = "defmt")]
        defmt::info!("Handler {=str} registered", handler.name());
        self.handlers[self.count] = Some(handler);
        self.count += 1;
        Ok(())
    }

    /// Remove the handler called `name`, keeping the others in order.
    /// Returns it back to the caller.
    pub fn unregister(&mut self, name: &str) -> Option<&'a mut dyn ProtocolHandler> {
        let index = self
            .handlers
            .iter()
            .take(self.count)
            .position(|slot| slot.as_deref().is_some_and(|h| h.name() == name))?;
        let removed = self.handlers[index].take();
        self.handlers[index..self.count].rotate_left(1);
        self.count -= 1;
        removed
    }

    pub fn handler_count(&self) -> usize {
        self.count
    }

    /// Names in registration order.
    pub fn handler_names(&self) -> impl Iterator<Item = &'static str> + use<'_, 'a, N> {
        self.iter().map(|h| h.name())
    }

    /// Route one line. Empty lines get no reply at all.
    pub fn dispatch(&mut self, line: &[u8]) -> Option<Reply> {
        if line.is_empty() {
            return None;
        }
        let reply = match self.iter_mut().find(|h| h.can_handle(line)) {
            Some(handler) => handler.process_command(line),
            None => {
                #[cfg(feature = "defmt")]
                defmt::debug!("No handler for {=u8:#x}", line[0]);
                Reply::Error
            }
        };
        Some(reply)
    }

    /// Give every handler its poll step, in order.
    pub fn poll_all(&mut self, sink: &mut dyn FrameSink) {
        for handler in self.iter_mut() {
            handler.poll(sink);
        }
    }

    fn iter(&self) -> impl Iterator<Item = &(dyn ProtocolHandler + 'a)> + '_ {
        self.handlers[..self.count]
            .iter()
            .filter_map(|slot| slot.as_deref())
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = &mut (dyn ProtocolHandler + 'a)> + '_ {
        self.handlers[..self.count]
            .iter_mut()
            .filter_map(|slot| slot.as_deref_mut())
    }
}
