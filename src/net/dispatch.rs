//! Packet dispatcher (§4.1).
//!
//! A process-wide registry from packet type to the list of handlers
//! interested in it. Registration order is not meaningful; what matters is
//! that one handler's failure never prevents the others registered for the
//! same packet type from running, and that a packet of one type never
//! blocks packets of another type from being dispatched.

use std::collections::HashMap;

use tracing::warn;

use crate::error::CoreError;

/// A packet type byte, as carried in every incoming packet's first byte.
pub type PacketType = u8;

/// A registered handler: given a typed context and the packet's payload
/// (the bytes after the type byte), does whatever work it needs and reports
/// failure without panicking.
pub type Handler<Ctx> = Box<dyn FnMut(&mut Ctx, &[u8]) -> Result<(), CoreError> + Send>;

/// Type -> handler-list registry, dispatching opaque byte payloads.
pub struct PacketDispatcher<Ctx> {
    handlers: HashMap<PacketType, Vec<Handler<Ctx>>>,
}

impl<Ctx> Default for PacketDispatcher<Ctx> {
    fn default() -> Self {
        PacketDispatcher {
            handlers: HashMap::new(),
        }
    }
}

impl<Ctx> PacketDispatcher<Ctx> {
    /// Create an empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `packet_type`. Multiple handlers may be
    /// registered for the same type; all run on dispatch.
    pub fn register(
        &mut self,
        packet_type: PacketType,
        handler: impl FnMut(&mut Ctx, &[u8]) -> Result<(), CoreError> + Send + 'static,
    ) {
        self.handlers
            .entry(packet_type)
            .or_default()
            .push(Box::new(handler));
    }

    /// Dispatch `payload` (the bytes following the type byte) to every
    /// handler registered for `packet_type`, in registration order.
    ///
    /// A handler returning `Err` is logged and skipped; the remaining
    /// handlers for this packet type, and all other packet types, still run.
    pub fn dispatch(&mut self, ctx: &mut Ctx, packet_type: PacketType, payload: &[u8]) {
        let Some(handlers) = self.handlers.get_mut(&packet_type) else {
            return;
        };

        for handler in handlers.iter_mut() {
            if let Err(err) = handler(ctx, payload) {
                warn!(packet_type, %err, "packet handler failed");
            }
        }
    }

    /// Number of handlers registered for a packet type, mainly for tests.
    pub fn handler_count(&self, packet_type: PacketType) -> usize {
        self.handlers.get(&packet_type).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_handlers_for_a_type_run_even_if_one_fails() {
        let mut dispatcher: PacketDispatcher<Vec<i32>> = PacketDispatcher::new();

        dispatcher.register(0x01, |ctx: &mut Vec<i32>, _payload| {
            ctx.push(1);
            Err(CoreError::ContractViolation("boom".into()))
        });
        dispatcher.register(0x01, |ctx: &mut Vec<i32>, _payload| {
            ctx.push(2);
            Ok(())
        });

        let mut ctx = Vec::new();
        dispatcher.dispatch(&mut ctx, 0x01, &[]);

        assert_eq!(ctx, vec![1, 2]);
    }

    #[test]
    fn dispatch_to_unregistered_type_is_a_no_op() {
        let mut dispatcher: PacketDispatcher<()> = PacketDispatcher::new();
        let mut ctx = ();
        dispatcher.dispatch(&mut ctx, 0x42, &[1, 2, 3]);
        assert_eq!(dispatcher.handler_count(0x42), 0);
    }

    #[test]
    fn different_types_have_independent_handler_lists() {
        let mut dispatcher: PacketDispatcher<Vec<u8>> = PacketDispatcher::new();
        dispatcher.register(0x01, |ctx: &mut Vec<u8>, _| {
            ctx.push(1);
            Ok(())
        });
        dispatcher.register(0x02, |ctx: &mut Vec<u8>, _| {
            ctx.push(2);
            Ok(())
        });

        let mut ctx = Vec::new();
        dispatcher.dispatch(&mut ctx, 0x02, &[]);
        assert_eq!(ctx, vec![2]);
    }
}
