use tether_protocol::{AddressSpace, CommandChannel, RingQueue, SessionLayout};

use crate::{logging::DebugPrint, target::Conventions};

/// Everything the handlers share for the lifetime of the instrumented process.
///
/// Built once at load time and handed to the handlers by reference, instead of living in
/// globals. Guest memory is not part of it: each call borrows the [`AddressSpace`] it runs
/// against.
#[derive(Debug)]
pub struct Session {
    layout: SessionLayout,
    conventions: Conventions,
    debug: DebugPrint,
    initialized: bool,
}

impl Session {
    pub fn new(layout: SessionLayout, conventions: Conventions, debug: bool) -> Self {
        Self {
            layout,
            conventions,
            debug: DebugPrint::new(debug),
            initialized: false,
        }
    }

    pub fn layout(&self) -> &SessionLayout {
        &self.layout
    }

    pub fn conventions(&self) -> &Conventions {
        &self.conventions
    }

    /// Host -> application queue.
    pub fn inbound(&self) -> RingQueue {
        self.layout.inbound
    }

    /// Application -> host queue.
    pub fn outbound(&self) -> RingQueue {
        self.layout.outbound
    }

    pub fn command(&self) -> Option<CommandChannel> {
        self.layout.command
    }

    pub fn debug(&self) -> &DebugPrint {
        &self.debug
    }

    /// Opens or closes the debug print gate. Never affects what the handlers return.
    pub fn set_debug(&mut self, enabled: bool) {
        self.debug.set_enabled(enabled);
    }

    /// `true` once the patches are in. Never goes back to `false`.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub(crate) fn mark_initialized(&mut self) {
        self.initialized = true;
    }

    /// Empties both queues.
    pub fn reset_queues<M: AddressSpace>(&self, memory: &mut M) {
        self.layout.inbound.init(memory);
        self.layout.outbound.init(memory);
    }
}
