#![allow(rustdoc::private_intra_doc_links)]
#![warn(clippy::indexing_slicing)]
#![deny(unused_crate_dependencies)]

//! Runs inside the instrumented application, in place of its network stack.
//!
//! Paired with an external host agent (see [`tether_protocol::host`]), it makes the application
//! believe it is talking TCP, while every byte actually goes through two ring buffer queues in
//! its own memory.
//!
//! ## How it works
//!
//! At load time [`Layer::install`] rewrites a fixed set of call sites (per build, see
//! [`target`]) into calls to handler trampolines. When the application reaches one of them, the
//! embedding runtime hands control to [`Layer::on_call`], which runs the matching handler and
//! returns the value for `v0`.
//!
//! ### Example
//!
//! The application sends a login packet:
//!
//! 1. The patched call site jumps to the `tcp_send` trampoline, and [`Layer::on_call`] dispatches
//!    to [`socket::ops::send`];
//!
//! 2. If the outbound queue has room for the whole packet, it is copied there and the length is
//!    returned, otherwise the application gets `0` and retries on its next frame;
//!
//! 3. The host agent drains the outbound queue and forwards the bytes to the real server.
//!
//! Replies travel the other way: the host agent fills the inbound queue, and the application
//! polls it through the status and receive handlers.
//!
//! ## Configuration
//!
//! Check [`tether_config::LayerConfig`] for the available options and their environment variables.

use tether_config::LayerConfig;
use tether_protocol::{Address, AddressSpace};

use crate::macros::debug_print;

mod detour;
pub mod error;
pub mod hooks;
pub mod logging;
mod macros;
pub mod patch;
pub mod setup;
pub mod socket;
pub mod state;
pub mod target;

pub use error::{LayerError, PatchCodeError, Result};
pub use hooks::InstallOutcome;
pub use setup::LayerSetup;
pub use socket::{CallArgs, HandlerId};
pub use state::Session;

/// The layer: checked setup plus the session state the handlers share.
#[derive(Debug)]
pub struct Layer {
    setup: LayerSetup,
    session: Session,
}

impl Layer {
    pub fn new(config: LayerConfig) -> Result<Self> {
        let setup = LayerSetup::new(config)?;
        let session = Session::new(
            *setup.layout(),
            setup.profile().conventions,
            setup.config().debug,
        );

        Ok(Self { setup, session })
    }

    /// Layer configured from `TETHER_CONFIG_FILE` and the other `TETHER_*` variables.
    ///
    /// Meant as the entry point for the embedding runtime, so it also installs the global tracing
    /// subscriber (see [`logging::init_tracing`]).
    pub fn from_env() -> Result<Self> {
        logging::init_tracing();

        Self::new(LayerConfig::resolve(None)?)
    }

    pub fn setup(&self) -> &LayerSetup {
        &self.setup
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Patches the application and prepares the queues. Only the first call does anything.
    pub fn install<M: AddressSpace>(&mut self, memory: &mut M) -> InstallOutcome {
        hooks::install_hooks(&mut self.session, &self.setup, memory)
    }

    /// Control reached `pc`. Runs the handler whose trampoline lives there, returning `v0`.
    ///
    /// `None` when `pc` isn't a trampoline.
    pub fn on_call<M: AddressSpace>(
        &self,
        memory: &mut M,
        pc: Address,
        args: CallArgs,
    ) -> Option<u32> {
        let handler = self.setup.trampolines().handler_at(pc)?;
        debug_print!(self.session.debug(), %handler, "trampoline hit at {pc:#010x}");

        Some(self.call(memory, handler, args))
    }

    /// Runs `handler` directly.
    pub fn call<M: AddressSpace>(&self, memory: &mut M, handler: HandlerId, args: CallArgs) -> u32 {
        socket::hooks::dispatch(&self.session, memory, handler, args)
    }
}
