#![warn(clippy::indexing_slicing)]
#![deny(unused_crate_dependencies)]

//! Shared-memory contract between the in-process layer and the external host agent.
//!
//! Nothing in here owns memory. Every structure is a typed _view_ at a fixed [`Address`] inside
//! an [`AddressSpace`], so the exact same code reads and writes the queues whether it runs inside
//! the instrumented process (through the layer) or outside of it (through [`host::HostEndpoint`]).
//!
//! ## Layout
//!
//! ```text
//! data_base ─┬─ command channel (ps2-rpc builds only)   284 bytes
//!            ├─ inbound queue  "rxq"                    12 + 4096 bytes
//!            └─ outbound queue "txq"                    12 + 4096 bytes
//! ```
//!
//! All multi-byte fields are little-endian 32-bit words.
//!
//! ## Synchronization
//!
//! The queues are single-producer/single-consumer and carry **no** synchronization of their own.
//! Accesses from the layer and from the host agent are only sound when they are serialized by
//! whoever owns the memory (e.g. the emulator only runs the host agent between guest frames).

pub mod command;
pub mod error;
pub mod host;
pub mod layout;
pub mod memory;
pub mod queue;

pub use command::{CommandChannel, Param, Request};
pub use error::ProtocolError;
pub use layout::SessionLayout;
pub use memory::{Address, AddressSpace, FlatMemory};
pub use queue::RingQueue;
