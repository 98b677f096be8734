//! Outcome type shared by the handler operations.
//!
//! The replaced entry points have no error channel besides their return value, so a handler
//! either succeeds with the value the caller expects, or hits one of the soft conditions in
//! [`Bypass`]. The hook for each entry point decides which sentinel a [`Bypass`] turns into,
//! keeping the call's original return convention intact.

use std::fmt;

/// Soft conditions a handler can hit. None of them is fatal, the application is expected to
/// retry the call later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Bypass {
    /// Asked to move zero bytes.
    EmptyBuffer,

    /// The outbound queue can't take the whole write. Writes are all-or-nothing.
    OutboundFull { requested: u32, avail: u32 },

    /// The inbound queue holds fewer bytes than requested. Reads are all-or-nothing.
    InboundShort { requested: u32, size: u32 },

    /// The inbound queue is empty.
    NothingBuffered,
}

impl fmt::Display for Bypass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bypass::EmptyBuffer => f.write_str("empty buffer"),
            Bypass::OutboundFull { requested, avail } => {
                write!(f, "outbound queue full ({requested} requested, {avail} free)")
            }
            Bypass::InboundShort { requested, size } => {
                write!(f, "inbound queue short ({requested} requested, {size} queued)")
            }
            Bypass::NothingBuffered => f.write_str("nothing buffered"),
        }
    }
}

/// [`ControlFlow`](std::ops::ControlFlow)-like enum to be used by handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Detour<S = ()> {
    /// The call was served, `S` is what the hook returns.
    Success(S),
    /// The call did nothing, the hook answers with the entry point's sentinel.
    Bypass(Bypass),
}

impl<S> Detour<S> {
    /// `Success` -> Return the contained value.
    /// `Bypass` -> Return the value `op` picks for it.
    pub(crate) fn unwrap_or_bypass_with<F: FnOnce(Bypass) -> S>(self, op: F) -> S {
        match self {
            Detour::Success(s) => s,
            Detour::Bypass(b) => op(b),
        }
    }
}
