//! Calling convention glue: argument registers in, `v0` out.
//!
//! Each `*_detour` decides which sentinel a [`Bypass`](crate::detour::Bypass) turns into, so the
//! application sees exactly the return values the replaced entry point used to produce.

use tether_protocol::AddressSpace;

use super::{hostname_resolver, ops, HandlerId, WOULD_BLOCK};
use crate::{detour::Bypass, macros::debug_print, state::Session};

/// The `a0..a3` argument registers at the time of the call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallArgs {
    pub a0: u32,
    pub a1: u32,
    pub a2: u32,
    pub a3: u32,
}

impl From<[u32; 4]> for CallArgs {
    fn from([a0, a1, a2, a3]: [u32; 4]) -> Self {
        Self { a0, a1, a2, a3 }
    }
}

/// `(socket, buf, len) -> sent`, `0` when nothing was queued.
pub(crate) fn tcp_send_detour<M: AddressSpace>(
    session: &Session,
    memory: &mut M,
    args: CallArgs,
) -> u32 {
    ops::send(session, memory, args.a0, args.a1, args.a2).unwrap_or_bypass_with(|bypass| {
        debug_print!(session.debug(), %bypass, "send bypassed");
        0
    })
}

/// `(socket, buf, len) -> received`, `-1` while the full amount isn't there.
pub(crate) fn tcp_recv_detour<M: AddressSpace>(
    session: &Session,
    memory: &mut M,
    args: CallArgs,
) -> u32 {
    ops::recv(session, memory, args.a0, args.a1, args.a2).unwrap_or_bypass_with(|bypass| {
        debug_print!(session.debug(), %bypass, "recv bypassed");
        WOULD_BLOCK
    })
}

/// `(buf, len) -> received`.
pub(crate) fn receive_available_detour<M: AddressSpace>(
    session: &Session,
    memory: &mut M,
    args: CallArgs,
) -> u32 {
    ops::receive_available(session, memory, args.a0, args.a1).unwrap_or_bypass_with(|bypass| {
        debug_print!(session.debug(), %bypass, "receive bypassed");
        match bypass {
            Bypass::NothingBuffered => session.conventions().best_effort_empty,
            _ => 0,
        }
    })
}

/// Runs `handler` with `args`, returning the value for `v0`.
pub(crate) fn dispatch<M: AddressSpace>(
    session: &Session,
    memory: &mut M,
    handler: HandlerId,
    args: CallArgs,
) -> u32 {
    match handler {
        HandlerId::TcpOpen => ops::open(session, memory, args.a0, args.a1),
        HandlerId::TcpClose => ops::close(session, memory, args.a0),
        HandlerId::TcpSend => tcp_send_detour(session, memory, args),
        HandlerId::TcpRecv => tcp_recv_detour(session, memory, args),
        HandlerId::ReceiveAvailable => receive_available_detour(session, memory, args),
        HandlerId::TcpGetStatus => ops::get_status(session, memory, args.a0, args.a1),
        HandlerId::ResetQueues => {
            ops::reset(session, memory);
            0
        }
        HandlerId::ResolveBegin => hostname_resolver::resolve_begin(session, &*memory, args.a0),
        HandlerId::ResolveResult => hostname_resolver::resolve_result(session, args.a0),
        HandlerId::ResolveRelease => hostname_resolver::resolve_release(session, args.a0),
    }
}
