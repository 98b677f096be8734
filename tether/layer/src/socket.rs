//! The Handler Set: replacements for the application's TCP and resolver entry points.
//!
//! [`ops`] implements each handler on top of the queues and the command channel,
//! [`hostname_resolver`] holds the resolver stubs, and [`hooks`] adapts both to the calling
//! convention of the replaced entry points (argument registers in, sentinel-aware `v0` out).

use std::fmt;

pub(crate) mod hooks;
pub(crate) mod hostname_resolver;
pub(crate) mod ops;

pub use hooks::CallArgs;

/// `-1` as the callers see it: "would block" / "nothing there".
pub const WOULD_BLOCK: u32 = u32::MAX;

/// The status record's size field is a signed 16-bit quantity on the application side.
pub const STATUS_SIZE_CAP: u32 = 0x7fff;

/// Socket id handed out by the open handler, real sockets live on the host side.
pub const PLACEHOLDER_SOCKET: u32 = 7;

/// Lookup ticket handed out by the resolver stub.
pub const PLACEHOLDER_TICKET: u32 = 7;

/// The well-known address the resolver stub resolves every name to, and that the open handler
/// flags as "the rendezvous host" for the host agent.
pub const RENDEZVOUS_ADDRESS: u32 = 0x0077;

/// Identity of every replacement handler.
///
/// The discriminant doubles as the handler's trampoline slot index, keep it stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HandlerId {
    /// `(ip, port) -> socket`
    TcpOpen = 0,
    /// `(socket) -> 0`
    TcpClose = 1,
    /// `(socket, ptr, len) -> sent`
    TcpSend = 2,
    /// `(socket, ptr, len) -> received | -1`
    TcpRecv = 3,
    /// `(ptr, len) -> received`, drains whatever is there.
    ReceiveAvailable = 4,
    /// `(socket, dst) -> status`
    TcpGetStatus = 5,
    /// `() -> ()`, empties both queues when switching network context.
    ResetQueues = 6,
    /// `(hostname) -> ticket`
    ResolveBegin = 7,
    /// `(ticket) -> address`
    ResolveResult = 8,
    /// `(ticket) -> 0`
    ResolveRelease = 9,
}

impl HandlerId {
    pub const ALL: [HandlerId; 10] = [
        HandlerId::TcpOpen,
        HandlerId::TcpClose,
        HandlerId::TcpSend,
        HandlerId::TcpRecv,
        HandlerId::ReceiveAvailable,
        HandlerId::TcpGetStatus,
        HandlerId::ResetQueues,
        HandlerId::ResolveBegin,
        HandlerId::ResolveResult,
        HandlerId::ResolveRelease,
    ];

    pub const fn index(self) -> u32 {
        self as u32
    }

    pub fn from_index(index: u32) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|index| Self::ALL.get(index))
            .copied()
    }

    pub const fn name(self) -> &'static str {
        match self {
            HandlerId::TcpOpen => "tcp_open",
            HandlerId::TcpClose => "tcp_close",
            HandlerId::TcpSend => "tcp_send",
            HandlerId::TcpRecv => "tcp_recv",
            HandlerId::ReceiveAvailable => "receive_available",
            HandlerId::TcpGetStatus => "tcp_get_status",
            HandlerId::ResetQueues => "reset_queues",
            HandlerId::ResolveBegin => "resolve_begin",
            HandlerId::ResolveResult => "resolve_result",
            HandlerId::ResolveRelease => "resolve_release",
        }
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
