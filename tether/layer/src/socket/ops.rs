//! Handler operations on top of the queues and the command channel.
//!
//! Everything here runs to completion inside the application's own thread. A call that can't be
//! served right now returns a [`Bypass`], and the hook answers with the entry point's sentinel so
//! the application retries later.
//!
//! Spans carry no fields. Arguments, payloads and results only show up through [`debug_print`],
//! so a session with the gate closed logs nothing per call.

use tether_protocol::{command::Param, Address, AddressSpace, Request, RingQueue};
use tracing::{info, warn};

use super::{PLACEHOLDER_SOCKET, RENDEZVOUS_ADDRESS, STATUS_SIZE_CAP};
use crate::{
    detour::{Bypass, Detour},
    logging::HexBytes,
    macros::debug_print,
    state::Session,
};

/// Queues `len` bytes from `buf` on the outbound queue. All or nothing.
#[tracing::instrument(level = "trace", skip_all)]
pub(crate) fn send<M: AddressSpace>(
    session: &Session,
    memory: &mut M,
    socket: u32,
    buf: Address,
    len: u32,
) -> Detour<u32> {
    debug_print!(session.debug(), socket, len, "send from {buf:#010x}");
    if len == 0 {
        return Detour::Bypass(Bypass::EmptyBuffer);
    }

    let outbound = session.outbound();
    let avail = outbound.avail(memory);
    if avail < len {
        debug_print!(session.debug(), requested = len, avail, "outbound queue full");
        return Detour::Bypass(Bypass::OutboundFull {
            requested: len,
            avail,
        });
    }

    let mut data = vec![0; len as usize];
    memory.read_bytes(buf, &mut data);
    for byte in &data {
        outbound.push(memory, *byte);
    }

    debug_print!(session.debug(), "sent {}", HexBytes(&data));
    Detour::Success(len)
}

/// Pops exactly `len` bytes into `buf`, or nothing if fewer are queued.
#[tracing::instrument(level = "trace", skip_all)]
pub(crate) fn recv<M: AddressSpace>(
    session: &Session,
    memory: &mut M,
    socket: u32,
    buf: Address,
    len: u32,
) -> Detour<u32> {
    debug_print!(session.debug(), socket, len, "recv into {buf:#010x}");
    let inbound = session.inbound();
    let size = inbound.size(memory);
    if size < len {
        debug_print!(session.debug(), requested = len, size, "inbound queue short");
        return Detour::Bypass(Bypass::InboundShort {
            requested: len,
            size,
        });
    }

    let data = pop_into(memory, inbound, buf, len);
    debug_print!(session.debug(), "received {}", HexBytes(&data));
    Detour::Success(len)
}

/// Pops up to `len` bytes into `buf`, whatever is queued right now.
#[tracing::instrument(level = "trace", skip_all)]
pub(crate) fn receive_available<M: AddressSpace>(
    session: &Session,
    memory: &mut M,
    buf: Address,
    len: u32,
) -> Detour<u32> {
    debug_print!(session.debug(), len, "receive available into {buf:#010x}");
    if len == 0 {
        return Detour::Bypass(Bypass::EmptyBuffer);
    }

    let inbound = session.inbound();
    let len = len.min(inbound.size(memory));
    if len == 0 {
        return Detour::Bypass(Bypass::NothingBuffered);
    }

    let data = pop_into(memory, inbound, buf, len);
    debug_print!(session.debug(), "received {}", HexBytes(&data));
    Detour::Success(len)
}

/// Writes `[code, available]` at `dst` and returns `code`.
///
/// `code` is 0 when there is something to read, the build's "empty" sentinel otherwise.
/// `available` is capped at [`STATUS_SIZE_CAP`].
#[tracing::instrument(level = "trace", skip_all)]
pub(crate) fn get_status<M: AddressSpace>(
    session: &Session,
    memory: &mut M,
    socket: u32,
    dst: Address,
) -> u32 {
    let size = session.inbound().size(memory);

    let (code, available) = if size > 0 {
        (0, size.min(STATUS_SIZE_CAP))
    } else {
        (session.conventions().status_empty, 0)
    };

    memory.write32(dst, code);
    memory.write32(dst.wrapping_add(4), available);
    debug_print!(session.debug(), socket, code, available, "status");
    code
}

/// Starts a fresh connection: empties both queues and posts an open request to the host.
///
/// `port` arrives in the application's byte order and is handed to the host swapped.
#[tracing::instrument(level = "trace", skip_all)]
pub(crate) fn open<M: AddressSpace>(
    session: &Session,
    memory: &mut M,
    address: u32,
    port: u32,
) -> u32 {
    session.reset_queues(memory);

    let host_port = (port >> 8) | ((port & 0xff) << 8);
    let rendezvous = address == RENDEZVOUS_ADDRESS;
    info!("tcp open {address:#x}:{host_port}, rendezvous: {rendezvous}");

    match session.command() {
        Some(command) => {
            command.set_param(memory, Param::First, u32::from(rendezvous));
            command.set_param(memory, Param::Second, address);
            command.set_param(memory, Param::Third, host_port);
            command.set_request(memory, Request::Open);
        }
        None => warn!("no command channel in this build, open request not posted"),
    }

    PLACEHOLDER_SOCKET
}

/// Ends the connection: empties both queues and posts a close request to the host.
#[tracing::instrument(level = "trace", skip_all)]
pub(crate) fn close<M: AddressSpace>(session: &Session, memory: &mut M, socket: u32) -> u32 {
    session.reset_queues(memory);
    info!(socket, "tcp close");

    match session.command() {
        Some(command) => {
            command.set_param(memory, Param::First, socket);
            command.set_request(memory, Request::Close);
        }
        None => warn!("no command channel in this build, close request not posted"),
    }

    0
}

/// Empties both queues, leaving the command channel alone.
#[tracing::instrument(level = "trace", skip_all)]
pub(crate) fn reset<M: AddressSpace>(session: &Session, memory: &mut M) {
    debug_print!(session.debug(), "reset queues");
    session.reset_queues(memory);
}

fn pop_into<M: AddressSpace>(
    memory: &mut M,
    queue: RingQueue,
    buf: Address,
    len: u32,
) -> Vec<u8> {
    let data = (0..len).map(|_| queue.pop(memory)).collect::<Vec<_>>();
    memory.write_bytes(buf, &data);
    data
}
