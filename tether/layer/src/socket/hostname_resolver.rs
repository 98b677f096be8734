//! Name resolution stubs. Every lookup resolves to the rendezvous host, the host agent is the
//! one that knows where that really is.

use tether_protocol::{Address, AddressSpace};
use tracing::info;

use super::{PLACEHOLDER_TICKET, RENDEZVOUS_ADDRESS};
use crate::{macros::debug_print, state::Session};

/// Longest hostname we bother reading back for the log.
const HOSTNAME_MAX: usize = 256;

/// Starts a lookup of the NUL-terminated name at `hostname`, returns its ticket.
#[tracing::instrument(level = "trace", skip_all)]
pub(crate) fn resolve_begin<M: AddressSpace>(
    session: &Session,
    memory: &M,
    hostname: Address,
) -> u32 {
    if session.debug().is_enabled() {
        let name = read_c_string(memory, hostname);
        info!(hostname = %String::from_utf8_lossy(&name), "resolve");
    } else {
        info!("resolve");
    }

    PLACEHOLDER_TICKET
}

/// Result of the lookup behind `ticket`.
#[tracing::instrument(level = "trace", skip_all)]
pub(crate) fn resolve_result(session: &Session, ticket: u32) -> u32 {
    debug_print!(session.debug(), ticket, "resolve result {RENDEZVOUS_ADDRESS:#x}");
    RENDEZVOUS_ADDRESS
}

/// Frees the lookup behind `ticket`.
#[tracing::instrument(level = "trace", skip_all)]
pub(crate) fn resolve_release(session: &Session, ticket: u32) -> u32 {
    debug_print!(session.debug(), ticket, "resolve release");
    0
}

fn read_c_string<M: AddressSpace>(memory: &M, address: Address) -> Vec<u8> {
    (0u32..)
        .take(HOSTNAME_MAX)
        .map(|offset| memory.read8(address.wrapping_add(offset)))
        .take_while(|byte| *byte != 0)
        .collect()
}
