//! The host agent's side of a session.
//!
//! The host agent owns the real network socket. It fills the inbound queue, drains the outbound
//! one and watches the command channel for lifecycle requests. Every call here must be serialized
//! with the instrumented process' execution (e.g. run between emulated frames); the queues have no
//! synchronization of their own.

use tracing::{debug, trace};

use crate::{
    command::{Param, Request, NO_REQUEST},
    error::{display_tag, ProtocolError},
    layout::{SessionLayout, COMMAND_TAG, INBOUND_TAG, OUTBOUND_TAG},
    memory::{Address, AddressSpace},
};

/// A lifecycle request taken from the command channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingCommand {
    pub request: Request,
    pub params: [u32; 4],
}

#[derive(Debug, Clone, Copy)]
pub struct HostEndpoint {
    layout: SessionLayout,
}

impl HostEndpoint {
    /// Checks that `layout` really points at an initialized session block.
    pub fn attach<M: AddressSpace>(
        layout: SessionLayout,
        memory: &M,
    ) -> Result<Self, ProtocolError> {
        if let Some(command) = layout.command {
            check_tag(command.base(), command.tag(memory), &COMMAND_TAG)?;
        }
        check_tag(layout.inbound.base(), layout.inbound.tag(memory), &INBOUND_TAG)?;
        check_tag(
            layout.outbound.base(),
            layout.outbound.tag(memory),
            &OUTBOUND_TAG,
        )?;

        debug!(base = layout.base(), "attached to session block");
        Ok(Self { layout })
    }

    pub fn layout(&self) -> &SessionLayout {
        &self.layout
    }

    /// Pushes as much of `data` into the inbound queue as fits, returns how many bytes went in.
    pub fn fill_inbound<M: AddressSpace>(&self, memory: &mut M, data: &[u8]) -> usize {
        let inbound = self.layout.inbound;
        let room = usize::try_from(inbound.avail(memory)).unwrap_or(usize::MAX);
        let accepted = data.len().min(room);

        for byte in data.iter().take(accepted) {
            inbound.push(memory, *byte);
        }

        trace!(offered = data.len(), accepted, "filled inbound queue");
        accepted
    }

    /// Pops every byte the application has sent so far.
    pub fn drain_outbound<M: AddressSpace>(&self, memory: &mut M) -> Vec<u8> {
        let outbound = self.layout.outbound;
        let pending = outbound.size(memory);

        let drained: Vec<u8> = (0..pending).map(|_| outbound.pop(memory)).collect();
        trace!(drained = drained.len(), "drained outbound queue");
        drained
    }

    /// Takes the pending lifecycle request, if any, and marks the channel idle again.
    ///
    /// Unknown codes are cleared as well, and reported as [`ProtocolError::UnknownRequest`].
    pub fn take_request<M: AddressSpace>(
        &self,
        memory: &mut M,
    ) -> Result<Option<PendingCommand>, ProtocolError> {
        let command = self.layout.command.ok_or(ProtocolError::NoCommandChannel)?;

        let code = command.request(memory);
        if code == NO_REQUEST {
            return Ok(None);
        }
        command.clear_request(memory);

        let request = Request::try_from(code)?;
        let params = Param::ALL.map(|param| command.param(memory, param));

        debug!(?request, ?params, "took request from command channel");
        Ok(Some(PendingCommand { request, params }))
    }

    /// Publishes the outcome of the last request.
    pub fn respond<M: AddressSpace>(&self, memory: &mut M, code: u32) -> Result<(), ProtocolError> {
        let command = self.layout.command.ok_or(ProtocolError::NoCommandChannel)?;
        command.set_response(memory, code);
        Ok(())
    }
}

fn check_tag(address: Address, found: [u8; 4], expected: &[u8; 4]) -> Result<(), ProtocolError> {
    if found == *expected {
        Ok(())
    } else {
        Err(ProtocolError::TagMismatch {
            address,
            expected: display_tag(expected),
            found: display_tag(&found),
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;
    use crate::memory::FlatMemory;

    const BASE: Address = 0x000f_8000;

    #[fixture]
    fn session() -> (SessionLayout, FlatMemory) {
        let layout = SessionLayout::new(BASE, true);
        let mut memory = FlatMemory::new(BASE, (layout.end() - BASE) as usize);
        layout.write_tags(&mut memory);
        layout.inbound.init(&mut memory);
        layout.outbound.init(&mut memory);
        (layout, memory)
    }

    #[rstest]
    fn attach_rejects_untagged_memory() {
        let layout = SessionLayout::new(BASE, false);
        let memory = FlatMemory::new(BASE, (layout.end() - BASE) as usize);

        assert_eq!(
            HostEndpoint::attach(layout, &memory).unwrap_err(),
            ProtocolError::TagMismatch {
                address: BASE,
                expected: "rxq".to_string(),
                found: String::new(),
            }
        );
    }

    #[rstest]
    fn fill_stops_when_inbound_is_full(session: (SessionLayout, FlatMemory)) {
        let (layout, mut memory) = session;
        let host = HostEndpoint::attach(layout, &memory).unwrap();

        let data = vec![7u8; 5000];
        assert_eq!(host.fill_inbound(&mut memory, &data), 4095);
        assert_eq!(host.fill_inbound(&mut memory, &data), 0);
        assert_eq!(layout.inbound.avail(&memory), 0);
    }

    #[rstest]
    fn drain_returns_bytes_in_order(session: (SessionLayout, FlatMemory)) {
        let (layout, mut memory) = session;
        let host = HostEndpoint::attach(layout, &memory).unwrap();

        for byte in b"hello" {
            layout.outbound.push(&mut memory, *byte);
        }

        assert_eq!(host.drain_outbound(&mut memory), b"hello");
        assert!(host.drain_outbound(&mut memory).is_empty());
    }

    #[rstest]
    fn take_request_clears_the_channel(session: (SessionLayout, FlatMemory)) {
        let (layout, mut memory) = session;
        let host = HostEndpoint::attach(layout, &memory).unwrap();
        let command = layout.command.unwrap();

        assert_eq!(host.take_request(&mut memory).unwrap(), None);

        command.set_request(&mut memory, Request::Close);
        command.set_param(&mut memory, Param::First, 7);

        assert_eq!(
            host.take_request(&mut memory).unwrap(),
            Some(PendingCommand {
                request: Request::Close,
                params: [7, 0, 0, 0],
            })
        );
        assert_eq!(command.request(&memory), NO_REQUEST);

        host.respond(&mut memory, 1).unwrap();
        assert_eq!(command.response(&memory), 1);
    }

    #[rstest]
    fn queue_only_sessions_have_no_commands() {
        let layout = SessionLayout::new(BASE, false);
        let mut memory = FlatMemory::new(BASE, (layout.end() - BASE) as usize);
        layout.write_tags(&mut memory);
        let host = HostEndpoint::attach(layout, &memory).unwrap();

        assert_eq!(
            host.take_request(&mut memory),
            Err(ProtocolError::NoCommandChannel)
        );
    }
}
