//! Placement of the command channel and the two queues inside the session data block.

use crate::{
    command::{CommandChannel, COMMAND_SIZE},
    memory::{Address, AddressSpace},
    queue::RingQueue,
};

pub const COMMAND_TAG: [u8; 4] = *b"rpc\0";
pub const INBOUND_TAG: [u8; 4] = *b"rxq\0";
pub const OUTBOUND_TAG: [u8; 4] = *b"txq\0";

/// Where everything shared with the host agent lives.
///
/// Builds without a command channel start the inbound queue right at `data_base`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLayout {
    /// Command channel, only present in builds that control the socket lifecycle.
    pub command: Option<CommandChannel>,
    /// Host -> application bytes (`rxq`).
    pub inbound: RingQueue,
    /// Application -> host bytes (`txq`).
    pub outbound: RingQueue,
}

impl SessionLayout {
    pub fn new(data_base: Address, with_command_channel: bool) -> Self {
        let command = with_command_channel.then(|| CommandChannel::new(data_base));
        let inbound = RingQueue::new(command.map_or(data_base, |command| command.end()));
        let outbound = RingQueue::new(inbound.end());

        Self {
            command,
            inbound,
            outbound,
        }
    }

    /// Bytes the data block spans from `data_base`.
    pub const fn footprint(with_command_channel: bool) -> u32 {
        let queues = 2 * RingQueue::new(0).footprint();
        if with_command_channel {
            COMMAND_SIZE + queues
        } else {
            queues
        }
    }

    /// End of a block placed at `data_base`, `None` when it would run past the address space.
    pub const fn checked_end(data_base: Address, with_command_channel: bool) -> Option<Address> {
        data_base.checked_add(Self::footprint(with_command_channel))
    }

    pub fn base(&self) -> Address {
        self.command
            .map_or(self.inbound.base(), |command| command.base())
    }

    /// First address after the data block.
    pub fn end(&self) -> Address {
        self.outbound.end()
    }

    /// Stamps the identifying tags, so the block can be located in a memory dump.
    pub fn write_tags<M: AddressSpace>(&self, memory: &mut M) {
        if let Some(command) = self.command {
            command.write_tag(memory, &COMMAND_TAG);
        }
        self.inbound.write_tag(memory, &INBOUND_TAG);
        self.outbound.write_tag(memory, &OUTBOUND_TAG);
    }
}
