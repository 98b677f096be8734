//! The command channel record, used to signal socket lifecycle edges to the host agent.
//!
//! ```text
//! +0    tag       [u8; 4]    "rpc\0"
//! +4    request   u32        written by the layer (see [`Request`])
//! +8    response  u32        written by the host agent
//! +12   params    [u32; 4]
//! +28   name1     [u8; 128]
//! +156  name2     [u8; 128]
//! ```
//!
//! This is a minimal handshake, not an RPC: the layer writes `request` and the parameters, the
//! host polls for it. `response` is never read back by the handlers.

use crate::{
    error::ProtocolError,
    memory::{Address, AddressSpace},
};

/// Length of each of the two name buffers.
pub const NAME_LEN: u32 = 128;

/// `request` value while nothing is pending.
pub const NO_REQUEST: u32 = 0;

const REQUEST_OFFSET: u32 = 4;
const RESPONSE_OFFSET: u32 = 8;
const PARAMS_OFFSET: u32 = 12;
const NAME1_OFFSET: u32 = 28;
const NAME2_OFFSET: u32 = NAME1_OFFSET + NAME_LEN;

/// Total size of the record.
pub const COMMAND_SIZE: u32 = NAME2_OFFSET + NAME_LEN;

/// Request codes. The values are part of the contract with the host agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Request {
    /// Open a TCP connection. `param1` is 1 when the destination is the rendezvous host,
    /// `param2` the raw destination address, `param3` the destination port in host order.
    Open = 1,
    /// Close the connection. `param1` is the socket id the application passed.
    Close = 2,
}

impl Request {
    pub const fn code(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for Request {
    type Error = ProtocolError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Open),
            2 => Ok(Self::Close),
            unknown => Err(ProtocolError::UnknownRequest(unknown)),
        }
    }
}

/// One of the four scalar parameter slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    First,
    Second,
    Third,
    Fourth,
}

impl Param {
    pub const ALL: [Param; 4] = [Param::First, Param::Second, Param::Third, Param::Fourth];

    const fn offset(self) -> u32 {
        PARAMS_OFFSET + 4 * self as u32
    }
}

/// One of the two fixed-size name buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameSlot {
    First,
    Second,
}

impl NameSlot {
    const fn offset(self) -> u32 {
        match self {
            NameSlot::First => NAME1_OFFSET,
            NameSlot::Second => NAME2_OFFSET,
        }
    }
}

/// View of the command record at `base`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandChannel {
    base: Address,
}

impl CommandChannel {
    pub const fn new(base: Address) -> Self {
        Self { base }
    }

    pub const fn base(&self) -> Address {
        self.base
    }

    pub const fn end(&self) -> Address {
        self.at(COMMAND_SIZE)
    }

    const fn at(&self, offset: u32) -> Address {
        self.base.wrapping_add(offset)
    }

    pub fn tag<M: AddressSpace>(&self, memory: &M) -> [u8; 4] {
        let mut tag = [0; 4];
        memory.read_bytes(self.base, &mut tag);
        tag
    }

    pub fn write_tag<M: AddressSpace>(&self, memory: &mut M, tag: &[u8; 4]) {
        memory.write_bytes(self.base, tag);
    }

    /// Raw `request` word, [`NO_REQUEST`] when nothing is pending.
    pub fn request<M: AddressSpace>(&self, memory: &M) -> u32 {
        memory.read32(self.at(REQUEST_OFFSET))
    }

    pub fn set_request<M: AddressSpace>(&self, memory: &mut M, request: Request) {
        memory.write32(self.at(REQUEST_OFFSET), request.code());
    }

    pub fn clear_request<M: AddressSpace>(&self, memory: &mut M) {
        memory.write32(self.at(REQUEST_OFFSET), NO_REQUEST);
    }

    pub fn response<M: AddressSpace>(&self, memory: &M) -> u32 {
        memory.read32(self.at(RESPONSE_OFFSET))
    }

    pub fn set_response<M: AddressSpace>(&self, memory: &mut M, response: u32) {
        memory.write32(self.at(RESPONSE_OFFSET), response);
    }

    pub fn param<M: AddressSpace>(&self, memory: &M, param: Param) -> u32 {
        memory.read32(self.at(param.offset()))
    }

    pub fn set_param<M: AddressSpace>(&self, memory: &mut M, param: Param, value: u32) {
        memory.write32(self.at(param.offset()), value);
    }

    /// Contents of a name buffer up to (not including) the first NUL.
    pub fn name<M: AddressSpace>(&self, memory: &M, slot: NameSlot) -> Vec<u8> {
        let mut name = vec![0; NAME_LEN as usize];
        memory.read_bytes(self.at(slot.offset()), &mut name);

        if let Some(end) = name.iter().position(|byte| *byte == 0) {
            name.truncate(end);
        }
        name
    }

    /// Stores `name` NUL-padded, truncating to `NAME_LEN - 1` bytes so a terminator always fits.
    pub fn set_name<M: AddressSpace>(&self, memory: &mut M, slot: NameSlot, name: &[u8]) {
        let mut padded = vec![0; NAME_LEN as usize];
        let len = name.len().min(NAME_LEN as usize - 1);
        padded
            .iter_mut()
            .zip(name.iter().take(len))
            .for_each(|(dst, byte)| *dst = *byte);

        memory.write_bytes(self.at(slot.offset()), &padded);
    }
}
