//! The Patch Table: call-site rewrites and fixed data overrides, and the call instruction
//! encoding behind them.
//!
//! Call sites are redirected to per-handler trampoline slots (see [`Trampolines`]). The embedding
//! runtime reports control reaching a slot through [`Layer::on_call`](crate::Layer::on_call).

use tether_protocol::Address;

use crate::{
    error::{LayerError, Result},
    socket::HandlerId,
};

pub(crate) mod codes;
pub mod pnach;

pub use codes::parse_patch_codes;

/// `jal` with an empty target field.
pub const JAL_OPCODE: u32 = 0x0c00_0000;

/// Instructions are word aligned, the target field stores `target / 4`.
pub const INSTRUCTION_ALIGN: u32 = 4;

/// First address the 26-bit target field can't reach.
pub const CALL_TARGET_LIMIT: Address = 0x1000_0000;

/// Bytes reserved per handler trampoline (jump + delay slot).
pub const TRAMPOLINE_STRIDE: u32 = 8;

/// Encodes a call to `target`.
///
/// Unchecked: a `target` that is unaligned or at/above [`CALL_TARGET_LIMIT`] produces a garbage
/// instruction. Tables are checked once with [`PatchTable::validate`] instead.
pub const fn encode_call(target: Address) -> u32 {
    JAL_OPCODE | (target / INSTRUCTION_ALIGN)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatchWidth {
    Byte,
    Half,
    Word,
}

impl PatchWidth {
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            8 => Some(Self::Byte),
            16 => Some(Self::Half),
            32 => Some(Self::Word),
            _ => None,
        }
    }

    pub const fn bits(self) -> u32 {
        match self {
            PatchWidth::Byte => 8,
            PatchWidth::Half => 16,
            PatchWidth::Word => 32,
        }
    }

    pub const fn bytes(self) -> u32 {
        self.bits() / 8
    }

    /// Largest value a patch of this width can store.
    pub const fn max_value(self) -> u32 {
        match self {
            PatchWidth::Byte => u8::MAX as u32,
            PatchWidth::Half => u16::MAX as u32,
            PatchWidth::Word => u32::MAX,
        }
    }
}

/// A fixed override of application data or code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataPatch {
    pub width: PatchWidth,
    pub address: Address,
    /// When set, the patch is only applied if memory still holds this value.
    pub original: Option<u32>,
    pub value: u32,
}

impl DataPatch {
    /// Unconditional word override.
    pub const fn word(address: Address, value: u32) -> Self {
        Self {
            width: PatchWidth::Word,
            address,
            original: None,
            value,
        }
    }
}

/// A call instruction to redirect to `handler`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    pub address: Address,
    pub handler: HandlerId,
}

impl CallSite {
    pub const fn new(address: Address, handler: HandlerId) -> Self {
        Self { address, handler }
    }
}

/// One memory write the installer performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchWrite {
    pub width: PatchWidth,
    pub address: Address,
    pub original: Option<u32>,
    pub value: u32,
}

impl From<DataPatch> for PatchWrite {
    fn from(patch: DataPatch) -> Self {
        Self {
            width: patch.width,
            address: patch.address,
            original: patch.original,
            value: patch.value,
        }
    }
}

/// Where each handler's trampoline slot lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trampolines {
    base: Address,
}

impl Trampolines {
    pub const fn new(base: Address) -> Self {
        Self { base }
    }

    pub const fn base(&self) -> Address {
        self.base
    }

    /// Bytes covered by all the slots.
    pub const fn footprint() -> u32 {
        TRAMPOLINE_STRIDE * HandlerId::ALL.len() as u32
    }

    /// First address after the last slot. Wraps for a `base` too close to the top of the address
    /// space, [`Trampolines::checked_end`] doesn't.
    pub const fn end(&self) -> Address {
        self.base.wrapping_add(Self::footprint())
    }

    pub const fn checked_end(&self) -> Option<Address> {
        self.base.checked_add(Self::footprint())
    }

    pub const fn address_of(&self, handler: HandlerId) -> Address {
        self.base.wrapping_add(TRAMPOLINE_STRIDE * handler.index())
    }

    /// The handler whose slot starts exactly at `pc`.
    pub fn handler_at(&self, pc: Address) -> Option<HandlerId> {
        let offset = pc.checked_sub(self.base)?;
        if offset % TRAMPOLINE_STRIDE != 0 {
            return None;
        }

        HandlerId::from_index(offset / TRAMPOLINE_STRIDE)
    }
}

/// Data overrides and call-site rewrites for one build of the application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchTable {
    pub data: Vec<DataPatch>,
    pub calls: Vec<CallSite>,
}

impl PatchTable {
    pub fn new(data: Vec<DataPatch>, calls: Vec<CallSite>) -> Self {
        Self { data, calls }
    }

    /// Checks every entry can be written as is: patch addresses aligned to their width, and every
    /// call target encodable.
    pub fn validate(&self, trampolines: &Trampolines) -> Result<()> {
        if let Some(patch) = self
            .data
            .iter()
            .find(|patch| patch.address % patch.width.bytes() != 0)
        {
            return Err(LayerError::UnalignedPatch(patch.address));
        }

        for call in &self.calls {
            if call.address % INSTRUCTION_ALIGN != 0 {
                return Err(LayerError::UnalignedPatch(call.address));
            }

            let target = trampolines.address_of(call.handler);
            if target >= CALL_TARGET_LIMIT || target % INSTRUCTION_ALIGN != 0 {
                return Err(LayerError::CallTargetOutOfRange {
                    site: call.address,
                    handler: call.handler,
                    target,
                });
            }
        }

        Ok(())
    }

    /// Every write in installation order: data overrides first, then the call sites.
    pub fn writes<'a>(&'a self, trampolines: &'a Trampolines) -> impl Iterator<Item = PatchWrite> + 'a {
        let data = self.data.iter().copied().map(PatchWrite::from);
        let calls = self.calls.iter().map(move |call| PatchWrite {
            width: PatchWidth::Word,
            address: call.address,
            original: None,
            value: encode_call(trampolines.address_of(call.handler)),
        });

        data.chain(calls)
    }
}
