//! Typed raw access to the instrumented process' address space.
//!
//! [`AddressSpace`] is deliberately infallible and unchecked: it is a trusted primitive, and the
//! addresses it receives come from fixed tables or from the layout, never from untrusted input.

use std::ops::Range;

use tracing::warn;

/// An address inside the instrumented (32-bit) process.
pub type Address = u32;

/// Read/write of 8/16/32-bit values at raw addresses.
///
/// Multi-byte values use the byte order of the instrumented process (little-endian for every
/// target we know of). Implementations do no alignment checking.
pub trait AddressSpace {
    fn read8(&self, address: Address) -> u8;

    fn read16(&self, address: Address) -> u16;

    fn read32(&self, address: Address) -> u32;

    fn write8(&mut self, address: Address, value: u8);

    fn write16(&mut self, address: Address, value: u16);

    fn write32(&mut self, address: Address, value: u32);

    /// Fills `buf` with the bytes starting at `address`.
    fn read_bytes(&self, address: Address, buf: &mut [u8]) {
        for (offset, byte) in (0u32..).zip(buf.iter_mut()) {
            *byte = self.read8(address.wrapping_add(offset));
        }
    }

    /// Copies `bytes` to memory starting at `address`.
    fn write_bytes(&mut self, address: Address, bytes: &[u8]) {
        for (offset, byte) in (0u32..).zip(bytes) {
            self.write8(address.wrapping_add(offset), *byte);
        }
    }
}

impl<M: AddressSpace + ?Sized> AddressSpace for &mut M {
    fn read8(&self, address: Address) -> u8 {
        (**self).read8(address)
    }

    fn read16(&self, address: Address) -> u16 {
        (**self).read16(address)
    }

    fn read32(&self, address: Address) -> u32 {
        (**self).read32(address)
    }

    fn write8(&mut self, address: Address, value: u8) {
        (**self).write8(address, value)
    }

    fn write16(&mut self, address: Address, value: u16) {
        (**self).write16(address, value)
    }

    fn write32(&mut self, address: Address, value: u32) {
        (**self).write32(address, value)
    }
}

/// A contiguous block of little-endian memory mapped at `base`.
///
/// Used by tests and by host tooling that works on a copy of the instrumented process' RAM.
/// Accesses outside of the block read as zero and writes to it are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatMemory {
    base: Address,
    bytes: Vec<u8>,
}

impl FlatMemory {
    /// Zero-filled block of `len` bytes at `base`.
    pub fn new(base: Address, len: usize) -> Self {
        Self {
            base,
            bytes: vec![0; len],
        }
    }

    /// Wraps an existing memory image (e.g. a RAM dump) mapped at `base`.
    pub fn from_image(base: Address, bytes: Vec<u8>) -> Self {
        Self { base, bytes }
    }

    pub fn base(&self) -> Address {
        self.base
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_image(self) -> Vec<u8> {
        self.bytes
    }

    fn span(&self, address: Address, len: usize) -> Option<Range<usize>> {
        let start = usize::try_from(address.checked_sub(self.base)?).ok()?;
        let end = start.checked_add(len)?;
        (end <= self.bytes.len()).then_some(start..end)
    }

    fn load<const N: usize>(&self, address: Address) -> [u8; N] {
        self.span(address, N)
            .and_then(|span| self.bytes.get(span))
            .and_then(|bytes| bytes.try_into().ok())
            .unwrap_or_else(|| {
                warn!("read outside of memory at {address:#010x}");
                [0; N]
            })
    }

    fn store(&mut self, address: Address, value: &[u8]) {
        match self
            .span(address, value.len())
            .and_then(|span| self.bytes.get_mut(span))
        {
            Some(slot) => slot.copy_from_slice(value),
            None => warn!("dropped write outside of memory at {address:#010x}"),
        }
    }
}

impl AddressSpace for FlatMemory {
    fn read8(&self, address: Address) -> u8 {
        u8::from_le_bytes(self.load(address))
    }

    fn read16(&self, address: Address) -> u16 {
        u16::from_le_bytes(self.load(address))
    }

    fn read32(&self, address: Address) -> u32 {
        u32::from_le_bytes(self.load(address))
    }

    fn write8(&mut self, address: Address, value: u8) {
        self.store(address, &value.to_le_bytes())
    }

    fn write16(&mut self, address: Address, value: u16) {
        self.store(address, &value.to_le_bytes())
    }

    fn write32(&mut self, address: Address, value: u32) {
        self.store(address, &value.to_le_bytes())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn words_are_little_endian() {
        let mut memory = FlatMemory::new(0x0010_0000, 16);
        memory.write32(0x0010_0004, 0x1122_3344);

        assert_eq!(memory.read8(0x0010_0004), 0x44);
        assert_eq!(memory.read16(0x0010_0006), 0x1122);
        assert_eq!(&memory.as_bytes()[4..8], &[0x44u8, 0x33, 0x22, 0x11]);
    }

    #[rstest]
    #[case::below_base(0x000f_fffc)]
    #[case::straddles_end(0x0010_000e)]
    #[case::past_end(0x0010_0100)]
    fn out_of_range_access_is_inert(#[case] address: Address) {
        let mut memory = FlatMemory::new(0x0010_0000, 16);
        memory.write32(address, 0xdead_beef);

        assert_eq!(memory.read32(address), 0);
        assert!(memory.as_bytes().iter().all(|byte| *byte == 0));
    }

    #[rstest]
    fn byte_slices_go_through_single_bytes() {
        let mut memory = FlatMemory::new(0x100, 8);
        memory.write_bytes(0x102, b"abc");

        let mut out = [0u8; 4];
        memory.read_bytes(0x101, &mut out);
        assert_eq!(&out, b"\0abc");
    }
}
