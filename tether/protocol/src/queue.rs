//! Fixed-capacity circular byte queue living at a fixed address.
//!
//! ```text
//! +0   tag   [u8; 4]   "rxq\0" / "txq\0", lets a memory dump find the queue
//! +4   head  u32       next byte to pop
//! +8   tail  u32       next slot to push into
//! +12  buf   [u8; C]
//! ```
//!
//! `head == tail` means empty, so at most `C - 1` bytes are ever resident.
//!
//! [`RingQueue::push`] and [`RingQueue::pop`] do not look at the occupancy: callers must check
//! [`RingQueue::avail`] / [`RingQueue::size`] first. Pushing into a full queue overwrites unread
//! data, popping an empty one returns stale bytes. Index arithmetic wraps, so corrupted `head` /
//! `tail` words give garbage, never a panic.

use crate::memory::{Address, AddressSpace};

/// Byte capacity `C` of the queues shipped in every build.
pub const QUEUE_CAPACITY: u32 = 4096;

pub const TAG_LEN: u32 = 4;

const HEAD_OFFSET: u32 = 4;
const TAIL_OFFSET: u32 = 8;
const BUF_OFFSET: u32 = 12;

/// View of a queue at `base` inside some [`AddressSpace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingQueue {
    base: Address,
    capacity: u32,
}

impl RingQueue {
    /// Queue with the standard [`QUEUE_CAPACITY`].
    pub const fn new(base: Address) -> Self {
        Self::with_capacity(base, QUEUE_CAPACITY)
    }

    /// `capacity` must be at least 2, otherwise the queue can never hold a byte.
    pub const fn with_capacity(base: Address, capacity: u32) -> Self {
        Self { base, capacity }
    }

    pub const fn base(&self) -> Address {
        self.base
    }

    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Number of bytes the queue occupies in memory, header included.
    pub const fn footprint(&self) -> u32 {
        BUF_OFFSET + self.capacity
    }

    /// Address of the first byte after this queue. Wraps at the top of the address space, see
    /// [`SessionLayout::footprint`](crate::SessionLayout::footprint) to check a placement.
    pub const fn end(&self) -> Address {
        self.at(self.footprint())
    }

    const fn at(&self, offset: u32) -> Address {
        self.base.wrapping_add(offset)
    }

    pub fn tag<M: AddressSpace>(&self, memory: &M) -> [u8; 4] {
        let mut tag = [0; TAG_LEN as usize];
        memory.read_bytes(self.base, &mut tag);
        tag
    }

    pub fn write_tag<M: AddressSpace>(&self, memory: &mut M, tag: &[u8; 4]) {
        memory.write_bytes(self.base, tag);
    }

    pub fn head<M: AddressSpace>(&self, memory: &M) -> u32 {
        memory.read32(self.at(HEAD_OFFSET))
    }

    pub fn tail<M: AddressSpace>(&self, memory: &M) -> u32 {
        memory.read32(self.at(TAIL_OFFSET))
    }

    /// Empties the queue (`head = tail = 0`). The buffer contents are left as they are.
    pub fn init<M: AddressSpace>(&self, memory: &mut M) {
        memory.write32(self.at(HEAD_OFFSET), 0);
        memory.write32(self.at(TAIL_OFFSET), 0);
    }

    /// Resident bytes, `(tail - head + C) mod C`.
    pub fn size<M: AddressSpace>(&self, memory: &M) -> u32 {
        let head = self.head(memory);
        let tail = self.tail(memory);

        tail.wrapping_add(self.capacity).wrapping_sub(head) % self.capacity
    }

    /// Free bytes, `C - size - 1`.
    pub fn avail<M: AddressSpace>(&self, memory: &M) -> u32 {
        self.capacity.wrapping_sub(self.size(memory)).wrapping_sub(1)
    }

    /// Writes `byte` at `tail` and advances it.
    ///
    /// Caller must have checked `avail(memory) >= 1`.
    pub fn push<M: AddressSpace>(&self, memory: &mut M, byte: u8) {
        let tail = self.tail(memory);
        memory.write8(self.at(BUF_OFFSET.wrapping_add(tail)), byte);
        memory.write32(self.at(TAIL_OFFSET), tail.wrapping_add(1) % self.capacity);
    }

    /// Reads the byte at `head` and advances it.
    ///
    /// Caller must have checked `size(memory) >= 1`.
    pub fn pop<M: AddressSpace>(&self, memory: &mut M) -> u8 {
        let head = self.head(memory);
        let byte = memory.read8(self.at(BUF_OFFSET.wrapping_add(head)));
        memory.write32(self.at(HEAD_OFFSET), head.wrapping_add(1) % self.capacity);
        byte
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use rstest::{fixture, rstest};

    use super::*;
    use crate::memory::FlatMemory;

    const BASE: Address = 0x0020_0000;

    #[fixture]
    fn memory() -> FlatMemory {
        FlatMemory::new(BASE, RingQueue::new(BASE).footprint() as usize)
    }

    #[rstest]
    fn init_leaves_an_empty_queue(mut memory: FlatMemory) {
        let queue = RingQueue::new(BASE);
        memory.write32(BASE + HEAD_OFFSET, 17);
        memory.write32(BASE + TAIL_OFFSET, 300);

        queue.init(&mut memory);

        assert_eq!(queue.size(&memory), 0);
        assert_eq!(queue.avail(&memory), QUEUE_CAPACITY - 1);
    }

    #[rstest]
    fn tag_sits_in_front_of_the_indices(mut memory: FlatMemory) {
        let queue = RingQueue::new(BASE);
        queue.write_tag(&mut memory, b"rxq\0");

        assert_eq!(&memory.as_bytes()[..4], b"rxq\0");
        assert_eq!(queue.tag(&memory), *b"rxq\0");
        assert_eq!(queue.end(), BASE + 12 + QUEUE_CAPACITY);
    }

    #[rstest]
    fn fills_up_to_capacity_minus_one(mut memory: FlatMemory) {
        let queue = RingQueue::new(BASE);
        queue.init(&mut memory);

        while queue.avail(&memory) > 0 {
            queue.push(&mut memory, 0xaa);
        }

        assert_eq!(queue.size(&memory), QUEUE_CAPACITY - 1);
    }

    /// Interleaves pushes and pops on a tiny queue so the indices wrap many times, checking FIFO
    /// order and `avail + size == C - 1` after every step.
    #[rstest]
    #[case(2)]
    #[case(7)]
    #[case(16)]
    fn wraps_around_in_fifo_order(#[case] capacity: u32) {
        let queue = RingQueue::with_capacity(0x40, capacity);
        let mut memory = FlatMemory::new(0x40, queue.footprint() as usize);
        queue.init(&mut memory);

        let mut model = VecDeque::new();
        let mut next = 0u8;

        for round in 0..200u32 {
            let pushes = round % 5;
            for _ in 0..pushes {
                if queue.avail(&memory) == 0 {
                    break;
                }
                queue.push(&mut memory, next);
                model.push_back(next);
                next = next.wrapping_add(1);
            }

            let pops = (round * 3) % 4;
            for _ in 0..pops {
                if queue.size(&memory) == 0 {
                    break;
                }
                assert_eq!(Some(queue.pop(&mut memory)), model.pop_front());
            }

            let size = queue.size(&memory);
            assert_eq!(size as usize, model.len());
            assert!(size < capacity);
            assert_eq!(queue.avail(&memory) + size, capacity - 1);
        }
    }

    #[rstest]
    fn corrupted_indices_wrap_instead_of_panicking(mut memory: FlatMemory) {
        let queue = RingQueue::new(BASE);
        memory.write32(BASE + HEAD_OFFSET, u32::MAX);
        memory.write32(BASE + TAIL_OFFSET, u32::MAX);

        queue.push(&mut memory, 0x11);
        let _ = queue.pop(&mut memory);
        let _ = queue.avail(&memory);

        assert!(queue.head(&memory) < QUEUE_CAPACITY);
        assert!(queue.tail(&memory) < QUEUE_CAPACITY);
    }
}
