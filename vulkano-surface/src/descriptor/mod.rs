// Copyright (c) 2024 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Memory for hardware descriptors.
//!
//! Every descriptor built by an image view or buffer view lives in a [`DescriptorSlot`]: a small
//! region of host-visible memory handed out by a [`DescriptorAllocator`]. The allocator is a
//! shared, mutable resource; it must hand out non-overlapping slots and provide its own
//! synchronization, since views are created and destroyed from any thread.
//!
//! [`DescriptorPool`] is the default allocator. It carves a fixed arena into equally sized slots
//! and keeps the free slots in a lock-free queue, so allocating and freeing never blocks. Only
//! writing and reading the contents of a slot take a lock.

pub use self::state::{
    fill_buffer_image_param, fill_buffer_surface_state, fill_image_param, fill_surface_state,
    BufferSurfaceStateInfo, ChannelSelect, ImageParam, SurfaceState, SurfaceStateInfo,
    SurfaceType, SurfaceView, SURFACE_STATE_SIZE,
};
use crate::{
    memory::{align_up, DeviceAlignment, DeviceLayout},
    DeviceSize, NonExhaustive, ValidationError,
};
use crossbeam_queue::ArrayQueue;
use parking_lot::Mutex;
use std::{
    error::Error,
    fmt::{Debug, Display, Error as FmtError, Formatter},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

mod state;

/// Hands out, and takes back, memory for hardware descriptors.
///
/// # Safety
///
/// - Slots returned by `allocate` must not overlap any other slot that hasn't been freed.
/// - All methods must be safe to call concurrently from multiple threads.
pub unsafe trait DescriptorAllocator: Debug + Send + Sync {
    /// Allocates a slot that can hold a descriptor of the given `layout`.
    fn allocate(&self, layout: DeviceLayout) -> Result<DescriptorSlot, DescriptorPoolError>;

    /// Returns `slot` to the allocator.
    fn free(&self, slot: DescriptorSlot);

    /// Copies `data` to the start of `slot`.
    ///
    /// # Panics
    ///
    /// - Panics if `data` is larger than `slot`.
    fn write(&self, slot: &DescriptorSlot, data: &[u8]);

    /// Makes the contents of `slot` visible to the device on platforms without a coherent
    /// last-level cache.
    fn flush(&self, slot: &DescriptorSlot);

    /// Returns a copy of the contents of `slot`.
    fn read(&self, slot: &DescriptorSlot) -> Vec<u8>;
}

/// A region of descriptor memory owned by one descriptor.
///
/// This type is deliberately not `Clone`: a slot is freed exactly once, by whoever owns it.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct DescriptorSlot {
    index: DeviceSize,
    offset: DeviceSize,
    size: DeviceSize,
}

impl DescriptorSlot {
    /// Creates a new `DescriptorSlot`. This is meant for implementations of
    /// [`DescriptorAllocator`].
    #[inline]
    pub const fn new(index: DeviceSize, offset: DeviceSize, size: DeviceSize) -> Self {
        DescriptorSlot {
            index,
            offset,
            size,
        }
    }

    /// Returns the allocator-specific index of the slot.
    #[inline]
    pub const fn index(&self) -> DeviceSize {
        self.index
    }

    /// Returns the offset of the slot within the descriptor memory, which is the address that
    /// the device uses to refer to the descriptor.
    #[inline]
    pub const fn offset(&self) -> DeviceSize {
        self.offset
    }

    /// Returns the size of the slot.
    #[inline]
    pub const fn size(&self) -> DeviceSize {
        self.size
    }
}

/// The usage classes that a view builds descriptors for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DescriptorClass {
    /// Read through the sampler.
    Sample,

    /// Written as a color render target.
    RenderTarget,

    /// Read and written through storage access.
    Storage,
}

impl DescriptorClass {
    /// Every class, in the order descriptors are built.
    pub const ALL: [DescriptorClass; 3] = [
        DescriptorClass::Sample,
        DescriptorClass::RenderTarget,
        DescriptorClass::Storage,
    ];

    const fn index(self) -> usize {
        match self {
            DescriptorClass::Sample => 0,
            DescriptorClass::RenderTarget => 1,
            DescriptorClass::Storage => 2,
        }
    }
}

/// The layout of a slot holding one [`SurfaceState`].
pub const SURFACE_STATE_LAYOUT: DeviceLayout =
    match DeviceLayout::from_size_alignment(SURFACE_STATE_SIZE, 64) {
        Some(layout) => layout,
        None => unreachable!(),
    };

/// The descriptors of one view, at most one per [`DescriptorClass`].
///
/// Every slot is returned to its allocator when this is dropped, so a view that fails halfway
/// through building its descriptors leaves nothing allocated behind.
#[derive(Debug)]
pub struct DescriptorSlots {
    allocator: Arc<dyn DescriptorAllocator>,
    slots: [Option<DescriptorSlot>; 3],
}

impl DescriptorSlots {
    pub(crate) fn new(allocator: Arc<dyn DescriptorAllocator>) -> Self {
        DescriptorSlots {
            allocator,
            slots: [None, None, None],
        }
    }

    /// Allocates a slot for `class`, writes `state` into it and makes it visible to the device.
    pub(crate) fn build(
        &mut self,
        class: DescriptorClass,
        state: &SurfaceState,
        has_llc: bool,
    ) -> Result<(), DescriptorPoolError> {
        let slot = self.allocator.allocate(SURFACE_STATE_LAYOUT)?;
        self.allocator.write(&slot, bytemuck::bytes_of(state));

        if !has_llc {
            self.allocator.flush(&slot);
        }

        if let Some(old) = self.slots[class.index()].replace(slot) {
            self.allocator.free(old);
        }

        Ok(())
    }

    /// Returns the slot of `class`, if its descriptor was built.
    #[inline]
    pub fn get(&self, class: DescriptorClass) -> Option<&DescriptorSlot> {
        self.slots[class.index()].as_ref()
    }

    /// Returns the size of the slot of `class`, or zero if its descriptor wasn't built.
    #[inline]
    pub fn size(&self, class: DescriptorClass) -> DeviceSize {
        self.get(class).map_or(0, DescriptorSlot::size)
    }

    /// Reads back the descriptor of `class`, if it was built.
    pub fn read(&self, class: DescriptorClass) -> Option<SurfaceState> {
        let slot = self.get(class)?;
        let bytes = self.allocator.read(slot);

        bytes
            .get(..SURFACE_STATE_SIZE as usize)
            .map(bytemuck::pod_read_unaligned)
    }

    /// Returns the classes whose descriptors were built.
    pub fn classes(&self) -> impl Iterator<Item = DescriptorClass> + '_ {
        DescriptorClass::ALL
            .into_iter()
            .filter(|&class| self.get(class).is_some())
    }
}

impl Drop for DescriptorSlots {
    fn drop(&mut self) {
        for slot in self.slots.iter_mut().filter_map(Option::take) {
            self.allocator.free(slot);
        }
    }
}

/// A [`DescriptorAllocator`] made of equally sized slots.
#[derive(Debug)]
pub struct DescriptorPool {
    slot_size: DeviceSize,
    slot_alignment: DeviceAlignment,
    // Unsorted list of free slot indices.
    free_list: ArrayQueue<DeviceSize>,
    memory: Mutex<Box<[u8]>>,
    flush_count: AtomicU64,
}

impl DescriptorPool {
    /// Creates a new `DescriptorPool`.
    pub fn new(
        create_info: DescriptorPoolCreateInfo,
    ) -> Result<Arc<DescriptorPool>, Box<ValidationError>> {
        create_info.validate()?;

        let DescriptorPoolCreateInfo {
            slot_size,
            slot_alignment,
            slot_count,
            _ne: _,
        } = create_info;

        // Checked by `validate`.
        let slot_alignment = DeviceAlignment::new(slot_alignment).unwrap();
        let slot_size = align_up(slot_size, slot_alignment);

        let free_list = ArrayQueue::new(slot_count as usize);
        for index in 0..slot_count as DeviceSize {
            free_list.push(index).unwrap();
        }

        let memory = vec![0; (slot_size * slot_count as DeviceSize) as usize].into_boxed_slice();

        Ok(Arc::new(DescriptorPool {
            slot_size,
            slot_alignment,
            free_list,
            memory: Mutex::new(memory),
            flush_count: AtomicU64::new(0),
        }))
    }

    /// Returns the size of a slot. Can be bigger than the requested size due to alignment.
    #[inline]
    pub fn slot_size(&self) -> DeviceSize {
        self.slot_size
    }

    /// Returns the total number of slots.
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.free_list.capacity()
    }

    /// Returns the number of free slots.
    #[inline]
    pub fn free_count(&self) -> usize {
        self.free_list.len()
    }

    /// Returns how many times a slot has been flushed.
    #[inline]
    pub fn flush_count(&self) -> u64 {
        self.flush_count.load(Ordering::Acquire)
    }

    fn range(&self, slot: &DescriptorSlot) -> std::ops::Range<usize> {
        let start = slot.offset as usize;

        start..start + slot.size as usize
    }
}

unsafe impl DescriptorAllocator for DescriptorPool {
    /// Allocates a slot.
    ///
    /// # Errors
    ///
    /// - Returns [`SlotSizeExceeded`] if `layout` is larger than a slot.
    /// - Returns [`OutOfPoolMemory`] if there are no free slots, or if the first free slot can't
    ///   satisfy the alignment of `layout`.
    ///
    /// [`SlotSizeExceeded`]: DescriptorPoolError::SlotSizeExceeded
    /// [`OutOfPoolMemory`]: DescriptorPoolError::OutOfPoolMemory
    fn allocate(&self, layout: DeviceLayout) -> Result<DescriptorSlot, DescriptorPoolError> {
        let size = layout.size();

        if size > self.slot_size {
            return Err(DescriptorPoolError::SlotSizeExceeded);
        }

        let alignment = Ord::max(layout.alignment(), self.slot_alignment);
        let index = self
            .free_list
            .pop()
            .ok_or(DescriptorPoolError::OutOfPoolMemory)?;

        let slot_offset = index * self.slot_size;
        let offset = align_up(slot_offset, alignment);

        if offset + size > slot_offset + self.slot_size {
            let _ = self.free_list.push(index);

            return Err(DescriptorPoolError::OutOfPoolMemory);
        }

        log::trace!("allocated descriptor slot {} at offset {}", index, offset);

        Ok(DescriptorSlot {
            index,
            offset,
            size: self.slot_size - (offset - slot_offset),
        })
    }

    fn free(&self, slot: DescriptorSlot) {
        log::trace!("freed descriptor slot {}", slot.index);

        if self.free_list.push(slot.index).is_err() {
            log::error!("descriptor slot {} freed into a full pool", slot.index);
        }
    }

    fn write(&self, slot: &DescriptorSlot, data: &[u8]) {
        assert!(data.len() as DeviceSize <= slot.size);

        let range = self.range(slot);
        let mut memory = self.memory.lock();
        memory[range.start..range.start + data.len()].copy_from_slice(data);
    }

    fn flush(&self, slot: &DescriptorSlot) {
        log::trace!("flushed descriptor slot {}", slot.index);

        self.flush_count.fetch_add(1, Ordering::AcqRel);
    }

    fn read(&self, slot: &DescriptorSlot) -> Vec<u8> {
        let range = self.range(slot);

        self.memory.lock()[range].to_vec()
    }
}

/// Parameters to create a new `DescriptorPool`.
#[derive(Clone, Debug)]
pub struct DescriptorPoolCreateInfo {
    /// The size of a slot, in bytes. This is rounded up to `slot_alignment`.
    ///
    /// The default value is `64`, the size of a [`SurfaceState`].
    pub slot_size: DeviceSize,

    /// The alignment of every slot. Must be a power of two.
    ///
    /// The default value is `64`.
    pub slot_alignment: DeviceSize,

    /// The number of slots.
    ///
    /// The default value is `4096`.
    pub slot_count: u32,

    pub _ne: NonExhaustive,
}

impl Default for DescriptorPoolCreateInfo {
    #[inline]
    fn default() -> Self {
        Self {
            slot_size: SURFACE_STATE_SIZE,
            slot_alignment: 64,
            slot_count: 4096,
            _ne: NonExhaustive(()),
        }
    }
}

impl DescriptorPoolCreateInfo {
    pub(crate) fn validate(&self) -> Result<(), Box<ValidationError>> {
        let &Self {
            slot_size,
            slot_alignment,
            slot_count,
            _ne: _,
        } = self;

        if slot_size == 0 {
            return Err(ValidationError::new("slot_size", "is zero"));
        }

        if DeviceAlignment::new(slot_alignment).is_none() {
            return Err(ValidationError::new(
                "slot_alignment",
                "is not a power of two",
            ));
        }

        if slot_count == 0 {
            return Err(ValidationError::new("slot_count", "is zero"));
        }

        Ok(())
    }
}

/// Error that can be returned when allocating a descriptor slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DescriptorPoolError {
    /// There are no free slots left, or the free slot can't satisfy the alignment.
    OutOfPoolMemory,

    /// The requested size is larger than a slot.
    SlotSizeExceeded,
}

impl Error for DescriptorPoolError {}

impl Display for DescriptorPoolError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        let msg = match self {
            Self::OutOfPoolMemory => "out of descriptor pool memory",
            Self::SlotSizeExceeded => "the requested size is larger than a descriptor slot",
        };

        f.write_str(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn pool(slot_count: u32) -> Arc<DescriptorPool> {
        DescriptorPool::new(DescriptorPoolCreateInfo {
            slot_count,
            ..Default::default()
        })
        .unwrap()
    }

    fn layout(size: DeviceSize) -> DeviceLayout {
        DeviceLayout::from_size_alignment(size, 64).unwrap()
    }

    #[test]
    fn pool_allocator_capacity() {
        let pool = pool(4);
        let mut slots = Vec::new();

        for _ in 0..4 {
            slots.push(pool.allocate(layout(64)).unwrap());
        }

        assert_eq!(pool.free_count(), 0);
        assert_eq!(
            pool.allocate(layout(64)),
            Err(DescriptorPoolError::OutOfPoolMemory),
        );

        pool.free(slots.pop().unwrap());
        assert_eq!(pool.free_count(), 1);
        assert!(pool.allocate(layout(64)).is_ok());
    }

    #[test]
    fn slot_size_exceeded() {
        let pool = pool(4);

        assert_eq!(
            pool.allocate(layout(65)),
            Err(DescriptorPoolError::SlotSizeExceeded),
        );
        assert_eq!(pool.free_count(), 4);
    }

    #[test]
    fn over_aligned_request_is_rejected_without_leaking() {
        let pool = pool(4);
        // Slot 0 is at offset 0, which is aligned to anything; the next slot popped isn't.
        let first = pool
            .allocate(DeviceLayout::from_size_alignment(64, 128).unwrap())
            .unwrap();
        assert_eq!(first.offset(), 0);

        assert_eq!(
            pool.allocate(DeviceLayout::from_size_alignment(64, 128).unwrap()),
            Err(DescriptorPoolError::OutOfPoolMemory),
        );
        assert_eq!(pool.free_count(), 3);
    }

    #[test]
    fn write_then_read() {
        let pool = pool(2);
        let a = pool.allocate(layout(64)).unwrap();
        let b = pool.allocate(layout(64)).unwrap();

        pool.write(&a, &[0xaa; 16]);
        pool.write(&b, &[0xbb; 64]);

        let contents = pool.read(&a);
        assert_eq!(contents.len(), 64);
        assert_eq!(&contents[..16], &[0xaa; 16]);
        assert_eq!(&contents[16..], &[0; 48]);
        assert_eq!(pool.read(&b), vec![0xbb; 64]);

        pool.flush(&a);
        pool.flush(&b);
        assert_eq!(pool.flush_count(), 2);
    }

    #[test]
    fn write_larger_than_slot() {
        let pool = pool(1);
        let slot = pool.allocate(layout(64)).unwrap();

        assert_should_panic!({
            pool.write(&slot, &[0; 65]);
        });
    }

    #[test]
    fn pool_allocator_concurrent() {
        const THREADS: u32 = 8;
        const PER_THREAD: u32 = 32;

        let pool = pool(THREADS * PER_THREAD);

        let mut offsets: Vec<DeviceSize> = thread::scope(|scope| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    scope.spawn(|| {
                        (0..PER_THREAD)
                            .map(|_| pool.allocate(layout(64)).unwrap())
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|handle| handle.join().unwrap())
                .map(|slot| slot.offset())
                .collect()
        });

        offsets.sort_unstable();
        offsets.dedup();
        assert_eq!(offsets.len(), (THREADS * PER_THREAD) as usize);
        assert_eq!(pool.free_count(), 0);
    }

    #[test]
    fn slots_are_freed_on_drop() {
        let pool = pool(4);
        let mut slots = DescriptorSlots::new(pool.clone());

        slots
            .build(DescriptorClass::Sample, &SurfaceState::default(), true)
            .unwrap();
        slots
            .build(
                DescriptorClass::Storage,
                &SurfaceState {
                    width: 17,
                    ..Default::default()
                },
                false,
            )
            .unwrap();

        assert_eq!(pool.free_count(), 2);
        assert_eq!(pool.flush_count(), 1);
        assert_eq!(slots.size(DescriptorClass::Sample), 64);
        assert_eq!(slots.size(DescriptorClass::RenderTarget), 0);
        assert_eq!(slots.read(DescriptorClass::Storage).unwrap().width, 17);
        assert_eq!(
            slots.classes().collect::<Vec<_>>(),
            [DescriptorClass::Sample, DescriptorClass::Storage],
        );

        drop(slots);
        assert_eq!(pool.free_count(), 4);
    }

    #[test]
    fn invalid_create_info() {
        assert!(DescriptorPool::new(DescriptorPoolCreateInfo {
            slot_alignment: 48,
            ..Default::default()
        })
        .is_err());
        assert!(DescriptorPool::new(DescriptorPoolCreateInfo {
            slot_count: 0,
            ..Default::default()
        })
        .is_err());
    }
}
