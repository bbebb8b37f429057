// Copyright (c) 2024 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Device memory sizes, alignments and bindings.
//!
//! Device memory itself is allocated and owned outside of this crate. Resources only record
//! *where* in an allocation they live, through a [`ResourceMemory`]. The binder that handed out
//! the allocation is responsible for keeping it alive for as long as any resource bound to it is
//! in use.

pub use self::layout::{DeviceAlignment, DeviceLayout};
use crate::DeviceSize;

mod layout;

/// Opaque identifier of a device memory allocation that lives outside of this crate.
///
/// The value is only ever compared and written into descriptors as the base address of the
/// allocation; it is never dereferenced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AllocationHandle {
    /// Device address of the start of the allocation.
    pub device_address: DeviceSize,

    /// Total size of the allocation in bytes.
    pub size: DeviceSize,
}

/// A non-owning binding of a resource to a range of an externally owned allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResourceMemory {
    allocation: AllocationHandle,
    offset: DeviceSize,
    size: DeviceSize,
}

impl ResourceMemory {
    /// Binds `size` bytes starting at `offset` within `allocation`.
    ///
    /// Returns [`None`] if the range doesn't fit within the allocation.
    #[inline]
    pub fn new(
        allocation: AllocationHandle,
        offset: DeviceSize,
        size: DeviceSize,
    ) -> Option<Self> {
        let end = offset.checked_add(size)?;

        (end <= allocation.size).then_some(ResourceMemory {
            allocation,
            offset,
            size,
        })
    }

    /// Binds the whole of `allocation`.
    #[inline]
    pub fn whole(allocation: AllocationHandle) -> Self {
        ResourceMemory {
            allocation,
            offset: 0,
            size: allocation.size,
        }
    }

    /// Returns the allocation the resource is bound to.
    #[inline]
    pub fn allocation(&self) -> AllocationHandle {
        self.allocation
    }

    /// Returns the offset of the resource within the allocation.
    #[inline]
    pub fn offset(&self) -> DeviceSize {
        self.offset
    }

    /// Returns the number of bytes reserved for the resource.
    #[inline]
    pub fn size(&self) -> DeviceSize {
        self.size
    }

    /// Returns the device address of byte `offset` of the resource.
    #[inline]
    pub fn device_address(&self, offset: DeviceSize) -> DeviceSize {
        self.allocation.device_address + self.offset + offset
    }
}

/// Rounds `val` up to the nearest multiple of `alignment`.
#[inline(always)]
pub(crate) const fn align_up(val: DeviceSize, alignment: DeviceAlignment) -> DeviceSize {
    align_down(val.wrapping_add(alignment.as_devicesize() - 1), alignment)
}

/// Rounds `val` down to the nearest multiple of `alignment`.
#[inline(always)]
pub(crate) const fn align_down(val: DeviceSize, alignment: DeviceAlignment) -> DeviceSize {
    val & !(alignment.as_devicesize() - 1)
}

/// Divides `val` by `divisor`, rounding up.
#[inline(always)]
pub(crate) const fn div_round_up(val: u32, divisor: u32) -> u32 {
    val.div_ceil(divisor)
}
