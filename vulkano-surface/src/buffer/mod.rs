// Copyright (c) 2024 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Location in memory that contains data.
//!
//! A buffer is a linear range of externally owned memory. It has no layout of its own; its only
//! use in this crate is to be viewed through a [`BufferView`](view::BufferView), which builds the
//! descriptors that shaders use to read and write it as an array of texels.

use crate::{
    device::Device, macros::vulkan_bitflags, memory::ResourceMemory, DeviceSize, NonExhaustive,
    SurfaceError, ValidationError,
};
use std::sync::Arc;

pub mod view;

/// A linear range of memory with a declared usage.
///
/// The buffer doesn't own its memory: whoever bound it is responsible for keeping it alive for as
/// long as the buffer, and any view of it, is in use.
#[derive(Debug)]
pub struct Buffer {
    device: Arc<Device>,
    size: DeviceSize,
    usage: BufferUsage,
    memory: ResourceMemory,
}

impl Buffer {
    /// Creates a new `Buffer` that lives in `memory`.
    ///
    /// # Errors
    ///
    /// - Returns [`SurfaceError::InvalidUsage`] if `create_info` is not valid, or if `memory` is
    ///   smaller than `create_info.size`.
    pub fn new(
        device: Arc<Device>,
        create_info: BufferCreateInfo,
        memory: ResourceMemory,
    ) -> Result<Arc<Buffer>, SurfaceError> {
        create_info
            .validate()
            .map_err(|err| SurfaceError::InvalidUsage(err.add_context("create_info")))?;

        let BufferCreateInfo {
            size,
            usage,
            _ne: _,
        } = create_info;

        if memory.size() < size {
            return Err(SurfaceError::InvalidUsage(ValidationError::new(
                "memory.size()",
                format!(
                    "is {}, which is less than the {} bytes of the buffer",
                    memory.size(),
                    size,
                ),
            )));
        }

        Ok(Arc::new(Buffer {
            device,
            size,
            usage,
            memory,
        }))
    }

    /// Returns the device that owns the buffer.
    #[inline]
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    /// Returns the size of the buffer in bytes.
    #[inline]
    pub fn size(&self) -> DeviceSize {
        self.size
    }

    /// Returns the usage the buffer was created with.
    #[inline]
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    /// Returns the memory that the buffer lives in.
    #[inline]
    pub fn memory(&self) -> &ResourceMemory {
        &self.memory
    }
}

/// Parameters to create a new `Buffer`.
#[derive(Clone, Debug)]
pub struct BufferCreateInfo {
    /// The size in bytes of the buffer.
    ///
    /// The default value is `0`, which must be overridden.
    pub size: DeviceSize,

    /// How the buffer is going to be used.
    ///
    /// The default value is empty, which must be overridden.
    pub usage: BufferUsage,

    pub _ne: NonExhaustive,
}

impl Default for BufferCreateInfo {
    #[inline]
    fn default() -> Self {
        Self {
            size: 0,
            usage: BufferUsage::empty(),
            _ne: NonExhaustive(()),
        }
    }
}

impl BufferCreateInfo {
    pub(crate) fn validate(&self) -> Result<(), Box<ValidationError>> {
        let &Self {
            size,
            usage,
            _ne: _,
        } = self;

        if size == 0 {
            return Err(ValidationError::new("size", "is zero"));
        }

        if usage.is_empty() {
            return Err(ValidationError::new("usage", "is empty"));
        }

        Ok(())
    }
}

vulkan_bitflags! {
    /// Describes how a buffer is going to be used. This is **not** just an optimization.
    ///
    /// If you try to use a buffer in a way that you didn't declare, an error will be returned.
    BufferUsage = BufferUsageFlags(u32);

    /// The buffer can be used as a source for transfer, blit, resolve and clear commands.
    TRANSFER_SRC = TRANSFER_SRC,

    /// The buffer can be used as a destination for transfer, blit, resolve and clear commands.
    TRANSFER_DST = TRANSFER_DST,

    /// The buffer can be used as a uniform texel buffer in a descriptor set.
    UNIFORM_TEXEL_BUFFER = UNIFORM_TEXEL_BUFFER,

    /// The buffer can be used as a storage texel buffer in a descriptor set.
    STORAGE_TEXEL_BUFFER = STORAGE_TEXEL_BUFFER,

    /// The buffer can be used as a uniform buffer in a descriptor set.
    UNIFORM_BUFFER = UNIFORM_BUFFER,

    /// The buffer can be used as a storage buffer in a descriptor set.
    STORAGE_BUFFER = STORAGE_BUFFER,

    /// The buffer can be used as an index buffer.
    INDEX_BUFFER = INDEX_BUFFER,

    /// The buffer can be used as a vertex or instance buffer.
    VERTEX_BUFFER = VERTEX_BUFFER,

    /// The buffer can be used as an indirect buffer.
    INDIRECT_BUFFER = INDIRECT_BUFFER,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::AllocationHandle;

    fn memory(size: DeviceSize) -> ResourceMemory {
        ResourceMemory::whole(AllocationHandle {
            device_address: 0x4000,
            size,
        })
    }

    #[test]
    fn create() {
        let device = device!();
        let buffer = Buffer::new(
            device,
            BufferCreateInfo {
                size: 128,
                usage: BufferUsage::UNIFORM_TEXEL_BUFFER,
                ..Default::default()
            },
            memory(256),
        )
        .unwrap();

        assert_eq!(buffer.size(), 128);
        assert_eq!(buffer.usage(), BufferUsage::UNIFORM_TEXEL_BUFFER);
        assert_eq!(buffer.memory().device_address(0), 0x4000);
    }

    #[test]
    fn invalid_create_info() {
        let device = device!();

        assert!(matches!(
            Buffer::new(
                device.clone(),
                BufferCreateInfo {
                    usage: BufferUsage::STORAGE_TEXEL_BUFFER,
                    ..Default::default()
                },
                memory(256),
            ),
            Err(SurfaceError::InvalidUsage(_)),
        ));

        assert!(matches!(
            Buffer::new(
                device.clone(),
                BufferCreateInfo {
                    size: 128,
                    ..Default::default()
                },
                memory(256),
            ),
            Err(SurfaceError::InvalidUsage(_)),
        ));

        assert!(matches!(
            Buffer::new(
                device,
                BufferCreateInfo {
                    size: 512,
                    usage: BufferUsage::STORAGE_TEXEL_BUFFER,
                    ..Default::default()
                },
                memory(256),
            ),
            Err(SurfaceError::InvalidUsage(_)),
        ));
    }
}
