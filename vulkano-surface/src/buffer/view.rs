// Copyright (c) 2024 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! View of a buffer, in order to use it as a uniform texel buffer or storage texel buffer.
//!
//! In order to read or write a buffer as an array of formatted texels, you need to create a
//! *buffer view* of it. Creating the view builds up to two descriptors:
//!
//! - a sampler descriptor, if the buffer has `UNIFORM_TEXEL_BUFFER` usage,
//! - a storage descriptor, if the buffer has `STORAGE_TEXEL_BUFFER` usage.
//!
//! Storage access to formats without a typed storage equivalent on the device goes through an
//! untyped descriptor, and the shader uses the [`ImageParam`] of the view to emulate the format.

use super::{Buffer, BufferUsage};
use crate::{
    descriptor::{
        fill_buffer_image_param, fill_buffer_surface_state, BufferSurfaceStateInfo,
        DescriptorClass, DescriptorSlot, DescriptorSlots, ImageParam, SurfaceState,
    },
    device::Device,
    format::{Format, HardwareFormat},
    image::{ImageAspect, ImageTiling, SurfaceUsage},
    DeviceSize, NonExhaustive, SurfaceError, ValidationError,
};
use std::sync::{Arc, Weak};

/// Represents a way for the GPU to interpret buffer data. See the documentation of the
/// `view` module.
#[derive(Debug)]
pub struct BufferView {
    buffer: Weak<Buffer>,
    device: Arc<Device>,

    format: Format,
    hardware_format: HardwareFormat,
    offset: DeviceSize,
    range: DeviceSize,

    descriptors: DescriptorSlots,
    storage_image_param: Option<ImageParam>,
}

impl BufferView {
    /// Creates a new `BufferView` and builds its descriptors.
    ///
    /// # Errors
    ///
    /// - Returns [`SurfaceError::InvalidUsage`] if the buffer has neither texel buffer usage.
    /// - Returns [`SurfaceError::IncompatibleFormat`] if the format is not an uncompressed color
    ///   format.
    /// - Returns [`SurfaceError::InvalidViewRange`] if the range is empty, doesn't fit within
    ///   the buffer, or holds more elements than a descriptor can address.
    /// - Returns [`SurfaceError::OutOfMemory`] if a descriptor couldn't be allocated.
    pub fn new(
        buffer: &Arc<Buffer>,
        create_info: BufferViewCreateInfo,
    ) -> Result<Arc<BufferView>, SurfaceError> {
        let range = validate_new(buffer, &create_info)?;

        let BufferViewCreateInfo {
            format,
            offset,
            range: _,
            _ne: _,
        } = create_info;

        let device = buffer.device().clone();

        let (hardware_format, _) = format
            .hardware_format(ImageAspect::Color, ImageTiling::Linear)
            .ok_or_else(|| {
                SurfaceError::IncompatibleFormat(ValidationError::new(
                    "create_info.format",
                    "has no color aspect",
                ))
            })?;
        let block_size = hardware_format.block_size();

        let memory = buffer.memory();
        let address = memory.device_address(offset);

        let sample_state = if buffer.usage().intersects(BufferUsage::UNIFORM_TEXEL_BUFFER) {
            Some(
                fill_buffer_surface_state(&BufferSurfaceStateInfo {
                    format: hardware_format,
                    usage: SurfaceUsage::TEXTURE,
                    address,
                    range,
                    stride: block_size,
                    mocs: device.mocs(),
                })
                .map_err(range_error)?,
            )
        } else {
            None
        };

        let storage_state = if buffer.usage().intersects(BufferUsage::STORAGE_TEXEL_BUFFER) {
            let (storage_format, stride) = if hardware_format.has_matching_typed_storage(&device) {
                (hardware_format.lower_storage_format(&device), block_size)
            } else {
                log::warn!(
                    "no typed storage format matches {:?}, falling back to untyped storage access",
                    hardware_format,
                );

                (HardwareFormat::RAW, 1)
            };

            Some(
                fill_buffer_surface_state(&BufferSurfaceStateInfo {
                    format: storage_format,
                    usage: SurfaceUsage::STORAGE,
                    address,
                    range,
                    stride,
                    mocs: device.mocs(),
                })
                .map_err(range_error)?,
            )
        } else {
            None
        };

        let mut descriptors = DescriptorSlots::new(device.descriptor_allocator().clone());
        let mut storage_image_param = None;

        if let Some(state) = sample_state {
            descriptors.build(DescriptorClass::Sample, &state, device.has_llc())?;
        }

        if let Some(state) = storage_state {
            descriptors.build(DescriptorClass::Storage, &state, device.has_llc())?;
            storage_image_param = Some(fill_buffer_image_param(hardware_format, range));
        }

        log::debug!(
            "created buffer view of {} bytes at offset {} as {:?} with descriptors {:?}",
            range,
            offset,
            hardware_format,
            descriptors.classes().collect::<Vec<_>>(),
        );

        Ok(Arc::new(BufferView {
            buffer: Arc::downgrade(buffer),
            device,
            format,
            hardware_format,
            offset: memory.offset() + offset,
            range,
            descriptors,
            storage_image_param,
        }))
    }

    /// Returns the buffer that the view was created from, if it is still alive.
    #[inline]
    pub fn buffer(&self) -> Option<Arc<Buffer>> {
        self.buffer.upgrade()
    }

    /// Returns the device that owns the view.
    #[inline]
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    /// Returns the format of the view.
    #[inline]
    pub fn format(&self) -> Format {
        self.format
    }

    /// Returns the hardware format of the sampler descriptor.
    #[inline]
    pub fn hardware_format(&self) -> HardwareFormat {
        self.hardware_format
    }

    /// Returns the offset of the view within the allocation of the buffer.
    #[inline]
    pub fn offset(&self) -> DeviceSize {
        self.offset
    }

    /// Returns the number of bytes that the view covers.
    #[inline]
    pub fn range(&self) -> DeviceSize {
        self.range
    }

    /// Returns the descriptor slot of `class`, or `None` if that descriptor wasn't built.
    #[inline]
    pub fn descriptor(&self, class: DescriptorClass) -> Option<&DescriptorSlot> {
        self.descriptors.get(class)
    }

    /// Returns the size of the descriptor slot of `class`, or zero if that descriptor wasn't
    /// built.
    #[inline]
    pub fn descriptor_size(&self, class: DescriptorClass) -> DeviceSize {
        self.descriptors.size(class)
    }

    /// Reads back the descriptor of `class`, if it was built.
    #[inline]
    pub fn descriptor_state(&self, class: DescriptorClass) -> Option<SurfaceState> {
        self.descriptors.read(class)
    }

    /// Returns the parameters for software storage access, if the storage descriptor was built.
    #[inline]
    pub fn storage_image_param(&self) -> Option<&ImageParam> {
        self.storage_image_param.as_ref()
    }
}

/// Returns the resolved range of the view.
fn validate_new(
    buffer: &Buffer,
    create_info: &BufferViewCreateInfo,
) -> Result<DeviceSize, SurfaceError> {
    let &BufferViewCreateInfo {
        format,
        offset,
        range,
        _ne: _,
    } = create_info;

    if !buffer
        .usage()
        .intersects(BufferUsage::UNIFORM_TEXEL_BUFFER | BufferUsage::STORAGE_TEXEL_BUFFER)
    {
        return Err(SurfaceError::InvalidUsage(ValidationError::new(
            "buffer.usage()",
            "does not contain `BufferUsage::UNIFORM_TEXEL_BUFFER` or \
            `BufferUsage::STORAGE_TEXEL_BUFFER`",
        )));
    }

    if !format.is_color() || format.is_compressed() {
        return Err(SurfaceError::IncompatibleFormat(ValidationError::new(
            "create_info.format",
            format!(
                "is `Format::{:?}`, which is not an uncompressed color format",
                format,
            ),
        )));
    }

    if offset >= buffer.size() {
        return Err(SurfaceError::InvalidViewRange(ValidationError::new(
            "create_info.offset",
            format!(
                "is {}, which is not less than the {} bytes of the buffer",
                offset,
                buffer.size(),
            ),
        )));
    }

    let range = range.unwrap_or(buffer.size() - offset);

    if range == 0 {
        return Err(SurfaceError::InvalidViewRange(ValidationError::new(
            "create_info.range",
            "is zero",
        )));
    }

    if offset
        .checked_add(range)
        .map_or(true, |end| end > buffer.size())
    {
        return Err(SurfaceError::InvalidViewRange(ValidationError::new(
            "create_info.range",
            format!(
                "is {}, but `create_info.offset + create_info.range` is greater than the {} \
                bytes of the buffer",
                range,
                buffer.size(),
            ),
        )));
    }

    Ok(range)
}

fn range_error(err: Box<ValidationError>) -> SurfaceError {
    SurfaceError::InvalidViewRange(err.add_context("create_info"))
}

/// Parameters to create a new `BufferView`.
#[derive(Clone, Debug)]
pub struct BufferViewCreateInfo {
    /// The format of each texel in the view.
    ///
    /// The default value is [`Format::R8G8B8A8_UNORM`].
    pub format: Format,

    /// The offset in bytes of the start of the view within the buffer.
    ///
    /// The default value is `0`.
    pub offset: DeviceSize,

    /// The number of bytes that the view covers, or `None` for the rest of the buffer.
    ///
    /// The default value is `None`.
    pub range: Option<DeviceSize>,

    pub _ne: NonExhaustive,
}

impl Default for BufferViewCreateInfo {
    #[inline]
    fn default() -> Self {
        Self {
            format: Format::R8G8B8A8_UNORM,
            offset: 0,
            range: None,
            _ne: NonExhaustive(()),
        }
    }
}
