// Copyright (c) 2024 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Low-level implementation of images.
//!
//! This module contains the layout planning of images. A [`RawImage`] has no memory; it only
//! knows how much memory it needs and where each of its surfaces lives within that memory.

use super::{
    geometry::{SurfaceCreateInfo, SurfaceGeometry},
    max_mip_levels,
    usage::full_usage,
    AspectSelection, Image, ImageAspect, ImageCreateFlags, ImageTiling, ImageType, ImageUsage,
    SampleCount, SubresourceLayout, SurfaceUsage,
};
use crate::{
    device::Device,
    format::Format,
    image::surface_usage,
    memory::{align_up, DeviceAlignment, DeviceLayout, ResourceMemory},
    DeviceSize, GeometryError, NonExhaustive, SurfaceError, ValidationError,
};
use smallvec::SmallVec;
use std::sync::Arc;

/// The largest width, height or depth an image can have.
pub const MAX_EXTENT: u32 = 16384;

/// The largest number of array layers an image can have.
pub const MAX_ARRAY_LAYERS: u32 = 2048;

/// The layout of an image, without memory.
#[derive(Debug)]
pub struct RawImage {
    device: Arc<Device>,

    flags: ImageCreateFlags,
    image_type: ImageType,
    format: Format,
    extent: [u32; 3],
    mip_levels: u32,
    array_layers: u32,
    samples: SampleCount,
    tiling: ImageTiling,
    usage: ImageUsage,

    // In aspect order: color, or depth then stencil.
    surfaces: SmallVec<[Surface; 2]>,
    size: DeviceSize,
    alignment: DeviceAlignment,
}

impl RawImage {
    /// Creates a new `RawImage`, laying out one surface for every aspect of the format.
    ///
    /// # Errors
    ///
    /// - Returns [`SurfaceError::InvalidUsage`] if `create_info` is not valid.
    /// - Returns [`SurfaceError::InvalidAspect`] if `create_info.usage` contains
    ///   `DEPTH_STENCIL_ATTACHMENT` but the format has no depth or stencil.
    /// - Returns [`SurfaceError::InternalInvariantViolation`] if the geometry oracle rejects a
    ///   surface.
    pub fn new(
        device: Arc<Device>,
        create_info: ImageCreateInfo,
    ) -> Result<RawImage, SurfaceError> {
        create_info
            .validate()
            .map_err(|err| SurfaceError::InvalidUsage(err.add_context("create_info")))?;

        let ImageCreateInfo {
            flags,
            image_type,
            format,
            extent,
            mip_levels,
            array_layers,
            samples,
            tiling,
            usage,
            _ne: _,
        } = create_info;

        let usage = full_usage(usage, samples, format);

        let aspects: SmallVec<[ImageAspect; 2]> = if format.is_color() {
            [ImageAspect::Color].into_iter().collect()
        } else {
            [ImageAspect::Depth, ImageAspect::Stencil]
                .into_iter()
                .filter(|&aspect| format.aspects().intersects(aspect.into()))
                .collect()
        };

        let mut surfaces = SmallVec::new();
        let mut size = 0;
        let mut alignment = DeviceAlignment::MIN;

        for aspect in aspects {
            let (hardware_format, _) = format
                .hardware_format(aspect, tiling)
                .expect("the aspect comes from the format");

            let mut surface_usage = surface_usage(usage, aspect)?;

            if flags.intersects(ImageCreateFlags::CUBE_COMPATIBLE) {
                surface_usage |= SurfaceUsage::CUBE;
            }

            let geometry = device
                .geometry()
                .plan(&SurfaceCreateInfo {
                    image_type,
                    format: hardware_format,
                    extent,
                    mip_levels,
                    array_layers,
                    samples,
                    tiling,
                    usage: surface_usage,
                })
                .map_err(invariant_violation)?;

            if geometry.size == 0 {
                return Err(invariant_violation(GeometryError::EmptySurface));
            }

            let offset = align_up(size, geometry.alignment);
            size = offset
                .checked_add(geometry.size)
                .ok_or_else(|| invariant_violation(GeometryError::TooLarge))?;
            alignment = Ord::max(alignment, geometry.alignment);

            log::debug!(
                "{:?} surface: offset {}, size {}, alignment {}",
                aspect,
                offset,
                geometry.size,
                geometry.alignment.as_devicesize(),
            );

            surfaces.push(Surface {
                aspect,
                geometry,
                offset,
            });
        }

        log::debug!(
            "created {:?} image {:?}: size {}, alignment {}",
            format,
            extent,
            size,
            alignment.as_devicesize(),
        );

        Ok(RawImage {
            device,
            flags,
            image_type,
            format,
            extent,
            mip_levels,
            array_layers,
            samples,
            tiling,
            usage,
            surfaces,
            size,
            alignment,
        })
    }

    /// Returns the device that the image was created for.
    #[inline]
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    /// Returns the flags the image was created with.
    #[inline]
    pub fn flags(&self) -> ImageCreateFlags {
        self.flags
    }

    /// Returns the image type of the image.
    #[inline]
    pub fn image_type(&self) -> ImageType {
        self.image_type
    }

    /// Returns the format of the image.
    #[inline]
    pub fn format(&self) -> Format {
        self.format
    }

    /// Returns the extent of the image.
    #[inline]
    pub fn extent(&self) -> [u32; 3] {
        self.extent
    }

    /// Returns the number of mip levels in the image.
    #[inline]
    pub fn mip_levels(&self) -> u32 {
        self.mip_levels
    }

    /// Returns the number of array layers in the image.
    #[inline]
    pub fn array_layers(&self) -> u32 {
        self.array_layers
    }

    /// Returns the number of samples for the image.
    #[inline]
    pub fn samples(&self) -> SampleCount {
        self.samples
    }

    /// Returns the tiling of the image.
    #[inline]
    pub fn tiling(&self) -> ImageTiling {
        self.tiling
    }

    /// Returns the usage of the image: the usage it was created with, widened by the usage that
    /// transfers and resolves need.
    #[inline]
    pub fn usage(&self) -> ImageUsage {
        self.usage
    }

    /// Returns the total size of the memory the image needs.
    #[inline]
    pub fn size(&self) -> DeviceSize {
        self.size
    }

    /// Returns the alignment that the memory of the image needs.
    #[inline]
    pub fn alignment(&self) -> DeviceAlignment {
        self.alignment
    }

    /// Returns the size and alignment of the memory the image needs.
    #[inline]
    pub fn memory_layout(&self) -> DeviceLayout {
        // Empty surfaces are rejected on creation, and images have at least one.
        DeviceLayout::from_size_alignment(self.size, self.alignment.as_devicesize()).unwrap()
    }

    /// Returns the surfaces of the image, in memory order.
    #[inline]
    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    /// Returns the surface of `aspect`, if the image has one.
    #[inline]
    pub fn surface(&self, aspect: ImageAspect) -> Option<&Surface> {
        self.surfaces
            .iter()
            .find(|surface| surface.aspect == aspect)
    }

    /// Returns the surface that a consumer of `selection` binds to.
    ///
    /// The combined depth and stencil selection resolves to the depth surface if the image has
    /// one, and to the stencil surface otherwise.
    ///
    /// Returns [`SurfaceError::InvalidAspect`] if the image doesn't have the selected surface.
    /// In particular, selecting the color aspect of a depth/stencil image is an error; use
    /// [`attachment_surface`](Self::attachment_surface) to reinterpret such an image.
    pub fn surface_for_aspects(
        &self,
        selection: AspectSelection,
    ) -> Result<&Surface, SurfaceError> {
        let surface = match selection {
            AspectSelection::Color => self.surface(ImageAspect::Color),
            AspectSelection::Depth => self.surface(ImageAspect::Depth),
            AspectSelection::Stencil => self.surface(ImageAspect::Stencil),
            AspectSelection::DepthStencil => self
                .surface(ImageAspect::Depth)
                .or_else(|| self.surface(ImageAspect::Stencil)),
        };

        surface.ok_or_else(|| {
            SurfaceError::InvalidAspect(ValidationError::new(
                "aspects",
                format!(
                    "is `{:?}`, but the image format `{:?}` has no such aspect",
                    selection.aspects(),
                    self.format,
                ),
            ))
        })
    }

    /// Returns the surface that is bound when the image is used as a color attachment, whatever
    /// its format.
    ///
    /// For color images, this is the color surface. For depth/stencil images, this is the depth
    /// surface if there is one, and the stencil surface otherwise. Transfers and clears write to
    /// images through this surface.
    #[inline]
    pub fn attachment_surface(&self) -> &Surface {
        // Every image has a color surface, a depth surface or a stencil surface.
        &self.surfaces[0]
    }

    /// Queries the memory layout of a single subresource of the image.
    ///
    /// Only the first mip level and array layer of each surface are supported.
    ///
    /// # Errors
    ///
    /// - Returns [`SurfaceError::InvalidAspect`] if the image has no surface for `aspect`.
    /// - Returns [`SurfaceError::UnsupportedSubresource`] if `mip_level` or `array_layer` is not
    ///   zero.
    pub fn subresource_layout(
        &self,
        aspect: ImageAspect,
        mip_level: u32,
        array_layer: u32,
    ) -> Result<SubresourceLayout, SurfaceError> {
        let surface = self.surface_for_aspects(aspect.into())?;

        if mip_level != 0 || array_layer != 0 {
            return Err(SurfaceError::UnsupportedSubresource {
                mip_level,
                array_layer,
            });
        }

        let array_pitch = surface.geometry.array_pitch();

        Ok(SubresourceLayout {
            offset: surface.offset,
            size: surface.geometry.size,
            row_pitch: surface.geometry.row_pitch,
            array_pitch,
            depth_pitch: array_pitch,
        })
    }

    /// Binds `memory` to the image.
    ///
    /// # Errors
    ///
    /// - Returns [`SurfaceError::InvalidUsage`] if `memory` is smaller than
    ///   [`size`](Self::size) or its offset is not aligned to [`alignment`](Self::alignment).
    ///   The image and the memory are returned alongside the error.
    pub fn bind_memory(
        self,
        memory: ResourceMemory,
    ) -> Result<Image, (SurfaceError, RawImage, ResourceMemory)> {
        if let Err(err) = self.validate_bind_memory(&memory) {
            return Err((
                SurfaceError::InvalidUsage(err.add_context("memory")),
                self,
                memory,
            ));
        }

        Ok(Image::from_raw(self, memory))
    }

    fn validate_bind_memory(&self, memory: &ResourceMemory) -> Result<(), Box<ValidationError>> {
        if memory.size() < self.size {
            return Err(ValidationError::new(
                "size",
                format!(
                    "is {}, which is less than the {} bytes the image needs",
                    memory.size(),
                    self.size,
                ),
            ));
        }

        if !self.alignment.is_aligned(memory.device_address(0)) {
            return Err(ValidationError::new(
                "offset",
                format!(
                    "is not aligned to the {} bytes the image needs",
                    self.alignment.as_devicesize(),
                ),
            ));
        }

        Ok(())
    }
}

fn invariant_violation(err: GeometryError) -> SurfaceError {
    log::error!("the geometry oracle rejected a validated surface: {}", err);

    SurfaceError::InternalInvariantViolation(err)
}

/// The physical layout of one aspect of an image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Surface {
    aspect: ImageAspect,
    geometry: SurfaceGeometry,
    offset: DeviceSize,
}

impl Surface {
    /// Returns the aspect that the surface stores.
    #[inline]
    pub fn aspect(&self) -> ImageAspect {
        self.aspect
    }

    /// Returns the layout computed by the geometry oracle.
    #[inline]
    pub fn geometry(&self) -> &SurfaceGeometry {
        &self.geometry
    }

    /// Returns the offset of the surface from the start of the image memory. It is aligned to
    /// the surface's own alignment.
    #[inline]
    pub fn offset(&self) -> DeviceSize {
        self.offset
    }

    /// Returns the size of the surface.
    #[inline]
    pub fn size(&self) -> DeviceSize {
        self.geometry.size
    }
}

/// Parameters to create a new `RawImage`.
#[derive(Clone, Debug)]
pub struct ImageCreateInfo {
    /// Additional properties of the image.
    ///
    /// The default value is empty.
    pub flags: ImageCreateFlags,

    /// The basic image dimensionality to create the image with.
    ///
    /// The default value is [`ImageType::Dim2d`].
    pub image_type: ImageType,

    /// The format used to store the image data.
    ///
    /// The default value is [`Format::R8G8B8A8_UNORM`].
    pub format: Format,

    /// The width, height and depth of the image.
    ///
    /// If `image_type` is `ImageType::Dim2d`, then the depth must be 1.
    /// If `image_type` is `ImageType::Dim1d`, then the height and depth must be 1.
    ///
    /// The default value is `[0; 3]`, which must be overridden.
    pub extent: [u32; 3],

    /// The number of mip levels to create the image with.
    ///
    /// The default value is `1`.
    pub mip_levels: u32,

    /// The number of array layers to create the image with.
    ///
    /// The default value is `1`.
    pub array_layers: u32,

    /// The number of samples per texel that the image should use.
    ///
    /// The default value is [`SampleCount::Sample1`].
    pub samples: SampleCount,

    /// The memory arrangement of the texel blocks.
    ///
    /// The default value is [`ImageTiling::Optimal`].
    pub tiling: ImageTiling,

    /// How the image is going to be used.
    ///
    /// The default value is empty, which must be overridden.
    pub usage: ImageUsage,

    pub _ne: NonExhaustive,
}

impl Default for ImageCreateInfo {
    #[inline]
    fn default() -> Self {
        Self {
            flags: ImageCreateFlags::empty(),
            image_type: ImageType::Dim2d,
            format: Format::R8G8B8A8_UNORM,
            extent: [0; 3],
            mip_levels: 1,
            array_layers: 1,
            samples: SampleCount::Sample1,
            tiling: ImageTiling::Optimal,
            usage: ImageUsage::empty(),
            _ne: NonExhaustive(()),
        }
    }
}

impl ImageCreateInfo {
    pub(crate) fn validate(&self) -> Result<(), Box<ValidationError>> {
        let &Self {
            flags,
            image_type,
            format,
            extent,
            mip_levels,
            array_layers,
            samples,
            tiling,
            usage,
            _ne: _,
        } = self;

        if usage.is_empty() {
            return Err(ValidationError::new("usage", "is empty"));
        }

        if extent.contains(&0) {
            return Err(ValidationError::new(
                "extent",
                "one or more elements are zero",
            ));
        }

        if extent.iter().any(|&e| e > MAX_EXTENT) {
            return Err(ValidationError::new(
                "extent",
                format!("one or more elements are greater than {}", MAX_EXTENT),
            ));
        }

        match image_type {
            ImageType::Dim1d => {
                if extent[1] != 1 {
                    return Err(ValidationError::new(
                        "extent[1]",
                        "is not 1, but `image_type` is `ImageType::Dim1d`",
                    ));
                }

                if extent[2] != 1 {
                    return Err(ValidationError::new(
                        "extent[2]",
                        "is not 1, but `image_type` is `ImageType::Dim1d`",
                    ));
                }
            }
            ImageType::Dim2d => {
                if extent[2] != 1 {
                    return Err(ValidationError::new(
                        "extent[2]",
                        "is not 1, but `image_type` is `ImageType::Dim2d`",
                    ));
                }
            }
            ImageType::Dim3d => {
                if array_layers != 1 {
                    return Err(ValidationError::new(
                        "array_layers",
                        "is not 1, but `image_type` is `ImageType::Dim3d`",
                    ));
                }
            }
        }

        if mip_levels == 0 {
            return Err(ValidationError::new("mip_levels", "is zero"));
        }

        if mip_levels > max_mip_levels(extent) {
            return Err(ValidationError::new(
                "mip_levels",
                "is greater than the maximum number of mip levels for `extent`",
            ));
        }

        if array_layers == 0 {
            return Err(ValidationError::new("array_layers", "is zero"));
        }

        if array_layers > MAX_ARRAY_LAYERS {
            return Err(ValidationError::new(
                "array_layers",
                format!("is greater than {}", MAX_ARRAY_LAYERS),
            ));
        }

        if samples != SampleCount::Sample1 {
            if image_type != ImageType::Dim2d {
                return Err(ValidationError::new(
                    "samples",
                    "is not `SampleCount::Sample1`, but `image_type` is not \
                    `ImageType::Dim2d`",
                ));
            }

            if mip_levels != 1 {
                return Err(ValidationError::new(
                    "samples",
                    "is not `SampleCount::Sample1`, but `mip_levels` is not 1",
                ));
            }

            if tiling == ImageTiling::Linear {
                return Err(ValidationError::new(
                    "samples",
                    "is not `SampleCount::Sample1`, but `tiling` is `ImageTiling::Linear`",
                ));
            }
        }

        if format.is_compressed() {
            if image_type == ImageType::Dim1d && tiling == ImageTiling::Linear {
                return Err(ValidationError::new(
                    "format",
                    "is a compressed format, but `image_type` is `ImageType::Dim1d` and \
                    `tiling` is `ImageTiling::Linear`",
                ));
            }

            if usage.intersects(ImageUsage::COLOR_ATTACHMENT | ImageUsage::TRANSFER_DST) {
                return Err(ValidationError::new(
                    "usage",
                    "contains `ImageUsage::COLOR_ATTACHMENT` or `ImageUsage::TRANSFER_DST`, \
                    but `format` is a compressed format",
                ));
            }
        }

        if flags.intersects(ImageCreateFlags::CUBE_COMPATIBLE) {
            if image_type != ImageType::Dim2d {
                return Err(ValidationError::new(
                    "flags",
                    "contains `ImageCreateFlags::CUBE_COMPATIBLE`, but `image_type` is not \
                    `ImageType::Dim2d`",
                ));
            }

            if extent[0] != extent[1] {
                return Err(ValidationError::new(
                    "flags",
                    "contains `ImageCreateFlags::CUBE_COMPATIBLE`, but `extent[0]` and \
                    `extent[1]` are not equal",
                ));
            }

            if array_layers < 6 {
                return Err(ValidationError::new(
                    "flags",
                    "contains `ImageCreateFlags::CUBE_COMPATIBLE`, but `array_layers` is less \
                    than 6",
                ));
            }
        }

        Ok(())
    }
}
