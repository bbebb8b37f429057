// Copyright (c) 2024 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Image layouts and image views.
//!
//! An *image* is a region of memory whose purpose is to store multi-dimensional data. Its memory
//! is not a plain array of texels: the hardware arranges it in tiles, pads rows and mip levels,
//! and stores each aspect of a depth/stencil image in a separate surface. This module computes
//! that arrangement.
//!
//! # Images and surfaces
//!
//! [`RawImage`] is an image without memory. Creating one plans its layout: for every aspect of
//! the format (color, or depth and/or stencil) a [`Surface`] is laid out by the device's
//! [geometry oracle](geometry::GeometryOracle), and the surfaces are packed one after the other
//! into a single allocation, each aligned to its own requirement.
//!
//! The memory itself is owned by someone else. [Binding](RawImage::bind_memory) a
//! [`ResourceMemory`](crate::memory::ResourceMemory) to a `RawImage` records where the image
//! lives and turns it into an [`Image`].
//!
//! # Images and image views
//!
//! An [`ImageView`](view::ImageView) is a typed, ranged and swizzled window onto one surface of
//! an `Image`. Creating a view builds its hardware descriptors.
//!
//! [`Surface`]: sys::Surface

pub use self::{
    aspect::{AspectSelection, ImageAspect, ImageAspects},
    sys::{ImageCreateInfo, RawImage, Surface},
    usage::{surface_usage, ImageUsage, SurfaceUsage},
};
use crate::{
    macros::{vulkan_bitflags, vulkan_enum},
    memory::ResourceMemory,
    DeviceSize,
};
use std::{
    cmp::max,
    ops::{Deref, Range},
};

mod aspect;
pub mod geometry;
pub mod sys;
mod usage;
pub mod view;

/// An image with memory bound to it.
///
/// The image doesn't own the memory: whoever bound it is responsible for keeping it alive for as
/// long as the image, and any view of it, is in use.
#[derive(Debug)]
pub struct Image {
    inner: RawImage,
    memory: ResourceMemory,
}

impl Image {
    pub(crate) fn from_raw(inner: RawImage, memory: ResourceMemory) -> Self {
        Image { inner, memory }
    }

    /// Returns the memory that is bound to the image.
    #[inline]
    pub fn memory(&self) -> &ResourceMemory {
        &self.memory
    }

    /// Returns the device address of the start of the image.
    #[inline]
    pub fn device_address(&self) -> DeviceSize {
        self.memory.device_address(0)
    }

    /// Unbinds the memory, returning the underlying `RawImage` and the memory.
    #[inline]
    pub fn into_raw(self) -> (RawImage, ResourceMemory) {
        (self.inner, self.memory)
    }
}

impl Deref for Image {
    type Target = RawImage;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

vulkan_bitflags! {
    /// Flags specifying additional properties of an image.
    ImageCreateFlags = ImageCreateFlags(u32);

    /// The image can be used to create cube and cube array views.
    CUBE_COMPATIBLE = CUBE_COMPATIBLE,
}

vulkan_enum! {
    /// The basic dimensionality of an image.
    ImageType = ImageType(i32);

    /// A one-dimensional image, consisting of only a width, with a height and depth of 1.
    Dim1d = TYPE_1D,

    /// A two-dimensional image, consisting of a width and height, with a depth of 1.
    Dim2d = TYPE_2D,

    /// A three-dimensional image, consisting of a width, height and depth.
    Dim3d = TYPE_3D,
}

vulkan_enum! {
    /// The arrangement of texels or texel blocks in an image.
    ImageTiling = ImageTiling(i32);

    /// The arrangement is optimized for access by the device.
    Optimal = OPTIMAL,

    /// The texels are laid out in row-major order.
    Linear = LINEAR,
}

vulkan_enum! {
    /// The number of samples per texel of an image.
    SampleCount = SampleCountFlags(u32);

    Sample1 = TYPE_1,
    Sample2 = TYPE_2,
    Sample4 = TYPE_4,
    Sample8 = TYPE_8,
    Sample16 = TYPE_16,
}

impl Default for SampleCount {
    #[inline]
    fn default() -> Self {
        SampleCount::Sample1
    }
}

/// One or more subresources of an image that a view covers.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ImageSubresourceRange {
    /// Selects the aspects that will be included.
    ///
    /// This must select exactly one aspect, or both depth and stencil.
    pub aspects: ImageAspects,

    /// Selects the range of the mip levels that will be included.
    ///
    /// The range must not be empty.
    pub mip_levels: Range<u32>,

    /// Selects the range of array layers that will be included.
    ///
    /// The range must not be empty.
    pub array_layers: Range<u32>,
}

impl ImageSubresourceRange {
    /// Returns an `ImageSubresourceRange` covering the whole of an image with the given
    /// parameters.
    #[inline]
    pub fn from_parameters(aspects: ImageAspects, mip_levels: u32, array_layers: u32) -> Self {
        Self {
            aspects,
            mip_levels: 0..mip_levels,
            array_layers: 0..array_layers,
        }
    }
}

/// Describes the memory layout of a single subresource of an image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubresourceLayout {
    /// The number of bytes from the start of the image memory to the start of the queried
    /// subresource.
    pub offset: DeviceSize,

    /// The total number of bytes of the surface that holds the queried subresource.
    pub size: DeviceSize,

    /// The number of bytes between two texels or two blocks in adjacent rows.
    pub row_pitch: DeviceSize,

    /// The number of bytes between two texels or two blocks in adjacent array layers.
    pub array_pitch: DeviceSize,

    /// The number of bytes between two texels or two blocks in adjacent depth slices. This is
    /// always equal to `array_pitch`.
    pub depth_pitch: DeviceSize,
}

/// Returns the size of a dimension of extent `extent` at mip level `level`.
///
/// # Examples
///
/// ```
/// use vulkano_surface::image::minify;
///
/// assert_eq!(minify(16, 0), 16);
/// assert_eq!(minify(16, 2), 4);
/// assert_eq!(minify(5, 1), 2);
/// assert_eq!(minify(16, 8), 1);
/// ```
#[inline]
pub const fn minify(extent: u32, level: u32) -> u32 {
    if level >= u32::BITS {
        return 1;
    }

    let minified = extent >> level;

    if minified == 0 {
        1
    } else {
        minified
    }
}

/// Returns the maximum number of mipmap levels for the given image extent.
///
/// The returned value is always at least 1.
///
/// # Examples
///
/// ```
/// use vulkano_surface::image::max_mip_levels;
///
/// assert_eq!(max_mip_levels([2048, 1, 1]), 12);
/// assert_eq!(max_mip_levels([32, 50, 1]), 6);
/// ```
#[inline]
pub fn max_mip_levels(extent: [u32; 3]) -> u32 {
    // This calculates `floor(log2(max(width, height, depth))) + 1` using fast integer operations.
    32 - (extent[0] | extent[1] | extent[2]).leading_zeros()
}

/// Returns the extent of the `level`th mipmap level.
/// If `level` is 0, then it returns `extent` back unchanged.
///
/// Returns `None` if `level` is not less than `max_mip_levels(extent)`.
///
/// # Examples
///
/// ```
/// use vulkano_surface::image::mip_level_extent;
///
/// let extent = [963, 256, 1];
///
/// assert_eq!(mip_level_extent(extent, 0), Some(extent));
/// assert_eq!(mip_level_extent(extent, 1), Some([481, 128, 1]));
/// assert_eq!(mip_level_extent(extent, 6), Some([15, 4, 1]));
/// assert_eq!(mip_level_extent(extent, 9), Some([1, 1, 1]));
/// assert_eq!(mip_level_extent(extent, 11), None);
/// ```
#[inline]
pub fn mip_level_extent(extent: [u32; 3], level: u32) -> Option<[u32; 3]> {
    if level == 0 {
        return Some(extent);
    }

    if level >= max_mip_levels(extent) {
        return None;
    }

    Some(extent.map(|x| max(1, x >> level)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_mip_levels() {
        let mips = super::max_mip_levels([2, 1, 1]);
        assert_eq!(mips, 2);

        let mips = super::max_mip_levels([2, 3, 1]);
        assert_eq!(mips, 2);

        let mips = super::max_mip_levels([512, 512, 1]);
        assert_eq!(mips, 10);
    }

    #[test]
    fn mip_level_size() {
        let extent = [283, 175, 1];
        assert_eq!(super::mip_level_extent(extent, 0), Some(extent));
        assert_eq!(super::mip_level_extent(extent, 1), Some([141, 87, 1]));
        assert_eq!(super::mip_level_extent(extent, 2), Some([70, 43, 1]));
        assert_eq!(super::mip_level_extent(extent, 3), Some([35, 21, 1]));
        assert_eq!(super::mip_level_extent(extent, 4), Some([17, 10, 1]));
        assert_eq!(super::mip_level_extent(extent, 5), Some([8, 5, 1]));
        assert_eq!(super::mip_level_extent(extent, 6), Some([4, 2, 1]));
        assert_eq!(super::mip_level_extent(extent, 7), Some([2, 1, 1]));
        assert_eq!(super::mip_level_extent(extent, 8), Some([1, 1, 1]));
        assert_eq!(super::mip_level_extent(extent, 9), None);
    }

    #[test]
    fn minify_clamps_to_one() {
        assert_eq!(minify(1, 0), 1);
        assert_eq!(minify(7, 2), 1);
        assert_eq!(minify(7, 3), 1);
        assert_eq!(minify(u32::MAX, 40), 1);
    }

    #[test]
    fn whole_range() {
        let range = ImageSubresourceRange::from_parameters(ImageAspects::COLOR, 4, 6);
        assert_eq!(range.mip_levels, 0..4);
        assert_eq!(range.array_layers, 0..6);
    }
}
