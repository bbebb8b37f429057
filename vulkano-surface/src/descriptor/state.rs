// Copyright (c) 2024 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! The records written into descriptor memory.

use crate::{
    format::HardwareFormat,
    image::{
        geometry::{SurfaceGeometry, SurfaceTiling},
        minify, ImageType, SurfaceUsage,
    },
    DeviceSize, ValidationError,
};
use bytemuck::{Pod, Zeroable};

/// The size in bytes of a [`SurfaceState`].
pub const SURFACE_STATE_SIZE: DeviceSize = size_of::<SurfaceState>() as DeviceSize;

/// A hardware surface descriptor.
///
/// This describes to the sampler, the render target unit or the data port how to interpret a
/// range of memory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct SurfaceState {
    /// A [`SurfaceType`].
    pub surface_type: u32,
    /// A [`HardwareFormat`].
    pub format: u32,
    /// The raw bits of a [`SurfaceUsage`].
    pub usage: u32,
    /// The width of level 0, in texels. For buffers, the number of elements.
    pub width: u32,
    pub height: u32,
    /// The depth of level 0 for 3D surfaces, the number of array layers otherwise.
    pub depth: u32,
    /// The row pitch in bytes. For buffers, the stride between two elements.
    pub row_pitch: u32,
    pub array_pitch_el_rows: u32,
    pub base_level: u16,
    pub levels: u16,
    pub base_array_layer: u16,
    pub array_len: u16,
    /// A [`ChannelSelect`] for each of the red, green, blue and alpha outputs.
    pub channel_select: [u8; 4],
    /// A [`SurfaceTiling`].
    pub tiling: u8,
    pub samples: u8,
    pub reserved0: [u8; 2],
    /// The device address of the start of the surface.
    pub address: u64,
    pub mocs: u32,
    pub reserved1: u32,
}

/// The kind of resource a [`SurfaceState`] describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum SurfaceType {
    Dim1d = 0,
    Dim2d = 1,
    Dim3d = 2,
    Cube = 3,
    Buffer = 4,
}

/// The source of one output channel of a view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ChannelSelect {
    Zero = 0,
    One = 1,
    Red = 4,
    Green = 5,
    Blue = 6,
    Alpha = 7,
}

impl ChannelSelect {
    /// The identity mapping: every output reads its own channel.
    pub const IDENTITY: [ChannelSelect; 4] = [
        ChannelSelect::Red,
        ChannelSelect::Green,
        ChannelSelect::Blue,
        ChannelSelect::Alpha,
    ];

    /// Returns the select that reads hardware channel `index`, where 0 is red and 3 is alpha.
    ///
    /// # Panics
    ///
    /// - Panics if `index` is greater than 3.
    #[inline]
    pub const fn channel(index: u8) -> Self {
        match index {
            0 => ChannelSelect::Red,
            1 => ChannelSelect::Green,
            2 => ChannelSelect::Blue,
            3 => ChannelSelect::Alpha,
            _ => panic!("channel index out of range"),
        }
    }
}

/// What a descriptor exposes of a surface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SurfaceView {
    pub format: HardwareFormat,
    pub usage: SurfaceUsage,
    pub base_level: u32,
    pub levels: u32,
    pub base_array_layer: u32,
    pub array_len: u32,
    pub channel_select: [ChannelSelect; 4],
}

/// Parameters of [`fill_surface_state`].
#[derive(Clone, Debug)]
pub struct SurfaceStateInfo<'a> {
    pub surface: &'a SurfaceGeometry,
    pub view: &'a SurfaceView,
    /// The extent of level 0 as the descriptor presents it, in texels. This differs from the
    /// extent of `surface` when an uncompressed view reinterprets a compressed surface.
    pub level0_extent: [u32; 3],
    pub address: DeviceSize,
    pub mocs: u32,
}

/// Builds the descriptor of an image surface.
pub fn fill_surface_state(info: &SurfaceStateInfo<'_>) -> SurfaceState {
    let &SurfaceStateInfo {
        surface,
        view,
        level0_extent: [width, height, depth],
        address,
        mocs,
    } = info;

    let surface_type = if view.usage.intersects(SurfaceUsage::CUBE) {
        SurfaceType::Cube
    } else {
        match surface.image_type {
            ImageType::Dim1d => SurfaceType::Dim1d,
            ImageType::Dim2d => SurfaceType::Dim2d,
            ImageType::Dim3d => SurfaceType::Dim3d,
        }
    };

    let depth = match surface.image_type {
        ImageType::Dim3d => depth,
        ImageType::Dim1d | ImageType::Dim2d => surface.array_layers,
    };

    SurfaceState {
        surface_type: surface_type as u32,
        format: view.format as u32,
        usage: view.usage.as_raw(),
        width,
        height,
        depth,
        row_pitch: surface.row_pitch as u32,
        array_pitch_el_rows: surface.array_pitch_el_rows,
        base_level: view.base_level as u16,
        levels: view.levels as u16,
        base_array_layer: view.base_array_layer as u16,
        array_len: view.array_len as u16,
        channel_select: view.channel_select.map(|select| select as u8),
        tiling: surface.tiling as u8,
        samples: surface.samples as u32 as u8,
        reserved0: [0; 2],
        address,
        mocs,
        reserved1: 0,
    }
}

/// Parameters of [`fill_buffer_surface_state`].
#[derive(Clone, Debug)]
pub struct BufferSurfaceStateInfo {
    pub format: HardwareFormat,
    pub usage: SurfaceUsage,
    pub address: DeviceSize,
    /// The size of the buffer range in bytes.
    pub range: DeviceSize,
    /// The number of bytes between two elements. Must not be zero.
    pub stride: u32,
    pub mocs: u32,
}

/// Builds the descriptor of a buffer range.
///
/// # Errors
///
/// Returns an error if the range holds more elements than a descriptor can address.
pub fn fill_buffer_surface_state(
    info: &BufferSurfaceStateInfo,
) -> Result<SurfaceState, Box<ValidationError>> {
    let &BufferSurfaceStateInfo {
        format,
        usage,
        address,
        range,
        stride,
        mocs,
    } = info;

    debug_assert!(stride != 0);

    let elements = range / stride as DeviceSize;
    let width = u32::try_from(elements).map_err(|_| {
        ValidationError::new(
            "range",
            format!(
                "is {} bytes, which holds {} elements of {} bytes, but a buffer descriptor can \
                address at most {} elements",
                range,
                elements,
                stride,
                u32::MAX,
            ),
        )
    })?;

    Ok(SurfaceState {
        surface_type: SurfaceType::Buffer as u32,
        format: format as u32,
        usage: usage.as_raw(),
        width,
        height: 1,
        depth: 1,
        row_pitch: stride,
        array_pitch_el_rows: 0,
        base_level: 0,
        levels: 1,
        base_array_layer: 0,
        array_len: 1,
        channel_select: ChannelSelect::IDENTITY.map(|select| select as u8),
        tiling: SurfaceTiling::Linear as u8,
        samples: 1,
        reserved0: [0; 2],
        address,
        mocs,
        reserved1: 0,
    })
}

/// The parameters a shader needs to emulate typed access to a storage surface through an
/// untyped descriptor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct ImageParam {
    /// The offset of the base level within an array slice, in elements.
    pub offset: [u32; 2],
    /// The width, height and depth (or number of layers) of the base level, in elements.
    pub size: [u32; 3],
    /// The element size in bytes, the row pitch in bytes, unused, and the array pitch in rows.
    pub stride: [u32; 4],
    /// The base-2 logarithm of the tile width in bytes and of the tile height in rows.
    pub tiling: [u32; 3],
    /// Address bits mixed into bit 6. Always zero.
    pub swizzling: [u32; 2],
}

/// Builds the storage parameters of an image view.
///
/// Only level 0 of a surface has a known position within an array slice, so `offset` is zero.
pub fn fill_image_param(surface: &SurfaceGeometry, view: &SurfaceView) -> ImageParam {
    let [block_width, block_height, _] = surface.format.block_extent();
    let base_level = view.base_level;

    let width = minify(surface.extent[0], base_level).div_ceil(block_width);
    let height = minify(surface.extent[1], base_level).div_ceil(block_height);
    let depth = match surface.image_type {
        ImageType::Dim3d => minify(surface.extent[2], base_level),
        ImageType::Dim1d | ImageType::Dim2d => view.array_len,
    };

    let array_pitch = if depth > 1 {
        surface.array_pitch_el_rows
    } else {
        0
    };

    let tiling = match surface.tiling {
        SurfaceTiling::Linear => [0; 3],
        tiling => {
            let [tile_width, tile_height] = tiling.tile_extent();

            [tile_width.trailing_zeros(), tile_height.trailing_zeros(), 0]
        }
    };

    ImageParam {
        offset: [0, 0],
        size: [width, height, depth],
        stride: [
            surface.format.block_size(),
            surface.row_pitch as u32,
            0,
            array_pitch,
        ],
        tiling,
        swizzling: [0, 0],
    }
}

/// Builds the storage parameters of a buffer view.
pub fn fill_buffer_image_param(format: HardwareFormat, range: DeviceSize) -> ImageParam {
    let block_size = format.block_size();

    ImageParam {
        size: [(range / block_size as DeviceSize) as u32, 1, 1],
        stride: [block_size, 0, 0, 0],
        ..Default::default()
    }
}
