// Copyright (c) 2024 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Computing the physical layout of a single surface.
//!
//! The layout of a tiled surface depends on intricate hardware rules, so it is delegated to a
//! [`GeometryOracle`]. Given a hardware format, dimensions and the capabilities the surface needs,
//! the oracle returns a [`SurfaceGeometry`]: the pitches, the total size and the required
//! alignment.
//!
//! [`StandardGeometry`] is the reference oracle. Its layout is the following, in elements (texels,
//! or compression blocks for compressed formats):
//!
//! ```text
//! +-----------------+
//! |                 |
//! |     level 0     |
//! |                 |
//! +--------+--------+
//! |        | lvl 2  |
//! | lvl 1  +---+----+
//! |        |l3 |
//! +--------+---+
//! ```
//!
//! Level 1 sits below level 0, and every following level is stacked below the previous one, to the
//! right of level 1. Every level is padded to the LOD alignment. The resulting rectangle is one
//! array slice; the slices of all array layers (and of all samples, for multisampled surfaces,
//! and of all depth slices, for 3D surfaces) are stacked vertically, `array_pitch_el_rows` rows
//! apart.

use super::{max_mip_levels, minify, usage::SurfaceUsage, ImageTiling, ImageType, SampleCount};
use crate::{
    format::HardwareFormat,
    memory::{align_up, div_round_up, DeviceAlignment},
    DeviceSize,
};
use std::{
    error::Error,
    fmt::{Debug, Display, Error as FmtError, Formatter},
};

/// Computes the layout of hardware surfaces.
pub trait GeometryOracle: Debug + Send + Sync {
    /// Returns the layout of a surface with the given parameters, or an error if the hardware
    /// can't represent such a surface.
    fn plan(&self, create_info: &SurfaceCreateInfo) -> Result<SurfaceGeometry, GeometryError>;
}

/// Parameters of a surface to lay out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SurfaceCreateInfo {
    pub image_type: ImageType,
    pub format: HardwareFormat,
    /// The extent of level 0, in texels.
    pub extent: [u32; 3],
    pub mip_levels: u32,
    pub array_layers: u32,
    pub samples: SampleCount,
    pub tiling: ImageTiling,
    pub usage: SurfaceUsage,
}

/// How the memory of a surface is arranged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SurfaceTiling {
    /// Rows of elements one after the other.
    Linear = 0,

    /// 4 KiB tiles of 128 bytes by 32 rows.
    Y = 1,

    /// 4 KiB tiles of 64 bytes by 64 rows. Only used for stencil buffers.
    W = 2,
}

impl SurfaceTiling {
    /// Returns the width in bytes and the height in rows of one tile.
    #[inline]
    pub const fn tile_extent(self) -> [u32; 2] {
        match self {
            SurfaceTiling::Linear => [1, 1],
            SurfaceTiling::Y => [128, 32],
            SurfaceTiling::W => [64, 64],
        }
    }
}

/// The physical layout of a surface, as computed by a [`GeometryOracle`].
///
/// Besides the computed layout, this records the parameters it was computed for, so that
/// descriptors can be built from it alone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SurfaceGeometry {
    pub image_type: ImageType,
    pub format: HardwareFormat,
    /// The extent of level 0, in texels.
    pub extent: [u32; 3],
    pub mip_levels: u32,
    pub array_layers: u32,
    pub samples: SampleCount,
    pub usage: SurfaceUsage,
    pub tiling: SurfaceTiling,

    /// The number of bytes between two rows of elements.
    pub row_pitch: DeviceSize,

    /// The number of rows of elements between two array slices.
    pub array_pitch_el_rows: u32,

    /// The total size of the surface in bytes.
    pub size: DeviceSize,

    /// The alignment that the start of the surface must have in memory.
    pub alignment: DeviceAlignment,
}

impl SurfaceGeometry {
    /// Returns the number of bytes between two array slices.
    #[inline]
    pub fn array_pitch(&self) -> DeviceSize {
        self.array_pitch_el_rows as DeviceSize * self.row_pitch
    }

    /// Returns the number of elements in one row, which is the row pitch divided by the element
    /// size.
    #[inline]
    pub fn row_pitch_el(&self) -> u32 {
        (self.row_pitch / self.format.block_size() as DeviceSize) as u32
    }
}

/// Error that can be returned by a [`GeometryOracle`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeometryError {
    /// The width, height or depth is zero.
    ZeroExtent,

    /// There are no mip levels or no array layers.
    ZeroSubresources,

    /// The extent has more dimensions than the image type allows.
    DimensionMismatch,

    /// There are more mip levels than the extent allows.
    TooManyMipLevels,

    /// The surface is multisampled, but is not a single-level 2D surface.
    MultisampledNot2D,

    /// The surface is multisampled and linear.
    MultisampledLinear,

    /// The surface is compressed, linear and one-dimensional.
    CompressedLinear1D,

    /// The surface is a depth or stencil buffer, but the format has no such channel.
    FormatNotDepthStencil,

    /// The surface is larger than the device can address.
    TooLarge,

    /// The surface occupies no memory.
    EmptySurface,
}

impl Error for GeometryError {}

impl Display for GeometryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        let msg = match self {
            Self::ZeroExtent => "the extent has a zero dimension",
            Self::ZeroSubresources => "there are no mip levels or no array layers",
            Self::DimensionMismatch => "the extent doesn't match the image type",
            Self::TooManyMipLevels => "there are more mip levels than the extent allows",
            Self::MultisampledNot2D => "a multisampled surface is not a single-level 2D surface",
            Self::MultisampledLinear => "a multisampled surface can't be linear",
            Self::CompressedLinear1D => "a compressed 1D surface can't be linear",
            Self::FormatNotDepthStencil => {
                "a depth or stencil surface has a format without depth or stencil"
            }
            Self::TooLarge => "the surface is too large",
            Self::EmptySurface => "the surface occupies no memory",
        };

        f.write_str(msg)
    }
}

/// The reference [`GeometryOracle`].
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardGeometry {
    _private: (),
}

impl StandardGeometry {
    /// The alignment of every surface, and the granularity of its size.
    pub const PAGE_SIZE: DeviceSize = 4096;

    /// Creates a new `StandardGeometry`.
    #[inline]
    pub const fn new() -> Self {
        StandardGeometry { _private: () }
    }

    fn validate(create_info: &SurfaceCreateInfo) -> Result<(), GeometryError> {
        let &SurfaceCreateInfo {
            image_type,
            format,
            extent,
            mip_levels,
            array_layers,
            samples,
            tiling,
            usage,
        } = create_info;

        if extent.contains(&0) {
            return Err(GeometryError::ZeroExtent);
        }

        if mip_levels == 0 || array_layers == 0 {
            return Err(GeometryError::ZeroSubresources);
        }

        match image_type {
            ImageType::Dim1d if extent[1] != 1 || extent[2] != 1 => {
                return Err(GeometryError::DimensionMismatch);
            }
            ImageType::Dim2d if extent[2] != 1 => return Err(GeometryError::DimensionMismatch),
            _ => (),
        }

        if mip_levels > max_mip_levels(extent) {
            return Err(GeometryError::TooManyMipLevels);
        }

        if samples != SampleCount::Sample1 {
            if image_type != ImageType::Dim2d || mip_levels != 1 {
                return Err(GeometryError::MultisampledNot2D);
            }

            if tiling == ImageTiling::Linear {
                return Err(GeometryError::MultisampledLinear);
            }
        }

        if format.is_compressed() && tiling == ImageTiling::Linear && image_type == ImageType::Dim1d
        {
            return Err(GeometryError::CompressedLinear1D);
        }

        if (usage.intersects(SurfaceUsage::DEPTH) && !format.is_depth())
            || (usage.intersects(SurfaceUsage::STENCIL) && !format.is_stencil())
        {
            return Err(GeometryError::FormatNotDepthStencil);
        }

        Ok(())
    }

    fn choose_tiling(create_info: &SurfaceCreateInfo) -> SurfaceTiling {
        match create_info.tiling {
            ImageTiling::Linear => SurfaceTiling::Linear,
            ImageTiling::Optimal if create_info.usage.intersects(SurfaceUsage::STENCIL) => {
                SurfaceTiling::W
            }
            ImageTiling::Optimal => SurfaceTiling::Y,
        }
    }

    /// Returns the horizontal and vertical LOD alignment, in elements.
    fn lod_alignment_el(create_info: &SurfaceCreateInfo) -> [u32; 2] {
        if create_info.image_type == ImageType::Dim1d {
            [64, 1]
        } else {
            [4, 4]
        }
    }
}

impl GeometryOracle for StandardGeometry {
    fn plan(&self, create_info: &SurfaceCreateInfo) -> Result<SurfaceGeometry, GeometryError> {
        Self::validate(create_info)?;

        let &SurfaceCreateInfo {
            image_type,
            format,
            extent,
            mip_levels,
            array_layers,
            samples,
            tiling: _,
            usage,
        } = create_info;

        let tiling = Self::choose_tiling(create_info);
        let [block_width, block_height, _] = format.block_extent();
        let [halign, valign] = Self::lod_alignment_el(create_info);

        let level_extent_el = |level: u32| -> [u32; 2] {
            let width = div_round_up(minify(extent[0], level), block_width);
            let height = div_round_up(minify(extent[1], level), block_height);

            [
                width.next_multiple_of(halign),
                height.next_multiple_of(valign),
            ]
        };

        let [level0_width, level0_height] = level_extent_el(0);
        let mut slice_width = level0_width;
        let mut slice_height = level0_height;

        if mip_levels > 1 {
            let [level1_width, level1_height] = level_extent_el(1);
            let mut tail_width = 0;
            let mut tail_height = 0;

            for level in 2..mip_levels {
                let [width, height] = level_extent_el(level);
                tail_width = tail_width.max(width);
                tail_height += height;
            }

            slice_width = slice_width.max(level1_width + tail_width);
            slice_height += level1_height.max(tail_height);
        }

        let slices = match image_type {
            ImageType::Dim3d => extent[2],
            ImageType::Dim1d | ImageType::Dim2d => array_layers * samples as u32,
        };

        let [tile_width, tile_height] = tiling.tile_extent();
        let row_alignment = match tiling {
            SurfaceTiling::Linear => 64,
            SurfaceTiling::Y | SurfaceTiling::W => tile_width as DeviceSize,
        };
        // Checked in `validate`.
        let row_alignment = DeviceAlignment::new(row_alignment).unwrap();
        let page_alignment = DeviceAlignment::new(Self::PAGE_SIZE).unwrap();

        let row_pitch = align_up(
            slice_width as DeviceSize * format.block_size() as DeviceSize,
            row_alignment,
        );
        let total_rows = (slice_height as DeviceSize)
            .checked_mul(slices as DeviceSize)
            .ok_or(GeometryError::TooLarge)?
            .next_multiple_of(tile_height as DeviceSize);
        let size = row_pitch
            .checked_mul(total_rows)
            .filter(|&size| size <= DeviceSize::MAX - Self::PAGE_SIZE)
            .ok_or(GeometryError::TooLarge)?;

        Ok(SurfaceGeometry {
            image_type,
            format,
            extent,
            mip_levels,
            array_layers,
            samples,
            usage,
            tiling,
            row_pitch,
            array_pitch_el_rows: slice_height,
            size: align_up(size, page_alignment),
            alignment: page_alignment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_info(format: HardwareFormat, extent: [u32; 3]) -> SurfaceCreateInfo {
        SurfaceCreateInfo {
            image_type: ImageType::Dim2d,
            format,
            extent,
            mip_levels: 1,
            array_layers: 1,
            samples: SampleCount::Sample1,
            tiling: ImageTiling::Optimal,
            usage: SurfaceUsage::TEXTURE,
        }
    }

    #[test]
    fn single_level_y_tiled() {
        let geometry = StandardGeometry::new()
            .plan(&create_info(HardwareFormat::R8G8B8A8_UNORM, [100, 50, 1]))
            .unwrap();

        assert_eq!(geometry.tiling, SurfaceTiling::Y);
        // 100 texels padded to 100 (multiple of 4), 400 bytes, aligned to 512.
        assert_eq!(geometry.row_pitch, 512);
        assert_eq!(geometry.array_pitch_el_rows, 52);
        // 52 rows rounded up to 64, times 512 bytes.
        assert_eq!(geometry.size, 64 * 512);
        assert_eq!(geometry.alignment.as_devicesize(), 4096);
        assert_eq!(geometry.row_pitch_el(), 128);
    }

    #[test]
    fn mip_chain_arrangement() {
        let geometry = StandardGeometry::new()
            .plan(&SurfaceCreateInfo {
                mip_levels: 4,
                ..create_info(HardwareFormat::R32_FLOAT, [64, 64, 1])
            })
            .unwrap();

        // Level 0 is 64x64, level 1 is 32x32, levels 2 and 3 (16x16 and 8x8) are stacked to the
        // right of level 1.
        assert_eq!(geometry.array_pitch_el_rows, 64 + 32);
        assert_eq!(geometry.row_pitch, 256);
    }

    #[test]
    fn tail_wider_than_level_0() {
        let geometry = StandardGeometry::new()
            .plan(&SurfaceCreateInfo {
                mip_levels: 3,
                ..create_info(HardwareFormat::R8_UNORM, [4, 4, 1])
            })
            .unwrap();

        // Every level pads to 4x4 elements: level 1 and level 2 side by side are 8 wide.
        assert_eq!(geometry.array_pitch_el_rows, 8);
        assert_eq!(geometry.row_pitch, 128);
    }

    #[test]
    fn compressed_extent_in_blocks() {
        let geometry = StandardGeometry::new()
            .plan(&create_info(HardwareFormat::BC1_UNORM, [64, 64, 1]))
            .unwrap();

        assert_eq!(geometry.array_pitch_el_rows, 16);
        assert_eq!(geometry.row_pitch, 128);
        assert_eq!(geometry.row_pitch_el(), 16);
    }

    #[test]
    fn linear_row_alignment() {
        let geometry = StandardGeometry::new()
            .plan(&SurfaceCreateInfo {
                tiling: ImageTiling::Linear,
                ..create_info(HardwareFormat::R8_UNORM, [10, 3, 1])
            })
            .unwrap();

        assert_eq!(geometry.tiling, SurfaceTiling::Linear);
        assert_eq!(geometry.row_pitch, 64);
        assert_eq!(geometry.size, 4096);
    }

    #[test]
    fn stencil_uses_w_tiling() {
        let geometry = StandardGeometry::new()
            .plan(&SurfaceCreateInfo {
                usage: SurfaceUsage::STENCIL,
                ..create_info(HardwareFormat::R8_UINT, [16, 16, 1])
            })
            .unwrap();

        assert_eq!(geometry.tiling, SurfaceTiling::W);
        assert_eq!(geometry.row_pitch, 64);
        assert_eq!(geometry.size, 4096);
    }

    #[test]
    fn multisampled_layers() {
        let single = StandardGeometry::new()
            .plan(&create_info(HardwareFormat::R8G8B8A8_UNORM, [128, 128, 1]))
            .unwrap();
        let multi = StandardGeometry::new()
            .plan(&SurfaceCreateInfo {
                samples: SampleCount::Sample4,
                ..create_info(HardwareFormat::R8G8B8A8_UNORM, [128, 128, 1])
            })
            .unwrap();

        assert_eq!(multi.size, single.size * 4);
        assert_eq!(multi.array_pitch(), single.array_pitch());
    }

    #[test]
    fn rejections() {
        let oracle = StandardGeometry::new();
        let base = create_info(HardwareFormat::R8G8B8A8_UNORM, [16, 16, 1]);

        let cases = [
            (
                SurfaceCreateInfo {
                    extent: [0, 16, 1],
                    ..base.clone()
                },
                GeometryError::ZeroExtent,
            ),
            (
                SurfaceCreateInfo {
                    array_layers: 0,
                    ..base.clone()
                },
                GeometryError::ZeroSubresources,
            ),
            (
                SurfaceCreateInfo {
                    extent: [16, 16, 2],
                    ..base.clone()
                },
                GeometryError::DimensionMismatch,
            ),
            (
                SurfaceCreateInfo {
                    mip_levels: 6,
                    ..base.clone()
                },
                GeometryError::TooManyMipLevels,
            ),
            (
                SurfaceCreateInfo {
                    samples: SampleCount::Sample2,
                    mip_levels: 2,
                    ..base.clone()
                },
                GeometryError::MultisampledNot2D,
            ),
            (
                SurfaceCreateInfo {
                    samples: SampleCount::Sample2,
                    tiling: ImageTiling::Linear,
                    ..base.clone()
                },
                GeometryError::MultisampledLinear,
            ),
            (
                SurfaceCreateInfo {
                    image_type: ImageType::Dim1d,
                    format: HardwareFormat::BC1_UNORM,
                    extent: [16, 1, 1],
                    tiling: ImageTiling::Linear,
                    ..base.clone()
                },
                GeometryError::CompressedLinear1D,
            ),
            (
                SurfaceCreateInfo {
                    usage: SurfaceUsage::DEPTH,
                    ..base.clone()
                },
                GeometryError::FormatNotDepthStencil,
            ),
        ];

        for (create_info, err) in cases {
            assert_eq!(oracle.plan(&create_info), Err(err));
        }
    }
}
