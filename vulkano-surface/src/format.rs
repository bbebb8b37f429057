// Copyright (c) 2024 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Logical and hardware formats.
//!
//! A [`Format`] is what the user asks for: a Vulkan format describing the texel data of an image
//! or buffer view. The hardware doesn't necessarily support every such format natively, so each
//! format is translated, per [aspect](crate::image::ImageAspect), into a [`HardwareFormat`] that
//! the surface and its descriptors actually use, together with a [`FormatSwizzle`] that describes
//! where each logical channel lives within the hardware format.
//!
//! # Depth/stencil formats
//!
//! Combined depth/stencil formats are split into two independent surfaces, one per aspect, each
//! with its own hardware format. For example `D24_UNORM_S8_UINT` becomes an
//! `R24_UNORM_X8_TYPELESS` depth surface and an `R8_UINT` stencil surface.
//!
//! # Block-compressed formats
//!
//! A block-compressed format encodes a block of texels into a fixed number of bytes. Sizes and
//! pitches of compressed surfaces are expressed in blocks (*elements*) rather than texels.

use crate::{
    device::Device,
    image::{ImageAspect, ImageAspects, ImageTiling},
    macros::vulkan_enum,
    DeviceSize,
};

vulkan_enum! {
    /// The formats that images and buffer views can be created with.
    Format = Format(i32);

    R8_UNORM = R8_UNORM,
    R8_UINT = R8_UINT,
    R8G8_UNORM = R8G8_UNORM,
    R8G8B8_UNORM = R8G8B8_UNORM,
    R8G8B8A8_UNORM = R8G8B8A8_UNORM,
    R8G8B8A8_SRGB = R8G8B8A8_SRGB,
    R8G8B8A8_UINT = R8G8B8A8_UINT,
    B8G8R8A8_UNORM = B8G8R8A8_UNORM,
    B8G8R8A8_SRGB = B8G8R8A8_SRGB,
    R4G4B4A4_UNORM_PACK16 = R4G4B4A4_UNORM_PACK16,
    A2B10G10R10_UNORM_PACK32 = A2B10G10R10_UNORM_PACK32,
    B10G11R11_UFLOAT_PACK32 = B10G11R11_UFLOAT_PACK32,
    R16_SFLOAT = R16_SFLOAT,
    R16G16_SFLOAT = R16G16_SFLOAT,
    R16G16B16A16_SFLOAT = R16G16B16A16_SFLOAT,
    R16G16B16A16_UINT = R16G16B16A16_UINT,
    R32_UINT = R32_UINT,
    R32_SFLOAT = R32_SFLOAT,
    R32G32_UINT = R32G32_UINT,
    R32G32_SFLOAT = R32G32_SFLOAT,
    R32G32B32A32_UINT = R32G32B32A32_UINT,
    R32G32B32A32_SFLOAT = R32G32B32A32_SFLOAT,
    D16_UNORM = D16_UNORM,
    X8_D24_UNORM_PACK32 = X8_D24_UNORM_PACK32,
    D32_SFLOAT = D32_SFLOAT,
    S8_UINT = S8_UINT,
    D24_UNORM_S8_UINT = D24_UNORM_S8_UINT,
    D32_SFLOAT_S8_UINT = D32_SFLOAT_S8_UINT,
    BC1_RGBA_UNORM_BLOCK = BC1_RGBA_UNORM_BLOCK,
    BC3_UNORM_BLOCK = BC3_UNORM_BLOCK,
    BC7_UNORM_BLOCK = BC7_UNORM_BLOCK,
    ETC2_R8G8B8A8_UNORM_BLOCK = ETC2_R8G8B8A8_UNORM_BLOCK,
    ASTC_4x4_UNORM_BLOCK = ASTC_4X4_UNORM_BLOCK,
    ASTC_8x8_UNORM_BLOCK = ASTC_8X8_UNORM_BLOCK,
}

impl Format {
    /// Returns the aspects that images of this format have.
    pub fn aspects(self) -> ImageAspects {
        match self {
            Format::D16_UNORM | Format::X8_D24_UNORM_PACK32 | Format::D32_SFLOAT => {
                ImageAspects::DEPTH
            }
            Format::S8_UINT => ImageAspects::STENCIL,
            Format::D24_UNORM_S8_UINT | Format::D32_SFLOAT_S8_UINT => {
                ImageAspects::DEPTH | ImageAspects::STENCIL
            }
            _ => ImageAspects::COLOR,
        }
    }

    /// Returns whether the format has a depth channel.
    #[inline]
    pub fn has_depth(self) -> bool {
        self.aspects().intersects(ImageAspects::DEPTH)
    }

    /// Returns whether the format has a stencil channel.
    #[inline]
    pub fn has_stencil(self) -> bool {
        self.aspects().intersects(ImageAspects::STENCIL)
    }

    /// Returns whether the format is a color format, without depth or stencil channels.
    #[inline]
    pub fn is_color(self) -> bool {
        !self.has_depth() && !self.has_stencil()
    }

    /// Returns the compression scheme of the format, if it is block-compressed.
    pub fn compression(self) -> Option<CompressionType> {
        match self {
            Format::BC1_RGBA_UNORM_BLOCK | Format::BC3_UNORM_BLOCK | Format::BC7_UNORM_BLOCK => {
                Some(CompressionType::Bc)
            }
            Format::ETC2_R8G8B8A8_UNORM_BLOCK => Some(CompressionType::Etc2),
            Format::ASTC_4x4_UNORM_BLOCK | Format::ASTC_8x8_UNORM_BLOCK => {
                Some(CompressionType::Astc)
            }
            _ => None,
        }
    }

    /// Returns whether the format is block-compressed.
    #[inline]
    pub fn is_compressed(self) -> bool {
        self.compression().is_some()
    }

    /// Returns the size in bytes of one texel block of the format.
    ///
    /// For combined depth/stencil formats, this is the size of the whole format as the hardware
    /// sees it, not the sum of the two aspects.
    pub fn block_size(self) -> DeviceSize {
        match self {
            Format::R8_UNORM | Format::R8_UINT | Format::S8_UINT => 1,
            Format::R8G8_UNORM
            | Format::R4G4B4A4_UNORM_PACK16
            | Format::R16_SFLOAT
            | Format::D16_UNORM => 2,
            Format::R8G8B8_UNORM => 3,
            Format::R8G8B8A8_UNORM
            | Format::R8G8B8A8_SRGB
            | Format::R8G8B8A8_UINT
            | Format::B8G8R8A8_UNORM
            | Format::B8G8R8A8_SRGB
            | Format::A2B10G10R10_UNORM_PACK32
            | Format::B10G11R11_UFLOAT_PACK32
            | Format::R16G16_SFLOAT
            | Format::R32_UINT
            | Format::R32_SFLOAT
            | Format::X8_D24_UNORM_PACK32
            | Format::D32_SFLOAT
            | Format::D24_UNORM_S8_UINT => 4,
            Format::R16G16B16A16_SFLOAT
            | Format::R16G16B16A16_UINT
            | Format::R32G32_UINT
            | Format::R32G32_SFLOAT
            | Format::D32_SFLOAT_S8_UINT
            | Format::BC1_RGBA_UNORM_BLOCK => 8,
            Format::R32G32B32A32_UINT
            | Format::R32G32B32A32_SFLOAT
            | Format::BC3_UNORM_BLOCK
            | Format::BC7_UNORM_BLOCK
            | Format::ETC2_R8G8B8A8_UNORM_BLOCK
            | Format::ASTC_4x4_UNORM_BLOCK
            | Format::ASTC_8x8_UNORM_BLOCK => 16,
        }
    }

    /// Returns the extent in texels of one texel block of the format.
    pub fn block_extent(self) -> [u32; 3] {
        match self {
            Format::BC1_RGBA_UNORM_BLOCK
            | Format::BC3_UNORM_BLOCK
            | Format::BC7_UNORM_BLOCK
            | Format::ETC2_R8G8B8A8_UNORM_BLOCK
            | Format::ASTC_4x4_UNORM_BLOCK => [4, 4, 1],
            Format::ASTC_8x8_UNORM_BLOCK => [8, 8, 1],
            _ => [1, 1, 1],
        }
    }

    /// Translates the format into the hardware format used for the surface of `aspect`.
    ///
    /// Asking for the color aspect of a depth/stencil format returns the format of the surface
    /// that is bound when the image is reinterpreted as a color attachment: depth if the format
    /// has depth, stencil otherwise.
    ///
    /// Returns [`None`] if the format doesn't have the requested aspect.
    pub fn hardware_format(
        self,
        aspect: ImageAspect,
        tiling: ImageTiling,
    ) -> Option<(HardwareFormat, FormatSwizzle)> {
        let aspect = match aspect {
            ImageAspect::Color if self.has_depth() => ImageAspect::Depth,
            ImageAspect::Color if self.has_stencil() => ImageAspect::Stencil,
            aspect => aspect,
        };

        let format = match (self, aspect) {
            (Format::D16_UNORM, ImageAspect::Depth) => HardwareFormat::R16_UNORM,
            (Format::X8_D24_UNORM_PACK32 | Format::D24_UNORM_S8_UINT, ImageAspect::Depth) => {
                HardwareFormat::R24_UNORM_X8_TYPELESS
            }
            (Format::D32_SFLOAT | Format::D32_SFLOAT_S8_UINT, ImageAspect::Depth) => {
                HardwareFormat::R32_FLOAT
            }
            (
                Format::S8_UINT | Format::D24_UNORM_S8_UINT | Format::D32_SFLOAT_S8_UINT,
                ImageAspect::Stencil,
            ) => HardwareFormat::R8_UINT,
            (_, ImageAspect::Depth | ImageAspect::Stencil) => return None,
            (format, ImageAspect::Color) => return Some(format.color_hardware_format(tiling)),
        };

        Some((format, FormatSwizzle::IDENTITY))
    }

    fn color_hardware_format(self, tiling: ImageTiling) -> (HardwareFormat, FormatSwizzle) {
        let format = match self {
            Format::R8_UNORM => HardwareFormat::R8_UNORM,
            Format::R8_UINT => HardwareFormat::R8_UINT,
            Format::R8G8_UNORM => HardwareFormat::R8G8_UNORM,
            // Three-byte texels can't be tiled, so optimal images pad them to four bytes.
            Format::R8G8B8_UNORM => match tiling {
                ImageTiling::Linear => HardwareFormat::R8G8B8_UNORM,
                ImageTiling::Optimal => HardwareFormat::R8G8B8X8_UNORM,
            },
            Format::R8G8B8A8_UNORM => HardwareFormat::R8G8B8A8_UNORM,
            Format::R8G8B8A8_SRGB => HardwareFormat::R8G8B8A8_UNORM_SRGB,
            Format::R8G8B8A8_UINT => HardwareFormat::R8G8B8A8_UINT,
            Format::B8G8R8A8_UNORM => HardwareFormat::B8G8R8A8_UNORM,
            Format::B8G8R8A8_SRGB => HardwareFormat::B8G8R8A8_UNORM_SRGB,
            Format::R4G4B4A4_UNORM_PACK16 => {
                return (
                    HardwareFormat::B4G4R4A4_UNORM,
                    FormatSwizzle {
                        r: 2,
                        g: 1,
                        b: 0,
                        a: 3,
                    },
                );
            }
            Format::A2B10G10R10_UNORM_PACK32 => HardwareFormat::R10G10B10A2_UNORM,
            Format::B10G11R11_UFLOAT_PACK32 => HardwareFormat::R11G11B10_FLOAT,
            Format::R16_SFLOAT => HardwareFormat::R16_FLOAT,
            Format::R16G16_SFLOAT => HardwareFormat::R16G16_FLOAT,
            Format::R16G16B16A16_SFLOAT => HardwareFormat::R16G16B16A16_FLOAT,
            Format::R16G16B16A16_UINT => HardwareFormat::R16G16B16A16_UINT,
            Format::R32_UINT => HardwareFormat::R32_UINT,
            Format::R32_SFLOAT => HardwareFormat::R32_FLOAT,
            Format::R32G32_UINT => HardwareFormat::R32G32_UINT,
            Format::R32G32_SFLOAT => HardwareFormat::R32G32_FLOAT,
            Format::R32G32B32A32_UINT => HardwareFormat::R32G32B32A32_UINT,
            Format::R32G32B32A32_SFLOAT => HardwareFormat::R32G32B32A32_FLOAT,
            Format::BC1_RGBA_UNORM_BLOCK => HardwareFormat::BC1_UNORM,
            Format::BC3_UNORM_BLOCK => HardwareFormat::BC3_UNORM,
            Format::BC7_UNORM_BLOCK => HardwareFormat::BC7_UNORM,
            Format::ETC2_R8G8B8A8_UNORM_BLOCK => HardwareFormat::ETC2_EAC_RGBA8,
            Format::ASTC_4x4_UNORM_BLOCK => HardwareFormat::ASTC_LDR_2D_4X4_U8SRGB,
            Format::ASTC_8x8_UNORM_BLOCK => HardwareFormat::ASTC_LDR_2D_8X8_U8SRGB,
            Format::D16_UNORM
            | Format::X8_D24_UNORM_PACK32
            | Format::D32_SFLOAT
            | Format::S8_UINT
            | Format::D24_UNORM_S8_UINT
            | Format::D32_SFLOAT_S8_UINT => unreachable!("handled by the caller"),
        };

        (format, FormatSwizzle::IDENTITY)
    }
}

/// The compression scheme of a block-compressed format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompressionType {
    Astc,
    Bc,
    Etc2,
}

/// Where each logical channel of a [`Format`] lives within its [`HardwareFormat`].
///
/// Each field is the index of a hardware channel, where 0 is the first (red) channel and 3 is the
/// fourth (alpha) channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FormatSwizzle {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl FormatSwizzle {
    /// Every logical channel lives in the hardware channel of the same name.
    pub const IDENTITY: Self = Self {
        r: 0,
        g: 1,
        b: 2,
        a: 3,
    };
}

impl Default for FormatSwizzle {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A surface format as the hardware understands it.
///
/// The discriminant is the value written into the format field of descriptors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
#[repr(u32)]
pub enum HardwareFormat {
    R32G32B32A32_FLOAT = 0x000,
    R32G32B32A32_UINT = 0x002,
    R16G16B16A16_UINT = 0x088,
    R16G16B16A16_FLOAT = 0x084,
    R32G32_FLOAT = 0x085,
    R32G32_UINT = 0x087,
    B8G8R8A8_UNORM = 0x0c0,
    B8G8R8A8_UNORM_SRGB = 0x0c1,
    R10G10B10A2_UNORM = 0x0c2,
    R8G8B8A8_UNORM = 0x0c7,
    R8G8B8A8_UNORM_SRGB = 0x0c8,
    R8G8B8A8_UINT = 0x0ca,
    R16G16_FLOAT = 0x0d0,
    R11G11B10_FLOAT = 0x0d3,
    R32_UINT = 0x0d7,
    R32_FLOAT = 0x0d8,
    R24_UNORM_X8_TYPELESS = 0x0d9,
    R8G8B8X8_UNORM = 0x0e9,
    R8G8_UNORM = 0x106,
    R16_UNORM = 0x10a,
    R16_UINT = 0x10d,
    R16_FLOAT = 0x10e,
    B4G4R4A4_UNORM = 0x104,
    R8_UNORM = 0x140,
    R8_UINT = 0x143,
    BC1_UNORM = 0x186,
    BC3_UNORM = 0x188,
    R8G8B8_UNORM = 0x193,
    BC7_UNORM = 0x1a2,
    ETC2_EAC_RGBA8 = 0x1c2,
    ASTC_LDR_2D_4X4_U8SRGB = 0x200,
    ASTC_LDR_2D_8X8_U8SRGB = 0x252,
    /// Untyped bytes, used for buffer descriptors without a typed representation.
    RAW = 0x1ff,
}

impl HardwareFormat {
    /// Returns the size in bytes of one element (texel or compressed block).
    pub const fn block_size(self) -> u32 {
        match self {
            Self::R8_UNORM | Self::R8_UINT | Self::RAW => 1,
            Self::R8G8_UNORM
            | Self::R16_UNORM
            | Self::R16_UINT
            | Self::R16_FLOAT
            | Self::B4G4R4A4_UNORM => 2,
            Self::R8G8B8_UNORM => 3,
            Self::B8G8R8A8_UNORM
            | Self::B8G8R8A8_UNORM_SRGB
            | Self::R10G10B10A2_UNORM
            | Self::R8G8B8A8_UNORM
            | Self::R8G8B8A8_UNORM_SRGB
            | Self::R8G8B8A8_UINT
            | Self::R16G16_FLOAT
            | Self::R11G11B10_FLOAT
            | Self::R32_UINT
            | Self::R32_FLOAT
            | Self::R24_UNORM_X8_TYPELESS
            | Self::R8G8B8X8_UNORM => 4,
            Self::R16G16B16A16_UINT
            | Self::R16G16B16A16_FLOAT
            | Self::R32G32_FLOAT
            | Self::R32G32_UINT
            | Self::BC1_UNORM => 8,
            Self::R32G32B32A32_FLOAT
            | Self::R32G32B32A32_UINT
            | Self::BC3_UNORM
            | Self::BC7_UNORM
            | Self::ETC2_EAC_RGBA8
            | Self::ASTC_LDR_2D_4X4_U8SRGB
            | Self::ASTC_LDR_2D_8X8_U8SRGB => 16,
        }
    }

    /// Returns the extent in texels of one element.
    pub const fn block_extent(self) -> [u32; 3] {
        match self {
            Self::BC1_UNORM
            | Self::BC3_UNORM
            | Self::BC7_UNORM
            | Self::ETC2_EAC_RGBA8
            | Self::ASTC_LDR_2D_4X4_U8SRGB => [4, 4, 1],
            Self::ASTC_LDR_2D_8X8_U8SRGB => [8, 8, 1],
            _ => [1, 1, 1],
        }
    }

    /// Returns whether the format is block-compressed.
    #[inline]
    pub const fn is_compressed(self) -> bool {
        let [w, h, d] = self.block_extent();

        w * h * d > 1
    }

    /// Returns whether the format can back a depth surface.
    #[inline]
    pub const fn is_depth(self) -> bool {
        matches!(
            self,
            Self::R16_UNORM | Self::R24_UNORM_X8_TYPELESS | Self::R32_FLOAT,
        )
    }

    /// Returns whether the format can back a stencil surface.
    #[inline]
    pub const fn is_stencil(self) -> bool {
        matches!(self, Self::R8_UINT)
    }

    /// Returns whether typed storage reads and writes of this format are supported by `device`.
    ///
    /// When this returns `false`, storage access falls back to an untyped descriptor and the
    /// shader emulates the format.
    pub fn has_matching_typed_storage(self, device: &Device) -> bool {
        let generation = device.generation();
        let block_size = self.block_size();

        block_size <= 4
            || (block_size <= 8 && (generation >= 8 || device.is_haswell()))
            || generation >= 9
    }

    /// Returns the format that typed storage access to this format uses on `device`.
    ///
    /// Older generations can only store to a handful of formats, so the data is written as
    /// unsigned integers of the same size and converted in the shader.
    pub fn lower_storage_format(self, device: &Device) -> HardwareFormat {
        if device.generation() >= 9 || self == Self::RAW {
            return self;
        }

        match self.block_size() {
            1 => Self::R8_UINT,
            2 => Self::R16_UINT,
            4 => Self::R32_UINT,
            8 => Self::R32G32_UINT,
            16 => Self::R32G32B32A32_UINT,
            _ => Self::RAW,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_stencil_aspects() {
        assert_eq!(
            Format::D24_UNORM_S8_UINT.aspects(),
            ImageAspects::DEPTH | ImageAspects::STENCIL,
        );
        assert!(Format::D16_UNORM.has_depth());
        assert!(!Format::D16_UNORM.has_stencil());
        assert!(Format::S8_UINT.has_stencil());
        assert!(Format::R8G8B8A8_UNORM.is_color());
    }

    #[test]
    fn combined_formats_split_per_aspect() {
        let tiling = ImageTiling::Optimal;

        assert_eq!(
            Format::D24_UNORM_S8_UINT.hardware_format(ImageAspect::Depth, tiling),
            Some((HardwareFormat::R24_UNORM_X8_TYPELESS, FormatSwizzle::IDENTITY)),
        );
        assert_eq!(
            Format::D24_UNORM_S8_UINT.hardware_format(ImageAspect::Stencil, tiling),
            Some((HardwareFormat::R8_UINT, FormatSwizzle::IDENTITY)),
        );
        assert_eq!(
            Format::D16_UNORM.hardware_format(ImageAspect::Stencil, tiling),
            None,
        );
        assert_eq!(
            Format::R8G8B8A8_UNORM.hardware_format(ImageAspect::Depth, tiling),
            None,
        );
    }

    #[test]
    fn color_aspect_of_depth_format_is_reinterpreted() {
        let (format, _) = Format::D32_SFLOAT_S8_UINT
            .hardware_format(ImageAspect::Color, ImageTiling::Optimal)
            .unwrap();
        assert_eq!(format, HardwareFormat::R32_FLOAT);

        let (format, _) = Format::S8_UINT
            .hardware_format(ImageAspect::Color, ImageTiling::Optimal)
            .unwrap();
        assert_eq!(format, HardwareFormat::R8_UINT);
    }

    #[test]
    fn rgb_is_padded_when_tiled() {
        let (optimal, _) = Format::R8G8B8_UNORM
            .hardware_format(ImageAspect::Color, ImageTiling::Optimal)
            .unwrap();
        let (linear, _) = Format::R8G8B8_UNORM
            .hardware_format(ImageAspect::Color, ImageTiling::Linear)
            .unwrap();

        assert_eq!(optimal.block_size(), 4);
        assert_eq!(linear.block_size(), 3);
    }

    #[test]
    fn compressed_blocks() {
        assert_eq!(Format::BC1_RGBA_UNORM_BLOCK.block_extent(), [4, 4, 1]);
        assert_eq!(Format::BC1_RGBA_UNORM_BLOCK.block_size(), 8);
        assert!(HardwareFormat::BC7_UNORM.is_compressed());
        assert!(!HardwareFormat::R32G32_UINT.is_compressed());
        assert_eq!(
            Format::ASTC_8x8_UNORM_BLOCK.compression(),
            Some(CompressionType::Astc),
        );
    }

    #[test]
    fn ash_round_trip() {
        let raw: ash::vk::Format = Format::D24_UNORM_S8_UINT.into();
        assert_eq!(raw, ash::vk::Format::D24_UNORM_S8_UINT);
        assert_eq!(Format::try_from(raw), Ok(Format::D24_UNORM_S8_UINT));
        assert!(Format::try_from(ash::vk::Format::G8_B8R8_2PLANE_420_UNORM).is_err());
    }
}
