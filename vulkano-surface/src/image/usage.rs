// Copyright (c) 2024 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

use super::{ImageAspect, SampleCount};
use crate::{
    format::Format,
    macros::vulkan_bitflags,
    SurfaceError, ValidationError,
};

vulkan_bitflags! {
    /// Describes how an image is going to be used.
    ImageUsage = ImageUsageFlags(u32);

    /// The image can be used as a source for transfer, blit, resolve and clear commands.
    TRANSFER_SRC = TRANSFER_SRC,

    /// The image can be used as a destination for transfer, blit, resolve and clear commands.
    TRANSFER_DST = TRANSFER_DST,

    /// The image can be used as a sampled image in a shader.
    SAMPLED = SAMPLED,

    /// The image can be used as a storage image in a shader.
    STORAGE = STORAGE,

    /// The image can be used as a color attachment in a render pass/framebuffer.
    COLOR_ATTACHMENT = COLOR_ATTACHMENT,

    /// The image can be used as a depth/stencil attachment in a render pass/framebuffer.
    DEPTH_STENCIL_ATTACHMENT = DEPTH_STENCIL_ATTACHMENT,

    /// The image will be used as an attachment, and will only ever be used temporarily.
    TRANSIENT_ATTACHMENT = TRANSIENT_ATTACHMENT,

    /// The image can be used as an input attachment in a render pass/framebuffer.
    INPUT_ATTACHMENT = INPUT_ATTACHMENT,
}

vulkan_bitflags! {
    #[raw]

    /// The capabilities that a hardware surface is laid out for.
    ///
    /// These are passed to the [geometry oracle](super::geometry::GeometryOracle), which may
    /// choose a different layout depending on them, and written into descriptors.
    SurfaceUsage = u32;

    /// The surface is read through the sampler.
    TEXTURE = 1 << 0,

    /// The surface is written as a color render target.
    RENDER_TARGET = 1 << 1,

    /// The surface is a depth buffer.
    DEPTH = 1 << 2,

    /// The surface is a stencil buffer.
    STENCIL = 1 << 3,

    /// The surface is read and written through typed or untyped storage access.
    STORAGE = 1 << 4,

    /// The surface is viewed as a cube map.
    CUBE = 1 << 5,
}

/// Translates the usage of an image into the capabilities that the surface of `aspect` needs.
///
/// Returns [`SurfaceError::InvalidAspect`] if `usage` contains `DEPTH_STENCIL_ATTACHMENT` and
/// `aspect` is the color aspect.
pub fn surface_usage(
    usage: ImageUsage,
    aspect: ImageAspect,
) -> Result<SurfaceUsage, SurfaceError> {
    let mut surface_usage = SurfaceUsage::empty();

    if usage.intersects(ImageUsage::SAMPLED | ImageUsage::INPUT_ATTACHMENT) {
        surface_usage |= SurfaceUsage::TEXTURE;
    }

    if usage.intersects(ImageUsage::COLOR_ATTACHMENT) {
        surface_usage |= SurfaceUsage::RENDER_TARGET;
    }

    if usage.intersects(ImageUsage::DEPTH_STENCIL_ATTACHMENT) {
        surface_usage |= match aspect {
            ImageAspect::Depth => SurfaceUsage::DEPTH,
            ImageAspect::Stencil => SurfaceUsage::STENCIL,
            ImageAspect::Color => {
                return Err(SurfaceError::InvalidAspect(ValidationError::new(
                    "aspect",
                    "is `ImageAspect::Color`, but `usage` contains \
                    `ImageUsage::DEPTH_STENCIL_ATTACHMENT`",
                )));
            }
        };
    }

    // Transfers read by sampling the source.
    if usage.intersects(ImageUsage::TRANSFER_SRC) {
        surface_usage |= SurfaceUsage::TEXTURE;
    }

    // Transfers write by rendering into the destination.
    if usage.intersects(ImageUsage::TRANSFER_DST) {
        surface_usage |= SurfaceUsage::RENDER_TARGET;
    }

    Ok(surface_usage)
}

/// Returns the declared usage of an image widened by the usage that internal operations on it
/// need.
pub(crate) fn full_usage(usage: ImageUsage, samples: SampleCount, format: Format) -> ImageUsage {
    let mut usage = usage;

    // Multisampled attachments are resolved by sampling them.
    if samples != SampleCount::Sample1 && usage.intersects(ImageUsage::COLOR_ATTACHMENT) {
        usage |= ImageUsage::SAMPLED;
    }

    if usage.intersects(ImageUsage::TRANSFER_SRC) {
        usage |= ImageUsage::SAMPLED;
    }

    // Transfer writes bind the destination as an attachment, whatever its format.
    if usage.intersects(ImageUsage::TRANSFER_DST) {
        usage |= ImageUsage::COLOR_ATTACHMENT;

        if !format.is_color() {
            usage |= ImageUsage::DEPTH_STENCIL_ATTACHMENT;
        }
    }

    usage
}
