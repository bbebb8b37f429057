// Copyright (c) 2024 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

use crate::{
    macros::{vulkan_bitflags, vulkan_enum},
    SurfaceError, ValidationError,
};

vulkan_enum! {
    /// A single aspect of an image. Each aspect is backed by its own surface.
    ImageAspect = ImageAspectFlags(u32);

    /// The single aspect of images with a color format.
    Color = COLOR,

    /// The depth aspect of images with a depth or depth/stencil format.
    Depth = DEPTH,

    /// The stencil aspect of images with a stencil or depth/stencil format.
    Stencil = STENCIL,
}

impl From<ImageAspect> for ImageAspects {
    #[inline]
    fn from(aspect: ImageAspect) -> Self {
        match aspect {
            ImageAspect::Color => ImageAspects::COLOR,
            ImageAspect::Depth => ImageAspects::DEPTH,
            ImageAspect::Stencil => ImageAspects::STENCIL,
        }
    }
}

vulkan_bitflags! {
    /// A mask of multiple image aspects.
    ImageAspects = ImageAspectFlags(u32);

    /// The single aspect of images with a color format.
    COLOR = COLOR,

    /// The depth aspect of images with a depth or depth/stencil format.
    DEPTH = DEPTH,

    /// The stencil aspect of images with a stencil or depth/stencil format.
    STENCIL = STENCIL,
}

/// Which surface of an image a consumer binds to.
///
/// This is the validated form of an [`ImageAspects`] mask: either exactly one aspect, or the
/// combined depth and stencil aspects. Nothing else can be represented.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AspectSelection {
    Color,
    Depth,
    Stencil,

    /// Both depth and stencil. Resolves to the depth surface if the image has one, and to the
    /// stencil surface otherwise.
    DepthStencil,
}

impl AspectSelection {
    /// Returns the aspects that `self` selects.
    #[inline]
    pub const fn aspects(self) -> ImageAspects {
        match self {
            Self::Color => ImageAspects::COLOR,
            Self::Depth => ImageAspects::DEPTH,
            Self::Stencil => ImageAspects::STENCIL,
            Self::DepthStencil => ImageAspects::DEPTH.union(ImageAspects::STENCIL),
        }
    }

    /// Returns the single aspect that `self` selects, or `None` for the combined selection.
    #[inline]
    pub const fn single(self) -> Option<ImageAspect> {
        match self {
            Self::Color => Some(ImageAspect::Color),
            Self::Depth => Some(ImageAspect::Depth),
            Self::Stencil => Some(ImageAspect::Stencil),
            Self::DepthStencil => None,
        }
    }
}

impl From<ImageAspect> for AspectSelection {
    #[inline]
    fn from(aspect: ImageAspect) -> Self {
        match aspect {
            ImageAspect::Color => Self::Color,
            ImageAspect::Depth => Self::Depth,
            ImageAspect::Stencil => Self::Stencil,
        }
    }
}

impl TryFrom<ImageAspects> for AspectSelection {
    type Error = SurfaceError;

    fn try_from(aspects: ImageAspects) -> Result<Self, Self::Error> {
        if aspects == ImageAspects::COLOR {
            Ok(Self::Color)
        } else if aspects == ImageAspects::DEPTH {
            Ok(Self::Depth)
        } else if aspects == ImageAspects::STENCIL {
            Ok(Self::Stencil)
        } else if aspects == ImageAspects::DEPTH | ImageAspects::STENCIL {
            Ok(Self::DepthStencil)
        } else {
            Err(SurfaceError::InvalidAspect(ValidationError::new(
                "aspects",
                format!(
                    "is `{:?}`, which selects neither a single aspect nor depth and stencil",
                    aspects,
                ),
            )))
        }
    }
}
