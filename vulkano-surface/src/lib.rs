// Copyright (c) 2024 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Image surface layout planning and view descriptor building.
//!
//! # Brief summary
//!
//! - The [`Device`](crate::device::Device) holds the hardware description, the
//!   [geometry oracle](crate::image::geometry::GeometryOracle) that computes the pitches and
//!   sizes of tiled surfaces, and the
//!   [descriptor allocator](crate::descriptor::DescriptorAllocator) that hands out memory for
//!   hardware descriptors.
//!
//! - A [`RawImage`](crate::image::sys::RawImage) is the layout of an image: one physical
//!   [`Surface`](crate::image::sys::Surface) per aspect (color, or depth and/or stencil), all
//!   packed into a single allocation. Binding memory to it produces an
//!   [`Image`](crate::image::Image).
//!
//! - An [`ImageView`](crate::image::view::ImageView) is a typed, ranged and swizzled window onto
//!   one surface of an image. Its sampler, render target and storage descriptors are built
//!   eagerly when the view is created.
//!
//! - A [`BufferView`](crate::buffer::view::BufferView) is a typed window onto a range of a
//!   [`Buffer`](crate::buffer::Buffer), with sampler and storage descriptors.
//!
//! Nothing in this crate records or submits GPU work. It only produces the layouts and
//! descriptors that such work relies on.

use std::{
    borrow::Cow,
    error::Error,
    fmt::{Display, Error as FmtError, Formatter},
    num::NonZeroU64,
};

pub use crate::{
    descriptor::DescriptorPoolError, device::Device, image::geometry::GeometryError,
};

#[macro_use]
mod tests;
mod macros;

pub mod buffer;
pub mod descriptor;
pub mod device;
pub mod format;
pub mod image;
pub mod memory;

/// Represents memory size and offset values on a device.
/// Analogous to the Rust `usize` type on the host.
pub use ash::vk::DeviceSize;

/// A [`DeviceSize`] that is known not to equal zero.
pub type NonZeroDeviceSize = NonZeroU64;

/// A helper type for non-exhaustive structs.
///
/// This type cannot be constructed outside this crate. Structures with a field of this type can
/// only be constructed by calling a constructor function or `Default::default()`. The effect is
/// similar to the standard Rust `#[non_exhaustive]` attribute, except that it does not prevent
/// update syntax from being used.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)] // add traits as needed
pub struct NonExhaustive(pub(crate) ());

/// Error that can happen when creating or querying an image, a view or a buffer view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SurfaceError {
    /// An aspect or aspect mask is inconsistent with the format of the image, or more than one
    /// aspect was given where exactly one is required.
    InvalidAspect(Box<ValidationError>),

    /// A mip level or array layer range is out of bounds, or doesn't fit the view type.
    InvalidViewRange(Box<ValidationError>),

    /// A subresource layout was queried for a mip level or array layer other than zero. Only the
    /// first subresource of each surface has a known offset.
    UnsupportedSubresource { mip_level: u32, array_layer: u32 },

    /// A view format is not compatible with the format of the image it views.
    IncompatibleFormat(Box<ValidationError>),

    /// The declared usage of a resource doesn't allow the requested operation, or the creation
    /// parameters of a resource are invalid.
    InvalidUsage(Box<ValidationError>),

    /// Descriptor memory could not be allocated.
    OutOfMemory(DescriptorPoolError),

    /// The geometry oracle rejected parameters that validation should already have rejected.
    ///
    /// This is a bug in the caller or in this crate, never a recoverable condition.
    InternalInvariantViolation(GeometryError),
}

impl Error for SurfaceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidAspect(err)
            | Self::InvalidViewRange(err)
            | Self::IncompatibleFormat(err)
            | Self::InvalidUsage(err) => Some(err.as_ref()),
            Self::OutOfMemory(err) => Some(err),
            Self::InternalInvariantViolation(err) => Some(err),
            Self::UnsupportedSubresource { .. } => None,
        }
    }
}

impl Display for SurfaceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            Self::InvalidAspect(_) => write!(f, "the aspect is not valid for the image"),
            Self::InvalidViewRange(_) => write!(f, "the subresource range is not valid"),
            Self::UnsupportedSubresource {
                mip_level,
                array_layer,
            } => write!(
                f,
                "the layout of mip level {} array layer {} cannot be queried, only the first \
                subresource of a surface is supported",
                mip_level, array_layer,
            ),
            Self::IncompatibleFormat(_) => {
                write!(f, "the view format is not compatible with the image format")
            }
            Self::InvalidUsage(_) => write!(f, "the usage or creation parameters are not valid"),
            Self::OutOfMemory(_) => write!(f, "descriptor memory could not be allocated"),
            Self::InternalInvariantViolation(_) => write!(
                f,
                "the surface geometry could not be computed for parameters that passed validation",
            ),
        }
    }
}

impl From<DescriptorPoolError> for SurfaceError {
    #[inline]
    fn from(err: DescriptorPoolError) -> Self {
        Self::OutOfMemory(err)
    }
}

/// The arguments or other context of a call did not match the requirements.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationError {
    /// The context in which the problem exists (e.g. a specific parameter).
    pub context: Cow<'static, str>,

    /// A description of the problem.
    pub problem: Cow<'static, str>,
}

impl ValidationError {
    pub(crate) fn new(
        context: impl Into<Cow<'static, str>>,
        problem: impl Into<Cow<'static, str>>,
    ) -> Box<Self> {
        Box::new(ValidationError {
            context: context.into(),
            problem: problem.into(),
        })
    }

    pub(crate) fn add_context(
        mut self: Box<Self>,
        context: impl Into<Cow<'static, str>>,
    ) -> Box<Self> {
        let context = context.into();

        if self.context.is_empty() {
            self.context = context;
        } else {
            self.context = format!("{}.{}", context, self.context).into();
        }

        self
    }
}

impl Error for ValidationError {}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        if self.context.is_empty() {
            write!(f, "{}", self.problem)
        } else {
            write!(f, "{}: {}", self.context, self.problem)
        }
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;

    #[test]
    fn validation_error_context_nests() {
        let err = ValidationError::new("mip_levels", "is empty")
            .add_context("subresource_range")
            .add_context("create_info");

        assert_eq!(err.context, "create_info.subresource_range.mip_levels");
        assert_eq!(
            err.to_string(),
            "create_info.subresource_range.mip_levels: is empty",
        );
    }

    #[test]
    fn surface_error_exposes_source() {
        let err = SurfaceError::from(DescriptorPoolError::OutOfPoolMemory);
        assert!(err.source().is_some());

        let err = SurfaceError::UnsupportedSubresource {
            mip_level: 1,
            array_layer: 0,
        };
        assert!(err.source().is_none());
        assert!(err.to_string().contains("mip level 1"));
    }
}
