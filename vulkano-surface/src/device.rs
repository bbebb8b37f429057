// Copyright (c) 2024 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! The context object shared by every resource.
//!
//! A [`Device`] describes the hardware that surfaces and descriptors are built for, and owns the
//! two collaborators that the rest of the crate consumes through traits: the
//! [geometry oracle](GeometryOracle) and the [descriptor allocator](DescriptorAllocator).

use crate::{
    descriptor::{DescriptorAllocator, DescriptorPool, DescriptorPoolCreateInfo},
    image::geometry::{GeometryOracle, StandardGeometry},
    NonExhaustive, ValidationError,
};
use std::{
    fmt::{Debug, Error as FmtError, Formatter},
    sync::Arc,
};

/// The lowest hardware generation that surfaces can be built for.
pub const MIN_GENERATION: u32 = 7;

/// The highest hardware generation that surfaces can be built for.
pub const MAX_GENERATION: u32 = 12;

/// Hardware description plus the collaborators used to lay out surfaces and store descriptors.
pub struct Device {
    generation: u32,
    is_haswell: bool,
    has_llc: bool,
    mocs: u32,
    geometry: Arc<dyn GeometryOracle>,
    descriptor_allocator: Arc<dyn DescriptorAllocator>,
}

impl Device {
    /// Creates a new `Device`.
    ///
    /// If `create_info.geometry` is `None`, [`StandardGeometry`] is used. If
    /// `create_info.descriptor_allocator` is `None`, a [`DescriptorPool`] is created from
    /// `create_info.descriptor_pool`.
    pub fn new(create_info: DeviceCreateInfo) -> Result<Arc<Device>, Box<ValidationError>> {
        create_info
            .validate()
            .map_err(|err| err.add_context("create_info"))?;

        let DeviceCreateInfo {
            generation,
            is_haswell,
            has_llc,
            mocs,
            geometry,
            descriptor_allocator,
            descriptor_pool,
            _ne: _,
        } = create_info;

        let geometry: Arc<dyn GeometryOracle> = match geometry {
            Some(geometry) => geometry,
            None => Arc::new(StandardGeometry::new()),
        };
        let descriptor_allocator: Arc<dyn DescriptorAllocator> = match descriptor_allocator {
            Some(descriptor_allocator) => descriptor_allocator,
            None => DescriptorPool::new(descriptor_pool)
                .map_err(|err| err.add_context("create_info.descriptor_pool"))?,
        };

        log::debug!(
            "created device: generation {}, haswell {}, llc {}",
            generation,
            is_haswell,
            has_llc,
        );

        Ok(Arc::new(Device {
            generation,
            is_haswell,
            has_llc,
            mocs,
            geometry,
            descriptor_allocator,
        }))
    }

    /// Returns the hardware generation.
    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Returns whether the hardware is a Haswell part of generation 7.
    #[inline]
    pub fn is_haswell(&self) -> bool {
        self.is_haswell
    }

    /// Returns whether the CPU and GPU share a coherent last-level cache. Without one, descriptor
    /// memory must be flushed after it is written.
    #[inline]
    pub fn has_llc(&self) -> bool {
        self.has_llc
    }

    /// Returns the memory object control state written into every descriptor.
    #[inline]
    pub fn mocs(&self) -> u32 {
        self.mocs
    }

    /// Returns the geometry oracle.
    #[inline]
    pub fn geometry(&self) -> &Arc<dyn GeometryOracle> {
        &self.geometry
    }

    /// Returns the descriptor allocator.
    #[inline]
    pub fn descriptor_allocator(&self) -> &Arc<dyn DescriptorAllocator> {
        &self.descriptor_allocator
    }
}

impl Debug for Device {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        f.debug_struct("Device")
            .field("generation", &self.generation)
            .field("is_haswell", &self.is_haswell)
            .field("has_llc", &self.has_llc)
            .field("mocs", &self.mocs)
            .field("geometry", &self.geometry)
            .field("descriptor_allocator", &self.descriptor_allocator)
            .finish()
    }
}

/// Parameters to create a new `Device`.
#[derive(Clone)]
pub struct DeviceCreateInfo {
    /// The hardware generation.
    ///
    /// The default value is `9`.
    pub generation: u32,

    /// Whether the hardware is a Haswell part. Only valid together with generation 7.
    ///
    /// The default value is `false`.
    pub is_haswell: bool,

    /// Whether the platform has a coherent last-level cache.
    ///
    /// The default value is `true`.
    pub has_llc: bool,

    /// The memory object control state written into every descriptor.
    ///
    /// The default value is `0`.
    pub mocs: u32,

    /// The geometry oracle to use.
    ///
    /// The default value is `None`, which means [`StandardGeometry`].
    pub geometry: Option<Arc<dyn GeometryOracle>>,

    /// The descriptor allocator to use.
    ///
    /// The default value is `None`, which means a [`DescriptorPool`] created from
    /// `descriptor_pool`.
    pub descriptor_allocator: Option<Arc<dyn DescriptorAllocator>>,

    /// Parameters of the default descriptor pool. Ignored if `descriptor_allocator` is `Some`.
    ///
    /// The default value is `DescriptorPoolCreateInfo::default()`.
    pub descriptor_pool: DescriptorPoolCreateInfo,

    pub _ne: NonExhaustive,
}

impl Default for DeviceCreateInfo {
    #[inline]
    fn default() -> Self {
        Self {
            generation: 9,
            is_haswell: false,
            has_llc: true,
            mocs: 0,
            geometry: None,
            descriptor_allocator: None,
            descriptor_pool: DescriptorPoolCreateInfo::default(),
            _ne: NonExhaustive(()),
        }
    }
}

impl DeviceCreateInfo {
    pub(crate) fn validate(&self) -> Result<(), Box<ValidationError>> {
        let &Self {
            generation,
            is_haswell,
            has_llc: _,
            mocs: _,
            geometry: _,
            descriptor_allocator: _,
            descriptor_pool: _,
            _ne: _,
        } = self;

        if !(MIN_GENERATION..=MAX_GENERATION).contains(&generation) {
            return Err(ValidationError::new(
                "generation",
                format!(
                    "is {}, which is not between {} and {}",
                    generation, MIN_GENERATION, MAX_GENERATION,
                ),
            ));
        }

        if is_haswell && generation != 7 {
            return Err(ValidationError::new(
                "is_haswell",
                "is `true`, but `generation` is not 7",
            ));
        }

        Ok(())
    }
}

impl Debug for DeviceCreateInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        f.debug_struct("DeviceCreateInfo")
            .field("generation", &self.generation)
            .field("is_haswell", &self.is_haswell)
            .field("has_llc", &self.has_llc)
            .field("mocs", &self.mocs)
            .field("descriptor_pool", &self.descriptor_pool)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let device = Device::new(DeviceCreateInfo::default()).unwrap();

        assert_eq!(device.generation(), 9);
        assert!(!device.is_haswell());
        assert!(device.has_llc());
        assert_eq!(device.mocs(), 0);
    }

    #[test]
    fn generation_out_of_range() {
        let err = Device::new(DeviceCreateInfo {
            generation: 5,
            ..Default::default()
        })
        .unwrap_err();

        assert_eq!(err.context, "create_info.generation");
    }

    #[test]
    fn haswell_requires_gen7() {
        assert!(Device::new(DeviceCreateInfo {
            generation: 8,
            is_haswell: true,
            ..Default::default()
        })
        .is_err());

        assert!(Device::new(DeviceCreateInfo {
            generation: 7,
            is_haswell: true,
            ..Default::default()
        })
        .is_ok());
    }
}
