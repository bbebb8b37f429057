// Copyright (c) 2024 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Image views.
//!
//! This module contains types related to image views. An image view is a typed, ranged and
//! swizzled window onto one surface of an image. Creating a view builds the hardware descriptors
//! that shaders and render targets use to access the image:
//!
//! - a sampler descriptor, if the image has sampled usage,
//! - a render target descriptor, if the image has color attachment usage,
//! - a storage descriptor, if the image has storage usage.
//!
//! Each descriptor is only built if its usage is also present in the
//! [`usage_mask`](ImageViewCreateInfo::usage_mask) of the view. A descriptor that isn't built
//! has a size of zero.

use super::{
    geometry::SurfaceGeometry, minify, AspectSelection, Image, ImageAspect, ImageAspects,
    ImageCreateFlags, ImageSubresourceRange, ImageType, ImageUsage, Surface, SurfaceUsage,
};
use crate::{
    descriptor::{
        fill_buffer_surface_state, fill_image_param, fill_surface_state, BufferSurfaceStateInfo,
        ChannelSelect, DescriptorClass, DescriptorSlot, DescriptorSlots, ImageParam,
        SurfaceState, SurfaceStateInfo, SurfaceView,
    },
    device::Device,
    format::{Format, FormatSwizzle, HardwareFormat},
    macros::vulkan_enum,
    DeviceSize, NonExhaustive, SurfaceError, ValidationError,
};
use std::sync::{Arc, Weak};

/// A view of one surface of an [`Image`], with its hardware descriptors.
///
/// The view doesn't keep the image alive. The caller must destroy the view before the image and
/// its memory; [`image`](Self::image) returns `None` once the image is gone.
#[derive(Debug)]
pub struct ImageView {
    image: Weak<Image>,
    device: Arc<Device>,

    view_type: ImageViewType,
    format: Format,
    hardware_format: HardwareFormat,
    component_mapping: ComponentMapping,
    subresource_range: ImageSubresourceRange,
    aspect: ImageAspect,
    offset: DeviceSize,
    extent: [u32; 3],

    descriptors: DescriptorSlots,
    storage_image_param: Option<ImageParam>,
}

impl ImageView {
    /// Creates a new `ImageView` and builds its descriptors.
    ///
    /// # Errors
    ///
    /// - Returns [`SurfaceError::InvalidAspect`] if `create_info.subresource_range.aspects`
    ///   doesn't select a surface of the image.
    /// - Returns [`SurfaceError::InvalidViewRange`] if the mip levels or array layers are out of
    ///   bounds, or don't fit the view type. Also returned if an untyped storage descriptor would
    ///   hold more elements than it can address.
    /// - Returns [`SurfaceError::InvalidUsage`] if the image usage doesn't allow views, or if a
    ///   cube view is requested of an image that isn't cube compatible.
    /// - Returns [`SurfaceError::IncompatibleFormat`] if the view format can't be used to view
    ///   the selected surface.
    /// - Returns [`SurfaceError::OutOfMemory`] if a descriptor couldn't be allocated. Descriptors
    ///   that were already built for the view are freed.
    pub fn new(
        image: &Arc<Image>,
        create_info: ImageViewCreateInfo,
    ) -> Result<Arc<ImageView>, SurfaceError> {
        let surface = validate_new(image, &create_info)?;

        let ImageViewCreateInfo {
            view_type,
            format,
            component_mapping,
            subresource_range,
            usage_mask,
            offset,
            reinterpret_as_attachment: _,
            _ne: _,
        } = create_info;

        let device = image.device().clone();
        let geometry = surface.geometry();

        let (hardware_format, format_swizzle) = view_hardware_format(image, surface, format)?;

        let base_level = subresource_range.mip_levels.start;
        let mut view = SurfaceView {
            format: hardware_format,
            usage: SurfaceUsage::empty(),
            base_level,
            levels: subresource_range.mip_levels.len() as u32,
            base_array_layer: subresource_range.array_layers.start,
            array_len: subresource_range.array_layers.len() as u32,
            channel_select: component_mapping.channel_select(format_swizzle),
        };

        let image_extent = image.extent();

        // An uncompressed view of a compressed surface addresses each block as one texel, and
        // sees the whole surface as a single level.
        let level0_extent = if !hardware_format.is_compressed() && geometry.format.is_compressed()
        {
            let [_, _, block_depth] = geometry.format.block_extent();
            view.base_level = 0;
            view.base_array_layer = 0;

            [
                geometry.row_pitch_el(),
                geometry.array_pitch_el_rows * geometry.array_layers,
                minify(image_extent[2], base_level).div_ceil(block_depth),
            ]
        } else {
            image_extent
        };

        let extent = image_extent.map(|extent| minify(extent, base_level));

        let cube_usage = if view_type.is_cube() {
            SurfaceUsage::CUBE
        } else {
            SurfaceUsage::empty()
        };

        let memory = image.memory();
        let relative_offset = surface.offset() + offset;
        let view_offset = memory.offset() + relative_offset;
        let address = memory.device_address(relative_offset);

        let builder = DescriptorBuilder {
            device: &device,
            geometry,
            view: &view,
            level0_extent,
            address,
        };

        let usage = image.usage() & usage_mask;

        let storage_state = if usage.intersects(ImageUsage::STORAGE) {
            if hardware_format.has_matching_typed_storage(&device) {
                Some(builder.surface_state(SurfaceUsage::STORAGE | cube_usage))
            } else {
                log::warn!(
                    "no typed storage format matches {:?}, falling back to untyped storage access",
                    hardware_format,
                );

                let state = fill_buffer_surface_state(&BufferSurfaceStateInfo {
                    format: HardwareFormat::RAW,
                    usage: SurfaceUsage::STORAGE,
                    address,
                    range: surface.size() - offset,
                    stride: 1,
                    mocs: device.mocs(),
                })
                .map_err(|err| SurfaceError::InvalidViewRange(err.add_context("create_info")))?;

                Some(state)
            }
        } else {
            None
        };

        let mut descriptors = DescriptorSlots::new(device.descriptor_allocator().clone());
        let mut storage_image_param = None;

        if usage.intersects(ImageUsage::SAMPLED) {
            let state = builder.surface_state(SurfaceUsage::TEXTURE | cube_usage);
            descriptors.build(DescriptorClass::Sample, &state, device.has_llc())?;
        }

        if usage.intersects(ImageUsage::COLOR_ATTACHMENT) {
            let state = builder.surface_state(SurfaceUsage::RENDER_TARGET | cube_usage);
            descriptors.build(DescriptorClass::RenderTarget, &state, device.has_llc())?;
        }

        if let Some(state) = storage_state {
            descriptors.build(DescriptorClass::Storage, &state, device.has_llc())?;
            storage_image_param = Some(fill_image_param(geometry, &view));
        }

        log::debug!(
            "created {:?} view of the {:?} surface as {:?} with descriptors {:?}",
            view_type,
            surface.aspect(),
            hardware_format,
            descriptors.classes().collect::<Vec<_>>(),
        );

        Ok(Arc::new(ImageView {
            image: Arc::downgrade(image),
            device,
            view_type,
            format,
            hardware_format,
            component_mapping,
            subresource_range,
            aspect: surface.aspect(),
            offset: view_offset,
            extent,
            descriptors,
            storage_image_param,
        }))
    }

    /// Returns the image that the view was created from, if it is still alive.
    #[inline]
    pub fn image(&self) -> Option<Arc<Image>> {
        self.image.upgrade()
    }

    /// Returns the device that owns the view.
    #[inline]
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    /// Returns the view type.
    #[inline]
    pub fn view_type(&self) -> ImageViewType {
        self.view_type
    }

    /// Returns the format of the view.
    #[inline]
    pub fn format(&self) -> Format {
        self.format
    }

    /// Returns the hardware format that the descriptors of the view use.
    #[inline]
    pub fn hardware_format(&self) -> HardwareFormat {
        self.hardware_format
    }

    /// Returns the component mapping of the view.
    #[inline]
    pub fn component_mapping(&self) -> ComponentMapping {
        self.component_mapping
    }

    /// Returns the subresource range that the view covers.
    #[inline]
    pub fn subresource_range(&self) -> &ImageSubresourceRange {
        &self.subresource_range
    }

    /// Returns the aspect of the surface that the view binds to.
    #[inline]
    pub fn aspect(&self) -> ImageAspect {
        self.aspect
    }

    /// Returns the offset of the start of the view within the allocation of the image.
    #[inline]
    pub fn offset(&self) -> DeviceSize {
        self.offset
    }

    /// Returns the extent of the base mip level of the view.
    #[inline]
    pub fn extent(&self) -> [u32; 3] {
        self.extent
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

struct DescriptorBuilder<'a> {
    device: &'a Device,
    geometry: &'a SurfaceGeometry,
    view: &'a SurfaceView,
    level0_extent: [u32; 3],
    address: DeviceSize,
}

impl DescriptorBuilder<'_> {
    fn surface_state(&self, usage: SurfaceUsage) -> SurfaceState {
        fill_surface_state(&SurfaceStateInfo {
            surface: self.geometry,
            view: &SurfaceView {
                usage,
                ..self.view.clone()
            },
            level0_extent: self.level0_extent,
            address: self.address,
            mocs: self.device.mocs(),
        })
    }
}

fn validate_new<'a>(
    image: &'a Image,
    create_info: &ImageViewCreateInfo,
) -> Result<&'a Surface, SurfaceError> {
    let &ImageViewCreateInfo {
        view_type,
        format,
        component_mapping: _,
        ref subresource_range,
        usage_mask: _,
        offset,
        reinterpret_as_attachment,
        _ne: _,
    } = create_info;

    let selection = AspectSelection::try_from(subresource_range.aspects)
        .map_err(|err| add_context(err, "create_info.subresource_range"))?;

    let reinterpret = reinterpret_as_attachment
        && selection == AspectSelection::Color
        && !image.format().is_color();

    let surface = if reinterpret {
        image.attachment_surface()
    } else {
        image
            .surface_for_aspects(selection)
            .map_err(|err| add_context(err, "create_info.subresource_range"))?
    };

    validate_range(image, view_type, subresource_range)
        .map_err(|err| SurfaceError::InvalidViewRange(err.add_context("create_info")))?;

    if view_type.is_cube() && !image.flags().intersects(ImageCreateFlags::CUBE_COMPATIBLE) {
        return Err(SurfaceError::InvalidUsage(ValidationError::new(
            "create_info.view_type",
            "is `ImageViewType::Cube` or `ImageViewType::CubeArray`, but the image was not \
            created with `ImageCreateFlags::CUBE_COMPATIBLE`",
        )));
    }

    if !image.usage().intersects(
        ImageUsage::SAMPLED
            | ImageUsage::STORAGE
            | ImageUsage::COLOR_ATTACHMENT
            | ImageUsage::DEPTH_STENCIL_ATTACHMENT,
    ) {
        return Err(SurfaceError::InvalidUsage(ValidationError::new(
            "image.usage()",
            "contains none of `ImageUsage::SAMPLED`, `ImageUsage::STORAGE`, \
            `ImageUsage::COLOR_ATTACHMENT` or `ImageUsage::DEPTH_STENCIL_ATTACHMENT`",
        )));
    }

    if offset >= surface.size() {
        return Err(SurfaceError::InvalidViewRange(ValidationError::new(
            "create_info.offset",
            format!(
                "is {}, which is not less than the {} bytes of the viewed surface",
                offset,
                surface.size(),
            ),
        )));
    }

    if !reinterpret {
        validate_format(image.format(), format, selection)
            .map_err(|err| SurfaceError::IncompatibleFormat(err.add_context("create_info")))?;
    }

    Ok(surface)
}

fn validate_range(
    image: &Image,
    view_type: ImageViewType,
    subresource_range: &ImageSubresourceRange,
) -> Result<(), Box<ValidationError>> {
    let ImageSubresourceRange {
        aspects: _,
        mip_levels,
        array_layers,
    } = subresource_range;

    if mip_levels.is_empty() {
        return Err(ValidationError::new(
            "subresource_range.mip_levels",
            "is empty",
        ));
    }

    if mip_levels.end > image.mip_levels() {
        return Err(ValidationError::new(
            "subresource_range.mip_levels.end",
            format!(
                "is {}, which is greater than the {} mip levels of the image",
                mip_levels.end,
                image.mip_levels(),
            ),
        ));
    }

    if array_layers.is_empty() {
        return Err(ValidationError::new(
            "subresource_range.array_layers",
            "is empty",
        ));
    }

    // The layers of a 3D image are the depth slices of the base level.
    let layer_count = match image.image_type() {
        ImageType::Dim3d => minify(image.extent()[2], mip_levels.start),
        ImageType::Dim1d | ImageType::Dim2d => image.array_layers(),
    };

    if array_layers.end > layer_count {
        return Err(ValidationError::new(
            "subresource_range.array_layers.end",
            format!(
                "is {}, which is greater than the {} array layers of the image at the base mip \
                level",
                array_layers.end, layer_count,
            ),
        ));
    }

    if !view_type.is_compatible_with(image.image_type()) {
        return Err(ValidationError::new(
            "view_type",
            format!(
                "is `ImageViewType::{:?}`, which is not compatible with `ImageType::{:?}`",
                view_type,
                image.image_type(),
            ),
        ));
    }

    let view_layers = array_layers.len() as u32;

    match view_type {
        ImageViewType::Dim1d | ImageViewType::Dim2d if view_layers != 1 => {
            return Err(ValidationError::new(
                "subresource_range.array_layers",
                format!(
                    "contains {} layers, but `view_type` is `ImageViewType::{:?}`, which \
                    requires a single layer",
                    view_layers, view_type,
                ),
            ));
        }
        ImageViewType::Cube if view_layers != 6 => {
            return Err(ValidationError::new(
                "subresource_range.array_layers",
                format!(
                    "contains {} layers, but `view_type` is `ImageViewType::Cube`, which \
                    requires 6 layers",
                    view_layers,
                ),
            ));
        }
        ImageViewType::CubeArray if view_layers % 6 != 0 => {
            return Err(ValidationError::new(
                "subresource_range.array_layers",
                format!(
                    "contains {} layers, but `view_type` is `ImageViewType::CubeArray`, which \
                    requires a multiple of 6 layers",
                    view_layers,
                ),
            ));
        }
        _ => (),
    }

    Ok(())
}

fn validate_format(
    image_format: Format,
    view_format: Format,
    selection: AspectSelection,
) -> Result<(), Box<ValidationError>> {
    let aspects = selection.aspects();

    if aspects.intersects(ImageAspects::COLOR) {
        if !image_format.is_color() || !view_format.is_color() {
            return Err(ValidationError::new(
                "format",
                format!(
                    "is `Format::{:?}` and the image format is `Format::{:?}`, but a color view \
                    needs two color formats",
                    view_format, image_format,
                ),
            ));
        }

        if image_format.block_size() != view_format.block_size() {
            return Err(ValidationError::new(
                "format",
                format!(
                    "has a block size of {} bytes, but the image format has {} bytes",
                    view_format.block_size(),
                    image_format.block_size(),
                ),
            ));
        }
    }

    if aspects.intersects(ImageAspects::DEPTH) {
        if !image_format.has_depth() || !view_format.has_depth() {
            return Err(ValidationError::new(
                "format",
                format!(
                    "is `Format::{:?}` and the image format is `Format::{:?}`, but a depth view \
                    needs two formats with depth",
                    view_format, image_format,
                ),
            ));
        }

        if image_format.block_size() != view_format.block_size() {
            return Err(ValidationError::new(
                "format",
                format!(
                    "has a block size of {} bytes, but the image format has {} bytes",
                    view_format.block_size(),
                    image_format.block_size(),
                ),
            ));
        }
    }

    if aspects.intersects(ImageAspects::STENCIL)
        && (!image_format.has_stencil() || !view_format.has_stencil())
    {
        return Err(ValidationError::new(
            "format",
            format!(
                "is `Format::{:?}` and the image format is `Format::{:?}`, but a stencil view \
                needs two formats with stencil",
                view_format, image_format,
            ),
        ));
    }

    Ok(())
}

/// Resolves the hardware format of a view of `surface` as `format`.
fn view_hardware_format(
    image: &Image,
    surface: &Surface,
    format: Format,
) -> Result<(HardwareFormat, FormatSwizzle), SurfaceError> {
    let aspect = if format.is_color() {
        ImageAspect::Color
    } else {
        surface.aspect()
    };

    let (hardware_format, swizzle) = format
        .hardware_format(aspect, image.tiling())
        .ok_or_else(|| {
            SurfaceError::IncompatibleFormat(ValidationError::new(
                "create_info.format",
                format!(
                    "is `Format::{:?}`, which has no {:?} aspect",
                    format,
                    surface.aspect(),
                ),
            ))
        })?;

    let surface_block_size = surface.geometry().format.block_size();

    if hardware_format.block_size() != surface_block_size {
        return Err(SurfaceError::IncompatibleFormat(ValidationError::new(
            "create_info.format",
            format!(
                "is stored as `{:?}` with {}-byte blocks, but the {:?} surface has {}-byte blocks",
                hardware_format,
                hardware_format.block_size(),
                surface.aspect(),
                surface_block_size,
            ),
        )));
    }

    Ok((hardware_format, swizzle))
}

fn add_context(err: SurfaceError, context: &'static str) -> SurfaceError {
    match err {
        SurfaceError::InvalidAspect(err) => SurfaceError::InvalidAspect(err.add_context(context)),
        err => err,
    }
}

/// Parameters to create a new `ImageView`.
#[derive(Clone, Debug)]
pub struct ImageViewCreateInfo {
    /// The image view type.
    ///
    /// The view type must be compatible with the dimensions of the image and the selected array
    /// layers.
    ///
    /// The default value is [`ImageViewType::Dim2d`].
    pub view_type: ImageViewType,

    /// The format of the image view.
    ///
    /// The default value is [`Format::R8G8B8A8_UNORM`].
    pub format: Format,

    /// How to map components of each pixel.
    ///
    /// The default value is [`ComponentMapping::identity()`].
    pub component_mapping: ComponentMapping,

    /// The subresource range of the image that the view should cover.
    ///
    /// The default value is empty, which must be overridden.
    pub subresource_range: ImageSubresourceRange,

    /// Restricts which descriptors of the view are built. A descriptor is only built if its
    /// usage is present in both the image usage and this mask.
    ///
    /// The default value is [`ImageUsage::all()`].
    pub usage_mask: ImageUsage,

    /// An extra byte offset that is added to the start of the viewed surface.
    ///
    /// The default value is `0`.
    pub offset: DeviceSize,

    /// If `subresource_range.aspects` is the color aspect and the image has a depth/stencil
    /// format, view the surface that is bound when the image is used as a color attachment
    /// instead of failing. The view format then only needs the same block size as that surface.
    ///
    /// The default value is `false`.
    pub reinterpret_as_attachment: bool,

    pub _ne: NonExhaustive,
}

impl Default for ImageViewCreateInfo {
    #[inline]
    fn default() -> Self {
        Self {
            view_type: ImageViewType::Dim2d,
            format: Format::R8G8B8A8_UNORM,
            component_mapping: ComponentMapping::identity(),
            subresource_range: ImageSubresourceRange {
                aspects: ImageAspects::empty(),
                mip_levels: 0..0,
                array_layers: 0..0,
            },
            usage_mask: ImageUsage::all(),
            offset: 0,
            reinterpret_as_attachment: false,
            _ne: NonExhaustive(()),
        }
    }
}

impl ImageViewCreateInfo {
    /// Returns an `ImageViewCreateInfo` with the `view_type` determined from the image type and
    /// array layers, and `subresource_range` determined from the image format and covering the
    /// whole image.
    #[inline]
    pub fn from_image(image: &Image) -> Self {
        Self {
            view_type: match image.image_type() {
                ImageType::Dim1d if image.array_layers() == 1 => ImageViewType::Dim1d,
                ImageType::Dim1d => ImageViewType::Dim1dArray,
                ImageType::Dim2d if image.array_layers() == 1 => ImageViewType::Dim2d,
                ImageType::Dim2d => ImageViewType::Dim2dArray,
                ImageType::Dim3d => ImageViewType::Dim3d,
            },
            format: image.format(),
            subresource_range: ImageSubresourceRange::from_parameters(
                image.format().aspects(),
                image.mip_levels(),
                image.array_layers(),
            ),
            ..Default::default()
        }
    }
}

vulkan_enum! {
    /// The geometry type of an image view.
    ImageViewType impl {
        /// Returns whether the type is arrayed.
        #[inline]
        pub fn is_arrayed(self) -> bool {
            matches!(self, Self::Dim1dArray | Self::Dim2dArray | Self::CubeArray)
        }

        /// Returns whether the type is a cube or a cube array.
        #[inline]
        pub fn is_cube(self) -> bool {
            matches!(self, Self::Cube | Self::CubeArray)
        }

        /// Returns whether a view of this type can be created from an image of type
        /// `image_type`.
        #[inline]
        pub fn is_compatible_with(self, image_type: ImageType) -> bool {
            match self {
                Self::Dim1d | Self::Dim1dArray => image_type == ImageType::Dim1d,
                Self::Dim2d | Self::Dim2dArray | Self::Cube | Self::CubeArray => {
                    image_type == ImageType::Dim2d
                }
                Self::Dim3d => image_type == ImageType::Dim3d,
            }
        }
    }
    = ImageViewType(i32);

    Dim1d = TYPE_1D,
    Dim1dArray = TYPE_1D_ARRAY,
    Dim2d = TYPE_2D,
    Dim2dArray = TYPE_2D_ARRAY,
    Dim3d = TYPE_3D,
    Cube = CUBE,
    CubeArray = CUBE_ARRAY,
}

/// A mapping between components of a source format and components read by a shader.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ComponentMapping {
    /// First component.
    pub r: ComponentSwizzle,
    /// Second component.
    pub g: ComponentSwizzle,
    /// Third component.
    pub b: ComponentSwizzle,
    /// Fourth component.
    pub a: ComponentSwizzle,
}

impl ComponentMapping {
    /// Creates a `ComponentMapping` with all components identity swizzled.
    #[inline]
    pub fn identity() -> Self {
        Self::default()
    }

    /// Returns `true` if all components are identity swizzled,
    /// meaning that all the members are `Identity` or the name of that member.
    #[inline]
    pub fn is_identity(&self) -> bool {
        matches!(self.r, ComponentSwizzle::Identity | ComponentSwizzle::Red)
            && matches!(self.g, ComponentSwizzle::Identity | ComponentSwizzle::Green)
            && matches!(self.b, ComponentSwizzle::Identity | ComponentSwizzle::Blue)
            && matches!(self.a, ComponentSwizzle::Identity | ComponentSwizzle::Alpha)
    }

    /// Composes the mapping with the order in which a format stores its components, returning
    /// the hardware channel that each output component reads.
    pub fn channel_select(&self, format_swizzle: FormatSwizzle) -> [ChannelSelect; 4] {
        [
            remap_swizzle(self.r, ComponentSwizzle::Red, format_swizzle),
            remap_swizzle(self.g, ComponentSwizzle::Green, format_swizzle),
            remap_swizzle(self.b, ComponentSwizzle::Blue, format_swizzle),
            remap_swizzle(self.a, ComponentSwizzle::Alpha, format_swizzle),
        ]
    }
}

fn remap_swizzle(
    swizzle: ComponentSwizzle,
    component: ComponentSwizzle,
    format_swizzle: FormatSwizzle,
) -> ChannelSelect {
    let swizzle = match swizzle {
        ComponentSwizzle::Identity => component,
        swizzle => swizzle,
    };

    match swizzle {
        ComponentSwizzle::Zero => ChannelSelect::Zero,
        ComponentSwizzle::One => ChannelSelect::One,
        ComponentSwizzle::Red => ChannelSelect::channel(format_swizzle.r),
        ComponentSwizzle::Green => ChannelSelect::channel(format_swizzle.g),
        ComponentSwizzle::Blue => ChannelSelect::channel(format_swizzle.b),
        ComponentSwizzle::Alpha => ChannelSelect::channel(format_swizzle.a),
        ComponentSwizzle::Identity => unreachable!("`component` is never `Identity`"),
    }
}

vulkan_enum! {
    /// Describes the value that an individual component must return when being accessed.
    ComponentSwizzle = ComponentSwizzle(i32);

    /// Returns the value that this component should normally have.
    ///
    /// This is the `Default` value.
    Identity = IDENTITY,

    /// Always return zero.
    Zero = ZERO,

    /// Always return one.
    One = ONE,

    /// Returns the value of the first component.
    Red = R,

    /// Returns the value of the second component.
    Green = G,

    /// Returns the value of the third component.
    Blue = B,

    /// Returns the value of the fourth component.
    Alpha = A,
}

impl Default for ComponentSwizzle {
    #[inline]
    fn default() -> ComponentSwizzle {
        ComponentSwizzle::Identity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        descriptor::{DescriptorPool, DescriptorPoolCreateInfo, SurfaceType},
        device::DeviceCreateInfo,
        image::{ImageCreateInfo, RawImage},
        memory::{AllocationHandle, ResourceMemory},
    };
    use std::ops::Range;

    const BASE_ADDRESS: DeviceSize = 0x1_0000_0000;

    fn bound_image(device: Arc<Device>, create_info: ImageCreateInfo) -> Arc<Image> {
        let raw_image = RawImage::new(device, create_info).unwrap();
        let memory = ResourceMemory::whole(AllocationHandle {
            device_address: BASE_ADDRESS,
            size: raw_image.size(),
        });

        Arc::new(raw_image.bind_memory(memory).unwrap())
    }

    fn pool_device(
        slot_count: u32,
        generation: u32,
        has_llc: bool,
    ) -> (Arc<Device>, Arc<DescriptorPool>) {
        let pool = DescriptorPool::new(DescriptorPoolCreateInfo {
            slot_count,
            ..Default::default()
        })
        .unwrap();
        let device = device!(DeviceCreateInfo {
            generation,
            has_llc,
            descriptor_allocator: Some(pool.clone()),
            ..Default::default()
        });

        (device, pool)
    }

    fn color_image(device: Arc<Device>, usage: ImageUsage) -> Arc<Image> {
        bound_image(
            device,
            ImageCreateInfo {
                format: Format::R8G8B8A8_UNORM,
                extent: [64, 32, 1],
                mip_levels: 3,
                array_layers: 4,
                usage,
                ..Default::default()
            },
        )
    }

    fn depth_stencil_image(device: Arc<Device>, usage: ImageUsage) -> Arc<Image> {
        bound_image(
            device,
            ImageCreateInfo {
                format: Format::D24_UNORM_S8_UINT,
                extent: [64, 64, 1],
                usage,
                ..Default::default()
            },
        )
    }

    fn color_range(mip_levels: Range<u32>, array_layers: Range<u32>) -> ImageSubresourceRange {
        ImageSubresourceRange {
            aspects: ImageAspects::COLOR,
            mip_levels,
            array_layers,
        }
    }

    #[test]
    fn depth_stencil_sampled_view() {
        let device = device!();
        let image = depth_stencil_image(
            device,
            ImageUsage::DEPTH_STENCIL_ATTACHMENT | ImageUsage::SAMPLED,
        );

        let view = ImageView::new(
            &image,
            ImageViewCreateInfo {
                format: Format::D24_UNORM_S8_UINT,
                subresource_range: ImageSubresourceRange::from_parameters(
                    ImageAspects::DEPTH | ImageAspects::STENCIL,
                    1,
                    1,
                ),
                usage_mask: ImageUsage::SAMPLED,
                ..Default::default()
            },
        )
        .unwrap();

        assert!(view.descriptor_size(DescriptorClass::Sample) > 0);
        assert_eq!(view.descriptor_size(DescriptorClass::RenderTarget), 0);
        assert_eq!(view.descriptor_size(DescriptorClass::Storage), 0);
        assert_eq!(view.aspect(), ImageAspect::Depth);
        assert_eq!(view.hardware_format(), HardwareFormat::R24_UNORM_X8_TYPELESS);

        let depth = image.surface(ImageAspect::Depth).unwrap();
        let state = view.descriptor_state(DescriptorClass::Sample).unwrap();
        assert_eq!(state.address, BASE_ADDRESS + depth.offset());
        assert_eq!(state.usage, SurfaceUsage::TEXTURE.as_raw());
    }

    #[test]
    fn sampler_needs_sampled_image_usage() {
        let (device, pool) = pool_device(4, 9, true);
        let image = depth_stencil_image(device, ImageUsage::DEPTH_STENCIL_ATTACHMENT);
        assert!(!image.usage().intersects(ImageUsage::SAMPLED));

        let view = ImageView::new(
            &image,
            ImageViewCreateInfo {
                format: Format::D24_UNORM_S8_UINT,
                subresource_range: ImageSubresourceRange::from_parameters(
                    ImageAspects::DEPTH | ImageAspects::STENCIL,
                    1,
                    1,
                ),
                usage_mask: ImageUsage::SAMPLED,
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(view.aspect(), ImageAspect::Depth);
        assert_eq!(view.descriptor_size(DescriptorClass::Sample), 0);
        assert_eq!(view.descriptor_size(DescriptorClass::RenderTarget), 0);
        assert_eq!(view.descriptor_size(DescriptorClass::Storage), 0);
        assert!(view.descriptor_state(DescriptorClass::Sample).is_none());
        assert_eq!(pool.free_count(), 4);
    }

    #[test]
    fn stencil_view() {
        let device = device!();
        let image = depth_stencil_image(device, ImageUsage::SAMPLED);

        let view = ImageView::new(
            &image,
            ImageViewCreateInfo {
                format: Format::S8_UINT,
                subresource_range: ImageSubresourceRange::from_parameters(
                    ImageAspects::STENCIL,
                    1,
                    1,
                ),
                ..Default::default()
            },
        )
        .unwrap();

        let stencil = image.surface(ImageAspect::Stencil).unwrap();
        assert_eq!(view.aspect(), ImageAspect::Stencil);
        assert_eq!(view.hardware_format(), HardwareFormat::R8_UINT);
        assert_eq!(view.offset(), stencil.offset());
    }

    #[test]
    fn range_bounds() {
        let device = device!();
        let image = color_image(device, ImageUsage::SAMPLED);

        let create_info = |mip_levels, array_layers| ImageViewCreateInfo {
            view_type: ImageViewType::Dim2dArray,
            subresource_range: color_range(mip_levels, array_layers),
            ..Default::default()
        };

        assert!(ImageView::new(&image, create_info(1..3, 2..4)).is_ok());
        assert!(matches!(
            ImageView::new(&image, create_info(1..4, 2..4)),
            Err(SurfaceError::InvalidViewRange(_)),
        ));
        assert!(matches!(
            ImageView::new(&image, create_info(1..3, 2..5)),
            Err(SurfaceError::InvalidViewRange(_)),
        ));
        assert!(matches!(
            ImageView::new(&image, create_info(1..1, 0..1)),
            Err(SurfaceError::InvalidViewRange(_)),
        ));
        assert!(matches!(
            ImageView::new(&image, create_info(0..1, 3..3)),
            Err(SurfaceError::InvalidViewRange(_)),
        ));
    }

    #[test]
    fn depth_slices_of_3d_image() {
        let device = device!();
        let image = bound_image(
            device,
            ImageCreateInfo {
                image_type: ImageType::Dim3d,
                extent: [16, 16, 8],
                mip_levels: 2,
                usage: ImageUsage::SAMPLED,
                ..Default::default()
            },
        );

        let create_info = |mip_levels, array_layers| ImageViewCreateInfo {
            view_type: ImageViewType::Dim3d,
            subresource_range: color_range(mip_levels, array_layers),
            ..Default::default()
        };

        let view = ImageView::new(&image, create_info(0..1, 0..8)).unwrap();
        assert_eq!(view.extent(), [16, 16, 8]);
        let state = view.descriptor_state(DescriptorClass::Sample).unwrap();
        assert_eq!((state.base_array_layer, state.array_len), (0, 8));
        assert!(matches!(
            ImageView::new(&image, create_info(0..1, 0..9)),
            Err(SurfaceError::InvalidViewRange(_)),
        ));

        // Level 1 has 4 depth slices.
        let view = ImageView::new(&image, create_info(1..2, 0..4)).unwrap();
        assert_eq!(view.extent(), [8, 8, 4]);
        ImageView::new(&image, create_info(1..2, 3..4)).unwrap();
        assert!(matches!(
            ImageView::new(&image, create_info(1..2, 4..5)),
            Err(SurfaceError::InvalidViewRange(_)),
        ));
        assert!(matches!(
            ImageView::new(&image, create_info(1..2, 2..6)),
            Err(SurfaceError::InvalidViewRange(_)),
        ));
    }

    #[test]
    fn view_type_compatibility() {
        let device = device!();
        let image = color_image(device, ImageUsage::SAMPLED);

        assert!(matches!(
            ImageView::new(
                &image,
                ImageViewCreateInfo {
                    view_type: ImageViewType::Dim2d,
                    subresource_range: color_range(0..1, 0..2),
                    ..Default::default()
                },
            ),
            Err(SurfaceError::InvalidViewRange(_)),
        ));
        assert!(matches!(
            ImageView::new(
                &image,
                ImageViewCreateInfo {
                    view_type: ImageViewType::Dim1d,
                    subresource_range: color_range(0..1, 0..1),
                    ..Default::default()
                },
            ),
            Err(SurfaceError::InvalidViewRange(_)),
        ));
        assert!(matches!(
            ImageView::new(
                &image,
                ImageViewCreateInfo {
                    view_type: ImageViewType::Cube,
                    subresource_range: color_range(0..1, 0..4),
                    ..Default::default()
                },
            ),
            Err(SurfaceError::InvalidViewRange(_)),
        ));
    }

    #[test]
    fn cube_view() {
        let device = device!();
        let image = bound_image(
            device.clone(),
            ImageCreateInfo {
                flags: ImageCreateFlags::CUBE_COMPATIBLE,
                extent: [32, 32, 1],
                array_layers: 6,
                usage: ImageUsage::SAMPLED | ImageUsage::COLOR_ATTACHMENT,
                ..Default::default()
            },
        );

        let view = ImageView::new(
            &image,
            ImageViewCreateInfo {
                view_type: ImageViewType::Cube,
                subresource_range: color_range(0..1, 0..6),
                ..Default::default()
            },
        )
        .unwrap();

        let state = view.descriptor_state(DescriptorClass::Sample).unwrap();
        assert_eq!(state.surface_type, SurfaceType::Cube as u32);
        assert_eq!(
            state.usage,
            (SurfaceUsage::TEXTURE | SurfaceUsage::CUBE).as_raw(),
        );

        let state = view.descriptor_state(DescriptorClass::RenderTarget).unwrap();
        assert_eq!(
            state.usage,
            (SurfaceUsage::RENDER_TARGET | SurfaceUsage::CUBE).as_raw(),
        );

        let plain = bound_image(
            device,
            ImageCreateInfo {
                extent: [32, 32, 1],
                array_layers: 6,
                usage: ImageUsage::SAMPLED,
                ..Default::default()
            },
        );
        assert!(matches!(
            ImageView::new(
                &plain,
                ImageViewCreateInfo {
                    view_type: ImageViewType::Cube,
                    subresource_range: color_range(0..1, 0..6),
                    ..Default::default()
                },
            ),
            Err(SurfaceError::InvalidUsage(_)),
        ));
    }

    #[test]
    fn identity_swizzle() {
        let mapping = ComponentMapping::identity();
        assert!(mapping.is_identity());
        assert_eq!(
            mapping.channel_select(FormatSwizzle::IDENTITY),
            ChannelSelect::IDENTITY,
        );

        let swizzle = FormatSwizzle {
            r: 2,
            g: 1,
            b: 0,
            a: 3,
        };
        assert_eq!(
            mapping.channel_select(swizzle),
            [
                ChannelSelect::Blue,
                ChannelSelect::Green,
                ChannelSelect::Red,
                ChannelSelect::Alpha,
            ],
        );
    }

    #[test]
    fn caller_swizzle() {
        let mapping = ComponentMapping {
            r: ComponentSwizzle::Alpha,
            g: ComponentSwizzle::Zero,
            b: ComponentSwizzle::One,
            a: ComponentSwizzle::Red,
        };
        assert!(!mapping.is_identity());
        assert_eq!(
            mapping.channel_select(FormatSwizzle::IDENTITY),
            [
                ChannelSelect::Alpha,
                ChannelSelect::Zero,
                ChannelSelect::One,
                ChannelSelect::Red,
            ],
        );
    }

    #[test]
    fn format_swizzle_reaches_descriptor() {
        let device = device!();
        let image = bound_image(
            device,
            ImageCreateInfo {
                format: Format::R4G4B4A4_UNORM_PACK16,
                extent: [16, 16, 1],
                usage: ImageUsage::SAMPLED,
                ..Default::default()
            },
        );

        let view = ImageView::new(
            &image,
            ImageViewCreateInfo {
                format: Format::R4G4B4A4_UNORM_PACK16,
                subresource_range: color_range(0..1, 0..1),
                ..Default::default()
            },
        )
        .unwrap();

        let state = view.descriptor_state(DescriptorClass::Sample).unwrap();
        assert_eq!(
            state.channel_select,
            [
                ChannelSelect::Blue as u8,
                ChannelSelect::Green as u8,
                ChannelSelect::Red as u8,
                ChannelSelect::Alpha as u8,
            ],
        );
    }

    #[test]
    fn incompatible_formats() {
        let device = device!();
        let image = color_image(device.clone(), ImageUsage::SAMPLED);

        assert!(matches!(
            ImageView::new(
                &image,
                ImageViewCreateInfo {
                    view_type: ImageViewType::Dim2dArray,
                    format: Format::R16G16B16A16_SFLOAT,
                    subresource_range: color_range(0..1, 0..4),
                    ..Default::default()
                },
            ),
            Err(SurfaceError::IncompatibleFormat(_)),
        ));

        // Same block size, different layout of the components.
        assert!(ImageView::new(
            &image,
            ImageViewCreateInfo {
                view_type: ImageViewType::Dim2dArray,
                format: Format::R32_UINT,
                subresource_range: color_range(0..1, 0..4),
                ..Default::default()
            },
        )
        .is_ok());

        let depth_stencil = depth_stencil_image(device, ImageUsage::SAMPLED);
        assert!(matches!(
            ImageView::new(
                &depth_stencil,
                ImageViewCreateInfo {
                    format: Format::D16_UNORM,
                    subresource_range: ImageSubresourceRange::from_parameters(
                        ImageAspects::DEPTH,
                        1,
                        1,
                    ),
                    ..Default::default()
                },
            ),
            Err(SurfaceError::IncompatibleFormat(_)),
        ));
    }

    #[test]
    fn color_aspect_of_depth_stencil_image() {
        let device = device!();
        let image = depth_stencil_image(device, ImageUsage::TRANSFER_DST);

        let create_info = |reinterpret_as_attachment| ImageViewCreateInfo {
            format: Format::R32_UINT,
            subresource_range: color_range(0..1, 0..1),
            reinterpret_as_attachment,
            ..Default::default()
        };

        assert!(matches!(
            ImageView::new(&image, create_info(false)),
            Err(SurfaceError::InvalidAspect(_)),
        ));

        let view = ImageView::new(&image, create_info(true)).unwrap();
        assert_eq!(view.aspect(), ImageAspect::Depth);
        assert_eq!(view.hardware_format(), HardwareFormat::R32_UINT);
        assert!(view.descriptor_size(DescriptorClass::RenderTarget) > 0);
    }

    #[test]
    fn compressed_reinterpretation() {
        let device = device!();
        let image = bound_image(
            device,
            ImageCreateInfo {
                format: Format::BC1_RGBA_UNORM_BLOCK,
                extent: [64, 64, 1],
                mip_levels: 2,
                usage: ImageUsage::SAMPLED | ImageUsage::TRANSFER_SRC,
                ..Default::default()
            },
        );

        let view = ImageView::new(
            &image,
            ImageViewCreateInfo {
                format: Format::R32G32_UINT,
                subresource_range: color_range(1..2, 0..1),
                ..Default::default()
            },
        )
        .unwrap();

        let geometry = image.surface(ImageAspect::Color).unwrap().geometry();
        let state = view.descriptor_state(DescriptorClass::Sample).unwrap();

        assert_eq!(state.width, geometry.row_pitch_el());
        assert_eq!(state.height, geometry.array_pitch_el_rows);
        assert_eq!(state.base_level, 0);
        assert_eq!(state.base_array_layer, 0);
        assert_eq!(view.extent(), [32, 32, 1]);
    }

    #[test]
    fn untyped_storage_fallback() {
        let (device, _) = pool_device(16, 7, true);
        let raw_image = RawImage::new(
            device,
            ImageCreateInfo {
                format: Format::R32G32B32A32_SFLOAT,
                extent: [16, 16, 1],
                usage: ImageUsage::STORAGE,
                ..Default::default()
            },
        )
        .unwrap();

        // The allocation is shared with other resources past the end of the image.
        let allocation = AllocationHandle {
            device_address: BASE_ADDRESS,
            size: 0x10_0000,
        };
        let memory = ResourceMemory::new(allocation, 0, raw_image.size()).unwrap();
        let image = Arc::new(raw_image.bind_memory(memory).unwrap());
        let surface_size = image.surface(ImageAspect::Color).unwrap().size();

        let view = ImageView::new(
            &image,
            ImageViewCreateInfo {
                format: Format::R32G32B32A32_SFLOAT,
                subresource_range: color_range(0..1, 0..1),
                offset: 0x40,
                ..Default::default()
            },
        )
        .unwrap();

        let state = view.descriptor_state(DescriptorClass::Storage).unwrap();
        assert_eq!(state.surface_type, SurfaceType::Buffer as u32);
        assert_eq!(state.format, HardwareFormat::RAW as u32);
        assert_eq!(state.address, BASE_ADDRESS + 0x40);
        assert_eq!(state.width as DeviceSize, surface_size - 0x40);

        let param = view.storage_image_param().unwrap();
        assert_eq!(param.size, [16, 16, 1]);
        assert_eq!(param.stride[0], 16);
    }

    #[test]
    fn typed_storage() {
        let (device, _) = pool_device(16, 9, true);
        let image = bound_image(
            device,
            ImageCreateInfo {
                format: Format::R32G32B32A32_SFLOAT,
                extent: [16, 16, 1],
                usage: ImageUsage::STORAGE,
                ..Default::default()
            },
        );

        let view = ImageView::new(
            &image,
            ImageViewCreateInfo {
                format: Format::R32G32B32A32_SFLOAT,
                subresource_range: color_range(0..1, 0..1),
                ..Default::default()
            },
        )
        .unwrap();

        let state = view.descriptor_state(DescriptorClass::Storage).unwrap();
        assert_eq!(state.surface_type, SurfaceType::Dim2d as u32);
        assert_eq!(state.format, HardwareFormat::R32G32B32A32_FLOAT as u32);
        assert!(view.storage_image_param().is_some());
    }

    #[test]
    fn flush_without_llc() {
        let (device, pool) = pool_device(16, 9, false);
        let image = color_image(
            device,
            ImageUsage::SAMPLED | ImageUsage::COLOR_ATTACHMENT | ImageUsage::STORAGE,
        );

        let _view = ImageView::new(&image, ImageViewCreateInfo::from_image(&image)).unwrap();
        assert_eq!(pool.flush_count(), 3);

        let (device, pool) = pool_device(16, 9, true);
        let image = color_image(device, ImageUsage::SAMPLED);

        let _view = ImageView::new(&image, ImageViewCreateInfo::from_image(&image)).unwrap();
        assert_eq!(pool.flush_count(), 0);
    }

    #[test]
    fn descriptors_are_freed() {
        let (device, pool) = pool_device(4, 9, true);
        let image = color_image(
            device,
            ImageUsage::SAMPLED | ImageUsage::COLOR_ATTACHMENT | ImageUsage::STORAGE,
        );

        let view = ImageView::new(&image, ImageViewCreateInfo::from_image(&image)).unwrap();
        assert_eq!(pool.free_count(), 1);

        drop(view);
        assert_eq!(pool.free_count(), 4);
    }

    #[test]
    fn out_of_memory_unwinds() {
        let (device, pool) = pool_device(2, 9, true);
        let image = color_image(
            device,
            ImageUsage::SAMPLED | ImageUsage::COLOR_ATTACHMENT | ImageUsage::STORAGE,
        );

        assert!(matches!(
            ImageView::new(&image, ImageViewCreateInfo::from_image(&image)),
            Err(SurfaceError::OutOfMemory(_)),
        ));
        assert_eq!(pool.free_count(), 2);
    }

    #[test]
    fn no_allocation_on_invalid_range() {
        let (device, pool) = pool_device(4, 9, true);
        let image = color_image(device, ImageUsage::SAMPLED);

        assert!(ImageView::new(
            &image,
            ImageViewCreateInfo {
                view_type: ImageViewType::Dim2dArray,
                subresource_range: color_range(0..4, 0..1),
                ..Default::default()
            },
        )
        .is_err());
        assert_eq!(pool.free_count(), 4);
    }

    #[test]
    fn weak_image() {
        let device = device!();
        let image = color_image(device, ImageUsage::SAMPLED);
        let view = ImageView::new(&image, ImageViewCreateInfo::from_image(&image)).unwrap();

        assert!(view.image().is_some());
        drop(image);
        assert!(view.image().is_none());
    }
}
