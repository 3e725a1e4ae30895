//! Texture formats, bind flags and descriptors.

use bitflags::bitflags;

use super::buffer::ResourceUsage;

/// Pixel format enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum Format {
    /// Format not specified.
    #[default]
    Unknown,
    /// 8-bit BGRA, unsigned normalized. The default swap-chain format.
    B8G8R8A8Unorm,
    /// 8-bit RGBA, unsigned normalized.
    R8G8B8A8Unorm,
    /// 16-bit RGBA float.
    R16G16B16A16Float,
    /// Three 32-bit floats. Used for vertex positions.
    R32G32B32Float,
    /// Four 32-bit floats. Used for vertex colors.
    R32G32B32A32Float,
    /// 24-bit depth, 8-bit stencil.
    D24UnormS8Uint,
    /// 32-bit float depth.
    D32Float,
    /// 32-bit float depth, 8-bit stencil, 24 bits unused.
    D32FloatS8X24Uint,
}

impl Format {
    /// Check if this is a depth or depth-stencil format.
    pub fn is_depth(&self) -> bool {
        matches!(
            self,
            Self::D24UnormS8Uint | Self::D32Float | Self::D32FloatS8X24Uint
        )
    }

    /// Check if this format carries a stencil component.
    pub fn has_stencil(&self) -> bool {
        matches!(self, Self::D24UnormS8Uint | Self::D32FloatS8X24Uint)
    }

    /// Size of one pixel in bytes, or `None` for [`Format::Unknown`].
    pub fn bytes_per_pixel(&self) -> Option<u32> {
        match self {
            Self::Unknown => None,
            Self::B8G8R8A8Unorm | Self::R8G8B8A8Unorm => Some(4),
            Self::D24UnormS8Uint | Self::D32Float => Some(4),
            Self::R16G16B16A16Float | Self::D32FloatS8X24Uint => Some(8),
            Self::R32G32B32Float => Some(12),
            Self::R32G32B32A32Float => Some(16),
        }
    }
}

bitflags! {
    /// How a resource may be bound to the pipeline.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BindFlags: u32 {
        const VERTEX_BUFFER = 1 << 0;
        const INDEX_BUFFER = 1 << 1;
        const CONSTANT_BUFFER = 1 << 2;
        const SHADER_RESOURCE = 1 << 3;
        const RENDER_TARGET = 1 << 5;
        const DEPTH_STENCIL = 1 << 6;
    }
}

impl Default for BindFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// Multisampling parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SampleDescription {
    /// Samples per pixel.
    pub count: u32,
    /// Quality level, backend defined.
    pub quality: u32,
}

impl SampleDescription {
    pub fn new(count: u32, quality: u32) -> Self {
        Self { count, quality }
    }

    /// Whether views of a resource with this description must be multisampled.
    pub fn is_multisampled(&self) -> bool {
        self.count > 1 || self.quality > 0
    }
}

impl Default for SampleDescription {
    fn default() -> Self {
        Self {
            count: 1,
            quality: 0,
        }
    }
}

/// Descriptor for creating a 2D texture.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureDescriptor {
    /// Debug label for the texture.
    pub label: Option<String>,
    pub width: u32,
    pub height: u32,
    pub array_size: u32,
    pub mip_levels: u32,
    pub format: Format,
    pub sample: SampleDescription,
    pub usage: ResourceUsage,
    pub bind: BindFlags,
}

impl TextureDescriptor {
    /// Create a new 2D texture descriptor.
    pub fn new_2d(width: u32, height: u32, format: Format, bind: BindFlags) -> Self {
        Self {
            label: None,
            width,
            height,
            array_size: 1,
            mip_levels: 1,
            format,
            sample: SampleDescription::default(),
            usage: ResourceUsage::Default,
            bind,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the mip level count.
    pub fn with_mip_levels(mut self, count: u32) -> Self {
        self.mip_levels = count;
        self
    }

    /// Set the multisampling parameters.
    pub fn with_sample(mut self, sample: SampleDescription) -> Self {
        self.sample = sample;
        self
    }
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self::new_2d(0, 0, Format::Unknown, BindFlags::empty())
    }
}

/// Dimension of a depth-stencil view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DepthStencilViewDimension {
    #[default]
    Texture2D,
    Texture2DMultisampled,
}

impl DepthStencilViewDimension {
    /// The dimension a view of a texture with `sample` must use.
    pub fn for_sample(sample: &SampleDescription) -> Self {
        if sample.is_multisampled() {
            Self::Texture2DMultisampled
        } else {
            Self::Texture2D
        }
    }
}

/// Descriptor for creating a depth-stencil view.
///
/// [`Format::Unknown`] means "inherit the texture's format".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DepthStencilViewDescriptor {
    pub format: Format,
    pub dimension: DepthStencilViewDimension,
}

impl DepthStencilViewDescriptor {
    pub fn new(dimension: DepthStencilViewDimension) -> Self {
        Self {
            format: Format::Unknown,
            dimension,
        }
    }
}
