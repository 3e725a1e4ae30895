//! Buffer descriptors.

use super::texture::BindFlags;

/// Expected CPU/GPU access pattern of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResourceUsage {
    /// GPU read and write.
    #[default]
    Default,
    /// GPU read only, contents fixed at creation.
    Immutable,
    /// GPU read, CPU write.
    Dynamic,
    /// CPU copy target.
    Staging,
}

/// Descriptor for creating a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BufferDescriptor {
    /// Debug label for the buffer.
    pub label: Option<String>,
    /// Size in bytes.
    pub size: u64,
    pub bind: BindFlags,
    pub usage: ResourceUsage,
    /// Element stride in bytes, 0 when unstructured.
    pub stride: u32,
}

impl BufferDescriptor {
    /// Create a new buffer descriptor.
    pub fn new(size: u64, bind: BindFlags) -> Self {
        Self {
            label: None,
            size,
            bind,
            usage: ResourceUsage::Default,
            stride: 0,
        }
    }

    /// Descriptor for a vertex buffer holding `count` elements of `stride` bytes.
    pub fn vertices(count: usize, stride: u32) -> Self {
        Self::new(count as u64 * stride as u64, BindFlags::VERTEX_BUFFER).with_stride(stride)
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_stride(mut self, stride: u32) -> Self {
        self.stride = stride;
        self
    }

    pub fn with_usage(mut self, usage: ResourceUsage) -> Self {
        self.usage = usage;
        self
    }
}
