//! # Lumen Graphics
//!
//! Device lifecycle over a native graphics API.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`Backend`] - Trait over the native graphics API, named by [`GpuHandle`]s
//! - [`SoftwareBackend`] - Headless backend that enforces native lifecycle rules
//! - [`DeviceManager`] - Owner of the device, its contexts and factories
//! - [`types`] - Formats, flags and descriptors passed to the backend
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use lumen_graphics::{Backend, DeviceManager, SoftwareBackend};
//!
//! let backend: Arc<dyn Backend> = Arc::new(SoftwareBackend::new());
//! let manager = DeviceManager::new(backend);
//! manager.initialize_default()?;
//!
//! let objects = manager.objects().expect("device is ready");
//! println!("running at feature level {}", objects.feature_level);
//! # Ok::<(), lumen_graphics::GraphicsError>(())
//! ```

pub mod backend;
pub mod device;
pub mod error;
pub mod types;

// Re-export main types for convenience
pub use backend::{
    Backend, BackendError, BackendResult, GpuHandle, ObjectKind, SoftwareBackend, TrackGpu,
};
pub use device::{DeviceManager, DeviceObjects, DeviceOptions, DevicePhase, DEFAULT_DPI};
pub use error::GraphicsError;
pub use types::{
    AlphaMode, BindFlags, BitmapOptions, BitmapProperties, BufferDescriptor, Color,
    DepthStencilViewDescriptor, DepthStencilViewDimension, DeviceCreationFlags, DisplayMode,
    DisplayScaling, FeatureLevel, Format, FullScreenDescriptor, PresentFlags, Rational, Rect,
    ResourceUsage, SampleDescription, ScanlineOrdering, SwapChainDescriptor, SwapChainFlags,
    SwapEffect, SwapScaling, TextAntialiasMode, TextureDescriptor, Viewport, WindowHandle,
    DEFAULT_FEATURE_LEVELS,
};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the graphics library version.
pub fn init() {
    log::info!("Lumen Graphics v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_software_backend() {
        let backend = SoftwareBackend::new();
        assert_eq!(backend.name(), "Software");
    }
}
