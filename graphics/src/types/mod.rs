//! Descriptor types for native graphics objects.
//!
//! This module contains format enums, flag sets and descriptor structs used
//! by the [`Backend`](crate::Backend) trait and the lifecycle objects.

mod bitmap;
mod buffer;
mod common;
mod device;
mod swap_chain;
mod texture;

pub use bitmap::{AlphaMode, BitmapOptions, BitmapProperties, TextAntialiasMode};
pub use buffer::{BufferDescriptor, ResourceUsage};
pub use common::{Color, Rect, Viewport, WindowHandle};
pub use device::{DeviceCreationFlags, FeatureLevel, DEFAULT_FEATURE_LEVELS};
pub use swap_chain::{
    DisplayMode, DisplayScaling, FullScreenDescriptor, PresentFlags, Rational, ScanlineOrdering,
    SwapChainDescriptor, SwapChainFlags, SwapEffect, SwapScaling,
};
pub use texture::{
    BindFlags, DepthStencilViewDescriptor, DepthStencilViewDimension, Format, SampleDescription,
    TextureDescriptor,
};
