//! Native graphics API abstraction layer.
//!
//! The lifecycle objects never talk to a graphics API directly. Every native
//! call goes through the [`Backend`] trait, and every native object is named by
//! an opaque [`GpuHandle`].
//!
//! # Available Backends
//!
//! - [`SoftwareBackend`]: headless implementation that tracks live objects and
//!   enforces the native API's lifecycle rules. Used by tests and the demo.
//!
//! # Object model
//!
//! Objects are reference-counted on the native side; the handle returned by a
//! `create_*` call (or by [`Backend::immediate_context`] and
//! [`Backend::back_buffer`]) carries one reference that must be given back
//! with [`Backend::release`] exactly once. Wrap handles with
//! [`TrackGpu::track`] so a [`DisposalRegistry`] takes care of that.

mod error;
pub mod software;

use std::fmt;
use std::num::NonZeroU64;
use std::sync::Arc;

use lumen_core::{DisposalRegistry, Tracked};

pub use error::BackendError;
pub use software::{ObjectKind, SoftwareBackend};

use crate::types::{
    BitmapProperties, BufferDescriptor, Color, DepthStencilViewDescriptor, DeviceCreationFlags,
    DisplayMode, FeatureLevel, Format, FullScreenDescriptor, PresentFlags, SwapChainDescriptor,
    SwapChainFlags, TextAntialiasMode, TextureDescriptor, Viewport, WindowHandle,
};

/// Result type of backend calls.
pub type BackendResult<T> = Result<T, BackendError>;

/// Opaque handle to a native graphics object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GpuHandle(NonZeroU64);

impl GpuHandle {
    /// Create a handle from a raw non-zero value.
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    pub fn raw(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for GpuHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0.get())
    }
}

/// Native graphics API.
///
/// Implementations must be callable from any thread; the lifecycle objects
/// themselves only call them from the thread that drives the application.
pub trait Backend: Send + Sync + fmt::Debug {
    /// Backend name, for logging.
    fn name(&self) -> &'static str;

    // ------------------------------------------------------------------
    // Device and factories
    // ------------------------------------------------------------------

    /// Whether a device can be created at `level`.
    fn supports_feature_level(&self, level: FeatureLevel) -> bool;

    /// Create a device at exactly `level`.
    fn create_device(
        &self,
        level: FeatureLevel,
        flags: DeviceCreationFlags,
    ) -> BackendResult<GpuHandle>;

    /// Get a new reference to the device's immediate command context.
    fn immediate_context(&self, device: GpuHandle) -> BackendResult<GpuHandle>;

    fn create_factory_2d(&self, debug: bool) -> BackendResult<GpuHandle>;

    fn create_text_factory(&self) -> BackendResult<GpuHandle>;

    fn create_imaging_factory(&self) -> BackendResult<GpuHandle>;

    /// Create a 2D device that draws on the surfaces of `device`.
    fn create_device_2d(&self, factory_2d: GpuHandle, device: GpuHandle)
        -> BackendResult<GpuHandle>;

    fn create_context_2d(&self, device_2d: GpuHandle) -> BackendResult<GpuHandle>;

    /// Set the resolution the 2D context maps device-independent pixels with.
    fn set_context_2d_dpi(&self, context_2d: GpuHandle, dpi_x: f32, dpi_y: f32)
        -> BackendResult<()>;

    /// Set or clear the bitmap the 2D context draws on.
    fn set_context_2d_target(
        &self,
        context_2d: GpuHandle,
        target: Option<GpuHandle>,
    ) -> BackendResult<()>;

    fn set_text_antialias_mode(
        &self,
        context_2d: GpuHandle,
        mode: TextAntialiasMode,
    ) -> BackendResult<()>;

    // ------------------------------------------------------------------
    // Swap chain
    // ------------------------------------------------------------------

    /// Create a swap chain presenting to `window`.
    fn create_swap_chain(
        &self,
        device: GpuHandle,
        window: WindowHandle,
        descriptor: &SwapChainDescriptor,
        full_screen: &FullScreenDescriptor,
    ) -> BackendResult<GpuHandle>;

    /// Current description of a swap chain.
    fn swap_chain_descriptor(&self, swap_chain: GpuHandle) -> BackendResult<SwapChainDescriptor>;

    /// Resize the buffers of a swap chain in place.
    ///
    /// # Errors
    ///
    /// Fails with [`BackendError::InvalidParameter`] while any object derived
    /// from the swap chain's buffers is still alive.
    fn resize_swap_chain(
        &self,
        swap_chain: GpuHandle,
        buffer_count: u32,
        width: u32,
        height: u32,
        format: Format,
        flags: SwapChainFlags,
    ) -> BackendResult<()>;

    /// Display modes of the output the swap chain presents to, for `format`.
    fn display_modes(&self, swap_chain: GpuHandle, format: Format)
        -> BackendResult<Vec<DisplayMode>>;

    /// Get a new reference to back buffer `index` of a swap chain.
    fn back_buffer(&self, swap_chain: GpuHandle, index: u32) -> BackendResult<GpuHandle>;

    fn set_full_screen(&self, swap_chain: GpuHandle, full_screen: bool) -> BackendResult<()>;

    fn is_full_screen(&self, swap_chain: GpuHandle) -> BackendResult<bool>;

    /// Present the current back buffer.
    ///
    /// A `sync_interval` of 1 blocks until the next vertical blank; 0 presents
    /// immediately.
    fn present(
        &self,
        swap_chain: GpuHandle,
        sync_interval: u32,
        flags: PresentFlags,
    ) -> BackendResult<()>;

    // ------------------------------------------------------------------
    // Resources and views
    // ------------------------------------------------------------------

    fn texture_descriptor(&self, texture: GpuHandle) -> BackendResult<TextureDescriptor>;

    fn create_texture(
        &self,
        device: GpuHandle,
        descriptor: &TextureDescriptor,
    ) -> BackendResult<GpuHandle>;

    fn create_render_target_view(
        &self,
        device: GpuHandle,
        resource: GpuHandle,
    ) -> BackendResult<GpuHandle>;

    fn create_depth_stencil_view(
        &self,
        device: GpuHandle,
        texture: GpuHandle,
        descriptor: &DepthStencilViewDescriptor,
    ) -> BackendResult<GpuHandle>;

    /// Create a 2D bitmap that wraps `surface`.
    fn create_bitmap_target(
        &self,
        context_2d: GpuHandle,
        surface: GpuHandle,
        properties: &BitmapProperties,
    ) -> BackendResult<GpuHandle>;

    /// Create a buffer, optionally filled with `data`.
    fn create_buffer(
        &self,
        device: GpuHandle,
        descriptor: &BufferDescriptor,
        data: Option<&[u8]>,
    ) -> BackendResult<GpuHandle>;

    // ------------------------------------------------------------------
    // Command context
    // ------------------------------------------------------------------

    fn set_viewport(&self, context: GpuHandle, viewport: &Viewport) -> BackendResult<()>;

    /// Bind the output targets. `None` unbinds.
    fn set_render_targets(
        &self,
        context: GpuHandle,
        render_target: Option<GpuHandle>,
        depth_stencil: Option<GpuHandle>,
    ) -> BackendResult<()>;

    fn set_vertex_buffer(
        &self,
        context: GpuHandle,
        slot: u32,
        buffer: GpuHandle,
        stride: u32,
        offset: u32,
    ) -> BackendResult<()>;

    fn clear_render_target(
        &self,
        context: GpuHandle,
        view: GpuHandle,
        color: Color,
    ) -> BackendResult<()>;

    fn clear_depth_stencil(
        &self,
        context: GpuHandle,
        view: GpuHandle,
        depth: f32,
        stencil: u8,
    ) -> BackendResult<()>;

    fn draw(&self, context: GpuHandle, vertex_count: u32, start_vertex: u32) -> BackendResult<()>;

    // ------------------------------------------------------------------
    // Lifetime
    // ------------------------------------------------------------------

    /// Give back one reference to `handle`.
    ///
    /// Releasing a handle that is not live is a caller bug. Implementations
    /// must not panic on it.
    fn release(&self, handle: GpuHandle);
}

/// Registers native handles with their release procedure.
pub trait TrackGpu {
    /// Track `handle` so that it is released through `backend`.
    fn track(
        &mut self,
        backend: &Arc<dyn Backend>,
        handle: GpuHandle,
        label: &'static str,
    ) -> Tracked<GpuHandle>;
}

impl TrackGpu for DisposalRegistry<GpuHandle> {
    fn track(
        &mut self,
        backend: &Arc<dyn Backend>,
        handle: GpuHandle,
        label: &'static str,
    ) -> Tracked<GpuHandle> {
        let backend = Arc::clone(backend);
        self.acquire(handle, label, move |handle| backend.release(handle))
    }
}
