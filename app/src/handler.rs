//! Host integration traits.

use lumen_graphics::{
    Backend, FullScreenDescriptor, GpuHandle, GraphicsError, Rect, SwapChainDescriptor,
};

/// Capabilities a concrete target (desktop window, headless surface, ...)
/// provides to an [`Application`](crate::Application).
///
/// Only [`current_bounds`](Self::current_bounds) and
/// [`create_swap_chain`](Self::create_swap_chain) are required; the
/// descriptor methods default to desktop settings.
pub trait ApplicationHost: Send + Sync {
    /// Client area of the window in device-independent pixels.
    fn current_bounds(&self) -> Rect;

    /// Create the swap chain that presents to this host's window.
    fn create_swap_chain(
        &self,
        backend: &dyn Backend,
        device: GpuHandle,
        descriptor: &SwapChainDescriptor,
        full_screen: &FullScreenDescriptor,
    ) -> Result<GpuHandle, GraphicsError>;

    /// Descriptor of a new swap chain of `width` x `height` pixels.
    ///
    /// Default: [`SwapChainDescriptor::new`] (BGRA8, one sample, one buffer,
    /// stretch scaling, discard effect, mode switching allowed).
    fn swap_chain_descriptor(&self, width: u32, height: u32) -> SwapChainDescriptor {
        SwapChainDescriptor::new(width, height)
    }

    /// Full-screen parameters of a new swap chain.
    ///
    /// Default: 60 Hz, centered, windowed.
    fn full_screen_descriptor(&self) -> FullScreenDescriptor {
        FullScreenDescriptor::default()
    }
}

/// The main loop of a concrete application.
///
/// # Example
///
/// ```ignore
/// use lumen_app::MainLoop;
///
/// struct Viewer { /* application, renderers */ }
///
/// impl MainLoop for Viewer {
///     fn run(&mut self) -> Result<(), GraphicsError> {
///         loop {
///             self.renderer.render()?;
///             self.app.present()?;
///         }
///     }
/// }
/// ```
pub trait MainLoop {
    /// Drive the application until it exits.
    fn run(&mut self) -> Result<(), GraphicsError>;
}
