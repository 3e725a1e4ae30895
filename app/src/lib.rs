//! # Lumen App
//!
//! Application and renderer base over the Lumen device lifecycle.
//!
//! This crate provides an [`Application`] that owns the device manager and the
//! presentation surface, and rebuilds the surface on resize, DPI change and
//! device loss. Renderers attach to it and get their resources rebuilt at the
//! right moments.
//!
//! ## Overview
//!
//! - [`Application`] - Swap chain, surface views, present and device-loss recovery
//! - [`ApplicationHost`] - Trait for the window the application presents to
//! - [`HeadlessHost`] - Host over an opaque window handle with settable bounds
//! - [`Renderer`] / [`RenderHandler`] - Resource and draw hooks bound to an application
//! - [`AppArgs`] - Trait for parsing command line arguments
//! - [`MainLoop`] - Trait for the loop of a concrete application
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use lumen_app::{AppConfig, Application, HeadlessHost, RenderContext, RenderHandler, Renderer};
//! use lumen_graphics::{Backend, GraphicsError, Rect, SoftwareBackend, WindowHandle};
//!
//! struct Nothing;
//!
//! impl RenderHandler for Nothing {
//!     fn draw(&mut self, _ctx: &mut RenderContext<'_>) -> Result<(), GraphicsError> {
//!         Ok(())
//!     }
//! }
//!
//! let backend: Arc<dyn Backend> = Arc::new(SoftwareBackend::new());
//! let host = Arc::new(HeadlessHost::new(WindowHandle::new(1), Rect::from_dimensions(640, 480)));
//! let app = Application::new(backend, host, AppConfig::default());
//!
//! let renderer = Renderer::new(Nothing);
//! renderer.attach(&app)?;
//! app.initialize()?;
//!
//! renderer.render()?;
//! app.present()?;
//! # Ok::<(), GraphicsError>(())
//! ```

mod app;
mod args;
mod config;
mod handler;
mod headless;
mod renderer;

pub use app::{Application, PresentOutcome, SurfacePhase, SurfaceViews, DEPTH_FORMAT};
pub use args::{AppArgs, DefaultAppArgs};
pub use config::AppConfig;
pub use handler::{ApplicationHost, MainLoop};
pub use headless::HeadlessHost;
pub use renderer::{RenderContext, RenderHandler, Renderer};

/// App library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the app subsystem.
///
/// This should be called before using any app functionality.
pub fn init() {
    log::info!("Lumen App v{} initialized", VERSION);
}
