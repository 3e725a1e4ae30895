//! Application base: swap chain, surface views, resize and device loss.
//!
//! An [`Application`] owns a [`DeviceManager`] and the presentation surface
//! built on top of it. The surface is rebuilt whenever the device is replaced,
//! the window is resized or the DPI changes:
//!
//! ```text
//!              size_changed / device ready / dpi changed
//!   NoSurface ──────────────────────────────────────────▶ Valid
//!                                                         │  ▲
//!                                   rebuild started       ▼  │ rebuild done
//!                                                       Invalid
//!
//!   any ── dispose ──▶ Terminated
//! ```
//!
//! Rebuilding never recreates what it can resize: an existing swap chain is
//! resized in place after every view derived from its buffers is released.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use lumen_core::{Component, DisposalRegistry, Event, Tracked};
use lumen_graphics::{
    Backend, BindFlags, BitmapProperties, DepthStencilViewDescriptor, DepthStencilViewDimension,
    DeviceManager, DeviceObjects, DisplayMode, Format, GpuHandle, GraphicsError, PresentFlags,
    Rect, TextAntialiasMode, TextureDescriptor, TrackGpu, Viewport, DEFAULT_DPI,
};

use crate::config::AppConfig;
use crate::handler::ApplicationHost;

/// Format of the depth buffer built alongside the back buffer.
pub const DEPTH_FORMAT: Format = Format::D32FloatS8X24Uint;

/// State of the presentation surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfacePhase {
    /// No swap chain has been built yet.
    NoSurface,
    /// Swap chain and every derived view exist.
    Valid,
    /// A rebuild started and has not completed.
    Invalid,
    /// The application was disposed.
    Terminated,
}

/// Result of [`Application::present`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresentOutcome {
    /// The frame was presented.
    Presented,
    /// The device was lost; it was reinitialized and the frame dropped.
    DeviceRecovered,
    /// There is no swap chain to present yet.
    Skipped,
}

/// Handles of the views derived from the current back buffer.
///
/// The handles stay owned by the [`Application`] and are invalid after the
/// next rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceViews {
    pub swap_chain: GpuHandle,
    pub back_buffer: GpuHandle,
    pub render_target_view: GpuHandle,
    pub depth_buffer: GpuHandle,
    pub depth_stencil_view: GpuHandle,
    /// 2D bitmap wrapping the back buffer, attached as the 2D context target.
    pub bitmap_target: GpuHandle,
}

struct SurfaceState {
    phase: SurfacePhase,
    registry: DisposalRegistry<GpuHandle>,
    swap_chain: Option<Tracked<GpuHandle>>,
    back_buffer: Option<Tracked<GpuHandle>>,
    render_target_view: Option<Tracked<GpuHandle>>,
    depth_buffer: Option<Tracked<GpuHandle>>,
    depth_stencil_view: Option<Tracked<GpuHandle>>,
    bitmap_target: Option<Tracked<GpuHandle>>,
    bounds: Rect,
    render_target_bounds: Rect,
    viewport: Viewport,
    display_modes: Vec<DisplayMode>,
}

impl SurfaceState {
    fn new() -> Self {
        Self {
            phase: SurfacePhase::NoSurface,
            registry: DisposalRegistry::new(),
            swap_chain: None,
            back_buffer: None,
            render_target_view: None,
            depth_buffer: None,
            depth_stencil_view: None,
            bitmap_target: None,
            bounds: Rect::default(),
            render_target_bounds: Rect::default(),
            viewport: Viewport::default(),
            display_modes: Vec::new(),
        }
    }

    /// Release every view derived from the back buffer, newest first.
    fn release_views(&mut self) {
        let registry = &mut self.registry;
        registry.release_and_clear(&mut self.bitmap_target);
        registry.release_and_clear(&mut self.depth_stencil_view);
        registry.release_and_clear(&mut self.depth_buffer);
        registry.release_and_clear(&mut self.render_target_view);
        registry.release_and_clear(&mut self.back_buffer);
    }

    fn views(&self) -> Option<SurfaceViews> {
        Some(SurfaceViews {
            swap_chain: self.swap_chain?.handle(),
            back_buffer: self.back_buffer?.handle(),
            render_target_view: self.render_target_view?.handle(),
            depth_buffer: self.depth_buffer?.handle(),
            depth_stencil_view: self.depth_stencil_view?.handle(),
            bitmap_target: self.bitmap_target?.handle(),
        })
    }
}

/// Base of an application that presents to a window.
///
/// # Notifications
///
/// [`on_size_changed`](Self::on_size_changed) fires when the client bounds
/// change (or a rebuild is forced). The application itself is the first
/// subscriber, so the surface is rebuilt before later subscribers run.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use lumen_app::{AppConfig, Application, HeadlessHost, PresentOutcome};
/// use lumen_graphics::{Backend, Rect, SoftwareBackend, WindowHandle};
///
/// let backend: Arc<dyn Backend> = Arc::new(SoftwareBackend::new());
/// let host = Arc::new(HeadlessHost::new(WindowHandle::new(1), Rect::from_dimensions(800, 600)));
/// let app = Application::new(backend, host, AppConfig::default());
///
/// app.initialize()?;
/// assert_eq!((app.width(), app.height()), (800, 600));
/// assert_eq!(app.present()?, PresentOutcome::Presented);
/// # Ok::<(), lumen_graphics::GraphicsError>(())
/// ```
pub struct Application {
    component: Component,
    config: AppConfig,
    host: Arc<dyn ApplicationHost>,
    device_manager: DeviceManager,
    state: Mutex<SurfaceState>,
    vsync: AtomicBool,
    on_size_changed: Event<Application, GraphicsError>,
}

impl Application {
    /// Create an application presenting through `host`.
    ///
    /// Nothing is created on the backend until [`initialize`](Self::initialize).
    pub fn new(
        backend: Arc<dyn Backend>,
        host: Arc<dyn ApplicationHost>,
        config: AppConfig,
    ) -> Arc<Self> {
        let device_manager = DeviceManager::with_options(backend, config.device_options());
        let app = Arc::new(Self {
            component: Component::named(config.name.clone()),
            vsync: AtomicBool::new(config.vsync),
            config,
            host,
            device_manager,
            state: Mutex::new(SurfaceState::new()),
            on_size_changed: Event::new("size changed"),
        });
        app.subscribe();
        app
    }

    fn subscribe(self: &Arc<Self>) {
        let id = self.component.id();

        let weak = Arc::downgrade(self);
        self.device_manager
            .on_initialize()
            .subscribe(id, move |_| with_app(&weak, Application::handle_device_ready));

        let weak = Arc::downgrade(self);
        self.device_manager
            .on_dpi_changed()
            .subscribe(id, move |_| with_app(&weak, Application::handle_dpi_changed));

        self.on_size_changed
            .subscribe(id, Application::rebuild_surface);
    }

    pub fn component(&self) -> &Component {
        &self.component
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn host(&self) -> &Arc<dyn ApplicationHost> {
        &self.host
    }

    pub fn device_manager(&self) -> &DeviceManager {
        &self.device_manager
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        self.device_manager.backend()
    }

    /// Subscribers are notified when the client bounds change.
    pub fn on_size_changed(&self) -> &Event<Application, GraphicsError> {
        &self.on_size_changed
    }

    /// Initialize the device at the configured DPI, then build the surface.
    pub fn initialize(&self) -> Result<(), GraphicsError> {
        self.ensure_alive()?;
        log::info!("{}: initializing", self.component);
        self.device_manager.initialize(self.config.dpi)?;

        // An existing surface was already rebuilt by the device-ready handler;
        // a first surface is built here because the bounds evaluation is
        // forced until the surface is valid.
        self.size_changed(false)?;
        Ok(())
    }

    /// Re-read the host bounds and notify "size changed" subscribers when
    /// their size differs from the last-known size, or when `force` is set.
    ///
    /// Bounds with a zero dimension (a minimized window) are ignored and the
    /// last-known bounds are kept. While the surface is not valid every
    /// non-degenerate evaluation notifies. Returns whether subscribers were
    /// notified.
    pub fn size_changed(&self, force: bool) -> Result<bool, GraphicsError> {
        let bounds = self.host.current_bounds();
        {
            let mut state = self.state.lock();
            if state.phase == SurfacePhase::Terminated {
                return Err(GraphicsError::Disposed);
            }
            if bounds.is_degenerate() {
                log::debug!("{}: ignoring degenerate bounds {bounds}", self.component);
                return Ok(false);
            }
            // Without a valid surface there is nothing to compare against.
            let force = force || state.phase != SurfacePhase::Valid;
            let resized = bounds.width != state.bounds.width
                || bounds.height != state.bounds.height;
            if !force && !resized {
                // A move keeps the surface.
                state.bounds = bounds;
                return Ok(false);
            }
            log::debug!("{}: bounds {} -> {bounds}", self.component, state.bounds);
            state.bounds = bounds;
        }

        self.on_size_changed.emit(self)?;
        Ok(true)
    }

    /// Present the current back buffer.
    ///
    /// Waits for the vertical blank when vsync is enabled. A lost device is
    /// reinitialized at its last DPI and the frame is dropped.
    ///
    /// # Errors
    ///
    /// - [`GraphicsError::Presentation`] for any failure other than device loss.
    /// - Errors of the device reinitialization after a device loss.
    pub fn present(&self) -> Result<PresentOutcome, GraphicsError> {
        let swap_chain = {
            let state = self.state.lock();
            if state.phase == SurfacePhase::Terminated {
                return Err(GraphicsError::Disposed);
            }
            match state.swap_chain {
                Some(swap_chain) => swap_chain.handle(),
                None => return Ok(PresentOutcome::Skipped),
            }
        };

        let sync_interval = u32::from(self.vsync());
        match self
            .backend()
            .present(swap_chain, sync_interval, PresentFlags::empty())
        {
            Ok(()) => Ok(PresentOutcome::Presented),
            Err(err) if err.is_device_lost() => {
                log::warn!("{}: {err} on present, reinitializing device", self.component);
                self.device_manager.initialize(self.device_manager.dpi())?;
                Ok(PresentOutcome::DeviceRecovered)
            }
            Err(err) => {
                log::error!("{}: present failed: {err}", self.component);
                Err(GraphicsError::Presentation(err))
            }
        }
    }

    /// Release every surface and device object and stop reacting to
    /// notifications. Later operations fail with [`GraphicsError::Disposed`].
    ///
    /// Calling this more than once is a no-op.
    pub fn dispose(&self) {
        {
            let mut state = self.state.lock();
            if state.phase == SurfacePhase::Terminated {
                return;
            }
            if let Some(swap_chain) = state.swap_chain {
                self.leave_full_screen(swap_chain.handle());
            }
            let released = state.registry.release_all();
            state.swap_chain = None;
            state.back_buffer = None;
            state.render_target_view = None;
            state.depth_buffer = None;
            state.depth_stencil_view = None;
            state.bitmap_target = None;
            state.display_modes.clear();
            state.phase = SurfacePhase::Terminated;
            log::debug!("{}: released {released} surface object(s)", self.component);
        }

        let id = self.component.id();
        self.device_manager.on_initialize().unsubscribe(id);
        self.device_manager.on_dpi_changed().unsubscribe(id);
        self.on_size_changed.clear();
        self.device_manager.dispose();
        log::info!("{}: disposed", self.component);
    }

    /// Last-known client bounds.
    pub fn bounds(&self) -> Rect {
        self.state.lock().bounds
    }

    /// Last-known client width in physical pixels at the current DPI.
    ///
    /// Zero before the device is initialized.
    pub fn width(&self) -> u32 {
        self.scaled(self.bounds().width)
    }

    /// Last-known client height in physical pixels at the current DPI.
    pub fn height(&self) -> u32 {
        self.scaled(self.bounds().height)
    }

    fn scaled(&self, logical: u32) -> u32 {
        (logical as f32 * self.device_manager.dpi() / DEFAULT_DPI) as u32
    }

    /// Viewport covering the whole render target.
    pub fn viewport(&self) -> Viewport {
        self.state.lock().viewport
    }

    /// Size of the back buffer in pixels.
    pub fn render_target_bounds(&self) -> Rect {
        self.state.lock().render_target_bounds
    }

    /// Current surface views, if every one of them exists.
    pub fn views(&self) -> Option<SurfaceViews> {
        self.state.lock().views()
    }

    /// Display modes of the output the swap chain presents to.
    pub fn display_modes(&self) -> Vec<DisplayMode> {
        self.state.lock().display_modes.clone()
    }

    pub fn surface_phase(&self) -> SurfacePhase {
        self.state.lock().phase
    }

    pub fn vsync(&self) -> bool {
        self.vsync.load(Ordering::Relaxed)
    }

    pub fn set_vsync(&self, vsync: bool) {
        self.vsync.store(vsync, Ordering::Relaxed);
    }

    fn ensure_alive(&self) -> Result<(), GraphicsError> {
        if self.state.lock().phase == SurfacePhase::Terminated {
            return Err(GraphicsError::Disposed);
        }
        Ok(())
    }

    /// The device was replaced: everything built on the old one goes.
    fn handle_device_ready(&self) -> Result<(), GraphicsError> {
        {
            let mut state = self.state.lock();
            let Some(swap_chain) = state.swap_chain else {
                return Ok(());
            };
            self.leave_full_screen(swap_chain.handle());
            state.release_views();
            let SurfaceState {
                registry,
                swap_chain,
                ..
            } = &mut *state;
            registry.release_and_clear(swap_chain);
            state.phase = SurfacePhase::Invalid;
            log::debug!("{}: released surface of the previous device", self.component);
        }
        self.size_changed(true).map(|_| ())
    }

    fn handle_dpi_changed(&self) -> Result<(), GraphicsError> {
        if self.state.lock().swap_chain.is_none() {
            return Ok(());
        }
        self.size_changed(true).map(|_| ())
    }

    fn leave_full_screen(&self, swap_chain: GpuHandle) {
        let backend = self.backend();
        match backend.is_full_screen(swap_chain) {
            Ok(true) => {
                if let Err(err) = backend.set_full_screen(swap_chain, false) {
                    log::warn!("{}: could not leave full-screen: {err}", self.component);
                }
            }
            Ok(false) => {}
            Err(err) => log::warn!("{}: full-screen state unavailable: {err}", self.component),
        }
    }

    /// Build (or resize) the swap chain and rebuild every derived view.
    fn rebuild_surface(&self) -> Result<(), GraphicsError> {
        let objects = self
            .device_manager
            .objects()
            .ok_or(GraphicsError::NotInitialized("device"))?;
        let dpi = self.device_manager.dpi();

        let mut state = self.state.lock();
        if state.phase == SurfacePhase::Terminated {
            return Err(GraphicsError::Disposed);
        }
        state.phase = SurfacePhase::Invalid;
        self.build_surface(&mut state, &objects, dpi)?;
        state.phase = SurfacePhase::Valid;

        log::debug!(
            "{}: surface rebuilt at {} ({} dpi)",
            self.component,
            state.render_target_bounds,
            dpi
        );
        Ok(())
    }

    fn build_surface(
        &self,
        state: &mut SurfaceState,
        objects: &DeviceObjects,
        dpi: f32,
    ) -> Result<(), GraphicsError> {
        let backend = Arc::clone(self.backend());

        backend.set_context_2d_target(objects.context_2d, None)?;
        backend.set_render_targets(objects.context, None, None)?;
        state.release_views();

        let width = to_pixels(state.bounds.width, dpi);
        let height = to_pixels(state.bounds.height, dpi);

        let swap_chain = match state.swap_chain {
            Some(swap_chain) => {
                let swap_chain = swap_chain.handle();
                let current = backend.swap_chain_descriptor(swap_chain)?;
                backend.resize_swap_chain(
                    swap_chain,
                    current.buffer_count,
                    width,
                    height,
                    current.format,
                    current.flags,
                )?;
                swap_chain
            }
            None => {
                let descriptor = self.host.swap_chain_descriptor(width, height);
                let full_screen = self.host.full_screen_descriptor();
                let swap_chain = self.host.create_swap_chain(
                    backend.as_ref(),
                    objects.device,
                    &descriptor,
                    &full_screen,
                )?;
                let swap_chain = state.registry.track(&backend, swap_chain, "swap chain");
                state.swap_chain = Some(swap_chain);
                state.display_modes =
                    backend.display_modes(swap_chain.handle(), descriptor.format)?;
                log::info!(
                    "{}: created swap chain {} ({width}x{height}, {} display mode(s))",
                    self.component,
                    swap_chain.handle(),
                    state.display_modes.len()
                );
                swap_chain.handle()
            }
        };
        let descriptor = backend.swap_chain_descriptor(swap_chain)?;

        let back_buffer = backend.back_buffer(swap_chain, 0)?;
        let back_buffer = state.registry.track(&backend, back_buffer, "back buffer");
        state.back_buffer = Some(back_buffer);

        let render_target_view =
            backend.create_render_target_view(objects.device, back_buffer.handle())?;
        state.render_target_view =
            Some(state.registry.track(&backend, render_target_view, "render target view"));

        let texture = backend.texture_descriptor(back_buffer.handle())?;
        state.render_target_bounds = Rect::from_dimensions(texture.width, texture.height);
        state.viewport = Viewport::from_rect(state.render_target_bounds);
        backend.set_viewport(objects.context, &state.viewport)?;

        let depth_descriptor = TextureDescriptor::new_2d(
            texture.width,
            texture.height,
            DEPTH_FORMAT,
            BindFlags::DEPTH_STENCIL,
        )
        .with_label("depth buffer")
        .with_sample(descriptor.sample);
        let depth_buffer = backend.create_texture(objects.device, &depth_descriptor)?;
        state.depth_buffer = Some(state.registry.track(&backend, depth_buffer, "depth buffer"));

        let view_descriptor =
            DepthStencilViewDescriptor::new(DepthStencilViewDimension::for_sample(&descriptor.sample));
        let depth_stencil_view =
            backend.create_depth_stencil_view(objects.device, depth_buffer, &view_descriptor)?;
        state.depth_stencil_view =
            Some(state.registry.track(&backend, depth_stencil_view, "depth stencil view"));

        backend.set_render_targets(
            objects.context,
            Some(render_target_view),
            Some(depth_stencil_view),
        )?;

        let properties = BitmapProperties::surface_target(descriptor.format, dpi);
        let bitmap_target =
            backend.create_bitmap_target(objects.context_2d, back_buffer.handle(), &properties)?;
        state.bitmap_target = Some(state.registry.track(&backend, bitmap_target, "2D target"));
        backend.set_context_2d_target(objects.context_2d, Some(bitmap_target))?;
        backend.set_text_antialias_mode(objects.context_2d, TextAntialiasMode::Grayscale)?;

        Ok(())
    }
}

/// Convert device-independent pixels to physical pixels.
fn to_pixels(logical: u32, dpi: f32) -> u32 {
    ((logical as f32 * dpi / DEFAULT_DPI) as u32).max(1)
}

fn with_app(
    weak: &Weak<Application>,
    f: impl FnOnce(&Application) -> Result<(), GraphicsError>,
) -> Result<(), GraphicsError> {
    match weak.upgrade() {
        Some(app) => f(&app),
        None => Ok(()),
    }
}

impl Drop for Application {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Application")
            .field("component", &self.component)
            .field("phase", &state.phase)
            .field("bounds", &state.bounds)
            .field("render_target_bounds", &state.render_target_bounds)
            .field("views", &state.views())
            .field("vsync", &self.vsync())
            .finish()
    }
}

static_assertions::assert_impl_all!(Application: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessHost;
    use lumen_graphics::{ObjectKind, SampleDescription, SoftwareBackend, WindowHandle};

    fn app_with(
        host: HeadlessHost,
        config: AppConfig,
    ) -> (Arc<SoftwareBackend>, Arc<HeadlessHost>, Arc<Application>) {
        let software = Arc::new(SoftwareBackend::new());
        let backend: Arc<dyn Backend> = software.clone();
        let host = Arc::new(host);
        let app = Application::new(backend, host.clone(), config);
        (software, host, app)
    }

    fn app(width: u32, height: u32) -> (Arc<SoftwareBackend>, Arc<HeadlessHost>, Arc<Application>) {
        app_with(
            HeadlessHost::new(WindowHandle::new(1), Rect::from_dimensions(width, height)),
            AppConfig::default().with_debug_device(false),
        )
    }

    #[test]
    fn test_to_pixels() {
        assert_eq!(to_pixels(800, 96.0), 800);
        assert_eq!(to_pixels(800, 144.0), 1200);
        assert_eq!(to_pixels(1, 48.0), 1);
    }

    #[test]
    fn test_initialize_builds_surface() {
        let (software, _host, app) = app(800, 600);
        assert_eq!(app.surface_phase(), SurfacePhase::NoSurface);
        assert!(app.views().is_none());

        app.initialize().unwrap();

        let views = app.views().unwrap();
        assert_eq!(app.surface_phase(), SurfacePhase::Valid);
        assert_eq!(app.render_target_bounds(), Rect::from_dimensions(800, 600));
        assert_eq!(app.viewport(), Viewport::from_dimensions(800, 600));
        assert_eq!(software.kind_of(views.swap_chain), Some(ObjectKind::SwapChain));
        assert_eq!(
            software.kind_of(views.depth_stencil_view),
            Some(ObjectKind::DepthStencilView)
        );
        assert_eq!(app.display_modes().len(), 3);

        let objects = app.device_manager().objects().unwrap();
        assert_eq!(
            software.render_targets(objects.context),
            (Some(views.render_target_view), Some(views.depth_stencil_view))
        );
        assert_eq!(software.context_2d_target(objects.context_2d), Some(views.bitmap_target));
        assert_eq!(
            software.text_antialias_mode(objects.context_2d),
            Some(TextAntialiasMode::Grayscale)
        );
    }

    #[test]
    fn test_multisampled_depth_view() {
        let (software, _host, app) = app_with(
            HeadlessHost::new(WindowHandle::new(1), Rect::from_dimensions(640, 480))
                .with_sample(SampleDescription::new(4, 0)),
            AppConfig::default(),
        );
        app.initialize().unwrap();

        let views = app.views().unwrap();
        let descriptor = software
            .depth_stencil_view_descriptor(views.depth_stencil_view)
            .unwrap();
        assert_eq!(descriptor.dimension, DepthStencilViewDimension::Texture2DMultisampled);
        assert_eq!(descriptor.format, DEPTH_FORMAT);
    }

    #[test]
    fn test_dpi_scales_back_buffer() {
        let (software, _host, app) = app_with(
            HeadlessHost::new(WindowHandle::new(1), Rect::from_dimensions(800, 600)),
            AppConfig::default().with_dpi(144.0),
        );
        app.initialize().unwrap();

        assert_eq!(app.bounds(), Rect::from_dimensions(800, 600));
        assert_eq!(app.render_target_bounds(), Rect::from_dimensions(1200, 900));
        let views = app.views().unwrap();
        assert_eq!(
            software.bitmap_properties(views.bitmap_target).map(|p| p.dpi_x),
            Some(144.0)
        );
    }

    #[rstest::rstest]
    #[case::standard(96.0, (800, 600))]
    #[case::one_and_a_half(144.0, (1200, 900))]
    #[case::double(192.0, (1600, 1200))]
    fn test_width_height_follow_dpi(#[case] dpi: f32, #[case] expected: (u32, u32)) {
        let (_software, _host, app) = app_with(
            HeadlessHost::new(WindowHandle::new(1), Rect::from_dimensions(800, 600)),
            AppConfig::default().with_debug_device(false).with_dpi(dpi),
        );
        assert_eq!((app.width(), app.height()), (0, 0));

        app.initialize().unwrap();

        assert_eq!((app.width(), app.height()), expected);
        let target = app.render_target_bounds();
        assert_eq!((target.width, target.height), expected);
    }

    #[test]
    fn test_width_height_track_set_dpi() {
        let (_software, _host, app) = app(800, 600);
        app.initialize().unwrap();
        app.device_manager().set_dpi(144.0).unwrap();
        assert_eq!((app.width(), app.height()), (1200, 900));
        assert_eq!(app.bounds(), Rect::from_dimensions(800, 600));
    }

    #[test]
    fn test_set_dpi_rebuilds_surface() {
        let (software, _host, app) = app(800, 600);
        app.initialize().unwrap();
        let swap_chain = app.views().unwrap().swap_chain;

        app.device_manager().set_dpi(192.0).unwrap();

        assert_eq!(app.render_target_bounds(), Rect::from_dimensions(1600, 1200));
        assert_eq!(app.views().unwrap().swap_chain, swap_chain);
        assert_eq!(software.resize_count(), 1);
    }

    #[test]
    fn test_present_uses_vsync() {
        let (software, _host, app) = app(800, 600);
        app.initialize().unwrap();

        assert_eq!(app.present().unwrap(), PresentOutcome::Presented);
        assert_eq!(software.last_sync_interval(), Some(1));

        app.set_vsync(false);
        app.present().unwrap();
        assert_eq!(software.last_sync_interval(), Some(0));
        assert_eq!(software.present_count(), 2);
    }

    #[test]
    fn test_present_before_initialize_is_skipped() {
        let (software, _host, app) = app(800, 600);
        assert_eq!(app.present().unwrap(), PresentOutcome::Skipped);
        assert_eq!(software.present_count(), 0);
    }

    #[test]
    fn test_dispose_leaves_full_screen_first() {
        let (software, _host, app) = app(800, 600);
        app.initialize().unwrap();
        let swap_chain = app.views().unwrap().swap_chain;
        software.set_full_screen(swap_chain, true).unwrap();

        app.dispose();

        assert_eq!(app.surface_phase(), SurfacePhase::Terminated);
        assert_eq!(software.full_screen_release_count(), 0);
        assert_eq!(software.live_count(), 0);
        assert_eq!(software.double_release_count(), 0);
        assert_eq!(app.present(), Err(GraphicsError::Disposed));
        assert_eq!(app.size_changed(true), Err(GraphicsError::Disposed));
        assert_eq!(app.initialize(), Err(GraphicsError::Disposed));
    }

    #[test]
    fn test_drop_releases_everything() {
        let (software, _host, app) = app(800, 600);
        app.initialize().unwrap();
        assert!(software.live_count() > 0);

        drop(app);
        assert_eq!(software.live_count(), 0);
        assert_eq!(software.double_release_count(), 0);
    }
}
