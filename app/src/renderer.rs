//! Renderer base.
//!
//! A [`Renderer`] attaches a [`RenderHandler`] to an [`Application`]: the
//! handler's device resources are rebuilt whenever the device is replaced and
//! its size-dependent resources whenever the surface changes size. Resources
//! registered through [`RenderContext::track`] are released before every
//! device rebuild and when the renderer is detached or dropped.
//!
//! Hooks may drive lifecycle operations themselves, for example calling
//! [`DeviceManager::set_dpi`] from `draw`. Notifications that reach the
//! renderer while one of its hooks is running are queued and replayed, device
//! first, as soon as that hook returns.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use glam::Affine2;
use parking_lot::{Mutex, MutexGuard};

use lumen_core::{Component, DisposalRegistry, Tracked};
use lumen_graphics::{
    Backend, DeviceManager, DeviceObjects, GpuHandle, GraphicsError, TrackGpu, Viewport,
};

use crate::app::{Application, SurfaceViews};

/// Rendering hooks of a [`Renderer`].
///
/// # Example
///
/// ```
/// use lumen_app::{RenderContext, RenderHandler};
/// use lumen_graphics::{Color, GraphicsError};
///
/// struct Clear;
///
/// impl RenderHandler for Clear {
///     fn draw(&mut self, ctx: &mut RenderContext<'_>) -> Result<(), GraphicsError> {
///         if let Some(views) = ctx.views() {
///             ctx.backend()
///                 .clear_render_target(ctx.command_context(), views.render_target_view, Color::BLACK)?;
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait RenderHandler: Send {
    /// Create resources that depend only on the device.
    ///
    /// Called on attach (if the device is ready) and after every device
    /// initialization.
    fn build_device_resources(&mut self, _ctx: &mut RenderContext<'_>) -> Result<(), GraphicsError> {
        Ok(())
    }

    /// Create resources that depend on the surface size.
    fn build_size_resources(&mut self, _ctx: &mut RenderContext<'_>) -> Result<(), GraphicsError> {
        Ok(())
    }

    /// Record the draw commands of one frame.
    fn draw(&mut self, ctx: &mut RenderContext<'_>) -> Result<(), GraphicsError>;
}

/// What a [`RenderHandler`] hook gets to work with.
pub struct RenderContext<'a> {
    app: &'a Application,
    objects: DeviceObjects,
    command_context: GpuHandle,
    registry: &'a mut DisposalRegistry<GpuHandle>,
    world: Affine2,
}

impl<'a> RenderContext<'a> {
    pub fn application(&self) -> &Application {
        self.app
    }

    pub fn device_manager(&self) -> &DeviceManager {
        self.app.device_manager()
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        self.app.backend()
    }

    /// Device objects of the current initialization.
    pub fn objects(&self) -> &DeviceObjects {
        &self.objects
    }

    pub fn device(&self) -> GpuHandle {
        self.objects.device
    }

    /// Command context to record into: the renderer's override, if set, or
    /// the device's immediate context.
    pub fn command_context(&self) -> GpuHandle {
        self.command_context
    }

    /// Current surface views, if the surface is built.
    pub fn views(&self) -> Option<SurfaceViews> {
        self.app.views()
    }

    pub fn viewport(&self) -> Viewport {
        self.app.viewport()
    }

    /// 2D world transform of the renderer.
    pub fn world(&self) -> Affine2 {
        self.world
    }

    /// The renderer's disposal registry.
    pub fn registry(&mut self) -> &mut DisposalRegistry<GpuHandle> {
        self.registry
    }

    /// Track `handle` in the renderer's registry.
    pub fn track(&mut self, handle: GpuHandle, label: &'static str) -> Tracked<GpuHandle> {
        let backend = Arc::clone(self.app.backend());
        self.registry.track(&backend, handle, label)
    }
}

struct RendererInner<H> {
    name: String,
    handler: H,
    registry: DisposalRegistry<GpuHandle>,
    attached: Option<Weak<Application>>,
    render_context: Option<GpuHandle>,
    world: Affine2,
    visible: bool,
}

impl<H: RenderHandler> RendererInner<H> {
    fn application(&self) -> Result<Arc<Application>, GraphicsError> {
        self.attached
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or(GraphicsError::NotInitialized("renderer attachment"))
    }

    /// Run `hook` with a context over the attached application.
    fn with_context<F>(
        &mut self,
        command_context: Option<GpuHandle>,
        hook: F,
    ) -> Result<(), GraphicsError>
    where
        F: FnOnce(&mut H, &mut RenderContext<'_>) -> Result<(), GraphicsError>,
    {
        let app = self.application()?;
        let objects = app
            .device_manager()
            .objects()
            .ok_or(GraphicsError::NotInitialized("device"))?;
        let command_context = command_context
            .or(self.render_context)
            .unwrap_or(objects.context);

        let mut ctx = RenderContext {
            app: app.as_ref(),
            objects,
            command_context,
            registry: &mut self.registry,
            world: self.world,
        };
        hook(&mut self.handler, &mut ctx)
    }

    fn device_ready(&mut self) -> Result<(), GraphicsError> {
        let released = self.registry.release_all();
        log::debug!(
            "Renderer '{}': rebuilding device resources ({released} released)",
            self.name
        );
        self.with_context(None, |handler, ctx| handler.build_device_resources(ctx))
    }

    fn size_changed(&mut self) -> Result<(), GraphicsError> {
        log::trace!("Renderer '{}': rebuilding size resources", self.name);
        self.with_context(None, |handler, ctx| handler.build_size_resources(ctx))
    }
}

#[derive(Debug, Clone, Copy)]
enum Notification {
    DeviceReady,
    SizeChanged,
}

/// Renderer state shared with the subscriptions.
struct RendererShared<H> {
    inner: Mutex<RendererInner<H>>,
    device_pending: AtomicBool,
    size_pending: AtomicBool,
}

impl<H: RenderHandler> RendererShared<H> {
    fn flag(&self, notification: Notification) -> &AtomicBool {
        match notification {
            Notification::DeviceReady => &self.device_pending,
            Notification::SizeChanged => &self.size_pending,
        }
    }

    fn has_pending(&self) -> bool {
        self.device_pending.load(Ordering::Acquire) || self.size_pending.load(Ordering::Acquire)
    }

    fn clear_pending(&self) {
        self.device_pending.store(false, Ordering::Release);
        self.size_pending.store(false, Ordering::Release);
    }

    /// Handle `notification` now, or after the hook that currently holds the
    /// renderer.
    fn notify(&self, notification: Notification) -> Result<(), GraphicsError> {
        self.flag(notification).store(true, Ordering::Release);
        match self.inner.try_lock() {
            Some(inner) => self.finish(inner),
            None => {
                log::trace!("Renderer: {notification:?} deferred until the running hook returns");
                Ok(())
            }
        }
    }

    /// Replay queued notifications.
    fn drain(&self, inner: &mut RendererInner<H>) -> Result<(), GraphicsError> {
        loop {
            if self.device_pending.swap(false, Ordering::AcqRel) {
                inner.device_ready()?;
            } else if self.size_pending.swap(false, Ordering::AcqRel) {
                inner.size_changed()?;
            } else {
                return Ok(());
            }
        }
    }

    /// Replay queued notifications and unlock.
    fn finish<'a>(
        &'a self,
        mut inner: MutexGuard<'a, RendererInner<H>>,
    ) -> Result<(), GraphicsError> {
        loop {
            self.drain(&mut inner)?;
            drop(inner);
            if !self.has_pending() {
                return Ok(());
            }
            // Queued between the drain and the unlock; whoever holds the lock
            // now replays it.
            match self.inner.try_lock() {
                Some(guard) => inner = guard,
                None => return Ok(()),
            }
        }
    }
}

/// Attaches a [`RenderHandler`] to an [`Application`].
///
/// Dropping the renderer detaches it.
pub struct Renderer<H: RenderHandler + 'static> {
    component: Component,
    shared: Arc<RendererShared<H>>,
}

impl<H: RenderHandler + 'static> Renderer<H> {
    pub fn new(handler: H) -> Self {
        Self::named("renderer", handler)
    }

    pub fn named(name: impl Into<String>, handler: H) -> Self {
        let name = name.into();
        Self {
            component: Component::named(name.clone()),
            shared: Arc::new(RendererShared {
                inner: Mutex::new(RendererInner {
                    name,
                    handler,
                    registry: DisposalRegistry::new(),
                    attached: None,
                    render_context: None,
                    world: Affine2::IDENTITY,
                    visible: true,
                }),
                device_pending: AtomicBool::new(false),
                size_pending: AtomicBool::new(false),
            }),
        }
    }

    pub fn component(&self) -> &Component {
        &self.component
    }

    /// Attach to `app`, detaching from any earlier application first.
    ///
    /// If the device is already initialized the device resources are built
    /// before this returns.
    pub fn attach(&self, app: &Arc<Application>) -> Result<(), GraphicsError> {
        self.detach();
        let id = self.component.id();

        let weak = Arc::downgrade(&self.shared);
        app.device_manager().on_initialize().subscribe(id, move |_| {
            notify(&weak, Notification::DeviceReady)
        });

        let weak = Arc::downgrade(&self.shared);
        app.on_size_changed().subscribe(id, move |_| {
            notify(&weak, Notification::SizeChanged)
        });

        let mut inner = self.shared.inner.lock();
        inner.attached = Some(Arc::downgrade(app));
        log::debug!("{}: attached to {}", self.component, app.component());

        let built = if app.device_manager().is_ready() {
            inner.device_ready()
        } else {
            Ok(())
        };
        let replayed = self.shared.finish(inner);
        built.and(replayed)
    }

    /// Unsubscribe from the attached application and release every resource
    /// the handler registered. No-op when not attached.
    pub fn detach(&self) {
        let mut inner = self.shared.inner.lock();
        let Some(attached) = inner.attached.take() else {
            return;
        };
        self.shared.clear_pending();
        if let Some(app) = attached.upgrade() {
            let id = self.component.id();
            app.device_manager().on_initialize().unsubscribe(id);
            app.on_size_changed().unsubscribe(id);
        }
        let released = inner.registry.release_all();
        log::debug!("{}: detached ({released} resource(s) released)", self.component);
    }

    pub fn is_attached(&self) -> bool {
        self.shared.inner.lock().application().is_ok()
    }

    /// Draw with the renderer's command context. Does nothing while hidden.
    pub fn render(&self) -> Result<(), GraphicsError> {
        self.draw(None)
    }

    /// Draw into `command_context` for this call only.
    pub fn render_with(&self, command_context: GpuHandle) -> Result<(), GraphicsError> {
        self.draw(Some(command_context))
    }

    fn draw(&self, command_context: Option<GpuHandle>) -> Result<(), GraphicsError> {
        let mut inner = self.shared.inner.lock();
        if !inner.visible {
            return Ok(());
        }
        self.shared.drain(&mut inner)?;
        let drawn = inner.with_context(command_context, |handler, ctx| handler.draw(ctx));
        let replayed = self.shared.finish(inner);
        drawn.and(replayed)
    }

    pub fn is_visible(&self) -> bool {
        self.shared.inner.lock().visible
    }

    pub fn set_visible(&self, visible: bool) {
        self.shared.inner.lock().visible = visible;
    }

    pub fn world(&self) -> Affine2 {
        self.shared.inner.lock().world
    }

    pub fn set_world(&self, world: Affine2) {
        self.shared.inner.lock().world = world;
    }

    /// Command context the renderer records into. `None` selects the
    /// device's immediate context.
    pub fn set_render_context(&self, command_context: Option<GpuHandle>) {
        self.shared.inner.lock().render_context = command_context;
    }

    /// Run `f` with the handler.
    ///
    /// Notifications queued while `f` runs are replayed afterwards; a failure
    /// there is logged, not returned.
    pub fn with_handler<R>(&self, f: impl FnOnce(&mut H) -> R) -> R {
        let mut inner = self.shared.inner.lock();
        let result = f(&mut inner.handler);
        if let Err(err) = self.shared.finish(inner) {
            log::warn!("{}: queued rebuild failed: {err}", self.component);
        }
        result
    }
}

fn notify<H: RenderHandler>(
    weak: &Weak<RendererShared<H>>,
    notification: Notification,
) -> Result<(), GraphicsError> {
    match weak.upgrade() {
        Some(shared) => shared.notify(notification),
        None => Ok(()),
    }
}

impl<H: RenderHandler + 'static> Drop for Renderer<H> {
    fn drop(&mut self) {
        self.detach();
    }
}

impl<H: RenderHandler + 'static> fmt::Debug for Renderer<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.shared.inner.lock();
        f.debug_struct("Renderer")
            .field("component", &self.component)
            .field("attached", &inner.application().is_ok())
            .field("visible", &inner.visible)
            .field("resources", &inner.registry.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::headless::HeadlessHost;
    use lumen_graphics::{BindFlags, BufferDescriptor, Color, Rect, SoftwareBackend, WindowHandle};

    #[derive(Default)]
    struct Counting {
        device_builds: u32,
        size_builds: u32,
        draws: u32,
        buffer: Option<GpuHandle>,
        last_context: Option<GpuHandle>,
    }

    impl RenderHandler for Counting {
        fn build_device_resources(&mut self, ctx: &mut RenderContext<'_>) -> Result<(), GraphicsError> {
            self.device_builds += 1;
            let buffer = ctx
                .backend()
                .create_buffer(ctx.device(), &BufferDescriptor::new(64, BindFlags::VERTEX_BUFFER), None)?;
            self.buffer = Some(ctx.track(buffer, "counting buffer").handle());
            Ok(())
        }

        fn build_size_resources(&mut self, _ctx: &mut RenderContext<'_>) -> Result<(), GraphicsError> {
            self.size_builds += 1;
            Ok(())
        }

        fn draw(&mut self, ctx: &mut RenderContext<'_>) -> Result<(), GraphicsError> {
            self.draws += 1;
            self.last_context = Some(ctx.command_context());
            if let Some(views) = ctx.views() {
                ctx.backend()
                    .clear_render_target(ctx.command_context(), views.render_target_view, Color::WHITE)?;
            }
            Ok(())
        }
    }

    fn app() -> (Arc<SoftwareBackend>, Arc<Application>) {
        let software = Arc::new(SoftwareBackend::new());
        let backend: Arc<dyn Backend> = software.clone();
        let host = Arc::new(HeadlessHost::new(
            WindowHandle::new(1),
            Rect::from_dimensions(800, 600),
        ));
        let app = Application::new(backend, host, AppConfig::default());
        (software, app)
    }

    #[test]
    fn test_attach_to_ready_device_builds_resources() {
        let (software, app) = app();
        app.initialize().unwrap();

        let renderer = Renderer::new(Counting::default());
        renderer.attach(&app).unwrap();

        let buffer = renderer.with_handler(|counting| {
            assert_eq!(counting.device_builds, 1);
            assert_eq!(counting.size_builds, 0);
            counting.buffer.unwrap()
        });
        assert!(software.is_live(buffer));
    }

    #[test]
    fn test_reinitialize_replaces_device_resources() {
        let (software, app) = app();
        let renderer = Renderer::new(Counting::default());
        renderer.attach(&app).unwrap();
        app.initialize().unwrap();
        let first = renderer.with_handler(|counting| counting.buffer.unwrap());

        app.initialize().unwrap();

        let second = renderer.with_handler(|counting| {
            assert_eq!(counting.device_builds, 2);
            counting.buffer.unwrap()
        });
        assert_ne!(first, second);
        assert!(!software.is_live(first));
        assert!(software.is_live(second));
    }

    #[test]
    fn test_hidden_renderer_does_not_draw() {
        let (_software, app) = app();
        app.initialize().unwrap();
        let renderer = Renderer::new(Counting::default());
        renderer.attach(&app).unwrap();

        renderer.set_visible(false);
        renderer.render().unwrap();
        assert_eq!(renderer.with_handler(|counting| counting.draws), 0);

        renderer.set_visible(true);
        renderer.render().unwrap();
        assert_eq!(renderer.with_handler(|counting| counting.draws), 1);
    }

    #[test]
    fn test_render_context_override() {
        let (software, app) = app();
        app.initialize().unwrap();
        let immediate = app.device_manager().objects().unwrap().context;
        let renderer = Renderer::new(Counting::default());
        renderer.attach(&app).unwrap();

        renderer.render().unwrap();
        assert_eq!(renderer.with_handler(|counting| counting.last_context), Some(immediate));
        assert_eq!(software.last_clear_color(immediate), Some(Color::WHITE));

        let deferred = GpuHandle::from_raw(u64::MAX).unwrap();
        renderer.set_render_context(Some(deferred));
        assert!(renderer.render().is_err());
        assert_eq!(renderer.with_handler(|counting| counting.last_context), Some(deferred));

        renderer.set_render_context(None);
        renderer.render_with(immediate).unwrap();
        assert_eq!(renderer.with_handler(|counting| counting.last_context), Some(immediate));
    }

    #[test]
    fn test_render_requires_attachment() {
        let renderer = Renderer::new(Counting::default());
        assert_eq!(
            renderer.render(),
            Err(GraphicsError::NotInitialized("renderer attachment"))
        );
    }

    #[test]
    fn test_detach_releases_and_unsubscribes() {
        let (software, app) = app();
        app.initialize().unwrap();
        let renderer = Renderer::new(Counting::default());
        renderer.attach(&app).unwrap();
        let buffer = renderer.with_handler(|counting| counting.buffer.unwrap());

        renderer.detach();
        assert!(!renderer.is_attached());
        assert!(!software.is_live(buffer));

        app.size_changed(true).unwrap();
        assert_eq!(renderer.with_handler(|counting| counting.size_builds), 0);
    }

    /// Changes the DPI or reinitializes the device from inside `draw`.
    #[derive(Default)]
    struct Reentrant {
        reinitialize: bool,
        dpi: Option<f32>,
        device_builds: u32,
        size_builds: u32,
        size_seen_during_draw: Option<u32>,
    }

    impl RenderHandler for Reentrant {
        fn build_device_resources(&mut self, _ctx: &mut RenderContext<'_>) -> Result<(), GraphicsError> {
            self.device_builds += 1;
            Ok(())
        }

        fn build_size_resources(&mut self, _ctx: &mut RenderContext<'_>) -> Result<(), GraphicsError> {
            self.size_builds += 1;
            Ok(())
        }

        fn draw(&mut self, ctx: &mut RenderContext<'_>) -> Result<(), GraphicsError> {
            if let Some(dpi) = self.dpi.take() {
                ctx.device_manager().set_dpi(dpi)?;
            }
            if std::mem::take(&mut self.reinitialize) {
                ctx.application().initialize()?;
            }
            self.size_seen_during_draw = Some(self.size_builds);
            Ok(())
        }
    }

    #[test]
    fn test_draw_hook_can_change_dpi() {
        let (_software, app) = app();
        app.initialize().unwrap();
        let renderer = Renderer::new(Reentrant {
            dpi: Some(144.0),
            ..Default::default()
        });
        renderer.attach(&app).unwrap();

        renderer.render().unwrap();

        assert_eq!(app.render_target_bounds(), Rect::from_dimensions(1200, 900));
        renderer.with_handler(|handler| {
            // Queued during draw, replayed right after it.
            assert_eq!(handler.size_seen_during_draw, Some(0));
            assert_eq!(handler.size_builds, 1);
            assert_eq!(handler.device_builds, 1);
        });
    }

    #[test]
    fn test_draw_hook_can_reinitialize() {
        let (_software, app) = app();
        app.initialize().unwrap();
        let renderer = Renderer::new(Reentrant {
            reinitialize: true,
            ..Default::default()
        });
        renderer.attach(&app).unwrap();

        renderer.render().unwrap();
        renderer.render().unwrap();

        assert_eq!(app.device_manager().generation(), 2);
        renderer.with_handler(|handler| {
            assert_eq!(handler.device_builds, 2);
            assert_eq!(handler.size_builds, 1);
        });
    }

    #[test]
    fn test_world_transform_reaches_hooks() {
        let (_software, app) = app();
        app.initialize().unwrap();
        let renderer = Renderer::new(Counting::default());
        renderer.attach(&app).unwrap();

        let world = Affine2::from_translation(glam::Vec2::new(10.0, 20.0));
        renderer.set_world(world);
        assert_eq!(renderer.world(), world);
    }
}
