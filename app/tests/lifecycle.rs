//! Surface and device lifecycle tests for `Application` and `Renderer`.
//!
//! Every test drives an application over the software backend, which rejects
//! the same lifecycle mistakes a native driver would (resizing a swap chain
//! with live views, two swap chains for one window, releasing a handle twice).
//!
//! ```bash
//! cargo test -p lumen-app --test lifecycle
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use rstest::rstest;

use lumen_app::{
    AppConfig, Application, HeadlessHost, PresentOutcome, RenderContext, RenderHandler, Renderer,
    SurfacePhase,
};
use lumen_core::ComponentId;
use lumen_graphics::{
    Backend, BackendError, GraphicsError, ObjectKind, Rect, SoftwareBackend, WindowHandle,
};

struct Fixture {
    software: Arc<SoftwareBackend>,
    host: Arc<HeadlessHost>,
    app: Arc<Application>,
}

fn fixture_with(bounds: Rect, config: AppConfig) -> Fixture {
    let _ = env_logger::builder().is_test(true).try_init();
    let software = Arc::new(SoftwareBackend::new());
    let backend: Arc<dyn Backend> = software.clone();
    let host = Arc::new(HeadlessHost::new(WindowHandle::new(7), bounds));
    let app = Application::new(backend, host.clone(), config);
    Fixture {
        software,
        host,
        app,
    }
}

fn fixture(width: u32, height: u32) -> Fixture {
    fixture_with(
        Rect::from_dimensions(width, height),
        AppConfig::new("lifecycle").with_debug_device(false),
    )
}

/// Record "size changed" notifications seen after the application's own.
fn count_size_changes(app: &Application) -> Arc<Mutex<Vec<Rect>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = Arc::clone(&seen);
    app.on_size_changed().subscribe(ComponentId::next(), move |app| {
        s.lock().push(app.bounds());
        Ok(())
    });
    seen
}

#[rstest]
#[case::both_zero(0, 0)]
#[case::zero_height(800, 0)]
#[case::zero_width(0, 600)]
fn test_degenerate_bounds_are_ignored(#[case] width: u32, #[case] height: u32) {
    let f = fixture(800, 600);
    f.app.initialize().unwrap();
    let seen = count_size_changes(&f.app);
    let views = f.app.views().unwrap();

    f.host.set_bounds(Rect::from_dimensions(width, height));
    assert!(!f.app.size_changed(false).unwrap());
    assert!(!f.app.size_changed(true).unwrap());

    assert!(seen.lock().is_empty());
    assert_eq!(f.app.bounds(), Rect::from_dimensions(800, 600));
    assert_eq!(f.app.views(), Some(views));
    assert_eq!(f.software.resize_count(), 0);
}

#[test]
fn test_degenerate_bounds_before_first_surface() {
    let f = fixture(0, 0);
    f.app.initialize().unwrap();

    assert_eq!(f.app.surface_phase(), SurfacePhase::NoSurface);
    assert_eq!(f.software.live_count_of(ObjectKind::SwapChain), 0);

    f.host.set_bounds(Rect::from_dimensions(320, 200));
    assert!(f.app.size_changed(false).unwrap());
    assert_eq!(f.app.surface_phase(), SurfacePhase::Valid);
}

#[test]
fn test_initialize_notification_order() {
    let f = fixture(800, 600);
    let events = Arc::new(Mutex::new(Vec::new()));

    let e = Arc::clone(&events);
    f.app
        .device_manager()
        .on_initialize()
        .subscribe(ComponentId::next(), move |dm| {
            e.lock().push(format!("device ready (dpi {})", dm.dpi()));
            Ok(())
        });
    let e = Arc::clone(&events);
    f.app
        .device_manager()
        .on_dpi_changed()
        .subscribe(ComponentId::next(), move |dm| {
            e.lock().push(format!("dpi {}", dm.dpi()));
            Ok(())
        });
    let e = Arc::clone(&events);
    f.app
        .on_size_changed()
        .subscribe(ComponentId::next(), move |app| {
            e.lock().push(format!("size {}x{}", app.width(), app.height()));
            Ok(())
        });

    f.app.initialize().unwrap();

    assert_eq!(
        *events.lock(),
        vec!["device ready (dpi 0)", "dpi 96", "size 800x600"]
    );
}

#[test]
fn test_resize_keeps_swap_chain() {
    let f = fixture(800, 600);
    f.app.initialize().unwrap();
    let before = f.app.views().unwrap();

    f.host.set_bounds(Rect::from_dimensions(1024, 768));
    assert!(f.app.size_changed(false).unwrap());

    let after = f.app.views().unwrap();
    assert_eq!(after.swap_chain, before.swap_chain);
    assert_ne!(after.render_target_view, before.render_target_view);
    assert_eq!(f.app.render_target_bounds(), Rect::from_dimensions(1024, 768));
    assert_eq!(f.software.resize_count(), 1);
    assert_eq!(f.software.created_count_of(ObjectKind::SwapChain), 1);
    assert!(!f.software.is_live(before.render_target_view));
    assert!(!f.software.is_live(before.depth_stencil_view));
}

#[test]
fn test_unchanged_bounds_do_not_rebuild() {
    let f = fixture(800, 600);
    f.app.initialize().unwrap();
    let seen = count_size_changes(&f.app);

    assert!(!f.app.size_changed(false).unwrap());
    assert!(seen.lock().is_empty());

    assert!(f.app.size_changed(true).unwrap());
    assert_eq!(*seen.lock(), vec![Rect::from_dimensions(800, 600)]);
}

#[rstest]
#[case::grow(Rect::from_dimensions(1920, 1080))]
#[case::shrink(Rect::from_dimensions(320, 240))]
#[case::moved_and_resized(Rect::new(50, 80, 640, 480))]
fn test_no_view_missing_after_rebuild(#[case] bounds: Rect) {
    let f = fixture(800, 600);
    f.app.initialize().unwrap();

    f.host.set_bounds(bounds);
    assert!(f.app.size_changed(false).unwrap());

    let views = f.app.views().unwrap();
    for handle in [
        views.swap_chain,
        views.back_buffer,
        views.render_target_view,
        views.depth_buffer,
        views.depth_stencil_view,
        views.bitmap_target,
    ] {
        assert!(f.software.is_live(handle), "{handle} is not live");
    }
    assert_eq!(f.app.surface_phase(), SurfacePhase::Valid);
    assert_eq!(f.software.live_count_of(ObjectKind::RenderTargetView), 1);
    assert_eq!(f.software.live_count_of(ObjectKind::DepthStencilView), 1);
    assert_eq!(f.software.live_count_of(ObjectKind::Bitmap), 1);
}

#[test]
fn test_move_keeps_surface() {
    let f = fixture(800, 600);
    f.app.initialize().unwrap();
    let seen = count_size_changes(&f.app);
    let views = f.app.views().unwrap();

    f.host.set_bounds(Rect::new(50, 80, 800, 600));
    assert!(!f.app.size_changed(false).unwrap());

    assert!(seen.lock().is_empty());
    assert_eq!(f.app.views(), Some(views));
    assert_eq!(f.app.bounds(), Rect::new(50, 80, 800, 600));
    assert_eq!(f.software.resize_count(), 0);
    assert!(f.software.is_live(views.render_target_view));
}

#[test]
fn test_minimize_and_restore() {
    let f = fixture(800, 600);
    f.app.initialize().unwrap();
    let seen = count_size_changes(&f.app);

    f.host.set_bounds(Rect::from_dimensions(0, 0));
    assert!(!f.app.size_changed(false).unwrap());
    f.host.set_bounds(Rect::from_dimensions(800, 600));
    assert!(!f.app.size_changed(false).unwrap());

    assert!(seen.lock().is_empty());
    assert_eq!(f.software.resize_count(), 0);
}

#[test]
fn test_initialize_twice_recreates_everything() {
    let f = fixture(800, 600);
    f.app.initialize().unwrap();
    let first_device = f.app.device_manager().objects().unwrap();
    let first_views = f.app.views().unwrap();

    f.app.initialize().unwrap();
    let second_device = f.app.device_manager().objects().unwrap();
    let second_views = f.app.views().unwrap();

    assert_ne!(first_device.device, second_device.device);
    assert_ne!(first_device.context_2d, second_device.context_2d);
    assert_ne!(first_views.swap_chain, second_views.swap_chain);
    assert!(!f.software.is_live(first_device.device));
    assert!(!f.software.is_live(first_views.swap_chain));
    assert_eq!(f.software.live_count_of(ObjectKind::Device), 1);
    assert_eq!(f.software.live_count_of(ObjectKind::SwapChain), 1);
    assert_eq!(f.software.double_release_count(), 0);
    assert_eq!(f.app.device_manager().generation(), 2);
    // The surface is rebuilt once per initialization.
    assert_eq!(f.software.created_count_of(ObjectKind::SwapChain), 2);
    assert_eq!(f.software.resize_count(), 0);
}

#[test]
fn test_reinitialize_notifies_size_once() {
    let f = fixture(800, 600);
    f.app.initialize().unwrap();
    assert_eq!(f.app.surface_phase(), SurfacePhase::Valid);
    let seen = count_size_changes(&f.app);

    f.app.initialize().unwrap();

    assert_eq!(*seen.lock(), vec![Rect::from_dimensions(800, 600)]);
    assert_eq!(f.app.surface_phase(), SurfacePhase::Valid);
}

#[test]
fn test_reinitialize_leaves_full_screen_first() {
    let f = fixture(800, 600);
    f.app.initialize().unwrap();
    let swap_chain = f.app.views().unwrap().swap_chain;
    f.software.set_full_screen(swap_chain, true).unwrap();

    f.app.initialize().unwrap();

    assert_eq!(f.software.full_screen_release_count(), 0);
    assert!(!f.software.is_live(swap_chain));
}

#[rstest]
#[case::removed(BackendError::DeviceRemoved)]
#[case::reset(BackendError::DeviceReset)]
fn test_present_recovers_lost_device(#[case] error: BackendError) {
    let f = fixture_with(
        Rect::from_dimensions(800, 600),
        AppConfig::new("lifecycle").with_dpi(144.0),
    );
    f.app.initialize().unwrap();
    let old_device = f.app.device_manager().objects().unwrap().device;
    let old_swap_chain = f.app.views().unwrap().swap_chain;

    f.software.fail_next_present(error);
    assert_eq!(f.app.present().unwrap(), PresentOutcome::DeviceRecovered);

    let dm = f.app.device_manager();
    assert_eq!(dm.generation(), 2);
    assert_eq!(dm.dpi(), 144.0);
    let objects = dm.objects().unwrap();
    assert_ne!(objects.device, old_device);
    assert_eq!(f.software.context_2d_dpi(objects.context_2d), Some((144.0, 144.0)));
    assert_ne!(f.app.views().unwrap().swap_chain, old_swap_chain);
    assert_eq!(f.app.render_target_bounds(), Rect::from_dimensions(1200, 900));
    assert_eq!(f.software.present_count(), 0);

    assert_eq!(f.app.present().unwrap(), PresentOutcome::Presented);
    assert_eq!(f.software.present_count(), 1);
    assert_eq!(f.software.double_release_count(), 0);
}

#[test]
fn test_other_present_failure_is_fatal() {
    let f = fixture(800, 600);
    f.app.initialize().unwrap();

    f.software
        .fail_next_present(BackendError::Internal("out of video memory".to_string()));
    let err = f.app.present().unwrap_err();

    assert_eq!(
        err,
        GraphicsError::Presentation(BackendError::Internal("out of video memory".to_string()))
    );
    assert_eq!(f.app.device_manager().generation(), 1);
}

#[derive(Default)]
struct Recorder {
    tag: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

impl RenderHandler for Recorder {
    fn build_device_resources(&mut self, _ctx: &mut RenderContext<'_>) -> Result<(), GraphicsError> {
        self.log.lock().push(format!("{} device", self.tag));
        Ok(())
    }

    fn build_size_resources(&mut self, ctx: &mut RenderContext<'_>) -> Result<(), GraphicsError> {
        let bounds = ctx.application().bounds();
        self.log
            .lock()
            .push(format!("{} size {}x{}", self.tag, bounds.width, bounds.height));
        Ok(())
    }

    fn draw(&mut self, _ctx: &mut RenderContext<'_>) -> Result<(), GraphicsError> {
        self.log.lock().push(format!("{} draw", self.tag));
        Ok(())
    }
}

#[test]
fn test_renderers_notified_in_attachment_order() {
    let f = fixture(800, 600);
    f.app.initialize().unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));

    let first = Renderer::new(Recorder {
        tag: "first",
        log: Arc::clone(&log),
    });
    let second = Renderer::new(Recorder {
        tag: "second",
        log: Arc::clone(&log),
    });
    first.attach(&f.app).unwrap();
    second.attach(&f.app).unwrap();
    log.lock().clear();

    f.host.set_bounds(Rect::from_dimensions(1024, 768));
    f.app.size_changed(false).unwrap();
    f.host.set_bounds(Rect::from_dimensions(640, 480));
    f.app.size_changed(false).unwrap();

    assert_eq!(
        *log.lock(),
        vec![
            "first size 1024x768",
            "second size 1024x768",
            "first size 640x480",
            "second size 640x480",
        ]
    );
}

#[test]
fn test_reattach_moves_subscriptions() {
    let a = fixture(800, 600);
    let b = fixture(640, 480);
    a.app.initialize().unwrap();
    b.app.initialize().unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));

    let renderer = Renderer::new(Recorder {
        tag: "r",
        log: Arc::clone(&log),
    });
    renderer.attach(&a.app).unwrap();
    renderer.attach(&b.app).unwrap();
    assert_eq!(*log.lock(), vec!["r device", "r device"]);
    log.lock().clear();

    a.app.size_changed(true).unwrap();
    assert!(log.lock().is_empty());

    b.app.size_changed(true).unwrap();
    assert_eq!(*log.lock(), vec!["r size 640x480"]);
}

#[test]
fn test_dropped_renderer_is_not_notified() {
    let f = fixture(800, 600);
    f.app.initialize().unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));

    let renderer = Renderer::new(Recorder {
        tag: "r",
        log: Arc::clone(&log),
    });
    renderer.attach(&f.app).unwrap();
    drop(renderer);
    log.lock().clear();

    f.app.size_changed(true).unwrap();
    assert!(log.lock().is_empty());
    assert_eq!(f.app.on_size_changed().subscriber_count(), 1);
}

#[test]
fn test_dispose_releases_everything_once() {
    let f = fixture(800, 600);
    f.app.initialize().unwrap();
    let renderer = Renderer::new(Recorder::default());
    renderer.attach(&f.app).unwrap();

    f.app.dispose();
    f.app.dispose();

    assert_eq!(f.app.surface_phase(), SurfacePhase::Terminated);
    assert_eq!(f.software.live_count(), 0);
    assert_eq!(f.software.double_release_count(), 0);
    assert_eq!(f.app.present(), Err(GraphicsError::Disposed));
}
