//! # Lumen Demos
//!
//! Demo applications exercising the Lumen lifecycle layer.
//!
//! ## Available Demos
//!
//! - `triangle_demo` - Colored triangle over a light blue clear, with a
//!   scripted resize, minimize and device removal

use std::mem::size_of;
use std::sync::Arc;

use glam::{Vec3, Vec4};

use lumen_app::{
    AppArgs, Application, HeadlessHost, MainLoop, PresentOutcome, RenderContext, RenderHandler,
    Renderer,
};
use lumen_graphics::{
    Backend, BackendError, BufferDescriptor, Color, GpuHandle, GraphicsError, Rect, ResourceUsage,
    SoftwareBackend, WindowHandle,
};

/// Demos library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Frames rendered when no frame limit is given.
pub const DEFAULT_FRAME_COUNT: u64 = 240;

// === Vertex Data ===

/// Vertex with a position and an RGBA color.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct VertexPositionColor {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

impl VertexPositionColor {
    pub fn new(position: Vec3, color: Vec4) -> Self {
        Self {
            position: position.to_array(),
            color: color.to_array(),
        }
    }

    /// Size of one vertex in bytes.
    pub const STRIDE: u32 = size_of::<Self>() as u32;
}

/// The demo triangle: blue top-left, green top-right, red bottom.
pub fn triangle() -> [VertexPositionColor; 3] {
    [
        VertexPositionColor::new(Vec3::new(-0.5, 0.5, 0.0), Vec4::new(0.0, 0.0, 1.0, 0.0)),
        VertexPositionColor::new(Vec3::new(0.5, 0.5, 0.0), Vec4::new(0.0, 1.0, 0.0, 0.0)),
        VertexPositionColor::new(Vec3::new(0.0, -0.5, 0.0), Vec4::new(1.0, 0.0, 0.0, 0.0)),
    ]
}

// === Renderer ===

/// Clears the back buffer and draws one triangle.
#[derive(Debug)]
pub struct TriangleRenderer {
    clear_color: Color,
    vertices: [VertexPositionColor; 3],
    vertex_buffer: Option<GpuHandle>,
}

impl Default for TriangleRenderer {
    fn default() -> Self {
        Self {
            clear_color: Color::LIGHT_BLUE,
            vertices: triangle(),
            vertex_buffer: None,
        }
    }
}

impl TriangleRenderer {
    pub fn vertex_buffer(&self) -> Option<GpuHandle> {
        self.vertex_buffer
    }

    pub fn clear_color(&self) -> Color {
        self.clear_color
    }
}

impl RenderHandler for TriangleRenderer {
    fn build_device_resources(&mut self, ctx: &mut RenderContext<'_>) -> Result<(), GraphicsError> {
        let descriptor = BufferDescriptor::vertices(self.vertices.len(), VertexPositionColor::STRIDE)
            .with_label("triangle vertices")
            .with_usage(ResourceUsage::Immutable);
        let buffer = ctx.backend().create_buffer(
            ctx.device(),
            &descriptor,
            Some(bytemuck::cast_slice(&self.vertices)),
        )?;
        self.vertex_buffer = Some(ctx.track(buffer, "triangle vertex buffer").handle());
        log::debug!("Triangle vertex buffer {buffer} created");
        Ok(())
    }

    fn draw(&mut self, ctx: &mut RenderContext<'_>) -> Result<(), GraphicsError> {
        let (Some(views), Some(vertex_buffer)) = (ctx.views(), self.vertex_buffer) else {
            return Ok(());
        };
        let backend = ctx.backend();
        let command_context = ctx.command_context();

        backend.clear_render_target(command_context, views.render_target_view, self.clear_color)?;
        backend.clear_depth_stencil(command_context, views.depth_stencil_view, 1.0, 0)?;
        backend.set_vertex_buffer(command_context, 0, vertex_buffer, VertexPositionColor::STRIDE, 0)?;
        backend.draw(command_context, self.vertices.len() as u32, 0)?;
        Ok(())
    }
}

// === Demo Application ===

/// Host event injected at a given frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScriptedEvent {
    /// The window's client area changes.
    Resize(Rect),
    /// The window is minimized (zero-sized client area).
    Minimize,
    /// The window is restored to its size before minimizing.
    Restore,
    /// The next present reports that the device was removed.
    LoseDevice,
}

/// Counters of a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub presented: u64,
    pub recovered: u64,
    pub skipped: u64,
}

/// Triangle demo over the software backend and a headless host.
pub struct TriangleApp {
    software: Arc<SoftwareBackend>,
    host: Arc<HeadlessHost>,
    app: Arc<Application>,
    renderer: Renderer<TriangleRenderer>,
    frame_count: u64,
    script: Vec<(u64, ScriptedEvent)>,
    restore_bounds: Rect,
    stats: FrameStats,
}

impl TriangleApp {
    /// Create the demo, attach the renderer and initialize the device.
    pub fn new(args: &impl AppArgs) -> Result<Self, GraphicsError> {
        let software = Arc::new(SoftwareBackend::new());
        let backend: Arc<dyn Backend> = software.clone();
        let bounds = Rect::from_dimensions(args.window_width(), args.window_height());
        let host = Arc::new(HeadlessHost::new(WindowHandle::new(1), bounds));
        let app = Application::new(backend, host.clone(), args.app_config("Triangle Demo"));

        let renderer = Renderer::named("triangle", TriangleRenderer::default());
        renderer.attach(&app)?;
        app.initialize()?;

        log::info!(
            "Triangle demo ready: {} logical, {} physical, {} display mode(s)",
            app.bounds(),
            app.render_target_bounds(),
            app.display_modes().len()
        );

        Ok(Self {
            software,
            host,
            app,
            renderer,
            frame_count: args.max_frames().unwrap_or(DEFAULT_FRAME_COUNT),
            script: Vec::new(),
            restore_bounds: bounds,
            stats: FrameStats::default(),
        })
    }

    /// Schedule `event` before frame `frame`.
    pub fn with_event(mut self, frame: u64, event: ScriptedEvent) -> Self {
        self.script.push((frame, event));
        self
    }

    /// Resize at a quarter, minimize and restore at half, and lose the device
    /// at three quarters of the run.
    pub fn with_default_script(self) -> Self {
        let n = self.frame_count;
        self.with_event(n / 4, ScriptedEvent::Resize(Rect::from_dimensions(1024, 768)))
            .with_event(n / 2, ScriptedEvent::Minimize)
            .with_event(n / 2 + 1, ScriptedEvent::Restore)
            .with_event(n * 3 / 4, ScriptedEvent::LoseDevice)
    }

    pub fn application(&self) -> &Arc<Application> {
        &self.app
    }

    pub fn renderer(&self) -> &Renderer<TriangleRenderer> {
        &self.renderer
    }

    pub fn backend(&self) -> &Arc<SoftwareBackend> {
        &self.software
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    fn apply(&mut self, event: ScriptedEvent) -> Result<(), GraphicsError> {
        log::info!("Scripted event: {event:?}");
        match event {
            ScriptedEvent::Resize(bounds) => {
                self.host.set_bounds(bounds);
                self.restore_bounds = bounds;
                self.app.size_changed(false)?;
            }
            ScriptedEvent::Minimize => {
                self.restore_bounds = self.app.bounds();
                self.host.set_bounds(Rect::default());
                self.app.size_changed(false)?;
            }
            ScriptedEvent::Restore => {
                self.host.set_bounds(self.restore_bounds);
                self.app.size_changed(false)?;
            }
            ScriptedEvent::LoseDevice => {
                self.software.fail_next_present(BackendError::DeviceRemoved);
            }
        }
        Ok(())
    }
}

impl MainLoop for TriangleApp {
    fn run(&mut self) -> Result<(), GraphicsError> {
        for frame in 0..self.frame_count {
            let due: Vec<ScriptedEvent> = self
                .script
                .iter()
                .filter(|(at, _)| *at == frame)
                .map(|(_, event)| *event)
                .collect();
            for event in due {
                self.apply(event)?;
            }

            self.renderer.render()?;
            match self.app.present()? {
                PresentOutcome::Presented => self.stats.presented += 1,
                PresentOutcome::DeviceRecovered => self.stats.recovered += 1,
                PresentOutcome::Skipped => self.stats.skipped += 1,
            }
        }

        log::info!(
            "Rendered {} frame(s): {} presented, {} recovered, {} skipped",
            self.frame_count,
            self.stats.presented,
            self.stats.recovered,
            self.stats.skipped
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_app::DefaultAppArgs;
    use lumen_graphics::ObjectKind;

    #[test]
    fn test_vertex_layout() {
        assert_eq!(VertexPositionColor::STRIDE, 28);
        let vertices = triangle();
        let bytes: &[u8] = bytemuck::cast_slice(&vertices);
        assert_eq!(bytes.len(), 84);
    }

    #[test]
    fn test_triangle_uploaded_and_drawn() {
        let args = DefaultAppArgs::default().with_max_frames(3).with_debug_device(false);
        let mut demo = TriangleApp::new(&args).unwrap();
        demo.run().unwrap();

        let buffer = demo.renderer().with_handler(|r| r.vertex_buffer()).unwrap();
        let objects = demo.application().device_manager().objects().unwrap();
        let software = demo.backend();
        assert_eq!(
            software.buffer_data(buffer),
            Some(bytemuck::cast_slice::<_, u8>(&triangle()).to_vec())
        );
        assert_eq!(software.bound_vertex_buffer(objects.context, 0), Some(buffer));
        assert_eq!(software.last_clear_color(objects.context), Some(Color::LIGHT_BLUE));
        assert_eq!(software.draw_count(objects.context), 3);
        assert_eq!(demo.stats().presented, 3);
    }

    #[test]
    fn test_default_script_recovers() {
        let args = DefaultAppArgs::default().with_max_frames(20).with_debug_device(false);
        let mut demo = TriangleApp::new(&args).unwrap().with_default_script();
        demo.run().unwrap();

        let stats = demo.stats();
        assert_eq!(stats.recovered, 1);
        assert_eq!(stats.presented, 19);
        assert_eq!(demo.application().bounds(), Rect::from_dimensions(1024, 768));
        assert_eq!(demo.application().device_manager().generation(), 2);

        let software = demo.backend();
        assert_eq!(software.live_count_of(ObjectKind::Buffer), 1);
        assert_eq!(software.live_count_of(ObjectKind::SwapChain), 1);
        assert_eq!(software.double_release_count(), 0);
    }
}
