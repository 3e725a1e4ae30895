//! Headless software backend.
//!
//! This backend draws nothing. It keeps a table of live native objects with
//! their reference counts and parents, and enforces the lifecycle rules of a
//! real graphics API:
//!
//! - a swap chain cannot be resized while any object derived from its buffers
//!   (render-target view, 2D bitmap, outstanding back-buffer reference) is
//!   alive;
//! - a window can only have one live swap chain;
//! - a depth-stencil view must match the multisampling of its texture.
//!
//! It also counts misuse that a real API would not report reliably (double
//! releases, releasing a swap chain in exclusive full-screen), and supports
//! one-shot fault injection so device loss can be exercised in tests.

use std::collections::HashMap;

use parking_lot::Mutex;

use super::{Backend, BackendError, BackendResult, GpuHandle};
use crate::types::{
    BindFlags, BitmapOptions, BitmapProperties, BufferDescriptor, Color,
    DepthStencilViewDescriptor, DepthStencilViewDimension, DeviceCreationFlags, DisplayMode,
    FeatureLevel, Format, FullScreenDescriptor, PresentFlags, Rational, SwapChainDescriptor,
    SwapChainFlags, TextAntialiasMode, TextureDescriptor, Viewport, WindowHandle,
};

/// Kind of a native object tracked by the [`SoftwareBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Device,
    Context,
    Factory2d,
    TextFactory,
    ImagingFactory,
    Device2d,
    Context2d,
    SwapChain,
    Texture,
    RenderTargetView,
    DepthStencilView,
    Bitmap,
    Buffer,
}

#[derive(Debug)]
enum ObjectData {
    None,
    Device {
        level: FeatureLevel,
        flags: DeviceCreationFlags,
        context: Option<GpuHandle>,
    },
    Context {
        viewport: Option<Viewport>,
        render_target: Option<GpuHandle>,
        depth_stencil: Option<GpuHandle>,
        vertex_buffers: HashMap<u32, GpuHandle>,
        draw_calls: u64,
        last_clear: Option<Color>,
    },
    Context2d {
        dpi: (f32, f32),
        target: Option<GpuHandle>,
        text_antialias_mode: TextAntialiasMode,
    },
    SwapChain {
        window: WindowHandle,
        descriptor: SwapChainDescriptor,
        full_screen: bool,
        back_buffers: Vec<GpuHandle>,
    },
    Texture(TextureDescriptor),
    DepthStencilView(DepthStencilViewDescriptor),
    Bitmap(BitmapProperties),
    Buffer {
        descriptor: BufferDescriptor,
        data: Vec<u8>,
    },
}

#[derive(Debug)]
struct Object {
    kind: ObjectKind,
    parent: Option<GpuHandle>,
    /// External references handed out to callers.
    refs: u32,
    /// Lives as long as its parent, even without external references.
    owned_by_parent: bool,
    data: ObjectData,
}

#[derive(Debug, Default)]
struct Counters {
    created: HashMap<ObjectKind, u64>,
    double_releases: u64,
    full_screen_releases: u64,
    resizes: u64,
    presents: u64,
    last_sync_interval: Option<u32>,
    last_device_flags: Option<DeviceCreationFlags>,
}

#[derive(Debug)]
struct State {
    next_handle: u64,
    objects: HashMap<GpuHandle, Object>,
    supported_levels: Vec<FeatureLevel>,
    display_modes: Vec<DisplayMode>,
    pending_present_error: Option<BackendError>,
    pending_create_errors: HashMap<ObjectKind, BackendError>,
    counters: Counters,
}

/// Headless [`Backend`] implementation.
#[derive(Debug)]
pub struct SoftwareBackend {
    state: Mutex<State>,
}

impl SoftwareBackend {
    /// Create a backend that supports every feature level.
    pub fn new() -> Self {
        Self::with_feature_levels(FeatureLevel::ALL.to_vec())
    }

    /// Create a backend that supports only `levels`.
    pub fn with_feature_levels(levels: Vec<FeatureLevel>) -> Self {
        let rate = Rational::new(60, 1);
        let display_modes = [(1280, 720), (1440, 900), (1920, 1080)]
            .into_iter()
            .map(|(width, height)| DisplayMode::new(width, height, rate, Format::B8G8R8A8Unorm))
            .collect();

        Self {
            state: Mutex::new(State {
                next_handle: 1,
                objects: HashMap::new(),
                supported_levels: levels,
                display_modes,
                pending_present_error: None,
                pending_create_errors: HashMap::new(),
                counters: Counters::default(),
            }),
        }
    }

    // ------------------------------------------------------------------
    // Configuration and fault injection
    // ------------------------------------------------------------------

    pub fn set_supported_feature_levels(&self, levels: Vec<FeatureLevel>) {
        self.state.lock().supported_levels = levels;
    }

    /// Replace the display modes reported for the primary output.
    pub fn set_display_modes(&self, modes: Vec<DisplayMode>) {
        self.state.lock().display_modes = modes;
    }

    /// Make the next [`Backend::present`] call fail with `error`.
    pub fn fail_next_present(&self, error: BackendError) {
        self.state.lock().pending_present_error = Some(error);
    }

    /// Make the next creation of an object of `kind` fail with `error`.
    pub fn fail_next_create(&self, kind: ObjectKind, error: BackendError) {
        self.state.lock().pending_create_errors.insert(kind, error);
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    /// Whether `handle` has outstanding external references.
    pub fn is_live(&self, handle: GpuHandle) -> bool {
        self.state
            .lock()
            .objects
            .get(&handle)
            .is_some_and(|object| object.refs > 0)
    }

    pub fn kind_of(&self, handle: GpuHandle) -> Option<ObjectKind> {
        self.state.lock().objects.get(&handle).map(|object| object.kind)
    }

    pub fn parent_of(&self, handle: GpuHandle) -> Option<GpuHandle> {
        self.state.lock().objects.get(&handle).and_then(|object| object.parent)
    }

    /// Number of objects with outstanding external references.
    pub fn live_count(&self) -> usize {
        self.state
            .lock()
            .objects
            .values()
            .filter(|object| object.refs > 0)
            .count()
    }

    pub fn live_count_of(&self, kind: ObjectKind) -> usize {
        self.state
            .lock()
            .objects
            .values()
            .filter(|object| object.kind == kind && object.refs > 0)
            .count()
    }

    /// Number of objects of `kind` created so far.
    pub fn created_count_of(&self, kind: ObjectKind) -> u64 {
        self.state
            .lock()
            .counters
            .created
            .get(&kind)
            .copied()
            .unwrap_or(0)
    }

    /// Number of releases of handles that had no outstanding reference.
    pub fn double_release_count(&self) -> u64 {
        self.state.lock().counters.double_releases
    }

    /// Number of swap chains destroyed while in exclusive full-screen mode.
    pub fn full_screen_release_count(&self) -> u64 {
        self.state.lock().counters.full_screen_releases
    }

    pub fn resize_count(&self) -> u64 {
        self.state.lock().counters.resizes
    }

    pub fn present_count(&self) -> u64 {
        self.state.lock().counters.presents
    }

    pub fn last_sync_interval(&self) -> Option<u32> {
        self.state.lock().counters.last_sync_interval
    }

    /// Flags of the most recently created device.
    pub fn last_device_flags(&self) -> Option<DeviceCreationFlags> {
        self.state.lock().counters.last_device_flags
    }

    pub fn device_feature_level(&self, device: GpuHandle) -> Option<FeatureLevel> {
        match self.state.lock().objects.get(&device).map(|o| &o.data) {
            Some(ObjectData::Device { level, .. }) => Some(*level),
            _ => None,
        }
    }

    pub fn context_2d_dpi(&self, context_2d: GpuHandle) -> Option<(f32, f32)> {
        match self.state.lock().objects.get(&context_2d).map(|o| &o.data) {
            Some(ObjectData::Context2d { dpi, .. }) => Some(*dpi),
            _ => None,
        }
    }

    pub fn context_2d_target(&self, context_2d: GpuHandle) -> Option<GpuHandle> {
        match self.state.lock().objects.get(&context_2d).map(|o| &o.data) {
            Some(ObjectData::Context2d { target, .. }) => *target,
            _ => None,
        }
    }

    pub fn text_antialias_mode(&self, context_2d: GpuHandle) -> Option<TextAntialiasMode> {
        match self.state.lock().objects.get(&context_2d).map(|o| &o.data) {
            Some(ObjectData::Context2d {
                text_antialias_mode,
                ..
            }) => Some(*text_antialias_mode),
            _ => None,
        }
    }

    pub fn viewport(&self, context: GpuHandle) -> Option<Viewport> {
        match self.state.lock().objects.get(&context).map(|o| &o.data) {
            Some(ObjectData::Context { viewport, .. }) => *viewport,
            _ => None,
        }
    }

    /// Render-target and depth-stencil views bound to `context`.
    pub fn render_targets(&self, context: GpuHandle) -> (Option<GpuHandle>, Option<GpuHandle>) {
        match self.state.lock().objects.get(&context).map(|o| &o.data) {
            Some(ObjectData::Context {
                render_target,
                depth_stencil,
                ..
            }) => (*render_target, *depth_stencil),
            _ => (None, None),
        }
    }

    pub fn draw_count(&self, context: GpuHandle) -> u64 {
        match self.state.lock().objects.get(&context).map(|o| &o.data) {
            Some(ObjectData::Context { draw_calls, .. }) => *draw_calls,
            _ => 0,
        }
    }

    pub fn last_clear_color(&self, context: GpuHandle) -> Option<Color> {
        match self.state.lock().objects.get(&context).map(|o| &o.data) {
            Some(ObjectData::Context { last_clear, .. }) => *last_clear,
            _ => None,
        }
    }

    pub fn bound_vertex_buffer(&self, context: GpuHandle, slot: u32) -> Option<GpuHandle> {
        match self.state.lock().objects.get(&context).map(|o| &o.data) {
            Some(ObjectData::Context { vertex_buffers, .. }) => vertex_buffers.get(&slot).copied(),
            _ => None,
        }
    }

    pub fn buffer_data(&self, buffer: GpuHandle) -> Option<Vec<u8>> {
        match self.state.lock().objects.get(&buffer).map(|o| &o.data) {
            Some(ObjectData::Buffer { data, .. }) => Some(data.clone()),
            _ => None,
        }
    }

    pub fn bitmap_properties(&self, bitmap: GpuHandle) -> Option<BitmapProperties> {
        match self.state.lock().objects.get(&bitmap).map(|o| &o.data) {
            Some(ObjectData::Bitmap(properties)) => Some(*properties),
            _ => None,
        }
    }

    pub fn depth_stencil_view_descriptor(
        &self,
        view: GpuHandle,
    ) -> Option<DepthStencilViewDescriptor> {
        match self.state.lock().objects.get(&view).map(|o| &o.data) {
            Some(ObjectData::DepthStencilView(descriptor)) => Some(*descriptor),
            _ => None,
        }
    }
}

impl Default for SoftwareBackend {
    fn default() -> Self {
        Self::new()
    }
}

// ----------------------------------------------------------------------
// Object table
// ----------------------------------------------------------------------

impl State {
    fn allocate(&mut self) -> BackendResult<GpuHandle> {
        let handle = GpuHandle::from_raw(self.next_handle)
            .ok_or_else(|| BackendError::Internal("handle space exhausted".to_string()))?;
        self.next_handle += 1;
        Ok(handle)
    }

    fn insert(
        &mut self,
        kind: ObjectKind,
        parent: Option<GpuHandle>,
        data: ObjectData,
    ) -> BackendResult<GpuHandle> {
        if let Some(error) = self.pending_create_errors.remove(&kind) {
            log::trace!("SoftwareBackend: injected failure creating {kind:?}");
            return Err(error);
        }

        let handle = self.allocate()?;
        self.objects.insert(
            handle,
            Object {
                kind,
                parent,
                refs: 1,
                owned_by_parent: false,
                data,
            },
        );
        *self.counters.created.entry(kind).or_insert(0) += 1;
        log::trace!("SoftwareBackend: created {kind:?} {handle}");
        Ok(handle)
    }

    /// Look up an object that may be used by the caller.
    fn get(&self, handle: GpuHandle, kind: ObjectKind) -> BackendResult<&Object> {
        match self.objects.get(&handle) {
            Some(object) if object.kind == kind && (object.refs > 0 || object.owned_by_parent) => {
                Ok(object)
            }
            _ => Err(BackendError::InvalidHandle(handle)),
        }
    }

    fn get_mut(&mut self, handle: GpuHandle, kind: ObjectKind) -> BackendResult<&mut Object> {
        match self.objects.get_mut(&handle) {
            Some(object) if object.kind == kind && (object.refs > 0 || object.owned_by_parent) => {
                Ok(object)
            }
            _ => Err(BackendError::InvalidHandle(handle)),
        }
    }

    fn is_descendant_of(&self, handle: GpuHandle, ancestor: GpuHandle) -> bool {
        let mut current = self.objects.get(&handle).and_then(|object| object.parent);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.objects.get(&parent).and_then(|object| object.parent);
        }
        false
    }

    /// Externally referenced objects derived from `swap_chain`.
    fn derived_references(&self, swap_chain: GpuHandle) -> Vec<(GpuHandle, ObjectKind)> {
        self.objects
            .iter()
            .filter(|(handle, object)| object.refs > 0 && self.is_descendant_of(**handle, swap_chain))
            .map(|(handle, object)| (*handle, object.kind))
            .collect()
    }

    fn release(&mut self, handle: GpuHandle) {
        let Some(object) = self.objects.get_mut(&handle) else {
            self.counters.double_releases += 1;
            log::warn!("SoftwareBackend: release of unknown handle {handle}");
            return;
        };
        if object.refs == 0 {
            self.counters.double_releases += 1;
            log::warn!(
                "SoftwareBackend: release of {:?} {handle} without outstanding reference",
                object.kind
            );
            return;
        }

        object.refs -= 1;
        log::trace!("SoftwareBackend: released {:?} {handle} ({} left)", object.kind, object.refs);
        if object.refs > 0 || object.owned_by_parent {
            return;
        }

        if let Some(object) = self.objects.remove(&handle) {
            self.destroy(handle, object);
        }
    }

    fn destroy(&mut self, handle: GpuHandle, object: Object) {
        match object.data {
            ObjectData::SwapChain {
                full_screen,
                back_buffers,
                ..
            } => {
                if full_screen {
                    self.counters.full_screen_releases += 1;
                    log::warn!("SoftwareBackend: swap chain {handle} destroyed in full-screen mode");
                }
                for buffer in back_buffers {
                    self.orphan(buffer);
                }
            }
            ObjectData::Device {
                context: Some(context),
                ..
            } => self.orphan(context),
            _ => {}
        }
    }

    /// Detach a parent-owned object from its dying parent.
    fn orphan(&mut self, handle: GpuHandle) {
        let remove = match self.objects.get_mut(&handle) {
            Some(object) => {
                object.owned_by_parent = false;
                object.refs == 0
            }
            None => false,
        };
        if remove {
            self.objects.remove(&handle);
        }
    }

    /// Hand out a new external reference to a parent-owned object.
    fn add_ref(&mut self, handle: GpuHandle) -> BackendResult<GpuHandle> {
        let object = self
            .objects
            .get_mut(&handle)
            .ok_or(BackendError::InvalidHandle(handle))?;
        object.refs += 1;
        Ok(handle)
    }

    fn insert_owned(
        &mut self,
        kind: ObjectKind,
        parent: GpuHandle,
        data: ObjectData,
    ) -> BackendResult<GpuHandle> {
        let handle = self.allocate()?;
        self.objects.insert(
            handle,
            Object {
                kind,
                parent: Some(parent),
                refs: 0,
                owned_by_parent: true,
                data,
            },
        );
        *self.counters.created.entry(kind).or_insert(0) += 1;
        Ok(handle)
    }

    fn texture(&self, handle: GpuHandle) -> BackendResult<&TextureDescriptor> {
        match &self.get(handle, ObjectKind::Texture)?.data {
            ObjectData::Texture(descriptor) => Ok(descriptor),
            _ => Err(BackendError::InvalidHandle(handle)),
        }
    }

    fn context_mut(&mut self, handle: GpuHandle) -> BackendResult<&mut ObjectData> {
        Ok(&mut self.get_mut(handle, ObjectKind::Context)?.data)
    }

    fn context_2d_mut(&mut self, handle: GpuHandle) -> BackendResult<&mut ObjectData> {
        Ok(&mut self.get_mut(handle, ObjectKind::Context2d)?.data)
    }
}

fn back_buffer_descriptor(descriptor: &SwapChainDescriptor) -> TextureDescriptor {
    TextureDescriptor::new_2d(
        descriptor.width,
        descriptor.height,
        descriptor.format,
        descriptor.usage | BindFlags::RENDER_TARGET,
    )
    .with_sample(descriptor.sample)
    .with_label("back buffer")
}

impl Backend for SoftwareBackend {
    fn name(&self) -> &'static str {
        "Software"
    }

    fn supports_feature_level(&self, level: FeatureLevel) -> bool {
        self.state.lock().supported_levels.contains(&level)
    }

    fn create_device(
        &self,
        level: FeatureLevel,
        flags: DeviceCreationFlags,
    ) -> BackendResult<GpuHandle> {
        let mut state = self.state.lock();
        if !state.supported_levels.contains(&level) {
            return Err(BackendError::Unsupported(format!("feature level {level}")));
        }
        state.counters.last_device_flags = Some(flags);
        let device = state.insert(
            ObjectKind::Device,
            None,
            ObjectData::Device {
                level,
                flags,
                context: None,
            },
        )?;
        let context = state.insert_owned(
            ObjectKind::Context,
            device,
            ObjectData::Context {
                viewport: None,
                render_target: None,
                depth_stencil: None,
                vertex_buffers: HashMap::new(),
                draw_calls: 0,
                last_clear: None,
            },
        )?;
        if let Some(Object {
            data: ObjectData::Device { context: slot, .. },
            ..
        }) = state.objects.get_mut(&device)
        {
            *slot = Some(context);
        }
        log::debug!("SoftwareBackend: device {device} at feature level {level} ({flags:?})");
        Ok(device)
    }

    fn immediate_context(&self, device: GpuHandle) -> BackendResult<GpuHandle> {
        let mut state = self.state.lock();
        if let Some(error) = state.pending_create_errors.remove(&ObjectKind::Context) {
            return Err(error);
        }
        let context = match &state.get(device, ObjectKind::Device)?.data {
            ObjectData::Device {
                context: Some(context),
                ..
            } => *context,
            _ => return Err(BackendError::Internal("device without context".to_string())),
        };
        state.add_ref(context)
    }

    fn create_factory_2d(&self, debug: bool) -> BackendResult<GpuHandle> {
        log::trace!("SoftwareBackend: 2D factory (debug: {debug})");
        self.state
            .lock()
            .insert(ObjectKind::Factory2d, None, ObjectData::None)
    }

    fn create_text_factory(&self) -> BackendResult<GpuHandle> {
        self.state
            .lock()
            .insert(ObjectKind::TextFactory, None, ObjectData::None)
    }

    fn create_imaging_factory(&self) -> BackendResult<GpuHandle> {
        self.state
            .lock()
            .insert(ObjectKind::ImagingFactory, None, ObjectData::None)
    }

    fn create_device_2d(
        &self,
        factory_2d: GpuHandle,
        device: GpuHandle,
    ) -> BackendResult<GpuHandle> {
        let mut state = self.state.lock();
        state.get(factory_2d, ObjectKind::Factory2d)?;
        state.get(device, ObjectKind::Device)?;
        state.insert(ObjectKind::Device2d, Some(device), ObjectData::None)
    }

    fn create_context_2d(&self, device_2d: GpuHandle) -> BackendResult<GpuHandle> {
        let mut state = self.state.lock();
        state.get(device_2d, ObjectKind::Device2d)?;
        state.insert(
            ObjectKind::Context2d,
            Some(device_2d),
            ObjectData::Context2d {
                dpi: (96.0, 96.0),
                target: None,
                text_antialias_mode: TextAntialiasMode::Default,
            },
        )
    }

    fn set_context_2d_dpi(
        &self,
        context_2d: GpuHandle,
        dpi_x: f32,
        dpi_y: f32,
    ) -> BackendResult<()> {
        if dpi_x <= 0.0 || dpi_y <= 0.0 {
            return Err(BackendError::InvalidParameter(format!(
                "dpi must be positive, got {dpi_x}x{dpi_y}"
            )));
        }
        if let ObjectData::Context2d { dpi, .. } = self.state.lock().context_2d_mut(context_2d)? {
            *dpi = (dpi_x, dpi_y);
        }
        Ok(())
    }

    fn set_context_2d_target(
        &self,
        context_2d: GpuHandle,
        target: Option<GpuHandle>,
    ) -> BackendResult<()> {
        let mut state = self.state.lock();
        if let Some(bitmap) = target {
            match &state.get(bitmap, ObjectKind::Bitmap)?.data {
                ObjectData::Bitmap(properties)
                    if properties.options.contains(BitmapOptions::TARGET) => {}
                _ => {
                    return Err(BackendError::InvalidParameter(
                        "2D target bitmap lacks the TARGET option".to_string(),
                    ))
                }
            }
        }
        if let ObjectData::Context2d { target: slot, .. } = state.context_2d_mut(context_2d)? {
            *slot = target;
        }
        Ok(())
    }

    fn set_text_antialias_mode(
        &self,
        context_2d: GpuHandle,
        mode: TextAntialiasMode,
    ) -> BackendResult<()> {
        if let ObjectData::Context2d {
            text_antialias_mode,
            ..
        } = self.state.lock().context_2d_mut(context_2d)?
        {
            *text_antialias_mode = mode;
        }
        Ok(())
    }

    fn create_swap_chain(
        &self,
        device: GpuHandle,
        window: WindowHandle,
        descriptor: &SwapChainDescriptor,
        full_screen: &FullScreenDescriptor,
    ) -> BackendResult<GpuHandle> {
        let mut state = self.state.lock();
        state.get(device, ObjectKind::Device)?;
        if descriptor.width == 0 || descriptor.height == 0 {
            return Err(BackendError::InvalidParameter(format!(
                "swap chain size {}x{}",
                descriptor.width, descriptor.height
            )));
        }
        if descriptor.buffer_count == 0 {
            return Err(BackendError::InvalidParameter(
                "swap chain needs at least one buffer".to_string(),
            ));
        }
        let window_taken = state.objects.values().any(|object| {
            matches!(object.data, ObjectData::SwapChain { window: w, .. } if w == window)
                && object.refs > 0
        });
        if window_taken {
            return Err(BackendError::InvalidParameter(format!(
                "window {} already has a swap chain",
                window.raw()
            )));
        }

        let swap_chain = state.insert(
            ObjectKind::SwapChain,
            Some(device),
            ObjectData::SwapChain {
                window,
                descriptor: *descriptor,
                full_screen: !full_screen.windowed,
                back_buffers: Vec::new(),
            },
        )?;
        let mut back_buffers = Vec::with_capacity(descriptor.buffer_count as usize);
        for _ in 0..descriptor.buffer_count {
            back_buffers.push(state.insert_owned(
                ObjectKind::Texture,
                swap_chain,
                ObjectData::Texture(back_buffer_descriptor(descriptor)),
            )?);
        }
        if let Some(Object {
            data: ObjectData::SwapChain {
                back_buffers: slot, ..
            },
            ..
        }) = state.objects.get_mut(&swap_chain)
        {
            *slot = back_buffers;
        }
        log::debug!(
            "SoftwareBackend: swap chain {swap_chain} {}x{} for window {}",
            descriptor.width,
            descriptor.height,
            window.raw()
        );
        Ok(swap_chain)
    }

    fn swap_chain_descriptor(&self, swap_chain: GpuHandle) -> BackendResult<SwapChainDescriptor> {
        let state = self.state.lock();
        match &state.get(swap_chain, ObjectKind::SwapChain)?.data {
            ObjectData::SwapChain { descriptor, .. } => Ok(*descriptor),
            _ => Err(BackendError::InvalidHandle(swap_chain)),
        }
    }

    fn resize_swap_chain(
        &self,
        swap_chain: GpuHandle,
        buffer_count: u32,
        width: u32,
        height: u32,
        format: Format,
        flags: SwapChainFlags,
    ) -> BackendResult<()> {
        let mut state = self.state.lock();
        state.get(swap_chain, ObjectKind::SwapChain)?;

        let outstanding = state.derived_references(swap_chain);
        if !outstanding.is_empty() {
            return Err(BackendError::InvalidParameter(format!(
                "cannot resize swap chain {swap_chain} with {} outstanding buffer reference(s): {:?}",
                outstanding.len(),
                outstanding
            )));
        }
        if width == 0 || height == 0 || buffer_count == 0 {
            return Err(BackendError::InvalidParameter(format!(
                "resize to {buffer_count} buffer(s) of {width}x{height}"
            )));
        }

        let (descriptor, old_buffers) = match &mut state.get_mut(swap_chain, ObjectKind::SwapChain)?.data {
            ObjectData::SwapChain {
                descriptor,
                back_buffers,
                ..
            } => {
                descriptor.width = width;
                descriptor.height = height;
                descriptor.buffer_count = buffer_count;
                if format != Format::Unknown {
                    descriptor.format = format;
                }
                descriptor.flags = flags;
                (*descriptor, std::mem::take(back_buffers))
            }
            _ => return Err(BackendError::InvalidHandle(swap_chain)),
        };
        for buffer in old_buffers {
            state.orphan(buffer);
        }
        let mut back_buffers = Vec::with_capacity(buffer_count as usize);
        for _ in 0..buffer_count {
            back_buffers.push(state.insert_owned(
                ObjectKind::Texture,
                swap_chain,
                ObjectData::Texture(back_buffer_descriptor(&descriptor)),
            )?);
        }
        if let ObjectData::SwapChain {
            back_buffers: slot, ..
        } = &mut state.get_mut(swap_chain, ObjectKind::SwapChain)?.data
        {
            *slot = back_buffers;
        }

        state.counters.resizes += 1;
        log::debug!("SoftwareBackend: resized swap chain {swap_chain} to {width}x{height}");
        Ok(())
    }

    fn display_modes(
        &self,
        swap_chain: GpuHandle,
        format: Format,
    ) -> BackendResult<Vec<DisplayMode>> {
        let state = self.state.lock();
        state.get(swap_chain, ObjectKind::SwapChain)?;
        Ok(state
            .display_modes
            .iter()
            .filter(|mode| mode.format == format)
            .copied()
            .collect())
    }

    fn back_buffer(&self, swap_chain: GpuHandle, index: u32) -> BackendResult<GpuHandle> {
        let mut state = self.state.lock();
        let buffer = match &state.get(swap_chain, ObjectKind::SwapChain)?.data {
            ObjectData::SwapChain { back_buffers, .. } => back_buffers.get(index as usize).copied(),
            _ => None,
        };
        let buffer = buffer.ok_or_else(|| {
            BackendError::InvalidParameter(format!("swap chain has no back buffer {index}"))
        })?;
        state.add_ref(buffer)
    }

    fn set_full_screen(&self, swap_chain: GpuHandle, full_screen: bool) -> BackendResult<()> {
        let mut state = self.state.lock();
        if let ObjectData::SwapChain {
            full_screen: slot, ..
        } = &mut state.get_mut(swap_chain, ObjectKind::SwapChain)?.data
        {
            *slot = full_screen;
        }
        log::trace!("SoftwareBackend: swap chain {swap_chain} full-screen = {full_screen}");
        Ok(())
    }

    fn is_full_screen(&self, swap_chain: GpuHandle) -> BackendResult<bool> {
        let state = self.state.lock();
        match &state.get(swap_chain, ObjectKind::SwapChain)?.data {
            ObjectData::SwapChain { full_screen, .. } => Ok(*full_screen),
            _ => Err(BackendError::InvalidHandle(swap_chain)),
        }
    }

    fn present(
        &self,
        swap_chain: GpuHandle,
        sync_interval: u32,
        flags: PresentFlags,
    ) -> BackendResult<()> {
        let mut state = self.state.lock();
        state.get(swap_chain, ObjectKind::SwapChain)?;
        if sync_interval > 4 {
            return Err(BackendError::InvalidParameter(format!(
                "sync interval {sync_interval}"
            )));
        }
        if let Some(error) = state.pending_present_error.take() {
            log::trace!("SoftwareBackend: injected present failure: {error}");
            return Err(error);
        }
        if flags.contains(PresentFlags::TEST) {
            return Ok(());
        }
        state.counters.presents += 1;
        state.counters.last_sync_interval = Some(sync_interval);
        Ok(())
    }

    fn texture_descriptor(&self, texture: GpuHandle) -> BackendResult<TextureDescriptor> {
        self.state.lock().texture(texture).cloned()
    }

    fn create_texture(
        &self,
        device: GpuHandle,
        descriptor: &TextureDescriptor,
    ) -> BackendResult<GpuHandle> {
        let mut state = self.state.lock();
        state.get(device, ObjectKind::Device)?;
        if descriptor.width == 0 || descriptor.height == 0 {
            return Err(BackendError::InvalidParameter(format!(
                "texture {:?} has size {}x{}",
                descriptor.label, descriptor.width, descriptor.height
            )));
        }
        if descriptor.bind.contains(BindFlags::DEPTH_STENCIL) && !descriptor.format.is_depth() {
            return Err(BackendError::InvalidParameter(format!(
                "depth-stencil texture with color format {:?}",
                descriptor.format
            )));
        }
        state.insert(
            ObjectKind::Texture,
            Some(device),
            ObjectData::Texture(descriptor.clone()),
        )
    }

    fn create_render_target_view(
        &self,
        device: GpuHandle,
        resource: GpuHandle,
    ) -> BackendResult<GpuHandle> {
        let mut state = self.state.lock();
        state.get(device, ObjectKind::Device)?;
        if !state.texture(resource)?.bind.contains(BindFlags::RENDER_TARGET) {
            return Err(BackendError::InvalidParameter(format!(
                "texture {resource} is not a render target"
            )));
        }
        state.insert(ObjectKind::RenderTargetView, Some(resource), ObjectData::None)
    }

    fn create_depth_stencil_view(
        &self,
        device: GpuHandle,
        texture: GpuHandle,
        descriptor: &DepthStencilViewDescriptor,
    ) -> BackendResult<GpuHandle> {
        let mut state = self.state.lock();
        state.get(device, ObjectKind::Device)?;
        let texture_descriptor = state.texture(texture)?;
        if !texture_descriptor.bind.contains(BindFlags::DEPTH_STENCIL) {
            return Err(BackendError::InvalidParameter(format!(
                "texture {texture} is not a depth-stencil target"
            )));
        }
        let expected = DepthStencilViewDimension::for_sample(&texture_descriptor.sample);
        if descriptor.dimension != expected {
            return Err(BackendError::InvalidParameter(format!(
                "depth-stencil view dimension {:?} does not match texture ({expected:?})",
                descriptor.dimension
            )));
        }
        let mut descriptor = *descriptor;
        if descriptor.format == Format::Unknown {
            descriptor.format = texture_descriptor.format;
        }
        state.insert(
            ObjectKind::DepthStencilView,
            Some(texture),
            ObjectData::DepthStencilView(descriptor),
        )
    }

    fn create_bitmap_target(
        &self,
        context_2d: GpuHandle,
        surface: GpuHandle,
        properties: &BitmapProperties,
    ) -> BackendResult<GpuHandle> {
        let mut state = self.state.lock();
        state.get(context_2d, ObjectKind::Context2d)?;
        let surface_format = state.texture(surface)?.format;
        if properties.format != Format::Unknown && properties.format != surface_format {
            return Err(BackendError::InvalidParameter(format!(
                "bitmap format {:?} does not match surface format {surface_format:?}",
                properties.format
            )));
        }
        state.insert(
            ObjectKind::Bitmap,
            Some(surface),
            ObjectData::Bitmap(*properties),
        )
    }

    fn create_buffer(
        &self,
        device: GpuHandle,
        descriptor: &BufferDescriptor,
        data: Option<&[u8]>,
    ) -> BackendResult<GpuHandle> {
        let mut state = self.state.lock();
        state.get(device, ObjectKind::Device)?;
        let size = usize::try_from(descriptor.size)
            .map_err(|_| BackendError::InvalidParameter(format!("buffer size {}", descriptor.size)))?;
        if size == 0 {
            return Err(BackendError::InvalidParameter(
                "buffer size must be non-zero".to_string(),
            ));
        }
        let mut contents = vec![0u8; size];
        if let Some(data) = data {
            if data.len() > size {
                return Err(BackendError::InvalidParameter(format!(
                    "{} bytes of initial data for a {size} byte buffer",
                    data.len()
                )));
            }
            contents[..data.len()].copy_from_slice(data);
        }
        state.insert(
            ObjectKind::Buffer,
            Some(device),
            ObjectData::Buffer {
                descriptor: descriptor.clone(),
                data: contents,
            },
        )
    }

    fn set_viewport(&self, context: GpuHandle, viewport: &Viewport) -> BackendResult<()> {
        if let ObjectData::Context { viewport: slot, .. } = self.state.lock().context_mut(context)? {
            *slot = Some(*viewport);
        }
        Ok(())
    }

    fn set_render_targets(
        &self,
        context: GpuHandle,
        render_target: Option<GpuHandle>,
        depth_stencil: Option<GpuHandle>,
    ) -> BackendResult<()> {
        let mut state = self.state.lock();
        if let Some(view) = render_target {
            state.get(view, ObjectKind::RenderTargetView)?;
        }
        if let Some(view) = depth_stencil {
            state.get(view, ObjectKind::DepthStencilView)?;
        }
        if let ObjectData::Context {
            render_target: rt,
            depth_stencil: ds,
            ..
        } = state.context_mut(context)?
        {
            *rt = render_target;
            *ds = depth_stencil;
        }
        Ok(())
    }

    fn set_vertex_buffer(
        &self,
        context: GpuHandle,
        slot: u32,
        buffer: GpuHandle,
        stride: u32,
        offset: u32,
    ) -> BackendResult<()> {
        let mut state = self.state.lock();
        match &state.get(buffer, ObjectKind::Buffer)?.data {
            ObjectData::Buffer { descriptor, .. }
                if descriptor.bind.contains(BindFlags::VERTEX_BUFFER) => {}
            _ => {
                return Err(BackendError::InvalidParameter(format!(
                    "buffer {buffer} is not a vertex buffer"
                )))
            }
        }
        log::trace!("SoftwareBackend: vertex buffer {buffer} at slot {slot} (stride {stride}, offset {offset})");
        if let ObjectData::Context { vertex_buffers, .. } = state.context_mut(context)? {
            vertex_buffers.insert(slot, buffer);
        }
        Ok(())
    }

    fn clear_render_target(
        &self,
        context: GpuHandle,
        view: GpuHandle,
        color: Color,
    ) -> BackendResult<()> {
        let mut state = self.state.lock();
        state.get(view, ObjectKind::RenderTargetView)?;
        if let ObjectData::Context { last_clear, .. } = state.context_mut(context)? {
            *last_clear = Some(color);
        }
        Ok(())
    }

    fn clear_depth_stencil(
        &self,
        context: GpuHandle,
        view: GpuHandle,
        depth: f32,
        stencil: u8,
    ) -> BackendResult<()> {
        let mut state = self.state.lock();
        state.get(view, ObjectKind::DepthStencilView)?;
        state.context_mut(context)?;
        log::trace!("SoftwareBackend: clear depth {depth} stencil {stencil}");
        Ok(())
    }

    fn draw(&self, context: GpuHandle, vertex_count: u32, start_vertex: u32) -> BackendResult<()> {
        let mut state = self.state.lock();
        if let ObjectData::Context { draw_calls, .. } = state.context_mut(context)? {
            *draw_calls += 1;
        }
        log::trace!("SoftwareBackend: draw {vertex_count} vertices from {start_vertex}");
        Ok(())
    }

    fn release(&self, handle: GpuHandle) {
        self.state.lock().release(handle);
    }
}

static_assertions::assert_impl_all!(SoftwareBackend: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SampleDescription;

    fn device(backend: &SoftwareBackend) -> GpuHandle {
        backend
            .create_device(FeatureLevel::Level11_1, DeviceCreationFlags::BGRA_SUPPORT)
            .unwrap()
    }

    fn swap_chain(backend: &SoftwareBackend, device: GpuHandle) -> GpuHandle {
        backend
            .create_swap_chain(
                device,
                WindowHandle::new(1),
                &SwapChainDescriptor::new(800, 600),
                &FullScreenDescriptor::default(),
            )
            .unwrap()
    }

    #[test]
    fn test_unsupported_feature_level() {
        let backend = SoftwareBackend::with_feature_levels(vec![FeatureLevel::Level10_0]);
        assert!(!backend.supports_feature_level(FeatureLevel::Level11_0));
        let err = backend
            .create_device(FeatureLevel::Level11_0, DeviceCreationFlags::empty())
            .unwrap_err();
        assert!(matches!(err, BackendError::Unsupported(_)));
    }

    #[test]
    fn test_release_counts_double_release() {
        let backend = SoftwareBackend::new();
        let factory = backend.create_text_factory().unwrap();
        backend.release(factory);
        backend.release(factory);
        assert_eq!(backend.double_release_count(), 1);
        assert_eq!(backend.live_count(), 0);
    }

    #[test]
    fn test_immediate_context_is_reference_counted() {
        let backend = SoftwareBackend::new();
        let device = device(&backend);
        let first = backend.immediate_context(device).unwrap();
        let second = backend.immediate_context(device).unwrap();
        assert_eq!(first, second);

        backend.release(first);
        assert!(backend.is_live(second));
        backend.release(second);
        assert!(!backend.is_live(second));
        assert_eq!(backend.double_release_count(), 0);
    }

    #[test]
    fn test_resize_refused_while_views_alive() {
        let backend = SoftwareBackend::new();
        let device = device(&backend);
        let swap_chain = swap_chain(&backend, device);
        let back_buffer = backend.back_buffer(swap_chain, 0).unwrap();
        let view = backend.create_render_target_view(device, back_buffer).unwrap();

        let resize = |backend: &SoftwareBackend| {
            backend.resize_swap_chain(
                swap_chain,
                1,
                1024,
                768,
                Format::B8G8R8A8Unorm,
                SwapChainFlags::ALLOW_MODE_SWITCH,
            )
        };
        assert!(matches!(
            resize(&backend),
            Err(BackendError::InvalidParameter(_))
        ));

        backend.release(view);
        assert!(resize(&backend).is_err(), "back buffer reference still outstanding");

        backend.release(back_buffer);
        resize(&backend).unwrap();

        let descriptor = backend.swap_chain_descriptor(swap_chain).unwrap();
        assert_eq!((descriptor.width, descriptor.height), (1024, 768));
        let back_buffer = backend.back_buffer(swap_chain, 0).unwrap();
        let texture = backend.texture_descriptor(back_buffer).unwrap();
        assert_eq!((texture.width, texture.height), (1024, 768));
        assert_eq!(backend.resize_count(), 1);
    }

    #[test]
    fn test_one_swap_chain_per_window() {
        let backend = SoftwareBackend::new();
        let device = device(&backend);
        let first = swap_chain(&backend, device);

        let err = backend
            .create_swap_chain(
                device,
                WindowHandle::new(1),
                &SwapChainDescriptor::new(800, 600),
                &FullScreenDescriptor::default(),
            )
            .unwrap_err();
        assert!(matches!(err, BackendError::InvalidParameter(_)));

        backend.release(first);
        swap_chain(&backend, device);
    }

    #[test]
    fn test_full_screen_release_is_counted() {
        let backend = SoftwareBackend::new();
        let device = device(&backend);
        let swap_chain = swap_chain(&backend, device);

        backend.set_full_screen(swap_chain, true).unwrap();
        assert!(backend.is_full_screen(swap_chain).unwrap());
        backend.release(swap_chain);
        assert_eq!(backend.full_screen_release_count(), 1);
    }

    #[test]
    fn test_depth_view_dimension_must_match_sampling() {
        let backend = SoftwareBackend::new();
        let device = device(&backend);
        let texture = backend
            .create_texture(
                device,
                &TextureDescriptor::new_2d(
                    64,
                    64,
                    Format::D32FloatS8X24Uint,
                    BindFlags::DEPTH_STENCIL,
                )
                .with_sample(SampleDescription::new(4, 0)),
            )
            .unwrap();

        let flat = DepthStencilViewDescriptor::new(DepthStencilViewDimension::Texture2D);
        assert!(backend.create_depth_stencil_view(device, texture, &flat).is_err());

        let msaa =
            DepthStencilViewDescriptor::new(DepthStencilViewDimension::Texture2DMultisampled);
        let view = backend.create_depth_stencil_view(device, texture, &msaa).unwrap();
        assert_eq!(
            backend.depth_stencil_view_descriptor(view).map(|d| d.format),
            Some(Format::D32FloatS8X24Uint)
        );
    }

    #[test]
    fn test_injected_present_failure_is_one_shot() {
        let backend = SoftwareBackend::new();
        let device = device(&backend);
        let swap_chain = swap_chain(&backend, device);

        backend.fail_next_present(BackendError::DeviceRemoved);
        assert_eq!(
            backend.present(swap_chain, 1, PresentFlags::empty()),
            Err(BackendError::DeviceRemoved)
        );
        backend.present(swap_chain, 1, PresentFlags::empty()).unwrap();
        assert_eq!(backend.present_count(), 1);
        assert_eq!(backend.last_sync_interval(), Some(1));
    }

    #[test]
    fn test_buffer_initial_data() {
        let backend = SoftwareBackend::new();
        let device = device(&backend);
        let buffer = backend
            .create_buffer(device, &BufferDescriptor::vertices(2, 4), Some(&[1u8, 2, 3][..]))
            .unwrap();
        assert_eq!(backend.buffer_data(buffer), Some(vec![1, 2, 3, 0, 0, 0, 0, 0]));

        let too_much = backend.create_buffer(device, &BufferDescriptor::vertices(1, 2), Some(&[0u8; 3][..]));
        assert!(too_much.is_err());
    }
}
