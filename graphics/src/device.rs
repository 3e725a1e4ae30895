//! Device manager.
//!
//! The [`DeviceManager`] owns the device-level native objects: the device, its
//! immediate command context, the 2D/text/imaging factories and the 2D device
//! and context. They are created together by [`DeviceManager::initialize`] and
//! are never patched individually: every initialization releases the whole set
//! and creates a fresh one.
//!
//! # Notifications
//!
//! - [`DeviceManager::on_initialize`] fires once per successful initialization,
//!   after the new objects exist and before the DPI is applied.
//! - [`DeviceManager::on_dpi_changed`] fires when the DPI value changes.
//!
//! Both dispatch synchronously on the calling thread, in subscription order,
//! with no internal lock held.

use std::fmt;
use std::sync::Arc;

use lumen_core::{Component, DisposalRegistry, Event};
use parking_lot::Mutex;

use crate::backend::{Backend, BackendError, GpuHandle, TrackGpu};
use crate::error::GraphicsError;
use crate::types::{DeviceCreationFlags, FeatureLevel, DEFAULT_FEATURE_LEVELS};

/// Resolution at which one device-independent pixel is one physical pixel.
pub const DEFAULT_DPI: f32 = 96.0;

/// Lifecycle phase of a [`DeviceManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DevicePhase {
    /// No device objects exist.
    Uninitialized,
    /// Device objects are being (re)created.
    Initializing,
    /// Device objects exist and can be used.
    Ready,
}

/// Options for device creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceOptions {
    /// Feature levels to try, most preferred first.
    pub feature_levels: Vec<FeatureLevel>,
    /// Create the device with the debug layer enabled.
    pub debug: bool,
}

impl Default for DeviceOptions {
    fn default() -> Self {
        Self {
            feature_levels: DEFAULT_FEATURE_LEVELS.to_vec(),
            debug: cfg!(debug_assertions),
        }
    }
}

impl DeviceOptions {
    pub fn with_feature_levels(mut self, levels: impl Into<Vec<FeatureLevel>>) -> Self {
        self.feature_levels = levels.into();
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Flags the device is created with.
    pub fn creation_flags(&self) -> DeviceCreationFlags {
        let mut flags = DeviceCreationFlags::BGRA_SUPPORT;
        if self.debug {
            flags |= DeviceCreationFlags::DEBUG;
        }
        flags
    }
}

/// Handles of the device-level objects of one initialization.
///
/// The handles stay owned by the [`DeviceManager`]; they are invalid once the
/// manager is reinitialized or disposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceObjects {
    pub feature_level: FeatureLevel,
    pub device: GpuHandle,
    /// Immediate command context of `device`.
    pub context: GpuHandle,
    pub factory_2d: GpuHandle,
    pub text_factory: GpuHandle,
    pub imaging_factory: GpuHandle,
    pub device_2d: GpuHandle,
    pub context_2d: GpuHandle,
}

struct DeviceState {
    phase: DevicePhase,
    registry: DisposalRegistry<GpuHandle>,
    objects: Option<DeviceObjects>,
    dpi: f32,
    generation: u64,
}

/// Owner of the device-level native objects.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use lumen_graphics::{Backend, DeviceManager, DevicePhase, SoftwareBackend};
///
/// let backend: Arc<dyn Backend> = Arc::new(SoftwareBackend::new());
/// let manager = DeviceManager::new(backend);
///
/// manager.initialize(96.0)?;
/// assert_eq!(manager.phase(), DevicePhase::Ready);
/// assert_eq!(manager.dpi(), 96.0);
/// # Ok::<(), lumen_graphics::GraphicsError>(())
/// ```
pub struct DeviceManager {
    component: Component,
    backend: Arc<dyn Backend>,
    options: DeviceOptions,
    state: Mutex<DeviceState>,
    on_initialize: Event<DeviceManager, GraphicsError>,
    on_dpi_changed: Event<DeviceManager, GraphicsError>,
}

impl DeviceManager {
    /// Create an uninitialized manager with default options.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self::with_options(backend, DeviceOptions::default())
    }

    /// Create an uninitialized manager.
    pub fn with_options(backend: Arc<dyn Backend>, options: DeviceOptions) -> Self {
        Self {
            component: Component::with_fixed_name("device manager"),
            backend,
            options,
            state: Mutex::new(DeviceState {
                phase: DevicePhase::Uninitialized,
                registry: DisposalRegistry::new(),
                objects: None,
                dpi: 0.0,
                generation: 0,
            }),
            on_initialize: Event::new("device initialized"),
            on_dpi_changed: Event::new("dpi changed"),
        }
    }

    pub fn component(&self) -> &Component {
        &self.component
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn options(&self) -> &DeviceOptions {
        &self.options
    }

    /// Subscribers are notified after every successful initialization.
    pub fn on_initialize(&self) -> &Event<DeviceManager, GraphicsError> {
        &self.on_initialize
    }

    /// Subscribers are notified when the DPI value changes.
    pub fn on_dpi_changed(&self) -> &Event<DeviceManager, GraphicsError> {
        &self.on_dpi_changed
    }

    /// Release every device object and create a fresh set.
    ///
    /// After the objects exist, "device ready" subscribers are notified, then
    /// `dpi` is applied to the 2D context (notifying "DPI changed" subscribers
    /// if the value differs from the previous one).
    ///
    /// # Errors
    ///
    /// - [`GraphicsError::DeviceCreation`] if no preferred feature level is
    ///   supported.
    /// - [`GraphicsError::Backend`] if creating any object fails.
    ///
    /// On either error every object created so far is released and the
    /// manager is [`DevicePhase::Uninitialized`]. Errors returned by
    /// subscribers are propagated after the objects were created.
    pub fn initialize(&self, dpi: f32) -> Result<(), GraphicsError> {
        if dpi.is_nan() || dpi <= 0.0 {
            return Err(BackendError::InvalidParameter(format!("dpi {dpi}")).into());
        }

        {
            let mut state = self.state.lock();
            let released = state.registry.release_all();
            if released > 0 {
                log::debug!("{}: released {released} device object(s)", self.component);
            }
            state.objects = None;
            state.phase = DevicePhase::Initializing;

            match self.create_objects(&mut state.registry) {
                Ok(objects) => {
                    state.objects = Some(objects);
                    state.phase = DevicePhase::Ready;
                    state.generation += 1;
                    log::info!(
                        "{}: device ready at feature level {} on {} backend (generation {})",
                        self.component,
                        objects.feature_level,
                        self.backend.name(),
                        state.generation
                    );
                }
                Err(err) => {
                    state.registry.release_all();
                    state.phase = DevicePhase::Uninitialized;
                    log::error!("{}: device creation failed: {err}", self.component);
                    return Err(err);
                }
            }
        }

        self.on_initialize.emit(self)?;
        self.apply_dpi(dpi, true)
    }

    /// [`initialize`](Self::initialize) at [`DEFAULT_DPI`].
    pub fn initialize_default(&self) -> Result<(), GraphicsError> {
        self.initialize(DEFAULT_DPI)
    }

    /// Change the DPI.
    ///
    /// Assigning the current value is a no-op. Otherwise the 2D context (if
    /// any) is updated and "DPI changed" subscribers are notified.
    pub fn set_dpi(&self, dpi: f32) -> Result<(), GraphicsError> {
        if dpi.is_nan() || dpi <= 0.0 {
            return Err(BackendError::InvalidParameter(format!("dpi {dpi}")).into());
        }
        self.apply_dpi(dpi, false)
    }

    /// Current DPI; 0 before the first initialization.
    pub fn dpi(&self) -> f32 {
        self.state.lock().dpi
    }

    pub fn phase(&self) -> DevicePhase {
        self.state.lock().phase
    }

    pub fn is_ready(&self) -> bool {
        self.phase() == DevicePhase::Ready
    }

    /// Handles of the current device objects, if ready.
    pub fn objects(&self) -> Option<DeviceObjects> {
        self.state.lock().objects
    }

    /// Feature level of the current device, if ready.
    pub fn feature_level(&self) -> Option<FeatureLevel> {
        self.objects().map(|objects| objects.feature_level)
    }

    /// Number of successful initializations so far.
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Release every device object and return to [`DevicePhase::Uninitialized`].
    ///
    /// Calling this on an uninitialized manager is a no-op.
    pub fn dispose(&self) {
        let mut state = self.state.lock();
        let released = state.registry.release_all();
        state.objects = None;
        state.phase = DevicePhase::Uninitialized;
        if released > 0 {
            log::info!("{}: disposed {released} device object(s)", self.component);
        }
    }

    fn create_objects(
        &self,
        registry: &mut DisposalRegistry<GpuHandle>,
    ) -> Result<DeviceObjects, GraphicsError> {
        let backend = &self.backend;

        let feature_level = self
            .options
            .feature_levels
            .iter()
            .copied()
            .find(|level| backend.supports_feature_level(*level))
            .ok_or_else(|| GraphicsError::DeviceCreation {
                requested: self.options.feature_levels.clone(),
            })?;
        let flags = self.options.creation_flags();

        let device = backend.create_device(feature_level, flags)?;
        let device = registry.track(backend, device, "device").handle();

        let context = backend.immediate_context(device)?;
        let context = registry.track(backend, context, "immediate context").handle();

        let factory_2d = backend.create_factory_2d(self.options.debug)?;
        let factory_2d = registry.track(backend, factory_2d, "2D factory").handle();

        let text_factory = backend.create_text_factory()?;
        let text_factory = registry.track(backend, text_factory, "text factory").handle();

        let imaging_factory = backend.create_imaging_factory()?;
        let imaging_factory = registry
            .track(backend, imaging_factory, "imaging factory")
            .handle();

        let device_2d = backend.create_device_2d(factory_2d, device)?;
        let device_2d = registry.track(backend, device_2d, "2D device").handle();

        let context_2d = backend.create_context_2d(device_2d)?;
        let context_2d = registry.track(backend, context_2d, "2D context").handle();

        Ok(DeviceObjects {
            feature_level,
            device,
            context,
            factory_2d,
            text_factory,
            imaging_factory,
            device_2d,
            context_2d,
        })
    }

    /// Store `dpi`, push it to the 2D context when it changed (or when
    /// `refresh_context` is set), and notify on change.
    fn apply_dpi(&self, dpi: f32, refresh_context: bool) -> Result<(), GraphicsError> {
        let (previous, context_2d) = {
            let mut state = self.state.lock();
            let previous = state.dpi;
            state.dpi = dpi;
            (previous, state.objects.map(|objects| objects.context_2d))
        };
        let changed = previous != dpi;

        if changed || refresh_context {
            if let Some(context_2d) = context_2d {
                self.backend.set_context_2d_dpi(context_2d, dpi, dpi)?;
            }
        }
        if changed {
            log::info!("{}: dpi {previous} -> {dpi}", self.component);
            self.on_dpi_changed.emit(self)?;
        }
        Ok(())
    }
}

impl fmt::Debug for DeviceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("DeviceManager")
            .field("component", &self.component)
            .field("backend", &self.backend.name())
            .field("phase", &state.phase)
            .field("dpi", &state.dpi)
            .field("generation", &state.generation)
            .field("objects", &state.objects)
            .finish()
    }
}

static_assertions::assert_impl_all!(DeviceManager: Send, Sync);
