//! Host over an opaque window handle with settable client bounds.

use parking_lot::Mutex;

use lumen_graphics::{
    Backend, FullScreenDescriptor, GpuHandle, GraphicsError, Rect, SampleDescription,
    SwapChainDescriptor, WindowHandle,
};

use crate::handler::ApplicationHost;

/// [`ApplicationHost`] for a window the caller manages.
///
/// The caller reports client-area changes with [`set_bounds`](Self::set_bounds)
/// and then calls [`Application::size_changed`](crate::Application::size_changed),
/// the way a desktop window forwards its resize events.
#[derive(Debug)]
pub struct HeadlessHost {
    window: WindowHandle,
    bounds: Mutex<Rect>,
    sample: SampleDescription,
    buffer_count: u32,
}

impl HeadlessHost {
    pub fn new(window: WindowHandle, bounds: Rect) -> Self {
        Self {
            window,
            bounds: Mutex::new(bounds),
            sample: SampleDescription::default(),
            buffer_count: 1,
        }
    }

    /// Multisampling of the swap chain's back buffers.
    pub fn with_sample(mut self, sample: SampleDescription) -> Self {
        self.sample = sample;
        self
    }

    pub fn with_buffer_count(mut self, buffer_count: u32) -> Self {
        self.buffer_count = buffer_count;
        self
    }

    pub fn window(&self) -> WindowHandle {
        self.window
    }

    /// Set the client area reported to the application.
    pub fn set_bounds(&self, bounds: Rect) {
        *self.bounds.lock() = bounds;
    }
}

impl ApplicationHost for HeadlessHost {
    fn current_bounds(&self) -> Rect {
        *self.bounds.lock()
    }

    fn create_swap_chain(
        &self,
        backend: &dyn Backend,
        device: GpuHandle,
        descriptor: &SwapChainDescriptor,
        full_screen: &FullScreenDescriptor,
    ) -> Result<GpuHandle, GraphicsError> {
        Ok(backend.create_swap_chain(device, self.window, descriptor, full_screen)?)
    }

    fn swap_chain_descriptor(&self, width: u32, height: u32) -> SwapChainDescriptor {
        SwapChainDescriptor::new(width, height)
            .with_sample(self.sample)
            .with_buffer_count(self.buffer_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_are_settable() {
        let host = HeadlessHost::new(WindowHandle::new(1), Rect::from_dimensions(800, 600));
        assert_eq!(host.current_bounds(), Rect::from_dimensions(800, 600));

        host.set_bounds(Rect::new(10, 20, 1024, 768));
        assert_eq!(host.current_bounds(), Rect::new(10, 20, 1024, 768));
    }

    #[test]
    fn test_descriptor_carries_sample_and_buffers() {
        let host = HeadlessHost::new(WindowHandle::new(1), Rect::from_dimensions(800, 600))
            .with_sample(SampleDescription::new(4, 0))
            .with_buffer_count(2);

        let desc = host.swap_chain_descriptor(800, 600);
        assert_eq!(desc.sample, SampleDescription::new(4, 0));
        assert_eq!(desc.buffer_count, 2);
        assert_eq!((desc.width, desc.height), (800, 600));
    }
}
