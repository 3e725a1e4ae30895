//! Backend error types.

use thiserror::Error;

use super::GpuHandle;

/// Errors reported by a [`Backend`](super::Backend) implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The device was physically removed or its driver was upgraded.
    #[error("graphics device removed")]
    DeviceRemoved,
    /// The device was reset and its objects are no longer valid.
    #[error("graphics device reset")]
    DeviceReset,
    /// The requested feature or format is not supported.
    #[error("not supported: {0}")]
    Unsupported(String),
    /// The handle does not name a live object of the expected kind.
    #[error("invalid handle {0}")]
    InvalidHandle(GpuHandle),
    /// Invalid parameter, or a call made in a state the API forbids.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// Internal backend error.
    #[error("internal backend error: {0}")]
    Internal(String),
}

impl BackendError {
    /// Whether the error belongs to the device-lost class.
    ///
    /// Device-lost errors are recovered by recreating every device object;
    /// all others are reported to the caller.
    pub fn is_device_lost(&self) -> bool {
        matches!(self, Self::DeviceRemoved | Self::DeviceReset)
    }
}
