//! Graphics error types.

use lumen_core::CoreError;
use thiserror::Error;

use crate::backend::BackendError;
use crate::types::FeatureLevel;

/// Errors that can occur in the graphics lifecycle.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphicsError {
    /// No feature level in the preference list is supported by the backend.
    #[error("no supported feature level among {requested:?}")]
    DeviceCreation {
        /// The preference list that was tried, in order.
        requested: Vec<FeatureLevel>,
    },
    /// Presenting failed for a reason other than device loss.
    #[error("presentation failed: {0}")]
    Presentation(#[source] BackendError),
    /// A native API call failed.
    #[error(transparent)]
    Backend(#[from] BackendError),
    /// An object was used before the object it depends on was created.
    #[error("{0} is not initialized")]
    NotInitialized(&'static str),
    /// An object was used after it was disposed.
    #[error("object has been disposed")]
    Disposed,
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl GraphicsError {
    /// Whether this error reports a removed or reset device.
    pub fn is_device_lost(&self) -> bool {
        match self {
            Self::Backend(err) | Self::Presentation(err) => err.is_device_lost(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphicsError::DeviceCreation {
            requested: vec![FeatureLevel::Level11_1, FeatureLevel::Level11_0],
        };
        assert_eq!(
            err.to_string(),
            "no supported feature level among [Level11_1, Level11_0]"
        );

        let err = GraphicsError::NotInitialized("swap chain");
        assert_eq!(err.to_string(), "swap chain is not initialized");

        let err = GraphicsError::Presentation(BackendError::Internal("hung".to_string()));
        assert_eq!(
            err.to_string(),
            "presentation failed: internal backend error: hung"
        );
    }

    #[test]
    fn test_device_lost_classification() {
        assert!(GraphicsError::Backend(BackendError::DeviceRemoved).is_device_lost());
        assert!(GraphicsError::Backend(BackendError::DeviceReset).is_device_lost());
        assert!(!GraphicsError::Disposed.is_device_lost());
        assert!(
            !GraphicsError::Backend(BackendError::InvalidParameter("x".into())).is_device_lost()
        );
    }
}
