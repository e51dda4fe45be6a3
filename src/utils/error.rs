//! Error Handling Module
//!
//! Defines the error type for U-Net construction and forward passes.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Main error type for U-Net operations
///
/// Every variant describes a shape problem detected before the tensor
/// operation that would otherwise panic inside the backend.
#[derive(Error, Debug)]
pub enum UNetError {
    /// Spatial extents that must agree do not
    #[error("Dimension mismatch at {stage}: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        stage: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Channel count entering a layer differs from what it was built for
    #[error("Channel mismatch at {stage}: expected {expected} channels, got {actual}")]
    ChannelMismatch {
        stage: String,
        expected: usize,
        actual: usize,
    },

    /// Input too small to survive every convolution and pooling stage
    #[error("Input size {size} too small at {stage} (minimum input size is {min})")]
    InputTooSmall {
        size: usize,
        min: usize,
        stage: String,
    },

    /// Crop target larger than the source feature map
    #[error("Cannot crop {source_size:?} down to {target:?}")]
    CropOutOfBounds {
        source_size: [usize; 2],
        target: [usize; 2],
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience Result type for U-Net operations
pub type Result<T> = std::result::Result<T, UNetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = UNetError::Config("depth must be greater than 0".to_string());
        assert_eq!(
            format!("{}", err),
            "Configuration error: depth must be greater than 0"
        );
    }

    #[test]
    fn test_channel_mismatch_display() {
        let err = UNetError::ChannelMismatch {
            stage: "decoder stage 1".to_string(),
            expected: 1024,
            actual: 1023,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("decoder stage 1"));
        assert!(msg.contains("1024"));
    }

    #[test]
    fn test_crop_out_of_bounds_display() {
        let err = UNetError::CropOutOfBounds {
            source_size: [4, 4],
            target: [5, 5],
        };
        assert_eq!(format!("{}", err), "Cannot crop [4, 4] down to [5, 5]");
    }
}
