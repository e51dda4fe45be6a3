//! # U-Net on Burn
//!
//! A U-Net for image-to-image prediction (e.g. segmentation) built from the
//! layers of the Burn framework: unpadded 3x3 convolutions, 2x2 max pooling,
//! 2x2 transposed convolutions and a 1x1 output head.
//!
//! ## Modules
//!
//! - `model`: building blocks, center-crop alignment, the U-Net and its configuration
//! - `inference`: self-test and latency benchmark on synthetic input
//! - `backend`: compile-time backend selection (NdArray or CUDA)
//! - `utils`: logging, errors and formatting helpers
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use burn::tensor::Tensor;
//! use unet_burn::backend::{default_device, DefaultBackend};
//! use unet_burn::UNetConfig;
//!
//! let device = default_device();
//! let model = UNetConfig::new().init::<DefaultBackend>(&device)?;
//!
//! let image = Tensor::<DefaultBackend, 4>::zeros([1, 1, 572, 572], &device);
//! let scores = model.forward(image)?; // [1, 2, 388, 388]
//! ```

pub mod backend;
pub mod inference;
pub mod model;
pub mod utils;

// Re-export commonly used items for convenience
pub use inference::{run_self_test, SelfTestOptions, SelfTestReport};
pub use model::{center_crop, ShapePlan, SkipJoin, UNet, UNetConfig};
pub use utils::error::{Result, UNetError};
