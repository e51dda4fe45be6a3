//! Model module for the U-Net architecture using the Burn framework
//!
//! This module provides:
//! - The double-convolution building block and the upsampling layer
//! - Center-crop alignment of skip connections
//! - The U-Net itself and its configuration
//!
//! ## Architecture
//!
//! Spatial extents for the reference 572x572 input:
//!
//! ```text
//! encoder 1   572 -> 568 (skip) -> pool 284
//! encoder 2   284 -> 280 (skip) -> pool 140
//! encoder 3   140 -> 136 (skip) -> pool  68
//! encoder 4    68 ->  64 (skip) -> pool  32
//! bottleneck   32 ->  28
//! decoder 1    up  56 + crop(64)  ->  52
//! decoder 2    up 104 + crop(136) -> 100
//! decoder 3    up 200 + crop(280) -> 196
//! decoder 4    up 392 + crop(568) -> 388 -> 1x1 head
//! ```

pub mod blocks;
pub mod config;
pub mod crop;
pub mod unet;

// Re-export main types for convenience
pub use blocks::{DoubleConv, UpConv};
pub use config::{ShapePlan, UNetConfig};
pub use crop::{center_crop, center_crop_like};
pub use unet::{DecoderStage, EncoderOutput, SkipJoin, UNet};

/// Input extent of the reference invocation
pub const REFERENCE_INPUT_SIZE: usize = 572;

/// Output extent of the reference invocation
pub const REFERENCE_OUTPUT_SIZE: usize = 388;
