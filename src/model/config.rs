//! Model Configuration Module
//!
//! Hyperparameters of the U-Net and the pure spatial arithmetic that goes
//! with them. Nothing here touches a tensor: [`UNetConfig::shape_plan`] walks
//! the same sequence of unpadded convolutions, poolings and transposed
//! convolutions the model performs and reports every intermediate extent.

use burn::config::Config;
use serde::{Deserialize, Serialize};

// Aliased: the `Config` derive expands serde impls that name a bare two-parameter `Result`.
use crate::utils::error::{Result as UNetResult, UNetError};

/// Largest supported number of encoder/decoder stages
pub const MAX_DEPTH: usize = 6;

/// Largest supported building-block kernel
pub const MAX_KERNEL_SIZE: usize = 1023;

/// Configuration for the U-Net model
#[derive(Config, Debug)]
pub struct UNetConfig {
    /// Number of input image channels
    #[config(default = "1")]
    pub in_channels: usize,

    /// Number of output channels produced by the 1x1 head
    #[config(default = "2")]
    pub out_channels: usize,

    /// Channels of the first encoder stage, doubled at every stage below it
    #[config(default = "64")]
    pub base_channels: usize,

    /// Number of encoder stages (and matching decoder stages)
    #[config(default = "4")]
    pub depth: usize,

    /// Kernel size of the building-block convolutions
    #[config(default = "3")]
    pub kernel_size: usize,
}

impl UNetConfig {
    /// Validate the configuration
    pub fn validate(&self) -> UNetResult<()> {
        if self.in_channels == 0 {
            return Err(UNetError::Config(
                "in_channels must be greater than 0".to_string(),
            ));
        }

        if self.out_channels == 0 {
            return Err(UNetError::Config(
                "out_channels must be greater than 0".to_string(),
            ));
        }

        if self.base_channels == 0 {
            return Err(UNetError::Config(
                "base_channels must be greater than 0".to_string(),
            ));
        }

        if self.depth == 0 || self.depth > MAX_DEPTH {
            return Err(UNetError::Config(format!(
                "depth must be in range [1, {}]",
                MAX_DEPTH
            )));
        }

        if self.kernel_size == 0 || self.kernel_size % 2 == 0 {
            return Err(UNetError::Config(
                "kernel_size must be a positive odd number".to_string(),
            ));
        }

        if self.kernel_size > MAX_KERNEL_SIZE {
            return Err(UNetError::Config(format!(
                "kernel_size must be at most {}",
                MAX_KERNEL_SIZE
            )));
        }

        if self.base_channels.checked_mul(1 << self.depth).is_none() {
            return Err(UNetError::Config(format!(
                "base_channels {} overflows when doubled {} times",
                self.base_channels, self.depth
            )));
        }

        Ok(())
    }

    /// Channel count at every level, from the first encoder stage down to the bottleneck
    ///
    /// The default configuration gives `[64, 128, 256, 512, 1024]`.
    pub fn channel_plan(&self) -> Vec<usize> {
        (0..=self.depth)
            .map(|level| self.base_channels << level)
            .collect()
    }

    /// How much one building block shrinks each spatial axis
    pub fn block_shrink(&self) -> usize {
        2 * (self.kernel_size - 1)
    }

    /// Walk the spatial arithmetic for one axis of extent `input_size`
    pub fn shape_plan(&self, input_size: usize) -> UNetResult<ShapePlan> {
        self.validate()?;

        self.plan_extent(input_size).map_err(|stage| UNetError::InputTooSmall {
            size: input_size,
            min: self.first_valid_extent(),
            stage,
        })
    }

    /// Spatial extent of the output for a square input of `input_size`
    pub fn output_size(&self, input_size: usize) -> UNetResult<usize> {
        Ok(self.shape_plan(input_size)?.output_size)
    }

    /// Smallest input extent every stage can process
    pub fn min_input_size(&self) -> UNetResult<usize> {
        self.validate()?;
        Ok(self.first_valid_extent())
    }

    /// Works back from a one-pixel output. Every stage is monotone in its
    /// input and a skip is never smaller than its upsampled partner, so the
    /// lower bounds collected here are exact. Assumes a validated config.
    fn first_valid_extent(&self) -> usize {
        let shrink = self.block_shrink();

        // Decoder: out >= r needs upsampled >= r + shrink, so in >= ceil((r + shrink) / 2)
        let mut required = 1usize;
        for _ in 0..self.depth {
            required = required.saturating_add(shrink).div_ceil(2);
        }

        // Bottleneck
        required = required.saturating_add(shrink);

        // Encoder: pooled >= r needs skip >= 2r, so in >= 2r + shrink
        for _ in 0..self.depth {
            required = required.saturating_mul(2).saturating_add(shrink);
        }

        required
    }

    /// Returns the name of the first stage that runs out of pixels on failure.
    fn plan_extent(&self, input_size: usize) -> std::result::Result<ShapePlan, String> {
        let shrink = self.block_shrink();
        let channels = self.channel_plan();

        let block = |size: usize, stage: String| -> std::result::Result<usize, String> {
            if size > shrink {
                Ok(size - shrink)
            } else {
                Err(stage)
            }
        };

        let mut size = input_size;
        let mut encoder = Vec::with_capacity(self.depth);
        for (level, &out_channels) in channels.iter().take(self.depth).enumerate() {
            let skip_size = block(size, format!("encoder stage {}", level + 1))?;
            let pooled_size = skip_size / 2;
            if pooled_size == 0 {
                return Err(format!("max pool {}", level + 1));
            }
            encoder.push(EncoderStagePlan {
                input_size: size,
                skip_size,
                pooled_size,
                channels: out_channels,
            });
            size = pooled_size;
        }

        let bottleneck_input = size;
        size = block(size, "bottleneck".to_string())?;
        let bottleneck = BlockPlan {
            input_size: bottleneck_input,
            output_size: size,
            channels: channels[self.depth],
        };

        let mut decoder = Vec::with_capacity(self.depth);
        for (stage, enc) in encoder.iter().rev().enumerate() {
            let upsampled_size = size.saturating_mul(2);
            if enc.skip_size < upsampled_size {
                return Err(format!("skip connection {}", stage + 1));
            }
            let output_size = block(upsampled_size, format!("decoder stage {}", stage + 1))?;
            decoder.push(DecoderStagePlan {
                upsampled_size,
                skip_size: enc.skip_size,
                crop_offset: (enc.skip_size - upsampled_size) / 2,
                fused_channels: enc.channels * 2,
                output_size,
                channels: enc.channels,
            });
            size = output_size;
        }

        Ok(ShapePlan {
            input_size,
            encoder,
            bottleneck,
            decoder,
            output_size: size,
            output_channels: self.out_channels,
        })
    }
}

impl Default for UNetConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// One encoder stage along a single spatial axis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderStagePlan {
    pub input_size: usize,
    /// Extent of the activation retained as a skip connection
    pub skip_size: usize,
    pub pooled_size: usize,
    pub channels: usize,
}

/// A building block along a single spatial axis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockPlan {
    pub input_size: usize,
    pub output_size: usize,
    pub channels: usize,
}

/// One decoder stage along a single spatial axis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderStagePlan {
    /// Extent after the transposed convolution
    pub upsampled_size: usize,
    /// Extent of the skip connection before cropping
    pub skip_size: usize,
    /// Rows (and columns) dropped from the leading edge of the skip
    pub crop_offset: usize,
    /// Channels entering the building block after concatenation
    pub fused_channels: usize,
    pub output_size: usize,
    pub channels: usize,
}

/// Every spatial extent a forward pass goes through
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapePlan {
    pub input_size: usize,
    pub encoder: Vec<EncoderStagePlan>,
    pub bottleneck: BlockPlan,
    pub decoder: Vec<DecoderStagePlan>,
    pub output_size: usize,
    pub output_channels: usize,
}

impl std::fmt::Display for ShapePlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "input           {:>5}", self.input_size)?;
        for (i, stage) in self.encoder.iter().enumerate() {
            writeln!(
                f,
                "encoder {}       {:>5} -> {:>5} (skip, {} ch) -> {:>5} (pooled)",
                i + 1,
                stage.input_size,
                stage.skip_size,
                stage.channels,
                stage.pooled_size
            )?;
        }
        writeln!(
            f,
            "bottleneck      {:>5} -> {:>5} ({} ch)",
            self.bottleneck.input_size, self.bottleneck.output_size, self.bottleneck.channels
        )?;
        for (i, stage) in self.decoder.iter().enumerate() {
            writeln!(
                f,
                "decoder {}       {:>5} (up) + {:>5} (skip, offset {}) -> {} ch -> {:>5} ({} ch)",
                i + 1,
                stage.upsampled_size,
                stage.skip_size,
                stage.crop_offset,
                stage.fused_channels,
                stage.output_size,
                stage.channels
            )?;
        }
        write!(
            f,
            "output          {:>5} ({} ch)",
            self.output_size, self.output_channels
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = UNetConfig::default();
        assert_eq!(config.in_channels, 1);
        assert_eq!(config.out_channels, 2);
        assert_eq!(config.base_channels, 64);
        assert_eq!(config.depth, 4);
        assert_eq!(config.kernel_size, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        assert!(UNetConfig::new().with_out_channels(0).validate().is_err());
        assert!(UNetConfig::new().with_base_channels(0).validate().is_err());
        assert!(UNetConfig::new().with_depth(0).validate().is_err());
        assert!(UNetConfig::new().with_depth(MAX_DEPTH + 1).validate().is_err());
        assert!(UNetConfig::new().with_kernel_size(4).validate().is_err());
        assert!(UNetConfig::new().with_kernel_size(5).validate().is_ok());
        assert!(UNetConfig::new()
            .with_kernel_size(MAX_KERNEL_SIZE + 2)
            .validate()
            .is_err());
    }

    #[test]
    fn test_base_channels_overflow_rejected() {
        let config = UNetConfig::new().with_base_channels(usize::MAX / 4);
        match config.validate() {
            Err(UNetError::Config(msg)) => assert!(msg.contains("overflows")),
            other => panic!("expected Config error, got {:?}", other),
        }
        assert!(config.shape_plan(572).is_err());
    }

    #[test]
    fn test_channel_plan() {
        let config = UNetConfig::default();
        assert_eq!(config.channel_plan(), vec![64, 128, 256, 512, 1024]);

        let narrow = UNetConfig::new().with_base_channels(4).with_depth(2);
        assert_eq!(narrow.channel_plan(), vec![4, 8, 16]);
    }

    #[test]
    fn test_reference_shape_plan() {
        let plan = UNetConfig::default().shape_plan(572).unwrap();

        let skips: Vec<usize> = plan.encoder.iter().map(|s| s.skip_size).collect();
        assert_eq!(skips, vec![568, 280, 136, 64]);
        assert_eq!(plan.bottleneck.input_size, 32);
        assert_eq!(plan.bottleneck.output_size, 28);

        let upsampled: Vec<usize> = plan.decoder.iter().map(|s| s.upsampled_size).collect();
        assert_eq!(upsampled, vec![56, 104, 200, 392]);
        let offsets: Vec<usize> = plan.decoder.iter().map(|s| s.crop_offset).collect();
        assert_eq!(offsets, vec![4, 16, 40, 88]);

        assert_eq!(plan.output_size, 388);
        assert_eq!(plan.output_channels, 2);
    }

    #[test]
    fn test_decoder_fused_channels() {
        let plan = UNetConfig::default().shape_plan(572).unwrap();
        let fused: Vec<usize> = plan.decoder.iter().map(|s| s.fused_channels).collect();
        assert_eq!(fused, vec![1024, 512, 256, 128]);
        let out: Vec<usize> = plan.decoder.iter().map(|s| s.channels).collect();
        assert_eq!(out, vec![512, 256, 128, 64]);
    }

    #[test]
    fn test_odd_difference_crop_offset() {
        // 573 -> 569 leaves an odd skip; the pool floors it to 284
        let plan = UNetConfig::default().shape_plan(573).unwrap();
        let last = plan.decoder.last().unwrap();
        assert_eq!(last.skip_size, 569);
        assert_eq!(last.upsampled_size, 392);
        assert_eq!(last.crop_offset, 88);
    }

    #[test]
    fn test_output_size_independent_of_channels() {
        let base = UNetConfig::default().output_size(572).unwrap();
        let wide = UNetConfig::new()
            .with_out_channels(7)
            .with_base_channels(8)
            .output_size(572)
            .unwrap();
        assert_eq!(base, 388);
        assert_eq!(wide, 388);
    }

    #[test]
    fn test_input_too_small() {
        let config = UNetConfig::default();
        let min = config.min_input_size().unwrap();
        assert!(config.shape_plan(min).is_ok());
        assert!(config.shape_plan(min - 1).is_err());

        assert_eq!(min, 188);

        match config.shape_plan(16) {
            Err(UNetError::InputTooSmall { size, min: reported, .. }) => {
                assert_eq!(size, 16);
                assert_eq!(reported, min);
            }
            other => panic!("expected InputTooSmall, got {:?}", other),
        }
    }

    #[test]
    fn test_min_input_size_is_tight() {
        for depth in 1..=MAX_DEPTH {
            for kernel_size in [1, 3, 5, 7] {
                let config = UNetConfig::new()
                    .with_depth(depth)
                    .with_kernel_size(kernel_size);
                let min = config.min_input_size().unwrap();

                assert!(config.shape_plan(min).is_ok(), "depth {} k {}", depth, kernel_size);
                if min > 1 {
                    assert!(
                        config.shape_plan(min - 1).is_err(),
                        "depth {} k {}",
                        depth,
                        kernel_size
                    );
                }
            }
        }
    }

    #[test]
    fn test_min_input_size_large_kernel() {
        let config = UNetConfig::new().with_kernel_size(301).with_depth(MAX_DEPTH);
        let min = config.min_input_size().unwrap();
        assert!(config.shape_plan(min).is_ok());
        assert!(config.shape_plan(min - 1).is_err());
    }

    #[test]
    fn test_config_save_load() {
        let path = std::env::temp_dir().join(format!(
            "unet_config_{}_{}.json",
            std::process::id(),
            line!()
        ));

        let config = UNetConfig::new().with_out_channels(3).with_depth(3);
        config.save(&path).unwrap();
        let restored = UNetConfig::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(restored.out_channels, 3);
        assert_eq!(restored.depth, 3);
        assert_eq!(restored.base_channels, 64);
        assert!(restored.validate().is_ok());
    }

    #[test]
    fn test_config_json_roundtrip() {
        let config = UNetConfig::new().with_out_channels(5).with_base_channels(16);
        let json = serde_json::to_string(&config).unwrap();
        let restored: UNetConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.out_channels, 5);
        assert_eq!(restored.base_channels, 16);
        assert_eq!(restored.depth, 4);
    }
}
