//! U-Net Architecture
//!
//! Encoder of double convolutions and 2x2 max pools, a bottleneck block, and a
//! decoder that upsamples with transposed convolutions, concatenates the
//! center-cropped encoder activation at the same depth, and fuses the two
//! with another double convolution. A 1x1 convolution produces the raw
//! per-pixel scores.
//!
//! All convolutions are unpadded, so the output is spatially smaller than the
//! input: a 572x572 image gives a 388x388 score map with the default config.

use burn::{
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
    },
    tensor::{backend::Backend, Tensor},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::blocks::{DoubleConv, UpConv};
use super::config::UNetConfig;
use super::crop::center_crop_like;
use crate::utils::error::{Result, UNetError};

/// One decoder stage: upsample, then fuse with the cropped skip connection
#[derive(Module, Debug)]
pub struct DecoderStage<B: Backend> {
    pub up: UpConv<B>,
    pub fuse: DoubleConv<B>,
}

impl<B: Backend> DecoderStage<B> {
    pub fn new(in_channels: usize, kernel_size: usize, device: &B::Device) -> Self {
        let out_channels = in_channels / 2;
        Self {
            up: UpConv::new(in_channels, out_channels, device),
            fuse: DoubleConv::new(out_channels * 2, out_channels, kernel_size, device),
        }
    }
}

/// Activations produced by the encoder
#[derive(Debug, Clone)]
pub struct EncoderOutput<B: Backend> {
    /// Pre-pool activations, shallowest first
    pub skips: Vec<Tensor<B, 4>>,
    pub bottleneck: Tensor<B, 4>,
}

/// Shapes observed where a decoder stage joins its skip connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipJoin {
    /// 1-based decoder stage, deepest first
    pub stage: usize,
    /// Transposed-convolution output
    pub upsampled: [usize; 4],
    /// Skip connection after cropping
    pub cropped_skip: [usize; 4],
    /// Channels entering the fusing block
    pub fused_channels: usize,
}

/// U-Net for image-to-image prediction
#[derive(Module, Debug)]
pub struct UNet<B: Backend> {
    pub encoder: Vec<DoubleConv<B>>,
    pub pool: MaxPool2d,
    pub bottleneck: DoubleConv<B>,
    /// Deepest stage first
    pub decoder: Vec<DecoderStage<B>>,
    pub head: Conv2d<B>,

    in_channels: usize,
    out_channels: usize,
    base_channels: usize,
    kernel_size: usize,
}

impl UNetConfig {
    /// Initialize a U-Net with freshly initialized weights
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<UNet<B>> {
        UNet::new(self, device)
    }
}

impl<B: Backend> UNet<B> {
    /// Create a new U-Net from configuration
    pub fn new(config: &UNetConfig, device: &B::Device) -> Result<Self> {
        config.validate()?;

        let channels = config.channel_plan();
        let k = config.kernel_size;

        // 1 -> 64 -> 128 -> 256 -> 512 for the default config
        let mut encoder = Vec::with_capacity(config.depth);
        let mut in_channels = config.in_channels;
        for &out_channels in channels.iter().take(config.depth) {
            encoder.push(DoubleConv::new(in_channels, out_channels, k, device));
            in_channels = out_channels;
        }

        let bottleneck = DoubleConv::new(in_channels, channels[config.depth], k, device);

        // 1024 -> 512 -> 256 -> 128 -> 64
        let decoder = channels[1..]
            .iter()
            .rev()
            .map(|&c| DecoderStage::new(c, k, device))
            .collect();

        let head = Conv2dConfig::new([config.base_channels, config.out_channels], [1, 1])
            .init(device);

        let pool = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();

        Ok(Self {
            encoder,
            pool,
            bottleneck,
            decoder,
            head,
            in_channels: config.in_channels,
            out_channels: config.out_channels,
            base_channels: config.base_channels,
            kernel_size: config.kernel_size,
        })
    }

    /// Configuration this model was built from
    pub fn config(&self) -> UNetConfig {
        UNetConfig::new()
            .with_in_channels(self.in_channels)
            .with_out_channels(self.out_channels)
            .with_base_channels(self.base_channels)
            .with_depth(self.encoder.len())
            .with_kernel_size(self.kernel_size)
    }

    /// Forward pass through the network
    ///
    /// # Arguments
    /// * `x` - Input tensor of shape [batch_size, in_channels, height, width]
    ///
    /// # Returns
    /// * Raw scores of shape [batch_size, out_channels, out_height, out_width]
    pub fn forward(&self, x: Tensor<B, 4>) -> Result<Tensor<B, 4>> {
        self.forward_traced(x).map(|(output, _)| output)
    }

    /// Forward pass that also reports the shapes at every skip join
    pub fn forward_traced(&self, x: Tensor<B, 4>) -> Result<(Tensor<B, 4>, Vec<SkipJoin>)> {
        self.check_input(&x)?;

        let encoded = self.encode(x);
        let (x, joins) = self.decode(encoded)?;

        Ok((self.head.forward(x), joins))
    }

    /// Run the encoder and the bottleneck
    pub fn encode(&self, x: Tensor<B, 4>) -> EncoderOutput<B> {
        let mut skips = Vec::with_capacity(self.encoder.len());
        let mut x = x;

        for block in &self.encoder {
            let activation = block.forward(x);
            x = self.pool.forward(activation.clone());
            skips.push(activation);
        }

        EncoderOutput {
            skips,
            bottleneck: self.bottleneck.forward(x),
        }
    }

    /// Run the decoder stages, returning the final 64-channel feature map
    pub fn decode(&self, encoded: EncoderOutput<B>) -> Result<(Tensor<B, 4>, Vec<SkipJoin>)> {
        let EncoderOutput { skips, bottleneck } = encoded;

        if skips.len() != self.decoder.len() {
            return Err(UNetError::DimensionMismatch {
                stage: "decoder".to_string(),
                expected: vec![self.decoder.len()],
                actual: vec![skips.len()],
            });
        }

        if let Some(first) = self.decoder.first() {
            let channels = bottleneck.dims()[1];
            if channels != first.up.in_channels() {
                return Err(UNetError::ChannelMismatch {
                    stage: "bottleneck".to_string(),
                    expected: first.up.in_channels(),
                    actual: channels,
                });
            }
        }

        let mut joins = Vec::with_capacity(self.decoder.len());
        let mut x = bottleneck;

        for (index, (stage, skip)) in self.decoder.iter().zip(skips.into_iter().rev()).enumerate() {
            let stage_no = index + 1;

            let upsampled = stage.up.forward(x);
            let skip = center_crop_like(skip, &upsampled)?;

            let up_dims = upsampled.dims();
            let skip_dims = skip.dims();

            if up_dims[2..] != skip_dims[2..] || up_dims[0] != skip_dims[0] {
                return Err(UNetError::DimensionMismatch {
                    stage: format!("skip connection {}", stage_no),
                    expected: up_dims.to_vec(),
                    actual: skip_dims.to_vec(),
                });
            }

            let fused_channels = up_dims[1] + skip_dims[1];
            if fused_channels != stage.fuse.in_channels() {
                return Err(UNetError::ChannelMismatch {
                    stage: format!("decoder stage {}", stage_no),
                    expected: stage.fuse.in_channels(),
                    actual: fused_channels,
                });
            }

            debug!(
                "decoder stage {}: upsampled {:?} + skip {:?} -> {} channels",
                stage_no, up_dims, skip_dims, fused_channels
            );

            joins.push(SkipJoin {
                stage: stage_no,
                upsampled: up_dims,
                cropped_skip: skip_dims,
                fused_channels,
            });

            x = stage.fuse.forward(Tensor::cat(vec![upsampled, skip], 1));
        }

        Ok((x, joins))
    }

    /// Output shape for a given input shape, without running the network
    pub fn output_dims(&self, input: [usize; 4]) -> Result<[usize; 4]> {
        let [batch, _, height, width] = input;
        let config = self.config();

        Ok([
            batch,
            self.out_channels,
            config.output_size(height)?,
            config.output_size(width)?,
        ])
    }

    /// Get the number of output channels
    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    pub fn in_channels(&self) -> usize {
        self.in_channels
    }

    fn check_input(&self, x: &Tensor<B, 4>) -> Result<()> {
        let [_, channels, height, width] = x.dims();

        if channels != self.in_channels {
            return Err(UNetError::ChannelMismatch {
                stage: "input".to_string(),
                expected: self.in_channels,
                actual: channels,
            });
        }

        let config = self.config();
        config.shape_plan(height)?;
        config.shape_plan(width)?;

        Ok(())
    }
}
