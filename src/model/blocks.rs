//! Building blocks shared by the encoder, bottleneck and decoder

use burn::{
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig, ConvTranspose2d, ConvTranspose2dConfig},
        PaddingConfig2d, Relu,
    },
    tensor::{backend::Backend, Tensor},
};

/// Two unpadded convolutions, each followed by ReLU
///
/// Every convolution shrinks height and width by `kernel_size - 1`.
#[derive(Module, Debug)]
pub struct DoubleConv<B: Backend> {
    pub conv1: Conv2d<B>,
    pub conv2: Conv2d<B>,
    pub relu: Relu,
    in_channels: usize,
    out_channels: usize,
}

impl<B: Backend> DoubleConv<B> {
    /// Create a new double convolution block
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        device: &B::Device,
    ) -> Self {
        let conv1 = Conv2dConfig::new([in_channels, out_channels], [kernel_size, kernel_size])
            .with_padding(PaddingConfig2d::Valid)
            .init(device);
        let conv2 = Conv2dConfig::new([out_channels, out_channels], [kernel_size, kernel_size])
            .with_padding(PaddingConfig2d::Valid)
            .init(device);

        Self {
            conv1,
            conv2,
            relu: Relu::new(),
            in_channels,
            out_channels,
        }
    }

    /// Forward pass through the block
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv1.forward(x);
        let x = self.relu.forward(x);
        let x = self.conv2.forward(x);
        self.relu.forward(x)
    }

    pub fn in_channels(&self) -> usize {
        self.in_channels
    }

    pub fn out_channels(&self) -> usize {
        self.out_channels
    }
}

/// Upsampling half of a decoder stage: 2x2 transposed convolution with stride 2
///
/// Doubles height and width and maps `in_channels -> out_channels`.
#[derive(Module, Debug)]
pub struct UpConv<B: Backend> {
    pub conv: ConvTranspose2d<B>,
    in_channels: usize,
    out_channels: usize,
}

impl<B: Backend> UpConv<B> {
    pub fn new(in_channels: usize, out_channels: usize, device: &B::Device) -> Self {
        let conv = ConvTranspose2dConfig::new([in_channels, out_channels], [2, 2])
            .with_stride([2, 2])
            .init(device);

        Self {
            conv,
            in_channels,
            out_channels,
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.conv.forward(x)
    }

    pub fn in_channels(&self) -> usize {
        self.in_channels
    }

    pub fn out_channels(&self) -> usize {
        self.out_channels
    }
}
