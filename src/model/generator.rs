use burn::{
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        BatchNorm, BatchNormConfig, Linear, LinearConfig, PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::tanh,
};

use crate::model::layers::Upsample2x;

/// Maps a noise batch `[B, noise_dim]` to synthetic digits `[B, 1, 28, 28]`
/// in [-1, 1].
#[derive(Module, Debug)]
pub struct Generator<B: Backend> {
    fc1: Linear<B>,
    fc2: Linear<B>,
    bn: BatchNorm<B, 2>,
    up1: Upsample2x,
    conv1: Conv2d<B>,
    up2: Upsample2x,
    conv2: Conv2d<B>,
}

impl<B: Backend> Generator<B> {
    pub fn forward(&self, noise: Tensor<B, 2>) -> Tensor<B, 4> {
        let [batch_size, _] = noise.dims();

        let x = tanh(self.fc1.forward(noise));
        let x = self.fc2.forward(x);

        // 128 feature maps on a 7x7 base grid, upsampled twice to 28x28
        let x = x.reshape([batch_size, 128, 7, 7]);
        let x = self.bn.forward(x);

        let x = self.up1.forward(x);
        let x = tanh(self.conv1.forward(x));

        let x = self.up2.forward(x);
        tanh(self.conv2.forward(x))
    }
}

#[derive(Config, Debug)]
pub struct GeneratorConfig {
    #[config(default = 100)]
    pub noise_dim: usize,
}

impl GeneratorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Generator<B> {
        let fc1 = LinearConfig::new(self.noise_dim, 1024).init(device);
        let fc2 = LinearConfig::new(1024, 128 * 7 * 7).init(device);
        let bn = BatchNormConfig::new(128).init::<B, 2>(device);

        let conv1 = Conv2dConfig::new([128, 64], [5, 5])
            .with_padding(PaddingConfig2d::Same)
            .init(device);
        let conv2 = Conv2dConfig::new([64, 1], [5, 5])
            .with_padding(PaddingConfig2d::Same)
            .init(device);

        Generator {
            fc1,
            fc2,
            bn,
            up1: Upsample2x::new(),
            conv1,
            up2: Upsample2x::new(),
            conv2,
        }
    }
}
