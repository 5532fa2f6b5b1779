use burn::{
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        Linear, LinearConfig, PaddingConfig2d, Sigmoid,
    },
    prelude::*,
    tensor::activation::tanh,
};

/// Scores images `[B, 1, 28, 28]` with a realism probability `[B, 1]`.
#[derive(Module, Debug)]
pub struct Discriminator<B: Backend> {
    conv1: Conv2d<B>,
    pool1: MaxPool2d,
    conv2: Conv2d<B>,
    pool2: MaxPool2d,
    fc: Linear<B>,
    out: Linear<B>,
    sig: Sigmoid,
}

impl<B: Backend> Discriminator<B> {
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = tanh(self.conv1.forward(images));
        let x = self.pool1.forward(x);

        let x = tanh(self.conv2.forward(x));
        let x = self.pool2.forward(x);

        let x: Tensor<B, 2> = x.flatten(1, 3);
        let x = tanh(self.fc.forward(x));
        let x = self.out.forward(x);

        self.sig.forward(x).clamp(0.00001, 0.99999)
    }
}

#[derive(Config, Debug)]
pub struct DiscriminatorConfig {
    #[config(default = 28)]
    pub image_size: usize,
}

impl DiscriminatorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Discriminator<B> {
        let conv1 = Conv2dConfig::new([1, 64], [5, 5])
            .with_padding(PaddingConfig2d::Same)
            .init(device);
        let pool1 = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();

        // no padding here, so the grid shrinks by 4 before the second pool
        let conv2 = Conv2dConfig::new([64, 128], [5, 5]).init(device);
        let pool2 = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();

        let pixels = (self.image_size / 2 - 4) / 2;
        let fc = LinearConfig::new(128 * pixels * pixels, 1024).init(device);
        let out = LinearConfig::new(1024, 1).init(device);

        Discriminator {
            conv1,
            pool1,
            conv2,
            pool2,
            fc,
            out,
            sig: Sigmoid::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray<f32>;

    #[test]
    fn discriminator_scores_stay_in_open_unit_interval() {
        let device = Default::default();
        let discriminator = DiscriminatorConfig::new().init::<TestBackend>(&device);

        let images = Tensor::zeros([3, 1, 28, 28], &device);
        let scores = discriminator.forward(images);
        assert_eq!(scores.dims(), [3, 1]);

        let values = scores.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|v| *v > 0.0 && *v < 1.0));
    }
}
