use burn::{module::Module, prelude::*};

/// Nearest-neighbor 2x spatial upsampling.
///
/// Each pixel is repeated into a 2x2 block, so `[B, C, H, W]` becomes
/// `[B, C, 2H, 2W]`. Pure tensor plumbing, no parameters.
#[derive(Module, Debug, Clone)]
pub struct Upsample2x {}

impl Upsample2x {
    pub fn new() -> Self {
        Self {}
    }

    pub fn forward<B: Backend>(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let [batch_size, channels, height, width] = input.dims();

        // [B, C, H, W] -> [B, C, H, 1, W, 1], repeat the singleton axes,
        // then collapse into [B, C, 2H, 2W]
        input
            .reshape([batch_size, channels, height, 1, width, 1])
            .repeat_dim(3, 2)
            .repeat_dim(5, 2)
            .reshape([batch_size, channels, height * 2, width * 2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray<f32>;

    #[test]
    fn upsample_repeats_each_pixel() {
        let device = Default::default();
        let input_data = [[[[1.0, 2.0], [3.0, 4.0]]]];
        let input = Tensor::<TestBackend, 4>::from_data(input_data, &device);

        let output = Upsample2x::new().forward(input);
        assert_eq!(output.dims(), [1, 1, 4, 4]);

        let values = output.into_data().to_vec::<f32>().unwrap();
        let expected = [
            1.0, 1.0, 2.0, 2.0, //
            1.0, 1.0, 2.0, 2.0, //
            3.0, 3.0, 4.0, 4.0, //
            3.0, 3.0, 4.0, 4.0,
        ];
        assert_eq!(values, expected);
    }
}
