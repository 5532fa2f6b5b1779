use burn::{
    data::dataset::{vision::MnistDataset, Dataset},
    prelude::*,
    tensor::Distribution,
};

use crate::utils::normalize;

pub const IMAGE_SIZE: usize = 28;

/// The fixed training collection: normalized single-channel digit images.
///
/// Images are held as `[1, 28, 28]` tensors in [-1, 1] and served as
/// sequential, non-overlapping batches; a trailing partial batch is dropped.
pub struct DigitDataset<B: Backend> {
    images: Vec<Tensor<B, 3>>,
}

impl<B: Backend> DigitDataset<B> {
    /// Loads the MNIST train split, converting every image to [-1, 1].
    pub fn mnist_train(device: &B::Device) -> Self {
        let source = MnistDataset::train();
        let images = source
            .iter()
            .map(|item| {
                let pixels = item
                    .image
                    .into_iter()
                    .flatten()
                    .map(normalize)
                    .collect::<Vec<_>>();
                Tensor::from_data(
                    TensorData::new(pixels, [1, IMAGE_SIZE, IMAGE_SIZE]),
                    device,
                )
            })
            .collect();

        Self { images }
    }

    pub fn from_images(images: Vec<Tensor<B, 3>>) -> Self {
        Self { images }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn num_batches(&self, batch_size: usize) -> usize {
        self.images.len() / batch_size
    }

    /// Assembles batch `index` as an NCHW tensor on the given device.
    pub fn batch(&self, index: usize, batch_size: usize, device: &B::Device) -> Tensor<B, 4> {
        let start = index * batch_size;
        let items = self.images[start..start + batch_size]
            .iter()
            .map(|image| image.clone().unsqueeze_dim(0))
            .collect::<Vec<Tensor<B, 4>>>();

        Tensor::cat(items, 0).to_device(device)
    }
}

/// Draws a fresh batch of noise rows, i.i.d. uniform on [-1, 1].
pub fn noise_batch<B: Backend>(rows: usize, dim: usize, device: &B::Device) -> Tensor<B, 2> {
    Tensor::random([rows, dim], Distribution::Uniform(-1.0, 1.0), device)
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray<f32>;

    fn dummy_dataset(count: usize) -> DigitDataset<TestBackend> {
        let device = Default::default();
        let images = (0..count)
            .map(|_| Tensor::zeros([1, IMAGE_SIZE, IMAGE_SIZE], &device))
            .collect();
        DigitDataset::from_images(images)
    }

    #[test]
    fn partial_trailing_batch_is_dropped() {
        let dataset = dummy_dataset(100);
        assert_eq!(dataset.num_batches(10), 10);
        assert_eq!(dataset.num_batches(30), 3);
        assert_eq!(dataset.num_batches(128), 0);
    }

    #[test]
    fn batch_has_nchw_layout() {
        let dataset = dummy_dataset(20);
        let device = Default::default();
        let batch = dataset.batch(1, 10, &device);
        assert_eq!(batch.dims(), [10, 1, IMAGE_SIZE, IMAGE_SIZE]);
    }

    #[test]
    fn normalization_maps_pixels_into_unit_range() {
        assert_eq!(normalize(0.0), -1.0);
        assert_eq!(normalize(255.0), 1.0);
        assert_eq!(normalize(127.5), 0.0);
    }

    #[test]
    fn noise_stays_in_unit_range() {
        let device = Default::default();
        let noise = noise_batch::<TestBackend>(4, 100, &device);
        assert_eq!(noise.dims(), [4, 100]);
        let values = noise.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|v| (-1.0..=1.0).contains(v)));
    }
}
