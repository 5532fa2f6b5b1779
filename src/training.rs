use std::path::Path;

use anyhow::{ensure, Context, Result};
use burn::{
    config::Config,
    module::Module,
    nn::loss::{BinaryCrossEntropyLoss, BinaryCrossEntropyLossConfig},
    optim::{GradientsParams, Optimizer, SgdConfig},
    record::CompactRecorder,
    tensor::{
        backend::{AutodiffBackend, Backend},
        cast::ToElement,
        Int, Tensor, TensorData,
    },
};
use tracing::info;

use crate::{
    data::{noise_batch, DigitDataset},
    model::{
        discriminator::Discriminator,
        generator::Generator,
        GanConfig,
    },
    utils::{batch_to_images, tile_images},
};

/// A grid of current generator output is written every Nth batch.
pub const SNAPSHOT_EVERY: usize = 20;
/// Both checkpoints are rewritten every Nth batch.
pub const CHECKPOINT_EVERY: usize = 10;

#[derive(Config)]
pub struct TrainingConfig {
    pub model: GanConfig,
    pub optimizer: SgdConfig,
    pub weights_dir: String,
    pub results_dir: String,

    #[config(default = 50)]
    pub epochs: usize,
    #[config(default = 128)]
    pub batch_size: usize,
    #[config(default = 5e-4)]
    pub learning_rate: f64,
}

/// Label vector for a combined real+synthetic batch: one `1` per real image
/// followed by one `0` per synthetic image, in that order.
pub fn real_fake_labels(batch_size: usize) -> Vec<i32> {
    let mut labels = vec![1; batch_size];
    labels.extend(std::iter::repeat_n(0, batch_size));
    labels
}

pub fn snapshot_due(batch_index: usize) -> bool {
    batch_index % SNAPSHOT_EVERY == 0
}

pub fn checkpoint_due(batch_index: usize) -> bool {
    batch_index % CHECKPOINT_EVERY == CHECKPOINT_EVERY - 1
}

/// Runs the alternating adversarial loop over the MNIST train split.
///
/// Each iteration updates the discriminator on a combined real+synthetic
/// batch, then updates the generator through the frozen discriminator.
/// The discriminator is borrowed immutably during the generator update and
/// only generator gradients are extracted, so its parameters cannot change
/// there.
pub fn train<B: AutodiffBackend>(config: TrainingConfig, device: B::Device) -> Result<()> {
    ensure!(config.batch_size > 0, "batch size must be nonzero");

    let weights_dir = Path::new(&config.weights_dir);
    let results_dir = Path::new(&config.results_dir);
    std::fs::create_dir_all(weights_dir)
        .with_context(|| format!("failed to create {}", weights_dir.display()))?;
    std::fs::create_dir_all(results_dir)
        .with_context(|| format!("failed to create {}", results_dir.display()))?;

    let dataset = DigitDataset::<B>::mnist_train(&device);
    let num_batches = dataset.num_batches(config.batch_size);
    info!(
        images = dataset.len(),
        num_batches,
        batch_size = config.batch_size,
        "loaded training data"
    );

    let noise_dim = config.model.generator.noise_dim;
    let mut generator = config.model.generator.init::<B>(&device);
    let mut discriminator = config.model.discriminator.init::<B>(&device);

    let mut gen_optim = config.optimizer.init::<B, Generator<B>>();
    let mut disc_optim = config.optimizer.init::<B, Discriminator<B>>();

    let bce = BinaryCrossEntropyLossConfig::new().init(&device);

    for epoch in 0..config.epochs {
        info!(epoch, num_batches, "starting epoch");

        for index in 0..num_batches {
            let real = dataset.batch(index, config.batch_size, &device);

            // inference-only forward; nothing propagates back through this batch
            let noise = noise_batch::<B>(config.batch_size, noise_dim, &device);
            let synthetic = generator.forward(noise).detach();

            if snapshot_due(index) {
                let path = results_dir.join(format!("{epoch}_{index}.png"));
                write_snapshot(synthetic.clone(), &path)?;
            }

            let d_loss = discriminator_step(
                real,
                synthetic,
                &mut discriminator,
                &mut disc_optim,
                &bce,
                config.learning_rate,
                &device,
            );

            let noise = noise_batch::<B>(config.batch_size, noise_dim, &device);
            let g_loss = generator_step(
                noise,
                &mut generator,
                &discriminator,
                &mut gen_optim,
                &bce,
                config.learning_rate,
                &device,
            );

            info!(epoch, batch = index, d_loss, g_loss);

            if checkpoint_due(index) {
                save_checkpoints(&generator, &discriminator, weights_dir)?;
            }
        }
    }

    Ok(())
}

/// One discriminator update on a combined batch: real images labeled 1,
/// synthetic images labeled 0.
fn discriminator_step<B: AutodiffBackend, O: Optimizer<Discriminator<B>, B>>(
    real: Tensor<B, 4>,
    synthetic: Tensor<B, 4>,
    discriminator: &mut Discriminator<B>,
    optim: &mut O,
    bce: &BinaryCrossEntropyLoss<B>,
    learning_rate: f64,
    device: &B::Device,
) -> f32 {
    let batch_size = real.dims()[0];
    let combined = Tensor::cat(vec![real, synthetic], 0);

    let labels = real_fake_labels(batch_size);
    let targets = Tensor::<B, 2, Int>::from_data(
        TensorData::new(labels, [2 * batch_size, 1]),
        device,
    );

    let loss = bce.forward(discriminator.forward(combined), targets);
    let value = loss.clone().into_scalar().to_f32();

    let grads = GradientsParams::from_grads(loss.backward(), discriminator);
    *discriminator = optim.step(learning_rate, discriminator.clone(), grads);

    value
}

/// One generator update through the frozen discriminator, against all-ones
/// targets. Only generator gradients are extracted.
fn generator_step<B: AutodiffBackend, O: Optimizer<Generator<B>, B>>(
    noise: Tensor<B, 2>,
    generator: &mut Generator<B>,
    discriminator: &Discriminator<B>,
    optim: &mut O,
    bce: &BinaryCrossEntropyLoss<B>,
    learning_rate: f64,
    device: &B::Device,
) -> f32 {
    let batch_size = noise.dims()[0];

    let scores = discriminator.forward(generator.forward(noise));
    let targets = Tensor::<B, 2, Int>::ones([batch_size, 1], device);

    let loss = bce.forward(scores, targets);
    let value = loss.clone().into_scalar().to_f32();

    let grads = GradientsParams::from_grads(loss.backward(), generator);
    *generator = optim.step(learning_rate, generator.clone(), grads);

    value
}

fn write_snapshot<B: Backend>(synthetic: Tensor<B, 4>, path: &Path) -> Result<()> {
    let images = batch_to_images(synthetic)?;
    let grid = tile_images(&images)?;
    grid.save(path)
        .with_context(|| format!("failed to write snapshot {}", path.display()))?;
    info!(path = %path.display(), "wrote snapshot");
    Ok(())
}

fn save_checkpoints<B: AutodiffBackend>(
    generator: &Generator<B>,
    discriminator: &Discriminator<B>,
    weights_dir: &Path,
) -> Result<()> {
    let recorder = CompactRecorder::new();
    generator
        .clone()
        .save_file(weights_dir.join("generator"), &recorder)
        .context("failed to save generator checkpoint")?;
    discriminator
        .clone()
        .save_file(weights_dir.join("discriminator"), &recorder)
        .context("failed to save discriminator checkpoint")?;
    info!(dir = %weights_dir.display(), "wrote checkpoints");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_ones_then_zeros() {
        assert_eq!(real_fake_labels(3), vec![1, 1, 1, 0, 0, 0]);
    }

    #[test]
    fn snapshot_fires_on_multiples_of_twenty() {
        let due: Vec<usize> = (0..50).filter(|i| snapshot_due(*i)).collect();
        assert_eq!(due, vec![0, 20, 40]);
    }

    #[test]
    fn checkpoint_fires_on_ninth_index_of_each_block() {
        let due: Vec<usize> = (0..30).filter(|i| checkpoint_due(*i)).collect();
        assert_eq!(due, vec![9, 19, 29]);
    }

    #[test]
    fn one_epoch_of_ten_batches_has_one_snapshot_and_one_checkpoint() {
        // 100 images at batch size 10
        let batches: Vec<usize> = (0..10).collect();
        assert_eq!(batches.iter().filter(|i| snapshot_due(**i)).count(), 1);
        assert_eq!(batches.iter().filter(|i| checkpoint_due(**i)).count(), 1);
    }
}
