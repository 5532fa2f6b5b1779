use std::{cmp::Ordering, path::Path};

use anyhow::{ensure, Context, Result};
use burn::{
    config::Config,
    module::Module,
    record::CompactRecorder,
    tensor::{backend::Backend, Int, Tensor, TensorData},
};
use tracing::info;

use crate::{
    data::noise_batch,
    model::GanConfig,
    utils::{batch_to_images, tile_images},
};

#[derive(Config)]
pub struct SamplingConfig {
    pub model: GanConfig,
    pub weights_dir: String,
    pub output: String,

    #[config(default = 128)]
    pub batch_size: usize,
    /// Score the whole candidate pool with the discriminator and keep only
    /// the highest-rated images.
    #[config(default = false)]
    pub nice: bool,
    /// Candidate pool multiplier used when `nice` is set.
    #[config(default = 20)]
    pub oversample: usize,
}

/// Indices of the `count` highest scores, in descending score order.
/// Ties keep their original index order, so the result is deterministic.
pub fn rank_by_score(scores: &[f32], count: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.cmp(&b))
    });
    order.truncate(count);
    order
}

/// Samples a batch from a trained generator and writes one tiled PNG.
pub fn generate<B: Backend>(config: SamplingConfig, device: B::Device) -> Result<()> {
    ensure!(config.batch_size > 0, "batch size must be nonzero");

    let recorder = CompactRecorder::new();
    let weights_dir = Path::new(&config.weights_dir);
    let noise_dim = config.model.generator.noise_dim;

    let generator = config
        .model
        .generator
        .init::<B>(&device)
        .load_file(weights_dir.join("generator"), &recorder, &device)
        .with_context(|| {
            format!(
                "failed to load generator checkpoint from {}",
                weights_dir.display()
            )
        })?;

    let images = if config.nice {
        let discriminator = config
            .model
            .discriminator
            .init::<B>(&device)
            .load_file(weights_dir.join("discriminator"), &recorder, &device)
            .with_context(|| {
                format!(
                    "failed to load discriminator checkpoint from {}",
                    weights_dir.display()
                )
            })?;

        let pool = config.batch_size * config.oversample;
        let candidates = generator.forward(noise_batch::<B>(pool, noise_dim, &device));

        let scores = discriminator
            .forward(candidates.clone())
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("failed to read discriminator scores: {e:?}"))?;

        let best = rank_by_score(&scores, config.batch_size)
            .into_iter()
            .map(|i| i as i32)
            .collect::<Vec<_>>();
        let count = best.len();
        let indices = Tensor::<B, 1, Int>::from_data(TensorData::new(best, [count]), &device);

        candidates.select(0, indices)
    } else {
        generator.forward(noise_batch::<B>(config.batch_size, noise_dim, &device))
    };

    let tiles = batch_to_images(images)?;
    let grid = tile_images(&tiles)?;
    grid.save(&config.output)
        .with_context(|| format!("failed to write {}", config.output))?;
    info!(path = %config.output, nice = config.nice, "wrote generated image");

    Ok(())
}
