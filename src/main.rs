mod data;
mod model;
mod sampling;
mod training;
mod utils;

use std::process::ExitCode;

use anyhow::Result;
use burn::{
    backend::{ndarray::NdArrayDevice, Autodiff, NdArray},
    optim::{momentum::MomentumConfig, SgdConfig},
};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::{
    model::{discriminator::DiscriminatorConfig, generator::GeneratorConfig, GanConfig},
    sampling::SamplingConfig,
    training::TrainingConfig,
};

type NdBackend = NdArray<f32>;
type AutodiffNdBackend = Autodiff<NdBackend>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Run the adversarial training loop over MNIST
    Train,
    /// Sample images from saved checkpoints
    Generate,
}

#[derive(Parser, Debug)]
#[command(name = "dcgan-mnist", about = "DCGAN trainer and sampler for handwritten digits")]
struct Cli {
    /// Operation to run
    #[arg(long, value_enum)]
    mode: Mode,

    /// Batch size for training or sampling
    #[arg(long = "batch_size", default_value_t = 128)]
    batch_size: usize,

    /// In generate mode, keep only the images the discriminator rates highest
    #[arg(long)]
    nice: bool,

    /// Number of training epochs
    #[arg(long, default_value_t = 50)]
    epochs: usize,

    /// Checkpoint directory shared by both modes
    #[arg(long, default_value = "weights")]
    weights_dir: String,

    /// Directory for training progress snapshots
    #[arg(long, default_value = "results")]
    results_dir: String,

    /// Output path for the generated image
    #[arg(long, default_value = "generated_image.png")]
    output: String,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run(cli: Cli) -> Result<()> {
    let device = NdArrayDevice::default();
    let model = GanConfig::new(GeneratorConfig::new(), DiscriminatorConfig::new());

    match cli.mode {
        Mode::Train => {
            let optimizer = SgdConfig::new().with_momentum(Some(
                MomentumConfig::new().with_momentum(0.9).with_nesterov(true),
            ));
            let config = TrainingConfig::new(model, optimizer, cli.weights_dir, cli.results_dir)
                .with_epochs(cli.epochs)
                .with_batch_size(cli.batch_size);
            training::train::<AutodiffNdBackend>(config, device)
        }
        Mode::Generate => {
            let config = SamplingConfig::new(model, cli.weights_dir, cli.output)
                .with_batch_size(cli.batch_size)
                .with_nice(cli.nice);
            sampling::generate::<NdBackend>(config, device)
        }
    }
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
