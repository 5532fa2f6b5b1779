pub mod discriminator;
pub mod generator;
mod layers;

use burn::prelude::*;

use crate::model::{discriminator::DiscriminatorConfig, generator::GeneratorConfig};

/// Configuration for the adversarial pair.
#[derive(Config, Debug)]
pub struct GanConfig {
    pub generator: GeneratorConfig,
    pub discriminator: DiscriminatorConfig,
}
