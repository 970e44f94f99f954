pub mod batch;
pub mod error;
pub mod features;
pub mod model;
pub mod partition;
pub mod pipeline;
pub mod store;
pub mod trainer;

pub use error::{Error, Result};
pub use features::{FeatureVector, HistogramExtractor, DEFAULT_BLOCKS};
pub use model::{HyperParams, SvmKernel, TrainedModel};
pub use partition::{split_batch, ChunkMap};
pub use trainer::{TrainerConfig, TrainingReport};
