/// End-to-end batch run: classify the two input groups, turn each into a
/// vector collection (extracting from images or loading a vector file),
/// then hand both collections to the trainer.

use std::path::{Path, PathBuf};

use log::info;

use crate::batch::{self, ExtractionConfig};
use crate::error::{Error, Result};
use crate::features::FeatureVector;
use crate::store;
use crate::trainer::{self, TrainerConfig, TrainingReport};

pub const DEFAULT_IMAGE_EXTENSION: &str = ".jpg";

/// How a group path is interpreted: a `.json` path is a previously written
/// vector file, anything else is a directory of images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputGroup {
    Images(PathBuf),
    Vectors(PathBuf),
}

impl InputGroup {
    pub fn classify(path: &Path) -> Self {
        let is_vector_file = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case(store::VECTOR_FILE_EXTENSION))
            .unwrap_or(false);
        if is_vector_file {
            InputGroup::Vectors(path.to_path_buf())
        } else {
            InputGroup::Images(path.to_path_buf())
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Image filename extension to match in directory groups, e.g. ".jpg".
    pub extension: String,
    pub extraction: ExtractionConfig,
    pub trainer: TrainerConfig,
}

/// Runs the whole pipeline: two input groups in, one model file out.
///
/// Group A supplies the positive class, group B the negative class. Both
/// groups must be of the same kind; a vector file paired with an image
/// directory terminates the run before any extraction or training happens,
/// and without creating a model file. Directory groups are discovered up
/// front so that an unusable group is diagnosed before any extraction
/// begins.
pub fn run(
    group_a: &Path,
    group_b: &Path,
    model_out: &Path,
    config: &PipelineConfig,
) -> Result<TrainingReport> {
    let (vectors_a, vectors_b) =
        match (InputGroup::classify(group_a), InputGroup::classify(group_b)) {
            (InputGroup::Vectors(a), InputGroup::Vectors(b)) => {
                (store::read_vectors(&a)?, store::read_vectors(&b)?)
            }
            (InputGroup::Images(a), InputGroup::Images(b)) => {
                extract_groups(&a, &b, config)?
            }
            (InputGroup::Vectors(vector_file), InputGroup::Images(image_dir))
            | (InputGroup::Images(image_dir), InputGroup::Vectors(vector_file)) => {
                return Err(Error::MismatchedInputTypes {
                    vector_file,
                    image_dir,
                })
            }
        };

    info!(
        "Training on {} positive and {} negative vectors",
        vectors_a.len(),
        vectors_b.len()
    );
    trainer::train_to_file(&vectors_a, &vectors_b, model_out, &config.trainer)
}

/// Extracts both image groups, writing each group's vector file back into
/// its directory so later runs can reuse it.
fn extract_groups(
    dir_a: &Path,
    dir_b: &Path,
    config: &PipelineConfig,
) -> Result<(Vec<FeatureVector>, Vec<FeatureVector>)> {
    let files_a = batch::discover_images(dir_a, &config.extension)?;
    let files_b = batch::discover_images(dir_b, &config.extension)?;

    // Two empty groups mean there is nothing at all to train on; a single
    // empty group is a missing-input problem in that group.
    if files_a.is_empty() && files_b.is_empty() {
        return Err(Error::EmptyTrainingSet);
    }
    for (files, dir) in [(&files_a, dir_a), (&files_b, dir_b)] {
        if files.is_empty() {
            return Err(Error::InputNotFound {
                path: dir.to_path_buf(),
                pattern: config.extension.clone(),
            });
        }
    }

    info!(
        "Extracting {} + {} images with block count {} across {} workers",
        files_a.len(),
        files_b.len(),
        config.extraction.blocks,
        config.extraction.workers
    );
    let now = std::time::Instant::now();
    let vectors_a = batch::extract_batch(&files_a, &config.extraction)?;
    let vectors_b = batch::extract_batch(&files_b, &config.extraction)?;
    info!("Extraction took {:?}", now.elapsed());

    store::write_vectors(dir_a, &vectors_a)?;
    store::write_vectors(dir_b, &vectors_b)?;

    Ok((vectors_a, vectors_b))
}
