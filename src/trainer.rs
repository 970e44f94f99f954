/// Classifier training: labeling, train/test split, exhaustive
/// hyperparameter search with cross-validated scoring, final fit, and
/// persistence.

use std::path::Path;
use std::time::{Duration, Instant};

use linfa::dataset::Dataset;
use linfa::prelude::*;
use linfa_svm::Svm;
use log::{debug, info};
use ndarray::{Array1, Ix1};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::error::{Error, Result};
use crate::features::FeatureVector;
use crate::model::{self, HyperParams, SvmKernel, TrainedModel};

/// The fixed search space: 2 kernels x 4 C values x 3 gamma values, 24
/// combinations, enumerated kernels-outermost. Ties in cross-validation
/// score are broken in favor of the first-encountered combination in this
/// order.
pub const KERNEL_GRID: [SvmKernel; 2] = [SvmKernel::Linear, SvmKernel::Rbf];
pub const C_GRID: [f32; 4] = [1.0, 10.0, 100.0, 1000.0];
pub const GAMMA_GRID: [f32; 3] = [0.01, 0.001, 0.0001];

pub const DEFAULT_CV_FOLDS: usize = 3;
const SPLIT_RATIO: f32 = 0.5;

#[derive(Debug, Clone, Copy)]
pub struct TrainerConfig {
    /// Seed for the train/test shuffle. `None` draws from entropy, which is
    /// non-deterministic across runs; tests that care about reproducibility
    /// must set a seed.
    pub split_seed: Option<u64>,
    /// Fold count for cross-validated scoring during the grid search.
    pub cv_folds: usize,
    /// Wall-clock bound on the whole grid search, the only
    /// unbounded-duration step in the pipeline. `None` means unbounded.
    pub search_deadline: Option<Duration>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            split_seed: None,
            cv_folds: DEFAULT_CV_FOLDS,
            search_deadline: None,
        }
    }
}

/// What a training run measured, alongside the persisted model.
#[derive(Debug, Clone, Copy)]
pub struct TrainingReport {
    pub selected: HyperParams,
    /// Mean cross-validated accuracy of the selected combination on the
    /// training subset.
    pub cv_accuracy: f32,
    /// Accuracy of the final model on the held-out subset. Reported for
    /// diagnostics only; it plays no part in model selection.
    pub holdout_accuracy: f32,
    pub train_samples: usize,
    pub holdout_samples: usize,
}

/// Trains a binary classifier from a positive and a negative vector
/// collection.
///
/// The collections are concatenated (positives labeled `true`, negatives
/// `false`, no rebalancing), shuffled, and split 50/50 into a training and
/// a held-out subset. Every grid combination is scored by k-fold
/// cross-validation on the training subset; the best scorer is refit on the
/// full training subset and evaluated once against the held-out subset.
pub fn train(
    positives: &[FeatureVector],
    negatives: &[FeatureVector],
    config: &TrainerConfig,
) -> Result<(TrainedModel, TrainingReport)> {
    let dataset = build_labeled_dataset(positives, negatives)?;

    let mut rng = match config.split_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let (train_set, holdout_set) = dataset.shuffle(&mut rng).split_with_ratio(SPLIT_RATIO);

    // Grid-search scoring needs both classes in every subset it touches;
    // fail fast with something diagnosable instead of a meaningless score.
    ensure_both_classes(&train_set, "training")?;
    ensure_both_classes(&holdout_set, "held-out")?;

    let (selected, cv_accuracy) = grid_search(&train_set, config)?;
    info!(
        "Selected {} (cross-validated accuracy {:.3})",
        selected, cv_accuracy
    );

    let svm = fit_svm(&train_set, &selected)?;
    let predictions = svm.predict(&holdout_set);
    let holdout_accuracy = predictions.confusion_matrix(&holdout_set)?.accuracy();
    info!("Held-out accuracy: {:.3}", holdout_accuracy);

    let report = TrainingReport {
        selected,
        cv_accuracy,
        holdout_accuracy,
        train_samples: train_set.nsamples(),
        holdout_samples: holdout_set.nsamples(),
    };
    Ok((TrainedModel::new(selected, svm), report))
}

/// [`train`], then persist the model envelope to `output`, overwriting any
/// existing file there.
pub fn train_to_file(
    positives: &[FeatureVector],
    negatives: &[FeatureVector],
    output: &Path,
    config: &TrainerConfig,
) -> Result<TrainingReport> {
    let (model, report) = train(positives, negatives, config)?;
    model.save(output)?;
    Ok(report)
}

/// Concatenates positives then negatives into a labeled dataset. Class
/// sizes may differ arbitrarily; no rebalancing is applied.
fn build_labeled_dataset(
    positives: &[FeatureVector],
    negatives: &[FeatureVector],
) -> Result<Dataset<f32, bool, Ix1>> {
    if positives.is_empty() && negatives.is_empty() {
        return Err(Error::EmptyTrainingSet);
    }

    let rows: Vec<FeatureVector> = positives.iter().chain(negatives).cloned().collect();
    let records = model::rows_to_records(&rows)?;
    let targets = Array1::from_iter(
        std::iter::repeat(true)
            .take(positives.len())
            .chain(std::iter::repeat(false).take(negatives.len())),
    );
    Ok(Dataset::new(records, targets))
}

fn ensure_both_classes(dataset: &Dataset<f32, bool, Ix1>, subset: &'static str) -> Result<()> {
    let has_positive = dataset.targets().iter().any(|&label| label);
    let has_negative = dataset.targets().iter().any(|&label| !label);
    if has_positive && has_negative {
        Ok(())
    } else {
        Err(Error::SingleClassSplit { subset })
    }
}

/// Evaluates every combination in the search space and returns the best
/// one with its score.
///
/// The 24 evaluations are independent and run in parallel; the reduction
/// afterwards is sequential and keeps the first-encountered combination on
/// ties, regardless of completion order. The optional deadline is checked
/// as each evaluation starts, so a stuck search fails instead of running
/// unbounded.
fn grid_search(
    train_set: &Dataset<f32, bool, Ix1>,
    config: &TrainerConfig,
) -> Result<(HyperParams, f32)> {
    let combinations: Vec<HyperParams> = KERNEL_GRID
        .iter()
        .flat_map(|&kernel| {
            C_GRID.iter().flat_map(move |&c| {
                GAMMA_GRID
                    .iter()
                    .map(move |&gamma| HyperParams { kernel, c, gamma })
            })
        })
        .collect();

    // Leave-one-out at worst when the training subset is tiny.
    let folds = config.cv_folds.min(train_set.nsamples()).max(2);
    let started = Instant::now();

    let scores: Vec<f32> = combinations
        .par_iter()
        .map(|params| {
            if let Some(deadline) = config.search_deadline {
                if started.elapsed() >= deadline {
                    return Err(Error::GridSearchDeadline(deadline));
                }
            }
            let score = cross_validate(train_set, params, folds)?;
            debug!("{} scored {:.3}", params, score);
            Ok(score)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut best = 0;
    for (index, &score) in scores.iter().enumerate() {
        if score > scores[best] {
            best = index;
        }
    }
    Ok((combinations[best], scores[best]))
}

/// Mean accuracy over k sequential folds of the (already shuffled)
/// training subset.
fn cross_validate(
    train_set: &Dataset<f32, bool, Ix1>,
    params: &HyperParams,
    folds: usize,
) -> Result<f32> {
    let mut total = 0.0f32;
    let splits = train_set.fold(folds);
    let count = splits.len();
    for (fit_set, valid_set) in splits {
        let svm = fit_svm(&fit_set, params)?;
        let predictions = svm.predict(&valid_set);
        total += predictions.confusion_matrix(&valid_set)?.accuracy();
    }
    Ok(total / count as f32)
}

fn fit_svm(dataset: &Dataset<f32, bool, Ix1>, params: &HyperParams) -> Result<Svm<f32, bool>> {
    let svm_params = Svm::<f32, bool>::params().pos_neg_weights(params.c, params.c);
    let svm_params = match params.kernel {
        SvmKernel::Linear => svm_params.linear_kernel(),
        SvmKernel::Rbf => svm_params.gaussian_kernel(params.gaussian_eps()),
    };
    Ok(svm_params.fit(dataset)?)
}
