/// Persisted classifier models.
///
/// A model file is a small versioned envelope rather than a bare serialized
/// blob: a 4-byte format tag, a little-endian format version, then the
/// bincode payload holding the fitted SVM and the hyperparameter
/// combination the search selected. Loading verifies tag and version
/// before touching the payload, so a file from an incompatible build fails
/// with a diagnosable error instead of a deserialization panic deep inside
/// the payload.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use linfa::prelude::*;
use linfa_svm::Svm;
use log::info;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::features::FeatureVector;

pub const MODEL_FORMAT_TAG: &[u8; 4] = b"HSVM";
pub const MODEL_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SvmKernel {
    Linear,
    Rbf,
}

impl fmt::Display for SvmKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SvmKernel::Linear => write!(f, "linear"),
            SvmKernel::Rbf => write!(f, "rbf"),
        }
    }
}

/// One point in the hyperparameter search space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HyperParams {
    pub kernel: SvmKernel,
    pub c: f32,
    pub gamma: f32,
}

impl HyperParams {
    /// linfa's Gaussian kernel computes exp(-||a - b||^2 / eps), while the
    /// search space is expressed in sklearn-style gamma where the kernel is
    /// exp(-gamma * ||a - b||^2). The two coincide at eps = 1 / gamma.
    pub(crate) fn gaussian_eps(&self) -> f32 {
        1.0 / self.gamma
    }
}

impl fmt::Display for HyperParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "kernel={} C={} gamma={}",
            self.kernel, self.c, self.gamma
        )
    }
}

/// A fitted binary classifier plus the hyperparameters chosen by the grid
/// search. Created once per training run and never mutated afterwards.
#[derive(Serialize, Deserialize)]
pub struct TrainedModel {
    params: HyperParams,
    svm: Svm<f32, bool>,
}

impl TrainedModel {
    pub(crate) fn new(params: HyperParams, svm: Svm<f32, bool>) -> Self {
        TrainedModel { params, svm }
    }

    pub fn params(&self) -> HyperParams {
        self.params
    }

    /// Classifies a batch of feature vectors; `true` is the positive class.
    pub fn predict(&self, vectors: &[FeatureVector]) -> Result<Vec<bool>> {
        if vectors.is_empty() {
            return Ok(Vec::new());
        }
        let records = rows_to_records(vectors)?;
        Ok(self.svm.predict(&records).to_vec())
    }

    pub fn predict_one(&self, vector: &FeatureVector) -> Result<bool> {
        Ok(self.predict(std::slice::from_ref(vector))?[0])
    }

    /// Writes the model envelope to `path`, overwriting any existing file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(MODEL_FORMAT_TAG)?;
        writer.write_all(&MODEL_FORMAT_VERSION.to_le_bytes())?;
        bincode::serialize_into(&mut writer, self)?;
        writer.flush()?;

        info!("Classifier model written to {:?}", path);
        Ok(())
    }

    /// Loads a model envelope previously written by [`TrainedModel::save`].
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);

        let mut tag = [0u8; 4];
        reader.read_exact(&mut tag)?;
        if &tag != MODEL_FORMAT_TAG {
            return Err(Error::ModelFormatTag);
        }

        let mut version = [0u8; 4];
        reader.read_exact(&mut version)?;
        let version = u32::from_le_bytes(version);
        if version != MODEL_FORMAT_VERSION {
            return Err(Error::ModelFormatVersion(version));
        }

        Ok(bincode::deserialize_from(reader)?)
    }
}

/// Stacks equally sized rows into a `(rows, dimension)` record array,
/// rejecting ragged input.
pub(crate) fn rows_to_records(rows: &[FeatureVector]) -> Result<Array2<f32>> {
    let dimension = rows.first().map(Vec::len).unwrap_or(0);
    let mut data = Vec::with_capacity(rows.len() * dimension);
    for row in rows {
        if row.len() != dimension {
            return Err(Error::InconsistentVectorLength {
                expected: dimension,
                found: row.len(),
            });
        }
        data.extend_from_slice(row);
    }
    Array2::from_shape_vec((rows.len(), dimension), data).map_err(|e| Error::Linfa(e.into()))
}
