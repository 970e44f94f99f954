use std::path::PathBuf;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

/// Every failure in this pipeline is terminal: the run aborts with a
/// diagnostic and a non-zero exit status. Transient and permanent I/O
/// failures are not distinguished.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Bincode(#[from] bincode::Error),
    #[error(transparent)]
    Linfa(#[from] linfa::Error),
    #[error(transparent)]
    Svm(#[from] linfa_svm::SvmError),
    #[error("no files matching *{pattern} in {path:?}")]
    InputNotFound { path: PathBuf, pattern: String },
    #[error("vector file {path:?} could not be read or written")]
    UnreadableVectorFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("image color mode {mode} is not supported; only 8-bit RGB input is accepted")]
    UnsupportedImageFormat { mode: String },
    #[error("image has no pixels")]
    EmptyImage,
    #[error(
        "mismatched input groups: {vector_file:?} is a vector file but {image_dir:?} is not; \
         both groups must be image directories or both must be vector files"
    )]
    MismatchedInputTypes {
        vector_file: PathBuf,
        image_dir: PathBuf,
    },
    #[error("no labeled vectors to train on")]
    EmptyTrainingSet,
    #[error("the {subset} subset contains a single class after the split; both labels are required")]
    SingleClassSplit { subset: &'static str },
    #[error("block count {0} is invalid; it must be at least 1 and divide 256 evenly")]
    InvalidBlockCount(u32),
    #[error("feature vectors disagree on length: expected {expected}, found {found}")]
    InconsistentVectorLength { expected: usize, found: usize },
    #[error("hyperparameter search exceeded its {0:?} deadline")]
    GridSearchDeadline(Duration),
    #[error("not a classifier model file (unrecognized format tag)")]
    ModelFormatTag,
    #[error("unsupported classifier model format version {0}")]
    ModelFormatVersion(u32),
}
