/// Reads and writes feature-vector collections as JSON arrays-of-arrays,
/// one row per image. Files are named by the UTC wall clock at second
/// granularity, matching the exchange format consumed by the trainer.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::info;

use crate::error::{Error, Result};

pub const VECTOR_FILE_PREFIX: &str = "image_vector_";
pub const VECTOR_FILE_EXTENSION: &str = "json";

/// Serializes `rows` to a new timestamp-named file inside `directory` and
/// returns the path written.
///
/// The timestamp has second granularity, so two writes to the same
/// directory within the same second silently overwrite each other. That is
/// a known limitation of the format, acceptable for a single-shot batch
/// run, and deliberately not corrected here.
pub fn write_vectors(directory: &Path, rows: &[Vec<f32>]) -> Result<PathBuf> {
    let stamp = Utc::now().format("%Y%m%d-%H%M%S");
    let path = directory.join(format!("{VECTOR_FILE_PREFIX}{stamp}.{VECTOR_FILE_EXTENSION}"));

    let file = File::create(&path).map_err(|source| Error::UnreadableVectorFile {
        path: path.clone(),
        source,
    })?;
    serde_json::to_writer(BufWriter::new(file), rows)?;

    info!("Vector data written to {:?}", path);
    Ok(path)
}

/// Loads a previously written vector collection, preserving row order and
/// values. Fails if the path is missing or unreadable.
pub fn read_vectors(path: &Path) -> Result<Vec<Vec<f32>>> {
    let file = File::open(path).map_err(|source| Error::UnreadableVectorFile {
        path: path.to_path_buf(),
        source,
    })?;
    let rows = serde_json::from_reader(BufReader::new(file))?;

    info!("Vector file {:?} successfully read", path);
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_rows_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let rows = vec![
            vec![0.25, 0.75, 0.0],
            vec![0.0, 0.0, 1.0],
            vec![0.5, 0.25, 0.25],
        ];

        let path = write_vectors(dir.path(), &rows).unwrap();
        assert_eq!(read_vectors(&path).unwrap(), rows);
    }

    #[test]
    fn file_name_embeds_prefix_and_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_vectors(dir.path(), &[vec![1.0]]).unwrap();

        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with(VECTOR_FILE_PREFIX));
        assert!(name.ends_with(".json"));
        // image_vector_YYYYMMDD-HHMMSS.json
        let stamp = &name[VECTOR_FILE_PREFIX.len()..name.len() - ".json".len()];
        assert_eq!(stamp.len(), 15);
        assert_eq!(&stamp[8..9], "-");
    }

    #[test]
    fn missing_file_is_a_vector_file_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("image_vector_20200101-000000.json");
        assert!(matches!(
            read_vectors(&missing),
            Err(Error::UnreadableVectorFile { .. })
        ));
    }

    #[test]
    fn empty_row_collection_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_vectors(dir.path(), &[]).unwrap();
        assert_eq!(read_vectors(&path).unwrap(), Vec::<Vec<f32>>::new());
    }
}
