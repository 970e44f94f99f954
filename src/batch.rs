/// Batch feature extraction: directory discovery, partitioning across
/// workers, parallel per-chunk extraction, and the order-preserving merge.

use std::path::{Path, PathBuf};

use log::debug;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use walkdir::WalkDir;

use crate::error::Result;
use crate::features::{FeatureVector, HistogramExtractor};
use crate::partition;

/// Settings for one extraction run. The worker count is explicit rather
/// than read from the environment; the CLI defaults it from
/// `std::thread::available_parallelism()`.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionConfig {
    pub blocks: u32,
    pub workers: usize,
}

/// Lists the files directly inside `directory` whose name ends with
/// `extension` (case-insensitive), sorted by path so that extraction order
/// is deterministic. Subdirectories are not descended into.
pub fn discover_images(directory: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let extension = extension.to_ascii_lowercase();
    let mut files = Vec::new();
    for entry in WalkDir::new(directory).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| match e.into_io_error() {
            Some(io) => crate::error::Error::Io(io),
            None => std::io::Error::new(std::io::ErrorKind::Other, "directory walk failed").into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .file_name()
            .to_str()
            .map(|name| name.to_ascii_lowercase().ends_with(&extension))
            .unwrap_or(false);
        if matches {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Extracts feature vectors for every file in `files`, in order.
///
/// The batch is partitioned into per-worker chunks and each chunk runs as an
/// independent rayon task with no shared mutable state: a task opens each of
/// its image files in turn, decodes it, computes the vector, and drops the
/// handle before moving on. Per-worker results are merged in ascending
/// worker order, so the output matches a single-threaded run exactly.
///
/// Any file that fails to decode or extract aborts the whole batch; this is
/// a single-shot pipeline with no partial-result recovery.
pub fn extract_batch(files: &[PathBuf], config: &ExtractionConfig) -> Result<Vec<FeatureVector>> {
    let extractor = HistogramExtractor::new(config.blocks)?;
    let chunks = partition::split_batch(files, config.workers);
    debug!(
        "Extracting {} files across {} workers",
        files.len(),
        chunks.len()
    );

    let mut per_worker: Vec<(usize, Vec<FeatureVector>)> = chunks
        .into_ordered_chunks()
        .into_par_iter()
        .map(|(worker, chunk)| {
            let vectors = chunk
                .iter()
                .map(|path| {
                    let image = image::open(path)?;
                    extractor.extract(&image)
                })
                .collect::<Result<Vec<_>>>()?;
            Ok((worker, vectors))
        })
        .collect::<Result<Vec<_>>>()?;

    // The single synchronization point: merge in ascending worker index.
    per_worker.sort_by_key(|&(worker, _)| worker);
    Ok(per_worker
        .into_iter()
        .flat_map(|(_, vectors)| vectors)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn write_solid_image(dir: &Path, name: &str, rgb: [u8; 3]) -> PathBuf {
        let path = dir.join(name);
        RgbImage::from_pixel(4, 4, Rgb(rgb)).save(&path).unwrap();
        path
    }

    #[test]
    fn discovery_filters_by_extension_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        write_solid_image(dir.path(), "b.png", [0, 0, 0]);
        write_solid_image(dir.path(), "a.png", [0, 0, 0]);
        write_solid_image(dir.path(), "c.bmp", [0, 0, 0]);
        std::fs::write(dir.path().join("notes.txt"), "not an image").unwrap();

        let found = discover_images(dir.path(), ".png").unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["a.png", "b.png"]);
    }

    #[test]
    fn discovery_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        write_solid_image(dir.path(), "UPPER.PNG", [1, 2, 3]);
        let found = discover_images(dir.path(), ".png").unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn parallel_extraction_preserves_input_order() {
        let dir = tempfile::tempdir().unwrap();
        // One distinct gray level per file; each lands in a different bin
        // pattern so ordering mistakes are visible in the output.
        let mut files = Vec::new();
        for i in 0..9u8 {
            let level = i * 28;
            files.push(write_solid_image(
                dir.path(),
                &format!("img_{i}.png"),
                [level, level, level],
            ));
        }

        let config = ExtractionConfig {
            blocks: 4,
            workers: 3,
        };
        let parallel = extract_batch(&files, &config).unwrap();
        let serial = extract_batch(&files, &ExtractionConfig { blocks: 4, workers: 1 }).unwrap();
        assert_eq!(parallel, serial);
        assert_eq!(parallel.len(), files.len());
    }

    #[test]
    fn non_rgb_file_aborts_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray.png");
        image::GrayImage::from_pixel(2, 2, image::Luma([7]))
            .save(&path)
            .unwrap();

        let config = ExtractionConfig {
            blocks: 4,
            workers: 2,
        };
        assert!(extract_batch(&[path], &config).is_err());
    }
}
