//! Download and extraction of the dataset archives

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::binary::split_files;
use super::{DatasetKind, Split};
use crate::utils::error::{Result, UncertaintyError};

/// Whether every file of both splits is already on disk
pub fn is_available(kind: DatasetKind, data_dir: &Path) -> bool {
    let root = data_dir.join(kind.extracted_dir());
    [Split::Train, Split::Test]
        .iter()
        .flat_map(|&split| split_files(kind, split))
        .all(|file| root.join(file).exists())
}

/// Make sure the dataset exists under `data_dir`, downloading it if allowed
pub fn ensure_dataset(kind: DatasetKind, data_dir: &Path, allow_download: bool) -> Result<PathBuf> {
    let root = data_dir.join(kind.extracted_dir());
    if is_available(kind, data_dir) {
        tracing::debug!("{} found at {:?}", kind, root);
        return Ok(root);
    }

    if !allow_download {
        return Err(UncertaintyError::Dataset(format!(
            "{} not found under {:?}; run the download command first",
            kind, data_dir
        )));
    }

    download_dataset(kind, data_dir)?;

    if !is_available(kind, data_dir) {
        return Err(UncertaintyError::Download(format!(
            "{} archive extracted but expected files are missing in {:?}",
            kind, root
        )));
    }
    Ok(root)
}

/// Download the archive for `kind` into `data_dir` and extract it
pub fn download_dataset(kind: DatasetKind, data_dir: &Path) -> Result<()> {
    fs::create_dir_all(data_dir)?;

    let url = kind.archive_url();
    let archive_name = url.rsplit('/').next().unwrap_or("dataset.tar.gz");
    let archive_path = data_dir.join(archive_name);

    if archive_path.exists() {
        tracing::info!("{} archive already exists, skipping download", kind);
    } else {
        tracing::info!("Downloading {} from {}", kind, url);

        let response = reqwest::blocking::get(url)
            .and_then(|r| r.error_for_status())
            .map_err(|e| UncertaintyError::Download(format!("Failed to download {}: {}", url, e)))?;

        let bytes = response
            .bytes()
            .map_err(|e| UncertaintyError::Download(format!("Failed to read response: {}", e)))?;

        // Interrupted downloads must not leave a complete-looking archive
        let partial_path = archive_path.with_extension("part");
        let mut file = File::create(&partial_path)?;
        file.write_all(&bytes)?;
        fs::rename(&partial_path, &archive_path)?;

        tracing::info!("Download complete ({} bytes)", bytes.len());
    }

    let extracted_dir = data_dir.join(kind.extracted_dir());
    if extracted_dir.exists() {
        tracing::info!("{} already extracted", kind);
    } else {
        tracing::info!("Extracting {}...", archive_name);
        extract_tar_gz(&archive_path, data_dir)?;
        tracing::info!("Extraction complete");
    }

    Ok(())
}

/// Extract a `.tar.gz` archive into `output_dir`
pub fn extract_tar_gz(tar_gz_path: &Path, output_dir: &Path) -> Result<()> {
    let tar_gz = File::open(tar_gz_path)?;
    let decompressor = flate2::read::GzDecoder::new(tar_gz);
    let mut archive = tar::Archive::new(decompressor);

    archive
        .unpack(output_dir)
        .map_err(|e| UncertaintyError::Download(format!("Failed to extract {:?}: {}", tar_gz_path, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{write::GzEncoder, Compression};

    #[test]
    fn test_missing_dataset_without_download_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_available(DatasetKind::Cifar10, dir.path()));
        assert!(ensure_dataset(DatasetKind::Cifar10, dir.path(), false).is_err());
    }

    #[test]
    fn test_existing_files_are_detected() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("stl10_binary");
        fs::create_dir_all(&root).unwrap();
        for name in ["train_X.bin", "train_y.bin", "test_X.bin", "test_y.bin"] {
            fs::write(root.join(name), b"").unwrap();
        }

        assert!(is_available(DatasetKind::Stl10, dir.path()));
        assert_eq!(ensure_dataset(DatasetKind::Stl10, dir.path(), false).unwrap(), root);
    }

    #[test]
    fn test_extract_tar_gz() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("data.tar.gz");

        {
            let file = File::create(&archive_path).unwrap();
            let encoder = GzEncoder::new(file, Compression::default());
            let mut builder = tar::Builder::new(encoder);

            let payload = b"hello";
            let mut header = tar::Header::new_gnu();
            header.set_size(payload.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, "cifar-100-binary/test.bin", &payload[..])
                .unwrap();
            builder.into_inner().unwrap().finish().unwrap();
        }

        let out = dir.path().join("out");
        fs::create_dir_all(&out).unwrap();
        extract_tar_gz(&archive_path, &out).unwrap();

        let extracted = fs::read(out.join("cifar-100-binary/test.bin")).unwrap();
        assert_eq!(extracted, b"hello");
    }
}
