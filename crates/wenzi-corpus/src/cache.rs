//! # Corpus cache
//!
//! Downloads corpus archives once and keeps them under a data directory.
//! The directory defaults to `$WENZI_DATA_DIR`, then the platform data dir.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tracing::{debug, info};

use crate::error::{CorpusError, Result};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "WENZI_DATA_DIR";

/// Default data directory.
pub fn default_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("wenzi")
}

/// Local store of downloaded datasets.
#[derive(Debug, Clone)]
pub struct CorpusCache {
    data_dir: PathBuf,
}

impl Default for CorpusCache {
    fn default() -> Self {
        Self::new(default_data_dir())
    }
}

impl CorpusCache {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Directory holding downloaded and extracted datasets.
    pub fn datasets_dir(&self) -> PathBuf {
        self.data_dir.join("datasets")
    }

    /// Path of a dataset that may or may not be present yet.
    pub fn dataset_path(&self, name: &str) -> PathBuf {
        self.datasets_dir().join(name)
    }

    /// Whether `name` is already available locally.
    pub fn contains(&self, name: &str) -> bool {
        self.dataset_path(name).exists()
    }

    /// Fetch `url` as `name`, downloading only when absent.
    ///
    /// With `untar` the file is treated as a `.tar.gz` archive whose top
    /// level directory is `name`; the extracted directory is returned.
    /// Otherwise the downloaded file itself is returned.
    pub fn get_file(&self, name: &str, url: &str, untar: bool) -> Result<PathBuf> {
        let datasets = self.datasets_dir();
        fs::create_dir_all(&datasets)?;

        let target = datasets.join(name);
        let download_path = if untar {
            datasets.join(format!("{name}.tar.gz"))
        } else {
            target.clone()
        };

        if untar && target.exists() {
            debug!(path = %target.display(), "using cached corpus");
            return Ok(target);
        }

        if !download_path.exists() {
            download(url, &download_path)?;
        }

        if untar {
            extract_tar_gz(&download_path, &datasets)?;
            if !target.exists() {
                return Err(CorpusError::MissingFile(target.display().to_string()));
            }
        }

        Ok(target)
    }

    /// Remove every cached dataset. Returns whether anything was removed.
    pub fn clean(&self) -> Result<bool> {
        let datasets = self.datasets_dir();
        if !datasets.exists() {
            return Ok(false);
        }
        fs::remove_dir_all(&datasets)?;
        info!(path = %datasets.display(), "removed cached datasets");
        Ok(true)
    }
}

/// Stream `url` into `path` through a temporary file.
fn download(url: &str, path: &Path) -> Result<()> {
    info!(%url, path = %path.display(), "downloading corpus");

    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|source| CorpusError::Download {
            url: url.to_string(),
            source,
        })?;

    let partial = path.with_extension("part");
    {
        let mut writer = BufWriter::new(File::create(&partial)?);
        response
            .copy_to(&mut writer)
            .map_err(|source| CorpusError::Download {
                url: url.to_string(),
                source,
            })?;
    }
    fs::rename(&partial, path)?;

    debug!(path = %path.display(), "download complete");
    Ok(())
}

/// Unpack a gzip-compressed tarball into `dest`.
pub fn extract_tar_gz(archive: &Path, dest: &Path) -> Result<()> {
    info!(archive = %archive.display(), dest = %dest.display(), "extracting corpus");
    let decoder = GzDecoder::new(File::open(archive)?);
    tar::Archive::new(decoder).unpack(dest)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;

    fn write_archive(path: &Path, name: &str, files: &[(&str, &str)]) {
        let encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (file, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, format!("{name}/{file}"), content.as_bytes())
                .unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn test_get_file_extracts_cached_archive() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CorpusCache::new(dir.path());
        fs::create_dir_all(cache.datasets_dir()).unwrap();
        write_archive(
            &cache.datasets_dir().join("toy.tar.gz"),
            "toy",
            &[("example.train", "海 O\n\n")],
        );

        // The archive is already present, so the URL is never contacted.
        let path = cache.get_file("toy", "http://invalid.localhost/toy.tar.gz", true).unwrap();
        assert_eq!(path, cache.dataset_path("toy"));
        assert!(path.join("example.train").exists());
        assert!(cache.contains("toy"));
    }

    #[test]
    fn test_get_file_uses_extracted_dir() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CorpusCache::new(dir.path());
        fs::create_dir_all(cache.dataset_path("ready")).unwrap();

        let path = cache.get_file("ready", "http://invalid.localhost/ready.tar.gz", true).unwrap();
        assert_eq!(path, cache.dataset_path("ready"));
    }

    #[test]
    fn test_archive_without_expected_dir() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CorpusCache::new(dir.path());
        fs::create_dir_all(cache.datasets_dir()).unwrap();
        write_archive(&cache.datasets_dir().join("odd.tar.gz"), "other", &[("a.csv", "x")]);

        let err = cache.get_file("odd", "http://invalid.localhost/odd.tar.gz", true).unwrap_err();
        assert!(matches!(err, CorpusError::MissingFile(_)));
    }

    #[test]
    fn test_clean() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CorpusCache::new(dir.path());
        assert!(!cache.clean().unwrap());

        fs::create_dir_all(cache.dataset_path("x")).unwrap();
        assert!(cache.clean().unwrap());
        assert!(!cache.contains("x"));
    }
}
