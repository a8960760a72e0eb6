//! Directory-backed workload of generated binary files
//!
//! Files are named `file_NNNNNN.bin` (six-digit, zero-padded index). The
//! content of file `i` depends only on the workload seed and `i`, so
//! regenerating a directory yields identical bytes and existing files are
//! never rewritten.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::source::WorkloadSource;
use crate::utils::{BenchError, Result};

/// Bytes per generated file unless configured otherwise
pub const DEFAULT_FILE_LEN: u64 = 64 * 1024;

/// Seed every generated workload derives its content from
pub const WORKLOAD_SEED: u64 = 42;

/// Only files with this extension are picked up
pub const FILE_EXTENSION: &str = "bin";

/// Generation writes in chunks of this size
const WRITE_CHUNK: usize = 64 * 1024;

/// Workload stored as files in one directory
#[derive(Debug, Clone)]
pub struct FileWorkload {
    dir: PathBuf,
    file_len: u64,
    generate: bool,
}

impl FileWorkload {
    /// Workload in `dir` with the default file length, generating missing files
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            file_len: DEFAULT_FILE_LEN,
            generate: true,
        }
    }

    pub fn with_file_len(mut self, file_len: u64) -> Self {
        self.file_len = file_len;
        self
    }

    /// Disable generation: only files already present are used
    pub fn with_generate(mut self, generate: bool) -> Self {
        self.generate = generate;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name for index `index`
    pub fn file_name(index: u64) -> String {
        format!("file_{:06}.{}", index, FILE_EXTENSION)
    }

    fn file_seed(index: u64) -> u64 {
        WORKLOAD_SEED ^ index.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
    }

    /// Make sure files `0..count` exist; returns how many were created
    pub fn ensure_files(&self, count: u64) -> Result<u64> {
        fs::create_dir_all(&self.dir).map_err(|source| BenchError::Provision {
            path: self.dir.clone(),
            source,
        })?;

        let mut created = 0u64;
        let mut chunk = vec![0u8; WRITE_CHUNK];
        for index in 0..count {
            let path = self.dir.join(Self::file_name(index));
            if self.write_file(&path, index, &mut chunk)? {
                created += 1;
            }
        }

        if created > 0 {
            info!(
                "Generated {} workload files of {} bytes in {}",
                created,
                self.file_len,
                self.dir.display()
            );
        } else {
            debug!("All {} workload files already present in {}", count, self.dir.display());
        }
        Ok(created)
    }

    /// Write one file unless it already exists
    fn write_file(&self, path: &Path, index: u64, chunk: &mut [u8]) -> Result<bool> {
        let provision = |source: io::Error| BenchError::Provision {
            path: path.to_path_buf(),
            source,
        };

        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(provision(e)),
        };

        let mut rng = fastrand::Rng::with_seed(Self::file_seed(index));
        let mut remaining = self.file_len;
        while remaining > 0 {
            let n = remaining.min(chunk.len() as u64) as usize;
            rng.fill(&mut chunk[..n]);
            file.write_all(&chunk[..n]).map_err(provision)?;
            remaining -= n as u64;
        }
        file.flush().map_err(provision)?;
        Ok(true)
    }

    /// Up to `limit` regular `.bin` files in the directory, sorted by name
    ///
    /// A missing directory yields an empty list.
    pub fn list_files(&self, limit: usize) -> Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(BenchError::Provision {
                    path: self.dir.clone(),
                    source,
                })
            }
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(FILE_EXTENSION) {
                files.push(path);
            }
        }

        files.sort();
        files.truncate(limit);
        Ok(files)
    }
}

impl WorkloadSource for FileWorkload {
    fn resolve(&self, count: u64) -> Result<Vec<PathBuf>> {
        if self.generate {
            self.ensure_files(count)?;
        }

        let limit = usize::try_from(count).unwrap_or(usize::MAX);
        let files = self.list_files(limit)?;
        if files.is_empty() {
            return Err(BenchError::EmptyWorkload {
                dir: self.dir.clone(),
            });
        }
        debug!("Resolved {} of {} requested files", files.len(), count);
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_format() {
        assert_eq!(FileWorkload::file_name(0), "file_000000.bin");
        assert_eq!(FileWorkload::file_name(42), "file_000042.bin");
        assert_eq!(FileWorkload::file_name(1_234_567), "file_1234567.bin");
    }

    #[test]
    fn test_generate_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let workload = FileWorkload::new(dir.path().join("data")).with_file_len(1000);

        assert_eq!(workload.ensure_files(3).unwrap(), 3);
        let files = workload.list_files(10).unwrap();
        assert_eq!(files.len(), 3);
        assert!(files[0].ends_with("file_000000.bin"));
        assert!(files[2].ends_with("file_000002.bin"));
        for file in &files {
            assert_eq!(fs::metadata(file).unwrap().len(), 1000);
        }
    }

    #[test]
    fn test_generation_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let workload = FileWorkload::new(dir.path()).with_file_len(4096);

        workload.ensure_files(2).unwrap();
        let first = fs::read(dir.path().join("file_000001.bin")).unwrap();
        assert_eq!(workload.ensure_files(4).unwrap(), 2);
        assert_eq!(fs::read(dir.path().join("file_000001.bin")).unwrap(), first);
    }

    #[test]
    fn test_content_depends_on_index_only() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        FileWorkload::new(a.path()).with_file_len(256).ensure_files(2).unwrap();
        FileWorkload::new(b.path()).with_file_len(256).ensure_files(2).unwrap();

        let a0 = fs::read(a.path().join("file_000000.bin")).unwrap();
        let a1 = fs::read(a.path().join("file_000001.bin")).unwrap();
        let b0 = fs::read(b.path().join("file_000000.bin")).unwrap();
        assert_eq!(a0, b0);
        assert_ne!(a0, a1);
    }

    #[test]
    fn test_existing_file_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file_000000.bin");
        fs::write(&path, b"keep me").unwrap();

        let workload = FileWorkload::new(dir.path()).with_file_len(128);
        assert_eq!(workload.ensure_files(1).unwrap(), 0);
        assert_eq!(fs::read(&path).unwrap(), b"keep me");
    }

    #[test]
    fn test_list_ignores_other_entries() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.bin"), b"x").unwrap();
        fs::write(dir.path().join("a.bin"), b"x").unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        fs::create_dir(dir.path().join("nested.bin")).unwrap();

        let workload = FileWorkload::new(dir.path());
        let files = workload.list_files(usize::MAX).unwrap();
        assert_eq!(files, vec![dir.path().join("a.bin"), dir.path().join("b.bin")]);
        assert_eq!(workload.list_files(1).unwrap().len(), 1);
    }

    #[test]
    fn test_resolve_caps_at_available() {
        let dir = tempfile::tempdir().unwrap();
        FileWorkload::new(dir.path())
            .with_file_len(64)
            .ensure_files(3)
            .unwrap();

        let existing = FileWorkload::new(dir.path()).with_generate(false);
        assert_eq!(existing.resolve(10).unwrap().len(), 3);
        assert_eq!(existing.resolve(2).unwrap().len(), 2);
    }

    #[test]
    fn test_resolve_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let workload = FileWorkload::new(dir.path().join("missing")).with_generate(false);
        let err = workload.resolve(5).unwrap_err();
        assert!(err.is_empty_workload());
    }

    #[test]
    fn test_resolve_generates_requested() {
        let dir = tempfile::tempdir().unwrap();
        let workload = FileWorkload::new(dir.path()).with_file_len(32);
        assert_eq!(workload.resolve(5).unwrap().len(), 5);
    }
}
