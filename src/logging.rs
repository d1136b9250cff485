//! Logging utilities
//!
//! Tracing subscriber setup plus a size-based rolling file writer used when
//! JSON logs should also go to disk.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Default maximum log file size (10MB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Default number of files kept, the live file included
pub const DEFAULT_MAX_FILES: usize = 5;

/// A size-based rolling file writer
///
/// Rotated files carry a numeric suffix: `coin.log`, `coin.log.1`,
/// `coin.log.2`, with `.1` the most recent.
#[derive(Debug, Clone)]
pub struct SizeBasedRollingWriter {
    inner: Arc<Mutex<RollingFile>>,
}

#[derive(Debug)]
struct RollingFile {
    base_path: PathBuf,
    file_name: String,
    file: Option<File>,
    current_size: u64,
    max_size: u64,
    max_files: usize,
}

impl SizeBasedRollingWriter {
    /// Open (or create) `path` for appending
    ///
    /// `max_files` counts the live file, so `max_files - 1` rotated files are
    /// kept. Values below 1 are treated as 1.
    pub fn new(path: impl AsRef<Path>, max_size: u64, max_files: usize) -> io::Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        let file_name = base_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("log path has no file name: {}", base_path.display()),
                )
            })?;

        if let Some(parent) = base_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let current_size = fs::metadata(&base_path).map(|m| m.len()).unwrap_or(0);
        let file = open_append(&base_path)?;

        Ok(Self {
            inner: Arc::new(Mutex::new(RollingFile {
                base_path,
                file_name,
                file: Some(file),
                current_size,
                max_size,
                max_files: max_files.max(1),
            })),
        })
    }

    /// Rolling writer with 10MB files and 5 files kept
    pub fn with_defaults(path: impl AsRef<Path>) -> io::Result<Self> {
        Self::new(path, DEFAULT_MAX_FILE_SIZE, DEFAULT_MAX_FILES)
    }

    fn lock(&self) -> io::Result<MutexGuard<'_, RollingFile>> {
        self.inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer lock poisoned"))
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

impl RollingFile {
    fn rotate(&mut self) -> io::Result<()> {
        self.file = None;

        if self.max_files > 1 {
            // coin.log.(n-1) drops off, every other file shifts up by one
            let oldest = self.rotated_path(self.max_files - 1);
            if oldest.exists() {
                fs::remove_file(&oldest)?;
            }
            for i in (1..self.max_files - 1).rev() {
                let from = self.rotated_path(i);
                if from.exists() {
                    fs::rename(&from, self.rotated_path(i + 1))?;
                }
            }
            if self.base_path.exists() {
                fs::rename(&self.base_path, self.rotated_path(1))?;
            }
        } else if self.base_path.exists() {
            fs::remove_file(&self.base_path)?;
        }

        self.file = Some(open_append(&self.base_path)?);
        self.current_size = 0;
        Ok(())
    }

    fn rotated_path(&self, index: usize) -> PathBuf {
        self.base_path
            .with_file_name(format!("{}.{}", self.file_name, index))
    }
}

impl Write for SizeBasedRollingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self.lock()?;

        // A non-empty file is rotated before it would exceed the limit
        if inner.current_size > 0 && inner.current_size + buf.len() as u64 > inner.max_size {
            inner.rotate()?;
        }

        let file = inner
            .file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "log file not open"))?;
        let written = file.write(buf)?;
        inner.current_size += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut inner = self.lock()?;
        match inner.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> fmt::MakeWriter<'a> for SizeBasedRollingWriter {
    type Writer = SizeBasedRollingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Filter from `RUST_LOG`, falling back to the configured level
fn env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
}

/// Install the global subscriber
///
/// JSON lines go to stdout; with `log_file` set they are also written to a
/// rolling file.
pub fn init_tracing(log_level: &str, log_file: Option<&Path>) -> io::Result<()> {
    let console_layer = fmt::layer().json().with_filter(env_filter(log_level));
    let subscriber = tracing_subscriber::registry().with(console_layer);

    match log_file {
        Some(path) => {
            let writer = SizeBasedRollingWriter::with_defaults(path)?;
            let file_layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_filter(env_filter(log_level));
            subscriber.with(file_layer).init();
            eprintln!(
                "Logging to file: {} (10MB rotation, {} files)",
                path.display(),
                DEFAULT_MAX_FILES
            );
        }
        None => subscriber.init(),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_rolling_writer_creation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("coin.log");

        let writer = SizeBasedRollingWriter::with_defaults(&path).unwrap();
        assert!(path.exists());
        drop(writer);
    }

    #[test]
    fn test_rolling_writer_appends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("coin.log");
        fs::write(&path, "existing\n").unwrap();

        let mut writer = SizeBasedRollingWriter::with_defaults(&path).unwrap();
        writer.write_all(b"analysis done\n").unwrap();
        writer.flush().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "existing\nanalysis done\n");
    }

    #[test]
    fn test_rolling_writer_rotation_keeps_max_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("coin.log");

        let mut writer = SizeBasedRollingWriter::new(&path, 64, 3).unwrap();
        for i in 0..20 {
            let line = format!("line {:02}: normalizer diagnostics\n", i);
            writer.write_all(line.as_bytes()).unwrap();
        }
        writer.flush().unwrap();

        assert!(dir.path().join("coin.log.1").exists());
        assert!(dir.path().join("coin.log.2").exists());
        assert!(!dir.path().join("coin.log.3").exists());

        let live = fs::read_to_string(&path).unwrap();
        assert!(live.contains("line 19"));
        assert!(live.len() as u64 <= 64);
    }

    #[test]
    fn test_single_file_mode_truncates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("coin.log");

        let mut writer = SizeBasedRollingWriter::new(&path, 16, 1).unwrap();
        writer.write_all(b"0123456789\n").unwrap();
        writer.write_all(b"abcdefghij\n").unwrap();

        assert!(!dir.path().join("coin.log.1").exists());
        assert_eq!(fs::read_to_string(&path).unwrap(), "abcdefghij\n");
    }

    #[test]
    fn test_path_without_file_name_is_rejected() {
        let err = SizeBasedRollingWriter::with_defaults("/").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
