//! Rotating log file writer with size-based rotation and backup retention.
//!
//! This module provides a thread-safe writer that plugs into
//! `tracing-subscriber` as a [`MakeWriter`]. The log file is rotated when it
//! exceeds a size threshold, keeping a fixed number of timestamped backups so
//! log output never grows without bound.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::fmt::MakeWriter;

/// Maximum file size before rotation (10 MB).
const MAX_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Number of backup files to retain after rotation.
const MAX_BACKUP_FILES: usize = 3;

/// Thread-safe rotating file writer.
///
/// When the current file exceeds the size limit, it is renamed with a
/// timestamp suffix and a new file is started. Backups beyond the retention
/// limit are removed, oldest first.
///
/// # Rotation Strategy
///
/// 1. Check file size before each write
/// 2. If over the limit, rotate:
///    - Rename current file to `<name>.<YYYYmmddHHMMSSffffff>`
///    - Create new empty file on the next write
///    - Remove the oldest backups beyond the retention limit
///
/// # Example
///
/// ```rust
/// use book_inquiry::observability::FileWriter;
///
/// let dir = tempfile::tempdir().unwrap();
/// let writer = FileWriter::new(dir.path().join("book-inquiry.log"));
/// writer.write_line(r#"{"event": "test"}"#).unwrap();
/// ```
pub struct FileWriter {
    /// Path to the primary log file.
    file_path: PathBuf,
    /// Rotation threshold in bytes.
    max_bytes: u64,
    /// Backups kept after rotation.
    max_backups: usize,
    /// Lazily-initialized file handle (opens on first write).
    writer: Mutex<Option<fs::File>>,
}

impl FileWriter {
    /// Creates a writer with the default limits (10 MB, 3 backups).
    ///
    /// The file is not opened until the first write.
    #[must_use]
    pub const fn new(file_path: PathBuf) -> Self {
        Self::with_limits(file_path, MAX_FILE_SIZE_BYTES, MAX_BACKUP_FILES)
    }

    /// Creates a writer with explicit rotation limits.
    #[must_use]
    pub const fn with_limits(file_path: PathBuf, max_bytes: u64, max_backups: usize) -> Self {
        Self {
            file_path,
            max_bytes,
            max_backups,
            writer: Mutex::new(None),
        }
    }

    /// The primary log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Writes a single line, adding the trailing newline.
    ///
    /// # Errors
    ///
    /// May fail due to:
    /// - File system permissions
    /// - Disk space exhaustion
    /// - Mutex poisoning (if another thread panicked while holding the lock)
    pub fn write_line(&self, line: &str) -> io::Result<()> {
        let mut bytes = Vec::with_capacity(line.len() + 1);
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\n');
        self.append(&bytes)
    }

    /// Appends raw bytes, rotating first if the file is over the limit.
    fn append(&self, bytes: &[u8]) -> io::Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| io::Error::other(format!("Mutex poisoned: {e}")))?;

        self.check_and_rotate(&mut writer)?;

        if writer.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.file_path)?;
            *writer = Some(file);
        }

        let file = writer
            .as_mut()
            .ok_or_else(|| io::Error::other("No file available"))?;
        file.write_all(bytes)?;
        file.flush()?;
        drop(writer);

        Ok(())
    }

    /// Closes the handle and rotates when the file exceeds the size limit.
    fn check_and_rotate(&self, writer: &mut Option<fs::File>) -> io::Result<()> {
        if let Ok(metadata) = fs::metadata(&self.file_path) {
            if metadata.len() > self.max_bytes {
                *writer = None;
                self.rotate_files()?;
            }
        }
        Ok(())
    }

    /// Renames the current file to a timestamped backup and prunes old ones.
    fn rotate_files(&self) -> io::Result<()> {
        let timestamp = chrono::Utc::now().format("%Y%m%d%H%M%S%6f");
        let backup_path = PathBuf::from(format!("{}.{timestamp}", self.file_path.display()));

        if self.file_path.exists() {
            fs::rename(&self.file_path, &backup_path)?;
        }

        self.cleanup_old_backups()
    }

    /// Removes backups beyond the retention limit.
    ///
    /// Backup suffixes are fixed-width timestamps, so name order is age order.
    /// Individual deletion errors are ignored.
    fn cleanup_old_backups(&self) -> io::Result<()> {
        let parent_dir = self
            .file_path
            .parent()
            .ok_or_else(|| io::Error::other("No parent directory"))?;
        let prefix = self
            .file_path
            .file_name()
            .and_then(|s| s.to_str())
            .map(|name| format!("{name}."))
            .ok_or_else(|| io::Error::other("Invalid file name"))?;

        let mut backups: Vec<PathBuf> = fs::read_dir(parent_dir)?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with(&prefix))
            })
            .collect();

        backups.sort_by(|a, b| b.cmp(a));

        for old_backup in backups.iter().skip(self.max_backups) {
            let _ = fs::remove_file(old_backup);
        }

        Ok(())
    }
}

impl std::fmt::Debug for FileWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWriter")
            .field("file_path", &self.file_path)
            .field("max_bytes", &self.max_bytes)
            .field("max_backups", &self.max_backups)
            .finish_non_exhaustive()
    }
}

/// Per-event writer handed out to the formatting layer.
#[derive(Debug)]
pub struct FileWriterGuard<'a> {
    inner: &'a FileWriter,
}

impl Write for FileWriterGuard<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.append(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for FileWriter {
    type Writer = FileWriterGuard<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        FileWriterGuard { inner: self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_are_appended() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FileWriter::new(dir.path().join("client.log"));
        writer.write_line("first").unwrap();
        writer.write_line("second").unwrap();

        let contents = fs::read_to_string(writer.path()).unwrap();
        assert_eq!(contents, "first\nsecond\n");
    }

    #[test]
    fn test_rotation_keeps_bounded_backups() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FileWriter::with_limits(dir.path().join("client.log"), 64, 2);
        let line = "x".repeat(40);

        for _ in 0..12 {
            writer.write_line(&line).unwrap();
            std::thread::sleep(std::time::Duration::from_millis(2));
        }

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        let backups = names.iter().filter(|n| n.starts_with("client.log.")).count();
        assert!(names.contains(&"client.log".to_string()));
        assert_eq!(backups, 2);
        assert!(fs::metadata(writer.path()).unwrap().len() <= 2 * 41);
    }

    #[test]
    fn test_make_writer_feeds_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FileWriter::new(dir.path().join("client.log"));
        writer.make_writer().write_all(b"{\"level\":\"INFO\"}\n").unwrap();
        assert_eq!(
            fs::read_to_string(writer.path()).unwrap(),
            "{\"level\":\"INFO\"}\n"
        );
    }
}
