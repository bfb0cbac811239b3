use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, ErrorKind, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::SourceError;

/// An append-only stream of text lines
pub trait LineSource: Send {
    /// Next complete line, or `None` right away if none is buffered
    fn try_read_line(&mut self) -> io::Result<Option<String>>;

    /// Every remaining line up to the current end, used when flushing on stop
    fn drain_remaining(&mut self) -> io::Result<Vec<String>>;

    /// Release the underlying handle; safe to call repeatedly
    fn close(&mut self);

    fn is_closed(&self) -> bool;
}

/// Tails a growing file on disk
#[derive(Debug)]
pub struct FileLineSource {
    path: PathBuf,

    /// `None` once closed
    reader: Option<BufReader<File>>,

    /// Bytes of a line whose terminator has not arrived yet
    pending: Vec<u8>,
}

impl FileLineSource {
    /// Open a file for tailing, creating it (and its parent directories)
    /// when it does not exist yet
    pub fn open(path: impl AsRef<Path>, skip_existing: bool) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let mut file = open_or_create(path).map_err(|e| SourceError::unavailable(path, e))?;

        if skip_existing {
            let offset = file
                .seek(SeekFrom::End(0))
                .map_err(|e| SourceError::unavailable(path, e))?;
            debug!(path = %path.display(), offset, "Skipped existing content");
        }

        Ok(Self {
            path: path.to_path_buf(),
            reader: Some(BufReader::new(file)),
            pending: Vec::new(),
        })
    }

    /// Read one more chunk into `pending`. `Some(true)` when it now holds a
    /// complete line, `None` at the current end of the file.
    fn fill_pending(&mut self) -> io::Result<Option<bool>> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };
        let read = reader.read_until(b'\n', &mut self.pending)?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(self.pending.last() == Some(&b'\n')))
    }

    fn take_pending(&mut self) -> String {
        let line = decode_line(&self.pending);
        self.pending.clear();
        line
    }
}

impl LineSource for FileLineSource {
    fn try_read_line(&mut self) -> io::Result<Option<String>> {
        match self.fill_pending()? {
            Some(true) => Ok(Some(self.take_pending())),
            // Partial line stays in `pending` until the rest is written
            Some(false) | None => Ok(None),
        }
    }

    fn drain_remaining(&mut self) -> io::Result<Vec<String>> {
        let mut lines = Vec::new();
        while let Some(complete) = self.fill_pending()? {
            if complete {
                lines.push(self.take_pending());
            }
        }
        // Trailing text without a terminator is still content
        if !self.pending.is_empty() {
            lines.push(self.take_pending());
        }
        Ok(lines)
    }

    fn close(&mut self) {
        if self.reader.take().is_some() {
            debug!(path = %self.path.display(), "Closed log source");
        }
    }

    fn is_closed(&self) -> bool {
        self.reader.is_none()
    }
}

fn open_or_create(path: &Path) -> io::Result<File> {
    match File::open(path) {
        Ok(file) => Ok(file),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            OpenOptions::new().create(true).append(true).open(path)?;
            debug!(path = %path.display(), "Created missing log file");
            File::open(path)
        }
        Err(e) => Err(e),
    }
}

/// Strip `\n` / `\r\n` and decode, replacing invalid UTF-8
fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn append(path: &Path, text: &str) {
        let mut file = OpenOptions::new().append(true).open(path).unwrap();
        file.write_all(text.as_bytes()).unwrap();
    }

    #[test]
    fn test_reads_complete_lines_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "first\nsecond\r\nthird").unwrap();

        let mut source = FileLineSource::open(&path, false).unwrap();
        assert_eq!(source.try_read_line().unwrap().as_deref(), Some("first"));
        assert_eq!(source.try_read_line().unwrap().as_deref(), Some("second"));
        // "third" has no terminator yet
        assert_eq!(source.try_read_line().unwrap(), None);
        assert_eq!(source.try_read_line().unwrap(), None);

        append(&path, " part\n");
        assert_eq!(source.try_read_line().unwrap().as_deref(), Some("third part"));
        assert_eq!(source.try_read_line().unwrap(), None);
    }

    #[test]
    fn test_skip_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "old 1\nold 2\n").unwrap();

        let mut source = FileLineSource::open(&path, true).unwrap();
        assert_eq!(source.try_read_line().unwrap(), None);

        append(&path, "new\n");
        assert_eq!(source.try_read_line().unwrap().as_deref(), Some("new"));
    }

    #[test]
    fn test_missing_file_is_created_with_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("app.log");

        let mut source = FileLineSource::open(&path, false).unwrap();
        assert!(path.exists());
        assert_eq!(source.try_read_line().unwrap(), None);
        assert!(source.drain_remaining().unwrap().is_empty());
    }

    #[test]
    fn test_directory_path_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        // Opening succeeds on some platforms, reading a directory never does
        match FileLineSource::open(dir.path(), false) {
            Err(SourceError::Unavailable { path, .. }) => assert_eq!(path, dir.path()),
            Ok(mut source) => assert!(source.try_read_line().is_err()),
        }
    }

    #[test]
    fn test_drain_includes_trailing_fragment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "one\ntwo\nthree").unwrap();

        let mut source = FileLineSource::open(&path, false).unwrap();
        assert_eq!(source.try_read_line().unwrap().as_deref(), Some("one"));
        assert_eq!(source.drain_remaining().unwrap(), vec!["two", "three"]);
        assert!(source.drain_remaining().unwrap().is_empty());
    }

    #[test]
    fn test_close_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "line\n").unwrap();

        let mut source = FileLineSource::open(&path, false).unwrap();
        source.close();
        source.close();
        assert!(source.is_closed());
        assert_eq!(source.try_read_line().unwrap(), None);
        assert!(source.drain_remaining().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, b"ok \xff\n").unwrap();

        let mut source = FileLineSource::open(&path, false).unwrap();
        assert_eq!(source.try_read_line().unwrap().as_deref(), Some("ok \u{fffd}"));
    }
}
