use std::fmt;
use std::path::{Path, PathBuf};

/// Outcome class of one file in a batch, printed as a bracketed tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tag {
    Ok,
    Skip,
    Warn,
    Err,
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Ok => write!(f, "[ok]"),
            Tag::Skip => write!(f, "[skip]"),
            Tag::Warn => write!(f, "[warn]"),
            Tag::Err => write!(f, "[err]"),
        }
    }
}

/// One tagged line describing what happened to a file.
#[derive(Clone, Debug, PartialEq)]
pub struct FileReport {
    pub tag: Tag,
    /// Output path for `Ok`/`Warn`, input path otherwise.
    pub path: PathBuf,
    pub message: String,
}

impl FileReport {
    pub fn new(tag: Tag, path: &Path, message: impl Into<String>) -> Self {
        Self {
            tag,
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub fn ok(path: &Path, message: impl Into<String>) -> Self {
        Self::new(Tag::Ok, path, message)
    }

    pub fn skip(path: &Path, message: impl Into<String>) -> Self {
        Self::new(Tag::Skip, path, message)
    }

    pub fn warn(path: &Path, message: impl Into<String>) -> Self {
        Self::new(Tag::Warn, path, message)
    }

    pub fn err(path: &Path, message: impl Into<String>) -> Self {
        Self::new(Tag::Err, path, message)
    }

    /// File name for display, falling back to the full path.
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

impl fmt::Display for FileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.tag, self.display_name(), self.message)
    }
}

/// Per-tag counts for a finished batch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub ok: usize,
    pub skipped: usize,
    pub warned: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn record(&mut self, tag: Tag) {
        match tag {
            Tag::Ok => self.ok += 1,
            Tag::Skip => self.skipped += 1,
            Tag::Warn => self.warned += 1,
            Tag::Err => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.ok + self.skipped + self.warned + self.failed
    }

    pub fn merge(&mut self, other: &BatchSummary) {
        self.ok += other.ok;
        self.skipped += other.skipped;
        self.warned += other.warned;
        self.failed += other.failed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_line_uses_file_name() {
        let r = FileReport::skip(Path::new("/tmp/run/psf.npy"), "already uint16");
        assert_eq!(r.to_string(), "[skip] psf.npy: already uint16");
    }

    #[test]
    fn test_summary_counts() {
        let mut s = BatchSummary::default();
        for tag in [Tag::Ok, Tag::Ok, Tag::Warn, Tag::Err, Tag::Skip] {
            s.record(tag);
        }
        assert_eq!(s.total(), 5);
        assert_eq!(s.ok, 2);
        assert_eq!(s.failed, 1);
    }
}
