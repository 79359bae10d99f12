//! Where the text to parse comes from.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub trait SourceHolder {
    fn text(&self) -> &str;

    /// Editor caret position, if the source is being edited.
    fn caret_offset(&self) -> Option<usize> {
        None
    }

    fn file_extension(&self) -> Option<&str>;
}

/// In-memory text, e.g. an editor buffer that has not been saved.
#[derive(Debug, Clone)]
pub struct StringSource {
    text: String,
    caret: Option<usize>,
    extension: Option<String>,
}

impl StringSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), caret: None, extension: Some("php".to_string()) }
    }

    pub fn with_caret(mut self, caret: usize) -> Self {
        self.caret = Some(caret);
        self
    }

    pub fn with_extension(mut self, extension: Option<&str>) -> Self {
        self.extension = extension.map(str::to_string);
        self
    }
}

impl SourceHolder for StringSource {
    fn text(&self) -> &str {
        &self.text
    }

    fn caret_offset(&self) -> Option<usize> {
        self.caret
    }

    fn file_extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }
}

/// File contents read once from disk.
#[derive(Debug, Clone)]
pub struct FileSnapshot {
    path: PathBuf,
    text: String,
}

impl FileSnapshot {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|source| Error::Io { path: path.to_path_buf(), source })?;
        Ok(Self { path: path.to_path_buf(), text: String::from_utf8_lossy(&bytes).into_owned() })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SourceHolder for FileSnapshot {
    fn text(&self) -> &str {
        &self.text
    }

    fn file_extension(&self) -> Option<&str> {
        self.path.extension().and_then(|ext| ext.to_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reports_path_extension() {
        let dir = std::env::temp_dir().join(format!("php-recover-src-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("index.phtml");
        std::fs::write(&path, "<?php echo 1;").unwrap();

        let snapshot = FileSnapshot::load(&path).unwrap();
        assert_eq!(snapshot.text(), "<?php echo 1;");
        assert_eq!(snapshot.file_extension(), Some("phtml"));
        assert_eq!(snapshot.caret_offset(), None);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = FileSnapshot::load(Path::new("/nonexistent/file.php")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
