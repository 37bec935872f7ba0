//! Explicit context of one bench run: where inputs live and outputs go.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Directories and label of one bench run, passed to every operation that
/// touches the filesystem.
#[derive(Debug, Clone, PartialEq)]
pub struct RunContext {
    label: String,
    input_dir: PathBuf,
    output_dir: PathBuf,
}

impl RunContext {
    pub fn new(
        label: impl Into<String>,
        input_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            label: label.into(),
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Resolves `path` against the input directory; absolute paths are kept.
    pub fn input_path(&self, path: impl AsRef<Path>) -> PathBuf {
        self.input_dir.join(path)
    }

    /// Resolves `path` against the output directory; absolute paths are kept.
    pub fn output_path(&self, path: impl AsRef<Path>) -> PathBuf {
        self.output_dir.join(path)
    }

    /// Creates `name` in the output directory and hands a buffered writer to
    /// `write`.
    ///
    /// The writer is flushed after `write` succeeds. If `write` or the flush
    /// fails, the partially written file is removed. The file handle is closed
    /// before this returns in every case.
    ///
    /// # Errors
    ///
    /// Returns the error of `write`, or an I/O error converted into `E` if the
    /// file cannot be created or flushed.
    pub fn write_file<T, E, F>(&self, name: impl AsRef<Path>, write: F) -> Result<T, E>
    where
        E: From<io::Error>,
        F: FnOnce(&mut BufWriter<File>) -> Result<T, E>,
    {
        let path = self.output_path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(&path)?);
        let outcome = write(&mut writer).and_then(|value| {
            writer.flush()?;
            Ok(value)
        });
        drop(writer);

        match &outcome {
            Ok(_) => debug!(run = %self.label, path = %path.display(), "wrote file"),
            Err(_) => {
                if let Err(err) = fs::remove_file(&path) {
                    warn!(
                        run = %self.label,
                        path = %path.display(),
                        %err,
                        "cannot remove partial file"
                    );
                }
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn written_file_is_complete() {
        let dir = tempfile::tempdir().expect("temp dir");
        let ctx = RunContext::new("test", dir.path(), dir.path().join("out"));
        let written: io::Result<usize> = ctx.write_file("a.csv", |w| {
            writeln!(w, "x,y")?;
            Ok(1)
        });
        assert_eq!(written.ok(), Some(1));
        let text = fs::read_to_string(ctx.output_path("a.csv")).expect("file exists");
        assert_eq!(text, "x,y\n");
    }

    #[test]
    fn failed_write_removes_partial_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let ctx = RunContext::new("test", dir.path(), dir.path());
        let written: io::Result<()> = ctx.write_file("partial.csv", |w| {
            writeln!(w, "header")?;
            Err(io::Error::other("row failed"))
        });
        assert!(written.is_err());
        assert!(!ctx.output_path("partial.csv").exists());
    }

    #[test]
    fn relative_inputs_resolve_against_input_dir() {
        let ctx = RunContext::new("test", "/data/in", "/data/out");
        assert_eq!(ctx.input_path("tap_0"), PathBuf::from("/data/in/tap_0"));
        assert_eq!(ctx.input_path("/abs/tap_1"), PathBuf::from("/abs/tap_1"));
        assert_eq!(ctx.label(), "test");
    }
}
