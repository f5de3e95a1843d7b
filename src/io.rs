use std::{
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::error::{DashboardResult, IoError};

const WRITE_BUFFER_SIZE: usize = 64 * 1024;

// ================================================================================================
// Output Directory
// ================================================================================================

/// Local directory the dashboard pages are written to.
#[derive(Debug, Clone)]
pub struct OutputDir {
    path: PathBuf,
}

impl OutputDir {
    /// Uses `path` as output directory, creating it if needed.
    pub fn create(path: impl AsRef<Path>) -> DashboardResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            fs::create_dir_all(&path).map_err(|e| {
                IoError::WriteFailed(format!(
                    "Failed to create directory {}: {e}",
                    path.display()
                ))
            })?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `contents` to `file_name` inside the directory.
    pub fn write(&self, file_name: &str, contents: &str) -> DashboardResult<PathBuf> {
        self.write_with(file_name, |w| {
            w.write_all(contents.as_bytes())
                .map_err(|e| IoError::Io(e).into())
        })
    }

    fn write_with(
        &self,
        file_name: &str,
        f: impl FnOnce(&mut BufWriter<fs::File>) -> DashboardResult<()>,
    ) -> DashboardResult<PathBuf> {
        let full_path = self.path.join(file_name);
        let file = fs::File::create(&full_path).map_err(|e| {
            IoError::WriteFailed(format!("Failed to create {}: {e}", full_path.display()))
        })?;

        let mut writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);
        f(&mut writer)?;
        writer.flush().map_err(IoError::Io)?;

        debug!(path = %full_path.display(), "Wrote file");
        Ok(full_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_missing_directories() {
        let tmp = tempfile::tempdir().expect("failed to create temp dir");
        let nested = tmp.path().join("a").join("b");

        let out = OutputDir::create(&nested).expect("failed to create output dir");
        let written = out.write("page.html", "<p>ok</p>").expect("failed to write page");

        assert_eq!(written, nested.join("page.html"));
        assert_eq!(fs::read_to_string(written).unwrap(), "<p>ok</p>");
    }

    #[test]
    fn overwrites_existing_pages() {
        let tmp = tempfile::tempdir().expect("failed to create temp dir");
        let out = OutputDir::create(tmp.path()).unwrap();

        out.write("index.html", "first").unwrap();
        let written = out.write("index.html", "second").unwrap();

        assert_eq!(fs::read_to_string(written).unwrap(), "second");
        assert_eq!(out.path(), tmp.path());
    }
}
