//! Export: choose where the package goes and write it there.
//!
//! Exports land in a folder next to the source document
//! (`notes/today.md` → `notes/exports/today.docx`). An existing file is
//! never overwritten; a numeric suffix is appended instead
//! (`today-1.docx`, `today-2.docx`, …).

use crate::error::Md2DocxError;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// File name stem used when the source path has none.
const FALLBACK_STEM: &str = "document";

/// Candidate names for one export: `<dir>/<stem>.<ext>`, then `<stem>-N.<ext>`.
struct ExportName {
    dir: PathBuf,
    stem: String,
    extension: String,
}

impl ExportName {
    fn new(source: &Path, dir_name: &str, extension: &str) -> Self {
        let dir = source
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(dir_name);
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| FALLBACK_STEM.to_string());
        Self {
            dir,
            stem,
            extension: extension.to_string(),
        }
    }

    fn candidate(&self, n: u32) -> PathBuf {
        let (stem, ext) = (&self.stem, &self.extension);
        match n {
            0 => self.dir.join(format!("{stem}.{ext}")),
            n => self.dir.join(format!("{stem}-{n}.{ext}")),
        }
    }

    /// Index of the first candidate that does not exist yet.
    async fn first_free(&self) -> Result<u32, Md2DocxError> {
        let mut n = 0u32;
        loop {
            let candidate = self.candidate(n);
            match tokio::fs::try_exists(&candidate).await {
                Ok(false) => return Ok(n),
                Ok(true) => n = self.next(n)?,
                Err(source) => {
                    return Err(Md2DocxError::OutputWriteFailed {
                        path: candidate,
                        source,
                    })
                }
            }
        }
    }

    fn next(&self, n: u32) -> Result<u32, Md2DocxError> {
        n.checked_add(1)
            .ok_or_else(|| Md2DocxError::OutputWriteFailed {
                path: self.candidate(n),
                source: std::io::Error::new(ErrorKind::AlreadyExists, "no free export name"),
            })
    }
}

/// First free export path for `source` inside the sibling `dir_name` folder.
///
/// A path whose existence cannot be checked (for example because
/// `dir_name` is a regular file) is reported as
/// [`Md2DocxError::OutputWriteFailed`].
pub async fn export_path(
    source: &Path,
    dir_name: &str,
    extension: &str,
) -> Result<PathBuf, Md2DocxError> {
    let name = ExportName::new(source, dir_name, extension);
    let path = name.candidate(name.first_free().await?);
    debug!("Export target for {}: {}", source.display(), path.display());
    Ok(path)
}

/// Write `bytes` as a new export for `source` and return the path used.
///
/// The file is created with `create_new`, so a name taken between choosing
/// and writing moves on to the next suffix instead of being overwritten. A
/// partially written file is removed on failure.
pub async fn write_new_export(
    source: &Path,
    dir_name: &str,
    extension: &str,
    bytes: &[u8],
) -> Result<PathBuf, Md2DocxError> {
    let name = ExportName::new(source, dir_name, extension);
    if !name.dir.as_os_str().is_empty() {
        tokio::fs::create_dir_all(&name.dir)
            .await
            .map_err(|source| Md2DocxError::OutputWriteFailed {
                path: name.dir.clone(),
                source,
            })?;
    }

    let mut n = name.first_free().await?;
    loop {
        let path = name.candidate(n);
        let failed = |source: std::io::Error| Md2DocxError::OutputWriteFailed {
            path: path.clone(),
            source,
        };
        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!("{} appeared before writing, trying next name", path.display());
                n = name.next(n)?;
                continue;
            }
            Err(e) => return Err(failed(e)),
        };

        let written: std::io::Result<()> = async {
            file.write_all(bytes).await?;
            file.flush().await
        }
        .await;
        drop(file);
        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(failed(e));
        }
        debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        return Ok(path);
    }
}

/// Write `bytes` to `path`, creating parent folders as needed.
///
/// Uses atomic write (temp file + rename) to prevent partial files. A parent
/// folder that already exists is not an error. An existing file at `path`
/// is replaced; exports into the sibling folder go through
/// [`write_new_export`] instead.
pub async fn write_export(path: &Path, bytes: &[u8]) -> Result<(), Md2DocxError> {
    let failed = |source: std::io::Error| Md2DocxError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(failed)?;
    }

    let tmp_path = tmp_path_for(path);
    tokio::fs::write(&tmp_path, bytes).await.map_err(failed)?;

    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(failed(e));
    }
    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from(FALLBACK_STEM));
    name.push(".tmp");
    path.with_file_name(name)
}
