//! Local side of PDF export: where the bytes land and what URL comes back.

use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

use super::error::ApiError;

/// What an export was for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfTarget {
  /// Shown in-app; overwritten on the next preview of the same invoice
  Preview,
  /// Saved for the user in the download directory
  Download,
}

/// Result of a PDF export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfExport {
  pub target: PdfTarget,
  pub path: PathBuf,
  pub url: Url,
}

/// Writes exported PDFs to the preview or download directory
#[derive(Debug, Clone)]
pub struct PdfExporter {
  preview_dir: PathBuf,
  download_dir: PathBuf,
}

impl PdfExporter {
  pub fn new(preview_dir: PathBuf, download_dir: PathBuf) -> Self {
    Self {
      preview_dir,
      download_dir,
    }
  }

  pub fn preview_dir(&self) -> &Path {
    &self.preview_dir
  }

  pub fn download_dir(&self) -> &Path {
    &self.download_dir
  }

  /// Store `bytes` for invoice `id`.
  ///
  /// `view_mode = true` writes a preview file only; `false` writes exactly one
  /// file into the download directory.
  pub async fn save(&self, id: &str, bytes: &[u8], view_mode: bool) -> Result<PdfExport, ApiError> {
    let (target, dir, name) = if view_mode {
      (
        PdfTarget::Preview,
        &self.preview_dir,
        format!("preview-{}.pdf", file_stem(id)),
      )
    } else {
      (
        PdfTarget::Download,
        &self.download_dir,
        format!("invoice-{}.pdf", file_stem(id)),
      )
    };

    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(name);
    tokio::fs::write(&path, bytes).await?;

    let path = tokio::fs::canonicalize(&path).await?;
    let url = Url::from_file_path(&path)
      .map_err(|_| ApiError::Url(format!("not an absolute path: {}", path.display())))?;

    debug!(?target, path = %path.display(), size = bytes.len(), "Saved invoice PDF");

    Ok(PdfExport { target, path, url })
  }
}

/// Keep ids usable as file names
fn file_stem(id: &str) -> String {
  let stem: String = id
    .chars()
    .map(|c| {
      if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
        c
      } else {
        '_'
      }
    })
    .collect();
  if stem.is_empty() {
    "unnamed".to_string()
  } else {
    stem
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
  }

  #[test]
  fn test_file_stem() {
    assert_eq!(file_stem("abc-123"), "abc-123");
    assert_eq!(file_stem("../etc/passwd"), "___etc_passwd");
    assert_eq!(file_stem(""), "unnamed");
  }

  #[tokio::test]
  async fn test_preview_does_not_download() {
    let preview = tempfile::tempdir().expect("tempdir");
    let downloads = tempfile::tempdir().expect("tempdir");
    let exporter = PdfExporter::new(preview.path().into(), downloads.path().into());

    let export = exporter.save("42", b"%PDF-1.7", true).await.expect("save");

    assert_eq!(export.target, PdfTarget::Preview);
    assert_eq!(export.url.scheme(), "file");
    assert_eq!(count_files(downloads.path()), 0);
    assert_eq!(std::fs::read(&export.path).expect("read"), b"%PDF-1.7");
  }

  #[tokio::test]
  async fn test_download_writes_one_file() {
    let preview = tempfile::tempdir().expect("tempdir");
    let downloads = tempfile::tempdir().expect("tempdir");
    let exporter = PdfExporter::new(preview.path().into(), downloads.path().into());

    let export = exporter.save("42", b"%PDF-1.7", false).await.expect("save");

    assert_eq!(export.target, PdfTarget::Download);
    assert_eq!(export.url.scheme(), "file");
    assert_eq!(count_files(downloads.path()), 1);
    assert_eq!(count_files(preview.path()), 0);
    assert!(export.path.ends_with("invoice-42.pdf"));
  }
}
