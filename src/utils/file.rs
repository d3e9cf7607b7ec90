use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

pub fn get_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
}

/// PDF files directly inside `dir`, sorted by file name
pub fn list_pdf_files(dir: &Path) -> AppResult<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| {
        AppError::Config(format!("cannot read documents directory {}: {}", dir.display(), e))
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && get_extension(&path).as_deref() == Some("pdf") {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}
