//! target `.tf` files of a directory
use std::path::{Path, PathBuf};

pub const EXTENSION: &str = "tf";

/// Regular `.tf` files directly inside `dir_path`, sorted by path
///
/// Subdirectories are not entered (Terraform treats each directory as its own module). An empty
/// result is not an error.
pub fn discover(dir_path: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let read_dir = std::fs::read_dir(dir_path).map_err(|source| LoadError::ReadDir {
        path: dir_path.to_owned(),
        source,
    })?;

    let mut files = vec![];
    for dir_entry in read_dir {
        let dir_entry = dir_entry?;
        if !dir_entry.file_type()?.is_file() {
            continue;
        }

        let file_path = dir_entry.path();
        if file_path.extension().is_some_and(|ext| ext == EXTENSION) {
            files.push(file_path);
        }
    }

    files.sort();
    tracing::debug!(dir=%dir_path.display(), count = files.len(), "discovered terraform files");
    Ok(files)
}

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("unable to read directory {}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("IO error")]
    IoError(#[from] std::io::Error),
}
