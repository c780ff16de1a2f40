use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::FilesystemError;

/// Lists every file below `root`, depth-first, in file-name order.
///
/// Symbolic links to directories are never descended into, which keeps the
/// walk finite on trees with link cycles. Links to files are yielded.
pub(crate) fn walk(root: &Path) -> Result<Vec<PathBuf>, FilesystemError> {
    let mut files = vec![];
    walk_into(root, &mut files)?;
    Ok(files)
}

fn walk_into(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), FilesystemError> {
    let read_dir = std::fs::read_dir(dir).map_err(|e| FilesystemError::new("read", dir, e))?;
    let mut entries = read_dir
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| FilesystemError::new("read", dir, e))?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        let file_type = entry
            .file_type()
            .map_err(|e| FilesystemError::new("stat", &path, e))?;

        if file_type.is_dir() {
            walk_into(&path, files)?;
        } else if file_type.is_symlink() {
            match std::fs::metadata(&path) {
                Ok(target) if target.is_dir() => {
                    warn!("Not following directory link: {path:?}");
                }
                Ok(_) => files.push(path),
                Err(e) => warn!("Skipping dangling link {path:?}: {e}"),
            }
        } else {
            debug!("found {path:?}");
            files.push(path);
        }
    }

    Ok(())
}
