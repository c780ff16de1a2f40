use std::path::{Path, PathBuf};

use fs_extra::dir::CopyOptions;
use log::debug;
use regex::{Captures, Regex};

use crate::error::{FilesystemError, PostProcessError};

/// Subdirectory the converter puts extracted assets into.
const MEDIA_DIR: &str = "media";

#[derive(Debug, Default)]
pub(crate) struct Tidied {
    /// Names of the entries that left `media/`, in the order they moved.
    pub moved: Vec<String>,
    pub removed_empty: bool,
    /// Set when tidying stopped early; `moved` still lists what got out.
    pub error: Option<PostProcessError>,
}

/// Flattens `<dir>/media/*` into `<dir>` and drops `<dir>` when nothing was
/// extracted.
pub(crate) fn tidy(dir: &Path) -> Tidied {
    let mut res = Tidied::default();
    if let Err(e) = tidy_into(dir, &mut res) {
        res.error = Some(e);
    }
    res
}

fn tidy_into(dir: &Path, res: &mut Tidied) -> Result<(), PostProcessError> {
    if !dir.is_dir() {
        return Ok(());
    }

    let media = dir.join(MEDIA_DIR);
    if media.is_dir() {
        let mut options = CopyOptions::new();
        options.overwrite = true;
        for item in list(&media)? {
            fs_extra::move_items(&[&item], dir, &options).map_err(|source| {
                PostProcessError::Media {
                    dir: media.clone(),
                    source,
                }
            })?;
            if let Some(name) = item.file_name() {
                res.moved.push(name.to_string_lossy().to_string());
            }
        }
        std::fs::remove_dir(&media).map_err(|e| FilesystemError::new("remove", &media, e))?;
        debug!("moved {} media entries into {dir:?}", res.moved.len());
    }

    if list(dir)?.is_empty() {
        std::fs::remove_dir(dir).map_err(|e| FilesystemError::new("remove", dir, e))?;
        res.removed_empty = true;
    }

    Ok(())
}

/// Points links at `<dir>/media/<name>` to `<dir>/<name>` for every entry
/// [`tidy`] moved. Links to entries that stayed behind are left alone.
pub(crate) fn retarget_links(body: &str, dir: &Path, moved: &[String]) -> String {
    let dir = dir.to_string_lossy();
    let mut res = body.to_string();
    for name in moved {
        let from = regex::escape(&format!("{dir}/{MEDIA_DIR}/{name}"));
        let Ok(pattern) = Regex::new(&format!(r#"{from}([/)"'>\s]|\z)"#)) else {
            continue;
        };
        res = pattern
            .replace_all(&res, |caps: &Captures| format!("{dir}/{name}{}", &caps[1]))
            .into_owned();
    }
    res
}

/// Entries of `dir`, sorted by name.
fn list(dir: &Path) -> Result<Vec<PathBuf>, FilesystemError> {
    let mut entries = std::fs::read_dir(dir)
        .and_then(|entries| entries.map(|e| e.map(|e| e.path())).collect::<Result<Vec<_>, _>>())
        .map_err(|e| FilesystemError::new("read", dir, e))?;
    entries.sort();
    Ok(entries)
}
