use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FileMeta {
    pub file: PathBuf,
    /// Final dot-suffix including the dot, empty when there is none.
    pub extension: String,
    /// Directory chain between the scan root and the file.
    pub tags: Vec<String>,
    pub title: String,
}

impl FileMeta {
    /// Derives metadata from the path alone: the first segment is taken to be
    /// the scan root, the last one the file name.
    pub fn extract(file: &Path) -> FileMeta {
        let segments = segments(file);
        let tags = if segments.len() > 2 {
            segments[1..segments.len() - 1].to_vec()
        } else {
            vec![]
        };
        Self::build(file, tags)
    }

    /// Same as [`FileMeta::extract`], but treats all of `root` as the first
    /// segment so that multi-segment roots yield the same tag chain.
    pub fn extract_under(root: &Path, file: &Path) -> FileMeta {
        let tags = match file.strip_prefix(root) {
            Ok(relative) => {
                let mut segments = segments(relative);
                segments.pop();
                segments
            }
            Err(_) => return Self::extract(file),
        };
        Self::build(file, tags)
    }

    fn build(file: &Path, tags: Vec<String>) -> FileMeta {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let extension = file
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let title = name
            .strip_suffix(extension.as_str())
            .unwrap_or(&name)
            .trim()
            .to_string();

        FileMeta {
            file: file.to_path_buf(),
            extension,
            tags,
            title,
        }
    }

    pub fn has_extension(&self, extension: &str) -> bool {
        self.extension.eq_ignore_ascii_case(extension)
    }
}

fn segments(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().to_string()),
            Component::ParentDir => Some("..".to_string()),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => None,
        })
        .collect()
}
