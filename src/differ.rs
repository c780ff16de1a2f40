use std::collections::HashSet;

use log::{debug, info};

use crate::metadata::FileMeta;

/// How titles are compared when looking for an existing conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum TitlePolicy {
    Exact,
    /// Ignores spaces, underscores and exclamation marks.
    #[default]
    Normalized,
}

impl TitlePolicy {
    pub fn key(self, title: &str) -> String {
        match self {
            TitlePolicy::Exact => title.to_string(),
            TitlePolicy::Normalized => title
                .chars()
                .filter(|c| !matches!(c, ' ' | '_' | '!'))
                .collect(),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct DiffOutcome {
    pub work: Vec<FileMeta>,
    pub already_converted: Vec<FileMeta>,
    pub denylisted: Vec<FileMeta>,
}

pub(crate) fn diff(
    new_files: Vec<FileMeta>,
    existing: &[FileMeta],
    policy: TitlePolicy,
    skip_marker: Option<&str>,
) -> DiffOutcome {
    let existing_keys: HashSet<String> = existing.iter().map(|e| policy.key(&e.title)).collect();
    let mut outcome = DiffOutcome::default();

    for file in new_files {
        if skip_marker.is_some_and(|m| !m.is_empty() && file.title.contains(m)) {
            debug!("Denylisted: {:?}", file.file);
            outcome.denylisted.push(file);
        } else if existing_keys.contains(&policy.key(&file.title)) {
            info!("File already exists: {:?}", file.file);
            outcome.already_converted.push(file);
        } else {
            outcome.work.push(file);
        }
    }

    outcome
}
