use std::{io, path::PathBuf, process::ExitStatus};

use thiserror::Error;

#[derive(Error, Debug)]
#[error("failed to {action} {path:?}: {source}")]
pub(crate) struct FilesystemError {
    pub action: &'static str,
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl FilesystemError {
    pub fn new(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self {
            action,
            path: path.into(),
            source,
        }
    }
}

/// Failure of the external converter for one item.
#[derive(Error, Debug)]
pub(crate) enum ProcessFailure {
    #[error("could not spawn {program:?}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{program:?} exited with {status}: {stderr}")]
    Exit {
        program: PathBuf,
        status: ExitStatus,
        stderr: String,
    },
}

/// Fatal for the item it belongs to, never for the batch.
#[derive(Error, Debug)]
pub(crate) enum ConversionError {
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
    #[error("converter failed for {input:?}: {cause}")]
    ExternalProcess {
        input: PathBuf,
        #[source]
        cause: ProcessFailure,
    },
    #[error("converter succeeded but {0:?} was not written")]
    MissingOutput(PathBuf),
    #[error("{0:?} has no title to name its output after")]
    EmptyTitle(PathBuf),
}

/// Media tidy-up failed after an otherwise successful conversion.
#[derive(Error, Debug)]
pub(crate) enum PostProcessError {
    #[error("failed to move media out of {dir:?}: {source}")]
    Media {
        dir: PathBuf,
        #[source]
        source: fs_extra::error::Error,
    },
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

#[derive(Error, Debug)]
pub(crate) enum FixError {
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
    #[error("{0:?} has no front matter block")]
    NoFrontMatter(PathBuf),
}
