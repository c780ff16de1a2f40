use std::{ffi::OsString, path::PathBuf};

use chrono::{SecondsFormat, Utc};

use crate::{differ::TitlePolicy, fixer::TitleFix};

pub(crate) const DEFAULT_DATE: &str = "2025-08-07T19:54:40.114Z";
pub(crate) const DEFAULT_JOBS: usize = 10;

#[derive(Debug, Clone)]
pub(crate) enum DateSource {
    Fixed(String),
    Clock,
}

impl DateSource {
    /// Resolved once per run so that every document of a batch carries the
    /// same timestamp.
    pub fn resolve(self) -> String {
        match self {
            DateSource::Fixed(date) => date,
            DateSource::Clock => Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// External document converter, invoked with an argument vector.
#[derive(Debug, Clone)]
pub(crate) struct Converter {
    pub program: PathBuf,
    /// Passed before the generated arguments.
    pub leading_args: Vec<OsString>,
    pub target_format: String,
}

impl Default for Converter {
    fn default() -> Self {
        Self {
            program: PathBuf::from("pandoc"),
            leading_args: vec![],
            target_format: "markdown_strict".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Context {
    pub source_root: PathBuf,
    pub output_root: PathBuf,
    pub attachments_dir: Option<String>,
    pub date: String,
    pub title_policy: TitlePolicy,
    pub skip_marker: Option<String>,
    pub converter: Converter,
    pub jobs: usize,
    pub source_extension: String,
    pub tidy_media: bool,
    pub title_fix: TitleFix,
}

impl Context {
    pub fn new(source_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            output_root: output_root.into(),
            attachments_dir: Some("attachments".to_string()),
            date: DEFAULT_DATE.to_string(),
            title_policy: TitlePolicy::default(),
            skip_marker: Some("ГОТОВ".to_string()),
            converter: Converter::default(),
            jobs: DEFAULT_JOBS,
            source_extension: ".docx".to_string(),
            tidy_media: true,
            title_fix: TitleFix::default(),
        }
    }

    /// `output_root` joined with the tag chain.
    pub fn output_dir_for(&self, tags: &[String]) -> PathBuf {
        tags.iter()
            .fold(self.output_root.clone(), |dir, tag| dir.join(tag))
    }
}
