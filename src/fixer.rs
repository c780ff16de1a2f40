use std::{path::Path, sync::LazyLock};

use log::{debug, info};
use regex::Regex;

use crate::{
    context::Context,
    converter::front_matter::FrontMatter,
    error::{FilesystemError, FixError},
    report::RunReport,
    runner::{bounded_map, output_path, scan_sources},
};

static REPEATED_SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" {2,}").unwrap());

/// Normalization applied to the `title` field of converted documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TitleFix {
    /// Removed wherever they occur.
    pub strip_tokens: Vec<String>,
    /// Replaced by a space.
    pub spacing_chars: Vec<char>,
}

impl Default for TitleFix {
    fn default() -> Self {
        Self {
            strip_tokens: vec!["ГОТОВ".to_string(), "\"".to_string()],
            spacing_chars: vec!['!', '_'],
        }
    }
}

impl TitleFix {
    pub fn apply(&self, title: &str) -> String {
        let mut res = title.to_string();
        for token in self.strip_tokens.iter().filter(|t| !t.is_empty()) {
            res = res.replace(token.as_str(), "");
        }
        let res: String = res
            .chars()
            .map(|c| if self.spacing_chars.contains(&c) { ' ' } else { c })
            .collect();
        REPEATED_SPACES.replace_all(&res, " ").trim().to_string()
    }
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum FixOutcome {
    Fixed,
    Unchanged,
}

/// Rewrites the title of one converted document in place.
pub(crate) fn fix_file(path: &Path, rule: &TitleFix) -> Result<FixOutcome, FixError> {
    let content =
        std::fs::read_to_string(path).map_err(|e| FilesystemError::new("read", path, e))?;
    let (mut front_matter, body) =
        FrontMatter::parse(&content).ok_or_else(|| FixError::NoFrontMatter(path.to_path_buf()))?;

    let Some(title) = front_matter.title() else {
        return Ok(FixOutcome::Unchanged);
    };
    let fixed = rule.apply(&title);
    if fixed == title {
        return Ok(FixOutcome::Unchanged);
    }
    debug!("{path:?}: {title:?} -> {fixed:?}");
    front_matter.set_title(&fixed);
    std::fs::write(path, front_matter.render(body))
        .map_err(|e| FilesystemError::new("write", path, e))?;

    Ok(FixOutcome::Fixed)
}

/// Fixes the output of every source document that has been converted.
pub(crate) fn fix_all(ctx: &Context) -> anyhow::Result<RunReport> {
    let mut report = RunReport::default();
    let (sources, unsupported): (Vec<_>, Vec<_>) = scan_sources(ctx)?
        .into_iter()
        .partition(|f| f.has_extension(&ctx.source_extension) && !f.title.is_empty());
    for file in unsupported {
        info!("Skipping file: {:?}", file.file);
        report.unsupported.push(file.file);
    }

    let outputs: Vec<_> = sources
        .iter()
        .map(|f| output_path(ctx, f))
        .filter(|p| p.is_file())
        .collect();
    let results = bounded_map(ctx.jobs, &outputs, |path| {
        info!("Processing file: {path:?}");
        fix_file(path, &ctx.title_fix)
    })?;

    for (path, result) in outputs.into_iter().zip(results) {
        match result {
            Ok(FixOutcome::Fixed) => report.fixed.push(path),
            Ok(FixOutcome::Unchanged) => {}
            Err(e @ FixError::NoFrontMatter(_)) => report.warn(&path, e),
            Err(e) => report.fail(&path, e),
        }
    }

    report.log_summary();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rule() {
        let rule = TitleFix::default();
        assert_eq!(rule.apply("ГОТОВ My_Doc!"), "My Doc");
        assert_eq!(rule.apply("\"Quoted\"  __twice__"), "Quoted twice");
        assert_eq!(rule.apply("Plain"), "Plain");
    }

    #[test]
    fn custom_rule() {
        let rule = TitleFix {
            strip_tokens: vec!["DRAFT".into()],
            spacing_chars: vec!['-'],
        };
        assert_eq!(rule.apply("DRAFT-release-notes!"), "release notes!");
    }

    #[test]
    fn fixes_title_and_keeps_everything_else() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("Doc.md");
        let original = "---\ntitle: \"ГОТОВ My_Doc!\"\ndate: 2025-08-07T19:54:40.114Z\ncategories:\n - [\"A\"]\n---\n\nbody --- stays\n";
        std::fs::write(&path, original).unwrap();

        assert_eq!(fix_file(&path, &TitleFix::default()).unwrap(), FixOutcome::Fixed);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            original.replace("\"ГОТОВ My_Doc!\"", "\"My Doc\"")
        );
        assert_eq!(fix_file(&path, &TitleFix::default()).unwrap(), FixOutcome::Unchanged);
    }

    #[test]
    fn file_without_front_matter_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("Doc.md");
        std::fs::write(&path, "no header").unwrap();
        assert!(matches!(
            fix_file(&path, &TitleFix::default()),
            Err(FixError::NoFrontMatter(_))
        ));
    }

    #[test]
    fn fix_all_visits_converted_sources_only() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = Context::new(tmp.path().join("docs"), tmp.path().join("out"));
        for source in ["A/Done_Doc!.docx", "A/Pending.docx", "A/Bare.docx", "A/notes.txt"] {
            let path = ctx.source_root.join(source);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, "").unwrap();
        }
        std::fs::create_dir_all(ctx.output_root.join("A")).unwrap();
        let done = ctx.output_root.join("A/Done_Doc!.md");
        std::fs::write(&done, "---\ntitle: \"Done_Doc!\"\n---\n\nx").unwrap();
        let bare = ctx.output_root.join("A/Bare.md");
        std::fs::write(&bare, "x").unwrap();

        let report = fix_all(&ctx).unwrap();
        assert_eq!(report.fixed, vec![done.clone()]);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].file, bare);
        assert_eq!(report.unsupported.len(), 1);
        assert!(report.failed.is_empty());
        assert_eq!(
            std::fs::read_to_string(&done).unwrap(),
            "---\ntitle: \"Done Doc\"\n---\n\nx"
        );
    }
}
