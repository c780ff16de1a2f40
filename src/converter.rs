use std::{
    ffi::OsString,
    io::ErrorKind,
    path::{Component, Path, PathBuf},
    process::Command,
};

use log::{debug, info, warn};

use crate::{
    context::Context,
    error::{ConversionError, FilesystemError, PostProcessError, ProcessFailure},
    metadata::FileMeta,
};

pub(crate) mod front_matter;
pub(crate) mod media;

#[derive(Debug, Clone, Default)]
pub(crate) struct ConvertOptions<'a> {
    /// Defaults to the directory of the input file.
    pub output_dir: Option<PathBuf>,
    /// Optional segment between the output directory and the per-document
    /// attachment directory.
    pub attachments_dir: Option<&'a str>,
    pub tags: &'a [String],
}

#[derive(Debug)]
pub(crate) struct Converted {
    pub output: PathBuf,
    pub attachments: PathBuf,
    /// Media tidy-up failure; the document itself was written.
    pub warning: Option<PostProcessError>,
}

pub(crate) fn convert(
    file: &Path,
    options: &ConvertOptions,
    ctx: &Context,
) -> Result<Converted, ConversionError> {
    let title = FileMeta::extract(file).title;
    if title.is_empty() {
        return Err(ConversionError::EmptyTitle(file.to_path_buf()));
    }

    let output_dir = match &options.output_dir {
        Some(dir) => normalize(dir),
        None => file.parent().map(Path::to_path_buf).unwrap_or_default(),
    };
    let mut attachments = output_dir.clone();
    if let Some(segment) = options.attachments_dir {
        attachments.push(segment);
    }
    attachments.push(&title);

    std::fs::create_dir_all(&attachments)
        .map_err(|e| FilesystemError::new("create", &attachments, e))?;

    let output = output_dir.join(format!("{title}.md"));
    run_converter(file, &output, &attachments, ctx)?;

    let body = match std::fs::read_to_string(&output) {
        Ok(body) => body,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ConversionError::MissingOutput(output));
        }
        Err(e) => return Err(FilesystemError::new("read", &output, e).into()),
    };
    let header = front_matter::render_header(&title, &ctx.date, options.tags);
    std::fs::write(&output, format!("{header}\n\n{body}"))
        .map_err(|e| FilesystemError::new("write", &output, e))?;

    let warning = if ctx.tidy_media {
        tidy_media(&output, &attachments, &header, &body)
    } else {
        None
    };
    if let Some(e) = &warning {
        warn!("Converted {file:?}, but media tidy-up failed: {e}");
    }

    Ok(Converted {
        output,
        attachments,
        warning,
    })
}

fn run_converter(
    input: &Path,
    output: &Path,
    attachments: &Path,
    ctx: &Context,
) -> Result<(), ConversionError> {
    let converter = &ctx.converter;
    let mut extract_media = OsString::from("--extract-media=");
    extract_media.push(attachments);

    let mut command = Command::new(&converter.program);
    command
        .args(&converter.leading_args)
        .arg("-t")
        .arg(&converter.target_format)
        .arg(extract_media)
        .arg(input)
        .arg("-o")
        .arg(output);
    info!("Executing: {command:?}");

    let failed = |cause| ConversionError::ExternalProcess {
        input: input.to_path_buf(),
        cause,
    };
    let result = command.output().map_err(|source| {
        failed(ProcessFailure::Spawn {
            program: converter.program.clone(),
            source,
        })
    })?;

    let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
    if !result.status.success() {
        return Err(failed(ProcessFailure::Exit {
            program: converter.program.clone(),
            status: result.status,
            stderr,
        }));
    }
    if !stderr.is_empty() {
        warn!("stderr: {stderr}");
    }
    info!("File converted successfully: {output:?}");
    info!("Media files saved to: {attachments:?}");

    Ok(())
}

/// Returns the first problem met; links are retargeted for whatever moved
/// even when tidying stopped early.
fn tidy_media(
    output: &Path,
    attachments: &Path,
    header: &str,
    body: &str,
) -> Option<PostProcessError> {
    let tidied = media::tidy(attachments);
    if tidied.removed_empty {
        debug!("No media extracted, removed {attachments:?}");
    }
    let mut warning = tidied.error;
    if !tidied.moved.is_empty() {
        let body = media::retarget_links(body, attachments, &tidied.moved);
        if let Err(e) = std::fs::write(output, format!("{header}\n\n{body}")) {
            warning.get_or_insert(FilesystemError::new("write", output, e).into());
        }
    }
    warning
}

/// Lexical normalization: drops `.` and folds `..` into the preceding
/// segment where there is one.
fn normalize(path: &Path) -> PathBuf {
    let mut res = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(res.components().next_back(), Some(Component::Normal(_))) {
                    res.pop();
                } else if !res.has_root() {
                    res.push("..");
                }
            }
            c => res.push(c),
        }
    }
    if res.as_os_str().is_empty() {
        res.push(".");
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fake_converter, FAIL_MARKER, IMAGE_MARKER};

    #[test]
    fn normalizes_lexically() {
        assert_eq!(normalize(Path::new("./a/./b/../c")), PathBuf::from("a/c"));
        assert_eq!(normalize(Path::new("../a")), PathBuf::from("../a"));
        assert_eq!(normalize(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(normalize(Path::new("./")), PathBuf::from("."));
    }

    #[test]
    fn writes_header_and_body() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("docs/TeamA/Notes.docx");
        std::fs::create_dir_all(input.parent().unwrap()).unwrap();
        std::fs::write(&input, "hello world\n").unwrap();
        let mut ctx = Context::new(tmp.path().join("docs"), tmp.path().join("out"));
        ctx.converter = fake_converter(tmp.path());

        let tags = vec!["TeamA".to_string()];
        let options = ConvertOptions {
            output_dir: Some(tmp.path().join("out/./TeamA")),
            attachments_dir: Some("attachments"),
            tags: &tags,
        };
        let converted = convert(&input, &options, &ctx).unwrap();

        assert_eq!(converted.output, tmp.path().join("out/TeamA/Notes.md"));
        let content = std::fs::read_to_string(&converted.output).unwrap();
        assert_eq!(
            content,
            "---\ntitle: \"Notes\"\ndate: 2025-08-07T19:54:40.114Z\ncategories:\n - [\"TeamA\"]\n---\n\nhello world\n"
        );
        // nothing was extracted
        assert!(!tmp.path().join("out/TeamA/attachments/Notes").exists());
        assert!(converted.warning.is_none());
    }

    #[test]
    fn output_defaults_to_input_dir_and_attachment_segment_is_optional() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("Draft.docx");
        std::fs::write(&input, IMAGE_MARKER).unwrap();
        let mut ctx = Context::new(tmp.path(), tmp.path());
        ctx.converter = fake_converter(tmp.path());

        let converted = convert(&input, &ConvertOptions::default(), &ctx).unwrap();
        assert_eq!(converted.output, tmp.path().join("Draft.md"));
        assert_eq!(converted.attachments, tmp.path().join("Draft"));
        assert!(tmp.path().join("Draft/img1.png").is_file());
        assert!(!tmp.path().join("Draft/media").exists());

        let content = std::fs::read_to_string(&converted.output).unwrap();
        let link = format!("{}/img1.png", tmp.path().join("Draft").display());
        assert!(content.contains(&link), "{content}");
        assert!(!content.contains("/media/"));
    }

    #[test]
    fn media_dir_kept_when_tidy_disabled() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("Draft.docx");
        std::fs::write(&input, IMAGE_MARKER).unwrap();
        let mut ctx = Context::new(tmp.path(), tmp.path());
        ctx.converter = fake_converter(tmp.path());
        ctx.tidy_media = false;

        convert(&input, &ConvertOptions::default(), &ctx).unwrap();
        assert!(tmp.path().join("Draft/media/img1.png").is_file());
    }

    #[test]
    fn converter_failure_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("Broken.docx");
        std::fs::write(&input, FAIL_MARKER).unwrap();
        let mut ctx = Context::new(tmp.path(), tmp.path());
        ctx.converter = fake_converter(tmp.path());

        let err = convert(&input, &ConvertOptions::default(), &ctx).unwrap_err();
        match err {
            ConversionError::ExternalProcess {
                cause: ProcessFailure::Exit { stderr, status, .. },
                ..
            } => {
                assert_eq!(status.code(), Some(3));
                assert!(stderr.contains("cannot read"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!tmp.path().join("Broken.md").exists());
    }

    #[test]
    fn missing_program_is_a_spawn_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("Notes.docx");
        std::fs::write(&input, "x").unwrap();
        let mut ctx = Context::new(tmp.path(), tmp.path());
        ctx.converter.program = tmp.path().join("no-such-converter");

        let err = convert(&input, &ConvertOptions::default(), &ctx).unwrap_err();
        assert!(matches!(
            err,
            ConversionError::ExternalProcess {
                cause: ProcessFailure::Spawn { .. },
                ..
            }
        ));
    }

    #[test]
    fn blank_title_is_rejected_before_touching_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join(" .docx");
        std::fs::write(&input, "x").unwrap();
        let mut ctx = Context::new(tmp.path(), tmp.path());
        ctx.converter = fake_converter(tmp.path());

        let options = ConvertOptions {
            output_dir: Some(tmp.path().join("out")),
            attachments_dir: Some("attachments"),
            tags: &[],
        };
        let err = convert(&input, &options, &ctx).unwrap_err();
        assert!(matches!(err, ConversionError::EmptyTitle(p) if p == input));
        assert!(!tmp.path().join("out").exists());
    }

    #[test]
    fn silent_converter_without_output_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("Notes.docx");
        std::fs::write(&input, "x").unwrap();
        let mut ctx = Context::new(tmp.path(), tmp.path());
        ctx.converter.program = PathBuf::from("true");

        let err = convert(&input, &ConvertOptions::default(), &ctx).unwrap_err();
        assert!(matches!(err, ConversionError::MissingOutput(p) if p == tmp.path().join("Notes.md")));
    }
}
