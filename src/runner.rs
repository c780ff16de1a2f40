use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context as _};
use log::{debug, info, warn};
use rayon::prelude::*;

use crate::{
    context::Context,
    converter::{self, ConvertOptions, Converted},
    differ,
    error::ConversionError,
    metadata::FileMeta,
    report::RunReport,
    walker,
};

/// Extension of the documents found in the output tree.
pub(crate) const OUTPUT_EXTENSION: &str = ".md";

/// Maps `f` over `items` with at most `jobs` calls in flight. Returns only
/// after every item has settled.
pub(crate) fn bounded_map<T, R, F>(jobs: usize, items: &[T], f: F) -> anyhow::Result<Vec<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .build()
        .context("while building worker pool")?;
    Ok(pool.install(|| items.par_iter().map(f).collect()))
}

/// Source documents below `ctx.source_root`, with their metadata.
pub(crate) fn scan_sources(ctx: &Context) -> anyhow::Result<Vec<FileMeta>> {
    let files = walker::walk(&ctx.source_root)
        .with_context(|| format!("while scanning {:?}", ctx.source_root))?;
    Ok(files
        .iter()
        .map(|f| FileMeta::extract_under(&ctx.source_root, f))
        .collect())
}

fn scan_existing(ctx: &Context) -> anyhow::Result<Vec<FileMeta>> {
    let root = &ctx.output_root;
    if !root.exists() {
        info!("Output root {root:?} does not exist yet. Nothing converted before.");
        return Ok(vec![]);
    }
    if !root.is_dir() {
        bail!("output root {root:?} is not a directory.");
    }
    let files = walker::walk(root).with_context(|| format!("while scanning {root:?}"))?;
    Ok(files
        .iter()
        .map(|f| FileMeta::extract_under(root, f))
        .filter(|m| m.has_extension(OUTPUT_EXTENSION))
        .collect())
}

pub(crate) fn output_path(ctx: &Context, file: &FileMeta) -> PathBuf {
    ctx.output_dir_for(&file.tags)
        .join(format!("{}{OUTPUT_EXTENSION}", file.title))
}

/// Two sources mapping onto one output would overwrite each other.
fn warn_collisions(ctx: &Context, work: &[FileMeta]) {
    let mut targets: HashMap<PathBuf, Vec<&Path>> = HashMap::new();
    for file in work {
        targets
            .entry(output_path(ctx, file))
            .or_default()
            .push(&file.file);
    }
    for (target, sources) in targets {
        if sources.len() > 1 {
            warn!("{} sources convert to {target:?}: {sources:?}", sources.len());
        }
    }
}

fn convert_one(ctx: &Context, file: &FileMeta) -> Result<Converted, ConversionError> {
    info!("Processing file: {:?}", file.file);
    let options = ConvertOptions {
        output_dir: Some(ctx.output_dir_for(&file.tags)),
        attachments_dir: ctx.attachments_dir.as_deref(),
        tags: &file.tags,
    };
    converter::convert(&file.file, &options, ctx)
}

/// One full conversion run. Only scanning failures are fatal; failures of
/// individual documents end up in the report.
pub(crate) fn run(ctx: &Context) -> anyhow::Result<RunReport> {
    let new_files = scan_sources(ctx)?;
    let existing = scan_existing(ctx)?;
    let outcome = differ::diff(
        new_files,
        &existing,
        ctx.title_policy,
        ctx.skip_marker.as_deref(),
    );

    let paths = |files: &[FileMeta]| files.iter().map(|f| f.file.clone()).collect::<Vec<_>>();
    let mut report = RunReport {
        already_converted: paths(&outcome.already_converted),
        denylisted: paths(&outcome.denylisted),
        ..Default::default()
    };

    let (work, unsupported): (Vec<_>, Vec<_>) = outcome
        .work
        .into_iter()
        .partition(|f| f.has_extension(&ctx.source_extension) && !f.title.is_empty());
    for file in &unsupported {
        info!("Skipping file: {:?}", file.file);
    }
    report.unsupported = paths(&unsupported);

    warn_collisions(ctx, &work);
    let results = bounded_map(ctx.jobs, &work, |file| convert_one(ctx, file))?;

    for (file, result) in work.iter().zip(results) {
        match result {
            Ok(converted) => {
                debug!(
                    "{:?} -> {:?}, media in {:?}",
                    file.file, converted.output, converted.attachments
                );
                if let Some(warning) = converted.warning {
                    report.warn(&file.file, warning);
                }
                report.converted.push(file.file.clone());
            }
            Err(e) => report.fail(&file.file, e),
        }
    }

    report.log_summary();
    Ok(report)
}
