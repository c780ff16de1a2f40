use std::{ffi::OsString, path::PathBuf};

use anyhow::bail;
use clap::{command, Arg, ArgAction, ArgMatches, Command};
use context::{Context, Converter, DateSource, DEFAULT_DATE};
use differ::TitlePolicy;
use fixer::TitleFix;
use report::save_report;

mod context;
mod converter;
mod differ;
mod error;
mod fixer;
mod metadata;
mod report;
mod runner;
#[cfg(test)]
mod test_support;
mod walker;

fn build_context(matches: &ArgMatches) -> anyhow::Result<Context> {
    let source_root: &PathBuf = matches.get_one("source").unwrap();
    if !source_root.is_dir() {
        bail!("source must be a directory.");
    }
    let output_root: &PathBuf = matches.get_one("output").unwrap();
    if output_root.exists() && !output_root.is_dir() {
        bail!("if output exists, it must be a directory.");
    }

    let mut ctx = Context::new(source_root, output_root);
    ctx.attachments_dir = if matches.get_flag("no_attachments_dir") {
        None
    } else {
        matches.get_one::<String>("attachments").cloned()
    };
    ctx.date = if matches.get_flag("now") {
        DateSource::Clock
    } else {
        DateSource::Fixed(matches.get_one::<String>("date").unwrap().clone())
    }
    .resolve();
    ctx.title_policy = match matches.get_one::<String>("match").map(String::as_str) {
        Some("exact") => TitlePolicy::Exact,
        _ => TitlePolicy::Normalized,
    };
    ctx.skip_marker = matches
        .get_one::<String>("skip_marker")
        .filter(|m| !m.is_empty())
        .cloned();
    ctx.converter = Converter {
        program: matches.get_one::<PathBuf>("converter").unwrap().clone(),
        leading_args: matches
            .get_many::<String>("converter_arg")
            .unwrap_or_default()
            .map(OsString::from)
            .collect(),
        target_format: matches.get_one::<String>("to").unwrap().clone(),
    };
    ctx.jobs = *matches.get_one::<usize>("jobs").unwrap();
    ctx.tidy_media = !matches.get_flag("keep_media_dir");
    if let Some(tokens) = matches.get_many::<String>("strip_token") {
        let mut strip_tokens: Vec<String> = tokens.cloned().collect();
        strip_tokens.push("\"".to_string());
        ctx.title_fix = TitleFix {
            strip_tokens,
            ..TitleFix::default()
        };
    }

    Ok(ctx)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = command!()
        .subcommand(Command::new("convert").about("Convert new documents (default)"))
        .subcommand(Command::new("fix").about("Normalize titles of converted documents"))
        .args(&[
            Arg::new("source")
                .long("source")
                .help("Directory of source documents. Subdirectories become tags.")
                .value_parser(clap::value_parser!(PathBuf))
                .default_value("docs")
                .global(true),
            Arg::new("output")
                .long("output")
                .help("Directory of converted documents. Mirrors the tag chain of source.")
                .value_parser(clap::value_parser!(PathBuf))
                .default_value("source/_posts")
                .global(true),
            Arg::new("attachments")
                .long("attachments")
                .help("Name of the directory holding extracted media, inside each tag directory")
                .default_value("attachments")
                .global(true),
            Arg::new("no_attachments_dir")
                .long("no-attachments-dir")
                .help("Put per-document media directories directly into the tag directory")
                .action(ArgAction::SetTrue)
                .global(true),
            Arg::new("date")
                .long("date")
                .help("Timestamp written into every front matter")
                .default_value(DEFAULT_DATE)
                .global(true),
            Arg::new("now")
                .long("now")
                .help("Use the current time instead of --date")
                .action(ArgAction::SetTrue)
                .global(true),
            Arg::new("match")
                .long("match")
                .help("How titles of existing documents are compared")
                .value_parser(["exact", "normalized"])
                .default_value("normalized")
                .global(true),
            Arg::new("skip_marker")
                .long("skip-marker")
                .help("Documents whose title contains this are never converted. Empty disables.")
                .default_value("ГОТОВ")
                .global(true),
            Arg::new("converter")
                .long("converter")
                .help("Converter program, called like pandoc")
                .value_parser(clap::value_parser!(PathBuf))
                .default_value("pandoc")
                .global(true),
            Arg::new("converter_arg")
                .long("converter-arg")
                .help("Extra argument passed to the converter before the generated ones")
                .action(ArgAction::Append)
                .allow_hyphen_values(true)
                .global(true),
            Arg::new("to")
                .long("to")
                .help("Output format of the converter")
                .default_value("markdown_strict")
                .global(true),
            Arg::new("jobs")
                .short('j')
                .long("jobs")
                .help("Maximum number of conversions running at once")
                .value_parser(clap::value_parser!(usize))
                .default_value("10")
                .global(true),
            Arg::new("keep_media_dir")
                .long("keep-media-dir")
                .help("Leave extracted media in the media subdirectory")
                .action(ArgAction::SetTrue)
                .global(true),
            Arg::new("strip_token")
                .long("strip-token")
                .help("Token removed from titles by fix (replaces the default ГОТОВ)")
                .action(ArgAction::Append)
                .global(true),
            Arg::new("report")
                .long("report")
                .help("Write a JSON report of the run to this file")
                .value_parser(clap::value_parser!(PathBuf))
                .global(true),
        ])
        .get_matches();

    let ctx = build_context(&matches)?;
    let report = match matches.subcommand_name() {
        Some("fix") => fixer::fix_all(&ctx)?,
        _ => runner::run(&ctx)?,
    };

    if let Some(report_path) = matches.get_one::<PathBuf>("report") {
        save_report(report_path, &report)?;
    }

    Ok(())
}
