// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Command-line interface for faqmd.
//!
//! This binary provides the `faqmd` command for rendering assistant answers,
//! or whole `/chat` response bodies, to HTML fragments.

use faqmd::guide::{self, Guide};
use faqmd::renderer;
use faqmd::transcript::{self, Transcript};
use lexopt::prelude::*;
use snafu::{OptionExt, ensure, prelude::*};
use std::io::Read;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Where to write the rendered output.
#[derive(Clone)]
enum OutputTarget {
    /// Write each file to the specified directory.
    Directory(PathBuf),
    /// Write to stdout.
    Stdout,
}

#[allow(clippy::struct_excessive_bools)]
struct Cli {
    input: Vec<PathBuf>,
    output: OutputTarget,
    concat: bool,
    response: bool,
    page: bool,
    guide: Option<PathBuf>,
    topics: bool,
    quiet: bool,
    dry_run: bool,
    force: bool,
}

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to parse arguments: {source}"))]
    ParseArgs { source: lexopt::Error },

    #[snafu(display("at least one input file or directory is required"))]
    NoInputFiles,

    #[snafu(display("cannot output multiple files to stdout without --concat"))]
    MultipleFilesToStdout,

    #[snafu(display("failed to create output directory: {source}"))]
    CreateOutputDir { source: std::io::Error },

    #[snafu(display("failed to read {}: {source}", path.display()))]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to load guide: {source}"))]
    LoadGuide { source: guide::GuideError },

    #[snafu(display("invalid input filename: no file stem"))]
    InvalidFilename,

    #[snafu(display("failed to write {}: {source}", path.display()))]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn print_help() {
    println!(
        "\
{name} {version}
Render knowledge-base chat answers to safe HTML

Usage: {name} [OPTIONS] -o <OUTPUT> <INPUT>...

Arguments:
  <INPUT>...  Answer text files, directories, or - for stdin

Options:
  -o, --output <OUTPUT>     Output directory (or file with --concat, or - for stdout)
      --concat              Combine all inputs into a single output
      --response            Inputs are /chat response bodies (JSON)
      --page                Wrap output in a standalone HTML page
      --guide <FILE>        Load guided prompts from a JSON file
      --topics              Print the guided prompts and exit

Other options:
  -q, --quiet               Suppress progress messages
  -n, --dry-run             Show what would be processed without writing
  -f, --force               Overwrite existing output files
  -h, --help                Print help
  -V, --version             Print version

Set RUST_LOG=debug for diagnostics.",
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
    );
}

fn parse_args() -> Result<Cli, lexopt::Error> {
    // Show help if no arguments provided
    if std::env::args().len() == 1 {
        print_help();
        std::process::exit(0);
    }

    let mut input = Vec::new();
    let mut output: Option<OutputTarget> = None;
    let mut concat = false;
    let mut response = false;
    let mut page = false;
    let mut guide = None;
    let mut topics = false;
    let mut quiet = false;
    let mut dry_run = false;
    let mut force = false;

    let mut parser = lexopt::Parser::from_env();
    while let Some(arg) = parser.next()? {
        match arg {
            Short('o') | Long("output") => {
                let val: PathBuf = parser.value()?.parse()?;
                output = Some(if val == Path::new("-") {
                    OutputTarget::Stdout
                } else {
                    OutputTarget::Directory(val)
                });
            }
            Long("concat") => concat = true,
            Long("response") => response = true,
            Long("page") => page = true,
            Long("guide") => guide = Some(parser.value()?.parse()?),
            Long("topics") => topics = true,
            Short('q') | Long("quiet") => quiet = true,
            Short('n') | Long("dry-run") => dry_run = true,
            Short('f') | Long("force") => force = true,
            Short('h') | Long("help") => {
                print_help();
                std::process::exit(0);
            }
            Short('V') | Long("version") => {
                println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            Value(val) => input.push(val.parse()?),
            _ => return Err(arg.unexpected()),
        }
    }

    // --topics only prints the guide, so it needs no output target
    let output = match output {
        Some(output) => output,
        None if topics => OutputTarget::Stdout,
        None => return Err("missing required option: --output".into()),
    };

    Ok(Cli {
        input,
        output,
        concat,
        response,
        page,
        guide,
        topics,
        quiet,
        dry_run,
        force,
    })
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Error> {
    init_tracing();

    let cli = parse_args().context(ParseArgsSnafu)?;

    let guide = match &cli.guide {
        Some(path) => Guide::load(path).context(LoadGuideSnafu)?,
        None => Guide::default(),
    };

    if cli.topics {
        print!("{}", describe_guide(&guide));
        return Ok(());
    }

    ensure!(!cli.input.is_empty(), NoInputFilesSnafu);

    // Collect all input files first
    let files = collect_input_files(&cli.input, cli.response);
    tracing::debug!(count = files.len(), "collected inputs");

    if cli.concat {
        process_concat(&files, &cli, &guide)?;
    } else {
        match &cli.output {
            OutputTarget::Stdout => {
                // Without concat, we can only output one file to stdout
                ensure!(files.len() == 1, MultipleFilesToStdoutSnafu);
                process_to_stdout(&files[0], &cli, &guide)?;
            }
            OutputTarget::Directory(dir) => {
                if !cli.dry_run {
                    std::fs::create_dir_all(dir).context(CreateOutputDirSnafu)?;
                }
                for file in &files {
                    process_file(file, dir, &cli, &guide)?;
                }
            }
        }
    }

    Ok(())
}

/// Collects input files from the given inputs (files, directories, and `-`).
///
/// Directories contribute `.json` files in response mode and `.md`/`.txt`
/// files otherwise.
fn collect_input_files(inputs: &[PathBuf], response: bool) -> Vec<PathBuf> {
    let wanted: &[&str] = if response { &["json"] } else { &["md", "txt"] };

    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            for entry in WalkDir::new(input)
                .sort_by_file_name()
                .into_iter()
                .filter_map(Result::ok)
                .filter(|e| {
                    e.path()
                        .extension()
                        .and_then(|ext| ext.to_str())
                        .is_some_and(|ext| wanted.contains(&ext))
                })
            {
                files.push(entry.path().to_path_buf());
            }
        } else {
            files.push(input.clone());
        }
    }
    files
}

/// Reads one input, with `-` meaning stdin.
fn read_input(path: &Path) -> Result<String, Error> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context(ReadFileSnafu { path })?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).context(ReadFileSnafu { path })
}

/// Renders one input to an HTML fragment.
///
/// In response mode the input is a `/chat` body and becomes a full message
/// bubble; otherwise it is answer text rendered as-is.
fn render_input(source: &str, cli: &Cli) -> String {
    if cli.response {
        let mut transcript = Transcript::new();
        transcript.receive(source);
        transcript.to_html()
    } else {
        renderer::render(source)
    }
}

/// Wraps rendered fragments in a standalone page with the guided menu.
fn wrap_page(body: &str, guide: &Guide) -> String {
    let first_topic = guide.topics.first().map_or("", |t| t.name.as_str());
    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head><meta charset=\"utf-8\"><title>FAQ Chat</title></head>\n\
         <body>\n\
         <div id=\"samples\">{samples}</div>\n\
         <select id=\"topic\">{topics}</select>\n\
         <select id=\"prompt\">{prompts}</select>\n\
         <div id=\"chat\">{body}</div>\n\
         <div id=\"status\">{status}</div>\n\
         </body>\n\
         </html>\n",
        samples = guide.sample_chips(),
        topics = guide.topic_options(),
        prompts = guide.prompt_options(first_topic),
        status = transcript::Status::Ready,
    )
}

/// Finishes a rendered document, wrapping it in a page when requested.
fn finish(body: &str, cli: &Cli, guide: &Guide) -> String {
    if cli.page {
        wrap_page(body, guide)
    } else {
        format!("{body}\n")
    }
}

/// Lists the guided topics and their prompts as plain text.
fn describe_guide(guide: &Guide) -> String {
    let mut out = String::new();
    for topic in &guide.topics {
        out.push_str(&topic.name);
        out.push('\n');
        for prompt in &topic.prompts {
            out.push_str("  - ");
            out.push_str(prompt);
            out.push('\n');
        }
    }
    if !guide.samples.is_empty() {
        out.push_str("Samples\n");
        for sample in &guide.samples {
            out.push_str("  - ");
            out.push_str(sample);
            out.push('\n');
        }
    }
    out
}

/// Processes a single file and outputs to stdout.
fn process_to_stdout(input: &Path, cli: &Cli, guide: &Guide) -> Result<(), Error> {
    if cli.dry_run {
        eprintln!("Would output {}", input.display());
        return Ok(());
    }

    let source = read_input(input)?;
    let html = render_input(&source, cli);

    print!("{}", finish(&html, cli, guide));
    Ok(())
}

/// Processes multiple files and concatenates them into a single output.
fn process_concat(files: &[PathBuf], cli: &Cli, guide: &Guide) -> Result<(), Error> {
    let mut body = String::new();

    for path in files {
        let source = read_input(path)?;
        body.push_str(&render_input(&source, cli));
    }
    let output = finish(&body, cli, guide);

    match &cli.output {
        OutputTarget::Stdout => {
            if cli.dry_run {
                eprintln!("Would output {} files concatenated", files.len());
            } else {
                print!("{output}");
            }
        }
        OutputTarget::Directory(path) => {
            // In concat mode, treat path as a file, not directory
            if cli.dry_run {
                eprintln!(
                    "Would write {} ({} files concatenated)",
                    path.display(),
                    files.len()
                );
            } else if path.exists() && !cli.force {
                eprintln!(
                    "Skipping {} (already exists, use --force to overwrite)",
                    path.display()
                );
            } else {
                if let Some(parent) = path.parent()
                    && !parent.as_os_str().is_empty()
                {
                    std::fs::create_dir_all(parent).context(CreateOutputDirSnafu)?;
                }
                std::fs::write(path, &output).context(WriteFileSnafu { path })?;
                if !cli.quiet {
                    eprintln!("Wrote {} ({} files)", path.display(), files.len());
                }
            }
        }
    }

    Ok(())
}

/// Processes a single file and writes to the output directory.
fn process_file(input: &Path, out_dir: &Path, cli: &Cli, guide: &Guide) -> Result<(), Error> {
    let out_name = if input == Path::new("-") {
        "stdin".into()
    } else {
        input.file_stem().context(InvalidFilenameSnafu)?.to_string_lossy()
    };
    let out_path = out_dir.join(format!("{out_name}.html"));

    if cli.dry_run {
        eprintln!("Would write {}", out_path.display());
        return Ok(());
    }

    if out_path.exists() && !cli.force {
        eprintln!(
            "Skipping {} (already exists, use --force to overwrite)",
            out_path.display()
        );
        return Ok(());
    }

    let source = read_input(input)?;
    let html = finish(&render_input(&source, cli), cli, guide);

    std::fs::write(&out_path, &html).context(WriteFileSnafu { path: &out_path })?;

    if !cli.quiet {
        eprintln!("Wrote {}", out_path.display());
    }
    Ok(())
}
