mod catalog;
mod color;
mod config;
mod document;
mod error;
mod frames;
mod merge;
mod page;
mod playback;
mod preview;
mod render;
mod term;
mod wizard;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};

use crate::catalog::{default_output_name, ensure_json_extension};
use crate::config::{AppConfig, DEFAULT_CONFIG_PATH};
use crate::document::{load_document, save_document, CUSTOM_LED_PAGES};
use crate::merge::{merge, MergeSelection, PageSource};
use crate::page::{lint_led_page, PageView};
use crate::playback::DEFAULT_PREVIEW_DURATION_MS;
use crate::preview::{plan_pages, run_preview};
use crate::wizard::run_wizard;

#[derive(Debug, Parser)]
#[command(name = "cbmerge")]
#[command(about = "CYBERBOARD R4 custom-LED configuration merger")]
#[command(version = version_string())]
struct Cli {
    /// Config file naming the source and output directories
    #[arg(long = "config", global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Validate a configuration document
    Check {
        file: PathBuf,
        /// Also run the advisory per-page lint
        #[arg(long)]
        strict: bool,
    },
    /// Summarize every page of a document
    Show { file: PathBuf },
    /// Play the looping preview for the Custom LED pages
    Preview {
        file: PathBuf,
        /// Preview a single Custom LED page instead of all three
        #[arg(long)]
        page: Option<usize>,
        #[arg(long = "duration-ms", default_value_t = DEFAULT_PREVIEW_DURATION_MS)]
        duration_ms: u64,
    },
    /// Merge Custom LED pages into a base document without the wizard
    Merge {
        #[arg(long)]
        base: PathBuf,
        /// Slot assignment, repeatable: 5=keep or 5=other.json:6
        #[arg(long = "led")]
        led: Vec<String>,
        /// Path for the merged output; defaults to a timestamped file in the
        /// configured output directory
        #[arg(long, conflicts_with = "overwrite")]
        output: Option<String>,
        /// Write back over the base file
        #[arg(long)]
        overwrite: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => run_wizard(&cli.config),
        Some(Commands::Check { file, strict }) => run_check(&file, strict),
        Some(Commands::Show { file }) => run_show(&file),
        Some(Commands::Preview {
            file,
            page,
            duration_ms,
        }) => run_preview_command(&file, page, duration_ms),
        Some(Commands::Merge {
            base,
            led,
            output,
            overwrite,
        }) => run_merge_command(&cli.config, &base, &led, output.as_deref(), overwrite),
    }
}

fn run_check(file: &Path, strict: bool) -> Result<()> {
    let document = load_document(file)?;
    document
        .validate()
        .map_err(|error| anyhow!("{}: {error}", file.display()))?;

    println!("OK: {} ({} pages)", file.display(), document.pages().len());

    if strict {
        let mut findings = Vec::new();
        for &page_index in &CUSTOM_LED_PAGES {
            if let Some(page) = document.page(page_index) {
                findings.extend(lint_led_page(page, page_index));
            }
        }
        if findings.is_empty() {
            println!("Lint: clean");
        } else {
            println!("Lint findings: {}", findings.len());
            for finding in &findings {
                println!("  - {finding}");
            }
        }
    }
    Ok(())
}

fn run_show(file: &Path) -> Result<()> {
    let document = load_document(file)?;

    println!("{}", file.display());
    println!(
        "{:<5} {:<10} {:>6} {:>9} {:<8}",
        "page", "kind", "frames", "speed_ms", "color"
    );
    for (index, page) in document.pages().iter().enumerate() {
        let view = PageView::new(page);
        let kind = view.kind().map(|kind| kind.as_str()).unwrap_or("-");
        let frames = match view.kind() {
            Some(_) if view.active_frame_set().is_some() => view.frame_count().to_string(),
            Some(_) => "1".to_owned(),
            None => "-".to_owned(),
        };
        let speed = view
            .speed_ms()
            .map(|ms| ms.to_string())
            .unwrap_or_else(|| "-".to_owned());
        let color = view.default_color().to_hex();
        let marker = if CUSTOM_LED_PAGES.contains(&index) {
            "  custom LED"
        } else {
            ""
        };
        println!("{index:<5} {kind:<10} {frames:>6} {speed:>9} {color:<8}{marker}");
    }

    if let Some(declared) = document.page_num() {
        if declared as usize != document.pages().len() {
            println!(
                "note: page_num declares {declared}, found {} pages",
                document.pages().len()
            );
        }
    }
    Ok(())
}

fn run_preview_command(file: &Path, page: Option<usize>, duration_ms: u64) -> Result<()> {
    let document = load_document(file)?;
    document
        .validate()
        .map_err(|error| anyhow!("{}: {error}", file.display()))?;

    let pages = match page {
        Some(index) if CUSTOM_LED_PAGES.contains(&index) => vec![index],
        Some(index) => bail!("--page {index}: only Custom LED pages 5, 6, and 7 can be previewed"),
        None => CUSTOM_LED_PAGES.to_vec(),
    };

    let previews = plan_pages(&document, &pages);
    eprintln!(
        "[cbmerge] preview: {} ({} ms window), any key skips",
        file.display(),
        duration_ms
    );
    run_preview(&previews, duration_ms)?;
    Ok(())
}

fn run_merge_command(
    config_path: &Path,
    base: &Path,
    led_specs: &[String],
    output: Option<&str>,
    overwrite: bool,
) -> Result<()> {
    let base_document = load_document(base)?;
    base_document
        .validate()
        .map_err(|error| anyhow!("{}: {error}", base.display()))?;

    let mut selections = MergeSelection::new();
    for spec in led_specs {
        let (target_page, parsed) = parse_led_spec(spec)?;
        let source = match parsed {
            LedSpecArg::Keep => PageSource::KeepBase,
            LedSpecArg::FromFile { file, page } => PageSource::Replace {
                document: load_document(&file)?,
                page_index: page,
            },
        };
        selections.set(target_page, source);
    }

    let merged = merge(&base_document, &selections)?;

    let path = if overwrite {
        base.to_path_buf()
    } else {
        match output {
            Some(name) => PathBuf::from(ensure_json_extension(name)),
            None => {
                let config = AppConfig::load(config_path);
                fs::create_dir_all(&config.output_dir).with_context(|| {
                    format!("failed to create directory {}", config.output_dir.display())
                })?;
                config.output_dir.join(default_output_name())
            }
        }
    };
    save_document(&path, &merged)?;
    println!("Wrote {}", path.display());
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum LedSpecArg {
    Keep,
    FromFile { file: PathBuf, page: usize },
}

/// Parse one `--led` assignment: `5=keep` or `5=other.json:6`.
fn parse_led_spec(spec: &str) -> Result<(usize, LedSpecArg)> {
    let (target_raw, source_raw) = spec
        .split_once('=')
        .ok_or_else(|| anyhow!("--led '{spec}': expected <page>=keep or <page>=<file>:<page>"))?;
    let target_page: usize = target_raw
        .trim()
        .parse()
        .map_err(|_| anyhow!("--led '{spec}': '{target_raw}' is not a page number"))?;
    if !CUSTOM_LED_PAGES.contains(&target_page) {
        bail!("--led '{spec}': target page must be 5, 6, or 7");
    }

    let source_raw = source_raw.trim();
    if source_raw.eq_ignore_ascii_case("keep") {
        return Ok((target_page, LedSpecArg::Keep));
    }

    let (file_raw, page_raw) = source_raw
        .rsplit_once(':')
        .ok_or_else(|| anyhow!("--led '{spec}': expected <file>:<page> after '='"))?;
    let page: usize = page_raw
        .trim()
        .parse()
        .map_err(|_| anyhow!("--led '{spec}': '{page_raw}' is not a page number"))?;
    if file_raw.is_empty() {
        bail!("--led '{spec}': missing source file");
    }
    Ok((
        target_page,
        LedSpecArg::FromFile {
            file: PathBuf::from(file_raw),
            page,
        },
    ))
}

fn version_string() -> String {
    match option_env!("CBMERGE_GIT_HASH") {
        Some(hash) => format!("{} ({hash})", env!("CARGO_PKG_VERSION")),
        None => env!("CARGO_PKG_VERSION").to_owned(),
    }
}
