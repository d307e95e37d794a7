//! CLI binary for md2docx.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use md2docx::{
    convert_to_file, export, ConversionConfig, ConversionProgressCallback, ConversionStats,
    ProgressCallback,
};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar over source lines plus one log
/// line per image. Lines may complete out of order when classification runs
/// concurrently; the bar only counts.
struct CliProgressCallback {
    bar: ProgressBar,
    images: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_conversion_start` reports the line count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading Markdown…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            images: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>4}/{len} lines  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Converting");
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_lines: usize) {
        self.activate_bar(total_lines);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {total_lines} lines…"))
        ));
    }

    fn on_line_complete(&self, line_num: usize, _total: usize, kind: &str) {
        self.bar.set_message(format!("line {line_num} ({kind})"));
        self.bar.inc(1);
    }

    fn on_image_resolved(&self, line_num: usize, width: u32, height: u32) {
        self.images.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} Line {:>4}  {}",
            green("✓"),
            line_num,
            dim(&format!("image {width}×{height}px")),
        ));
    }

    fn on_image_failed(&self, line_num: usize, reason: &str) {
        // Keep output tidy.
        let msg = if reason.chars().count() > 80 {
            format!("{}\u{2026}", reason.chars().take(79).collect::<String>())
        } else {
            reason.to_string()
        };
        self.bar
            .println(format!("  {} Line {:>4}  {}", red("✗"), line_num, red(&msg)));
    }

    fn on_conversion_complete(&self, total_blocks: usize, image_failures: usize) {
        self.bar.finish_and_clear();
        let images = self.images.load(Ordering::SeqCst);
        if image_failures == 0 {
            eprintln!(
                "{} {} blocks, {} images embedded",
                green("✔"),
                bold(&total_blocks.to_string()),
                images
            );
        } else {
            eprintln!(
                "{} {} blocks, {} images embedded  ({} replaced by placeholders)",
                cyan("⚠"),
                bold(&total_blocks.to_string()),
                images,
                red(&image_failures.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Export next to the source: notes/exports/today.docx
  md2docx notes/today.md

  # Explicit output file
  md2docx notes/today.md -o today.docx

  # Smaller images, attachments kept elsewhere
  md2docx --max-width 400 --max-height 300 --assets vault/attachments notes/today.md

  # Real, clickable hyperlinks
  md2docx --clickable-links notes/today.md

  # JSON stats for scripting
  md2docx --json notes/today.md > stats.json

SUPPORTED MARKDOWN (one block per line):
  # / ## / ###      headings           > quote        block quote
  - item / * item   bullet list        1. item        numbered list
  ```code```        code line          `code`         inline code
  --- / ***         horizontal rule    [text](url)    hyperlink
  ![alt](img.png)   image              ![[img.png]]   wiki-style image
  **bold** __bold__ bold spans         *italic*       italic line

  Images: PNG and JPEG are sized from their headers and scaled down to fit
  --max-width × --max-height. GIF, BMP and undetectable images use
  --default-width × --default-height. SVG is not supported; missing or
  unsupported images become an "[Image: alt]" paragraph.

ENVIRONMENT VARIABLES:
  Every flag has an MD2DOCX_* fallback, e.g. MD2DOCX_MAX_WIDTH=400.
  RUST_LOG overrides the log filter.
"#;

/// Convert Markdown notes to Word documents.
#[derive(Parser, Debug)]
#[command(
    name = "md2docx",
    version,
    about = "Convert Markdown notes to Word (.docx) documents",
    long_about = "Convert a Markdown file to a Word document. Each line becomes one paragraph, \
heading, list item, quote, code line, link or image. Without -o the document is written to an \
'exports' folder next to the source, never overwriting an earlier export.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Markdown file to convert.
    input: PathBuf,

    /// Write the document to this file instead of the export folder.
    #[arg(short, long, env = "MD2DOCX_OUTPUT")]
    output: Option<PathBuf>,

    /// Maximum displayed image width in pixels.
    #[arg(long, env = "MD2DOCX_MAX_WIDTH", default_value_t = 600,
          value_parser = clap::value_parser!(u32).range(1..))]
    max_width: u32,

    /// Maximum displayed image height in pixels.
    #[arg(long, env = "MD2DOCX_MAX_HEIGHT", default_value_t = 800,
          value_parser = clap::value_parser!(u32).range(1..))]
    max_height: u32,

    /// Width used when an image's size cannot be read.
    #[arg(long, env = "MD2DOCX_DEFAULT_WIDTH", default_value_t = 400,
          value_parser = clap::value_parser!(u32).range(1..))]
    default_width: u32,

    /// Height used when an image's size cannot be read.
    #[arg(long, env = "MD2DOCX_DEFAULT_HEIGHT", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(1..))]
    default_height: u32,

    /// Directory image references resolve against (default: the input's directory).
    #[arg(long, env = "MD2DOCX_ASSETS")]
    assets: Option<PathBuf>,

    /// Name of the export folder created next to the input.
    #[arg(long, env = "MD2DOCX_EXPORT_DIR", default_value = "exports")]
    export_dir: String,

    /// Emit real hyperlinks instead of styled link text.
    #[arg(long, env = "MD2DOCX_CLICKABLE_LINKS")]
    clickable_links: bool,

    /// Number of lines classified concurrently.
    #[arg(short, long, env = "MD2DOCX_CONCURRENCY", default_value_t = 8)]
    concurrency: usize,

    /// Document title (default: the input file name).
    #[arg(long, env = "MD2DOCX_TITLE")]
    title: Option<String>,

    /// Print the output path and conversion stats as JSON on stdout.
    #[arg(long, env = "MD2DOCX_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "MD2DOCX_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MD2DOCX_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "MD2DOCX_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Run conversion ───────────────────────────────────────────────────
    let (output_path, stats) = if let Some(ref output_path) = cli.output {
        let stats = convert_to_file(&cli.input, output_path, &config)
            .await
            .context("Conversion failed")?;
        (output_path.clone(), stats)
    } else {
        export(&cli.input, &config)
            .await
            .context("Conversion failed")?
    };

    if cli.json {
        let json = serde_json::json!({
            "output": output_path,
            "stats": stats,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&json).context("Failed to serialise stats")?
        );
    } else if !cli.quiet {
        print_summary(&stats, &output_path, show_progress);
    }

    Ok(())
}

fn print_summary(stats: &ConversionStats, output_path: &std::path::Path, show_progress: bool) {
    // The callback already printed the block/image tally.
    if !show_progress {
        eprintln!(
            "Converted {} lines ({} images, {} failed)",
            stats.total_lines, stats.images_embedded, stats.image_failures
        );
        for err in &stats.image_errors {
            eprintln!("  {}", err);
        }
    }
    eprintln!(
        "{}  {} bytes  {}ms  →  {}",
        if stats.image_failures == 0 {
            green("✔")
        } else {
            cyan("⚠")
        },
        stats.output_bytes,
        stats.total_duration_ms,
        bold(&output_path.display().to_string()),
    );
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .image_max_width(cli.max_width)
        .image_max_height(cli.max_height)
        .default_image_width(cli.default_width.min(cli.max_width))
        .default_image_height(cli.default_height.min(cli.max_height))
        .concurrency(cli.concurrency)
        .clickable_links(cli.clickable_links)
        .export_dir_name(cli.export_dir.clone());

    if let Some(ref dir) = cli.assets {
        builder = builder.asset_root(dir.clone());
    }
    if let Some(ref title) = cli.title {
        builder = builder.title(title.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
