//! CLI binary for docshift.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig`, writes outputs and prints a summary.

use anyhow::{Context, Result};
use clap::Parser;
use docshift::{
    convert_batch, registry, ConversionConfig, ConversionProgressCallback, Format, OutputNaming,
    PageSelection, ProgressCallback, SourceFile,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar across the batch and a log line per
/// file.
struct CliProgressCallback {
    bar: ProgressBar,
    started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        let bar = ProgressBar::new(0);
        bar.set_style(style);
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            started: Mutex::new(None),
        })
    }

    fn elapsed(&self) -> String {
        let ms = self
            .started
            .lock()
            .ok()
            .and_then(|mut t| t.take())
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);
        dim(&format!("{:.1}s", ms as f64 / 1000.0))
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_files: usize) {
        self.bar.set_length(total_files as u64);
    }

    fn on_file_start(&self, _index: usize, _total: usize, name: &str) {
        if let Ok(mut t) = self.started.lock() {
            *t = Some(Instant::now());
        }
        self.bar.set_message(name.to_string());
    }

    fn on_file_complete(&self, index: usize, total: usize, name: &str, output_len: usize) {
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}  {}",
            green("✓"),
            index + 1,
            total,
            name,
            dim(&format!("{output_len} bytes")),
            self.elapsed(),
        ));
        self.bar.inc(1);
    }

    fn on_file_error(&self, index: usize, total: usize, name: &str, error: String) {
        // Truncate very long error messages to keep output tidy.
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error
        };
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            red("✗"),
            index + 1,
            total,
            name,
            red(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, _total_files: usize, _success_count: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Markdown to HTML, written to ./converted.html
  docshift notes.md --to html

  # Several files at once, named after their inputs, into out/
  docshift a.txt b.md c.csv --to pdf -o out --stem-names

  # Spreadsheet rows as JSON records
  docshift budget.xlsx --to txt

  # Re-encode an image at lower JPEG quality
  docshift photo.png --to jpg --jpeg-quality 70

  # Only pages 2-4 of a PDF
  docshift report.pdf --to md --pages 2-4

  # What converts to what
  docshift --list

NOTES:
  Files are converted one after another. A failed file does not stop the
  others unless --fail-fast is given. The exit status is non-zero when any
  file failed.
"#;

/// Convert documents between text, HTML, CSV, Markdown, PDF, Word,
/// spreadsheet and image formats.
#[derive(Parser, Debug)]
#[command(
    name = "docshift",
    version,
    about = "Convert documents between text, HTML, CSV, Markdown, PDF, Word, spreadsheet and image formats",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input files. The extension declares each file's format.
    #[arg(required_unless_present = "list")]
    inputs: Vec<PathBuf>,

    /// Target format: txt, html, csv, md, pdf, doc, docx, jpg, png, gif.
    #[arg(short, long, env = "DOCSHIFT_TO", required_unless_present = "list")]
    to: Option<Format>,

    /// Directory to write outputs into.
    #[arg(short, long, env = "DOCSHIFT_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Name outputs after their input (`report.pdf` → `report.md`) instead
    /// of `converted.<ext>`.
    #[arg(long, env = "DOCSHIFT_STEM_NAMES")]
    stem_names: bool,

    /// Stop at the first failed file; the rest are reported as skipped.
    #[arg(long, env = "DOCSHIFT_FAIL_FAST")]
    fail_fast: bool,

    /// JPEG quality (1–100) for image conversions to jpg.
    #[arg(long, env = "DOCSHIFT_JPEG_QUALITY", default_value_t = 92,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// PDF page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "DOCSHIFT_PAGES", default_value = "all")]
    pages: String,

    /// Print the supported conversion matrix and exit.
    #[arg(long)]
    list: bool,

    /// Print the batch report as JSON on stdout.
    #[arg(long, env = "DOCSHIFT_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "DOCSHIFT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOCSHIFT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOCSHIFT_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.list;
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

    // ── List mode ────────────────────────────────────────────────────────
    if cli.list {
        print_matrix();
        return Ok(());
    }

    let target = cli.to.context("--to is required")?;

    // ── Read inputs ──────────────────────────────────────────────────────
    let mut files = Vec::with_capacity(cli.inputs.len());
    let mut unreadable = Vec::new();
    for path in &cli.inputs {
        match SourceFile::from_path(path).await {
            Ok(f) => files.push(f),
            Err(e) => {
                if !cli.quiet {
                    eprintln!("  {} {}  {}", red("✗"), path.display(), red(&e.to_string()));
                }
                unreadable.push((path.display().to_string(), e.to_string()));
            }
        }
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run conversion ───────────────────────────────────────────────────
    let start = Instant::now();
    let report = convert_batch(&files, target, &config).await;

    // ── Write outputs ────────────────────────────────────────────────────
    let mut taken = HashSet::new();
    let mut written: Vec<Option<PathBuf>> = Vec::with_capacity(report.items.len());
    for item in &report.items {
        let Some(ref output) = item.output else {
            written.push(None);
            continue;
        };
        let dest = unique_path(&cli.output_dir, &output.file_name, &mut taken);
        output
            .write_to(&dest)
            .await
            .with_context(|| format!("Failed to write output for {}", item.name))?;
        written.push(Some(dest));
    }

    let stats = report.stats();
    let failed = stats.failed + stats.skipped + unreadable.len();

    if cli.json {
        let files_json: Vec<serde_json::Value> = report
            .items
            .iter()
            .zip(&written)
            .map(|(item, dest)| {
                serde_json::json!({
                    "index": item.index,
                    "name": item.name,
                    "output": dest.as_ref().map(|p| p.display().to_string()),
                    "bytes": item.output.as_ref().map(|o| o.payload.len()),
                    "error": item.error,
                })
            })
            .collect();
        let unreadable_json: Vec<serde_json::Value> = unreadable
            .iter()
            .map(|(name, error)| serde_json::json!({ "name": name, "error": error }))
            .collect();
        let json = serde_json::json!({
            "target": target,
            "stats": stats,
            "unreadable": unreadable_json,
            "files": files_json,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&json).context("Failed to serialise report")?
        );
    } else if !cli.quiet {
        if !show_progress {
            for (item, dest) in report.items.iter().zip(&written) {
                match (dest, &item.error) {
                    (Some(p), _) => eprintln!("  {} {} → {}", green("✓"), item.name, p.display()),
                    (None, Some(e)) => eprintln!("  {} {}", red("✗"), red(&e.to_string())),
                    (None, None) => {}
                }
            }
        }
        let total = stats.total + unreadable.len();
        eprintln!(
            "{}  {}/{} files → {}  {}ms  {}",
            if failed == 0 { green("✔") } else { cyan("⚠") },
            bold(&stats.succeeded.to_string()),
            total,
            target.extension(),
            start.elapsed().as_millis(),
            dim(&cli.output_dir.display().to_string()),
        );
    }

    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let naming = if cli.stem_names {
        OutputNaming::SourceStem
    } else {
        OutputNaming::Converted
    };

    let mut builder = ConversionConfig::builder()
        .jpeg_quality(cli.jpeg_quality)
        .pages(parse_pages(&cli.pages)?)
        .naming(naming)
        .fail_fast(cli.fail_fast);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Pick a path in `dir` for `name` that no earlier output of this run used,
/// adding ` (1)`, ` (2)`, … before the extension on collision.
fn unique_path(dir: &Path, name: &str, taken: &mut HashSet<String>) -> PathBuf {
    let (stem, ext) = match name.rsplit_once('.') {
        Some((s, e)) => (s, format!(".{e}")),
        None => (name, String::new()),
    };
    let mut candidate = name.to_string();
    let mut n = 1;
    while !taken.insert(candidate.clone()) {
        candidate = format!("{stem} ({n}){ext}");
        n += 1;
    }
    dir.join(candidate)
}

/// Print each source format with the targets it converts to.
fn print_matrix() {
    for source in Format::ALL {
        let targets: Vec<&str> = registry::targets_for(source)
            .into_iter()
            .map(Format::extension)
            .collect();
        if targets.is_empty() {
            println!("{:<5} {}", source.extension(), dim("(no conversions)"));
        } else {
            println!("{:<5} → {}", bold(source.extension()), targets.join(", "));
        }
    }
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }

        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let mut pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .with_context(|| format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if pages.contains(&0) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got 0)");
        }
        pages.sort_unstable();
        pages.dedup();

        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok(PageSelection::Single(page))
}
