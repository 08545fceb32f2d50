//! CLI binary for edgequake-doc2deck.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and writes decks to a download directory.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_doc2deck::{
    convert, inspect, render, ConversionConfig, ConversionProgressCallback, DeckSink,
    DirectorySink, ExtractionResult, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
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

/// Terminal progress: a spinner while the AI reads the document, then one
/// summary line per stage.
struct CliProgressCallback {
    bar: ProgressBar,
    started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading document…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            started: Mutex::new(None),
        })
    }

    fn elapsed(&self) -> String {
        let secs = self
            .started
            .lock()
            .ok()
            .and_then(|s| s.map(|t| t.elapsed().as_secs_f64()))
            .unwrap_or(0.0);
        dim(&format!("{secs:.1}s"))
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, name: &str, bytes: usize) {
        if let Ok(mut started) = self.started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_prefix("Analysing");
        self.bar.set_message(format!("{name} ({} KB)", bytes.div_ceil(1024)));
    }

    fn on_extraction_complete(&self, question_count: usize) {
        self.bar.println(format!(
            "  {} {} questions recognised  {}",
            green("✓"),
            bold(&question_count.to_string()),
            self.elapsed()
        ));
        self.bar.set_prefix("Rendering");
        self.bar.set_message("Building slides…");
    }

    fn on_extraction_error(&self, error: &str) {
        self.bar.finish_and_clear();
        eprintln!("  {} {}  {}", red("✗"), red(error), self.elapsed());
    }

    fn on_deck_ready(&self, file_name: &str, slide_count: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "  {} {} ({} slides)",
            green("✓"),
            file_name,
            slide_count
        );
    }
}

fn clear_spinner(spinner: &Option<Arc<CliProgressCallback>>) {
    if let Some(s) = spinner {
        s.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert a test paper into a deck in ./decks
  doc2deck de-kiem-tra.pdf -o decks

  # Scanned worksheet photo, personalised title slide
  doc2deck bai-tap.jpg --byline "BIÊN SOẠN: TỔ HÓA HỌC"

  # Keep the extraction, then render it again later without the AI
  doc2deck de-thi.docx --save-json de-thi.json
  doc2deck --from-json de-thi.json -o decks

  # Only check that a file is accepted (no API key needed)
  doc2deck --detect-only scan.png

  # Extraction result as JSON on stdout
  doc2deck --json de-kiem-tra.pdf > questions.json

ACCEPTED INPUT:
  PDF, Word (.doc, .docx), PNG, JPEG, GIF, WebP, BMP, TIFF
  Local paths or http(s) URLs. The type is detected from the content.

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY        Google Gemini API key (API_KEY is accepted too)
  DOC2DECK_MODEL        Override model ID
  DOC2DECK_OUTPUT_DIR   Default download directory
"#;

/// Turn quiz documents into interactive slide decks using Gemini.
#[derive(Parser, Debug)]
#[command(
    name = "doc2deck",
    version,
    about = "Turn quiz documents (PDF, Word, images) into interactive PowerPoint decks",
    long_about = "Extract every question of a test paper, worksheet or scan with Google Gemini \
and lay it out as an interactive .pptx deck: one slide per question, answers revealed on click.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Document path or HTTP/HTTPS URL (a saved extraction JSON with --from-json).
    input: String,

    /// Directory the deck is written to.
    #[arg(short, long, env = "DOC2DECK_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Gemini model ID.
    #[arg(long, env = "DOC2DECK_MODEL")]
    model: Option<String>,

    /// Gemini API key.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Base URL of the Gemini REST API.
    #[arg(long, env = "DOC2DECK_BASE_URL")]
    base_url: Option<String>,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "DOC2DECK_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Path to a text file containing a custom system instruction.
    #[arg(long, env = "DOC2DECK_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Footer caption on question slides.
    #[arg(long, env = "DOC2DECK_FOOTER")]
    footer: Option<String>,

    /// Author line on the title slide.
    #[arg(long, env = "DOC2DECK_BYLINE")]
    byline: Option<String>,

    /// Also write the extraction result to this JSON file.
    #[arg(long)]
    save_json: Option<PathBuf>,

    /// Treat INPUT as a saved extraction JSON and only render it.
    #[arg(long, conflicts_with_all = ["detect_only", "save_json"])]
    from_json: bool,

    /// Print the detected document type and size, no conversion.
    #[arg(long)]
    detect_only: bool,

    /// Print the extraction result as JSON on stdout.
    #[arg(long, env = "DOC2DECK_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "DOC2DECK_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOC2DECK_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOC2DECK_QUIET")]
    quiet: bool,

    /// generateContent timeout in seconds.
    #[arg(long, env = "DOC2DECK_API_TIMEOUT", default_value_t = 300)]
    api_timeout: u64,

    /// HTTP download timeout in seconds for URL inputs.
    #[arg(long, env = "DOC2DECK_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives all the feedback that matters; keep library INFO
    // logs out of its way unless asked for.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.detect_only;
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

    // ── Detect-only mode ─────────────────────────────────────────────────
    if cli.detect_only {
        let info = inspect(&cli.input, cli.download_timeout)
            .await
            .context("Document rejected")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("Failed to serialise document info")?
            );
        } else {
            println!("File:   {}", info.name);
            println!("Type:   {}", info.mime_type);
            println!("Size:   {} bytes", info.size_bytes);
        }
        return Ok(());
    }

    let spinner = show_progress.then(CliProgressCallback::new);
    let progress_cb: Option<ProgressCallback> = spinner
        .clone()
        .map(|s| s as Arc<dyn ConversionProgressCallback>);
    let config = match build_config(&cli, progress_cb).await {
        Ok(config) => config,
        Err(e) => {
            clear_spinner(&spinner);
            return Err(e);
        }
    };
    let sink = DirectorySink::new(&cli.output_dir);

    // ── Re-render a saved extraction ("download again") ──────────────────
    if cli.from_json {
        clear_spinner(&spinner);
        let raw = tokio::fs::read_to_string(&cli.input)
            .await
            .with_context(|| format!("Failed to read {}", cli.input))?;
        let result: ExtractionResult = serde_json::from_str(&raw)
            .with_context(|| format!("{} is not a saved extraction result", cli.input))?;
        let deck = render(&result, &config).context("Rendering failed")?;
        let path = sink.deliver(&deck).context("Failed to write deck")?;
        if cli.json {
            print_result(&result)?;
        }
        if !cli.quiet {
            eprintln!(
                "{}  {} slides  →  {}",
                green("✔"),
                deck.slide_count,
                bold(&path.display().to_string())
            );
        }
        return Ok(());
    }

    // ── Run conversion ───────────────────────────────────────────────────
    // Input errors surface before any progress event, so the spinner is
    // still running here.
    let output = match convert(&cli.input, &config).await {
        Ok(output) => output,
        Err(e) => {
            clear_spinner(&spinner);
            return Err(e).context("Conversion failed");
        }
    };
    let path = sink.deliver(&output.deck).context("Failed to write deck")?;

    if let Some(ref json_path) = cli.save_json {
        let json = serde_json::to_string_pretty(&output.result)
            .context("Failed to serialise extraction result")?;
        tokio::fs::write(json_path, json)
            .await
            .with_context(|| format!("Failed to write {}", json_path.display()))?;
    }
    if cli.json {
        print_result(&output.result)?;
    }

    if !cli.quiet {
        let stats = &output.stats;
        eprintln!(
            "{}  {} questions  {}ms  →  {}",
            green("✔"),
            stats.questions,
            stats.extraction_duration_ms + stats.render_duration_ms,
            bold(&path.display().to_string()),
        );
        eprintln!(
            "   {} multiple choice  /  {} true-false  /  {} short answer  {}",
            cyan(&stats.multiple_choice.to_string()),
            cyan(&stats.true_false.to_string()),
            cyan(&stats.short_answer.to_string()),
            dim(&format!("({}, {} bytes)", stats.mime_type, stats.input_bytes)),
        );
    }

    Ok(())
}

fn print_result(result: &ExtractionResult) -> Result<()> {
    let json = serde_json::to_string_pretty(result).context("Failed to serialise output")?;
    println!("{json}");
    Ok(())
}

/// Map CLI args to `ConversionConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .temperature(cli.temperature)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(ref url) = cli.base_url {
        builder = builder.base_url(url);
    }
    if let Some(ref footer) = cli.footer {
        builder = builder.footer(footer);
    }
    if let Some(ref byline) = cli.byline {
        builder = builder.byline(byline);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
