//! CLI binary for summize.
//!
//! A thin shim over the library crate: `serve` starts the web front-end,
//! `extract` dumps what the PDF parser sees, and `analyze` runs the whole
//! pipeline from the terminal.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use summize::pipeline::{encode, extract};
use summize::{
    analyze_document, analyze_images, resolve_model, summary_events, AnalysisProgressCallback,
    AppConfig, BatchStats, Controller, DispatchMode, ImageResult, SummaryEvent, SummaryResult,
    VisionContext,
};
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

/// Terminal progress callback: one bar for all jobs plus a log line per job.
/// Jobs may complete out of order in concurrent mode.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Per-job wall-clock start times; key `None` is the summary.
    start_times: Mutex<HashMap<Option<usize>, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    /// Switch to the full progress-bar style once the job count is known.
    fn activate_bar(&self, total_jobs: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} jobs  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total_jobs as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Analysing");
        self.bar.reset_eta();
    }

    fn started(&self, key: Option<usize>) {
        if let Ok(mut times) = self.start_times.lock() {
            times.insert(key, Instant::now());
        }
    }

    fn elapsed(&self, key: Option<usize>) -> String {
        let ms = self
            .start_times
            .lock()
            .ok()
            .and_then(|mut times| times.remove(&key))
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);
        dim(&format!("{:.1}s", ms as f64 / 1000.0))
    }

    fn report(&self, label: &str, outcome: Result<String, String>, elapsed: String) {
        match outcome {
            Ok(text) => self.bar.println(format!(
                "  {} {:<12}  {:<8}  {}",
                green("✓"),
                label,
                dim(&format!("{:>5} chars", text.len())),
                elapsed,
            )),
            Err(error) => {
                self.errors.fetch_add(1, Ordering::SeqCst);
                let msg = if error.chars().count() > 80 {
                    format!("{}\u{2026}", error.chars().take(79).collect::<String>())
                } else {
                    error
                };
                self.bar.println(format!(
                    "  {} {:<12}  {}  {}",
                    red("✗"),
                    label,
                    red(&msg),
                    elapsed,
                ));
            }
        }
        self.bar.inc(1);
    }
}

impl AnalysisProgressCallback for CliProgressCallback {
    fn on_analysis_start(&self, total_images: usize) {
        self.activate_bar(total_images + 1);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Summarising the paper and {total_images} images…"))
        ));
    }

    fn on_summary_start(&self) {
        self.started(None);
        self.bar.set_message("summary");
    }

    fn on_summary_complete(&self, result: &SummaryResult) {
        let elapsed = self.elapsed(None);
        self.report("Summary", result.to_outcome(), elapsed);
    }

    fn on_image_start(&self, index: usize, _total_images: usize) {
        self.started(Some(index));
        self.bar.set_message(format!("image #{}", index + 1));
    }

    fn on_image_complete(&self, result: &ImageResult, _total_images: usize) {
        let elapsed = self.elapsed(Some(result.index));
        self.report(&format!("Image #{}", result.index + 1), result.to_outcome(), elapsed);
    }

    fn on_analysis_complete(&self, stats: &BatchStats) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        let total = stats.total_images + 1;
        if failed == 0 {
            eprintln!("{} {} jobs completed", green("✔"), bold(&total.to_string()));
        } else {
            eprintln!(
                "{} {}/{} jobs completed  ({} failed)",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&(total - failed).to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Web front-end on http://127.0.0.1:8501/
  summize serve

  # Summarise a paper and describe every figure
  summize analyze paper.pdf > report.md

  # Stream the summary as it is written, skip the figures
  summize analyze --stream --no-images paper.pdf

  # Use another edgequake-llm provider
  summize --provider openai --model gpt-4.1-mini analyze paper.pdf

  # Inspect what the PDF parser extracts (no API key needed)
  summize extract paper.pdf --images-dir figures/

ENVIRONMENT VARIABLES:
  GOOGLE_API_KEY      Gemini API key (GEMINI_API_KEY is also accepted)
  SUMMIZE_MODEL       Override the model ID
  SUMMIZE_PROVIDER    Use an edgequake-llm provider instead of Gemini
  RUST_LOG            Log filter, e.g. summize=debug
"#;

/// Summarise research papers and describe their figures with a generative-AI model.
#[derive(Parser, Debug)]
#[command(
    name = "summize",
    version,
    about = "Summarise research-paper PDFs and describe their figures",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    model: ModelArgs,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "SUMMIZE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and results.
    #[arg(short, long, global = true, env = "SUMMIZE_QUIET")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// Model ID (default: gemini-2.0-flash).
    #[arg(long, global = true, env = "SUMMIZE_MODEL")]
    model: Option<String>,

    /// edgequake-llm provider (openai, anthropic, ollama, …) instead of Gemini.
    #[arg(long, global = true, env = "SUMMIZE_PROVIDER")]
    provider: Option<String>,

    /// Gemini API key.
    #[arg(long, global = true, env = "GOOGLE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Language the model answers in.
    #[arg(long, global = true, env = "SUMMIZE_LANGUAGE", default_value = "English")]
    language: String,

    /// Document text sent with each image: none, full, or a character count.
    #[arg(long, global = true, env = "SUMMIZE_VISION_CONTEXT", default_value = "full")]
    vision_context: VisionContext,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, global = true, env = "SUMMIZE_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Max output tokens per request.
    #[arg(long, global = true, env = "SUMMIZE_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the web front-end.
    Serve {
        /// Address to bind.
        #[arg(long, env = "SUMMIZE_BIND", default_value = "127.0.0.1:8501")]
        bind: SocketAddr,

        /// Max concurrent model calls for "analyse everything".
        #[arg(short, long, env = "SUMMIZE_CONCURRENCY", default_value_t = 8)]
        concurrency: usize,

        /// Default dispatch mode: sequential or concurrent.
        #[arg(long, env = "SUMMIZE_MODE", default_value = "concurrent")]
        mode: DispatchMode,

        /// Largest accepted upload in MiB.
        #[arg(long, env = "SUMMIZE_MAX_UPLOAD_MB", default_value_t = 50)]
        max_upload_mb: usize,
    },

    /// Print the extracted text and optionally save the embedded images.
    Extract {
        /// PDF file.
        input: PathBuf,

        /// Write every image into this directory.
        #[arg(long)]
        images_dir: Option<PathBuf>,

        /// Print counts as JSON instead of the text.
        #[arg(long)]
        json: bool,
    },

    /// Summarise a PDF and describe its images.
    Analyze {
        /// PDF file.
        input: PathBuf,

        /// Dispatch mode: sequential or concurrent.
        #[arg(long, env = "SUMMIZE_MODE", default_value = "concurrent")]
        mode: DispatchMode,

        /// Max concurrent model calls.
        #[arg(short, long, env = "SUMMIZE_CONCURRENCY", default_value_t = 8)]
        concurrency: usize,

        /// Only summarise; skip image analysis.
        #[arg(long)]
        no_images: bool,

        /// Print the summary as it streams in.
        #[arg(long)]
        stream: bool,

        /// Output the full report as JSON.
        #[arg(long, conflicts_with = "stream")]
        json: bool,

        /// Disable the progress bar.
        #[arg(long, env = "SUMMIZE_NO_PROGRESS")]
        no_progress: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The progress bar replaces INFO logs in `analyze`; `serve` logs requests.
    let show_progress = matches!(
        cli.command,
        Command::Analyze { no_progress: false, json: false, .. }
    ) && !cli.quiet;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else if matches!(cli.command, Command::Serve { .. }) {
        "summize=info,tower_http=info"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Serve {
            bind,
            concurrency,
            mode,
            max_upload_mb,
        } => {
            let config = build_config(&cli.model)
                .bind(bind)
                .concurrency(concurrency)
                .dispatch_mode(mode)
                .max_upload_bytes(max_upload_mb.saturating_mul(1024 * 1024))
                .build()
                .context("Invalid configuration")?;
            let controller = Controller::new(config).context("Model backend unavailable")?;
            if !cli.quiet {
                eprintln!("{} Summize on {}", cyan("◆"), bold(&format!("http://{bind}/")));
            }
            summize::serve(controller).await.context("Server failed")?;
        }

        Command::Extract {
            input,
            images_dir,
            json,
        } => {
            let extraction = read_and_extract(&input).await?;
            if let Some(dir) = images_dir {
                write_images(&dir, &extraction.images).await?;
                if !cli.quiet {
                    eprintln!(
                        "{} {} images written to {}",
                        green("✔"),
                        extraction.images.len(),
                        bold(&dir.display().to_string())
                    );
                }
            }
            if json {
                let summary = serde_json::json!({
                    "file": input.display().to_string(),
                    "page_count": extraction.page_count,
                    "text_chars": extraction.text.chars().count(),
                    "images": extraction.images.len(),
                    "skipped_images": extraction.skipped_images,
                });
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                write_stdout(&extraction.text)?;
            }
        }

        Command::Analyze {
            input,
            mode,
            concurrency,
            no_images,
            stream,
            json,
            no_progress: _,
        } => {
            let config = build_config(&cli.model)
                .dispatch_mode(mode)
                .concurrency(concurrency)
                .build()
                .context("Invalid configuration")?;
            let model = resolve_model(&config).context("Model backend unavailable")?;

            let extraction = read_and_extract(&input).await?;
            let images: &[Vec<u8>] = if no_images { &[] } else { &extraction.images };
            let title = input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "document".to_string());

            if stream {
                println!("# {title}\n\n## Summary\n");
                let mut events = summary_events(
                    Arc::clone(&model),
                    extraction.text.clone(),
                    config.clone(),
                    |_| {},
                );
                let mut stdout = io::stdout();
                while let Some(event) = events.next().await {
                    match event {
                        SummaryEvent::Chunk { fragment, .. } => {
                            stdout.write_all(fragment.as_bytes())?;
                            stdout.flush()?;
                        }
                        SummaryEvent::Done { .. } => println!(),
                        SummaryEvent::Error { message } => {
                            println!();
                            eprintln!("{} {}", red("✘"), message);
                        }
                    }
                }

                if !images.is_empty() {
                    let progress = show_progress.then(CliProgressCallback::new);
                    if let Some(cb) = &progress {
                        cb.activate_bar(images.len());
                    }
                    let callback: &dyn AnalysisProgressCallback = match &progress {
                        Some(cb) => cb.as_ref(),
                        None => &summize::NoopProgressCallback,
                    };
                    let results =
                        analyze_images(model.as_ref(), &extraction.text, images, &config, callback)
                            .await;
                    if let Some(cb) = &progress {
                        cb.bar.finish_and_clear();
                    }
                    print!("\n{}", render_images(&results));
                }
            } else {
                let progress = show_progress.then(CliProgressCallback::new);
                let callback: &dyn AnalysisProgressCallback = match &progress {
                    Some(cb) => cb.as_ref(),
                    None => &summize::NoopProgressCallback,
                };
                let report = analyze_document(
                    model.as_ref(),
                    &extraction.text,
                    images,
                    &config,
                    callback,
                )
                .await;

                if json {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&report).context("Failed to serialise report")?
                    );
                } else {
                    let mut out = format!("# {title}\n\n## Summary\n\n");
                    match report.summary.to_outcome() {
                        Ok(text) => out.push_str(&text),
                        Err(e) => out.push_str(&format!("> **Error:** {e}\n")),
                    }
                    if !report.images.is_empty() {
                        out.push('\n');
                        out.push_str(&render_images(&report.images));
                    }
                    write_stdout(&out)?;
                }
                if !cli.quiet && !show_progress {
                    eprintln!(
                        "Analysed summary + {}/{} images in {}ms",
                        report.stats.succeeded_images,
                        report.stats.total_images,
                        report.stats.total_duration_ms
                    );
                }
            }
        }
    }

    Ok(())
}

/// Map the shared model flags onto the config builder.
fn build_config(args: &ModelArgs) -> summize::AppConfigBuilder {
    let mut builder = AppConfig::builder()
        .language(args.language.clone())
        .vision_context(args.vision_context)
        .temperature(args.temperature)
        .max_tokens(args.max_tokens);
    if let Some(ref model) = args.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref key) = args.api_key {
        builder = builder.api_key(key.clone());
    }
    builder
}

async fn read_and_extract(input: &Path) -> Result<extract::Extraction> {
    let bytes = tokio::fs::read(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    extract::extract_blocking(Arc::new(bytes))
        .await
        .with_context(|| format!("Failed to extract {}", input.display()))
}

async fn write_images(dir: &Path, images: &[Vec<u8>]) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    for (i, bytes) in images.iter().enumerate() {
        let ext = match encode::mime_type_of(bytes) {
            "image/jpeg" => "jpg",
            _ => "png",
        };
        let path = dir.join(format!("image-{:03}.{ext}", i + 1));
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(())
}

fn render_images(results: &[ImageResult]) -> String {
    let mut out = String::from("## Images\n");
    for r in results {
        out.push_str(&format!("\n### Image #{}\n\n", r.index + 1));
        match r.to_outcome() {
            Ok(text) => out.push_str(&text),
            Err(e) => out.push_str(&format!("> **Error:** {e}\n")),
        }
    }
    out
}

fn write_stdout(text: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(text.as_bytes())
        .context("Failed to write to stdout")?;
    if !text.ends_with('\n') {
        handle.write_all(b"\n").ok();
    }
    Ok(())
}
