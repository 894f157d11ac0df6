//! CLI binary for cifra-client.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ClientConfig`, fills a `ConversionForm` and reports each submission.

use anyhow::{Context, Result};
use clap::Parser;
use cifra_client::{
    ClientConfig, ConversionForm, ErrorKind, FormState, GenerateClient, ObserverRef, OutputFormat,
    RequestState, SavedDownload, SubmissionObserver,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
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

// ── CLI observer using indicatif ─────────────────────────────────────────────

/// Terminal observer: a spinner while the service renders, then one line
/// per outcome.
struct CliObserver {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliObserver {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            bar: Mutex::new(None),
        })
    }

    fn println(&self, line: String) {
        match self.bar.lock().ok().and_then(|b| b.clone()) {
            Some(bar) => bar.println(line),
            None => eprintln!("{line}"),
        }
    }
}

impl SubmissionObserver for CliObserver {
    fn on_submit_start(&self, form: &FormState, _state: &RequestState) {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.yellow} {prefix:.bold}  {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix(form.format.as_str().to_uppercase());
        bar.set_message("Processando…");
        bar.enable_steady_tick(Duration::from_millis(80));
        if let Ok(mut slot) = self.bar.lock() {
            *slot = Some(bar);
        }
    }

    fn on_download_triggered(&self, download: &SavedDownload) {
        self.println(format!(
            "  {} {}  {}",
            green("✓"),
            bold(&download.path.display().to_string()),
            dim(&format!(
                "{} bytes  {:.1}s",
                download.bytes,
                download.duration_ms as f64 / 1000.0
            )),
        ));
    }

    fn on_error(&self, _kind: ErrorKind, message: &str) {
        self.println(format!("  {} {}", red("✗"), red(message)));
    }

    fn on_settled(&self, _state: &RequestState) {
        if let Some(bar) = self.bar.lock().ok().and_then(|mut b| b.take()) {
            bar.finish_and_clear();
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # PDF into the current directory
  cifra https://www.cifraclub.com.br/isaias-saad/bondade-de-deus/

  # DOCX into a folder
  cifra -f docx -o cifras/ https://www.cifraclub.com.br/isaias-saad/bondade-de-deus/

  # Both formats, transposed to key index 5
  cifra --all-formats --key 5 https://www.cifraclub.com.br/livres-para-adorar/liberdade/

  # Against a deployed service, JSON report on stdout
  cifra --endpoint https://cifras.example.com --json https://www.cifraclub.com.br/...

FILENAMES:
  The service suggests a name (usually Title_Artist.pdf) in Content-Disposition.
  Without one the file is saved as cifra.pdf / cifra.docx. Existing files are
  kept: a second download becomes "name (1).pdf" unless --overwrite is given.

ENVIRONMENT VARIABLES:
  CIFRA_ENDPOINT        Base URL of the generation service (default http://127.0.0.1:5328)
  CIFRA_ENDPOINT_PATH   Endpoint path (default /api/generate)
  CIFRA_FORMAT          pdf or docx
  CIFRA_OUTPUT_DIR      Directory to save documents into
  CIFRA_TIMEOUT         Request timeout in seconds (0 = wait forever)
  RUST_LOG              Tracing filter, overrides -v / -q
"#;

/// Turn cifra URLs into printable PDF or DOCX files.
#[derive(Parser, Debug)]
#[command(
    name = "cifra",
    version,
    about = "Turn cifra URLs into printable PDF or DOCX files",
    long_about = "Send a cifra URL to the cifra generation service and save the formatted \
document it returns. The service scrapes the page and lays the song out on a single page; \
this tool only submits the request and saves the result.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// URL of the cifra page.
    url: String,

    /// Output format.
    #[arg(short, long, env = "CIFRA_FORMAT", value_enum, default_value = "pdf")]
    format: FormatArg,

    /// Request every format, one after another (ignores --format).
    #[arg(long, env = "CIFRA_ALL_FORMATS")]
    all_formats: bool,

    /// Transpose to this key index (sent as the URL fragment `#key=N`).
    #[arg(long, env = "CIFRA_KEY")]
    key: Option<u32>,

    /// Directory to save documents into.
    #[arg(short, long, env = "CIFRA_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Replace existing files instead of numbering new ones.
    #[arg(long, env = "CIFRA_OVERWRITE")]
    overwrite: bool,

    /// Base URL of the generation service.
    #[arg(long, env = "CIFRA_ENDPOINT", default_value = cifra_client::config::DEFAULT_BASE_URL)]
    endpoint: String,

    /// Path of the generation endpoint.
    #[arg(long, env = "CIFRA_ENDPOINT_PATH", default_value = cifra_client::config::DEFAULT_ENDPOINT_PATH)]
    endpoint_path: String,

    /// Request timeout in seconds; 0 waits indefinitely.
    #[arg(long, env = "CIFRA_TIMEOUT", default_value_t = 0)]
    timeout: u64,

    /// Print a JSON report on stdout.
    #[arg(long, env = "CIFRA_JSON")]
    json: bool,

    /// Disable the spinner.
    #[arg(long, env = "CIFRA_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "CIFRA_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "CIFRA_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Pdf,
    Docx,
}

impl From<FormatArg> for OutputFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Pdf => OutputFormat::Pdf,
            FormatArg::Docx => OutputFormat::Docx,
        }
    }
}

/// One line of the `--json` report.
#[derive(Serialize)]
struct Report {
    format: OutputFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    download: Option<SavedDownload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ReportError>,
}

#[derive(Serialize)]
struct ReportError {
    kind: ErrorKind,
    message: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner already says what is happening; keep INFO logs out of its way.
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

    // ── Build config and form ────────────────────────────────────────────
    let observer: Option<ObserverRef> = show_progress.then(|| CliObserver::new() as ObserverRef);
    let config = build_config(&cli, observer)?;
    let client = GenerateClient::new(config).context("Invalid configuration")?;

    let formats: Vec<OutputFormat> = if cli.all_formats {
        OutputFormat::ALL.to_vec()
    } else {
        vec![cli.format.into()]
    };

    let mut initial = FormState::new(&cli.url, formats[0]);
    if let Some(key) = cli.key {
        initial = initial.with_key(key);
    }
    let mut form = ConversionForm::new(client);
    form.set_form(initial);

    // ── Submit once per format ───────────────────────────────────────────
    let mut reports = Vec::with_capacity(formats.len());
    let mut failures = 0usize;

    for format in formats {
        form.set_format(format);
        match form.submit().await {
            Ok(saved) => {
                if !cli.quiet && !show_progress && !cli.json {
                    eprintln!("Saved {} ({} bytes)", saved.path.display(), saved.bytes);
                }
                reports.push(Report {
                    format,
                    download: Some(saved),
                    error: None,
                });
            }
            Err(e) => {
                failures += 1;
                // Validation failures never reach the observer.
                if !show_progress || e.kind() == ErrorKind::Validation {
                    eprintln!("{} {}", red("✗"), e);
                }
                reports.push(Report {
                    format,
                    download: None,
                    error: Some(ReportError {
                        kind: e.kind(),
                        message: e.to_string(),
                    }),
                });
                if e.kind() == ErrorKind::Validation {
                    break;
                }
            }
        }
    }

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&reports).context("Failed to serialise report")?
        );
    }

    if failures > 0 {
        std::process::exit(1);
    }
    Ok(())
}

/// Map CLI args to `ClientConfig`.
fn build_config(cli: &Cli, observer: Option<ObserverRef>) -> Result<ClientConfig> {
    let mut builder = ClientConfig::builder()
        .base_url(&cli.endpoint)
        .endpoint_path(&cli.endpoint_path)
        .timeout_secs(cli.timeout)
        .output_dir(&cli.output_dir)
        .overwrite(cli.overwrite);

    if let Some(o) = observer {
        builder = builder.observer(o);
    }

    builder.build().context("Invalid configuration")
}
