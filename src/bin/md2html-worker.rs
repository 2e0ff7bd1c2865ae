//! CLI binary for edgequake-md2html.
//!
//! A thin shim over the library crate that maps flags and environment
//! variables to `WorkerConfig`, wires the adapters, and picks a runtime.

use anyhow::{anyhow, bail, Context, Result};
use aws_config::BehaviorVersion;
use clap::{Parser, Subcommand};
use edgequake_md2html::pipeline::render;
use edgequake_md2html::{
    function_handler, HtmlTemplate, InboundMessage, InvocationStatus, LocalObjectStore,
    MarkdownFlavor, MemoryQueue, MessageProcessor, S3ObjectStore, SqsMessageQueue, WorkerConfig,
    DEFAULT_MAX_OBJECT_SIZE,
};
use lambda_runtime::service_fn;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # AWS Lambda (default when no subcommand is given)
  TARGET_BUCKET=site CONVERSION_QUEUE=https://sqs.../md2html md2html-worker

  # Long-poll the queue from a container or VM
  md2html-worker --target-bucket site --queue-url https://sqs.../md2html poll

  # Drain one batch and exit
  md2html-worker --target-bucket site --queue-url https://sqs.../md2html poll --once

  # Render a local file (no cloud access)
  md2html-worker --flavor gfm --template standalone convert notes.md -o notes.html

  # Run the full pipeline for a saved notification against a local store
  md2html-worker --target-bucket site replay event.json --store-root ./objects

ENVIRONMENT VARIABLES:
  TARGET_BUCKET            Bucket that receives the .html objects
  CONVERSION_QUEUE         URL of the trigger queue
  LOG_LEVEL                trace, debug, info, warn, error (default: info)
  RUST_LOG                 Full tracing filter; overrides LOG_LEVEL
  MD2HTML_MAX_OBJECT_SIZE  Reject sources of this many bytes or more (default: 104857600)
  MD2HTML_FLAVOR           commonmark | gfm
  MD2HTML_TEMPLATE         fragment | standalone
  MD2HTML_SCRATCH_DIR      Parent directory for per-record working directories
  MD2HTML_LOG_FORMAT       json | text (default: json under lambda, text otherwise)
"#;

/// Convert Markdown objects to HTML as storage notifications arrive.
#[derive(Parser, Debug)]
#[command(
    name = "md2html-worker",
    version,
    about = "Queue-triggered Markdown to HTML conversion worker",
    long_about = "Receives storage notifications from a queue, converts each referenced \
Markdown object to HTML, uploads it to the target bucket and acknowledges the message. \
Runs as an AWS Lambda function, a long-polling worker, or a local tool.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Bucket that receives the rendered .html objects.
    #[arg(long, env = "TARGET_BUCKET", global = true)]
    target_bucket: Option<String>,

    /// URL of the queue delivering the notifications.
    #[arg(long, env = "CONVERSION_QUEUE", global = true)]
    queue_url: Option<String>,

    /// Reject source objects of this many bytes or more.
    #[arg(long, env = "MD2HTML_MAX_OBJECT_SIZE", global = true,
          default_value_t = DEFAULT_MAX_OBJECT_SIZE)]
    max_object_size: u64,

    /// Markdown dialect.
    #[arg(long, env = "MD2HTML_FLAVOR", global = true, value_enum, default_value = "commonmark")]
    flavor: FlavorArg,

    /// Output shape: bare fragment or complete HTML document.
    #[arg(long, env = "MD2HTML_TEMPLATE", global = true, value_enum, default_value = "fragment")]
    template: TemplateArg,

    /// Parent directory for per-record working directories.
    #[arg(long, env = "MD2HTML_SCRATCH_DIR", global = true)]
    scratch_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "LOG_LEVEL", global = true, default_value = "info")]
    log_level: String,

    /// Log output format.
    #[arg(long, env = "MD2HTML_LOG_FORMAT", global = true, value_enum)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve SQS batches under the AWS Lambda runtime.
    Lambda,

    /// Long-poll the queue and process batches until interrupted.
    Poll {
        /// Messages per receive call (1–10).
        #[arg(long, default_value_t = 10,
              value_parser = clap::value_parser!(u8).range(1..=10))]
        batch_size: u8,

        /// Long-poll wait in seconds (0–20).
        #[arg(long, default_value_t = 20,
              value_parser = clap::value_parser!(u64).range(0..=20))]
        wait_seconds: u64,

        /// Stop after the first receive call.
        #[arg(long)]
        once: bool,
    },

    /// Render a local Markdown file.
    Convert {
        /// Markdown file to render.
        input: PathBuf,

        /// Write HTML to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Process a saved notification body against a local object store.
    Replay {
        /// JSON file containing the notification body.
        event: PathBuf,

        /// Directory holding one sub-directory per bucket.
        #[arg(long, default_value = ".")]
        store_root: PathBuf,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FlavorArg {
    #[value(name = "commonmark")]
    CommonMark,
    Gfm,
}

impl From<FlavorArg> for MarkdownFlavor {
    fn from(v: FlavorArg) -> Self {
        match v {
            FlavorArg::CommonMark => MarkdownFlavor::CommonMark,
            FlavorArg::Gfm => MarkdownFlavor::Gfm,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum TemplateArg {
    Fragment,
    Standalone,
}

impl From<TemplateArg> for HtmlTemplate {
    fn from(v: TemplateArg) -> Self {
        match v {
            TemplateArg::Fragment => HtmlTemplate::Fragment,
            TemplateArg::Standalone => HtmlTemplate::Standalone,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    Json,
    Text,
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();
    let command = cli.command.take().unwrap_or(Command::Lambda);

    // ── Logging setup ────────────────────────────────────────────────────
    let format = cli.log_format.unwrap_or(match command {
        Command::Lambda => LogFormat::Json,
        _ => LogFormat::Text,
    });
    init_tracing(&cli.log_level, format);

    match command {
        Command::Lambda => run_lambda(build_config(&cli)?).await,
        Command::Poll {
            batch_size,
            wait_seconds,
            once,
        } => {
            run_poll(
                build_config(&cli)?,
                usize::from(batch_size),
                Duration::from_secs(wait_seconds),
                once,
            )
            .await
        }
        Command::Convert { input, output } => run_convert(&cli, &input, output.as_deref()).await,
        Command::Replay { event, store_root } => {
            run_replay(build_config(&cli)?, &event, &store_root).await
        }
    }
}

fn init_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.trim().to_lowercase()));

    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init(),
    }
}

/// Map CLI args to `WorkerConfig`.
fn build_config(cli: &Cli) -> Result<WorkerConfig> {
    let target_bucket = cli
        .target_bucket
        .as_deref()
        .context("No target bucket: set TARGET_BUCKET or pass --target-bucket")?;

    let mut builder = WorkerConfig::builder()
        .target_bucket(target_bucket)
        .max_object_size(cli.max_object_size)
        .flavor(cli.flavor.into())
        .template(cli.template.into());

    if let Some(ref url) = cli.queue_url {
        builder = builder.queue_url(url);
    }
    if let Some(ref dir) = cli.scratch_dir {
        builder = builder.scratch_root(dir);
    }

    builder.build().context("Invalid configuration")
}

/// Build the S3 + SQS backed processor from the default AWS credential chain.
async fn aws_processor(config: WorkerConfig) -> Result<MessageProcessor> {
    let queue_url = config
        .queue_url
        .clone()
        .context("No queue URL: set CONVERSION_QUEUE or pass --queue-url")?;

    let shared = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let store = Arc::new(S3ObjectStore::new(aws_sdk_s3::Client::new(&shared)));
    let queue = Arc::new(SqsMessageQueue::new(
        aws_sdk_sqs::Client::new(&shared),
        queue_url,
    ));
    Ok(MessageProcessor::new(config, store, queue))
}

async fn run_lambda(config: WorkerConfig) -> Result<()> {
    let processor = aws_processor(config).await?;
    info!(
        "Starting Lambda runtime: target bucket {}",
        processor.config().target_bucket
    );
    lambda_runtime::run(service_fn(|event| function_handler(event, &processor)))
        .await
        .map_err(|e| anyhow!(e))
}

async fn run_poll(
    config: WorkerConfig,
    batch_size: usize,
    wait: Duration,
    once: bool,
) -> Result<()> {
    let processor = aws_processor(config).await?;
    info!(
        "Polling {} (batch size {}, wait {}s)",
        processor.config().queue_url.as_deref().unwrap_or_default(),
        batch_size,
        wait.as_secs()
    );

    // Only the receive call is interruptible; a batch always runs to completion.
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let messages = tokio::select! {
            _ = &mut ctrl_c => {
                info!("Interrupted, stopping");
                break;
            }
            received = processor.receive_batch(batch_size, wait) => {
                received.context("Failed to receive messages")?
            }
        };

        if !messages.is_empty() {
            let report = processor.process_batch(&messages).await;
            if report.status() == InvocationStatus::Fail {
                warn!(
                    "{} of {} record(s) failed; they will be redelivered",
                    report.stats.failed_records, report.stats.total_records
                );
            }
        }

        if once {
            break;
        }
    }
    Ok(())
}

async fn run_convert(cli: &Cli, input: &Path, output: Option<&Path>) -> Result<()> {
    let flavor = cli.flavor.into();
    let template = cli.template.into();

    if let Some(output) = output {
        let bytes = render::convert_to_file(input, output, flavor, template)
            .await
            .context("Conversion failed")?;
        eprintln!(
            "{}  {} bytes  →  {}",
            green("✔"),
            bytes,
            bold(&output.display().to_string()),
        );
    } else {
        let html = render::convert_file(input, flavor, template)
            .await
            .context("Conversion failed")?;
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(html.as_bytes())
            .context("Failed to write to stdout")?;
    }
    Ok(())
}

async fn run_replay(config: WorkerConfig, event: &Path, store_root: &Path) -> Result<()> {
    let body = tokio::fs::read_to_string(event)
        .await
        .with_context(|| format!("Failed to read notification from {:?}", event))?;

    let message_id = event
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "replay".to_string());
    let message = InboundMessage::new(message_id.clone(), message_id, body);

    let queue = Arc::new(MemoryQueue::new());
    queue.push(message.clone());
    let store = Arc::new(LocalObjectStore::new(store_root));
    let processor = MessageProcessor::new(config, store, queue);

    let report = processor.process_batch(&[message]).await;
    let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
    println!("{json}");

    match report.first_error() {
        None => {
            eprintln!(
                "{}  {} object(s) converted in {}ms",
                green("✔"),
                report.stats.converted_objects,
                report.stats.duration_ms
            );
            Ok(())
        }
        Some(e) => {
            eprintln!("{}  {}", red("✘"), e);
            bail!("Replay failed: {}", e.kind())
        }
    }
}
