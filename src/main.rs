use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use mailsift::config::AppConfig;
use mailsift::language::WhatlangDetector;
use mailsift::logging::{init_logging, OperationTimer};
use mailsift::models::{FeedbackRequest, FeedbackResponse, RawMessage};
use mailsift::offline::{regenerate, RegenerateOptions};
use mailsift::service::{bootstrap, Preprocessor};
use mailsift::{metrics, server};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding default.* and local.* config files
    #[arg(long, global = true, default_value = "config")]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Override server.bind_address
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Classify one message and print the result as JSON
    Predict {
        /// Message text
        #[arg(short, long, conflicts_with = "file")]
        text: Option<String>,

        /// Read the message bytes from a file
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Record a correction from a JSON file
    Feedback {
        /// JSON document with the feedback fields
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Show normalization, language and spam features without classifiers
    Inspect {
        /// Message text
        #[arg(short, long)]
        text: String,
    },
    /// Regenerate training features from a CSV of messages
    Features {
        /// Input CSV
        #[arg(short, long)]
        input: PathBuf,

        /// Output CSV
        #[arg(short, long)]
        output: PathBuf,

        /// Column holding message text
        #[arg(short, long, default_value = "message")]
        column: String,

        /// Column copied through as the label
        #[arg(short, long)]
        label_column: Option<String>,

        /// Drop messages shorter than this many characters
        #[arg(short, long)]
        min_length: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load_from(&cli.config_dir, None)?;

    let _log_guard = init_logging(
        Some(&config.logging.level),
        config.logging.file_path.as_deref().map(Path::new),
        config.logging.format,
    )?;
    metrics::describe_metrics();

    match cli.command {
        Commands::Serve { bind } => {
            let orchestrator = bootstrap(&config).await?;
            let address = bind.unwrap_or_else(|| config.server.bind_address.clone());
            server::serve(orchestrator, &address).await?;
        }
        Commands::Predict { text, file } => {
            let raw = match (text, file) {
                (Some(text), _) => RawMessage::from(text),
                (None, Some(path)) => RawMessage::from_bytes(
                    fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?,
                ),
                (None, None) => bail!("Either --text or --file is required"),
            };
            let orchestrator = bootstrap(&config).await?;
            let timer = OperationTimer::new("predict");
            let prediction = orchestrator.predict(&raw).await?;
            timer.finish();
            print_json(&prediction)?;
        }
        Commands::Feedback { file } => {
            let reader = BufReader::new(
                File::open(&file).with_context(|| format!("Failed to open {}", file.display()))?,
            );
            let request: FeedbackRequest =
                serde_json::from_reader(reader).context("Failed to parse feedback JSON")?;
            let orchestrator = bootstrap(&config).await?;
            let action = orchestrator.record_feedback(request).await?;
            print_json(&FeedbackResponse::from(action))?;
        }
        Commands::Inspect { text } => {
            let detector = WhatlangDetector::new(
                config.language.min_confidence,
                config.language.min_chars,
            )
            .requiring_reliable(config.language.require_reliable);
            let preprocessor = Preprocessor::new(Arc::new(detector), config.features)?;
            let inspection = preprocessor.inspect(&RawMessage::from(text));
            print_json(&serde_json::json!({
                "normalized": inspection.normalized.as_str(),
                "detected_language": inspection.language,
                "emotion_input": inspection.prepared,
                "spam_features": inspection.features,
            }))?;
        }
        Commands::Features {
            input,
            output,
            column,
            label_column,
            min_length,
        } => {
            let timer = OperationTimer::new("features");
            let reader = BufReader::new(
                File::open(&input).with_context(|| format!("Failed to open {}", input.display()))?,
            );
            if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let writer = BufWriter::new(
                File::create(&output)
                    .with_context(|| format!("Failed to create {}", output.display()))?,
            );
            let options = RegenerateOptions {
                text_column: column,
                label_column,
                min_length,
                features: config.features,
            };
            let summary = regenerate(reader, writer, &options)?;
            timer.finish();
            info!(
                written = summary.written,
                skipped = summary.skipped,
                output = %output.display(),
                "Features written"
            );
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}
