use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use ql_core::core::Style;
use ql_feedback::{export_to_jsonl, ExportFilter};
use ql_server::bootstrap::{self, RuntimeConfig};
use ql_server::config::AppConfig;
use ql_server::logging;
use ql_server::server;
use ql_server::service::RefineParams;

#[derive(Parser)]
#[command(name = "quill", about = "feedback-driven content refinement service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to the configuration file.
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default).
    Serve,
    /// Validate configuration file and exit.
    Validate,
    /// Refine one file and print the run as JSON.
    Refine {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        style: Option<String>,
        #[arg(short = 'n', long)]
        max_iterations: Option<u32>,
        /// Notes forwarded to every edit round.
        #[arg(long)]
        feedback: Option<String>,
    },
    /// Print feedback statistics.
    Stats,
    /// Print the best-rated style and iteration count.
    Best,
    /// Write ledger entries as JSON Lines.
    Export {
        #[arg(long)]
        style: Option<String>,
        /// Inclusive lower bound, RFC 3339.
        #[arg(long)]
        since: Option<DateTime<Utc>>,
        /// Exclusive upper bound, RFC 3339.
        #[arg(long)]
        until: Option<DateTime<Utc>>,
        #[arg(long)]
        min_rating: Option<f64>,
        /// Output file; stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command.unwrap_or(Command::Serve) {
        Command::Validate => run_validate(&cli.config),
        Command::Serve => match load_runtime(&cli.config) {
            Ok(runtime) => {
                logging::init(&runtime.log_level, runtime.log_format);
                server::serve(runtime).await
            }
            Err(e) => Err(e),
        },
        Command::Refine {
            input,
            style,
            max_iterations,
            feedback,
        } => run_refine(&cli.config, &input, style, max_iterations, feedback).await,
        Command::Stats => run_stats(&cli.config),
        Command::Best => run_best(&cli.config),
        Command::Export {
            style,
            since,
            until,
            min_rating,
            output,
        } => {
            let filter = ExportFilter {
                style: style.map(Style::new),
                since,
                until,
                min_rating,
            };
            run_export(&cli.config, &filter, output.as_deref())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn load_runtime(path: &Path) -> Result<RuntimeConfig, anyhow::Error> {
    let config = AppConfig::from_file(path)
        .map_err(|e| anyhow::anyhow!("error reading config {}: {e}", path.display()))?;
    bootstrap::into_runtime(config).map_err(|e| anyhow::anyhow!("config invalid: {e}"))
}

fn run_validate(path: &Path) -> Result<(), anyhow::Error> {
    load_runtime(path)?;
    println!("Config valid: {}", path.display());
    Ok(())
}

async fn run_refine(
    config: &Path,
    input: &Path,
    style: Option<String>,
    max_iterations: Option<u32>,
    feedback: Option<String>,
) -> Result<(), anyhow::Error> {
    let runtime = load_runtime(config)?;
    logging::init(&runtime.log_level, logging::LogFormat::Pretty);

    let content = std::fs::read_to_string(input)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", input.display()))?;
    let service = server::build_service(&runtime)?;
    let result = service
        .refine(RefineParams {
            content,
            style: style.map(Style::new),
            max_iterations,
            human_feedback: feedback,
        })
        .await?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn run_stats(config: &Path) -> Result<(), anyhow::Error> {
    let runtime = load_runtime(config)?;
    let model = server::open_reward_model(&runtime)?;
    println!("{}", serde_json::to_string_pretty(&model.get_statistics())?);
    Ok(())
}

fn run_best(config: &Path) -> Result<(), anyhow::Error> {
    let runtime = load_runtime(config)?;
    let model = server::open_reward_model(&runtime)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&model.get_best_parameters())?
    );
    Ok(())
}

fn run_export(
    config: &Path,
    filter: &ExportFilter,
    output: Option<&Path>,
) -> Result<(), anyhow::Error> {
    let runtime = load_runtime(config)?;
    let model = server::open_reward_model(&runtime)?;

    let written = match output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .map_err(|e| anyhow::anyhow!("failed to create {}: {e}", path.display()))?;
            export_to_jsonl(model.history(), filter, std::io::BufWriter::new(file))?
        }
        None => export_to_jsonl(model.history(), filter, std::io::stdout().lock())?,
    };
    eprintln!("Exported {written} entries");
    Ok(())
}
