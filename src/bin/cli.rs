use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use jobprobe::output::{self, stdout_writer};
use jobprobe::prelude::*;
use jobprobe::engine::select_jobs;
use tracing_subscriber::EnvFilter;
#[cfg(feature = "otel")]
use tracing_subscriber::layer::SubscriberExt;
#[cfg(feature = "otel")]
use tracing_subscriber::util::SubscriberInitExt;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "jobprobe")]
#[command(about = "Verify that remote jobs and API endpoints work", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run health checks against configured jobs and endpoints
    Run {
        /// Config directory or file path
        #[arg(short, long, default_value = ".")]
        config: PathBuf,

        /// Run specific jobs by name (comma-separated)
        #[arg(short = 'n', long = "name", value_delimiter = ',')]
        names: Vec<String>,

        /// Run jobs carrying any of these tags (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        tags: Vec<String>,

        /// Run only jobs for this environment
        #[arg(short, long)]
        env: Option<String>,

        /// Output format (overrides output.format from the config)
        #[arg(short, long, value_enum)]
        output: Option<FormatArg>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,

        /// Show what would run without executing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// List configured jobs or environments
    List {
        #[command(subcommand)]
        what: ListCommand,
    },

    /// Print version information
    Version,
}

#[derive(Subcommand)]
enum ListCommand {
    /// List configured jobs
    Jobs {
        /// Config directory or file path
        #[arg(short, long, default_value = ".")]
        config: PathBuf,

        /// Only jobs carrying any of these tags (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        tags: Vec<String>,
    },

    /// List configured environments
    #[command(alias = "envs")]
    Environments {
        /// Config directory or file path
        #[arg(short, long, default_value = ".")]
        config: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Console,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Console => OutputFormat::Console,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

fn log_filter(verbose: bool) -> EnvFilter {
    let default = if verbose {
        "jobprobe=debug"
    } else {
        "jobprobe=warn"
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

#[cfg(feature = "otel")]
fn init_otel_tracing(verbose: bool) -> anyhow::Result<()> {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::runtime::Tokio;
    use opentelemetry_sdk::trace::TracerProvider;

    let otlp_endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .unwrap_or_else(|_| "http://localhost:4317".to_string());

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&otlp_endpoint)
        .build()
        .context("failed to create OTLP exporter")?;

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, Tokio)
        .build();

    let tracer = provider.tracer("jobprobe");
    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    tracing_subscriber::registry()
        .with(log_filter(verbose))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(otel_layer)
        .init();

    opentelemetry::global::set_tracer_provider(provider);
    Ok(())
}

fn init_tracing(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(verbose))
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    #[cfg(feature = "otel")]
    if let Err(e) = init_otel_tracing(cli.verbose) {
        eprintln!("warning: {:#}, falling back to plain logging", e);
        init_tracing(cli.verbose);
    }

    #[cfg(not(feature = "otel"))]
    init_tracing(cli.verbose);

    let result = run(cli).await;

    #[cfg(feature = "otel")]
    opentelemetry::global::shutdown_tracer_provider();

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            tracing::debug!(error = ?e, "Command failed");
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    match cli.command {
        Commands::Run {
            config,
            names,
            tags,
            env,
            output,
            pretty,
            dry_run,
        } => {
            let options = RunOptions {
                names: split_list(names),
                tags: split_list(tags),
                environment: env.filter(|e| !e.is_empty()),
                dry_run,
            };
            run_jobs(config, options, output, pretty, cli.verbose).await
        }
        Commands::List { what } => match what {
            ListCommand::Jobs { config, tags } => list_jobs(config, split_list(tags)),
            ListCommand::Environments { config } => list_environments(config),
        },
        Commands::Version => {
            println!("jobprobe {}", VERSION);
            Ok(true)
        }
    }
}

/// Trim entries and drop empty ones
fn split_list(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    ConfigLoader::load(path).with_context(|| format!("failed to load config from {}", path.display()))
}

#[tracing::instrument(skip_all, fields(config = %config_path.display()))]
async fn run_jobs(
    config_path: PathBuf,
    options: RunOptions,
    format: Option<FormatArg>,
    pretty: bool,
    verbose: bool,
) -> anyhow::Result<bool> {
    let config = load_config(&config_path)?;

    let format = format.map(OutputFormat::from).unwrap_or(config.output.format);
    let colors = config.output.console.colors && io::stdout().is_terminal();
    let verbose = verbose || config.output.console.verbose;
    let writer = stdout_writer(format, colors, verbose, pretty);

    {
        let mut w = output::lock(&writer);
        w.write_header(VERSION)?;
        w.write_config_summary(config.environments.len(), config.jobs.len())?;
    }

    let mut runner = Runner::new(config, VERSION);
    runner.set_progress_handler(Arc::new(ProgressAdapter::new(writer.clone())));

    let cancel = CancelToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nInterrupted, cancelling...");
            on_signal.cancel();
        }
    });

    let result = runner.run(&cancel, &options).await?;
    output::lock(&writer).write_result(&result)?;

    Ok(result.success())
}

fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: Vec<&str>| {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect();
        println!("{}", padded.join("  ").trim_end());
    };

    let rule: Vec<String> = headers.iter().map(|h| "-".repeat(h.len())).collect();
    line(headers.to_vec());
    line(rule.iter().map(String::as_str).collect());
    for row in rows {
        line(row.iter().map(String::as_str).collect());
    }
}

fn list_jobs(config_path: PathBuf, tags: Vec<String>) -> anyhow::Result<bool> {
    let config = load_config(&config_path)?;
    let filter = RunOptions {
        tags,
        ..Default::default()
    };
    let jobs = select_jobs(&config.jobs, &filter);

    if jobs.is_empty() {
        println!("No jobs found.");
        return Ok(true);
    }

    let rows: Vec<Vec<String>> = jobs
        .iter()
        .map(|job| {
            let tags = if job.tags.is_empty() {
                "-".to_string()
            } else {
                job.tags.join(", ")
            };
            vec![
                job.name.clone(),
                job.kind.clone(),
                job.environment.clone(),
                tags,
            ]
        })
        .collect();

    print_table(&["NAME", "TYPE", "ENVIRONMENT", "TAGS"], &rows);
    println!("\nTotal: {} jobs", jobs.len());
    Ok(true)
}

fn list_environments(config_path: PathBuf) -> anyhow::Result<bool> {
    let config = load_config(&config_path)?;

    if config.environments.is_empty() {
        println!("No environments found.");
        return Ok(true);
    }

    let rows: Vec<Vec<String>> = config
        .environment_names()
        .into_iter()
        .filter_map(|name| {
            config
                .environments
                .get(name)
                .map(|env| vec![name.to_string(), env.kind.clone(), env.url.clone()])
        })
        .collect();

    print_table(&["NAME", "TYPE", "URL"], &rows);
    println!("\nTotal: {} environments", rows.len());
    Ok(true)
}
