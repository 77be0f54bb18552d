//! IdP Warden CLI
//!
//! Command-line interface for the identity-provider event pipeline.

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

mod commands;
mod config;
mod validator;

use commands::{run_pipeline, show_records, RunConfig, ShowTarget, MAX_HOURS};
use config::AppConfig;
use iw_core::PipelineStore;
use iw_observability::logging::{init_logging_with_config, parse_level, LoggingConfig};
use validator::ConfigValidator;

#[derive(Parser)]
#[command(name = "idp-warden")]
#[command(author = "IdP Warden Team")]
#[command(version)]
#[command(about = "Detection and response planning for identity-provider events", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", env = "IDP_WARDEN_CONFIG", default_value = "config/idp-warden.yaml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid output format: {}", s)),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch recent events and run the full pipeline
    Run {
        /// Look-back window in hours
        #[arg(long, default_value = "24", value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_HOURS)))]
        hours: u32,
    },

    /// Show persisted findings, incidents, plans and commands
    Show {
        #[arg(value_enum, default_value = "all")]
        target: ShowTarget,
    },

    /// Validate and print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        parse_level(&config.logging.level).unwrap_or(tracing::Level::INFO)
    };
    init_logging_with_config(
        LoggingConfig::default()
            .with_level(level)
            .with_format(config.logging.format),
    );

    match cli.command {
        Commands::Run { hours } => cmd_run(config, hours, cli.format).await,
        Commands::Show { target } => {
            let store = PipelineStore::jsonl(&config.storage.data_dir);
            show_records(&store, target, cli.format).await
        }
        Commands::Config => cmd_config(&config, &cli.config, cli.format),
    }
}

async fn cmd_run(config: AppConfig, hours: u32, format: OutputFormat) -> Result<()> {
    let validation = ConfigValidator::validate(&config);
    if validation.has_errors() {
        validation.print();
        println!();
        println!(
            "{}",
            "Run aborted due to configuration errors. Fix the errors above and try again."
                .red()
                .bold()
        );
        std::process::exit(1);
    }
    if validation.has_warnings() && format == OutputFormat::Text {
        validation.print();
        println!();
    }

    run_pipeline(config, RunConfig { hours }, format).await
}

fn cmd_config(config: &AppConfig, path: &std::path::Path, format: OutputFormat) -> Result<()> {
    let validation = ConfigValidator::validate(config);

    if format == OutputFormat::Json {
        let output = serde_json::json!({
            "config": config,
            "validation": validation,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", "Current Configuration".bold());
        println!("─────────────────────────");
        if !path.exists() {
            println!(
                "{}",
                format!("(no file at {}, using defaults)", path.display()).dimmed()
            );
        }
        print!("{}", serde_yaml::to_string(config)?);
        validation.print();
    }

    if validation.has_errors() {
        std::process::exit(1);
    }
    Ok(())
}
