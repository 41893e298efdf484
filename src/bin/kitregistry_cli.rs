//! KitRegistry CLI - build and validate the component registry
//!
//! Commands: build, validate, analyze, hash
//! Outputs JSON to stdout, logs to stderr
//! Returns 2 on validation failure or a failed build

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use kitregistry_core::{
    content_checksum, RegistryBuilder, RegistryConfig, Validator, ENGINE_VERSION,
};

#[derive(Parser)]
#[command(name = "kitregistry-cli", version = ENGINE_VERSION)]
#[command(about = "KitRegistry CLI - UI Kit Registry Compiler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a registry config JSON file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Registry output directory (overrides config)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Public base URL of the registry (overrides config)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the registry from the source tree
    Build,

    /// Validate a built registry
    Validate,

    /// Print the fact sheet of one source file
    Analyze {
        /// Source file to scan
        file: PathBuf,
    },

    /// Print the checksum of one file
    Hash {
        /// File to hash
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => match RegistryConfig::load(path) {
            Ok(c) => c,
            Err(e) => {
                print_json(&serde_json::json!({"success": false, "error": e.to_string()}));
                return ExitCode::FAILURE;
            }
        },
        None => RegistryConfig::default(),
    };
    if let Some(output) = cli.output {
        config.output_dir = output;
    }
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }

    match cli.command {
        Commands::Build => {
            let builder = match RegistryBuilder::new(config) {
                Ok(b) => b,
                Err(e) => {
                    print_json(&serde_json::json!({"success": false, "error": e.to_string()}));
                    return ExitCode::FAILURE;
                }
            };
            let report = builder.build();
            print_json(&report);
            if report.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            }
        }

        Commands::Validate => {
            let report = Validator::new().validate(&config.output_dir);
            print_json(&report);
            if report.valid {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2) // Validation failure
            }
        }

        Commands::Analyze { file } => {
            let builder = match RegistryBuilder::new(config) {
                Ok(b) => b,
                Err(e) => {
                    print_json(&serde_json::json!({"error": e.to_string()}));
                    return ExitCode::FAILURE;
                }
            };
            match fs::read_to_string(&file) {
                Ok(source) => {
                    print_json(&builder.analyze(&source));
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    print_json(&serde_json::json!({"error": format!("{}: {}", file.display(), e)}));
                    ExitCode::FAILURE
                }
            }
        }

        Commands::Hash { file } => match fs::read_to_string(&file) {
            Ok(text) => {
                print_json(&serde_json::json!({
                    "file": file.display().to_string(),
                    "checksum": content_checksum(&text),
                }));
                ExitCode::SUCCESS
            }
            Err(e) => {
                print_json(&serde_json::json!({"error": format!("{}: {}", file.display(), e)}));
                ExitCode::FAILURE
            }
        },
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!(r#"{{"error": "Failed to serialize output: {}"}}"#, e),
    }
}
