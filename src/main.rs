use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};

use shoplite_lib::{backup, export};

#[derive(Debug, Parser)]
#[command(name = "shoplite", about = "Shoplite sales data engine", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Data export, import, and backup inspection commands.
    #[command(subcommand)]
    Data(DataCommand),
}

#[derive(Debug, Subcommand)]
enum DataCommand {
    /// Export all data to a JSON snapshot file.
    Export {
        /// Destination file; defaults to shoplite-export-<date>.json in the
        /// current directory.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Emit a machine-readable JSON object instead of plain text.
        #[arg(long)]
        json: bool,
    },
    /// Import a JSON snapshot, with automatic backup and restore on failure.
    Import {
        file: PathBuf,
        /// Emit the raw import outcome as JSON.
        #[arg(long)]
        json: bool,
    },
    /// List safety backups for manual inspection and cleanup.
    Backups {
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    shoplite_lib::logging::init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Data(command) => handle_data_command(command).await,
    }
}

async fn handle_data_command(command: DataCommand) -> Result<ExitCode> {
    let data_dir = shoplite_lib::default_data_dir();

    match command {
        DataCommand::Export { out, json } => {
            let state = shoplite_lib::bootstrap(&data_dir)
                .await
                .context("open database")?;
            let snapshot = export::export_snapshot(&state.store())
                .await
                .context("export snapshot")?;
            let out = out.unwrap_or_else(|| {
                PathBuf::from(format!(
                    "shoplite-export-{}.json",
                    Utc::now().format("%Y-%m-%d")
                ))
            });
            export::write_snapshot(&snapshot, &out).context("write snapshot file")?;

            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "path": out.display().to_string(),
                        "recordCount": snapshot.record_count(),
                        "exportedAt": snapshot.exported_at,
                    })
                );
            } else {
                println!(
                    "Exported {} records to {}",
                    snapshot.record_count(),
                    out.display()
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        DataCommand::Import { file, json } => {
            let raw = fs::read_to_string(&file)
                .with_context(|| format!("read snapshot file {}", file.display()))?;
            let value: serde_json::Value = serde_json::from_str(&raw)
                .with_context(|| format!("parse snapshot file {}", file.display()))?;

            let state = shoplite_lib::bootstrap(&data_dir)
                .await
                .context("open database")?;
            let outcome = shoplite_lib::import_data(&state, value).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                if let Some(message) = &outcome.message {
                    println!("{message}");
                }
                if let Some(error) = &outcome.error {
                    eprintln!("Import error: {error}");
                }
            }

            Ok(if outcome.success {
                ExitCode::SUCCESS
            } else if outcome.critical.unwrap_or(false) {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            })
        }
        DataCommand::Backups { json } => {
            let info = backup::overview(&data_dir).context("read backups directory")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else if info.backups.is_empty() {
                println!("No backups under {}", info.directory);
            } else {
                println!("Backups under {}:", info.directory);
                for entry in &info.backups {
                    println!(
                        "  {}  {} records  {} bytes  exported {}",
                        entry.path, entry.record_count, entry.size_bytes, entry.exported_at
                    );
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
