// SPDX-FileCopyrightText: 2026 romvault contributors
// SPDX-License-Identifier: MIT

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use romvault_store::archive::format_timestamp;
use romvault_store::error::IoContext;
use romvault_store::{Config, FixOutcome, Result, Store, config};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
usage: romvault <command>

commands:
  check [--repair]   scan the store for integrity violations (and fix them)
  export <file.zip>  write all save slots into a ZIP backup
  import <file.zip>  restore save slots from a ZIP backup
  list               list save slots, newest first
  stats              print record counts
  migrate            rewrite legacy base64 program images as raw bytes

The configuration file is read from $ROMVAULT_CONFIG or ./romvault.toml.";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Check { repair: bool },
    Export(PathBuf),
    Import(PathBuf),
    List,
    Stats,
    Migrate,
}

impl Command {
    fn parse(args: &[String]) -> Option<Self> {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        match args.as_slice() {
            ["check"] => Some(Command::Check { repair: false }),
            ["check", "--repair"] => Some(Command::Check { repair: true }),
            ["export", path] => Some(Command::Export(PathBuf::from(path))),
            ["import", path] => Some(Command::Import(PathBuf::from(path))),
            ["list"] => Some(Command::List),
            ["stats"] => Some(Command::Stats),
            ["migrate"] => Some(Command::Migrate),
            _ => None,
        }
    }
}

fn init_logging(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run(config: Config, command: Command) -> Result<ExitCode> {
    let store = Store::open(config).await?;
    match command {
        Command::Check { repair: false } => {
            let report = store.check_consistency().await?;
            println!("{report}");
            if !report.is_empty() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Check { repair: true } => {
            let outcome = store.check_and_fix().await?;
            println!("{outcome}");
            if let FixOutcome::Unconverged { .. } = outcome {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Export(path) => {
            let file = File::create(&path)
                .io_context(|| format!("Failed to create {}", path.display()))?;
            let (mut writer, summary) = store.export_backup(BufWriter::new(file)).await?;
            writer
                .flush()
                .io_context(|| format!("Failed to write {}", path.display()))?;
            println!(
                "Exported {} save(s) to {}, {} failed",
                summary.processed,
                path.display(),
                summary.failed
            );
            if summary.rom_conflicts > 0 {
                println!(
                    "{} save(s) share a directory with a different program image",
                    summary.rom_conflicts
                );
            }
        }
        Command::Import(path) => {
            let file =
                File::open(&path).io_context(|| format!("Failed to open {}", path.display()))?;
            let summary = store.import_backup(BufReader::new(file)).await?;
            println!(
                "Imported {} save(s), skipped {}, {} failed",
                summary.imported, summary.skipped, summary.failed
            );
        }
        Command::List => {
            for meta in store.all_save_meta().await? {
                let stamp = format_timestamp(meta.timestamp)
                    .unwrap_or_else(|_| "<invalid timestamp>".to_owned());
                println!(
                    "{:>6}  {}  {:<8} {}",
                    meta.id,
                    stamp,
                    meta.platform_id,
                    meta.program_name
                );
            }
        }
        Command::Stats => {
            let counts = store.stats().await?;
            println!("content records:  {}", counts.content_records);
            println!("save records:     {}", counts.save_records);
            println!("save slots:       {}", counts.save_meta);
            println!("collections:      {}", counts.collections);
            println!("collection items: {}", counts.collection_items);
            let files = store.list_files().await?;
            println!("files:            {}", files.len());
        }
        Command::Migrate => {
            let summary = store.migrate_legacy_content().await?;
            println!(
                "Migrated {} legacy record(s), {} could not be decoded",
                summary.migrated, summary.failed
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("romvault: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config.log_level);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = Command::parse(&args) else {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    };

    info!("Using store at {}", config.db_path.display());
    match run(config, command).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
