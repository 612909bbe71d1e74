//! Command-line front end for hotcue-core
//!
//! Shows the song and cue counts of a rekordbox XML export and copies its
//! hot cues into memory cues, reporting progress while the file is rewritten.

mod config;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use hotcue_core::{rewrite_with, scan, CollectionScan, RewriteSummary};

use config::Config;

#[derive(Parser)]
#[command(name = "hotcue")]
#[command(about = "Copy rekordbox hot cues into memory cues")]
#[command(version)]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show song, hot cue and memory cue counts
    Info {
        /// rekordbox XML export
        file: PathBuf,

        /// Print the counts as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a memory cue for every hot cue, rewriting the file in place
    Convert {
        /// rekordbox XML export
        file: PathBuf,

        /// Convert even if the file is not recognized as a collection
        #[arg(long)]
        force: bool,

        /// Duplicate every hot cue of a segment instead of the first one
        #[arg(long)]
        scan_all: bool,

        /// Print the rewrite summary as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    init_logging(cli.verbose)?;

    match cli.command {
        Commands::Info { file, json } => show_info(&file, json),
        Commands::Convert {
            file,
            force,
            scan_all,
            json,
        } => {
            let summary = convert(Config::new(file, force, scan_all))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("✓ Converted {} hot cues to memory cues", summary.duplicated);
            }
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn show_info(file: &Path, json: bool) -> anyhow::Result<()> {
    let stats = CollectionScan::load(file)
        .with_context(|| format!("cannot read file {:?}", file))?
        .stats();

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    let name = file.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    println!("Selected file: {}", name);
    println!("  Path: {}", file.display());

    if !stats.is_collection {
        println!("✗ This file is not a rekordbox collection, please select a different file.");
        return Ok(());
    }

    println!("  Songs:       {}", stats.songs);
    println!("  Hot cues:    {}", stats.hot_cues);
    println!("  Memory cues: {}", stats.memory_cues);
    Ok(())
}

/// Run the rewrite on a worker thread and render its progress here
fn convert(config: Config) -> anyhow::Result<RewriteSummary> {
    if !config.force && !scan::is_collection(&config.file) {
        bail!(
            "{:?} is not a rekordbox collection, please select a different file",
            config.file
        );
    }

    let total = scan::hot_cue_count(&config.file);
    info!("Converting {} hot cues in {:?}", total, config.file);

    let (tx, rx) = mpsc::channel();
    let worker = thread::spawn(move || {
        rewrite_with(&config.file, &config.rewrite, |converted| {
            // Receiver only goes away if the main thread is unwinding
            let _ = tx.send(converted);
        })
    });

    let mut stderr = std::io::stderr();
    let mut shown = false;
    for converted in rx {
        write!(stderr, "\r{}", progress_line(converted, total))?;
        stderr.flush()?;
        shown = true;
    }
    if shown {
        writeln!(stderr)?;
    }

    let summary = worker
        .join()
        .map_err(|_| anyhow!("conversion worker panicked"))?
        .context("conversion failed")?;
    debug!("Rewrite summary: {:?}", summary);

    Ok(summary)
}

fn progress_line(converted: usize, total: usize) -> String {
    format!("Converting {} of {} hot cues...", converted, total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::fs;
    use tempfile::TempDir;

    const COLLECTION: &str = r#"<DJ_PLAYLISTS Version="1.0.0">
<PRODUCT Name="rekordbox" Version="6.8.5" Company="AlphaTheta"/>
<COLLECTION Entries="1">
<TRACK TrackID="1" Name="One">
<POSITION_MARK Name="" Type="0" Start="0.0" Num="0"/>
<POSITION_MARK Name="" Type="0" Start="8.0" Num="1"/>
</TRACK>
</COLLECTION>
</DJ_PLAYLISTS>"#;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_convert() {
        let args = ["hotcue", "-v", "convert", "rekordbox.xml", "--scan-all", "--json"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Convert {
                file,
                force,
                scan_all,
                json,
            } => {
                assert_eq!(file, PathBuf::from("rekordbox.xml"));
                assert!(!force);
                assert!(scan_all);
                assert!(json);
            }
            _ => panic!("expected convert"),
        }
    }

    #[test]
    fn test_progress_line() {
        assert_eq!(progress_line(3, 10), "Converting 3 of 10 hot cues...");
    }

    #[test]
    fn test_convert_collection() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("rekordbox.xml");
        fs::write(&path, COLLECTION).unwrap();

        let summary = convert(Config::new(path.clone(), false, false)).unwrap();
        assert_eq!(summary.duplicated, 2);

        let stats = CollectionScan::load(&path).unwrap().stats();
        assert_eq!(stats.hot_cues, 2);
        assert_eq!(stats.memory_cues, 2);
    }

    #[test]
    fn test_convert_refuses_non_collection() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("other.xml");
        let contents = COLLECTION.replace("rekordbox", "serato");
        fs::write(&path, &contents).unwrap();

        assert!(convert(Config::new(path.clone(), false, false)).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), contents);

        let summary = convert(Config::new(path, true, false)).unwrap();
        assert_eq!(summary.duplicated, 2);
    }

    #[test]
    fn test_convert_missing_file() {
        let tmp = TempDir::new().unwrap();
        let err = convert(Config::new(tmp.path().join("missing.xml"), true, false)).unwrap_err();
        assert!(format!("{:#}", err).contains("cannot read file"));
    }
}
