//! Sift CLI
//!
//! Command-line front end for the Sift multi-pattern automaton.

mod patterns;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use sift_ac::{AcConfig, Automaton, Match, TransitionStrategy};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Matches in flight between scanning tasks and the printer
const CHANNEL_CAPACITY: usize = 1024;

#[derive(Parser)]
#[command(name = "sift")]
#[command(about = "Sift - scan byte streams for many patterns at once", long_about = None)]
#[command(version)]
struct Cli {
    /// Log level
    #[arg(short, long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct BuildArgs {
    /// Pattern file (.json, or one pattern per line)
    #[arg(short, long)]
    patterns: PathBuf,

    /// JSON automaton configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fold ASCII case when matching
    #[arg(short = 'i', long)]
    ignore_case: bool,

    /// Resolve transitions lazily instead of building a dense table
    #[arg(long)]
    lazy: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Report every pattern occurrence in the inputs (stdin when none)
    Scan {
        #[command(flatten)]
        build: BuildArgs,

        /// Print matches as JSON lines
        #[arg(long)]
        json: bool,

        /// Files to scan
        inputs: Vec<PathBuf>,
    },

    /// Build the automaton and print its statistics
    Check {
        #[command(flatten)]
        build: BuildArgs,
    },
}

/// A match tagged with the input it came from
struct Hit {
    source: Arc<str>,
    found: Match,
}

#[derive(Serialize)]
struct Record<'a> {
    source: &'a str,
    #[serde(flatten)]
    found: &'a Match,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level)?;

    match cli.command {
        Commands::Scan { build, json, inputs } => {
            let automaton = Arc::new(build_automaton(&build)?);
            let matched = scan_inputs(automaton, inputs, json).await?;
            Ok(if matched { ExitCode::SUCCESS } else { ExitCode::from(1) })
        }
        Commands::Check { build } => {
            let automaton = build_automaton(&build)?;
            print_stats(&automaton);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn setup_logging(level: &str) -> Result<()> {
    let level = level.parse::<Level>().unwrap_or(Level::WARN);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))?;

    Ok(())
}

fn build_automaton(args: &BuildArgs) -> Result<Automaton> {
    let mut config: AcConfig = patterns::load_config(args.config.as_deref())?;
    if args.ignore_case {
        config.ascii_case_insensitive = true;
    }
    if args.lazy {
        config.transitions = TransitionStrategy::Lazy;
    }

    let set = patterns::load_patterns(&args.patterns)?;
    info!(patterns = set.len(), path = %args.patterns.display(), "Building automaton");

    Automaton::with_config(set, config).context("Failed to build automaton")
}

/// Scan every input on the blocking pool, sharing one automaton.
///
/// Scanners push matches into a bounded channel, so a slow stdout throttles
/// them instead of queuing matches in memory. Returns whether anything
/// matched.
async fn scan_inputs(automaton: Arc<Automaton>, inputs: Vec<PathBuf>, json: bool) -> Result<bool> {
    let (tx, mut rx) = mpsc::channel::<Hit>(CHANNEL_CAPACITY);
    let mut tasks = Vec::new();

    if inputs.is_empty() {
        let automaton = Arc::clone(&automaton);
        let tx = tx.clone();
        tasks.push(tokio::task::spawn_blocking(move || {
            scan_reader(&automaton, std::io::stdin().lock(), Arc::from("-"), &tx)
        }));
    }

    for path in inputs {
        let automaton = Arc::clone(&automaton);
        let tx = tx.clone();
        tasks.push(tokio::task::spawn_blocking(move || scan_file(&automaton, &path, &tx)));
    }
    drop(tx);

    let mut out = BufWriter::new(std::io::stdout());
    let mut total = 0usize;
    while let Some(hit) = rx.recv().await {
        total += 1;
        write_hit(&mut out, &hit, json)?;
    }
    out.flush().context("Failed to write output")?;

    for task in tasks {
        task.await.context("Scan task panicked")??;
    }

    info!(matches = total, "Scan complete");
    Ok(total > 0)
}

fn scan_file(automaton: &Automaton, path: &Path, tx: &mpsc::Sender<Hit>) -> Result<()> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let source: Arc<str> = Arc::from(path.display().to_string());
    scan_reader(automaton, file, source, tx)
}

fn scan_reader<R: Read>(
    automaton: &Automaton,
    reader: R,
    source: Arc<str>,
    tx: &mpsc::Sender<Hit>,
) -> Result<()> {
    let mut stream = automaton.stream_reader(reader);

    for found in stream.by_ref() {
        let found = found.with_context(|| format!("Failed to read {}", source))?;
        let hit = Hit {
            source: Arc::clone(&source),
            found,
        };
        if tx.blocking_send(hit).is_err() {
            // Printer is gone; nothing left to report to
            break;
        }
    }

    tracing::debug!(source = %source, bytes = stream.position(), "Finished input");
    Ok(())
}

fn write_hit<W: Write>(out: &mut W, hit: &Hit, json: bool) -> Result<()> {
    if json {
        let record = Record {
            source: &hit.source,
            found: &hit.found,
        };
        serde_json::to_writer(&mut *out, &record)?;
        writeln!(out)?;
    } else {
        writeln!(
            out,
            "{}:{}:{}:{}",
            hit.source, hit.found.start, hit.found.end, hit.found.pattern_id
        )?;
    }
    Ok(())
}

fn print_stats(automaton: &Automaton) {
    println!("patterns:         {}", automaton.pattern_count());
    println!("nodes:            {}", automaton.node_count());
    println!("alphabet:         {}", automaton.alphabet_size());
    println!("transitions:      {}", automaton.strategy());
    println!("case insensitive: {}", automaton.is_case_insensitive());
    println!("memory:           {} bytes", automaton.memory_usage());
}

#[cfg(test)]
mod tests {
    use super::*;
    use sift_ac::PatternId;

    #[test]
    fn test_write_hit_plain_and_json() {
        let hit = Hit {
            source: Arc::from("log.txt"),
            found: Match {
                pattern_id: PatternId(4),
                start: 2,
                end: 6,
            },
        };

        let mut plain = Vec::new();
        write_hit(&mut plain, &hit, false).unwrap();
        assert_eq!(String::from_utf8(plain).unwrap(), "log.txt:2:6:4\n");

        let mut json = Vec::new();
        write_hit(&mut json, &hit, true).unwrap();
        assert_eq!(
            String::from_utf8(json).unwrap(),
            "{\"source\":\"log.txt\",\"pattern_id\":4,\"start\":2,\"end\":6}\n"
        );
    }

    #[test]
    fn test_scan_reader_sends_every_match() {
        let automaton = Automaton::builder()
            .add_patterns([(1u32, "he"), (2, "she"), (4, "hers")])
            .build()
            .unwrap();
        let (tx, mut rx) = mpsc::channel(16);

        scan_reader(&automaton, &b"ushers"[..], Arc::from("mem"), &tx).unwrap();
        drop(tx);

        let mut got = Vec::new();
        while let Ok(hit) = rx.try_recv() {
            assert_eq!(&*hit.source, "mem");
            got.push((hit.found.pattern_id.0, hit.found.start, hit.found.end));
        }
        assert_eq!(got, vec![(1, 2, 4), (2, 1, 4), (4, 2, 6)]);
    }

    #[test]
    fn test_cli_parses_scan() {
        let cli = Cli::try_parse_from([
            "sift", "scan", "-p", "words.txt", "-i", "--json", "a.log", "b.log",
        ])
        .unwrap();
        match cli.command {
            Commands::Scan { build, json, inputs } => {
                assert_eq!(build.patterns, PathBuf::from("words.txt"));
                assert!(build.ignore_case);
                assert!(!build.lazy);
                assert!(json);
                assert_eq!(inputs.len(), 2);
            }
            Commands::Check { .. } => panic!("expected scan"),
        }
    }
}
