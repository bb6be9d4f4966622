use anyhow::Context;
use clap::{Parser, Subcommand};
use ebiodiv::{
    fields, BatchOptions, BatchScorer, DecisionLedger, KeyStore, OccurrenceBatch, StoreOptions,
};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Occurrence linking for biodiversity records
#[derive(Parser, Debug)]
#[command(name = "ebiodiv")]
#[command(about = "Score candidate occurrence links and inspect curator decisions", long_about = None)]
struct Args {
    /// Log level, overridden by RUST_LOG
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the records of a key store
    Dump {
        /// Path to the store file
        store: PathBuf,
        /// Print only this key
        key: Option<String>,
    },
    /// Add scores to every relation of a batch and print it as JSON
    Score {
        /// Batch file with `occurrences` and `occurrenceRelations`
        batch: PathBuf,
        /// Also attach the decisions recorded in this store
        #[arg(long)]
        decisions: Option<PathBuf>,
        /// Relations per worker chunk
        #[arg(long, default_value_t = ebiodiv_matching::DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
        /// Worker threads, one per core by default
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Print the scored field groups
    Fields,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Dump { store, key } => dump(store, key),
        Command::Score {
            batch,
            decisions,
            chunk_size,
            workers,
        } => score(batch, decisions, BatchOptions { chunk_size, workers }),
        Command::Fields => {
            println!("{}", serde_json::to_string_pretty(&fields())?);
            Ok(())
        }
    }
}

fn dump(path: PathBuf, key: Option<String>) -> anyhow::Result<()> {
    let store = KeyStore::open(&path, StoreOptions::read_only())
        .with_context(|| format!("opening {}", path.display()))?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match key {
        Some(key) => {
            let record = store.try_get(&key)?;
            writeln!(out, "{}", serde_json::to_string_pretty(&record)?)?;
        }
        None => {
            let txn = store.read()?;
            for item in txn.items()? {
                let (key, record) = item?;
                writeln!(out, "{}\t{}", key, serde_json::to_string(&record)?)?;
            }
        }
    }
    Ok(())
}

fn score(path: PathBuf, decisions: Option<PathBuf>, options: BatchOptions) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    let mut batch: OccurrenceBatch = serde_json::from_str(&text)?;
    info!(
        occurrences = batch.occurrences.len(),
        relations = batch.occurrence_relations.len(),
        "Loaded batch"
    );

    let scorer = BatchScorer::new(options)?;
    scorer.add_scores(&mut batch)?;

    if let Some(decisions) = decisions {
        let store = KeyStore::open(&decisions, StoreOptions::read_only())
            .with_context(|| format!("opening {}", decisions.display()))?;
        DecisionLedger::new(store).annotate(&mut batch)?;
    }

    println!("{}", serde_json::to_string_pretty(&batch)?);
    Ok(())
}
