use std::path::PathBuf;

use {
    anyhow::{Context, Result, bail},
    clap::{Parser, Subcommand},
    fastrecall_config::load_config,
    fastrecall_memory::{MemoryManager, MemoryRecord, MemoryStats, SearchResponse},
    serde_json::{Map, Value},
    tracing::debug,
    tracing_subscriber::EnvFilter,
};

#[derive(Parser)]
#[command(name = "fastrecall", version, about = "Local keyword memory store with cached retrieval")]
struct Cli {
    /// Path to fastrecall.toml (default: ./fastrecall.toml, then the user config dir).
    #[arg(long, global = true, env = "FASTRECALL_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the store, index and cache snapshots.
    #[arg(long, global = true, env = "FASTRECALL_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store a new memory.
    Add {
        id: String,
        content: String,
        /// Metadata entry; values that parse as JSON keep their type.
        #[arg(long = "meta", value_name = "KEY=VALUE", value_parser = parse_meta)]
        meta: Vec<(String, Value)>,
        /// Overwrite the memory if the id already exists.
        #[arg(long)]
        replace: bool,
    },
    /// Print one memory.
    Get {
        id: String,
        #[arg(long)]
        json: bool,
    },
    /// Delete a memory and its index postings.
    Remove { id: String },
    /// Import text files as memories (default: the configured import dirs).
    Import { dirs: Vec<PathBuf> },
    /// Rebuild the keyword index from the stored memories.
    Index,
    /// Rank memories against a free-text query.
    Search {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
        #[arg(short, long)]
        limit: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// Show store, index and cache counters.
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Empty the result cache.
    Clear,
    /// Write pending cache bookkeeping to disk.
    Flush,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs);

    let loaded = load_config(cli.config.as_deref()).context("failed to load configuration")?;
    let config = loaded.memory_config(cli.data_dir.as_deref());
    debug!(
        source = ?loaded.source,
        data_dir = %config.data_dir.display(),
        "resolved configuration"
    );

    let mut manager = MemoryManager::open(config);
    run(&mut manager, cli.command)?;
    manager.flush().context("failed to persist result cache")
}

fn init_tracing(default_level: &str, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn run(manager: &mut MemoryManager, command: Command) -> Result<()> {
    match command {
        Command::Add {
            id,
            content,
            meta,
            replace,
        } => {
            let metadata: Map<String, Value> = meta.into_iter().collect();
            let stored = if replace {
                manager.upsert_memory(&id, content, metadata)
            } else {
                manager.add_memory(id.as_str(), content, metadata)
            };
            let record = stored.with_context(|| format!("failed to store memory {id}"))?;
            println!("stored {} ({} keywords)", record.id, record.keywords.len());
        },
        Command::Get { id, json } => {
            let record = manager.get_memory(&id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(record)?);
            } else {
                print_record(record);
            }
        },
        Command::Remove { id } => {
            manager
                .remove_memory(&id)
                .with_context(|| format!("failed to remove memory {id}"))?;
            println!("removed {id}");
        },
        Command::Import { dirs } => {
            let dirs = if dirs.is_empty() {
                manager.config().import_dirs.clone()
            } else {
                dirs
            };
            let report = manager.import_dirs(&dirs);
            println!(
                "added {}, updated {}, unchanged {}, removed {}, skipped {}, errors {}",
                report.added,
                report.updated,
                report.unchanged,
                report.removed,
                report.skipped,
                report.errors
            );
            if report.errors > 0 {
                bail!("{} file(s) failed to import", report.errors);
            }
        },
        Command::Index => match manager.rebuild_index()? {
            Some(stats) => println!(
                "indexed {} memories, {} terms",
                manager.store().len(),
                stats.term_count
            ),
            None => bail!("indexing is disabled (search.use_index = false)"),
        },
        Command::Search { query, limit, json } => {
            let response = manager.search(&query.join(" "), limit);
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print_response(&response);
            }
        },
        Command::Stats { json } => {
            let stats = manager.stats();
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_stats(&stats);
            }
        },
        Command::Clear => {
            manager.clear_cache().context("failed to clear result cache")?;
            println!("result cache cleared");
        },
        Command::Flush => {
            manager.flush().context("failed to persist result cache")?;
        },
    }
    Ok(())
}

/// Parse `key=value`. The value is kept as JSON when it parses as JSON
/// (`n=3`, `pinned=true`, `tags=["a"]`), otherwise it is a string.
fn parse_meta(raw: &str) -> Result<(String, Value), String> {
    let Some((key, value)) = raw.split_once('=') else {
        return Err(format!("expected KEY=VALUE, got `{raw}`"));
    };
    let key = key.trim();
    if key.is_empty() {
        return Err("metadata key must not be empty".into());
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn snippet(content: &str, max_chars: usize) -> String {
    let line = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if line.chars().count() <= max_chars {
        return line;
    }
    let mut out: String = line.chars().take(max_chars).collect();
    out.push('…');
    out
}

fn print_record(record: &MemoryRecord) {
    println!("{}", record.id);
    for (key, value) in &record.metadata {
        match value {
            Value::String(s) => println!("  {key}: {s}"),
            other => println!("  {key}: {other}"),
        }
    }
    println!();
    println!("{}", record.content);
}

fn print_response(response: &SearchResponse) {
    if response.results.is_empty() {
        println!("no matches for \"{}\"", response.query);
        return;
    }
    for hit in &response.results {
        println!("{:.3}  {}  {}", hit.score, hit.id, snippet(&hit.content, 72));
    }
    println!(
        "{} result(s) in {:.2} ms{}",
        response.results.len(),
        response.duration_ms,
        if response.cached { " (cached)" } else { "" }
    );
}

fn print_stats(stats: &MemoryStats) {
    println!("documents:      {}", stats.total_documents);
    if stats.indexed {
        println!("index terms:    {}", stats.term_count);
    } else {
        println!("index:          disabled");
    }
    println!(
        "cache:          {}/{} entries, hit rate {:.1}% ({} hits, {} misses)",
        stats.cache.size,
        stats.cache.capacity,
        stats.cache.hit_rate * 100.0,
        stats.cache.hits,
        stats.cache.misses
    );
}
