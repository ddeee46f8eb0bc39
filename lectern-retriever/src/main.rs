use clap::{Parser, Subcommand};
use lectern_retriever::{
    config::RetrieverConfig,
    retrieval::retrieval_store::RetrievalStore,
    storage::persist,
};
use serde::Serialize;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

/// A CLI tool to build and query a lectern passage index.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file (defaults apply when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the index directory from the configuration
    #[arg(long, global = true)]
    index_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Chunk a text file, encode its passages and persist the index
    Build {
        /// Cleaned plain-text input file
        #[arg(short, long)]
        input: PathBuf,
        /// Prefix for passage ids (overrides `chunking.id_prefix`)
        #[arg(short, long)]
        prefix: Option<String>,
    },
    /// Find the passages most similar to a question
    Query {
        /// Question text
        text: String,
        /// Number of results (defaults to `top_k` from the configuration)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// Show index statistics
    Stats {
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum OutputFormat {
    Summary,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "summary" => Ok(OutputFormat::Summary),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid format: {s}")),
        }
    }
}

#[derive(Serialize)]
struct StatsOutput {
    #[serde(flatten)]
    stats: lectern_retriever::retrieval::retrieval_store::StoreStats,
    created_at: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn load_config(args: &Args) -> anyhow::Result<RetrieverConfig> {
    let mut config = match &args.config {
        Some(path) => RetrieverConfig::from_file(path).await?,
        None => RetrieverConfig::default(),
    };
    if let Some(index_dir) = &args.index_dir {
        config.index_dir = index_dir.clone();
    }
    Ok(config)
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = load_config(&args).await?;

    match args.command {
        Commands::Build { input, prefix } => {
            if let Some(prefix) = prefix {
                config.chunking.id_prefix = prefix;
            }
            let text = tokio::fs::read_to_string(&input)
                .await
                .map_err(|e| anyhow::anyhow!("Cannot read {}: {}", input.display(), e))?;

            let store = RetrievalStore::from_config(config).await?;
            let snapshot = store.ingest_document(&text).await?;
            println!(
                "Indexed {} passages (dimension {}) into {}",
                snapshot.len(),
                snapshot.dimension(),
                store.config().index_dir.display()
            );
            Ok(())
        }
        Commands::Query {
            text,
            top_k,
            format,
        } => {
            let k = top_k.unwrap_or(config.top_k);
            if k == 0 {
                anyhow::bail!("--top-k must be at least 1");
            }
            let store = RetrievalStore::from_config(config).await?;
            store.load().await?;
            let results = store.query(&text, k).await?;

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&results)?);
                }
                OutputFormat::Summary => {
                    println!("Found {} passages:", results.len());
                    for result in results {
                        let range = result.passage.source_offset();
                        println!(
                            "  {:.4} | {} | bytes {}-{}",
                            result.score,
                            result.passage.id(),
                            range.start,
                            range.end
                        );
                        println!(
                            "    {}",
                            result.passage.text().chars().take(100).collect::<String>()
                        );
                    }
                }
            }
            Ok(())
        }
        Commands::Stats { format } => {
            let store = RetrievalStore::from_config(config).await?;
            if let Err(e) = store.load().await {
                tracing::warn!("No usable index: {}", e);
            }
            let created_at = persist::read_manifest(&store.config().index_dir)
                .await
                .ok()
                .map(|manifest| manifest.created_at.to_rfc3339());
            let output = StatsOutput {
                stats: store.stats().await,
                created_at,
            };

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Summary => {
                    let stats = &output.stats;
                    println!("Index Statistics:");
                    println!("  Directory: {}", stats.index_dir.display());
                    println!("  State: {:?}", stats.state);
                    println!("  Entries: {}", stats.entries);
                    if let Some(dimension) = stats.dimension {
                        println!("  Dimension: {dimension}");
                    }
                    println!("  Query encoder: {}", stats.encoder.label());
                    if let Some(index_encoder) = &stats.index_encoder {
                        println!("  Index encoder: {}", index_encoder.label());
                    }
                    if let Some(created_at) = &output.created_at {
                        println!("  Created: {created_at}");
                    }
                }
            }
            Ok(())
        }
    }
}
