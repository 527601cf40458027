//! CLI interface for the cluster-pruning search index

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tnt_search::persistence::SnapshotManager;
use tnt_search::{
    build, BuildConfig, IndexConfig, Representation, StoredIndex, TextIndex, Vector, Weighting,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tnt")]
#[command(about = "Fast search in text and vector data using cluster pruning", long_about = None)]
struct Cli {
    /// JSON configuration file (build and search defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. "info" or "tnt_search=debug". Overrides RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy)]
enum WeightingArg {
    Count,
    Tfidf,
}

impl From<WeightingArg> for Weighting {
    fn from(arg: WeightingArg) -> Self {
        match arg {
            WeightingArg::Count => Weighting::Count,
            WeightingArg::Tfidf => Weighting::Tfidf,
        }
    }
}

#[derive(ValueEnum, Clone, Copy)]
enum RepresentationArg {
    Dense,
    Sparse,
}

impl From<RepresentationArg> for Representation {
    fn from(arg: RepresentationArg) -> Self {
        match arg {
            RepresentationArg::Dense => Representation::Dense,
            RepresentationArg::Sparse => Representation::Sparse,
        }
    }
}

#[derive(clap::Args)]
struct BuildArgs {
    /// Number of leaders (default: ceil(sqrt(N)))
    #[arg(long)]
    leaders: Option<usize>,
    /// Seed for leader sampling
    #[arg(long)]
    seed: Option<u64>,
    /// Force dense or sparse storage
    #[arg(long, value_enum)]
    representation: Option<RepresentationArg>,
}

impl BuildArgs {
    fn apply(&self, mut config: BuildConfig) -> BuildConfig {
        if let Some(leaders) = self.leaders {
            config.leader_count = Some(leaders);
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(representation) = self.representation {
            config.representation = Some(representation.into());
        }
        config
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build an index from vectors (one comma-separated vector per line)
    Build {
        /// Input file
        input: PathBuf,
        /// Output directory for the index snapshot
        #[arg(short, long)]
        output: PathBuf,
        #[command(flatten)]
        build: BuildArgs,
    },
    /// Build a text index from documents (one document per line)
    Index {
        /// Input file
        input: PathBuf,
        /// Output directory for the index snapshot
        #[arg(short, long)]
        output: PathBuf,
        /// Term weighting
        #[arg(long, value_enum, default_value = "count")]
        weighting: WeightingArg,
        #[command(flatten)]
        build: BuildArgs,
    },
    /// Search an index. Vector indexes take "1.0,2.0,..."; text indexes take free text.
    Search {
        /// Index directory
        #[arg(short, long)]
        index: PathBuf,
        /// Query
        query: String,
        /// Number of results to return
        #[arg(short, long)]
        k: Option<usize>,
        /// Number of clusters to search
        #[arg(short, long)]
        probes: Option<usize>,
    },
    /// Print index statistics
    Stats {
        /// Index directory
        #[arg(short, long)]
        index: PathBuf,
    },
    /// Start the HTTP API server
    Serve {
        /// Index directory to serve; starts empty when omitted
        #[arg(short, long)]
        index: Option<PathBuf>,
        /// Address to bind to
        #[arg(long, default_value = "0.0.0.0:3000")]
        addr: String,
    },
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

fn load_index(dir: &Path) -> Result<StoredIndex> {
    let snapshots = SnapshotManager::new(dir)?;
    match snapshots.load()? {
        Some(stored) => Ok(stored),
        None => bail!("no index found in {}", dir.display()),
    }
}

fn save_index(dir: &Path, stored: &StoredIndex) -> Result<()> {
    let manifest = SnapshotManager::new(dir)?.save(stored)?;
    println!(
        "Indexed {} vectors into {} clusters ({}-dimensional, {}) at {}",
        manifest.vector_count,
        manifest.leader_count,
        manifest.dimension,
        manifest.representation,
        dir.display()
    );
    Ok(())
}

async fn run(command: Commands, config: IndexConfig) -> Result<()> {
    match command {
        Commands::Build {
            input,
            output,
            build: args,
        } => {
            let vectors = read_lines(&input)?
                .iter()
                .enumerate()
                .map(|(line, s)| {
                    s.parse::<Vector>()
                        .with_context(|| format!("line {} of {}", line + 1, input.display()))
                })
                .collect::<Result<Vec<_>>>()?;
            let index = build(vectors, &args.apply(config.build))?;
            save_index(&output, &StoredIndex::from(index))?;
        }
        Commands::Index {
            input,
            output,
            weighting,
            build: args,
        } => {
            let documents = read_lines(&input)?;
            let text = TextIndex::fit(documents, weighting.into(), &args.apply(config.build))?;
            save_index(&output, &StoredIndex::from(text))?;
        }
        Commands::Search {
            index,
            query,
            k,
            probes,
        } => {
            let stored = load_index(&index)?;
            let k = k.unwrap_or(config.search.k);
            let probes = probes.unwrap_or(config.search.probe_count);

            match stored.text() {
                Some(text) => {
                    let hits = text.search(&query, k, probes)?;
                    println!("Top {} results:", hits.len());
                    for (i, hit) in hits.iter().enumerate() {
                        println!("{}. [{}] (score: {:.4}) {}", i + 1, hit.id, hit.score, hit.document);
                    }
                }
                None => {
                    let q: Vector = query.parse()?;
                    let result = stored.search(&q, k, probes)?;
                    println!(
                        "Top {} results ({} candidates scored):",
                        result.len(),
                        result.candidates()
                    );
                    for (i, hit) in result.iter().enumerate() {
                        println!("{}. {} (score: {:.4})", i + 1, hit.id, hit.score);
                    }
                }
            }
        }
        Commands::Stats { index } => {
            let stored = load_index(&index)?;
            let cluster_index = stored.cluster_index();
            let stats = cluster_index.stats();
            println!("Kind:           {}", stored.kind());
            println!("Vectors:        {}", stats.vectors);
            println!("Dimension:      {}", cluster_index.dimension());
            println!("Representation: {}", cluster_index.space().representation());
            println!("Clusters:       {}", stats.clusters);
            println!(
                "Cluster size:   min {} / mean {:.1} / max {}",
                stats.min_size, stats.mean_size, stats.max_size
            );
            if let Some(text) = stored.text() {
                println!("Vocabulary:     {}", text.vectorizer().vocabulary_len());
            }
        }
        Commands::Serve { index, addr } => {
            let initial = match index {
                Some(dir) => load_index(&dir)?,
                None => StoredIndex::default(),
            };
            tnt_search::server::start(&addr, initial, config).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let config = match &cli.config {
        Some(path) => IndexConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => IndexConfig::default(),
    };

    run(cli.command, config).await
}
