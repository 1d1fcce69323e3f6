//! CLI entry point for Lacuna.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use lacuna_core::{
    app_data_dir, config_path, find_distant_closest, load_config, load_config_from, load_vec_file,
    read_word_list, status, write_results, LoadOptions, OutputFormat,
};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "lacuna")]
#[command(about = "Lacuna: find query words whose closest reference word is still far away")]
struct Cli {
    /// Log at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Show library status.
    Status,
    /// Show where Lacuna stores its config (app data directory).
    DataDir,
    /// Print the effective config as TOML.
    Config,
    /// Rank query words by how far their nearest reference word is.
    Search(SearchArgs),
}

#[derive(clap::Args)]
struct SearchArgs {
    /// Query embeddings (word2vec/fastText text format).
    #[arg(long, value_name = "VEC")]
    query: PathBuf,
    /// Reference embeddings (word2vec/fastText text format).
    #[arg(long, value_name = "VEC")]
    reference: PathBuf,
    /// Only search these query words (one per line).
    #[arg(long, value_name = "TXT")]
    query_words: Option<PathBuf>,
    /// Only match against these reference words (one per line).
    #[arg(long, value_name = "TXT")]
    reference_words: Option<PathBuf>,
    /// Read at most this many rows of the reference file.
    #[arg(long, value_name = "N")]
    reference_limit: Option<usize>,
    /// Number of results to keep.
    #[arg(short = 'k', long, value_name = "K")]
    top_k: Option<usize>,
    /// Reference rows per similarity block.
    #[arg(long, value_name = "C")]
    chunk_size: Option<usize>,
    /// Query rows per similarity block.
    #[arg(long, value_name = "B")]
    query_batch_size: Option<usize>,
    /// Spread query batches over all cores.
    #[arg(long)]
    parallel: bool,
    /// Output format: csv or json.
    #[arg(long, value_name = "FORMAT")]
    format: Option<OutputFormat>,
    /// Write results here instead of stdout.
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,
    /// Use this config file instead of the one in the app data directory.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    match cli.command.unwrap_or(Commands::Status) {
        Commands::Status => {
            println!("Lacuna");
            println!("  core: {}", status());
        }
        Commands::DataDir => match app_data_dir() {
            Some(p) => println!("{}", p.display()),
            None => eprintln!("Could not determine app data directory."),
        },
        Commands::Config => {
            if let Some(p) = config_path() {
                println!("# {}", p.display());
            }
            print!("{}", load_config().to_toml()?);
        }
        Commands::Search(args) => run_search(args)?,
    }
    Ok(())
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn run_search(args: SearchArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => load_config_from(path).with_context(|| format!("loading {}", path.display()))?,
        None => load_config(),
    };
    if args.chunk_size.is_some() {
        config.chunk_size = args.chunk_size;
    }
    if args.query_batch_size.is_some() {
        config.query_batch_size = args.query_batch_size;
    }
    if args.top_k.is_some() {
        config.top_k = args.top_k;
    }
    if args.format.is_some() {
        config.format = args.format;
    }
    if args.parallel {
        config.parallel = Some(true);
    }

    let query_words = args.query_words.as_deref().map(read_word_list).transpose()?;
    let reference_words = args.reference_words.as_deref().map(read_word_list).transpose()?;

    let query = load_vec_file(
        &args.query,
        &LoadOptions {
            words: query_words.as_deref(),
            max_rows: None,
        },
    )?;
    let reference = load_vec_file(
        &args.reference,
        &LoadOptions {
            words: reference_words.as_deref(),
            max_rows: args.reference_limit,
        },
    )?;

    let options = config.search_options(query.len(), query.dim());
    let ranking = find_distant_closest(&query, &reference, &options, config.top_k())?;
    if ranking.is_partial() {
        tracing::info!(
            requested = ranking.requested,
            returned = ranking.len(),
            "fewer query words than requested; returning all"
        );
    }

    let format = config.format();
    match &args.output {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
            write_results(&ranking.records, format, BufWriter::new(file))?;
            tracing::info!(path = %path.display(), results = ranking.len(), "results saved");
        }
        None => write_results(&ranking.records, format, std::io::stdout().lock())?,
    }
    Ok(())
}
