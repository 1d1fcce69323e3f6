//! All search logic independent of how it is run (CLI or embedded).
//!
//! Maps each item of a query vocabulary to its nearest item of a reference vocabulary
//! under cosine similarity, then ranks query items by how far even that closest match is.
//! Lacuna stores only its config in its own app data directory (see [app_data]).

pub mod app_data;
pub mod config;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod pool;
pub mod rank;
pub mod search;
pub mod store;

pub use app_data::app_data_dir;
pub use config::{config_path, load_config, load_config_from, save_config, Config, ConfigError, DEFAULT_TOP_K};
pub use normalize::{l2_norm, normalize, ZERO_NORM_EPSILON};
pub use output::{write_csv, write_json, write_results, OutputError, OutputFormat};
pub use pipeline::{find_distant_closest, PipelineError};
pub use pool::{load_vec_file, read_word_list, LoadError, LoadOptions};
pub use rank::{rank, RankError, Ranking};
pub use search::{
    best_matches, chunk_size_for_budget, MatchRecord, SearchError, SearchOptions, DEFAULT_CHUNK_SIZE,
    DEFAULT_QUERY_BATCH_SIZE,
};
pub use store::{PoolError, VectorStore};

/// Returns a short status string. Used to verify the library is wired up.
pub fn status() -> &'static str {
    "lacuna-core ready"
}
