//! Loading embedding pools from disk.
//!
//! Vectors come from word2vec/fastText text files (`word v1 v2 ... vD`, one per line,
//! optionally preceded by a `count dim` header). Word lists are newline-delimited.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::store::{PoolError, VectorStore};

/// Options for [load_vec_file].
#[derive(Debug, Clone, Default)]
pub struct LoadOptions<'a> {
    /// Keep only these words, in this order. Words without a vector are skipped.
    pub words: Option<&'a [String]>,
    /// Read at most this many rows from the file (before word filtering). fastText files
    /// are frequency-sorted, so this keeps the most frequent words.
    pub max_rows: Option<usize>,
}

/// Reads a newline-delimited word list. Lines are trimmed; blanks and repeats are dropped.
pub fn read_word_list(path: &Path) -> Result<Vec<String>, LoadError> {
    let raw = std::fs::read_to_string(path).map_err(|e| LoadError::Read(path.to_path_buf(), e))?;
    let mut seen = HashSet::new();
    let words: Vec<String> = raw
        .lines()
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .filter(|w| seen.insert(*w))
        .map(str::to_string)
        .collect();
    tracing::debug!(path = %path.display(), words = words.len(), "word list loaded");
    Ok(words)
}

/// Loads a pool from a word2vec/fastText text file.
pub fn load_vec_file(path: &Path, options: &LoadOptions<'_>) -> Result<VectorStore, LoadError> {
    let file = File::open(path).map_err(|e| LoadError::Read(path.to_path_buf(), e))?;
    let reader = BufReader::new(file);

    let wanted: Option<HashSet<&str>> = options
        .words
        .map(|ws| ws.iter().map(String::as_str).collect());
    let mut found: Vec<(String, Vec<f32>)> = Vec::new();
    let mut expected_dim = None;
    let mut rows_read = 0usize;

    for (i, line) in reader.lines().enumerate() {
        let line_no = i + 1;
        let line = line.map_err(|e| LoadError::Read(path.to_path_buf(), e))?;
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        if i == 0 {
            if let Some(dim) = parse_header(line) {
                expected_dim = Some(dim);
                continue;
            }
        }
        if options.max_rows.is_some_and(|max| rows_read >= max) {
            break;
        }
        rows_read += 1;
        let (word, values) = parse_row(line).map_err(|message| LoadError::Parse {
            path: path.to_path_buf(),
            line: line_no,
            message,
        })?;
        if let Some(dim) = expected_dim {
            if values.len() != dim {
                return Err(PoolError::DimensionMismatch {
                    id: word.to_string(),
                    expected: dim,
                    actual: values.len(),
                }
                .into());
            }
        }
        if wanted.as_ref().is_some_and(|w| !w.contains(word)) {
            continue;
        }
        found.push((word.to_string(), values));
    }

    let pairs = match options.words {
        Some(words) => order_by_word_list(found, words)?,
        None => found,
    };
    let store = VectorStore::from_pairs(pairs)?;
    tracing::info!(path = %path.display(), rows = store.len(), dim = store.dim(), "embedding pool loaded");
    Ok(store)
}

/// `count dim` header line, as written by word2vec and fastText.
fn parse_header(line: &str) -> Option<usize> {
    let mut parts = line.split_whitespace();
    let _count: usize = parts.next()?.parse().ok()?;
    let dim: usize = parts.next()?.parse().ok()?;
    parts.next().is_none().then_some(dim)
}

fn parse_row(line: &str) -> Result<(&str, Vec<f32>), String> {
    let mut parts = line.split_whitespace();
    let word = parts.next().ok_or_else(|| "missing word".to_string())?;
    let values = parts
        .map(|p| p.parse::<f32>().map_err(|e| format!("bad component {p:?} for {word:?}: {e}")))
        .collect::<Result<Vec<f32>, String>>()?;
    if values.is_empty() {
        return Err(format!("no vector components for {word:?}"));
    }
    Ok((word, values))
}

/// Rearranges loaded rows into word-list order and reports words that had no vector.
fn order_by_word_list(
    found: Vec<(String, Vec<f32>)>,
    words: &[String],
) -> Result<Vec<(String, Vec<f32>)>, LoadError> {
    let mut by_word: HashMap<String, Vec<f32>> = HashMap::with_capacity(found.len());
    for (word, vector) in found {
        if by_word.contains_key(&word) {
            return Err(PoolError::DuplicateIdentifier(word).into());
        }
        by_word.insert(word, vector);
    }
    let mut pairs = Vec::with_capacity(by_word.len());
    let mut missing = 0usize;
    for word in words {
        match by_word.remove(word) {
            Some(vector) => pairs.push((word.clone(), vector)),
            None => missing += 1,
        }
    }
    if missing > 0 {
        tracing::warn!(missing, requested = words.len(), "words without an embedding were skipped");
    }
    Ok(pairs)
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("read error for {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("{}:{line}: {message}", .path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },
    #[error("invalid pool: {0}")]
    Pool(#[from] PoolError),
}
