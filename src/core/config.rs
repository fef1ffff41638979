use std::path::PathBuf;

/// Builder-side configuration (§4.2, §6a CLI surface).
#[derive(Debug, Clone)]
pub struct BuilderConfig {
    pub out_dir: PathBuf,
    pub clean: bool,
    pub generated_at: Option<String>,
    /// 0 disables meta sharding.
    pub meta_shard_docs: usize,
    /// 0 means "auto" — derive from total postings bytes (§3 shard policy).
    pub index_shard_count: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        BuilderConfig {
            out_dir: PathBuf::from("./dist"),
            clean: false,
            generated_at: None,
            meta_shard_docs: 4096,
            index_shard_count: 0,
        }
    }
}

/// Runtime engine configuration (§5 resource budget, §4.3 preload gating).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub cache_dir: PathBuf,
    /// Max shard preload concurrency when the connection is not flagged
    /// slow/data-saver.
    pub preload_concurrency: usize,
    pub result_cache_capacity: usize,
    pub shard_cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            cache_dir: PathBuf::from("./cache"),
            preload_concurrency: 2,
            result_cache_capacity: 32,
            shard_cache_capacity: 256,
        }
    }
}

/// Coverage threshold for per-term n-gram matching (§4.5) — 60%.
pub const COVERAGE_THRESHOLD: f64 = 0.6;

/// N-gram width (§3) — fixed at 2 (bigrams).
pub const NGRAM_N: usize = 2;

pub const DEFAULT_META_SHARD_DOCS: usize = 4096;

/// Target bytes of postings per index shard before the count is rounded up
/// to the next power of two (§3 "bytes-1mib-pow2" shard policy).
pub const INDEX_SHARD_BYTES_TARGET: usize = 1024 * 1024;

pub const META_MAGIC: [u8; 4] = *b"ZMHm";
pub const DICT_MAGIC: [u8; 4] = *b"ZMHd";
pub const SCHEMA_VERSION: u16 = 1;
pub const DEFAULT_SEP_CODE: u16 = 0x001F;
