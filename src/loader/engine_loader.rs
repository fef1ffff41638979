use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tracing::info;

use crate::core::error::{Error, ErrorKind, Result};
use crate::format::dict::{parse_dict, Dict};
use crate::format::manifest::Manifest;
use crate::format::meta::{parse_meta_shard, MetaShard};
use crate::format::tags::TagTable;
use crate::loader::cache::LocalCache;
use crate::loader::fetch::ArtifactFetcher;
use crate::loader::inflight::{InflightRegistry, Slot};

/// Everything the query layer needs once `init` completes (§4.3).
pub struct LoadedArtifacts {
    pub manifest: Manifest,
    pub tags: TagTable,
    pub dict: Dict,
    pub meta_shards: Vec<MetaShard>,
}

/// Fetches, verifies, and lazily pages artifacts (C3). Index shards are
/// loaded on demand through `ensure_shards`; tags/dict/meta are eager in
/// `init` since they are indispensable for filtering and rendering (§4.3).
pub struct ArtifactLoader {
    fetcher: Arc<dyn ArtifactFetcher>,
    cache: LocalCache,
    index_shards: Mutex<HashMap<usize, Arc<Vec<u8>>>>,
    inflight: InflightRegistry<usize>,
}

impl ArtifactLoader {
    pub fn new(fetcher: Arc<dyn ArtifactFetcher>, cache_dir: PathBuf) -> Result<Self> {
        Ok(ArtifactLoader {
            fetcher,
            cache: LocalCache::new(cache_dir)?,
            index_shards: Mutex::new(HashMap::new()),
            inflight: InflightRegistry::new(),
        })
    }

    /// Fetches one artifact by its manifest entry, consulting the local
    /// cache first and writing through on a miss (§4.3 fetch rule).
    async fn fetch_artifact(&self, path: &str, sha256: &str) -> Result<Vec<u8>> {
        if let Some(bytes) = self.cache.get(sha256) {
            return Ok(bytes);
        }
        let bytes = self.fetcher.get(path).await?;
        self.cache.put(sha256, &bytes);
        Ok(bytes)
    }

    /// Loads the manifest, then tags, dict, and every meta shard (§4.3).
    /// The manifest itself has no known hash ahead of time, so it is always
    /// fetched directly rather than through the content-addressed cache.
    pub async fn init(&self, manifest_path: &str) -> Result<LoadedArtifacts> {
        info!(manifest_path, "fetching manifest");
        let manifest_bytes = self.fetcher.get(manifest_path).await?;
        let manifest_str = std::str::from_utf8(&manifest_bytes)
            .map_err(|_| Error::new(ErrorKind::Parse, "manifest is not valid utf-8"))?;
        let manifest = Manifest::from_json(manifest_str)?;

        let (tags_bytes, dict_bytes) = tokio::try_join!(
            self.fetch_artifact(&manifest.assets.tags.path, &manifest.assets.tags.sha256),
            self.fetch_artifact(&manifest.assets.dict.path, &manifest.assets.dict.sha256),
        )?;
        let tags_str = std::str::from_utf8(&tags_bytes)
            .map_err(|_| Error::new(ErrorKind::Parse, "tags.json is not valid utf-8"))?;
        let tags = TagTable::from_json(tags_str)?;
        let dict = parse_dict(&dict_bytes)?;

        let mut meta_shards = Vec::with_capacity(manifest.assets.meta_shards.len());
        for asset in &manifest.assets.meta_shards {
            let bytes = self.fetch_artifact(&asset.path, &asset.sha256).await?;
            meta_shards.push(parse_meta_shard(&bytes)?);
        }

        info!(
            docs = manifest.stats.count,
            meta_shards = meta_shards.len(),
            unique_tokens = manifest.stats.unique_tokens,
            "artifact init complete"
        );

        Ok(LoadedArtifacts { manifest, tags, dict, meta_shards })
    }

    pub fn shard(&self, shard_id: usize) -> Option<Arc<Vec<u8>>> {
        self.index_shards.lock().get(&shard_id).cloned()
    }

    /// Blocks until every shard in `shard_ids` has been paged in, sharing
    /// one pending load per shard across concurrent callers (§4.3
    /// "ensureIndexForTokens", §9 single-flight).
    pub async fn ensure_shards(&self, manifest: &Manifest, shard_ids: &HashSet<usize>) -> Result<()> {
        for &shard_id in shard_ids {
            if self.shard(shard_id).is_some() {
                continue;
            }
            match self.inflight.acquire(shard_id) {
                Slot::Leader => {
                    let asset = &manifest.assets.index_shards[shard_id];
                    let result = self.fetch_artifact(&asset.path, &asset.sha256).await;
                    if let Ok(bytes) = &result {
                        self.index_shards.lock().insert(shard_id, Arc::new(bytes.clone()));
                    }
                    self.inflight.finish(&shard_id);
                    result?;
                }
                Slot::Follower(notify) => {
                    notify.notified().await;
                    if self.shard(shard_id).is_none() {
                        return Err(Error::new(
                            ErrorKind::Internal,
                            format!("shard {shard_id} load failed upstream"),
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Opportunistically preloads every remaining index shard at bounded
    /// concurrency (§4.3, §5 resource budget). Callers suppress this
    /// entirely when the connection is flagged slow or data-saver.
    pub async fn preload_remaining(&self, manifest: &Manifest, concurrency: usize) {
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        for shard_id in 0..manifest.stats.index_shard_count {
            if self.shard(shard_id).is_some() {
                continue;
            }
            let wanted: HashSet<usize> = [shard_id].into_iter().collect();
            // Single-threaded-engine callers invoke this from the same task
            // that owns `self`, so each load is awaited in turn gated by the
            // semaphore rather than spawned as a detached task (`self` is
            // not `'static` from the engine's perspective).
            let _permit = semaphore.clone().acquire_owned().await;
            let _ = self.ensure_shards(manifest, &wanted).await;
        }
    }

    /// Deletes cache entries not referenced by `manifest` (§4.7 pruning).
    pub fn prune(&self, manifest: &Manifest) {
        let keep: HashSet<&str> = manifest.all_hashes().into_iter().collect();
        self.cache.prune(&keep);
    }
}
