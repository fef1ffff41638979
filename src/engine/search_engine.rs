use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::warn;

use crate::core::config::EngineConfig;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::Doc;
use crate::engine::messages::{EngineCommand, EngineEvent};
use crate::format::dict::Dict;
use crate::format::manifest::Manifest;
use crate::format::meta::materialize_docs;
use crate::format::tags::TagTable;
use crate::loader::engine_loader::ArtifactLoader;
use crate::loader::fetch::ArtifactFetcher;
use crate::query::evaluator::evaluate;
use crate::query::plan::QueryPlan;
use crate::query::rank::{paginate, resolve_order};
use crate::query::result_cache::ResultCache;

/// Artifacts materialized once `init` succeeds. Only the actor loop ever
/// replaces it; in-flight search tasks hold a cloned `Arc` snapshot, so no
/// lock is needed for reads (§5).
struct EngineState {
    manifest: Manifest,
    dict: Dict,
    docs: Vec<Doc>,
    /// Retained for callers that render a tag picker; the evaluator itself
    /// only needs `dict`/`docs` plus the bitmasks already baked into a plan.
    #[allow(dead_code)]
    tags: TagTable,
}

/// The single long-lived engine object (§9 "global state": `init`
/// constructs it, all subsequent operations borrow it). Internally a
/// `tokio` task with a single-consumer inbox implements the cooperative,
/// single-threaded scheduling model of §5.
pub struct SearchEngine {
    command_tx: mpsc::UnboundedSender<EngineCommand>,
}

impl SearchEngine {
    /// Spawns the engine's actor task and returns the handle plus its event
    /// stream.
    pub fn new(
        fetcher: Arc<dyn ArtifactFetcher>,
        cache_dir: PathBuf,
        config: EngineConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<EngineEvent>)> {
        let loader = Arc::new(ArtifactLoader::new(fetcher, cache_dir)?);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_actor(loader, config, command_rx, event_tx));
        Ok((SearchEngine { command_tx }, event_rx))
    }

    pub fn init(&self, manifest_path: impl Into<String>) -> Result<()> {
        self.send(EngineCommand::Init { manifest_path: manifest_path.into() })
    }

    pub fn search(&self, plan: QueryPlan, request_id: Option<u64>) -> Result<()> {
        self.send(EngineCommand::Search { plan, request_id })
    }

    fn send(&self, command: EngineCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|_| Error::new(ErrorKind::InvalidState, "engine task has stopped"))
    }
}

/// The cooperative task loop: command intake stays single-threaded (§5), but
/// each `Search` is handed off to its own task so a later `Search` never
/// waits behind an earlier one still evaluating. `generation` is bumped
/// here, synchronously, before the task is spawned — that's what makes
/// latest-wins cancellation real: the moment a second `Search` is dequeued,
/// every still-running older search task observes a stale generation on its
/// next check and abandons its result instead of emitting it (§5, §9).
async fn run_actor(
    loader: Arc<ArtifactLoader>,
    config: EngineConfig,
    mut commands: mpsc::UnboundedReceiver<EngineCommand>,
    events: mpsc::UnboundedSender<EngineEvent>,
) {
    let generation = Arc::new(AtomicU64::new(0));
    let mut state: Option<Arc<EngineState>> = None;
    let result_cache = Arc::new(Mutex::new(ResultCache::new(config.result_cache_capacity)));

    while let Some(command) = commands.recv().await {
        match command {
            EngineCommand::Init { manifest_path } => {
                handle_init(&loader, &manifest_path, &events, &mut state).await;
            }
            EngineCommand::Search { plan, request_id } => {
                let my_generation = generation.fetch_add(1, Ordering::SeqCst) + 1;
                let Some(state) = state.clone() else {
                    let _ = events.send(EngineEvent::Progress {
                        stage: "加载失败: engine not initialized".to_string(),
                    });
                    continue;
                };
                tokio::spawn(run_search(
                    loader.clone(),
                    generation.clone(),
                    my_generation,
                    result_cache.clone(),
                    state,
                    plan,
                    request_id,
                    events.clone(),
                ));
            }
        }
    }
}

async fn handle_init(
    loader: &Arc<ArtifactLoader>,
    manifest_path: &str,
    events: &mpsc::UnboundedSender<EngineEvent>,
    state: &mut Option<Arc<EngineState>>,
) {
    match loader.init(manifest_path).await {
        Ok(loaded) => {
            let docs = materialize_docs(&loaded.meta_shards);
            loader.prune(&loaded.manifest);
            *state = Some(Arc::new(EngineState {
                manifest: loaded.manifest,
                dict: loaded.dict,
                docs,
                tags: loaded.tags,
            }));
            if events.send(EngineEvent::Ready).is_err() {
                warn!("engine event receiver dropped before ready was delivered");
            }
        }
        Err(err) => {
            let _ = events.send(EngineEvent::Progress { stage: format!("加载失败: {err}") });
        }
    }
}

/// Runs one search to completion on its own task. Checks `generation`
/// before committing to the result cache and again before emitting, so a
/// search superseded mid-flight never publishes stale results (§5
/// latest-wins).
#[allow(clippy::too_many_arguments)]
async fn run_search(
    loader: Arc<ArtifactLoader>,
    generation: Arc<AtomicU64>,
    my_generation: u64,
    result_cache: Arc<Mutex<ResultCache>>,
    state: Arc<EngineState>,
    plan: QueryPlan,
    request_id: Option<u64>,
    events: mpsc::UnboundedSender<EngineEvent>,
) {
    let cache_key = plan.cache_key();
    let cached = result_cache.lock().await.get(&cache_key);
    let order = match cached {
        Some(cached) => cached,
        None => {
            let evaluated = match evaluate(&plan, &state.dict, &loader, &state.manifest, &state.docs).await {
                Ok(evaluated) => evaluated,
                Err(err) => {
                    let _ = events.send(EngineEvent::Progress { stage: format!("加载失败: {err}") });
                    return;
                }
            };
            if generation.load(Ordering::SeqCst) != my_generation {
                return; // a newer search started; abandon this one (§5 latest-wins)
            }
            let order = resolve_order(&evaluated, &state.docs, &plan);
            result_cache.lock().await.put(cache_key, order.clone());
            order
        }
    };

    if generation.load(Ordering::SeqCst) != my_generation {
        return;
    }

    let page = paginate(&order, plan.page, plan.size);
    let _ = events.send(EngineEvent::Results {
        request_id,
        doc_ids: page.doc_ids,
        total: page.total,
        has_more: page.has_more,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::plan::{plan_query, SortMode, StatusFilters};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    struct InMemoryFetcher {
        files: StdMutex<HashMap<String, Vec<u8>>>,
    }

    #[async_trait]
    impl ArtifactFetcher for InMemoryFetcher {
        async fn get(&self, path: &str) -> Result<Vec<u8>> {
            self.files
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| Error::new(ErrorKind::NotFound, path.to_string()))
        }
    }

    #[tokio::test]
    async fn search_before_init_reports_progress() {
        let fetcher = Arc::new(InMemoryFetcher { files: StdMutex::new(HashMap::new()) });
        let dir = tempfile::tempdir().unwrap();
        let (engine, mut events) =
            SearchEngine::new(fetcher, dir.path().to_path_buf(), EngineConfig::default()).unwrap();

        let plan = plan_query("凉宫", [], [], StatusFilters::default(), SortMode::Relevance, 1, 20);
        engine.search(plan, Some(1)).unwrap();

        let event = events.recv().await.unwrap();
        match event {
            EngineEvent::Progress { stage } => assert!(stage.contains("not initialized")),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    fn row(id: i32, title: &str) -> crate::core::types::SourceRow {
        crate::core::types::SourceRow {
            id,
            title: title.to_string(),
            aliases: vec![],
            authors: vec![],
            cover: None,
            tags: vec![],
            flags: 0,
        }
    }

    fn build_corpus_files(rows: Vec<crate::core::types::SourceRow>) -> HashMap<String, Vec<u8>> {
        use crate::build::builder::build_index;
        use crate::core::config::BuilderConfig;

        let built = build_index(rows, &BuilderConfig::default()).unwrap();
        let manifest = built.manifest.clone();
        let mut files = HashMap::new();
        files.insert("manifest.json".to_string(), manifest.to_json().unwrap().into_bytes());
        files.insert(manifest.assets.tags.path.clone(), built.tags.clone());
        files.insert(manifest.assets.dict.path.clone(), built.dict.clone());
        for (asset, bytes) in manifest.assets.meta_shards.iter().zip(&built.meta_shards) {
            files.insert(asset.path.clone(), bytes.clone());
        }
        for (asset, bytes) in manifest.assets.index_shards.iter().zip(&built.index_shards) {
            files.insert(asset.path.clone(), bytes.clone());
        }
        files
    }

    /// A second `Search` dequeued while an earlier one is still evaluating
    /// must supersede it: only the later search's results are ever emitted
    /// (§5 latest-wins).
    #[tokio::test]
    async fn a_later_search_supersedes_an_in_flight_earlier_one() {
        let files = build_corpus_files(vec![row(1, "凉宫春日"), row(2, "海贼王")]);
        let fetcher = Arc::new(InMemoryFetcher { files: StdMutex::new(files) });
        let dir = tempfile::tempdir().unwrap();
        let (engine, mut events) =
            SearchEngine::new(fetcher, dir.path().to_path_buf(), EngineConfig::default()).unwrap();

        engine.init("manifest.json").unwrap();
        assert!(matches!(events.recv().await.unwrap(), EngineEvent::Ready));

        let first = plan_query("凉宫", [], [], StatusFilters::default(), SortMode::Relevance, 1, 20);
        let second = plan_query("海贼", [], [], StatusFilters::default(), SortMode::Relevance, 1, 20);
        engine.search(first, Some(1)).unwrap();
        engine.search(second, Some(2)).unwrap();

        let event = events.recv().await.unwrap();
        match event {
            EngineEvent::Results { request_id, doc_ids, .. } => {
                assert_eq!(request_id, Some(2));
                assert_eq!(doc_ids, vec![1]);
            }
            other => panic!("unexpected event: {other:?}"),
        }

        // The superseded first search never gets a turn to emit anything else.
        assert!(events.try_recv().is_err());
    }
}
