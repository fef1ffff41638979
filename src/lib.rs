pub mod build;
pub mod compression;
pub mod core;
pub mod engine;
pub mod format;
pub mod loader;
pub mod query;
pub mod text;

/*
┌────────────────────────────────────────────────────────────────────────────┐
│                      COMIC_SEARCH MODULE ARCHITECTURE                      │
└────────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────────────── BUILD ────────────────────────────────┐
│                                                                              │
│  build::builder::build_index(rows, config) -> BuiltArtifacts               │
│    │                                                                        │
│    ├─ build::tagging::assign_tags     tag table + per-doc bitmask          │
│    ├─ build::cover::CoverDeduper      cover image URL pool dedup           │
│    ├─ build::shard::shard_for_key     n-gram token -> index shard          │
│    └─ format::{meta,dict,tags,manifest}  artifact serialization           │
│                                                                              │
│  build::cli::run(Args)  drives the above from a JSON-Lines source file     │
│  bin/build_index.rs     clap entry point                                   │
└──────────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────────────── LOAD ─────────────────────────────────┐
│                                                                              │
│  loader::engine_loader::ArtifactLoader                                     │
│    ├─ fetcher: Arc<dyn loader::fetch::ArtifactFetcher>   HTTP or test stub  │
│    ├─ cache: loader::cache::LocalCache                   content-addressed │
│    └─ inflight: loader::inflight::InflightRegistry<usize>  per-shard        │
│                                                            single-flight    │
│                                                                              │
│  init() loads manifest + tags + dict + all meta shards eagerly;            │
│  index shards load lazily through ensure_shards()/preload_remaining()      │
└──────────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────────────── QUERY ────────────────────────────────┐
│                                                                              │
│  query::plan::plan_query(raw, tags, status, sort, page, size) -> QueryPlan │
│       │                                                                     │
│       ▼                                                                     │
│  query::evaluator::evaluate(plan, dict, loader, manifest, docs)           │
│       coverage-threshold n-gram matching, tag/status filtering,           │
│       AND-intersection across include terms, base score                   │
│       │                                                                     │
│       ▼                                                                     │
│  query::rank::resolve_order + paginate                                    │
│       full-text bonuses, sort mode, descending tie-break, slicing          │
│       │                                                                     │
│       ▼                                                                     │
│  query::result_cache::ResultCache   keyed on QueryPlan::cache_key()        │
└──────────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────────────── ENGINE ───────────────────────────────┐
│                                                                              │
│  engine::search_engine::SearchEngine                                      │
│    command_tx: mpsc::UnboundedSender<EngineCommand>  ── Init / Search      │
│                                                                              │
│  a single spawned task owns EngineState and processes commands serially,   │
│  so query and ranking code above never touches a lock. A generation        │
│  counter implements latest-wins: a stale search's own result is dropped    │
│  once a newer one has started.                                            │
│                                                                              │
│    EngineEvent::{Progress, Ready, Results}  ── returned on a second channel│
└──────────────────────────────────────────────────────────────────────────────┘
*/
