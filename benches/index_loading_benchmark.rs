use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tokio::runtime::Runtime;

use comic_search::build::builder::build_index;
use comic_search::core::config::BuilderConfig;
use comic_search::core::error::Result;
use comic_search::core::types::SourceRow;
use comic_search::format::meta::materialize_docs;
use comic_search::loader::engine_loader::ArtifactLoader;
use comic_search::loader::fetch::ArtifactFetcher;
use comic_search::query::evaluator::evaluate;
use comic_search::query::plan::{plan_query, SortMode, StatusFilters};

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
            .ok_or_else(|| comic_search::core::error::Error::new(
                comic_search::core::error::ErrorKind::NotFound,
                path.to_string(),
            ))
    }
}

fn make_fetcher(doc_count: i32) -> (Arc<InMemoryFetcher>, comic_search::format::manifest::Manifest) {
    let rows: Vec<SourceRow> = (1..=doc_count)
        .map(|id| SourceRow {
            id,
            title: format!("航海王 第{id}卷 海贼冒险"),
            aliases: vec![format!("one piece {id}")],
            authors: vec!["尾田荣一郎".to_string()],
            cover: Some(format!("https://cdn.example/covers/{id}.jpg")),
            tags: vec!["冒险".to_string(), if id % 2 == 0 { "热血" } else { "搞笑" }.to_string()],
            flags: 0,
        })
        .collect();

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

    (Arc::new(InMemoryFetcher { files: StdMutex::new(files) }), manifest)
}

fn bench_artifact_init(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("artifact_init");

    for &count in &[200i32, 2000] {
        group.bench_with_input(BenchmarkId::new("init", count), &count, |b, &count| {
            b.iter_batched(
                || (make_fetcher(count), tempfile::tempdir().unwrap()),
                |((fetcher, _manifest), dir)| {
                    rt.block_on(async {
                        let loader = ArtifactLoader::new(fetcher, dir.path().to_path_buf()).unwrap();
                        black_box(loader.init("manifest.json").await.unwrap());
                    });
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_full_query(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let (fetcher, manifest) = make_fetcher(2000);
    let dir = tempfile::tempdir().unwrap();
    let loader = ArtifactLoader::new(fetcher, dir.path().to_path_buf()).unwrap();
    let loaded = rt.block_on(loader.init("manifest.json")).unwrap();
    let docs = materialize_docs(&loaded.meta_shards);

    c.bench_function("evaluate_query", |b| {
        b.iter(|| {
            rt.block_on(async {
                let plan = plan_query("航海王", [], [], StatusFilters::default(), SortMode::Relevance, 1, 20);
                let result = evaluate(&plan, &loaded.dict, &loader, &manifest, &docs).await.unwrap();
                black_box(result);
            });
        });
    });
}

criterion_group!(benches, bench_artifact_init, bench_full_query);
criterion_main!(benches);
