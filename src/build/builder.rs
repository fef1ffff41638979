use std::collections::HashMap;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::build::cover::CoverDeduper;
use crate::build::shard::{auto_shard_count, shard_for_key};
use crate::build::tagging::{assign_tags, doc_tag_mask};
use crate::compression::varint::encode_doc_ids;
use crate::core::config::{BuilderConfig, DEFAULT_SEP_CODE};
use crate::core::error::Result;
use crate::core::types::SourceRow;
use crate::format::dict::{write_dict, DictEntry};
use crate::format::hash::sha256_hex;
use crate::format::manifest::{AssetEntry, Manifest, ManifestAssets, ManifestStats, MANIFEST_VERSION};
use crate::format::meta::{write_meta_shard, MetaShardInput};
use crate::format::tags::TagTable;
use crate::text::normalize::{ngram_token_keys, normalize};

/// One fully-built artifact, keyed by the relative path it is written under
/// (§6). The caller is responsible for persisting these and the returned
/// `Manifest` to disk.
pub struct BuiltArtifacts {
    pub tags: Vec<u8>,
    pub dict: Vec<u8>,
    pub meta_shards: Vec<Vec<u8>>,
    pub index_shards: Vec<Vec<u8>>,
    pub manifest: Manifest,
}

/// Joins a field's repeated values with the shard separator code point
/// (§6 `sepCode`).
fn join_with_sep(values: &[String]) -> String {
    let sep = char::from_u32(DEFAULT_SEP_CODE as u32).unwrap();
    values.join(&sep.to_string())
}

/// Runs the full index-build pipeline (§4.2) over an already-collected set
/// of source rows and produces every on-disk artifact plus the manifest
/// that describes them. Rows need not arrive pre-sorted; this function
/// performs the canonical ordering itself.
pub fn build_index(mut rows: Vec<SourceRow>, config: &BuilderConfig) -> Result<BuiltArtifacts> {
    info!(rows = rows.len(), "starting index build");

    // Step 1: collect & order by external id, assign dense doc-ids.
    rows.sort_by_key(|r| r.id);
    let count = rows.len();

    // Step 2: tag assignment.
    let tag_assignment = assign_tags(&rows);
    if !tag_assignment.dropped.is_empty() {
        warn!(
            dropped = tag_assignment.dropped.len(),
            tags = ?tag_assignment.dropped,
            "dropped tags beyond the top 50 by document count"
        );
    }

    // Step 3: cover dedup, in doc-id order for determinism.
    let mut cover_deduper = CoverDeduper::new();
    let mut cover_base_ids = Vec::with_capacity(count);
    let mut cover_paths = Vec::with_capacity(count);
    for row in &rows {
        let (base_id, path) = cover_deduper.assign(row.cover.as_deref());
        cover_base_ids.push(base_id);
        cover_paths.push(path);
    }
    let cover_bases = cover_deduper.into_bases();

    let external_ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
    let titles: Vec<String> = rows.iter().map(|r| r.title.clone()).collect();
    let authors_joined: Vec<String> = rows.iter().map(|r| join_with_sep(&r.authors)).collect();
    let aliases_joined: Vec<String> = rows.iter().map(|r| join_with_sep(&r.aliases)).collect();
    let flags: Vec<u8> = rows.iter().map(|r| r.flags).collect();
    let (tag_lo, tag_hi): (Vec<u32>, Vec<u32>) =
        rows.iter().map(|r| doc_tag_mask(&r.tags, &tag_assignment)).unzip();

    // Step 4: n-gram inversion, computed per doc in parallel then folded
    // into posting lists sequentially (doc-id order guarantees sorted
    // postings without an extra sort pass).
    let per_doc_tokens: Vec<Vec<u32>> = rows
        .par_iter()
        .map(|row| {
            let mut keys = ngram_token_keys(&normalize(&row.title));
            for alias in &row.aliases {
                keys.extend(ngram_token_keys(&normalize(alias)));
            }
            for author in &row.authors {
                keys.extend(ngram_token_keys(&normalize(author)));
            }
            let mut v: Vec<u32> = keys.into_iter().collect();
            v.sort_unstable();
            v
        })
        .collect();

    let mut postings: HashMap<u32, Vec<u32>> = HashMap::new();
    for (doc_id, tokens) in per_doc_tokens.iter().enumerate() {
        for &token in tokens {
            postings.entry(token).or_default().push(doc_id as u32);
        }
    }

    // Step 5: encode each posting list, derive the shard count, then bucket
    // encoded bytes by shard.
    let mut sorted_tokens: Vec<u32> = postings.keys().copied().collect();
    sorted_tokens.sort_unstable();

    let encoded: HashMap<u32, Vec<u8>> = sorted_tokens
        .par_iter()
        .map(|&token| (token, encode_doc_ids(&postings[&token])))
        .collect();

    let total_postings_bytes: usize = encoded.values().map(|v| v.len()).sum();
    let (shard_count, shard_mode) = if config.index_shard_count > 0 {
        (config.index_shard_count, "fixed")
    } else {
        auto_shard_count(total_postings_bytes)
    };

    let mut shard_buffers: Vec<Vec<u8>> = vec![Vec::new(); shard_count];
    let mut dict_entries = Vec::with_capacity(sorted_tokens.len());
    for &token in &sorted_tokens {
        let bytes = &encoded[&token];
        let shard_id = shard_for_key(token, shard_count);
        let buf = &mut shard_buffers[shard_id];
        let offset = buf.len() as u32;
        buf.extend_from_slice(bytes);
        dict_entries.push(DictEntry {
            key: token,
            shard_id: shard_id as u8,
            offset,
            length: bytes.len() as u16,
            df: postings[&token].len() as u16,
        });
    }

    info!(
        unique_tokens = dict_entries.len(),
        shard_count,
        shard_mode,
        total_postings_bytes,
        "built posting lists"
    );

    // Step 6: meta sharding.
    let meta_shard_docs = if config.meta_shard_docs == 0 { count.max(1) } else { config.meta_shard_docs };
    let mut meta_shards = Vec::new();
    let mut chunk_start = 0usize;
    while chunk_start < count {
        let chunk_end = (chunk_start + meta_shard_docs).min(count);
        let range = chunk_start..chunk_end;

        // Remap global cover-base ids to a compact per-shard pool so each
        // meta shard stays self-contained (§6 per-shard `baseCnt`).
        let mut local_bases = vec![String::new()];
        let mut global_to_local: HashMap<u32, u32> = HashMap::new();
        let mut local_cover_base_ids = Vec::with_capacity(range.len());
        for &gid in &cover_base_ids[range.clone()] {
            if gid == 0 {
                local_cover_base_ids.push(0);
                continue;
            }
            let local = *global_to_local.entry(gid).or_insert_with(|| {
                local_bases.push(cover_bases[gid as usize].clone());
                (local_bases.len() - 1) as u32
            });
            local_cover_base_ids.push(local);
        }

        let input = MetaShardInput {
            external_ids: &external_ids[range.clone()],
            tag_lo: &tag_lo[range.clone()],
            tag_hi: &tag_hi[range.clone()],
            flags: &flags[range.clone()],
            titles: &titles[range.clone()],
            cover_bases: &local_bases,
            cover_base_ids: &local_cover_base_ids,
            cover_paths: &cover_paths[range.clone()],
            authors_joined: &authors_joined[range.clone()],
            aliases_joined: &aliases_joined[range.clone()],
        };
        meta_shards.push(write_meta_shard(&input)?);
        chunk_start = chunk_end;
    }

    let dict_bytes = write_dict(&dict_entries)?;
    let tags_json = TagTable { version: MANIFEST_VERSION, tags: tag_assignment.table }.to_json()?;
    let tags_bytes = tags_json.into_bytes();

    // Step 7: hash every artifact and assemble the manifest.
    let tags_asset = AssetEntry { path: "tags.json".to_string(), sha256: sha256_hex(&tags_bytes), bytes: tags_bytes.len() as u64 };
    let dict_asset = AssetEntry { path: "dict.bin".to_string(), sha256: sha256_hex(&dict_bytes), bytes: dict_bytes.len() as u64 };
    let meta_assets: Vec<AssetEntry> = meta_shards
        .iter()
        .enumerate()
        .map(|(i, bytes)| AssetEntry {
            path: format!("meta.{i}.bin"),
            sha256: sha256_hex(bytes),
            bytes: bytes.len() as u64,
        })
        .collect();
    let index_assets: Vec<AssetEntry> = shard_buffers
        .iter()
        .enumerate()
        .map(|(i, bytes)| AssetEntry {
            path: format!("index.{i}.bin"),
            sha256: sha256_hex(bytes),
            bytes: bytes.len() as u64,
        })
        .collect();

    let manifest = Manifest {
        version: MANIFEST_VERSION,
        generated_at: config.generated_at.clone().unwrap_or_default(),
        stats: ManifestStats {
            version: MANIFEST_VERSION,
            count,
            unique_tokens: dict_entries.len(),
            index_bytes: total_postings_bytes as u64,
            meta_shard_docs,
            meta_shard_count: meta_shards.len(),
            index_shard_count: shard_count,
            index_shard_mode: shard_mode.to_string(),
        },
        assets: ManifestAssets {
            tags: tags_asset,
            dict: dict_asset,
            meta_shards: meta_assets,
            index_shards: index_assets,
        },
    };

    info!(count, meta_shards = manifest.assets.meta_shards.len(), "index build complete");

    Ok(BuiltArtifacts { tags: tags_bytes, dict: dict_bytes, meta_shards, index_shards: shard_buffers, manifest })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i32, title: &str, tags: &[&str]) -> SourceRow {
        SourceRow {
            id,
            title: title.to_string(),
            aliases: vec![],
            authors: vec!["author one".to_string()],
            cover: Some(format!("https://cdn.example/covers/{id}.jpg")),
            tags: tags.iter().map(|s| s.to_string()).collect(),
            flags: 0,
        }
    }

    #[test]
    fn builds_consistent_artifacts_for_small_corpus() {
        let rows = vec![
            row(2, "凉宫春日的忧郁", &["sci-fi"]),
            row(1, "阿虚的冒险", &["sci-fi", "comedy"]),
        ];
        let config = BuilderConfig::default();
        let built = build_index(rows, &config).unwrap();

        assert_eq!(built.manifest.stats.count, 2);
        assert!(built.manifest.stats.unique_tokens > 0);
        assert_eq!(built.manifest.assets.meta_shards.len(), built.meta_shards.len());
        assert_eq!(built.manifest.assets.index_shards.len(), built.index_shards.len());

        // doc-id 0 is external id 1 (sorted ascending).
        let parsed = crate::format::meta::parse_meta_shard(&built.meta_shards[0]).unwrap();
        assert_eq!(parsed.external_ids[0], 1);
        assert_eq!(parsed.external_ids[1], 2);
    }

    #[test]
    fn empty_corpus_produces_empty_artifacts() {
        let config = BuilderConfig::default();
        let built = build_index(vec![], &config).unwrap();
        assert_eq!(built.manifest.stats.count, 0);
        assert_eq!(built.manifest.stats.unique_tokens, 0);
    }
}
