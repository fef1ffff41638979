use serde::{Deserialize, Serialize};

/// One entry in `manifest.json`'s `assets` map (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetEntry {
    pub path: String,
    pub sha256: String,
    pub bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestStats {
    pub version: u32,
    pub count: usize,
    #[serde(rename = "uniqueTokens")]
    pub unique_tokens: usize,
    #[serde(rename = "indexBytes")]
    pub index_bytes: u64,
    #[serde(rename = "metaShardDocs")]
    pub meta_shard_docs: usize,
    #[serde(rename = "metaShardCount")]
    pub meta_shard_count: usize,
    #[serde(rename = "indexShardCount")]
    pub index_shard_count: usize,
    #[serde(rename = "indexShardMode")]
    pub index_shard_mode: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestAssets {
    pub tags: AssetEntry,
    pub dict: AssetEntry,
    #[serde(rename = "metaShards")]
    pub meta_shards: Vec<AssetEntry>,
    #[serde(rename = "indexShards")]
    pub index_shards: Vec<AssetEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    #[serde(rename = "generatedAt")]
    pub generated_at: String,
    pub stats: ManifestStats,
    pub assets: ManifestAssets,
}

pub const MANIFEST_VERSION: u32 = 1;

impl Manifest {
    pub fn to_json(&self) -> crate::core::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(s: &str) -> crate::core::error::Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// All (path, sha256) pairs the local cache must keep (§4.7 pruning).
    pub fn all_hashes(&self) -> Vec<&str> {
        let mut v = vec![self.assets.tags.sha256.as_str(), self.assets.dict.sha256.as_str()];
        v.extend(self.assets.meta_shards.iter().map(|a| a.sha256.as_str()));
        v.extend(self.assets.index_shards.iter().map(|a| a.sha256.as_str()));
        v
    }
}
