use crate::core::config::INDEX_SHARD_BYTES_TARGET;

/// Scatters a token key across `shard_count` buckets. A multiplicative hash
/// (Knuth's constant) spreads adjacent bigram keys — which cluster because
/// of how `token_key` packs two UTF-16 units — across shards evenly.
pub fn shard_for_key(token_key: u32, shard_count: usize) -> usize {
    if shard_count <= 1 {
        return 0;
    }
    let h = token_key.wrapping_mul(2_654_435_761);
    (h as usize) % shard_count
}

/// Auto-derives the index shard count from total postings bytes: target
/// ~1 MiB of postings per shard, rounded up to a power of two, floor 1
/// (SPEC_FULL §3 "bytes-1mib-pow2" policy). Returns the `(count, mode)` pair
/// recorded in `manifest.json`'s `stats.indexShardMode`.
pub fn auto_shard_count(total_postings_bytes: usize) -> (usize, &'static str) {
    let target = (total_postings_bytes / INDEX_SHARD_BYTES_TARGET).max(1);
    (target.next_power_of_two(), "bytes-1mib-pow2")
}
