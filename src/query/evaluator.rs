use std::collections::{HashMap, HashSet};

use crate::compression::varint::decode_doc_ids;
use crate::core::error::Result;
use crate::core::types::{flag_bits, Doc};
use crate::format::dict::{Dict, DictEntry};
use crate::format::manifest::Manifest;
use crate::loader::engine_loader::ArtifactLoader;
use crate::query::plan::{QueryPlan, StatusFilters, TriState};
use crate::text::normalize::ngram_token_keys;

/// A document that survived filtering and AND-matched every include term,
/// carrying the coverage-based partial score the ranker (§4.6) starts from.
#[derive(Debug, Clone, Copy)]
pub struct EvaluatedDoc {
    pub doc_id: u32,
    pub base_score: f64,
}

struct TermTokens {
    k: usize,
    found: Vec<DictEntry>,
}

fn resolve_term(term: &str, dict: &Dict) -> TermTokens {
    let keys = ngram_token_keys(term);
    let k = keys.len();
    let mut found: Vec<DictEntry> =
        keys.iter().filter_map(|&key| dict.find(key).map(|idx| dict.entry(idx))).collect();
    found.sort_by_key(|e| e.df);
    TermTokens { k, found }
}

/// `minHit = min(k, max(1, ceil(k * 0.6)))` (§4.5 coverage threshold).
fn min_hit(k: usize) -> usize {
    let threshold = ((k as f64) * crate::core::config::COVERAGE_THRESHOLD).ceil() as usize;
    threshold.max(1).min(k.max(1))
}

fn is_filter_identity(plan: &QueryPlan) -> bool {
    plan.selected_lo == 0
        && plan.selected_hi == 0
        && plan.excluded_lo == 0
        && plan.excluded_hi == 0
        && plan.status == StatusFilters::default()
}

fn status_passes(bit: TriState, flags: u8, mask: u8) -> bool {
    match bit {
        TriState::Any => true,
        TriState::Only0 => flags & mask == 0,
        TriState::Only1 => flags & mask != 0,
    }
}

fn doc_passes_filters(doc: &Doc, plan: &QueryPlan) -> bool {
    if !doc.has_all_tags(plan.selected_lo, plan.selected_hi) {
        return false;
    }
    if doc.has_any_tag(plan.excluded_lo, plan.excluded_hi) {
        return false;
    }
    status_passes(plan.status.hidden, doc.flags, flag_bits::HIDDEN)
        && status_passes(plan.status.chapter_hidden, doc.flags, flag_bits::CHAPTER_HIDDEN)
        && status_passes(plan.status.need_login, doc.flags, flag_bits::NEED_LOGIN)
        && status_passes(plan.status.locked, doc.flags, flag_bits::LOCKED)
}

/// Decodes every posting list for `term`'s found tokens, in df-ascending
/// order, and returns the per-doc hit count (§4.5 step 4).
fn collect_hits(
    term: &TermTokens,
    loader: &ArtifactLoader,
    excluded: &HashSet<u32>,
    docs: &[Doc],
    plan: &QueryPlan,
) -> Result<HashMap<u32, u16>> {
    let mut hits: HashMap<u32, u16> = HashMap::new();
    for entry in &term.found {
        let shard = loader
            .shard(entry.shard_id as usize)
            .expect("caller must ensure_shards before collect_hits");
        let start = entry.offset as usize;
        let end = start + entry.length as usize;
        let doc_ids = decode_doc_ids(&shard[start..end])?;
        for doc_id in doc_ids {
            if excluded.contains(&doc_id) {
                continue;
            }
            let Some(doc) = docs.get(doc_id as usize) else { continue };
            if !doc_passes_filters(doc, plan) {
                continue;
            }
            *hits.entry(doc_id).or_insert(0) += 1;
        }
    }
    Ok(hits)
}

/// Every `shardId` referenced by `entries`, used to call `ensure_shards`
/// before any posting list is decoded.
fn shards_for(entries: &[Vec<DictEntry>]) -> HashSet<usize> {
    entries.iter().flatten().map(|e| e.shard_id as usize).collect()
}

/// Runs the full candidate/score pipeline (§4.5) and returns every matching
/// doc with its coverage-based base score. `docs` is the full, materialized
/// doc table indexed by doc-id.
pub async fn evaluate(
    plan: &QueryPlan,
    dict: &Dict,
    loader: &ArtifactLoader,
    manifest: &Manifest,
    docs: &[Doc],
) -> Result<Vec<EvaluatedDoc>> {
    let include_terms: Vec<TermTokens> = plan.include_terms.iter().map(|t| resolve_term(t, dict)).collect();
    let exclude_terms: Vec<TermTokens> = plan.exclude_terms.iter().map(|t| resolve_term(t, dict)).collect();

    let include_entries: Vec<Vec<DictEntry>> = include_terms.iter().map(|t| t.found.clone()).collect();
    let exclude_entries: Vec<Vec<DictEntry>> = exclude_terms.iter().map(|t| t.found.clone()).collect();
    let needed_shards: HashSet<usize> =
        shards_for(&include_entries).into_iter().chain(shards_for(&exclude_entries)).collect();
    loader.ensure_shards(manifest, &needed_shards).await?;

    // Exclude mask: union of docs matching any exclude term at its own
    // coverage threshold (§4.5 "exclude mask").
    let mut excluded: HashSet<u32> = HashSet::new();
    for term in &exclude_terms {
        if term.found.is_empty() {
            continue;
        }
        let hits = collect_hits(term, loader, &HashSet::new(), docs, plan)?;
        let threshold = min_hit(term.k);
        excluded.extend(hits.into_iter().filter(|&(_, count)| count as usize >= threshold).map(|(id, _)| id));
    }

    if include_terms.is_empty() {
        if is_filter_identity(plan) {
            return Ok(Vec::new());
        }
        return Ok(docs
            .iter()
            .filter(|d| !excluded.contains(&d.doc_id.value()) && doc_passes_filters(d, plan))
            .map(|d| EvaluatedDoc { doc_id: d.doc_id.value(), base_score: 0.0 })
            .collect());
    }

    let mut running: Option<HashMap<u32, f64>> = None;
    for term in &include_terms {
        if term.found.is_empty() {
            // No token of this term exists in the corpus at all: it can
            // never contribute a match, so the AND-intersection is empty.
            return Ok(Vec::new());
        }
        let hits = collect_hits(term, loader, &excluded, docs, plan)?;
        let threshold = min_hit(term.k);
        let k = term.k.max(1) as f64;

        let mut matched: HashMap<u32, f64> = HashMap::new();
        for (doc_id, count) in hits {
            if count as usize >= threshold {
                matched.insert(doc_id, count as f64 / k);
            }
        }

        running = Some(match running {
            None => matched,
            Some(prev) => prev
                .into_iter()
                .filter_map(|(doc_id, score)| matched.get(&doc_id).map(|add| (doc_id, score + add)))
                .collect(),
        });
    }

    let final_scores = running.unwrap_or_default();
    Ok(final_scores.into_iter().map(|(doc_id, base_score)| EvaluatedDoc { doc_id, base_score }).collect())
}
