use crate::core::types::Doc;
use crate::query::evaluator::EvaluatedDoc;
use crate::query::plan::{QueryPlan, SortMode};
use crate::text::normalize::normalize;

const TITLE_BONUS: f64 = 1.4;
const ALIAS_BONUS: f64 = 0.6;
const AUTHOR_BONUS: f64 = 0.4;

/// Full-text substring bonus for one include term against one doc (§4.6).
fn full_text_bonus(term: &str, doc: &Doc) -> f64 {
    let mut bonus = 0.0;
    if normalize(&doc.title).contains(term) {
        bonus += TITLE_BONUS;
    }
    if normalize(&doc.aliases.join(" ")).contains(term) {
        bonus += ALIAS_BONUS;
    }
    if normalize(&doc.authors.join(" ")).contains(term) {
        bonus += AUTHOR_BONUS;
    }
    bonus
}

fn score_doc(plan: &QueryPlan, evaluated: &EvaluatedDoc, doc: &Doc) -> f64 {
    let mut score = evaluated.base_score;
    for term in &plan.include_terms {
        score += full_text_bonus(term, doc);
    }
    score
}

/// Resolves the full (unpaginated) doc-id sequence for a set of evaluated
/// candidates, in the order `plan.sort` specifies (§4.6). Scoring is elided
/// entirely for `id_asc`/`id_desc` with include terms present.
pub fn resolve_order(evaluated: &[EvaluatedDoc], docs: &[Doc], plan: &QueryPlan) -> Vec<u32> {
    match plan.sort {
        SortMode::IdAsc => {
            let mut ids: Vec<u32> = evaluated.iter().map(|e| e.doc_id).collect();
            ids.sort_unstable();
            ids
        }
        SortMode::IdDesc => {
            let mut ids: Vec<u32> = evaluated.iter().map(|e| e.doc_id).collect();
            ids.sort_unstable_by(|a, b| b.cmp(a));
            ids
        }
        SortMode::Relevance => {
            let mut scored: Vec<(u32, f64, i32)> = evaluated
                .iter()
                .map(|e| {
                    let doc = &docs[e.doc_id as usize];
                    (e.doc_id, score_doc(plan, e, doc), doc.external_id)
                })
                .collect();
            scored.sort_by(|a, b| {
                b.1.partial_cmp(&a.1)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| b.2.cmp(&a.2))
            });
            scored.into_iter().map(|(id, _, _)| id).collect()
        }
    }
}

/// One page of a resolved doc-id sequence (§4.6 pagination).
pub struct Page {
    pub doc_ids: Vec<u32>,
    pub total: usize,
    pub has_more: bool,
}

/// Slices `order` into page `page` (1-based) of `size` entries.
pub fn paginate(order: &[u32], page: usize, size: usize) -> Page {
    let total = order.len();
    let start = page.saturating_sub(1).saturating_mul(size);
    if start >= total {
        return Page { doc_ids: Vec::new(), total, has_more: false };
    }
    let end = (start + size).min(total);
    Page { doc_ids: order[start..end].to_vec(), total, has_more: end < total }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::DocId;

    fn doc(id: u32, external_id: i32, title: &str) -> Doc {
        Doc {
            doc_id: DocId(id),
            external_id,
            title: title.to_string(),
            aliases: vec![],
            authors: vec![],
            cover: None,
            tag_lo: 0,
            tag_hi: 0,
            flags: 0,
        }
    }

    #[test]
    fn title_match_outscores_no_bonus() {
        let docs = vec![doc(0, 1, "凉宫春日")];
        assert!(full_text_bonus("凉宫", &docs[0]) >= TITLE_BONUS);
        assert_eq!(full_text_bonus("不存在", &docs[0]), 0.0);
    }

    #[test]
    fn pagination_consistency_holds() {
        let order: Vec<u32> = (0..25).collect();
        let mut reassembled = Vec::new();
        for page in 1..=3 {
            let p = paginate(&order, page, 10);
            reassembled.extend(p.doc_ids);
        }
        assert_eq!(reassembled, order);
    }

    #[test]
    fn has_more_is_false_on_last_page() {
        let order: Vec<u32> = (0..5).collect();
        let page = paginate(&order, 1, 10);
        assert!(!page.has_more);
        assert_eq!(page.total, 5);
    }

    #[test]
    fn relevance_ties_break_on_external_id_descending() {
        let docs = vec![doc(0, 10, "x"), doc(1, 20, "x")];
        let plan = crate::query::plan::plan_query(
            "x",
            [],
            [],
            crate::query::plan::StatusFilters::default(),
            SortMode::Relevance,
            1,
            10,
        );
        let evaluated = vec![
            EvaluatedDoc { doc_id: 0, base_score: 1.0 },
            EvaluatedDoc { doc_id: 1, base_score: 1.0 },
        ];
        let order = resolve_order(&evaluated, &docs, &plan);
        assert_eq!(order, vec![1, 0]);
    }
}
