use crate::format::tags::TagTable;
use crate::text::normalize::normalize;

const EXCLUDE_PREFIXES: [char; 2] = ['-', '\u{FF0D}'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriState {
    Any,
    Only0,
    Only1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusFilters {
    pub hidden: TriState,
    pub chapter_hidden: TriState,
    pub need_login: TriState,
    pub locked: TriState,
}

impl Default for StatusFilters {
    fn default() -> Self {
        StatusFilters {
            hidden: TriState::Any,
            chapter_hidden: TriState::Any,
            need_login: TriState::Any,
            locked: TriState::Any,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    Relevance,
    IdDesc,
    IdAsc,
}

/// A fully resolved query (§4.4). `page`/`size` drive pagination but are
/// deliberately excluded from `cache_key` — the result cache stores one
/// resolved doc-id sequence per distinct query, and every page of that
/// query slices the same cached vector (§4.6 "pagination reuses the cached
/// vector").
#[derive(Debug, Clone)]
pub struct QueryPlan {
    pub include_terms: Vec<String>,
    pub exclude_terms: Vec<String>,
    pub selected_lo: u32,
    pub selected_hi: u32,
    pub excluded_lo: u32,
    pub excluded_hi: u32,
    pub status: StatusFilters,
    pub sort: SortMode,
    pub page: usize,
    pub size: usize,
}

impl QueryPlan {
    /// Canonical string key for the result cache (§4.4, §4.6).
    pub fn cache_key(&self) -> String {
        format!(
            "{}|{}|{:08x}{:08x}|{:08x}{:08x}|{:?}|{:?}",
            self.include_terms.join(","),
            self.exclude_terms.join(","),
            self.selected_lo,
            self.selected_hi,
            self.excluded_lo,
            self.excluded_hi,
            self.status,
            self.sort,
        )
    }
}

/// Splits a raw query string into normalized, deduplicated include/exclude
/// term lists (§4.4 syntax). Terms shorter than 2 normalized characters are
/// dropped; a term present in both lists is treated as exclude-only.
fn parse_terms(raw_query: &str) -> (Vec<String>, Vec<String>) {
    let mut include = Vec::new();
    let mut exclude = Vec::new();

    for word in raw_query.split_whitespace() {
        let (is_exclude, body) = match word.chars().next() {
            Some(c) if EXCLUDE_PREFIXES.contains(&c) => (true, &word[c.len_utf8()..]),
            _ => (false, word),
        };
        let normalized = normalize(body);
        if normalized.chars().count() < 2 {
            continue;
        }
        if is_exclude {
            exclude.push(normalized);
        } else {
            include.push(normalized);
        }
    }

    exclude.sort();
    exclude.dedup();
    let exclude_set: std::collections::HashSet<&str> = exclude.iter().map(|s| s.as_str()).collect();
    include.retain(|t| !exclude_set.contains(t.as_str()));
    include.sort();
    include.dedup();

    (include, exclude)
}

/// Builds a [`QueryPlan`] from raw UI inputs (§4.4).
pub fn plan_query(
    raw_query: &str,
    selected_tag_bits: impl IntoIterator<Item = u8>,
    excluded_tag_bits: impl IntoIterator<Item = u8>,
    status: StatusFilters,
    sort: SortMode,
    page: usize,
    size: usize,
) -> QueryPlan {
    let (include_terms, exclude_terms) = parse_terms(raw_query);
    let (selected_lo, selected_hi) = TagTable::mask_for_bits(selected_tag_bits);
    let (excluded_lo, excluded_hi) = TagTable::mask_for_bits(excluded_tag_bits);

    QueryPlan {
        include_terms,
        exclude_terms,
        selected_lo,
        selected_hi,
        excluded_lo,
        excluded_hi,
        status,
        sort,
        page: page.max(1),
        size: size.max(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclusion_dominates_on_overlap() {
        let (include, exclude) = parse_terms("凉宫 -凉宫");
        assert!(include.is_empty());
        assert_eq!(exclude, vec![normalize("凉宫")]);
    }

    #[test]
    fn fullwidth_hyphen_marks_exclusion() {
        let (include, exclude) = parse_terms("凉宫 \u{FF0D}春日");
        assert_eq!(include, vec![normalize("凉宫")]);
        assert_eq!(exclude, vec![normalize("春日")]);
    }

    #[test]
    fn short_terms_are_dropped() {
        let (include, _) = parse_terms("a 凉宫");
        assert_eq!(include, vec![normalize("凉宫")]);
    }

    #[test]
    fn cache_key_ignores_pagination() {
        let a = plan_query("凉宫", [], [], StatusFilters::default(), SortMode::Relevance, 1, 20);
        let b = plan_query("凉宫", [], [], StatusFilters::default(), SortMode::Relevance, 2, 20);
        assert_eq!(a.cache_key(), b.cache_key());
    }
}
