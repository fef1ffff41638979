use std::collections::HashMap;

use crate::core::types::{SourceRow, Tag, MAX_TAG_SLOTS};

/// Result of tag-table assignment (§4.2 step 2): which tags survive into
/// `tags.json`, and the bit each survivor occupies.
pub struct TagAssignment {
    pub table: Vec<Tag>,
    bit_by_name: HashMap<String, u8>,
    pub dropped: Vec<String>,
}

impl TagAssignment {
    pub fn bit_for(&self, name: &str) -> Option<u8> {
        self.bit_by_name.get(name).copied()
    }
}

/// Assigns stable `tagId`s (alphabetical over the tag name set, so adding or
/// removing a tag only perturbs the ids after it, and repeated builds over
/// an unchanged tag set always agree — §3 "Tag-to-bit assignment") and then
/// bits 0..49 by `(count desc, tagId asc)` as required by §4.2 step 2.
/// Tags beyond the first 50 are dropped with a build warning.
pub fn assign_tags(rows: &[SourceRow]) -> TagAssignment {
    let mut counts: HashMap<String, u32> = HashMap::new();
    for row in rows {
        for tag in &row.tags {
            *counts.entry(tag.clone()).or_insert(0) += 1;
        }
    }

    let mut names: Vec<String> = counts.keys().cloned().collect();
    names.sort();
    let tag_id_by_name: HashMap<String, u16> =
        names.iter().enumerate().map(|(i, n)| (n.clone(), i as u16)).collect();

    let mut ordered: Vec<(String, u16, u32)> = counts
        .into_iter()
        .map(|(name, count)| {
            let tag_id = tag_id_by_name[&name];
            (name, tag_id, count)
        })
        .collect();
    ordered.sort_by(|a, b| b.2.cmp(&a.2).then(a.1.cmp(&b.1)));

    let mut table = Vec::new();
    let mut bit_by_name = HashMap::new();
    let mut dropped = Vec::new();

    for (i, (name, tag_id, count)) in ordered.into_iter().enumerate() {
        if i < MAX_TAG_SLOTS {
            let bit = i as u8;
            bit_by_name.insert(name.clone(), bit);
            table.push(Tag { tag_id, name, count, bit });
        } else {
            dropped.push(name);
        }
    }

    TagAssignment { table, bit_by_name, dropped }
}

/// Builds `(tagLo, tagHi)` for a document from its tag names (§3, §6).
pub fn doc_tag_mask(tags: &[String], assignment: &TagAssignment) -> (u32, u32) {
    let mut lo = 0u32;
    let mut hi = 0u32;
    for name in tags {
        if let Some(bit) = assignment.bit_for(name) {
            if bit < 32 {
                lo |= 1u32 << bit;
            } else {
                hi |= 1u32 << (bit - 32);
            }
        }
    }
    (lo, hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i32, tags: &[&str]) -> SourceRow {
        SourceRow {
            id,
            title: String::new(),
            aliases: vec![],
            authors: vec![],
            cover: None,
            tags: tags.iter().map(|s| s.to_string()).collect(),
            flags: 0,
        }
    }

    #[test]
    fn orders_by_count_then_tag_id() {
        let rows = vec![row(1, &["a", "b"]), row(2, &["a"]), row(3, &["b"]), row(4, &["b"])];
        let assignment = assign_tags(&rows);
        // b: count 3, a: count 2 -> b gets bit 0
        assert_eq!(assignment.bit_for("b"), Some(0));
        assert_eq!(assignment.bit_for("a"), Some(1));
        assert!(assignment.dropped.is_empty());
    }

    #[test]
    fn drops_beyond_fifty_slots() {
        let rows: Vec<SourceRow> = (0..60)
            .map(|i| row(i, &[format!("t{i:02}").leak()]))
            .collect();
        let assignment = assign_tags(&rows);
        assert_eq!(assignment.table.len(), 50);
        assert_eq!(assignment.dropped.len(), 10);
    }

    #[test]
    fn doc_tag_mask_handles_bits_in_the_high_word() {
        // All 60 tags share equal count, so ties break by ascending tag id
        // (alphabetical), giving "t48"/"t49" bits 48/49 — the last two
        // slots, which live in the high word past bit 32.
        let rows: Vec<SourceRow> = (0..60)
            .map(|i| row(i, &[format!("t{i:02}").leak()]))
            .collect();
        let assignment = assign_tags(&rows);
        assert_eq!(assignment.bit_for("t48"), Some(48));
        assert_eq!(assignment.bit_for("t49"), Some(49));

        let (lo, hi) = doc_tag_mask(&["t48".to_string()], &assignment);
        assert_eq!(lo, 0);
        assert_eq!(hi, 1u32 << 16);

        let (lo, hi) = doc_tag_mask(&["t49".to_string()], &assignment);
        assert_eq!(lo, 0);
        assert_eq!(hi, 1u32 << 17);
    }
}
