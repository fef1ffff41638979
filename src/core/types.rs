use serde::{Deserialize, Serialize};

/// Dense, zero-based internal ordinal assigned by the builder in publication
/// order (§3). Distinct from the external, user-facing `id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocId(pub u32);

impl DocId {
    pub fn value(self) -> u32 {
        self.0
    }
}

/// Status byte: bit 0 hidden, bit 1 chapter-hidden, bit 2 need-login, bit 3 locked.
pub mod flag_bits {
    pub const HIDDEN: u8 = 1 << 0;
    pub const CHAPTER_HIDDEN: u8 = 1 << 1;
    pub const NEED_LOGIN: u8 = 1 << 2;
    pub const LOCKED: u8 = 1 << 3;
}

/// A row as read from the (out of scope) relational source. The builder's
/// concrete ingestion format is JSON Lines of this shape (SPEC_FULL §6a).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRow {
    pub id: i32,
    pub title: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub flags: u8,
}

/// One tag in the corpus-wide tag table (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub tag_id: u16,
    pub name: String,
    pub count: u32,
    pub bit: u8,
}

/// `tagLo: u32` covers bits 0..31, `tagHi: u32` covers bits 32..63, so 50
/// slots fit with room to spare (32 + 32 = 64 bits of capacity).
pub const MAX_TAG_SLOTS: usize = 50;

/// A fully materialized document as decoded from `meta` shards at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct Doc {
    pub doc_id: DocId,
    pub external_id: i32,
    pub title: String,
    pub aliases: Vec<String>,
    pub authors: Vec<String>,
    pub cover: Option<String>,
    pub tag_lo: u32,
    pub tag_hi: u32,
    pub flags: u8,
}

impl Doc {
    pub fn has_flag(&self, bit: u8) -> bool {
        self.flags & bit != 0
    }

    pub fn has_all_tags(&self, lo: u32, hi: u32) -> bool {
        (self.tag_lo & lo) == lo && (self.tag_hi & hi) == hi
    }

    pub fn has_any_tag(&self, lo: u32, hi: u32) -> bool {
        (self.tag_lo & lo) != 0 || (self.tag_hi & hi) != 0
    }
}
