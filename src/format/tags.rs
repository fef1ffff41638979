use serde::{Deserialize, Serialize};

use crate::core::types::{Tag, MAX_TAG_SLOTS};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagTable {
    pub version: u32,
    pub tags: Vec<Tag>,
}

impl Serialize for Tag {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("Tag", 4)?;
        s.serialize_field("tagId", &self.tag_id)?;
        s.serialize_field("name", &self.name)?;
        s.serialize_field("count", &self.count)?;
        s.serialize_field("bit", &self.bit)?;
        s.end()
    }
}

impl<'de> Deserialize<'de> for Tag {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            #[serde(rename = "tagId")]
            tag_id: u16,
            name: String,
            count: u32,
            bit: u8,
        }
        let raw = Raw::deserialize(deserializer)?;
        Ok(Tag { tag_id: raw.tag_id, name: raw.name, count: raw.count, bit: raw.bit })
    }
}

impl TagTable {
    pub fn to_json(&self) -> crate::core::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(s: &str) -> crate::core::error::Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Builds `(selectedLo, selectedHi)`-style masks from a set of bits
    /// (§4.4 bitmask resolution).
    pub fn mask_for_bits(bits: impl IntoIterator<Item = u8>) -> (u32, u32) {
        let mut lo = 0u32;
        let mut hi = 0u32;
        for bit in bits {
            let bit = bit as usize;
            if bit >= MAX_TAG_SLOTS {
                continue;
            }
            if bit < 32 {
                lo |= 1u32 << bit;
            } else {
                hi |= 1u32 << (bit - 32);
            }
        }
        (lo, hi)
    }
}
