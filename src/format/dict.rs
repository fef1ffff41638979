use crate::core::config::{DICT_MAGIC, NGRAM_N, SCHEMA_VERSION};
use crate::core::error::{Error, ErrorKind, Result};
use crate::format::bytes_io::{ByteReader, ByteWriter};

/// One token's dictionary entry (§6 `dict.bin`).
#[derive(Debug, Clone, Copy)]
pub struct DictEntry {
    pub key: u32,
    pub shard_id: u8,
    pub offset: u32,
    pub length: u16,
    pub df: u16,
}

pub fn write_dict(entries: &[DictEntry]) -> Result<Vec<u8>> {
    for w in entries.windows(2) {
        if w[1].key <= w[0].key {
            return Err(Error::new(ErrorKind::InvalidInput, "dict.keys must be sorted ascending"));
        }
    }

    let mut w = ByteWriter::new();
    w.write_bytes(&DICT_MAGIC);
    w.write_u16(SCHEMA_VERSION);
    w.write_u16(NGRAM_N as u16);
    w.write_u32(entries.len() as u32);
    w.write_u32(0); // reserved

    for e in entries {
        w.write_u32(e.key);
    }
    for e in entries {
        w.write_u8(e.shard_id);
    }
    w.pad_to_4();
    for e in entries {
        w.write_u32(e.offset);
    }
    for e in entries {
        w.write_u16(e.length);
    }
    for e in entries {
        w.write_u16(e.df);
    }
    w.pad_to_4();

    Ok(w.into_bytes())
}

pub struct Dict {
    pub n: u16,
    pub keys: Vec<u32>,
    pub shard_ids: Vec<u8>,
    pub offsets: Vec<u32>,
    pub lengths: Vec<u16>,
    pub dfs: Vec<u16>,
}

pub fn parse_dict(data: &[u8]) -> Result<Dict> {
    let mut r = ByteReader::new(data);
    let magic = r.read_bytes(4)?;
    if magic != DICT_MAGIC {
        return Err(Error::new(ErrorKind::Parse, "bad dict.bin magic"));
    }
    let version = r.read_u16()?;
    if version != SCHEMA_VERSION {
        return Err(Error::new(ErrorKind::Parse, format!("unsupported dict.bin version {version}")));
    }
    let n = r.read_u16()?;
    let count = r.read_u32()? as usize;
    let _reserved = r.read_u32()?;

    let keys = r.read_u32_array(count)?;
    let shard_ids = r.read_u8_array(count)?;
    r.skip_to_4();
    let offsets = r.read_u32_array(count)?;
    let lengths = r.read_u16_array(count)?;
    let dfs = r.read_u16_array(count)?;
    r.skip_to_4();

    Ok(Dict { n, keys, shard_ids, offsets, lengths, dfs })
}

impl Dict {
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Binary search for `token_key`'s dictionary index (§4.5 step 2).
    pub fn find(&self, token_key: u32) -> Option<usize> {
        self.keys.binary_search(&token_key).ok()
    }

    pub fn entry(&self, idx: usize) -> DictEntry {
        DictEntry {
            key: self.keys[idx],
            shard_id: self.shard_ids[idx],
            offset: self.offsets[idx],
            length: self.lengths[idx],
            df: self.dfs[idx],
        }
    }
}
