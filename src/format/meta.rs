use crate::core::config::{DEFAULT_SEP_CODE, META_MAGIC, SCHEMA_VERSION};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{Doc, DocId};
use crate::format::bytes_io::{read_string_pool, write_string_pool, ByteReader, ByteWriter};

/// Everything the builder needs to emit one `meta.bin` shard (§6). Doc-ids
/// in this shard are implicitly `[base_doc_id, base_doc_id + count)`.
pub struct MetaShardInput<'a> {
    pub external_ids: &'a [i32],
    pub tag_lo: &'a [u32],
    pub tag_hi: &'a [u32],
    pub flags: &'a [u8],
    pub titles: &'a [String],
    pub cover_bases: &'a [String],
    /// One index into `cover_bases` per doc; 0 means "empty" (§3).
    pub cover_base_ids: &'a [u32],
    pub cover_paths: &'a [String],
    /// One joined-by-`sepCode` string per doc.
    pub authors_joined: &'a [String],
    /// One joined-by-`sepCode` string per doc.
    pub aliases_joined: &'a [String],
}

pub fn write_meta_shard(input: &MetaShardInput) -> Result<Vec<u8>> {
    let count = input.external_ids.len();
    let base_cnt = input.cover_bases.len();
    for (name, len) in [
        ("tag_lo", input.tag_lo.len()),
        ("tag_hi", input.tag_hi.len()),
        ("flags", input.flags.len()),
        ("titles", input.titles.len()),
        ("cover_base_ids", input.cover_base_ids.len()),
        ("cover_paths", input.cover_paths.len()),
        ("authors_joined", input.authors_joined.len()),
        ("aliases_joined", input.aliases_joined.len()),
    ] {
        if len != count {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("meta shard column '{name}' has {len} rows, expected {count}"),
            ));
        }
    }

    let mut w = ByteWriter::new();
    w.write_bytes(&META_MAGIC);
    w.write_u16(SCHEMA_VERSION);
    w.write_u16(DEFAULT_SEP_CODE);
    w.write_u32(count as u32);
    w.write_u32(base_cnt as u32);

    for &id in input.external_ids {
        w.write_i32(id);
    }
    w.pad_to_4();

    for &v in input.tag_lo {
        w.write_u32(v);
    }
    for &v in input.tag_hi {
        w.write_u32(v);
    }
    w.pad_to_4();

    for &v in input.flags {
        w.write_u8(v);
    }
    w.pad_to_4();

    write_pool(&mut w, input.titles);

    write_pool(&mut w, input.cover_bases);

    let wide_base_ids = base_cnt > 255;
    for &id in input.cover_base_ids {
        if wide_base_ids {
            w.write_u16(id as u16);
        } else {
            w.write_u8(id as u8);
        }
    }
    w.pad_to_4();

    write_pool(&mut w, input.cover_paths);
    write_pool(&mut w, input.authors_joined);
    write_pool(&mut w, input.aliases_joined);

    Ok(w.into_bytes())
}

fn write_pool(w: &mut ByteWriter, values: &[String]) {
    let (offsets, pool) = write_string_pool(values);
    for o in &offsets {
        w.write_u32(*o);
    }
    w.write_bytes(&pool);
    w.pad_to_4();
}

/// A parsed `meta.bin` shard with owned columns. Chosen over a borrowed
/// zero-copy view (the format's 4-byte alignment would allow one) because a
/// correctness-first owned representation is simpler to get right here and
/// the tens-of-thousands-of-docs corpus this targets keeps it cheap; see
/// DESIGN.md.
#[derive(Debug, Clone)]
pub struct MetaShard {
    pub sep_code: u16,
    pub count: usize,
    pub external_ids: Vec<i32>,
    pub tag_lo: Vec<u32>,
    pub tag_hi: Vec<u32>,
    pub flags: Vec<u8>,
    pub titles: Vec<String>,
    pub cover_bases: Vec<String>,
    pub cover_base_ids: Vec<u32>,
    pub cover_paths: Vec<String>,
    pub authors: Vec<Vec<String>>,
    pub aliases: Vec<Vec<String>>,
}

pub fn parse_meta_shard(data: &[u8]) -> Result<MetaShard> {
    let mut r = ByteReader::new(data);
    let magic = r.read_bytes(4)?;
    if magic != META_MAGIC {
        return Err(Error::new(ErrorKind::Parse, "bad meta.bin magic"));
    }
    let version = r.read_u16()?;
    if version != SCHEMA_VERSION {
        return Err(Error::new(ErrorKind::Parse, format!("unsupported meta.bin version {version}")));
    }
    let sep_code = r.read_u16()?;
    let count = r.read_u32()? as usize;
    let base_cnt = r.read_u32()? as usize;

    let external_ids = r.read_i32_array(count)?;
    r.skip_to_4();

    let tag_lo = r.read_u32_array(count)?;
    let tag_hi = r.read_u32_array(count)?;
    r.skip_to_4();

    let flags = r.read_u8_array(count)?;
    r.skip_to_4();

    let titles = read_pool(&mut r, count)?;
    let cover_bases = read_pool(&mut r, base_cnt)?;

    let cover_base_ids: Vec<u32> = if base_cnt > 255 {
        r.read_u16_array(count)?.into_iter().map(|v| v as u32).collect()
    } else {
        r.read_u8_array(count)?.into_iter().map(|v| v as u32).collect()
    };
    r.skip_to_4();

    let cover_paths = read_pool(&mut r, count)?;
    let authors_joined = read_pool(&mut r, count)?;
    let aliases_joined = read_pool(&mut r, count)?;

    let sep = char::from_u32(sep_code as u32).unwrap_or('\u{1F}');
    let split = |joined: &str| -> Vec<String> {
        if joined.is_empty() {
            Vec::new()
        } else {
            joined.split(sep).map(|s| s.to_string()).collect()
        }
    };

    Ok(MetaShard {
        sep_code,
        count,
        external_ids,
        tag_lo,
        tag_hi,
        flags,
        titles,
        cover_bases,
        cover_base_ids,
        cover_paths,
        authors: authors_joined.iter().map(|s| split(s)).collect(),
        aliases: aliases_joined.iter().map(|s| split(s)).collect(),
    })
}

fn read_pool(r: &mut ByteReader, count: usize) -> Result<Vec<String>> {
    let offsets = r.read_u32_array(count + 1)?;
    let pool_len = *offsets.last().unwrap_or(&0) as usize;
    let pool = r.read_bytes(pool_len)?;
    r.skip_to_4();
    read_string_pool(&offsets, pool)
}

impl MetaShard {
    /// Resolve the cover URL for doc-index `i` within this shard (base +
    /// suffix), reversing the builder's dedup split (§3 round-trip
    /// property).
    pub fn cover_url(&self, i: usize) -> Option<String> {
        let base_id = *self.cover_base_ids.get(i)?;
        if base_id == 0 {
            let path = self.cover_paths.get(i)?;
            return if path.is_empty() { None } else { Some(path.clone()) };
        }
        let base = self.cover_bases.get(base_id as usize)?;
        let path = self.cover_paths.get(i)?;
        Some(format!("{base}{path}"))
    }
}

/// Flattens every meta shard, in shard order, into the full `Doc` table
/// indexed by doc-id. Shards partition doc-id space in contiguous ranges
/// (§3 invariant), so doc-id is simply the running row count.
pub fn materialize_docs(meta_shards: &[MetaShard]) -> Vec<Doc> {
    let mut docs = Vec::new();
    for shard in meta_shards {
        for i in 0..shard.count {
            docs.push(Doc {
                doc_id: DocId(docs.len() as u32),
                external_id: shard.external_ids[i],
                title: shard.titles[i].clone(),
                aliases: shard.aliases[i].clone(),
                authors: shard.authors[i].clone(),
                cover: shard.cover_url(i),
                tag_lo: shard.tag_lo[i],
                tag_hi: shard.tag_hi[i],
                flags: shard.flags[i],
            });
        }
    }
    docs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_a_shard() {
        let input = MetaShardInput {
            external_ids: &[10, 20],
            tag_lo: &[0b101, 0b010],
            tag_hi: &[0, 0],
            flags: &[0, 1],
            titles: &["凉宫春日".to_string(), "阿虚的忧郁".to_string()],
            cover_bases: &["".to_string(), "https://cdn.example/".to_string()],
            cover_base_ids: &[0, 1],
            cover_paths: &["".to_string(), "a.jpg".to_string()],
            authors_joined: &["alice\u{1F}bob".to_string(), "carol".to_string()],
            aliases_joined: &["".to_string(), "alias1".to_string()],
        };
        let bytes = write_meta_shard(&input).unwrap();
        assert_eq!(bytes.len() % 4, 0);
        let parsed = parse_meta_shard(&bytes).unwrap();
        assert_eq!(parsed.count, 2);
        assert_eq!(parsed.external_ids, vec![10, 20]);
        assert_eq!(parsed.titles[0], "凉宫春日");
        assert_eq!(parsed.authors[0], vec!["alice", "bob"]);
        assert_eq!(parsed.authors[1], vec!["carol"]);
        assert_eq!(parsed.cover_url(0), None);
        assert_eq!(parsed.cover_url(1).unwrap(), "https://cdn.example/a.jpg");
    }

    #[test]
    fn materializes_docs_with_running_doc_ids() {
        let input = MetaShardInput {
            external_ids: &[5, 9],
            tag_lo: &[0, 0],
            tag_hi: &[0, 0],
            flags: &[0, 0],
            titles: &["a".to_string(), "b".to_string()],
            cover_bases: &["".to_string()],
            cover_base_ids: &[0, 0],
            cover_paths: &["".to_string(), "".to_string()],
            authors_joined: &["".to_string(), "".to_string()],
            aliases_joined: &["".to_string(), "".to_string()],
        };
        let bytes = write_meta_shard(&input).unwrap();
        let shard = parse_meta_shard(&bytes).unwrap();
        let docs = materialize_docs(&[shard.clone(), shard]);
        assert_eq!(docs.len(), 4);
        assert_eq!(docs[0].doc_id.value(), 0);
        assert_eq!(docs[3].doc_id.value(), 3);
        assert_eq!(docs[2].external_id, 5);
    }
}
