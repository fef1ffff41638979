use crate::core::error::{Error, ErrorKind, Result};

/// Appends little-endian primitives to a growable buffer, padding each
/// section to a 4-byte boundary as it goes (§6: "each section followed by
/// 4-byte zero padding" — interpreted as pad-to-alignment, the only reading
/// consistent with the format's own "every written shard is readable with
/// zero-copy typed-array views when 4-byte-aligned" invariant).
#[derive(Default)]
pub struct ByteWriter {
    pub buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        ByteWriter { buf: Vec::new() }
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_bytes(&mut self, b: &[u8]) {
        self.buf.extend_from_slice(b);
    }

    /// Pads the buffer with zero bytes until its length is a multiple of 4.
    pub fn pad_to_4(&mut self) {
        let rem = self.buf.len() % 4;
        if rem != 0 {
            self.buf.extend(std::iter::repeat(0u8).take(4 - rem));
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Reads little-endian primitives out of a byte slice, tracking position.
pub struct ByteReader<'a> {
    pub data: &'a [u8],
    pub pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        ByteReader { data, pos: 0 }
    }

    fn need(&self, n: usize) -> Result<()> {
        if self.pos + n > self.data.len() {
            return Err(Error::new(ErrorKind::Parse, "unexpected end of artifact"));
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.need(1)?;
        let v = self.data[self.pos];
        self.pos += 1;
        Ok(v)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.need(2)?;
        let v = u16::from_le_bytes(self.data[self.pos..self.pos + 2].try_into().unwrap());
        self.pos += 2;
        Ok(v)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.need(4)?;
        let v = u32::from_le_bytes(self.data[self.pos..self.pos + 4].try_into().unwrap());
        self.pos += 4;
        Ok(v)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.need(4)?;
        let v = i32::from_le_bytes(self.data[self.pos..self.pos + 4].try_into().unwrap());
        self.pos += 4;
        Ok(v)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.need(n)?;
        let s = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(s)
    }

    pub fn read_u32_array(&mut self, n: usize) -> Result<Vec<u32>> {
        (0..n).map(|_| self.read_u32()).collect()
    }

    pub fn read_u16_array(&mut self, n: usize) -> Result<Vec<u16>> {
        (0..n).map(|_| self.read_u16()).collect()
    }

    pub fn read_u8_array(&mut self, n: usize) -> Result<Vec<u8>> {
        self.need(n)?;
        let s = self.data[self.pos..self.pos + n].to_vec();
        self.pos += n;
        Ok(s)
    }

    pub fn read_i32_array(&mut self, n: usize) -> Result<Vec<i32>> {
        (0..n).map(|_| self.read_i32()).collect()
    }

    pub fn skip_to_4(&mut self) {
        let rem = self.pos % 4;
        if rem != 0 {
            self.pos += 4 - rem;
        }
    }
}

/// Writes a sequence of strings as `offsets: u32[count+1]` + UTF-8 `pool`
/// (§6, used for titles/aliases/authors/cover-path/cover-base pools). Values
/// with more than one logical item (aliases, authors) are pre-joined by the
/// caller using the shard's `sepCode`.
pub fn write_string_pool(values: &[String]) -> (Vec<u32>, Vec<u8>) {
    let mut offsets = Vec::with_capacity(values.len() + 1);
    let mut pool = Vec::new();
    offsets.push(0u32);
    for v in values {
        pool.extend_from_slice(v.as_bytes());
        offsets.push(pool.len() as u32);
    }
    (offsets, pool)
}

pub fn read_string_pool(offsets: &[u32], pool: &[u8]) -> Result<Vec<String>> {
    if offsets.is_empty() {
        return Ok(Vec::new());
    }
    let mut out = Vec::with_capacity(offsets.len() - 1);
    for w in offsets.windows(2) {
        let (start, end) = (w[0] as usize, w[1] as usize);
        if end < start || end > pool.len() {
            return Err(Error::new(ErrorKind::Parse, "string pool offset out of range"));
        }
        let s = std::str::from_utf8(&pool[start..end])
            .map_err(|_| Error::new(ErrorKind::Parse, "invalid utf-8 in string pool"))?;
        out.push(s.to_string());
    }
    Ok(out)
}
