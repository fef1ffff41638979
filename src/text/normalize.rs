use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

/// Precomputed accept-table for the ASCII range: true iff the code point is
/// a letter or digit. Used as the hot-path fast path so normalization does
/// not call into Unicode category lookups for the overwhelmingly common
/// case (REDESIGN FLAGS: table-driven normalization).
const ASCII_ACCEPT: [bool; 128] = {
    let mut table = [false; 128];
    let mut i = 0u8;
    while i < 128 {
        let c = i as char;
        table[i as usize] = c.is_ascii_alphanumeric();
        i += 1;
    }
    table
};

#[inline]
fn is_searchable(c: char) -> bool {
    if (c as u32) < 128 {
        ASCII_ACCEPT[c as usize]
    } else {
        // Approximates Unicode categories L* and N*: `is_alphabetic` covers
        // every L* category, `is_numeric` covers Nd/Nl/No.
        c.is_alphabetic() || c.is_numeric()
    }
}

/// Canonicalize arbitrary text into the token alphabet (§4.1): NFKC-compose,
/// lowercase, drop every code point that is not a letter or number.
pub fn normalize(text: &str) -> String {
    let composed: String = text.nfkc().collect::<String>().to_lowercase();
    composed.chars().filter(|&c| is_searchable(c)).collect()
}

/// The set (deduplicated) of length-`n` sliding windows over `s`; empty if
/// `|s| < n`. Operates on `char`s, not bytes, so multi-byte scripts (CJK,
/// etc.) produce well-formed windows.
pub fn ngrams(s: &str, n: usize) -> HashSet<String> {
    let chars: Vec<char> = s.chars().collect();
    let mut out = HashSet::new();
    if chars.len() < n || n == 0 {
        return out;
    }
    for i in 0..=(chars.len() - n) {
        out.insert(chars[i..i + n].iter().collect());
    }
    out
}

/// Maps a 2-char bigram to its 32-bit token key: `a * 65536 + b` where `a`,
/// `b` are the UTF-16 code units of the two characters (§3). Characters
/// outside the BMP contribute their lead surrogate — comics titles are
/// overwhelmingly BMP text, and this keeps the key a plain `u32` rather than
/// widening the format for a vanishingly rare case.
pub fn token_key(bigram: &str) -> Option<u32> {
    let mut chars = bigram.chars();
    let a = chars.next()?;
    let b = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    let a_unit = a.encode_utf16(&mut [0u16; 2])[0] as u32;
    let b_unit = b.encode_utf16(&mut [0u16; 2])[0] as u32;
    Some(a_unit * 65536 + b_unit)
}

/// Normalizes `s`, takes its bigrams, and returns the set of token keys
/// (§3, §4.2 step 4 / §4.5 step 1).
pub fn ngram_token_keys(s: &str) -> HashSet<u32> {
    ngrams(s, 2)
        .into_iter()
        .filter_map(|g| token_key(&g))
        .collect()
}
