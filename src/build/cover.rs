use std::collections::HashMap;

/// Deduplicates cover URLs into a shared `base` table plus a per-doc
/// `suffix` (§4.2 step 3). Index 0 is reserved for "empty" (§3).
///
/// The split point is the last `/` in the URL: everything up to and
/// including it is the base (scheme + host + directory), the remainder is
/// the per-doc path. This keeps the split cheap and deterministic without
/// needing a real URL parser for what is, in this corpus, always a CDN
/// path of the shape `https://host/dir/<file>`.
pub struct CoverDeduper {
    base_to_id: HashMap<String, u32>,
    bases: Vec<String>,
}

impl CoverDeduper {
    pub fn new() -> Self {
        CoverDeduper { base_to_id: HashMap::new(), bases: vec![String::new()] }
    }

    /// Returns `(base_id, suffix)` for one doc's cover URL.
    pub fn assign(&mut self, cover: Option<&str>) -> (u32, String) {
        let Some(url) = cover else {
            return (0, String::new());
        };
        if url.is_empty() {
            return (0, String::new());
        }
        let Some(split_at) = url.rfind('/') else {
            return (0, url.to_string());
        };
        let base = &url[..=split_at];
        let suffix = &url[split_at + 1..];
        let id = if let Some(&id) = self.base_to_id.get(base) {
            id
        } else {
            let id = self.bases.len() as u32;
            self.bases.push(base.to_string());
            self.base_to_id.insert(base.to_string(), id);
            id
        };
        (id, suffix.to_string())
    }

    pub fn into_bases(self) -> Vec<String> {
        self.bases
    }
}

impl Default for CoverDeduper {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedups_shared_prefixes() {
        let mut d = CoverDeduper::new();
        let (b1, p1) = d.assign(Some("https://cdn.example/covers/a.jpg"));
        let (b2, p2) = d.assign(Some("https://cdn.example/covers/b.jpg"));
        let (b3, _) = d.assign(None);
        assert_eq!(b1, b2);
        assert_ne!(b1, 0);
        assert_eq!(b3, 0);
        assert_eq!(p1, "a.jpg");
        assert_eq!(p2, "b.jpg");
    }
}
