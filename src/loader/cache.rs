use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use parking_lot::Mutex;
use tracing::warn;

use crate::core::error::Result;

/// Content-addressed local store of artifact bytes, keyed by hex SHA-256
/// (§4.7, C7). One file per key under `dir`. Writes are serialized with a
/// single mutex (spec: "one-writer-at-a-time discipline; concurrent
/// readers") and are fire-and-forget: a failed write is logged and never
/// propagated to the caller.
pub struct LocalCache {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl LocalCache {
    pub fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir)?;
        Ok(LocalCache { dir, write_lock: Mutex::new(()) })
    }

    fn path_for(&self, hash: &str) -> PathBuf {
        self.dir.join(hash)
    }

    pub fn get(&self, hash: &str) -> Option<Vec<u8>> {
        fs::read(self.path_for(hash)).ok()
    }

    /// Best-effort write; logs on failure but never returns an error, so a
    /// cache-write failure can never fail the artifact fetch it backs.
    pub fn put(&self, hash: &str, bytes: &[u8]) {
        let _guard = self.write_lock.lock();
        if let Err(err) = fs::write(self.path_for(hash), bytes) {
            warn!(hash, %err, "local cache write failed");
        }
    }

    /// Deletes every cached key not present in `keep` (§4.7 pruning). Runs
    /// after init announces ready; failures here never affect correctness.
    pub fn prune(&self, keep: &HashSet<&str>) {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(%err, "local cache prune: could not list directory");
                return;
            }
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !keep.contains(name.as_ref()) {
                if let Err(err) = fs::remove_file(entry.path()) {
                    warn!(key = %name, %err, "local cache prune: failed to remove stale entry");
                }
            }
        }
    }
}
