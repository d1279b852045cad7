use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::trace;

/// Bytes hashed from each end of a file for the fast digest.
pub const FAST_HASH_CHUNK: u64 = 64 * 1024; // 64 KiB
const FULL_HASH_BLOCK: usize = 1024 * 1024; // 1 MiB

/// Digest of the first and last 64 KiB of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FastDigest(pub [u8; 16]);

/// Digest of the whole file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FullDigest(pub [u8; 32]);

impl fmt::Display for FastDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Display for FullDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

pub fn fast_digest(path: &Path) -> io::Result<FastDigest> {
    let mut file = File::open(path)?;
    let size = file.metadata()?.len();
    let mut hasher = Sha256::new();

    let mut head = Vec::with_capacity(FAST_HASH_CHUNK.min(size) as usize);
    (&mut file).take(FAST_HASH_CHUNK).read_to_end(&mut head)?;
    hasher.update(&head);

    if size > FAST_HASH_CHUNK {
        file.seek(SeekFrom::End(-(FAST_HASH_CHUNK as i64)))?;
        let mut tail = Vec::with_capacity(FAST_HASH_CHUNK as usize);
        file.take(FAST_HASH_CHUNK).read_to_end(&mut tail)?;
        hasher.update(&tail);
    }

    let mut out = [0u8; 16];
    out.copy_from_slice(&hasher.finalize()[..16]);
    Ok(FastDigest(out))
}

pub fn full_digest(path: &Path) -> io::Result<FullDigest> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; FULL_HASH_BLOCK];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    Ok(FullDigest(out))
}

/// Counters describing how much work duplicate detection did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DuplicateStats {
    pub comparisons: u64,
    pub size_rejects: u64,
    pub fast_digests: u64,
    pub fast_rejects: u64,
    pub full_digests: u64,
}

/// Byte-identity check between a source file and an occupied
/// destination: size first, then the fast digest, then full content.
///
/// Fast digests are memoized per (source, destination) pair for the
/// lifetime of the detector; one detector belongs to one run.
#[derive(Debug, Default)]
pub struct DuplicateDetector {
    memo: HashMap<(PathBuf, PathBuf), (FastDigest, FastDigest)>,
    stats: DuplicateStats,
}

impl DuplicateDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget memoized digests and counters.
    pub fn clear(&mut self) {
        self.memo.clear();
        self.stats = DuplicateStats::default();
    }

    pub fn stats(&self) -> DuplicateStats {
        self.stats
    }

    pub fn are_duplicates(&mut self, src: &Path, dst: &Path) -> io::Result<bool> {
        self.stats.comparisons += 1;

        if fs::metadata(src)?.len() != fs::metadata(dst)?.len() {
            self.stats.size_rejects += 1;
            return Ok(false);
        }

        let key = (src.to_path_buf(), dst.to_path_buf());
        let (src_fast, dst_fast) = match self.memo.get(&key) {
            Some(pair) => *pair,
            None => {
                let pair = (fast_digest(src)?, fast_digest(dst)?);
                self.stats.fast_digests += 2;
                self.memo.insert(key, pair);
                pair
            }
        };
        if src_fast != dst_fast {
            self.stats.fast_rejects += 1;
            return Ok(false);
        }

        let src_full = full_digest(src)?;
        let dst_full = full_digest(dst)?;
        self.stats.full_digests += 2;
        trace!(
            "full digests {} / {} for {} and {}",
            src_full,
            dst_full,
            src.display(),
            dst.display()
        );
        Ok(src_full == dst_full)
    }
}
