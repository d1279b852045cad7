use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// What happens to a source file once its destination is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transfer {
    Move,
    Copy,
}

/// The destination side of a run. Live runs touch the filesystem, dry
/// runs only record what would have happened; collision handling talks
/// to both through this trait so the two make the same decisions.
pub trait Namespace {
    /// Path whose bytes currently occupy `path`, or `None` if it is free.
    fn occupant(&self, path: &Path) -> Option<PathBuf>;

    /// Create `dir` and its ancestors; existing directories are fine.
    fn create_dir_all(&mut self, dir: &Path) -> io::Result<()>;

    /// Move or copy `src` to the free path `dest`.
    fn transfer(&mut self, src: &Path, dest: &Path, transfer: Transfer) -> io::Result<()>;

    fn is_simulated(&self) -> bool;
}

fn exists_on_disk(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Real filesystem.
#[derive(Debug, Default)]
pub struct LiveNamespace;

impl LiveNamespace {
    pub fn new() -> Self {
        Self
    }
}

/// Copy `src` to `dest` and carry over its access and modification times.
pub fn copy_preserving_times(src: &Path, dest: &Path) -> io::Result<()> {
    fs::copy(src, dest)?;
    let meta = fs::metadata(src)?;
    let atime = filetime::FileTime::from_last_access_time(&meta);
    let mtime = filetime::FileTime::from_last_modification_time(&meta);
    filetime::set_file_times(dest, atime, mtime)
}

impl Namespace for LiveNamespace {
    fn occupant(&self, path: &Path) -> Option<PathBuf> {
        exists_on_disk(path).then(|| path.to_path_buf())
    }

    fn create_dir_all(&mut self, dir: &Path) -> io::Result<()> {
        match fs::create_dir_all(dir) {
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
            other => other,
        }
    }

    fn transfer(&mut self, src: &Path, dest: &Path, transfer: Transfer) -> io::Result<()> {
        match transfer {
            Transfer::Copy => copy_preserving_times(src, dest),
            Transfer::Move => match fs::rename(src, dest) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                    debug!("rename across devices, copying {} instead", src.display());
                    copy_preserving_times(src, dest)?;
                    fs::remove_file(src)
                }
                Err(e) => Err(e),
            },
        }
    }

    fn is_simulated(&self) -> bool {
        false
    }
}

fn not_a_directory(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("{} exists and is not a directory", path.display()),
    )
}

/// Dry-run destination. Never writes; reads the real destination only
/// to see what already exists there.
///
/// Claimed paths remember which source would occupy them so duplicate
/// checks compare the same bytes a live run would. In move mode the
/// source paths are marked vacated.
#[derive(Debug, Default)]
pub struct SimulatedNamespace {
    claimed: HashMap<PathBuf, PathBuf>,
    vacated: HashSet<PathBuf>,
    dirs: BTreeSet<PathBuf>,
}

impl SimulatedNamespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directories a live run would create or reuse.
    pub fn planned_dirs(&self) -> impl Iterator<Item = &Path> {
        self.dirs.iter().map(PathBuf::as_path)
    }

    pub fn is_claimed(&self, path: &Path) -> bool {
        self.claimed.contains_key(path)
    }
}

impl Namespace for SimulatedNamespace {
    fn occupant(&self, path: &Path) -> Option<PathBuf> {
        if let Some(content) = self.claimed.get(path) {
            return Some(content.clone());
        }
        (!self.vacated.contains(path) && exists_on_disk(path)).then(|| path.to_path_buf())
    }

    fn create_dir_all(&mut self, dir: &Path) -> io::Result<()> {
        // A regular file anywhere on the way makes the live call fail too.
        for ancestor in dir.ancestors() {
            if self.claimed.contains_key(ancestor) {
                return Err(not_a_directory(ancestor));
            }
            if self.vacated.contains(ancestor) {
                continue;
            }
            if let Ok(meta) = fs::metadata(ancestor) {
                if meta.is_dir() {
                    break;
                }
                return Err(not_a_directory(ancestor));
            }
        }
        self.dirs.insert(dir.to_path_buf());
        Ok(())
    }

    fn transfer(&mut self, src: &Path, dest: &Path, transfer: Transfer) -> io::Result<()> {
        self.claimed.insert(dest.to_path_buf(), src.to_path_buf());
        if transfer == Transfer::Move {
            self.vacated.insert(src.to_path_buf());
        }
        Ok(())
    }

    fn is_simulated(&self) -> bool {
        true
    }
}
