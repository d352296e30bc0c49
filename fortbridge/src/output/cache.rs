// SPDX-License-Identifier: GPL-3.0-or-later

//! The routine dump file.
//!
//! Parsing the full BLAS/LAPACK source tree takes long enough that the
//! parsed routines are worth keeping around. The dump file stores the
//! ordered list of routines as JSON, each entry keyed by the source file
//! and its modification time, so an unchanged file is not parsed again.
//!
//! The same file is the hand-off format between the `parse` and `generate`
//! modes.

use crate::fortran::Routine;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use std::{fs, io};
use thiserror::Error;

/// Represents errors that can occur while reading or writing a dump file.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to access routine dump '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse routine dump '{path}': {source}")]
    Syntax {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One parsed routine together with its cache key.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheEntry {
    pub source: PathBuf,
    pub modified_secs: u64,
    pub routine: Routine,
}

/// The ordered list of parsed routines, as stored in the dump file.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RoutineDatabase {
    pub entries: Vec<CacheEntry>,
}

impl RoutineDatabase {
    pub fn load(path: &Path) -> Result<Self, CacheError> {
        let reader = fs::File::open(path)
            .map(io::BufReader::new)
            .map_err(|source| CacheError::Io { path: path.to_path_buf(), source })?;
        serde_json::from_reader(reader)
            .map_err(|source| CacheError::Syntax { path: path.to_path_buf(), source })
    }

    pub fn store(&self, path: &Path) -> Result<(), CacheError> {
        let writer = fs::File::create(path)
            .map(io::BufWriter::new)
            .map_err(|source| CacheError::Io { path: path.to_path_buf(), source })?;
        serde_json::to_writer(writer, self)
            .map_err(|source| CacheError::Syntax { path: path.to_path_buf(), source })
    }

    pub fn push(&mut self, source: PathBuf, modified_secs: u64, routine: Routine) {
        self.entries.push(CacheEntry { source, modified_secs, routine });
    }

    /// The cached routine for a source file, provided the file has not been
    /// modified since it was parsed.
    pub fn lookup(&self, source: &Path, modified_secs: u64) -> Option<&Routine> {
        self.entries
            .iter()
            .find(|entry| entry.source == source && entry.modified_secs == modified_secs)
            .map(|entry| &entry.routine)
    }

    pub fn routines(&self) -> impl Iterator<Item = &Routine> {
        self.entries.iter().map(|entry| &entry.routine)
    }
}

/// The modification time of a file in whole seconds since the epoch.
pub fn modified_secs(path: &Path) -> io::Result<u64> {
    let modified = fs::metadata(path)?.modified()?;
    Ok(modified
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or(0))
}
