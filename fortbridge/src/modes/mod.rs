// SPDX-License-Identifier: GPL-3.0-or-later

//! Represent the modes the application can run in.
//!
//! To the user the modes are:
//! - parse only: read Fortran sources and write the routine dump file.
//! - generate only: read the routine dump file and write the wrapper sources.
//! - combined: parse the sources and generate the wrappers in one go.
//!
//! The combined mode treats the dump file as a cache: a source file whose
//! modification time matches the dump entry is not parsed again. A file that
//! fails to parse is reported and skipped, the rest of the batch continues.

use crate::fortran::{Routine, parser};
use crate::output::cache::{self, RoutineDatabase};
use crate::output::{OutputWriter, WriterCreationError, WriterError};
use crate::{args, config};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::{fs, io};
use thiserror::Error;

pub enum Mode {
    Parse {
        sources: SourceSet,
        dump: PathBuf,
    },
    Generate {
        dump: PathBuf,
        writer: OutputWriter,
    },
    Combined {
        sources: SourceSet,
        dump: PathBuf,
        writer: OutputWriter,
    },
}

impl Mode {
    /// Configure the application mode based on the command line arguments and the configuration.
    ///
    /// Here we are checking if the command line arguments and configuration are valid.
    /// If the arguments are valid, we create the appropriate mode instance.
    /// If that is not the case, we try to return a useful error message.
    pub fn configure(
        args: args::Arguments,
        config: config::Main,
    ) -> Result<Self, ConfigurationError> {
        match args.mode {
            args::Mode::Parse { input, output } => {
                log::debug!("Mode: parse Fortran sources and write the routine dump");

                let sources = SourceSet::create(input, &config);

                Ok(Self::Parse { sources, dump: PathBuf::from(output.file_name) })
            }
            args::Mode::Generate { input, output } => {
                log::debug!("Mode: generate wrapper sources from the routine dump");

                let writer = OutputWriter::try_from((&output, &config))?;

                Ok(Self::Generate { dump: PathBuf::from(input.file_name), writer })
            }
            args::Mode::Combined { input, cache, output } => {
                log::debug!("Mode: parse Fortran sources and generate wrapper sources");

                let sources = SourceSet::create(input, &config);
                let writer = OutputWriter::try_from((&output, &config))?;

                Ok(Self::Combined { sources, dump: PathBuf::from(cache.file_name), writer })
            }
        }
    }

    /// It actually runs the application mode.
    ///
    /// This is when the input files are parsed and the output files are
    /// written. These errors are all run-time errors, the user were passing
    /// valid arguments and configurations.
    pub fn run(self) -> ExitCode {
        let status = match self {
            Self::Parse { sources, dump } => Self::run_parse(sources, &dump),
            Self::Generate { dump, writer } => Self::run_generate(&dump, writer),
            Self::Combined { sources, dump, writer } => Self::run_combined(sources, &dump, writer),
        };
        match status {
            Ok(()) => ExitCode::SUCCESS,
            Err(error) => {
                log::error!("fortbridge: {error}");
                ExitCode::FAILURE
            }
        }
    }

    fn run_parse(sources: SourceSet, dump: &Path) -> Result<(), ProcessingError> {
        let cached = load_cache(dump, sources.force);
        let database = sources.parse_all(&cached);
        database.store(dump)?;
        log::info!("Wrote {} routine(s) to {}", database.entries.len(), dump.display());
        Ok(())
    }

    fn run_generate(dump: &Path, writer: OutputWriter) -> Result<(), ProcessingError> {
        let database = RoutineDatabase::load(dump)?;
        let routines: Vec<Routine> = database.routines().cloned().collect();
        writer.write(&routines)?;
        Ok(())
    }

    fn run_combined(
        sources: SourceSet,
        dump: &Path,
        writer: OutputWriter,
    ) -> Result<(), ProcessingError> {
        let cached = load_cache(dump, sources.force);
        let database = sources.parse_all(&cached);
        database.store(dump)?;
        let routines: Vec<Routine> = database.routines().cloned().collect();
        writer.write(&routines)?;
        Ok(())
    }
}

/// A missing dump only disables the reuse, it is not an error. The same goes
/// for a dump that fails to load, the sources are simply parsed again.
fn load_cache(dump: &Path, force: bool) -> RoutineDatabase {
    if force || !dump.exists() {
        return RoutineDatabase::default();
    }
    RoutineDatabase::load(dump).unwrap_or_else(|error| {
        log::warn!("Ignoring the routine dump: {error}");
        RoutineDatabase::default()
    })
}

/// The Fortran input files of a run, together with the skip list from the
/// configuration.
pub struct SourceSet {
    files: Vec<PathBuf>,
    force: bool,
    exclude: Vec<String>,
}

impl SourceSet {
    fn create(input: args::FortranSources, config: &config::Main) -> Self {
        Self {
            files: input.files.into_iter().map(PathBuf::from).collect(),
            force: input.force,
            exclude: config.exclude.clone(),
        }
    }

    /// Whether the file is on the skip list. The entries are matched as
    /// substrings of the file name, so `xerbla` also skips `xerbla_array.f`.
    fn excluded(&self, path: &Path) -> bool {
        let name = path.file_name().map(|name| name.to_string_lossy()).unwrap_or_default();
        self.exclude.iter().any(|entry| name.contains(entry.as_str()))
    }

    /// Parse every input file, in order, reusing cached routines for
    /// unchanged files. Files that fail to parse are reported and skipped.
    fn parse_all(&self, cached: &RoutineDatabase) -> RoutineDatabase {
        let mut database = RoutineDatabase::default();
        for path in &self.files {
            if self.excluded(path) {
                log::debug!("Skipping {} (excluded)", path.display());
                continue;
            }
            match self.parse_one(path, cached) {
                Ok((modified, routine)) => database.push(path.clone(), modified, routine),
                Err(error) => log::error!("Skipping {}: {error}", path.display()),
            }
        }
        database
    }

    fn parse_one(
        &self,
        path: &Path,
        cached: &RoutineDatabase,
    ) -> Result<(u64, Routine), ProcessingError> {
        let modified = cache::modified_secs(path)
            .map_err(|source| ProcessingError::Io { path: path.to_path_buf(), source })?;
        if !self.force {
            if let Some(routine) = cached.lookup(path, modified) {
                log::debug!("Reusing {} from the routine dump", routine.name);
                return Ok((modified, routine.clone()));
            }
        }

        let text = fs::read_to_string(path)
            .map_err(|source| ProcessingError::Io { path: path.to_path_buf(), source })?;
        let routine = parser::parse_source(&text)?;
        log::info!("Parsed {} from {}", routine.name, path.display());
        Ok((modified, routine))
    }
}

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Failed to create writer: {0}")]
    WriterCreation(#[from] WriterCreationError),
}

/// Represents the run-time errors of a mode.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Parse(#[from] parser::ParseError),
    #[error(transparent)]
    Cache(#[from] cache::CacheError),
    #[error(transparent)]
    Write(#[from] WriterError),
}
