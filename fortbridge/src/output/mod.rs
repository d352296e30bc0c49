// SPDX-License-Identifier: GPL-3.0-or-later

//! This module is responsible for writing the generated sources.
//!
//! The `OutputWriter` struct represents the main entry point. It receives
//! the parsed routines and writes the generated Java class file and the C
//! bridge file, either into the source tree layout (`src/main/java/...` and
//! `src/main/c/...`) or into the working directory.
//!
//! Files are first written to a temporary sibling and then renamed, so an
//! aborted run does not leave a half-written file behind.

pub mod cache;
mod source;

use crate::codegen::GenerateError;
use crate::config::{self, ComplexConvention};
use crate::fortran::Routine;
use crate::args;
use std::path::{Path, PathBuf};
use std::{fs, io};
use thiserror::Error;

/// Represents errors that can occur while creating an output writer.
#[derive(Debug, Error)]
pub enum WriterCreationError {
    #[error("Failed to configure the output writer: {0}")]
    Configuration(String),
}

/// Represents errors that can occur while writing output.
#[derive(Debug, Error)]
pub enum WriterError {
    #[error("Failed to write {0}: {1}")]
    Io(PathBuf, io::Error),
    #[error(transparent)]
    Generate(#[from] GenerateError),
}

/// Represents the writer for the generated Java and C sources.
pub struct OutputWriter {
    java_path: PathBuf,
    c_path: PathBuf,
    package: String,
    class_name: String,
    library: String,
    convention: ComplexConvention,
}

impl TryFrom<(&args::WrapperTarget, &config::Main)> for OutputWriter {
    type Error = WriterCreationError;

    fn try_from(value: (&args::WrapperTarget, &config::Main)) -> Result<Self, Self::Error> {
        let (target, config) = value;

        // The command line overrides the configured calling convention.
        let convention = match target.complex.as_deref() {
            Some(value) => value
                .parse::<ComplexConvention>()
                .map_err(WriterCreationError::Configuration)?,
            None => config.complex,
        };

        let library = config
            .library
            .clone()
            .unwrap_or_else(|| target.class_name.to_lowercase());

        let (java_path, c_path) = if target.here {
            (
                PathBuf::from(format!("{}.java", target.class_name)),
                PathBuf::from(format!("{}.c", target.class_name)),
            )
        } else {
            let mut java_path = PathBuf::from("src/main/java");
            for part in target.package.split('.') {
                java_path.push(part);
            }
            java_path.push(format!("{}.java", target.class_name));
            let c_path = PathBuf::from("src/main/c").join(format!("{}.c", target.class_name));
            (java_path, c_path)
        };

        Ok(Self {
            java_path,
            c_path,
            package: target.package.clone(),
            class_name: target.class_name.clone(),
            library,
            convention,
        })
    }
}

impl OutputWriter {
    /// Generate and write both source files for the given routines.
    pub fn write(&self, routines: &[Routine]) -> Result<(), WriterError> {
        let java = source::java_source(&self.package, &self.class_name, &self.library, routines)?;
        let c = source::c_source(&self.package, &self.class_name, self.convention, routines)?;

        Self::write_file(&self.java_path, &java)?;
        log::info!("Wrote {}", self.java_path.display());
        Self::write_file(&self.c_path, &c)?;
        log::info!("Wrote {}", self.c_path.display());
        Ok(())
    }

    fn write_file(path: &Path, content: &str) -> Result<(), WriterError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|err| WriterError::Io(path.to_path_buf(), err))?;
            }
        }

        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, content).map_err(|err| WriterError::Io(temp_path.clone(), err))?;
        fs::rename(&temp_path, path).map_err(|err| WriterError::Io(path.to_path_buf(), err))
    }
}
