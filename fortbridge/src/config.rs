// SPDX-License-Identifier: GPL-3.0-or-later

//! This module defines the configuration of the application.
//!
//! The configuration is either loaded from a file or used with default
//! values, which are defined in the code. The configuration controls the
//! generation choices that are not per-invocation: the complex calling
//! convention, the skip list of source files, and the name of the native
//! library the generated class loads.
//!
//! The configuration file syntax is based on the YAML format.
//! The default configuration file name is `fortbridge.yml`.
//!
//! The configuration file location is searched in the following order:
//! 1. The current working directory
//! 2. The local configuration directory of the user
//! 3. The configuration directory of the user
//! 4. The local configuration directory of the application
//! 5. The configuration directory of the application
//!
//! ```yaml
//! schema: 1.0
//!
//! complex: f2c
//!
//! exclude:
//!   - xerbla
//!   - scabs1
//!   - dsdot
//!
//! library: jblas
//! ```

// Re-Export the types and the loader module content.
pub use loader::{ConfigError, Loader};
pub use types::*;
pub use validation::{ValidationError, Validator};

mod types {
    use serde::Deserialize;
    use std::fmt;
    use std::str::FromStr;

    /// Represents the application configuration with flattened structure.
    #[derive(Debug, PartialEq, serde::Deserialize, serde::Serialize)]
    pub struct Main {
        #[serde(deserialize_with = "validate_schema_version")]
        pub schema: String,
        #[serde(default)]
        pub complex: ComplexConvention,
        #[serde(default = "default_exclude")]
        pub exclude: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub library: Option<String>,
    }

    impl Default for Main {
        fn default() -> Self {
            Self {
                schema: String::from(SUPPORTED_SCHEMA_VERSION),
                complex: ComplexConvention::default(),
                exclude: default_exclude(),
                library: None,
            }
        }
    }

    impl fmt::Display for Main {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            writeln!(f, "Configuration:")?;
            match serde_yml::to_string(self) {
                Ok(yaml_string) => {
                    for line in yaml_string.lines() {
                        writeln!(f, "{}", line)?;
                    }
                    Ok(())
                }
                Err(_) => {
                    panic!("configuration can't be serialized")
                }
            }
        }
    }

    /// How complex scalars and return values cross the native boundary.
    ///
    /// Fortran compilers built on f2c pass complex values through struct
    /// pointers and return them via a hidden first reference argument.
    /// Modern compilers use the C99 `_Complex` types by value. The generated
    /// bridge code must match the convention of the compiled library.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
    pub enum ComplexConvention {
        #[default]
        #[serde(rename = "c99")]
        C99,
        #[serde(rename = "f2c")]
        F2c,
    }

    impl FromStr for ComplexConvention {
        type Err = String;

        fn from_str(value: &str) -> Result<Self, Self::Err> {
            match value {
                "c99" => Ok(ComplexConvention::C99),
                "f2c" => Ok(ComplexConvention::F2c),
                _ => Err(format!(
                    "Unknown complex calling convention: {value}. Expected 'c99' or 'f2c'."
                )),
            }
        }
    }

    impl fmt::Display for ComplexConvention {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let name = match self {
                ComplexConvention::C99 => "c99",
                ComplexConvention::F2c => "f2c",
            };
            write!(f, "{}", name)
        }
    }

    const SUPPORTED_SCHEMA_VERSION: &str = "1.0";

    /// The sources that declare no wrappable routine: the XERBLA error
    /// handler is replaced by the generated interception, and the mixed
    /// precision helpers have no Java counterpart.
    pub(super) fn default_exclude() -> Vec<String> {
        vec!["xerbla".to_string(), "scabs1".to_string(), "dsdot".to_string()]
    }

    // Custom deserialization function to validate the schema version
    fn validate_schema_version<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let schema: String = Deserialize::deserialize(deserializer)?;
        if schema != SUPPORTED_SCHEMA_VERSION {
            use serde::de::Error;
            Err(Error::custom(format!(
                "Unsupported schema version: {schema}. Expected: {SUPPORTED_SCHEMA_VERSION}"
            )))
        } else {
            Ok(schema)
        }
    }
}

pub mod validation {

    use super::types::*;
    use thiserror::Error;

    /// Trait for validating configuration objects
    pub trait Validator<T> {
        type Error: std::error::Error;

        fn validate(config: &T) -> Result<(), Self::Error>;
    }

    /// Validation errors for configuration
    #[derive(Debug, Error)]
    pub enum ValidationError {
        #[error("Empty string value for field '{field}'")]
        EmptyString { field: String },
        #[error("Duplicate {field} entry at: {idx}")]
        DuplicateEntry { field: &'static str, idx: usize },
        #[error("Multiple validation errors: {errors:?}")]
        Multiple { errors: Vec<ValidationError> },
    }

    /// Combinator for collecting and handling validation errors
    #[derive(Default)]
    struct ValidationCollector {
        errors: Vec<ValidationError>,
    }

    impl ValidationCollector {
        fn new() -> Self {
            Self { errors: Vec::new() }
        }

        fn add(&mut self, error: ValidationError) {
            self.errors.push(error);
        }

        fn finish(self) -> Result<(), ValidationError> {
            if self.errors.is_empty() {
                Ok(())
            } else if self.errors.len() == 1 {
                Err(self.errors.into_iter().next().unwrap())
            } else {
                Err(ValidationError::Multiple { errors: self.errors })
            }
        }
    }

    impl Validator<Main> for Main {
        type Error = ValidationError;

        fn validate(config: &Main) -> Result<(), Self::Error> {
            let mut collector = ValidationCollector::new();

            // Validate the exclude entries
            let mut seen_entries = std::collections::HashSet::new();
            for (idx, entry) in config.exclude.iter().enumerate() {
                if entry.is_empty() {
                    collector.add(ValidationError::EmptyString {
                        field: format!("exclude[{}]", idx),
                    });
                } else if !seen_entries.insert(entry) {
                    collector.add(ValidationError::DuplicateEntry { field: "exclude", idx });
                }
            }

            // Validate the library name
            if let Some(library) = &config.library {
                if library.is_empty() {
                    collector.add(ValidationError::EmptyString { field: "library".to_string() });
                }
            }

            collector.finish()
        }
    }

}

pub mod loader {
    use super::{Main, Validator};
    use directories::{BaseDirs, ProjectDirs};
    use log::{debug, info};
    use std::fs::OpenOptions;
    use std::path::{Path, PathBuf};
    use thiserror::Error;

    pub struct Loader {}

    impl Loader {
        /// Loads the configuration from the specified file or the default locations.
        ///
        /// If the configuration file is specified, it will be used. Otherwise, the default locations
        /// will be searched for the configuration file. If the configuration file is not found, the
        /// default configuration will be returned.
        pub fn load(
            context: &crate::context::Context,
            filename: &Option<String>,
        ) -> Result<Main, ConfigError> {
            if let Some(path) = filename {
                // If the configuration file is specified, use it.
                Self::from_file(Path::new(path))
            } else {
                // Otherwise, try to find the configuration file in the default locations.
                let locations = Self::file_locations(context);
                for location in locations {
                    debug!("Checking configuration file: {}", location.display());
                    if location.exists() {
                        return Self::from_file(location.as_path());
                    }
                }
                // If the configuration file is not found, return the default configuration.
                debug!("Configuration file not found. Using the default configuration.");
                Ok(Main::default())
            }
        }

        /// The default locations where the configuration file can be found.
        ///
        /// The locations are searched in the following order:
        /// - The current working directory.
        /// - The local configuration directory of the user.
        /// - The configuration directory of the user.
        /// - The local configuration directory of the application.
        /// - The configuration directory of the application.
        fn file_locations(context: &crate::context::Context) -> Vec<PathBuf> {
            let mut locations = Vec::new();

            locations.push(context.current_directory.clone());
            if let Some(base_dirs) = BaseDirs::new() {
                locations.push(base_dirs.config_local_dir().to_path_buf());
                locations.push(base_dirs.config_dir().to_path_buf());
            }

            if let Some(proj_dirs) = ProjectDirs::from("com.github", "fortbridge", "fortbridge") {
                locations.push(proj_dirs.config_local_dir().to_path_buf());
                locations.push(proj_dirs.config_dir().to_path_buf());
            }
            // filter out duplicate elements from the list
            locations.dedup();
            // append the default configuration file name to the locations
            locations.iter().map(|p| p.join("fortbridge.yml")).collect()
        }

        /// Loads the configuration from the specified file.
        pub fn from_file(path: &Path) -> Result<Main, ConfigError> {
            info!("Loading configuration file: {}", path.display());

            let reader = OpenOptions::new()
                .read(true)
                .open(path)
                .map_err(|source| ConfigError::FileAccess { path: path.to_path_buf(), source })?;

            let content: Main = Self::from_reader(reader)
                .map_err(|source| ConfigError::ParseError { path: path.to_path_buf(), source })?;

            // Validate the loaded configuration
            Main::validate(&content)
                .map_err(|source| ConfigError::ValidationError { path: path.to_path_buf(), source })?;

            Ok(content)
        }

        /// Define the deserialization format of the config file.
        fn from_reader<R, T>(rdr: R) -> serde_yml::Result<T>
        where
            R: std::io::Read,
            T: serde::de::DeserializeOwned,
        {
            serde_yml::from_reader(rdr)
        }
    }

    /// Represents all possible configuration-related errors.
    #[derive(Debug, Error)]
    pub enum ConfigError {
        /// Error when opening or reading a configuration file.
        #[error("Failed to access configuration file '{path}': {source}")]
        FileAccess {
            path: PathBuf,
            #[source]
            source: std::io::Error,
        },
        /// Error when parsing the configuration file format.
        #[error("Failed to parse configuration from file '{path}': {source}")]
        ParseError {
            path: PathBuf,
            #[source]
            source: serde_yml::Error,
        },
        /// Error when configuration validation fails.
        #[error("Configuration validation failed: {source}")]
        ValidationError {
            path: PathBuf,
            #[source]
            source: crate::config::validation::ValidationError,
        },
    }

}
