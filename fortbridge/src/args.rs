// SPDX-License-Identifier: GPL-3.0-or-later

//! This module contains the command line interface of the application.
//!
//! The command line parsing is implemented using the `clap` library.
//! The module is defining types to represent a structured form of the
//! program invocation. The `Arguments` type is used to represent all
//! possible invocations of the program.

use anyhow::anyhow;
use clap::{arg, command, ArgAction, ArgMatches, Command};
use std::fmt;

/// Common constants used in the module.
const MODE_PARSE_SUBCOMMAND: &str = "parse";
const MODE_GENERATE_SUBCOMMAND: &str = "generate";
const DEFAULT_DUMP_FILE: &str = "routines.json";

/// Represents the command line arguments of the application.
#[derive(Debug, PartialEq)]
pub struct Arguments {
    // The path of the configuration file.
    pub config: Option<String>,
    // The mode of the application.
    pub mode: Mode,
}

/// Represents the mode of the application.
#[derive(Debug, PartialEq)]
pub enum Mode {
    Parse {
        input: FortranSources,
        output: RoutineDump,
    },
    Generate {
        input: RoutineDump,
        output: WrapperTarget,
    },
    Combined {
        input: FortranSources,
        cache: RoutineDump,
        output: WrapperTarget,
    },
}

/// Represents the Fortran source files to parse.
#[derive(Debug, PartialEq)]
pub struct FortranSources {
    pub files: Vec<String>,
    pub force: bool,
}

/// Represents the routine dump file, the hand-off between parsing and
/// generation. In the combined mode it doubles as the parse cache.
#[derive(Debug, PartialEq)]
pub struct RoutineDump {
    pub file_name: String,
}

/// Represents the generated class: where it lives and how it is produced.
#[derive(Debug, PartialEq)]
pub struct WrapperTarget {
    pub package: String,
    pub class_name: String,
    pub here: bool,
    pub complex: Option<String>,
}

impl TryFrom<ArgMatches> for Arguments {
    type Error = anyhow::Error;

    fn try_from(matches: ArgMatches) -> Result<Self, Self::Error> {
        let config = matches.get_one::<String>("config").map(String::to_string);

        match matches.subcommand() {
            Some((MODE_PARSE_SUBCOMMAND, parse_matches)) => {
                let input = FortranSources::try_from(parse_matches)?;
                let output = parse_matches
                    .get_one::<String>("output")
                    .map(String::to_string)
                    .expect("output is defaulted");

                let mode = Mode::Parse {
                    input,
                    output: RoutineDump { file_name: output },
                };
                let arguments = Arguments { config, mode };
                Ok(arguments)
            }
            Some((MODE_GENERATE_SUBCOMMAND, generate_matches)) => {
                let input = generate_matches
                    .get_one::<String>("input")
                    .map(String::to_string)
                    .expect("input is defaulted");

                let output = WrapperTarget::try_from(generate_matches)?;
                let mode = Mode::Generate {
                    input: RoutineDump { file_name: input },
                    output,
                };
                let arguments = Arguments { config, mode };
                Ok(arguments)
            }
            None => {
                let input = FortranSources::try_from(&matches)?;
                let cache = matches
                    .get_one::<String>("dump")
                    .map(String::to_string)
                    .expect("dump is defaulted");

                let output = WrapperTarget::try_from(&matches)?;
                let mode = Mode::Combined {
                    input,
                    cache: RoutineDump { file_name: cache },
                    output,
                };
                let arguments = Arguments { config, mode };
                Ok(arguments)
            }
            _ => Err(anyhow!("unrecognized subcommand")),
        }
    }
}

impl TryFrom<&ArgMatches> for FortranSources {
    type Error = anyhow::Error;

    fn try_from(matches: &ArgMatches) -> Result<Self, Self::Error> {
        let files = matches
            .get_many("FILES")
            .expect("missing Fortran source files")
            .cloned()
            .collect();
        let force = *matches.get_one::<bool>("force").unwrap_or(&false);
        Ok(FortranSources { files, force })
    }
}

impl TryFrom<&ArgMatches> for WrapperTarget {
    type Error = anyhow::Error;

    fn try_from(matches: &ArgMatches) -> Result<Self, Self::Error> {
        let package = matches
            .get_one::<String>("PACKAGE")
            .map(String::to_string)
            .expect("missing package name");
        let class_name = matches
            .get_one::<String>("CLASS")
            .map(String::to_string)
            .expect("missing class name");
        let here = *matches.get_one::<bool>("here").unwrap_or(&false);
        let complex = matches.get_one::<String>("complex").map(String::to_string);
        Ok(WrapperTarget { package, class_name, here, complex })
    }
}

impl fmt::Display for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.config {
            Some(config) => write!(f, "Invocation ({config}): {}", self.mode),
            None => write!(f, "Invocation: {}", self.mode),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Parse { input, output } => {
                write!(f, "parse {} file(s) into {}", input.files.len(), output.file_name)
            }
            Mode::Generate { input, output } => {
                write!(
                    f,
                    "generate {}.{} from {}",
                    output.package, output.class_name, input.file_name
                )
            }
            Mode::Combined { input, cache, output } => {
                write!(
                    f,
                    "generate {}.{} from {} file(s), dump in {}",
                    output.package,
                    output.class_name,
                    input.files.len(),
                    cache.file_name
                )
            }
        }
    }
}

/// Represents the command line interface of the application.
///
/// This describes how the user can interact with the application.
/// The different modes of the application are represented as subcommands.
/// The application can be run in parse mode, generate mode, or the default
/// mode where both parse and generate are executed.
pub fn cli() -> Command {
    command!()
        .subcommand_required(false)
        .subcommand_negates_reqs(true)
        .subcommand_precedence_over_arg(true)
        .arg_required_else_help(true)
        .args(&[
            arg!(-v --verbose ... "Sets the level of verbosity").action(ArgAction::Count),
            arg!(-c --config <FILE> "Path of the config file"),
        ])
        .subcommand(
            Command::new(MODE_PARSE_SUBCOMMAND)
                .about("parses Fortran declarations into a routine dump")
                .args(&[
                    arg!(<FILES> "Fortran source files")
                        .action(ArgAction::Append)
                        .num_args(1..)
                        .required(true),
                    arg!(-o --output <FILE> "Path of the routine dump file")
                        .default_value(DEFAULT_DUMP_FILE)
                        .hide_default_value(false),
                    arg!(-f --force "Reparse sources even when the dump is up to date")
                        .action(ArgAction::SetTrue),
                ])
                .arg_required_else_help(true),
        )
        .subcommand(
            Command::new(MODE_GENERATE_SUBCOMMAND)
                .about("generates wrapper sources from a routine dump")
                .args(&[
                    arg!(<PACKAGE> "Package of the generated class").required(true),
                    arg!(<CLASS> "Name of the generated class").required(true),
                    arg!(-i --input <FILE> "Path of the routine dump file")
                        .default_value(DEFAULT_DUMP_FILE)
                        .hide_default_value(false),
                    arg!(--complex <CONVENTION> "Complex calling convention (c99 or f2c)"),
                    arg!(--here "Write the generated files into the working directory")
                        .action(ArgAction::SetTrue),
                ])
                .arg_required_else_help(true),
        )
        .args(&[
            arg!(<PACKAGE> "Package of the generated class").required(true),
            arg!(<CLASS> "Name of the generated class").required(true),
            arg!(<FILES> "Fortran source files")
                .action(ArgAction::Append)
                .num_args(1..)
                .required(true),
            arg!(-d --dump <FILE> "Path of the routine dump file")
                .default_value(DEFAULT_DUMP_FILE)
                .hide_default_value(false),
            arg!(-f --force "Reparse sources even when the dump is up to date")
                .action(ArgAction::SetTrue),
            arg!(--complex <CONVENTION> "Complex calling convention (c99 or f2c)"),
            arg!(--here "Write the generated files into the working directory")
                .action(ArgAction::SetTrue),
        ])
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_call() {
        let execution = vec![
            "fortbridge",
            "-c",
            "~/fortbridge.yml",
            "parse",
            "-o",
            "custom.json",
            "-f",
            "daxpy.f",
            "ddot.f",
        ];

        let matches = cli().get_matches_from(execution);
        let arguments = Arguments::try_from(matches).unwrap();

        assert_eq!(
            arguments,
            Arguments {
                config: Some("~/fortbridge.yml".into()),
                mode: Mode::Parse {
                    input: FortranSources {
                        files: vec!["daxpy.f", "ddot.f"].into_iter().map(String::from).collect(),
                        force: true,
                    },
                    output: RoutineDump {
                        file_name: "custom.json".into()
                    },
                },
            }
        );
    }

    #[test]
    fn test_parse_defaults() {
        let execution = vec!["fortbridge", "parse", "daxpy.f"];

        let matches = cli().get_matches_from(execution);
        let arguments = Arguments::try_from(matches).unwrap();

        assert_eq!(
            arguments,
            Arguments {
                config: None,
                mode: Mode::Parse {
                    input: FortranSources {
                        files: vec!["daxpy.f".to_string()],
                        force: false,
                    },
                    output: RoutineDump {
                        file_name: "routines.json".into()
                    },
                },
            }
        );
    }

    #[test]
    fn test_generate_call() {
        let execution = vec![
            "fortbridge",
            "-c",
            "~/fortbridge.yml",
            "generate",
            "-i",
            "custom.json",
            "--complex",
            "f2c",
            "--here",
            "org.jblas",
            "NativeBlas",
        ];

        let matches = cli().get_matches_from(execution);
        let arguments = Arguments::try_from(matches).unwrap();

        assert_eq!(
            arguments,
            Arguments {
                config: Some("~/fortbridge.yml".into()),
                mode: Mode::Generate {
                    input: RoutineDump {
                        file_name: "custom.json".into()
                    },
                    output: WrapperTarget {
                        package: "org.jblas".into(),
                        class_name: "NativeBlas".into(),
                        here: true,
                        complex: Some("f2c".into()),
                    },
                },
            }
        );
    }

    #[test]
    fn test_generate_defaults() {
        let execution = vec!["fortbridge", "generate", "org.jblas", "NativeBlas"];

        let matches = cli().get_matches_from(execution);
        let arguments = Arguments::try_from(matches).unwrap();

        assert_eq!(
            arguments,
            Arguments {
                config: None,
                mode: Mode::Generate {
                    input: RoutineDump {
                        file_name: "routines.json".into()
                    },
                    output: WrapperTarget {
                        package: "org.jblas".into(),
                        class_name: "NativeBlas".into(),
                        here: false,
                        complex: None,
                    },
                },
            }
        );
    }

    #[test]
    fn test_all_call() {
        let execution = vec![
            "fortbridge",
            "-c",
            "~/fortbridge.yml",
            "-d",
            "custom.json",
            "--complex",
            "c99",
            "org.jblas",
            "NativeBlas",
            "daxpy.f",
            "ddot.f",
        ];

        let matches = cli().get_matches_from(execution);
        let arguments = Arguments::try_from(matches).unwrap();

        assert_eq!(
            arguments,
            Arguments {
                config: Some("~/fortbridge.yml".to_string()),
                mode: Mode::Combined {
                    input: FortranSources {
                        files: vec!["daxpy.f", "ddot.f"].into_iter().map(String::from).collect(),
                        force: false,
                    },
                    cache: RoutineDump {
                        file_name: "custom.json".into()
                    },
                    output: WrapperTarget {
                        package: "org.jblas".into(),
                        class_name: "NativeBlas".into(),
                        here: false,
                        complex: Some("c99".into()),
                    },
                },
            }
        );
    }

    #[test]
    fn test_all_defaults() {
        let execution = vec!["fortbridge", "org.jblas", "NativeBlas", "daxpy.f"];

        let matches = cli().get_matches_from(execution);
        let arguments = Arguments::try_from(matches).unwrap();

        assert_eq!(
            arguments,
            Arguments {
                config: None,
                mode: Mode::Combined {
                    input: FortranSources {
                        files: vec!["daxpy.f".to_string()],
                        force: false,
                    },
                    cache: RoutineDump {
                        file_name: "routines.json".into()
                    },
                    output: WrapperTarget {
                        package: "org.jblas".into(),
                        class_name: "NativeBlas".into(),
                        here: false,
                        complex: None,
                    },
                },
            }
        );
    }
}
