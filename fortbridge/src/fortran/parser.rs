// SPDX-License-Identifier: GPL-3.0-or-later

//! Parser for Fortran 77 routine declarations.
//!
//! The parser is tailored to the BLAS and LAPACK sources: it understands the
//! fixed-form continuation convention, the declaration grammar used by those
//! headers, and the two comment conventions carrying the input/output
//! classification of the arguments. It is not a general Fortran frontend.
//!
//! Parsing is line-driven and single-pass: continuation lines are joined
//! first, then every logical line is classified against a fixed set of
//! patterns. One file declares one routine.

use super::{FortranType, Routine, standardize_type};
use regex_lite::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// Fortran 77 type spellings recognized in declaration lines. Sized forms
/// come before their unsized prefix so the alternation matches the longest
/// spelling.
const TYPES_PATTERN: &str = "BYTE\
    |CHARACTER\\*[0-9]+\
    |CHARACTER\\*\\(\\s*\\*\\s*\\)\
    |CHARACTER\
    |COMPLEX(?:\\*(?:8|16))?\
    |DOUBLE COMPLEX\
    |DOUBLE PRECISION\
    |INTEGER(?:\\*(?:2|4|8))?\
    |LOGICAL(?:\\*(?:1|2|4|8))?\
    |REAL(?:\\*(?:4|8))?";

fn pattern(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|_| panic!("invalid pattern: {pattern}"))
}

/// Matches e.g. `      SUBROUTINE DAXPY(N,DA,DX,INCX,DY,INCY)`
static SUBROUTINE_DECL: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"^\s+SUBROUTINE ([A-Z0-9]+)\( *([A-Z0-9, ]+) *\)"));

/// Matches e.g. `      DOUBLE PRECISION FUNCTION DDOT(N,DX,INCX,DY,INCY)`
static FUNCTION_DECL: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"^\s+([A-Z ]+) FUNCTION ([A-Z0-9]+)\( *([A-Z0-9, ]+) *\)"));

/// Matches e.g. `      INTEGER INCX,INCY,N`
static VARIABLE_DECL: LazyLock<Regex> =
    LazyLock::new(|| pattern(&format!(r"^\s+({TYPES_PATTERN}) +([A-Z,()*0-9 ]+)")));

/// Matches e.g. `*  LDA     (input) INTEGER`
static META_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"^\*\s*([A-Z0-9,]+)\s+\(([a-zA-Z/]*)\)"));

/// Matches a declared name, e.g. `A`, but also `DX(*)`
static ARGUMENT_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"[A-Z0-9]+(?: *\([A-Z, 0-9*]+\))?"));

/// Splits a dimensioned token into its name, e.g. `DX(*)` -> `DX`
static DIMENSIONED_NAME: LazyLock<Regex> = LazyLock::new(|| pattern(r"^([A-Z0-9]+) *\("));

/// Matches e.g. `*  LDA     - ` (the older BLAS argument comment style)
static BLAS_COMMENT_START: LazyLock<Regex> = LazyLock::new(|| pattern(r"^\*\s+([A-Z]+)\s+-\s"));

static UNCHANGED_ON_EXIT: LazyLock<Regex> = LazyLock::new(|| pattern(r"^\*\s+Unchanged on exit\."));

/// Matches a continuation line: a `$` or `C` mark in the sixth column.
static CONTINUATION: LazyLock<Regex> = LazyLock::new(|| pattern(r"^     [$C] *( .+)"));

/// Argument names in a routine header.
static ARGUMENT_NAME: LazyLock<Regex> = LazyLock::new(|| pattern(r"[A-Z0-9]+"));

static OPEN_PAREN_SPACE: LazyLock<Regex> = LazyLock::new(|| pattern(r"\(\s+"));
static SPACE_CLOSE_PAREN: LazyLock<Regex> = LazyLock::new(|| pattern(r"\s+\)"));

/// Represents errors that can occur while parsing a Fortran file.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("No routine declaration found")]
    MissingDeclaration,
    #[error("Routine {routine} has untyped arguments: {missing:?}")]
    IncompleteTypes { routine: String, missing: Vec<String> },
    #[error("Declaration line outside of a routine: {line:?}")]
    StrayDeclaration { line: String },
}

/// The state of the two-line BLAS comment match. A dash comment remembers
/// the argument name; the following `Unchanged on exit.` line commits it as
/// input. Another dash comment abandons the pending name.
#[derive(Debug, PartialEq)]
enum BlasAnnotation {
    Idle,
    Pending(String),
}

/// Concatenate all continued lines.
///
/// A continuation is marked by a `$` or `C` in the sixth column, e.g.
///
/// ```text
///       SUBROUTINE DGEEVX( BALANC, JOBVL, JOBVR, SENSE, N, A, LDA, WR, WI,
///      $                   VL, LDVL, VR, LDVR, ILO, IHI, SCALE, ABNRM,
///      $                   RCONDE, RCONDV, WORK, LWORK, IWORK, INFO )
/// ```
///
/// The result is the sequence of logical lines. Feeding already joined lines
/// through again is a no-op.
pub fn join_continuations<'a>(lines: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut joined: Vec<String> = Vec::new();
    for line in lines {
        let line = line.trim_end_matches(['\n', '\r']);
        match CONTINUATION.captures(line) {
            Some(caps) if !joined.is_empty() => {
                let last = joined.last_mut().expect("checked non-empty");
                last.push_str(&caps[1]);
            }
            _ => joined.push(line.to_string()),
        }
    }
    joined
}

/// Parse the source text of one Fortran file into a routine declaration.
pub fn parse_source(text: &str) -> Result<Routine, ParseError> {
    parse_lines(text.lines())
}

/// Parse the lines of one Fortran file into a routine declaration.
///
/// The lines are classified in a fixed priority order: routine headers,
/// variable declarations, metadata comments, and the two-line BLAS comment
/// pair. Anything else is ignored. When the lines are exhausted, every
/// argument of the routine must have a recorded type.
pub fn parse_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Result<Routine, ParseError> {
    let mut routine: Option<Routine> = None;
    let mut blas_annotation = BlasAnnotation::Idle;

    for line in join_continuations(lines) {
        if let Some(caps) = SUBROUTINE_DECL.captures(&line) {
            routine = Some(Routine::subroutine(&caps[1], argument_names(&caps[2])));
        } else if let Some(caps) = FUNCTION_DECL.captures(&line) {
            let return_type = FortranType::new(&caps[1]);
            routine = Some(Routine::function(return_type, &caps[2], argument_names(&caps[3])));
        } else if let Some(caps) = VARIABLE_DECL.captures(&line) {
            let routine = routine
                .as_mut()
                .ok_or_else(|| ParseError::StrayDeclaration { line: line.clone() })?;
            record_declaration(routine, &caps[1], &caps[2]);
        } else if let Some(caps) = META_COMMENT.captures(&line) {
            if let Some(routine) = routine.as_mut() {
                record_annotation(routine, &caps[1], &caps[2], &line);
            }
        } else if let Some(caps) = BLAS_COMMENT_START.captures(&line) {
            blas_annotation = BlasAnnotation::Pending(caps[1].to_string());
        } else if UNCHANGED_ON_EXIT.is_match(&line) {
            if let BlasAnnotation::Pending(name) = &blas_annotation {
                match routine.as_mut().and_then(|r| r.arg_types.get_mut(name)) {
                    Some(ty) => ty.annotation = Some("input".to_string()),
                    None => log::warn!(
                        "Cannot mark {name} as input: argument not declared (line {line:?})"
                    ),
                }
                blas_annotation = BlasAnnotation::Idle;
            }
        }
    }

    let routine = routine.ok_or(ParseError::MissingDeclaration)?;
    if !routine.have_all_types() {
        let missing = routine.untyped_args();
        return Err(ParseError::IncompleteTypes {
            routine: routine.name,
            missing,
        });
    }
    Ok(routine)
}

fn argument_names(list: &str) -> Vec<String> {
    ARGUMENT_NAME
        .find_iter(list)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Record the type of every declared name that is an argument of the
/// routine. Names that are not arguments are local variables and ignored.
fn record_declaration(routine: &mut Routine, spelling: &str, names: &str) {
    let spelling = OPEN_PAREN_SPACE.replace(spelling, "(");
    let spelling = SPACE_CLOSE_PAREN.replace(&spelling, ")");

    for token in ARGUMENT_TOKEN.find_iter(names) {
        let token = token.as_str();
        let (name, array) = match DIMENSIONED_NAME.captures(token) {
            Some(caps) => (caps[1].to_string(), true),
            None => (token.to_string(), false),
        };
        if routine.args.contains(&name) {
            let ty = FortranType {
                base: standardize_type(&spelling),
                array,
                annotation: None,
            };
            routine.arg_types.insert(name, ty);
        }
    }
}

/// Attach the parenthesized annotation to every named argument. Comments in
/// hand-maintained headers drift from the argument list; an unknown name is
/// reported and skipped rather than failing the parse.
fn record_annotation(routine: &mut Routine, names: &str, annotation: &str, line: &str) {
    for name in names.split(',') {
        match routine.arg_types.get_mut(name) {
            Some(ty) => ty.annotation = Some(annotation.to_string()),
            None => log::warn!(
                "Cannot attach annotation to {name}: argument not declared (line {line:?})"
            ),
        }
    }
}
