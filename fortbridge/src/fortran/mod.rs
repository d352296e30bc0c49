// SPDX-License-Identifier: GPL-3.0-or-later

//! This module provides the representation of Fortran routine declarations.
//!
//! The main abstractions are:
//! - `FortranType`: A Fortran data type as it appears in a declaration,
//!   together with the array flag and the input/output annotation that was
//!   extracted from the source comments.
//! - `Routine`: A parsed subroutine or function declaration, collecting the
//!   argument names in call order and their types.
//!
//! The `parser` submodule turns Fortran source lines into `Routine` values.

pub mod parser;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Spellings that are shorthands for a sized type. Everything else is kept
/// as written (the type model is open, sized spellings pass through).
const DEFAULT_TYPES: &[(&str, &str)] = &[
    ("BYTE", "LOGICAL*1"),
    ("COMPLEX", "COMPLEX*8"),
    ("DOUBLE COMPLEX", "COMPLEX*16"),
    ("DOUBLE PRECISION", "REAL*8"),
    ("INTEGER", "INTEGER*4"),
    ("LOGICAL", "LOGICAL*4"),
    ("REAL", "REAL*4"),
];

/// Map a Fortran type spelling to its canonical sized form.
pub fn standardize_type(name: &str) -> String {
    let name = name.trim();
    DEFAULT_TYPES
        .iter()
        .find(|(from, _)| *from == name)
        .map(|(_, to)| (*to).to_string())
        .unwrap_or_else(|| name.to_string())
}

/// Represents a Fortran data type of a routine argument or return value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FortranType {
    /// The canonical type spelling, e.g. `REAL*8` or `CHARACTER*1`.
    pub base: String,
    /// Whether the source declares the argument with parenthesized dimensions.
    pub array: bool,
    /// The classification extracted from a metadata comment, e.g. `input`,
    /// `output` or `input/output`. `None` when no comment named the argument.
    pub annotation: Option<String>,
}

impl FortranType {
    /// Construct a scalar type from a raw spelling. The spelling is
    /// canonicalized, the array flag and annotation can be set later.
    pub fn new(spelling: &str) -> Self {
        Self { base: standardize_type(spelling), array: false, annotation: None }
    }

    pub fn array(spelling: &str) -> Self {
        Self { array: true, ..Self::new(spelling) }
    }

    /// A return type of `VOID` marks a subroutine.
    pub fn void() -> Self {
        Self::new("VOID")
    }

    pub fn is_void(&self) -> bool {
        self.base == "VOID"
    }

    pub fn is_complex(&self) -> bool {
        self.base.starts_with("COMPLEX")
    }

    /// Whether the argument carries data back to the caller.
    ///
    /// An argument without any annotation counts as output. This mirrors the
    /// annotation conventions of the LAPACK headers, where every argument is
    /// annotated and the unannotated case does not occur in practice.
    pub fn is_output(&self) -> bool {
        match &self.annotation {
            None => true,
            Some(annotation) => annotation.contains("output"),
        }
    }

    /// Whether the annotation explicitly marks the argument as output. Unlike
    /// [`FortranType::is_output`], an absent annotation is not enough here.
    pub fn is_annotated_output(&self) -> bool {
        self.annotation
            .as_deref()
            .is_some_and(|annotation| annotation.contains("output"))
    }
}

impl fmt::Display for FortranType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)?;
        if self.array {
            write!(f, " (array)")?;
        }
        if let Some(annotation) = &self.annotation {
            write!(f, " # {annotation}")?;
        }
        Ok(())
    }
}

/// Represents a parsed Fortran subroutine or function declaration.
///
/// The argument names are kept in call order; `arg_types` maps each name to
/// its type once the declaration lines have been seen. A routine with a
/// `VOID` return type is a subroutine, everything else is a function.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Routine {
    pub name: String,
    pub args: Vec<String>,
    pub arg_types: HashMap<String, FortranType>,
    pub return_type: FortranType,
}

impl Routine {
    pub fn subroutine(name: impl Into<String>, args: Vec<String>) -> Self {
        Self::function(FortranType::void(), name, args)
    }

    pub fn function(return_type: FortranType, name: impl Into<String>, args: Vec<String>) -> Self {
        Self { name: name.into(), args, arg_types: HashMap::new(), return_type }
    }

    /// Check whether every declared argument has a recorded type. Parsing is
    /// only complete when this holds; code generation relies on it.
    pub fn have_all_types(&self) -> bool {
        self.args.iter().all(|name| self.arg_types.contains_key(name))
    }

    /// The argument names that are still missing a type.
    pub fn untyped_args(&self) -> Vec<String> {
        self.args
            .iter()
            .filter(|name| !self.arg_types.contains_key(*name))
            .cloned()
            .collect()
    }

    /// Iterate over the arguments in call order, with their types.
    ///
    /// Arguments without a recorded type are skipped; callers check
    /// [`Routine::have_all_types`] before generating code.
    pub fn iter_args(&self) -> impl Iterator<Item = (&str, &FortranType)> {
        self.args
            .iter()
            .filter_map(|name| self.arg_types.get(name).map(|ty| (name.as_str(), ty)))
    }

    /// A workspace buffer is named `...WORK` and is directly followed by its
    /// size argument `L...WORK`. The pairing is positional: the size argument
    /// must come immediately after the buffer.
    pub fn is_workspace_argument(&self, name: &str) -> bool {
        let Some(index) = self.args.iter().position(|arg| arg == name) else {
            return false;
        };
        name.ends_with("WORK")
            && index + 1 < self.args.len()
            && self.args[index + 1] == format!("L{name}")
    }

    /// The counterpart of [`Routine::is_workspace_argument`]: an `L...WORK`
    /// name directly preceded by the buffer it sizes.
    pub fn is_workspace_size_argument(&self, name: &str) -> bool {
        let Some(index) = self.args.iter().position(|arg| arg == name) else {
            return false;
        };
        let Some(buffer) = name.strip_prefix('L') else {
            return false;
        };
        buffer.ends_with("WORK")
            && buffer.chars().all(|c| c.is_ascii_uppercase())
            && index > 0
            && self.args[index - 1] == buffer
    }

    pub fn workspace_arguments(&self) -> Vec<&str> {
        self.args
            .iter()
            .filter(|name| self.is_workspace_argument(name))
            .map(String::as_str)
            .collect()
    }
}

impl fmt::Display for Routine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.return_type.is_void() {
            writeln!(f, "subroutine {}", self.name)?;
        } else {
            writeln!(f, "{} function {}", self.return_type, self.name)?;
        }
        for name in &self.args {
            match self.arg_types.get(name) {
                Some(ty) => writeln!(f, "   {name} of type {ty}")?,
                None => writeln!(f, "   {name} of unknown type")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn routine_with_args(args: &[&str]) -> Routine {
        Routine::subroutine("DGEEV", args.iter().map(|a| a.to_string()).collect())
    }

    #[test]
    fn test_standardize_known_spellings() {
        assert_eq!(standardize_type("DOUBLE PRECISION"), "REAL*8");
        assert_eq!(standardize_type("INTEGER"), "INTEGER*4");
        assert_eq!(standardize_type("DOUBLE COMPLEX"), "COMPLEX*16");
        assert_eq!(standardize_type(" REAL "), "REAL*4");
    }

    #[test]
    fn test_standardize_passes_through_sized_spellings() {
        assert_eq!(standardize_type("COMPLEX*16"), "COMPLEX*16");
        assert_eq!(standardize_type("CHARACTER*1"), "CHARACTER*1");
        assert_eq!(standardize_type("CHARACTER*(*)"), "CHARACTER*(*)");
    }

    #[test]
    fn test_output_defaults_to_true_without_annotation() {
        let ty = FortranType::new("INTEGER");
        assert!(ty.is_output());
        assert!(!ty.is_annotated_output());
    }

    #[test]
    fn test_output_follows_annotation() {
        let mut ty = FortranType::new("INTEGER");
        ty.annotation = Some("input".to_string());
        assert!(!ty.is_output());

        ty.annotation = Some("input/output".to_string());
        assert!(ty.is_output());
        assert!(ty.is_annotated_output());
    }

    #[test]
    fn test_have_all_types_contract() {
        let mut routine = routine_with_args(&["N", "A"]);
        assert!(!routine.have_all_types());
        assert_eq!(routine.untyped_args(), vec!["N", "A"]);

        routine.arg_types.insert("N".to_string(), FortranType::new("INTEGER"));
        routine.arg_types.insert("A".to_string(), FortranType::array("REAL*8"));
        assert!(routine.have_all_types());
        assert!(routine.untyped_args().is_empty());
    }

    #[test]
    fn test_workspace_pairing_is_positional() {
        let routine = routine_with_args(&["N", "WORK", "LWORK", "INFO"]);
        assert!(routine.is_workspace_argument("WORK"));
        assert!(routine.is_workspace_size_argument("LWORK"));
        assert!(!routine.is_workspace_argument("N"));
        assert!(!routine.is_workspace_size_argument("INFO"));
        assert_eq!(routine.workspace_arguments(), vec!["WORK"]);
    }

    #[test]
    fn test_workspace_pairing_breaks_when_swapped() {
        let routine = routine_with_args(&["N", "LWORK", "WORK", "INFO"]);
        assert!(!routine.is_workspace_argument("WORK"));
        assert!(!routine.is_workspace_size_argument("LWORK"));
        assert!(routine.workspace_arguments().is_empty());
    }

    #[test]
    fn test_workspace_pairing_with_prefixed_names() {
        let routine = routine_with_args(&["RWORK", "LRWORK", "IWORK", "LIWORK"]);
        assert!(routine.is_workspace_argument("RWORK"));
        assert!(routine.is_workspace_argument("IWORK"));
        assert!(routine.is_workspace_size_argument("LRWORK"));
        assert!(routine.is_workspace_size_argument("LIWORK"));
    }
}
