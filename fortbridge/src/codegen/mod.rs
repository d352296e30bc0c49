// SPDX-License-Identifier: GPL-3.0-or-later

//! This module generates the interop glue for parsed Fortran routines.
//!
//! For every routine two pieces of code are produced:
//! - `java`: the `public static native` method declaration for the generated
//!   class, plus a convenience method with automatic workspace allocation
//!   when the routine follows the LAPACK workspace-query idiom.
//! - `c`: the JNI bridge function that marshals the arguments between the
//!   JVM calling convention and the Fortran calling convention.
//!
//! Each argument (and the return value) is handled by exactly one generation
//! strategy. The strategy is selected from the resolved Java type and the
//! argument's role in the routine, and drives which fragments are emitted
//! for the declaration, the extern parameter list, the pre-call conversions,
//! the call expression and the post-call cleanup.

pub mod c;
pub mod java;
pub mod types;

use crate::fortran::{FortranType, Routine};
use thiserror::Error;
pub use types::TypeError;

/// Represents errors that can occur while generating wrapper code.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Type(#[from] TypeError),
    #[error("Routine {routine} has untyped arguments: {missing:?}")]
    Incomplete { routine: String, missing: Vec<String> },
    #[error("No generation strategy for argument {name} of type '{spelling}'")]
    Strategy { name: String, spelling: String },
}

/// The closed set of argument generation strategies.
///
/// Selection precedence follows the order of the variants: a `void` return
/// suppresses all return fragments, an INTEGER argument named INFO in a
/// subroutine becomes the bridge function's return value, array types are
/// pinned buffers, complex scalars follow the configured calling convention,
/// and the remaining scalars pass by reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    Void,
    Info,
    Buffer,
    Complex,
    Char,
    Str,
    Generic,
}

/// Scalar Java types handled by the generic pass-by-reference strategy.
const GENERIC_SCALARS: &[&str] = &["byte", "short", "int", "long", "float", "double"];

/// Select the generation strategy for one argument or the return value.
///
/// `name` is `None` for the return value. The INFO convention only applies
/// to subroutines: a function returning a value keeps INFO as an ordinary
/// argument.
pub fn strategy_for(
    routine: &Routine,
    name: Option<&str>,
    ty: &FortranType,
) -> Result<Strategy, GenerateError> {
    let java = types::java_type(ty)?;

    let strategy = if java == "void" {
        Strategy::Void
    } else if java == "int[]" && name == Some("INFO") && routine.return_type.is_void() {
        Strategy::Info
    } else if java.ends_with("[]") {
        Strategy::Buffer
    } else if java.contains("Complex") {
        Strategy::Complex
    } else if java == "char" {
        Strategy::Char
    } else if java == "String" {
        Strategy::Str
    } else if GENERIC_SCALARS.contains(&java.as_str()) {
        Strategy::Generic
    } else {
        return Err(GenerateError::Strategy {
            name: name.unwrap_or("<return>").to_string(),
            spelling: ty.to_string(),
        });
    };
    Ok(strategy)
}

#[cfg(test)]
mod test {
    use super::*;

    fn annotated(base: &str, annotation: &str) -> FortranType {
        let mut ty = FortranType::new(base);
        ty.annotation = Some(annotation.to_string());
        ty
    }

    fn subroutine_with_info() -> Routine {
        let mut routine = Routine::subroutine(
            "DGETRF",
            vec!["M".to_string(), "N".to_string(), "INFO".to_string()],
        );
        routine
            .arg_types
            .insert("M".to_string(), annotated("INTEGER", "input"));
        routine
            .arg_types
            .insert("N".to_string(), annotated("INTEGER", "input"));
        routine
            .arg_types
            .insert("INFO".to_string(), annotated("INTEGER", "output"));
        routine
    }

    #[test]
    fn test_info_argument_in_subroutine() {
        let routine = subroutine_with_info();
        let info = &routine.arg_types["INFO"];
        assert_eq!(strategy_for(&routine, Some("INFO"), info).unwrap(), Strategy::Info);
    }

    #[test]
    fn test_info_argument_in_function_stays_buffer() {
        let mut routine = subroutine_with_info();
        routine.return_type = FortranType::new("INTEGER");
        let info = &routine.arg_types["INFO"];
        assert_eq!(strategy_for(&routine, Some("INFO"), info).unwrap(), Strategy::Buffer);
    }

    #[test]
    fn test_scalar_and_buffer_selection() {
        let routine = subroutine_with_info();
        assert_eq!(
            strategy_for(&routine, Some("N"), &annotated("INTEGER", "input")).unwrap(),
            Strategy::Generic
        );
        assert_eq!(
            strategy_for(&routine, Some("A"), &FortranType::array("DOUBLE PRECISION")).unwrap(),
            Strategy::Buffer
        );
        assert_eq!(
            strategy_for(&routine, Some("ALPHA"), &annotated("COMPLEX*16", "input")).unwrap(),
            Strategy::Complex
        );
        assert_eq!(
            strategy_for(&routine, Some("TRANS"), &annotated("CHARACTER*1", "input")).unwrap(),
            Strategy::Char
        );
        assert_eq!(
            strategy_for(&routine, Some("NAME"), &annotated("CHARACTER*6", "input")).unwrap(),
            Strategy::Str
        );
    }

    #[test]
    fn test_void_return() {
        let routine = subroutine_with_info();
        assert_eq!(
            strategy_for(&routine, None, &routine.return_type).unwrap(),
            Strategy::Void
        );
    }
}
