// SPDX-License-Identifier: GPL-3.0-or-later

//! Mapping of Fortran types to the Java-visible types and the JNI types of
//! the bridge layer.
//!
//! The mapping is total over the canonical types the parser produces. An
//! unmapped type is a hard error: it means the input used a Fortran
//! construct the generator was never taught, and generated code would be
//! wrong rather than merely incomplete.

use crate::fortran::FortranType;
use thiserror::Error;

/// Represents a failure to map a Fortran type to a host or bridge type.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("Don't know how to convert '{spelling}'")]
    Unmapped { spelling: String },
}

/// The Java array type used when the argument is an array or an annotated
/// output argument.
fn array_type(base: &str) -> Option<&'static str> {
    let result = match base {
        "REAL*4" => "float[]",
        "REAL*8" => "double[]",
        "INTEGER*2" => "short[]",
        "INTEGER*4" => "int[]",
        "INTEGER*8" => "long[]",
        "LOGICAL*1" => "byte[]",
        "LOGICAL*2" => "short[]",
        "LOGICAL*4" => "int[]",
        "LOGICAL*8" => "long[]",
        "COMPLEX*8" => "float[]",
        "COMPLEX*16" => "double[]",
        "VOID" => "void",
        _ => return None,
    };
    Some(result)
}

/// The Java type used for plain scalar arguments and return values.
fn scalar_type(base: &str) -> Option<&'static str> {
    let result = match base {
        "CHARACTER" => "char",
        "CHARACTER*1" => "char",
        "CHARACTER*N" => "String",
        "REAL*4" => "float",
        "REAL*8" => "double",
        "INTEGER*2" => "short",
        "INTEGER*4" => "int",
        "INTEGER*8" => "long",
        "LOGICAL*1" => "byte",
        "LOGICAL*2" => "short",
        "LOGICAL*4" => "int",
        "LOGICAL*8" => "long",
        "COMPLEX*8" => "ComplexFloat",
        "COMPLEX*16" => "ComplexDouble",
        "VOID" => "void",
        _ => return None,
    };
    Some(result)
}

/// Character types with an explicit length all map to `String`.
fn is_sized_character(base: &str) -> bool {
    base.strip_prefix("CHARACTER*")
        .is_some_and(|length| !length.is_empty() && length.bytes().all(|b| b.is_ascii_digit()))
}

/// Map a Fortran type to the Java type visible in the generated class.
///
/// The array form is selected when the source declares dimensions or when
/// the annotation marks the argument as output. An absent annotation does
/// not select the array form, even though [`FortranType::is_output`] treats
/// it as output.
pub fn java_type(ty: &FortranType) -> Result<String, TypeError> {
    let base = if is_sized_character(&ty.base) { "CHARACTER*N" } else { ty.base.as_str() };

    let result = if ty.array || ty.is_annotated_output() {
        array_type(base)
    } else {
        scalar_type(base)
    };

    result
        .map(str::to_string)
        .ok_or_else(|| TypeError::Unmapped { spelling: ty.to_string() })
}

/// Derive the JNI type of the bridge function parameter from the Java type.
pub fn jni_type(java: &str) -> String {
    if let Some(element) = java.strip_suffix("[]") {
        format!("j{element}Array")
    } else if java == "void" {
        "void".to_string()
    } else if java.contains("Complex") {
        "jobject".to_string()
    } else {
        format!("j{}", java.to_lowercase())
    }
}

/// The C99 complex type corresponding to a Java complex value type.
pub fn c99_type(java: &str) -> &'static str {
    match java {
        "ComplexFloat" => "float complex",
        _ => "double complex",
    }
}
