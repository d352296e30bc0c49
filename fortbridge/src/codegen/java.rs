// SPDX-License-Identifier: GPL-3.0-or-later

//! Emitter for the Java-visible side of the bridge.
//!
//! Every routine becomes a `public static native` method. Array arguments
//! get an extra `<name>Idx` offset parameter so callers can address into a
//! larger array without copying. An INFO status argument of a subroutine is
//! surfaced as the method's return value.
//!
//! Routines following the LAPACK workspace-query idiom additionally get a
//! plain `public static` convenience method of the same name that performs
//! the size query with a `-1` size argument, allocates the workspaces, and
//! calls again.

use super::GenerateError;
use super::types::java_type;
use crate::fortran::{FortranType, Routine};

/// Generate the native method declaration for one routine, followed by the
/// workspace convenience method when the routine has workspace arguments.
pub fn native_declaration(routine: &Routine) -> Result<String, GenerateError> {
    if !routine.have_all_types() {
        return Err(GenerateError::Incomplete {
            routine: routine.name.clone(),
            missing: routine.untyped_args(),
        });
    }

    let return_type = java_return_type(routine)?;
    let mut params = Vec::new();
    for (name, ty) in routine.iter_args() {
        // INFO is the return value of a subroutine, a function keeps it as
        // an ordinary argument.
        if name == "INFO" && routine.return_type.is_void() {
            continue;
        }
        let java = java_type(ty)?;
        let lname = name.to_lowercase();
        params.push(format!("{java} {lname}"));
        if java.ends_with("[]") {
            params.push(format!("int {lname}Idx"));
        }
    }

    let mut result = format!(
        "  public static native {return_type} {}({});",
        routine.name.to_lowercase(),
        params.join(", ")
    );
    if !routine.workspace_arguments().is_empty() {
        result.push('\n');
        result.push_str(&workspace_wrapper(routine)?);
    }
    Ok(result)
}

/// The Java return type of the generated method. A subroutine with an INFO
/// status argument returns the status code instead of `void`.
fn java_return_type(routine: &Routine) -> Result<String, GenerateError> {
    if routine.return_type.is_void() && routine.args.iter().any(|arg| arg == "INFO") {
        Ok("int".to_string())
    } else {
        Ok(java_type(&routine.return_type)?)
    }
}

/// Complex workspaces interleave real and imaginary parts, their element
/// count doubles.
fn workspace_size_factor(ty: &FortranType) -> &'static str {
    if ty.is_complex() { "*2" } else { "" }
}

/// Generate the convenience method with automatic workspace allocation.
///
/// The method takes the routine's arguments minus the workspace buffers,
/// their size arguments and INFO. It calls the native method once with the
/// size arguments set to -1 to query the required sizes, allocates, and
/// calls again.
fn workspace_wrapper(routine: &Routine) -> Result<String, GenerateError> {
    let return_type = java_return_type(routine)?;
    let name = routine.name.to_lowercase();

    let mut params = Vec::new();
    for (arg, ty) in routine.iter_args() {
        if routine.is_workspace_argument(arg)
            || routine.is_workspace_size_argument(arg)
            || arg == "INFO"
        {
            continue;
        }
        let java = java_type(ty)?;
        let lname = arg.to_lowercase();
        params.push(format!("{java} {lname}"));
        if java.ends_with("[]") {
            params.push(format!("int {lname}Idx"));
        }
    }

    Ok(format!(
        "  public static {return_type} {name}({params}) {{\n\
         \x20   int info;\n\
         {declarations}\n\
         \x20   info = {query};\n\
         \x20   if (info != 0)\n\
         \x20     return info;\n\
         {allocations}\n\
         \x20   info = {call};\n\
         \x20   return info;\n\
         \x20 }}",
        params = params.join(", "),
        declarations = declare_workspace_arrays(routine)?,
        query = workspace_query(routine)?,
        allocations = allocate_workspaces(routine)?,
        call = call_with_workspaces(routine)?,
    ))
}

/// Declarations for the workspace buffers (one placeholder element, two for
/// complex) and their size variables.
fn declare_workspace_arrays(routine: &Routine) -> Result<String, GenerateError> {
    let mut lines = Vec::new();
    for (name, ty) in routine.iter_args() {
        let java = java_type(ty)?;
        let lname = name.to_lowercase();
        if routine.is_workspace_argument(name) {
            let element = java.trim_end_matches("[]");
            let factor = workspace_size_factor(ty);
            lines.push(format!("    {java} {lname} = new {element}[1{factor}];"));
        } else if routine.is_workspace_size_argument(name) {
            lines.push(format!("    {java} {lname};"));
        }
    }
    Ok(lines.join("\n"))
}

/// The query call: size arguments are -1, non-workspace arrays are replaced
/// by shared dummy arrays, INFO is dropped.
fn workspace_query(routine: &Routine) -> Result<String, GenerateError> {
    let mut args = Vec::new();
    for (name, ty) in routine.iter_args() {
        if routine.is_workspace_size_argument(name) {
            args.push("-1".to_string());
            continue;
        }
        if name == "INFO" {
            continue;
        }
        let java = java_type(ty)?;
        let lname = name.to_lowercase();
        if java.ends_with("[]") {
            if routine.is_workspace_argument(name) {
                args.push(format!("{lname}, 0"));
            } else {
                args.push(format!("{}, 0", java.replace("[]", "Dummy")));
            }
        } else {
            args.push(lname);
        }
    }
    Ok(format!("{}({})", routine.name.to_lowercase(), args.join(", ")))
}

/// Read the discovered sizes out of the placeholder buffers and allocate
/// the real workspaces.
fn allocate_workspaces(routine: &Routine) -> Result<String, GenerateError> {
    let mut lines = Vec::new();
    for (name, ty) in routine.iter_args() {
        if !routine.is_workspace_argument(name) {
            continue;
        }
        let java = java_type(ty)?;
        let element = java.trim_end_matches("[]");
        let lname = name.to_lowercase();
        let factor = workspace_size_factor(ty);
        lines.push(format!(
            "    l{lname} = (int) {lname}[0]; {lname} = new {element}[l{lname}{factor}];"
        ));
    }
    Ok(lines.join("\n"))
}

/// The second call with the allocated workspaces in place.
fn call_with_workspaces(routine: &Routine) -> Result<String, GenerateError> {
    let mut args = Vec::new();
    for (name, ty) in routine.iter_args() {
        if name == "INFO" {
            continue;
        }
        let java = java_type(ty)?;
        let lname = name.to_lowercase();
        if java.ends_with("[]") {
            if routine.is_workspace_argument(name) {
                args.push(format!("{lname}, 0"));
            } else {
                args.push(format!("{lname}, {lname}Idx"));
            }
        } else {
            args.push(lname);
        }
    }
    Ok(format!("{}({})", routine.name.to_lowercase(), args.join(", ")))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fortran::parser;

    const DAXPY: &str = "      SUBROUTINE DAXPY(N,DA,DX,INCX,DY,INCY)
      DOUBLE PRECISION DA
      INTEGER INCX,INCY,N
      DOUBLE PRECISION DX(*),DY(*)
";

    const DDOT: &str = "      DOUBLE PRECISION FUNCTION DDOT(N,DX,INCX,DY,INCY)
      DOUBLE PRECISION DX(*),DY(*)
      INTEGER INCX,INCY,N
";

    const DGESV: &str = "      SUBROUTINE DGESV(N,NRHS,A,LDA,IPIV,B,LDB,INFO)
      INTEGER            INFO, LDA, LDB, N, NRHS
      INTEGER            IPIV( * )
      DOUBLE PRECISION   A( LDA, * ), B( LDB, * )
*  N       (input)
*  NRHS    (input)
*  A       (input/output)
*  LDA     (input)
*  IPIV    (output)
*  B       (input/output)
*  LDB     (input)
*  INFO    (output)
";

    const DSYEV: &str = "      SUBROUTINE DSYEV(JOBZ,UPLO,N,A,LDA,W,WORK,LWORK,INFO)
      CHARACTER          JOBZ, UPLO
      INTEGER            INFO, LDA, LWORK, N
      DOUBLE PRECISION   A( LDA, * ), W( * ), WORK( * )
*  JOBZ    (input)
*  UPLO    (input)
*  N       (input)
*  A       (input/output)
*  LDA     (input)
*  W       (output)
*  WORK    (workspace/output)
*  LWORK   (input)
*  INFO    (output)
";

    const ZHEEV: &str = "      SUBROUTINE ZHEEV(N,A,LDA,WORK,LWORK,INFO)
      INTEGER            INFO, LDA, LWORK, N
      COMPLEX*16         A( LDA, * ), WORK( * )
*  N       (input)
*  A       (input/output)
*  LDA     (input)
*  WORK    (workspace/output)
*  LWORK   (input)
*  INFO    (output)
";

    fn declaration(source: &str) -> String {
        let routine = parser::parse_source(source).unwrap();
        native_declaration(&routine).unwrap()
    }

    #[test]
    fn test_subroutine_declaration_with_offsets() {
        assert_eq!(
            declaration(DAXPY),
            "  public static native void daxpy(int n, double da, double[] dx, int dxIdx, \
             int incx, double[] dy, int dyIdx, int incy);"
        );
    }

    #[test]
    fn test_function_declaration_returns_value() {
        assert_eq!(
            declaration(DDOT),
            "  public static native double ddot(int n, double[] dx, int dxIdx, \
             int incx, double[] dy, int dyIdx, int incy);"
        );
    }

    #[test]
    fn test_info_argument_becomes_return_value() {
        let code = declaration(DGESV);
        assert!(code.starts_with("  public static native int dgesv("));
        assert!(!code.contains("info"));
        assert!(code.ends_with("double[] b, int bIdx, int ldb);"));
    }

    #[test]
    fn test_workspace_wrapper_is_generated() {
        let code = declaration(DSYEV);

        assert!(code.contains(
            "  public static native int dsyev(char jobz, char uplo, int n, double[] a, \
             int aIdx, int lda, double[] w, int wIdx, double[] work, int workIdx, int lwork);"
        ));
        assert!(code.contains(
            "  public static int dsyev(char jobz, char uplo, int n, double[] a, int aIdx, \
             int lda, double[] w, int wIdx) {"
        ));
        assert!(code.contains("    double[] work = new double[1];"));
        assert!(code.contains("    int lwork;"));
        assert!(code.contains(
            "    info = dsyev(jobz, uplo, n, doubleDummy, 0, lda, doubleDummy, 0, work, 0, -1);"
        ));
        assert!(code.contains("    lwork = (int) work[0]; work = new double[lwork];"));
        assert!(code.contains(
            "    info = dsyev(jobz, uplo, n, a, aIdx, lda, w, wIdx, work, 0, lwork);"
        ));
    }

    #[test]
    fn test_complex_workspace_doubles_the_element_count() {
        let code = declaration(ZHEEV);

        assert!(code.contains("    double[] work = new double[1*2];"));
        assert!(code.contains("    lwork = (int) work[0]; work = new double[lwork*2];"));
    }

    #[test]
    fn test_no_workspace_wrapper_without_workspace_arguments() {
        let code = declaration(DGESV);
        assert!(!code.contains("public static int dgesv("));
    }

    #[test]
    fn test_declaration_is_idempotent() {
        let routine = parser::parse_source(DSYEV).unwrap();
        let first = native_declaration(&routine).unwrap();
        let second = native_declaration(&routine).unwrap();
        assert_eq!(first, second);
    }
}
