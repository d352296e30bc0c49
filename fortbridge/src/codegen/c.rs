// SPDX-License-Identifier: GPL-3.0-or-later

//! Emitter for the JNI bridge functions.
//!
//! A bridge function forward-declares the Fortran symbol (lower-cased name
//! with a trailing underscore), converts every argument into the form the
//! Fortran calling convention expects, performs the call, and releases any
//! pinned buffers afterwards.
//!
//! Buffers need care: when the same Java array is passed for two arguments
//! (in-place routines such as DSWAP do this), pinning it twice would hand
//! the Fortran code two divergent copies of the same logical memory. Every
//! buffer conversion therefore checks the arrays pinned before it with
//! `IsSameObject` and shares the base pointer, and every release zeroes the
//! earlier aliases so each distinct buffer is released exactly once.

use super::types::{c99_type, java_type, jni_type};
use super::{GenerateError, Strategy, strategy_for};
use crate::config::ComplexConvention;
use crate::fortran::{FortranType, Routine};

/// The code fragments accumulated for one bridge function.
#[derive(Debug, Default)]
struct Fragments {
    return_type: String,
    decl_args: String,
    conversions: String,
    fortran_args: Vec<String>,
    fortran_return_type: String,
    call_pre: String,
    call_args: Vec<String>,
    call_post: String,
    releases: String,
}

/// A buffer that has already been pinned, remembered for alias detection.
/// Only buffers of the same element type can alias.
#[derive(Debug)]
struct SeenBuffer {
    name: String,
    element_type: String,
}

/// Generate the JNI bridge function for one routine.
///
/// `prefix` is the JNI name prefix derived from the package and class name
/// (dots replaced by underscores). The complex calling convention selects
/// how complex scalars and return values cross the boundary.
pub fn bridge_function(
    routine: &Routine,
    prefix: &str,
    convention: ComplexConvention,
) -> Result<String, GenerateError> {
    if !routine.have_all_types() {
        return Err(GenerateError::Incomplete {
            routine: routine.name.clone(),
            missing: routine.untyped_args(),
        });
    }

    let fortran_name = format!("{}_", routine.name.to_lowercase());
    let fct_name = format!("{}_{}", prefix, routine.name.to_lowercase());

    let mut frags = Fragments::default();
    return_fragments(&mut frags, routine, convention)?;
    for (name, ty) in routine.iter_args() {
        argument_fragments(&mut frags, routine, name, ty, convention)?;
    }

    // Input buffers are pinned before the output buffers, releases run in
    // reverse. The accumulator carries the buffers pinned so far.
    let mut seen = Vec::new();
    for (name, ty) in routine.iter_args() {
        if !ty.is_output() {
            seen = conversion_fragments(&mut frags, routine, name, ty, convention, seen)?;
        }
    }
    for (name, ty) in routine.iter_args() {
        if ty.is_output() {
            seen = conversion_fragments(&mut frags, routine, name, ty, convention, seen)?;
        }
    }

    Ok(format!(
        "JNIEXPORT {ret} JNICALL Java_{fct_name}(JNIEnv *env, jclass this{decl})\n\
         {{\n\
         \x20 extern {fret} {fortran_name}({fargs});\n\
         \n\
         {conv}\
         \x20 savedEnv = env;\n\
         \x20 {pre}{fortran_name}({cargs});\n\
         {rel}{post}\n\
         }}\n",
        ret = frags.return_type,
        decl = frags.decl_args,
        fret = frags.fortran_return_type,
        fargs = frags.fortran_args.join(", "),
        conv = frags.conversions,
        pre = frags.call_pre,
        cargs = frags.call_args.join(", "),
        rel = frags.releases,
        post = frags.call_post,
    ))
}

/// Fragments for the return value. Fortran returns complex values through a
/// hidden first reference argument under the f2c convention, so the extern
/// declaration and the call are rewritten accordingly.
fn return_fragments(
    frags: &mut Fragments,
    routine: &Routine,
    convention: ComplexConvention,
) -> Result<(), GenerateError> {
    let ty = &routine.return_type;
    let java = java_type(ty)?;
    let jni = jni_type(&java);

    match strategy_for(routine, None, ty)? {
        Strategy::Void => {
            frags.return_type = "void".to_string();
            frags.fortran_return_type = "void".to_string();
        }
        Strategy::Complex => match convention {
            ComplexConvention::F2c => {
                frags.return_type = jni;
                frags.fortran_return_type = "void".to_string();
                frags.fortran_args.push(format!("{java} *"));
                frags.conversions.push_str(&format!("  {java} retval;\n"));
                frags.call_args.push("&retval".to_string());
                frags
                    .call_post
                    .push_str(&format!("\n  return create{java}(env, &retval);"));
            }
            ComplexConvention::C99 => {
                let c99 = c99_type(&java);
                frags.return_type = jni;
                frags.fortran_return_type = c99.to_string();
                frags.call_pre = format!("{c99} retval = ");
                frags
                    .call_post
                    .push_str(&format!("\n  return create{java}(env, retval);"));
            }
        },
        _ => {
            frags.return_type = jni.clone();
            frags.fortran_return_type = jni.clone();
            frags.call_pre = format!("{jni} retval = ");
            // REAL functions historically return double under the f2c
            // convention, the cast keeps that path explicit.
            if jni == "jfloat" {
                frags.call_post.push_str("\n  return (jdouble) retval;");
            } else {
                frags.call_post.push_str("\n  return retval;");
            }
        }
    }
    Ok(())
}

/// Fragments for one argument: the bridge parameter, the extern parameter
/// and the call expression.
fn argument_fragments(
    frags: &mut Fragments,
    routine: &Routine,
    name: &str,
    ty: &FortranType,
    convention: ComplexConvention,
) -> Result<(), GenerateError> {
    let java = java_type(ty)?;
    let jni = jni_type(&java);
    let lname = name.to_lowercase();

    match strategy_for(routine, Some(name), ty)? {
        Strategy::Info => {
            // INFO becomes the bridge function's return value and vanishes
            // from the parameter list.
            frags.return_type = "jint".to_string();
            frags.fortran_args.push("int *".to_string());
            frags.call_args.push(format!("&{lname}"));
        }
        Strategy::Buffer => {
            frags
                .decl_args
                .push_str(&format!(", {jni} {lname}, jint {lname}Idx"));
            let element = buffer_element_type(&jni);
            frags.fortran_args.push(format!("{element} *"));
            frags.call_args.push(format!("{lname}Ptr"));
        }
        Strategy::Complex => {
            frags.decl_args.push_str(&format!(", {jni} {lname}"));
            let pointee = match convention {
                ComplexConvention::F2c => java.clone(),
                ComplexConvention::C99 => c99_type(&java).to_string(),
            };
            frags.fortran_args.push(format!("{pointee} *"));
            frags.call_args.push(format!("&{lname}Cplx"));
        }
        Strategy::Char => {
            frags.decl_args.push_str(&format!(", {jni} {lname}"));
            frags.fortran_args.push("char *".to_string());
            frags.call_args.push(format!("&{lname}Chr"));
        }
        Strategy::Str => {
            frags.decl_args.push_str(&format!(", {jni} {lname}"));
            frags.fortran_args.push("char *".to_string());
            frags.call_args.push(format!("{lname}Str"));
        }
        Strategy::Generic => {
            frags.decl_args.push_str(&format!(", {jni} {lname}"));
            frags.fortran_args.push(format!("j{java} *"));
            frags.call_args.push(format!("&{lname}"));
        }
        Strategy::Void => {
            return Err(GenerateError::Strategy {
                name: name.to_string(),
                spelling: ty.to_string(),
            });
        }
    }
    Ok(())
}

/// Fragments for the pre-call conversions and post-call releases of one
/// argument. Returns the updated alias accumulator.
fn conversion_fragments(
    frags: &mut Fragments,
    routine: &Routine,
    name: &str,
    ty: &FortranType,
    convention: ComplexConvention,
    mut seen: Vec<SeenBuffer>,
) -> Result<Vec<SeenBuffer>, GenerateError> {
    let java = java_type(ty)?;
    let jni = jni_type(&java);
    let lname = name.to_lowercase();

    match strategy_for(routine, Some(name), ty)? {
        Strategy::Info => {
            frags.conversions.push_str("  int info;\n");
            frags.call_post.push_str("\n  return info;");
        }
        Strategy::Buffer => {
            let element = buffer_element_type(&jni);
            let accessor = element_accessor(&element);
            let aliases: Vec<&SeenBuffer> = seen
                .iter()
                .filter(|buffer| buffer.element_type == element)
                .collect();

            let mut conversion = format!(
                "  {element} *{lname}PtrBase = 0, *{lname}Ptr = 0;\n  if ({lname}) {{\n"
            );
            for (index, alias) in aliases.iter().enumerate() {
                let keyword = if index == 0 { "if" } else { "else if" };
                conversion.push_str(&format!(
                    "    {keyword} ((*env)->IsSameObject(env, {lname}, {alias}) == JNI_TRUE)\n      {lname}PtrBase = {alias}PtrBase;\n",
                    alias = alias.name
                ));
            }
            let pin = format!(
                "{lname}PtrBase = (*env)->Get{accessor}ArrayElements(env, {lname}, NULL);\n"
            );
            if aliases.is_empty() {
                conversion.push_str(&format!("    {pin}"));
            } else {
                conversion.push_str(&format!("    else\n      {pin}"));
            }
            let offset = if ty.is_complex() {
                format!("2*{lname}Idx")
            } else {
                format!("{lname}Idx")
            };
            conversion.push_str(&format!("    {lname}Ptr = {lname}PtrBase + {offset};\n  }}\n"));
            frags.conversions.push_str(&conversion);

            // Output buffers are copied back on release, input buffers are
            // dropped. The release of an alias must not release twice.
            let mode = if ty.is_output() { "0" } else { "JNI_ABORT" };
            let mut release = format!(
                "  if ({lname}PtrBase) {{\n    (*env)->Release{accessor}ArrayElements(env, {lname}, {lname}PtrBase, {mode});\n"
            );
            for alias in &aliases {
                release.push_str(&format!(
                    "    if ({lname}PtrBase == {alias}PtrBase)\n      {alias}PtrBase = 0;\n",
                    alias = alias.name
                ));
            }
            release.push_str(&format!("    {lname}PtrBase = 0;\n  }}\n"));
            frags.releases = release + &frags.releases;

            seen.push(SeenBuffer { name: lname, element_type: element });
        }
        Strategy::Complex => match convention {
            ComplexConvention::F2c => {
                frags.conversions.push_str(&format!(
                    "  {java} {lname}Cplx;\n  get{java}(env, {lname}, &{lname}Cplx);\n"
                ));
            }
            ComplexConvention::C99 => {
                let c99 = c99_type(&java);
                frags.conversions.push_str(&format!(
                    "  {c99} {lname}Cplx;\n  {lname}Cplx = get{java}(env, {lname});\n"
                ));
            }
        },
        Strategy::Char => {
            frags
                .conversions
                .push_str(&format!("  char {lname}Chr = (char) {lname};\n"));
        }
        Strategy::Str => {
            frags.conversions.push_str(&format!(
                "  char *{lname}Str = (*env)->GetStringChars(env, {lname}, NULL);\n"
            ));
            frags.releases.push_str(&format!(
                "  (*env)->ReleaseStringChars(env, {lname}, {lname}Str);\n"
            ));
        }
        Strategy::Generic | Strategy::Void => {}
    }
    Ok(seen)
}

/// The JNI element type of an array type, e.g. `jdoubleArray` -> `jdouble`.
fn buffer_element_type(jni: &str) -> String {
    jni.strip_suffix("Array").unwrap_or(jni).to_string()
}

/// The JNI accessor infix of an element type, e.g. `jdouble` -> `Double`.
fn element_accessor(element: &str) -> String {
    let bare = element.strip_prefix('j').unwrap_or(element);
    let mut chars = bare.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fortran::parser;

    const PREFIX: &str = "org_jblas_NativeBlas";

    const DAXPY: &str = "      SUBROUTINE DAXPY(N,DA,DX,INCX,DY,INCY)
      DOUBLE PRECISION DA
      INTEGER INCX,INCY,N
      DOUBLE PRECISION DX(*),DY(*)
*  N       (input)
*  DA      (input)
*  DX      (input)
*  INCX    (input)
*  INCY    (input)
";

    const DSWAP: &str = "      SUBROUTINE DSWAP(N,DX,INCX,DY,INCY)
      INTEGER INCX,INCY,N
      DOUBLE PRECISION DX(*),DY(*)
*  N       (input)
*  INCX    (input)
*  INCY    (input)
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

    const FOO: &str = "      SUBROUTINE FOO(NAME,N)
      CHARACTER*6 NAME
      INTEGER N
*  NAME    (input)
*  N       (input)
";

    const ZDOTC: &str = "      DOUBLE COMPLEX FUNCTION ZDOTC(N,ZX,INCX,ZY,INCY)
      INTEGER INCX,INCY,N
      DOUBLE COMPLEX ZX(*),ZY(*)
*  N       (input)
*  ZX      (input)
*  INCX    (input)
*  ZY      (input)
*  INCY    (input)
";

    fn generate(source: &str, convention: ComplexConvention) -> String {
        let routine = parser::parse_source(source).unwrap();
        bridge_function(&routine, PREFIX, convention).unwrap()
    }

    #[test]
    fn test_scalar_arguments_pass_by_reference() {
        let code = generate(DAXPY, ComplexConvention::C99);

        assert!(code.contains(
            "JNIEXPORT void JNICALL Java_org_jblas_NativeBlas_daxpy(JNIEnv *env, jclass this, \
             jint n, jdouble da, jdoubleArray dx, jint dxIdx, jint incx, jdoubleArray dy, \
             jint dyIdx, jint incy)"
        ));
        assert!(code.contains(
            "extern void daxpy_(jint *, jdouble *, jdouble *, jint *, jdouble *, jint *);"
        ));
        assert!(code.contains("daxpy_(&n, &da, dxPtr, &incx, dyPtr, &incy);"));
    }

    #[test]
    fn test_output_buffer_release_mode() {
        let code = generate(DAXPY, ComplexConvention::C99);

        // DX is annotated input, DY has no annotation and defaults to output.
        assert!(code.contains("(*env)->ReleaseDoubleArrayElements(env, dx, dxPtrBase, JNI_ABORT);"));
        assert!(code.contains("(*env)->ReleaseDoubleArrayElements(env, dy, dyPtrBase, 0);"));
    }

    #[test]
    fn test_aliased_buffers_pin_once() {
        let code = generate(DSWAP, ComplexConvention::C99);

        // The second buffer checks the first one before pinning.
        assert!(code.contains("if ((*env)->IsSameObject(env, dy, dx) == JNI_TRUE)"));
        assert!(code.contains("dyPtrBase = dxPtrBase;"));
        // Releasing the alias neutralizes the earlier base pointer, so the
        // underlying array is released exactly once.
        assert!(code.contains("if (dyPtrBase == dxPtrBase)\n      dxPtrBase = 0;"));
        assert_eq!(code.matches("GetDoubleArrayElements").count(), 2);
        assert_eq!(code.matches("ReleaseDoubleArrayElements").count(), 2);
    }

    #[test]
    fn test_info_argument_becomes_return_value() {
        let code = generate(DGESV, ComplexConvention::C99);

        assert!(code.contains("JNIEXPORT jint JNICALL Java_org_jblas_NativeBlas_dgesv"));
        assert!(!code.contains("jintArray info"));
        assert!(code.contains("  int info;\n"));
        assert!(code.contains("&n, &nrhs, aPtr, &lda, ipivPtr, bPtr, &ldb, &info"));
        assert!(code.trim_end().ends_with("return info;\n}"));
    }

    #[test]
    fn test_string_argument_is_pinned_and_released() {
        let code = generate(FOO, ComplexConvention::C99);

        assert!(code.contains("jstring name"));
        assert!(code.contains("extern void foo_(char *, jint *);"));
        // The raw string buffer crosses the boundary, no re-encoded copy.
        assert!(code.contains("char *nameStr = (*env)->GetStringChars(env, name, NULL);"));
        assert!(code.contains("(*env)->ReleaseStringChars(env, name, nameStr);"));
        assert!(code.contains("foo_(nameStr, &n);"));
    }

    #[test]
    fn test_complex_return_value_c99() {
        let code = generate(ZDOTC, ComplexConvention::C99);

        assert!(code.contains("JNIEXPORT jobject JNICALL"));
        assert!(code.contains("extern double complex zdotc_("));
        assert!(code.contains("double complex retval = zdotc_("));
        assert!(code.contains("return createComplexDouble(env, retval);"));
    }

    #[test]
    fn test_complex_return_value_f2c_uses_hidden_argument() {
        let code = generate(ZDOTC, ComplexConvention::F2c);

        assert!(code.contains("extern void zdotc_(ComplexDouble *,"));
        assert!(code.contains("  ComplexDouble retval;\n"));
        assert!(code.contains("zdotc_(&retval,"));
        assert!(code.contains("return createComplexDouble(env, &retval);"));
    }

    #[test]
    fn test_complex_buffer_offsets_are_interleaved() {
        let code = generate(ZDOTC, ComplexConvention::C99);

        assert!(code.contains("zxPtr = zxPtrBase + 2*zxIdx;"));
        assert!(code.contains("zyPtr = zyPtrBase + 2*zyIdx;"));
    }

    #[test]
    fn test_generation_is_idempotent() {
        let routine = parser::parse_source(DGESV).unwrap();
        let first = bridge_function(&routine, PREFIX, ComplexConvention::C99).unwrap();
        let second = bridge_function(&routine, PREFIX, ComplexConvention::C99).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_incomplete_routine_is_rejected() {
        let mut routine = parser::parse_source(DAXPY).unwrap();
        routine.arg_types.remove("DA");
        let result = bridge_function(&routine, PREFIX, ComplexConvention::C99);
        assert!(matches!(
            result,
            Err(GenerateError::Incomplete { ref missing, .. }) if missing == &["DA".to_string()]
        ));
    }
}
