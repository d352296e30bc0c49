// SPDX-License-Identifier: GPL-3.0-or-later

//! Assembly of the complete generated source files.
//!
//! The per-routine fragments from the `codegen` module are stitched into one
//! Java class file and one C file. The C file carries a fixed prelude: the
//! complex value helpers (in the variant matching the configured calling
//! convention) and the XERBLA interception machinery, which maps a Fortran
//! argument error back to a Java `IllegalArgumentException` naming the
//! offending argument.

use crate::codegen::{GenerateError, c, java};
use crate::config::ComplexConvention;
use crate::fortran::Routine;

const JAVA_TEMPLATE: &str = r#"// Generated by fortbridge. Do not edit.
package {package};

/**
 * Native BLAS and LAPACK routines.
 *
 * <p>Each Fortran routine is mapped to a static method of this class. For
 * every array argument an additional offset parameter gives the starting
 * index into the passed array, so a routine can operate on a slice of a
 * larger array without copying.</p>
 *
 * <p>Routines which require a workspace also get a wrapper with automatic
 * workspace allocation. These have the same name, but the workspace
 * arguments are removed.</p>
 */
public class {class} {

  static {
    System.loadLibrary("{library}");
  }

  private static int[] intDummy = new int[1];
  private static double[] doubleDummy = new double[1];
  private static float[] floatDummy = new float[1];

{declarations}
}
"#;

const C_TEMPLATE: &str = r#"/* Generated by fortbridge. Do not edit. */
#include "{header}.h"

#include <stdarg.h>
#include <stdio.h>
#include <string.h>
{complex_include}
#define CORE_PACKAGE "{core_package}"

typedef struct { float real, imag; } ComplexFloat;
typedef struct { double real, imag; } ComplexDouble;

static jobject createObject(JNIEnv *env, const char *className, const char *signature, ...)
{
  va_list args;
  jclass klass = (*env)->FindClass(env, className);
  jmethodID init = (*env)->GetMethodID(env, klass, "<init>", signature);
  jobject newObject;

  va_start(args, signature);
  newObject = (*env)->NewObjectV(env, klass, init, args);
  va_end(args);

  return newObject;
}

{complex_helpers}
static void throwIllegalArgumentException(JNIEnv *env, const char *message)
{
  jclass klass = (*env)->FindClass(env, "java/lang/IllegalArgumentException");

  (*env)->ThrowNew(env, klass, message);
}

static char *routine_names[] = {
{routine_names}
  0
};

static char *routine_arguments[][{max_arguments}] = {
{routine_arguments}
};

static JNIEnv *savedEnv = 0;

void xerbla_(char *fct, int *info)
{
  static char name[7];
  static char buffer[256];
  int i;
  char **p;
  char **arguments = 0;

  for (i = 0; i < 6; i++) {
    if (fct[i] == ' ')
      break;
    name[i] = fct[i];
  }
  name[i] = '\0';

  for (p = routine_names, i = 0; *p; p++, i++)
    if (!strcmp(*p, name))
      arguments = routine_arguments[i];

  if (!arguments)
    sprintf(buffer, "XERBLA: Error on argument %d for unknown routine %s", *info, name);
  else
    sprintf(buffer, "XERBLA: Error on argument %d (%s) in %s", *info, arguments[*info-1], name);

  throwIllegalArgumentException(savedEnv, buffer);
}

{wrappers}
"#;

const F2C_COMPLEX_HELPERS: &str = r#"static jobject createComplexFloat(JNIEnv *env, ComplexFloat *fc)
{
  return createObject(env, CORE_PACKAGE "ComplexFloat", "(FF)V", fc->real, fc->imag);
}

static jobject createComplexDouble(JNIEnv *env, ComplexDouble *dc)
{
  return createObject(env, CORE_PACKAGE "ComplexDouble", "(DD)V", dc->real, dc->imag);
}

static void getComplexFloat(JNIEnv *env, jobject fc, ComplexFloat *result)
{
  jclass klass = (*env)->FindClass(env, CORE_PACKAGE "ComplexFloat");
  jfieldID reField = (*env)->GetFieldID(env, klass, "r", "F");
  jfieldID imField = (*env)->GetFieldID(env, klass, "i", "F");

  result->real = (*env)->GetFloatField(env, fc, reField);
  result->imag = (*env)->GetFloatField(env, fc, imField);
}

static void getComplexDouble(JNIEnv *env, jobject dc, ComplexDouble *result)
{
  jclass klass = (*env)->FindClass(env, CORE_PACKAGE "ComplexDouble");
  jfieldID reField = (*env)->GetFieldID(env, klass, "r", "D");
  jfieldID imField = (*env)->GetFieldID(env, klass, "i", "D");

  result->real = (*env)->GetDoubleField(env, dc, reField);
  result->imag = (*env)->GetDoubleField(env, dc, imField);
}
"#;

const C99_COMPLEX_HELPERS: &str = r#"static jobject createComplexFloat(JNIEnv *env, float complex fc)
{
  return createObject(env, CORE_PACKAGE "ComplexFloat", "(FF)V", crealf(fc), cimagf(fc));
}

static jobject createComplexDouble(JNIEnv *env, double complex dc)
{
  return createObject(env, CORE_PACKAGE "ComplexDouble", "(DD)V", creal(dc), cimag(dc));
}

static float complex getComplexFloat(JNIEnv *env, jobject fc)
{
  jclass klass = (*env)->FindClass(env, CORE_PACKAGE "ComplexFloat");
  jfieldID reField = (*env)->GetFieldID(env, klass, "r", "F");
  jfieldID imField = (*env)->GetFieldID(env, klass, "i", "F");

  return (*env)->GetFloatField(env, fc, reField) + (*env)->GetFloatField(env, fc, imField) * I;
}

static double complex getComplexDouble(JNIEnv *env, jobject dc)
{
  jclass klass = (*env)->FindClass(env, CORE_PACKAGE "ComplexDouble");
  jfieldID reField = (*env)->GetFieldID(env, klass, "r", "D");
  jfieldID imField = (*env)->GetFieldID(env, klass, "i", "D");

  return (*env)->GetDoubleField(env, dc, reField) + (*env)->GetDoubleField(env, dc, imField) * I;
}
"#;

/// Assemble the generated Java class file.
pub fn java_source(
    package: &str,
    class_name: &str,
    library: &str,
    routines: &[Routine],
) -> Result<String, GenerateError> {
    let mut declarations = String::new();
    for routine in routines {
        declarations.push_str(&java::native_declaration(routine)?);
        declarations.push_str("\n\n");
    }

    Ok(JAVA_TEMPLATE
        .replace("{package}", package)
        .replace("{class}", class_name)
        .replace("{library}", library)
        .replace("{declarations}", declarations.trim_end()))
}

/// Assemble the generated C file with all bridge functions.
pub fn c_source(
    package: &str,
    class_name: &str,
    convention: ComplexConvention,
    routines: &[Routine],
) -> Result<String, GenerateError> {
    let header = format!("{}_{}", package.replace('.', "_"), class_name);
    let core_package = format!("{}/", package.replace('.', "/"));

    // The XERBLA lookup tables are sorted by routine name.
    let mut sorted: Vec<&Routine> = routines.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    let routine_names = sorted
        .iter()
        .map(|routine| format!("  \"{}\",", routine.name))
        .collect::<Vec<_>>()
        .join("\n");
    let max_arguments = sorted
        .iter()
        .map(|routine| routine.args.len())
        .max()
        .unwrap_or(0)
        .max(1);
    let routine_arguments = sorted
        .iter()
        .map(|routine| {
            let names = routine
                .args
                .iter()
                .map(|arg| format!("\"{arg}\""))
                .collect::<Vec<_>>()
                .join(", ");
            format!("  {{ {names} }},")
        })
        .collect::<Vec<_>>()
        .join("\n");

    let (complex_include, complex_helpers) = match convention {
        ComplexConvention::C99 => ("#include <complex.h>\n", C99_COMPLEX_HELPERS),
        ComplexConvention::F2c => ("", F2C_COMPLEX_HELPERS),
    };

    let mut wrappers = String::new();
    for routine in routines {
        wrappers.push_str(&c::bridge_function(routine, &header, convention)?);
        wrappers.push('\n');
    }

    Ok(C_TEMPLATE
        .replace("{header}", &header)
        .replace("{complex_include}", complex_include)
        .replace("{core_package}", &core_package)
        .replace("{complex_helpers}", complex_helpers)
        .replace("{routine_names}", &routine_names)
        .replace("{max_arguments}", &max_arguments.to_string())
        .replace("{routine_arguments}", &routine_arguments)
        .replace("{wrappers}", wrappers.trim_end()))
}
