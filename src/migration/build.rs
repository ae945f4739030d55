//! Build script helper for migration registries
//!
//! Call [`write_registry_module`] from an application's `build.rs` to compile every artifact in
//! the migrations directory into the binary:
//!
//! ```rust,no_run
//! // build.rs
//! fn main() {
//!     let out = std::path::PathBuf::from(std::env::var("OUT_DIR").unwrap()).join("migrations.rs");
//!     strata::migration::build::write_registry_module("migrations", &out).unwrap();
//!     println!("cargo:rerun-if-changed=migrations");
//! }
//! ```
//!
//! and include the result where the registry is needed:
//!
//! ```rust,ignore
//! mod migrations {
//!     include!(concat!(env!("OUT_DIR"), "/migrations.rs"));
//! }
//!
//! let registry = migrations::registry()?;
//! ```

use crate::migration::file::{discover_migrations, struct_name, MigrationFile};
use crate::migration::MigrationError;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Write a module declaring every artifact in `dir` plus a `registry()` constructor to `out`
///
/// Returns the artifacts included, in application order.
pub fn write_registry_module(
    dir: impl AsRef<Path>,
    out: impl AsRef<Path>,
) -> Result<Vec<MigrationFile>, MigrationError> {
    let dir = dir.as_ref();
    let files = discover_migrations(dir)?;
    let absolute: Vec<MigrationFile> = files
        .into_iter()
        .map(|mut file| {
            file.path = file
                .path
                .map(|p| fs::canonicalize(&p).unwrap_or(p));
            file
        })
        .collect();

    let source = registry_module_source(&absolute);
    let out = out.as_ref();
    fs::write(out, source).map_err(|e| MigrationError::io(out, e))?;
    Ok(absolute)
}

/// Source of the registry module for `files`
pub fn registry_module_source(files: &[MigrationFile]) -> String {
    let mut source = String::from("// @generated by strata::migration::build. Do not edit.\n\n");

    for file in files {
        if let Some(path) = &file.path {
            let _ = writeln!(source, "#[path = {:?}]", path.to_string_lossy());
        }
        let _ = writeln!(source, "mod {};", file.identity());
    }

    source.push_str(
        "\n/// Registry of every migration compiled into this binary\n\
         pub fn registry() -> Result<::strata::migration::MigrationRegistry, ::strata::migration::MigrationError> {\n    \
         let mut registry = ::strata::migration::MigrationRegistry::new();\n",
    );
    for file in files {
        let _ = writeln!(
            source,
            "    registry.register({:?}, {}::{})?;",
            file.filename,
            file.identity(),
            struct_name(&file.name)
        );
    }
    source.push_str("    Ok(registry)\n}\n");
    source
}
