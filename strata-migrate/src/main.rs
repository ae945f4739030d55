//! strata-migrate binary
//!
//! Runs the CLI with an empty registry: `status`, `generate`, `generate-from-table`,
//! `generate-all` and `mark-applied` work as is. Applications that need `run`/`rollback` embed
//! [`strata_migrate::run_cli`] with their compiled migrations.

use strata::migration::MigrationRegistry;
use std::process;

fn main() {
    let registry = MigrationRegistry::new();
    process::exit(strata_migrate::run_cli(&registry));
}
