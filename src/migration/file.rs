//! Migration file discovery and parsing

use crate::migration::MigrationError;
use log::debug;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// `{YYYYMMDDHHMMSS}_{description}.rs`
const FILENAME_PATTERN: &str = r"^(\d{14})_([A-Za-z0-9_]+)\.rs$";

/// A migration artifact identified by its filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    /// Artifact filename; the ledger key
    pub filename: String,

    /// Leading timestamp (YYYYMMDDHHMMSS)
    pub version: i64,

    /// Description following the timestamp
    pub name: String,

    /// Location on disk, when discovered from a directory
    pub path: Option<PathBuf>,
}

impl MigrationFile {
    /// Parse an artifact filename
    ///
    /// # Example
    /// - `20240120120000_create_users_table.rs` → version: 20240120120000, name: "create_users_table"
    pub fn parse_filename(filename: &str) -> Result<Self, MigrationError> {
        let re = Regex::new(FILENAME_PATTERN)
            .map_err(|e| MigrationError::InvalidFormat(format!("Invalid regex: {e}")))?;

        let caps = re.captures(filename).ok_or_else(|| {
            MigrationError::InvalidFormat(format!(
                "Invalid migration filename '{filename}'. Expected format: YYYYMMDDHHMMSS_description.rs"
            ))
        })?;
        let (Some(version), Some(name)) = (caps.get(1), caps.get(2)) else {
            return Err(MigrationError::InvalidFormat(filename.to_string()));
        };
        let version = version
            .as_str()
            .parse::<i64>()
            .map_err(|e| MigrationError::InvalidFormat(format!("{filename}: {e}")))?;

        Ok(Self {
            filename: filename.to_string(),
            version,
            name: name.as_str().to_string(),
            path: None,
        })
    }

    /// Registry identity: `m` followed by the filename stem, a valid Rust module name
    pub fn identity(&self) -> String {
        identity_of(&self.filename)
    }
}

/// `20240101000000_create_users.rs` → `m20240101000000_create_users`
pub fn identity_of(filename: &str) -> String {
    format!("m{}", filename.strip_suffix(".rs").unwrap_or(filename))
}

/// Name of the struct an artifact declares: the description in PascalCase
///
/// `create_users_table` → `CreateUsersTable`; a leading digit gets an `M` prefix.
pub fn struct_name(description: &str) -> String {
    let name: String = description
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect();
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        format!("M{name}")
    } else {
        name
    }
}

/// Discover migration artifacts in a directory, sorted by filename
///
/// Only files matching the artifact naming convention are returned; other files (a `mod.rs`,
/// notes, backups) are skipped.
///
/// # Errors
///
/// Returns `MigrationError::Io` if the directory cannot be read and
/// `MigrationError::InvalidFormat` if the path is not a directory.
pub fn discover_migrations(migrations_dir: &Path) -> Result<Vec<MigrationFile>, MigrationError> {
    if !migrations_dir.is_dir() {
        if !migrations_dir.exists() {
            return Err(MigrationError::io(
                migrations_dir,
                std::io::Error::new(std::io::ErrorKind::NotFound, "migrations directory not found"),
            ));
        }
        return Err(MigrationError::InvalidFormat(format!(
            "Path is not a directory: {}",
            migrations_dir.display()
        )));
    }

    let entries = fs::read_dir(migrations_dir).map_err(|e| MigrationError::io(migrations_dir, e))?;
    let mut migrations = Vec::new();

    for entry in entries {
        let entry = entry.map_err(|e| MigrationError::io(migrations_dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        match MigrationFile::parse_filename(filename) {
            Ok(mut file) => {
                file.path = Some(path.clone());
                migrations.push(file);
            }
            Err(_) => debug!("skipping non-migration file {}", path.display()),
        }
    }

    migrations.sort_by(|a, b| a.filename.cmp(&b.filename));
    Ok(migrations)
}
