//! Ledger table management
//!
//! One row per applied migration: `id`, `migration` (artifact filename, unique), `batch` and
//! `applied_at`. Rows are inserted after a successful `up()` and deleted after a successful
//! `down()`, always through the executor running the migration's transaction.

use crate::executor::{StrataError, StrataExecutor};
use crate::schema::column::quote_ident;
use chrono::NaiveDateTime;
use sea_query::{Alias, ColumnDef, Expr, MysqlQueryBuilder, Table};
use serde::Serialize;

/// Ledger table used when none is configured
pub const DEFAULT_LEDGER_TABLE: &str = "migrations";

/// One applied migration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub migration: String,
    pub batch: i64,
    pub applied_at: Option<NaiveDateTime>,
}

/// `CREATE TABLE IF NOT EXISTS` statement for the ledger named `table`
pub fn create_ledger_table(table: &str) -> String {
    Table::create()
        .table(Alias::new(table))
        .if_not_exists()
        .col(
            ColumnDef::new(Alias::new("id"))
                .unsigned()
                .not_null()
                .auto_increment()
                .primary_key(),
        )
        .col(
            ColumnDef::new(Alias::new("migration"))
                .string_len(255)
                .not_null()
                .unique_key(),
        )
        .col(ColumnDef::new(Alias::new("batch")).integer().not_null())
        .col(
            ColumnDef::new(Alias::new("applied_at"))
                .timestamp()
                .not_null()
                .default(Expr::current_timestamp()),
        )
        .to_owned()
        .build(MysqlQueryBuilder)
}

/// Ledger reads and writes through one executor
pub struct Ledger<'a> {
    executor: &'a dyn StrataExecutor,
    table: &'a str,
}

impl<'a> Ledger<'a> {
    pub fn new(executor: &'a dyn StrataExecutor, table: &'a str) -> Self {
        Self { executor, table }
    }

    pub fn table(&self) -> &str {
        self.table
    }

    /// Create the ledger table if it does not exist yet
    pub fn ensure(&self) -> Result<(), StrataError> {
        self.executor
            .execute(&create_ledger_table(self.table), &[])
            .map(|_| ())
    }

    pub fn exists(&self) -> Result<bool, StrataError> {
        crate::schema::SchemaGateway::new(self.executor).has_table(self.table)
    }

    /// Every ledger row in insertion order
    pub fn entries(&self) -> Result<Vec<LedgerEntry>, StrataError> {
        let sql = format!(
            "SELECT id, migration, batch, applied_at FROM {} ORDER BY id",
            quote_ident(self.table)
        );
        self.executor
            .query_all(&sql, &[])?
            .iter()
            .map(|row| {
                let migration = row
                    .get_string("migration")
                    .ok_or_else(|| StrataError::Parse("ledger row without migration".to_string()))?;
                Ok(LedgerEntry {
                    id: row.get_i64("id").unwrap_or_default(),
                    migration,
                    batch: row.get_i64("batch").unwrap_or_default(),
                    applied_at: row.get_timestamp("applied_at"),
                })
            })
            .collect()
    }

    /// Record `migration` under `batch`
    ///
    /// # Errors
    ///
    /// `StrataError::UniqueViolation` if the ledger already holds `migration`.
    pub fn record(&self, migration: &str, batch: i64) -> Result<(), StrataError> {
        let sql = format!(
            "INSERT INTO {} (migration, batch) VALUES (?, ?)",
            quote_ident(self.table)
        );
        self.executor
            .execute(&sql, &[migration.into(), batch.into()])
            .map(|_| ())
    }

    /// Record `migration` unless it is already present; returns whether a row was written
    pub fn record_if_absent(&self, migration: &str, batch: i64) -> Result<bool, StrataError> {
        let sql = format!(
            "INSERT IGNORE INTO {} (migration, batch) VALUES (?, ?)",
            quote_ident(self.table)
        );
        Ok(self.executor.execute(&sql, &[migration.into(), batch.into()])? > 0)
    }

    pub fn remove(&self, migration: &str) -> Result<(), StrataError> {
        let sql = format!("DELETE FROM {} WHERE migration = ?", quote_ident(self.table));
        self.executor.execute(&sql, &[migration.into()]).map(|_| ())
    }
}

/// Highest batch number among `entries`, 0 when empty
pub fn last_batch(entries: &[LedgerEntry]) -> i64 {
    entries.iter().map(|e| e.batch).max().unwrap_or(0)
}
