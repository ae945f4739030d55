//! SchemaGateway - executes blueprints and schema utility statements
//!
//! Every operation issues its statements immediately, one at a time. Transaction scoping is the
//! caller's concern; the migration manager hands each migration a gateway over a transaction.

use super::blueprint::Blueprint;
use super::column::{quote_ident, quote_literal};
use super::index::{ForeignKeyDefinition, IndexDefinition, IndexKind};
use crate::executor::{StrataError, StrataExecutor};
use crate::inspect::types::{is_current_timestamp, parse_type_string};
use crate::value::Row;
use log::debug;

pub(crate) const HAS_TABLE_SQL: &str = "SELECT COUNT(*) AS aggregate FROM information_schema.tables \
     WHERE table_schema = DATABASE() AND table_name = ? AND table_type = 'BASE TABLE'";

pub(crate) const HAS_COLUMN_SQL: &str = "SELECT COUNT(*) AS aggregate FROM information_schema.columns \
     WHERE table_schema = DATABASE() AND table_name = ? AND column_name = ?";

pub(crate) const LIST_TABLES_SQL: &str = "SELECT table_name AS name FROM information_schema.tables \
     WHERE table_schema = DATABASE() AND table_type = 'BASE TABLE' ORDER BY table_name";

/// Statement prefix for raw column metadata, `SHOW FULL COLUMNS FROM `table``
pub(crate) const SHOW_COLUMNS_PREFIX: &str = "SHOW FULL COLUMNS FROM ";

/// Schema operations available to migrations
///
/// # Example
///
/// ```rust,no_run
/// use strata::schema::SchemaGateway;
/// # fn demo(schema: &SchemaGateway<'_>) -> Result<(), strata::StrataError> {
/// schema.create("users", |table| {
///     table.id("id");
///     table.string("email", 255);
///     table.unique(&["email"]);
/// })?;
///
/// schema.alter_table("users", |table| {
///     table.string("phone", 32).nullable().after("email");
/// })?;
/// # Ok(())
/// # }
/// ```
pub struct SchemaGateway<'a> {
    executor: &'a dyn StrataExecutor,
}

impl<'a> SchemaGateway<'a> {
    pub fn new(executor: &'a dyn StrataExecutor) -> Self {
        Self { executor }
    }

    /// Get a reference to the underlying executor
    pub fn executor(&self) -> &'a dyn StrataExecutor {
        self.executor
    }

    /// Create a table from a blueprint populated by `define`
    pub fn create<F>(&self, table: &str, define: F) -> Result<(), StrataError>
    where
        F: FnOnce(&mut Blueprint),
    {
        let mut blueprint = Blueprint::new(table);
        define(&mut blueprint);
        let sql = blueprint.to_create_sql()?;
        self.statement(&sql)
    }

    /// Add the columns declared by `define` to an existing table
    ///
    /// Columns are added one `ALTER TABLE` at a time; indexes and foreign keys declared on the
    /// blueprint follow as their own statements.
    pub fn alter_table<F>(&self, table: &str, define: F) -> Result<(), StrataError>
    where
        F: FnOnce(&mut Blueprint),
    {
        let mut blueprint = Blueprint::new(table);
        define(&mut blueprint);
        for sql in blueprint.to_alter_sql()? {
            self.statement(&sql)?;
        }
        for index in blueprint.indexes() {
            self.add_index(table, index)?;
        }
        for foreign_key in blueprint.foreign_keys() {
            self.add_foreign_key(table, foreign_key)?;
        }
        Ok(())
    }

    pub fn drop(&self, table: &str) -> Result<(), StrataError> {
        self.statement(&format!("DROP TABLE {}", quote_ident(table)))
    }

    pub fn drop_if_exists(&self, table: &str) -> Result<(), StrataError> {
        self.statement(&format!("DROP TABLE IF EXISTS {}", quote_ident(table)))
    }

    pub fn rename(&self, from: &str, to: &str) -> Result<(), StrataError> {
        self.statement(&format!(
            "RENAME TABLE {} TO {}",
            quote_ident(from),
            quote_ident(to)
        ))
    }

    pub fn has_table(&self, table: &str) -> Result<bool, StrataError> {
        let row = self.executor.query_one(HAS_TABLE_SQL, &[table.into()])?;
        Ok(count_of(row) > 0)
    }

    pub fn has_column(&self, table: &str, column: &str) -> Result<bool, StrataError> {
        let row = self
            .executor
            .query_one(HAS_COLUMN_SQL, &[table.into(), column.into()])?;
        Ok(count_of(row) > 0)
    }

    /// Drop one or more columns in a single statement
    pub fn drop_columns(&self, table: &str, columns: &[&str]) -> Result<(), StrataError> {
        if columns.is_empty() {
            return Ok(());
        }
        let drops: Vec<String> = columns
            .iter()
            .map(|c| format!("DROP COLUMN {}", quote_ident(c)))
            .collect();
        self.statement(&format!(
            "ALTER TABLE {} {}",
            quote_ident(table),
            drops.join(", ")
        ))
    }

    pub fn drop_column(&self, table: &str, column: &str) -> Result<(), StrataError> {
        self.drop_columns(table, &[column])
    }

    /// Rename a column, carrying over its current type, nullability, default and comment
    pub fn rename_column(&self, table: &str, from: &str, to: &str) -> Result<(), StrataError> {
        let columns = self.columns(table)?;
        let current = columns
            .iter()
            .find(|row| row.get_string("Field").as_deref() == Some(from))
            .ok_or_else(|| StrataError::not_found("column", format!("{table}.{from}")))?;

        self.statement(&format!(
            "ALTER TABLE {} CHANGE {} {} {}",
            quote_ident(table),
            quote_ident(from),
            quote_ident(to),
            catalog_column_definition(current)
        ))
    }

    /// Base table names in the current schema, sorted
    pub fn tables(&self) -> Result<Vec<String>, StrataError> {
        Ok(self
            .executor
            .query_all(LIST_TABLES_SQL, &[])?
            .iter()
            .filter_map(|row| row.get_string("name"))
            .collect())
    }

    /// Raw `SHOW FULL COLUMNS` rows for `table`, in ordinal order
    pub fn columns(&self, table: &str) -> Result<Vec<Row>, StrataError> {
        self.executor
            .query_all(&format!("{SHOW_COLUMNS_PREFIX}{}", quote_ident(table)), &[])
    }

    pub fn add_index(&self, table: &str, index: &IndexDefinition) -> Result<(), StrataError> {
        if index.columns.is_empty() {
            return Err(StrataError::InvalidDefinition(format!(
                "index `{}` on `{table}` has no columns",
                index.name
            )));
        }
        self.statement(&format!("ALTER TABLE {} ADD {}", quote_ident(table), index.to_sql()))
    }

    pub fn drop_index(&self, table: &str, name: &str) -> Result<(), StrataError> {
        let clause = if name == IndexDefinition::default_name(table, IndexKind::Primary, &[]) {
            "DROP PRIMARY KEY".to_string()
        } else {
            format!("DROP INDEX {}", quote_ident(name))
        };
        self.statement(&format!("ALTER TABLE {} {clause}", quote_ident(table)))
    }

    pub fn add_foreign_key(
        &self,
        table: &str,
        foreign_key: &ForeignKeyDefinition,
    ) -> Result<(), StrataError> {
        if foreign_key.references_table.is_empty()
            || foreign_key.columns.len() != foreign_key.references_columns.len()
        {
            return Err(StrataError::InvalidDefinition(format!(
                "foreign key `{}` is incomplete",
                foreign_key.name
            )));
        }
        self.statement(&format!(
            "ALTER TABLE {} ADD {}",
            quote_ident(table),
            foreign_key.to_sql()
        ))
    }

    pub fn drop_foreign_key(&self, table: &str, name: &str) -> Result<(), StrataError> {
        self.statement(&format!(
            "ALTER TABLE {} DROP FOREIGN KEY {}",
            quote_ident(table),
            quote_ident(name)
        ))
    }

    pub fn disable_foreign_key_checks(&self) -> Result<(), StrataError> {
        self.statement("SET FOREIGN_KEY_CHECKS=0")
    }

    pub fn enable_foreign_key_checks(&self) -> Result<(), StrataError> {
        self.statement("SET FOREIGN_KEY_CHECKS=1")
    }

    /// Execute raw SQL
    pub fn statement(&self, sql: &str) -> Result<(), StrataError> {
        debug!("schema: {sql}");
        self.executor.execute(sql, &[]).map(|_| ())
    }
}

fn count_of(row: Option<Row>) -> i64 {
    row.and_then(|r| r.get_i64("aggregate")).unwrap_or(0)
}

/// Rebuild a column definition clause from a `SHOW FULL COLUMNS` row
///
/// The raw `Type` is reused verbatim so types the blueprint cannot declare survive a rename.
fn catalog_column_definition(row: &Row) -> String {
    let raw_type = row.get_string("Type").unwrap_or_default();
    let nullable = row.get_string("Null").as_deref() == Some("YES");
    let raw_extra = row.get_string("Extra").unwrap_or_default();
    let extra = raw_extra.to_ascii_lowercase();

    let mut sql = raw_type.clone();
    sql.push_str(if nullable { " NULL" } else { " NOT NULL" });
    if extra.contains("auto_increment") {
        sql.push_str(" AUTO_INCREMENT");
    }
    if let Some(default) = row.get_string("Default") {
        sql.push_str(" DEFAULT ");
        // the catalog text keeps the fractional precision, `CURRENT_TIMESTAMP(6)`
        if is_current_timestamp(&default) {
            sql.push_str(&default);
        } else if extra.contains("default_generated") {
            sql.push('(');
            sql.push_str(&default);
            sql.push(')');
        } else if parse_type_string(&raw_type).is_numeric() {
            sql.push_str(&default);
        } else {
            sql.push_str(&quote_literal(&default));
        }
    }
    if let Some(start) = extra.find("on update ") {
        let target = raw_extra[start + "on update ".len()..]
            .split_whitespace()
            .next()
            .unwrap_or("CURRENT_TIMESTAMP");
        sql.push_str(" ON UPDATE ");
        sql.push_str(target);
    }
    if let Some(comment) = row.get_string("Comment").filter(|c| !c.is_empty()) {
        sql.push_str(" COMMENT ");
        sql.push_str(&quote_literal(&comment));
    }
    sql
}
