//! SchemaInspector - reads MySQL catalog metadata and normalizes it into the blueprint model
//!
//! The inspector only reads. Column rows come from `SHOW FULL COLUMNS`, index rows from
//! `SHOW INDEX`, foreign keys from `information_schema.KEY_COLUMN_USAGE` joined with
//! `REFERENTIAL_CONSTRAINTS`, and table options from `information_schema.TABLES`.

pub mod snapshot;
pub mod types;

pub use snapshot::{InspectedColumn, SchemaSnapshot, TableOptions};
pub use types::{parse_default, parse_generated_default, parse_type_string, ParsedType};

use crate::executor::{StrataError, StrataExecutor};
use crate::schema::column::quote_ident;
use crate::schema::{
    ColumnDefinition, ForeignKeyDefinition, IndexDefinition, IndexKind, ReferentialAction,
    SchemaGateway,
};
use crate::value::Row;
use log::warn;

/// Statement prefix for index rows, `SHOW INDEX FROM `table``
pub(crate) const SHOW_INDEX_PREFIX: &str = "SHOW INDEX FROM ";

pub(crate) const FOREIGN_KEYS_SQL: &str = "SELECT kcu.CONSTRAINT_NAME AS constraint_name, \
     kcu.COLUMN_NAME AS column_name, \
     kcu.REFERENCED_TABLE_NAME AS referenced_table_name, \
     kcu.REFERENCED_COLUMN_NAME AS referenced_column_name, \
     rc.UPDATE_RULE AS update_rule, rc.DELETE_RULE AS delete_rule \
     FROM information_schema.KEY_COLUMN_USAGE kcu \
     JOIN information_schema.REFERENTIAL_CONSTRAINTS rc \
       ON rc.CONSTRAINT_SCHEMA = kcu.CONSTRAINT_SCHEMA AND rc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME \
     WHERE kcu.TABLE_SCHEMA = DATABASE() AND kcu.TABLE_NAME = ? AND kcu.REFERENCED_TABLE_NAME IS NOT NULL \
     ORDER BY kcu.CONSTRAINT_NAME, kcu.ORDINAL_POSITION";

pub(crate) const TABLE_OPTIONS_SQL: &str = "SELECT t.ENGINE AS engine, t.TABLE_COLLATION AS collation, \
     c.CHARACTER_SET_NAME AS charset, t.TABLE_COMMENT AS comment \
     FROM information_schema.TABLES t \
     LEFT JOIN information_schema.COLLATION_CHARACTER_SET_APPLICABILITY c \
       ON c.COLLATION_NAME = t.TABLE_COLLATION \
     WHERE t.TABLE_SCHEMA = DATABASE() AND t.TABLE_NAME = ?";

/// Read-only view over the current schema's catalog
pub struct SchemaInspector<'a> {
    executor: &'a dyn StrataExecutor,
}

impl<'a> SchemaInspector<'a> {
    pub fn new(executor: &'a dyn StrataExecutor) -> Self {
        Self { executor }
    }

    pub fn tables(&self) -> Result<Vec<String>, StrataError> {
        SchemaGateway::new(self.executor).tables()
    }

    pub fn has_table(&self, table: &str) -> Result<bool, StrataError> {
        SchemaGateway::new(self.executor).has_table(table)
    }

    /// Full structure of `table`
    ///
    /// # Errors
    ///
    /// `StrataError::NotFound` if the table does not exist, `StrataError::UnsupportedType` if a
    /// column uses a type the blueprint cannot declare, `StrataError::UnsupportedIndex` if an
    /// index indexes a column prefix.
    pub fn snapshot(&self, table: &str) -> Result<SchemaSnapshot, StrataError> {
        if !self.has_table(table)? {
            return Err(StrataError::not_found("table", table));
        }
        Ok(SchemaSnapshot {
            table: table.to_string(),
            columns: self.columns(table)?,
            indexes: self.indexes(table)?,
            foreign_keys: self.foreign_keys(table)?,
            options: self.table_options(table)?,
        })
    }

    /// Columns in ordinal order
    pub fn columns(&self, table: &str) -> Result<Vec<InspectedColumn>, StrataError> {
        SchemaGateway::new(self.executor)
            .columns(table)?
            .iter()
            .map(|row| column_from_row(table, row))
            .collect()
    }

    /// Indexes grouped by name, in the order the catalog first reports them
    pub fn indexes(&self, table: &str) -> Result<Vec<IndexDefinition>, StrataError> {
        let rows = self
            .executor
            .query_all(&format!("{SHOW_INDEX_PREFIX}{}", quote_ident(table)), &[])?;
        group_indexes(table, &rows)
    }

    /// Foreign keys grouped by constraint name
    pub fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyDefinition>, StrataError> {
        let rows = self.executor.query_all(FOREIGN_KEYS_SQL, &[table.into()])?;
        Ok(group_foreign_keys(&rows))
    }

    pub fn table_options(&self, table: &str) -> Result<TableOptions, StrataError> {
        let row = self.executor.query_one(TABLE_OPTIONS_SQL, &[table.into()])?;
        Ok(row
            .map(|row| TableOptions {
                engine: row.get_string("engine"),
                charset: row.get_string("charset"),
                collation: row.get_string("collation"),
                comment: row.get_string("comment"),
            })
            .unwrap_or_default())
    }
}

/// Normalize one `SHOW FULL COLUMNS` row
pub fn column_from_row(table: &str, row: &Row) -> Result<InspectedColumn, StrataError> {
    let name = row
        .get_string("Field")
        .ok_or_else(|| StrataError::Parse(format!("column row for `{table}` has no Field")))?;
    let raw_type = row.get_string("Type").unwrap_or_default();
    let parsed = parse_type_string(&raw_type);
    let column_type = parsed
        .column_type()
        .ok_or_else(|| StrataError::UnsupportedType {
            table: table.to_string(),
            column: name.clone(),
            raw: raw_type.clone(),
        })?;
    let extra = row.get_string("Extra").unwrap_or_default().to_ascii_lowercase();

    let mut definition = ColumnDefinition::new(name, column_type);
    definition.unsigned = parsed.unsigned && definition.column_type.accepts_unsigned();
    definition.nullable = row
        .get_string("Null")
        .is_some_and(|n| n.eq_ignore_ascii_case("YES"));
    definition.auto_increment = extra.contains("auto_increment");
    definition.on_update_current_timestamp = extra.contains("on update current_timestamp");
    let default = row.get_string("Default");
    definition.default = if extra.contains("default_generated") {
        parse_generated_default(default.as_deref())
    } else {
        parse_default(default.as_deref(), &definition.column_type)
    };
    definition.comment = row.get_string("Comment").filter(|c| !c.is_empty());

    Ok(InspectedColumn {
        definition,
        raw_type,
    })
}

/// Merge per-column `SHOW INDEX` rows into one definition per index
///
/// # Errors
///
/// `StrataError::UnsupportedIndex` for a key part over a column prefix (`Sub_part`), which the
/// blueprint cannot declare and MySQL requires on `TEXT` columns.
pub fn group_indexes(table: &str, rows: &[Row]) -> Result<Vec<IndexDefinition>, StrataError> {
    // (definition, per-column sequence numbers)
    let mut grouped: Vec<(IndexDefinition, Vec<i64>)> = Vec::new();
    let mut skipped: Vec<String> = Vec::new();

    for row in rows {
        let Some(name) = row.get_string("Key_name") else {
            continue;
        };
        let index_type = row.get_string("Index_type").unwrap_or_default();
        let column = row.get_string("Column_name");
        // Fulltext/spatial indexes and functional key parts have no blueprint form
        if index_type.eq_ignore_ascii_case("FULLTEXT")
            || index_type.eq_ignore_ascii_case("SPATIAL")
            || column.is_none()
        {
            if !skipped.contains(&name) {
                warn!("skipping index `{name}` on `{table}`: not expressible as a blueprint index");
                skipped.push(name);
            }
            continue;
        }
        let Some(column) = column else { continue };
        if let Some(length) = row.get_i64("Sub_part") {
            return Err(StrataError::UnsupportedIndex {
                table: table.to_string(),
                index: name,
                detail: format!("key part `{column}({length})` indexes a column prefix"),
            });
        }
        let seq = row.get_i64("Seq_in_index").unwrap_or(0);

        match grouped.iter_mut().find(|(def, _)| def.name == name) {
            Some((def, seqs)) => {
                def.columns.push(column);
                seqs.push(seq);
            }
            None => {
                let kind = if name == "PRIMARY" {
                    IndexKind::Primary
                } else if row.get_i64("Non_unique") == Some(0) {
                    IndexKind::Unique
                } else {
                    IndexKind::Index
                };
                grouped.push((IndexDefinition::new(kind, name, vec![column]), vec![seq]));
            }
        }
    }

    Ok(grouped
        .into_iter()
        .filter(|(def, _)| !skipped.contains(&def.name))
        .map(|(mut def, seqs)| {
            let mut paired: Vec<(i64, String)> = seqs.into_iter().zip(def.columns).collect();
            paired.sort_by_key(|(seq, _)| *seq);
            def.columns = paired.into_iter().map(|(_, c)| c).collect();
            def
        })
        .collect())
}

/// Merge per-column foreign key rows into one definition per constraint
pub fn group_foreign_keys(rows: &[Row]) -> Vec<ForeignKeyDefinition> {
    let mut grouped: Vec<ForeignKeyDefinition> = Vec::new();

    for row in rows {
        let (Some(name), Some(column), Some(target), Some(target_column)) = (
            row.get_string("constraint_name"),
            row.get_string("column_name"),
            row.get_string("referenced_table_name"),
            row.get_string("referenced_column_name"),
        ) else {
            continue;
        };

        match grouped.iter_mut().find(|fk| fk.name == name) {
            Some(fk) => {
                fk.columns.push(column);
                fk.references_columns.push(target_column);
            }
            None => grouped.push(ForeignKeyDefinition {
                name,
                columns: vec![column],
                references_table: target,
                references_columns: vec![target_column],
                on_delete: rule(row, "delete_rule"),
                on_update: rule(row, "update_rule"),
            }),
        }
    }
    grouped
}

fn rule(row: &Row, column: &str) -> ReferentialAction {
    row.get_string(column)
        .and_then(|r| ReferentialAction::parse(&r))
        .unwrap_or_default()
}
