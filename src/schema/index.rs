//! Index and foreign key definitions.

use super::column::quote_ident;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Primary,
    Unique,
    Index,
}

impl IndexKind {
    fn suffix(self) -> &'static str {
        match self {
            IndexKind::Primary => "primary",
            IndexKind::Unique => "unique",
            IndexKind::Index => "index",
        }
    }
}

/// An index over an ordered list of columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDefinition {
    pub kind: IndexKind,
    pub name: String,
    pub columns: Vec<String>,
}

impl IndexDefinition {
    pub fn new(kind: IndexKind, name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            columns,
        }
    }

    /// `{table}_{columns}_{kind}`, or `PRIMARY` for primary keys (MySQL's fixed name)
    pub fn default_name(table: &str, kind: IndexKind, columns: &[String]) -> String {
        match kind {
            IndexKind::Primary => "PRIMARY".to_string(),
            _ => format!("{}_{}_{}", table, columns.join("_"), kind.suffix()),
        }
    }

    /// Clause used inside `CREATE TABLE`
    pub fn to_sql(&self) -> String {
        let columns = column_list(&self.columns);
        match self.kind {
            IndexKind::Primary => format!("PRIMARY KEY ({columns})"),
            IndexKind::Unique => format!("UNIQUE KEY {} ({columns})", quote_ident(&self.name)),
            IndexKind::Index => format!("KEY {} ({columns})", quote_ident(&self.name)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferentialAction {
    #[default]
    Restrict,
    Cascade,
    SetNull,
    NoAction,
}

impl ReferentialAction {
    pub fn as_sql(self) -> &'static str {
        match self {
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::NoAction => "NO ACTION",
        }
    }

    /// Parse a catalog rule (`UPDATE_RULE`/`DELETE_RULE`); unknown rules map to `None`
    pub fn parse(rule: &str) -> Option<Self> {
        match rule.trim().to_ascii_uppercase().as_str() {
            "RESTRICT" => Some(ReferentialAction::Restrict),
            "CASCADE" => Some(ReferentialAction::Cascade),
            "SET NULL" => Some(ReferentialAction::SetNull),
            "NO ACTION" => Some(ReferentialAction::NoAction),
            _ => None,
        }
    }
}

impl fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// A foreign key constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyDefinition {
    pub name: String,
    pub columns: Vec<String>,
    pub references_table: String,
    pub references_columns: Vec<String>,
    pub on_delete: ReferentialAction,
    pub on_update: ReferentialAction,
}

impl ForeignKeyDefinition {
    pub fn default_name(table: &str, columns: &[String]) -> String {
        format!("{}_{}_foreign", table, columns.join("_"))
    }

    /// Clause used inside `CREATE TABLE` (and after `ALTER TABLE .. ADD`)
    pub fn to_sql(&self) -> String {
        format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {} ON UPDATE {}",
            quote_ident(&self.name),
            column_list(&self.columns),
            quote_ident(&self.references_table),
            column_list(&self.references_columns),
            self.on_delete,
            self.on_update,
        )
    }
}

pub(crate) fn column_list(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ")
}
