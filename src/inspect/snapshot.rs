//! Point-in-time structure of one live table.

use crate::schema::{
    ColumnDefinition, ForeignKeyDefinition, IndexDefinition, IndexKind, DEFAULT_CHARSET,
    DEFAULT_COLLATION, DEFAULT_ENGINE,
};

/// A catalog column normalized into the blueprint model, with its raw type kept for reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectedColumn {
    pub definition: ColumnDefinition,
    pub raw_type: String,
}

/// Table-level options as reported by `information_schema.TABLES`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableOptions {
    pub engine: Option<String>,
    pub charset: Option<String>,
    pub collation: Option<String>,
    pub comment: Option<String>,
}

impl TableOptions {
    /// Engine when it differs from the blueprint default
    pub fn engine_override(&self) -> Option<&str> {
        differs(self.engine.as_deref(), DEFAULT_ENGINE)
    }

    pub fn charset_override(&self) -> Option<&str> {
        differs(self.charset.as_deref(), DEFAULT_CHARSET)
    }

    pub fn collation_override(&self) -> Option<&str> {
        differs(self.collation.as_deref(), DEFAULT_COLLATION)
    }

    pub fn comment_override(&self) -> Option<&str> {
        self.comment.as_deref().filter(|c| !c.is_empty())
    }
}

fn differs<'a>(value: Option<&'a str>, default: &str) -> Option<&'a str> {
    value.filter(|v| !v.eq_ignore_ascii_case(default))
}

/// Structure of one table as read from the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaSnapshot {
    pub table: String,
    pub columns: Vec<InspectedColumn>,
    pub indexes: Vec<IndexDefinition>,
    pub foreign_keys: Vec<ForeignKeyDefinition>,
    pub options: TableOptions,
}

impl SchemaSnapshot {
    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns
            .iter()
            .map(|c| &c.definition)
            .find(|c| c.name == name)
    }

    pub fn primary_key(&self) -> Option<&IndexDefinition> {
        self.indexes.iter().find(|i| i.kind == IndexKind::Primary)
    }

    /// Tables this one references through foreign keys, excluding itself
    pub fn referenced_tables(&self) -> Vec<&str> {
        let mut tables: Vec<&str> = self
            .foreign_keys
            .iter()
            .map(|fk| fk.references_table.as_str())
            .filter(|t| *t != self.table)
            .collect();
        tables.sort_unstable();
        tables.dedup();
        tables
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ReferentialAction;

    #[test]
    fn test_option_overrides() {
        let options = TableOptions {
            engine: Some("innodb".into()),
            charset: Some("latin1".into()),
            collation: Some("utf8mb4_unicode_ci".into()),
            comment: Some(String::new()),
        };
        assert_eq!(options.engine_override(), None);
        assert_eq!(options.charset_override(), Some("latin1"));
        assert_eq!(options.collation_override(), None);
        assert_eq!(options.comment_override(), None);
    }

    #[test]
    fn test_referenced_tables_skip_self_references() {
        let fk = |name: &str, target: &str| ForeignKeyDefinition {
            name: name.into(),
            columns: vec!["x".into()],
            references_table: target.into(),
            references_columns: vec!["id".into()],
            on_delete: ReferentialAction::Restrict,
            on_update: ReferentialAction::Restrict,
        };
        let snapshot = SchemaSnapshot {
            table: "categories".into(),
            columns: vec![],
            indexes: vec![],
            foreign_keys: vec![fk("a", "categories"), fk("b", "users"), fk("c", "users")],
            options: TableOptions::default(),
        };
        assert_eq!(snapshot.referenced_tables(), vec!["users"]);
    }
}
