//! Table blueprint: the fluent schema DSL and its DDL compiler.
//!
//! A blueprint is built fresh for one schema operation, populated by a callback, compiled to SQL
//! and dropped.
//!
//! # Example
//!
//! ```rust
//! use strata::schema::Blueprint;
//!
//! let mut table = Blueprint::new("users");
//! table.id("id");
//! table.string("name", 255);
//! table.string("email", 255);
//! table.unique(&["email"]);
//! table.timestamps();
//!
//! let sql = table.to_create_sql().unwrap();
//! assert!(sql.starts_with("CREATE TABLE `users` ("));
//! ```

use super::column::{quote_ident, quote_literal, ColumnDefinition, ColumnType, DefaultValue};
use super::index::{ForeignKeyDefinition, IndexDefinition, IndexKind, ReferentialAction};
use crate::executor::StrataError;

pub const DEFAULT_ENGINE: &str = "InnoDB";
pub const DEFAULT_CHARSET: &str = "utf8mb4";
pub const DEFAULT_COLLATION: &str = "utf8mb4_unicode_ci";

/// MySQL's limit for table, column, index and constraint names
pub const MAX_IDENTIFIER_LENGTH: usize = 64;

/// Largest fractional seconds precision MySQL accepts
const MAX_FRACTIONAL_PRECISION: u32 = 6;

/// Declarative description of one table
#[derive(Debug, Clone)]
pub struct Blueprint {
    table: String,
    columns: Vec<ColumnDefinition>,
    primary_column: Option<String>,
    indexes: Vec<IndexDefinition>,
    foreign_keys: Vec<ForeignKeyDefinition>,
    engine: String,
    charset: String,
    collation: String,
    comment: Option<String>,
}

impl Blueprint {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            primary_column: None,
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            engine: DEFAULT_ENGINE.to_string(),
            charset: DEFAULT_CHARSET.to_string(),
            collation: DEFAULT_COLLATION.to_string(),
            comment: None,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    pub fn primary_column(&self) -> Option<&str> {
        self.primary_column.as_deref()
    }

    pub fn indexes(&self) -> &[IndexDefinition] {
        &self.indexes
    }

    pub fn foreign_keys(&self) -> &[ForeignKeyDefinition] {
        &self.foreign_keys
    }

    pub fn engine_name(&self) -> &str {
        &self.engine
    }

    pub fn charset_name(&self) -> &str {
        &self.charset
    }

    pub fn collation_name(&self) -> &str {
        &self.collation
    }

    pub fn comment_text(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    // ----- columns -----

    /// Append a column of any type
    pub fn column(&mut self, name: &str, column_type: ColumnType) -> &mut Self {
        self.columns.push(ColumnDefinition::new(name, column_type));
        self
    }

    /// Auto-incrementing `BIGINT UNSIGNED` primary key
    pub fn id(&mut self, name: &str) -> &mut Self {
        self.key_column(name, ColumnType::BigInteger)
    }

    /// Auto-incrementing `INT UNSIGNED` primary key
    pub fn increments(&mut self, name: &str) -> &mut Self {
        self.key_column(name, ColumnType::Integer)
    }

    fn key_column(&mut self, name: &str, column_type: ColumnType) -> &mut Self {
        let mut column = ColumnDefinition::new(name, column_type);
        column.unsigned = true;
        column.auto_increment = true;
        self.columns.push(column);
        self.primary_column = Some(name.to_string());
        self
    }

    pub fn string(&mut self, name: &str, length: u32) -> &mut Self {
        self.column(name, ColumnType::String { length })
    }

    pub fn char(&mut self, name: &str, length: u32) -> &mut Self {
        self.column(name, ColumnType::Char { length })
    }

    pub fn text(&mut self, name: &str) -> &mut Self {
        self.column(name, ColumnType::Text)
    }

    pub fn medium_text(&mut self, name: &str) -> &mut Self {
        self.column(name, ColumnType::MediumText)
    }

    pub fn long_text(&mut self, name: &str) -> &mut Self {
        self.column(name, ColumnType::LongText)
    }

    pub fn tiny_integer(&mut self, name: &str) -> &mut Self {
        self.column(name, ColumnType::TinyInteger)
    }

    pub fn small_integer(&mut self, name: &str) -> &mut Self {
        self.column(name, ColumnType::SmallInteger)
    }

    pub fn medium_integer(&mut self, name: &str) -> &mut Self {
        self.column(name, ColumnType::MediumInteger)
    }

    pub fn integer(&mut self, name: &str) -> &mut Self {
        self.column(name, ColumnType::Integer)
    }

    pub fn big_integer(&mut self, name: &str) -> &mut Self {
        self.column(name, ColumnType::BigInteger)
    }

    pub fn boolean(&mut self, name: &str) -> &mut Self {
        self.column(name, ColumnType::Boolean)
    }

    pub fn decimal(&mut self, name: &str, precision: u32, scale: u32) -> &mut Self {
        self.column(name, ColumnType::Decimal { precision, scale })
    }

    pub fn float(&mut self, name: &str) -> &mut Self {
        self.column(name, ColumnType::Float)
    }

    pub fn double(&mut self, name: &str) -> &mut Self {
        self.column(name, ColumnType::Double)
    }

    pub fn date(&mut self, name: &str) -> &mut Self {
        self.column(name, ColumnType::Date)
    }

    pub fn date_time(&mut self, name: &str) -> &mut Self {
        self.column(name, ColumnType::DateTime { precision: 0 })
    }

    pub fn time(&mut self, name: &str) -> &mut Self {
        self.column(name, ColumnType::Time { precision: 0 })
    }

    pub fn timestamp(&mut self, name: &str) -> &mut Self {
        self.column(name, ColumnType::Timestamp { precision: 0 })
    }

    pub fn year(&mut self, name: &str) -> &mut Self {
        self.column(name, ColumnType::Year)
    }

    /// Nullable `created_at` and `updated_at` timestamps
    pub fn timestamps(&mut self) -> &mut Self {
        self.timestamp("created_at").nullable();
        self.timestamp("updated_at").nullable()
    }

    /// Nullable `deleted_at` timestamp
    pub fn soft_deletes(&mut self) -> &mut Self {
        self.timestamp("deleted_at").nullable()
    }

    pub fn enumeration(&mut self, name: &str, values: &[&str]) -> &mut Self {
        let values = values.iter().map(|v| v.to_string()).collect();
        self.column(name, ColumnType::Enum { values })
    }

    pub fn json(&mut self, name: &str) -> &mut Self {
        self.column(name, ColumnType::Json)
    }

    // ----- modifiers (most recent column; no-op before the first column) -----

    fn modify(&mut self, f: impl FnOnce(&mut ColumnDefinition)) -> &mut Self {
        if let Some(column) = self.columns.last_mut() {
            f(column);
        }
        self
    }

    pub fn nullable(&mut self) -> &mut Self {
        self.modify(|c| c.nullable = true)
    }

    pub fn default(&mut self, value: impl Into<DefaultValue>) -> &mut Self {
        let value = value.into();
        self.modify(|c| c.default = Some(value))
    }

    pub fn unsigned(&mut self) -> &mut Self {
        self.modify(|c| c.unsigned = true)
    }

    pub fn auto_increment(&mut self) -> &mut Self {
        self.modify(|c| c.auto_increment = true)
    }

    /// `DEFAULT CURRENT_TIMESTAMP`
    pub fn use_current(&mut self) -> &mut Self {
        self.modify(|c| c.default = Some(DefaultValue::CurrentTimestamp))
    }

    /// `ON UPDATE CURRENT_TIMESTAMP`
    pub fn use_current_on_update(&mut self) -> &mut Self {
        self.modify(|c| c.on_update_current_timestamp = true)
    }

    pub fn comment(&mut self, text: &str) -> &mut Self {
        let text = text.to_string();
        self.modify(|c| c.comment = Some(text))
    }

    /// Fractional seconds precision of a `date_time`, `timestamp` or `time` column
    pub fn precision(&mut self, precision: u32) -> &mut Self {
        self.modify(|c| match &mut c.column_type {
            ColumnType::DateTime { precision: p }
            | ColumnType::Timestamp { precision: p }
            | ColumnType::Time { precision: p } => *p = precision,
            _ => {}
        })
    }

    /// Position hint for `ALTER TABLE .. ADD COLUMN`; ignored by `CREATE TABLE`
    pub fn after(&mut self, column: &str) -> &mut Self {
        let column = column.to_string();
        self.modify(|c| c.after = Some(column))
    }

    // ----- indexes -----

    pub fn primary(&mut self, columns: &[&str]) -> &mut Self {
        self.add_index(IndexKind::Primary, None, columns)
    }

    pub fn unique(&mut self, columns: &[&str]) -> &mut Self {
        self.add_index(IndexKind::Unique, None, columns)
    }

    pub fn unique_named(&mut self, name: &str, columns: &[&str]) -> &mut Self {
        self.add_index(IndexKind::Unique, Some(name), columns)
    }

    pub fn index(&mut self, columns: &[&str]) -> &mut Self {
        self.add_index(IndexKind::Index, None, columns)
    }

    pub fn index_named(&mut self, name: &str, columns: &[&str]) -> &mut Self {
        self.add_index(IndexKind::Index, Some(name), columns)
    }

    fn add_index(&mut self, kind: IndexKind, name: Option<&str>, columns: &[&str]) -> &mut Self {
        let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        let name = name
            .map(str::to_string)
            .unwrap_or_else(|| IndexDefinition::default_name(&self.table, kind, &columns));
        self.indexes.push(IndexDefinition::new(kind, name, columns));
        self
    }

    /// Start a foreign key over `columns`
    ///
    /// ```rust
    /// # use strata::schema::Blueprint;
    /// let mut table = Blueprint::new("posts");
    /// table.id("id");
    /// table.big_integer("user_id").unsigned();
    /// table.foreign(&["user_id"]).references(&["id"]).on("users").cascade_on_delete();
    /// ```
    pub fn foreign(&mut self, columns: &[&str]) -> ForeignKeyBuilder<'_> {
        let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        self.foreign_keys.push(ForeignKeyDefinition {
            name: ForeignKeyDefinition::default_name(&self.table, &columns),
            columns,
            references_table: String::new(),
            references_columns: Vec::new(),
            on_delete: ReferentialAction::default(),
            on_update: ReferentialAction::default(),
        });
        let index = self.foreign_keys.len() - 1;
        ForeignKeyBuilder {
            definition: &mut self.foreign_keys[index],
        }
    }

    // ----- table options -----

    pub fn engine(&mut self, engine: &str) -> &mut Self {
        self.engine = engine.to_string();
        self
    }

    pub fn charset(&mut self, charset: &str) -> &mut Self {
        self.charset = charset.to_string();
        self
    }

    pub fn collation(&mut self, collation: &str) -> &mut Self {
        self.collation = collation.to_string();
        self
    }

    pub fn table_comment(&mut self, comment: &str) -> &mut Self {
        self.comment = Some(comment.to_string());
        self
    }

    // ----- compilation -----

    /// Compile to a single `CREATE TABLE` statement
    pub fn to_create_sql(&self) -> Result<String, StrataError> {
        self.validate()?;
        if self.columns.is_empty() {
            return Err(StrataError::InvalidDefinition(format!(
                "table `{}` declares no columns",
                self.table
            )));
        }

        let mut clauses: Vec<String> = self.columns.iter().map(ColumnDefinition::to_sql).collect();
        if let Some(primary) = &self.primary_column {
            clauses.push(format!("PRIMARY KEY ({})", quote_ident(primary)));
        }
        clauses.extend(self.indexes.iter().map(IndexDefinition::to_sql));
        clauses.extend(self.foreign_keys.iter().map(ForeignKeyDefinition::to_sql));

        let mut sql = format!(
            "CREATE TABLE {} (\n  {}\n) ENGINE={} DEFAULT CHARSET={} COLLATE={}",
            quote_ident(&self.table),
            clauses.join(",\n  "),
            self.engine,
            self.charset,
            self.collation,
        );
        if let Some(comment) = &self.comment {
            sql.push_str(" COMMENT=");
            sql.push_str(&quote_literal(comment));
        }
        Ok(sql)
    }

    /// Compile to one `ALTER TABLE .. ADD COLUMN` statement per declared column
    ///
    /// Indexes and foreign keys are not part of this pass; the gateway adds them with separate
    /// statements. Table options only apply to `CREATE TABLE`.
    pub fn to_alter_sql(&self) -> Result<Vec<String>, StrataError> {
        self.validate()?;
        let table = quote_ident(&self.table);
        Ok(self
            .columns
            .iter()
            .map(|column| {
                let mut sql = format!("ALTER TABLE {table} ADD COLUMN {}", column.to_sql());
                if self.primary_column.as_deref() == Some(column.name.as_str()) {
                    sql.push_str(" PRIMARY KEY");
                }
                if let Some(after) = &column.after {
                    sql.push_str(" AFTER ");
                    sql.push_str(&quote_ident(after));
                }
                sql
            })
            .collect())
    }

    fn validate(&self) -> Result<(), StrataError> {
        self.validate_identifiers()?;
        for column in &self.columns {
            validate_column(&self.table, column)?;
        }
        let primaries = self
            .indexes
            .iter()
            .filter(|i| i.kind == IndexKind::Primary)
            .count()
            + usize::from(self.primary_column.is_some());
        if primaries > 1 {
            return Err(StrataError::InvalidDefinition(format!(
                "table `{}` declares more than one primary key",
                self.table
            )));
        }
        if let Some(index) = self.indexes.iter().find(|i| i.columns.is_empty()) {
            return Err(StrataError::InvalidDefinition(format!(
                "index `{}` on `{}` has no columns",
                index.name, self.table
            )));
        }
        for fk in &self.foreign_keys {
            if fk.references_table.is_empty() {
                return Err(StrataError::InvalidDefinition(format!(
                    "foreign key `{}` does not name a referenced table",
                    fk.name
                )));
            }
            if fk.columns.is_empty() || fk.columns.len() != fk.references_columns.len() {
                return Err(StrataError::InvalidDefinition(format!(
                    "foreign key `{}` pairs {} local column(s) with {} referenced column(s)",
                    fk.name,
                    fk.columns.len(),
                    fk.references_columns.len()
                )));
            }
        }
        Ok(())
    }

    fn validate_identifiers(&self) -> Result<(), StrataError> {
        check_length("table", &self.table, "")?;
        for column in &self.columns {
            check_length("column", &column.name, "")?;
        }
        for index in &self.indexes {
            let hint = match index.kind {
                IndexKind::Unique => "; name it with `unique_named`",
                _ => "; name it with `index_named`",
            };
            check_length("index", &index.name, hint)?;
        }
        for fk in &self.foreign_keys {
            check_length("foreign key", &fk.name, "; name it with `.named(..)`")?;
        }
        Ok(())
    }
}

fn check_length(kind: &str, name: &str, hint: &str) -> Result<(), StrataError> {
    let length = name.chars().count();
    if length > MAX_IDENTIFIER_LENGTH {
        return Err(StrataError::InvalidDefinition(format!(
            "{kind} name `{name}` is {length} characters, MySQL allows {MAX_IDENTIFIER_LENGTH}{hint}"
        )));
    }
    Ok(())
}

fn validate_column(table: &str, column: &ColumnDefinition) -> Result<(), StrataError> {
    let precision = column.column_type.fractional_precision();
    if precision > MAX_FRACTIONAL_PRECISION {
        return Err(StrataError::InvalidDefinition(format!(
            "column `{table}`.`{}` has fractional precision {precision}, MySQL allows 0 to {MAX_FRACTIONAL_PRECISION}",
            column.name
        )));
    }
    if let Some(DefaultValue::Numeric(literal)) = &column.default {
        if !DefaultValue::is_valid_numeric(literal) {
            return Err(StrataError::InvalidDefinition(format!(
                "column `{table}`.`{}` has non-numeric default `{literal}`",
                column.name
            )));
        }
    }
    Ok(())
}

/// Nested builder returned by [`Blueprint::foreign`]
pub struct ForeignKeyBuilder<'a> {
    definition: &'a mut ForeignKeyDefinition,
}

impl ForeignKeyBuilder<'_> {
    pub fn references(self, columns: &[&str]) -> Self {
        self.definition.references_columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn on(self, table: &str) -> Self {
        self.definition.references_table = table.to_string();
        self
    }

    pub fn named(self, name: &str) -> Self {
        self.definition.name = name.to_string();
        self
    }

    pub fn on_delete(self, action: ReferentialAction) -> Self {
        self.definition.on_delete = action;
        self
    }

    pub fn on_update(self, action: ReferentialAction) -> Self {
        self.definition.on_update = action;
        self
    }

    pub fn cascade_on_delete(self) -> Self {
        self.on_delete(ReferentialAction::Cascade)
    }

    pub fn cascade_on_update(self) -> Self {
        self.on_update(ReferentialAction::Cascade)
    }

    pub fn null_on_delete(self) -> Self {
        self.on_delete(ReferentialAction::SetNull)
    }
}
