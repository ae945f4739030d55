//! Blueprint builder calls reconstructed from an inspected table.
//!
//! [`calls_for_snapshot`] is the column/index/foreign key → builder call mapping. It produces a
//! format-neutral call list; turning calls into source text is the job of a
//! [`MigrationTemplate`](super::template::MigrationTemplate).

use crate::inspect::SchemaSnapshot;
use crate::schema::{
    Blueprint, ColumnDefinition, ColumnType, DefaultValue, ForeignKeyDefinition, IndexDefinition,
    IndexKind, ReferentialAction,
};

/// Shorthand primary key column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyColumn {
    /// `id(..)`: `BIGINT UNSIGNED AUTO_INCREMENT`
    Id,
    /// `increments(..)`: `INT UNSIGNED AUTO_INCREMENT`
    Increments,
}

/// Column modifier, in the order the generator emits them
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modifier {
    Unsigned,
    AutoIncrement,
    Nullable,
    Default(DefaultValue),
    UseCurrentOnUpdate,
    Comment(String),
}

/// One statement inside a blueprint callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuilderCall {
    Key {
        kind: KeyColumn,
        name: String,
    },
    Column {
        name: String,
        column_type: ColumnType,
        modifiers: Vec<Modifier>,
    },
    Timestamps,
    SoftDeletes,
    /// `name` is `None` when the blueprint's default name matches
    Index {
        kind: IndexKind,
        name: Option<String>,
        columns: Vec<String>,
    },
    Foreign {
        name: Option<String>,
        columns: Vec<String>,
        references_table: String,
        references_columns: Vec<String>,
        on_delete: ReferentialAction,
        on_update: ReferentialAction,
    },
    Engine(String),
    Charset(String),
    Collation(String),
    TableComment(String),
}

impl BuilderCall {
    /// Replay this call on `table`, exactly as the rendered source would
    pub fn apply(&self, table: &mut Blueprint) {
        match self {
            BuilderCall::Key { kind: KeyColumn::Id, name } => {
                table.id(name);
            }
            BuilderCall::Key {
                kind: KeyColumn::Increments,
                name,
            } => {
                table.increments(name);
            }
            BuilderCall::Column {
                name,
                column_type,
                modifiers,
            } => {
                table.column(name, column_type.clone());
                for modifier in modifiers {
                    match modifier {
                        Modifier::Unsigned => table.unsigned(),
                        Modifier::AutoIncrement => table.auto_increment(),
                        Modifier::Nullable => table.nullable(),
                        Modifier::Default(value) => table.default(value.clone()),
                        Modifier::UseCurrentOnUpdate => table.use_current_on_update(),
                        Modifier::Comment(text) => table.comment(text),
                    };
                }
            }
            BuilderCall::Timestamps => {
                table.timestamps();
            }
            BuilderCall::SoftDeletes => {
                table.soft_deletes();
            }
            BuilderCall::Index {
                kind,
                name,
                columns,
            } => {
                let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
                match (kind, name) {
                    (IndexKind::Primary, _) => table.primary(&columns),
                    (IndexKind::Unique, None) => table.unique(&columns),
                    (IndexKind::Unique, Some(name)) => table.unique_named(name, &columns),
                    (IndexKind::Index, None) => table.index(&columns),
                    (IndexKind::Index, Some(name)) => table.index_named(name, &columns),
                };
            }
            BuilderCall::Foreign {
                name,
                columns,
                references_table,
                references_columns,
                on_delete,
                on_update,
            } => {
                let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
                let references: Vec<&str> = references_columns.iter().map(String::as_str).collect();
                let builder = table
                    .foreign(&columns)
                    .references(&references)
                    .on(references_table)
                    .on_delete(*on_delete)
                    .on_update(*on_update);
                if let Some(name) = name {
                    builder.named(name);
                }
            }
            BuilderCall::Engine(engine) => {
                table.engine(engine);
            }
            BuilderCall::Charset(charset) => {
                table.charset(charset);
            }
            BuilderCall::Collation(collation) => {
                table.collation(collation);
            }
            BuilderCall::TableComment(comment) => {
                table.table_comment(comment);
            }
        }
    }
}

/// Build a blueprint for `table` from `calls`
pub fn blueprint_from_calls(table: &str, calls: &[BuilderCall]) -> Blueprint {
    let mut blueprint = Blueprint::new(table);
    for call in calls {
        call.apply(&mut blueprint);
    }
    blueprint
}

/// Translate an inspected table into the builder calls that recreate it
///
/// Columns come first in ordinal position, then the primary key (unless a key-column shorthand
/// already declares it), secondary indexes, foreign keys and finally non-default table options.
/// Indexes MySQL creates implicitly for a foreign key (same name and columns as the constraint)
/// are left out; recreating the constraint recreates them.
pub fn calls_for_snapshot(snapshot: &SchemaSnapshot) -> Vec<BuilderCall> {
    let primary = snapshot.primary_key();
    let key_column = primary.and_then(|pk| match pk.columns.as_slice() {
        [only] => snapshot
            .column(only)
            .and_then(key_shorthand)
            .map(|kind| (only.clone(), kind)),
        _ => None,
    });

    let columns: Vec<&ColumnDefinition> = snapshot.columns.iter().map(|c| &c.definition).collect();
    let mut calls = Vec::with_capacity(columns.len() + snapshot.indexes.len());
    let mut i = 0;
    while i < columns.len() {
        let column = columns[i];
        if let Some((name, kind)) = &key_column {
            if *name == column.name {
                calls.push(BuilderCall::Key {
                    kind: *kind,
                    name: name.clone(),
                });
                i += 1;
                continue;
            }
        }
        if is_plain_timestamp(column, "created_at")
            && columns
                .get(i + 1)
                .is_some_and(|next| is_plain_timestamp(next, "updated_at"))
        {
            calls.push(BuilderCall::Timestamps);
            i += 2;
            continue;
        }
        if is_plain_timestamp(column, "deleted_at") {
            calls.push(BuilderCall::SoftDeletes);
            i += 1;
            continue;
        }
        calls.push(column_call(column));
        i += 1;
    }

    for index in &snapshot.indexes {
        if index.kind == IndexKind::Primary && key_column.is_some() {
            continue;
        }
        if is_foreign_key_index(index, &snapshot.foreign_keys) {
            continue;
        }
        let default_name = IndexDefinition::default_name(&snapshot.table, index.kind, &index.columns);
        calls.push(BuilderCall::Index {
            kind: index.kind,
            name: (index.kind != IndexKind::Primary && index.name != default_name)
                .then(|| index.name.clone()),
            columns: index.columns.clone(),
        });
    }

    for fk in &snapshot.foreign_keys {
        let default_name = ForeignKeyDefinition::default_name(&snapshot.table, &fk.columns);
        calls.push(BuilderCall::Foreign {
            name: (fk.name != default_name).then(|| fk.name.clone()),
            columns: fk.columns.clone(),
            references_table: fk.references_table.clone(),
            references_columns: fk.references_columns.clone(),
            on_delete: fk.on_delete,
            on_update: fk.on_update,
        });
    }

    let options = &snapshot.options;
    if let Some(engine) = options.engine_override() {
        calls.push(BuilderCall::Engine(engine.to_string()));
    }
    if let Some(charset) = options.charset_override() {
        calls.push(BuilderCall::Charset(charset.to_string()));
    }
    if let Some(collation) = options.collation_override() {
        calls.push(BuilderCall::Collation(collation.to_string()));
    }
    if let Some(comment) = options.comment_override() {
        calls.push(BuilderCall::TableComment(comment.to_string()));
    }

    calls
}

/// Whether `column` is exactly what `id()`/`increments()` would declare
fn key_shorthand(column: &ColumnDefinition) -> Option<KeyColumn> {
    let plain = column.unsigned
        && column.auto_increment
        && !column.nullable
        && column.default.is_none()
        && !column.on_update_current_timestamp
        && column.comment.is_none();
    if !plain {
        return None;
    }
    match column.column_type {
        ColumnType::BigInteger => Some(KeyColumn::Id),
        ColumnType::Integer => Some(KeyColumn::Increments),
        _ => None,
    }
}

fn is_plain_timestamp(column: &ColumnDefinition, name: &str) -> bool {
    column.name == name
        && column.column_type == ColumnType::Timestamp { precision: 0 }
        && column.nullable
        && matches!(column.default, None | Some(DefaultValue::Null))
        && !column.on_update_current_timestamp
        && !column.auto_increment
        && column.comment.is_none()
}

fn is_foreign_key_index(index: &IndexDefinition, foreign_keys: &[ForeignKeyDefinition]) -> bool {
    index.kind == IndexKind::Index
        && foreign_keys
            .iter()
            .any(|fk| fk.name == index.name && fk.columns == index.columns)
}

fn column_call(column: &ColumnDefinition) -> BuilderCall {
    let mut modifiers = Vec::new();
    if column.unsigned && column.column_type.accepts_unsigned() {
        modifiers.push(Modifier::Unsigned);
    }
    if column.auto_increment {
        modifiers.push(Modifier::AutoIncrement);
    }
    if column.nullable {
        modifiers.push(Modifier::Nullable);
    }
    match &column.default {
        // NULL is already the default of a nullable column
        Some(DefaultValue::Null) if column.nullable => {}
        Some(value) => modifiers.push(Modifier::Default(value.clone())),
        None => {}
    }
    if column.on_update_current_timestamp {
        modifiers.push(Modifier::UseCurrentOnUpdate);
    }
    if let Some(comment) = &column.comment {
        modifiers.push(Modifier::Comment(comment.clone()));
    }
    BuilderCall::Column {
        name: column.name.clone(),
        column_type: column.column_type.clone(),
        modifiers,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::inspect::{InspectedColumn, TableOptions};

    fn column(name: &str, column_type: ColumnType, f: impl FnOnce(&mut ColumnDefinition)) -> InspectedColumn {
        let mut definition = ColumnDefinition::new(name, column_type.clone());
        f(&mut definition);
        InspectedColumn {
            definition,
            raw_type: column_type.to_sql().to_ascii_lowercase(),
        }
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn posts() -> SchemaSnapshot {
        SchemaSnapshot {
            table: "posts".into(),
            columns: vec![
                column("id", ColumnType::BigInteger, |c| {
                    c.unsigned = true;
                    c.auto_increment = true;
                }),
                column("user_id", ColumnType::BigInteger, |c| c.unsigned = true),
                column("title", ColumnType::String { length: 200 }, |_| {}),
                column("published", ColumnType::Boolean, |c| {
                    c.default = Some(DefaultValue::Bool(false))
                }),
                column("created_at", ColumnType::Timestamp { precision: 0 }, |c| c.nullable = true),
                column("updated_at", ColumnType::Timestamp { precision: 0 }, |c| c.nullable = true),
            ],
            indexes: vec![
                IndexDefinition::new(IndexKind::Primary, "PRIMARY", strings(&["id"])),
                IndexDefinition::new(IndexKind::Unique, "posts_title_unique", strings(&["title"])),
                IndexDefinition::new(IndexKind::Index, "posts_user_id_foreign", strings(&["user_id"])),
            ],
            foreign_keys: vec![ForeignKeyDefinition {
                name: "posts_user_id_foreign".into(),
                columns: strings(&["user_id"]),
                references_table: "users".into(),
                references_columns: strings(&["id"]),
                on_delete: ReferentialAction::Cascade,
                on_update: ReferentialAction::Restrict,
            }],
            options: TableOptions {
                engine: Some("InnoDB".into()),
                charset: Some("utf8mb4".into()),
                collation: Some("utf8mb4_unicode_ci".into()),
                comment: Some(String::new()),
            },
        }
    }

    #[test]
    fn test_shorthands_and_implicit_indexes() {
        let calls = calls_for_snapshot(&posts());
        assert_eq!(
            calls[0],
            BuilderCall::Key {
                kind: KeyColumn::Id,
                name: "id".into()
            }
        );
        assert_eq!(
            calls[1],
            BuilderCall::Column {
                name: "user_id".into(),
                column_type: ColumnType::BigInteger,
                modifiers: vec![Modifier::Unsigned],
            }
        );
        assert!(calls.contains(&BuilderCall::Timestamps));
        assert!(calls.contains(&BuilderCall::Index {
            kind: IndexKind::Unique,
            name: None,
            columns: strings(&["title"]),
        }));
        // no PRIMARY call, no implicit foreign key index, no table options
        assert_eq!(calls.len(), 7);
        assert!(matches!(calls[6], BuilderCall::Foreign { name: None, .. }));
    }

    #[test]
    fn test_replayed_calls_reproduce_structure() {
        let snapshot = posts();
        let blueprint = blueprint_from_calls("posts", &calls_for_snapshot(&snapshot));

        let expected: Vec<&ColumnDefinition> = snapshot.columns.iter().map(|c| &c.definition).collect();
        let actual: Vec<&ColumnDefinition> = blueprint.columns().iter().collect();
        assert_eq!(actual, expected);
        assert_eq!(blueprint.primary_column(), Some("id"));
        assert_eq!(blueprint.indexes(), &snapshot.indexes[1..2]);
        assert_eq!(blueprint.foreign_keys(), snapshot.foreign_keys.as_slice());
    }

    #[test]
    fn test_composite_primary_key_and_custom_names() {
        let snapshot = SchemaSnapshot {
            table: "role_user".into(),
            columns: vec![
                column("role_id", ColumnType::Integer, |c| c.unsigned = true),
                column("user_id", ColumnType::Integer, |c| c.unsigned = true),
            ],
            indexes: vec![
                IndexDefinition::new(IndexKind::Primary, "PRIMARY", strings(&["role_id", "user_id"])),
                IndexDefinition::new(IndexKind::Index, "by_user", strings(&["user_id"])),
            ],
            foreign_keys: vec![ForeignKeyDefinition {
                name: "fk_role".into(),
                columns: strings(&["role_id"]),
                references_table: "roles".into(),
                references_columns: strings(&["id"]),
                on_delete: ReferentialAction::SetNull,
                on_update: ReferentialAction::NoAction,
            }],
            options: TableOptions {
                engine: Some("MyISAM".into()),
                comment: Some("pivot".into()),
                ..Default::default()
            },
        };
        let calls = calls_for_snapshot(&snapshot);
        assert_eq!(
            calls[2],
            BuilderCall::Index {
                kind: IndexKind::Primary,
                name: None,
                columns: strings(&["role_id", "user_id"]),
            }
        );
        assert_eq!(
            calls[3],
            BuilderCall::Index {
                kind: IndexKind::Index,
                name: Some("by_user".into()),
                columns: strings(&["user_id"]),
            }
        );
        assert!(matches!(&calls[4], BuilderCall::Foreign { name: Some(n), .. } if n == "fk_role"));
        assert_eq!(calls[5], BuilderCall::Engine("MyISAM".into()));
        assert_eq!(calls[6], BuilderCall::TableComment("pivot".into()));

        let blueprint = blueprint_from_calls("role_user", &calls);
        assert_eq!(blueprint.indexes(), snapshot.indexes.as_slice());
        assert_eq!(blueprint.foreign_keys(), snapshot.foreign_keys.as_slice());
        assert_eq!(blueprint.engine_name(), "MyISAM");
    }

    #[test]
    fn test_commented_key_column_is_spelled_out() {
        let snapshot = SchemaSnapshot {
            table: "codes".into(),
            columns: vec![column("id", ColumnType::Integer, |c| {
                c.unsigned = true;
                c.auto_increment = true;
                c.comment = Some("surrogate".into());
            })],
            indexes: vec![IndexDefinition::new(IndexKind::Primary, "PRIMARY", strings(&["id"]))],
            foreign_keys: vec![],
            options: TableOptions::default(),
        };
        let calls = calls_for_snapshot(&snapshot);
        assert_eq!(
            calls,
            vec![
                BuilderCall::Column {
                    name: "id".into(),
                    column_type: ColumnType::Integer,
                    modifiers: vec![
                        Modifier::Unsigned,
                        Modifier::AutoIncrement,
                        Modifier::Comment("surrogate".into())
                    ],
                },
                BuilderCall::Index {
                    kind: IndexKind::Primary,
                    name: None,
                    columns: strings(&["id"]),
                },
            ]
        );
    }

    #[test]
    fn test_lone_timestamps_stay_columns() {
        let snapshot = SchemaSnapshot {
            table: "events".into(),
            columns: vec![
                column("created_at", ColumnType::Timestamp { precision: 0 }, |c| c.nullable = true),
                column("deleted_at", ColumnType::Timestamp { precision: 0 }, |c| c.nullable = true),
                column("updated_at", ColumnType::Timestamp { precision: 0 }, |c| {
                    c.default = Some(DefaultValue::CurrentTimestamp);
                    c.on_update_current_timestamp = true;
                }),
            ],
            indexes: vec![],
            foreign_keys: vec![],
            options: TableOptions::default(),
        };
        let calls = calls_for_snapshot(&snapshot);
        assert!(matches!(&calls[0], BuilderCall::Column { name, .. } if name == "created_at"));
        assert_eq!(calls[1], BuilderCall::SoftDeletes);
        assert_eq!(
            calls[2],
            BuilderCall::Column {
                name: "updated_at".into(),
                column_type: ColumnType::Timestamp { precision: 0 },
                modifiers: vec![
                    Modifier::Default(DefaultValue::CurrentTimestamp),
                    Modifier::UseCurrentOnUpdate
                ],
            }
        );
    }

    #[test]
    fn test_precise_timestamps_are_not_collapsed() {
        let snapshot = SchemaSnapshot {
            table: "ticks".into(),
            columns: vec![
                column("created_at", ColumnType::Timestamp { precision: 6 }, |c| c.nullable = true),
                column("updated_at", ColumnType::Timestamp { precision: 6 }, |c| c.nullable = true),
            ],
            indexes: vec![],
            foreign_keys: vec![],
            options: TableOptions::default(),
        };
        let calls = calls_for_snapshot(&snapshot);
        assert!(!calls.contains(&BuilderCall::Timestamps));
        assert!(matches!(
            &calls[0],
            BuilderCall::Column { column_type: ColumnType::Timestamp { precision: 6 }, .. }
        ));
    }
}
