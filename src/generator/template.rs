//! Source templates for generated migration artifacts.
//!
//! The generator decides *what* an artifact does ([`ArtifactSource`]); a [`MigrationTemplate`]
//! decides how that reads as source text.

use super::calls::{BuilderCall, KeyColumn, Modifier};
use crate::schema::{ColumnType, DefaultValue, IndexKind, ReferentialAction};
use std::fmt::Write as _;

/// Body of one half (`up` or `down`) of an artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationBody {
    Create { table: String, calls: Vec<BuilderCall> },
    Alter { table: String, calls: Vec<BuilderCall> },
    DropIfExists { table: String },
}

/// Everything a template needs to render one artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSource {
    /// Type the artifact declares
    pub struct_name: String,
    /// One-line summary placed at the top of the file
    pub summary: String,
    pub up: MigrationBody,
    pub down: MigrationBody,
}

/// Renders artifacts as source text
pub trait MigrationTemplate {
    fn render(&self, artifact: &ArtifactSource) -> String;
}

/// Rust artifacts implementing `strata::migration::Migration`
#[derive(Debug, Clone, Copy, Default)]
pub struct RustTemplate;

const CALL_INDENT: &str = "            ";

impl MigrationTemplate for RustTemplate {
    fn render(&self, artifact: &ArtifactSource) -> String {
        let bodies = [&artifact.up, &artifact.down];
        let needs_default = bodies.iter().any(|b| body_calls(b).iter().any(uses_default_value));
        let needs_action = bodies.iter().any(|b| body_calls(b).iter().any(uses_referential_action));

        let mut schema_imports = Vec::new();
        if needs_default {
            schema_imports.push("DefaultValue");
        }
        if needs_action {
            schema_imports.push("ReferentialAction");
        }
        schema_imports.push("SchemaGateway");

        let mut source = String::new();
        let _ = writeln!(source, "//! {}", artifact.summary);
        source.push('\n');
        source.push_str("use strata::migration::Migration;\n");
        if schema_imports.len() == 1 {
            source.push_str("use strata::schema::SchemaGateway;\n");
        } else {
            let _ = writeln!(source, "use strata::schema::{{{}}};", schema_imports.join(", "));
        }
        source.push_str("use strata::StrataError;\n\n");
        let _ = writeln!(source, "pub struct {};\n", artifact.struct_name);
        let _ = writeln!(source, "impl Migration for {} {{", artifact.struct_name);
        render_method(&mut source, "up", &artifact.up);
        source.push('\n');
        render_method(&mut source, "down", &artifact.down);
        source.push_str("}\n");
        source
    }
}

fn body_calls(body: &MigrationBody) -> &[BuilderCall] {
    match body {
        MigrationBody::Create { calls, .. } | MigrationBody::Alter { calls, .. } => calls,
        MigrationBody::DropIfExists { .. } => &[],
    }
}

fn uses_default_value(call: &BuilderCall) -> bool {
    match call {
        BuilderCall::Column { modifiers, .. } => modifiers.iter().any(|m| {
            matches!(
                m,
                Modifier::Default(
                    DefaultValue::Null | DefaultValue::Numeric(_) | DefaultValue::Expression(_)
                )
            )
        }),
        _ => false,
    }
}

fn uses_referential_action(call: &BuilderCall) -> bool {
    match call {
        BuilderCall::Foreign {
            on_delete,
            on_update,
            ..
        } => {
            matches!(on_delete, ReferentialAction::NoAction)
                || matches!(on_update, ReferentialAction::SetNull | ReferentialAction::NoAction)
        }
        _ => false,
    }
}

fn render_method(source: &mut String, method: &str, body: &MigrationBody) {
    let _ = writeln!(
        source,
        "    fn {method}(&self, schema: &SchemaGateway<'_>) -> Result<(), StrataError> {{"
    );
    match body {
        MigrationBody::Create { table, calls } => render_callback(source, "create", table, calls),
        MigrationBody::Alter { table, calls } => render_callback(source, "alter_table", table, calls),
        MigrationBody::DropIfExists { table } => {
            let _ = writeln!(source, "        schema.drop_if_exists({table:?})");
        }
    }
    source.push_str("    }\n");
}

fn render_callback(source: &mut String, method: &str, table: &str, calls: &[BuilderCall]) {
    if calls.is_empty() {
        let _ = writeln!(source, "        schema.{method}({table:?}, |_table| {{");
        let _ = writeln!(source, "{CALL_INDENT}// table.string(\"name\", 255);");
    } else {
        let _ = writeln!(source, "        schema.{method}({table:?}, |table| {{");
        for call in calls {
            let _ = writeln!(source, "{CALL_INDENT}{};", render_call(call));
        }
    }
    source.push_str("        })\n");
}

/// One builder call as a Rust statement, without the trailing `;`
pub fn render_call(call: &BuilderCall) -> String {
    match call {
        BuilderCall::Key { kind, name } => {
            let method = match kind {
                KeyColumn::Id => "id",
                KeyColumn::Increments => "increments",
            };
            format!("table.{method}({name:?})")
        }
        BuilderCall::Column {
            name,
            column_type,
            modifiers,
        } => {
            let mut call = format!("table.{}", column_method(name, column_type));
            for modifier in modifiers {
                call.push_str(&render_modifier(modifier));
            }
            call
        }
        BuilderCall::Timestamps => "table.timestamps()".to_string(),
        BuilderCall::SoftDeletes => "table.soft_deletes()".to_string(),
        BuilderCall::Index {
            kind,
            name,
            columns,
        } => {
            let columns = slice_literal(columns);
            match (kind, name) {
                (IndexKind::Primary, _) => format!("table.primary({columns})"),
                (IndexKind::Unique, None) => format!("table.unique({columns})"),
                (IndexKind::Unique, Some(name)) => format!("table.unique_named({name:?}, {columns})"),
                (IndexKind::Index, None) => format!("table.index({columns})"),
                (IndexKind::Index, Some(name)) => format!("table.index_named({name:?}, {columns})"),
            }
        }
        BuilderCall::Foreign {
            name,
            columns,
            references_table,
            references_columns,
            on_delete,
            on_update,
        } => {
            let mut call = format!(
                "table.foreign({}).references({}).on({references_table:?})",
                slice_literal(columns),
                slice_literal(references_columns),
            );
            if let Some(name) = name {
                let _ = write!(call, ".named({name:?})");
            }
            match on_delete {
                ReferentialAction::Restrict => {}
                ReferentialAction::Cascade => call.push_str(".cascade_on_delete()"),
                ReferentialAction::SetNull => call.push_str(".null_on_delete()"),
                other => {
                    let _ = write!(call, ".on_delete(ReferentialAction::{other:?})");
                }
            }
            match on_update {
                ReferentialAction::Restrict => {}
                ReferentialAction::Cascade => call.push_str(".cascade_on_update()"),
                other => {
                    let _ = write!(call, ".on_update(ReferentialAction::{other:?})");
                }
            }
            call
        }
        BuilderCall::Engine(engine) => format!("table.engine({engine:?})"),
        BuilderCall::Charset(charset) => format!("table.charset({charset:?})"),
        BuilderCall::Collation(collation) => format!("table.collation({collation:?})"),
        BuilderCall::TableComment(comment) => format!("table.table_comment({comment:?})"),
    }
}

fn column_method(name: &str, column_type: &ColumnType) -> String {
    match column_type {
        ColumnType::TinyInteger => format!("tiny_integer({name:?})"),
        ColumnType::SmallInteger => format!("small_integer({name:?})"),
        ColumnType::MediumInteger => format!("medium_integer({name:?})"),
        ColumnType::Integer => format!("integer({name:?})"),
        ColumnType::BigInteger => format!("big_integer({name:?})"),
        ColumnType::Decimal { precision, scale } => format!("decimal({name:?}, {precision}, {scale})"),
        ColumnType::Float => format!("float({name:?})"),
        ColumnType::Double => format!("double({name:?})"),
        ColumnType::Char { length } => format!("char({name:?}, {length})"),
        ColumnType::String { length } => format!("string({name:?}, {length})"),
        ColumnType::Text => format!("text({name:?})"),
        ColumnType::MediumText => format!("medium_text({name:?})"),
        ColumnType::LongText => format!("long_text({name:?})"),
        ColumnType::Date => format!("date({name:?})"),
        ColumnType::DateTime { precision } => with_precision(format!("date_time({name:?})"), *precision),
        ColumnType::Timestamp { precision } => with_precision(format!("timestamp({name:?})"), *precision),
        ColumnType::Time { precision } => with_precision(format!("time({name:?})"), *precision),
        ColumnType::Year => format!("year({name:?})"),
        ColumnType::Enum { values } => format!("enumeration({name:?}, {})", slice_literal(values)),
        ColumnType::Json => format!("json({name:?})"),
        ColumnType::Boolean => format!("boolean({name:?})"),
    }
}

fn with_precision(call: String, precision: u32) -> String {
    if precision == 0 {
        call
    } else {
        format!("{call}.precision({precision})")
    }
}

fn render_modifier(modifier: &Modifier) -> String {
    match modifier {
        Modifier::Unsigned => ".unsigned()".to_string(),
        Modifier::AutoIncrement => ".auto_increment()".to_string(),
        Modifier::Nullable => ".nullable()".to_string(),
        Modifier::Default(value) => match value {
            DefaultValue::Null => ".default(DefaultValue::Null)".to_string(),
            DefaultValue::Numeric(n) => format!(".default(DefaultValue::numeric({n:?}))"),
            DefaultValue::Bool(b) => format!(".default({b})"),
            DefaultValue::String(s) => format!(".default({s:?})"),
            DefaultValue::CurrentTimestamp => ".use_current()".to_string(),
            DefaultValue::Expression(expr) => format!(".default(DefaultValue::expression({expr:?}))"),
        },
        Modifier::UseCurrentOnUpdate => ".use_current_on_update()".to_string(),
        Modifier::Comment(text) => format!(".comment({text:?})"),
    }
}

/// `&["a", "b"]`
fn slice_literal(values: &[String]) -> String {
    let quoted: Vec<String> = values.iter().map(|v| format!("{v:?}")).collect();
    format!("&[{}]", quoted.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_render_create_artifact() {
        let artifact = ArtifactSource {
            struct_name: "CreateFlightsTable".into(),
            summary: "Create the `flights` table".into(),
            up: MigrationBody::Create {
                table: "flights".into(),
                calls: vec![
                    BuilderCall::Key {
                        kind: KeyColumn::Id,
                        name: "id".into(),
                    },
                    BuilderCall::Timestamps,
                ],
            },
            down: MigrationBody::DropIfExists {
                table: "flights".into(),
            },
        };
        let expected = "\
//! Create the `flights` table

use strata::migration::Migration;
use strata::schema::SchemaGateway;
use strata::StrataError;

pub struct CreateFlightsTable;

impl Migration for CreateFlightsTable {
    fn up(&self, schema: &SchemaGateway<'_>) -> Result<(), StrataError> {
        schema.create(\"flights\", |table| {
            table.id(\"id\");
            table.timestamps();
        })
    }

    fn down(&self, schema: &SchemaGateway<'_>) -> Result<(), StrataError> {
        schema.drop_if_exists(\"flights\")
    }
}
";
        assert_eq!(RustTemplate.render(&artifact), expected);
    }

    #[test]
    fn test_empty_alter_skeleton() {
        let body = MigrationBody::Alter {
            table: "users".into(),
            calls: vec![],
        };
        let artifact = ArtifactSource {
            struct_name: "AddPhoneToUsers".into(),
            summary: "Alter the `users` table".into(),
            up: body.clone(),
            down: body,
        };
        let source = RustTemplate.render(&artifact);
        assert!(source.contains("schema.alter_table(\"users\", |_table| {\n            // table.string"));
    }

    #[test]
    fn test_render_columns_with_modifiers() {
        let call = BuilderCall::Column {
            name: "price".into(),
            column_type: ColumnType::Decimal {
                precision: 8,
                scale: 2,
            },
            modifiers: vec![
                Modifier::Unsigned,
                Modifier::Default(DefaultValue::numeric("0.00")),
                Modifier::Comment("in \"cents\"".into()),
            ],
        };
        assert_eq!(
            render_call(&call),
            "table.decimal(\"price\", 8, 2).unsigned().default(DefaultValue::numeric(\"0.00\")).comment(\"in \\\"cents\\\"\")"
        );

        let status = BuilderCall::Column {
            name: "status".into(),
            column_type: ColumnType::Enum {
                values: strings(&["draft", "live"]),
            },
            modifiers: vec![Modifier::Default(DefaultValue::from("draft"))],
        };
        assert_eq!(
            render_call(&status),
            "table.enumeration(\"status\", &[\"draft\", \"live\"]).default(\"draft\")"
        );
    }

    #[test]
    fn test_render_fractional_precision_and_expression_default() {
        let seen = BuilderCall::Column {
            name: "seen_at".into(),
            column_type: ColumnType::DateTime { precision: 6 },
            modifiers: vec![Modifier::Nullable, Modifier::Default(DefaultValue::CurrentTimestamp)],
        };
        assert_eq!(
            render_call(&seen),
            "table.date_time(\"seen_at\").precision(6).nullable().use_current()"
        );

        let token = BuilderCall::Column {
            name: "token".into(),
            column_type: ColumnType::Char { length: 36 },
            modifiers: vec![Modifier::Default(DefaultValue::expression("uuid()"))],
        };
        assert_eq!(
            render_call(&token),
            "table.char(\"token\", 36).default(DefaultValue::expression(\"uuid()\"))"
        );
        assert!(uses_default_value(&token));
    }

    #[test]
    fn test_render_foreign_keys() {
        let fk = BuilderCall::Foreign {
            name: Some("fk_owner".into()),
            columns: strings(&["owner_id"]),
            references_table: "users".into(),
            references_columns: strings(&["id"]),
            on_delete: ReferentialAction::SetNull,
            on_update: ReferentialAction::NoAction,
        };
        assert_eq!(
            render_call(&fk),
            "table.foreign(&[\"owner_id\"]).references(&[\"id\"]).on(\"users\").named(\"fk_owner\").null_on_delete().on_update(ReferentialAction::NoAction)"
        );
        assert!(uses_referential_action(&fk));
    }

    #[test]
    fn test_imports_follow_usage() {
        let artifact = ArtifactSource {
            struct_name: "CreateOrdersTable".into(),
            summary: "Create the `orders` table".into(),
            up: MigrationBody::Create {
                table: "orders".into(),
                calls: vec![BuilderCall::Column {
                    name: "total".into(),
                    column_type: ColumnType::Integer,
                    modifiers: vec![Modifier::Default(DefaultValue::numeric("0"))],
                }],
            },
            down: MigrationBody::DropIfExists {
                table: "orders".into(),
            },
        };
        assert!(RustTemplate
            .render(&artifact)
            .contains("use strata::schema::{DefaultValue, SchemaGateway};\n"));
    }
}
