//! Catalog type strings (`int(10) unsigned`, `enum('a','b')`, `decimal(8,2)`) and catalog
//! defaults, normalized into the blueprint's column model.

use crate::schema::{ColumnType, DefaultValue};

/// A raw catalog type split into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedType {
    /// Lowercased base name, e.g. `varchar`
    pub base: String,
    /// Parenthesised arguments; enum values are unquoted
    pub args: Vec<String>,
    pub unsigned: bool,
    pub zerofill: bool,
}

impl ParsedType {
    pub fn is_numeric(&self) -> bool {
        matches!(
            self.base.as_str(),
            "tinyint"
                | "smallint"
                | "mediumint"
                | "int"
                | "integer"
                | "bigint"
                | "decimal"
                | "numeric"
                | "float"
                | "double"
                | "real"
                | "bit"
                | "bool"
                | "boolean"
        )
    }

    fn arg(&self, idx: usize) -> Option<u32> {
        self.args.get(idx).and_then(|a| a.trim().parse().ok())
    }

    /// Fractional seconds precision of a temporal type, `datetime(6)` → 6
    fn fsp(&self) -> Option<u32> {
        match self.args.as_slice() {
            [] => Some(0),
            [_] => self.arg(0),
            _ => None,
        }
    }

    /// Map onto the blueprint's closed type set
    ///
    /// `None` for types it cannot declare, and for details it would drop: `ZEROFILL` and
    /// explicit `FLOAT(M,D)`/`DOUBLE(M,D)` sizing.
    pub fn column_type(&self) -> Option<ColumnType> {
        if self.zerofill {
            return None;
        }
        let ty = match self.base.as_str() {
            "tinyint" if self.args.len() == 1 && self.arg(0) == Some(1) && !self.unsigned => {
                ColumnType::Boolean
            }
            "bool" | "boolean" => ColumnType::Boolean,
            "tinyint" => ColumnType::TinyInteger,
            "smallint" => ColumnType::SmallInteger,
            "mediumint" => ColumnType::MediumInteger,
            "int" | "integer" => ColumnType::Integer,
            "bigint" => ColumnType::BigInteger,
            "decimal" | "numeric" => ColumnType::Decimal {
                precision: self.arg(0).unwrap_or(10),
                scale: self.arg(1).unwrap_or(0),
            },
            "float" if self.args.is_empty() => ColumnType::Float,
            "double" | "real" if self.args.is_empty() => ColumnType::Double,
            "char" => ColumnType::Char {
                length: self.arg(0).unwrap_or(1),
            },
            "varchar" => ColumnType::String { length: self.arg(0)? },
            "text" => ColumnType::Text,
            "mediumtext" => ColumnType::MediumText,
            "longtext" => ColumnType::LongText,
            "date" => ColumnType::Date,
            "datetime" => ColumnType::DateTime { precision: self.fsp()? },
            "timestamp" => ColumnType::Timestamp { precision: self.fsp()? },
            "time" => ColumnType::Time { precision: self.fsp()? },
            "year" => ColumnType::Year,
            "enum" => ColumnType::Enum {
                values: self.args.clone(),
            },
            "json" => ColumnType::Json,
            _ => return None,
        };
        Some(ty)
    }
}

/// Split a catalog type string into base type, arguments and qualifiers
pub fn parse_type_string(raw: &str) -> ParsedType {
    let raw = raw.trim();
    let (head, args, tail) = match (raw.find('('), raw.rfind(')')) {
        (Some(open), Some(close)) if close > open => {
            (&raw[..open], Some(&raw[open + 1..close]), &raw[close + 1..])
        }
        _ => match raw.split_once(char::is_whitespace) {
            Some((head, tail)) => (head, None, tail),
            None => (raw, None, ""),
        },
    };

    let base = head.trim().to_ascii_lowercase();
    let args = match args {
        Some(list) if base == "enum" || base == "set" => parse_quoted_list(list),
        Some(list) => list.split(',').map(|a| a.trim().to_string()).collect(),
        None => Vec::new(),
    };
    let qualifiers = tail.to_ascii_lowercase();
    let (mut unsigned, mut zerofill) = (false, false);
    for word in qualifiers.split_whitespace() {
        match word {
            "unsigned" => unsigned = true,
            "zerofill" => zerofill = true,
            _ => {}
        }
    }

    ParsedType {
        base,
        args,
        unsigned,
        zerofill,
    }
}

/// Parse `'a','b,c','it''s'` into its unquoted values
fn parse_quoted_list(list: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut chars = list.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' if in_quote => {
                if chars.peek() == Some(&'\'') {
                    current.push('\'');
                    chars.next();
                } else {
                    in_quote = false;
                    values.push(std::mem::take(&mut current));
                }
            }
            '\'' => in_quote = true,
            '\\' if in_quote => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            _ if in_quote => current.push(c),
            _ => {}
        }
    }
    values
}

/// `CURRENT_TIMESTAMP`, `current_timestamp()`, `CURRENT_TIMESTAMP(6)` and `now()`
pub fn is_current_timestamp(raw: &str) -> bool {
    let lowered = raw.trim().to_ascii_lowercase();
    lowered.starts_with("current_timestamp") || lowered == "now()"
}

/// Normalize the `Default` of a column whose Extra says `DEFAULT_GENERATED`
///
/// MySQL 8 marks both `CURRENT_TIMESTAMP` and expression defaults this way and reports the
/// expression text unparenthesized (`uuid()`), so anything but the timestamp is kept verbatim.
pub fn parse_generated_default(raw: Option<&str>) -> Option<DefaultValue> {
    let raw = raw?.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("NULL") {
        return None;
    }
    if is_current_timestamp(raw) {
        return Some(DefaultValue::CurrentTimestamp);
    }
    Some(DefaultValue::Expression(raw.to_string()))
}

/// Normalize a catalog `Default` value for a column of `column_type`
///
/// MariaDB reports string defaults quoted and null defaults as the text `NULL`; MySQL reports
/// both unquoted (and null as SQL NULL). Both shapes are accepted.
pub fn parse_default(raw: Option<&str>, column_type: &ColumnType) -> Option<DefaultValue> {
    let raw = raw?;
    if raw.eq_ignore_ascii_case("NULL") {
        return None;
    }
    if is_current_timestamp(raw) {
        return Some(DefaultValue::CurrentTimestamp);
    }
    let value = match raw.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')) {
        Some(inner) => inner.replace("''", "'"),
        None => raw.to_string(),
    };
    Some(match column_type {
        ColumnType::Boolean => DefaultValue::Bool(value.trim() != "0"),
        ty if ty.is_numeric() => DefaultValue::Numeric(value),
        _ => DefaultValue::String(value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_integer_variants() {
        let old = parse_type_string("int(10) unsigned");
        assert_eq!(old.base, "int");
        assert_eq!(old.args, vec!["10"]);
        assert!(old.unsigned && !old.zerofill);
        assert_eq!(old.column_type(), Some(ColumnType::Integer));

        let new = parse_type_string("bigint unsigned");
        assert_eq!(new.base, "bigint");
        assert!(new.args.is_empty());
        assert!(new.unsigned);
    }

    #[test]
    fn test_tinyint_one_is_boolean() {
        assert_eq!(parse_type_string("tinyint(1)").column_type(), Some(ColumnType::Boolean));
        assert_eq!(parse_type_string("tinyint(4)").column_type(), Some(ColumnType::TinyInteger));
        assert_eq!(parse_type_string("tinyint").column_type(), Some(ColumnType::TinyInteger));
        assert_eq!(
            parse_type_string("tinyint(1) unsigned").column_type(),
            Some(ColumnType::TinyInteger)
        );
    }

    #[test]
    fn test_sized_types() {
        assert_eq!(
            parse_type_string("decimal(8,2) unsigned").column_type(),
            Some(ColumnType::Decimal { precision: 8, scale: 2 })
        );
        assert_eq!(
            parse_type_string("VARCHAR(191)").column_type(),
            Some(ColumnType::String { length: 191 })
        );
        assert_eq!(parse_type_string("char(36)").column_type(), Some(ColumnType::Char { length: 36 }));
        assert_eq!(parse_type_string("varchar").column_type(), None);
    }

    #[test]
    fn test_enum_values_with_commas_and_quotes() {
        let parsed = parse_type_string("enum('draft','in review, maybe','it''s')");
        assert_eq!(parsed.args, vec!["draft", "in review, maybe", "it's"]);
        assert_eq!(
            parsed.column_type(),
            Some(ColumnType::Enum {
                values: vec!["draft".into(), "in review, maybe".into(), "it's".into()]
            })
        );
    }

    #[test]
    fn test_unknown_types() {
        assert_eq!(parse_type_string("geometry").column_type(), None);
        assert_eq!(parse_type_string("blob").column_type(), None);
    }

    #[test]
    fn test_defaults() {
        let int = ColumnType::Integer;
        let text = ColumnType::String { length: 10 };
        assert_eq!(parse_default(None, &int), None);
        assert_eq!(parse_default(Some("NULL"), &text), None);
        assert_eq!(parse_default(Some("0"), &int), Some(DefaultValue::numeric("0")));
        assert_eq!(parse_default(Some("abc"), &text), Some(DefaultValue::from("abc")));
        assert_eq!(parse_default(Some("'it''s'"), &text), Some(DefaultValue::from("it's")));
        assert_eq!(
            parse_default(Some("current_timestamp()"), &ColumnType::Timestamp { precision: 0 }),
            Some(DefaultValue::CurrentTimestamp)
        );
        assert_eq!(
            parse_default(Some("1"), &ColumnType::Boolean),
            Some(DefaultValue::Bool(true))
        );
    }

    #[test]
    fn test_fractional_seconds_are_kept() {
        assert_eq!(
            parse_type_string("datetime(6)").column_type(),
            Some(ColumnType::DateTime { precision: 6 })
        );
        assert_eq!(
            parse_type_string("timestamp(3)").column_type(),
            Some(ColumnType::Timestamp { precision: 3 })
        );
        assert_eq!(
            parse_type_string("time").column_type(),
            Some(ColumnType::Time { precision: 0 })
        );
        assert_eq!(
            parse_type_string("datetime(6)").column_type().map(|t| t.to_sql()).as_deref(),
            Some("DATETIME(6)")
        );
    }

    #[test]
    fn test_sized_floating_point_is_unsupported() {
        assert_eq!(parse_type_string("double(8,2)").column_type(), None);
        assert_eq!(parse_type_string("float(7,4) unsigned").column_type(), None);
        assert_eq!(parse_type_string("double").column_type(), Some(ColumnType::Double));
        assert_eq!(parse_type_string("float").column_type(), Some(ColumnType::Float));
    }

    #[test]
    fn test_zerofill_is_unsupported() {
        let parsed = parse_type_string("int(5) unsigned zerofill");
        assert!(parsed.unsigned && parsed.zerofill);
        assert_eq!(parsed.column_type(), None);
    }

    #[test]
    fn test_generated_defaults() {
        assert_eq!(
            parse_generated_default(Some("uuid()")),
            Some(DefaultValue::expression("uuid()"))
        );
        assert_eq!(
            parse_generated_default(Some("CURRENT_TIMESTAMP(6)")),
            Some(DefaultValue::CurrentTimestamp)
        );
        assert_eq!(parse_generated_default(None), None);
        assert_eq!(parse_generated_default(Some("NULL")), None);
    }
}
