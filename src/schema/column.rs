//! Column model: the closed set of column types and a column's modifiers.

use std::fmt;

/// Every column type the blueprint can declare and the inspector can recognise
///
/// Variant payloads carry exactly the sizing information the type needs, so a column can never
/// hold both a length and a precision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    TinyInteger,
    SmallInteger,
    MediumInteger,
    Integer,
    BigInteger,
    Decimal { precision: u32, scale: u32 },
    Float,
    Double,
    Char { length: u32 },
    String { length: u32 },
    Text,
    MediumText,
    LongText,
    Date,
    /// `precision` is the fractional seconds precision, 0 to 6
    DateTime { precision: u32 },
    Timestamp { precision: u32 },
    Time { precision: u32 },
    Year,
    Enum { values: Vec<String> },
    Json,
    /// `TINYINT(1)`
    Boolean,
}

impl ColumnType {
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ColumnType::TinyInteger
                | ColumnType::SmallInteger
                | ColumnType::MediumInteger
                | ColumnType::Integer
                | ColumnType::BigInteger
        )
    }

    /// Types that accept the `UNSIGNED` attribute
    pub fn accepts_unsigned(&self) -> bool {
        self.is_integer() || matches!(self, ColumnType::Decimal { .. })
    }

    /// Fractional seconds precision of a temporal type; 0 for everything else
    pub fn fractional_precision(&self) -> u32 {
        match self {
            ColumnType::DateTime { precision }
            | ColumnType::Timestamp { precision }
            | ColumnType::Time { precision } => *precision,
            _ => 0,
        }
    }

    /// Types whose defaults render unquoted
    pub fn is_numeric(&self) -> bool {
        self.accepts_unsigned()
            || matches!(
                self,
                ColumnType::Float | ColumnType::Double | ColumnType::Boolean
            )
    }

    /// MySQL type as it appears in DDL, without attributes
    pub fn to_sql(&self) -> String {
        match self {
            ColumnType::TinyInteger => "TINYINT".to_string(),
            ColumnType::SmallInteger => "SMALLINT".to_string(),
            ColumnType::MediumInteger => "MEDIUMINT".to_string(),
            ColumnType::Integer => "INT".to_string(),
            ColumnType::BigInteger => "BIGINT".to_string(),
            ColumnType::Decimal { precision, scale } => format!("DECIMAL({precision},{scale})"),
            ColumnType::Float => "FLOAT".to_string(),
            ColumnType::Double => "DOUBLE".to_string(),
            ColumnType::Char { length } => format!("CHAR({length})"),
            ColumnType::String { length } => format!("VARCHAR({length})"),
            ColumnType::Text => "TEXT".to_string(),
            ColumnType::MediumText => "MEDIUMTEXT".to_string(),
            ColumnType::LongText => "LONGTEXT".to_string(),
            ColumnType::Date => "DATE".to_string(),
            ColumnType::DateTime { precision } => with_fsp("DATETIME", *precision),
            ColumnType::Timestamp { precision } => with_fsp("TIMESTAMP", *precision),
            ColumnType::Time { precision } => with_fsp("TIME", *precision),
            ColumnType::Year => "YEAR".to_string(),
            ColumnType::Enum { values } => {
                let quoted: Vec<String> = values.iter().map(|v| quote_literal(v)).collect();
                format!("ENUM({})", quoted.join(","))
            }
            ColumnType::Json => "JSON".to_string(),
            ColumnType::Boolean => "TINYINT(1)".to_string(),
        }
    }
}

fn with_fsp(base: &str, precision: u32) -> String {
    if precision == 0 {
        base.to_string()
    } else {
        format!("{base}({precision})")
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

/// A column default
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultValue {
    /// `DEFAULT NULL`
    Null,
    /// Unquoted numeric literal, kept as written (`0`, `0.00`, `-1.5`)
    Numeric(String),
    Bool(bool),
    /// Quoted string literal
    String(String),
    /// `DEFAULT CURRENT_TIMESTAMP`, with the column's fractional precision
    CurrentTimestamp,
    /// MySQL 8 expression default, rendered as `DEFAULT (expr)`
    Expression(String),
}

impl DefaultValue {
    pub fn numeric(literal: impl Into<String>) -> Self {
        DefaultValue::Numeric(literal.into())
    }

    pub fn expression(expr: impl Into<String>) -> Self {
        DefaultValue::Expression(expr.into())
    }

    pub fn to_sql(&self) -> String {
        self.to_sql_with_precision(0)
    }

    /// Render for a column whose fractional seconds precision is `precision`
    pub fn to_sql_with_precision(&self, precision: u32) -> String {
        match self {
            DefaultValue::Null => "NULL".to_string(),
            DefaultValue::Numeric(n) => n.clone(),
            DefaultValue::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            DefaultValue::String(s) => quote_literal(s),
            DefaultValue::CurrentTimestamp => current_timestamp(precision),
            DefaultValue::Expression(expr) => format!("({expr})"),
        }
    }

    /// A numeric literal MySQL accepts: optional sign, digits, optional fraction and exponent
    pub(crate) fn is_valid_numeric(literal: &str) -> bool {
        let body = literal.strip_prefix(['-', '+']).unwrap_or(literal);
        let (mantissa, exponent) = match body.split_once(['e', 'E']) {
            Some((m, e)) => (m, Some(e.strip_prefix(['-', '+']).unwrap_or(e))),
            None => (body, None),
        };
        let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        let digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
        !(whole.is_empty() && fraction.is_empty())
            && digits(whole)
            && digits(fraction)
            && exponent.map_or(true, |e| !e.is_empty() && digits(e))
    }
}

fn current_timestamp(precision: u32) -> String {
    if precision == 0 {
        "CURRENT_TIMESTAMP".to_string()
    } else {
        format!("CURRENT_TIMESTAMP({precision})")
    }
}

impl From<&str> for DefaultValue {
    fn from(value: &str) -> Self {
        DefaultValue::String(value.to_string())
    }
}

impl From<String> for DefaultValue {
    fn from(value: String) -> Self {
        DefaultValue::String(value)
    }
}

impl From<bool> for DefaultValue {
    fn from(value: bool) -> Self {
        DefaultValue::Bool(value)
    }
}

/// Non-finite values produce a literal the blueprint compiler rejects with
/// `StrataError::InvalidDefinition`.
impl From<f64> for DefaultValue {
    fn from(value: f64) -> Self {
        DefaultValue::Numeric(value.to_string())
    }
}

macro_rules! numeric_default {
    ($($t:ty),*) => {
        $(impl From<$t> for DefaultValue {
            fn from(value: $t) -> Self {
                DefaultValue::Numeric(value.to_string())
            }
        })*
    };
}

numeric_default!(i8, i16, i32, i64, u8, u16, u32, u64);

/// One column of a table blueprint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
    pub default: Option<DefaultValue>,
    pub unsigned: bool,
    pub auto_increment: bool,
    pub on_update_current_timestamp: bool,
    pub comment: Option<String>,
    /// ALTER-only position hint
    pub after: Option<String>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: false,
            default: None,
            unsigned: false,
            auto_increment: false,
            on_update_current_timestamp: false,
            comment: None,
            after: None,
        }
    }

    /// Column clause without the name: type and attributes in MySQL order
    pub fn definition_sql(&self) -> String {
        let mut sql = self.column_type.to_sql();
        if self.unsigned && self.column_type.accepts_unsigned() {
            sql.push_str(" UNSIGNED");
        }
        sql.push_str(if self.nullable { " NULL" } else { " NOT NULL" });
        if self.auto_increment {
            sql.push_str(" AUTO_INCREMENT");
        }
        let precision = self.column_type.fractional_precision();
        if let Some(default) = &self.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(&default.to_sql_with_precision(precision));
        }
        if self.on_update_current_timestamp {
            sql.push_str(" ON UPDATE ");
            sql.push_str(&current_timestamp(precision));
        }
        if let Some(comment) = &self.comment {
            sql.push_str(" COMMENT ");
            sql.push_str(&quote_literal(comment));
        }
        sql
    }

    /// Full column clause, `` `name` TYPE ... ``
    pub fn to_sql(&self) -> String {
        format!("{} {}", quote_ident(&self.name), self.definition_sql())
    }
}

/// Backtick-quote an identifier
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Single-quote a string literal
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}
