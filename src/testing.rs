//! In-memory executor for tests
//!
//! `MemoryExecutor` understands the SQL this crate emits: it tracks tables and columns created
//! through the blueprint compiler, keeps ledger rows for the ledger statements, snapshots the
//! ledger across `START TRANSACTION`/`ROLLBACK`, and answers catalog queries from
//! [`CatalogTable`] fixtures. Anything else can be answered with [`MemoryExecutor::on_query`].
//!
//! Like MySQL, any DDL statement implicitly commits the open transaction.

use crate::executor::{StrataError, StrataExecutor};
use crate::inspect::{FOREIGN_KEYS_SQL, SHOW_INDEX_PREFIX, TABLE_OPTIONS_SQL};
use crate::migration::lock::{ACQUIRE_LOCK_SQL, RELEASE_LOCK_SQL};
use crate::schema::gateway::{HAS_COLUMN_SQL, HAS_TABLE_SQL, LIST_TABLES_SQL, SHOW_COLUMNS_PREFIX};
use crate::schema::{DEFAULT_CHARSET, DEFAULT_COLLATION, DEFAULT_ENGINE};
use crate::value::{Row, SqlValue};
use chrono::{DateTime, NaiveDateTime};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Catalog rows for one table, as `SHOW FULL COLUMNS`, `SHOW INDEX` and
/// `information_schema` would report them
#[derive(Debug, Clone, Default)]
pub struct CatalogTable {
    pub name: String,
    pub columns: Vec<Row>,
    pub indexes: Vec<Row>,
    pub foreign_keys: Vec<Row>,
    pub options: Option<Row>,
}

impl CatalogTable {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Add a `SHOW FULL COLUMNS` row
    pub fn column(
        mut self,
        field: &str,
        column_type: &str,
        nullable: bool,
        default: Option<&str>,
        extra: &str,
        comment: &str,
    ) -> Self {
        self.columns.push(Row::from_pairs([
            ("Field", SqlValue::from(field)),
            ("Type", column_type.into()),
            ("Collation", SqlValue::Null),
            ("Null", (if nullable { "YES" } else { "NO" }).into()),
            ("Key", "".into()),
            ("Default", default.into()),
            ("Extra", extra.into()),
            ("Privileges", "select,insert,update,references".into()),
            ("Comment", comment.into()),
        ]));
        self
    }

    /// Add one `SHOW INDEX` row (one column of one index)
    pub fn index(self, key_name: &str, seq_in_index: i64, column: &str, non_unique: bool) -> Self {
        self.index_row(key_name, seq_in_index, column, non_unique, None)
    }

    /// Add one `SHOW INDEX` row indexing the first `sub_part` characters of `column`
    pub fn prefix_index(
        self,
        key_name: &str,
        seq_in_index: i64,
        column: &str,
        non_unique: bool,
        sub_part: i64,
    ) -> Self {
        self.index_row(key_name, seq_in_index, column, non_unique, Some(sub_part))
    }

    fn index_row(
        mut self,
        key_name: &str,
        seq_in_index: i64,
        column: &str,
        non_unique: bool,
        sub_part: Option<i64>,
    ) -> Self {
        self.indexes.push(Row::from_pairs([
            ("Table", SqlValue::from(self.name.as_str())),
            ("Non_unique", i64::from(non_unique).into()),
            ("Key_name", key_name.into()),
            ("Seq_in_index", seq_in_index.into()),
            ("Column_name", column.into()),
            ("Sub_part", sub_part.into()),
            ("Index_type", "BTREE".into()),
        ]));
        self
    }

    /// Add one foreign key column row
    pub fn foreign_key(
        mut self,
        constraint: &str,
        column: &str,
        referenced_table: &str,
        referenced_column: &str,
        delete_rule: &str,
        update_rule: &str,
    ) -> Self {
        self.foreign_keys.push(Row::from_pairs([
            ("constraint_name", SqlValue::from(constraint)),
            ("column_name", column.into()),
            ("referenced_table_name", referenced_table.into()),
            ("referenced_column_name", referenced_column.into()),
            ("update_rule", update_rule.into()),
            ("delete_rule", delete_rule.into()),
        ]));
        self
    }

    pub fn options(mut self, engine: &str, charset: &str, collation: &str, comment: &str) -> Self {
        self.options = Some(options_row(engine, charset, collation, comment));
        self
    }
}

fn options_row(engine: &str, charset: &str, collation: &str, comment: &str) -> Row {
    Row::from_pairs([
        ("engine", SqlValue::from(engine)),
        ("collation", collation.into()),
        ("charset", charset.into()),
        ("comment", comment.into()),
    ])
}

#[derive(Debug, Clone)]
struct LedgerRow {
    id: i64,
    migration: String,
    batch: i64,
    applied_at: NaiveDateTime,
}

#[derive(Debug, Default)]
struct State {
    statements: Vec<String>,
    /// Tables created through DDL: name -> (column, clause) in ordinal order
    tables: BTreeMap<String, Vec<(String, String)>>,
    catalog: BTreeMap<String, CatalogTable>,
    canned: HashMap<String, Vec<Row>>,
    failures: Vec<String>,
    ledger: Vec<LedgerRow>,
    next_id: i64,
    ticks: i64,
    snapshot: Option<(Vec<LedgerRow>, i64)>,
    held_elsewhere: BTreeSet<String>,
    held: BTreeSet<String>,
}

/// In-memory [`StrataExecutor`]
///
/// # Example
///
/// ```rust,ignore
/// use strata::schema::SchemaGateway;
/// use strata::testing::MemoryExecutor;
///
/// let exec = MemoryExecutor::new();
/// SchemaGateway::new(&exec)
///     .create("users", |t| {
///         t.id("id");
///     })
///     .unwrap();
/// assert!(exec.has_table("users"));
/// ```
#[derive(Debug)]
pub struct MemoryExecutor {
    ledger_table: String,
    state: RefCell<State>,
}

impl Default for MemoryExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryExecutor {
    pub fn new() -> Self {
        Self {
            ledger_table: crate::migration::ledger::DEFAULT_LEDGER_TABLE.to_string(),
            state: RefCell::new(State {
                next_id: 1,
                ..Default::default()
            }),
        }
    }

    /// Recognize ledger statements for `table` instead of the default ledger name
    pub fn with_ledger_table(mut self, table: &str) -> Self {
        self.ledger_table = table.to_string();
        self
    }

    /// Answer `sql` (exact match) with `rows`
    pub fn on_query(&self, sql: &str, rows: Vec<Row>) {
        self.state.borrow_mut().canned.insert(sql.to_string(), rows);
    }

    /// Fail every statement or query containing `fragment`
    pub fn fail_on(&self, fragment: &str) {
        self.state.borrow_mut().failures.push(fragment.to_string());
    }

    pub fn add_catalog_table(&self, table: CatalogTable) {
        self.state
            .borrow_mut()
            .catalog
            .insert(table.name.clone(), table);
    }

    /// Mark an advisory lock as held by another session
    pub fn hold_lock(&self, name: &str) {
        self.state.borrow_mut().held_elsewhere.insert(name.to_string());
    }

    /// Whether this session currently holds the advisory lock `name`
    pub fn holds_lock(&self, name: &str) -> bool {
        self.state.borrow().held.contains(name)
    }

    /// Every statement passed to `execute`, in order (queries are not recorded)
    pub fn statements(&self) -> Vec<String> {
        self.state.borrow().statements.clone()
    }

    pub fn has_table(&self, name: &str) -> bool {
        let state = self.state.borrow();
        state.tables.contains_key(name) || state.catalog.contains_key(name)
    }

    /// Column names of a DDL-tracked table
    pub fn table_columns(&self, name: &str) -> Vec<String> {
        self.state
            .borrow()
            .tables
            .get(name)
            .map(|cols| cols.iter().map(|(c, _)| c.clone()).collect())
            .unwrap_or_default()
    }

    pub fn table_names(&self) -> Vec<String> {
        let state = self.state.borrow();
        let names: BTreeSet<&String> = state.tables.keys().chain(state.catalog.keys()).collect();
        names.into_iter().cloned().collect()
    }

    /// `(migration, batch)` ledger rows ordered by id
    pub fn ledger_rows(&self) -> Vec<(String, i64)> {
        self.state
            .borrow()
            .ledger
            .iter()
            .map(|r| (r.migration.clone(), r.batch))
            .collect()
    }

    fn check_failure(&self, sql: &str) -> Result<(), StrataError> {
        if self.state.borrow().failures.iter().any(|f| sql.contains(f.as_str())) {
            return Err(StrataError::Query(format!("injected failure: {sql}")));
        }
        Ok(())
    }

    fn ledger_ident(&self) -> String {
        format!("`{}`", self.ledger_table)
    }

    fn apply_statement(&self, sql: &str, params: &[SqlValue]) -> Result<u64, StrataError> {
        let trimmed = sql.trim();
        let upper = trimmed.to_ascii_uppercase();
        let mut state = self.state.borrow_mut();

        match upper.as_str() {
            "START TRANSACTION" | "BEGIN" => {
                state.snapshot = Some((state.ledger.clone(), state.next_id));
                return Ok(0);
            }
            "COMMIT" => {
                state.snapshot = None;
                return Ok(0);
            }
            "ROLLBACK" => {
                if let Some((ledger, next_id)) = state.snapshot.take() {
                    state.ledger = ledger;
                    state.next_id = next_id;
                }
                return Ok(0);
            }
            _ => {}
        }

        let ledger = self.ledger_ident();
        if upper.starts_with("INSERT") && trimmed.contains(&format!("INTO {ledger}")) {
            self.require_ledger(&state)?;
            return insert_ledger(&mut state, upper.starts_with("INSERT IGNORE"), params);
        }
        if upper.starts_with("DELETE FROM") && trimmed.contains(&ledger) {
            self.require_ledger(&state)?;
            let migration = params.first().and_then(SqlValue::as_string).unwrap_or_default();
            let before = state.ledger.len();
            state.ledger.retain(|r| r.migration != migration);
            return Ok((before - state.ledger.len()) as u64);
        }

        if ["CREATE", "DROP", "ALTER", "RENAME"]
            .iter()
            .any(|kw| upper.starts_with(kw))
        {
            // implicit commit
            state.snapshot = None;
            apply_ddl(&mut state, trimmed, &upper)?;
        }
        Ok(0)
    }

    fn require_ledger(&self, state: &State) -> Result<(), StrataError> {
        if state.tables.contains_key(&self.ledger_table) {
            Ok(())
        } else {
            Err(StrataError::Query(format!(
                "Table '{}' doesn't exist",
                self.ledger_table
            )))
        }
    }

    fn answer_query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, StrataError> {
        let mut state = self.state.borrow_mut();
        if let Some(rows) = state.canned.get(sql) {
            return Ok(rows.clone());
        }
        let param = |idx: usize| params.get(idx).and_then(SqlValue::as_string).unwrap_or_default();

        if sql == HAS_TABLE_SQL {
            let exists = state.tables.contains_key(&param(0)) || state.catalog.contains_key(&param(0));
            return Ok(vec![aggregate(exists)]);
        }
        if sql == HAS_COLUMN_SQL {
            let (table, column) = (param(0), param(1));
            let exists = state
                .tables
                .get(&table)
                .is_some_and(|cols| cols.iter().any(|(c, _)| *c == column))
                || state.catalog.get(&table).is_some_and(|t| {
                    t.columns
                        .iter()
                        .any(|r| r.get_string("Field").as_deref() == Some(column.as_str()))
                });
            return Ok(vec![aggregate(exists)]);
        }
        if sql == LIST_TABLES_SQL {
            let names: BTreeSet<&String> = state.tables.keys().chain(state.catalog.keys()).collect();
            return Ok(names
                .into_iter()
                .map(|n| Row::from_pairs([("name", n.as_str())]))
                .collect());
        }
        if let Some(rest) = sql.strip_prefix(SHOW_COLUMNS_PREFIX) {
            let table = table_from(rest)?;
            if let Some(catalog) = state.catalog.get(&table) {
                return Ok(catalog.columns.clone());
            }
            return match state.tables.get(&table) {
                Some(cols) => Ok(cols.iter().map(|(name, clause)| synthesized_column(name, clause)).collect()),
                None => Err(missing_table(&table)),
            };
        }
        if let Some(rest) = sql.strip_prefix(SHOW_INDEX_PREFIX) {
            let table = table_from(rest)?;
            if let Some(catalog) = state.catalog.get(&table) {
                return Ok(catalog.indexes.clone());
            }
            return if state.tables.contains_key(&table) {
                Ok(Vec::new())
            } else {
                Err(missing_table(&table))
            };
        }
        if sql == FOREIGN_KEYS_SQL {
            return Ok(state
                .catalog
                .get(&param(0))
                .map(|t| t.foreign_keys.clone())
                .unwrap_or_default());
        }
        if sql == TABLE_OPTIONS_SQL {
            let table = param(0);
            if let Some(catalog) = state.catalog.get(&table) {
                return Ok(catalog.options.iter().cloned().collect());
            }
            return Ok(if state.tables.contains_key(&table) {
                vec![options_row(DEFAULT_ENGINE, DEFAULT_CHARSET, DEFAULT_COLLATION, "")]
            } else {
                Vec::new()
            });
        }
        if sql == ACQUIRE_LOCK_SQL {
            let name = param(0);
            let acquired = !state.held_elsewhere.contains(&name);
            if acquired {
                state.held.insert(name);
            }
            return Ok(vec![Row::from_pairs([("acquired", i64::from(acquired))])]);
        }
        if sql == RELEASE_LOCK_SQL {
            let released = state.held.remove(&param(0));
            return Ok(vec![Row::from_pairs([("released", i64::from(released))])]);
        }

        let ledger = self.ledger_ident();
        if sql.trim_start().to_ascii_uppercase().starts_with("SELECT") && sql.contains(&format!("FROM {ledger}")) {
            self.require_ledger(&state)?;
            return Ok(state
                .ledger
                .iter()
                .map(|r| {
                    Row::from_pairs([
                        ("id", SqlValue::Int(r.id)),
                        ("migration", r.migration.as_str().into()),
                        ("batch", r.batch.into()),
                        ("applied_at", SqlValue::Timestamp(r.applied_at)),
                    ])
                })
                .collect());
        }

        Err(StrataError::Query(format!("MemoryExecutor has no answer for: {sql}")))
    }
}

impl StrataExecutor for MemoryExecutor {
    fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64, StrataError> {
        self.state.borrow_mut().statements.push(sql.to_string());
        self.check_failure(sql)?;
        self.apply_statement(sql, params)
    }

    fn query_all(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, StrataError> {
        self.check_failure(sql)?;
        self.answer_query(sql, params)
    }
}

fn aggregate(exists: bool) -> Row {
    Row::from_pairs([("aggregate", i64::from(exists))])
}

fn missing_table(table: &str) -> StrataError {
    StrataError::Query(format!("Table '{table}' doesn't exist"))
}

fn table_from(rest: &str) -> Result<String, StrataError> {
    parse_ident(rest)
        .map(|(name, _)| name)
        .ok_or_else(|| StrataError::Parse(format!("expected a quoted table name: {rest}")))
}

fn insert_ledger(state: &mut State, ignore: bool, params: &[SqlValue]) -> Result<u64, StrataError> {
    let migration = params
        .first()
        .and_then(SqlValue::as_string)
        .ok_or_else(|| StrataError::Query("ledger insert without a migration".to_string()))?;
    let batch = params.get(1).and_then(SqlValue::as_i64).unwrap_or(1);

    if state.ledger.iter().any(|r| r.migration == migration) {
        if ignore {
            return Ok(0);
        }
        return Err(StrataError::UniqueViolation(format!(
            "Duplicate entry '{migration}' for key 'migration'"
        )));
    }
    state.ticks += 1;
    let applied_at = DateTime::from_timestamp(1_704_067_200 + state.ticks, 0)
        .map(|ts| ts.naive_utc())
        .unwrap_or_default();
    let id = state.next_id;
    state.next_id += 1;
    state.ledger.push(LedgerRow {
        id,
        migration,
        batch,
        applied_at,
    });
    Ok(1)
}

fn apply_ddl(state: &mut State, sql: &str, upper: &str) -> Result<(), StrataError> {
    if upper.starts_with("CREATE TABLE") {
        let if_not_exists = upper.starts_with("CREATE TABLE IF NOT EXISTS");
        let rest = &sql[if if_not_exists { "CREATE TABLE IF NOT EXISTS".len() } else { "CREATE TABLE".len() }..];
        let (name, body) = parse_ident(rest)
            .ok_or_else(|| StrataError::Parse(format!("unparseable CREATE TABLE: {sql}")))?;
        if state.tables.contains_key(&name) || state.catalog.contains_key(&name) {
            if if_not_exists {
                return Ok(());
            }
            return Err(StrataError::Query(format!("Table '{name}' already exists")));
        }
        let columns = match (body.find('('), body.rfind(')')) {
            (Some(open), Some(close)) if close > open => split_top_level(&body[open + 1..close])
                .into_iter()
                .filter_map(|clause| parse_ident(clause).map(|(c, def)| (c, def.trim().to_string())))
                .collect(),
            _ => Vec::new(),
        };
        state.tables.insert(name, columns);
    } else if upper.starts_with("DROP TABLE") {
        let if_exists = upper.starts_with("DROP TABLE IF EXISTS");
        let rest = &sql[if if_exists { "DROP TABLE IF EXISTS".len() } else { "DROP TABLE".len() }..];
        let name = table_from(rest)?;
        let existed = state.tables.remove(&name).is_some() | state.catalog.remove(&name).is_some();
        if !existed && !if_exists {
            return Err(StrataError::Query(format!("Unknown table '{name}'")));
        }
    } else if upper.starts_with("RENAME TABLE") {
        let rest = &sql["RENAME TABLE".len()..];
        let (from, rest) = parse_ident(rest)
            .ok_or_else(|| StrataError::Parse(format!("unparseable RENAME TABLE: {sql}")))?;
        let rest = rest.trim_start();
        let to = rest
            .get(..2)
            .filter(|kw| kw.eq_ignore_ascii_case("TO"))
            .and_then(|_| parse_ident(&rest[2..]))
            .map(|(to, _)| to)
            .ok_or_else(|| StrataError::Parse(format!("unparseable RENAME TABLE: {sql}")))?;
        let columns = state.tables.remove(&from).ok_or_else(|| missing_table(&from))?;
        state.tables.insert(to, columns);
    } else if upper.starts_with("ALTER TABLE") {
        let (name, actions) = parse_ident(&sql["ALTER TABLE".len()..])
            .ok_or_else(|| StrataError::Parse(format!("unparseable ALTER TABLE: {sql}")))?;
        // alterations to tables created outside this executor are accepted and ignored
        let Some(columns) = state.tables.get_mut(&name) else {
            return Ok(());
        };
        for action in split_top_level(actions) {
            alter_columns(columns, action.trim());
        }
    }
    Ok(())
}

fn alter_columns(columns: &mut Vec<(String, String)>, action: &str) {
    let upper = action.to_ascii_uppercase();
    if upper.starts_with("ADD COLUMN") {
        let Some((name, clause)) = parse_ident(&action["ADD COLUMN".len()..]) else {
            return;
        };
        let position = clause
            .rfind(" AFTER `")
            .and_then(|at| parse_ident(&clause[at + " AFTER".len()..]))
            .and_then(|(after, _)| columns.iter().position(|(c, _)| *c == after))
            .map_or(columns.len(), |idx| idx + 1);
        columns.insert(position, (name, clause.trim().to_string()));
    } else if upper.starts_with("DROP COLUMN") {
        if let Some((name, _)) = parse_ident(&action["DROP COLUMN".len()..]) {
            columns.retain(|(c, _)| *c != name);
        }
    } else if upper.starts_with("CHANGE") {
        let Some((from, rest)) = parse_ident(&action["CHANGE".len()..]) else {
            return;
        };
        let Some((to, clause)) = parse_ident(rest) else {
            return;
        };
        if let Some(column) = columns.iter_mut().find(|(c, _)| *c == from) {
            *column = (to, clause.trim().to_string());
        }
    }
}

/// Approximate `SHOW FULL COLUMNS` row for a DDL-tracked column
fn synthesized_column(name: &str, clause: &str) -> Row {
    let upper = clause.to_ascii_uppercase();
    let mut column_type = clause
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    if upper.contains(" UNSIGNED") {
        column_type.push_str(" unsigned");
    }
    let nullable = !upper.contains("NOT NULL");
    let extra = if upper.contains("AUTO_INCREMENT") {
        "auto_increment"
    } else {
        ""
    };
    Row::from_pairs([
        ("Field", SqlValue::from(name)),
        ("Type", column_type.into()),
        ("Collation", SqlValue::Null),
        ("Null", (if nullable { "YES" } else { "NO" }).into()),
        ("Key", "".into()),
        ("Default", SqlValue::Null),
        ("Extra", extra.into()),
        ("Privileges", "select,insert,update,references".into()),
        ("Comment", "".into()),
    ])
}

/// Read a backtick-quoted identifier at the start of `input` (after whitespace)
fn parse_ident(input: &str) -> Option<(String, &str)> {
    let input = input.trim_start();
    let mut chars = input.char_indices().peekable();
    if chars.next()?.1 != '`' {
        return None;
    }
    let mut name = String::new();
    while let Some((idx, c)) = chars.next() {
        if c == '`' {
            if matches!(chars.peek(), Some((_, '`'))) {
                name.push('`');
                chars.next();
            } else {
                return Some((name, &input[idx + 1..]));
            }
        } else {
            name.push(c);
        }
    }
    None
}

/// Split on commas outside parentheses, quotes and backticks
fn split_top_level(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let (mut depth, mut start) = (0i32, 0usize);
    let (mut in_quote, mut in_ident) = (false, false);
    let mut escaped = false;

    for (idx, c) in body.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quote => escaped = true,
            '\'' if !in_ident => in_quote = !in_quote,
            '`' if !in_quote => in_ident = !in_ident,
            '(' if !in_quote && !in_ident => depth += 1,
            ')' if !in_quote && !in_ident => depth -= 1,
            ',' if depth == 0 && !in_quote && !in_ident => {
                parts.push(body[start..idx].trim());
                start = idx + 1;
            }
            _ => {}
        }
    }
    let last = body[start..].trim();
    if !last.is_empty() {
        parts.push(last);
    }
    parts
}
