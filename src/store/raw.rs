use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use sqlx::{sqlite::SqliteRow, Column, Row, TypeInfo, ValueRef};

use super::{validation, LocalStore, WriteOutcome};
use crate::{AppError, AppResult};

/// Tables reachable through `db-query` / `db-run`.
pub const ALLOWED_TABLES: &[&str] = &["local_cache", "users", "settings"];

const QUERY_VERBS: &[&str] = &["SELECT"];
const RUN_VERBS: &[&str] = &["INSERT", "UPDATE", "DELETE", "REPLACE"];

static TABLE_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:from|join|into|update)\s+([A-Za-z_]\w*)(?:\s+(?:as\s+)?\w+)?((?:\s*,\s*[A-Za-z_]\w*(?:\s+(?:as\s+)?\w+)?)*)",
    )
    .expect("table reference regex")
});

static DENIED_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:sqlite_\w*|pragma\w*|attach|detach|load_extension)\b")
        .expect("denied word regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatementKind {
    Query,
    Run,
}

fn rejected(sql: &str, reason: &str) -> AppError {
    validation("SQL_REJECTED", format!("Statement rejected: {reason}"))
        .with_context("sql", sql.chars().take(120).collect::<String>())
}

/// Blank out the contents of `'...'` literals so identifiers are only matched
/// in SQL text. Quoted identifiers (`"t"`, `` `t` ``, `[t]`) are refused since
/// the table check only understands bare names.
fn scrub_literals(sql: &str, body: &str) -> AppResult<String> {
    let mut out = String::with_capacity(body.len());
    let mut in_literal = false;
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if in_literal {
            if c == '\'' {
                if chars.peek() == Some(&'\'') {
                    chars.next();
                    out.push_str("  ");
                    continue;
                }
                in_literal = false;
                out.push(c);
            } else {
                out.push(' ');
            }
            continue;
        }
        match c {
            '\'' => {
                in_literal = true;
                out.push(c);
            }
            '"' | '`' | '[' => return Err(rejected(sql, "quoted identifiers are not allowed")),
            _ => out.push(c),
        }
    }
    if in_literal {
        return Err(rejected(sql, "unterminated string literal"));
    }
    Ok(out)
}

fn guard_statement(sql: &str, kind: StatementKind) -> AppResult<(&str, String)> {
    let trimmed = sql.trim();
    let body = trimmed.strip_suffix(';').unwrap_or(trimmed).trim_end();
    if body.is_empty() {
        return Err(rejected(sql, "empty statement"));
    }
    if body.contains(';') {
        return Err(rejected(sql, "only one statement is allowed"));
    }
    if body.contains("--") || body.contains("/*") {
        return Err(rejected(sql, "comments are not allowed"));
    }

    let scrubbed = scrub_literals(sql, body)?;

    let verb = scrubbed
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    let allowed_verbs = match kind {
        StatementKind::Query => QUERY_VERBS,
        StatementKind::Run => RUN_VERBS,
    };
    if !allowed_verbs.contains(&verb.as_str()) {
        return Err(rejected(sql, "statement type not allowed").with_context("verb", verb));
    }
    if DENIED_WORD.is_match(&scrubbed) {
        return Err(rejected(sql, "reserved identifier"));
    }

    let mut tables = Vec::new();
    for caps in TABLE_REF.captures_iter(&scrubbed) {
        if let Some(first) = caps.get(1) {
            tables.push(first.as_str().to_ascii_lowercase());
        }
        if let Some(rest) = caps.get(2) {
            tables.extend(
                rest.as_str()
                    .split(',')
                    .filter_map(|part| part.split_whitespace().next())
                    .map(str::to_ascii_lowercase),
            );
        }
    }
    if tables.is_empty() {
        return Err(rejected(sql, "no table referenced"));
    }
    if let Some(table) = tables
        .iter()
        .find(|table| !ALLOWED_TABLES.contains(&table.as_str()))
    {
        return Err(rejected(sql, "table not allowed").with_context("table", table.clone()));
    }

    Ok((body, verb))
}

fn row_to_value(row: SqliteRow) -> Value {
    let mut map = Map::new();
    for col in row.columns() {
        let idx = col.ordinal();
        let val = match row.try_get_raw(idx) {
            Ok(raw) if raw.is_null() => Value::Null,
            Ok(raw) => match raw.type_info().name() {
                "INTEGER" => row
                    .try_get::<i64, _>(idx)
                    .map(Value::from)
                    .unwrap_or(Value::Null),
                "REAL" => row
                    .try_get::<f64, _>(idx)
                    .map(Value::from)
                    .unwrap_or(Value::Null),
                _ => row
                    .try_get::<String, _>(idx)
                    .map(Value::from)
                    .unwrap_or(Value::Null),
            },
            Err(_) => Value::Null,
        };
        map.insert(col.name().to_string(), val);
    }
    Value::Object(map)
}

fn bind_value<'q>(
    q: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    v: &Value,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    match v {
        Value::Null => q.bind(Option::<i64>::None),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(Option::<i64>::None)
            }
        }
        Value::Bool(b) => q.bind(*b as i64),
        Value::String(s) => q.bind(s.clone()),
        _ => q.bind(v.to_string()),
    }
}

impl LocalStore {
    /// Guarded `SELECT` against the store's own tables. Rows come back as JSON objects.
    pub async fn query(&self, sql: &str, params: &[Value]) -> AppResult<Vec<Value>> {
        let (body, _) = guard_statement(sql, StatementKind::Query)?;
        let mut query = sqlx::query(body);
        for param in params {
            query = bind_value(query, param);
        }
        let rows = query
            .fetch_all(self.pool())
            .await
            .map_err(|err| AppError::from(err).with_context("operation", "db_query"))?;
        Ok(rows.into_iter().map(row_to_value).collect())
    }

    /// Guarded single write statement.
    pub async fn run(&self, sql: &str, params: &[Value]) -> AppResult<WriteOutcome> {
        let (body, verb) = guard_statement(sql, StatementKind::Run)?;
        let mut query = sqlx::query(body);
        for param in params {
            query = bind_value(query, param);
        }
        let result = query
            .execute(self.pool())
            .await
            .map_err(|err| AppError::from(err).with_context("operation", "db_run"))?;
        let last_id = matches!(verb.as_str(), "INSERT" | "REPLACE")
            .then(|| result.last_insert_rowid());
        Ok(WriteOutcome {
            last_id,
            changes: result.rows_affected(),
        })
    }
}
