//! Builds parameterized INSERT column lists, UPDATE SET lists and WHERE clauses
//! from sparse, optional inputs. Column names always come from code; values are
//! always parameters.

use super::params::{count_placeholders, SqlParam};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum BuildError {
    #[error("insert into {0} has no columns")]
    EmptyInsert(String),
    #[error("update of {0} has no WHERE clause")]
    UnboundedUpdate(String),
    #[error("phrase '{sql}' has {placeholders} placeholders but {params} parameters")]
    PlaceholderMismatch {
        sql: String,
        placeholders: usize,
        params: usize,
    },
}

/// Rendered SQL text plus its positional parameters, in placeholder order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl QueryBuf {
    pub fn new(sql: impl Into<String>) -> Self {
        QueryBuf {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn push_param(&mut self, v: impl Into<SqlParam>) {
        self.params.push(v.into());
    }

    pub fn placeholder_count(&self) -> usize {
        count_placeholders(&self.sql)
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Column list for an INSERT. Falsy values are skipped by `add`; use
/// `add_direct` when `0`, `false` or `""` is a meaningful value.
#[derive(Debug, Default)]
pub struct InsertList {
    columns: Vec<(&'static str, SqlParam)>,
}

impl InsertList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the column if `value` is truthy. Returns whether it was appended.
    pub fn add(&mut self, column: &'static str, value: impl Into<SqlParam>) -> bool {
        self.add_if(column, value, true)
    }

    /// Append the column if `condition` holds and `value` is truthy.
    pub fn add_if(&mut self, column: &'static str, value: impl Into<SqlParam>, condition: bool) -> bool {
        let value = value.into();
        if !condition || !value.is_truthy() {
            return false;
        }
        self.columns.push((column, value));
        true
    }

    /// Append unconditionally, bypassing the truthiness filter.
    pub fn add_direct(&mut self, column: &'static str, value: impl Into<SqlParam>) {
        self.columns.push((column, value.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// `(c1, c2) VALUES (?, ?)`. An empty list renders `() VALUES ()`, which is
    /// not valid SQL; prefer [`InsertList::into_insert`].
    pub fn render(self) -> QueryBuf {
        let (cols, params): (Vec<&str>, Vec<SqlParam>) = self.columns.into_iter().unzip();
        QueryBuf {
            sql: format!("({}) VALUES ({})", cols.join(", "), placeholders(params.len())),
            params,
        }
    }

    /// Full `INSERT INTO table (...) VALUES (...)`. Fails when nothing was added.
    pub fn into_insert(self, table: &str) -> Result<QueryBuf, BuildError> {
        if self.is_empty() {
            return Err(BuildError::EmptyInsert(table.to_string()));
        }
        let mut q = self.render();
        q.sql = format!("INSERT INTO {} {}", table, q.sql);
        Ok(q)
    }
}

/// SET list for an UPDATE. `None` means the caller did not supply the field and
/// it is left alone; `Some(falsy)` is written.
#[derive(Debug, Default)]
pub struct UpdateList {
    columns: Vec<(&'static str, SqlParam)>,
}

impl UpdateList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<T: Into<SqlParam>>(&mut self, column: &'static str, value: Option<T>) -> bool {
        self.add_if(column, value, true)
    }

    /// Append only when `condition` holds (typically "caller is admin") and a
    /// value was supplied.
    pub fn add_if<T: Into<SqlParam>>(&mut self, column: &'static str, value: Option<T>, condition: bool) -> bool {
        match value {
            Some(v) if condition => {
                self.columns.push((column, v.into()));
                true
            }
            _ => false,
        }
    }

    pub fn has_any(&self) -> bool {
        !self.columns.is_empty()
    }

    /// `SET c1 = ?, c2 = ?`. Target parameters go after these.
    pub fn render(self) -> QueryBuf {
        let (cols, params): (Vec<&str>, Vec<SqlParam>) = self.columns.into_iter().unzip();
        let sets: Vec<String> = cols.iter().map(|c| format!("{} = ?", c)).collect();
        QueryBuf {
            sql: format!("SET {}", sets.join(", ")),
            params,
        }
    }

    /// Full `UPDATE table SET ... WHERE ...`, or `None` when no column was queued
    /// and the statement must be skipped. An empty `filter` is refused.
    pub fn into_update(self, table: &str, filter: WhereList) -> Result<Option<QueryBuf>, BuildError> {
        if filter.is_empty() {
            return Err(BuildError::UnboundedUpdate(table.to_string()));
        }
        if !self.has_any() {
            return Ok(None);
        }
        let mut q = self.render();
        let target = filter.render();
        q.sql = format!("UPDATE {} {} {}", table, q.sql, target.sql);
        q.params.extend(target.params);
        Ok(Some(q))
    }
}

/// Predicates joined with AND, rendered in call order.
#[derive(Debug, Default)]
pub struct WhereList {
    predicates: Vec<(String, Vec<SqlParam>)>,
}

impl WhereList {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(column = ?)` when `value` is truthy. `column = 0` and `column = false`
    /// cannot be expressed here; use [`WhereList::add_if`].
    pub fn add(&mut self, column: &'static str, value: impl Into<SqlParam>) -> bool {
        let value = value.into();
        if !value.is_truthy() {
            return false;
        }
        self.predicates.push((format!("({} = ?)", column), vec![value]));
        true
    }

    /// `(column = ?)` whenever `condition` holds, whatever the value.
    pub fn add_if(&mut self, column: &'static str, value: impl Into<SqlParam>, condition: bool) -> bool {
        if !condition {
            return false;
        }
        self.predicates.push((format!("({} = ?)", column), vec![value.into()]));
        true
    }

    /// Raw boolean expression with its own parameters, e.g. an OR or LIKE.
    /// The text must never contain caller input.
    pub fn add_phrase<I>(&mut self, sql: impl Into<String>, params: I) -> Result<(), BuildError>
    where
        I: IntoIterator,
        I::Item: Into<SqlParam>,
    {
        let sql = sql.into();
        let params: Vec<SqlParam> = params.into_iter().map(Into::into).collect();
        let placeholders = count_placeholders(&sql);
        if placeholders != params.len() {
            return Err(BuildError::PlaceholderMismatch {
                sql,
                placeholders,
                params: params.len(),
            });
        }
        self.predicates.push((format!("({})", sql), params));
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    /// `WHERE p1 AND p2`, or an empty string when nothing was added.
    pub fn render(self) -> QueryBuf {
        if self.predicates.is_empty() {
            return QueryBuf::default();
        }
        let mut q = QueryBuf::default();
        let mut parts = Vec::with_capacity(self.predicates.len());
        for (sql, params) in self.predicates {
            parts.push(sql);
            q.params.extend(params);
        }
        q.sql = format!("WHERE {}", parts.join(" AND "));
        q
    }
}
