//! Fluent WHERE clause construction.

use crate::error::SqlBuildError;
use crate::ident::safe_ident;
use crate::statement::SqlParam;
use crate::value::SqlValue;

/// Comparison operators accepted by [`WhereBuilder::and_compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn as_sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// WhereBuilder accumulates AND-ed predicates and their parameters.
///
/// Parameters are named `w_{column}`; a name already taken (a repeated column,
/// or another column whose name ends in `_N`) gets the next free `_N` suffix.
/// An invalid identifier is remembered and reported by [`WhereBuilder::build`],
/// so chains stay fluent.
#[derive(Debug, Clone, Default)]
pub struct WhereBuilder {
    clauses: Vec<String>,
    params: Vec<SqlParam>,
    error: Option<SqlBuildError>,
}

impl WhereBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty() && self.error.is_none()
    }

    #[must_use]
    pub fn and_eq(self, column: &str, value: impl Into<SqlValue>) -> Self {
        self.and_compare(column, CompareOp::Eq, value)
    }

    #[must_use]
    pub fn and_not_eq(self, column: &str, value: impl Into<SqlValue>) -> Self {
        self.and_compare(column, CompareOp::NotEq, value)
    }

    /// `[column] LIKE @p` with the value wrapped as `%value%`.
    #[must_use]
    pub fn and_like(mut self, column: &str, value: &str) -> Self {
        let Some(ident) = self.ident(column) else {
            return self;
        };
        let name = self.param(column, SqlValue::Text(format!("%{value}%")));
        self.clauses.push(format!("{ident} LIKE @{name}"));
        self
    }

    /// `[column] op @p`. Equality against [`SqlValue::Null`] becomes
    /// `IS NULL` / `IS NOT NULL`.
    #[must_use]
    pub fn and_compare(mut self, column: &str, op: CompareOp, value: impl Into<SqlValue>) -> Self {
        let Some(ident) = self.ident(column) else {
            return self;
        };
        let value = value.into();
        match (op, value.is_null()) {
            (CompareOp::Eq, true) => {
                self.clauses.push(format!("{ident} IS NULL"));
                return self;
            }
            (CompareOp::NotEq, true) => {
                self.clauses.push(format!("{ident} IS NOT NULL"));
                return self;
            }
            _ => {}
        }
        let name = self.param(column, value);
        self.clauses.push(format!("{ident}{}@{name}", op.as_sql()));
        self
    }

    #[must_use]
    pub fn and_between(
        mut self,
        column: &str,
        low: impl Into<SqlValue>,
        high: impl Into<SqlValue>,
    ) -> Self {
        let Some(ident) = self.ident(column) else {
            return self;
        };
        let lo = self.param(column, low.into());
        let hi = self.param(column, high.into());
        self.clauses.push(format!("{ident} BETWEEN @{lo} AND @{hi}"));
        self
    }

    /// `[column] IN (...)`. An empty list matches nothing.
    #[must_use]
    pub fn and_in<I, V>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        let Some(ident) = self.ident(column) else {
            return self;
        };
        let names: Vec<String> = values
            .into_iter()
            .map(|v| format!("@{}", self.param(column, v.into())))
            .collect();
        if names.is_empty() {
            self.clauses.push("1=0".to_string());
        } else {
            self.clauses.push(format!("{ident} IN ({})", names.join(",")));
        }
        self
    }

    #[must_use]
    pub fn and_is_null(mut self, column: &str) -> Self {
        if let Some(ident) = self.ident(column) {
            self.clauses.push(format!("{ident} IS NULL"));
        }
        self
    }

    /// Returns the AND-joined predicate text (without `WHERE`) and its parameters.
    pub fn build(self) -> Result<(String, Vec<SqlParam>), SqlBuildError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        Ok((self.clauses.join(" AND "), self.params))
    }

    fn ident(&mut self, column: &str) -> Option<String> {
        if self.error.is_some() {
            return None;
        }
        match safe_ident(column) {
            Ok(ident) => Some(ident),
            Err(err) => {
                self.error = Some(err);
                None
            }
        }
    }

    fn param(&mut self, column: &str, value: SqlValue) -> String {
        let base = format!("w_{column}");
        let mut name = base.clone();
        let mut n = 0;
        while self.params.iter().any(|p| p.name == name) {
            n += 1;
            name = format!("{base}_{n}");
        }
        self.params.push(SqlParam {
            name: name.clone(),
            value,
        });
        name
    }
}
