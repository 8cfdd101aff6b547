//! INSERT / UPDATE / DELETE / EXISTS / SELECT generation from explicit field lists.

use crate::error::SqlBuildError;
use crate::ident::safe_ident;
use crate::statement::{SqlParam, SqlStatement};
use crate::value::SqlValue;
use crate::where_builder::WhereBuilder;

/// Fields is an ordered list of column values. Emission order is insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields(Vec<(String, SqlValue)>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.push(name, value);
        self
    }

    /// Appends a field, replacing the value if the name is already present.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<SqlValue>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(&name)) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.0
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    pub fn remove(&mut self, name: &str) -> Option<SqlValue> {
        let idx = self.0.iter().position(|(n, _)| n.eq_ignore_ascii_case(name))?;
        Some(self.0.remove(idx).1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }

    /// Equality predicates over every field.
    pub fn to_where(&self) -> WhereBuilder {
        self.0
            .iter()
            .fold(WhereBuilder::new(), |w, (n, v)| w.and_eq(n, v.clone()))
    }
}

impl<K: Into<String>, V: Into<SqlValue>> FromIterator<(K, V)> for Fields {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut fields = Fields::new();
        for (k, v) in iter {
            fields.push(k, v);
        }
        fields
    }
}

/// `INSERT INTO [T] ([a],[b]) VALUES (@a,@b)`
pub fn build_insert(table: &str, fields: &Fields) -> Result<SqlStatement, SqlBuildError> {
    insert(table, fields, None)
}

/// INSERT that returns the generated value of `returning` via `OUTPUT INSERTED.[col]`.
pub fn build_insert_returning(
    table: &str,
    fields: &Fields,
    returning: &str,
) -> Result<SqlStatement, SqlBuildError> {
    insert(table, fields, Some(returning))
}

fn insert(
    table: &str,
    fields: &Fields,
    returning: Option<&str>,
) -> Result<SqlStatement, SqlBuildError> {
    let table = safe_ident(table)?;
    if fields.is_empty() {
        return Err(SqlBuildError::EmptyFields("INSERT"));
    }
    let mut columns = Vec::with_capacity(fields.len());
    let mut values = Vec::with_capacity(fields.len());
    let mut stmt = SqlStatement::default();
    for (name, value) in fields.iter() {
        columns.push(safe_ident(name)?);
        values.push(format!("@{name}"));
        stmt.push_param(name, value.clone());
    }
    let output = match returning {
        Some(col) => format!(" OUTPUT INSERTED.{}", safe_ident(col)?),
        None => String::new(),
    };
    stmt.sql = format!(
        "INSERT INTO {table} ({}){output} VALUES ({})",
        columns.join(","),
        values.join(",")
    );
    Ok(stmt)
}

/// `UPDATE [T] SET [a]=@set_a WHERE [k]=@w_k`
///
/// SET parameters are prefixed `set_` and WHERE parameters `w_`, so the same
/// column may appear on both sides.
pub fn build_update(
    table: &str,
    set: &Fields,
    filter: &Fields,
) -> Result<SqlStatement, SqlBuildError> {
    build_update_where(table, set, filter.to_where())
}

pub fn build_update_where(
    table: &str,
    set: &Fields,
    filter: WhereBuilder,
) -> Result<SqlStatement, SqlBuildError> {
    let table = safe_ident(table)?;
    if set.is_empty() {
        return Err(SqlBuildError::EmptyFields("UPDATE"));
    }
    let mut assignments = Vec::with_capacity(set.len());
    let mut stmt = SqlStatement::default();
    for (name, value) in set.iter() {
        assignments.push(format!("{}=@set_{name}", safe_ident(name)?));
        stmt.push_param(format!("set_{name}"), value.clone());
    }
    let (predicate, params) = filter.build()?;
    if predicate.is_empty() {
        return Err(SqlBuildError::EmptyWhere("UPDATE"));
    }
    extend(&mut stmt, params);
    stmt.sql = format!(
        "UPDATE {table} SET {} WHERE {predicate}",
        assignments.join(",")
    );
    Ok(stmt)
}

/// `DELETE FROM [T] WHERE [Id]=@w_Id AND [Code]=@w_Code`
pub fn build_delete(table: &str, filter: &Fields) -> Result<SqlStatement, SqlBuildError> {
    build_delete_where(table, filter.to_where())
}

pub fn build_delete_where(
    table: &str,
    filter: WhereBuilder,
) -> Result<SqlStatement, SqlBuildError> {
    let table = safe_ident(table)?;
    let (predicate, params) = filter.build()?;
    if predicate.is_empty() {
        return Err(SqlBuildError::EmptyWhere("DELETE"));
    }
    let mut stmt = SqlStatement::new(format!("DELETE FROM {table} WHERE {predicate}"));
    extend(&mut stmt, params);
    Ok(stmt)
}

/// `SELECT 1 WHERE EXISTS (SELECT 1 FROM [T] WHERE ...)`
pub fn build_exists(table: &str, filter: &Fields) -> Result<SqlStatement, SqlBuildError> {
    build_exists_where(table, filter.to_where())
}

pub fn build_exists_where(
    table: &str,
    filter: WhereBuilder,
) -> Result<SqlStatement, SqlBuildError> {
    let table = safe_ident(table)?;
    let (predicate, params) = filter.build()?;
    let inner = if predicate.is_empty() {
        format!("SELECT 1 FROM {table}")
    } else {
        format!("SELECT 1 FROM {table} WHERE {predicate}")
    };
    let mut stmt = SqlStatement::new(format!("SELECT 1 WHERE EXISTS ({inner})"));
    extend(&mut stmt, params);
    Ok(stmt)
}

fn extend(stmt: &mut SqlStatement, params: Vec<SqlParam>) {
    for p in params {
        stmt.push_param(p.name, p.value);
    }
}

/// SelectBuilder composes single-table SELECTs with optional paging.
#[derive(Debug, Clone)]
pub struct SelectBuilder {
    table: String,
    columns: Vec<String>,
    filter: WhereBuilder,
    order_by: Vec<(String, bool)>,
    page: Option<(u64, u64)>,
}

impl SelectBuilder {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            filter: WhereBuilder::new(),
            order_by: Vec::new(),
            page: None,
        }
    }

    /// Restricts the column list. An empty list selects `*`.
    #[must_use]
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: WhereBuilder) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, descending: bool) -> Self {
        self.order_by.push((column.into(), descending));
        self
    }

    /// `OFFSET offset ROWS FETCH NEXT limit ROWS ONLY`.
    #[must_use]
    pub fn page(mut self, offset: u64, limit: u64) -> Self {
        self.page = Some((offset, limit));
        self
    }

    pub fn build(&self) -> Result<SqlStatement, SqlBuildError> {
        let table = safe_ident(&self.table)?;
        let columns = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns
                .iter()
                .map(|c| safe_ident(c))
                .collect::<Result<Vec<_>, _>>()?
                .join(",")
        };
        let (mut stmt, where_sql) = self.where_part()?;
        let mut sql = format!("SELECT {columns} FROM {table}{where_sql}");

        let mut order = Vec::with_capacity(self.order_by.len());
        for (col, desc) in &self.order_by {
            order.push(format!("{}{}", safe_ident(col)?, if *desc { " DESC" } else { " ASC" }));
        }
        if !order.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order.join(","));
        }
        if let Some((offset, limit)) = self.page {
            if order.is_empty() {
                sql.push_str(" ORDER BY (SELECT NULL)");
            }
            sql.push_str(&format!(" OFFSET {offset} ROWS FETCH NEXT {limit} ROWS ONLY"));
        }
        stmt.sql = sql;
        Ok(stmt)
    }

    /// `SELECT COUNT(1) FROM [T] WHERE ...`, ignoring ordering and paging.
    pub fn build_count(&self) -> Result<SqlStatement, SqlBuildError> {
        let table = safe_ident(&self.table)?;
        let (mut stmt, where_sql) = self.where_part()?;
        stmt.sql = format!("SELECT COUNT(1) FROM {table}{where_sql}");
        Ok(stmt)
    }

    fn where_part(&self) -> Result<(SqlStatement, String), SqlBuildError> {
        let (predicate, params) = self.filter.clone().build()?;
        let mut stmt = SqlStatement::default();
        extend(&mut stmt, params);
        let where_sql = if predicate.is_empty() {
            String::new()
        } else {
            format!(" WHERE {predicate}")
        };
        Ok((stmt, where_sql))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_insert() {
        let stmt = build_insert("Users", &Fields::new().with("Name", "A").with("Age", 3)).unwrap();
        assert_eq!(stmt.sql, "INSERT INTO [Users] ([Name],[Age]) VALUES (@Name,@Age)");
        assert_eq!(stmt.param("Name"), Some(&SqlValue::Text("A".into())));
        assert_eq!(stmt.param("Age"), Some(&SqlValue::Int(3)));
    }

    #[test]
    fn test_build_insert_returning() {
        let stmt = build_insert_returning("Users", &Fields::new().with("Name", "A"), "Id").unwrap();
        assert_eq!(
            stmt.sql,
            "INSERT INTO [Users] ([Name]) OUTPUT INSERTED.[Id] VALUES (@Name)"
        );
    }

    #[test]
    fn test_build_update_separates_set_and_where() {
        let stmt = build_update(
            "Users",
            &Fields::new().with("Name", "B"),
            &Fields::new().with("Id", 1),
        )
        .unwrap();
        assert_eq!(stmt.sql, "UPDATE [Users] SET [Name]=@set_Name WHERE [Id]=@w_Id");
        assert!(stmt.param("set_Name").is_some());
        assert!(stmt.param("w_Id").is_some());
    }

    #[test]
    fn test_build_update_same_column_both_sides() {
        let stmt = build_update(
            "Users",
            &Fields::new().with("Code", "new"),
            &Fields::new().with("Code", "old"),
        )
        .unwrap();
        assert_eq!(stmt.param("set_Code"), Some(&SqlValue::Text("new".into())));
        assert_eq!(stmt.param("w_Code"), Some(&SqlValue::Text("old".into())));
    }

    #[test]
    fn test_build_delete_composite_where() {
        let stmt = build_delete("Users", &Fields::new().with("Id", 1).with("Code", "A")).unwrap();
        assert_eq!(stmt.sql, "DELETE FROM [Users] WHERE [Id]=@w_Id AND [Code]=@w_Code");
        assert_eq!(stmt.params.len(), 2);
    }

    #[test]
    fn test_update_and_delete_require_where() {
        assert_eq!(
            build_delete("Users", &Fields::new()),
            Err(SqlBuildError::EmptyWhere("DELETE"))
        );
        assert_eq!(
            build_update("Users", &Fields::new().with("A", 1), &Fields::new()),
            Err(SqlBuildError::EmptyWhere("UPDATE"))
        );
        assert_eq!(
            build_insert("Users", &Fields::new()),
            Err(SqlBuildError::EmptyFields("INSERT"))
        );
    }

    #[test]
    fn test_invalid_identifiers_fail_before_sql() {
        assert!(matches!(
            build_insert("Users;--", &Fields::new().with("A", 1)),
            Err(SqlBuildError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            build_update("Users", &Fields::new().with("A B", 1), &Fields::new().with("Id", 1)),
            Err(SqlBuildError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_build_exists() {
        let stmt = build_exists("Users", &Fields::new().with("Code", "A")).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT 1 WHERE EXISTS (SELECT 1 FROM [Users] WHERE [Code]=@w_Code)"
        );
    }

    #[test]
    fn test_select_builder_with_paging() {
        let select = SelectBuilder::new("Orders")
            .columns(["Id", "Name"])
            .filter(WhereBuilder::new().and_like("Name", "x"))
            .order_by("Name", true)
            .page(20, 10);
        let stmt = select.build().unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT [Id],[Name] FROM [Orders] WHERE [Name] LIKE @w_Name ORDER BY [Name] DESC \
             OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY"
        );
        let count = select.build_count().unwrap();
        assert_eq!(count.sql, "SELECT COUNT(1) FROM [Orders] WHERE [Name] LIKE @w_Name");
        assert_eq!(count.params.len(), 1);
    }

    #[test]
    fn test_select_paging_without_order() {
        let stmt = SelectBuilder::new("Orders").page(0, 5).build().unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT * FROM [Orders] ORDER BY (SELECT NULL) OFFSET 0 ROWS FETCH NEXT 5 ROWS ONLY"
        );
    }
}
