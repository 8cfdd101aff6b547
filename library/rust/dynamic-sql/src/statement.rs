//! Parameterised statements.

use std::time::Duration;

use crate::value::SqlValue;

/// A named parameter. `name` is stored without the leading `@`.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlParam {
    pub name: String,
    pub value: SqlValue,
}

/// SqlStatement is SQL text in the canonical dialect plus its bound parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<SqlParam>,
    /// Overrides the executor's default statement timeout.
    pub timeout: Option<Duration>,
}

impl SqlStatement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
            timeout: None,
        }
    }

    /// Adds (or replaces) the parameter `name`.
    #[must_use]
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.push_param(name, value);
        self
    }

    pub fn push_param(&mut self, name: impl Into<String>, value: impl Into<SqlValue>) {
        let name = name.into();
        let name = name.trim_start_matches('@').to_string();
        let value = value.into();
        if let Some(existing) = self.params.iter_mut().find(|p| p.name == name) {
            existing.value = value;
        } else {
            self.params.push(SqlParam { name, value });
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn param(&self, name: &str) -> Option<&SqlValue> {
        let name = name.trim_start_matches('@');
        self.params.iter().find(|p| p.name == name).map(|p| &p.value)
    }

    /// Parameters as a JSON object, for logging.
    pub fn params_json(&self) -> serde_json::Value {
        let map = self
            .params
            .iter()
            .map(|p| (p.name.clone(), p.value.to_json()))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_replaces_existing_name() {
        let stmt = SqlStatement::new("SELECT @a")
            .bind("a", 1)
            .bind("@a", 2)
            .bind("b", "x");
        assert_eq!(stmt.params.len(), 2);
        assert_eq!(stmt.param("a"), Some(&SqlValue::Int(2)));
        assert_eq!(stmt.param("@b"), Some(&SqlValue::Text("x".into())));
    }

    #[test]
    fn test_params_json_keeps_order() {
        let stmt = SqlStatement::new("x").bind("z", 1).bind("a", SqlValue::Null);
        assert_eq!(stmt.params_json().to_string(), r#"{"z":1,"a":null}"#);
    }
}
