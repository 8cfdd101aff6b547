//! Rendering of canonical statements for the PostgreSQL driver.
//!
//! - `[Name]` becomes `"Name"`
//! - `@param` becomes `$n`; a name used twice reuses its index
//! - a NULL parameter is written inline as `NULL`, since an untyped bind has no column type
//! - `OUTPUT INSERTED.[c]` is moved to a trailing `RETURNING "c"`
//!
//! String literals, double-quoted identifiers and comments are copied unchanged.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::statement::SqlStatement;
use crate::value::SqlValue;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("SQL references parameter @{0} which is not bound")]
    MissingParam(String),

    #[error("unterminated bracketed identifier")]
    UnterminatedIdentifier,
}

static OUTPUT_CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+OUTPUT\s+(INSERTED\.\[\w+\](?:\s*,\s*INSERTED\.\[\w+\])*)")
        .unwrap_or_else(|e| panic!("invalid OUTPUT regex: {e}"))
});

static INSERTED_COLUMN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)INSERTED\.\[(\w+)\]").unwrap_or_else(|e| panic!("invalid INSERTED regex: {e}"))
});

/// Rewrites `stmt` into PostgreSQL text plus positional arguments.
pub fn render(stmt: &SqlStatement) -> Result<(String, Vec<SqlValue>), RenderError> {
    let (body, returning) = split_output(&stmt.sql);

    let mut out = String::with_capacity(body.len() + 16);
    let mut args: Vec<SqlValue> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let chars: Vec<char> = body.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\'' | '"' => {
                let end = quoted_end(&chars, i, c);
                out.extend(&chars[i..end]);
                i = end;
            }
            '-' if chars.get(i + 1) == Some(&'-') => {
                let end = chars[i..]
                    .iter()
                    .position(|&ch| ch == '\n')
                    .map_or(chars.len(), |p| i + p);
                out.extend(&chars[i..end]);
                i = end;
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                let end = find_block_end(&chars, i + 2);
                out.extend(&chars[i..end]);
                i = end;
            }
            '[' => {
                let close = chars[i + 1..]
                    .iter()
                    .position(|&ch| ch == ']')
                    .ok_or(RenderError::UnterminatedIdentifier)?;
                let name: String = chars[i + 1..i + 1 + close].iter().collect();
                out.push('"');
                out.push_str(&name.replace('"', "\"\""));
                out.push('"');
                i += close + 2;
            }
            '@' if chars.get(i + 1).is_some_and(|ch| is_word(*ch)) => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && is_word(chars[end]) {
                    end += 1;
                }
                let name: String = chars[start..end].iter().collect();
                let value = stmt
                    .param(&name)
                    .ok_or_else(|| RenderError::MissingParam(name.clone()))?;
                if value.is_null() {
                    out.push_str("NULL");
                } else {
                    let idx = *positions.entry(name).or_insert_with(|| {
                        args.push(value.clone());
                        args.len()
                    });
                    out.push('$');
                    out.push_str(&idx.to_string());
                }
                i = end;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    if !returning.is_empty() {
        let cols: Vec<String> = returning.iter().map(|c| format!("\"{c}\"")).collect();
        out.push_str(" RETURNING ");
        out.push_str(&cols.join(", "));
    }
    Ok((out, args))
}

fn split_output(sql: &str) -> (String, Vec<String>) {
    let Some(caps) = OUTPUT_CLAUSE.captures(sql) else {
        return (sql.to_string(), Vec::new());
    };
    let columns = INSERTED_COLUMN
        .captures_iter(&caps[1])
        .map(|c| c[1].to_string())
        .collect();
    (OUTPUT_CLAUSE.replace(sql, "").into_owned(), columns)
}

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Index one past the closing quote; doubled quotes are escapes.
fn quoted_end(chars: &[char], start: usize, quote: char) -> usize {
    let mut i = start + 1;
    while i < chars.len() {
        if chars[i] == quote {
            if chars.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    chars.len()
}

fn find_block_end(chars: &[char], from: usize) -> usize {
    let mut i = from;
    while i + 1 < chars.len() {
        if chars[i] == '*' && chars[i + 1] == '/' {
            return i + 2;
        }
        i += 1;
    }
    chars.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{build_insert_returning, build_update, Fields};

    #[test]
    fn test_render_identifiers_and_params() {
        let stmt = build_update(
            "Users",
            &Fields::new().with("Name", "B"),
            &Fields::new().with("Id", 1),
        )
        .unwrap();
        let (sql, args) = render(&stmt).unwrap();
        assert_eq!(sql, r#"UPDATE "Users" SET "Name"=$1 WHERE "Id"=$2"#);
        assert_eq!(args, vec![SqlValue::Text("B".into()), SqlValue::Int(1)]);
    }

    #[test]
    fn test_repeated_param_shares_index_and_null_is_inlined() {
        let stmt = SqlStatement::new("SELECT * FROM [T] WHERE [a]=@x OR [b]=@x OR [c]=@n")
            .bind("x", 5)
            .bind("n", SqlValue::Null);
        let (sql, args) = render(&stmt).unwrap();
        assert_eq!(sql, r#"SELECT * FROM "T" WHERE "a"=$1 OR "b"=$1 OR "c"=NULL"#);
        assert_eq!(args, vec![SqlValue::Int(5)]);
    }

    #[test]
    fn test_output_inserted_becomes_returning() {
        let stmt = build_insert_returning("Orders", &Fields::new().with("Name", "x"), "Id").unwrap();
        let (sql, _) = render(&stmt).unwrap();
        assert_eq!(sql, r#"INSERT INTO "Orders" ("Name") VALUES ($1) RETURNING "Id""#);
    }

    #[test]
    fn test_literals_and_comments_untouched() {
        let stmt = SqlStatement::new("SELECT '[x] @y', \"Q\" FROM [T] -- @z [w]\nWHERE [a]=@a")
            .bind("a", 1);
        let (sql, args) = render(&stmt).unwrap();
        assert_eq!(sql, "SELECT '[x] @y', \"Q\" FROM \"T\" -- @z [w]\nWHERE \"a\"=$1");
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn test_missing_param() {
        let stmt = SqlStatement::new("SELECT * FROM [T] WHERE [a]=@a");
        assert_eq!(render(&stmt), Err(RenderError::MissingParam("a".into())));
    }
}
