//! Select-only screening for user-authored SQL (dropdown sources, delete guards).
//!
//! This is a keyword blacklist, not a parser. It scans outside of string
//! literals and rejects comments, stacked statements, anything that does not
//! start with SELECT/WITH, and any write or administrative keyword, including
//! PostgreSQL functions that signal backends, touch sequences or files, or
//! reach other servers.

use crate::error::ReadOnlySqlError;

const FORBIDDEN: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "MERGE", "DROP", "ALTER", "CREATE", "TRUNCATE", "EXEC",
    "EXECUTE", "GRANT", "REVOKE", "DENY", "INTO", "BACKUP", "RESTORE", "SHUTDOWN", "DBCC",
    // PostgreSQL statements and functions with side effects
    "COPY", "LOCK", "CALL", "DO", "VACUUM", "REINDEX", "NOTIFY", "LISTEN", "SETVAL", "NEXTVAL",
    "SET_CONFIG", "QUERY_TO_XML", "QUERY_TO_XML_AND_XMLSCHEMA", "QUERY_TO_XMLSCHEMA",
];

const FORBIDDEN_PREFIXES: &[&str] = &[
    "SP_", "XP_",
    "PG_TERMINATE", "PG_CANCEL", "PG_SLEEP", "PG_RELOAD", "PG_ROTATE", "PG_ADVISORY",
    "PG_TRY_ADVISORY", "PG_NOTIFY", "PG_READ_", "PG_LS_", "PG_STAT_FILE", "PG_FILE_",
    "PG_CREATE_", "PG_DROP_", "PG_SWITCH_", "PG_PROMOTE", "PG_WAL_", "PG_LOGICAL_",
    "PG_REPLICATION_", "PG_STAT_RESET", "PG_IMPORT_", "PG_BACKUP_", "PG_START_BACKUP",
    "PG_STOP_BACKUP", "DBLINK", "LO_",
];

/// Returns `Ok(())` when `sql` looks like a single read-only query.
pub fn ensure_select_only(sql: &str) -> Result<(), ReadOnlySqlError> {
    let body = sql.trim().trim_end_matches(|c: char| c == ';' || c.is_whitespace());
    if body.is_empty() {
        return Err(ReadOnlySqlError::Empty);
    }

    let words = scan(body)?;
    match words.first().map(String::as_str) {
        Some("SELECT" | "WITH") => {}
        _ => return Err(ReadOnlySqlError::NotSelect),
    }

    for word in &words {
        if FORBIDDEN.contains(&word.as_str())
            || FORBIDDEN_PREFIXES.iter().any(|p| word.starts_with(p))
        {
            return Err(ReadOnlySqlError::ForbiddenKeyword(word.clone()));
        }
    }
    Ok(())
}

/// Upper-cased words found outside of string literals.
fn scan(sql: &str) -> Result<Vec<String>, ReadOnlySqlError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut chars = sql.chars().peekable();
    let mut in_literal = false;

    while let Some(c) = chars.next() {
        if in_literal {
            if c == '\'' {
                if chars.peek() == Some(&'\'') {
                    chars.next();
                } else {
                    in_literal = false;
                }
            }
            continue;
        }
        match c {
            '\'' => {
                flush(&mut current, &mut words);
                in_literal = true;
            }
            '-' if chars.peek() == Some(&'-') => return Err(ReadOnlySqlError::Comment),
            '/' if chars.peek() == Some(&'*') => return Err(ReadOnlySqlError::Comment),
            ';' => return Err(ReadOnlySqlError::MultipleStatements),
            c if c.is_alphanumeric() || c == '_' => current.push(c.to_ascii_uppercase()),
            _ => flush(&mut current, &mut words),
        }
    }
    flush(&mut current, &mut words);
    Ok(words)
}

fn flush(current: &mut String, words: &mut Vec<String>) {
    if !current.is_empty() {
        words.push(std::mem::take(current));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_selects_pass() {
        for sql in [
            "SELECT Value, Text FROM T",
            "select [Code],[Name] from [BAS_ITEM] where [IsActive] = 1 order by [Code];",
            "WITH x AS (SELECT 1 AS a) SELECT a FROM x",
            "SELECT UPDATED_AT, CREATED_BY FROM Audit",
            "SELECT 'delete me' AS label FROM T",
            "SELECT 'it''s' FROM T",
        ] {
            assert_eq!(ensure_select_only(sql), Ok(()), "{sql}");
        }
    }

    #[test]
    fn test_write_statements_rejected() {
        assert_eq!(
            ensure_select_only("DELETE FROM T"),
            Err(ReadOnlySqlError::NotSelect)
        );
        assert_eq!(
            ensure_select_only("SELECT * FROM T WHERE 1=1 DELETE FROM T"),
            Err(ReadOnlySqlError::ForbiddenKeyword("DELETE".into()))
        );
        assert_eq!(
            ensure_select_only("SELECT * INTO Copy FROM T"),
            Err(ReadOnlySqlError::ForbiddenKeyword("INTO".into()))
        );
        assert_eq!(
            ensure_select_only("SELECT * FROM T WHERE x = sp_executesql"),
            Err(ReadOnlySqlError::ForbiddenKeyword("SP_EXECUTESQL".into()))
        );
    }

    #[test]
    fn test_postgres_side_effect_functions_rejected() {
        for (sql, word) in [
            ("SELECT pg_terminate_backend(pid) FROM pg_stat_activity", "PG_TERMINATE_BACKEND"),
            ("SELECT pg_cancel_backend(42)", "PG_CANCEL_BACKEND"),
            ("SELECT setval('s', 1)", "SETVAL"),
            ("SELECT nextval('s')", "NEXTVAL"),
            ("SELECT set_config('search_path', 'x', false)", "SET_CONFIG"),
            ("SELECT dblink_exec('host=x', 'DROP TABLE t')", "DBLINK_EXEC"),
            ("SELECT lo_import('/etc/passwd')", "LO_IMPORT"),
            ("SELECT pg_sleep(600)", "PG_SLEEP"),
            ("SELECT pg_read_file('postgresql.conf')", "PG_READ_FILE"),
            ("SELECT pg_advisory_lock(1)", "PG_ADVISORY_LOCK"),
            ("SELECT * FROM T WHERE 1=1 LOCK TABLE T", "LOCK"),
            ("SELECT \"pg_sleep\"(1)", "PG_SLEEP"),
            ("WITH x AS (SELECT 1) SELECT query_to_xml('delete from t', true, false, '')", "QUERY_TO_XML"),
        ] {
            assert_eq!(
                ensure_select_only(sql),
                Err(ReadOnlySqlError::ForbiddenKeyword(word.into())),
                "{sql}"
            );
        }
    }

    #[test]
    fn test_postgres_statements_rejected() {
        for sql in ["COPY t TO '/tmp/x'", "LOCK TABLE t", "CALL p()", "DO $$ BEGIN END $$"] {
            assert_eq!(ensure_select_only(sql), Err(ReadOnlySqlError::NotSelect), "{sql}");
        }
        assert_eq!(
            ensure_select_only("SELECT 1 FROM T WHERE x IN (SELECT 1) DO"),
            Err(ReadOnlySqlError::ForbiddenKeyword("DO".into()))
        );
    }

    #[test]
    fn test_comments_and_stacking_rejected() {
        assert_eq!(
            ensure_select_only("SELECT 1 -- DROP"),
            Err(ReadOnlySqlError::Comment)
        );
        assert_eq!(
            ensure_select_only("SELECT /* x */ 1"),
            Err(ReadOnlySqlError::Comment)
        );
        assert_eq!(
            ensure_select_only("SELECT 1; SELECT 2"),
            Err(ReadOnlySqlError::MultipleStatements)
        );
    }

    #[test]
    fn test_empty_rejected() {
        assert_eq!(ensure_select_only("   ;"), Err(ReadOnlySqlError::Empty));
    }
}
