//! In-memory [`Database`] for orchestration tests.
//!
//! Replies are chosen by SQL substring. One-shot replies are consumed in the
//! order they were registered and take precedence; otherwise the most recently
//! registered standing reply wins. Unmatched queries return no rows and
//! unmatched statements report one affected row.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use k1s0_dynamic_sql::{DbRow, SqlStatement};

use super::{Database, DbError, SqlExecutor, UnitOfWork};

#[derive(Debug, Clone)]
enum Reply {
    Rows(Vec<DbRow>),
    Affected(u64),
    Fail(String),
}

#[derive(Debug)]
struct Rule {
    pattern: String,
    reply: Reply,
    once: bool,
}

#[derive(Debug, Default)]
struct ScriptState {
    rules: Vec<Rule>,
    executed: Vec<SqlStatement>,
    begins: usize,
    commits: usize,
    rollbacks: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedDatabase {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, pattern: &str, reply: Reply, once: bool) {
        self.lock().rules.push(Rule {
            pattern: pattern.to_string(),
            reply,
            once,
        });
    }

    pub fn on_query(&self, pattern: &str, rows: Vec<DbRow>) {
        self.push(pattern, Reply::Rows(rows), false);
    }

    pub fn on_query_once(&self, pattern: &str, rows: Vec<DbRow>) {
        self.push(pattern, Reply::Rows(rows), true);
    }

    pub fn on_execute(&self, pattern: &str, affected: u64) {
        self.push(pattern, Reply::Affected(affected), false);
    }

    pub fn fail_on(&self, pattern: &str, message: &str) {
        self.push(pattern, Reply::Fail(message.to_string()), false);
    }

    /// Every statement run so far, in order.
    pub fn statements(&self) -> Vec<SqlStatement> {
        self.lock().executed.clone()
    }

    pub fn statements_matching(&self, pattern: &str) -> Vec<SqlStatement> {
        self.lock()
            .executed
            .iter()
            .filter(|s| s.sql.contains(pattern))
            .cloned()
            .collect()
    }

    pub fn begins(&self) -> usize {
        self.lock().begins
    }

    pub fn commits(&self) -> usize {
        self.lock().commits
    }

    pub fn rollbacks(&self) -> usize {
        self.lock().rollbacks
    }

    fn reply(&self, stmt: &SqlStatement) -> Option<Reply> {
        let mut state = self.lock();
        state.executed.push(stmt.clone());
        if let Some(i) = state
            .rules
            .iter()
            .position(|r| r.once && stmt.sql.contains(&r.pattern))
        {
            return Some(state.rules.remove(i).reply);
        }
        state
            .rules
            .iter()
            .rev()
            .find(|r| !r.once && stmt.sql.contains(&r.pattern))
            .map(|r| r.reply.clone())
    }
}

#[async_trait]
impl SqlExecutor for ScriptedDatabase {
    async fn execute(&mut self, stmt: &SqlStatement) -> Result<u64, DbError> {
        match self.reply(stmt) {
            None => Ok(1),
            Some(Reply::Affected(n)) => Ok(n),
            Some(Reply::Rows(rows)) => Ok(rows.len() as u64),
            Some(Reply::Fail(message)) => Err(DbError::Other(message)),
        }
    }

    async fn query(&mut self, stmt: &SqlStatement) -> Result<Vec<DbRow>, DbError> {
        match self.reply(stmt) {
            None | Some(Reply::Affected(_)) => Ok(Vec::new()),
            Some(Reply::Rows(rows)) => Ok(rows),
            Some(Reply::Fail(message)) => Err(DbError::Other(message)),
        }
    }
}

#[async_trait]
impl UnitOfWork for ScriptedDatabase {
    fn executor(&mut self) -> &mut dyn SqlExecutor {
        self
    }

    async fn commit(self: Box<Self>) -> Result<(), DbError> {
        self.lock().commits += 1;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DbError> {
        self.lock().rollbacks += 1;
        Ok(())
    }
}

#[async_trait]
impl Database for ScriptedDatabase {
    async fn begin(&self, _actor: &str) -> Result<Box<dyn UnitOfWork>, DbError> {
        self.lock().begins += 1;
        Ok(Box::new(self.clone()))
    }

    async fn connection(&self, _actor: &str) -> Result<Box<dyn SqlExecutor>, DbError> {
        Ok(Box::new(self.clone()))
    }

    async fn ping(&self) -> Result<(), DbError> {
        Ok(())
    }
}
