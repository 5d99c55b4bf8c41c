//! Shared fixtures: a temporary SQLite `team` database and a counting stub engine.

#![allow(dead_code)]

use async_trait::async_trait;
use nlsql_mcp_server::ai::SqlEngine;
use nlsql_mcp_server::db::{ConnectionManager, ConnectionSettings};
use nlsql_mcp_server::error::NlsqlResult;
use nlsql_mcp_server::models::{DatabaseType, SchemaSnapshot};
use nlsql_mcp_server::tools::ToolDispatcher;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const STUB_SUMMARY: &str = "STUB SUMMARY: one table of NBA teams";

/// A SQLite file with a three-row `team` table, removed on drop.
pub struct TeamDatabase {
    _dir: TempDir,
    pub path: PathBuf,
}

impl TeamDatabase {
    pub fn location(&self) -> &str {
        self.path.to_str().unwrap()
    }
}

pub async fn team_database() -> TeamDatabase {
    team_database_named("nba.sqlite").await
}

pub async fn team_database_named(file_name: &str) -> TeamDatabase {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(file_name);
    std::fs::File::create(&path).unwrap();

    let manager = ConnectionManager::default();
    manager
        .connect("sqlite", path.to_str().unwrap())
        .await
        .unwrap();
    manager
        .execute(
            "CREATE TABLE team (id INTEGER PRIMARY KEY, full_name TEXT NOT NULL, nickname TEXT)",
            None,
        )
        .await
        .unwrap();
    manager
        .execute(
            "INSERT INTO team (id, full_name, nickname) VALUES \
             (1, 'Atlanta Hawks', 'Hawks'), \
             (2, 'Boston Celtics', 'Celtics'), \
             (3, 'Chicago Bulls', 'Bulls')",
            None,
        )
        .await
        .unwrap();
    manager.disconnect().await;

    TeamDatabase { _dir: dir, path }
}

pub fn manager_with_sample(sample: &Path) -> Arc<ConnectionManager> {
    Arc::new(ConnectionManager::new(ConnectionSettings {
        sample_location: sample.to_path_buf(),
        ..ConnectionSettings::default()
    }))
}

/// Engine that answers with a fixed SQL string and counts its calls.
pub struct StubEngine {
    pub sql: String,
    pub analyze_calls: AtomicUsize,
    pub translate_calls: AtomicUsize,
    pub last_context: Mutex<Option<String>>,
}

impl StubEngine {
    pub fn new(sql: &str) -> Arc<Self> {
        Arc::new(Self {
            sql: sql.to_string(),
            analyze_calls: AtomicUsize::new(0),
            translate_calls: AtomicUsize::new(0),
            last_context: Mutex::new(None),
        })
    }

    pub fn analyze_count(&self) -> usize {
        self.analyze_calls.load(Ordering::SeqCst)
    }

    pub fn translate_count(&self) -> usize {
        self.translate_calls.load(Ordering::SeqCst)
    }

    pub fn last_context(&self) -> Option<String> {
        self.last_context.lock().unwrap().clone()
    }
}

#[async_trait]
impl SqlEngine for StubEngine {
    async fn analyze_schema(&self, _snapshot: &SchemaSnapshot) -> NlsqlResult<String> {
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);
        Ok(STUB_SUMMARY.to_string())
    }

    async fn translate(
        &self,
        _question: &str,
        schema_context: Option<&str>,
        _dialect: DatabaseType,
    ) -> NlsqlResult<String> {
        self.translate_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_context.lock().unwrap() = schema_context.map(str::to_string);
        Ok(self.sql.clone())
    }
}

pub fn dispatcher_with(
    manager: Arc<ConnectionManager>,
    engine: Arc<StubEngine>,
) -> ToolDispatcher {
    ToolDispatcher::new(manager, engine)
}
