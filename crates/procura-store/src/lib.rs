// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use procura_app::{Role, ScreenKind, SessionContext};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub const APP_NAME: &str = "procura";

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[
    ("ui_state", &["screen", "page", "updated_at"]),
    (
        "session",
        &["id", "token", "name", "email", "role", "company", "saved_at"],
    ),
    ("prefs", &["key", "value", "updated_at"]),
];

const PREF_SHOW_DELETED: &str = "ui.show_deleted";
const PREF_PAGE_SIZE: &str = "ui.page_size";

/// Local client state: the per-screen page position, the saved session, and
/// small UI preferences. Portal data itself is never cached here.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    pub fn bootstrap(&self) -> Result<()> {
        if has_user_tables(&self.conn)? {
            validate_schema(&self.conn)?;
        } else {
            self.conn
                .execute_batch(include_str!("sql/schema.sql"))
                .context("create schema")?;
        }
        Ok(())
    }

    pub fn save_page(&self, screen: ScreenKind, page: usize) -> Result<()> {
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO ui_state (screen, page, updated_at)
                VALUES (?, ?, ?)
                ON CONFLICT(screen) DO UPDATE SET
                  page = excluded.page,
                  updated_at = excluded.updated_at
                ",
                params![screen.as_str(), page as i64, now],
            )
            .with_context(|| format!("save page for {}", screen.as_str()))?;
        Ok(())
    }

    pub fn load_page(&self, screen: ScreenKind) -> Result<Option<usize>> {
        let page = self
            .conn
            .query_row(
                "SELECT page FROM ui_state WHERE screen = ?",
                params![screen.as_str()],
                |row| row.get::<_, i64>(0),
            )
            .optional()
            .with_context(|| format!("read saved page for {}", screen.as_str()))?;
        Ok(page.map(|page| usize::try_from(page.max(1)).unwrap_or(1)))
    }

    pub fn save_session(&self, session: &SessionContext) -> Result<()> {
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO session (id, token, name, email, role, company, saved_at)
                VALUES (1, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                  token = excluded.token,
                  name = excluded.name,
                  email = excluded.email,
                  role = excluded.role,
                  company = excluded.company,
                  saved_at = excluded.saved_at
                ",
                params![
                    session.token,
                    session.name,
                    session.email,
                    session.role.as_str(),
                    session.company,
                    now
                ],
            )
            .context("save session")?;
        Ok(())
    }

    pub fn load_session(&self) -> Result<Option<SessionContext>> {
        let row = self
            .conn
            .query_row(
                "SELECT token, name, email, role, company FROM session WHERE id = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<String>>(4)?,
                    ))
                },
            )
            .optional()
            .context("read saved session")?;

        let Some((token, name, email, role, company)) = row else {
            return Ok(None);
        };
        let role = Role::parse(&role).ok_or_else(|| {
            anyhow!("saved session has unknown role `{role}`; sign in again to replace it")
        })?;
        Ok(Some(SessionContext {
            token,
            name,
            email,
            role,
            company,
        }))
    }

    pub fn clear_session(&self) -> Result<()> {
        self.conn
            .execute("DELETE FROM session", [])
            .context("clear saved session")?;
        Ok(())
    }

    pub fn save_show_deleted(&self, value: bool) -> Result<()> {
        self.put_pref_raw(PREF_SHOW_DELETED, if value { "1" } else { "0" })
    }

    pub fn load_show_deleted(&self) -> Result<Option<bool>> {
        let raw = self.get_pref_raw(PREF_SHOW_DELETED)?;
        raw.map(|value| match value.as_str() {
            "1" => Ok(true),
            "0" => Ok(false),
            other => Err(anyhow!(
                "pref `{PREF_SHOW_DELETED}` has invalid value `{other}`; expected 0 or 1"
            )),
        })
        .transpose()
    }

    pub fn save_page_size(&self, value: usize) -> Result<()> {
        if value == 0 {
            bail!("page size must be positive");
        }
        self.put_pref_raw(PREF_PAGE_SIZE, &value.to_string())
    }

    pub fn load_page_size(&self) -> Result<Option<usize>> {
        let raw = self.get_pref_raw(PREF_PAGE_SIZE)?;
        raw.map(|value| {
            value
                .parse::<usize>()
                .ok()
                .filter(|size| *size > 0)
                .ok_or_else(|| {
                    anyhow!("pref `{PREF_PAGE_SIZE}` has invalid value `{value}`; expected a positive integer")
                })
        })
        .transpose()
    }

    fn get_pref_raw(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM prefs WHERE key = ?",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .with_context(|| format!("read pref {key}"))
    }

    fn put_pref_raw(&self, key: &str, value: &str) -> Result<()> {
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO prefs (key, value, updated_at)
                VALUES (?, ?, ?)
                ON CONFLICT(key) DO UPDATE SET
                  value = excluded.value,
                  updated_at = excluded.updated_at
                ",
                params![key, value, now],
            )
            .with_context(|| format!("upsert pref {key}"))?;
        Ok(())
    }
}

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("PROCURA_DB_PATH") {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set PROCURA_DB_PATH to a writable database path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join("procura.db"))
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("database path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "database path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("database path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!(
            "database path {path:?} contains '?'; remove query parameters and use a plain file path"
        );
    }

    Ok(())
}

fn has_user_tables(conn: &Connection) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "
            SELECT COUNT(*)
            FROM sqlite_master
            WHERE type = 'table'
              AND name NOT LIKE 'sqlite_%'
            ",
            [],
            |row| row.get(0),
        )
        .context("count user tables")?;
    Ok(count > 0)
}

fn validate_schema(conn: &Connection) -> Result<()> {
    for (table, required_columns) in REQUIRED_SCHEMA {
        if !table_exists(conn, table)? {
            bail!(
                "database is missing required table `{table}`; use a procura state database or delete the file to recreate it"
            );
        }

        let columns = table_columns(conn, table)?;
        let missing: Vec<&str> = required_columns
            .iter()
            .copied()
            .filter(|column| !columns.contains(*column))
            .collect();

        if !missing.is_empty() {
            bail!(
                "table `{table}` is missing required columns: {}; delete the state database to recreate it",
                missing.join(", ")
            );
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let exists = conn
        .query_row(
            "
            SELECT EXISTS(
              SELECT 1
              FROM sqlite_master
              WHERE type = 'table' AND name = ?
            )
            ",
            params![table],
            |row| row.get::<_, i64>(0),
        )
        .with_context(|| format!("check table existence for {table}"))?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("inspect columns for {table}"))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .with_context(|| format!("query column info for {table}"))?;

    let names = rows
        .collect::<rusqlite::Result<BTreeSet<_>>>()
        .with_context(|| format!("collect columns for {table}"))?;
    Ok(names)
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("format current timestamp")
}
