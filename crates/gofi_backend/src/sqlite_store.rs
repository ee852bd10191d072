use crate::time::unix_epoch_seconds_now;
use anyhow::{Context as _, anyhow};
use gofi_domain::{Configuration, ConfigurationStore, ConfigurationUpdate, NewConfiguration};
use rusqlite::types::Value;
use rusqlite::{Connection, Row, TransactionBehavior, params, params_from_iter};
use std::path::{Path, PathBuf};
use std::sync::mpsc;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum SqliteStoreError {
    ConfigurationNotFound,
    MultipleConfigurations,
}

impl std::fmt::Display for SqliteStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqliteStoreError::ConfigurationNotFound => write!(f, "configuration not found"),
            SqliteStoreError::MultipleConfigurations => {
                write!(f, "more than one configuration row exists")
            }
        }
    }
}

impl std::error::Error for SqliteStoreError {}

const LATEST_SCHEMA_VERSION: u32 = 1;

const MIGRATIONS: &[(u32, &str)] = &[(
    1,
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/migrations/0001_init.sql")),
)];

const CONFIGURATION_COLUMNS: &str = "id, theme_style, theme_color, nav_mode, database_file_path, \
     custom_storage_path, log_directory_path, initialized, created, updated";

/// Handle to the sqlite worker thread. Cloning shares the same connection.
#[derive(Clone)]
pub struct SqliteStore {
    tx: mpsc::Sender<DbCommand>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SqliteStoreOptions {
    /// When false the schema is taken as-is; nothing is created or upgraded.
    pub run_migrations: bool,
}

impl Default for SqliteStoreOptions {
    fn default() -> Self {
        Self {
            run_migrations: true,
        }
    }
}

enum DbCommand {
    LoadOrCreateConfiguration {
        defaults: Box<NewConfiguration>,
        reply: mpsc::Sender<anyhow::Result<Configuration>>,
    },
    LoadConfiguration {
        reply: mpsc::Sender<anyhow::Result<Option<Configuration>>>,
    },
    CommitConfiguration {
        update: ConfigurationUpdate,
        reply: mpsc::Sender<anyhow::Result<Configuration>>,
    },
}

impl SqliteStore {
    pub fn new(db_path: PathBuf) -> anyhow::Result<Self> {
        Self::new_with_options(db_path, SqliteStoreOptions::default())
    }

    pub fn new_with_options(db_path: PathBuf, options: SqliteStoreOptions) -> anyhow::Result<Self> {
        let (tx, rx) = mpsc::channel::<DbCommand>();

        std::thread::Builder::new()
            .name("gofi-sqlite".to_owned())
            .spawn(move || {
                let mut db = SqliteDatabase::open(&db_path, options);
                while let Ok(cmd) = rx.recv() {
                    match (&mut db, cmd) {
                        (Ok(db), DbCommand::LoadOrCreateConfiguration { defaults, reply }) => {
                            let _ = reply.send(db.load_or_create_configuration(&defaults));
                        }
                        (Ok(db), DbCommand::LoadConfiguration { reply }) => {
                            let _ = reply.send(db.load_configuration());
                        }
                        (Ok(db), DbCommand::CommitConfiguration { update, reply }) => {
                            let _ = reply.send(db.commit_configuration(&update));
                        }
                        (Err(err), cmd) => {
                            respond_db_open_error(err, cmd);
                        }
                    }
                }
            })
            .context("failed to spawn sqlite worker thread")?;

        Ok(Self { tx })
    }

    pub fn load_or_create_configuration(
        &self,
        defaults: NewConfiguration,
    ) -> anyhow::Result<Configuration> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(DbCommand::LoadOrCreateConfiguration {
                defaults: Box::new(defaults),
                reply: reply_tx,
            })
            .context("sqlite worker is not running")?;
        reply_rx.recv().context("sqlite worker terminated")?
    }

    pub fn load_configuration(&self) -> anyhow::Result<Option<Configuration>> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(DbCommand::LoadConfiguration { reply: reply_tx })
            .context("sqlite worker is not running")?;
        reply_rx.recv().context("sqlite worker terminated")?
    }

    pub fn commit_configuration(
        &self,
        update: ConfigurationUpdate,
    ) -> anyhow::Result<Configuration> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(DbCommand::CommitConfiguration {
                update,
                reply: reply_tx,
            })
            .context("sqlite worker is not running")?;
        reply_rx.recv().context("sqlite worker terminated")?
    }
}

impl ConfigurationStore for SqliteStore {
    fn load_or_create(&self, defaults: NewConfiguration) -> Result<Configuration, String> {
        self.load_or_create_configuration(defaults)
            .map_err(|err| format!("{err:#}"))
    }

    fn load(&self) -> Result<Option<Configuration>, String> {
        self.load_configuration().map_err(|err| format!("{err:#}"))
    }

    fn commit(&self, update: ConfigurationUpdate) -> Result<Configuration, String> {
        self.commit_configuration(update)
            .map_err(|err| format!("{err:#}"))
    }
}

fn respond_db_open_error(err: &anyhow::Error, cmd: DbCommand) {
    let message = format!("{err:#}");
    match cmd {
        DbCommand::LoadOrCreateConfiguration { reply, .. } => {
            let _ = reply.send(Err(anyhow!(message)));
        }
        DbCommand::LoadConfiguration { reply } => {
            let _ = reply.send(Err(anyhow!(message)));
        }
        DbCommand::CommitConfiguration { reply, .. } => {
            let _ = reply.send(Err(anyhow!(message)));
        }
    }
}

struct SqliteDatabase {
    conn: Connection,
}

impl SqliteDatabase {
    fn open(db_path: &Path, options: SqliteStoreOptions) -> anyhow::Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let mut conn = Connection::open(db_path)
            .with_context(|| format!("failed to open sqlite db {}", db_path.display()))?;

        configure_connection(&mut conn).context("failed to configure sqlite connection")?;
        if options.run_migrations {
            apply_migrations(&mut conn).context("failed to apply sqlite migrations")?;
        } else {
            tracing::info!(db = %db_path.display(), "skipping sqlite schema migration");
        }

        Ok(Self { conn })
    }

    fn load_or_create_configuration(
        &mut self,
        defaults: &NewConfiguration,
    ) -> anyhow::Result<Configuration> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("failed to begin configuration transaction")?;

        if let Some(existing) = query_single_configuration(&tx)? {
            tx.commit()?;
            return Ok(existing);
        }

        tx.execute(
            "INSERT INTO configurations (
               id, theme_style, theme_color, nav_mode, database_file_path,
               custom_storage_path, log_directory_path, initialized, created, updated
             ) VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                defaults.theme_style,
                defaults.theme_color,
                defaults.nav_mode,
                defaults.database_file_path,
                defaults.custom_storage_path,
                defaults.log_directory_path,
                defaults.initialized as i64,
                defaults.created,
                defaults.updated,
            ],
        )
        .context("failed to create configuration")?;

        let created = query_single_configuration(&tx)?
            .ok_or(SqliteStoreError::ConfigurationNotFound)?;
        tx.commit()
            .context("failed to commit configuration creation")?;
        tracing::info!(id = created.id, "created first-run configuration");
        Ok(created)
    }

    fn load_configuration(&mut self) -> anyhow::Result<Option<Configuration>> {
        query_single_configuration(&self.conn)
    }

    fn commit_configuration(
        &mut self,
        update: &ConfigurationUpdate,
    ) -> anyhow::Result<Configuration> {
        let mut assignments: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();
        if let Some(value) = &update.theme_style {
            assignments.push("theme_style = ?");
            values.push(Value::Text(value.clone()));
        }
        if let Some(value) = &update.theme_color {
            assignments.push("theme_color = ?");
            values.push(Value::Text(value.clone()));
        }
        if let Some(value) = &update.nav_mode {
            assignments.push("nav_mode = ?");
            values.push(Value::Text(value.clone()));
        }
        if let Some(value) = &update.custom_storage_path {
            assignments.push("custom_storage_path = ?");
            values.push(Value::Text(value.clone()));
        }
        if let Some(value) = update.initialized {
            assignments.push("initialized = ?");
            values.push(Value::Integer(value as i64));
        }
        assignments.push("updated = ?");
        values.push(Value::Integer(unix_epoch_seconds_now()));
        values.push(Value::Integer(update.id));

        let tx = self
            .conn
            .transaction()
            .context("starting a transaction")?;

        let sql = format!(
            "UPDATE configurations SET {} WHERE id = ?",
            assignments.join(", ")
        );
        let changed = tx
            .execute(&sql, params_from_iter(values.iter()))
            .with_context(|| format!("failed to update configuration {}", update.id))?;
        if changed == 0 {
            return Err(anyhow!(SqliteStoreError::ConfigurationNotFound));
        }

        let committed = tx
            .query_row(
                &format!("SELECT {CONFIGURATION_COLUMNS} FROM configurations WHERE id = ?1"),
                params![update.id],
                configuration_from_row,
            )
            .with_context(|| format!("failed to reload configuration {}", update.id))?;

        tx.commit().context("committing a transaction")?;
        Ok(committed)
    }
}

fn query_single_configuration(conn: &Connection) -> anyhow::Result<Option<Configuration>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {CONFIGURATION_COLUMNS} FROM configurations ORDER BY id LIMIT 2"
        ))
        .context("failed to query configuration")?;
    let rows = stmt
        .query_map([], configuration_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to load configuration")?;

    match rows.len() {
        0 => Ok(None),
        1 => Ok(rows.into_iter().next()),
        _ => Err(anyhow!(SqliteStoreError::MultipleConfigurations)),
    }
}

fn configuration_from_row(row: &Row<'_>) -> rusqlite::Result<Configuration> {
    Ok(Configuration {
        id: row.get(0)?,
        theme_style: row.get(1)?,
        theme_color: row.get(2)?,
        nav_mode: row.get(3)?,
        database_file_path: row.get(4)?,
        custom_storage_path: row.get(5)?,
        log_directory_path: row.get(6)?,
        initialized: row.get::<_, i64>(7)? != 0,
        created: row.get(8)?,
        updated: row.get(9)?,
    })
}

fn configure_connection(conn: &mut Connection) -> anyhow::Result<()> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA busy_timeout = 5000;",
    )
    .context("failed to apply sqlite PRAGMAs")?;
    Ok(())
}

fn apply_migrations(conn: &mut Connection) -> anyhow::Result<()> {
    let current: u32 = conn
        .query_row("PRAGMA user_version", [], |row| row.get::<_, i64>(0))
        .context("failed to read user_version")? as u32;

    if current > LATEST_SCHEMA_VERSION {
        return Err(anyhow!(
            "sqlite schema version is newer than this build: db={}, app={}",
            current,
            LATEST_SCHEMA_VERSION
        ));
    }

    if current == LATEST_SCHEMA_VERSION {
        return Ok(());
    }

    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .context("failed to begin migration transaction")?;
    for (version, sql) in MIGRATIONS {
        if *version <= current {
            continue;
        }
        tx.execute_batch(sql)
            .with_context(|| format!("failed to apply migration v{version:04}"))?;
        tx.pragma_update(None, "user_version", *version as i64)
            .context("failed to update user_version")?;
    }
    tx.commit()
        .context("failed to commit migration transaction")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_db_path(dir: &TempDir) -> PathBuf {
        dir.path().join("gofi.db")
    }

    fn open_db(path: &Path) -> SqliteDatabase {
        SqliteDatabase::open(path, SqliteStoreOptions::default()).unwrap()
    }

    fn defaults() -> NewConfiguration {
        NewConfiguration::first_run("/srv/gofi/gofi.db", "/srv/gofi/log")
    }

    fn row_count(db: &SqliteDatabase) -> i64 {
        db.conn
            .query_row("SELECT COUNT(*) FROM configurations", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn migrations_create_schema() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&temp_db_path(&dir));

        let count: i64 = db
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('configurations','files')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn migrations_reopen_does_not_fail() {
        let dir = TempDir::new().unwrap();
        let path = temp_db_path(&dir);
        {
            let _db = open_db(&path);
        }

        let db = open_db(&path);
        let version: i64 = db
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version as u32, LATEST_SCHEMA_VERSION);
    }

    #[test]
    fn newer_schema_version_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = temp_db_path(&dir);
        {
            let conn = Connection::open(&path).unwrap();
            conn.pragma_update(None, "user_version", (LATEST_SCHEMA_VERSION + 1) as i64)
                .unwrap();
        }

        let err = SqliteDatabase::open(&path, SqliteStoreOptions::default())
            .err()
            .expect("newer schema should fail");
        assert!(
            format!("{err:#}").contains("newer than this build"),
            "unexpected error: {err:#}"
        );
    }

    #[test]
    fn skipped_migrations_leave_schema_untouched() {
        let dir = TempDir::new().unwrap();
        let path = temp_db_path(&dir);
        let mut db = SqliteDatabase::open(
            &path,
            SqliteStoreOptions {
                run_migrations: false,
            },
        )
        .unwrap();

        let version: i64 = db
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, 0);
        assert!(db.load_or_create_configuration(&defaults()).is_err());
    }

    #[test]
    fn skipped_migrations_still_serve_a_migrated_database() {
        let dir = TempDir::new().unwrap();
        let path = temp_db_path(&dir);
        let first = open_db(&path)
            .load_or_create_configuration(&defaults())
            .unwrap();

        let mut db = SqliteDatabase::open(
            &path,
            SqliteStoreOptions {
                run_migrations: false,
            },
        )
        .unwrap();
        assert_eq!(db.load_or_create_configuration(&defaults()).unwrap(), first);
    }

    #[test]
    fn load_or_create_inserts_defaults_once() {
        let dir = TempDir::new().unwrap();
        let mut db = open_db(&temp_db_path(&dir));
        assert_eq!(db.load_configuration().unwrap(), None);

        let first = db.load_or_create_configuration(&defaults()).unwrap();
        assert_eq!(first.id, 1);
        assert!(!first.initialized);
        assert_eq!(first.theme_style, "light");
        assert_eq!(first.theme_color, "#1890FF");
        assert_eq!(first.nav_mode, "top");
        assert_eq!(first.custom_storage_path, "");
        assert_eq!(first.database_file_path, "/srv/gofi/gofi.db");
        assert_eq!(first.log_directory_path, "/srv/gofi/log");
        assert_eq!((first.created, first.updated), (0, 0));

        let other_defaults = NewConfiguration::first_run("/elsewhere/gofi.db", "/elsewhere/log");
        let second = db.load_or_create_configuration(&other_defaults).unwrap();
        assert_eq!(second, first);
        assert_eq!(row_count(&db), 1);
    }

    #[test]
    fn second_row_is_refused_by_schema() {
        let dir = TempDir::new().unwrap();
        let mut db = open_db(&temp_db_path(&dir));
        db.load_or_create_configuration(&defaults()).unwrap();

        let inserted = db.conn.execute(
            "INSERT INTO configurations (id, theme_style, theme_color, nav_mode, database_file_path,
               custom_storage_path, log_directory_path, initialized, created, updated)
             VALUES (2, 'dark', '#000', 'side', '/x.db', '', '/log', 0, 0, 0)",
            [],
        );
        assert!(inserted.is_err());
        assert_eq!(row_count(&db), 1);
    }

    #[test]
    fn commit_updates_only_fields_set_on_the_builder() {
        let dir = TempDir::new().unwrap();
        let mut db = open_db(&temp_db_path(&dir));
        let base = db.load_or_create_configuration(&defaults()).unwrap();

        let committed = db
            .commit_configuration(
                &base
                    .update()
                    .set_initialized(true)
                    .set_custom_storage_path("/data"),
            )
            .unwrap();

        assert!(committed.initialized);
        assert_eq!(committed.custom_storage_path, "/data");
        assert_eq!(committed.theme_style, base.theme_style);
        assert_eq!(committed.theme_color, base.theme_color);
        assert_eq!(committed.created, base.created);
        assert!(committed.updated > 0);
        assert_eq!(db.load_configuration().unwrap(), Some(committed));
    }

    #[test]
    fn commit_persists_theme_fields() {
        let dir = TempDir::new().unwrap();
        let mut db = open_db(&temp_db_path(&dir));
        let base = db.load_or_create_configuration(&defaults()).unwrap();

        let committed = db
            .commit_configuration(
                &base
                    .update()
                    .set_theme_style("dark")
                    .set_theme_color("#000000")
                    .set_nav_mode("side"),
            )
            .unwrap();
        assert_eq!(committed.theme_style, "dark");
        assert_eq!(committed.theme_color, "#000000");
        assert_eq!(committed.nav_mode, "side");
        assert!(!committed.initialized);
    }

    #[test]
    fn commit_against_missing_row_fails_without_writing() {
        let dir = TempDir::new().unwrap();
        let mut db = open_db(&temp_db_path(&dir));

        let err = db
            .commit_configuration(&ConfigurationUpdate::new(1).set_initialized(true))
            .unwrap_err();
        assert!(
            err.to_string().contains("configuration not found"),
            "unexpected error: {err:#}"
        );
        assert_eq!(row_count(&db), 0);
    }

    #[test]
    fn rejected_update_rolls_back() {
        let dir = TempDir::new().unwrap();
        let mut db = open_db(&temp_db_path(&dir));
        let base = db.load_or_create_configuration(&defaults()).unwrap();

        let err = db.commit_configuration(
            &base
                .update()
                .set_initialized(true)
                .set_theme_style(""),
        );
        assert!(err.is_err());
        assert_eq!(db.load_configuration().unwrap(), Some(base));
    }

    #[test]
    fn store_handle_round_trips_through_worker() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::new(temp_db_path(&dir)).unwrap();

        let created = ConfigurationStore::load_or_create(&store, defaults()).unwrap();
        let committed = ConfigurationStore::commit(
            &store,
            created.update().set_initialized(true),
        )
        .unwrap();
        assert!(committed.initialized);
        assert_eq!(ConfigurationStore::load(&store).unwrap(), Some(committed));
    }

    #[test]
    fn store_reports_open_errors_per_command() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();

        let store = SqliteStore::new(blocker.join("gofi.db")).unwrap();
        let err = store.load_configuration().unwrap_err();
        assert!(
            format!("{err:#}").contains("failed to create"),
            "unexpected error: {err:#}"
        );
    }
}
