// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use csvview_app::{FileId, Upload, UploadId};
use rusqlite::{Connection, OptionalExtension, Row, params};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

pub const APP_NAME: &str = "csvview";
pub const MAX_UPLOAD_SIZE: i64 = 50 << 20;

const SCHEMA: &str = "
CREATE TABLE uploads (
  id INTEGER PRIMARY KEY,
  file_id TEXT NOT NULL UNIQUE,
  file_name TEXT NOT NULL,
  author TEXT NOT NULL,
  description TEXT NOT NULL,
  size_bytes INTEGER NOT NULL,
  sha256 TEXT NOT NULL,
  uploaded_at TEXT NOT NULL
);
";

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[(
    "uploads",
    &[
        "id",
        "file_id",
        "file_name",
        "author",
        "description",
        "size_bytes",
        "sha256",
        "uploaded_at",
    ],
)];

const UPLOAD_COLUMNS: &str =
    "id, file_id, file_name, author, description, size_bytes, sha256, uploaded_at";

/// Upload metadata to record. `data` is hashed and measured, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUpload {
    pub file_id: FileId,
    pub file_name: String,
    pub author: String,
    pub description: String,
    pub data: Vec<u8>,
    pub uploaded_at: OffsetDateTime,
}

pub struct Store {
    conn: Connection,
    max_upload_size: i64,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
        log::debug!("opened upload registry at {}", path.display());
        Ok(Self {
            conn,
            max_upload_size: MAX_UPLOAD_SIZE,
        })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self {
            conn,
            max_upload_size: MAX_UPLOAD_SIZE,
        })
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    pub fn bootstrap(&self) -> Result<()> {
        if table_exists(&self.conn, "uploads")? {
            validate_schema(&self.conn)?;
        } else {
            self.conn
                .execute_batch(SCHEMA)
                .context("create uploads schema")?;
        }
        Ok(())
    }

    pub fn set_max_upload_size(&mut self, value: i64) -> Result<()> {
        if value <= 0 {
            bail!("max upload size must be positive, got {value}");
        }
        self.max_upload_size = value;
        Ok(())
    }

    pub fn max_upload_size(&self) -> i64 {
        self.max_upload_size
    }

    pub fn insert_upload(&self, new_upload: &NewUpload) -> Result<UploadId> {
        let size = i64::try_from(new_upload.data.len()).context("upload size overflow")?;
        if size > self.max_upload_size {
            bail!(
                "{} is {} bytes but max allowed is {}; raise [storage].max_upload_size or shrink the file",
                new_upload.file_name,
                size,
                self.max_upload_size
            );
        }

        let checksum = checksum_sha256(&new_upload.data);
        let uploaded_at = new_upload
            .uploaded_at
            .format(&Rfc3339)
            .context("format upload timestamp")?;
        self.conn
            .execute(
                "
                INSERT INTO uploads (
                  file_id, file_name, author, description, size_bytes, sha256, uploaded_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?)
                ",
                params![
                    new_upload.file_id.as_str(),
                    new_upload.file_name,
                    new_upload.author,
                    new_upload.description,
                    size,
                    checksum,
                    uploaded_at,
                ],
            )
            .with_context(|| format!("record upload {}", new_upload.file_name))?;

        let id = UploadId::new(self.conn.last_insert_rowid());
        log::debug!(
            "recorded upload {} as {} ({size} bytes)",
            new_upload.file_name,
            new_upload.file_id
        );
        Ok(id)
    }

    pub fn list_uploads(&self) -> Result<Vec<Upload>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {UPLOAD_COLUMNS} FROM uploads ORDER BY id ASC"
            ))
            .context("prepare uploads query")?;
        let rows = stmt
            .query_map([], upload_from_row)
            .context("query uploads")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect uploads")
    }

    pub fn get_upload(&self, upload_id: UploadId) -> Result<Upload> {
        self.conn
            .query_row(
                &format!("SELECT {UPLOAD_COLUMNS} FROM uploads WHERE id = ?"),
                params![upload_id.get()],
                upload_from_row,
            )
            .optional()
            .with_context(|| format!("load upload {}", upload_id.get()))?
            .ok_or_else(|| anyhow!("upload {} not found", upload_id.get()))
    }

    pub fn find_upload_by_file_id(&self, file_id: &FileId) -> Result<Option<Upload>> {
        self.conn
            .query_row(
                &format!("SELECT {UPLOAD_COLUMNS} FROM uploads WHERE file_id = ?"),
                params![file_id.as_str()],
                upload_from_row,
            )
            .optional()
            .with_context(|| format!("look up upload {file_id}"))
    }

    pub fn delete_upload(&self, upload_id: UploadId) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM uploads WHERE id = ?", params![upload_id.get()])
            .with_context(|| format!("delete upload {}", upload_id.get()))?;
        if changed == 0 {
            bail!(
                "upload {} not found; refresh the list and retry",
                upload_id.get()
            );
        }
        log::debug!("deleted upload {}", upload_id.get());
        Ok(())
    }
}

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("CSVVIEW_DB_PATH") {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set CSVVIEW_DB_PATH to a writable database path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join("csvview.db"))
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

pub fn checksum_sha256(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    let mut output = String::with_capacity(64);
    for byte in digest {
        use std::fmt::Write as _;
        let _ = write!(&mut output, "{byte:02x}");
    }
    output
}

fn upload_from_row(row: &Row<'_>) -> rusqlite::Result<Upload> {
    let uploaded_at: String = row.get(7)?;
    Ok(Upload {
        id: UploadId::new(row.get(0)?),
        file_id: FileId::from(row.get::<_, String>(1)?),
        file_name: row.get(2)?,
        author: row.get(3)?,
        description: row.get(4)?,
        size_bytes: row.get(5)?,
        sha256: row.get(6)?,
        uploaded_at: parse_datetime(&uploaded_at).map_err(to_sql_error)?,
    })
}

fn validate_schema(conn: &Connection) -> Result<()> {
    for (table, required_columns) in REQUIRED_SCHEMA {
        if !table_exists(conn, table)? {
            bail!(
                "database is missing required table `{table}`; point [storage].db_path at a csvview database"
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
                "table `{table}` is missing required columns: {}; move the old database aside and relaunch",
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

    rows.collect::<rusqlite::Result<BTreeSet<_>>>()
        .with_context(|| format!("collect columns for {table}"))
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}

fn parse_datetime(raw: &str) -> Result<OffsetDateTime> {
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(value);
    }

    // Rows written by hand in the sqlite shell.
    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    ) {
        return Ok(value.assume_utc());
    }

    bail!("unsupported datetime format {raw:?}")
}

fn to_sql_error(error: anyhow::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        7,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            error.to_string(),
        )),
    )
}
