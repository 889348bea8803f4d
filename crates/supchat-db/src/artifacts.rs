//! SQLite-backed artifact stores. The document/task/milestone tables are
//! owned by the project-management side of the system; the chat core only
//! sees them through the `ArtifactStore` trait, so these can be swapped
//! for RPC-backed stores without touching the core.

use std::sync::Arc;

use anyhow::Result;
use rusqlite::Row;
use supchat_types::models::{TagKind, TagSnapshot};
use supchat_types::store::{ArtifactStore, TaggableItem};

use crate::Database;

pub struct SqliteArtifactStore {
    db: Arc<Database>,
    kind: TagKind,
}

impl SqliteArtifactStore {
    pub fn new(db: Arc<Database>, kind: TagKind) -> Self {
        Self { db, kind }
    }
}

fn select_columns(kind: TagKind) -> &'static str {
    match kind {
        TagKind::Document => "id, title, description, file_type",
        TagKind::Task => "id, title, description, status",
        TagKind::Milestone => "id, title, description, status, due_date",
    }
}

fn table(kind: TagKind) -> &'static str {
    match kind {
        TagKind::Document => "documents",
        TagKind::Task => "tasks",
        TagKind::Milestone => "milestones",
    }
}

fn read_projection(kind: TagKind, row: &Row<'_>) -> rusqlite::Result<(String, TagSnapshot)> {
    let id: String = row.get(0)?;
    let snapshot = match kind {
        TagKind::Document => TagSnapshot::Document {
            title: row.get(1)?,
            description: row.get(2)?,
            file_type: row.get(3)?,
        },
        TagKind::Task => TagSnapshot::Task {
            title: row.get(1)?,
            description: row.get(2)?,
            status: row.get(3)?,
        },
        TagKind::Milestone => TagSnapshot::Milestone {
            title: row.get(1)?,
            description: row.get(2)?,
            status: row.get(3)?,
            due_date: row.get(4)?,
        },
    };
    Ok((id, snapshot))
}

impl ArtifactStore for SqliteArtifactStore {
    fn kind(&self) -> TagKind {
        self.kind
    }

    fn fetch_by_id(&self, id: &str) -> Result<Option<TagSnapshot>> {
        let kind = self.kind;
        self.db.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM {} WHERE id = ?1",
                select_columns(kind),
                table(kind)
            );
            let mut stmt = conn.prepare(&sql)?;
            match stmt.query_row([id], |row| read_projection(kind, row)) {
                Ok((_, snapshot)) => Ok(Some(snapshot)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn list_for_student(&self, student_ref: &str) -> Result<Vec<TaggableItem>> {
        let kind = self.kind;
        self.db.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM {} WHERE student_ref = ?1 ORDER BY created_at DESC, id ASC",
                select_columns(kind),
                table(kind)
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([student_ref], |row| {
                    let (id, item) = read_projection(kind, row)?;
                    Ok(TaggableItem { id, item })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

// Seed/maintenance writes. In production these tables are written by the
// owning subsystem; the chat tests exercise snapshot semantics through
// the same SQL surface.
impl Database {
    pub fn upsert_document(
        &self,
        id: &str,
        student_ref: &str,
        title: &str,
        description: &str,
        file_type: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO documents (id, student_ref, title, description, file_type)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                     title = excluded.title,
                     description = excluded.description,
                     file_type = excluded.file_type",
                rusqlite::params![id, student_ref, title, description, file_type],
            )?;
            Ok(())
        })
    }

    pub fn upsert_task(
        &self,
        id: &str,
        student_ref: &str,
        title: &str,
        description: &str,
        status: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO tasks (id, student_ref, title, description, status)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                     title = excluded.title,
                     description = excluded.description,
                     status = excluded.status",
                rusqlite::params![id, student_ref, title, description, status],
            )?;
            Ok(())
        })
    }

    pub fn upsert_milestone(
        &self,
        id: &str,
        student_ref: &str,
        title: &str,
        description: &str,
        status: &str,
        due_date: Option<&str>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO milestones (id, student_ref, title, description, status, due_date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET
                     title = excluded.title,
                     description = excluded.description,
                     status = excluded.status,
                     due_date = excluded.due_date",
                rusqlite::params![id, student_ref, title, description, status, due_date],
            )?;
            Ok(())
        })
    }

    pub fn delete_artifact(&self, kind: TagKind, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let sql = format!("DELETE FROM {} WHERE id = ?1", table(kind));
            let changed = conn.execute(&sql, [id])?;
            Ok(changed > 0)
        })
    }
}
