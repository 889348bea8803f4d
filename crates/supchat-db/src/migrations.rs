use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS channels (
            id                TEXT PRIMARY KEY,
            student_ref       TEXT NOT NULL,
            supervisor_ref    TEXT NOT NULL,
            last_activity_at  TEXT NOT NULL,
            active            INTEGER NOT NULL DEFAULT 1,
            created_at        TEXT NOT NULL,
            UNIQUE(student_ref, supervisor_ref)
        );

        CREATE TABLE IF NOT EXISTS messages (
            id               TEXT PRIMARY KEY,
            channel_id       TEXT NOT NULL REFERENCES channels(id),
            sender_kind      TEXT NOT NULL CHECK (sender_kind IN ('student', 'supervisor')),
            sender_ref       TEXT NOT NULL,
            body             TEXT NOT NULL,
            kind             TEXT NOT NULL CHECK (kind IN ('plain', 'document_tag', 'task_tag', 'milestone_tag')),
            tag_kind         TEXT,
            tag_target_id    TEXT,
            tag_snapshot     TEXT,
            attachment_url   TEXT,
            attachment_name  TEXT,
            attachment_size  INTEGER,
            is_read          INTEGER NOT NULL DEFAULT 0,
            read_at          TEXT,
            is_edited        INTEGER NOT NULL DEFAULT 0,
            edited_at        TEXT,
            created_at       TEXT NOT NULL
        );

        -- Keyset pagination walks (channel_id, created_at, id)
        CREATE INDEX IF NOT EXISTS idx_messages_channel_order
            ON messages(channel_id, created_at, id);

        -- Artifact tables are owned by the project-management side of the
        -- system; the chat core reads them only through ArtifactStore.
        CREATE TABLE IF NOT EXISTS documents (
            id           TEXT PRIMARY KEY,
            student_ref  TEXT NOT NULL,
            title        TEXT NOT NULL,
            description  TEXT NOT NULL DEFAULT '',
            file_type    TEXT NOT NULL DEFAULT '',
            created_at   TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS tasks (
            id           TEXT PRIMARY KEY,
            student_ref  TEXT NOT NULL,
            title        TEXT NOT NULL,
            description  TEXT NOT NULL DEFAULT '',
            status       TEXT NOT NULL DEFAULT 'open',
            created_at   TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS milestones (
            id           TEXT PRIMARY KEY,
            student_ref  TEXT NOT NULL,
            title        TEXT NOT NULL,
            description  TEXT NOT NULL DEFAULT '',
            status       TEXT NOT NULL DEFAULT 'pending',
            due_date     TEXT,
            created_at   TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_documents_student ON documents(student_ref);
        CREATE INDEX IF NOT EXISTS idx_tasks_student ON tasks(student_ref);
        CREATE INDEX IF NOT EXISTS idx_milestones_student ON milestones(student_ref);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
