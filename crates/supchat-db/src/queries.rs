use anyhow::{Result, anyhow};
use rusqlite::{Connection, Row};

use crate::Database;
use crate::models::{ChannelRow, MessageRow};

const CHANNEL_COLUMNS: &str =
    "id, student_ref, supervisor_ref, last_activity_at, active, created_at";

const MESSAGE_COLUMNS: &str = "id, channel_id, sender_kind, sender_ref, body, kind, \
     tag_kind, tag_target_id, tag_snapshot, \
     attachment_url, attachment_name, attachment_size, \
     is_read, read_at, is_edited, edited_at, created_at";

impl Database {
    // -- Channels --

    /// Idempotent channel creation: insert with ON CONFLICT DO NOTHING on
    /// the (student_ref, supervisor_ref) uniqueness constraint, then
    /// re-select. Concurrent first-contact callers all land on the one
    /// surviving row; there is no check-then-insert window.
    pub fn get_or_create_channel(
        &self,
        candidate_id: &str,
        student_ref: &str,
        supervisor_ref: &str,
        now: &str,
    ) -> Result<ChannelRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO channels (id, student_ref, supervisor_ref, last_activity_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)
                 ON CONFLICT(student_ref, supervisor_ref) DO NOTHING",
                rusqlite::params![candidate_id, student_ref, supervisor_ref, now],
            )?;

            query_channel_by_pair(conn, student_ref, supervisor_ref)?
                .ok_or_else(|| anyhow!("channel missing after upsert for ({student_ref}, {supervisor_ref})"))
        })
    }

    pub fn get_channel(&self, id: &str) -> Result<Option<ChannelRow>> {
        self.with_conn(|conn| query_channel_by_id(conn, id))
    }

    pub fn channel_exists_for_pair(
        &self,
        student_ref: &str,
        supervisor_ref: &str,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            Ok(query_channel_by_pair(conn, student_ref, supervisor_ref)?.is_some())
        })
    }

    /// Soft-disable. Returns false if the channel does not exist.
    pub fn deactivate_channel(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("UPDATE channels SET active = 0 WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    /// Conversation list for one side of the supervision relationship,
    /// most recently active first, with the caller's unread badge count.
    pub fn list_channels_for_party(
        &self,
        party_kind: &str,
        ref_id: &str,
    ) -> Result<Vec<(ChannelRow, u64)>> {
        let column = match party_kind {
            "student" => "student_ref",
            "supervisor" => "supervisor_ref",
            other => return Err(anyhow!("unknown party kind '{}'", other)),
        };

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {CHANNEL_COLUMNS},
                        (SELECT COUNT(*) FROM messages m
                          WHERE m.channel_id = channels.id
                            AND m.is_read = 0
                            AND m.sender_ref != ?1) AS unread
                 FROM channels
                 WHERE {column} = ?1
                 ORDER BY last_activity_at DESC, id ASC"
            );

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([ref_id], |row| Ok((read_channel_row(row)?, row.get::<_, u64>(6)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Messages --

    /// Append is a single transaction: the message row and the channel's
    /// last_activity_at touch commit together or not at all. The touch is
    /// conditional on `active = 1`, so the "channel must be active"
    /// precondition is part of the write — a deactivate racing with this
    /// call rolls the insert back. Returns false when the channel was
    /// inactive (or gone) at commit time.
    pub fn insert_message(&self, row: &MessageRow) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO messages (id, channel_id, sender_kind, sender_ref, body, kind,
                                       tag_kind, tag_target_id, tag_snapshot,
                                       attachment_url, attachment_name, attachment_size,
                                       is_read, read_at, is_edited, edited_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
                rusqlite::params![
                    row.id,
                    row.channel_id,
                    row.sender_kind,
                    row.sender_ref,
                    row.body,
                    row.kind,
                    row.tag_kind,
                    row.tag_target_id,
                    row.tag_snapshot,
                    row.attachment_url,
                    row.attachment_name,
                    row.attachment_size,
                    row.is_read,
                    row.read_at,
                    row.is_edited,
                    row.edited_at,
                    row.created_at,
                ],
            )?;

            let touched = tx.execute(
                "UPDATE channels SET last_activity_at = ?1 WHERE id = ?2 AND active = 1",
                rusqlite::params![row.created_at, row.channel_id],
            )?;
            if touched == 0 {
                // Dropping the transaction rolls the insert back.
                return Ok(false);
            }

            tx.commit()?;
            Ok(true)
        })
    }

    /// Keyset page in ascending (created_at, id) order, strictly after the
    /// cursor position when one is given. Robust to concurrent appends:
    /// the cursor names a position in the total order, not an offset.
    pub fn page_messages(
        &self,
        channel_id: &str,
        after: Option<(&str, &str)>,
        limit: u32,
    ) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE channel_id = ?1
                   AND (?2 IS NULL OR created_at > ?2 OR (created_at = ?2 AND id > ?3))
                 ORDER BY created_at ASC, id ASC
                 LIMIT ?4"
            );

            let (after_ts, after_id) = match after {
                Some((ts, id)) => (Some(ts), Some(id)),
                None => (None, None),
            };

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    rusqlite::params![channel_id, after_ts, after_id, limit],
                    read_message_row,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Case-insensitive substring search over body, newest first.
    pub fn search_messages(
        &self,
        channel_id: &str,
        needle: &str,
        kind: Option<&str>,
        limit: u32,
    ) -> Result<Vec<MessageRow>> {
        let pattern = format!("%{}%", escape_like(&needle.to_lowercase()));

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE channel_id = ?1
                   AND lower(body) LIKE ?2 ESCAPE '\\'
                   AND (?3 IS NULL OR kind = ?3)
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?4"
            );

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    rusqlite::params![channel_id, pattern, kind, limit],
                    read_message_row,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Read state --

    /// One conditional bulk update: the precondition (unread, not sent by
    /// the reader) is part of the write, so there is no read-then-write
    /// race and a repeat call changes zero rows.
    pub fn mark_read(&self, channel_id: &str, reader_ref: &str, now: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE messages SET is_read = 1, read_at = ?1
                 WHERE channel_id = ?2 AND is_read = 0 AND sender_ref != ?3",
                rusqlite::params![now, channel_id, reader_ref],
            )?;
            Ok(changed)
        })
    }
}

/// Escape LIKE metacharacters so user input matches literally.
fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn read_channel_row(row: &Row<'_>) -> rusqlite::Result<ChannelRow> {
    Ok(ChannelRow {
        id: row.get(0)?,
        student_ref: row.get(1)?,
        supervisor_ref: row.get(2)?,
        last_activity_at: row.get(3)?,
        active: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn read_message_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        channel_id: row.get(1)?,
        sender_kind: row.get(2)?,
        sender_ref: row.get(3)?,
        body: row.get(4)?,
        kind: row.get(5)?,
        tag_kind: row.get(6)?,
        tag_target_id: row.get(7)?,
        tag_snapshot: row.get(8)?,
        attachment_url: row.get(9)?,
        attachment_name: row.get(10)?,
        attachment_size: row.get(11)?,
        is_read: row.get(12)?,
        read_at: row.get(13)?,
        is_edited: row.get(14)?,
        edited_at: row.get(15)?,
        created_at: row.get(16)?,
    })
}

fn query_channel_by_id(conn: &Connection, id: &str) -> Result<Option<ChannelRow>> {
    let mut stmt =
        conn.prepare(&format!("SELECT {CHANNEL_COLUMNS} FROM channels WHERE id = ?1"))?;
    let row = stmt.query_row([id], read_channel_row).optional()?;
    Ok(row)
}

fn query_channel_by_pair(
    conn: &Connection,
    student_ref: &str,
    supervisor_ref: &str,
) -> Result<Option<ChannelRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CHANNEL_COLUMNS} FROM channels WHERE student_ref = ?1 AND supervisor_ref = ?2"
    ))?;
    let row = stmt
        .query_row([student_ref, supervisor_ref], read_channel_row)
        .optional()?;
    Ok(row)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
