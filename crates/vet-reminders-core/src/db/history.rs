//! Notification history: the append-only sent record log and the
//! operator-facing history view.

use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::{format_timestamp, is_unique_violation, parse_timestamp, Database, DbError, DbResult};
use crate::models::{NewSentRecord, RecordOrigin, RecordOutcome, SendStatus, SentRecord};

const RECORD_COLUMNS: &str =
    "id, pet_id, template_id, owner_id, sent_at, status, error, origin";

/// Largest page the history view will return.
pub const MAX_HISTORY_PAGE_SIZE: u32 = 200;

impl Database {
    /// Append a dispatch attempt.
    ///
    /// A second successful exact-age record for the same (pet, template) hits
    /// the `dedup_key` constraint and is reported as [`RecordOutcome::Duplicate`].
    pub fn insert_sent_record(&self, record: &NewSentRecord) -> DbResult<RecordOutcome> {
        let result = self.conn.execute(
            r#"
            INSERT INTO sent_records (
                pet_id, template_id, owner_id, sent_at, status, error, origin, dedup_key
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                record.pet_id,
                record.template_id,
                record.owner_id,
                format_timestamp(&record.sent_at),
                record.status.as_str(),
                record.error,
                record.origin.as_str(),
                record.dedup_key(),
            ],
        );

        match result {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => return Ok(RecordOutcome::Duplicate),
            Err(e) => return Err(e.into()),
        }

        let id = self.conn.last_insert_rowid();
        self.get_sent_record(id)?
            .map(RecordOutcome::Recorded)
            .ok_or_else(|| DbError::NotFound(format!("sent record {}", id)))
    }

    /// Get a sent record by ID.
    pub fn get_sent_record(&self, id: i64) -> DbResult<Option<SentRecord>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM sent_records WHERE id = ?", RECORD_COLUMNS),
                [id],
                record_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Whether any attempt (sent or failed) exists for the pair.
    pub fn has_attempted(&self, pet_id: i64, template_id: i64) -> DbResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sent_records WHERE pet_id = ?1 AND template_id = ?2",
            [pet_id, template_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// The pet's most recent record across all templates.
    pub fn most_recent_for_pet(&self, pet_id: i64) -> DbResult<Option<SentRecord>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM sent_records WHERE pet_id = ? ORDER BY sent_at DESC, id DESC LIMIT 1",
                    RECORD_COLUMNS
                ),
                [pet_id],
                record_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Every record for the given templates, newest first.
    pub fn list_records_for_templates(&self, template_ids: &[i64]) -> DbResult<Vec<SentRecord>> {
        if template_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; template_ids.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM sent_records WHERE template_id IN ({}) ORDER BY sent_at DESC, id DESC",
            RECORD_COLUMNS, placeholders
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(template_ids), record_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?.try_into()?);
        }
        Ok(records)
    }

    /// Paginated operator view of sent records or pending schedules, joined
    /// with pet, owner and template display fields. Newest first.
    pub fn history_page(&self, query: &HistoryQuery) -> DbResult<HistoryPage> {
        let per_page = query.per_page.clamp(1, MAX_HISTORY_PAGE_SIZE);
        let page = query.page.max(1);
        let offset = i64::from(page - 1) * i64::from(per_page);

        let (count_sql, page_sql) = match query.kind {
            HistoryKind::Sent => (
                "SELECT COUNT(*) FROM sent_records",
                r#"
                SELECT r.id, r.pet_id, p.name, p.species, o.name, o.email,
                       r.template_id, t.name, t.category, r.sent_at, r.status, r.error
                FROM sent_records r
                LEFT JOIN pets p ON p.id = r.pet_id
                LEFT JOIN owners o ON o.id = r.owner_id
                LEFT JOIN templates t ON t.id = r.template_id
                ORDER BY r.sent_at DESC, r.id DESC
                LIMIT ?1 OFFSET ?2
                "#,
            ),
            HistoryKind::Pending => (
                "SELECT COUNT(*) FROM pending_schedules",
                r#"
                SELECT s.id, s.pet_id, p.name, p.species, o.name, o.email,
                       s.template_id, t.name, t.category, s.scheduled_date,
                       CASE WHEN s.is_sent = 1 THEN 'sent' ELSE 'pending' END,
                       NULL
                FROM pending_schedules s
                LEFT JOIN pets p ON p.id = s.pet_id
                LEFT JOIN owners o ON o.id = p.owner_id
                LEFT JOIN templates t ON t.id = s.template_id
                ORDER BY s.scheduled_date DESC, s.id DESC
                LIMIT ?1 OFFSET ?2
                "#,
            ),
        };

        let total: i64 = self.conn.query_row(count_sql, [], |row| row.get(0))?;

        let mut stmt = self.conn.prepare(page_sql)?;
        let rows = stmt.query_map(params![i64::from(per_page), offset], |row| {
            Ok(HistoryEntry {
                kind: query.kind,
                id: row.get(0)?,
                pet_id: row.get(1)?,
                pet_name: row.get(2)?,
                species: row.get(3)?,
                owner_name: row.get(4)?,
                owner_email: row.get(5)?,
                template_id: row.get(6)?,
                template_name: row.get(7)?,
                category: row.get(8)?,
                date: row.get(9)?,
                status: row.get(10)?,
                error: row.get(11)?,
            })
        })?;

        Ok(HistoryPage {
            page,
            per_page,
            total: total as u64,
            entries: rows.collect::<Result<Vec<_>, _>>()?,
        })
    }
}

/// Which log the history view reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKind {
    #[default]
    Sent,
    Pending,
}

/// History view request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub kind: HistoryKind,
    /// 1-based page number
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    50
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            kind: HistoryKind::Sent,
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

/// One row of the history view. Display fields are `None` when the joined
/// registry row no longer exists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub kind: HistoryKind,
    pub id: i64,
    pub pet_id: i64,
    pub pet_name: Option<String>,
    pub species: Option<String>,
    pub owner_name: Option<String>,
    pub owner_email: Option<String>,
    pub template_id: i64,
    pub template_name: Option<String>,
    pub category: Option<String>,
    /// `sent_at` for sent records, `scheduled_date` for pending schedules
    pub date: String,
    /// sent / failed for records, pending / sent for schedules
    pub status: String,
    pub error: Option<String>,
}

/// A page of the history view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryPage {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub entries: Vec<HistoryEntry>,
}

/// Intermediate row struct for database mapping.
struct RecordRow {
    id: i64,
    pet_id: i64,
    template_id: i64,
    owner_id: i64,
    sent_at: String,
    status: String,
    error: Option<String>,
    origin: String,
}

fn record_row(row: &Row<'_>) -> rusqlite::Result<RecordRow> {
    Ok(RecordRow {
        id: row.get(0)?,
        pet_id: row.get(1)?,
        template_id: row.get(2)?,
        owner_id: row.get(3)?,
        sent_at: row.get(4)?,
        status: row.get(5)?,
        error: row.get(6)?,
        origin: row.get(7)?,
    })
}

impl TryFrom<RecordRow> for SentRecord {
    type Error = DbError;

    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        let status = SendStatus::parse(&row.status)
            .ok_or_else(|| DbError::Constraint(format!("Unknown send status: {}", row.status)))?;
        let origin = RecordOrigin::parse(&row.origin)
            .ok_or_else(|| DbError::Constraint(format!("Unknown record origin: {}", row.origin)))?;

        Ok(SentRecord {
            id: row.id,
            pet_id: row.pet_id,
            template_id: row.template_id,
            owner_id: row.owner_id,
            sent_at: parse_timestamp(&row.sent_at)?,
            status,
            error: row.error,
            origin,
        })
    }
}
