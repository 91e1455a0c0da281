//! Pending schedule database operations.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{
    format_date, format_timestamp, is_unique_violation, parse_date, parse_timestamp, Database,
    DbError, DbResult,
};
use crate::models::{NewPendingSchedule, PendingSchedule};

const SCHEDULE_COLUMNS: &str =
    "id, pet_id, template_id, source_event, scheduled_date, is_sent, sent_at, created_at";

impl Database {
    /// Insert a pending schedule.
    ///
    /// Returns `None` when the (event, template) pair was already scheduled,
    /// which makes re-delivery of the same event harmless.
    pub fn insert_pending_schedule(
        &self,
        schedule: &NewPendingSchedule,
    ) -> DbResult<Option<PendingSchedule>> {
        let result = self.conn.execute(
            r#"
            INSERT INTO pending_schedules (pet_id, template_id, source_event, scheduled_date)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                schedule.pet_id,
                schedule.template_id,
                schedule.source_event,
                format_date(&schedule.scheduled_date),
            ],
        );

        match result {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        let id = self.conn.last_insert_rowid();
        self.get_pending_schedule(id)?
            .ok_or_else(|| DbError::NotFound(format!("pending schedule {}", id)))
            .map(Some)
    }

    /// Get a pending schedule by ID.
    pub fn get_pending_schedule(&self, id: i64) -> DbResult<Option<PendingSchedule>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM pending_schedules WHERE id = ?", SCHEDULE_COLUMNS),
                [id],
                schedule_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Unsent schedules due on or before `today`, oldest first.
    pub fn list_due_pending(&self, today: NaiveDate) -> DbResult<Vec<PendingSchedule>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {}
            FROM pending_schedules
            WHERE is_sent = 0 AND scheduled_date <= ?
            ORDER BY scheduled_date, id
            "#,
            SCHEDULE_COLUMNS
        ))?;

        let rows = stmt.query_map([format_date(&today)], schedule_row)?;

        let mut schedules = Vec::new();
        for row in rows {
            schedules.push(row?.try_into()?);
        }
        Ok(schedules)
    }

    /// Flip `is_sent` to true. Returns false if the row was already sent or missing.
    pub fn mark_pending_sent(&self, id: i64, sent_at: &DateTime<Utc>) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE pending_schedules SET is_sent = 1, sent_at = ?2 WHERE id = ?1 AND is_sent = 0",
            params![id, format_timestamp(sent_at)],
        )?;
        Ok(rows_affected > 0)
    }
}

/// Intermediate row struct for database mapping.
struct ScheduleRow {
    id: i64,
    pet_id: i64,
    template_id: i64,
    source_event: String,
    scheduled_date: String,
    is_sent: bool,
    sent_at: Option<String>,
    created_at: String,
}

fn schedule_row(row: &Row<'_>) -> rusqlite::Result<ScheduleRow> {
    Ok(ScheduleRow {
        id: row.get(0)?,
        pet_id: row.get(1)?,
        template_id: row.get(2)?,
        source_event: row.get(3)?,
        scheduled_date: row.get(4)?,
        is_sent: row.get(5)?,
        sent_at: row.get(6)?,
        created_at: row.get(7)?,
    })
}

impl TryFrom<ScheduleRow> for PendingSchedule {
    type Error = DbError;

    fn try_from(row: ScheduleRow) -> Result<Self, Self::Error> {
        Ok(PendingSchedule {
            id: row.id,
            pet_id: row.pet_id,
            template_id: row.template_id,
            source_event: row.source_event,
            scheduled_date: parse_date(&row.scheduled_date)?,
            is_sent: row.is_sent,
            sent_at: row.sent_at.as_deref().map(parse_timestamp).transpose()?,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventCondition, Owner, Pet, Template, TemplateTrigger};

    fn setup_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.insert_owner(&Owner {
            id: 1,
            name: "Ana".into(),
            email: Some("ana@example.com".into()),
        })
        .unwrap();
        db.insert_pet(&Pet {
            id: 1,
            name: "Buddy".into(),
            species: "dog".into(),
            date_of_birth: None,
            owner_id: 1,
        })
        .unwrap();
        db.insert_template(&Template {
            id: 1,
            category: "vaccination".into(),
            species: None,
            name: "Booster".into(),
            trigger: TemplateTrigger::Event(EventCondition::default()),
            subject: "s".into(),
            body: "b".into(),
            days_offset: 14,
            is_active: true,
        })
        .unwrap();
        db
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn new_schedule(event: &str, scheduled_date: NaiveDate) -> NewPendingSchedule {
        NewPendingSchedule {
            pet_id: 1,
            template_id: 1,
            source_event: event.into(),
            scheduled_date,
        }
    }

    #[test]
    fn test_insert_is_idempotent_per_event() {
        let db = setup_db();
        let schedule = new_schedule("evt-1", date(2026, 3, 15));

        let created = db.insert_pending_schedule(&schedule).unwrap().unwrap();
        assert!(!created.is_sent);
        assert_eq!(created.scheduled_date, date(2026, 3, 15));

        assert!(db.insert_pending_schedule(&schedule).unwrap().is_none());
    }

    #[test]
    fn test_list_due_pending() {
        let db = setup_db();
        db.insert_pending_schedule(&new_schedule("evt-1", date(2026, 3, 15)))
            .unwrap();
        db.insert_pending_schedule(&new_schedule("evt-2", date(2026, 3, 10)))
            .unwrap();
        db.insert_pending_schedule(&new_schedule("evt-3", date(2026, 3, 20)))
            .unwrap();

        let due = db.list_due_pending(date(2026, 3, 15)).unwrap();
        let events: Vec<&str> = due.iter().map(|s| s.source_event.as_str()).collect();
        assert_eq!(events, vec!["evt-2", "evt-1"]);
    }

    #[test]
    fn test_mark_sent_once() {
        let db = setup_db();
        let created = db
            .insert_pending_schedule(&new_schedule("evt-1", date(2026, 3, 15)))
            .unwrap()
            .unwrap();

        let now = Utc::now();
        assert!(db.mark_pending_sent(created.id, &now).unwrap());
        assert!(!db.mark_pending_sent(created.id, &now).unwrap());
        assert!(!db.mark_pending_sent(999, &now).unwrap());

        let stored = db.get_pending_schedule(created.id).unwrap().unwrap();
        assert!(stored.is_sent);
        assert!(stored.sent_at.is_some());
        assert!(db.list_due_pending(date(2026, 12, 31)).unwrap().is_empty());
    }
}
