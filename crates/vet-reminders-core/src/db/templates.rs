//! Reminder template database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{AgeCondition, EventCondition, Template, TemplatePatch, TemplateTrigger};

const TEMPLATE_COLUMNS: &str = r#"
    id, category, species, name, trigger_kind, age_condition, vaccine,
    min_age_weeks, max_age_weeks, days_offset, subject, body, is_active
"#;

impl Database {
    /// Insert a template. The ID is taken from the template.
    pub fn insert_template(&self, template: &Template) -> DbResult<()> {
        let (kind, condition, event) = match &template.trigger {
            TemplateTrigger::Age { condition } => ("age", Some(condition.to_string()), None),
            TemplateTrigger::Event(event) => ("event", None, Some(event)),
        };

        self.conn.execute(
            r#"
            INSERT INTO templates (
                id, category, species, name, trigger_kind, age_condition, vaccine,
                min_age_weeks, max_age_weeks, days_offset, subject, body, is_active
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                template.id,
                template.category,
                template.species.as_deref().map(|s| s.trim().to_lowercase()),
                template.name,
                kind,
                condition,
                event.and_then(|e| e.vaccine.clone()),
                event.and_then(|e| e.min_age_weeks),
                event.and_then(|e| e.max_age_weeks),
                template.days_offset,
                template.subject,
                template.body,
                template.is_active,
            ],
        )?;
        Ok(())
    }

    /// Get a template by ID.
    pub fn get_template(&self, id: i64) -> DbResult<Option<Template>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM templates WHERE id = ?", TEMPLATE_COLUMNS),
                [id],
                template_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Active age-triggered templates for a species and category, by ascending ID.
    pub fn list_active_age_templates(
        &self,
        species: &str,
        category: &str,
    ) -> DbResult<Vec<Template>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM templates
            WHERE is_active = 1
              AND trigger_kind = 'age'
              AND category = ?1
              AND (species IS NULL OR species = ?2)
            ORDER BY id
            "#,
            TEMPLATE_COLUMNS
        );
        self.collect_templates(&sql, params![category, species.trim().to_lowercase()])
    }

    /// Active event-triggered templates applying to a species, by ascending ID.
    pub fn list_active_event_templates(&self, species: &str) -> DbResult<Vec<Template>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM templates
            WHERE is_active = 1
              AND trigger_kind = 'event'
              AND (species IS NULL OR species = ?1)
            ORDER BY id
            "#,
            TEMPLATE_COLUMNS
        );
        self.collect_templates(&sql, params![species.trim().to_lowercase()])
    }

    /// Apply an admin edit. Returns the updated template, or `None` if it does not exist.
    pub fn update_template(&self, id: i64, patch: &TemplatePatch) -> DbResult<Option<Template>> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE templates SET
                subject = COALESCE(?2, subject),
                body = COALESCE(?3, body),
                days_offset = COALESCE(?4, days_offset),
                is_active = COALESCE(?5, is_active),
                updated_at = datetime('now')
            WHERE id = ?1
            "#,
            params![id, patch.subject, patch.body, patch.days_offset, patch.is_active],
        )?;

        if rows_affected == 0 {
            return Ok(None);
        }
        self.get_template(id)
    }

    fn collect_templates<P: rusqlite::Params>(&self, sql: &str, params: P) -> DbResult<Vec<Template>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, template_row)?;

        let mut templates = Vec::new();
        for row in rows {
            templates.push(row?.try_into()?);
        }
        Ok(templates)
    }
}

/// Intermediate row struct for database mapping.
struct TemplateRow {
    id: i64,
    category: String,
    species: Option<String>,
    name: String,
    trigger_kind: String,
    age_condition: Option<String>,
    vaccine: Option<String>,
    min_age_weeks: Option<u32>,
    max_age_weeks: Option<u32>,
    days_offset: i64,
    subject: String,
    body: String,
    is_active: bool,
}

fn template_row(row: &Row<'_>) -> rusqlite::Result<TemplateRow> {
    Ok(TemplateRow {
        id: row.get(0)?,
        category: row.get(1)?,
        species: row.get(2)?,
        name: row.get(3)?,
        trigger_kind: row.get(4)?,
        age_condition: row.get(5)?,
        vaccine: row.get(6)?,
        min_age_weeks: row.get(7)?,
        max_age_weeks: row.get(8)?,
        days_offset: row.get(9)?,
        subject: row.get(10)?,
        body: row.get(11)?,
        is_active: row.get(12)?,
    })
}

impl TryFrom<TemplateRow> for Template {
    type Error = DbError;

    fn try_from(row: TemplateRow) -> Result<Self, Self::Error> {
        let trigger = match row.trigger_kind.as_str() {
            "age" => {
                let raw = row.age_condition.ok_or_else(|| {
                    DbError::InvalidData(format!("template {} has no age_condition", row.id))
                })?;
                let condition: AgeCondition = raw
                    .parse()
                    .map_err(|e| DbError::InvalidData(format!("template {}: {}", row.id, e)))?;
                TemplateTrigger::Age { condition }
            }
            "event" => TemplateTrigger::Event(EventCondition {
                vaccine: row.vaccine,
                min_age_weeks: row.min_age_weeks,
                max_age_weeks: row.max_age_weeks,
            }),
            other => {
                return Err(DbError::Constraint(format!(
                    "Unknown trigger kind: {}",
                    other
                )))
            }
        };

        Ok(Template {
            id: row.id,
            category: row.category,
            species: row.species,
            name: row.name,
            trigger,
            subject: row.subject,
            body: row.body,
            days_offset: row.days_offset,
            is_active: row.is_active,
        })
    }
}
