//! SQLite schema definition.

/// Complete database schema for vet-reminders.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Pet Registry (read-only to the reminder engine)
-- ============================================================================

CREATE TABLE IF NOT EXISTS owners (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT,                                  -- NULL or empty: owner cannot be notified
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS pets (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    species TEXT NOT NULL,                       -- lowercase canonical, e.g. 'dog', 'cat'
    date_of_birth TEXT,                          -- YYYY-MM-DD, NULL when unknown
    owner_id INTEGER NOT NULL REFERENCES owners(id),
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_pets_species ON pets(species);
CREATE INDEX IF NOT EXISTS idx_pets_owner ON pets(owner_id);

-- ============================================================================
-- Reminder Templates (edited by the admin workflow)
-- ============================================================================

CREATE TABLE IF NOT EXISTS templates (
    id INTEGER PRIMARY KEY,
    category TEXT NOT NULL,                      -- deworming, vaccination, ...
    species TEXT,                                -- NULL: applies to every species
    name TEXT NOT NULL,
    trigger_kind TEXT NOT NULL CHECK (trigger_kind IN ('age', 'event')),
    age_condition TEXT,                          -- 'N' or 'last notified+K' (age only)
    vaccine TEXT,                                -- event only, NULL matches any vaccine
    min_age_weeks INTEGER,                       -- event only, inclusive
    max_age_weeks INTEGER,                       -- event only, inclusive
    days_offset INTEGER NOT NULL DEFAULT 0,
    subject TEXT NOT NULL,
    body TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    CHECK (trigger_kind = 'event' OR age_condition IS NOT NULL)
);

CREATE INDEX IF NOT EXISTS idx_templates_scope ON templates(category, species, is_active);

-- ============================================================================
-- Sent Records (Append-Only)
-- ============================================================================

CREATE TABLE IF NOT EXISTS sent_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    pet_id INTEGER NOT NULL REFERENCES pets(id),
    template_id INTEGER NOT NULL REFERENCES templates(id),
    owner_id INTEGER NOT NULL,
    sent_at TEXT NOT NULL,                       -- RFC 3339 UTC, second precision
    status TEXT NOT NULL CHECK (status IN ('sent', 'failed')),
    error TEXT,
    origin TEXT NOT NULL DEFAULT 'cycle' CHECK (origin IN ('cycle', 'pending')),
    dedup_key TEXT UNIQUE                        -- 'pet:template' for successful exact-age sends
);

CREATE INDEX IF NOT EXISTS idx_sent_pet_template ON sent_records(pet_id, template_id);
CREATE INDEX IF NOT EXISTS idx_sent_template ON sent_records(template_id);
CREATE INDEX IF NOT EXISTS idx_sent_at ON sent_records(sent_at);

CREATE TRIGGER IF NOT EXISTS sent_records_no_update BEFORE UPDATE ON sent_records
BEGIN
    SELECT RAISE(ABORT, 'sent_records is append-only');
END;

CREATE TRIGGER IF NOT EXISTS sent_records_no_delete BEFORE DELETE ON sent_records
BEGIN
    SELECT RAISE(ABORT, 'sent_records is append-only');
END;

-- ============================================================================
-- Pending Schedules (event-triggered reminders)
-- ============================================================================

CREATE TABLE IF NOT EXISTS pending_schedules (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    pet_id INTEGER NOT NULL REFERENCES pets(id),
    template_id INTEGER NOT NULL REFERENCES templates(id),
    source_event TEXT NOT NULL,
    scheduled_date TEXT NOT NULL,                -- YYYY-MM-DD
    is_sent INTEGER NOT NULL DEFAULT 0,
    sent_at TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE (source_event, template_id)
);

CREATE INDEX IF NOT EXISTS idx_pending_due ON pending_schedules(is_sent, scheduled_date);

-- Only transition allowed: is_sent 0 -> 1
CREATE TRIGGER IF NOT EXISTS pending_schedules_sent_once BEFORE UPDATE ON pending_schedules
WHEN old.is_sent = 1
BEGIN
    SELECT RAISE(ABORT, 'Pending schedule already sent');
END;

CREATE TRIGGER IF NOT EXISTS pending_schedules_no_delete BEFORE DELETE ON pending_schedules
BEGIN
    SELECT RAISE(ABORT, 'pending_schedules rows are never deleted');
END;
"#;
