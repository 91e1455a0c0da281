//! Placeholder substitution for reminder subjects and bodies.
//!
//! Placeholders look like `{{pet_name}}` (inner whitespace allowed). A known
//! placeholder without a value renders empty; an unknown one is left as is so
//! template typos stay visible in the delivered message.

use chrono::{DateTime, NaiveDate, Utc};

use crate::mail::OutgoingMail;
use crate::models::{AgeCondition, Template};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Values available to a template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReminderContext {
    pub pet_name: String,
    pub owner_name: String,
    pub species: String,
    pub template_name: String,
    pub age_weeks: Option<i64>,
    pub last_sent: Option<NaiveDate>,
    pub next_due: Option<NaiveDate>,
    pub note: Option<String>,
    pub vaccine: Option<String>,
    pub scheduled_date: Option<NaiveDate>,
}

impl ReminderContext {
    /// `None` for unknown placeholder names.
    fn value(&self, key: &str) -> Option<String> {
        let date = |d: &Option<NaiveDate>| {
            d.map(|d| d.format(DATE_FORMAT).to_string())
                .unwrap_or_default()
        };

        let value = match key {
            "pet_name" => self.pet_name.clone(),
            "owner_name" => self.owner_name.clone(),
            "species" => self.species.clone(),
            "template_name" => self.template_name.clone(),
            "age_weeks" => self.age_weeks.map(|a| a.to_string()).unwrap_or_default(),
            "last_sent" => date(&self.last_sent),
            "next_due" => date(&self.next_due),
            "note" => self.note.clone().unwrap_or_default(),
            "vaccine" => self.vaccine.clone().unwrap_or_default(),
            "scheduled_date" => date(&self.scheduled_date),
            _ => return None,
        };
        Some(value)
    }

    pub fn with_last_sent(mut self, last_sent: Option<DateTime<Utc>>) -> Self {
        self.last_sent = last_sent.map(|t| t.date_naive());
        self
    }
}

/// Short cadence description used for the `{{note}}` placeholder.
pub fn cadence_note(condition: AgeCondition) -> String {
    match condition {
        AgeCondition::ExactWeeks(weeks) => format!("This reminder is for the {}-week milestone.", weeks),
        AgeCondition::SinceLastSent { weeks } => {
            format!("We will remind you again in {} weeks.", weeks)
        }
    }
}

/// Substitute placeholders in `text`.
pub fn render(text: &str, ctx: &ReminderContext, escape: bool) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let Some(end) = after.find("}}") else {
            // Unterminated marker: keep the remainder verbatim
            out.push_str(&rest[start..]);
            return out;
        };

        let raw = &rest[start..start + 2 + end + 2];
        match ctx.value(after[..end].trim()) {
            Some(value) if escape => out.push_str(&escape_html(&value)),
            Some(value) => out.push_str(&value),
            None => out.push_str(raw),
        }
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    out
}

/// Render a template into a message addressed to `to`.
pub fn render_mail(template: &Template, ctx: &ReminderContext, to: &str) -> OutgoingMail {
    OutgoingMail {
        to: to.to_string(),
        to_name: ctx.owner_name.clone(),
        subject: render(&template.subject, ctx, false),
        html: render(&template.body, ctx, true),
    }
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
